// Copyright 2024 FastLabs Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::fmt;

use sharelog_core::Error;
use url::Url;

const DEFAULT_PROTOCOL: &str = "https";
const DEFAULT_ENDPOINT_SUFFIX: &str = "core.windows.net";

/// A parsed storage account connection string.
///
/// The format is a `;`-separated list of `Key=Value` pairs, for example:
///
/// ```text
/// DefaultEndpointsProtocol=https;AccountName=myaccount;SharedAccessSignature=sv=2022-11-02&sig=...
/// FileEndpoint=http://127.0.0.1:10004/devstoreaccount1;SharedAccessSignature=sv=...
/// ```
///
/// Recognized keys are `DefaultEndpointsProtocol`, `AccountName`, `AccountKey`, `EndpointSuffix`,
/// `FileEndpoint` and `SharedAccessSignature`; keys match case-insensitively and unknown keys are
/// ignored. Requests are authorized with the shared access signature, if any. Signing requests
/// with an account key is not supported.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionString {
    file_endpoint: Url,
    account_name: Option<String>,
    shared_access_signature: Option<String>,
}

impl fmt::Debug for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionString")
            .field("file_endpoint", &self.file_endpoint.as_str())
            .field("account_name", &self.account_name)
            .field(
                "shared_access_signature",
                &self.shared_access_signature.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

impl ConnectionString {
    /// Parse a connection string.
    ///
    /// # Errors
    ///
    /// Return an [`ErrorKind::Configuration`] error if the string is malformed, if no file
    /// endpoint can be derived from it, or if it carries only an account key.
    ///
    /// [`ErrorKind::Configuration`]: sharelog_core::ErrorKind::Configuration
    ///
    /// # Examples
    ///
    /// ```
    /// use sharelog_append_fileshare::ConnectionString;
    ///
    /// let conn = ConnectionString::parse(
    ///     "AccountName=myaccount;SharedAccessSignature=sv=2022-11-02&sig=abc",
    /// )
    /// .unwrap();
    /// assert_eq!(
    ///     conn.file_endpoint().as_str(),
    ///     "https://myaccount.file.core.windows.net/"
    /// );
    /// ```
    pub fn parse(s: &str) -> Result<Self, Error> {
        let mut protocol = None;
        let mut account_name = None;
        let mut account_key = None;
        let mut endpoint_suffix = None;
        let mut file_endpoint = None;
        let mut shared_access_signature = None;

        let pairs = s.split(';').map(str::trim).filter(|pair| !pair.is_empty());
        for (position, pair) in pairs.enumerate() {
            // values may contain '=' themselves, as SAS tokens and account keys do
            let Some((key, value)) = pair.split_once('=') else {
                return Err(Error::configuration(
                    "malformed connection string: expect 'Key=Value' pairs",
                )
                .with_context("position", position));
            };

            let value = value.trim();
            if value.is_empty() {
                return Err(
                    Error::configuration("malformed connection string: empty value")
                        .with_context("key", key),
                );
            }

            let slot = match key.trim().to_ascii_lowercase().as_str() {
                "defaultendpointsprotocol" => &mut protocol,
                "accountname" => &mut account_name,
                "accountkey" => &mut account_key,
                "endpointsuffix" => &mut endpoint_suffix,
                "fileendpoint" => &mut file_endpoint,
                "sharedaccesssignature" => &mut shared_access_signature,
                _ => continue,
            };
            *slot = Some(value.to_owned());
        }

        if account_key.is_some() && shared_access_signature.is_none() {
            return Err(Error::configuration(
                "account key authorization is not supported; provide a SharedAccessSignature",
            ));
        }

        let file_endpoint = match (file_endpoint, &account_name) {
            (Some(endpoint), _) => endpoint,
            (None, Some(account)) => {
                let protocol = protocol.as_deref().unwrap_or(DEFAULT_PROTOCOL);
                if protocol != "http" && protocol != "https" {
                    return Err(Error::configuration(
                        "malformed connection string: unsupported endpoints protocol",
                    )
                    .with_context("protocol", protocol));
                }
                let suffix = endpoint_suffix.as_deref().unwrap_or(DEFAULT_ENDPOINT_SUFFIX);
                format!("{protocol}://{account}.file.{suffix}")
            }
            (None, None) => {
                return Err(Error::configuration(
                    "malformed connection string: neither FileEndpoint nor AccountName is set",
                ));
            }
        };

        let file_endpoint = Url::parse(&file_endpoint).map_err(|err| {
            Error::configuration("malformed connection string: invalid file endpoint")
                .with_context("endpoint", &file_endpoint)
                .with_source(err)
        })?;
        if file_endpoint.cannot_be_a_base() {
            return Err(
                Error::configuration("malformed connection string: invalid file endpoint")
                    .with_context("endpoint", file_endpoint),
            );
        }

        let shared_access_signature =
            shared_access_signature.map(|sas| sas.trim_start_matches('?').to_owned());

        Ok(Self {
            file_endpoint,
            account_name,
            shared_access_signature,
        })
    }

    /// The base URL of the file service.
    pub fn file_endpoint(&self) -> &Url {
        &self.file_endpoint
    }

    /// The storage account name, if given.
    pub fn account_name(&self) -> Option<&str> {
        self.account_name.as_deref()
    }

    /// The shared access signature query string, without a leading `?`.
    pub fn shared_access_signature(&self) -> Option<&str> {
        self.shared_access_signature.as_deref()
    }
}
