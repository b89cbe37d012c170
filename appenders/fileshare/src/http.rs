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

use reqwest::Client;
use reqwest::Method;
use reqwest::RequestBuilder;
use reqwest::Response;
use reqwest::StatusCode;
use reqwest::header::CONTENT_LENGTH;
use sharelog_core::Error;
use url::Url;

use crate::client::FileShareClient;
use crate::connection::ConnectionString;

/// The REST API version sent with every request.
const API_VERSION: &str = "2023-11-03";

/// The service rejects ranged writes larger than 4 MiB.
const MAX_RANGE_SIZE: usize = 4 * 1024 * 1024;

/// A [`FileShareClient`] speaking the Azure Files REST protocol over HTTP.
///
/// Requests are authorized by appending the connection string's shared access signature, if
/// any, to every request URL.
#[derive(Debug, Clone)]
pub struct HttpFileShareClient {
    client: Client,
    endpoint: Url,
    sas: Option<String>,
}

impl HttpFileShareClient {
    /// Create a client for the file endpoint of `conn`.
    ///
    /// # Errors
    ///
    /// Return an error if the underlying HTTP client cannot be initialized.
    pub fn new(conn: &ConnectionString) -> Result<Self, Error> {
        let client = Client::builder()
            .build()
            .map_err(|err| Error::new("failed to build http client").with_source(err))?;
        Ok(Self::with_client(client, conn))
    }

    /// Create a client for the file endpoint of `conn` with a preconfigured [`reqwest::Client`].
    ///
    /// Use this to set timeouts, proxies or connection pooling; the appender imposes no timeout
    /// of its own.
    pub fn with_client(client: Client, conn: &ConnectionString) -> Self {
        Self {
            client,
            endpoint: conn.file_endpoint().clone(),
            sas: conn.shared_access_signature().map(str::to_owned),
        }
    }

    fn url(&self, share: &str, path: &str, query: &[(&str, &str)]) -> Url {
        let mut url = self.endpoint.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(share);
            segments.extend(path.split('/').filter(|s| !s.is_empty()));
        }

        let mut params = query
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>();
        if let Some(sas) = &self.sas {
            params.push(sas.clone());
        }
        if !params.is_empty() {
            url.set_query(Some(&params.join("&")));
        }
        url
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("x-ms-version", API_VERSION)
    }

    /// Send a request; `Ok(None)` means the resource was not found.
    async fn send(
        &self,
        operation: &'static str,
        path: &str,
        request: RequestBuilder,
    ) -> Result<Option<Response>, Error> {
        let response = request.send().await.map_err(|err| {
            Error::storage("failed to send request")
                .with_context("operation", operation)
                .with_context("path", path)
                .with_source(err)
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if status.is_success() {
            return Ok(Some(response));
        }
        Err(unexpected_status(operation, path, response).await)
    }

    async fn exists(
        &self,
        operation: &'static str,
        path: &str,
        url: Url,
    ) -> Result<bool, Error> {
        let request = self.request(Method::HEAD, url);
        Ok(self.send(operation, path, request).await?.is_some())
    }

    async fn expect_found(
        &self,
        operation: &'static str,
        path: &str,
        request: RequestBuilder,
    ) -> Result<Response, Error> {
        match self.send(operation, path, request).await? {
            Some(response) => Ok(response),
            None => Err(Error::storage("resource not found")
                .with_context("operation", operation)
                .with_context("path", path)
                .with_context("status", StatusCode::NOT_FOUND)),
        }
    }
}

async fn unexpected_status(operation: &'static str, path: &str, response: Response) -> Error {
    let status = response.status();
    let error_code = response
        .headers()
        .get("x-ms-error-code")
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let body = response.text().await.unwrap_or_default();

    let mut err = Error::storage("unexpected response status")
        .with_context("operation", operation)
        .with_context("path", path)
        .with_context("status", status);
    if let Some(code) = error_code {
        err = err.with_context("error_code", code);
    }
    if !body.is_empty() {
        err = err.with_context("response", body);
    }
    err
}

#[async_trait::async_trait]
impl FileShareClient for HttpFileShareClient {
    async fn share_exists(&self, share: &str) -> Result<bool, Error> {
        let url = self.url(share, "", &[("restype", "share")]);
        self.exists("share_exists", share, url).await
    }

    async fn directory_exists(&self, share: &str, path: &str) -> Result<bool, Error> {
        let url = self.url(share, path, &[("restype", "directory")]);
        self.exists("directory_exists", path, url).await
    }

    async fn create_directory(&self, share: &str, path: &str) -> Result<(), Error> {
        let url = self.url(share, path, &[("restype", "directory")]);
        let request = self
            .request(Method::PUT, url)
            .header(CONTENT_LENGTH, 0)
            .header("x-ms-file-attributes", "Directory")
            .header("x-ms-file-creation-time", "now")
            .header("x-ms-file-last-write-time", "now")
            .header("x-ms-file-permission", "inherit");

        let operation = "create_directory";
        let response = request.send().await.map_err(|err| {
            Error::storage("failed to send request")
                .with_context("operation", operation)
                .with_context("path", path)
                .with_source(err)
        })?;

        // created concurrently by another writer
        if response.status().is_success() || response.status() == StatusCode::CONFLICT {
            return Ok(());
        }
        Err(unexpected_status(operation, path, response).await)
    }

    async fn file_exists(&self, share: &str, path: &str) -> Result<bool, Error> {
        let url = self.url(share, path, &[]);
        self.exists("file_exists", path, url).await
    }

    async fn file_length(&self, share: &str, path: &str) -> Result<u64, Error> {
        let operation = "file_length";
        let url = self.url(share, path, &[]);
        let request = self.request(Method::HEAD, url);
        let response = self.expect_found(operation, path, request).await?;

        response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .ok_or_else(|| {
                Error::storage("missing or invalid content length in file properties")
                    .with_context("operation", operation)
                    .with_context("path", path)
            })
    }

    async fn create_file(&self, share: &str, path: &str, size: u64) -> Result<(), Error> {
        let url = self.url(share, path, &[]);
        let request = self
            .request(Method::PUT, url)
            .header(CONTENT_LENGTH, 0)
            .header("x-ms-type", "file")
            .header("x-ms-content-length", size)
            .header("x-ms-file-attributes", "None")
            .header("x-ms-file-creation-time", "now")
            .header("x-ms-file-last-write-time", "now")
            .header("x-ms-file-permission", "inherit");
        self.expect_found("create_file", path, request).await?;
        Ok(())
    }

    async fn resize_file(&self, share: &str, path: &str, size: u64) -> Result<(), Error> {
        let url = self.url(share, path, &[("comp", "properties")]);
        let request = self
            .request(Method::PUT, url)
            .header(CONTENT_LENGTH, 0)
            .header("x-ms-content-length", size)
            .header("x-ms-file-attributes", "preserve")
            .header("x-ms-file-creation-time", "preserve")
            .header("x-ms-file-last-write-time", "preserve")
            .header("x-ms-file-permission", "preserve");
        self.expect_found("resize_file", path, request).await?;
        Ok(())
    }

    async fn write_range(
        &self,
        share: &str,
        path: &str,
        offset: u64,
        data: &[u8],
    ) -> Result<(), Error> {
        let mut start = offset;
        for chunk in data.chunks(MAX_RANGE_SIZE) {
            let end = start + chunk.len() as u64 - 1;
            let url = self.url(share, path, &[("comp", "range")]);
            let request = self
                .request(Method::PUT, url)
                .header(CONTENT_LENGTH, chunk.len())
                .header("x-ms-range", format!("bytes={start}-{end}"))
                .header("x-ms-write", "update")
                .body(chunk.to_vec());
            self.expect_found("write_range", path, request).await?;
            start = end + 1;
        }
        Ok(())
    }
}
