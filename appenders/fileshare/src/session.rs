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
use std::sync::Arc;

use arc_swap::ArcSwap;
use sharelog_core::Error;

use crate::client::FileShareClient;
use crate::connection::ConnectionString;
use crate::http::HttpFileShareClient;
use crate::share::Share;

#[derive(Debug)]
enum SessionState {
    Unresolved,
    Resolved(Share),
    /// The last attempt failed; the next call tries again.
    Failed,
}

/// Lazily connects to the configured share and remembers it once the share is known to exist.
pub(crate) struct ShareSession {
    connection_string: String,
    share_name: String,
    client: Option<Arc<dyn FileShareClient>>,
    state: ArcSwap<SessionState>,
}

impl fmt::Debug for ShareSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShareSession")
            .field("connection_string", &"<redacted>")
            .field("share_name", &self.share_name)
            .field("client", &self.client)
            .field("state", &**self.state.load())
            .finish()
    }
}

impl ShareSession {
    /// `client` replaces the HTTP client derived from the connection string.
    pub(crate) fn new(
        connection_string: String,
        share_name: String,
        client: Option<Arc<dyn FileShareClient>>,
    ) -> Self {
        Self {
            connection_string,
            share_name,
            client,
            state: ArcSwap::from_pointee(SessionState::Unresolved),
        }
    }

    pub(crate) fn connection_string(&self) -> &str {
        &self.connection_string
    }

    pub(crate) fn share_name(&self) -> &str {
        &self.share_name
    }

    #[cfg(test)]
    pub(crate) fn is_resolved(&self) -> bool {
        matches!(**self.state.load(), SessionState::Resolved(_))
    }

    /// Return the share, connecting to it first if no earlier call succeeded.
    ///
    /// A missing share is a configuration error. Failures are not remembered.
    pub(crate) async fn resolve(&self) -> Result<Share, Error> {
        if let SessionState::Resolved(share) = &**self.state.load() {
            return Ok(share.clone());
        }

        match self.connect().await {
            Ok(share) => {
                self.state
                    .store(Arc::new(SessionState::Resolved(share.clone())));
                log::trace!("connected to share {}", share.name());
                Ok(share)
            }
            Err(err) => {
                self.state.store(Arc::new(SessionState::Failed));
                Err(err.with_context("share", &self.share_name))
            }
        }
    }

    async fn connect(&self) -> Result<Share, Error> {
        let conn = ConnectionString::parse(&self.connection_string)?;
        let client = match &self.client {
            Some(client) => client.clone(),
            None => Arc::new(HttpFileShareClient::new(&conn)?),
        };

        let share = Share::new(client, &self.share_name);
        if !share.exists().await? {
            return Err(Error::configuration("share not found"));
        }
        Ok(share)
    }
}

#[cfg(test)]
mod tests {
    use sharelog_core::ErrorKind;

    use super::*;
    use crate::memory::Call;
    use crate::memory::InMemoryFileShare;
    use crate::memory::Operation;

    const CONN: &str = "FileEndpoint=http://127.0.0.1:10000/devstoreaccount1";

    fn session(fs: &Arc<InMemoryFileShare>) -> ShareSession {
        ShareSession::new(CONN.to_owned(), "logs".to_owned(), Some(fs.clone()))
    }

    #[tokio::test]
    async fn resolves_once() {
        let fs = Arc::new(InMemoryFileShare::new().with_share("logs"));
        let session = session(&fs);
        assert!(!session.is_resolved());

        session.resolve().await.unwrap();
        session.resolve().await.unwrap();
        assert!(session.is_resolved());
        assert_eq!(
            fs.calls(),
            vec![Call::ShareExists {
                share: "logs".to_owned()
            }]
        );
    }

    #[tokio::test]
    async fn missing_share_is_a_configuration_error() {
        let fs = Arc::new(InMemoryFileShare::new());
        let session = session(&fs);

        let err = session.resolve().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert_eq!(err.context("share"), Some("logs"));
        assert!(!session.is_resolved());

        // not remembered: the share shows up later and the next call connects
        fs.create_share("logs");
        session.resolve().await.unwrap();
        assert!(session.is_resolved());
        assert_eq!(fs.calls().len(), 2);
    }

    #[tokio::test]
    async fn storage_failures_are_retried() {
        let fs = Arc::new(InMemoryFileShare::new().with_share("logs"));
        fs.fail_next(Operation::ShareExists);
        let session = session(&fs);

        let err = session.resolve().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);
        session.resolve().await.unwrap();
    }

    #[tokio::test]
    async fn malformed_connection_string_makes_no_calls() {
        let fs = Arc::new(InMemoryFileShare::new().with_share("logs"));
        let session =
            ShareSession::new("AccountName".to_owned(), "logs".to_owned(), Some(fs.clone()));

        let err = session.resolve().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(fs.calls().is_empty());
    }

    #[test]
    fn debug_hides_connection_string() {
        let session = ShareSession::new(
            "FileEndpoint=http://x;SharedAccessSignature=sig=secret".to_owned(),
            "logs".to_owned(),
            None,
        );
        let debug = format!("{session:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("Unresolved"));
    }
}
