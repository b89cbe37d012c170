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

//! An in-memory file share for tests.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

use sharelog_core::Error;

use crate::client::FileShareClient;

/// The kind of a [`FileShareClient`] operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ShareExists,
    DirectoryExists,
    CreateDirectory,
    FileExists,
    FileLength,
    CreateFile,
    ResizeFile,
    WriteRange,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::ShareExists => "share_exists",
            Operation::DirectoryExists => "directory_exists",
            Operation::CreateDirectory => "create_directory",
            Operation::FileExists => "file_exists",
            Operation::FileLength => "file_length",
            Operation::CreateFile => "create_file",
            Operation::ResizeFile => "resize_file",
            Operation::WriteRange => "write_range",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A call received by an [`InMemoryFileShare`], in the order it was received.
///
/// Paths are relative to the share root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ShareExists { share: String },
    DirectoryExists { path: String },
    CreateDirectory { path: String },
    FileExists { path: String },
    FileLength { path: String },
    CreateFile { path: String, size: u64 },
    ResizeFile { path: String, size: u64 },
    WriteRange { path: String, offset: u64, len: u64 },
}

impl Call {
    pub fn operation(&self) -> Operation {
        match self {
            Call::ShareExists { .. } => Operation::ShareExists,
            Call::DirectoryExists { .. } => Operation::DirectoryExists,
            Call::CreateDirectory { .. } => Operation::CreateDirectory,
            Call::FileExists { .. } => Operation::FileExists,
            Call::FileLength { .. } => Operation::FileLength,
            Call::CreateFile { .. } => Operation::CreateFile,
            Call::ResizeFile { .. } => Operation::ResizeFile,
            Call::WriteRange { .. } => Operation::WriteRange,
        }
    }

    /// Whether this call changes remote state.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Call::CreateDirectory { .. }
                | Call::CreateFile { .. }
                | Call::ResizeFile { .. }
                | Call::WriteRange { .. }
        )
    }
}

#[derive(Debug, Default)]
struct ShareState {
    directories: BTreeSet<String>,
    files: BTreeMap<String, Vec<u8>>,
}

impl ShareState {
    fn has_parent(&self, path: &str) -> bool {
        match path.rsplit_once('/') {
            None => true,
            Some((parent, _)) => self.directories.contains(parent),
        }
    }
}

#[derive(Debug, Default)]
struct State {
    shares: BTreeMap<String, ShareState>,
    calls: Vec<Call>,
    failures: HashMap<Operation, usize>,
}

impl State {
    fn record(&mut self, call: Call) -> Result<(), Error> {
        let operation = call.operation();
        self.calls.push(call);
        match self.failures.get_mut(&operation) {
            Some(pending) if *pending > 0 => {
                *pending -= 1;
                Err(Error::storage("injected failure").with_context("operation", operation))
            }
            _ => Ok(()),
        }
    }
}

/// A [`FileShareClient`] that keeps shares, directories and files in memory.
///
/// It enforces the rules of the remote service that the append protocol depends on: a directory
/// or file can only be created once its parent exists, and a ranged write must lie within the
/// current length of the file. Every call is recorded and can be inspected with
/// [`InMemoryFileShare::calls`].
///
/// Every operation yields to the async runtime before it takes effect, so concurrent callers
/// interleave the way they would against a remote service.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use sharelog_append_fileshare::FileShareWriter;
/// use sharelog_append_fileshare::memory::InMemoryFileShare;
///
/// let share = Arc::new(InMemoryFileShare::new().with_share("logs"));
/// let writer = FileShareWriter::builder("FileEndpoint=http://127.0.0.1:10000", "logs")
///     .client(share.clone())
///     .line_ending("\n")
///     .build()
///     .unwrap();
///
/// writer.write_blocking("2024/05", "app.log", b"hello").unwrap();
/// assert_eq!(
///     share.file_content("logs", "2024/05/app.log").unwrap(),
///     b"hello\n"
/// );
/// ```
#[derive(Debug, Default)]
pub struct InMemoryFileShare {
    state: Mutex<State>,
}

impl InMemoryFileShare {
    /// Create an empty service without any share.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an empty share named `name`.
    pub fn with_share(self, name: impl Into<String>) -> Self {
        self.create_share(name);
        self
    }

    /// Add an empty share named `name`, if it does not exist yet.
    pub fn create_share(&self, name: impl Into<String>) {
        self.state().shares.entry(name.into()).or_default();
    }

    /// Whether `path` is a directory in `share`.
    pub fn has_directory(&self, share: &str, path: &str) -> bool {
        self.state()
            .shares
            .get(share)
            .is_some_and(|s| s.directories.contains(path))
    }

    /// The content of the file at `path` in `share`, if it exists.
    pub fn file_content(&self, share: &str, path: &str) -> Option<Vec<u8>> {
        self.state().shares.get(share)?.files.get(path).cloned()
    }

    /// All calls received so far.
    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    /// Forget the calls received so far.
    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    /// Make the next call of `operation` fail with a storage error.
    ///
    /// Calling this several times queues several failures.
    pub fn fail_next(&self, operation: Operation) {
        *self.state().failures.entry(operation).or_default() += 1;
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record `call`, then apply `f` to the share unless a failure is pending.
    async fn call<T>(
        &self,
        share: &str,
        call: Call,
        f: impl FnOnce(&mut ShareState) -> Result<T, Error>,
    ) -> Result<T, Error> {
        tokio::task::yield_now().await;

        let mut state = self.state();
        let operation = call.operation();
        state.record(call)?;
        match state.shares.get_mut(share) {
            Some(share) => f(share),
            None => Err(Error::storage("share not found")
                .with_context("operation", operation)
                .with_context("share", share)),
        }
    }
}

fn not_found(operation: Operation, path: &str) -> Error {
    Error::storage("resource not found")
        .with_context("operation", operation)
        .with_context("path", path)
}

#[async_trait::async_trait]
impl FileShareClient for InMemoryFileShare {
    async fn share_exists(&self, share: &str) -> Result<bool, Error> {
        tokio::task::yield_now().await;

        let mut state = self.state();
        state.record(Call::ShareExists {
            share: share.to_owned(),
        })?;
        Ok(state.shares.contains_key(share))
    }

    async fn directory_exists(&self, share: &str, path: &str) -> Result<bool, Error> {
        let call = Call::DirectoryExists {
            path: path.to_owned(),
        };
        self.call(share, call, |s| {
            Ok(path.is_empty() || s.directories.contains(path))
        })
        .await
    }

    async fn create_directory(&self, share: &str, path: &str) -> Result<(), Error> {
        let call = Call::CreateDirectory {
            path: path.to_owned(),
        };
        self.call(share, call, |s| {
            if !s.has_parent(path) {
                return Err(not_found(Operation::CreateDirectory, path)
                    .with_context("reason", "parent directory does not exist"));
            }
            s.directories.insert(path.to_owned());
            Ok(())
        })
        .await
    }

    async fn file_exists(&self, share: &str, path: &str) -> Result<bool, Error> {
        let call = Call::FileExists {
            path: path.to_owned(),
        };
        self.call(share, call, |s| Ok(s.files.contains_key(path)))
            .await
    }

    async fn file_length(&self, share: &str, path: &str) -> Result<u64, Error> {
        let call = Call::FileLength {
            path: path.to_owned(),
        };
        self.call(share, call, |s| match s.files.get(path) {
            Some(content) => Ok(content.len() as u64),
            None => Err(not_found(Operation::FileLength, path)),
        })
        .await
    }

    async fn create_file(&self, share: &str, path: &str, size: u64) -> Result<(), Error> {
        let call = Call::CreateFile {
            path: path.to_owned(),
            size,
        };
        self.call(share, call, |s| {
            if !s.has_parent(path) {
                return Err(not_found(Operation::CreateFile, path)
                    .with_context("reason", "parent directory does not exist"));
            }
            s.files.insert(path.to_owned(), vec![0; size as usize]);
            Ok(())
        })
        .await
    }

    async fn resize_file(&self, share: &str, path: &str, size: u64) -> Result<(), Error> {
        let call = Call::ResizeFile {
            path: path.to_owned(),
            size,
        };
        self.call(share, call, |s| match s.files.get_mut(path) {
            Some(content) => {
                content.resize(size as usize, 0);
                Ok(())
            }
            None => Err(not_found(Operation::ResizeFile, path)),
        })
        .await
    }

    async fn write_range(
        &self,
        share: &str,
        path: &str,
        offset: u64,
        data: &[u8],
    ) -> Result<(), Error> {
        let call = Call::WriteRange {
            path: path.to_owned(),
            offset,
            len: data.len() as u64,
        };
        self.call(share, call, |s| {
            let Some(content) = s.files.get_mut(path) else {
                return Err(not_found(Operation::WriteRange, path));
            };
            let start = offset as usize;
            let end = start + data.len();
            if end > content.len() {
                return Err(Error::storage("range exceeds the file length")
                    .with_context("operation", Operation::WriteRange)
                    .with_context("path", path)
                    .with_context("range", format!("{start}-{end}"))
                    .with_context("length", content.len()));
            }
            content[start..end].copy_from_slice(data);
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn children_require_parents() {
        let fs = InMemoryFileShare::new().with_share("logs");

        let err = fs.create_directory("logs", "a/b").await.unwrap_err();
        assert_eq!(err.kind(), sharelog_core::ErrorKind::Storage);
        let err = fs.create_file("logs", "a/app.log", 1).await.unwrap_err();
        assert_eq!(err.kind(), sharelog_core::ErrorKind::Storage);

        fs.create_directory("logs", "a").await.unwrap();
        fs.create_directory("logs", "a/b").await.unwrap();
        fs.create_file("logs", "a/b/app.log", 3).await.unwrap();
        assert!(fs.has_directory("logs", "a/b"));
        assert_eq!(fs.file_content("logs", "a/b/app.log").unwrap(), vec![0; 3]);
    }

    #[tokio::test]
    async fn writes_stay_inside_the_file() {
        let fs = InMemoryFileShare::new().with_share("logs");
        fs.create_file("logs", "app.log", 2).await.unwrap();

        fs.write_range("logs", "app.log", 0, b"ok").await.unwrap();
        assert!(fs.write_range("logs", "app.log", 1, b"ok").await.is_err());

        fs.resize_file("logs", "app.log", 4).await.unwrap();
        fs.write_range("logs", "app.log", 2, b"!!").await.unwrap();
        assert_eq!(fs.file_content("logs", "app.log").unwrap(), b"ok!!");
        assert_eq!(fs.file_length("logs", "app.log").await.unwrap(), 4);
    }

    #[tokio::test]
    async fn injected_failures_fire_once() {
        let fs = InMemoryFileShare::new().with_share("logs");
        fs.fail_next(Operation::ShareExists);

        let err = fs.share_exists("logs").await.unwrap_err();
        assert_eq!(err.context("operation"), Some("share_exists"));
        assert!(fs.share_exists("logs").await.unwrap());
        assert!(!fs.share_exists("missing").await.unwrap());

        assert_eq!(
            fs.calls(),
            vec![
                Call::ShareExists {
                    share: "logs".to_owned()
                },
                Call::ShareExists {
                    share: "logs".to_owned()
                },
                Call::ShareExists {
                    share: "missing".to_owned()
                },
            ]
        );
    }

    #[tokio::test]
    async fn root_directory_always_exists() {
        let fs = InMemoryFileShare::new().with_share("logs");
        assert!(fs.directory_exists("logs", "").await.unwrap());
        assert!(!fs.directory_exists("logs", "a").await.unwrap());
        assert!(fs.directory_exists("missing", "").await.is_err());
    }
}
