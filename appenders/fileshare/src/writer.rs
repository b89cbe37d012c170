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

use std::sync::Arc;

use sharelog_core::Error;

use crate::client::FileShareClient;
use crate::coordinator::WriteCoordinator;
use crate::provision;
use crate::session::ShareSession;
use crate::tail;

/// The line terminator appended to every line unless configured otherwise.
pub const DEFAULT_LINE_ENDING: &str = if cfg!(windows) { "\r\n" } else { "\n" };

/// The name of a writer unless configured otherwise.
pub const DEFAULT_NAME: &str = "fileshare";

/// Appends lines to files on one remote file share.
///
/// A writer connects to its share on the first write and remembers it afterwards. Writes made
/// through one writer, or any of its clones, are applied one at a time in the order they were
/// issued; the file content is the concatenation of the lines in that order. Writers do not
/// coordinate with other writers, in this process or elsewhere, that target the same files.
///
/// # Examples
///
/// ```no_run
/// use sharelog_append_fileshare::FileShareWriter;
///
/// # async fn run() -> Result<(), sharelog_core::Error> {
/// let writer = FileShareWriter::builder(
///     "AccountName=myaccount;SharedAccessSignature=sv=2022-11-02&sig=...",
///     "logs",
/// )
/// .build()?;
///
/// writer.write("2024/05", "app.log", b"hello").await?;
/// writer.write_blocking("2024/05", "app.log", b"world")?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct FileShareWriter {
    inner: Arc<WriterInner>,
}

#[derive(Debug)]
struct WriterInner {
    name: String,
    session: Arc<ShareSession>,
    line_ending: Box<[u8]>,
    coordinator: WriteCoordinator,
}

impl FileShareWriter {
    /// Create a builder for a writer appending to files in the share `share_name`.
    ///
    /// The connection string is only parsed on the first write.
    pub fn builder(
        connection_string: impl Into<String>,
        share_name: impl Into<String>,
    ) -> FileShareWriterBuilder {
        FileShareWriterBuilder::new(connection_string, share_name)
    }

    /// The name of this writer, used to identify it in errors.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn connection_string(&self) -> &str {
        self.inner.session.connection_string()
    }

    pub fn share_name(&self) -> &str {
        self.inner.session.share_name()
    }

    /// Append `line` and the line terminator to `file` in `folder`.
    ///
    /// Missing directories of `folder` and the file itself are created. A blank folder is the
    /// share root. An empty line is ignored without contacting the share.
    ///
    /// If the returned future is dropped before the write started, nothing is written. Once
    /// started, the write completes in the background.
    ///
    /// # Errors
    ///
    /// Return a configuration error if the connection string is invalid or the share does not
    /// exist, and a storage error if any remote call fails.
    pub async fn write(&self, folder: &str, file: &str, line: &[u8]) -> Result<(), Error> {
        if line.is_empty() {
            return Ok(());
        }

        let section = append_line(
            self.inner.session.clone(),
            folder.to_owned(),
            file.to_owned(),
            self.payload(line),
        );
        self.inner
            .coordinator
            .run(section)
            .await
            .map_err(|err| self.with_destination(err, folder, file))
    }

    /// Append `line` and the line terminator to `file` in `folder`, blocking until done.
    ///
    /// See [`FileShareWriter::write`].
    pub fn write_blocking(&self, folder: &str, file: &str, line: &[u8]) -> Result<(), Error> {
        if line.is_empty() {
            return Ok(());
        }

        let section = append_line(
            self.inner.session.clone(),
            folder.to_owned(),
            file.to_owned(),
            self.payload(line),
        );
        self.inner
            .coordinator
            .run_blocking(section)
            .map_err(|err| self.with_destination(err, folder, file))
    }

    fn payload(&self, line: &[u8]) -> Vec<u8> {
        let line_ending = &self.inner.line_ending;
        let mut payload = Vec::with_capacity(line.len() + line_ending.len());
        payload.extend_from_slice(line);
        payload.extend_from_slice(line_ending);
        payload
    }

    fn with_destination(&self, err: Error, folder: &str, file: &str) -> Error {
        err.with_context("target", &self.inner.name)
            .with_context("folder", folder)
            .with_context("file", file)
    }
}

async fn append_line(
    session: Arc<ShareSession>,
    folder: String,
    file: String,
    payload: Vec<u8>,
) -> Result<(), Error> {
    let share = session.resolve().await?;
    let directory = provision::ensure_path(&share, &folder).await?;
    tail::append(&directory, &file, &payload).await
}

/// A builder for configuring a [`FileShareWriter`].
pub struct FileShareWriterBuilder {
    name: String,
    connection_string: String,
    share_name: String,
    client: Option<Arc<dyn FileShareClient>>,
    line_ending: String,
}

impl FileShareWriterBuilder {
    pub fn new(
        connection_string: impl Into<String>,
        share_name: impl Into<String>,
    ) -> FileShareWriterBuilder {
        FileShareWriterBuilder {
            name: DEFAULT_NAME.to_owned(),
            connection_string: connection_string.into(),
            share_name: share_name.into(),
            client: None,
            line_ending: DEFAULT_LINE_ENDING.to_owned(),
        }
    }

    /// Set the name of the writer, also used to name its thread.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the storage client, instead of an HTTP client for the connection string's endpoint.
    ///
    /// The connection string is still validated on the first write.
    pub fn client(mut self, client: Arc<dyn FileShareClient>) -> Self {
        self.client = Some(client);
        self
    }

    /// Set the terminator appended to every line.
    pub fn line_ending(mut self, line_ending: impl Into<String>) -> Self {
        self.line_ending = line_ending.into();
        self
    }

    /// Build the writer.
    ///
    /// # Errors
    ///
    /// Return an error if the writer thread cannot be started.
    pub fn build(self) -> Result<FileShareWriter, Error> {
        let Self {
            name,
            connection_string,
            share_name,
            client,
            line_ending,
        } = self;

        let coordinator = WriteCoordinator::new(&name)?;
        let session = ShareSession::new(connection_string, share_name, client);
        Ok(FileShareWriter {
            inner: Arc::new(WriterInner {
                name,
                session: Arc::new(session),
                line_ending: line_ending.into_bytes().into_boxed_slice(),
                coordinator,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use sharelog_core::ErrorKind;

    use super::*;
    use crate::memory::InMemoryFileShare;
    use crate::memory::Operation;

    const CONN: &str = "FileEndpoint=http://127.0.0.1:10000/devstoreaccount1";

    fn writer(fs: &Arc<InMemoryFileShare>) -> FileShareWriter {
        FileShareWriter::builder(CONN, "logs")
            .name("audit")
            .client(fs.clone())
            .line_ending("\r\n")
            .build()
            .unwrap()
    }

    #[test]
    fn empty_line_makes_no_calls() {
        let fs = Arc::new(InMemoryFileShare::new().with_share("logs"));
        let writer = writer(&fs);

        writer.write_blocking("a/b", "app.log", b"").unwrap();
        assert!(fs.calls().is_empty());
    }

    #[test]
    fn clones_share_one_session() {
        let fs = Arc::new(InMemoryFileShare::new().with_share("logs"));
        let writer = writer(&fs);
        let clone = writer.clone();

        writer.write_blocking("", "app.log", b"one").unwrap();
        clone.write_blocking("", "app.log", b"two").unwrap();

        assert_eq!(
            fs.file_content("logs", "app.log").unwrap(),
            b"one\r\ntwo\r\n"
        );
        let connects = fs
            .calls()
            .iter()
            .filter(|call| call.operation() == Operation::ShareExists)
            .count();
        assert_eq!(connects, 1);
    }

    #[tokio::test]
    async fn errors_name_the_destination() {
        let fs = Arc::new(InMemoryFileShare::new().with_share("logs"));
        fs.fail_next(Operation::CreateFile);
        let writer = writer(&fs);

        let err = writer.write("2024", "app.log", b"x").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);
        assert_eq!(err.context("target"), Some("audit"));
        assert_eq!(err.context("folder"), Some("2024"));
        assert_eq!(err.context("file"), Some("app.log"));
        assert_eq!(err.context("operation"), Some("create_file"));
    }
}
