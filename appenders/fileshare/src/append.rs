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

use log::Record;
use sharelog_core::Append;
use sharelog_core::Error;
use sharelog_core::Layout;
use sharelog_core::Trap;
use sharelog_core::layout::PlainTextLayout;
use sharelog_core::trap::DefaultTrap;

use crate::client::FileShareClient;
use crate::queued::AsyncFileShare;
use crate::queued::Overflow;
use crate::target::FileShareTarget;
use crate::target::destination;
use crate::target::is_empty_message;
use crate::target::is_internal;
use crate::template::PathTemplate;
use crate::writer::FileShareWriter;
use crate::writer::FileShareWriterBuilder;

/// The folder template unless configured otherwise: the share root.
pub const DEFAULT_FOLDER: &str = "";

/// The file template unless configured otherwise.
pub const DEFAULT_FILE: &str = "{date}.log";

/// An appender that writes log records to files on a remote file share, blocking until each
/// record is written.
///
/// Errors are reported to the trap and returned to the caller.
///
/// # Examples
///
/// ```no_run
/// use sharelog_append_fileshare::FileShareBuilder;
///
/// let append = FileShareBuilder::new(
///     "AccountName=myaccount;SharedAccessSignature=sv=2022-11-02&sig=...",
///     "logs",
/// )
/// .folder("{date:%Y/%m}")
/// .file("{date}.log")
/// .build()
/// .unwrap();
/// ```
#[derive(Debug)]
pub struct FileShare {
    writer: FileShareWriter,
    folder: PathTemplate,
    file: PathTemplate,
    layout: Box<dyn Layout>,
    trap: Box<dyn Trap>,
}

impl FileShare {
    fn write(&self, record: &Record) -> Result<(), Error> {
        let dest = destination(self, record)?;
        let line = self
            .layout
            .format(record)
            .map_err(|err| err.with_context("target", self.name()))?;
        self.writer.write_blocking(&dest.folder, &dest.file, &line)
    }
}

impl FileShareTarget for FileShare {
    fn name(&self) -> &str {
        self.writer.name()
    }

    fn connection_string(&self) -> &str {
        self.writer.connection_string()
    }

    fn share_name(&self) -> &str {
        self.writer.share_name()
    }

    fn folder_layout(&self) -> &PathTemplate {
        &self.folder
    }

    fn file_layout(&self) -> &PathTemplate {
        &self.file
    }
}

impl Append for FileShare {
    fn append(&self, record: &Record) -> Result<(), Error> {
        if is_internal(record) || is_empty_message(record) {
            return Ok(());
        }

        self.write(record).inspect_err(|err| self.trap.trap(err))
    }
}

/// A builder for configuring the file-share appenders.
pub struct FileShareBuilder {
    writer: FileShareWriterBuilder,
    folder: String,
    file: String,
    layout: Box<dyn Layout>,
    trap: Box<dyn Trap>,
    buffered_lines_limit: Option<usize>,
    overflow: Overflow,
}

impl FileShareBuilder {
    /// Create a builder for appenders writing to the share `share_name`.
    ///
    /// The connection string is only parsed on the first write. Errors in it are reported then,
    /// on every write, until it is fixed.
    pub fn new(connection_string: impl Into<String>, share_name: impl Into<String>) -> Self {
        FileShareBuilder {
            writer: FileShareWriterBuilder::new(connection_string, share_name),
            folder: DEFAULT_FOLDER.to_owned(),
            file: DEFAULT_FILE.to_owned(),
            layout: Box::new(PlainTextLayout::default()),
            trap: Box::new(DefaultTrap::default()),
            buffered_lines_limit: None,
            overflow: Overflow::Block,
        }
    }

    /// Set the name of the appender, reported in errors and used to name its threads.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.writer = self.writer.name(name);
        self
    }

    /// Set the template of the folder records are written to. See [`PathTemplate`].
    pub fn folder(mut self, folder: impl Into<String>) -> Self {
        self.folder = folder.into();
        self
    }

    /// Set the template of the file name records are written to. See [`PathTemplate`].
    pub fn file(mut self, file: impl Into<String>) -> Self {
        self.file = file.into();
        self
    }

    /// Set the layout rendering each record into a line.
    pub fn layout(mut self, layout: impl Into<Box<dyn Layout>>) -> Self {
        self.layout = layout.into();
        self
    }

    /// Set the trap receiving write errors.
    pub fn trap(mut self, trap: impl Into<Box<dyn Trap>>) -> Self {
        self.trap = trap.into();
        self
    }

    /// Set the terminator appended to every line.
    ///
    /// Default to `\r\n` on Windows and `\n` elsewhere.
    pub fn line_ending(mut self, line_ending: impl Into<String>) -> Self {
        self.writer = self.writer.line_ending(line_ending);
        self
    }

    /// Set the storage client, instead of an HTTP client for the connection string's endpoint.
    pub fn client(mut self, client: Arc<dyn FileShareClient>) -> Self {
        self.writer = self.writer.client(client);
        self
    }

    /// Set the number of records the queued appender buffers. Unbounded by default.
    pub fn buffered_lines_limit(mut self, buffered_lines_limit: Option<usize>) -> Self {
        self.buffered_lines_limit = buffered_lines_limit;
        self
    }

    /// Make the queued appender block when its buffer is full.
    pub fn overflow_block(mut self) -> Self {
        self.overflow = Overflow::Block;
        self
    }

    /// Make the queued appender drop incoming records when its buffer is full.
    pub fn overflow_drop_incoming(mut self) -> Self {
        self.overflow = Overflow::DropIncoming;
        self
    }

    /// Build an appender that writes each record before returning.
    ///
    /// # Errors
    ///
    /// Return a configuration error if a template is invalid.
    pub fn build(self) -> Result<FileShare, Error> {
        let Self {
            writer,
            folder,
            file,
            layout,
            trap,
            buffered_lines_limit: _,
            overflow: _,
        } = self;

        Ok(FileShare {
            folder: PathTemplate::parse(&folder)?,
            file: PathTemplate::parse(&file)?,
            writer: writer.build()?,
            layout,
            trap,
        })
    }

    /// Build an appender that queues records and writes them on a background thread.
    ///
    /// # Errors
    ///
    /// Return a configuration error if a template is invalid, or an error if the background
    /// thread cannot be started.
    pub fn build_async(self) -> Result<AsyncFileShare, Error> {
        let Self {
            writer,
            folder,
            file,
            layout,
            trap,
            buffered_lines_limit,
            overflow,
        } = self;

        let folder = PathTemplate::parse(&folder)?;
        let file = PathTemplate::parse(&file)?;
        let writer = writer.build()?;
        AsyncFileShare::new(
            writer,
            folder,
            file,
            layout,
            Arc::from(trap),
            buffered_lines_limit,
            overflow,
        )
    }

    /// Build only the writer, for appending lines without going through `log`.
    pub fn build_writer(self) -> Result<FileShareWriter, Error> {
        self.writer.build()
    }
}
