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

//! Appender for writing log records to files on a remote file share.
//!
//! The share is reached over HTTP, like Azure Files. The service has no append operation, so
//! each line is appended by growing the file and writing into the new tail. Missing directories
//! and files are created on first use.
//!
//! # Example
//!
//!```no_run
//! use log::LevelFilter;
//! use sharelog_append_fileshare::FileShareBuilder;
//!
//! let append = FileShareBuilder::new(
//!     "AccountName=myaccount;SharedAccessSignature=sv=2022-11-02&sig=...",
//!     "logs",
//! )
//! .folder("{date:%Y/%m}")
//! .file("{date}.log")
//! .build_async()
//! .unwrap();
//!
//! sharelog_core::builder()
//!     .dispatch(|d| d.filter(LevelFilter::Info).append(append))
//!     .apply();
//!
//! log::info!("This log will be written to a file share.");
//! ```

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub use self::append::DEFAULT_FILE;
pub use self::append::DEFAULT_FOLDER;
pub use self::append::FileShare;
pub use self::append::FileShareBuilder;
pub use self::client::FileShareClient;
pub use self::connection::ConnectionString;
pub use self::http::HttpFileShareClient;
pub use self::path::DirectoryPath;
pub use self::queued::AsyncFileShare;
pub use self::queued::Overflow;
pub use self::target::FileShareTarget;
pub use self::template::PathTemplate;
pub use self::writer::DEFAULT_LINE_ENDING;
pub use self::writer::DEFAULT_NAME;
pub use self::writer::FileShareWriter;
pub use self::writer::FileShareWriterBuilder;

pub mod memory;

mod append;
mod client;
mod connection;
mod coordinator;
mod http;
mod path;
mod provision;
mod queued;
mod session;
mod share;
mod tail;
mod target;
mod template;
mod writer;
