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

/// The remote storage operations the appender relies on.
///
/// Paths are `/`-separated and relative to the share root; the empty path is the root directory.
/// Every call is a fallible remote call: implementations return [`ErrorKind::Storage`] errors and
/// must not retry on their own.
///
/// [`ErrorKind::Storage`]: sharelog_core::ErrorKind::Storage
#[async_trait::async_trait]
pub trait FileShareClient: fmt::Debug + Send + Sync + 'static {
    /// Whether the share exists.
    async fn share_exists(&self, share: &str) -> Result<bool, Error>;

    /// Whether the directory exists.
    async fn directory_exists(&self, share: &str, path: &str) -> Result<bool, Error>;

    /// Create a directory whose parent already exists.
    async fn create_directory(&self, share: &str, path: &str) -> Result<(), Error>;

    /// Whether the file exists.
    async fn file_exists(&self, share: &str, path: &str) -> Result<bool, Error>;

    /// The current length of the file in bytes, as reported by the service.
    async fn file_length(&self, share: &str, path: &str) -> Result<u64, Error>;

    /// Create a file of `size` bytes, replacing any file at the same path.
    async fn create_file(&self, share: &str, path: &str, size: u64) -> Result<(), Error>;

    /// Set the length of the file to `size` bytes.
    async fn resize_file(&self, share: &str, path: &str, size: u64) -> Result<(), Error>;

    /// Write `data` into the file starting at `offset`.
    ///
    /// The range must lie within the current length of the file.
    async fn write_range(
        &self,
        share: &str,
        path: &str,
        offset: u64,
        data: &[u8],
    ) -> Result<(), Error>;
}
