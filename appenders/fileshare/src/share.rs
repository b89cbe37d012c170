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

//! Handles onto a remote share and the directories and files inside it.
//!
//! Handles are cheap references; they do not cache any remote state. Every query goes to the
//! service.

use std::sync::Arc;

use sharelog_core::Error;

use crate::client::FileShareClient;
use crate::path::DirectoryPath;

/// A resolved share: a storage client bound to one share name.
#[derive(Debug, Clone)]
pub(crate) struct Share {
    client: Arc<dyn FileShareClient>,
    name: Arc<str>,
}

impl Share {
    pub(crate) fn new(client: Arc<dyn FileShareClient>, name: &str) -> Self {
        Self {
            client,
            name: Arc::from(name),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) async fn exists(&self) -> Result<bool, Error> {
        self.client.share_exists(&self.name).await
    }

    pub(crate) fn directory(&self, path: DirectoryPath) -> Directory {
        Directory {
            share: self.clone(),
            path,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Directory {
    share: Share,
    path: DirectoryPath,
}

impl Directory {
    pub(crate) fn path(&self) -> &DirectoryPath {
        &self.path
    }

    pub(crate) async fn exists(&self) -> Result<bool, Error> {
        let Share { client, name } = &self.share;
        client.directory_exists(name, &self.path.to_string()).await
    }

    pub(crate) async fn create(&self) -> Result<(), Error> {
        let Share { client, name } = &self.share;
        client.create_directory(name, &self.path.to_string()).await
    }

    pub(crate) fn file(&self, name: &str) -> RemoteFile {
        RemoteFile {
            share: self.share.clone(),
            path: self.path.file_path(name),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct RemoteFile {
    share: Share,
    path: String,
}

impl RemoteFile {
    pub(crate) fn path(&self) -> &str {
        &self.path
    }

    pub(crate) async fn exists(&self) -> Result<bool, Error> {
        let Share { client, name } = &self.share;
        client.file_exists(name, &self.path).await
    }

    pub(crate) async fn length(&self) -> Result<u64, Error> {
        let Share { client, name } = &self.share;
        client.file_length(name, &self.path).await
    }

    pub(crate) async fn create(&self, size: u64) -> Result<(), Error> {
        let Share { client, name } = &self.share;
        client.create_file(name, &self.path, size).await
    }

    pub(crate) async fn resize(&self, size: u64) -> Result<(), Error> {
        let Share { client, name } = &self.share;
        client.resize_file(name, &self.path, size).await
    }

    pub(crate) async fn write_at(&self, offset: u64, data: &[u8]) -> Result<(), Error> {
        let Share { client, name } = &self.share;
        client.write_range(name, &self.path, offset, data).await
    }
}
