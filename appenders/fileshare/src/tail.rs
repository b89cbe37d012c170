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

use sharelog_core::Error;

use crate::share::Directory;

/// Append `payload` to the file `file_name` in `directory`, creating the file if needed.
///
/// The service has no append primitive. The file is grown by the payload length and the payload
/// is written into the new tail. The length is read right before growing so the tail offset
/// accounts for writes made through any other handle.
///
/// Two appends to the same file must not overlap; see [`WriteCoordinator`].
///
/// [`WriteCoordinator`]: crate::coordinator::WriteCoordinator
pub(crate) async fn append(
    directory: &Directory,
    file_name: &str,
    payload: &[u8],
) -> Result<(), Error> {
    let file = directory.file(file_name);
    let len = payload.len() as u64;

    let new_len = if file.exists().await? {
        let new_len = file.length().await? + len;
        file.resize(new_len).await?;
        new_len
    } else {
        file.create(len).await?;
        log::trace!("created file {}", file.path());
        len
    };

    file.write_at(new_len - len, payload).await
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::client::FileShareClient;
    use crate::memory::Call;
    use crate::memory::InMemoryFileShare;
    use crate::memory::Operation;
    use crate::path::DirectoryPath;
    use crate::share::Share;

    fn directory(fs: &Arc<InMemoryFileShare>, folder: &str) -> Directory {
        Share::new(fs.clone(), "logs").directory(DirectoryPath::parse(folder))
    }

    #[tokio::test]
    async fn creates_then_grows() {
        let fs = Arc::new(InMemoryFileShare::new().with_share("logs"));
        let dir = directory(&fs, "");

        append(&dir, "app.log", b"hello\n").await.unwrap();
        append(&dir, "app.log", b"world\n").await.unwrap();

        assert_eq!(fs.file_content("logs", "app.log").unwrap(), b"hello\nworld\n");
        let path = || "app.log".to_owned();
        assert_eq!(
            fs.calls(),
            vec![
                Call::FileExists { path: path() },
                Call::CreateFile {
                    path: path(),
                    size: 6
                },
                Call::WriteRange {
                    path: path(),
                    offset: 0,
                    len: 6
                },
                Call::FileExists { path: path() },
                Call::FileLength { path: path() },
                Call::ResizeFile {
                    path: path(),
                    size: 12
                },
                Call::WriteRange {
                    path: path(),
                    offset: 6,
                    len: 6
                },
            ]
        );
    }

    #[tokio::test]
    async fn tail_follows_foreign_writes() {
        let fs = Arc::new(InMemoryFileShare::new().with_share("logs"));
        let dir = directory(&fs, "");
        append(&dir, "app.log", b"one\n").await.unwrap();

        // another process grows the file behind our back
        fs.resize_file("logs", "app.log", 8).await.unwrap();
        fs.write_range("logs", "app.log", 4, b"two\n").await.unwrap();

        append(&dir, "app.log", b"three\n").await.unwrap();
        assert_eq!(
            fs.file_content("logs", "app.log").unwrap(),
            b"one\ntwo\nthree\n"
        );
    }

    #[tokio::test]
    async fn failed_write_keeps_prior_content() {
        let fs = Arc::new(InMemoryFileShare::new().with_share("logs"));
        let dir = directory(&fs, "");
        append(&dir, "app.log", b"one\n").await.unwrap();

        fs.fail_next(Operation::ResizeFile);
        assert!(append(&dir, "app.log", b"two\n").await.is_err());
        assert_eq!(fs.file_content("logs", "app.log").unwrap(), b"one\n");

        append(&dir, "app.log", b"two\n").await.unwrap();
        assert_eq!(fs.file_content("logs", "app.log").unwrap(), b"one\ntwo\n");
    }

    #[tokio::test]
    async fn missing_directory_is_a_storage_error() {
        let fs = Arc::new(InMemoryFileShare::new().with_share("logs"));
        let dir = directory(&fs, "missing");

        let err = append(&dir, "app.log", b"x").await.unwrap_err();
        assert_eq!(err.kind(), sharelog_core::ErrorKind::Storage);
    }
}
