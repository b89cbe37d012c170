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

use crate::path::DirectoryPath;
use crate::share::Directory;
use crate::share::Share;

/// Make sure every directory of `folder` exists in `share`, creating missing ones parent first.
///
/// A blank folder is the share root and needs no remote call. An existing folder costs a single
/// existence check.
pub(crate) async fn ensure_path(share: &Share, folder: &str) -> Result<Directory, Error> {
    let path = DirectoryPath::parse(folder);
    let target = share.directory(path.clone());
    if path.is_root() || target.exists().await? {
        return Ok(target);
    }

    for prefix in path.prefixes() {
        let directory = share.directory(prefix);
        if !directory.exists().await? {
            directory.create().await?;
            log::trace!(
                "created directory {} in share {}",
                directory.path(),
                share.name()
            );
        }
    }
    Ok(target)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::memory::Call;
    use crate::memory::InMemoryFileShare;
    use crate::memory::Operation;

    fn share(fs: &Arc<InMemoryFileShare>) -> Share {
        Share::new(fs.clone(), "logs")
    }

    fn created(fs: &InMemoryFileShare) -> Vec<String> {
        fs.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::CreateDirectory { path } => Some(path),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn creates_parents_first() {
        let fs = Arc::new(InMemoryFileShare::new().with_share("logs"));
        let dir = ensure_path(&share(&fs), "a/b/c").await.unwrap();

        assert_eq!(dir.path().to_string(), "a/b/c");
        assert_eq!(created(&fs), ["a", "a/b", "a/b/c"]);
        assert!(fs.has_directory("logs", "a/b/c"));
    }

    #[tokio::test]
    async fn existing_path_short_circuits() {
        let fs = Arc::new(InMemoryFileShare::new().with_share("logs"));
        ensure_path(&share(&fs), "a/b").await.unwrap();
        fs.clear_calls();

        ensure_path(&share(&fs), "a/b").await.unwrap();
        assert_eq!(
            fs.calls(),
            vec![Call::DirectoryExists {
                path: "a/b".to_owned()
            }]
        );
    }

    #[tokio::test]
    async fn only_missing_levels_are_created() {
        let fs = Arc::new(InMemoryFileShare::new().with_share("logs"));
        ensure_path(&share(&fs), "a").await.unwrap();
        fs.clear_calls();

        ensure_path(&share(&fs), "a\\b//c/").await.unwrap();
        assert_eq!(created(&fs), ["a/b", "a/b/c"]);
    }

    #[tokio::test]
    async fn blank_folder_is_the_root() {
        let fs = Arc::new(InMemoryFileShare::new().with_share("logs"));
        for folder in ["", "  ", "/"] {
            let dir = ensure_path(&share(&fs), folder).await.unwrap();
            assert!(dir.path().is_root());
        }
        assert!(fs.calls().is_empty());
    }

    #[tokio::test]
    async fn failure_stops_the_walk() {
        let fs = Arc::new(InMemoryFileShare::new().with_share("logs"));
        fs.fail_next(Operation::CreateDirectory);

        assert!(ensure_path(&share(&fs), "a/b").await.is_err());
        assert_eq!(created(&fs), ["a"]);
        assert!(!fs.has_directory("logs", "a"));
    }
}
