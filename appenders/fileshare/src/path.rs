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

/// A slash-normalized directory path relative to the root of a share.
///
/// Parsing splits on both `/` and `\` and discards empty segments, so `"a//b\\c/"` and `"a/b/c"`
/// name the same directory. A blank path names the share root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct DirectoryPath {
    segments: Vec<String>,
}

impl DirectoryPath {
    /// The root directory of a share.
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a folder string into a directory path.
    ///
    /// # Examples
    ///
    /// ```
    /// use sharelog_append_fileshare::DirectoryPath;
    ///
    /// let path = DirectoryPath::parse("logs\\2024//05/");
    /// assert_eq!(path.to_string(), "logs/2024/05");
    /// assert!(DirectoryPath::parse("   ").is_root());
    /// ```
    pub fn parse(folder: &str) -> Self {
        if folder.trim().is_empty() {
            return Self::root();
        }

        let segments = folder
            .split(['/', '\\'])
            .filter(|segment| !segment.is_empty())
            .map(str::to_owned)
            .collect();
        Self { segments }
    }

    /// Whether this path names the share root.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// The segments of this path, from the share root down.
    pub fn segments(&self) -> impl ExactSizeIterator<Item = &str> {
        self.segments.iter().map(String::as_str)
    }

    /// Every cumulative prefix of this path, shortest first.
    ///
    /// For `a/b/c` this yields `a`, `a/b`, `a/b/c`. The root yields nothing.
    pub fn prefixes(&self) -> impl Iterator<Item = DirectoryPath> + '_ {
        (1..=self.segments.len()).map(|n| DirectoryPath {
            segments: self.segments[..n].to_vec(),
        })
    }

    /// The path of a file named `name` inside this directory.
    pub fn file_path(&self, name: &str) -> String {
        if self.is_root() {
            name.to_owned()
        } else {
            format!("{self}/{name}")
        }
    }
}

impl fmt::Display for DirectoryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            f.write_str(segment)?;
        }
        Ok(())
    }
}
