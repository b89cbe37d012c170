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

use jiff::Zoned;
use log::Record;
use sharelog_core::Error;

use crate::template::PathTemplate;

/// The configuration shared by the file-share appenders.
pub trait FileShareTarget {
    /// The name identifying this target in errors.
    fn name(&self) -> &str;

    fn connection_string(&self) -> &str;

    fn share_name(&self) -> &str;

    /// The template of the folder, relative to the share root, the file is written to.
    fn folder_layout(&self) -> &PathTemplate;

    /// The template of the file name.
    fn file_layout(&self) -> &PathTemplate;
}

/// Where a record goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Destination {
    pub(crate) folder: String,
    pub(crate) file: String,
}

/// Render the folder and file of `target` for `record`.
///
/// Both are rendered from one clock reading, so a record logged at midnight cannot end up in
/// yesterday's folder and today's file.
pub(crate) fn destination<T>(target: &T, record: &Record) -> Result<Destination, Error>
where
    T: FileShareTarget + ?Sized,
{
    let now = Zoned::now();
    let render = |template: &PathTemplate| {
        template.render_at(&now, record).map_err(|err| {
            err.with_context("target", target.name())
                .with_context("share", target.share_name())
        })
    };

    Ok(Destination {
        folder: render(target.folder_layout())?,
        file: render(target.file_layout())?,
    })
}

/// Whether `record` was logged by this crate itself.
///
/// Writing such a record would wait for the write that logged it.
pub(crate) fn is_internal(record: &Record) -> bool {
    record.target().starts_with(env!("CARGO_CRATE_NAME"))
        || crate::coordinator::on_writer_thread()
}

/// Whether the message of `record` renders to nothing.
pub(crate) fn is_empty_message(record: &Record) -> bool {
    match record.args().as_str() {
        Some(message) => message.is_empty(),
        None => record.args().to_string().is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Target {
        folder: PathTemplate,
        file: PathTemplate,
    }

    impl FileShareTarget for Target {
        fn name(&self) -> &str {
            "test"
        }

        fn connection_string(&self) -> &str {
            ""
        }

        fn share_name(&self) -> &str {
            "logs"
        }

        fn folder_layout(&self) -> &PathTemplate {
            &self.folder
        }

        fn file_layout(&self) -> &PathTemplate {
            &self.file
        }
    }

    #[test]
    fn renders_folder_and_file() {
        let target = Target {
            folder: PathTemplate::parse("{target}").unwrap(),
            file: PathTemplate::parse("{level}.log").unwrap(),
        };
        let record = Record::builder()
            .level(log::Level::Error)
            .target("app::db")
            .args(format_args!("boom"))
            .build();

        let destination = destination(&target, &record).unwrap();
        assert_eq!(
            destination,
            Destination {
                folder: "app.db".to_owned(),
                file: "ERROR.log".to_owned(),
            }
        );
    }

    #[test]
    fn recognizes_internal_records() {
        let internal = Record::builder()
            .target("sharelog_append_fileshare::provision")
            .build();
        let external = Record::builder().target("app").build();
        assert!(is_internal(&internal));
        assert!(!is_internal(&external));
    }

    #[test]
    fn detects_empty_messages() {
        let empty = String::new();
        assert!(is_empty_message(
            &Record::builder().args(format_args!("")).build()
        ));
        assert!(is_empty_message(
            &Record::builder().args(format_args!("{empty}")).build()
        ));
        assert!(!is_empty_message(
            &Record::builder().args(format_args!("x")).build()
        ));
    }
}
