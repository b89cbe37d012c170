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

use std::fmt::Write;

use jiff::Timestamp;
use jiff::tz::TimeZone;
use log::kv::Key;
use log::kv::Value;
use log::kv::VisitSource;

use crate::Error;
use crate::Layout;

/// A layout that formats log record as plain text.
///
/// Output format:
///
/// ```text
/// 2024-08-11T22:44:57.172105+08:00 ERROR app::server: server.rs:51 Hello error!
/// 2024-08-11T22:44:57.172219+08:00  WARN app::server: server.rs:52 Hello warn! user=alice
/// 2024-08-11T22:44:57.172276+08:00  INFO app::server: server.rs:53 Hello info!
/// ```
///
/// # Examples
///
/// ```
/// use sharelog_core::layout::PlainTextLayout;
///
/// let text_layout = PlainTextLayout::default();
/// ```
#[derive(Debug, Clone, Default)]
pub struct PlainTextLayout {
    tz: Option<TimeZone>,
}

impl PlainTextLayout {
    /// Set the time zone used to render timestamps.
    ///
    /// Default to the system time zone.
    ///
    /// # Examples
    ///
    /// ```
    /// use jiff::tz::TimeZone;
    /// use sharelog_core::layout::PlainTextLayout;
    ///
    /// let layout = PlainTextLayout::default().timezone(TimeZone::UTC);
    /// ```
    pub fn timezone(mut self, tz: TimeZone) -> Self {
        self.tz = Some(tz);
        self
    }

    fn format_at(&self, now: Timestamp, record: &log::Record) -> Result<Vec<u8>, Error> {
        let tz = self.tz.clone().unwrap_or_else(TimeZone::system);
        let time = now.to_zoned(tz);
        let time = time.strftime("%Y-%m-%dT%H:%M:%S.%6f%:z");

        let level = record.level().as_str();
        let target = record.target();
        let file = filename(record);
        let line = record.line().unwrap_or_default();
        let message = record.args();

        let mut text = String::new();
        write!(&mut text, "{time} {level:>5} {target}: {file}:{line} {message}")
            .map_err(Error::from_fmt_error)?;

        let mut visitor = KvWriter { text };
        record
            .key_values()
            .visit(&mut visitor)
            .map_err(|err| Error::new("failed to visit key-values").with_source(err))?;

        Ok(visitor.text.into_bytes())
    }
}

impl Layout for PlainTextLayout {
    fn format(&self, record: &log::Record) -> Result<Vec<u8>, Error> {
        self.format_at(Timestamp::now(), record)
    }
}

// obtain filename only from record's full file path
// reason: the module is already logged + full file path is noisy
fn filename<'a>(record: &'a log::Record<'a>) -> std::borrow::Cow<'a, str> {
    record
        .file()
        .map(std::path::Path::new)
        .and_then(std::path::Path::file_name)
        .map(std::ffi::OsStr::to_string_lossy)
        .unwrap_or_default()
}

struct KvWriter {
    text: String,
}

impl<'kvs> VisitSource<'kvs> for KvWriter {
    fn visit_pair(&mut self, key: Key<'kvs>, value: Value<'kvs>) -> Result<(), log::kv::Error> {
        write!(&mut self.text, " {key}={value}")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_record_with_key_values() {
        let kvs = [("user", "alice")];
        let record = log::Record::builder()
            .args(format_args!("Hello warn!"))
            .level(log::Level::Warn)
            .target("app::server")
            .file(Some("src/server.rs"))
            .line(Some(52))
            .key_values(&kvs)
            .build();

        let now: Timestamp = "2024-08-11T14:44:57.172219Z".parse().unwrap();
        let layout = PlainTextLayout::default().timezone(TimeZone::UTC);
        let bytes = layout.format_at(now, &record).unwrap();

        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "2024-08-11T14:44:57.172219+00:00  WARN app::server: server.rs:52 Hello warn! user=alice"
        );
    }
}
