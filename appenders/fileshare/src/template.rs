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
use std::str::FromStr;

use jiff::Timestamp;
use jiff::Zoned;
use jiff::fmt::strtime;
use jiff::tz::TimeZone;
use log::Record;
use sharelog_core::Error;

const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";
const DEFAULT_TIME_FORMAT: &str = "%H-%M-%S";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Literal(String),
    Date(String),
    Time(String),
    Level,
    Target,
}

/// A folder or file name rendered for each log record.
///
/// A template is literal text with placeholders:
///
/// * `{date}`: the local date as `%Y-%m-%d`.
/// * `{date:FORMAT}` and `{time:FORMAT}`: the local time in a [strftime] format.
/// * `{time}`: the local time as `%H-%M-%S`.
/// * `{level}`: the record level, e.g. `INFO`.
/// * `{target}`: the record target, with `::` replaced by `.`.
///
/// `{{` and `}}` stand for literal braces.
///
/// [strftime]: jiff::fmt::strtime
///
/// # Examples
///
/// ```
/// use sharelog_append_fileshare::PathTemplate;
///
/// let template = PathTemplate::parse("{date:%Y/%m}").unwrap();
/// assert_eq!(template.as_str(), "{date:%Y/%m}");
/// assert!(PathTemplate::parse("{hostname}").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    source: String,
    parts: Vec<Part>,
}

impl PathTemplate {
    /// Parse a template.
    ///
    /// # Errors
    ///
    /// Return a configuration error for unknown placeholders, unbalanced braces, or invalid time
    /// formats.
    pub fn parse(template: &str) -> Result<Self, Error> {
        let invalid = |message: &str| {
            Error::configuration(message.to_owned()).with_context("template", template)
        };

        let mut parts = vec![];
        let mut literal = String::new();
        let mut chars = template.chars();
        while let Some(c) = chars.next() {
            match c {
                '{' if chars.as_str().starts_with('{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.as_str().starts_with('}') => {
                    chars.next();
                    literal.push('}');
                }
                '}' => return Err(invalid("unmatched '}' in path template")),
                '{' => {
                    let rest = chars.as_str();
                    let Some(end) = rest.find('}') else {
                        return Err(invalid("unclosed placeholder in path template"));
                    };
                    let placeholder = &rest[..end];
                    chars = rest[end + 1..].chars();

                    let part = parse_placeholder(placeholder).ok_or_else(|| {
                        invalid("unknown placeholder in path template")
                            .with_context("placeholder", placeholder)
                    })?;
                    if let Part::Date(format) | Part::Time(format) = &part {
                        if format.is_empty() {
                            return Err(invalid("empty time format in path template"));
                        }
                        check_format(format).map_err(|err| {
                            invalid("invalid time format in path template").with_source(err)
                        })?;
                    }

                    if !literal.is_empty() {
                        parts.push(Part::Literal(std::mem::take(&mut literal)));
                    }
                    parts.push(part);
                }
                c => literal.push(c),
            }
        }
        if !literal.is_empty() {
            parts.push(Part::Literal(literal));
        }

        Ok(Self {
            source: template.to_owned(),
            parts,
        })
    }

    /// The template as it was written.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether the template renders the same text for every record.
    pub fn is_constant(&self) -> bool {
        self.parts.iter().all(|p| matches!(p, Part::Literal(_)))
    }

    /// Render the template for `record` at the current local time.
    pub fn render(&self, record: &Record) -> Result<String, Error> {
        self.render_at(&Zoned::now(), record)
    }

    /// Render the template for `record` at `now`.
    pub fn render_at(&self, now: &Zoned, record: &Record) -> Result<String, Error> {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                Part::Literal(text) => out.push_str(text),
                Part::Date(format) | Part::Time(format) => {
                    let text = strtime::format(format.as_str(), now).map_err(|err| {
                        Error::configuration("failed to render path template")
                            .with_context("template", &self.source)
                            .with_source(err)
                    })?;
                    out.push_str(&text);
                }
                Part::Level => out.push_str(record.level().as_str()),
                Part::Target => out.push_str(&record.target().replace("::", ".")),
            }
        }
        Ok(out)
    }
}

impl FromStr for PathTemplate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn parse_placeholder(placeholder: &str) -> Option<Part> {
    let (name, format) = match placeholder.split_once(':') {
        Some((name, format)) => (name, Some(format)),
        None => (placeholder, None),
    };

    match (name, format) {
        ("date", format) => Some(Part::Date(
            format.unwrap_or(DEFAULT_DATE_FORMAT).to_owned(),
        )),
        ("time", format) => Some(Part::Time(
            format.unwrap_or(DEFAULT_TIME_FORMAT).to_owned(),
        )),
        ("level", None) => Some(Part::Level),
        ("target", None) => Some(Part::Target),
        _ => None,
    }
}

fn check_format(format: &str) -> Result<(), jiff::Error> {
    let epoch = Timestamp::UNIX_EPOCH.to_zoned(TimeZone::UTC);
    strtime::format(format, &epoch).map(|_| ())
}

#[cfg(test)]
mod tests {
    use jiff::civil::date;
    use log::Level;

    use super::*;

    fn now() -> Zoned {
        date(2024, 5, 17)
            .at(9, 30, 5, 0)
            .to_zoned(TimeZone::UTC)
            .unwrap()
    }

    fn render(template: &str, level: Level, target: &str) -> String {
        let template = PathTemplate::parse(template).unwrap();
        template
            .render_at(
                &now(),
                &Record::builder()
                    .level(level)
                    .target(target)
                    .args(format_args!("message"))
                    .build(),
            )
            .unwrap()
    }

    #[test]
    fn renders_placeholders() {
        assert_eq!(render("{date}.log", Level::Info, "app"), "2024-05-17.log");
        assert_eq!(render("{date:%Y/%m}", Level::Info, "app"), "2024/05");
        assert_eq!(render("{time}", Level::Info, "app"), "09-30-05");
        assert_eq!(
            render("{target}-{level}.log", Level::Warn, "app::server"),
            "app.server-WARN.log"
        );
        assert_eq!(render("logs/static", Level::Info, "app"), "logs/static");
    }

    #[test]
    fn escapes_braces() {
        assert_eq!(render("{{{level}}}", Level::Error, "app"), "{ERROR}");
    }

    #[test]
    fn rejects_invalid_templates() {
        for template in ["{host}", "{level:x}", "{date", "date}", "{date:}"] {
            let err = PathTemplate::parse(template).unwrap_err();
            assert_eq!(
                err.kind(),
                sharelog_core::ErrorKind::Configuration,
                "{template}"
            );
            assert_eq!(err.context("template"), Some(template));
        }
    }

    #[test]
    fn constant_templates() {
        assert!(PathTemplate::parse("").unwrap().is_constant());
        assert!(PathTemplate::parse("a/{{b}}").unwrap().is_constant());
        assert!(!PathTemplate::parse("{date}.log").unwrap().is_constant());
    }
}
