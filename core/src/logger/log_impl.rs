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

use std::io::Write;

use log::LevelFilter;

use crate::Append;
use crate::Error;

/// A logger facade that dispatches log records to one or more dispatches.
///
/// This struct implements [`log::Log`] to bridge sharelog's appenders with the [`log`] crate.
#[derive(Debug)]
pub struct Logger {
    dispatches: Vec<Dispatch>,
}

impl Logger {
    pub(super) fn new(dispatches: Vec<Dispatch>) -> Self {
        Self { dispatches }
    }
}

impl log::Log for Logger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.dispatches
            .iter()
            .any(|dispatch| dispatch.enabled(metadata))
    }

    fn log(&self, record: &log::Record) {
        for dispatch in &self.dispatches {
            if let Err(err) = dispatch.log(record) {
                handle_log_error(record, err);
            }
        }
    }

    fn flush(&self) {
        for dispatch in &self.dispatches {
            if let Err(err) = dispatch.flush() {
                handle_flush_error(err);
            }
        }
    }
}

/// A grouped set of appenders behind one level filter.
#[derive(Debug)]
pub(super) struct Dispatch {
    filter: LevelFilter,
    appends: Vec<Box<dyn Append>>,
}

impl Dispatch {
    pub(super) fn new(filter: LevelFilter, appends: Vec<Box<dyn Append>>) -> Self {
        debug_assert!(
            !appends.is_empty(),
            "A Dispatch must have at least one appender"
        );

        Self { filter, appends }
    }

    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= self.filter
    }

    fn log(&self, record: &log::Record) -> Result<(), Error> {
        if !self.enabled(record.metadata()) {
            return Ok(());
        }

        for append in &self.appends {
            append.append(record)?;
        }
        Ok(())
    }

    fn flush(&self) -> Result<(), Error> {
        for append in &self.appends {
            append.flush()?;
        }
        Ok(())
    }
}

fn handle_log_error(record: &log::Record, error: Error) {
    let Err(fallback_error) = write!(
        std::io::stderr(),
        r###"
Error perform logging.
    Attempted to log: {args}
    Record: {record:?}
    Error: {error:?}
"###,
        args = record.args(),
        record = record,
        error = error,
    ) else {
        return;
    };

    panic!(
        r###"
Error performing stderr logging after error occurred during regular logging.
    Attempted to log: {args}
    Record: {record:?}
    Error: {error:?}
    Fallback error: {fallback_error}
"###,
        args = record.args(),
        record = record,
        error = error,
        fallback_error = fallback_error,
    );
}

fn handle_flush_error(error: Error) {
    let Err(fallback_error) = write!(
        std::io::stderr(),
        r###"
Error perform flush.
    Error: {error:?}
"###,
    ) else {
        return;
    };

    panic!(
        r###"
Error performing stderr logging after error occurred during regular flush.
    Error: {error:?}
    Fallback error: {fallback_error}
"###,
    );
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::Mutex;

    use log::Log;

    use super::*;

    #[derive(Debug, Clone, Default)]
    struct Capture(Arc<Mutex<Vec<String>>>);

    impl Append for Capture {
        fn append(&self, record: &log::Record) -> Result<(), Error> {
            self.0.lock().unwrap().push(record.args().to_string());
            Ok(())
        }
    }

    #[test]
    fn dispatch_filters_by_level() {
        let errors = Capture::default();
        let everything = Capture::default();

        let logger = crate::builder()
            .dispatch(|d| d.filter(LevelFilter::Error).append(errors.clone()))
            .dispatch(|d| d.append(everything.clone()))
            .build();

        logger.log(
            &log::Record::builder()
                .args(format_args!("boom"))
                .level(log::Level::Error)
                .build(),
        );
        logger.log(
            &log::Record::builder()
                .args(format_args!("details"))
                .level(log::Level::Debug)
                .build(),
        );

        assert_eq!(*errors.0.lock().unwrap(), vec!["boom"]);
        assert_eq!(*everything.0.lock().unwrap(), vec!["boom", "details"]);
    }

    #[test]
    fn enabled_if_any_dispatch_accepts() {
        let logger = crate::builder()
            .dispatch(|d| d.filter(LevelFilter::Warn).append(Capture::default()))
            .build();

        let warn = log::Metadata::builder().level(log::Level::Warn).build();
        let info = log::Metadata::builder().level(log::Level::Info).build();
        assert!(logger.enabled(&warn));
        assert!(!logger.enabled(&info));
    }
}
