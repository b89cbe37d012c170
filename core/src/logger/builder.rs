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

use log::LevelFilter;

use crate::Append;
use crate::Error;
use crate::Logger;
use crate::logger::log_impl::Dispatch;

/// Create a new empty [`LoggerBuilder`] instance for configuring log dispatching.
///
/// # Examples
///
/// ```
/// use log::LevelFilter;
///
/// #[derive(Debug)]
/// struct Discard;
///
/// impl sharelog_core::Append for Discard {
///     fn append(&self, _: &log::Record) -> Result<(), sharelog_core::Error> {
///         Ok(())
///     }
/// }
///
/// let logger = sharelog_core::builder()
///     .dispatch(|d| d.filter(LevelFilter::Warn).append(Discard))
///     .build();
/// ```
pub fn builder() -> LoggerBuilder {
    LoggerBuilder { dispatches: vec![] }
}

/// A builder for configuring log dispatching and setting up the global logger.
#[must_use = "call `apply` to set the global logger or `build` to construct a logger instance"]
#[derive(Debug)]
pub struct LoggerBuilder {
    // stashed dispatches
    dispatches: Vec<Dispatch>,
}

impl LoggerBuilder {
    /// Register a new dispatch with the [`LoggerBuilder`].
    pub fn dispatch<F>(mut self, f: F) -> Self
    where
        F: FnOnce(DispatchBuilder<false>) -> DispatchBuilder<true>,
    {
        self.dispatches.push(f(DispatchBuilder::new()).build());
        self
    }

    /// Build the [`Logger`] without installing it.
    pub fn build(self) -> Logger {
        Logger::new(self.dispatches)
    }

    /// Set up the [`log`] crate global logger with all the configured dispatches.
    ///
    /// This should be called early in the execution of a Rust program. Any log events that occur
    /// before initialization will be ignored.
    ///
    /// This function will set the global maximum log level to `Trace`. To override this, call
    /// [`log::set_max_level`] after this function.
    ///
    /// # Errors
    ///
    /// Return an error if the global logger has already been set.
    pub fn try_apply(self) -> Result<(), Error> {
        let logger = self.build();
        log::set_boxed_logger(Box::new(logger))
            .map_err(|err| Error::new("log global logger has been already setup").with_source(err))?;
        log::set_max_level(LevelFilter::Trace);
        Ok(())
    }

    /// Set up the [`log`] crate global logger with all the configured dispatches.
    ///
    /// # Panics
    ///
    /// Panic if the global logger has already been set.
    pub fn apply(self) {
        self.try_apply()
            .expect("LoggerBuilder::apply must be called before the global logger initialized");
    }
}

/// A builder for configuring a log dispatch, including its level filter and appenders.
///
/// `APPEND` turns `true` once at least one appender is configured; only then can the dispatch
/// be registered.
#[derive(Debug)]
pub struct DispatchBuilder<const APPEND: bool> {
    filter: LevelFilter,
    appends: Vec<Box<dyn Append>>,
}

impl DispatchBuilder<false> {
    fn new() -> Self {
        DispatchBuilder {
            filter: LevelFilter::Trace,
            appends: vec![],
        }
    }

    /// Set the maximum level this dispatch accepts.
    ///
    /// Default to [`LevelFilter::Trace`], which accepts every record.
    pub fn filter(mut self, filter: LevelFilter) -> Self {
        self.filter = filter;
        self
    }
}

impl DispatchBuilder<true> {
    fn build(self) -> Dispatch {
        Dispatch::new(self.filter, self.appends)
    }
}

impl<const APPEND: bool> DispatchBuilder<APPEND> {
    /// Add an appender to this dispatch.
    pub fn append(mut self, append: impl Into<Box<dyn Append>>) -> DispatchBuilder<true> {
        self.appends.push(append.into());
        DispatchBuilder {
            filter: self.filter,
            appends: self.appends,
        }
    }
}
