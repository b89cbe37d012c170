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

//! Core building blocks of sharelog.
//!
//! This crate provides the [`Append`], [`Layout`] and [`Trap`] traits shared by all appenders, the
//! [`Error`] type, and a [`log`] facade implementation that dispatches records to appenders.
//!
//! # Examples
//!
//! ```
//! use log::LevelFilter;
//!
//! #[derive(Debug)]
//! struct Discard;
//!
//! impl sharelog_core::Append for Discard {
//!     fn append(&self, _: &log::Record) -> Result<(), sharelog_core::Error> {
//!         Ok(())
//!     }
//! }
//!
//! sharelog_core::builder()
//!     .dispatch(|d| d.filter(LevelFilter::Info).append(Discard))
//!     .apply();
//!
//! log::info!("This record is discarded.");
//! ```

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod append;
pub mod layout;
pub mod trap;

pub use self::append::Append;
pub use self::error::Error;
pub use self::error::ErrorKind;
pub use self::layout::Layout;
pub use self::trap::Trap;

mod error;

mod logger;
pub use self::logger::DispatchBuilder;
pub use self::logger::Logger;
pub use self::logger::LoggerBuilder;
pub use self::logger::builder;
