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

//! Write logs to a file share.
//!
//! Set `SHARELOG_CONNECTION_STRING` and `SHARELOG_SHARE` to write to a real share; otherwise the
//! logs go to an in-memory share that is printed at the end.

use std::sync::Arc;

use log::LevelFilter;
use sharelog_append_fileshare::FileShareBuilder;
use sharelog_append_fileshare::memory::InMemoryFileShare;

fn main() {
    let memory = Arc::new(InMemoryFileShare::new().with_share("logs"));

    let builder = match std::env::var("SHARELOG_CONNECTION_STRING") {
        Ok(conn) => {
            let share = std::env::var("SHARELOG_SHARE").unwrap_or_else(|_| "logs".to_owned());
            FileShareBuilder::new(conn, share)
        }
        Err(_) => FileShareBuilder::new("FileEndpoint=http://127.0.0.1:10000", "logs")
            .client(memory.clone()),
    };
    let fileshare = builder
        .name("example")
        .folder("{date:%Y/%m}")
        .file("{date}.log")
        .build_async()
        .unwrap();

    sharelog_core::builder()
        .dispatch(|d| d.filter(LevelFilter::Debug).append(fileshare))
        .apply();

    log::error!("Hello error!");
    log::warn!("Hello warn!");
    log::info!(user = "alice"; "Hello info!");
    log::debug!("Hello debug!");
    log::trace!("Hello trace!");
    log::logger().flush();

    let folder = jiff::Zoned::now().strftime("%Y/%m").to_string();
    let file = format!("{}/{}.log", folder, jiff::Zoned::now().date());
    if let Some(content) = memory.file_content("logs", &file) {
        print!("{}", String::from_utf8_lossy(&content));
    }
}
