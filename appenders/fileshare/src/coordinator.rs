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

use std::cell::Cell;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use sharelog_core::Error;
use tokio::runtime::Handle;
use tokio::runtime::Runtime;
use tokio::sync::Mutex;

/// How long dropping the coordinator waits for in-flight writes.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

thread_local! {
    static ON_WRITER_THREAD: Cell<bool> = const { Cell::new(false) };
}

/// Whether the current thread belongs to a coordinator runtime.
///
/// Anything logged from such a thread is emitted while a write is in flight and must not be
/// written back through the same writer.
pub(crate) fn on_writer_thread() -> bool {
    ON_WRITER_THREAD.with(Cell::get)
}

/// Runs write sections one at a time, in the order callers asked for them.
///
/// Sections run on a runtime owned by the coordinator. Once a section has acquired the lock it
/// runs to completion even if the caller stops waiting for it, so a file is never left grown
/// but unwritten. A caller that gives up while still waiting for the lock never runs its
/// section.
#[derive(Debug)]
pub(crate) struct WriteCoordinator {
    lock: Arc<Mutex<()>>,
    runtime: Option<Runtime>,
}

impl WriteCoordinator {
    pub(crate) fn new(thread_name: &str) -> Result<Self, Error> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name(thread_name)
            .on_thread_start(|| ON_WRITER_THREAD.with(|flag| flag.set(true)))
            .enable_all()
            .build()
            .map_err(|err| {
                Error::new("failed to build writer runtime")
                    .with_context("thread_name", thread_name)
                    .with_source(err)
            })?;

        Ok(Self {
            lock: Arc::new(Mutex::new(())),
            runtime: Some(runtime),
        })
    }

    fn handle(&self) -> Result<&Handle, Error> {
        match &self.runtime {
            Some(runtime) => Ok(runtime.handle()),
            None => Err(Error::new("writer runtime has been shut down")),
        }
    }

    /// Run `section` exclusively, waiting asynchronously for the lock.
    pub(crate) async fn run<F, T>(&self, section: F) -> Result<T, Error>
    where
        F: Future<Output = Result<T, Error>> + Send + 'static,
        T: Send + 'static,
    {
        let guard = self.lock.clone().lock_owned().await;
        let task = self.handle()?.spawn(async move {
            let result = section.await;
            drop(guard);
            result
        });
        task.await
            .map_err(|err| Error::new("write task did not complete").with_source(err))?
    }

    /// Run `section` exclusively, blocking the current thread until it completes.
    pub(crate) fn run_blocking<F, T>(&self, section: F) -> Result<T, Error>
    where
        F: Future<Output = Result<T, Error>> + Send + 'static,
        T: Send + 'static,
    {
        let (done, result) = oneshot::channel();
        let lock = self.lock.clone();
        self.handle()?.spawn(async move {
            let guard = lock.lock_owned().await;
            let result = section.await;
            drop(guard);
            // the caller may be gone if the runtime is shutting down
            let _ = done.send(result);
        });
        result
            .recv()
            .map_err(|err| Error::new("write task did not complete").with_source(err))?
    }
}

/// Wait for the section holding the lock, and those already queued behind it, then stop.
fn drain(runtime: Runtime, lock: Arc<Mutex<()>>) {
    let _guard = runtime.block_on(tokio::time::timeout(SHUTDOWN_TIMEOUT, lock.lock_owned()));
    runtime.shutdown_timeout(SHUTDOWN_TIMEOUT);
}

impl Drop for WriteCoordinator {
    fn drop(&mut self) {
        let Some(runtime) = self.runtime.take() else {
            return;
        };
        let lock = self.lock.clone();

        if Handle::try_current().is_err() {
            drain(runtime, lock);
            return;
        }

        // blocking inside an async context would panic, so drain on a thread of our own
        let (handoff, received) = oneshot::channel::<Runtime>();
        let spawned = std::thread::Builder::new()
            .name("sharelog-drain".to_owned())
            .spawn(move || {
                if let Ok(runtime) = received.recv() {
                    drain(runtime, lock);
                }
            });
        let runtime = match spawned {
            Ok(_) => match handoff.send(runtime) {
                Ok(()) => return,
                Err(err) => err.into_inner(),
            },
            Err(_) => runtime,
        };
        runtime.shutdown_background();
    }
}
