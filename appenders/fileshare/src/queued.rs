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

use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::Receiver;
use crossbeam_channel::Sender;
use crossbeam_channel::TrySendError;
use log::Record;
use sharelog_core::Append;
use sharelog_core::Error;
use sharelog_core::ErrorKind;
use sharelog_core::Layout;
use sharelog_core::Trap;

use crate::target::FileShareTarget;
use crate::target::destination;
use crate::target::is_empty_message;
use crate::target::is_internal;
use crate::template::PathTemplate;
use crate::writer::FileShareWriter;

/// What to do with an incoming record when the queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overflow {
    /// Block until there is room in the queue.
    Block,
    /// Drop the incoming record.
    DropIncoming,
}

enum Task {
    Write {
        folder: String,
        file: String,
        line: Vec<u8>,
    },
    Flush {
        done: oneshot::Sender<Result<(), Error>>,
    },
}

/// An appender that queues log records and writes them to files on a remote file share from a
/// background thread.
///
/// Records are written in the order they were appended. Storage errors are reported to the trap
/// and the record is dropped. Configuration errors are reported to the trap as well and also
/// returned from the next [`flush`](Append::flush), since they persist until the configuration
/// is fixed.
///
/// Dropping the appender waits for queued records to be written.
#[derive(Debug)]
pub struct AsyncFileShare {
    writer: FileShareWriter,
    folder: PathTemplate,
    file: PathTemplate,
    layout: Box<dyn Layout>,
    trap: Arc<dyn Trap>,
    overflow: Overflow,
    state: QueueState,
}

impl AsyncFileShare {
    pub(crate) fn new(
        writer: FileShareWriter,
        folder: PathTemplate,
        file: PathTemplate,
        layout: Box<dyn Layout>,
        trap: Arc<dyn Trap>,
        buffered_lines_limit: Option<usize>,
        overflow: Overflow,
    ) -> Result<Self, Error> {
        let (sender, receiver) = match buffered_lines_limit {
            Some(limit) => crossbeam_channel::bounded(limit),
            None => crossbeam_channel::unbounded(),
        };

        let worker = Worker {
            writer: writer.clone(),
            receiver,
            trap: trap.clone(),
        };
        let thread_name = format!("{}-queue", writer.name());
        let handle = std::thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || worker.run())
            .map_err(|err| {
                Error::new("failed to spawn queued appender thread")
                    .with_context("thread_name", thread_name)
                    .with_source(err)
            })?;

        Ok(Self {
            writer,
            folder,
            file,
            layout,
            trap,
            overflow,
            state: QueueState(Some(State { sender, handle })),
        })
    }

    fn task(&self, record: &Record) -> Result<Task, Error> {
        let dest = destination(self, record)?;
        let line = self
            .layout
            .format(record)
            .map_err(|err| err.with_context("target", self.name()))?;
        Ok(Task::Write {
            folder: dest.folder,
            file: dest.file,
            line,
        })
    }
}

impl FileShareTarget for AsyncFileShare {
    fn name(&self) -> &str {
        self.writer.name()
    }

    fn connection_string(&self) -> &str {
        self.writer.connection_string()
    }

    fn share_name(&self) -> &str {
        self.writer.share_name()
    }

    fn folder_layout(&self) -> &PathTemplate {
        &self.folder
    }

    fn file_layout(&self) -> &PathTemplate {
        &self.file
    }
}

impl Append for AsyncFileShare {
    fn append(&self, record: &Record) -> Result<(), Error> {
        if is_internal(record) || is_empty_message(record) {
            return Ok(());
        }

        let task = self.task(record).inspect_err(|err| self.trap.trap(err))?;
        self.state
            .send(task, self.overflow)
            .inspect_err(|err| self.trap.trap(err))
    }

    /// Wait until every record appended before has been written.
    fn flush(&self) -> Result<(), Error> {
        let (done, result) = oneshot::channel();
        // a flush must never be dropped
        self.state.send(Task::Flush { done }, Overflow::Block)?;
        result
            .recv()
            .map_err(|err| Error::new("queued appender stopped before flushing").with_source(err))?
    }
}

#[derive(Debug)]
struct QueueState(Option<State>);

#[derive(Debug)]
struct State {
    sender: Sender<Task>,
    handle: JoinHandle<()>,
}

impl QueueState {
    fn send(&self, task: Task, overflow: Overflow) -> Result<(), Error> {
        let Some(State { sender, .. }) = &self.0 else {
            return Err(Error::new("queued appender has been shut down"));
        };

        match overflow {
            Overflow::Block => sender
                .send(task)
                .map_err(|err| Error::new(err.0.send_failure())),
            Overflow::DropIncoming => match sender.try_send(task) {
                Ok(()) => Ok(()),
                Err(TrySendError::Full(_)) => Ok(()),
                Err(TrySendError::Disconnected(task)) => Err(Error::new(task.send_failure())),
            },
        }
    }
}

impl Drop for QueueState {
    fn drop(&mut self) {
        if let Some(State { sender, handle }) = self.0.take() {
            // the worker drains the queue and exits once the sender is gone
            drop(sender);
            let _ = handle.join();
        }
    }
}

impl Task {
    fn send_failure(&self) -> &'static str {
        match self {
            Task::Write { .. } => "failed to send write task to queued appender",
            Task::Flush { .. } => "failed to send flush task to queued appender",
        }
    }
}

struct Worker {
    writer: FileShareWriter,
    receiver: Receiver<Task>,
    trap: Arc<dyn Trap>,
}

impl Worker {
    fn run(self) {
        let Self {
            writer,
            receiver,
            trap,
        } = self;

        // the latest configuration error not yet reported by a flush
        let mut pending: Option<Error> = None;

        while let Ok(task) = receiver.recv() {
            match task {
                Task::Write { folder, file, line } => {
                    if let Err(err) = writer.write_blocking(&folder, &file, &line) {
                        trap.trap(&err);
                        if err.kind() == ErrorKind::Configuration {
                            pending = Some(err);
                        }
                    }
                }
                Task::Flush { done } => {
                    let result = match pending.take() {
                        Some(err) => Err(err),
                        None => Ok(()),
                    };
                    let _ = done.send(result);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use sharelog_core::layout::PlainTextLayout;

    use super::*;
    use crate::memory::InMemoryFileShare;

    #[derive(Debug, Default)]
    struct RecordingTrap(Mutex<Vec<String>>);

    impl Trap for RecordingTrap {
        fn trap(&self, err: &Error) {
            self.0.lock().unwrap().push(err.to_string());
        }
    }

    #[test]
    fn failed_sends_are_trapped() {
        let writer = FileShareWriter::builder("FileEndpoint=http://127.0.0.1:10000", "logs")
            .client(Arc::new(InMemoryFileShare::new().with_share("logs")))
            .build()
            .unwrap();
        let trap = Arc::new(RecordingTrap::default());
        let append = AsyncFileShare {
            writer,
            folder: PathTemplate::parse("").unwrap(),
            file: PathTemplate::parse("app.log").unwrap(),
            layout: Box::new(PlainTextLayout::default()),
            trap: trap.clone(),
            overflow: Overflow::Block,
            state: QueueState(None),
        };

        let err = append
            .append(&Record::builder().args(format_args!("lost")).build())
            .unwrap_err();
        assert!(err.to_string().contains("shut down"));

        let trapped = trap.0.lock().unwrap().clone();
        assert_eq!(trapped.len(), 1);
        assert!(trapped[0].contains("shut down"));
    }
}
