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

//! Concurrent writers sharing one writer instance.

use std::collections::BTreeMap;
use std::sync::Arc;

use rand::Rng;
use rand::distr::Alphanumeric;
use rand::distr::SampleString;
use sharelog_append_fileshare::FileShareWriter;
use sharelog_append_fileshare::memory::Call;
use sharelog_append_fileshare::memory::InMemoryFileShare;

const CONN: &str = "FileEndpoint=http://127.0.0.1:10000/devstoreaccount1";

fn writer(fs: &Arc<InMemoryFileShare>) -> FileShareWriter {
    FileShareWriter::builder(CONN, "logs")
        .client(fs.clone())
        .line_ending("\n")
        .build()
        .unwrap()
}

/// Lines of `writer` as `writer:seq:padding`, with random padding.
fn lines(writer: usize, count: usize) -> Vec<String> {
    let mut rng = rand::rng();
    (0..count)
        .map(|seq| {
            let len = rng.random_range(1..200);
            let padding = Alphanumeric.sample_string(&mut rng, len);
            format!("{writer}:{seq}:{padding}")
        })
        .collect()
}

/// Check that every line made it, once, and in the order its writer issued it.
fn check_content(content: &[u8], expected: &[Vec<String>]) {
    let content = String::from_utf8(content.to_vec()).unwrap();
    assert!(content.ends_with('\n'));

    let mut seen: BTreeMap<usize, Vec<String>> = BTreeMap::new();
    for line in content.lines() {
        let writer = line.split(':').next().unwrap().parse().unwrap();
        seen.entry(writer).or_default().push(line.to_owned());
    }
    for (writer, lines) in expected.iter().enumerate() {
        assert_eq!(seen.get(&writer), Some(lines), "writer {writer}");
    }
}

/// Check that no grow-then-write sequence interleaved with another one.
fn check_calls(calls: &[Call], file: &str) {
    let mut size = 0;
    let mut calls = calls.iter().filter(|call| match call {
        Call::CreateFile { path, .. }
        | Call::FileLength { path }
        | Call::ResizeFile { path, .. }
        | Call::WriteRange { path, .. } => path == file,
        _ => false,
    });

    while let Some(call) = calls.next() {
        let grown = match call {
            Call::CreateFile { size: new_size, .. } => {
                assert_eq!(size, 0, "created twice");
                *new_size
            }
            Call::FileLength { .. } => match calls.next() {
                Some(Call::ResizeFile { size: new_size, .. }) => *new_size,
                other => panic!("length read not followed by resize: {other:?}"),
            },
            other => panic!("unexpected call: {other:?}"),
        };
        match calls.next() {
            Some(Call::WriteRange { offset, len, .. }) => {
                assert_eq!(*offset, size, "write does not start at the previous end");
                assert_eq!(offset + len, grown, "write does not fill the grown tail");
            }
            other => panic!("grow not followed by write: {other:?}"),
        }
        size = grown;
    }
}

#[test]
fn threads_never_interleave() {
    let fs = Arc::new(InMemoryFileShare::new().with_share("logs"));
    let writer = writer(&fs);
    let expected = (0..8).map(|w| lines(w, 25)).collect::<Vec<_>>();

    std::thread::scope(|s| {
        for lines in &expected {
            let writer = writer.clone();
            s.spawn(move || {
                for line in lines {
                    writer
                        .write_blocking("2024/05", "app.log", line.as_bytes())
                        .unwrap();
                }
            });
        }
    });

    let content = fs.file_content("logs", "2024/05/app.log").unwrap();
    check_content(&content, &expected);
    check_calls(&fs.calls(), "2024/05/app.log");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn tasks_never_interleave() {
    let fs = Arc::new(InMemoryFileShare::new().with_share("logs"));
    let writer = writer(&fs);
    let expected = (0..8).map(|w| lines(w, 25)).collect::<Vec<_>>();

    let mut tasks = vec![];
    for lines in expected.clone() {
        let writer = writer.clone();
        tasks.push(tokio::spawn(async move {
            for line in lines {
                writer.write("a/b", "app.log", line.as_bytes()).await.unwrap();
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let content = fs.file_content("logs", "a/b/app.log").unwrap();
    check_content(&content, &expected);
    check_calls(&fs.calls(), "a/b/app.log");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn blocking_and_async_callers_share_the_lock() {
    let fs = Arc::new(InMemoryFileShare::new().with_share("logs"));
    let writer = writer(&fs);
    let expected = (0..6).map(|w| lines(w, 20)).collect::<Vec<_>>();

    let mut tasks = vec![];
    for (w, lines) in expected.clone().into_iter().enumerate() {
        let writer = writer.clone();
        if w % 2 == 0 {
            tasks.push(tokio::spawn(async move {
                for line in lines {
                    writer.write("", "app.log", line.as_bytes()).await.unwrap();
                }
            }));
        } else {
            tasks.push(tokio::task::spawn_blocking(move || {
                for line in lines {
                    writer.write_blocking("", "app.log", line.as_bytes()).unwrap();
                }
            }));
        }
    }
    for task in tasks {
        task.await.unwrap();
    }

    let content = fs.file_content("logs", "app.log").unwrap();
    check_content(&content, &expected);
    check_calls(&fs.calls(), "app.log");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_first_writes_provision_once() {
    let fs = Arc::new(InMemoryFileShare::new().with_share("logs"));
    let writer = writer(&fs);

    let mut tasks = vec![];
    for i in 0..8 {
        let writer = writer.clone();
        tasks.push(tokio::spawn(async move {
            let line = format!("{i}:0:x");
            writer.write("x/y/z", "app.log", line.as_bytes()).await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let creates = fs
        .calls()
        .into_iter()
        .filter(|call| matches!(call, Call::CreateDirectory { .. } | Call::CreateFile { .. }))
        .count();
    assert_eq!(creates, 4);
    let content = fs.file_content("logs", "x/y/z/app.log").unwrap();
    assert_eq!(content.iter().filter(|b| **b == b'\n').count(), 8);
}
