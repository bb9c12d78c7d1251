use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use linegate::channel::{LineReader, LineWriter};
use linegate::decoder::JsonReplyDecoder;
use linegate::dispatcher::{Dispatcher, DispatcherHandle};
use linegate::error::DispatchError;
use linegate::events::DispatchEvent;

const QUIET: Duration = Duration::from_millis(100);

/// The test's side of the worker's pipes.
struct FakeWorker {
    stdin: BufReader<DuplexStream>,
    stdout: DuplexStream,
}

impl FakeWorker {
    /// Next line the dispatcher wrote, without its newline.
    async fn read_command(&mut self) -> String {
        let mut line = String::new();
        let n = self.stdin.read_line(&mut line).await.unwrap();
        assert!(n > 0, "dispatcher closed worker stdin");
        line.trim_end().to_string()
    }

    /// True if nothing is written for a short while.
    async fn stays_quiet(&mut self) -> bool {
        let mut line = String::new();
        timeout(QUIET, self.stdin.read_line(&mut line)).await.is_err()
    }

    async fn emit(&mut self, line: &str) {
        self.stdout.write_all(line.as_bytes()).await.unwrap();
        self.stdout.write_all(b"\n").await.unwrap();
    }

    async fn reply(&mut self, msg: &str) {
        self.emit(&format!(r#"{{"status":"success", "msg":"{msg}"}}"#))
            .await;
    }
}

fn start() -> (DispatcherHandle, FakeWorker, JoinHandle<()>) {
    let (to_worker, worker_stdin) = tokio::io::duplex(4096);
    let (worker_stdout, from_worker) = tokio::io::duplex(4096);
    let (handle, task) = Dispatcher::spawn(
        Box::new(LineWriter::new(to_worker)),
        Box::new(LineReader::new(from_worker)),
        Box::new(JsonReplyDecoder),
    );
    let worker = FakeWorker {
        stdin: BufReader::new(worker_stdin),
        stdout: worker_stdout,
    };
    (handle, worker, task)
}

async fn next_event(events: &mut broadcast::Receiver<DispatchEvent>) -> DispatchEvent {
    timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("event within 5s")
        .unwrap()
}

#[tokio::test]
async fn second_command_waits_for_first_reply() {
    let (handle, mut worker, _task) = start();

    let a = handle.enqueue("A", true);
    let b = handle.enqueue("B", true);

    assert_eq!(worker.read_command().await, "A");
    assert!(worker.stays_quiet().await, "B written before A's reply");

    worker.reply("reply to A").await;
    assert_eq!(worker.read_command().await, "B");
    worker.reply("reply to B").await;

    assert_eq!(a.wait().await.unwrap().msg(), Some("reply to A"));
    assert_eq!(b.wait().await.unwrap().msg(), Some("reply to B"));
}

#[tokio::test]
async fn write_order_matches_enqueue_order() {
    let (handle, mut worker, _task) = start();

    let pending: Vec<_> = (0..25)
        .map(|i| handle.enqueue(format!("CMD {i}"), true))
        .collect();
    let waiting = tokio::spawn(futures::future::join_all(
        pending.into_iter().map(|p| p.wait()),
    ));

    for i in 0..25 {
        let command = worker.read_command().await;
        assert_eq!(command, format!("CMD {i}"));
        worker.reply(&command).await;
    }

    let replies = waiting.await.unwrap();
    for (i, reply) in replies.into_iter().enumerate() {
        assert_eq!(reply.unwrap().msg(), Some(format!("CMD {i}").as_str()));
    }
}

#[tokio::test]
async fn concurrent_callers_get_their_own_replies() {
    let (handle, mut worker, _task) = start();

    let callers: Vec<_> = (0..20)
        .map(|i| {
            let handle = handle.clone();
            tokio::spawn(async move {
                let text = format!("ECHO {i}");
                let reply = handle.submit(text.clone(), true).await.unwrap();
                assert_eq!(reply.msg(), Some(text.as_str()));
            })
        })
        .collect();

    let mut seen = Vec::new();
    for _ in 0..20 {
        let command = worker.read_command().await;
        worker.reply(&command).await;
        seen.push(command);
    }

    for caller in callers {
        caller.await.unwrap();
    }
    seen.sort();
    seen.dedup();
    assert_eq!(seen.len(), 20, "every command written exactly once");
}

#[tokio::test]
async fn never_more_than_one_in_flight() {
    let (handle, mut worker, _task) = start();
    let mut events = handle.subscribe();

    let pending: Vec<_> = (0..10)
        .map(|i| handle.enqueue(format!("CMD {i}"), i % 3 != 0))
        .collect();

    let driver = tokio::spawn(async move {
        for i in 0..10 {
            let command = worker.read_command().await;
            if i % 3 != 0 {
                worker.emit("working...").await;
                worker.reply(&command).await;
            }
        }
        worker
    });

    let mut in_flight = 0;
    let mut resolved = 0;
    while resolved < 10 {
        match next_event(&mut events).await {
            DispatchEvent::Written { .. } => {
                in_flight += 1;
                assert!(in_flight <= 1, "two commands in flight");
            }
            DispatchEvent::Resolved { ok } => {
                assert!(ok);
                in_flight -= 1;
                resolved += 1;
            }
            DispatchEvent::Noise { .. } => assert_eq!(in_flight, 1),
            other => panic!("unexpected event {other:?}"),
        }
    }

    for p in pending {
        p.wait().await.unwrap();
    }
    driver.await.unwrap();
}

#[tokio::test]
async fn no_reply_command_resolves_without_output() {
    let (handle, mut worker, _task) = start();

    let reply = timeout(Duration::from_secs(5), handle.submit("C", false))
        .await
        .expect("resolved without any worker output")
        .unwrap();
    assert!(reply.is_ack());
    assert_eq!(worker.read_command().await, "C");

    // The next command goes out straight away.
    let next = handle.enqueue("NEXT", true);
    assert_eq!(worker.read_command().await, "NEXT");
    worker.reply("ok").await;
    assert_eq!(next.wait().await.unwrap().msg(), Some("ok"));
}

#[tokio::test]
async fn no_reply_command_does_not_consume_output() {
    let (handle, mut worker, _task) = start();

    let c = handle.enqueue("C", false);
    let d = handle.enqueue("D", true);
    assert!(c.wait().await.unwrap().is_ack());

    assert_eq!(worker.read_command().await, "C");
    assert_eq!(worker.read_command().await, "D");
    worker.reply("for D").await;
    assert_eq!(d.wait().await.unwrap().msg(), Some("for D"));
}

#[tokio::test]
async fn noise_before_reply_is_skipped() {
    let (handle, mut worker, _task) = start();

    let pending = handle.enqueue("PROCESS", true);
    assert_eq!(worker.read_command().await, "PROCESS");

    worker.emit("Processing order 1...").await;
    worker.emit("").await;
    worker.emit(r#"{"status":"ready"}"#).await;
    worker.emit(r#"{"status":"success", "msg":"#).await;
    worker.emit("Path: 0 -> 1 -> 4 -> 7").await;
    worker
        .emit(r#"{"status":"success", "msg":"Processed"}"#)
        .await;

    let reply = pending.wait().await.unwrap();
    assert_eq!(reply.status(), Some("success"));
    assert_eq!(reply.msg(), Some("Processed"));
}

#[tokio::test]
async fn application_error_reply_is_delivered_as_reply() {
    let (handle, mut worker, _task) = start();

    let pending = handle.enqueue("UNDO", true);
    worker.read_command().await;
    worker
        .emit(r#"{"status":"error", "msg":"Nothing to undo"}"#)
        .await;

    let reply = pending.wait().await.unwrap();
    assert_eq!(reply.status(), Some("error"));
}

#[tokio::test]
async fn closure_fails_in_flight_and_queued_without_writing() {
    let (handle, worker, task) = start();
    let FakeWorker { mut stdin, stdout } = worker;

    let d = handle.enqueue("D", true);
    let e = handle.enqueue("E", true);

    let mut line = String::new();
    stdin.read_line(&mut line).await.unwrap();
    assert_eq!(line, "D\n");

    drop(stdout);

    assert_eq!(d.wait().await, Err(DispatchError::Closed));
    assert_eq!(e.wait().await, Err(DispatchError::Closed));
    task.await.unwrap();

    // The writer went away with the task; E never reached the worker.
    line.clear();
    assert_eq!(stdin.read_line(&mut line).await.unwrap(), 0);
    assert!(handle.is_closed());
}

#[tokio::test]
async fn submit_after_closure_fails_immediately() {
    let (handle, worker, task) = start();
    drop(worker.stdout);
    task.await.unwrap();

    let result = timeout(Duration::from_secs(1), handle.submit("GET_STATE", true))
        .await
        .expect("no hang after closure");
    assert_eq!(result, Err(DispatchError::Closed));
    assert_eq!(handle.pending(), 0);
}

#[tokio::test]
async fn closure_is_announced() {
    let (handle, worker, _task) = start();
    let mut events = handle.subscribe();
    drop(worker.stdout);

    assert_eq!(next_event(&mut events).await, DispatchEvent::Closed);
}

#[tokio::test]
async fn write_failure_fails_only_that_command() {
    let (handle, worker, _task) = start();
    let FakeWorker { stdin, stdout: _stdout } = worker;
    drop(stdin);

    let first = handle.submit("A", true).await;
    assert!(matches!(first, Err(DispatchError::Write(_))));

    let second = handle.submit("B", false).await;
    assert!(matches!(second, Err(DispatchError::Write(_))));

    assert!(!handle.is_closed(), "output still open; dispatcher keeps going");
}

#[tokio::test]
async fn multi_line_command_is_rejected_before_queueing() {
    let (handle, mut worker, _task) = start();

    let result = handle.submit("ADD_ORDER 1 1 1\nDISPATCH", true).await;
    assert!(matches!(result, Err(DispatchError::InvalidCommand(_))));
    assert!(worker.stays_quiet().await);
}

#[tokio::test]
async fn idle_output_is_not_taken_as_next_reply() {
    let (handle, mut worker, _task) = start();
    let mut events = handle.subscribe();

    worker
        .emit(r#"{"status":"success", "msg":"stale"}"#)
        .await;
    assert!(matches!(
        next_event(&mut events).await,
        DispatchEvent::Stray { .. }
    ));

    let pending = handle.enqueue("GET_STATE", true);
    worker.read_command().await;
    worker.reply("fresh").await;
    assert_eq!(pending.wait().await.unwrap().msg(), Some("fresh"));
}

#[tokio::test]
async fn abandoned_caller_does_not_stall_queue() {
    let (handle, mut worker, _task) = start();

    let abandoned = handle.enqueue("SLOW", true);
    let next = handle.enqueue("NEXT", true);
    drop(abandoned);

    assert_eq!(worker.read_command().await, "SLOW");
    worker.reply("nobody listening").await;
    assert_eq!(worker.read_command().await, "NEXT");
    worker.reply("for next").await;

    assert_eq!(next.wait().await.unwrap().msg(), Some("for next"));
}

#[tokio::test]
async fn pending_counts_queued_commands() {
    let (handle, mut worker, _task) = start();

    let _a = handle.enqueue("A", true);
    let _b = handle.enqueue("B", true);
    let _c = handle.enqueue("C", true);

    assert_eq!(worker.read_command().await, "A");
    assert_eq!(handle.pending(), 2);
}

#[tokio::test]
async fn dispatcher_stops_when_handles_dropped() {
    let (handle, _worker, task) = start();
    drop(handle);

    timeout(Duration::from_secs(5), task)
        .await
        .expect("dispatcher exits")
        .unwrap();
}
