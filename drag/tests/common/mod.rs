//! Shared helpers for the listener integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use drag::{AppState, CommandRunner, Config, ExecError, ExecutionGate, ShellRunner};
use futures::future::{BoxFuture, FutureExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

pub const SECRET: &str = "abc";

pub fn config(command: &str) -> Config {
    Config {
        secret: SECRET.to_string(),
        command: command.to_string(),
        init_command: None,
        interval: None,
        port: 0,
    }
}

/// Counts invocations and delegates to the real shell.
#[derive(Default)]
pub struct SpyRunner {
    shell: ShellRunner,
    calls: AtomicUsize,
}

impl SpyRunner {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CommandRunner for SpyRunner {
    fn run<'a>(&'a self, command: &'a str) -> BoxFuture<'a, Result<(), ExecError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.shell.run(command)
    }
}

/// Records the start and end instant of every run.
pub struct TimedRunner {
    work: Duration,
    spans: Mutex<Vec<(Instant, Instant)>>,
}

impl TimedRunner {
    pub fn new(work: Duration) -> Self {
        Self {
            work,
            spans: Mutex::new(Vec::new()),
        }
    }

    pub fn spans(&self) -> Vec<(Instant, Instant)> {
        let mut spans = self.spans.lock().unwrap().clone();
        spans.sort_by_key(|(start, _)| *start);
        spans
    }
}

impl CommandRunner for TimedRunner {
    fn run<'a>(&'a self, _command: &'a str) -> BoxFuture<'a, Result<(), ExecError>> {
        async move {
            let start = Instant::now();
            tokio::time::sleep(self.work).await;
            let end = Instant::now();
            self.spans.lock().unwrap().push((start, end));
            Ok(())
        }
        .boxed()
    }
}

/// Assert that no two recorded runs overlap in time.
pub fn assert_no_overlap(spans: &[(Instant, Instant)]) {
    for pair in spans.windows(2) {
        assert!(
            pair[0].1 <= pair[1].0,
            "runs overlap: {:?} ends after next starts",
            pair[0]
        );
    }
}

/// Serve on an ephemeral port and return its address.
pub async fn start(config: Config, runner: Arc<dyn CommandRunner>) -> (SocketAddr, Arc<ExecutionGate>) {
    let gate = Arc::new(ExecutionGate::new(runner));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = AppState::new(config, Arc::clone(&gate));
    tokio::spawn(async move {
        drag::web::serve(listener, state).await.unwrap();
    });
    (addr, gate)
}

/// Send a raw HTTP request and return the status line of the response.
///
/// Only the response head is read, so this works even when the request
/// body was never sent.
pub async fn raw_status_line(addr: SocketAddr, request: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    let read_head = async {
        loop {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            if buf.windows(4).any(|w| w == b"\r\n\r\n") {
                break;
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(5), read_head)
        .await
        .expect("no response head within 5s");

    let head = String::from_utf8_lossy(&buf);
    head.lines()
        .next()
        .unwrap_or_else(|| panic!("empty response: {:?}", head))
        .to_string()
}

/// Like [`raw_status_line`], but only the numeric status code.
pub async fn raw_status(addr: SocketAddr, request: &str) -> u16 {
    let line = raw_status_line(addr, request).await;
    line.split_whitespace()
        .nth(1)
        .and_then(|code| code.parse().ok())
        .unwrap_or_else(|| panic!("malformed status line: {:?}", line))
}
