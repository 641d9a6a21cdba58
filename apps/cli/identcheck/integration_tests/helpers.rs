//! Test helpers for identcheck integration tests.
//!
//! - A fake ident server on an ephemeral loopback port that answers every query
//!   for one user (or with one ERROR token), switchable mid-test, and counts queries
//! - A client for the same-user gate

use identcheck::commands::serve::SESSION_LINE_PREFIX;

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// What the fake ident server says about every connection.
#[derive(Debug, Clone)]
pub enum IdentAnswer {
    User(&'static str),
    Error(&'static str),
}

pub struct FakeIdentServer {
    pub port: u16,
    answer: Arc<Mutex<IdentAnswer>>,
    queries: Arc<AtomicUsize>,
    handle: JoinHandle<()>,
}

impl FakeIdentServer {
    pub async fn start(answer: IdentAnswer) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake ident server");
        let port = listener.local_addr().unwrap().port();
        let answer = Arc::new(Mutex::new(answer));
        let current = Arc::clone(&answer);
        let queries = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&queries);

        let handle = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let answer = current.lock().unwrap().clone();
                let counter = Arc::clone(&counter);
                tokio::spawn(async move {
                    let (read, mut write) = stream.into_split();
                    let mut line = String::new();
                    if BufReader::new(read).read_line(&mut line).await.is_err() {
                        return;
                    }
                    counter.fetch_add(1, Ordering::SeqCst);

                    let pair = line.trim_end().replace(',', " , ");
                    let reply = match answer {
                        IdentAnswer::User(user) => format!("{pair} : USERID : UNIX : {user}\r\n"),
                        IdentAnswer::Error(token) => format!("{pair} : ERROR : {token}\r\n"),
                    };
                    let _ = write.write_all(reply.as_bytes()).await;
                    let _ = write.shutdown().await;
                });
            }
        });

        Self {
            port,
            answer,
            queries,
            handle,
        }
    }

    /// Test helper: Change what identd reports for subsequent connections.
    pub fn set_answer(&self, answer: IdentAnswer) {
        *self.answer.lock().unwrap() = answer;
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

impl Drop for FakeIdentServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Test helper: Send a session line to the gate and return its status line.
pub async fn ask_gate(gate: SocketAddr, session_key: &str) -> String {
    let mut stream = TcpStream::connect(gate)
        .await
        .expect("Failed to connect to gate");
    stream
        .write_all(format!("{session_key}\n").as_bytes())
        .await
        .expect("Failed to send session line");

    let mut answer = String::new();
    stream
        .read_to_string(&mut answer)
        .await
        .expect("Failed to read gate answer");
    answer
}

/// Test helper: The session key issued in a gate answer, if any.
pub fn issued_key(answer: &str) -> Option<String> {
    answer
        .lines()
        .find_map(|line| line.strip_prefix(SESSION_LINE_PREFIX))
        .map(str::to_string)
}

/// Test helper: The status line of a gate answer, CRLF included.
pub fn status_line(answer: &str) -> &str {
    match answer.find("\r\n") {
        Some(end) => &answer[..end + 2],
        None => answer,
    }
}
