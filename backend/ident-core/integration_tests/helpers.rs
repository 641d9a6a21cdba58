//! Test helpers for ident integration tests.
//!
//! This module provides a throwaway ident server bound to an ephemeral loopback
//! port. Each accepted connection reads one query line and hands it to a
//! responder closure; `None` keeps the connection open without answering.

use ident_core::{Endpoints, IdentConfig};

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub type Responder = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Fake ident server and the query lines it has seen.
pub struct FakeIdentServer {
    pub port: u16,
    pub queries: Arc<Mutex<Vec<String>>>,
    handle: JoinHandle<()>,
}

impl FakeIdentServer {
    /// Test helper: Start a server that answers every query with `responder`.
    pub async fn start<F>(responder: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake ident server");
        let port = listener
            .local_addr()
            .expect("Fake ident server has no local address")
            .port();

        let responder: Responder = Arc::new(responder);
        let queries = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&queries);

        let handle = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let responder = Arc::clone(&responder);
                let seen = Arc::clone(&seen);

                tokio::spawn(async move {
                    let (read, mut write) = stream.into_split();
                    let mut reader = BufReader::new(read);
                    let mut line = String::new();
                    if reader.read_line(&mut line).await.is_err() {
                        return;
                    }
                    seen.lock().unwrap().push(line.clone());

                    match responder(line.trim_end()) {
                        Some(reply) => {
                            let _ = write.write_all(reply.as_bytes()).await;
                            let _ = write.shutdown().await;
                        }
                        None => {
                            tokio::time::sleep(std::time::Duration::from_secs(30)).await;
                        }
                    }
                });
            }
        });

        Self {
            port,
            queries,
            handle,
        }
    }

    /// Test helper: Client configuration pointing at this server.
    pub fn config(&self, timeout_secs: u64) -> IdentConfig {
        IdentConfig::new(self.port, timeout_secs)
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

impl Drop for FakeIdentServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Test helper: Endpoints of a loopback connection from `remote_port` to `local_port`.
pub fn loopback_endpoints(local_port: u16, remote_port: u16) -> Endpoints {
    let local: SocketAddr = format!("127.0.0.1:{local_port}").parse().unwrap();
    let remote: SocketAddr = format!("127.0.0.1:{remote_port}").parse().unwrap();
    Endpoints::new(local, remote)
}

/// Test helper: Reply naming `user` for whatever pair was asked about.
pub fn userid_reply(query: &str, os: &str, user: &str) -> String {
    let (server, client) = query
        .split_once(',')
        .expect("Query line without a comma");
    format!("{} , {} : USERID : {os} : {user}\r\n", server.trim(), client.trim())
}

/// Test helper: ERROR reply carrying `token` for the pair asked about.
pub fn error_reply(query: &str, token: &str) -> String {
    let (server, client) = query
        .split_once(',')
        .expect("Query line without a comma");
    format!("{} , {} : ERROR : {token}\r\n", server.trim(), client.trim())
}
