//! Loopback same-user gate over plain TCP.
//!
//! A client connects, sends one line holding a session key (blank on first
//! contact) and receives `"<status> <reason>\r\n"`:
//!
//! - `200 OK` when identd reports the connection's owner as the service user
//! - `403 Forbidden` for any other user, or for peers that are not `127.0.0.1`
//! - `500 Internal Server Error` when the ident lookup itself failed
//!
//! Session keys are issued by the gate, never chosen by clients. After a fresh
//! 200 or 403 the answer carries a second line, `"Session: <uuid>\r\n"`, and the
//! decision is remembered under that key in a [`SessionCache`]. Presenting it
//! later skips the ident lookup. Any other key is ignored and the connection is
//! checked as if no key had been sent.

use crate::error::IdentcheckError;
use crate::session::SessionCache;

use ident_core::{AccessDecision, Endpoints, IdentClient, SameUserEvaluator, ServerIdentity};

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::spawn as TokioSpawn;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// How long a client may take to send its session line.
const SESSION_LINE_TIMEOUT: Duration = Duration::from_secs(5);

/// Longest accepted session key line.
const MAX_SESSION_LINE: u64 = 512;

/// Prefix of the answer line carrying a newly issued session key.
pub const SESSION_LINE_PREFIX: &str = "Session: ";

/// Handle to a running gate. Dropping it stops accepting connections.
pub struct ServeHandle {
    local_addr: SocketAddr,
    task: JoinHandle<()>,
}

impl ServeHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Wait for the accept loop, which only ends if the listener fails.
    pub async fn join(mut self) -> Result<(), IdentcheckError> {
        (&mut self.task)
            .await
            .map_err(|e| IdentcheckError::identcheck(format!("Accept loop aborted: {e}")))
    }
}

impl Drop for ServeHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Shared by every connection the gate serves.
#[derive(Clone)]
struct GateContext {
    client: IdentClient,
    identity: Arc<ServerIdentity>,
    sessions: SessionCache,
}

/// Bind `listen` and start answering same-user checks in the background.
///
/// # Errors
///
/// Returns [`IdentcheckError::Identcheck`] if the address cannot be bound.
pub async fn start(
    listen: SocketAddr,
    client: IdentClient,
    identity: Arc<ServerIdentity>,
    sessions: SessionCache,
) -> Result<ServeHandle, IdentcheckError> {
    let listener = TcpListener::bind(listen)
        .await
        .map_err(|e| IdentcheckError::identcheck(format!("Failed to bind {listen}: {e}")))?;
    let local_addr = listener.local_addr()?;

    info!(
        "Same-user gate listening on {local_addr} for {}",
        identity.username()
    );

    let context = GateContext {
        client,
        identity,
        sessions,
    };

    let task = TokioSpawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    debug!("Connection from {peer}");
                    TokioSpawn(handle_connection(stream, peer, context.clone()));
                }
                Err(e) => {
                    error!("Accept failed: {e}");
                    break;
                }
            }
        }
    });

    Ok(ServeHandle { local_addr, task })
}

/// `identcheck serve`: run the gate until the process is stopped.
pub async fn run(
    listen: SocketAddr,
    client: IdentClient,
    evaluator: SameUserEvaluator<'static>,
) -> Result<std::process::ExitCode, IdentcheckError> {
    let identity = Arc::new(evaluator.identity().clone());
    let handle = start(listen, client, identity, SessionCache::new()).await?;

    tokio::select! {
        result = handle.join() => result?,
        _ = tokio::signal::ctrl_c() => info!("Interrupted, shutting down"),
    }

    Ok(std::process::ExitCode::SUCCESS)
}

async fn handle_connection(stream: TcpStream, peer: SocketAddr, context: GateContext) {
    if let Err(e) = serve_one(stream, peer, &context).await {
        warn!("Connection from {peer} ended with error: {e}");
    }
}

async fn serve_one(
    stream: TcpStream,
    peer: SocketAddr,
    context: &GateContext,
) -> Result<(), IdentcheckError> {
    let local = stream.local_addr()?;
    let (read, mut write) = stream.into_split();

    let resumed = match read_session_key(read).await? {
        Some(presented) => issued_session(&context.sessions, &presented).await,
        None => None,
    };
    let (key, fresh) = match resumed {
        Some(key) => (key, false),
        None => (Uuid::new_v4().to_string(), true),
    };

    let endpoints = Endpoints::new(local, peer);
    let client = &context.client;
    let evaluator = SameUserEvaluator::new(&context.identity);

    let decision = context
        .sessions
        .evaluate_cached(&key, move || async move {
            let result = client.query_async(endpoints, None).await;
            evaluator.check(&result)
        })
        .await;

    let status = decision.status();
    if status.is_server_error() {
        warn!("Session {key} from {peer}: {status}");
    } else if status.is_client_error() {
        info!("Session {key} from {peer} denied: {status}");
    } else {
        debug!("Session {key} from {peer}: {status}");
    }

    let mut answer = format!("{status}\r\n");
    if fresh && !matches!(decision, AccessDecision::Failed(_)) {
        answer.push_str(&format!("{SESSION_LINE_PREFIX}{key}\r\n"));
    }

    write.write_all(answer.as_bytes()).await?;
    write.shutdown().await?;

    Ok(())
}

/// The canonical form of `presented` if the gate issued it, else `None`.
///
/// The gate only issues UUIDs; one counts as issued once a decision is cached under it.
async fn issued_session(sessions: &SessionCache, presented: &str) -> Option<String> {
    let Ok(uuid) = Uuid::parse_str(presented) else {
        debug!("Ignoring client-chosen session key");
        return None;
    };

    let key = uuid.to_string();
    if sessions.get(&key).await.is_none() {
        debug!("Ignoring unknown session key {key}");
        return None;
    }

    Some(key)
}

/// Read the session line; `None` for a blank key.
async fn read_session_key<R>(read: R) -> Result<Option<String>, IdentcheckError>
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut reader = BufReader::new(tokio::io::AsyncReadExt::take(read, MAX_SESSION_LINE));
    let mut line = String::new();

    tokio::time::timeout(SESSION_LINE_TIMEOUT, reader.read_line(&mut line))
        .await
        .map_err(|_| IdentcheckError::identcheck("Timed out waiting for session line"))??;

    let key = line.trim();
    Ok((!key.is_empty()).then(|| key.to_string()))
}
