//! Connection lifetime supervisor and caller-facing handle.
//!
//! # Purpose
//! Opens the WebSocket, spawns the reader and multiplexer, reports the
//! connect outcome, and guarantees teardown: whatever way the connection
//! ends, every pending and queued request observes the causing error and no
//! task or timer survives.
//!
//! # Design notes
//! `close` is a watch signal raced against the multiplexer rather than a task
//! abort, so the cleanup below the race always runs. Dropping the last
//! [`Connection`] drops the watch sender, which trips the same signal.
use std::sync::Arc;

use gremlink_wire::RequestMessage;
use tokio::sync::{Mutex, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::config::Settings;
use crate::error::{ConnectError, Error};
use crate::handle::ResponseHandle;
use crate::mux::{ExitCause, ReqPack, run_multiplexer};
use crate::pool::RequestPool;
use crate::reader::run_reader;

/// A live connection to one Gremlin Server.
///
/// Submit is shared (wrap the connection in an [`Arc`] to use it from many
/// tasks); the supervisor handle behind `close` is held exclusively.
#[derive(Debug)]
pub struct Connection {
    request_tx: mpsc::Sender<ReqPack>,
    close_tx: watch::Sender<bool>,
    supervisor: Mutex<Option<JoinHandle<()>>>,
    settings: Arc<Settings>,
}

/// Open a connection and wait for the outcome of the WebSocket handshake.
pub async fn connect(settings: Settings, host: &str, port: u16) -> Result<Connection, ConnectError> {
    let settings = Arc::new(settings);
    let url = format!("ws://{host}:{port}{}", settings.endpoint_path);
    let (request_tx, request_rx) = mpsc::channel(settings.request_queue_size.max(1));
    let (ready_tx, ready_rx) = oneshot::channel();
    let (close_tx, close_rx) = watch::channel(false);

    let supervisor = tokio::spawn(run_supervisor(
        Arc::clone(&settings),
        url,
        request_rx,
        ready_tx,
        close_rx,
    ));

    match ready_rx.await {
        Ok(Ok(())) => Ok(Connection {
            request_tx,
            close_tx,
            supervisor: Mutex::new(Some(supervisor)),
            settings,
        }),
        Ok(Err(err)) => Err(err),
        Err(_) => Err(ConnectError::TaskStopped),
    }
}

impl Connection {
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Encode `request` and enqueue it for the multiplexer.
    ///
    /// Waits while the submit queue is full; the returned handle starts
    /// receiving once the request reaches the wire. The request id must not
    /// collide with one currently pending on this connection.
    pub async fn submit(&self, request: RequestMessage) -> Result<ResponseHandle, Error> {
        let payload = self
            .settings
            .codec
            .encode_binary(&request)
            .map_err(|err| Error::Codec(Arc::new(err)))?;
        let request_id = request.request_id;
        let (output, rx) = mpsc::unbounded_channel();
        self.request_tx
            .send(ReqPack { request_id, payload, output })
            .await
            .map_err(|_| Error::ConnectionClosed)?;
        Ok(ResponseHandle::new(request_id, rx))
    }

    /// Tear the connection down and wait for cleanup to finish.
    ///
    /// Queued-but-unsent requests are dropped with the close cause rather
    /// than flushed; their handles observe the error.
    pub async fn close(&self) {
        let _ = self.close_tx.send(true);
        if let Some(handle) = self.supervisor.lock().await.take() {
            let _ = handle.await;
        }
    }
}

async fn run_supervisor(
    settings: Arc<Settings>,
    url: String,
    mut request_rx: mpsc::Receiver<ReqPack>,
    ready_tx: oneshot::Sender<Result<(), ConnectError>>,
    mut close_rx: watch::Receiver<bool>,
) {
    let connection = match gremlink_transport::connect(&url).await {
        Ok(connection) => connection,
        Err(err) => {
            let _ = ready_tx.send(Err(ConnectError::Transport(err)));
            return;
        }
    };
    let _ = ready_tx.send(Ok(()));
    debug!(%url, "websocket connected");

    let (mut sink, source) = connection.split();
    let (inbound_tx, mut inbound_rx) = mpsc::unbounded_channel();
    let mut reader = Some(tokio::spawn(run_reader(source, inbound_tx)));
    let mut pool = RequestPool::new();

    let cause = tokio::select! {
        cause = run_multiplexer(
            &settings,
            &mut pool,
            &mut sink,
            &mut request_rx,
            &mut inbound_rx,
            &mut reader,
        ) => cause,
        // Fires on close() and when the last Connection handle is dropped.
        _ = close_rx.changed() => ExitCause::Clean,
    };

    // Teardown runs on every exit path. Order: stop the reader, fail the
    // pending requests, fail the queued requests, close the socket.
    if let Some(handle) = reader.take() {
        handle.abort();
        let _ = handle.await;
    }
    let error = cause.as_error();
    pool.drain(&error);
    debug_assert!(pool.is_empty());
    request_rx.close();
    while let Ok(pack) = request_rx.try_recv() {
        let _ = pack.output.send(Err(error.clone()));
    }
    let _ = sink.close().await;
    debug!("connection supervisor exited");
}
