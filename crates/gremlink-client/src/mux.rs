//! Multiplexer event loop.
//!
//! # Purpose
//! Single task that owns the request pool and the WebSocket write half. Each
//! iteration races four event sources and handles whichever wins: a new
//! request packet, an inbound frame, the reader task finishing, or a
//! per-request deadline expiring.
//!
//! # Design notes
//! Expirations are re-materialized from the pool every iteration, so an
//! entry's removal is also its timer's cancellation and a caller can never
//! observe a timeout after its terminal response. The select is intentionally
//! unbiased; no arm can starve another beyond what the runtime's select
//! provides.
use std::sync::Arc;

use bytes::Bytes;
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use gremlink_transport::{Error as TransportError, WsSink};
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{Instant, sleep_until};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::Settings;
use crate::error::{Error, ProtocolAnomaly};
use crate::pool::{PendingRequest, RequestPool, ResponseTx};

/// One submitted request, encoded and ready for the wire.
pub(crate) struct ReqPack {
    pub(crate) request_id: Uuid,
    pub(crate) payload: Bytes,
    pub(crate) output: ResponseTx,
}

/// Why the loop stopped. The supervisor turns this into the drain cause.
pub(crate) enum ExitCause {
    /// Reader finished cleanly, or every submit handle went away.
    Clean,
    /// Transport failure; preserved and fanned out to every caller.
    Transport(Arc<TransportError>),
}

impl ExitCause {
    pub(crate) fn as_error(&self) -> Error {
        match self {
            ExitCause::Clean => Error::ServerClosed,
            ExitCause::Transport(err) => Error::Transport(Arc::clone(err)),
        }
    }
}

pub(crate) async fn run_multiplexer(
    settings: &Settings,
    pool: &mut RequestPool,
    sink: &mut WsSink,
    request_rx: &mut mpsc::Receiver<ReqPack>,
    inbound_rx: &mut mpsc::UnboundedReceiver<Bytes>,
    reader: &mut Option<JoinHandle<Result<(), TransportError>>>,
) -> ExitCause {
    loop {
        // One future per pending entry; entries removed by earlier iterations
        // are simply never enumerated again.
        let mut expired: FuturesUnordered<_> = pool
            .expirations()
            .map(|(id, deadline)| async move {
                sleep_until(deadline).await;
                id
            })
            .collect();

        tokio::select! {
            pack = request_rx.recv() => match pack {
                Some(pack) => {
                    if let Err(cause) = handle_request(settings, pool, sink, pack).await {
                        return cause;
                    }
                }
                // All submit handles dropped; treat like a clean close.
                None => return ExitCause::Clean,
            },
            frame = inbound_rx.recv() => match frame {
                Some(payload) => handle_response(settings, pool, &payload),
                None => {
                    // The reader dropped its sender and every frame has been
                    // consumed; its result says whether that was clean.
                    let handle = reader.take().expect("reader joined at most once");
                    return exit_from_join(handle.await);
                }
            },
            joined = reader.as_mut().expect("reader joined at most once") => {
                *reader = None;
                return exit_from_join(joined);
            }
            Some(request_id) = expired.next(), if !expired.is_empty() => {
                if let Some(entry) = pool.remove(&request_id) {
                    debug!(%request_id, "request timed out");
                    let _ = entry.output.send(Err(Error::ResponseTimeout));
                }
            }
        }
    }
}

/// Register the request and put its payload on the wire.
///
/// A duplicate id fails only the new submission; the wire is left untouched.
/// Send failures are fatal to the whole connection.
async fn handle_request(
    settings: &Settings,
    pool: &mut RequestPool,
    sink: &mut WsSink,
    pack: ReqPack,
) -> Result<(), ExitCause> {
    let ReqPack { request_id, payload, output } = pack;
    let deadline = Instant::now() + settings.response_timeout;
    let rejected = output.clone();
    if !pool.try_insert(request_id, move || PendingRequest { output, deadline }) {
        debug!(%request_id, "refused duplicate request id");
        let _ = rejected.send(Err(Error::DuplicateRequestId(request_id)));
        return Ok(());
    }
    if let Err(err) = sink.send_binary(payload).await {
        debug!(error = %err, "websocket send failed");
        return Err(ExitCause::Transport(Arc::new(err)));
    }
    Ok(())
}

/// Decode an inbound frame and route it to its pending request.
fn handle_response(settings: &Settings, pool: &mut RequestPool, payload: &[u8]) {
    let response = match settings.codec.decode(payload) {
        Ok(response) => response,
        Err(err) => {
            (settings.on_protocol_anomaly)(&ProtocolAnomaly::Decode(err));
            return;
        }
    };
    let request_id = response.request_id();
    if response.is_terminal() {
        // Remove before delivering: once the caller has seen the end of the
        // stream, no timer event can reach it.
        match pool.remove(&request_id) {
            Some(entry) => {
                let _ = entry.output.send(Ok(response));
            }
            None => {
                (settings.on_protocol_anomaly)(&ProtocolAnomaly::UnexpectedRequestId(request_id));
            }
        }
    } else {
        match pool.get(&request_id) {
            Some(entry) => {
                let _ = entry.output.send(Ok(response));
            }
            None => {
                (settings.on_protocol_anomaly)(&ProtocolAnomaly::UnexpectedRequestId(request_id));
            }
        }
    }
}

fn exit_from_join(joined: Result<Result<(), TransportError>, JoinError>) -> ExitCause {
    match joined {
        Ok(Ok(())) => ExitCause::Clean,
        Ok(Err(err)) => ExitCause::Transport(Arc::new(err)),
        // A panicking reader is a bug; surface it in the logs and fail the
        // pending requests the same way an unexplained disconnect would.
        Err(join_err) => {
            warn!(error = %join_err, "reader task failed");
            ExitCause::Clean
        }
    }
}
