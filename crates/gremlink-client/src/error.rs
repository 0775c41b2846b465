// Error taxonomy: per-request, connection-wide, and non-attributable faults.
use std::sync::Arc;
use uuid::Uuid;

/// Failure to establish the connection. Raised from [`crate::connect`] only.
#[derive(thiserror::Error, Debug)]
pub enum ConnectError {
    #[error("websocket connect failed: {0}")]
    Transport(#[from] gremlink_transport::Error),
    #[error("connection task stopped before reporting an outcome")]
    TaskStopped,
}

/// Errors surfaced to callers through response streams or `submit`.
///
/// Cloneable so a single fatal cause can be fanned out to every pending
/// request.
#[derive(thiserror::Error, Debug, Clone)]
pub enum Error {
    /// The submitted id is already pending on this connection. Only the
    /// duplicate submission is affected.
    #[error("request id {0} is already pending")]
    DuplicateRequestId(Uuid),
    /// No terminal response arrived within the configured response timeout.
    #[error("no terminal response within the response timeout")]
    ResponseTimeout,
    /// The server closed the connection before completing the request.
    #[error("server closed the connection")]
    ServerClosed,
    /// The transport failed; the original cause is preserved.
    #[error("transport failed: {0}")]
    Transport(Arc<gremlink_transport::Error>),
    /// The request could not be encoded for the wire.
    #[error("request encoding failed: {0}")]
    Codec(Arc<gremlink_wire::Error>),
    /// The connection was already torn down when the call was made.
    #[error("connection is closed")]
    ConnectionClosed,
}

/// Inbound faults that cannot be attributed to any pending request.
///
/// These never fail the connection; they are handed to the
/// [`Settings::on_protocol_anomaly`](crate::Settings) hook and the loop
/// carries on.
#[derive(thiserror::Error, Debug)]
pub enum ProtocolAnomaly {
    #[error("undecodable response frame: {0}")]
    Decode(gremlink_wire::Error),
    #[error("response for unknown request id {0}")]
    UnexpectedRequestId(Uuid),
}
