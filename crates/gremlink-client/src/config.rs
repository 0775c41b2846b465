// Connection settings and defaults.
use std::sync::Arc;
use std::time::Duration;

use crate::codec::{Codec, JsonCodec};
use crate::error::ProtocolAnomaly;

pub(crate) const DEFAULT_ENDPOINT_PATH: &str = "/gremlin";
pub(crate) const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(60);
pub(crate) const DEFAULT_REQUEST_QUEUE_SIZE: usize = 8;

/// Sink for faults that cannot be attributed to a pending request.
pub type AnomalyHook = Arc<dyn Fn(&ProtocolAnomaly) + Send + Sync>;

/// Per-connection settings, fixed at connect time.
#[derive(Clone)]
pub struct Settings {
    /// Encoder/decoder pair used for every message on this connection.
    pub codec: Arc<dyn Codec>,
    /// WebSocket URL path on the server.
    pub endpoint_path: String,
    /// Called for decode failures and responses with unknown request ids.
    pub on_protocol_anomaly: AnomalyHook,
    /// Deadline for the final response of each request's stream.
    pub response_timeout: Duration,
    /// Capacity of the submit queue; `submit` waits while it is full.
    pub request_queue_size: usize,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("endpoint_path", &self.endpoint_path)
            .field("response_timeout", &self.response_timeout)
            .field("request_queue_size", &self.request_queue_size)
            .finish_non_exhaustive()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            codec: Arc::new(JsonCodec),
            endpoint_path: DEFAULT_ENDPOINT_PATH.to_string(),
            on_protocol_anomaly: Arc::new(|anomaly| eprintln!("gremlink: {anomaly}")),
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
            request_queue_size: DEFAULT_REQUEST_QUEUE_SIZE,
        }
    }
}
