// Pluggable message codec boundary; the connection only sees framed bytes.
use bytes::Bytes;
use gremlink_wire::{self as wire, RequestMessage, ResponseMessage};

/// Encoder/decoder pair fixed at connect time.
///
/// `encode_binary` must be deterministic for equal input and must produce the
/// complete payload including the content-type framing; `decode` failures are
/// not fatal to the connection.
pub trait Codec: Send + Sync {
    fn content_type(&self) -> &str;

    fn encode_binary(&self, message: &RequestMessage) -> wire::Result<Bytes>;

    fn decode(&self, payload: &[u8]) -> wire::Result<ResponseMessage>;
}

/// Default codec: Gremlin v3 JSON.
#[derive(Debug, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn content_type(&self) -> &str {
        wire::APPLICATION_JSON_V3
    }

    fn encode_binary(&self, message: &RequestMessage) -> wire::Result<Bytes> {
        let body = wire::encode_request(message)?;
        wire::frame_payload(self.content_type(), &body)
    }

    fn decode(&self, payload: &[u8]) -> wire::Result<ResponseMessage> {
        wire::decode_response(payload)
    }
}
