// Gremlin Server message schema and content-type framing for binary payloads.
use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Content type emitted by the default JSON codec.
pub const APPLICATION_JSON_V3: &str = "application/vnd.gremlin-v3.0+json";

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("content type of {0} bytes does not fit the one-byte length prefix")]
    ContentTypeTooLong(usize),
    #[error("frame shorter than its declared content type")]
    Truncated,
    #[error("content type is not valid utf-8")]
    InvalidContentType,
}

/// Response status codes defined by the Gremlin Server protocol.
pub mod status {
    pub const SUCCESS: u16 = 200;
    pub const NO_CONTENT: u16 = 204;
    /// The only continuation status: more responses follow for the same request.
    pub const PARTIAL_CONTENT: u16 = 206;
    pub const UNAUTHORIZED: u16 = 401;
    pub const AUTHENTICATE: u16 = 407;
    pub const MALFORMED_REQUEST: u16 = 498;
    pub const INVALID_REQUEST_ARGUMENTS: u16 = 499;
    pub const SERVER_ERROR: u16 = 500;
    pub const SCRIPT_EVALUATION_ERROR: u16 = 597;
    pub const SERVER_TIMEOUT: u16 = 598;
    pub const SERVER_SERIALIZATION_ERROR: u16 = 599;
}

/// A single request submitted over the connection.
///
/// The correlation id is chosen before the request is enqueued; all responses
/// for the request carry it back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestMessage {
    pub request_id: Uuid,
    pub op: String,
    pub processor: String,
    pub args: Value,
}

impl RequestMessage {
    // Fresh random correlation id per message.
    pub fn new(op: impl Into<String>, processor: impl Into<String>, args: Value) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            op: op.into(),
            processor: processor.into(),
            args,
        }
    }

    pub fn with_request_id(mut self, request_id: Uuid) -> Self {
        self.request_id = request_id;
        self
    }
}

/// One message of a response stream.
///
/// A request yields one or more of these; the stream ends with the first
/// terminal message (any status other than 206).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMessage {
    pub request_id: Uuid,
    pub status: ResponseStatus,
    #[serde(default)]
    pub result: ResponseResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseStatus {
    pub code: u16,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub attributes: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseResult {
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub meta: Value,
}

impl ResponseMessage {
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// True when this is the final message of its response stream.
    pub fn is_terminal(&self) -> bool {
        self.status.code != status::PARTIAL_CONTENT
    }
}

/// Prefix `body` with the length-tagged content type, producing a complete
/// binary WebSocket payload.
///
/// ```
/// use gremlink_wire::{frame_payload, split_frame, APPLICATION_JSON_V3};
///
/// let payload = frame_payload(APPLICATION_JSON_V3, b"{}").expect("frame");
/// let (mime, body) = split_frame(&payload).expect("split");
/// assert_eq!(mime, APPLICATION_JSON_V3);
/// assert_eq!(body, b"{}");
/// ```
pub fn frame_payload(content_type: &str, body: &[u8]) -> Result<Bytes> {
    let mime = content_type.as_bytes();
    if mime.len() > u8::MAX as usize {
        return Err(Error::ContentTypeTooLong(mime.len()));
    }
    // Exact-size allocation; the frame is written once and frozen.
    let mut buf = BytesMut::with_capacity(1 + mime.len() + body.len());
    buf.put_u8(mime.len() as u8);
    buf.extend_from_slice(mime);
    buf.extend_from_slice(body);
    Ok(buf.freeze())
}

/// Split a framed payload back into its content type and body.
pub fn split_frame(payload: &[u8]) -> Result<(&str, &[u8])> {
    let (&len, rest) = payload.split_first().ok_or(Error::Truncated)?;
    if rest.len() < len as usize {
        return Err(Error::Truncated);
    }
    let (mime, body) = rest.split_at(len as usize);
    let mime = std::str::from_utf8(mime).map_err(|_| Error::InvalidContentType)?;
    Ok((mime, body))
}

pub fn encode_request(message: &RequestMessage) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(message)?)
}

pub fn decode_response(payload: &[u8]) -> Result<ResponseMessage> {
    Ok(serde_json::from_slice(payload)?)
}
