//! Gremlin Server driver core: one WebSocket shared by many callers.
//!
//! A [`Connection`] multiplexes concurrent requests onto a single long-lived
//! WebSocket. Each request is correlated by id; streaming responses are
//! routed back to the submitting caller's [`ResponseHandle`], with a
//! per-request response timeout and a bounded submit queue for backpressure.
//!
//! ```no_run
//! use gremlink_client::{RequestMessage, Settings, connect};
//! use serde_json::json;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let connection = connect(Settings::default(), "localhost", 8182).await?;
//! let request = RequestMessage::new("eval", "", json!({ "gremlin": "g.V().count()" }));
//! let mut handle = connection.submit(request).await?;
//! while let Some(response) = handle.next_response().await? {
//!     println!("{:?}", response.result.data);
//! }
//! connection.close().await;
//! # Ok(())
//! # }
//! ```
pub use crate::codec::{Codec, JsonCodec};
pub use crate::config::{AnomalyHook, Settings};
pub use crate::connection::{Connection, connect};
pub use crate::error::{ConnectError, Error, ProtocolAnomaly};
pub use crate::handle::ResponseHandle;
pub use gremlink_wire::{RequestMessage, ResponseMessage};

mod codec;
mod config;
mod connection;
mod error;
mod handle;
mod mux;
mod pool;
mod reader;
