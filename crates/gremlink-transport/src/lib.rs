// Client WebSocket wrapper: connect, split into halves, binary send/receive.
use bytes::Bytes;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, protocol::Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

/// Close status meaning "normal closure" (RFC 6455 §7.4.1).
pub const NORMAL_CLOSE: u16 = 1000;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("websocket connect failed: {0}")]
    Connect(#[source] tungstenite::Error),
    #[error("websocket i/o failed: {0}")]
    Io(#[source] tungstenite::Error),
    #[error("connection closed with status {code}: {reason:?}")]
    AbnormalClose { code: u16, reason: String },
}

/// Something the read half handed back: either a message payload or the
/// server's close frame. Ping/pong stays inside the WebSocket library.
#[derive(Debug)]
pub enum Incoming {
    Payload(Bytes),
    Closed { code: u16, reason: String },
}

/// An established client WebSocket, ready to be split into halves.
#[derive(Debug)]
pub struct WsConnection {
    inner: WsStream,
}

/// Open a client WebSocket to `url` (`ws://host:port/path`).
pub async fn connect(url: &str) -> Result<WsConnection> {
    let (inner, _response) = connect_async(url).await.map_err(Error::Connect)?;
    Ok(WsConnection { inner })
}

impl WsConnection {
    /// Split into independently owned write and read halves.
    pub fn split(self) -> (WsSink, WsSource) {
        let (sink, stream) = self.inner.split();
        (WsSink { inner: sink }, WsSource { inner: stream })
    }
}

/// Write half: binary messages out, close on teardown.
pub struct WsSink {
    inner: SplitSink<WsStream, Message>,
}

impl WsSink {
    /// Send one complete binary message.
    pub async fn send_binary(&mut self, payload: Bytes) -> Result<()> {
        self.inner.send(Message::Binary(payload)).await.map_err(Error::Io)
    }

    /// Initiate the closing handshake. Best-effort; the peer may already be gone.
    pub async fn close(&mut self) -> Result<()> {
        self.inner.close().await.map_err(Error::Io)
    }
}

/// Read half: yields payloads and the eventual close frame.
pub struct WsSource {
    inner: SplitStream<WsStream>,
}

impl WsSource {
    /// Next inbound item; `None` once the stream ends without a close frame.
    ///
    /// Text messages are surfaced as payload bytes too: servers negotiating a
    /// JSON content type are allowed to reply in text frames.
    pub async fn receive(&mut self) -> Option<Result<Incoming>> {
        loop {
            return match self.inner.next().await? {
                Ok(Message::Binary(payload)) => Some(Ok(Incoming::Payload(payload))),
                Ok(Message::Text(text)) => {
                    Some(Ok(Incoming::Payload(Bytes::copy_from_slice(text.as_bytes()))))
                }
                Ok(Message::Close(frame)) => {
                    // A close frame without a status carries no complaint.
                    let (code, reason) = frame
                        .map(|frame| (u16::from(frame.code), frame.reason.to_string()))
                        .unwrap_or((NORMAL_CLOSE, String::new()));
                    Some(Ok(Incoming::Closed { code, reason }))
                }
                Ok(_) => continue,
                Err(err) => Some(Err(Error::Io(err))),
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tokio::net::TcpListener;

    async fn echo_server() -> Result<(std::net::SocketAddr, tokio::task::JoinHandle<()>)> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let handle = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let mut ws = tokio_tungstenite::accept_async(stream).await.expect("upgrade");
            while let Some(Ok(message)) = ws.next().await {
                match message {
                    Message::Binary(payload) => {
                        ws.send(Message::Binary(payload)).await.expect("echo");
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        });
        Ok((addr, handle))
    }

    #[tokio::test]
    async fn binary_echo_round_trip() -> Result<()> {
        let (addr, server) = echo_server().await?;
        let connection = connect(&format!("ws://{addr}/gremlin")).await?;
        let (mut sink, mut source) = connection.split();

        sink.send_binary(Bytes::from_static(b"ping")).await?;
        let incoming = source.receive().await.expect("open").expect("receive");
        match incoming {
            Incoming::Payload(payload) => assert_eq!(payload, Bytes::from_static(b"ping")),
            other => panic!("expected payload, got {other:?}"),
        }

        sink.close().await?;
        server.await?;
        Ok(())
    }

    #[tokio::test]
    async fn server_close_surfaces_normal_status() -> Result<()> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let mut ws = tokio_tungstenite::accept_async(stream).await.expect("upgrade");
            ws.close(None).await.expect("close");
        });

        let connection = connect(&format!("ws://{addr}/gremlin")).await?;
        let (_sink, mut source) = connection.split();
        let incoming = source.receive().await.expect("open").expect("receive");
        match incoming {
            Incoming::Closed { code, .. } => assert_eq!(code, NORMAL_CLOSE),
            other => panic!("expected close, got {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn connect_to_closed_port_fails() {
        // Bind and drop to find a port nothing listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);

        let err = connect(&format!("ws://{addr}/gremlin")).await.expect_err("refused");
        assert!(matches!(err, Error::Connect(_)));
    }
}
