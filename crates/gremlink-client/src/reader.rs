// Reader task: transport frames in, raw payloads out.
use bytes::Bytes;
use gremlink_transport::{Error as TransportError, Incoming, NORMAL_CLOSE, WsSource};
use tokio::sync::mpsc;
use tracing::debug;

/// Forward inbound payloads to the multiplexer until the stream ends.
///
/// A close frame with status 1000, or an end-of-stream without a close frame,
/// is a clean exit; any other close status or I/O error is returned to the
/// supervisor through the task join. No decoding happens here.
pub(crate) async fn run_reader(
    mut source: WsSource,
    inbound_tx: mpsc::UnboundedSender<Bytes>,
) -> Result<(), TransportError> {
    loop {
        match source.receive().await {
            Some(Ok(Incoming::Payload(payload))) => {
                // The multiplexer going away means nothing is left to deliver to.
                if inbound_tx.send(payload).is_err() {
                    return Ok(());
                }
            }
            Some(Ok(Incoming::Closed { code, reason })) => {
                return if code == NORMAL_CLOSE {
                    debug!("server closed the connection");
                    Ok(())
                } else {
                    Err(TransportError::AbnormalClose { code, reason })
                };
            }
            Some(Err(err)) => return Err(err),
            None => return Ok(()),
        }
    }
}
