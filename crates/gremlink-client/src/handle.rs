// Caller-side response stream with latched termination.
use gremlink_wire::ResponseMessage;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::Error;

/// One request's stream of responses.
///
/// Dropping the handle does not cancel the request; the connection keeps
/// buffering responses until the stream terminates on its own.
#[derive(Debug)]
pub struct ResponseHandle {
    request_id: Uuid,
    rx: mpsc::UnboundedReceiver<Result<ResponseMessage, Error>>,
    terminated: bool,
}

impl ResponseHandle {
    pub(crate) fn new(
        request_id: Uuid,
        rx: mpsc::UnboundedReceiver<Result<ResponseMessage, Error>>,
    ) -> Self {
        Self { request_id, rx, terminated: false }
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// Next response of the stream, or `None` once it has terminated.
    ///
    /// After a terminal response or an error has been observed, further calls
    /// return `Ok(None)` without touching the underlying channel; an error
    /// ends the stream and is raised exactly once.
    pub async fn next_response(&mut self) -> Result<Option<ResponseMessage>, Error> {
        if self.terminated {
            return Ok(None);
        }
        match self.rx.recv().await {
            Some(Ok(response)) => {
                if response.is_terminal() {
                    self.terminated = true;
                }
                Ok(Some(response))
            }
            Some(Err(err)) => {
                self.terminated = true;
                Err(err)
            }
            // The connection never ends a stream without a terminal response
            // or an error; a bare channel close means it was torn down.
            None => {
                self.terminated = true;
                Err(Error::ConnectionClosed)
            }
        }
    }

    /// Collect the rest of the stream eagerly, in arrival order.
    pub async fn collect(&mut self) -> Result<Vec<ResponseMessage>, Error> {
        let mut responses = Vec::new();
        while let Some(response) = self.next_response().await? {
            responses.push(response);
        }
        Ok(responses)
    }
}
