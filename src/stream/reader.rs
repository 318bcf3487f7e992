use futures::{ Stream, StreamExt };
use log::{ debug, warn };
use std::pin::Pin;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use super::decoder::{ DecodeError, LineDecoder };
use crate::api::{ ApiError, ByteStream };
use crate::models::StreamEvent;

pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, ApiError>> + Send>>;

/// Drives a send-message body to completion on a background task.
///
/// Events come out in the order the server wrote them. Malformed lines are
/// logged and skipped. A transport failure or a read that stalls longer than
/// `read_timeout` ends the stream with a single `Err`. Dropping the returned
/// stream stops the read loop, including while it waits on the network.
pub fn decode_events(mut body: ByteStream, read_timeout: Duration) -> EventStream {
    let (tx, rx) = mpsc::channel(32);

    tokio::spawn(async move {
        let mut decoder = LineDecoder::new();

        loop {
            let next = tokio::select! {
                _ = tx.closed() => {
                    debug!("Event receiver dropped, abandoning response stream");
                    return;
                }
                next = tokio::time::timeout(read_timeout, body.next()) => next,
            };

            let chunk = match next {
                Ok(Some(Ok(chunk))) => chunk,
                Ok(Some(Err(e))) => {
                    let _ = tx.send(Err(e)).await;
                    return;
                }
                Ok(None) => {
                    break;
                }
                Err(_) => {
                    warn!("Response stream stalled for {:?}", read_timeout);
                    let _ = tx.send(Err(ApiError::Timeout(read_timeout))).await;
                    return;
                }
            };

            for decoded in decoder.push(&chunk) {
                if !forward(&tx, decoded).await {
                    return;
                }
            }
        }

        if let Some(decoded) = decoder.finish() {
            forward(&tx, decoded).await;
        }
    });

    Box::pin(ReceiverStream::new(rx))
}

// Returns false once nobody is listening any more.
async fn forward(
    tx: &mpsc::Sender<Result<StreamEvent, ApiError>>,
    decoded: Result<StreamEvent, DecodeError>
) -> bool {
    match decoded {
        Ok(event) => tx.send(Ok(event)).await.is_ok(),
        Err(e) => {
            warn!("Skipping stream line: {}", e);
            true
        }
    }
}
