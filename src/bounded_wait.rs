//! Delimiter reads bounded by a deadline.
//!
//! The read runs as its own task and a timer runs beside it; both race to
//! publish into a result slot and the caller takes whichever landed first.
//! A read that loses to the timer is aborted and joined before returning,
//! so no task outlives the exchange and the stream is free for the next one.

use crate::delimiter::PendingRead;
use crate::error::SessionError;
use crate::slot::result_slot;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncBufRead;
use tokio::sync::Mutex;
use tracing::{debug, trace};

/// Read side of a stream, shared with the task performing the read.
pub type SharedReader<R> = Arc<Mutex<R>>;

#[derive(Debug)]
enum Resolution {
    Matched(Vec<u8>),
    Failed(SessionError),
    TimedOut,
}

/// Wait until `delimiter` appears on `reader`, for at most `timeout`.
///
/// On success returns every byte read during the exchange, delimiter
/// included. Fails with [`SessionError::Read`] if the stream ends or errors,
/// or with [`SessionError::Timeout`] carrying what arrived before the
/// deadline.
pub async fn wait_for_delimiter<R>(
    reader: &SharedReader<R>,
    delimiter: &[u8],
    timeout: Duration,
) -> Result<Vec<u8>, SessionError>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    let pending = PendingRead::new(delimiter);
    let (publisher, waiter) = result_slot();
    trace!(
        delimiter = ?String::from_utf8_lossy(pending.delimiter()),
        ?timeout,
        "waiting for delimiter"
    );

    let reader_task = {
        let reader = Arc::clone(reader);
        let pending = pending.clone();
        let publisher = publisher.clone();
        tokio::spawn(async move {
            let mut reader = reader.lock().await;
            let resolution = match pending.read(&mut *reader).await {
                Ok(bytes) => Resolution::Matched(bytes),
                Err(err) => Resolution::Failed(err),
            };
            if !publisher.publish(resolution) {
                trace!("read resolved after the deadline, result discarded");
            }
        })
    };

    let timer_task = tokio::spawn(async move {
        tokio::time::sleep(timeout).await;
        publisher.publish(Resolution::TimedOut);
    });

    let resolution = waiter.wait().await;
    timer_task.abort();
    // Cancels a read still parked on the stream; a finished task just joins.
    reader_task.abort();
    let _ = reader_task.await;

    match resolution {
        Some(Resolution::Matched(bytes)) => Ok(bytes),
        Some(Resolution::Failed(err)) => Err(err),
        Some(Resolution::TimedOut) => {
            let partial = pending.partial();
            debug!(?timeout, partial_len = partial.len(), "deadline elapsed before delimiter");
            Err(SessionError::Timeout {
                elapsed: timeout,
                delimiter: String::from_utf8_lossy(pending.delimiter()).into_owned(),
                partial,
            })
        }
        None => Err(SessionError::Read {
            message: "reader stopped without a result".to_string(),
            partial: pending.partial(),
        }),
    }
}
