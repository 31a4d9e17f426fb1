//! Reads that accumulate stream output until a delimiter shows up.

use crate::error::SessionError;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// One in-flight "read until delimiter" exchange.
///
/// Clones share the accumulated buffer, so whoever gives up on the read can
/// still see what arrived before it did.
#[derive(Debug, Clone)]
pub struct PendingRead {
    delimiter: Arc<[u8]>,
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl PendingRead {
    pub fn new(delimiter: impl AsRef<[u8]>) -> Self {
        Self {
            delimiter: Arc::from(delimiter.as_ref()),
            buffer: Arc::new(Mutex::new(Vec::with_capacity(128))),
        }
    }

    pub fn delimiter(&self) -> &[u8] {
        &self.delimiter
    }

    /// Read from `reader` until the delimiter occurs in the accumulated bytes.
    ///
    /// Bytes are consumed from `reader` only up to the end of the first
    /// occurrence; anything after it stays buffered for the next exchange.
    /// Returns everything accumulated, delimiter included. An empty delimiter
    /// matches immediately without reading.
    ///
    /// There is no timeout here. End of stream and I/O errors end the read
    /// with [`SessionError::Read`] carrying the trimmed partial buffer.
    pub async fn read<R>(&self, reader: &mut R) -> Result<Vec<u8>, SessionError>
    where
        R: AsyncBufRead + Unpin + ?Sized,
    {
        if self.delimiter.is_empty() {
            return Ok(self.snapshot());
        }

        loop {
            let available = match reader.fill_buf().await {
                Ok(bytes) => bytes,
                Err(err) => return Err(self.failure(err.to_string())),
            };
            if available.is_empty() {
                return Err(self.failure("connection closed by peer"));
            }

            let (consumed, matched) = self.absorb(available);
            reader.consume(consumed);
            if matched {
                return Ok(self.snapshot());
            }
        }
    }

    /// Copy of everything accumulated so far.
    pub fn snapshot(&self) -> Vec<u8> {
        self.lock().clone()
    }

    /// Accumulated output as text, trimmed for diagnostics.
    pub fn partial(&self) -> String {
        String::from_utf8_lossy(&self.lock()).trim().to_string()
    }

    /// Append bytes from `chunk` one at a time, stopping right after the
    /// delimiter completes. Returns how many bytes were taken and whether the
    /// delimiter was found.
    fn absorb(&self, chunk: &[u8]) -> (usize, bool) {
        let mut buffer = self.lock();
        for (i, &byte) in chunk.iter().enumerate() {
            buffer.push(byte);
            if buffer.ends_with(&self.delimiter) {
                return (i + 1, true);
            }
        }
        (chunk.len(), false)
    }

    fn failure(&self, message: impl Into<String>) -> SessionError {
        SessionError::Read {
            message: message.into(),
            partial: self.partial(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<u8>> {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
