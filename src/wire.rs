//! Line-delimited JSON framing.
//!
//! Each frame is one JSON value followed by `\n`. Blank lines are skipped.
//! Works over any async byte stream, so tests can use in-memory duplex pipes.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

use crate::Error;

/// Longest frame accepted, newline excluded.
pub const MAX_FRAME_LEN: usize = 64 * 1024;

pub struct FrameReader<R> {
    reader: BufReader<R>,
    max_len: usize,
}

impl<R> FrameReader<R>
where
    R: AsyncRead + Unpin,
{
    pub fn new(reader: R) -> Self {
        Self::with_max_len(reader, MAX_FRAME_LEN)
    }

    pub fn with_max_len(reader: R, max_len: usize) -> Self {
        Self {
            reader: BufReader::new(reader),
            max_len,
        }
    }

    /// Next non-blank frame as raw bytes, or `None` once the peer has closed
    /// its side.
    ///
    /// Bytes are not checked for UTF-8 here. A frame longer than the limit is
    /// skipped up to its newline and reported as [`Error::FrameTooLong`];
    /// the reader stays usable afterwards.
    pub async fn next_frame(&mut self) -> Option<Result<Vec<u8>, Error>> {
        loop {
            let mut frame = Vec::new();
            let mut too_long = false;
            let mut eof = false;
            loop {
                let (used, done) = {
                    let available = match self.reader.fill_buf().await {
                        Ok(available) => available,
                        Err(err) => return Some(Err(err.into())),
                    };
                    if available.is_empty() {
                        eof = true;
                        break;
                    }
                    let (chunk, used, done) = match available.iter().position(|b| *b == b'\n') {
                        Some(end) => (&available[..end], end + 1, true),
                        None => (available, available.len(), false),
                    };
                    if !too_long {
                        if frame.len() + chunk.len() > self.max_len {
                            too_long = true;
                            frame = Vec::new();
                        } else {
                            frame.extend_from_slice(chunk);
                        }
                    }
                    (used, done)
                };
                self.reader.consume(used);
                if done {
                    break;
                }
            }

            if too_long {
                return Some(Err(Error::FrameTooLong(self.max_len)));
            }
            if !frame.iter().all(u8::is_ascii_whitespace) {
                return Some(Ok(frame));
            }
            if eof {
                return None;
            }
        }
    }

    /// Reads and decodes the next frame.
    pub async fn read_frame<T: DeserializeOwned>(&mut self) -> Result<Option<T>, Error> {
        match self.next_frame().await {
            Some(frame) => Ok(Some(serde_json::from_slice(&frame?)?)),
            None => Ok(None),
        }
    }
}

/// Encodes `value` as a single frame and flushes it.
pub async fn write_frame<W, T>(writer: &mut W, value: &T) -> Result<(), Error>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let mut buf = serde_json::to_vec(value)?;
    buf.push(b'\n');
    writer.write_all(&buf).await?;
    writer.flush().await?;
    Ok(())
}

/// Awaits `fut`, giving up with [`Error::Timeout`] after `limit` when one is set.
pub async fn deadline<F: Future>(limit: Option<Duration>, fut: F) -> Result<F::Output, Error> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| Error::Timeout),
        None => Ok(fut.await),
    }
}
