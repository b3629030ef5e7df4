//! Byte-oriented line framing for the stdin/stdout side of the bridge
//!
//! Lines are raw bytes: message bodies are compared byte-for-byte, so no
//! UTF-8 decoding happens here.

use std::io::{Error, ErrorKind};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Longest accepted line, counted in bytes before the `\n`
pub const MAX_LINE_LENGTH: usize = 64 * 1024;

/// Reads `\n`-terminated lines, dropping the terminator and a trailing `\r`
///
/// A final line without terminator is still returned. A line longer than
/// the reader's limit is an `InvalidData` error.
pub struct LineReader<R> {
    inner: R,
    max_len: usize,
}

impl<R: AsyncBufRead + Unpin> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self::with_max_len(inner, MAX_LINE_LENGTH)
    }

    pub fn with_max_len(inner: R, max_len: usize) -> Self {
        Self { inner, max_len }
    }

    /// Next line, or `None` at end of stream
    pub async fn next_line(&mut self) -> std::io::Result<Option<Vec<u8>>> {
        let mut line = Vec::new();
        let limit = self.max_len as u64 + 1;
        if (&mut self.inner)
            .take(limit)
            .read_until(b'\n', &mut line)
            .await?
            == 0
        {
            return Ok(None);
        }
        if line.last() != Some(&b'\n') && line.len() > self.max_len {
            return Err(Error::new(
                ErrorKind::InvalidData,
                format!("line longer than {} bytes", self.max_len),
            ));
        }
        if line.last() == Some(&b'\n') {
            line.pop();
        }
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Ok(Some(line))
    }
}

/// Write one line and flush, so downstream pipes see it immediately
pub async fn write_line<W: AsyncWrite + Unpin>(out: &mut W, line: &[u8]) -> std::io::Result<()> {
    out.write_all(line).await?;
    out.write_all(b"\n").await?;
    out.flush().await
}
