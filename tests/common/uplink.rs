//! Scripted fake uplink.
//!
//! Plays the hub's side of a server link over any byte stream: an in-memory
//! duplex for session tests, or an accepted TCP socket when the binary is
//! spawned.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, ReadHalf, WriteHalf};
use tokio::time::timeout;

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// The hub end of a link.
pub struct FakeUplink<S> {
    reader: BufReader<ReadHalf<S>>,
    writer: WriteHalf<S>,
}

#[allow(dead_code)]
impl<S: AsyncRead + AsyncWrite> FakeUplink<S> {
    pub fn new(stream: S) -> Self {
        let (read, writer) = tokio::io::split(stream);
        Self {
            reader: BufReader::new(read),
            writer,
        }
    }

    /// Send one line, adding the terminator.
    pub async fn send(&mut self, line: &str) -> anyhow::Result<()> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\r\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Receive one line, without its terminator. `None` on EOF.
    pub async fn recv(&mut self) -> anyhow::Result<Option<String>> {
        let mut line = String::new();
        let n = timeout(RECV_TIMEOUT, self.reader.read_line(&mut line)).await??;
        if n == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    /// Receive lines until one matches, returning everything read,
    /// the match included.
    pub async fn recv_until<F>(&mut self, mut done: F) -> anyhow::Result<Vec<String>>
    where
        F: FnMut(&str) -> bool,
    {
        let mut seen = Vec::new();
        loop {
            let Some(line) = self.recv().await? else {
                anyhow::bail!("link closed while waiting; saw {seen:?}");
            };
            let stop = done(&line);
            seen.push(line);
            if stop {
                return Ok(seen);
            }
        }
    }

    /// Read until the other side closes, returning what it sent.
    pub async fn drain(&mut self) -> anyhow::Result<Vec<String>> {
        let mut seen = Vec::new();
        while let Some(line) = self.recv().await? {
            seen.push(line);
        }
        Ok(seen)
    }
}
