use std::io;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};
use tracing::{debug, trace};

use crate::{Error, Result};

/// Largest frame the unit sends in one burst.
const MAX_FRAME_BYTES: usize = 4096;

/// Settle delays around socket operations. The unit needs time to process
/// before it will answer; connecting or reading too eagerly yields empty or
/// truncated frames on real hardware.
#[derive(Debug, Clone)]
pub struct Pacing {
    /// Delay before each connect attempt.
    pub connect_settle: Duration,
    /// Delay after connect before the first read.
    pub receive_settle: Duration,
    /// Wait between confirmation retries.
    pub retry_backoff: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            connect_settle: Duration::from_secs(1),
            receive_settle: Duration::from_secs(1),
            retry_backoff: Duration::from_secs(2),
        }
    }
}

/// Connection factory for the unit. Every logical operation (one command
/// send, one poll) gets its own connection; nothing is held open between
/// operations.
pub(crate) struct Transport {
    host: String,
    port: u16,
    io_timeout: Duration,
    pacing: Pacing,
}

impl Transport {
    pub fn new(host: String, port: u16, io_timeout: Duration, pacing: Pacing) -> Self {
        Self {
            host,
            port,
            io_timeout,
            pacing,
        }
    }

    pub async fn connect(&self) -> Result<Connection> {
        sleep(self.pacing.connect_settle).await;
        debug!(host = %self.host, port = self.port, "connecting to unit");
        let stream = timeout(
            self.io_timeout,
            TcpStream::connect((self.host.as_str(), self.port)),
        )
        .await
        .map_err(|_| Error::Connect(io::Error::new(io::ErrorKind::TimedOut, "connect timed out")))?
        .map_err(Error::Connect)?;
        Ok(Connection {
            stream,
            io_timeout: self.io_timeout,
            receive_settle: self.pacing.receive_settle,
        })
    }
}

/// One open exchange with the unit. Closed explicitly after every use;
/// dropping it closes the socket as a backstop.
pub(crate) struct Connection {
    stream: TcpStream,
    io_timeout: Duration,
    receive_settle: Duration,
}

impl Connection {
    pub async fn send(&mut self, frame: &[u8]) -> Result<()> {
        timeout(self.io_timeout, self.stream.write_all(frame))
            .await
            .map_err(|_| Error::Send(io::Error::new(io::ErrorKind::TimedOut, "send timed out")))?
            .map_err(Error::Send)?;
        trace!(bytes = frame.len(), "frame sent");
        Ok(())
    }

    /// One read of up to [`MAX_FRAME_BYTES`], after the settle delay.
    pub async fn receive(&mut self) -> Result<Vec<u8>> {
        sleep(self.receive_settle).await;
        let mut buf = vec![0u8; MAX_FRAME_BYTES];
        let n = timeout(self.io_timeout, self.stream.read(&mut buf))
            .await
            .map_err(|_| {
                Error::Receive(io::Error::new(io::ErrorKind::TimedOut, "receive timed out"))
            })?
            .map_err(Error::Receive)?;
        buf.truncate(n);
        trace!(bytes = n, "frame received");
        Ok(buf)
    }

    pub async fn close(mut self) {
        let _ = self.stream.shutdown().await;
    }
}
