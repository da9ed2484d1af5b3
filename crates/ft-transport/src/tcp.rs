//! Newline-delimited JSON over TCP.

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use crate::{Channel, Connector, TransportResult};

/// Connects to `host:port`; one JSON object per line in each direction.
#[derive(Clone, Debug)]
pub struct TcpConnector {
    addr: String,
}

impl TcpConnector {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }
}

#[async_trait]
impl Connector for TcpConnector {
    type Channel = TcpChannel;

    async fn connect(&self) -> TransportResult<TcpChannel> {
        let stream = TcpStream::connect(&self.addr).await?;
        stream.set_nodelay(true)?;
        let (read, write) = stream.into_split();
        tracing::debug!(addr = %self.addr, "tcp channel open");
        Ok(TcpChannel { lines: BufReader::new(read).lines(), write })
    }
}

pub struct TcpChannel {
    lines: Lines<BufReader<OwnedReadHalf>>,
    write: OwnedWriteHalf,
}

#[async_trait]
impl Channel for TcpChannel {
    async fn send(&mut self, frame: &str) -> TransportResult<()> {
        self.write.write_all(frame.as_bytes()).await?;
        self.write.write_all(b"\n").await?;
        self.write.flush().await?;
        Ok(())
    }

    async fn recv(&mut self) -> TransportResult<Option<String>> {
        loop {
            match self.lines.next_line().await? {
                Some(line) if line.trim().is_empty() => continue,
                other                                => return Ok(other),
            }
        }
    }

    async fn close(&mut self) {
        let _ = self.write.shutdown().await;
    }
}
