//! A single TCP connection speaking RESP

use crate::error::{ProxyError, Result};
use crate::pool::config::HostAddr;
use crate::resp::{encode_command, RespValue};

use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, warn};

const READ_CHUNK: usize = 4096;

/// An open connection to one backend host
#[derive(Debug)]
pub struct Connection {
    stream: TcpStream,
    addr: String,
    socket_timeout: Duration,
    read_buf: Vec<u8>,
}

impl Connection {
    /// Connect to the first reachable host, in order.
    ///
    /// Each attempt is bounded by `socket_timeout`. When every host fails
    /// the last failure is returned.
    pub async fn open(hosts: &[HostAddr], socket_timeout: Duration) -> Result<Self> {
        let mut last_err = None;

        for host in hosts {
            let addr = host.to_string();
            let attempt = timeout(
                socket_timeout,
                TcpStream::connect((host.host.as_str(), host.port)),
            )
            .await;

            let err = match attempt {
                Ok(Ok(stream)) => {
                    // Nagle only delays single small commands
                    if let Err(e) = stream.set_nodelay(true) {
                        debug!(addr = %addr, error = %e, "Failed to set TCP_NODELAY");
                    }
                    debug!(addr = %addr, "Opened backend connection");
                    return Ok(Self {
                        stream,
                        addr,
                        socket_timeout,
                        read_buf: Vec::with_capacity(READ_CHUNK),
                    });
                }
                Ok(Err(source)) => ProxyError::Transport { addr, source },
                Err(_) => ProxyError::SocketTimeout {
                    addr,
                    timeout: socket_timeout,
                },
            };
            warn!(error = %err, "Backend host unreachable, trying next alternate");
            last_err = Some(err);
        }

        Err(last_err
            .unwrap_or_else(|| ProxyError::Config("no alternate hosts configured".to_string())))
    }

    /// Address this connection is bound to
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Send one command and wait for its reply.
    pub async fn request(&mut self, args: &[&[u8]]) -> Result<RespValue> {
        let frame = encode_command(args);
        match timeout(self.socket_timeout, self.stream.write_all(&frame)).await {
            Ok(Ok(())) => {}
            Ok(Err(source)) => return Err(self.transport(source)),
            Err(_) => return Err(self.timed_out()),
        }

        loop {
            if let Some((reply, used)) = RespValue::parse(&self.read_buf)? {
                self.read_buf.drain(..used);
                return Ok(reply);
            }

            let mut chunk = [0u8; READ_CHUNK];
            let n = match timeout(self.socket_timeout, self.stream.read(&mut chunk)).await {
                Ok(Ok(n)) => n,
                Ok(Err(source)) => return Err(self.transport(source)),
                Err(_) => return Err(self.timed_out()),
            };
            if n == 0 {
                return Err(self.transport(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "connection closed by server",
                )));
            }
            self.read_buf.extend_from_slice(&chunk[..n]);
        }
    }

    fn transport(&self, source: std::io::Error) -> ProxyError {
        ProxyError::Transport {
            addr: self.addr.clone(),
            source,
        }
    }

    fn timed_out(&self) -> ProxyError {
        ProxyError::SocketTimeout {
            addr: self.addr.clone(),
            timeout: self.socket_timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    /// Reserve a port and release it so nothing listens there
    async fn dead_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    }

    #[tokio::test]
    async fn test_open_falls_through_to_next_host() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let live = listener.local_addr().unwrap().port();
        let dead = dead_port().await;

        let hosts = vec![HostAddr::new("127.0.0.1", dead), HostAddr::new("127.0.0.1", live)];
        let conn = Connection::open(&hosts, Duration::from_secs(1)).await.unwrap();
        assert_eq!(conn.addr(), format!("127.0.0.1:{live}"));
    }

    #[tokio::test]
    async fn test_open_reports_last_failure() {
        let dead = dead_port().await;
        let hosts = vec![HostAddr::new("127.0.0.1", dead)];
        let err = Connection::open(&hosts, Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, ProxyError::Transport { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn test_request_reads_split_reply() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 64];
            let _ = socket.read(&mut buf).await.unwrap();
            socket.write_all(b"$4\r\nxi").await.unwrap();
            socket.flush().await.unwrap();
            tokio::time::sleep(Duration::from_millis(20)).await;
            socket.write_all(b"ao\r\n").await.unwrap();
        });

        let hosts = vec![HostAddr::new("127.0.0.1", port)];
        let mut conn = Connection::open(&hosts, Duration::from_secs(1)).await.unwrap();
        let reply = conn.request(&[b"GET", b"key1"]).await.unwrap();
        assert_eq!(reply, RespValue::BulkString(Some(b"xiao".to_vec())));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_request_eof_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 64];
            let _ = socket.read(&mut buf).await.unwrap();
        });

        let hosts = vec![HostAddr::new("127.0.0.1", port)];
        let mut conn = Connection::open(&hosts, Duration::from_secs(1)).await.unwrap();
        let err = conn.request(&[b"GET", b"key1"]).await.unwrap_err();
        assert!(matches!(err, ProxyError::Transport { .. }), "got {err:?}");
        server.await.unwrap();
    }
}
