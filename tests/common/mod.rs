//! In-process fake Redis used by the integration tests
//!
//! Understands SET and GET over RESP and records every command it sees.

#![allow(dead_code)]

use redis_shard_proxy::pool::{HostAddr, PoolOptions};
use redis_shard_proxy::resp::RespValue;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

#[derive(Default)]
struct Inner {
    data: HashMap<Vec<u8>, Vec<u8>>,
    commands: Vec<String>,
    connections: usize,
}

/// Handle to a running fake server
#[derive(Clone)]
pub struct FakeRedis {
    pub port: u16,
    inner: Arc<Mutex<Inner>>,
}

impl FakeRedis {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let inner = Arc::new(Mutex::new(Inner::default()));

        let shared = Arc::clone(&inner);
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                shared.lock().unwrap().connections += 1;
                tokio::spawn(serve(socket, Arc::clone(&shared)));
            }
        });

        Self { port, inner }
    }

    pub fn addr(&self) -> HostAddr {
        HostAddr::new("127.0.0.1", self.port)
    }

    pub fn options(&self) -> PoolOptions {
        PoolOptions::with_hosts([self.addr()])
    }

    /// Commands received so far, e.g. `["SET key1", "GET key1"]`
    pub fn commands(&self) -> Vec<String> {
        self.inner.lock().unwrap().commands.clone()
    }

    pub fn connections(&self) -> usize {
        self.inner.lock().unwrap().connections
    }

    pub fn value(&self, key: &str) -> Option<Vec<u8>> {
        self.inner.lock().unwrap().data.get(key.as_bytes()).cloned()
    }

    pub fn seed(&self, key: &str, value: &str) {
        self.inner
            .lock()
            .unwrap()
            .data
            .insert(key.as_bytes().to_vec(), value.as_bytes().to_vec());
    }
}

/// A port nothing is listening on
pub async fn dead_addr() -> HostAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    HostAddr::new("127.0.0.1", listener.local_addr().unwrap().port())
}

async fn serve(mut socket: TcpStream, inner: Arc<Mutex<Inner>>) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        while let Ok(Some((request, used))) = RespValue::parse(&buf) {
            buf.drain(..used);
            let reply = handle(request, &inner);
            if socket.write_all(&reply).await.is_err() {
                return;
            }
        }
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
}

fn handle(request: RespValue, inner: &Mutex<Inner>) -> Vec<u8> {
    let args: Vec<Vec<u8>> = match request {
        RespValue::Array(Some(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                RespValue::BulkString(Some(bytes)) => Some(bytes),
                _ => None,
            })
            .collect(),
        _ => return b"-ERR expected array\r\n".to_vec(),
    };

    let mut inner = inner.lock().unwrap();
    let name = String::from_utf8_lossy(args.first().map(Vec::as_slice).unwrap_or_default())
        .to_uppercase();
    let key = args.get(1).cloned().unwrap_or_default();
    inner
        .commands
        .push(format!("{name} {}", String::from_utf8_lossy(&key)));

    match (name.as_str(), args.len()) {
        ("SET", 3) => {
            inner.data.insert(key, args[2].clone());
            b"+OK\r\n".to_vec()
        }
        ("GET", 2) => match inner.data.get(&key) {
            Some(value) => {
                let mut out = format!("${}\r\n", value.len()).into_bytes();
                out.extend_from_slice(value);
                out.extend_from_slice(b"\r\n");
                out
            }
            None => b"$-1\r\n".to_vec(),
        },
        _ => format!("-ERR unknown command '{name}'\r\n").into_bytes(),
    }
}
