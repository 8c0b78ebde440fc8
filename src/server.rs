//! TCP accept loop: binds the configured host/port and spawns one
//! `tokio::task` per accepted connection, each with a fresh
//! `ExecutionContext` seeded from the server's `syspath` import roots.

use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::context::ExecutionContext;
use crate::resolver;
use crate::session;

#[derive(Error, Debug)]
pub enum Error {
    #[error("'{0}' is not a valid host:port address")]
    AddrParse(String),
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Accept(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

pub struct Config {
    pub inethost: String,
    pub port: u16,
    pub syspath: Vec<PathBuf>,
    pub keepalive: bool,
}

/// Binds `config.inethost:config.port` and serves connections until
/// `config.keepalive` is false and the first session completes, or the
/// listener errors.
pub async fn serve(config: Config) -> Result<()> {
    for path in &config.syspath {
        resolver::add_import_path(path.clone());
    }

    let addr_text = format!("{}:{}", config.inethost, config.port);
    let addr: SocketAddr = addr_text
        .parse()
        .map_err(|_| Error::AddrParse(addr_text.clone()))?;

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| Error::Bind { addr, source })?;

    log::info!("listening on {}", addr);

    loop {
        let (mut socket, peer) = listener.accept().await?;
        log::info!("accepted connection from {}", peer);

        let handle = tokio::spawn(async move {
            let mut ctx = ExecutionContext::new();
            match session::run(&mut socket, &mut ctx).await {
                Ok((received, sent)) => {
                    log::info!("session with {} closed: {} bytes in, {} bytes out", peer, received, sent);
                }
                Err(e) => {
                    log::warn!("session with {} aborted: {}", peer, e);
                }
            }
        });

        if !config.keepalive {
            let _ = handle.await;
            break;
        }
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn serve_accepts_one_connection_without_keepalive() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let config = Config {
            inethost: addr.ip().to_string(),
            port: addr.port(),
            syspath: vec![],
            keepalive: false,
        };

        let server = tokio::spawn(serve(config));

        // Give the listener a moment to bind before connecting.
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        let mut client = tokio::net::TcpStream::connect(addr).await.unwrap();

        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        let mut greeting = [0u8; 13];
        client.read_exact(&mut greeting).await.unwrap();
        assert_eq!(&greeting, b"Slim -- V0.0\n");

        client.write_all(b"000003:bye").await.unwrap();
        drop(client);

        tokio::time::timeout(std::time::Duration::from_secs(2), server)
            .await
            .expect("server task should finish once keepalive is false")
            .unwrap()
            .unwrap();
    }
}
