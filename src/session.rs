//! The per-connection session loop (`RequestResponder`): greeting, framed
//! request/response exchange, and the `bye` sentinel -- generic over
//! `C: AsyncRead + AsyncWrite + Unpin` so it can be driven against a real
//! `TcpStream` in production and an in-memory duplex in tests.

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::codec::{self, UnpackingError};
use crate::context::ExecutionContext;
use crate::instruction;

const GREETING: &str = "Slim -- V0.0\n";
const HEADER_LEN: usize = 7;
const BYE: &str = "bye";

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("malformed frame header {0:?}")]
    BadHeader(String),
    #[error(transparent)]
    Protocol(#[from] UnpackingError),
    #[error("peer closed the connection mid-frame")]
    Disconnected,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Reads exactly `len` bytes, accumulating across short reads.
async fn read_exact_accumulating<C: AsyncRead + Unpin>(conn: &mut C, len: usize) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; len];
    let mut filled = 0;
    while filled < len {
        let n = conn.read(&mut buf[filled..]).await?;
        if n == 0 {
            return Err(Error::Disconnected);
        }
        filled += n;
    }
    Ok(buf)
}

/// Writes the whole buffer, retrying across partial writes.
async fn write_all_retrying<C: AsyncWrite + Unpin>(conn: &mut C, bytes: &[u8]) -> Result<()> {
    conn.write_all(bytes).await?;
    Ok(())
}

fn parse_header(header: &str) -> Result<usize> {
    let digits = header
        .strip_suffix(':')
        .ok_or_else(|| Error::BadHeader(header.to_owned()))?;
    digits
        .parse::<usize>()
        .map_err(|_| Error::BadHeader(header.to_owned()))
}

/// Drives one session to completion: sends the greeting, then loops
/// reading a framed request and writing a framed response until the peer
/// sends `bye` or the connection drops. Returns the total bytes received
/// and sent, for logging at the call site.
pub async fn run<C: AsyncRead + AsyncWrite + Unpin>(
    conn: &mut C,
    ctx: &mut ExecutionContext,
) -> Result<(usize, usize)> {
    let mut received = 0;
    let mut sent = 0;

    write_all_retrying(conn, GREETING.as_bytes()).await?;
    sent += GREETING.len();

    loop {
        let header_bytes = match read_exact_accumulating(conn, HEADER_LEN).await {
            Ok(b) => b,
            Err(Error::Disconnected) => break,
            Err(e) => return Err(e),
        };
        received += header_bytes.len();
        let header = String::from_utf8_lossy(&header_bytes).into_owned();
        let len = parse_header(&header)?;

        let payload_bytes = read_exact_accumulating(conn, len).await?;
        received += payload_bytes.len();
        let payload = String::from_utf8_lossy(&payload_bytes).into_owned();

        if payload == BYE {
            break;
        }

        let request = codec::unpack(&payload)?;
        let response = instruction::run_instructions(request, ctx);
        let packed = codec::pack(&response)?;
        let framed = format!("{:06}:{}", packed.len(), packed);

        write_all_retrying(conn, framed.as_bytes()).await?;
        sent += framed.len();
    }

    Ok((received, sent))
}
