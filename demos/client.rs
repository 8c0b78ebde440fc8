//! Minimal interactive SLIM client: read lines from a script file, send
//! each as a one-instruction request, and log what came back. Useful for
//! poking a running `slimd` by hand while developing a new fixture.
//!
//! A script line is `instance.method arg0 arg1 ...` for a call, or
//! `make instance TypeName arg0 ...` / `import path.to.module`. Lines
//! starting with `#` are comments; blank lines are skipped.

#[macro_use]
extern crate log;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use structopt::StructOpt;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use slim_fixture_server::codec::{self, Value};

#[derive(StructOpt, Debug)]
struct Opt {
    /// Address of a running slimd instance.
    #[structopt(short = "H", long, default_value = "127.0.0.1:8085")]
    host: String,
    /// Script file: one instruction per line.
    input: PathBuf,
}

fn parse_line(n: usize, line: &str) -> Option<Vec<Value>> {
    let mut words = line.split_whitespace();
    let head = words.next()?;
    let id = format!("i{}", n);

    if head == "import" {
        let path = words.next()?;
        return Some(vec![Value::str(id), Value::str("import"), Value::str(path)]);
    }
    if head == "make" {
        let instance = words.next()?;
        let type_name = words.next()?;
        let mut fields = vec![
            Value::str(id),
            Value::str("make"),
            Value::str(instance),
            Value::str(type_name),
        ];
        fields.extend(words.map(Value::str));
        return Some(fields);
    }
    // otherwise: "instance.method arg0 arg1 ..."
    let (instance, method) = head.split_once('.')?;
    let mut fields = vec![
        Value::str(id),
        Value::str("call"),
        Value::str(instance),
        Value::str(method),
    ];
    fields.extend(words.map(Value::str));
    Some(fields)
}

async fn send_frame(conn: &mut TcpStream, payload: &str) -> Result<String> {
    let framed = format!("{:06}:{}", payload.len(), payload);
    conn.write_all(framed.as_bytes()).await?;

    let mut header = [0u8; 7];
    conn.read_exact(&mut header).await?;
    let len: usize = std::str::from_utf8(&header)?
        .trim_end_matches(':')
        .parse()
        .context("malformed response header")?;

    let mut body = vec![0u8; len];
    conn.read_exact(&mut body).await?;
    Ok(String::from_utf8(body)?)
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let opt = Opt::from_args();

    let script = std::fs::read_to_string(&opt.input)
        .with_context(|| format!("reading {:?}", opt.input))?;

    debug!("connecting to {}", opt.host);
    let mut conn = TcpStream::connect(&opt.host).await?;

    let mut greeting = [0u8; 13];
    conn.read_exact(&mut greeting).await?;
    info!("<<< {}", String::from_utf8_lossy(&greeting).trim());

    for (n, line) in script.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(sleep_secs) = line.strip_prefix("sleep ") {
            let secs: u64 = sleep_secs.trim().parse().context("bad sleep duration")?;
            debug!("sleeping {}s", secs);
            tokio::time::sleep(Duration::from_secs(secs)).await;
            continue;
        }

        let fields = match parse_line(n, line) {
            Some(f) => f,
            None => {
                warn!("skipping unparsable line: {}", line);
                continue;
            }
        };
        let request = Value::list(vec![Value::list(fields)]);
        let packed = codec::pack(&request)?;
        info!(">>> {}", line);
        let response = send_frame(&mut conn, &packed).await?;
        info!("<<< {}", response);
    }

    conn.write_all(b"000003:bye").await?;
    Ok(())
}
