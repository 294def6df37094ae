//! Client side of the protocol: one connection per command.

use anyhow::{Context, Result, anyhow, bail};
use log::{debug, info};
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use crate::protocol::{Command, DOWNLOAD_PREFIX, ERROR_PREFIX, OK_LINE};
use crate::transfer;

/// Ask the server for its file list. Returns every line the server sent; the
/// connection closing marks the end of the list. The lines are either
/// filenames or the single no-files sentinel, in no particular order.
pub async fn run_list(addr: &str) -> Result<Vec<String>> {
    let socket = connect(addr).await?;
    let (read_half, mut write_half) = socket.into_split();

    let command = Command::new("LIST", None);
    write_half.write_all(command.serialize().as_bytes()).await?;
    write_half.flush().await?;

    let mut lines = Vec::new();
    let mut reader = BufReader::new(read_half).lines();
    while let Some(line) = reader.next_line().await? {
        lines.push(line);
    }
    Ok(lines)
}

/// Upload a local file under its own file name. Streams the bytes, half-closes
/// the write side so the server sees end-of-payload, then returns the server's
/// acknowledgment line.
pub async fn run_upload(addr: &str, path: &Path) -> Result<String> {
    let meta = fs::metadata(path)
        .await
        .with_context(|| format!("cannot read local file {:?}", path))?;
    if !meta.is_file() {
        bail!("{:?} is not a regular file", path);
    }
    let name = path
        .file_name()
        .ok_or_else(|| anyhow!("{:?} has no file name", path))?
        .to_string_lossy()
        .to_string();

    let socket = connect(addr).await?;
    let (read_half, mut write_half) = socket.into_split();

    let command = Command::new("UPLOAD", Some(&name));
    write_half.write_all(command.serialize().as_bytes()).await?;

    let mut file = File::open(path).await?;
    let bytes = transfer::send_file(&mut file, &mut write_half).await?;
    // Half-close: the server's receive loop runs until it sees this EOF.
    write_half.shutdown().await?;
    info!("uploaded '{}' ({} bytes), waiting for acknowledgment", name, bytes);

    let mut reader = BufReader::new(read_half);
    let mut ack = String::new();
    if reader.read_line(&mut ack).await? == 0 {
        bail!("server closed the connection without acknowledging the upload");
    }
    Ok(ack.trim_end().to_string())
}

/// Download a named file into `dest_dir`, saved under the `downloaded_`
/// prefix. An error status line from the server fails the call before any
/// local file is created.
pub async fn run_download(addr: &str, name: &str, dest_dir: &Path) -> Result<PathBuf> {
    let socket = connect(addr).await?;
    let (read_half, mut write_half) = socket.into_split();

    let command = Command::new("DOWNLOAD", Some(name));
    write_half.write_all(command.serialize().as_bytes()).await?;
    write_half.flush().await?;

    let mut reader = BufReader::new(read_half);
    let mut status = String::new();
    if reader.read_line(&mut status).await? == 0 {
        bail!("server closed the connection without a status line");
    }
    let status = status.trim_end();
    if status.starts_with(ERROR_PREFIX) {
        bail!("server error: {}", status);
    }
    if status != OK_LINE {
        bail!("unexpected server status: {}", status);
    }
    debug!("server accepted download of '{}'", name);

    // Only now does a local file come into existence; the payload runs until
    // the server closes the connection.
    let dest = dest_dir.join(format!("{}{}", DOWNLOAD_PREFIX, name));
    let mut file = File::create(&dest).await?;
    let bytes = transfer::receive_file(&mut reader, &mut file).await?;
    info!("downloaded '{}' ({} bytes) to {:?}", name, bytes, dest);
    Ok(dest)
}

async fn connect(addr: &str) -> Result<TcpStream> {
    TcpStream::connect(addr)
        .await
        .with_context(|| format!("cannot connect to server at {}", addr))
}
