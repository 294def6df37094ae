//! Accept loop and per-session protocol handler.
//!
//! Every accepted connection carries exactly one command and is closed
//! afterwards. Sessions share nothing in memory; the [`FileStore`] directory
//! is the only shared resource. There are no read or write timeouts, so a
//! stalled client holds its session task until it disconnects.

use anyhow::Result;
use log::{error, info, warn};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};

use crate::protocol::{Command, ERROR_PREFIX, NO_FILES_LINE, OK_LINE};
use crate::store::FileStore;
use crate::transfer;

/// Open the store (creating the root if missing), bind the port and serve
/// until the process is killed.
pub async fn run_server(root: PathBuf, port: u16) -> Result<()> {
    let store = FileStore::open(root).await?;
    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr).await?;
    info!("server listening on {} serving {:?}", addr, store.root());
    serve(listener, store).await
}

/// Accept loop over an already-bound listener. Split out so tests can bind
/// port 0 and learn the address before serving.
pub async fn serve(listener: TcpListener, store: FileStore) -> Result<()> {
    loop {
        let (socket, peer) = listener.accept().await?;
        info!("client connected from {}", peer);
        let store = store.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(socket, store).await {
                error!("session with {} failed: {:#}", peer, e);
            }
        });
    }
}

/// Handle one session: read a single command line, dispatch, close.
async fn handle_connection(socket: TcpStream, store: FileStore) -> Result<()> {
    let peer = socket.peer_addr()?;
    let (read_half, mut writer) = socket.into_split();
    let mut reader = BufReader::new(read_half);

    let mut line = String::new();
    if reader.read_line(&mut line).await? == 0 {
        info!("client {} disconnected before sending a command", peer);
        return Ok(());
    }
    let Some(command) = Command::parse(&line) else {
        info!("client {} sent a blank line, closing", peer);
        return Ok(());
    };
    info!("command from {}: {} {:?}", peer, command.verb, command.argument);

    match command.verb.as_str() {
        "LIST" => handle_list(&store, &mut writer).await,
        "UPLOAD" => handle_upload(command.argument, &store, &mut reader, &mut writer).await,
        "DOWNLOAD" => handle_download(command.argument, &store, &mut writer).await,
        _ => {
            send_line(
                &mut writer,
                "Invalid command. Use LIST, UPLOAD <filename> or DOWNLOAD <filename>.",
            )
            .await
        }
    }
}

async fn handle_list(store: &FileStore, writer: &mut OwnedWriteHalf) -> Result<()> {
    let names = store.list().await?;
    if names.is_empty() {
        send_line(writer, NO_FILES_LINE).await?;
    } else {
        for name in &names {
            send_line(writer, name).await?;
        }
    }
    info!("sent file list ({} entries)", names.len());
    Ok(())
}

async fn handle_upload(
    name: Option<String>,
    store: &FileStore,
    reader: &mut BufReader<OwnedReadHalf>,
    writer: &mut OwnedWriteHalf,
) -> Result<()> {
    let Some(name) = name else {
        return send_line(writer, "Invalid UPLOAD command. Usage: UPLOAD <filename>").await;
    };

    let mut file = match store.open_for_write(&name).await {
        Ok(file) => file,
        Err(e) => {
            warn!("rejected upload of '{}': {}", name, e);
            return send_line(writer, &format!("{}: {}.", ERROR_PREFIX, e)).await;
        }
    };

    // The client signals end of payload by half-closing its write side; read
    // through the buffered reader so bytes already pulled in with the command
    // line are not lost.
    match transfer::receive_file(reader, &mut file).await {
        Ok(bytes) => {
            info!("received '{}' ({} bytes)", name, bytes);
            send_line(
                writer,
                &format!("File '{}' received successfully ({} bytes).", name, bytes),
            )
            .await
        }
        Err(e) => {
            // Partial contents stay on disk; the contract has no cleanup.
            error!("failed receiving '{}': {:#}", name, e);
            send_line(writer, &format!("{}: failed to receive file '{}'.", ERROR_PREFIX, name)).await
        }
    }
}

async fn handle_download(
    name: Option<String>,
    store: &FileStore,
    writer: &mut OwnedWriteHalf,
) -> Result<()> {
    let Some(name) = name else {
        return send_line(writer, "Invalid DOWNLOAD command. Usage: DOWNLOAD <filename>").await;
    };

    let mut file = match store.open_for_read(&name).await {
        Ok(file) => file,
        Err(e) => {
            warn!("rejected download of '{}': {}", name, e);
            return send_line(writer, &format!("{}: {}.", ERROR_PREFIX, e)).await;
        }
    };

    // After this line the raw-byte phase begins and no further text response
    // is possible; a failure from here on truncates the stream.
    send_line(writer, OK_LINE).await?;
    let bytes = transfer::send_file(&mut file, writer).await?;
    info!("sent '{}' ({} bytes)", name, bytes);
    Ok(())
}

async fn send_line<W: AsyncWrite + Unpin>(writer: &mut W, line: &str) -> Result<()> {
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}
