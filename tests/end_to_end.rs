//! Protocol tests against a real listener bound to port 0.

use std::collections::HashSet;
use std::net::SocketAddr;

use fshare::protocol::{ERROR_PREFIX, NO_FILES_LINE};
use fshare::server;
use fshare::store::FileStore;
use fshare::{client, transfer};
use tempfile::{TempDir, tempdir};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Spawn a server on an ephemeral port over a fresh temporary root.
async fn start_server() -> (SocketAddr, TempDir) {
    let root = tempdir().unwrap();
    let store = FileStore::open(root.path()).await.unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(server::serve(listener, store));
    (addr, root)
}

/// One raw protocol exchange: send the given bytes, optionally half-close,
/// then read everything until the server closes the connection.
async fn raw_exchange(addr: SocketAddr, request: &[u8], half_close: bool) -> Vec<u8> {
    let mut socket = TcpStream::connect(addr).await.unwrap();
    socket.write_all(request).await.unwrap();
    if half_close {
        socket.shutdown().await.unwrap();
    }
    let mut response = Vec::new();
    socket.read_to_end(&mut response).await.unwrap();
    response
}

#[tokio::test]
async fn upload_then_download_round_trips_exactly() {
    let (addr, server_root) = start_server().await;
    let addr = addr.to_string();

    // Binary payload larger than one chunk, with embedded zeros and newlines.
    let payload: Vec<u8> = (0..20_000u32).map(|i| (i % 256) as u8).collect();
    let local = tempdir().unwrap();
    let source = local.path().join("blob.bin");
    tokio::fs::write(&source, &payload).await.unwrap();

    let ack = client::run_upload(&addr, &source).await.unwrap();
    assert!(ack.contains("blob.bin"), "ack was: {ack}");
    assert_eq!(
        tokio::fs::read(server_root.path().join("blob.bin"))
            .await
            .unwrap(),
        payload
    );

    let dest = tempdir().unwrap();
    let saved = client::run_download(&addr, "blob.bin", dest.path())
        .await
        .unwrap();
    assert_eq!(saved, dest.path().join("downloaded_blob.bin"));
    assert_eq!(tokio::fs::read(&saved).await.unwrap(), payload);
}

#[tokio::test]
async fn list_on_empty_root_is_the_sentinel() {
    let (addr, _root) = start_server().await;
    let lines = client::run_list(&addr.to_string()).await.unwrap();
    assert_eq!(lines, vec![NO_FILES_LINE.to_string()]);
}

#[tokio::test]
async fn list_returns_uploaded_names_as_a_set() {
    let (addr, _root) = start_server().await;
    let addr = addr.to_string();

    let local = tempdir().unwrap();
    for name in ["a.txt", "b.txt"] {
        let path = local.path().join(name);
        tokio::fs::write(&path, name.as_bytes()).await.unwrap();
        client::run_upload(&addr, &path).await.unwrap();
    }

    // Enumeration order is filesystem-dependent, so compare sets.
    let listed: HashSet<String> = client::run_list(&addr).await.unwrap().into_iter().collect();
    let expected: HashSet<String> = ["a.txt", "b.txt"].iter().map(|s| s.to_string()).collect();
    assert_eq!(listed, expected);
}

#[tokio::test]
async fn download_of_missing_file_sends_one_error_line_and_no_payload() {
    let (addr, _root) = start_server().await;

    let response = raw_exchange(addr, b"DOWNLOAD ghost.txt\n", false).await;
    let text = String::from_utf8(response).unwrap();
    assert!(text.starts_with(ERROR_PREFIX), "response was: {text}");
    // Exactly one line, nothing after it.
    assert_eq!(text.matches('\n').count(), 1);
    assert!(text.ends_with('\n'));
}

#[tokio::test]
async fn failed_download_creates_no_local_file() {
    let (addr, _root) = start_server().await;
    let dest = tempdir().unwrap();

    let err = client::run_download(&addr.to_string(), "ghost.txt", dest.path())
        .await
        .unwrap_err();
    assert!(err.to_string().contains(ERROR_PREFIX), "error was: {err}");
    assert!(!dest.path().join("downloaded_ghost.txt").exists());
}

#[tokio::test]
async fn bare_upload_gets_usage_line_and_stores_nothing() {
    let (addr, root) = start_server().await;

    let response = raw_exchange(addr, b"UPLOAD\n", true).await;
    let text = String::from_utf8(response).unwrap();
    assert!(text.contains("UPLOAD <filename>"), "response was: {text}");

    let store = FileStore::open(root.path()).await.unwrap();
    assert!(store.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn traversal_name_is_rejected_and_escapes_nothing() {
    let (addr, root) = start_server().await;

    let mut socket = TcpStream::connect(addr).await.unwrap();
    socket.write_all(b"UPLOAD ../escape.txt\n").await.unwrap();
    socket.write_all(b"should never land on disk").await.unwrap();
    socket.shutdown().await.unwrap();
    let mut response = String::new();
    let mut reader = tokio::io::BufReader::new(socket);
    tokio::io::AsyncBufReadExt::read_line(&mut reader, &mut response)
        .await
        .unwrap();

    assert!(response.starts_with(ERROR_PREFIX), "response was: {response}");
    assert!(!root.path().parent().unwrap().join("escape.txt").exists());
    let store = FileStore::open(root.path()).await.unwrap();
    assert!(store.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn unknown_verb_gets_the_valid_command_line() {
    let (addr, _root) = start_server().await;
    let response = raw_exchange(addr, b"DELETE a.txt\n", false).await;
    let text = String::from_utf8(response).unwrap();
    assert!(text.contains("LIST"), "response was: {text}");
    assert!(text.contains("UPLOAD"), "response was: {text}");
    assert!(text.contains("DOWNLOAD"), "response was: {text}");
}

#[tokio::test]
async fn concurrent_lists_are_independent() {
    let (addr, _root) = start_server().await;
    let addr = addr.to_string();

    let local = tempdir().unwrap();
    let path = local.path().join("shared.txt");
    tokio::fs::write(&path, b"shared").await.unwrap();
    client::run_upload(&addr, &path).await.unwrap();

    let (a, b) = tokio::join!(client::run_list(&addr), client::run_list(&addr));
    assert_eq!(a.unwrap(), vec!["shared.txt".to_string()]);
    assert_eq!(b.unwrap(), vec!["shared.txt".to_string()]);
}

#[tokio::test]
async fn immediate_disconnect_draws_no_response() {
    let (addr, _root) = start_server().await;

    let response = raw_exchange(addr, b"", true).await;
    assert!(response.is_empty());

    // The accept loop must still be alive afterwards.
    let lines = client::run_list(&addr.to_string()).await.unwrap();
    assert_eq!(lines, vec![NO_FILES_LINE.to_string()]);
}

#[tokio::test]
async fn upload_overwrites_an_existing_file() {
    let (addr, server_root) = start_server().await;
    let addr = addr.to_string();

    tokio::fs::write(server_root.path().join("doc.txt"), b"a much longer original")
        .await
        .unwrap();

    let local = tempdir().unwrap();
    let path = local.path().join("doc.txt");
    tokio::fs::write(&path, b"short").await.unwrap();
    client::run_upload(&addr, &path).await.unwrap();

    assert_eq!(
        tokio::fs::read(server_root.path().join("doc.txt"))
            .await
            .unwrap(),
        b"short"
    );
}

#[tokio::test]
async fn empty_file_round_trips() {
    let (addr, _root) = start_server().await;
    let addr = addr.to_string();

    let local = tempdir().unwrap();
    let path = local.path().join("empty.bin");
    tokio::fs::write(&path, b"").await.unwrap();
    client::run_upload(&addr, &path).await.unwrap();

    let dest = tempdir().unwrap();
    let saved = client::run_download(&addr, "empty.bin", dest.path())
        .await
        .unwrap();
    assert_eq!(tokio::fs::read(&saved).await.unwrap(), b"");
}

#[tokio::test]
async fn transfer_helpers_agree_with_the_wire() {
    // Sanity check that the generic copy loops drive a real socket pair.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let payload = vec![42u8; 9000];

    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut sink = Vec::new();
        let n = transfer::receive_file(&mut socket, &mut sink).await.unwrap();
        (n, sink)
    });

    let mut socket = TcpStream::connect(addr).await.unwrap();
    let mut source = std::io::Cursor::new(payload.clone());
    let sent = transfer::send_file(&mut source, &mut socket).await.unwrap();
    socket.shutdown().await.unwrap();

    let (received, sink) = server.await.unwrap();
    assert_eq!(sent, payload.len() as u64);
    assert_eq!(received, sent);
    assert_eq!(sink, payload);
}
