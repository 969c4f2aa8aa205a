//! Integration tests for abx-client.
//!
//! These tests run the full client against an in-process mock feed server
//! listening on an ephemeral TCP port.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use abx_client::output::FeedDocument;
use abx_client::protocol::{CallType, Packet, Request, REQUEST_SIZE};
use abx_client::FeedClient;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// How the mock server answers `RESEND_ONE` requests.
#[derive(Clone, Copy)]
enum ResendBehavior {
    /// Reply with the requested packet.
    Answer,
    /// Read requests but never reply.
    Silent,
}

/// What the mock server saw across all connections.
#[derive(Debug, Default)]
struct ServerLog {
    connections: usize,
    requests: Vec<Request>,
}

fn packet(sequence: i32) -> Packet {
    let symbols = [*b"AAPL", *b"MSFT", *b"AMZN", *b"META"];
    let side = if sequence % 2 == 0 { b'S' } else { b'B' };
    Packet::new(
        symbols[sequence as usize % symbols.len()],
        side,
        sequence * 10,
        100 + sequence,
        sequence,
    )
}

/// Spawn a server that streams `streamed` on the first connection and
/// answers resends on later connections according to `behavior`.
async fn spawn_server(
    streamed: Vec<i32>,
    behavior: ResendBehavior,
) -> (String, Arc<Mutex<ServerLog>>, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let log = Arc::new(Mutex::new(ServerLog::default()));

    let server_log = log.clone();
    let handle = tokio::spawn(async move {
        loop {
            let (socket, _) = match listener.accept().await {
                Ok(conn) => conn,
                Err(_) => return,
            };
            server_log.lock().unwrap().connections += 1;
            serve_connection(socket, &streamed, behavior, &server_log).await;
        }
    });

    (addr, log, handle)
}

async fn serve_connection(
    mut socket: TcpStream,
    streamed: &[i32],
    behavior: ResendBehavior,
    log: &Arc<Mutex<ServerLog>>,
) {
    let mut buf = [0u8; REQUEST_SIZE];
    while socket.read_exact(&mut buf).await.is_ok() {
        let request = Request::decode(&buf).unwrap();
        log.lock().unwrap().requests.push(request);

        match request.call_type {
            CallType::StreamAll => {
                let mut bytes = Vec::new();
                for &seq in streamed {
                    bytes.extend_from_slice(&packet(seq).encode());
                }
                socket.write_all(&bytes).await.unwrap();
                // End of dump: close the connection.
                return;
            }
            CallType::ResendOne => {
                if let ResendBehavior::Answer = behavior {
                    let seq = request.index as i32;
                    socket.write_all(&packet(seq).encode()).await.unwrap();
                }
            }
        }
    }
}

fn read_document(path: &std::path::Path) -> FeedDocument {
    let text = std::fs::read_to_string(path).unwrap();
    serde_json::from_str(&text).unwrap()
}

fn sequences(document: &FeedDocument) -> Vec<i32> {
    document.packets.iter().map(|p| p.sequence).collect()
}

#[tokio::test]
async fn test_gap_recovered_on_resend() {
    let (addr, log, server) = spawn_server(vec![1, 2, 4, 5], ResendBehavior::Answer).await;
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("output.json");

    let report = FeedClient::builder()
        .endpoint(addr)
        .idle_timeout(Duration::from_millis(500))
        .output_path(&output)
        .build()
        .run_and_write()
        .await
        .unwrap();

    assert_eq!(report.stream.recorded, 4);
    assert_eq!(report.store.max_sequence_seen(), 5);
    assert_eq!(report.missing_after_stream.iter().copied().collect::<Vec<_>>(), vec![3]);
    assert_eq!(report.recovered(), 1);
    assert!(report.still_missing().is_empty());

    let document = read_document(&output);
    assert_eq!(sequences(&document), vec![1, 2, 3, 4, 5]);
    let third = &document.packets[2];
    assert_eq!(third.symbol, "META");
    assert_eq!(third.buy_sell_indicator, "B");
    assert_eq!(third.quantity, 30);
    assert_eq!(third.price, 103);

    {
        let log = log.lock().unwrap();
        assert_eq!(log.connections, 2);
        assert_eq!(log.requests[0], Request::stream_all());
        assert_eq!(log.requests[1..], [Request::resend(3)]);
    }
    server.abort();
}

#[tokio::test]
async fn test_silent_peer_leaves_gap() {
    let (addr, log, server) = spawn_server(vec![1, 2, 4, 5], ResendBehavior::Silent).await;
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("output.json");

    let report = FeedClient::builder()
        .endpoint(addr)
        .idle_timeout(Duration::from_millis(100))
        .max_retry_passes(5)
        .output_path(&output)
        .build()
        .run_and_write()
        .await
        .unwrap();

    let resend = report.resend.as_ref().unwrap();
    assert_eq!(resend.passes, 5);
    assert_eq!(resend.recovered, 0);
    assert_eq!(report.still_missing().into_iter().collect::<Vec<_>>(), vec![3]);

    let document = read_document(&output);
    assert_eq!(sequences(&document), vec![1, 2, 4, 5]);

    let resends = || {
        log.lock()
            .unwrap()
            .requests
            .iter()
            .filter(|r| r.call_type == CallType::ResendOne)
            .count()
    };
    // The last request may still be in flight when the client returns.
    for _ in 0..50 {
        if resends() == 5 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(resends(), 5);
    server.abort();
}

#[tokio::test]
async fn test_no_gaps_skips_resend_connection() {
    let (addr, log, server) = spawn_server(vec![1, 2, 3], ResendBehavior::Answer).await;
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("output.json");

    let report = FeedClient::builder()
        .endpoint(addr)
        .idle_timeout(Duration::from_millis(500))
        .output_path(&output)
        .build()
        .run_and_write()
        .await
        .unwrap();

    assert!(report.resend.is_none());
    assert_eq!(sequences(&read_document(&output)), vec![1, 2, 3]);
    assert_eq!(log.lock().unwrap().connections, 1);
    server.abort();
}

#[tokio::test]
async fn test_multiple_gaps_recovered_in_order() {
    let (addr, _log, server) =
        spawn_server(vec![2, 5, 3, 9, 7], ResendBehavior::Answer).await;
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("output.json");

    let report = FeedClient::builder()
        .endpoint(addr)
        .idle_timeout(Duration::from_millis(500))
        .output_path(&output)
        .build()
        .run_and_write()
        .await
        .unwrap();

    assert_eq!(
        report.missing_after_stream.iter().copied().collect::<Vec<_>>(),
        vec![1, 4, 6, 8]
    );
    assert_eq!(report.resend.as_ref().unwrap().passes, 1);
    assert_eq!(sequences(&read_document(&output)), (1..=9).collect::<Vec<_>>());
    server.abort();
}

#[tokio::test]
async fn test_unreachable_peer_fails_without_output() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    drop(listener);

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("output.json");

    let err = FeedClient::builder()
        .endpoint(addr)
        .output_path(&output)
        .build()
        .run_and_write()
        .await
        .unwrap_err();

    assert!(err.is_fatal());
    assert!(!output.exists());
}

#[tokio::test]
async fn test_binary_exits_nonzero_when_unreachable() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    drop(listener);

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("output.json");

    let status = tokio::process::Command::new(env!("CARGO_BIN_EXE_abx-client"))
        .arg("--endpoint")
        .arg(&addr)
        .arg("--output")
        .arg(&output)
        .stderr(std::process::Stdio::null())
        .status()
        .await
        .unwrap();

    assert!(!status.success());
    assert!(!output.exists());
}

#[tokio::test]
async fn test_binary_exits_zero_on_success() {
    let (addr, _log, server) = spawn_server(vec![1, 2], ResendBehavior::Answer).await;
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("output.json");

    let status = tokio::process::Command::new(env!("CARGO_BIN_EXE_abx-client"))
        .arg("--endpoint")
        .arg(&addr)
        .arg("--idle-timeout")
        .arg("0.5")
        .arg("--output")
        .arg(&output)
        .stderr(std::process::Stdio::null())
        .status()
        .await
        .unwrap();

    assert!(status.success());
    assert_eq!(sequences(&read_document(&output)), vec![1, 2]);
    server.abort();
}

#[tokio::test]
async fn test_empty_dump_writes_empty_document() {
    let (addr, _log, server) = spawn_server(vec![], ResendBehavior::Answer).await;
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("output.json");

    let report = FeedClient::builder()
        .endpoint(addr)
        .idle_timeout(Duration::from_millis(500))
        .output_path(&output)
        .build()
        .run_and_write()
        .await
        .unwrap();

    assert!(report.store.is_empty());
    assert!(read_document(&output).packets.is_empty());
    server.abort();
}
