use super::*;
use crate::client::Client;
use crate::protocol::decode_server_message;
use std::time::Duration;

#[tokio::test]
async fn output_sender_encodes_event() {
    let (tx, mut rx) = mpsc::channel(16);
    let sender = OutputSender::new(tx, 42);

    sender.send_line("hello from cell".into()).await;

    let bytes = rx.recv().await.unwrap();
    // Should be a valid length-prefixed server message
    assert!(bytes.len() > 4);
    let len = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
    assert_eq!(len, bytes.len() - 4);

    let decoded = decode_server_message(&bytes[4..]).unwrap();
    match decoded {
        ServerMessage::Event {
            event: ServerEvent::Output { request_id, line },
        } => {
            assert_eq!(request_id, 42);
            assert_eq!(line, "hello from cell");
        }
        _ => panic!("Expected Output event"),
    }
}

#[tokio::test]
async fn output_sender_ignores_closed_channel() {
    let (tx, rx) = mpsc::channel(1);
    let sender = OutputSender::new(tx, 1);
    drop(rx); // Close receiver

    // Should not panic
    sender.send_line("dropped".into()).await;
}

#[tokio::test]
async fn server_answers_ping() {
    let tmp = tempfile::tempdir().unwrap();
    let sock = tmp.path().join("kernel.sock");

    let server = Server::new(sock.clone(), |request, _shutdown, _output| async move {
        match request {
            Request::Ping => Response::Pong,
            other => Response::error(format!("unexpected request: {}", other.variant_name())),
        }
    })
    .unwrap();

    let server_handle = tokio::spawn(server.run());

    // Wait for the socket to appear
    for _ in 0..100 {
        if sock.exists() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let client = Client::connect(&sock).await.unwrap();
    let (_, fut) = client.ping().unwrap();
    assert!(matches!(fut.await.unwrap(), Response::Pong));

    server_handle.abort();
}

#[tokio::test]
async fn shutdown_request_ends_server_loop() {
    let tmp = tempfile::tempdir().unwrap();
    let sock = tmp.path().join("kernel.sock");

    let server = Server::new(sock.clone(), |request, shutdown, _output| async move {
        match request {
            Request::Shutdown => {
                let _ = shutdown.send(()).await;
                Response::ShuttingDown
            }
            _ => Response::Pong,
        }
    })
    .unwrap();

    let server_handle = tokio::spawn(server.run());

    for _ in 0..100 {
        if sock.exists() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let client = Client::connect(&sock).await.unwrap();
    let (_, fut) = client.shutdown().unwrap();
    // The response may or may not arrive before the server exits; only the
    // server loop ending is guaranteed.
    let _ = fut.await;

    let result = tokio::time::timeout(Duration::from_secs(5), server_handle)
        .await
        .expect("server did not shut down");
    assert!(result.unwrap().is_ok());
    assert!(!sock.exists(), "socket file should be removed on shutdown");
}

#[tokio::test]
async fn refuses_symlinked_socket_path() {
    let tmp = tempfile::tempdir().unwrap();
    let target = tmp.path().join("target.sock");
    std::fs::write(&target, b"").unwrap();
    let link = tmp.path().join("link.sock");
    std::os::unix::fs::symlink(&target, &link).unwrap();

    let server = Server::new(link, |_request, _shutdown, _output| async move {
        Response::Pong
    })
    .unwrap();

    let result = server.run().await;
    assert!(matches!(result, Err(ServerError::SocketSymlink { .. })));
}
