//! Integration tests for framed TCP links.
//!
//! A real listener on an ephemeral port plays the server; the client side
//! goes through [`cfclient_transport::connect`].

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use cfclient_transport::{FrameReader, LinkMonitor, TransportError, connect};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

async fn listener() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("should bind");
    let addr = listener.local_addr().expect("local addr").to_string();
    (listener, addr)
}

fn quiet_monitor() -> Arc<LinkMonitor> {
    Arc::new(LinkMonitor::new(|_| {}))
}

#[tokio::test]
async fn test_round_trip_over_loopback() {
    let (listener, addr) = listener().await;

    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.expect("should accept");
        // Server echoes the first frame back, byte for byte.
        let mut header = [0u8; 2];
        stream.read_exact(&mut header).await.expect("header");
        let len = u16::from_be_bytes(header) as usize;
        let mut body = vec![0u8; len];
        stream.read_exact(&mut body).await.expect("body");
        stream.write_all(&header).await.expect("write header");
        stream.write_all(&body).await.expect("write body");
        body
    });

    let (mut reader, writer) = connect(&addr, 16, quiet_monitor())
        .await
        .expect("should connect");
    assert!(writer.send(b"version 1023 1027 cfclient").await.unwrap());

    let echoed = reader.next_frame().await.unwrap().expect("a frame");
    assert_eq!(&echoed[..], b"version 1023 1027 cfclient");
    assert_eq!(server.await.unwrap(), b"version 1023 1027 cfclient");
}

#[tokio::test]
async fn test_frames_split_across_writes_are_reassembled() {
    let (listener, addr) = listener().await;

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.expect("should accept");
        let stream_bytes = b"\x00\x08map2 \x00\x01\xff\x00\x07goodbye";
        for chunk in stream_bytes.chunks(3) {
            stream.write_all(chunk).await.expect("write");
            stream.flush().await.expect("flush");
            tokio::task::yield_now().await;
        }
    });

    let (mut reader, _writer) = connect(&addr, 4, quiet_monitor()).await.unwrap();
    let first = reader.next_frame().await.unwrap().expect("first frame");
    assert_eq!(first.len(), 8);
    assert_eq!(&first[..5], b"map2 ");
    let second = reader.next_frame().await.unwrap().expect("second frame");
    assert_eq!(&second[..], b"goodbye");
    assert!(reader.next_frame().await.unwrap().is_none());
}

#[tokio::test]
async fn test_concurrent_writers_never_interleave() {
    let (listener, addr) = listener().await;
    const TASKS: usize = 8;
    const PER_TASK: usize = 50;

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("should accept");
        let mut reader = FrameReader::new(stream);
        let mut frames = Vec::new();
        while let Some(frame) = reader.next_frame().await.expect("clean frames") {
            frames.push(frame.to_vec());
        }
        frames
    });

    let (_reader, writer) = connect(&addr, 1024, quiet_monitor()).await.unwrap();
    let writer = Arc::new(writer);

    let mut handles = Vec::new();
    for task in 0..TASKS {
        let writer = Arc::clone(&writer);
        handles.push(tokio::spawn(async move {
            for i in 0..PER_TASK {
                // Payload sizes vary so a torn write would misalign the stream.
                let payload = format!("examine {task}:{i}:{}", "x".repeat(i * 7));
                writer.send(payload.as_bytes()).await.expect("send");
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }
    writer.close().await;

    let frames = server.await.unwrap();
    assert_eq!(frames.len(), TASKS * PER_TASK);
    for frame in &frames {
        let text = std::str::from_utf8(frame).expect("utf8");
        let mut parts = text.trim_start_matches("examine ").splitn(3, ':');
        let _task = parts.next().unwrap();
        let i: usize = parts.next().unwrap().parse().unwrap();
        assert_eq!(parts.next().unwrap().len(), i * 7);
    }
}

#[tokio::test]
async fn test_send_failure_reports_loss_once_and_closes_writer() {
    let (listener, addr) = listener().await;
    let losses = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&losses);
    let monitor = Arc::new(LinkMonitor::new(move |loss| {
        assert!(loss.is_error);
        seen.fetch_add(1, Ordering::SeqCst);
    }));

    let accept = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("should accept");
        drop(stream);
    });

    let (_reader, writer) = connect(&addr, 64, Arc::clone(&monitor)).await.unwrap();
    accept.await.unwrap();

    // The first writes may still land in the kernel buffer; keep writing
    // until the reset surfaces.
    let payload = vec![b'a'; 4096];
    let mut failed = false;
    for _ in 0..1000 {
        match writer.send(&payload).await {
            Ok(true) => tokio::task::yield_now().await,
            Ok(false) => break,
            Err(TransportError::SendFailed(_)) => {
                failed = true;
                break;
            }
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert!(failed, "writing to a closed peer should eventually fail");
    assert!(!writer.is_open().await);
    assert!(!writer.send(b"apply 1").await.unwrap());
    assert_eq!(losses.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_connect_to_closed_port_fails() {
    let (listener, addr) = listener().await;
    drop(listener);
    let err = connect(&addr, 64, quiet_monitor()).await.unwrap_err();
    assert!(matches!(err, TransportError::ConnectFailed { .. }));
}
