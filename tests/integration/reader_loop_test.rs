// tests/integration/reader_loop_test.rs

//! Integration tests for inbound line delivery.

use super::test_helpers::{RecordingObserver, TestPeer, within};
use ircline::{Connection, ConnectionStatus};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

#[tokio::test]
async fn test_lines_arrive_in_order_without_terminators() {
    let peer = TestPeer::bind().await;
    let conn = Connection::new(peer.config());
    let mut inbound = within(conn.connect()).await.unwrap();
    let mut server = peer.accept().await;

    let mut payload = String::new();
    for i in 0..20 {
        // Mix CRLF and bare LF terminators.
        let terminator = if i % 2 == 0 { "\r\n" } else { "\n" };
        payload.push_str(&format!(":bot PRIVMSG #chan :message {i}{terminator}"));
    }
    server.write_all(payload.as_bytes()).await.unwrap();

    for i in 0..20 {
        let message = within(inbound.recv()).await.unwrap();
        assert_eq!(message.command, "PRIVMSG");
        assert_eq!(message.params, vec!["#chan".to_string(), format!("message {i}")]);
        assert!(
            message
                .params
                .iter()
                .all(|p| !p.contains('\r') && !p.contains('\n'))
        );
    }
}

#[tokio::test]
async fn test_malformed_lines_are_dropped_and_reported() {
    let peer = TestPeer::bind().await;
    let observer = Arc::new(RecordingObserver::default());
    let conn = Connection::new(peer.config()).with_observer(observer.clone());
    let mut inbound = within(conn.connect()).await.unwrap();
    let mut server = peer.accept().await;

    server
        .write_all(
            b"PING :one\r\n\
              \r\n\
              :source-only\r\n\
              PING :two\r\n\
              @tag=value\r\n\
              PING :three\r\n",
        )
        .await
        .unwrap();

    for expected in ["one", "two", "three"] {
        let message = within(inbound.recv()).await.unwrap();
        assert_eq!(message.trailing(), Some(expected));
    }

    // Every line reached the inbound hook, parsed or not.
    drop(server);
    assert!(within(inbound.recv()).await.is_none());
    assert_eq!(observer.inbound.lock().len(), 6);
    assert_eq!(
        *observer.parse_errors.lock(),
        vec!["", ":source-only", "@tag=value"]
    );
}

#[tokio::test]
async fn test_peer_close_ends_channel_and_status() {
    let peer = TestPeer::bind().await;
    let conn = Connection::new(peer.config());
    let mut inbound = within(conn.connect()).await.unwrap();
    let mut server = peer.accept().await;

    server.write_all(b"ERROR :Closing link\r\n").await.unwrap();
    drop(server);

    let message = within(inbound.recv()).await.unwrap();
    assert_eq!(message.command, "ERROR");
    assert!(within(inbound.recv()).await.is_none());
    assert_eq!(conn.status(), ConnectionStatus::Disconnected);
}

#[tokio::test]
async fn test_partial_line_at_eof_is_discarded() {
    let peer = TestPeer::bind().await;
    let conn = Connection::new(peer.config());
    let mut inbound = within(conn.connect()).await.unwrap();
    let mut server = peer.accept().await;

    server.write_all(b"PING :whole\r\nPING :unfinis").await.unwrap();
    server.shutdown().await.unwrap();

    let message = within(inbound.recv()).await.unwrap();
    assert_eq!(message.trailing(), Some("whole"));
    assert!(within(inbound.recv()).await.is_none());
}

#[tokio::test]
async fn test_line_split_across_writes_is_reassembled() {
    let peer = TestPeer::bind().await;
    let conn = Connection::new(peer.config());
    let mut inbound = within(conn.connect()).await.unwrap();
    let mut server = peer.accept().await;

    server.write_all(b":nick!user@host PRIV").await.unwrap();
    server.flush().await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    server.write_all(b"MSG #rust :split\r").await.unwrap();
    server.flush().await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    server.write_all(b"\n").await.unwrap();

    let message = within(inbound.recv()).await.unwrap();
    assert_eq!(message.source_nick(), Some("nick"));
    assert_eq!(message.params, vec!["#rust", "split"]);
}

#[tokio::test]
async fn test_overlong_line_is_skipped_and_link_survives() {
    let peer = TestPeer::bind().await;
    let mut config = peer.config();
    config.max_line_length = 32;
    let observer = Arc::new(RecordingObserver::default());
    let conn = Connection::new(config).with_observer(observer.clone());
    let mut inbound = within(conn.connect()).await.unwrap();
    let mut server = peer.accept().await;

    server.write_all(b"PING :a\r\n").await.unwrap();
    let long_line = format!("PRIVMSG #c :{}\r\n", "x".repeat(9000));
    server.write_all(long_line.as_bytes()).await.unwrap();
    server.write_all(b"PING :b\r\n").await.unwrap();

    let first = within(inbound.recv()).await.unwrap();
    assert_eq!(first.trailing(), Some("a"));
    let second = within(inbound.recv()).await.unwrap();
    assert_eq!(second.trailing(), Some("b"));
    assert_eq!(conn.status(), ConnectionStatus::Connected);

    let parse_errors = observer.parse_errors.lock();
    assert_eq!(parse_errors.len(), 1);
    assert!(parse_errors[0].starts_with("PRIVMSG #c :xxx"));
    assert!(!observer.inbound.lock().iter().any(|l| l.starts_with("PRIVMSG")));
}

#[tokio::test]
async fn test_slow_consumer_loses_nothing() {
    let peer = TestPeer::bind().await;
    let conn = Connection::new(peer.config());
    let mut inbound = within(conn.connect()).await.unwrap();
    let mut server = peer.accept().await;

    let writer = tokio::spawn(async move {
        for i in 0..200 {
            let line = format!("PRIVMSG #flood :{i}\r\n");
            server.write_all(line.as_bytes()).await.unwrap();
        }
        server
    });

    for i in 0..200 {
        if i % 50 == 0 {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        let message = within(inbound.recv()).await.unwrap();
        assert_eq!(message.trailing(), Some(i.to_string().as_str()));
    }
    let _server = within(writer).await.unwrap();
}

#[tokio::test]
async fn test_dropping_receiver_stops_reader() {
    let peer = TestPeer::bind().await;
    let conn = Connection::new(peer.config());
    let inbound = within(conn.connect()).await.unwrap();
    let mut server = peer.accept().await;

    drop(inbound);
    server.write_all(b"PING :anyone\r\n").await.unwrap();

    within(conn.closed()).await;
    assert_eq!(conn.status(), ConnectionStatus::Disconnected);
}
