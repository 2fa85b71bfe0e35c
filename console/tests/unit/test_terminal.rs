//! Terminal view tests over a fake channel

use std::sync::atomic::Ordering;
use std::time::Duration;

use pretty_assertions::assert_eq;

use runme_console::terminal::bridge::{ChannelState, Options, TerminalView};
use runme_console::terminal::channel::{ChannelEvent, OutboundFrame};
use runme_console::terminal::protocol::ResizeEncoding;
use runme_console::terminal::surface::BufferSurface;
use runme_console::terminal::viewport::ViewportSize;

use crate::fakes::{FakeConnector, FlakyProbe};

fn view(host_id: i64, surface: &BufferSurface) -> TerminalView {
    TerminalView::new(host_id, Box::new(surface.clone()), Options::default())
}

async fn pump(view: &mut TerminalView, events: usize) {
    for _ in 0..events {
        let event = view.next_event().await.unwrap();
        view.handle_event(event).unwrap();
    }
}

fn text(frame: &OutboundFrame) -> &str {
    match frame {
        OutboundFrame::Text(text) => text,
        OutboundFrame::Close => panic!("unexpected close frame"),
    }
}

#[tokio::test]
async fn test_banner_once_then_data_in_order() {
    let connector = FakeConnector::default();
    let surface = BufferSurface::new();
    let mut view = view(42, &surface);

    view.open(&connector).await.unwrap();
    let peer = connector.take_peer();
    assert_eq!(peer.host_id, 42);

    peer.push(ChannelEvent::Opened);
    peer.push_message(r#"{"type":"connected","data":"Welcome to web-1"}"#);
    peer.push_message(r#"{"type":"connected","data":"Welcome again"}"#);
    peer.push_message(r#"{"type":"data","data":"$ ls\r\n"}"#);
    peer.push_message(r#"{"type":"data","data":"app  logs\r\n"}"#);
    pump(&mut view, 5).await;

    assert_eq!(view.state(), ChannelState::Open);
    assert_eq!(
        surface.contents(),
        "\r\nWelcome to web-1\r\n$ ls\r\napp  logs\r\n"
    );
}

#[tokio::test]
async fn test_input_forwarded_only_while_open() {
    let connector = FakeConnector::default();
    let surface = BufferSurface::new();
    let mut view = view(1, &surface);

    view.open(&connector).await.unwrap();
    let mut peer = connector.take_peer();
    assert!(!view.send_input("early").unwrap());

    peer.push(ChannelEvent::Opened);
    pump(&mut view, 1).await;
    assert!(view.send_input("l").unwrap());
    assert!(view.send_input("s").unwrap());

    let frames = peer.frames();
    let texts: Vec<_> = frames.iter().map(text).collect();
    assert_eq!(
        texts,
        vec![r#"{"type":"input","data":"l"}"#, r#"{"type":"input","data":"s"}"#]
    );
}

#[tokio::test]
async fn test_server_error_renders_without_closing() {
    let connector = FakeConnector::default();
    let surface = BufferSurface::new();
    let mut view = view(1, &surface);

    view.open(&connector).await.unwrap();
    let mut peer = connector.take_peer();
    peer.push(ChannelEvent::Opened);
    peer.push_message(r#"{"type":"error","data":"authentication failed"}"#);
    pump(&mut view, 2).await;

    assert_eq!(view.state(), ChannelState::Errored);
    assert!(surface
        .contents()
        .contains("\x1b[31mError: authentication failed\x1b[0m"));

    // Keystrokes after the error are dropped, not sent
    assert!(!view.send_input("q").unwrap());
    assert!(peer.frames().is_empty());
    assert!(!view.is_torn_down());

    // A later close keeps the error state
    peer.push(ChannelEvent::Closed(None));
    pump(&mut view, 1).await;
    assert_eq!(view.state(), ChannelState::Errored);
    assert!(view.next_event().await.is_none());
}

#[tokio::test]
async fn test_close_renders_notice() {
    let connector = FakeConnector::default();
    let surface = BufferSurface::new();
    let mut view = view(1, &surface);

    view.open(&connector).await.unwrap();
    let peer = connector.take_peer();
    peer.push(ChannelEvent::Opened);
    peer.push(ChannelEvent::Closed(Some("Session ended".to_string())));
    pump(&mut view, 2).await;

    assert_eq!(view.state(), ChannelState::Closed);
    assert!(surface.contents().contains("\x1b[33mSession ended\x1b[0m"));
}

#[tokio::test]
async fn test_second_open_is_an_error() {
    let connector = FakeConnector::default();
    let mut view = view(1, &BufferSurface::new());

    view.open(&connector).await.unwrap();
    assert!(view.open(&connector).await.is_err());
    assert_eq!(connector.opens(), 1);
}

#[tokio::test]
async fn test_refused_connection_marks_view_errored() {
    let connector = FakeConnector {
        refuse: true,
        ..Default::default()
    };
    let surface = BufferSurface::new();
    let mut view = view(1, &surface);

    assert!(view.open(&connector).await.is_err());
    assert_eq!(view.state(), ChannelState::Errored);
    assert!(surface.contents().contains("connection refused"));
}

#[tokio::test]
async fn test_teardown_closes_once() {
    let connector = FakeConnector::default();
    let surface = BufferSurface::new();
    let mut view = view(1, &surface);

    view.open(&connector).await.unwrap();
    let mut peer = connector.take_peer();
    peer.push(ChannelEvent::Opened);
    pump(&mut view, 1).await;

    view.teardown();
    view.teardown();
    assert!(view.open(&connector).await.is_err());
    drop(view);

    assert_eq!(peer.frames(), vec![OutboundFrame::Close]);
    assert_eq!(surface.disposals(), 1);
}

#[tokio::test]
async fn test_teardown_while_connecting() {
    let connector = FakeConnector::default();
    let surface = BufferSurface::new();
    let mut view = view(1, &surface);

    view.open(&connector).await.unwrap();
    let mut peer = connector.take_peer();
    view.teardown();

    assert_eq!(view.state(), ChannelState::Closed);
    assert_eq!(peer.frames(), vec![OutboundFrame::Close]);
}

#[tokio::test]
async fn test_pending_size_sent_on_open() {
    let connector = FakeConnector::default();
    let mut view = view(1, &BufferSurface::new());

    view.open(&connector).await.unwrap();
    let mut peer = connector.take_peer();
    view.resize(ViewportSize { cols: 80, rows: 24 }).unwrap();
    assert!(peer.frames().is_empty());

    peer.push(ChannelEvent::Opened);
    pump(&mut view, 1).await;
    view.resize(ViewportSize { cols: 80, rows: 24 }).unwrap();

    let frames = peer.frames();
    let texts: Vec<_> = frames.iter().map(text).collect();
    assert_eq!(texts, vec![r#"{"type":"resize","data":{"cols":80,"rows":24}}"#]);
}

#[tokio::test]
async fn test_string_resize_encoding() {
    let connector = FakeConnector::default();
    let options = Options {
        resize_encoding: ResizeEncoding::String,
        ..Default::default()
    };
    let mut view = TerminalView::new(1, Box::new(BufferSurface::new()), options);

    view.open(&connector).await.unwrap();
    let mut peer = connector.take_peer();
    peer.push(ChannelEvent::Opened);
    pump(&mut view, 1).await;
    view.resize(ViewportSize { cols: 120, rows: 40 }).unwrap();

    let frames = peer.frames();
    assert_eq!(
        text(&frames[0]),
        r#"{"type":"resize","data":"{\"cols\":120,\"rows\":40}"}"#
    );
}

#[tokio::test(start_paused = true)]
async fn test_fit_retries_once() {
    let connector = FakeConnector::default();
    let mut view = view(1, &BufferSurface::new());
    view.open(&connector).await.unwrap();
    let mut peer = connector.take_peer();
    peer.push(ChannelEvent::Opened);
    pump(&mut view, 1).await;

    let probe = FlakyProbe::new(1, 100, 30);
    let started = tokio::time::Instant::now();
    view.fit(&probe).await;

    assert_eq!(probe.calls.load(Ordering::SeqCst), 2);
    assert!(started.elapsed() >= Duration::from_millis(100));
    assert_eq!(view.session().cols, Some(100));
    assert_eq!(peer.frames().len(), 1);

    // Two failures in a row give up quietly
    let probe = FlakyProbe::new(2, 90, 30);
    view.fit(&probe).await;
    assert_eq!(probe.calls.load(Ordering::SeqCst), 2);
    assert_eq!(view.session().cols, Some(100));
    assert!(peer.frames().is_empty());
}
