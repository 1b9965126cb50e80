use application::KeystrokeDisambiguator;
use domain::ScanSource;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use warehouse_agent::input::{InputLine, InputRouter, OperatorInput, Routed, read_lines};

fn key(name: &str) -> String {
    format!("{{\"cmd\":\"key\",\"key\":\"{}\"}}\n", name)
}

/// Route everything queued so far, as a lagging consumer would
fn drain(router: &mut InputRouter, lines: &mut mpsc::UnboundedReceiver<InputLine>) -> Vec<Routed> {
    let mut routed = Vec::new();
    while let Ok(line) = lines.try_recv() {
        if let Some(next) = router.route(&line).unwrap() {
            routed.push(next);
        }
    }
    routed
}

#[tokio::test(start_paused = true)]
async fn slow_typing_is_not_a_scan_when_routing_lags() {
    let (mut writer, reader) = tokio::io::duplex(1024);
    let (lines_tx, mut lines_rx) = mpsc::unbounded_channel();
    let reader_task = tokio::spawn(read_lines(reader, lines_tx));

    // Human pace: 600 ms between keys. Nothing is routed meanwhile, as if a
    // device command were holding up the consumer.
    for name in ["1", "2", "Enter"] {
        writer.write_all(key(name).as_bytes()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(600)).await;
    }
    drop(writer);
    reader_task.await.unwrap().unwrap();

    let mut router = InputRouter::new(KeystrokeDisambiguator::default());
    let routed = drain(&mut router, &mut lines_rx);
    assert!(routed.is_empty(), "unexpected scan: {:?}", routed);
}

#[tokio::test(start_paused = true)]
async fn scanner_burst_is_one_scan() {
    let (mut writer, reader) = tokio::io::duplex(1024);
    let (lines_tx, mut lines_rx) = mpsc::unbounded_channel();
    let reader_task = tokio::spawn(read_lines(reader, lines_tx));

    let burst: String = ["P", "K", "G", "9", "Enter"].into_iter().map(key).collect();
    writer.write_all(burst.as_bytes()).await.unwrap();
    drop(writer);
    reader_task.await.unwrap().unwrap();

    let mut router = InputRouter::new(KeystrokeDisambiguator::default());
    match drain(&mut router, &mut lines_rx).as_slice() {
        [Routed::Scan(scan)] => {
            assert_eq!(scan.barcode, "PKG9");
            assert_eq!(scan.source, ScanSource::Hid);
        }
        other => panic!("expected one scan, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn lines_are_stamped_on_arrival() {
    let (mut writer, reader) = tokio::io::duplex(1024);
    let (lines_tx, mut lines_rx) = mpsc::unbounded_channel();
    let reader_task = tokio::spawn(read_lines(reader, lines_tx));

    writer.write_all(key("A").as_bytes()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(250)).await;
    writer.write_all(b"{\"cmd\":\"weight\"}\n").await.unwrap();
    drop(writer);
    reader_task.await.unwrap().unwrap();

    let first = lines_rx.recv().await.unwrap();
    let second = lines_rx.recv().await.unwrap();
    assert!(second.received - first.received >= Duration::from_millis(250));
}

#[test]
fn commands_bypass_the_disambiguator() {
    let mut router = InputRouter::new(KeystrokeDisambiguator::default());
    let line = |text: &str, ms: u64| InputLine {
        text: text.to_string(),
        received: Duration::from_millis(ms),
    };

    assert_eq!(router.route(&line(&key("A"), 1_000)).unwrap(), None);
    assert_eq!(
        router.route(&line("{\"cmd\":\"tare\"}", 1_005)).unwrap(),
        Some(Routed::Command(OperatorInput::Tare))
    );
    assert_eq!(router.route(&line("   ", 1_006)).unwrap(), None);

    // The pending key survives a command in between
    match router.route(&line(&key("Enter"), 1_010)).unwrap() {
        Some(Routed::Scan(scan)) => assert_eq!(scan.barcode, "A"),
        other => panic!("expected a scan, got {:?}", other),
    }
}

#[test]
fn explicit_timestamps_win_over_arrival() {
    let mut router = InputRouter::new(KeystrokeDisambiguator::default());
    let stamped = |text: &str| InputLine {
        text: text.to_string(),
        // Arrived together, typed far apart
        received: Duration::from_millis(5_000),
    };

    router
        .route(&stamped("{\"cmd\":\"key\",\"key\":\"1\",\"at_ms\":1000}"))
        .unwrap();
    let routed = router
        .route(&stamped("{\"cmd\":\"key\",\"key\":\"Enter\",\"at_ms\":1600}"))
        .unwrap();
    assert_eq!(routed, None);
}
