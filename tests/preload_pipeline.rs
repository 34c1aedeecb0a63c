mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use random_slideshow::Error;
use random_slideshow::filter::{FilterConfig, OrientationFilter};
use random_slideshow::tasks::preload::{FrameSource, PreloadPipeline};
use tokio::sync::{mpsc, watch};

use common::{PanickingDecoder, SizedDecoder, SlowDecoder, catalog_of, wait_until};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn repeated_requests_never_overlap() {
    let decoder = Arc::new(SlowDecoder::new(Duration::from_millis(80), (64, 48)));
    let (_filter_tx, filter) = watch::channel(FilterConfig::accept_all());
    let (failures_tx, _failures_rx) = mpsc::channel(4);
    let pipeline = PreloadPipeline::new(
        catalog_of(&["/a.jpg", "/b.jpg"]),
        filter,
        decoder.clone(),
        StdRng::seed_from_u64(1),
        failures_tx,
    );

    assert!(pipeline.request_fill(), "first request should start a fill");
    for _ in 0..10 {
        assert!(!pipeline.request_fill(), "fill already in flight");
    }
    assert!(pipeline.is_loading());

    assert!(wait_until(Duration::from_secs(5), || pipeline.is_ready()).await);
    assert!(wait_until(Duration::from_secs(1), || !pipeline.is_loading()).await);
    assert_eq!(decoder.max_active.load(Ordering::SeqCst), 1);
    assert_eq!(decoder.calls.load(Ordering::SeqCst), 1);

    // A full slot is not refilled until it is consumed.
    assert!(!pipeline.request_fill());
    assert_eq!(decoder.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn take_and_refill_hands_over_and_starts_next() {
    let decoder = Arc::new(SizedDecoder::new([("/a.jpg", (30, 20))]));
    let (_filter_tx, filter) = watch::channel(FilterConfig::accept_all());
    let (failures_tx, _failures_rx) = mpsc::channel(4);
    let pipeline = PreloadPipeline::new(
        catalog_of(&["/a.jpg"]),
        filter,
        decoder,
        StdRng::seed_from_u64(2),
        failures_tx,
    );

    // Empty slot: not ready, but a fill gets kicked off.
    assert!(pipeline.take_and_refill().is_none());
    assert!(wait_until(Duration::from_secs(5), || pipeline.is_ready()).await);

    let frame = pipeline.take_and_refill().expect("slot should be ready");
    assert_eq!(frame.path.to_str(), Some("/a.jpg"));
    assert_eq!(frame.image.dimensions(), (30, 20));

    // The next one follows without another request.
    assert!(wait_until(Duration::from_secs(5), || pipeline.is_ready()).await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn shutdown_cancels_a_fill_that_can_never_succeed() {
    let decoder = Arc::new(SizedDecoder::new([("/square.jpg", (100, 100))]));
    let (_filter_tx, filter) = watch::channel(FilterConfig {
        orientation: OrientationFilter::Portrait,
        ..FilterConfig::accept_all()
    });
    let (failures_tx, mut failures_rx) = mpsc::channel(4);
    let pipeline = PreloadPipeline::new(
        catalog_of(&["/square.jpg"]),
        filter,
        decoder.clone(),
        StdRng::seed_from_u64(3),
        failures_tx,
    );

    assert!(pipeline.request_fill());
    assert!(
        wait_until(Duration::from_secs(5), || decoder.calls.load(Ordering::SeqCst) > 10).await,
        "fill should be spinning on rejected candidates"
    );
    assert!(pipeline.is_loading());

    tokio::time::timeout(Duration::from_secs(5), pipeline.shutdown())
        .await
        .expect("shutdown should not hang");
    assert!(!pipeline.is_loading(), "in-flight flag must be cleared");
    assert!(!pipeline.is_ready());
    assert!(!pipeline.request_fill(), "no fills after shutdown");

    // Cancellation is expected, not a failure.
    assert!(failures_rx.try_recv().is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn relaxing_the_filter_unblocks_a_running_fill() {
    let decoder = Arc::new(SizedDecoder::new([("/small.jpg", (120, 90))]));
    let (filter_tx, filter) = watch::channel(FilterConfig::default());
    let (failures_tx, _failures_rx) = mpsc::channel(4);
    let pipeline = PreloadPipeline::new(
        catalog_of(&["/small.jpg"]),
        filter,
        decoder,
        StdRng::seed_from_u64(4),
        failures_tx,
    );

    assert!(pipeline.request_fill());
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(!pipeline.is_ready());

    filter_tx.send_replace(FilterConfig {
        min_width: 100,
        min_height: 50,
        orientation: OrientationFilter::Landscape,
    });
    assert!(wait_until(Duration::from_secs(5), || pipeline.is_ready()).await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn undrained_failure_channel_does_not_block_shutdown() {
    let (_filter_tx, filter) = watch::channel(FilterConfig::accept_all());
    let (failures_tx, mut failures_rx) = mpsc::channel(16);
    let pipeline = PreloadPipeline::new(
        catalog_of(&["/a.jpg"]),
        filter,
        Arc::new(PanickingDecoder),
        StdRng::seed_from_u64(5),
        failures_tx,
    );

    // More failed fills than the channel can hold, nobody reading.
    for _ in 0..20 {
        assert!(wait_until(Duration::from_secs(5), || !pipeline.is_loading()).await);
        assert!(pipeline.take_and_refill().is_none());
    }

    tokio::time::timeout(Duration::from_secs(3), pipeline.shutdown())
        .await
        .expect("shutdown must finish with a full failure channel");
    assert!(!pipeline.is_ready());

    let mut reported = 0;
    while let Ok(err) = failures_rx.try_recv() {
        assert!(matches!(err, Error::Task(_)), "{err}");
        reported += 1;
    }
    assert!((1..=16).contains(&reported), "reported {reported}");
}
