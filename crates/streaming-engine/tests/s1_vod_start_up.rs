//! S1 VOD start-up (spec §8): a single period, one audio track (10s
//! segments) and one video track (12s segments). With a fast network, one
//! fetch per type should clear the buffering goal.

mod common;

use std::sync::Arc;

use abr::{AbrConfig, BandwidthEstimator, VariantChooser};
use manifest::ContentType;
use media_source::MediaSourceEngine;
use net::NetworkEngine;
use play_head::PlayHeadController;
use presentation_timeline::SystemClock;
use streaming_engine::{StepOutcome, StreamingConfig, StreamingEngine};
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn vod_start_up_clears_buffering_goal_on_a_fast_network() {
    let cdn = common::FakeCdn::spawn(10, 250_000).await;
    let manifest = common::single_period_av_manifest(&cdn);

    let sink: Arc<dyn media_source::MediaSink> = Arc::new(common::RecordingSink::default());
    let media_source = Arc::new(MediaSourceEngine::new(sink));
    media_source.init(ContentType::Audio, "audio/mp4").await.unwrap();
    media_source.init(ContentType::Video, "video/mp4").await.unwrap();

    let network = Arc::new(NetworkEngine::new(&net::NetworkConfig::default()).unwrap());
    let clock = Arc::new(SystemClock);
    let bandwidth = BandwidthEstimator::new(10_000_000.0);
    let chooser = VariantChooser::new(AbrConfig::default(), clock);
    let play_head = PlayHeadController::new(play_head::PlayHeadConfig::default());

    let engine = StreamingEngine::new(
        manifest,
        media_source.clone(),
        network,
        bandwidth,
        chooser,
        None,
        None,
        play_head,
        StreamingConfig::default(),
        &[ContentType::Audio, ContentType::Video],
    );

    let token = CancellationToken::new();

    // First step per type only crosses into the period; the second
    // performs the actual fetch+append.
    for content_type in [ContentType::Audio, ContentType::Video] {
        let first = engine.step(content_type, 0.0, &token).await.unwrap();
        assert!(matches!(first, StepOutcome::PeriodTransitioned { .. }), "expected a period transition, got {first:?}");
        let second = engine.step(content_type, 0.0, &token).await.unwrap();
        assert!(matches!(second, StepOutcome::Appended { .. }), "expected an append, got {second:?}");
    }

    assert!(engine.buffered_ahead_of(ContentType::Audio, 0.0).await >= 10.0);
    assert!(engine.buffered_ahead_of(ContentType::Video, 0.0).await >= 12.0);
}
