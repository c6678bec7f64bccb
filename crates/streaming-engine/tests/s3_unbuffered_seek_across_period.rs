//! S3 Unbuffered seek across a period boundary (spec §8): seeking to a
//! position outside every buffered range must clear each type's buffer and
//! reseed it at the target, picking up the new period's streams.

mod common;

use std::sync::Arc;

use abr::{AbrConfig, BandwidthEstimator, VariantChooser};
use manifest::ContentType;
use media_source::MediaSourceEngine;
use net::NetworkEngine;
use play_head::PlayHeadController;
use presentation_timeline::{PresentationTimeline, SystemClock};
use streaming_engine::{StepOutcome, StreamingConfig, StreamingEngine};
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn seeking_past_the_buffer_clears_and_reseeds_onto_the_new_period() {
    let cdn = common::FakeCdn::spawn(10, 250_000).await;
    let manifest = common::two_period_manifest(&cdn);
    let timeline = PresentationTimeline::vod(60.0, Arc::new(SystemClock));

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

    // Buffer period 1's first segments (covers roughly [0,10)) at t=3.
    for content_type in [ContentType::Audio, ContentType::Video] {
        engine.step(content_type, 3.0, &token).await.unwrap();
        engine.step(content_type, 3.0, &token).await.unwrap();
    }
    assert!(!media_source.buffered_range(ContentType::Audio).await.is_empty());

    // Seek to t=40, well inside period 2 and outside anything buffered.
    let position = engine.seek(40.0, &timeline, &token).await.unwrap();
    assert_eq!(position, 40.0);

    assert!(media_source.buffered_range(ContentType::Audio).await.is_empty(), "buffer must be cleared on an unbuffered seek");
    assert!(media_source.buffered_range(ContentType::Video).await.is_empty());

    // The next step must detect the period crossing before fetching.
    let transition = engine.step(ContentType::Audio, 40.0, &token).await.unwrap();
    assert!(matches!(transition, StepOutcome::PeriodTransitioned { .. }), "expected a period transition, got {transition:?}");

    let appended = engine.step(ContentType::Audio, 40.0, &token).await.unwrap();
    assert!(matches!(appended, StepOutcome::Appended { .. }), "expected the reseeded fetch to append, got {appended:?}");

    let buffered = media_source.buffered_range(ContentType::Audio).await;
    assert!(buffered.iter().any(|(start, _)| *start >= 30.0), "reseeded append should land in period 2's time range");
}
