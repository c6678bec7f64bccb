//! S2 Buffered seek (spec §8): after S1's start-up, seeking within what's
//! already buffered must not clear any buffer or force a reseed.

mod common;

use std::sync::Arc;

use abr::{AbrConfig, BandwidthEstimator, VariantChooser};
use manifest::ContentType;
use media_source::MediaSourceEngine;
use net::NetworkEngine;
use play_head::PlayHeadController;
use presentation_timeline::{PresentationTimeline, SystemClock};
use streaming_engine::{StreamingConfig, StreamingEngine};
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn seeking_within_the_buffer_does_not_clear_or_reseed() {
    let cdn = common::FakeCdn::spawn(10, 250_000).await;
    let manifest = common::single_period_av_manifest(&cdn);
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

    // Buffer the first segment of each type: [0,10) audio, [0,12) video.
    for content_type in [ContentType::Audio, ContentType::Video] {
        engine.step(content_type, 0.0, &token).await.unwrap();
        engine.step(content_type, 0.0, &token).await.unwrap();
    }

    let audio_before = media_source.buffered_range(ContentType::Audio).await;
    let video_before = media_source.buffered_range(ContentType::Video).await;

    let position = engine.seek(7.0, &timeline, &token).await.unwrap();
    assert_eq!(position, 7.0);

    let audio_after = media_source.buffered_range(ContentType::Audio).await;
    let video_after = media_source.buffered_range(ContentType::Video).await;
    assert_eq!(audio_before, audio_after, "buffered audio must survive a seek within range");
    assert_eq!(video_before, video_after, "buffered video must survive a seek within range");

    // No reseed means the next step resumes the existing sequence rather
    // than re-crossing a period boundary.
    let next = engine.step(ContentType::Audio, 7.0, &token).await.unwrap();
    assert!(matches!(next, streaming_engine::StepOutcome::Appended { .. } | streaming_engine::StepOutcome::Slept));
}
