//! Per-clip addon chain.
//!
//! Addons run in a fixed order over each clip after trimming. They are
//! best-effort by contract: a failing addon logs a warning, records an
//! unapplied outcome, and leaves the clip untouched for the rest of
//! the chain.

use std::path::Path;

use async_trait::async_trait;
use tracing::{info, warn};

use vpe_models::{AddonKind, AddonOutcome, Clip};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;

/// A detected rectangular region of interest, pixel coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub confidence: f32,
    /// Model class label ("person", "car", ...), when the detector
    /// reports one.
    pub label: Option<String>,
}

/// What a detector looks for in a clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionTarget {
    Objects,
    Faces,
    LicensePlates,
}

impl DetectionTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionTarget::Objects => "objects",
            DetectionTarget::Faces => "faces",
            DetectionTarget::LicensePlates => "license_plates",
        }
    }
}

/// Frame-level inference collaborator. Implementations live outside
/// this crate (a remote model server in production, fixtures in tests).
#[async_trait]
pub trait RegionDetector: Send + Sync {
    async fn detect_regions(
        &self,
        clip: &Path,
        target: DetectionTarget,
    ) -> MediaResult<Vec<Region>>;
}

#[async_trait]
impl<T: RegionDetector + ?Sized> RegionDetector for std::sync::Arc<T> {
    async fn detect_regions(
        &self,
        clip: &Path,
        target: DetectionTarget,
    ) -> MediaResult<Vec<Region>> {
        (**self).detect_regions(clip, target).await
    }
}

/// One addon's transformation of one clip.
#[async_trait]
pub trait ClipAddon: Send + Sync {
    fn kind(&self) -> AddonKind;

    /// Apply the addon in place. Errors are tolerated by the chain.
    async fn apply(&self, clip: &Clip) -> MediaResult<AddonOutcome>;
}

/// Ordered, failure-tolerant addon runner.
#[derive(Default)]
pub struct AddonChain {
    addons: Vec<Box<dyn ClipAddon>>,
}

impl AddonChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, addon: Box<dyn ClipAddon>) {
        self.addons.push(addon);
    }

    pub fn is_empty(&self) -> bool {
        self.addons.is_empty()
    }

    /// Run every addon over `clip`, recording one outcome each.
    pub async fn run(&self, clip: &mut Clip) {
        for addon in &self.addons {
            let kind = addon.kind();
            let outcome = match addon.apply(clip).await {
                Ok(outcome) => outcome,
                Err(err) => {
                    warn!(
                        "Addon {} failed on {}; keeping original clip: {err}",
                        kind.as_str(),
                        clip.file_name()
                    );
                    AddonOutcome::skipped(kind, err.to_string())
                }
            };
            clip.addon_outcomes.push(outcome);
        }
    }
}

/// Counts objects in a clip; purely informational.
///
/// When `labels` is non-empty only detections carrying one of those
/// class labels are counted; otherwise every detection counts.
pub struct ObjectCountAddon<D> {
    detector: D,
    labels: Vec<String>,
}

impl<D: RegionDetector> ObjectCountAddon<D> {
    pub fn new(detector: D, labels: Vec<String>) -> Self {
        Self { detector, labels }
    }

    fn counts(&self, region: &Region) -> bool {
        if self.labels.is_empty() {
            return true;
        }
        region
            .label
            .as_deref()
            .is_some_and(|label| self.labels.iter().any(|wanted| wanted == label))
    }
}

#[async_trait]
impl<D: RegionDetector> ClipAddon for ObjectCountAddon<D> {
    fn kind(&self) -> AddonKind {
        AddonKind::ObjectCount
    }

    async fn apply(&self, clip: &Clip) -> MediaResult<AddonOutcome> {
        let regions = self
            .detector
            .detect_regions(&clip.path, DetectionTarget::Objects)
            .await?;
        let count = regions.iter().filter(|r| self.counts(r)).count();
        info!("Counted {} object(s) in {}", count, clip.file_name());
        Ok(AddonOutcome::applied(
            self.kind(),
            format!("{count} object(s)"),
        ))
    }
}

/// Blurs detected regions (faces or plates) out of a clip in place.
pub struct RedactionAddon<D> {
    detector: D,
    target: DetectionTarget,
    kind: AddonKind,
}

impl<D: RegionDetector> RedactionAddon<D> {
    pub fn faces(detector: D) -> Self {
        Self {
            detector,
            target: DetectionTarget::Faces,
            kind: AddonKind::FaceRedaction,
        }
    }

    pub fn plates(detector: D) -> Self {
        Self {
            detector,
            target: DetectionTarget::LicensePlates,
            kind: AddonKind::PlateRedaction,
        }
    }
}

#[async_trait]
impl<D: RegionDetector> ClipAddon for RedactionAddon<D> {
    fn kind(&self) -> AddonKind {
        self.kind
    }

    async fn apply(&self, clip: &Clip) -> MediaResult<AddonOutcome> {
        let regions = self
            .detector
            .detect_regions(&clip.path, self.target)
            .await?;
        if regions.is_empty() {
            return Ok(AddonOutcome::applied(self.kind, "no regions detected"));
        }

        let filter = redaction_filter(&regions);
        let redacted = clip.path.with_extension("redacted.mp4");
        let cmd = FfmpegCommand::new(&clip.path, &redacted)
            .filter_complex(filter)
            .video_codec("libx264");
        FfmpegRunner::new().run(&cmd).await?;
        tokio::fs::rename(&redacted, &clip.path).await?;

        info!(
            "Redacted {} {} region(s) in {}",
            regions.len(),
            self.target.as_str(),
            clip.file_name()
        );
        Ok(AddonOutcome::applied(
            self.kind,
            format!("{} region(s) blurred", regions.len()),
        ))
    }
}

/// Build a crop/boxblur/overlay graph that blurs each region in place.
pub fn redaction_filter(regions: &[Region]) -> String {
    let mut stages = Vec::with_capacity(regions.len());
    let mut base = "[0:v]".to_string();
    for (i, r) in regions.iter().enumerate() {
        let blurred = format!("[blur{i}]");
        let out = if i + 1 == regions.len() {
            "[vout]".to_string()
        } else {
            format!("[base{i}]")
        };
        stages.push(format!(
            "[0:v]crop={w}:{h}:{x}:{y},boxblur=10:5{blurred}",
            w = r.width,
            h = r.height,
            x = r.x,
            y = r.y,
        ));
        stages.push(format!(
            "{base}{blurred}overlay={x}:{y}{out}",
            x = r.x,
            y = r.y,
        ));
        base = out;
    }
    stages.join(";")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use crate::error::MediaError;

    struct FixedDetector {
        regions: Vec<Region>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl RegionDetector for FixedDetector {
        async fn detect_regions(
            &self,
            _clip: &Path,
            _target: DetectionTarget,
        ) -> MediaResult<Vec<Region>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.regions.clone())
        }
    }

    struct FailingDetector;

    #[async_trait]
    impl RegionDetector for FailingDetector {
        async fn detect_regions(
            &self,
            _clip: &Path,
            _target: DetectionTarget,
        ) -> MediaResult<Vec<Region>> {
            Err(MediaError::detection_failed("model server unreachable"))
        }
    }

    fn region(x: u32, y: u32) -> Region {
        Region {
            x,
            y,
            width: 40,
            height: 40,
            confidence: 0.9,
            label: None,
        }
    }

    fn labeled(label: &str) -> Region {
        Region {
            label: Some(label.to_string()),
            ..region(0, 0)
        }
    }

    fn clip() -> Clip {
        Clip::new(1, PathBuf::from("/work/xa0001_order_1.mp4"), 0.0, 30.0)
    }

    #[test]
    fn test_redaction_filter_single_region() {
        let filter = redaction_filter(&[region(10, 20)]);
        assert_eq!(
            filter,
            "[0:v]crop=40:40:10:20,boxblur=10:5[blur0];[0:v][blur0]overlay=10:20[vout]"
        );
    }

    #[test]
    fn test_redaction_filter_chains_overlays() {
        let filter = redaction_filter(&[region(10, 20), region(100, 50)]);
        assert!(filter.contains("[base0]"));
        assert!(filter.ends_with("[vout]"));
        assert_eq!(filter.matches("overlay=").count(), 2);
    }

    #[tokio::test]
    async fn test_failed_addon_is_tolerated() {
        let mut chain = AddonChain::new();
        chain.push(Box::new(ObjectCountAddon::new(FailingDetector, Vec::new())));

        let mut clip = clip();
        chain.run(&mut clip).await;

        assert_eq!(clip.addon_outcomes.len(), 1);
        let outcome = &clip.addon_outcomes[0];
        assert_eq!(outcome.addon, AddonKind::ObjectCount);
        assert!(!outcome.applied);
        assert!(outcome
            .detail
            .as_deref()
            .unwrap()
            .contains("model server unreachable"));
    }

    #[tokio::test]
    async fn test_chain_continues_past_failure() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut chain = AddonChain::new();
        chain.push(Box::new(ObjectCountAddon::new(FailingDetector, Vec::new())));
        chain.push(Box::new(ObjectCountAddon::new(
            FixedDetector {
                regions: vec![region(0, 0)],
                calls: Arc::clone(&calls),
            },
            Vec::new(),
        )));

        let mut clip = clip();
        chain.run(&mut clip).await;

        assert_eq!(clip.addon_outcomes.len(), 2);
        assert!(!clip.addon_outcomes[0].applied);
        assert!(clip.addon_outcomes[1].applied);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_object_count_filters_by_requested_labels() {
        let calls = Arc::new(AtomicUsize::new(0));
        let addon = ObjectCountAddon::new(
            FixedDetector {
                regions: vec![labeled("person"), labeled("car"), labeled("person")],
                calls: Arc::clone(&calls),
            },
            vec!["person".to_string()],
        );

        let outcome = addon.apply(&clip()).await.unwrap();
        assert_eq!(outcome.detail.as_deref(), Some("2 object(s)"));
    }

    #[tokio::test]
    async fn test_object_count_without_filter_counts_everything() {
        let calls = Arc::new(AtomicUsize::new(0));
        let addon = ObjectCountAddon::new(
            FixedDetector {
                regions: vec![labeled("person"), region(10, 10)],
                calls: Arc::clone(&calls),
            },
            Vec::new(),
        );

        let outcome = addon.apply(&clip()).await.unwrap();
        assert_eq!(outcome.detail.as_deref(), Some("2 object(s)"));
    }

    #[tokio::test]
    async fn test_redaction_with_no_regions_touches_nothing() {
        let calls = Arc::new(AtomicUsize::new(0));
        let addon = RedactionAddon::faces(FixedDetector {
            regions: Vec::new(),
            calls: Arc::clone(&calls),
        });

        // No regions means no ffmpeg invocation, so a nonexistent
        // path is fine here.
        let outcome = addon.apply(&clip()).await.unwrap();
        assert!(outcome.applied);
        assert_eq!(outcome.addon, AddonKind::FaceRedaction);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
