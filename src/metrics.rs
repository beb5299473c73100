use metrics::{Counter, Histogram};
use std::time::Duration;

/// Thumbnail generation metrics.
///
/// Handles are no-ops until a recorder is installed by the host process, so
/// recording is always safe and never load-bearing.
pub struct Metrics {
    pub thumbnails_generated: Counter,
    pub thumbnails_failed: Counter,
    pub generation_duration: Histogram,
    pub navigation_errors: Counter,
    pub capture_errors: Counter,
    pub image_errors: Counter,
    pub lookup_errors: Counter,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            thumbnails_generated: Counter::noop(),
            thumbnails_failed: Counter::noop(),
            generation_duration: Histogram::noop(),
            navigation_errors: Counter::noop(),
            capture_errors: Counter::noop(),
            image_errors: Counter::noop(),
            lookup_errors: Counter::noop(),
        }
    }

    pub fn record_generation(&self, duration: Duration, success: bool) {
        if success {
            self.thumbnails_generated.increment(1);
        } else {
            self.thumbnails_failed.increment(1);
        }

        self.generation_duration.record(duration.as_secs_f64());
    }

    pub fn record_error(&self, classification: &str) {
        match classification {
            "navigation" => self.navigation_errors.increment(1),
            "capture" => self.capture_errors.increment(1),
            "image_processing" => self.image_errors.increment(1),
            "not_found" => self.lookup_errors.increment(1),
            _ => {}
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
