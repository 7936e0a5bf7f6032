use std::time::Duration;

use hermes_common::INITIAL_BACKOFF_MS;
use tokio::time::Instant;

/// Status codes of the collector that start a backoff window.
const BACKOFF_STATUSES: &[u16] = &[400, 401, 429];

/// Tracks the cool-off window after the collector rejected a request.
///
/// The controller is idle until a failed request with status 400, 401 or 429 is reported. It then
/// backs off for the duration of the `Retry-After` header, or for twice the previous duration if
/// the header is missing. While a window is active, further failures do not extend it.
#[derive(Clone, Debug, Default)]
pub struct BackoffController {
    duration: Duration,
    start: Option<Instant>,
}

impl BackoffController {
    /// Creates an idle controller.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the duration of the current or last backoff window.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Returns `true` while the backoff window is active.
    pub fn should_backoff(&self) -> bool {
        match self.start {
            Some(start) => start.elapsed() < self.duration,
            None => false,
        }
    }

    /// Returns to the idle state.
    pub fn reset(&mut self) {
        self.duration = Duration::ZERO;
        self.start = None;
    }

    /// Records a successful request.
    pub fn on_success(&mut self) {
        self.reset();
    }

    /// Records a failed request.
    ///
    /// `status` is `None` for network errors and transports that do not expose the response.
    pub fn on_failure(&mut self, status: Option<u16>, retry_after: Option<&str>) {
        if self.should_backoff() {
            return;
        }

        let Some(status) = status.filter(|status| BACKOFF_STATUSES.contains(status)) else {
            return;
        };

        let retry_after = retry_after
            .and_then(parse_retry_after)
            .filter(|seconds| *seconds > 0);

        self.duration = match retry_after {
            Some(seconds) => Duration::from_secs(seconds),
            None => (self.duration * 2).max(Duration::from_millis(INITIAL_BACKOFF_MS)),
        };
        self.start = Some(Instant::now());

        hermes_log::debug!(
            status,
            duration_ms = hermes_common::duration_millis(self.duration),
            "collector requested backoff"
        );
    }
}

/// Parses the leading integer seconds of a `Retry-After` value.
///
/// Trailing garbage is ignored, so `"2.5"` yields two seconds. Values without leading digits,
/// such as HTTP dates, are not supported.
fn parse_retry_after(value: &str) -> Option<u64> {
    let value = value.trim_start();
    let end = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    value[..end].parse().ok()
}
