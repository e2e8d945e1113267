//! Progress indication for in-flight backend requests.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

const TICK_INTERVAL: Duration = Duration::from_millis(500);

/// Handle for one running progress indicator.
///
/// The indicator stops when [`ProgressGuard::stop`] is called or the guard is
/// dropped, whichever comes first. Stopping is idempotent.
pub struct ProgressGuard {
    on_stop: Option<Box<dyn FnOnce() + Send>>,
}

impl ProgressGuard {
    /// Guard that runs `on_stop` exactly once.
    pub fn new(on_stop: impl FnOnce() + Send + 'static) -> Self {
        Self {
            on_stop: Some(Box::new(on_stop)),
        }
    }

    /// Guard with nothing to stop.
    pub fn noop() -> Self {
        Self { on_stop: None }
    }

    /// Stop the indicator now.
    pub fn stop(mut self) {
        self.finish();
    }

    fn finish(&mut self) {
        if let Some(on_stop) = self.on_stop.take() {
            on_stop();
        }
    }
}

impl Drop for ProgressGuard {
    fn drop(&mut self) {
        self.finish();
    }
}

impl std::fmt::Debug for ProgressGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressGuard")
            .field("active", &self.on_stop.is_some())
            .finish()
    }
}

/// Console collaborator receiving start/stop signals for named activities.
pub trait ProgressReporter: Send + Sync {
    fn start(&self, label: &str) -> ProgressGuard;
}

/// Animated ellipsis spinner on stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct SpinnerReporter;

impl ProgressReporter for SpinnerReporter {
    fn start(&self, label: &str) -> ProgressGuard {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{msg}{spinner}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["", ".", "..", "...", "..."]);
        spinner.set_style(style);
        spinner.set_message(label.to_string());
        spinner.enable_steady_tick(TICK_INTERVAL);

        ProgressGuard::new(move || spinner.finish_and_clear())
    }
}

/// Reporter for non-interactive runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {
    fn start(&self, _label: &str) -> ProgressGuard {
        ProgressGuard::noop()
    }
}
