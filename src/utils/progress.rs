//! Terminal spinner that becomes a no-op when the `progress` feature is disabled

use std::borrow::Cow;

/// Spinner shown while a long-running step (indexing) is in progress
pub struct Spinner {
    #[cfg(feature = "progress")]
    bar: indicatif::ProgressBar,
}

#[cfg(feature = "progress")]
impl Spinner {
    pub fn start(message: impl Into<Cow<'static, str>>) -> Self {
        use indicatif::{ProgressBar, ProgressStyle};

        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            bar.set_style(style);
        }
        bar.set_message(message);
        bar.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { bar }
    }

    pub fn finish(self) {
        self.bar.finish_and_clear();
    }
}

#[cfg(not(feature = "progress"))]
impl Spinner {
    pub fn start(_message: impl Into<Cow<'static, str>>) -> Self {
        Self {}
    }

    pub fn finish(self) {}
}
