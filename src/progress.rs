//! Terminal progress bars for artifact downloads

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

const BAR_TEMPLATE: &str =
    "{msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})";
const SPINNER_TEMPLATE: &str = "{spinner} {msg} {bytes} ({bytes_per_sec})";

/// Download progress for a single artifact
pub struct DownloadProgress {
    bar: ProgressBar,
    sized: bool,
}

impl DownloadProgress {
    /// Visible progress drawn to stderr, or a hidden one when `visible` is false
    pub fn new(visible: bool, message: String) -> Self {
        let bar = ProgressBar::with_draw_target(
            None,
            if visible {
                ProgressDrawTarget::stderr()
            } else {
                ProgressDrawTarget::hidden()
            },
        );
        if let Ok(style) = ProgressStyle::with_template(SPINNER_TEMPLATE) {
            bar.set_style(style);
        }
        bar.set_message(message);
        Self { bar, sized: false }
    }

    /// Progress callback target: `(bytes_transferred, total_bytes)`
    pub fn update(&mut self, transferred: u64, total: Option<u64>) {
        if let Some(total) = total.filter(|t| *t > 0)
            && !self.sized
        {
            if let Ok(style) = ProgressStyle::with_template(BAR_TEMPLATE) {
                self.bar.set_style(style.progress_chars("=> "));
            }
            self.bar.set_length(total);
            self.sized = true;
        }
        self.bar.set_position(transferred);
    }

    pub fn finish(self) {
        self.bar.finish_and_clear();
    }

    pub fn abandon(self) {
        self.bar.abandon();
    }
}
