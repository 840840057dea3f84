//! Progress UI (per-file bars) for download runs.

use std::time::Duration;

use canvas_dl_core::{NoopProgress, ProgressObserver, TransferProgress};
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};

const BAR_TEMPLATE: &str = "{msg:30!} [{bar:30}] {bytes}/{total_bytes} {bytes_per_sec} {eta}";
const SPINNER_TEMPLATE: &str = "{spinner} {msg:30!} {bytes} {bytes_per_sec}";

/// Renders one bar per in-flight file on stderr.
pub(crate) struct IndicatifProgress {
    multi: MultiProgress,
}

impl IndicatifProgress {
    pub(crate) fn new() -> Self {
        Self {
            multi: MultiProgress::with_draw_target(ProgressDrawTarget::stderr()),
        }
    }
}

impl ProgressObserver for IndicatifProgress {
    fn start(&self, label: &str, total: Option<u64>) -> Box<dyn TransferProgress> {
        let bar = self.multi.add(ProgressBar::no_length());
        bar.set_message(label.to_string());
        match total {
            Some(total) if total > 0 => set_bar_length(&bar, total),
            _ => {
                bar.set_style(
                    ProgressStyle::with_template(SPINNER_TEMPLATE)
                        .unwrap_or_else(|_| ProgressStyle::default_spinner()),
                );
                bar.enable_steady_tick(Duration::from_millis(100));
            }
        }
        Box::new(FileBar { bar })
    }
}

fn set_bar_length(bar: &ProgressBar, total: u64) {
    bar.disable_steady_tick();
    bar.set_style(
        ProgressStyle::with_template(BAR_TEMPLATE)
            .map(|style| style.progress_chars("=> "))
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar.set_length(total);
}

struct FileBar {
    bar: ProgressBar,
}

impl TransferProgress for FileBar {
    fn advance(&self, bytes: u64) {
        self.bar.inc(bytes);
    }

    fn set_total(&self, total: u64) {
        if total > 0 {
            set_bar_length(&self.bar, total);
        }
    }

    fn restart(&self) {
        self.bar.set_position(0);
    }

    fn finish(&self, _success: bool) {
        self.bar.finish_and_clear();
    }
}

/// Picks the observer for this run: bars on an interactive terminal, nothing otherwise.
pub(crate) fn progress_observer(show: bool) -> std::sync::Arc<dyn ProgressObserver> {
    if show {
        std::sync::Arc::new(IndicatifProgress::new())
    } else {
        std::sync::Arc::new(NoopProgress)
    }
}
