//! Terminal progress display for restore runs.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use thaw_core::{RestoreEvent, RestoreObserver, RestorePhase, format_bytes};

const TEMPLATE: &str =
    "{spinner:.green} {prefix:>10} [{bar:40.cyan/blue}] {percent:>3}% {bytes}/{total_bytes} {wide_msg}";

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template(TEMPLATE)
        .map_or_else(|_| ProgressStyle::default_bar(), |style| style.progress_chars("█▓░"))
}

/// Renders restore events on a single progress bar.
pub struct ProgressObserver {
    bar: ProgressBar,
}

impl ProgressObserver {
    pub fn new() -> Self {
        Self::with_bar(ProgressBar::new(0))
    }

    /// An observer that tracks state without drawing anything.
    pub fn hidden() -> Self {
        Self::with_bar(ProgressBar::hidden())
    }

    fn with_bar(bar: ProgressBar) -> Self {
        bar.set_style(bar_style());
        Self { bar }
    }

    /// Start animating; call once prompts are over.
    pub fn start(&self) {
        self.bar.enable_steady_tick(Duration::from_millis(250));
    }

    /// Leave the bar in place with a failure message.
    pub fn abandon(&self, message: &str) {
        if !self.bar.is_finished() {
            self.bar.abandon_with_message(message.to_string());
        }
    }

    pub fn bar(&self) -> &ProgressBar {
        &self.bar
    }
}

impl Default for ProgressObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl RestoreObserver for ProgressObserver {
    fn emit(&self, event: RestoreEvent) {
        match event {
            RestoreEvent::PhaseChanged { phase } => {
                self.bar.set_prefix(phase.to_string());
                match phase {
                    RestorePhase::Catalogue => self.bar.set_message("fetching catalogue"),
                    RestorePhase::Archives => self.bar.set_message("requesting archives"),
                    RestorePhase::Done => self.bar.finish_with_message("restore complete"),
                }
            }
            RestoreEvent::WaitingForJob { job_id } => {
                self.bar.set_message(format!("waiting for job {job_id}"));
            }
            RestoreEvent::RetrievalAdmitted {
                archive_id,
                range,
                reused,
                ..
            } => {
                let verb = if reused { "reusing" } else { "requested" };
                self.bar.set_message(format!("{verb} {archive_id} [{range}]"));
            }
            RestoreEvent::ArchiveSkipped { archive_id, reason } => {
                self.bar
                    .println(format!("skipped archive {archive_id}: {reason}"));
            }
            RestoreEvent::ArchiveRestored { paths, .. } => {
                if let Some(first) = paths.first() {
                    self.bar.set_message(format!("restored {}", first.display()));
                }
            }
            RestoreEvent::Progress {
                restored_bytes,
                total_bytes,
            } => {
                self.bar.set_length(total_bytes);
                self.bar.set_position(restored_bytes);
            }
            RestoreEvent::ThroughputUpdated { bytes_per_second } => {
                self.bar
                    .set_message(format!("speed {}/s", format_bytes(bytes_per_second)));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thaw_core::JobId;

    #[test]
    fn test_progress_moves_the_bar() {
        let observer = ProgressObserver::hidden();
        observer.emit(RestoreEvent::Progress {
            restored_bytes: 40,
            total_bytes: 100,
        });
        assert_eq!(observer.bar().length(), Some(100));
        assert_eq!(observer.bar().position(), 40);
    }

    #[test]
    fn test_done_finishes_the_bar() {
        let observer = ProgressObserver::hidden();
        observer.emit(RestoreEvent::WaitingForJob {
            job_id: JobId::new("job-1"),
        });
        assert_eq!(observer.bar().message(), "waiting for job job-1");
        observer.emit(RestoreEvent::PhaseChanged {
            phase: RestorePhase::Done,
        });
        assert!(observer.bar().is_finished());
        assert_eq!(observer.bar().prefix(), "done");
    }
}
