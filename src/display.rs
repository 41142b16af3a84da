//! Terminal progress bars and error output.

use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use indicatif::style::TemplateError;

use fileprint_scan::{EntryError, ErrorHook, IndexProgress, ProgressObserver};

/// Progress display for an indexing run.
///
/// A spinner counts discovered files; once discovery ends a bar sized to
/// that count tracks hashing. Error lines are printed above the bars.
pub struct TerminalProgress {
    multi: MultiProgress,
    discover: ProgressBar,
    hash: ProgressBar,
}

impl TerminalProgress {
    /// Create the display. With `quiet` nothing is drawn except errors.
    pub fn new(quiet: bool) -> Result<Self, TemplateError> {
        let multi = if quiet {
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
        } else {
            MultiProgress::new()
        };

        let discover = multi.add(ProgressBar::new_spinner());
        discover.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} [{elapsed_precise}] Indexing: {pos} files found {msg}")?
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );
        discover.enable_steady_tick(Duration::from_millis(80));

        // Length is unknown until discovery finishes.
        let hash = ProgressBar::new(0);
        hash.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} hashed ({per_sec}, {eta})")?
                .progress_chars("█▓░"),
        );

        Ok(Self {
            multi,
            discover,
            hash,
        })
    }

    /// Clear any bars still on screen.
    pub fn clear(&self) {
        self.discover.finish_and_clear();
        self.hash.finish_and_clear();
    }
}

impl ProgressObserver for TerminalProgress {
    fn discovered(&self, discovered: u64) {
        self.discover.set_position(discovered);
    }

    fn hashing_started(&self, total: u64) {
        self.discover.finish_with_message("done");
        self.hash.set_length(total);
        self.hash.reset_elapsed();
        let hash = self.multi.add(self.hash.clone());
        hash.enable_steady_tick(Duration::from_millis(100));
    }

    fn hashed(&self, completed: u64) {
        self.hash.set_position(completed);
    }

    fn finished(&self, progress: &IndexProgress) {
        self.hash.finish_with_message(format!(
            "{} hashed, {} failed, {:.0} files/s",
            progress.files_hashed,
            progress.files_failed,
            progress.files_per_second()
        ));
    }
}

impl ErrorHook for TerminalProgress {
    fn report(&self, error: &EntryError) {
        self.multi.suspend(|| eprintln!("ERROR: {error}"));
    }
}
