use indicatif::{HumanDuration, ProgressBar};
use std::time::Duration;

/// Spinner shown while a load runs; hidden when stdout is not a terminal
pub struct Spinner {
    pb: ProgressBar,
}

impl Spinner {
    pub fn new(message: &str) -> Self {
        let pb = if console::Term::stdout().is_term() {
            let pb = ProgressBar::new_spinner();
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        } else {
            ProgressBar::hidden()
        };
        pb.set_message(message.to_string());
        Self { pb }
    }

    /// Clear the spinner and report how long it ran
    pub fn finish_timed(&self, label: &str) {
        let elapsed = self.pb.elapsed();
        self.pb
            .finish_with_message(format!("{} in {}", label, HumanDuration(elapsed)));
    }

    pub fn clear(&self) {
        self.pb.finish_and_clear();
    }
}
