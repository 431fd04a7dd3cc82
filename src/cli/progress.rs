//! CLI-specific progress handling for butterfly-csv
//!
//! Conversion has no meaningful byte count, so the CLI shows a spinner
//! whose message follows the pipeline stages.

use std::time::Duration;

use butterfly_csv::{ConvertStage, ProgressCallback};
use indicatif::{ProgressBar, ProgressStyle};

/// Creates a spinner for CLI display
pub fn create_spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template("{spinner:.green} [{elapsed_precise}] {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

/// Message shown while a stage is running
pub fn stage_message(stage: ConvertStage) -> &'static str {
    match stage {
        ConvertStage::Parsing => "📖 Parsing OSM XML",
        ConvertStage::Exporting => "🧮 Building tables",
        ConvertStage::Writing => "💾 Writing CSV files",
        ConvertStage::Done => "✅ Conversion completed!",
    }
}

/// Progress manager for a conversion run
pub struct ProgressManager {
    pub pb: ProgressBar,
}

impl ProgressManager {
    /// Create a new progress manager
    pub fn new(message: &str) -> Self {
        eprintln!("{message}");
        Self {
            pb: create_spinner(),
        }
    }

    /// Callback updating the spinner, to plug into `ConvertOptions`
    pub fn callback(&self) -> ProgressCallback {
        let pb = self.pb.clone();
        std::sync::Arc::new(move |stage| match stage {
            ConvertStage::Done => pb.finish_with_message(stage_message(stage)),
            _ => pb.set_message(stage_message(stage)),
        })
    }

    /// Remove the spinner after a failure
    pub fn abandon(&self) {
        if !self.pb.is_finished() {
            self.pb.finish_and_clear();
        }
    }
}
