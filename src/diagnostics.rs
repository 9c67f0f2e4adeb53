//! Non-fatal warnings raised while a run resolves and cleans its inputs

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Pipeline stage that raised a warning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    Resolve,
    Target,
    Preprocess,
    Train,
}

/// A single recorded warning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Warning {
    pub stage: Stage,
    pub message: String,
}

/// Collects warnings for the run report; every entry is also logged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record and log a warning
    pub fn warn(&mut self, stage: Stage, message: impl Into<String>) {
        let message = message.into();
        warn!(stage = ?stage, "{}", message);
        self.warnings.push(Warning { stage, message });
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Warnings raised by one stage
    pub fn for_stage(&self, stage: Stage) -> impl Iterator<Item = &Warning> {
        self.warnings.iter().filter(move |w| w.stage == stage)
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.warnings.len()
    }
}
