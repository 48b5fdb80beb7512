// src/local/settings.rs

//! Build settings that only record what would change

use crate::error::BuildSettingsMutationError;
use crate::host::BuildSettings;
use crate::reconcile::BuildMutation;
use tracing::info;

/// [`BuildSettings`] that logs and records mutations without editing projects
#[derive(Debug, Clone, Default)]
pub struct DryRunSettings {
    applied: Vec<BuildMutation>,
}

impl DryRunSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mutations(&self) -> &[BuildMutation] {
        &self.applied
    }

    pub fn into_mutations(self) -> Vec<BuildMutation> {
        self.applied
    }
}

impl BuildSettings for DryRunSettings {
    fn apply(&mut self, mutation: &BuildMutation) -> Result<(), BuildSettingsMutationError> {
        info!("[dry-run] {}", mutation);
        self.applied.push(mutation.clone());
        Ok(())
    }
}
