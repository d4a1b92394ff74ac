use std::sync::OnceLock;
use crate::download::error::ChunkFailure;

/// ETag baseline of one download. The first observed tag wins; later tags are only compared.
#[derive(Debug, Default)]
pub struct EtagBaseline {
    enabled: bool,
    baseline: OnceLock<String>,
}

impl EtagBaseline {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            baseline: OnceLock::new(),
        }
    }

    pub fn get(&self) -> Option<&str> {
        self.baseline.get().map(String::as_str)
    }

    /// A chunk without a tag passes: there is nothing to compare.
    pub fn verify(&self, observed: Option<&str>) -> Result<(), ChunkFailure> {
        if !self.enabled {
            return Ok(());
        }

        let Some(observed) = observed else {
            return Ok(());
        };

        let baseline = self.baseline.get_or_init(|| observed.to_string());
        if baseline == observed {
            Ok(())
        } else {
            Err(ChunkFailure::EtagMismatch {
                expected: baseline.clone(),
                found: observed.to_string(),
            })
        }
    }
}
