// src/detect/digest.rs

use tracing::debug;

use crate::errors::{Result, StackpullError};
use crate::orchestrator::Orchestrator;
use crate::workload::WorkloadSpec;

/// Strip incidental whitespace and quoting left over from tool output.
///
/// Returns `None` when nothing is left. No other normalization happens:
/// digests are opaque and compared byte for byte.
pub fn normalize_digest(raw: &str) -> Option<String> {
    let trimmed = raw
        .trim()
        .trim_matches(|c: char| c == '"' || c == '\'')
        .trim();

    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Desired vs running digest of one workload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestPair {
    pub desired: String,
    /// `None` when the workload has no live instance.
    pub running: Option<String>,
}

impl DigestPair {
    /// A missing instance or any byte difference means a restart.
    pub fn requires_update(&self) -> bool {
        match &self.running {
            None => true,
            Some(running) => running != &self.desired,
        }
    }
}

/// Read-only digest queries against an [`Orchestrator`].
pub struct DigestResolver<'a> {
    orchestrator: &'a dyn Orchestrator,
}

impl<'a> DigestResolver<'a> {
    pub fn new(orchestrator: &'a dyn Orchestrator) -> Self {
        Self { orchestrator }
    }

    /// Digest the workload's image reference currently resolves to locally.
    pub async fn resolve_desired(&self, workload: &WorkloadSpec) -> Result<String> {
        let raw = self
            .orchestrator
            .inspect_image_digest(&workload.image)
            .await
            .map_err(|e| e.for_workload(&workload.name))?;

        normalize_digest(&raw).ok_or_else(|| StackpullError::ResolveError {
            workload: workload.name.clone(),
            reason: format!("empty digest for image '{}'", workload.image),
        })
    }

    /// Digest of the image the live instance runs, if there is one.
    pub async fn resolve_running(&self, workload: &str) -> Result<Option<String>> {
        let raw = self
            .orchestrator
            .inspect_running_digest(workload)
            .await
            .map_err(|e| e.for_workload(workload))?;

        Ok(raw.as_deref().and_then(normalize_digest))
    }

    pub async fn resolve_pair(&self, workload: &WorkloadSpec) -> Result<DigestPair> {
        let desired = self.resolve_desired(workload).await?;
        let running = self.resolve_running(&workload.name).await?;

        debug!(
            workload = %workload.name,
            desired = %desired,
            running = ?running,
            "resolved digests"
        );

        Ok(DigestPair { desired, running })
    }
}
