use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Kinds of raw per-build resources fetched during ingestion
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Logs,
    Diff,
    CommitMetadata,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Logs => write!(f, "logs"),
            Self::Diff => write!(f, "diff"),
            Self::CommitMetadata => write!(f, "commit_metadata"),
        }
    }
}

/// Fetch state of a single resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceState {
    /// Not started
    Pending,
    /// Raw bytes retrieved from the provider, not yet stored
    Fetched,
    /// Being parsed and stored
    Ingesting,
    /// Stored successfully (success terminal)
    Ingested,
    /// Permanently unavailable (failure terminal)
    Missing,
}

impl ResourceState {
    /// Success terminal: the resource is stored and usable
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Ingested)
    }

    /// Permanent-failure terminal: the resource will never become available
    pub fn is_permanent_failure(&self) -> bool {
        matches!(self, Self::Missing)
    }

    pub fn has_started(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Outcome record for one resource of one build
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceEntry {
    pub state: ResourceState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Default for ResourceState {
    fn default() -> Self {
        Self::Pending
    }
}

/// Aggregate ingestion status of a build, derived from its resource map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestionStatus {
    Pending,
    Ingesting,
    Ingested,
    MissingResource,
    Failed,
}

impl IngestionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ingested | Self::MissingResource | Self::Failed)
    }

    /// Terminal states that make the build a retry candidate
    pub fn is_permanent_failure(&self) -> bool {
        matches!(self, Self::MissingResource | Self::Failed)
    }
}

impl fmt::Display for IngestionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Ingesting => write!(f, "ingesting"),
            Self::Ingested => write!(f, "ingested"),
            Self::MissingResource => write!(f, "missing_resource"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// One build inside a scenario's ingestion phase.
///
/// The aggregate status is a pure function of the resource map and the
/// out-of-band failure; it is recomputed on every read and never stored, so
/// aggregate and detail cannot drift apart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestionBuild {
    pub ci_run_id: u64,
    /// Stable ordering key within the repo; the checkpoint cursor basis
    pub build_number: u64,
    pub commit_sha: String,
    pub repo_full_name: String,
    pub required_resources: BTreeSet<ResourceKind>,
    pub resource_status: BTreeMap<ResourceKind, ResourceEntry>,
    /// Out-of-band ingestion error (provider outage, parse failure)
    pub failure: Option<String>,
    /// Permanently excluded from retries (given up on)
    pub accepted: bool,
}

impl IngestionBuild {
    pub fn new(
        ci_run_id: u64,
        build_number: u64,
        commit_sha: impl Into<String>,
        repo_full_name: impl Into<String>,
        required_resources: BTreeSet<ResourceKind>,
    ) -> Self {
        let resource_status = required_resources
            .iter()
            .map(|kind| (*kind, ResourceEntry::default()))
            .collect();
        Self {
            ci_run_id,
            build_number,
            commit_sha: commit_sha.into(),
            repo_full_name: repo_full_name.into(),
            required_resources,
            resource_status,
            failure: None,
            accepted: false,
        }
    }

    /// Aggregate status derived from the resource map (pure, never stored)
    pub fn status(&self) -> IngestionStatus {
        if self.failure.is_some() {
            return IngestionStatus::Failed;
        }

        let entries: Vec<&ResourceEntry> = self
            .required_resources
            .iter()
            .filter_map(|kind| self.resource_status.get(kind))
            .collect();

        if entries.iter().any(|e| e.state.is_permanent_failure()) {
            IngestionStatus::MissingResource
        } else if entries.iter().all(|e| e.state.is_success()) {
            IngestionStatus::Ingested
        } else if entries.iter().all(|e| !e.state.has_started()) {
            IngestionStatus::Pending
        } else {
            IngestionStatus::Ingesting
        }
    }

    /// Record the outcome of one resource fetch
    pub fn set_resource(&mut self, kind: ResourceKind, state: ResourceState, error: Option<String>) {
        self.resource_status
            .insert(kind, ResourceEntry { state, error });
    }

    /// Record an out-of-band ingestion failure
    pub fn set_failure(&mut self, message: impl Into<String>) {
        self.failure = Some(message.into());
    }

    /// Reset every required resource to pending and clear the failure,
    /// putting the build back in line for re-ingestion
    pub fn reset_for_retry(&mut self) {
        for kind in self.required_resources.clone() {
            self.resource_status.insert(kind, ResourceEntry::default());
        }
        self.failure = None;
    }

    /// Retry candidates: terminal-failure builds not permanently excluded
    pub fn is_retryable(&self) -> bool {
        self.status().is_permanent_failure() && !self.accepted
    }
}

/// Terminal outcome of feature extraction over one build.
///
/// `Partial` is a valid terminal state distinct from `Failed`: some but not
/// all expected features were produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStatus {
    Pending,
    Completed,
    Partial,
    Failed,
}

impl ExtractionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// States in which the build produced features
    pub fn produced_features(&self) -> bool {
        matches!(self, Self::Completed | Self::Partial)
    }
}

/// Outcome of the optional static-analysis scan over one build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    Pending,
    Completed,
    Failed,
}

impl ScanStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// One build inside a scenario's extraction phase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentBuild {
    pub ci_run_id: u64,
    pub build_number: u64,
    pub commit_sha: String,
    pub repo_full_name: String,
    pub extraction: ExtractionStatus,
    pub scan: ScanStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EnrichmentBuild {
    pub fn new(
        ci_run_id: u64,
        build_number: u64,
        commit_sha: impl Into<String>,
        repo_full_name: impl Into<String>,
    ) -> Self {
        Self {
            ci_run_id,
            build_number,
            commit_sha: commit_sha.into(),
            repo_full_name: repo_full_name.into(),
            extraction: ExtractionStatus::Pending,
            scan: ScanStatus::Pending,
            error: None,
        }
    }
}
