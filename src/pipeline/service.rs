use super::errors::{ServiceError, ServiceResult};
use super::retry::{plan_resume, plan_retry};
use crate::config::{BuildriskConfig, PaginationConfig};
use crate::constants::events;
use crate::events::{DeltaPublisher, ScenarioDelta};
use crate::models::{
    Checkpoint, EnrichmentBuild, ExtractionStatus, IngestionBuild, IngestionStatus, ResourceKind,
    ResourceState, Scenario, ScenarioConfigSummary, ScanStatus, SplitAssignment, SplitSubset,
};
use crate::state_machine::{ScenarioEvent, ScenarioStateMachine, ScenarioStatus};
use crate::store::{DirectoryError, ScenarioDirectory};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::info;
use uuid::Uuid;

/// A CI build candidate visible to the preview endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateBuild {
    pub ci_run_id: u64,
    pub build_number: u64,
    pub repo_full_name: String,
    pub commit_sha: String,
    pub language: String,
    pub conclusion: String,
    pub ci_provider: String,
    pub is_bot: bool,
    pub created_at: DateTime<Utc>,
}

/// Filter over candidate builds for scenario previews
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildFilter {
    pub date_start: Option<DateTime<Utc>>,
    pub date_end: Option<DateTime<Utc>>,
    pub languages: Vec<String>,
    pub conclusions: Vec<String>,
    pub ci_provider: Option<String>,
    pub exclude_bots: bool,
}

impl BuildFilter {
    pub fn matches(&self, build: &CandidateBuild) -> bool {
        if let Some(start) = self.date_start {
            if build.created_at < start {
                return false;
            }
        }
        if let Some(end) = self.date_end {
            if build.created_at > end {
                return false;
            }
        }
        if !self.languages.is_empty() && !self.languages.contains(&build.language) {
            return false;
        }
        if !self.conclusions.is_empty() && !self.conclusions.contains(&build.conclusion) {
            return false;
        }
        if let Some(provider) = &self.ci_provider {
            if &build.ci_provider != provider {
                return false;
            }
        }
        if self.exclude_bots && build.is_bot {
            return false;
        }
        true
    }
}

/// Aggregate statistics over every build matching a preview filter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PreviewStats {
    pub total: usize,
    pub by_conclusion: BTreeMap<String, usize>,
}

/// Preview response: one page of matches plus whole-match statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildPreview {
    pub builds: Vec<CandidateBuild>,
    pub stats: PreviewStats,
}

/// Skip/limit pagination request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub skip: usize,
    pub limit: usize,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: crate::constants::DEFAULT_PAGE_LIMIT,
        }
    }
}

/// One page of a list read
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub skip: usize,
    pub limit: usize,
}

/// Scenario list query: pagination plus optional search and status filter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListQuery {
    pub skip: usize,
    pub limit: Option<usize>,
    pub q: Option<String>,
    pub status: Option<ScenarioStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateScenarioRequest {
    pub name: String,
    pub description: String,
    pub splitting_strategy: String,
    pub group_by: Option<String>,
}

/// Retry response; `retry_count` is the number of builds re-targeted
/// (0 means the retry was a no-op, not a failure)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryResponse {
    pub retry_count: u64,
}

/// Scan outcome row for the scan-status sub-resource read
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanStatusEntry {
    pub build_number: u64,
    pub commit_sha: String,
    pub scan: ScanStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug)]
struct ScenarioRecord {
    scenario: Scenario,
    ingestion: BTreeMap<u64, IngestionBuild>,
    enrichment: BTreeMap<u64, EnrichmentBuild>,
    checkpoints: HashMap<String, Checkpoint>,
    splits: Vec<SplitAssignment>,
}

impl ScenarioRecord {
    fn new(scenario: Scenario) -> Self {
        Self {
            scenario,
            ingestion: BTreeMap::new(),
            enrichment: BTreeMap::new(),
            checkpoints: HashMap::new(),
            splits: Vec::new(),
        }
    }
}

/// Command/response owner of scenarios, builds, and checkpoints.
///
/// Every mutation goes through this service and is reflected to clients by
/// the response, a published delta, or a refetch — never applied
/// optimistically. Critical sections are short and never held across an
/// await; delta publication is synchronous on the broadcast channel.
pub struct ScenarioPipelineService {
    state: RwLock<HashMap<Uuid, ScenarioRecord>>,
    catalog: RwLock<Vec<CandidateBuild>>,
    publisher: DeltaPublisher,
    pagination: PaginationConfig,
}

impl ScenarioPipelineService {
    pub fn new(config: &BuildriskConfig) -> Self {
        Self {
            state: RwLock::new(HashMap::new()),
            catalog: RwLock::new(Vec::new()),
            publisher: DeltaPublisher::new(config.events.channel_capacity),
            pagination: config.pagination.clone(),
        }
    }

    /// The delta channel clients subscribe to
    pub fn publisher(&self) -> &DeltaPublisher {
        &self.publisher
    }

    /// Seed the candidate catalog the preview endpoint reads from.
    /// In production this data arrives from the CI-provider ingest service.
    pub fn register_candidates(&self, builds: Vec<CandidateBuild>) {
        let mut catalog = self.catalog.write();
        catalog.extend(builds);
        catalog.sort_by_key(|b| (b.repo_full_name.clone(), b.build_number));
    }

    // ---- scenario CRUD -------------------------------------------------

    pub async fn create_scenario(&self, request: CreateScenarioRequest) -> ServiceResult<Scenario> {
        if request.name.trim().is_empty() {
            return Err(ServiceError::InvalidQuery("scenario name must not be empty".into()));
        }
        let scenario = Scenario::new(request.name, request.description).with_config(
            ScenarioConfigSummary {
                splitting_strategy: request.splitting_strategy,
                group_by: request.group_by,
            },
        );
        let snapshot = scenario.clone();
        self.state
            .write()
            .insert(scenario.id, ScenarioRecord::new(scenario));
        self.publisher
            .publish(ScenarioDelta::status(snapshot.id, snapshot.status));
        info!(
            scenario_id = %snapshot.id,
            event = events::SCENARIO_CREATED,
            name = %snapshot.name,
            "scenario created"
        );
        Ok(snapshot)
    }

    pub async fn get_scenario(&self, id: Uuid) -> ServiceResult<Scenario> {
        self.state
            .read()
            .get(&id)
            .map(|r| r.scenario.clone())
            .ok_or(ServiceError::ScenarioNotFound(id))
    }

    pub async fn list_scenarios(&self, query: ListQuery) -> ServiceResult<Page<Scenario>> {
        let limit = self.effective_limit(query.limit)?;
        let state = self.state.read();

        let mut matches: Vec<Scenario> = state
            .values()
            .map(|r| &r.scenario)
            .filter(|s| query.status.is_none_or(|wanted| s.status == wanted))
            .filter(|s| {
                query
                    .q
                    .as_deref()
                    .is_none_or(|needle| s.matches_query(needle))
            })
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));

        let total = matches.len();
        let items = matches.into_iter().skip(query.skip).take(limit).collect();
        Ok(Page {
            items,
            total,
            skip: query.skip,
            limit,
        })
    }

    pub async fn delete_scenario(&self, id: Uuid) -> ServiceResult<()> {
        self.state
            .write()
            .remove(&id)
            .ok_or(ServiceError::ScenarioNotFound(id))?;
        info!(scenario_id = %id, event = events::SCENARIO_DELETED, "scenario deleted");
        Ok(())
    }

    // ---- preview -------------------------------------------------------

    /// Side-effect-free preview of candidate builds matching a filter
    pub async fn preview_builds(
        &self,
        filter: &BuildFilter,
        page: PageRequest,
    ) -> ServiceResult<BuildPreview> {
        let limit = self.effective_limit(Some(page.limit))?;
        let catalog = self.catalog.read();

        let matches: Vec<&CandidateBuild> =
            catalog.iter().filter(|b| filter.matches(b)).collect();

        let mut stats = PreviewStats {
            total: matches.len(),
            by_conclusion: BTreeMap::new(),
        };
        for build in &matches {
            *stats.by_conclusion.entry(build.conclusion.clone()).or_insert(0) += 1;
        }

        let builds = matches
            .into_iter()
            .skip(page.skip)
            .take(limit)
            .cloned()
            .collect();
        Ok(BuildPreview { builds, stats })
    }

    // ---- phase reports and triggers ------------------------------------

    /// Register the filtered build set. Valid while queued (starts the
    /// filtering phase implicitly) or filtering.
    pub async fn complete_filtering(
        &self,
        id: Uuid,
        builds: Vec<IngestionBuild>,
    ) -> ServiceResult<()> {
        let mut state = self.state.write();
        let record = state.get_mut(&id).ok_or(ServiceError::ScenarioNotFound(id))?;

        match record.scenario.status {
            ScenarioStatus::Queued => {
                Self::transition(record, &self.publisher, ScenarioEvent::StartFiltering)?;
            }
            ScenarioStatus::Filtering => {}
            status => {
                return Err(ServiceError::InvalidPhase {
                    operation: "complete_filtering",
                    status,
                })
            }
        }

        record.ingestion = builds.into_iter().map(|b| (b.build_number, b)).collect();
        self.recompute_and_publish(record);
        Ok(())
    }

    pub async fn trigger_ingest(&self, id: Uuid) -> ServiceResult<ScenarioStatus> {
        self.apply_event(id, ScenarioEvent::StartIngestion).await
    }

    /// Record one resource fetch outcome; returns the build's new aggregate
    pub async fn record_resource_outcome(
        &self,
        id: Uuid,
        build_number: u64,
        kind: ResourceKind,
        state: ResourceState,
        error: Option<String>,
    ) -> ServiceResult<IngestionStatus> {
        let mut guard = self.state.write();
        let record = guard.get_mut(&id).ok_or(ServiceError::ScenarioNotFound(id))?;
        Self::require_status(record, ScenarioStatus::Ingesting, "record_resource_outcome")?;

        let build = record
            .ingestion
            .get_mut(&build_number)
            .ok_or(ServiceError::BuildNotFound {
                scenario_id: id,
                build_number,
            })?;
        build.set_resource(kind, state, error);
        let aggregate = build.status();

        Self::checkpoint_if_terminal(record, build_number, aggregate);
        self.recompute_and_publish(record);
        self.complete_ingestion_if_done(record)?;
        Ok(aggregate)
    }

    /// Record an out-of-band per-build ingestion failure
    pub async fn record_ingestion_error(
        &self,
        id: Uuid,
        build_number: u64,
        message: impl Into<String> + Send,
    ) -> ServiceResult<IngestionStatus> {
        let mut guard = self.state.write();
        let record = guard.get_mut(&id).ok_or(ServiceError::ScenarioNotFound(id))?;
        Self::require_status(record, ScenarioStatus::Ingesting, "record_ingestion_error")?;

        let build = record
            .ingestion
            .get_mut(&build_number)
            .ok_or(ServiceError::BuildNotFound {
                scenario_id: id,
                build_number,
            })?;
        build.set_failure(message);
        let aggregate = build.status();

        Self::checkpoint_if_terminal(record, build_number, aggregate);
        self.recompute_and_publish(record);
        self.complete_ingestion_if_done(record)?;
        Ok(aggregate)
    }

    /// Fail the whole scenario, recording the phase for retry targeting
    pub async fn fail_scenario(
        &self,
        id: Uuid,
        message: impl Into<String> + Send,
    ) -> ServiceResult<ScenarioStatus> {
        self.apply_event(id, ScenarioEvent::Fail(message.into())).await
    }

    /// Begin extraction: creates enrichment builds from the ingested set
    pub async fn trigger_process(&self, id: Uuid) -> ServiceResult<ScenarioStatus> {
        let mut state = self.state.write();
        let record = state.get_mut(&id).ok_or(ServiceError::ScenarioNotFound(id))?;
        let status = Self::transition(record, &self.publisher, ScenarioEvent::StartProcessing)?;

        record.enrichment = record
            .ingestion
            .values()
            .filter(|b| b.status() == IngestionStatus::Ingested)
            .map(|b| {
                (
                    b.build_number,
                    EnrichmentBuild::new(
                        b.ci_run_id,
                        b.build_number,
                        b.commit_sha.clone(),
                        b.repo_full_name.clone(),
                    ),
                )
            })
            .collect();
        self.recompute_and_publish(record);
        Ok(status)
    }

    pub async fn record_extraction_outcome(
        &self,
        id: Uuid,
        build_number: u64,
        outcome: ExtractionStatus,
        error: Option<String>,
    ) -> ServiceResult<()> {
        if !outcome.is_terminal() {
            return Err(ServiceError::InvalidQuery(
                "extraction outcome must be terminal".into(),
            ));
        }
        let mut state = self.state.write();
        let record = state.get_mut(&id).ok_or(ServiceError::ScenarioNotFound(id))?;
        Self::require_status(record, ScenarioStatus::Processing, "record_extraction_outcome")?;

        let build = record
            .enrichment
            .get_mut(&build_number)
            .ok_or(ServiceError::BuildNotFound {
                scenario_id: id,
                build_number,
            })?;
        build.extraction = outcome;
        build.error = error;

        self.recompute_and_publish(record);
        if record
            .enrichment
            .values()
            .all(|b| b.extraction.is_terminal())
        {
            Self::transition(record, &self.publisher, ScenarioEvent::CompleteProcessing)?;
        }
        Ok(())
    }

    pub async fn record_scan_outcome(
        &self,
        id: Uuid,
        build_number: u64,
        outcome: ScanStatus,
        error: Option<String>,
    ) -> ServiceResult<()> {
        if !outcome.is_terminal() {
            return Err(ServiceError::InvalidQuery(
                "scan outcome must be terminal".into(),
            ));
        }
        let mut state = self.state.write();
        let record = state.get_mut(&id).ok_or(ServiceError::ScenarioNotFound(id))?;
        Self::require_status(record, ScenarioStatus::Processing, "record_scan_outcome")?;

        let build = record
            .enrichment
            .get_mut(&build_number)
            .ok_or(ServiceError::BuildNotFound {
                scenario_id: id,
                build_number,
            })?;
        build.scan = outcome;
        if error.is_some() {
            build.error = error;
        }
        self.recompute_and_publish(record);
        Ok(())
    }

    pub async fn trigger_generate(&self, id: Uuid) -> ServiceResult<ScenarioStatus> {
        self.apply_event(id, ScenarioEvent::StartSplitting).await
    }

    /// Record the generated split and complete the scenario
    pub async fn complete_split(
        &self,
        id: Uuid,
        assignments: Vec<SplitAssignment>,
    ) -> ServiceResult<()> {
        let mut state = self.state.write();
        let record = state.get_mut(&id).ok_or(ServiceError::ScenarioNotFound(id))?;

        Self::transition(record, &self.publisher, ScenarioEvent::CompleteSplitting)?;

        let counters = &mut record.scenario.counters;
        counters.train_count = count_subset(&assignments, SplitSubset::Train);
        counters.val_count = count_subset(&assignments, SplitSubset::Val);
        counters.test_count = count_subset(&assignments, SplitSubset::Test);
        record.splits = assignments;
        Ok(())
    }

    // ---- retries and acceptance ----------------------------------------

    /// Re-ingest retryable failed builds. Returns the number of builds
    /// re-targeted; 0 is a no-op that leaves the scenario untouched.
    pub async fn retry_ingestion(&self, id: Uuid) -> ServiceResult<RetryResponse> {
        let mut state = self.state.write();
        let record = state.get_mut(&id).ok_or(ServiceError::ScenarioNotFound(id))?;
        Self::require_status(record, ScenarioStatus::Failed, "retry_ingestion")?;

        let builds: Vec<IngestionBuild> = record.ingestion.values().cloned().collect();
        let targets = plan_retry(&builds);
        if targets.is_empty() {
            return Ok(RetryResponse { retry_count: 0 });
        }

        Self::transition(record, &self.publisher, ScenarioEvent::RetryIngestion)?;
        for build_number in &targets {
            if let Some(build) = record.ingestion.get_mut(build_number) {
                build.reset_for_retry();
            }
        }
        self.recompute_and_publish(record);
        Ok(RetryResponse {
            retry_count: targets.len() as u64,
        })
    }

    /// Re-run extraction over failed enrichment builds
    pub async fn retry_processing(&self, id: Uuid) -> ServiceResult<RetryResponse> {
        let mut state = self.state.write();
        let record = state.get_mut(&id).ok_or(ServiceError::ScenarioNotFound(id))?;
        Self::require_status(record, ScenarioStatus::Failed, "retry_processing")?;

        let targets: Vec<u64> = record
            .enrichment
            .values()
            .filter(|b| b.extraction == ExtractionStatus::Failed)
            .map(|b| b.build_number)
            .collect();
        if targets.is_empty() {
            return Ok(RetryResponse { retry_count: 0 });
        }

        Self::transition(record, &self.publisher, ScenarioEvent::RetryProcessing)?;
        for build_number in &targets {
            if let Some(build) = record.enrichment.get_mut(build_number) {
                build.extraction = ExtractionStatus::Pending;
                build.error = None;
            }
        }
        self.recompute_and_publish(record);
        Ok(RetryResponse {
            retry_count: targets.len() as u64,
        })
    }

    /// Permanently exclude builds from retries; bumps `accepted_failed` on
    /// the owning repo's checkpoint. Returns the number newly accepted.
    pub async fn accept_failed_builds(&self, id: Uuid, build_numbers: &[u64]) -> ServiceResult<u64> {
        let mut state = self.state.write();
        let record = state.get_mut(&id).ok_or(ServiceError::ScenarioNotFound(id))?;

        let mut accepted = 0;
        for build_number in build_numbers {
            let build = record
                .ingestion
                .get_mut(build_number)
                .ok_or(ServiceError::BuildNotFound {
                    scenario_id: id,
                    build_number: *build_number,
                })?;
            if build.is_retryable() {
                build.accepted = true;
                accepted += 1;
                let repo = build.repo_full_name.clone();
                record.checkpoints.entry(repo).or_default().accepted_failed += 1;
            }
        }
        Ok(accepted)
    }

    // ---- sub-resource reads --------------------------------------------

    pub async fn ingestion_builds(
        &self,
        id: Uuid,
        page: PageRequest,
    ) -> ServiceResult<Page<IngestionBuild>> {
        let limit = self.effective_limit(Some(page.limit))?;
        let state = self.state.read();
        let record = state.get(&id).ok_or(ServiceError::ScenarioNotFound(id))?;
        Ok(paginate(record.ingestion.values(), page.skip, limit))
    }

    pub async fn enrichment_builds(
        &self,
        id: Uuid,
        page: PageRequest,
    ) -> ServiceResult<Page<EnrichmentBuild>> {
        let limit = self.effective_limit(Some(page.limit))?;
        let state = self.state.read();
        let record = state.get(&id).ok_or(ServiceError::ScenarioNotFound(id))?;
        Ok(paginate(record.enrichment.values(), page.skip, limit))
    }

    pub async fn scan_status(
        &self,
        id: Uuid,
        page: PageRequest,
    ) -> ServiceResult<Page<ScanStatusEntry>> {
        let limit = self.effective_limit(Some(page.limit))?;
        let state = self.state.read();
        let record = state.get(&id).ok_or(ServiceError::ScenarioNotFound(id))?;
        let entries: Vec<ScanStatusEntry> = record
            .enrichment
            .values()
            .map(|b| ScanStatusEntry {
                build_number: b.build_number,
                commit_sha: b.commit_sha.clone(),
                scan: b.scan,
                error: b.error.clone(),
            })
            .collect();
        Ok(paginate(entries.iter(), page.skip, limit))
    }

    pub async fn splits(&self, id: Uuid, page: PageRequest) -> ServiceResult<Page<SplitAssignment>> {
        let limit = self.effective_limit(Some(page.limit))?;
        let state = self.state.read();
        let record = state.get(&id).ok_or(ServiceError::ScenarioNotFound(id))?;
        Ok(paginate(record.splits.iter(), page.skip, limit))
    }

    /// Read a repo's checkpoint (default/empty if ingestion never ran there)
    pub async fn checkpoint(&self, id: Uuid, repo: &str) -> ServiceResult<Checkpoint> {
        let state = self.state.read();
        let record = state.get(&id).ok_or(ServiceError::ScenarioNotFound(id))?;
        Ok(record.checkpoints.get(repo).cloned().unwrap_or_default())
    }

    /// Builds a forward resume of one repo's ingestion would process, in
    /// order: not-yet-terminal and strictly after the checkpoint cursor
    pub async fn ingestion_resume_plan(&self, id: Uuid, repo: &str) -> ServiceResult<Vec<u64>> {
        let state = self.state.read();
        let record = state.get(&id).ok_or(ServiceError::ScenarioNotFound(id))?;
        let checkpoint = record.checkpoints.get(repo).cloned().unwrap_or_default();
        let builds: Vec<IngestionBuild> = record
            .ingestion
            .values()
            .filter(|b| b.repo_full_name == repo)
            .cloned()
            .collect();
        Ok(plan_resume(&checkpoint, &builds))
    }

    /// Authoritative snapshot of every scenario, newest first
    pub fn snapshot(&self) -> Vec<Scenario> {
        let state = self.state.read();
        let mut scenarios: Vec<Scenario> = state.values().map(|r| r.scenario.clone()).collect();
        scenarios.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        scenarios
    }

    // ---- internals -----------------------------------------------------

    async fn apply_event(&self, id: Uuid, event: ScenarioEvent) -> ServiceResult<ScenarioStatus> {
        let mut state = self.state.write();
        let record = state.get_mut(&id).ok_or(ServiceError::ScenarioNotFound(id))?;
        Ok(Self::transition(record, &self.publisher, event)?)
    }

    fn transition(
        record: &mut ScenarioRecord,
        publisher: &DeltaPublisher,
        event: ScenarioEvent,
    ) -> ServiceResult<ScenarioStatus> {
        Ok(ScenarioStateMachine::new(&mut record.scenario, publisher).transition(event)?)
    }

    fn require_status(
        record: &ScenarioRecord,
        wanted: ScenarioStatus,
        operation: &'static str,
    ) -> ServiceResult<()> {
        if record.scenario.status != wanted {
            return Err(ServiceError::InvalidPhase {
                operation,
                status: record.scenario.status,
            });
        }
        Ok(())
    }

    /// Advance the owning repo's checkpoint when a build reaches a terminal
    /// ingestion state, and refresh its pending count
    fn checkpoint_if_terminal(
        record: &mut ScenarioRecord,
        build_number: u64,
        aggregate: IngestionStatus,
    ) {
        if !aggregate.is_terminal() {
            return;
        }
        let Some(build) = record.ingestion.get(&build_number) else {
            return;
        };
        let repo = build.repo_full_name.clone();
        let ci_run_id = build.ci_run_id;
        let pending = record
            .ingestion
            .values()
            .filter(|b| b.repo_full_name == repo && !b.status().is_terminal())
            .count() as u64;

        let checkpoint = record.checkpoints.entry(repo).or_default();
        checkpoint.advance(build_number, ci_run_id);
        checkpoint.record_stat(&aggregate.to_string());
        checkpoint.pending_processing_count = pending;
    }

    /// Recompute counters from the build sets and publish the absolute
    /// snapshot as a counters delta
    fn recompute_and_publish(&self, record: &mut ScenarioRecord) {
        let counters = &mut record.scenario.counters;
        counters.builds_total = record.ingestion.len() as u64;
        counters.builds_ingested = count_ingestion(&record.ingestion, IngestionStatus::Ingested);
        counters.builds_missing_resource =
            count_ingestion(&record.ingestion, IngestionStatus::MissingResource);
        counters.builds_failed = count_ingestion(&record.ingestion, IngestionStatus::Failed);
        counters.builds_features_extracted = record
            .enrichment
            .values()
            .filter(|b| b.extraction.produced_features())
            .count() as u64;
        counters.scans_total = record.enrichment.len() as u64;
        counters.scans_completed = record
            .enrichment
            .values()
            .filter(|b| b.scan == ScanStatus::Completed)
            .count() as u64;
        counters.scans_failed = record
            .enrichment
            .values()
            .filter(|b| b.scan == ScanStatus::Failed)
            .count() as u64;

        self.publisher.publish(ScenarioDelta::counters(
            record.scenario.id,
            counters.builds_total,
            counters.builds_ingested,
            counters.builds_features_extracted,
        ));
    }

    /// Once every build is terminal, complete the phase — or fail the
    /// scenario in place when nothing ingested, so `failed_in` points at
    /// ingestion and a retry can target it
    fn complete_ingestion_if_done(&self, record: &mut ScenarioRecord) -> ServiceResult<()> {
        if record.ingestion.is_empty()
            || !record.ingestion.values().all(|b| b.status().is_terminal())
        {
            return Ok(());
        }
        let any_ingested = record
            .ingestion
            .values()
            .any(|b| b.status() == IngestionStatus::Ingested);
        let event = if any_ingested {
            ScenarioEvent::CompleteIngestion
        } else {
            ScenarioEvent::fail_with_error("every build failed ingestion")
        };
        Self::transition(record, &self.publisher, event)?;
        Ok(())
    }

    fn effective_limit(&self, limit: Option<usize>) -> ServiceResult<usize> {
        let limit = limit.unwrap_or(self.pagination.default_limit);
        if limit == 0 {
            return Err(ServiceError::InvalidQuery("limit must be at least 1".into()));
        }
        if limit > self.pagination.max_limit {
            return Err(ServiceError::InvalidQuery(format!(
                "limit {limit} exceeds maximum {}",
                self.pagination.max_limit
            )));
        }
        Ok(limit)
    }
}

#[async_trait]
impl ScenarioDirectory for ScenarioPipelineService {
    async fn fetch_all(&self) -> Result<Vec<Scenario>, DirectoryError> {
        Ok(self.snapshot())
    }
}

fn paginate<'a, T: Clone + 'a>(
    items: impl Iterator<Item = &'a T>,
    skip: usize,
    limit: usize,
) -> Page<T> {
    let all: Vec<&T> = items.collect();
    let total = all.len();
    let items = all.into_iter().skip(skip).take(limit).cloned().collect();
    Page {
        items,
        total,
        skip,
        limit,
    }
}

fn count_ingestion(builds: &BTreeMap<u64, IngestionBuild>, wanted: IngestionStatus) -> u64 {
    builds.values().filter(|b| b.status() == wanted).count() as u64
}

fn count_subset(assignments: &[SplitAssignment], subset: SplitSubset) -> u64 {
    assignments.iter().filter(|a| a.subset == subset).count() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> ScenarioPipelineService {
        ScenarioPipelineService::new(&BuildriskConfig::default())
    }

    fn request(name: &str) -> CreateScenarioRequest {
        CreateScenarioRequest {
            name: name.into(),
            description: String::new(),
            splitting_strategy: "temporal".into(),
            group_by: None,
        }
    }

    #[tokio::test]
    async fn test_list_supports_search_and_status_filter() {
        let service = service();
        service.create_scenario(request("risk-nightly")).await.unwrap();
        service.create_scenario(request("risk-weekly")).await.unwrap();

        let page = service
            .list_scenarios(ListQuery {
                q: Some("nightly".into()),
                ..ListQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].name, "risk-nightly");

        let none = service
            .list_scenarios(ListQuery {
                status: Some(ScenarioStatus::Completed),
                ..ListQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(none.total, 0);
    }

    #[tokio::test]
    async fn test_list_rejects_out_of_range_limit() {
        let service = service();
        let over = ListQuery {
            limit: Some(crate::constants::MAX_PAGE_LIMIT + 1),
            ..ListQuery::default()
        };
        assert!(matches!(
            service.list_scenarios(over).await,
            Err(ServiceError::InvalidQuery(_))
        ));
    }

    #[tokio::test]
    async fn test_preview_filters_and_counts() {
        let service = service();
        let now = Utc::now();
        service.register_candidates(vec![
            CandidateBuild {
                ci_run_id: 1,
                build_number: 1,
                repo_full_name: "acme/widgets".into(),
                commit_sha: "a".into(),
                language: "rust".into(),
                conclusion: "failure".into(),
                ci_provider: "github".into(),
                is_bot: false,
                created_at: now,
            },
            CandidateBuild {
                ci_run_id: 2,
                build_number: 2,
                repo_full_name: "acme/widgets".into(),
                commit_sha: "b".into(),
                language: "go".into(),
                conclusion: "success".into(),
                ci_provider: "github".into(),
                is_bot: true,
                created_at: now,
            },
        ]);

        let filter = BuildFilter {
            exclude_bots: true,
            ..BuildFilter::default()
        };
        let preview = service
            .preview_builds(&filter, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(preview.stats.total, 1);
        assert_eq!(preview.stats.by_conclusion.get("failure"), Some(&1));
        assert_eq!(preview.builds.len(), 1);
    }
}
