//! Batched progressive import controller.
//!
//! One [`ImportController`] drives one migration unit through its phases,
//! processing a bounded slice of records per `process_next_slice` call so
//! the caller (a worker loop, a request handler with a time budget) stays
//! responsive. All progress that matters across process restarts lives in
//! the mapping store; the controller's own state is rebuilt from the
//! source feed on the first call of a run, and re-running a finished unit
//! converges to skips.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crosswalk_core::attributes::AttributeConfig;
use crosswalk_core::audit::{operation_types, SkipReason};
use crosswalk_core::progress::{BatchProgress, Counters, Phase};
use crosswalk_core::record::SourceRecord;
use crosswalk_core::translation::{group_by_translation_set, GroupingAnomaly};
use crosswalk_core::types::TargetId;

use crate::audit::Auditor;
use crate::error::EngineError;
use crate::hierarchy::{attach_embedded_translations, link_parent, LinkOutcome};
use crate::reconcile::{attach_translation_record, reconcile_record, Outcome};
use crate::traits::{AuditSink, MappingStore, SourceClient, TargetStore};

pub const DEFAULT_SLICE_SIZE: usize = 10;
pub const DEFAULT_FETCH_PAGE_SIZE: usize = 200;

/// Static configuration for one migration unit.
#[derive(Debug, Clone)]
pub struct UnitConfig {
    /// Source-side collection key (content type, vocabulary machine name).
    pub unit_key: String,
    /// Entity kind the unit's mappings are recorded under.
    pub entity_kind: String,
    /// Optional mapping scope; `None` for unscoped units.
    pub scope: Option<String>,
    /// Records processed per `process_next_slice` call.
    pub slice_size: usize,
    /// Page size for the initial source fetch.
    pub fetch_page_size: usize,
    /// Hierarchical units run create/link/translate passes; flat units a
    /// single rewriting pass.
    pub hierarchical: bool,
    pub attributes: AttributeConfig,
}

impl UnitConfig {
    pub fn new(unit_key: &str, entity_kind: &str) -> Self {
        Self {
            unit_key: unit_key.to_string(),
            entity_kind: entity_kind.to_string(),
            scope: None,
            slice_size: DEFAULT_SLICE_SIZE,
            fetch_page_size: DEFAULT_FETCH_PAGE_SIZE,
            hierarchical: false,
            attributes: AttributeConfig::default(),
        }
    }

    pub fn hierarchical(mut self, scope: Option<&str>) -> Self {
        self.hierarchical = true;
        self.scope = scope.map(str::to_string);
        self
    }
}

/// What one `process_next_slice` call accomplished.
#[derive(Debug, Clone)]
pub struct SliceReport {
    pub phase: Phase,
    /// Unit completion in `[0, 1]`; `1.0` means the unit is done.
    pub finished_fraction: f64,
    pub message: String,
    /// Cumulative counters for the whole run so far.
    pub counters: Counters,
}

impl SliceReport {
    pub fn is_finished(&self) -> bool {
        self.finished_fraction >= 1.0
    }
}

/// Per-run working state, built during the `Init` phase.
struct RunState {
    /// The unit's full record list in processing order. Flat units order
    /// all originals before all translations; hierarchical units keep the
    /// feed order (the link pass makes ordering irrelevant).
    records: Vec<SourceRecord>,
    /// For flat units, indices below this are originals; at or above,
    /// stand-alone translation records.
    original_count: usize,
    /// `source_id → target_id` snapshot, taken when the link pass starts.
    link_map: Option<HashMap<String, TargetId>>,
}

pub struct ImportController {
    cfg: UnitConfig,
    source: Arc<dyn SourceClient>,
    mappings: Arc<dyn MappingStore>,
    target: Arc<dyn TargetStore>,
    auditor: Auditor,
    progress: BatchProgress,
    state: Option<RunState>,
}

impl ImportController {
    pub fn new(
        cfg: UnitConfig,
        source: Arc<dyn SourceClient>,
        mappings: Arc<dyn MappingStore>,
        target: Arc<dyn TargetStore>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        let auditor = Auditor::new(audit, &cfg.entity_kind);
        Self {
            cfg,
            source,
            mappings,
            target,
            auditor,
            progress: BatchProgress::new(),
            state: None,
        }
    }

    pub fn progress(&self) -> &BatchProgress {
        &self.progress
    }

    /// Process the next bounded slice of work. Call repeatedly until the
    /// returned report's `finished_fraction` reaches `1.0`.
    ///
    /// Source-fetch and storage failures return `Err` and mark the unit
    /// done; per-record failures are absorbed into the error counter.
    pub async fn process_next_slice(&mut self) -> Result<SliceReport, EngineError> {
        if self.progress.phase == Phase::Done {
            return Ok(self.report("Nothing left to do"));
        }

        if self.state.is_none() {
            if let Err(err) = self.initialize().await {
                self.auditor
                    .error(
                        operation_types::CREATE,
                        &format!("Import aborted for unit '{}': {err}", self.cfg.unit_key),
                        None,
                        None,
                    )
                    .await;
                self.progress.enter_phase(Phase::Done, 0);
                return Err(err);
            }
            if self.progress.phase == Phase::Done {
                return Ok(self.report("Source returned no records"));
            }
        }

        let range = self.progress.next_slice(self.cfg.slice_size);
        let processed = range.len();
        for index in range {
            self.process_record(index).await?;
        }
        self.progress.advance(processed);

        let message = format!(
            "Processed {} of {} ({:?} phase)",
            self.progress.cursor, self.progress.total, self.progress.phase
        );

        if self.progress.phase_complete() {
            self.advance_phase().await?;
        }

        Ok(self.report(&message))
    }

    /// Fetch the unit's record list and set up the first phase.
    async fn initialize(&mut self) -> Result<(), EngineError> {
        let fetched = self.fetch_all().await?;

        let mut records = Vec::with_capacity(fetched.len());
        for record in fetched {
            match record.validate() {
                Ok(()) => records.push(record),
                Err(err) => {
                    self.progress.counters.errors += 1;
                    self.auditor
                        .error(
                            operation_types::CREATE,
                            &format!("Dropped record: {err}"),
                            None,
                            None,
                        )
                        .await;
                }
            }
        }

        if records.is_empty() {
            self.auditor
                .error(
                    operation_types::CREATE,
                    &format!("Source returned no records for unit '{}'", self.cfg.unit_key),
                    None,
                    None,
                )
                .await;
            self.progress.enter_phase(Phase::Done, 0);
            return Ok(());
        }

        let state = if self.cfg.hierarchical {
            RunState {
                original_count: records.len(),
                records,
                link_map: None,
            }
        } else {
            self.group_flat(records).await
        };

        let first = Phase::Init.next(self.cfg.hierarchical);
        self.progress.enter_phase(first, state.records.len());
        self.state = Some(state);
        tracing::info!(
            unit = %self.cfg.unit_key,
            records = self.progress.total,
            "import initialized"
        );
        Ok(())
    }

    async fn fetch_all(&self) -> Result<Vec<SourceRecord>, EngineError> {
        let limit = self.cfg.fetch_page_size.max(1);
        let mut records = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        loop {
            let page = self
                .source
                .list_records(&self.cfg.unit_key, limit, records.len())
                .await
                .map_err(|err| EngineError::SourceFetch {
                    unit: self.cfg.unit_key.clone(),
                    reason: err.to_string(),
                })?;
            // A client that ignores pagination re-serves the set from the
            // top on every call; a page opening with a record we already
            // hold means the feed is exhausted, whatever its length.
            if page.first().is_some_and(|r| seen.contains(&r.source_id)) {
                break;
            }
            // A page longer than requested also means the client ignored
            // pagination and sent the whole set.
            let last = page.len() != limit;
            for record in page {
                seen.insert(record.source_id.clone());
                records.push(record);
            }
            if last {
                break;
            }
        }
        Ok(records)
    }

    /// Group a flat feed into translation sets, audit the anomalies, and
    /// lay the records out originals-first.
    async fn group_flat(&mut self, records: Vec<SourceRecord>) -> RunState {
        let grouping = group_by_translation_set(records);

        for anomaly in &grouping.anomalies {
            match anomaly {
                GroupingAnomaly::OrphanedSet { set_key, member_ids } => {
                    for member in member_ids {
                        self.auditor
                            .skip(
                                SkipReason::OrphanedTranslation,
                                &format!("Translation set '{set_key}' has no original in the feed"),
                                Some(member),
                            )
                            .await;
                        self.progress.counters.skipped += 1;
                    }
                }
                GroupingAnomaly::DuplicateOriginal { set_key, source_id } => {
                    self.auditor
                        .warning(
                            operation_types::CREATE,
                            &format!("Duplicate original in set '{set_key}'; demoted to translation"),
                            Some(source_id),
                            None,
                        )
                        .await;
                }
            }
        }

        let original_count = grouping.groups.len();
        let mut ordered: Vec<SourceRecord> = Vec::new();
        let mut translations: Vec<SourceRecord> = Vec::new();
        for group in grouping.groups {
            ordered.push(group.original);
            translations.extend(group.translations);
        }
        ordered.extend(translations);

        RunState {
            records: ordered,
            original_count,
            link_map: None,
        }
    }

    /// Run the current phase's action for the record at `index`,
    /// absorbing per-record failures into the error counter.
    async fn process_record(&mut self, index: usize) -> Result<(), EngineError> {
        let state = self.state.as_ref().expect("state initialized before processing");
        let record = state.records[index].clone();

        let result = match self.progress.phase {
            Phase::Rewriting => {
                if index < state.original_count {
                    reconcile_record(
                        &record,
                        &self.cfg,
                        self.mappings.as_ref(),
                        self.target.as_ref(),
                        &self.auditor,
                    )
                    .await
                    .map(StepOutcome::Record)
                } else {
                    attach_translation_record(
                        &record,
                        &self.cfg,
                        self.mappings.as_ref(),
                        self.target.as_ref(),
                        &self.auditor,
                    )
                    .await
                    .map(StepOutcome::Record)
                }
            }
            Phase::Create => reconcile_record(
                &record,
                &self.cfg,
                self.mappings.as_ref(),
                self.target.as_ref(),
                &self.auditor,
            )
            .await
            .map(StepOutcome::Record),
            Phase::LinkHierarchy => {
                let link_map = state.link_map.as_ref().expect("link map built at phase entry");
                link_parent(&record, link_map, self.target.as_ref(), &self.auditor)
                    .await
                    .map(StepOutcome::Link)
            }
            Phase::Translate => {
                let link_map = state.link_map.as_ref().expect("link map built at phase entry");
                attach_embedded_translations(
                    &record,
                    link_map,
                    &self.cfg,
                    self.target.as_ref(),
                    &self.auditor,
                )
                .await
                .map(|t| StepOutcome::Translations {
                    attached: t.attached,
                    skipped: t.skipped,
                })
            }
            Phase::Init | Phase::Done => return Ok(()),
        };

        match result {
            Ok(outcome) => self.count(outcome),
            Err(EngineError::Storage(err)) => return Err(EngineError::Storage(err)),
            Err(err) => {
                self.progress.counters.errors += 1;
                tracing::warn!(
                    unit = %self.cfg.unit_key,
                    source_id = %record.source_id,
                    error = %err,
                    "record failed"
                );
                self.auditor
                    .error(
                        operation_types::CREATE,
                        &format!("Record failed: {err}"),
                        Some(&record.source_id),
                        None,
                    )
                    .await;
            }
        }
        Ok(())
    }

    fn count(&mut self, outcome: StepOutcome) {
        let counters = &mut self.progress.counters;
        match outcome {
            StepOutcome::Record(Outcome::Created(_)) => counters.created += 1,
            StepOutcome::Record(Outcome::Updated(_)) => counters.updated += 1,
            StepOutcome::Record(Outcome::Skipped(_)) => counters.skipped += 1,
            StepOutcome::Link(LinkOutcome::Linked) => counters.updated += 1,
            StepOutcome::Link(LinkOutcome::Root) => {}
            StepOutcome::Link(_) => counters.skipped += 1,
            StepOutcome::Translations { attached, skipped } => {
                counters.created += attached;
                counters.skipped += skipped;
            }
        }
    }

    /// Move to the next phase, preparing whatever it needs up front.
    async fn advance_phase(&mut self) -> Result<(), EngineError> {
        let next = self.progress.phase.next(self.cfg.hierarchical);

        if next == Phase::LinkHierarchy {
            // One bulk read instead of a lookup per record; the snapshot
            // is complete because the create sweep has finished.
            let map = self
                .mappings
                .get_all(&self.cfg.entity_kind, self.cfg.scope.as_deref())
                .await?;
            if let Some(state) = self.state.as_mut() {
                state.link_map = Some(map);
            }
        }

        let total = if next == Phase::Done {
            0
        } else {
            self.state.as_ref().map_or(0, |s| s.records.len())
        };
        self.progress.enter_phase(next, total);

        if next == Phase::Done {
            let counters = self.progress.counters;
            tracing::info!(
                unit = %self.cfg.unit_key,
                created = counters.created,
                updated = counters.updated,
                skipped = counters.skipped,
                errors = counters.errors,
                "import finished"
            );
        }
        Ok(())
    }

    fn report(&self, message: &str) -> SliceReport {
        SliceReport {
            phase: self.progress.phase,
            finished_fraction: self.progress.finished_fraction(),
            message: message.to_string(),
            counters: self.progress.counters,
        }
    }
}

enum StepOutcome {
    Record(Outcome),
    Link(LinkOutcome),
    Translations { attached: u64, skipped: u64 },
}
