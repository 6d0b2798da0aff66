//! End-to-end engine behavior over the in-memory collaborators.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

use crosswalk_core::attributes::AttributeConfig;
use crosswalk_core::audit::statuses;
use crosswalk_core::record::{Payload, SourceRecord};
use crosswalk_core::types::{ChangedAt, TargetId};
use crosswalk_engine::memory::{
    MemoryAuditSink, MemoryMappingStore, MemorySourceClient, MemoryTargetStore,
};
use crosswalk_engine::traits::{
    MappingStore, NewTargetRecord, SourceClient, TargetRecord, TargetStore,
};
use crosswalk_engine::{EngineError, ImportController, SliceReport, UnitConfig};

const UNIT: &str = "articles";
const KIND: &str = "article";

fn payload(title: &str) -> Payload {
    let mut map = Payload::new();
    map.insert("title".to_string(), serde_json::json!(title));
    map
}

fn record(source_id: &str, set_key: &str, changed_at: ChangedAt) -> SourceRecord {
    SourceRecord {
        source_id: source_id.to_string(),
        parent_source_ids: Vec::new(),
        translation_set_key: set_key.to_string(),
        language: Some("en".to_string()),
        changed_at,
        payload: payload(&format!("Record {source_id}")),
        translations: BTreeMap::new(),
    }
}

fn term(source_id: &str, parents: &[&str]) -> SourceRecord {
    let mut r = record(source_id, source_id, 100);
    r.parent_source_ids = parents.iter().map(|p| p.to_string()).collect();
    r
}

struct Harness {
    source: Arc<MemorySourceClient>,
    mappings: Arc<MemoryMappingStore>,
    target: Arc<MemoryTargetStore>,
    audit: Arc<MemoryAuditSink>,
}

impl Harness {
    fn new(records: Vec<SourceRecord>) -> Self {
        Self {
            source: Arc::new(MemorySourceClient::new().with_unit(UNIT, records)),
            mappings: Arc::new(MemoryMappingStore::new()),
            target: Arc::new(MemoryTargetStore::new()),
            audit: Arc::new(MemoryAuditSink::new()),
        }
    }

    fn controller(&self, cfg: UnitConfig) -> ImportController {
        ImportController::new(
            cfg,
            self.source.clone(),
            self.mappings.clone(),
            self.target.clone(),
            self.audit.clone(),
        )
    }

    /// Swap in a new source feed, keeping mappings/target/audit state.
    fn refeed(&mut self, records: Vec<SourceRecord>) {
        self.source = Arc::new(MemorySourceClient::new().with_unit(UNIT, records));
    }
}

fn flat_cfg() -> UnitConfig {
    UnitConfig::new(UNIT, KIND)
}

fn tree_cfg() -> UnitConfig {
    UnitConfig::new(UNIT, KIND).hierarchical(Some("topics"))
}

async fn drive(controller: &mut ImportController) -> SliceReport {
    for _ in 0..1000 {
        let report = controller.process_next_slice().await.expect("slice failed");
        if report.is_finished() {
            return report;
        }
    }
    panic!("run did not converge");
}

#[tokio::test]
async fn flat_import_creates_records_and_mappings() {
    let harness = Harness::new(vec![record("1", "1", 100), record("2", "2", 100)]);
    let mut controller = harness.controller(flat_cfg());

    let report = drive(&mut controller).await;

    assert_eq!(report.counters.created, 2);
    assert_eq!(report.counters.errors, 0);
    assert_eq!(harness.target.records().len(), 2);
    assert_eq!(harness.mappings.len(), 2);
}

#[tokio::test]
async fn rerun_is_idempotent() {
    let harness = Harness::new(vec![record("1", "1", 100), record("2", "2", 100)]);

    drive(&mut harness.controller(flat_cfg())).await;
    let report = drive(&mut harness.controller(flat_cfg())).await;

    assert_eq!(report.counters.created, 0);
    assert_eq!(report.counters.updated, 0);
    assert_eq!(report.counters.skipped, 2);
    assert_eq!(harness.target.records().len(), 2);
    assert_eq!(harness.mappings.len(), 2);
}

#[tokio::test]
async fn update_requires_strictly_newer_change_time() {
    let mut harness = Harness::new(vec![record("1", "1", 100)]);
    drive(&mut harness.controller(flat_cfg())).await;

    // Equal change time: no write.
    harness.refeed(vec![record("1", "1", 100)]);
    let report = drive(&mut harness.controller(flat_cfg())).await;
    assert_eq!(report.counters.skipped, 1);
    assert_eq!(report.counters.updated, 0);

    // Older change time: no write either.
    harness.refeed(vec![record("1", "1", 99)]);
    let report = drive(&mut harness.controller(flat_cfg())).await;
    assert_eq!(report.counters.skipped, 1);

    // Strictly newer: updated in place, change time advances.
    harness.refeed(vec![record("1", "1", 101)]);
    let report = drive(&mut harness.controller(flat_cfg())).await;
    assert_eq!(report.counters.updated, 1);
    let stored = harness.target.records();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].changed_at, 101);
}

#[tokio::test]
async fn stale_mapping_is_healed_by_recreating() {
    let harness = Harness::new(vec![record("1", "1", 100)]);
    drive(&mut harness.controller(flat_cfg())).await;

    let old_id = harness
        .mappings
        .get_target_id(KIND, "1", None)
        .await
        .unwrap()
        .unwrap();
    harness.target.delete_record(old_id);

    let report = drive(&mut harness.controller(flat_cfg())).await;

    assert_eq!(report.counters.created, 1);
    let new_id = harness
        .mappings
        .get_target_id(KIND, "1", None)
        .await
        .unwrap()
        .unwrap();
    assert_ne!(new_id, old_id);
    assert!(harness.target.record(new_id).is_some());
    assert_eq!(harness.target.records().len(), 1);
}

#[tokio::test]
async fn hierarchy_links_children_fed_before_parents() {
    // Child arrives first; the split create/link passes make order moot.
    let harness = Harness::new(vec![
        term("30", &["20"]),
        term("20", &["10"]),
        term("10", &["0"]),
    ]);
    let mut controller = harness.controller(tree_cfg());

    drive(&mut controller).await;

    let scope = Some("topics");
    let id_10 = harness.mappings.get_target_id(KIND, "10", scope).await.unwrap().unwrap();
    let id_20 = harness.mappings.get_target_id(KIND, "20", scope).await.unwrap().unwrap();
    let id_30 = harness.mappings.get_target_id(KIND, "30", scope).await.unwrap().unwrap();

    assert_eq!(harness.target.record(id_10).unwrap().parent_id, None);
    assert_eq!(harness.target.record(id_20).unwrap().parent_id, Some(id_10));
    assert_eq!(harness.target.record(id_30).unwrap().parent_id, Some(id_20));
}

#[tokio::test]
async fn hierarchical_rerun_performs_no_writes() {
    let feed = || vec![term("1", &[]), term("2", &["1"])];
    let mut harness = Harness::new(feed());
    drive(&mut harness.controller(tree_cfg())).await;

    harness.refeed(feed());
    let report = drive(&mut harness.controller(tree_cfg())).await;

    assert_eq!(report.counters.created, 0);
    assert_eq!(report.counters.updated, 0);
    assert_eq!(report.counters.errors, 0);
    // Two unchanged records plus the settled parent link.
    assert_eq!(report.counters.skipped, 3);

    let scope = Some("topics");
    let id_1 = harness.mappings.get_target_id(KIND, "1", scope).await.unwrap().unwrap();
    let id_2 = harness.mappings.get_target_id(KIND, "2", scope).await.unwrap().unwrap();
    assert_eq!(harness.target.record(id_2).unwrap().parent_id, Some(id_1));
}

#[tokio::test]
async fn self_referencing_parent_is_flagged_not_linked() {
    let harness = Harness::new(vec![term("4", &["4"])]);
    let report = drive(&mut harness.controller(tree_cfg())).await;

    let id_4 = harness
        .mappings
        .get_target_id(KIND, "4", Some("topics"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(harness.target.record(id_4).unwrap().parent_id, None);
    assert_eq!(report.counters.created, 1);
    assert_eq!(report.counters.updated, 0);
    assert!(harness.audit.count_with_status(statuses::WARNING) >= 1);
}

#[tokio::test]
async fn unresolved_parent_leaves_record_at_root() {
    let harness = Harness::new(vec![term("5", &["99"])]);
    let mut controller = harness.controller(tree_cfg());

    let report = drive(&mut controller).await;

    let id_5 = harness
        .mappings
        .get_target_id(KIND, "5", Some("topics"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(harness.target.record(id_5).unwrap().parent_id, None);
    assert_eq!(report.counters.created, 1);
    // The dangling parent reference shows up as a warning, not an error.
    assert!(harness.audit.count_with_status(statuses::WARNING) >= 1);
    assert_eq!(harness.audit.count_with_status(statuses::ERROR), 0);
}

#[tokio::test]
async fn embedded_translations_attach_once() {
    let mut original = term("7", &[]);
    original.translations.insert("fr".to_string(), payload("Enregistrement 7"));
    original.translations.insert("de".to_string(), payload("Datensatz 7"));

    let harness = Harness::new(vec![original.clone()]);
    drive(&mut harness.controller(tree_cfg())).await;

    let id = harness
        .mappings
        .get_target_id(KIND, "7", Some("topics"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(harness.target.translation_langs(id), vec!["de", "fr"]);

    // Second run leaves the attached translations alone.
    let report = drive(&mut harness.controller(tree_cfg())).await;
    assert_eq!(harness.target.translation_langs(id).len(), 2);
    assert!(report.counters.skipped >= 2);
}

#[tokio::test]
async fn flat_translation_records_attach_to_their_original() {
    let mut translation = record("11", "10", 100);
    translation.language = Some("fr".to_string());

    // Translation listed before its original; grouping reorders.
    let harness = Harness::new(vec![translation, record("10", "10", 100)]);
    let report = drive(&mut harness.controller(flat_cfg())).await;

    assert_eq!(harness.target.records().len(), 1);
    let id = harness
        .mappings
        .get_target_id(KIND, "10", None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(harness.target.translation_langs(id), vec!["fr"]);
    // Original created plus translation attached.
    assert_eq!(report.counters.created, 2);
}

#[tokio::test]
async fn orphaned_translation_set_is_not_promoted() {
    // Both members point at "9", which never appears in the feed.
    let harness = Harness::new(vec![record("2", "9", 100), record("3", "9", 100)]);
    let report = drive(&mut harness.controller(flat_cfg())).await;

    assert!(harness.target.records().is_empty());
    assert!(harness.mappings.is_empty());
    assert_eq!(report.counters.skipped, 2);
    assert!(harness.audit.count_with_status(statuses::WARNING) >= 2);
}

#[tokio::test]
async fn slice_size_does_not_change_the_result() {
    let feed = || {
        vec![
            term("1", &[]),
            term("2", &["1"]),
            term("3", &["1"]),
            term("4", &["2"]),
        ]
    };

    let small = Harness::new(feed());
    let mut cfg = tree_cfg();
    cfg.slice_size = 1;
    drive(&mut small.controller(cfg)).await;

    let big = Harness::new(feed());
    let mut cfg = tree_cfg();
    cfg.slice_size = 100;
    drive(&mut big.controller(cfg)).await;

    assert_eq!(small.target.records().len(), big.target.records().len());
    assert_eq!(small.mappings.len(), big.mappings.len());

    let parents = |h: &Harness| {
        let mut out: Vec<(String, Option<TargetId>)> = Vec::new();
        for r in h.target.records() {
            let title = r.attributes["title"]["value"].as_str().unwrap().to_string();
            out.push((title, r.parent_id.map(|p| p - r.id)));
        }
        out.sort();
        out
    };
    // Relative parent offsets are stable even though absolute ids differ.
    assert_eq!(parents(&small), parents(&big));
}

/// Serves the complete set for any limit/offset, the way a legacy export
/// endpoint without pagination support behaves.
struct UnpaginatedSource {
    records: Vec<SourceRecord>,
}

#[async_trait]
impl SourceClient for UnpaginatedSource {
    async fn list_records(
        &self,
        _unit_key: &str,
        _limit: usize,
        _offset: usize,
    ) -> Result<Vec<SourceRecord>, EngineError> {
        Ok(self.records.clone())
    }

    async fn get_record_by_id(
        &self,
        source_id: &str,
    ) -> Result<Option<SourceRecord>, EngineError> {
        Ok(self.records.iter().find(|r| r.source_id == source_id).cloned())
    }
}

#[tokio::test]
async fn full_set_on_every_page_terminates_without_duplicates() {
    // Set size equals the page size, so the short-page check alone would
    // never fire; the repeat detection has to end the fetch.
    let source = Arc::new(UnpaginatedSource {
        records: vec![record("1", "1", 100), record("2", "2", 100), record("3", "3", 100)],
    });
    let mappings = Arc::new(MemoryMappingStore::new());
    let target = Arc::new(MemoryTargetStore::new());
    let audit = Arc::new(MemoryAuditSink::new());

    let mut cfg = flat_cfg();
    cfg.fetch_page_size = 3;

    let mut controller =
        ImportController::new(cfg, source, mappings.clone(), target.clone(), audit);
    let report = drive(&mut controller).await;

    assert_eq!(report.counters.created, 3);
    assert_eq!(target.records().len(), 3);
    assert_eq!(mappings.len(), 3);
}

/// Source whose listing always fails, for the unit-level abort path.
struct BrokenSource;

#[async_trait]
impl SourceClient for BrokenSource {
    async fn list_records(
        &self,
        _unit_key: &str,
        _limit: usize,
        _offset: usize,
    ) -> Result<Vec<SourceRecord>, EngineError> {
        Err(EngineError::Target("connection refused".to_string()))
    }

    async fn get_record_by_id(
        &self,
        _source_id: &str,
    ) -> Result<Option<SourceRecord>, EngineError> {
        Ok(None)
    }
}

#[tokio::test]
async fn failed_fetch_aborts_the_unit_with_an_audit_entry() {
    let audit = Arc::new(MemoryAuditSink::new());
    let mut controller = ImportController::new(
        flat_cfg(),
        Arc::new(BrokenSource),
        Arc::new(MemoryMappingStore::new()),
        Arc::new(MemoryTargetStore::new()),
        audit.clone(),
    );

    let err = controller.process_next_slice().await;
    assert!(matches!(err, Err(EngineError::SourceFetch { .. })));
    assert_eq!(audit.count_with_status(statuses::ERROR), 1);

    // The unit is marked done; a later call is a no-op.
    let report = controller.process_next_slice().await.expect("slice failed");
    assert!(report.is_finished());
}

#[tokio::test]
async fn fetch_paginates_until_short_page() {
    let feed: Vec<SourceRecord> = (1..=5).map(|i| record(&i.to_string(), &i.to_string(), 100)).collect();
    let harness = Harness::new(feed);
    let mut cfg = flat_cfg();
    cfg.fetch_page_size = 2;

    let report = drive(&mut harness.controller(cfg)).await;

    assert_eq!(report.counters.created, 5);
    assert_eq!(harness.target.records().len(), 5);
}

#[tokio::test]
async fn record_without_source_id_is_dropped() {
    let harness = Harness::new(vec![record("", "", 100), record("1", "1", 100)]);
    let report = drive(&mut harness.controller(flat_cfg())).await;

    assert_eq!(report.counters.created, 1);
    assert_eq!(report.counters.errors, 1);
    assert_eq!(harness.target.records().len(), 1);
}

#[tokio::test]
async fn empty_feed_finishes_and_logs_an_error() {
    let harness = Harness::new(Vec::new());
    let mut controller = harness.controller(flat_cfg());

    let report = controller.process_next_slice().await.expect("slice failed");

    assert!(report.is_finished());
    assert_eq!(harness.audit.count_with_status(statuses::ERROR), 1);
}

#[tokio::test]
async fn progress_fraction_never_decreases() {
    let feed: Vec<SourceRecord> = (1..=25).map(|i| term(&i.to_string(), &[])).collect();
    let harness = Harness::new(feed);
    let mut controller = harness.controller(tree_cfg());

    let mut last = 0.0f64;
    for _ in 0..1000 {
        let report = controller.process_next_slice().await.expect("slice failed");
        assert!(
            report.finished_fraction >= last,
            "fraction went backwards: {last} -> {}",
            report.finished_fraction
        );
        last = report.finished_fraction;
        if report.is_finished() {
            break;
        }
    }
    assert_eq!(last, 1.0);
}

/// Target store that rejects creates whose title matches a marker, for
/// exercising per-record failure tolerance.
struct FailingTarget {
    inner: MemoryTargetStore,
    poison_title: String,
}

#[async_trait]
impl TargetStore for FailingTarget {
    async fn load_by_target_id(
        &self,
        target_id: TargetId,
    ) -> Result<Option<TargetRecord>, EngineError> {
        self.inner.load_by_target_id(target_id).await
    }

    async fn create(&self, record: NewTargetRecord) -> Result<TargetId, EngineError> {
        let title = record.attributes["title"]["value"].as_str().unwrap_or("");
        if title == self.poison_title {
            return Err(EngineError::Target("simulated write failure".to_string()));
        }
        self.inner.create(record).await
    }

    async fn update(
        &self,
        target_id: TargetId,
        attributes: serde_json::Value,
        changed_at: ChangedAt,
    ) -> Result<(), EngineError> {
        self.inner.update(target_id, attributes, changed_at).await
    }

    async fn set_parent(
        &self,
        target_id: TargetId,
        parent_id: Option<TargetId>,
    ) -> Result<(), EngineError> {
        self.inner.set_parent(target_id, parent_id).await
    }

    async fn attach_translation(
        &self,
        target_id: TargetId,
        langcode: &str,
        attributes: serde_json::Value,
    ) -> Result<(), EngineError> {
        self.inner.attach_translation(target_id, langcode, attributes).await
    }

    async fn has_translation(
        &self,
        target_id: TargetId,
        langcode: &str,
    ) -> Result<bool, EngineError> {
        self.inner.has_translation(target_id, langcode).await
    }
}

#[tokio::test]
async fn one_failing_record_does_not_abort_the_run() {
    let source = Arc::new(MemorySourceClient::new().with_unit(
        UNIT,
        vec![record("1", "1", 100), record("2", "2", 100), record("3", "3", 100)],
    ));
    let mappings = Arc::new(MemoryMappingStore::new());
    let target = Arc::new(FailingTarget {
        inner: MemoryTargetStore::new(),
        poison_title: "Record 2".to_string(),
    });
    let audit = Arc::new(MemoryAuditSink::new());

    let mut controller = ImportController::new(
        flat_cfg(),
        source,
        mappings.clone(),
        target.clone(),
        audit.clone(),
    );
    let report = drive(&mut controller).await;

    assert_eq!(report.counters.created, 2);
    assert_eq!(report.counters.errors, 1);
    assert!(report.is_finished());
    assert_eq!(target.inner.records().len(), 2);
    // The failed record never obtained a mapping.
    assert!(mappings.get_target_id(KIND, "2", None).await.unwrap().is_none());
    assert_eq!(audit.count_with_status(statuses::ERROR), 1);
}

#[tokio::test]
async fn attribute_config_shapes_the_written_bag() {
    use crosswalk_core::attributes::AttributeKind;

    let mut r = record("1", "1", 100);
    r.payload.insert("body".to_string(), serde_json::json!("plain text"));

    let harness = Harness::new(vec![r]);
    let mut cfg = flat_cfg();
    cfg.attributes = AttributeConfig::new().with("body", AttributeKind::TextWithFormat);

    drive(&mut harness.controller(cfg)).await;

    let stored = harness.target.records();
    assert_eq!(stored[0].attributes["body"]["kind"], "text");
    assert_eq!(stored[0].attributes["body"]["format"], "basic_html");
}
