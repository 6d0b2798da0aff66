//! Translation-set grouping.
//!
//! Partitions a flat record list into groups sharing a translation-set
//! key, identifies exactly one canonical original per group, and produces
//! the processing order the engine relies on: every original across all
//! groups before any translation, because attaching a translation needs
//! the original's mapping to already exist.

use std::collections::HashMap;

use crate::record::SourceRecord;

/// One translation set: a canonical original plus its translations.
#[derive(Debug, Clone)]
pub struct TranslationGroup {
    pub set_key: String,
    pub original: SourceRecord,
    pub translations: Vec<SourceRecord>,
}

/// Data-quality findings produced while grouping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupingAnomaly {
    /// Every member of the set carries a translation marker pointing at an
    /// ID absent from the feed. The whole set is skipped: promoting a
    /// translation to a stand-alone record would duplicate content under
    /// a fresh identity.
    OrphanedSet {
        set_key: String,
        member_ids: Vec<String>,
    },
    /// More than one member claimed to be the original; the first
    /// encountered won and this one was demoted to a translation.
    DuplicateOriginal { set_key: String, source_id: String },
}

/// The grouping result: well-formed groups plus anomalies for the audit log.
#[derive(Debug, Clone, Default)]
pub struct Grouping {
    pub groups: Vec<TranslationGroup>,
    pub anomalies: Vec<GroupingAnomaly>,
}

impl Grouping {
    /// The processing order for a flat import: all originals first (in
    /// group order), then all translations (in group order).
    pub fn ordered_records(&self) -> Vec<&SourceRecord> {
        let originals = self.groups.iter().map(|g| &g.original);
        let translations = self.groups.iter().flat_map(|g| g.translations.iter());
        originals.chain(translations).collect()
    }
}

/// Group a flat record list by effective translation-set key.
///
/// Group order follows first encounter of each key; order within a group
/// is preserved as encountered, so the result is deterministic for any
/// input permutation up to which member is classified original (which is
/// itself deterministic: a record is original iff its set key equals its
/// own source ID).
pub fn group_by_translation_set(records: Vec<SourceRecord>) -> Grouping {
    let mut key_order: Vec<String> = Vec::new();
    let mut members: HashMap<String, Vec<SourceRecord>> = HashMap::new();

    for record in records {
        let key = record.effective_set_key().to_string();
        if !members.contains_key(&key) {
            key_order.push(key.clone());
        }
        members.entry(key).or_default().push(record);
    }

    let mut grouping = Grouping::default();

    for key in key_order {
        let set = members.remove(&key).unwrap_or_default();

        let mut original: Option<SourceRecord> = None;
        let mut translations: Vec<SourceRecord> = Vec::new();

        for record in set {
            if record.is_original() {
                if original.is_none() {
                    original = Some(record);
                } else {
                    grouping.anomalies.push(GroupingAnomaly::DuplicateOriginal {
                        set_key: key.clone(),
                        source_id: record.source_id.clone(),
                    });
                    translations.push(record);
                }
            } else {
                translations.push(record);
            }
        }

        match original {
            Some(original) => grouping.groups.push(TranslationGroup {
                set_key: key,
                original,
                translations,
            }),
            None => grouping.anomalies.push(GroupingAnomaly::OrphanedSet {
                set_key: key,
                member_ids: translations.iter().map(|r| r.source_id.clone()).collect(),
            }),
        }
    }

    grouping
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Payload;
    use assert_matches::assert_matches;
    use std::collections::BTreeMap;

    fn record(source_id: &str, set_key: &str) -> SourceRecord {
        SourceRecord {
            source_id: source_id.to_string(),
            parent_source_ids: Vec::new(),
            translation_set_key: set_key.to_string(),
            language: None,
            changed_at: 0,
            payload: Payload::new(),
            translations: BTreeMap::new(),
        }
    }

    #[test]
    fn classifies_original_and_translations() {
        let grouping = group_by_translation_set(vec![
            record("1", "1"),
            record("2", "1"),
            record("3", "1"),
        ]);
        assert_eq!(grouping.groups.len(), 1);
        assert!(grouping.anomalies.is_empty());
        let group = &grouping.groups[0];
        assert_eq!(group.original.source_id, "1");
        let ids: Vec<_> = group.translations.iter().map(|r| r.source_id.as_str()).collect();
        assert_eq!(ids, vec!["2", "3"]);
    }

    #[test]
    fn classification_holds_for_any_permutation() {
        let permutations: [[&str; 3]; 6] = [
            ["1", "2", "3"],
            ["1", "3", "2"],
            ["2", "1", "3"],
            ["2", "3", "1"],
            ["3", "1", "2"],
            ["3", "2", "1"],
        ];
        for perm in permutations {
            let grouping =
                group_by_translation_set(perm.iter().map(|id| record(id, "1")).collect());
            assert_eq!(grouping.groups.len(), 1, "perm {perm:?}");
            assert_eq!(grouping.groups[0].original.source_id, "1", "perm {perm:?}");
            assert_eq!(grouping.groups[0].translations.len(), 2, "perm {perm:?}");
        }
    }

    #[test]
    fn standalone_records_each_form_their_own_group() {
        let grouping = group_by_translation_set(vec![record("1", ""), record("2", "0")]);
        assert_eq!(grouping.groups.len(), 2);
        assert!(grouping.groups.iter().all(|g| g.translations.is_empty()));
    }

    #[test]
    fn orphaned_set_is_not_promoted() {
        // Both members point at "9", which is not in the feed.
        let grouping = group_by_translation_set(vec![record("2", "9"), record("3", "9")]);
        assert!(grouping.groups.is_empty());
        assert_eq!(grouping.anomalies.len(), 1);
        assert_matches!(
            &grouping.anomalies[0],
            GroupingAnomaly::OrphanedSet { set_key, member_ids }
                if set_key == "9" && member_ids == &["2".to_string(), "3".to_string()]
        );
    }

    #[test]
    fn duplicate_original_first_wins() {
        // Malformed feed: two records claim source_id == set key "1".
        let mut dup = record("1", "1");
        dup.language = Some("en".to_string());
        let grouping = group_by_translation_set(vec![record("1", "1"), dup]);
        assert_eq!(grouping.groups.len(), 1);
        assert_eq!(grouping.groups[0].translations.len(), 1);
        assert_eq!(
            grouping.anomalies,
            vec![GroupingAnomaly::DuplicateOriginal {
                set_key: "1".to_string(),
                source_id: "1".to_string(),
            }]
        );
    }

    #[test]
    fn ordered_records_puts_all_originals_first() {
        let grouping = group_by_translation_set(vec![
            record("2", "1"),
            record("1", "1"),
            record("5", "5"),
            record("6", "5"),
        ]);
        let order: Vec<_> = grouping
            .ordered_records()
            .iter()
            .map(|r| r.source_id.as_str())
            .collect();
        assert_eq!(order, vec!["1", "5", "2", "6"]);
    }

    #[test]
    fn group_order_follows_first_encounter() {
        let grouping = group_by_translation_set(vec![
            record("9", "9"),
            record("4", "4"),
            record("10", "9"),
        ]);
        let keys: Vec<_> = grouping.groups.iter().map(|g| g.set_key.as_str()).collect();
        assert_eq!(keys, vec!["9", "4"]);
    }
}
