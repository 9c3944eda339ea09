use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use indexmap::IndexMap;

use crate::data_types::*;
use crate::store::AnnotationStore;
use crate::types::*;
use crate::utils::eq_ignore_case;
use crate::workers::run_worker_pool;

/// Candidates grouped by semantic key.  Keys are kept in the order they
/// were first added, and candidates in the order they were added.
#[derive(Default)]
pub struct Buckets {
    buckets: IndexMap<SemanticKey, Vec<AnnotationCandidate>>,
}

impl Buckets {
    pub fn new() -> Buckets {
        Buckets::default()
    }

    pub fn add(&mut self, candidate: AnnotationCandidate) {
        self.buckets.entry(candidate.semantic_key())
            .or_default()
            .push(candidate);
    }

    pub fn extend(&mut self, candidates: impl IntoIterator<Item = AnnotationCandidate>) {
        for candidate in candidates {
            self.add(candidate);
        }
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn candidate_count(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    pub fn into_vec(self) -> Vec<(SemanticKey, Vec<AnnotationCandidate>)> {
        self.buckets.into_iter().collect()
    }
}

/// Merge candidates with the same semantic key into one.  The notes and
/// xref sources of the result are the unions of those of the candidates,
/// in the order first seen.  Notes are compared ignoring case.
pub fn merge_candidates(candidates: &[AnnotationCandidate]) -> Option<AnnotationCandidate> {
    let mut result = candidates.first()?.clone();

    if candidates.len() == 1 {
        return Some(result);
    }

    let mut seen_notes = HashSet::new();
    let mut notes: Vec<&str> = vec![];
    let mut seen_xrefs = HashSet::new();
    let mut xrefs: Vec<&str> = vec![];

    for candidate in candidates {
        for note in candidate.notes.split(NOTES_DELIMITER) {
            if !note.is_empty() && seen_notes.insert(note.to_lowercase()) {
                notes.push(note);
            }
        }
        for xref in candidate.xref_source.split(XREF_SOURCE_DELIMITER) {
            if !xref.is_empty() && seen_xrefs.insert(xref) {
                xrefs.push(xref);
            }
        }
    }

    result.notes = notes.join(NOTES_DELIMITER);
    result.xref_source = xrefs.join(XREF_SOURCE_DELIMITER);

    Some(result)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergeResult {
    pub merged: Vec<AnnotationCandidate>,
    pub splits: usize,
    // merged candidates that are still over the limit
    pub overflow: usize,
}

/// Merge candidates into as few annotations as possible where each merged
/// xref source is at most max_xref_source_length long.  With splits
/// chunks the candidates are divided into contiguous chunks of
/// ceil(n/splits).  If even single candidates don't fit they are kept
/// as they are.
pub fn merge_with_splits(candidates: &[AnnotationCandidate], max_xref_source_length: usize)
    -> MergeResult
{
    let candidate_count = candidates.len();

    let fits = |candidate: &AnnotationCandidate| {
        candidate.xref_source.len() <= max_xref_source_length
    };

    for splits in 1..=candidate_count {
        let chunk_size = candidate_count.div_ceil(splits);
        let merged: Vec<AnnotationCandidate> = candidates.chunks(chunk_size)
            .filter_map(merge_candidates)
            .collect();

        if merged.iter().all(fits) {
            return MergeResult {
                merged,
                splits,
                overflow: 0,
            };
        }

        if chunk_size == 1 {
            let overflow = merged.iter().filter(|candidate| !fits(*candidate)).count();
            return MergeResult {
                merged,
                splits,
                overflow,
            };
        }
    }

    MergeResult {
        merged: vec![],
        splits: 0,
        overflow: 0,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReconcileAction {
    Insert,
    // the stored annotation is up to date
    RefreshTimestamp,
    UpdateText,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Decision {
    pub action: ReconcileAction,
    pub evidence: EvidenceClass,
    pub taxonid: OrganismTaxonId,
    pub annotation_key: AnnotationKey,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BucketReport {
    pub key: SemanticKey,
    pub decisions: Vec<Decision>,
    pub splits: usize,
    pub overflow: usize,
}

/// Merge the candidates of one bucket and write them to the store.  Each
/// merged candidate updates a stored annotation with the same key, one
/// with the same xref source if possible.  Once the stored annotations
/// are used up the remaining merged candidates are inserted.
pub async fn reconcile_bucket(store: &dyn AnnotationStore, key: &SemanticKey,
                              candidates: &[AnnotationCandidate],
                              max_xref_source_length: usize)
    -> Result<BucketReport>
{
    let merge_result = merge_with_splits(candidates, max_xref_source_length);

    if merge_result.splits > 1 {
        info!("  xref source split into {} for GENE_ID={} {}",
              merge_result.merged.len(), key.gene_id, key.term_acc);
    }
    if merge_result.overflow > 0 {
        warn!("{} annotations for {} have an xref source longer than {}",
              merge_result.overflow, key, max_xref_source_length);
    }

    let mut persisted = store.find(key).await?;
    let mut decisions = vec![];

    for candidate in merge_result.merged {
        if persisted.is_empty() {
            let annotation_key = store.insert(&candidate).await?;
            info!(target: "inserted_annots", "inserted {}", candidate.dump("|"));
            decisions.push(Decision {
                action: ReconcileAction::Insert,
                evidence: candidate.evidence,
                taxonid: candidate.taxonid,
                annotation_key,
            });
            continue;
        }

        info!(target: "updated_annots", "GENE_ID={} {} {}",
              candidate.gene_id, candidate.term.accession, candidate.xref_source);

        let existing_idx = persisted.iter()
            .position(|existing| existing.xref_source == candidate.xref_source)
            .unwrap_or(0);
        let existing = persisted.remove(existing_idx);

        let action =
            if eq_ignore_case(&candidate.notes, &existing.notes) &&
               eq_ignore_case(&candidate.xref_source, &existing.xref_source) {
                store.touch_timestamp(existing.key).await?;
                ReconcileAction::RefreshTimestamp
            } else {
                info!(target: "updated_annot_notes",
                      "GENE_ID={} {} {} NOTESLEN={}\n OLD:{} - {}\n NEW:{} - {}",
                      candidate.gene_id, candidate.term.accession, candidate.xref_source,
                      candidate.notes.len(), existing.xref_source, existing.notes,
                      candidate.xref_source, candidate.notes);
                store.update_text(existing.key, &candidate.notes, &candidate.xref_source).await?;
                ReconcileAction::UpdateText
            };

        decisions.push(Decision {
            action,
            evidence: candidate.evidence,
            taxonid: candidate.taxonid,
            annotation_key: existing.key,
        });
    }

    Ok(BucketReport {
        key: key.clone(),
        decisions,
        splits: merge_result.splits,
        overflow: merge_result.overflow,
    })
}

/// Reconciles buckets concurrently, one task per bucket at a time
pub struct Reconciler {
    store: Arc<dyn AnnotationStore>,
    max_xref_source_length: usize,
    worker_count: usize,
}

impl Reconciler {
    pub fn new(store: Arc<dyn AnnotationStore>, max_xref_source_length: usize,
               worker_count: usize)
        -> Reconciler
    {
        Reconciler {
            store,
            max_xref_source_length,
            worker_count,
        }
    }

    /// The reports are in bucket order
    pub async fn reconcile(&self, buckets: Buckets) -> Result<Vec<BucketReport>> {
        let store = self.store.clone();
        let max_xref_source_length = self.max_xref_source_length;

        run_worker_pool(buckets.into_vec(), self.worker_count, move |(key, candidates)| {
            let store = store.clone();
            async move {
                reconcile_bucket(store.as_ref(), &key, &candidates, max_xref_source_length).await
            }
        }).await
    }
}

#[cfg(test)]
fn test_candidate(notes: &str, xref_source: &str) -> AnnotationCandidate {
    AnnotationCandidate {
        term: TermRef {
            accession: "CHEBI:16842".into(),
            name: "formaldehyde".into(),
        },
        gene_id: 2458,
        gene_symbol: "Cyp1a1".into(),
        gene_name: None,
        taxonid: RAT_TAXONID,
        evidence: EvidenceClass::Direct,
        notes: notes.to_owned(),
        xref_source: xref_source.to_owned(),
        qualifier: Some("increases expression".into()),
        with_info: None,
        aspect: "E".into(),
        owner: 192,
        data_source: "CTD".into(),
        reference_id: None,
    }
}

#[test]
fn test_merge_candidates() {
    let candidates = vec![
        test_candidate("formaldehyde increases CYP1A1", "PMID:3|PMID:1"),
        test_candidate("Formaldehyde increases Cyp1a1; other note", "PMID:1|PMID:2"),
        test_candidate("", "PMID:2"),
    ];
    let merged = merge_candidates(&candidates).unwrap();
    assert_eq!(merged.notes, "formaldehyde increases CYP1A1; other note");
    assert_eq!(merged.xref_source, "PMID:3|PMID:1|PMID:2");

    assert!(merge_candidates(&[]).is_none());
}

#[test]
fn test_merge_singleton_identity() {
    let candidate = test_candidate("a note", "PMID:10|PMID:11");
    assert_eq!(merge_candidates(&[candidate.clone()]).unwrap(), candidate);

    // repeated segments of a single candidate are left alone
    let candidate = test_candidate("x increases y; X increases Y", "PMID:1|PMID:1");
    assert_eq!(merge_candidates(&[candidate.clone()]).unwrap(), candidate);
    assert_eq!(merge_with_splits(&[candidate.clone()], 300).merged, vec![candidate]);
}

#[test]
fn test_merge_with_splits() {
    // each xref is 13 chars, 40 of them joined are 559
    let candidates: Vec<_> = (0..40)
        .map(|i| test_candidate("note", &format!("PMID:{}", 10000000 + i)))
        .collect();

    let result = merge_with_splits(&candidates, 300);
    assert_eq!(result.splits, 2);
    assert_eq!(result.merged.len(), 2);
    assert_eq!(result.overflow, 0);
    assert!(result.merged.iter().all(|c| c.xref_source.len() <= 300));

    // nothing lost
    let total_xrefs: usize = result.merged.iter()
        .map(|c| c.xref_source.split('|').count())
        .sum();
    assert_eq!(total_xrefs, 40);

    let result = merge_with_splits(&candidates, 1000);
    assert_eq!(result.splits, 1);
    assert_eq!(result.merged.len(), 1);
}

#[test]
fn test_merge_with_splits_overflow() {
    let candidates = vec![
        test_candidate("note", "PMID:1"),
        test_candidate("note", "PMID:123456789012"),
    ];
    let result = merge_with_splits(&candidates, 10);
    assert_eq!(result.merged.len(), 2);
    assert_eq!(result.overflow, 1);
    assert_eq!(result.merged[1].xref_source, "PMID:123456789012");
}
