use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use flexstr::{SharedStr as FlexStr, ToSharedStr};
use tokio::sync::OnceCell;

use crate::data_types::*;
use crate::normalize::normalize_term_name;
use crate::store::VocabularyStore;
use crate::types::*;

type TermIndex = HashMap<FlexStr, Vec<TermRef>>;

/// The vocabulary terms that a chemical resolved to, and how
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TermMatch {
    pub terms: Vec<TermRef>,
    pub strategy: MatchStrategy,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TermIndexStats {
    // distinct CAS numbers with at least one term
    pub cas_numbers: usize,
    pub cas_terms: usize,
    pub mesh_ids: usize,
    pub mesh_terms: usize,
}

/// Return the CAS number from an xref synonym value like:
///   CAS:5142-23-4 "ChemIDplus"
pub fn cas_from_synonym(synonym_value: &str) -> Option<&str> {
    let without_prefix = synonym_value.strip_prefix(CAS_SYNONYM_PREFIX)?;
    let cas = match without_prefix.find(' ') {
        Some(space_pos) => &without_prefix[..space_pos],
        None => without_prefix.trim(),
    };
    if cas.is_empty() {
        None
    } else {
        Some(cas)
    }
}

fn add_to_index(index: &mut TermIndex, key: FlexStr, term: &TermRef) {
    let terms = index.entry(key).or_default();
    if !terms.iter().any(|existing| existing.accession == term.accession) {
        terms.push(term.clone());
    }
}

fn count_terms(index: &TermIndex) -> usize {
    index.values().map(Vec::len).sum()
}

/// Matches chemicals to vocabulary terms by CAS number, then by MeSH id,
/// then by normalised name.  The indices are loaded from the store the
/// first time they are needed and are read-only after that.
pub struct TermResolver {
    store: Arc<dyn VocabularyStore>,
    vocabulary: VocabularyName,
    active_terms: OnceCell<HashMap<TermAcc, TermRef>>,
    cas_index: OnceCell<TermIndex>,
    mesh_index: OnceCell<TermIndex>,
    // normalised name -> accessions
    name_index: OnceCell<HashMap<String, Vec<TermAcc>>>,
}

impl TermResolver {
    pub fn new(store: Arc<dyn VocabularyStore>, vocabulary: &VocabularyName) -> TermResolver {
        TermResolver {
            store,
            vocabulary: vocabulary.clone(),
            active_terms: OnceCell::new(),
            cas_index: OnceCell::new(),
            mesh_index: OnceCell::new(),
            name_index: OnceCell::new(),
        }
    }

    async fn active_terms(&self) -> Result<&HashMap<TermAcc, TermRef>> {
        self.active_terms.get_or_try_init(|| async {
            let terms = self.store.active_terms(&self.vocabulary).await
                .with_context(|| format!("failed to load {} terms", self.vocabulary))?;
            Ok::<_, anyhow::Error>(terms.into_iter()
                .map(|term| (term.accession.clone(), term))
                .collect())
        }).await
    }

    async fn cas_index(&self) -> Result<&TermIndex> {
        self.cas_index.get_or_try_init(|| async {
            let active_terms = self.active_terms().await?;
            let synonyms = self.store
                .xref_synonyms(&self.vocabulary, XREF_SYNONYM_TYPE, CAS_SYNONYM_PREFIX).await?;

            let mut index = TermIndex::new();
            for (term_acc, value) in synonyms {
                let Some(cas) = cas_from_synonym(&value)
                else {
                    continue;
                };
                if let Some(term) = active_terms.get(&term_acc) {
                    add_to_index(&mut index, cas.to_shared_str(), term);
                }
            }

            Ok::<_, anyhow::Error>(index)
        }).await
    }

    async fn mesh_index(&self) -> Result<&TermIndex> {
        self.mesh_index.get_or_try_init(|| async {
            let active_terms = self.active_terms().await?;
            let synonyms = self.store
                .xref_synonyms(&self.vocabulary, XREF_MESH_SYNONYM_TYPE, MESH_PREFIX).await?;

            let mut index = TermIndex::new();
            for (term_acc, mesh_id) in synonyms {
                if let Some(term) = active_terms.get(&term_acc) {
                    add_to_index(&mut index, mesh_id, term);
                }
            }

            Ok::<_, anyhow::Error>(index)
        }).await
    }

    async fn name_index(&self) -> Result<&HashMap<String, Vec<TermAcc>>> {
        self.name_index.get_or_try_init(|| async {
            let active_terms = self.active_terms().await?;

            let mut index: HashMap<String, Vec<TermAcc>> = HashMap::new();
            for term in active_terms.values() {
                let accessions = index.entry(normalize_term_name(&term.name)).or_default();
                if !accessions.contains(&term.accession) {
                    accessions.push(term.accession.clone());
                }
            }

            Ok::<_, anyhow::Error>(index)
        }).await
    }

    /// Load the CAS and MeSH indices and return their sizes
    pub async fn preload(&self) -> Result<TermIndexStats> {
        let cas_index = self.cas_index().await?;
        let mesh_index = self.mesh_index().await?;

        Ok(TermIndexStats {
            cas_numbers: cas_index.len(),
            cas_terms: count_terms(cas_index),
            mesh_ids: mesh_index.len(),
            mesh_terms: count_terms(mesh_index),
        })
    }

    pub async fn resolve(&self, chemical: &Chemical) -> Result<Option<TermMatch>> {
        if let Some(ref cas_number) = chemical.cas_number {
            if let Some(terms) = self.cas_index().await?.get(cas_number) {
                if !terms.is_empty() {
                    return Ok(Some(TermMatch {
                        terms: terms.clone(),
                        strategy: MatchStrategy::CasNumber,
                    }));
                }
            }
        }

        if let Some(terms) = self.mesh_index().await?.get(&chemical.chemical_id) {
            if !terms.is_empty() {
                return Ok(Some(TermMatch {
                    terms: terms.clone(),
                    strategy: MatchStrategy::ExternalId,
                }));
            }
        }

        let normalized_name = normalize_term_name(&chemical.name);
        if let Some(accessions) = self.name_index().await?.get(&normalized_name) {
            if accessions.len() == 1 {
                let term = self.store.term_by_accession(&accessions[0]).await?;
                if let Some(term) = term {
                    return Ok(Some(TermMatch {
                        terms: vec![term],
                        strategy: MatchStrategy::Name,
                    }));
                }
            } else {
                debug!("{} matches {} terms by name, ignored", chemical.name, accessions.len());
            }
        }

        Ok(None)
    }
}

#[test]
fn test_cas_from_synonym() {
    assert_eq!(cas_from_synonym("CAS:5142-23-4 \"ChemIDplus\""), Some("5142-23-4"));
    assert_eq!(cas_from_synonym("CAS:50-00-0"), Some("50-00-0"));
    assert_eq!(cas_from_synonym("CAS:50-00-0  "), Some("50-00-0"));
    assert_eq!(cas_from_synonym("CAS:"), None);
    assert_eq!(cas_from_synonym("MESH:D005557"), None);
}
