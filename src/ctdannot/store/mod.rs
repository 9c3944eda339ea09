use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use flexstr::SharedStr as FlexStr;

use crate::data_types::*;
use crate::types::*;

pub mod memory;
pub mod postgres;

/// Lengths of the text columns of the annotations with a given aspect,
/// reported at the start and end of a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TextTotals {
    pub notes_length: u64,
    pub xref_source_length: u64,
}

#[async_trait]
pub trait VocabularyStore: Send + Sync {
    // active (non-obsolete) terms of a vocabulary
    async fn active_terms(&self, vocabulary: &VocabularyName) -> Result<Vec<TermRef>>;

    async fn term_by_accession(&self, term_acc: &TermAcc) -> Result<Option<TermRef>>;

    async fn synonyms_of(&self, term_acc: &TermAcc) -> Result<Vec<Synonym>>;

    async fn insert_synonym(&self, synonym: &Synonym) -> Result<()>;

    /// Return (term accession, synonym value) for the synonyms of the
    /// active terms of vocabulary with the given type whose value starts
    /// with value_prefix.
    async fn xref_synonyms(&self, vocabulary: &VocabularyName, synonym_type: &str,
                           value_prefix: &str)
        -> Result<Vec<(TermAcc, FlexStr)>>;
}

#[async_trait]
pub trait GeneStore: Send + Sync {
    async fn active_genes_by_external_id(&self, xdb_key: XdbKey, external_id: &ExternalGeneId)
        -> Result<Vec<Gene>>;

    async fn genes_by_symbol(&self, symbol: &GeneSymbol, taxonid: OrganismTaxonId)
        -> Result<Vec<Gene>>;

    async fn genes_by_alias(&self, alias: &GeneSymbol, taxonid: OrganismTaxonId)
        -> Result<Vec<Gene>>;

    // strong orthologs of gene_id in rat, mouse and human
    async fn strong_orthologs_in_triad(&self, gene_id: GeneId) -> Result<Vec<Gene>>;

    async fn strong_orthologs(&self, gene_id: GeneId, taxonid: OrganismTaxonId)
        -> Result<Vec<Gene>>;

    async fn weak_ortholog_associations(&self, gene_id: GeneId)
        -> Result<Vec<OrthologAssociation>>;

    async fn is_active(&self, gene_id: GeneId) -> Result<bool>;
}

#[async_trait]
pub trait AnnotationStore: Send + Sync {
    // the persisted annotations with the same semantic key
    async fn find(&self, key: &SemanticKey) -> Result<Vec<PersistedAnnotation>>;

    async fn insert(&self, candidate: &AnnotationCandidate) -> Result<AnnotationKey>;

    // also sets the last modified time
    async fn update_text(&self, key: AnnotationKey, notes: &str, xref_source: &str) -> Result<()>;

    async fn touch_timestamp(&self, key: AnnotationKey) -> Result<()>;

    async fn find_modified_before(&self, owner: OwnerId, timestamp: DateTime<Utc>)
        -> Result<Vec<PersistedAnnotation>>;

    // returns the number of rows deleted
    async fn delete(&self, keys: &[AnnotationKey]) -> Result<usize>;

    async fn text_totals(&self, aspect: &Aspect) -> Result<TextTotals>;
}

/// The stores used by a run.  They can all be the same object.
#[derive(Clone)]
pub struct Stores {
    pub vocabulary: Arc<dyn VocabularyStore>,
    pub genes: Arc<dyn GeneStore>,
    pub annotations: Arc<dyn AnnotationStore>,
}

impl Stores {
    pub fn from_single<S>(store: Arc<S>) -> Stores
      where S: VocabularyStore + GeneStore + AnnotationStore + 'static
    {
        Stores {
            vocabulary: store.clone(),
            genes: store.clone(),
            annotations: store,
        }
    }
}
