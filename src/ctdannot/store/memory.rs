use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use flexstr::{SharedStr as FlexStr, ToSharedStr};

use crate::data_types::*;
use crate::store::*;
use crate::utils::eq_ignore_case;

#[derive(Clone, Debug)]
struct MemoryTerm {
    vocabulary: VocabularyName,
    term: TermRef,
    obsolete: bool,
}

#[derive(Default)]
struct MemoryData {
    terms: Vec<MemoryTerm>,
    synonyms: Vec<Synonym>,
    genes: HashMap<GeneId, Gene>,
    external_ids: Vec<(XdbKey, ExternalGeneId, GeneId)>,
    aliases: Vec<(GeneId, GeneSymbol)>,
    strong_orthologs: Vec<(GeneId, GeneId)>,
    weak_orthologs: Vec<(GeneId, GeneId)>,
    annotations: Vec<PersistedAnnotation>,
    next_annotation_key: AnnotationKey,
}

/// Stores everything in memory.  The setup methods take &self so a
/// MemoryStore can be filled after it is shared.
#[derive(Default)]
pub struct MemoryStore {
    data: Mutex<MemoryData>,
    external_id_lookups: AtomicUsize,
    triad_ortholog_lookups: AtomicUsize,
    organism_ortholog_lookups: AtomicUsize,
    synonym_lookups: AtomicUsize,
    synonym_inserts: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore {
            data: Mutex::new(MemoryData {
                next_annotation_key: 1,
                ..MemoryData::default()
            }),
            ..MemoryStore::default()
        }
    }

    fn data(&self) -> MutexGuard<'_, MemoryData> {
        self.data.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn add_term(&self, vocabulary: &str, accession: &str, name: &str, obsolete: bool) {
        self.data().terms.push(MemoryTerm {
            vocabulary: vocabulary.to_shared_str(),
            term: TermRef {
                accession: accession.to_shared_str(),
                name: name.to_shared_str(),
            },
            obsolete,
        });
    }

    pub fn add_synonym(&self, term_acc: &str, synonym_type: &str, name: &str) {
        self.data().synonyms.push(Synonym {
            term_acc: term_acc.to_shared_str(),
            synonym_type: synonym_type.to_shared_str(),
            name: name.to_shared_str(),
            source: None,
        });
    }

    pub fn add_gene(&self, gene: Gene) {
        self.data().genes.insert(gene.id, gene);
    }

    pub fn add_external_id(&self, xdb_key: XdbKey, external_id: &str, gene_id: GeneId) {
        self.data().external_ids.push((xdb_key, external_id.to_shared_str(), gene_id));
    }

    pub fn add_alias(&self, gene_id: GeneId, alias: &str) {
        self.data().aliases.push((gene_id, alias.to_shared_str()));
    }

    // orthology is symmetric
    pub fn add_strong_ortholog(&self, gene_id: GeneId, ortholog_id: GeneId) {
        let mut data = self.data();
        data.strong_orthologs.push((gene_id, ortholog_id));
        data.strong_orthologs.push((ortholog_id, gene_id));
    }

    // the detail gene doesn't need to exist
    pub fn add_weak_ortholog(&self, gene_id: GeneId, detail_gene_id: GeneId) {
        self.data().weak_orthologs.push((gene_id, detail_gene_id));
    }

    // the key of the annotation is replaced by a new key
    pub fn add_annotation(&self, mut annotation: PersistedAnnotation) -> AnnotationKey {
        let mut data = self.data();
        let key = data.next_annotation_key;
        data.next_annotation_key += 1;
        annotation.key = key;
        data.annotations.push(annotation);
        key
    }

    pub fn annotations(&self) -> Vec<PersistedAnnotation> {
        self.data().annotations.clone()
    }

    pub fn annotation(&self, key: AnnotationKey) -> Option<PersistedAnnotation> {
        self.data().annotations.iter().find(|annot| annot.key == key).cloned()
    }

    pub fn synonyms(&self, term_acc: &str) -> Vec<Synonym> {
        self.data().synonyms.iter()
            .filter(|synonym| synonym.term_acc.as_str() == term_acc)
            .cloned()
            .collect()
    }

    pub fn external_id_lookups(&self) -> usize {
        self.external_id_lookups.load(Ordering::SeqCst)
    }

    pub fn triad_ortholog_lookups(&self) -> usize {
        self.triad_ortholog_lookups.load(Ordering::SeqCst)
    }

    pub fn organism_ortholog_lookups(&self) -> usize {
        self.organism_ortholog_lookups.load(Ordering::SeqCst)
    }

    pub fn synonym_lookups(&self) -> usize {
        self.synonym_lookups.load(Ordering::SeqCst)
    }

    pub fn synonym_inserts(&self) -> usize {
        self.synonym_inserts.load(Ordering::SeqCst)
    }

    fn active_term(data: &MemoryData, vocabulary: &VocabularyName, term_acc: &TermAcc) -> bool {
        data.terms.iter()
            .any(|t| !t.obsolete && &t.vocabulary == vocabulary && &t.term.accession == term_acc)
    }

    fn orthologs_of(data: &MemoryData, gene_id: GeneId) -> Vec<Gene> {
        data.strong_orthologs.iter()
            .filter(|(id, _)| *id == gene_id)
            .filter_map(|(_, ortholog_id)| data.genes.get(ortholog_id))
            .filter(|gene| gene.active)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl VocabularyStore for MemoryStore {
    async fn active_terms(&self, vocabulary: &VocabularyName) -> Result<Vec<TermRef>> {
        Ok(self.data().terms.iter()
           .filter(|t| !t.obsolete && &t.vocabulary == vocabulary)
           .map(|t| t.term.clone())
           .collect())
    }

    async fn term_by_accession(&self, term_acc: &TermAcc) -> Result<Option<TermRef>> {
        Ok(self.data().terms.iter()
           .find(|t| &t.term.accession == term_acc)
           .map(|t| t.term.clone()))
    }

    async fn synonyms_of(&self, term_acc: &TermAcc) -> Result<Vec<Synonym>> {
        self.synonym_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.data().synonyms.iter()
           .filter(|synonym| &synonym.term_acc == term_acc)
           .cloned()
           .collect())
    }

    async fn insert_synonym(&self, synonym: &Synonym) -> Result<()> {
        self.synonym_inserts.fetch_add(1, Ordering::SeqCst);
        self.data().synonyms.push(synonym.clone());
        Ok(())
    }

    async fn xref_synonyms(&self, vocabulary: &VocabularyName, synonym_type: &str,
                           value_prefix: &str)
        -> Result<Vec<(TermAcc, FlexStr)>>
    {
        let data = self.data();
        Ok(data.synonyms.iter()
           .filter(|synonym| synonym.synonym_type.as_str() == synonym_type &&
                   synonym.name.starts_with(value_prefix) &&
                   Self::active_term(&data, vocabulary, &synonym.term_acc))
           .map(|synonym| (synonym.term_acc.clone(), synonym.name.clone()))
           .collect())
    }
}

#[async_trait]
impl GeneStore for MemoryStore {
    async fn active_genes_by_external_id(&self, xdb_key: XdbKey, external_id: &ExternalGeneId)
        -> Result<Vec<Gene>>
    {
        self.external_id_lookups.fetch_add(1, Ordering::SeqCst);
        let data = self.data();
        Ok(data.external_ids.iter()
           .filter(|(key, id, _)| *key == xdb_key && id == external_id)
           .filter_map(|(_, _, gene_id)| data.genes.get(gene_id))
           .filter(|gene| gene.active)
           .cloned()
           .collect())
    }

    async fn genes_by_symbol(&self, symbol: &GeneSymbol, taxonid: OrganismTaxonId)
        -> Result<Vec<Gene>>
    {
        let data = self.data();
        let mut genes: Vec<Gene> = data.genes.values()
            .filter(|gene| gene.taxonid == taxonid && eq_ignore_case(&gene.symbol, symbol))
            .cloned()
            .collect();
        genes.sort_by_key(|gene| gene.id);
        Ok(genes)
    }

    async fn genes_by_alias(&self, alias: &GeneSymbol, taxonid: OrganismTaxonId)
        -> Result<Vec<Gene>>
    {
        let data = self.data();
        Ok(data.aliases.iter()
           .filter(|(_, gene_alias)| eq_ignore_case(gene_alias, alias))
           .filter_map(|(gene_id, _)| data.genes.get(gene_id))
           .filter(|gene| gene.taxonid == taxonid)
           .cloned()
           .collect())
    }

    async fn strong_orthologs_in_triad(&self, gene_id: GeneId) -> Result<Vec<Gene>> {
        self.triad_ortholog_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(Self::orthologs_of(&self.data(), gene_id).into_iter()
           .filter(|gene| in_reference_triad(gene.taxonid))
           .collect())
    }

    async fn strong_orthologs(&self, gene_id: GeneId, taxonid: OrganismTaxonId)
        -> Result<Vec<Gene>>
    {
        self.organism_ortholog_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(Self::orthologs_of(&self.data(), gene_id).into_iter()
           .filter(|gene| gene.taxonid == taxonid)
           .collect())
    }

    async fn weak_ortholog_associations(&self, gene_id: GeneId)
        -> Result<Vec<OrthologAssociation>>
    {
        let data = self.data();
        Ok(data.weak_orthologs.iter()
           .filter(|(id, _)| *id == gene_id)
           .map(|(_, detail_gene_id)| OrthologAssociation {
               detail_gene_id: *detail_gene_id,
               detail_gene: data.genes.get(detail_gene_id).cloned(),
           })
           .collect())
    }

    async fn is_active(&self, gene_id: GeneId) -> Result<bool> {
        Ok(self.data().genes.get(&gene_id).map(|gene| gene.active).unwrap_or(false))
    }
}

#[async_trait]
impl AnnotationStore for MemoryStore {
    async fn find(&self, key: &SemanticKey) -> Result<Vec<PersistedAnnotation>> {
        Ok(self.data().annotations.iter()
           .filter(|annot| annot.matches_key(key))
           .cloned()
           .collect())
    }

    async fn insert(&self, candidate: &AnnotationCandidate) -> Result<AnnotationKey> {
        let annotation = PersistedAnnotation {
            key: 0,
            term_acc: candidate.term.accession.clone(),
            gene_id: candidate.gene_id,
            reference_id: candidate.reference_id,
            evidence: candidate.evidence.code().into(),
            with_info: candidate.with_info.clone(),
            qualifier: candidate.qualifier.clone(),
            notes: candidate.notes.clone(),
            xref_source: candidate.xref_source.clone(),
            aspect: candidate.aspect.clone(),
            owner: candidate.owner,
            last_modified: Utc::now(),
        };
        Ok(self.add_annotation(annotation))
    }

    async fn update_text(&self, key: AnnotationKey, notes: &str, xref_source: &str) -> Result<()> {
        let mut data = self.data();
        if let Some(annot) = data.annotations.iter_mut().find(|annot| annot.key == key) {
            annot.notes = notes.to_owned();
            annot.xref_source = xref_source.to_owned();
            annot.last_modified = Utc::now();
        }
        Ok(())
    }

    async fn touch_timestamp(&self, key: AnnotationKey) -> Result<()> {
        let mut data = self.data();
        if let Some(annot) = data.annotations.iter_mut().find(|annot| annot.key == key) {
            annot.last_modified = Utc::now();
        }
        Ok(())
    }

    async fn find_modified_before(&self, owner: OwnerId, timestamp: DateTime<Utc>)
        -> Result<Vec<PersistedAnnotation>>
    {
        Ok(self.data().annotations.iter()
           .filter(|annot| annot.owner == owner && annot.last_modified < timestamp)
           .cloned()
           .collect())
    }

    async fn delete(&self, keys: &[AnnotationKey]) -> Result<usize> {
        let mut data = self.data();
        let count_before = data.annotations.len();
        data.annotations.retain(|annot| !keys.contains(&annot.key));
        Ok(count_before - data.annotations.len())
    }

    async fn text_totals(&self, aspect: &Aspect) -> Result<TextTotals> {
        let data = self.data();
        let mut totals = TextTotals::default();
        for annot in data.annotations.iter().filter(|annot| &annot.aspect == aspect) {
            totals.notes_length += annot.notes.len() as u64;
            totals.xref_source_length += annot.xref_source.len() as u64;
        }
        Ok(totals)
    }
}

#[tokio::test]
async fn test_memory_store_genes() {
    let store = MemoryStore::new();
    store.add_gene(Gene {
        id: 2300, symbol: "Cyp1a1".into(), name: None,
        taxonid: RAT_TAXONID, active: true,
    });
    store.add_gene(Gene {
        id: 2301, symbol: "Cyp1a1-ps".into(), name: None,
        taxonid: RAT_TAXONID, active: false,
    });
    store.add_external_id(3, "24296", 2300);
    store.add_external_id(3, "24296", 2301);
    store.add_weak_ortholog(2300, 999999);

    let genes = store.active_genes_by_external_id(3, &"24296".into()).await.unwrap();
    assert_eq!(genes.len(), 1);
    assert_eq!(genes[0].id, 2300);
    assert_eq!(store.external_id_lookups(), 1);

    let by_symbol = store.genes_by_symbol(&"CYP1A1".into(), RAT_TAXONID).await.unwrap();
    assert_eq!(by_symbol.len(), 1);

    let associations = store.weak_ortholog_associations(2300).await.unwrap();
    assert_eq!(associations.len(), 1);
    assert!(associations[0].detail_gene.is_none());
}

#[tokio::test]
async fn test_memory_store_annotations() {
    let store = MemoryStore::new();
    let start = Utc::now();

    let old_key = store.add_annotation(PersistedAnnotation {
        key: 0,
        term_acc: "CHEBI:16842".into(),
        gene_id: 2300,
        reference_id: None,
        evidence: "EXP".into(),
        with_info: None,
        qualifier: None,
        notes: "n".into(),
        xref_source: "PMID:1".into(),
        aspect: "E".into(),
        owner: 192,
        last_modified: start - chrono::Duration::days(7),
    });

    assert_eq!(store.find_modified_before(192, start).await.unwrap().len(), 1);
    assert_eq!(store.find_modified_before(1, start).await.unwrap().len(), 0);

    store.touch_timestamp(old_key).await.unwrap();
    assert!(store.find_modified_before(192, start).await.unwrap().is_empty());

    let totals = store.text_totals(&"E".into()).await.unwrap();
    assert_eq!(totals, TextTotals { notes_length: 1, xref_source_length: 6 });

    assert_eq!(store.delete(&[old_key, 12345]).await.unwrap(), 1);
    assert!(store.annotations().is_empty());
}
