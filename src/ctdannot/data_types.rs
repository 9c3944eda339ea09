use std::fmt;
use std::fmt::Display;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use flexstr::SharedStr as FlexStr;

use crate::types::*;
use crate::utils::join;

pub const RAT_TAXONID: OrganismTaxonId = 10116;
pub const MOUSE_TAXONID: OrganismTaxonId = 10090;
pub const HUMAN_TAXONID: OrganismTaxonId = 9606;

// inferred (ortholog) annotations are only made between these organisms
pub const REFERENCE_TRIAD: [OrganismTaxonId; 3] = [RAT_TAXONID, MOUSE_TAXONID, HUMAN_TAXONID];

pub fn in_reference_triad(taxonid: OrganismTaxonId) -> bool {
    REFERENCE_TRIAD.contains(&taxonid)
}

pub const XREF_SYNONYM_TYPE: &str = "xref";
pub const XREF_MESH_SYNONYM_TYPE: &str = "xref_mesh";
pub const CAS_SYNONYM_PREFIX: &str = "CAS:";
pub const PUBMED_PREFIX: &str = "PMID:";
pub const MESH_PREFIX: &str = "MESH:";

pub const MULTIPLE_INTERACTIONS_QUALIFIER: &str = "multiple interactions";

pub const XREF_SOURCE_DELIMITER: &str = "|";
pub const NOTES_DELIMITER: &str = "; ";

/// Formats a record as a single line of NAME=value pairs for the log
/// files.  Independent of the logging itself.
pub trait Dump {
    fn dump(&self, delimiter: &str) -> String;
}

#[derive(Default)]
pub struct Dumper {
    parts: Vec<String>,
}

impl Dumper {
    pub fn new() -> Dumper {
        Dumper::default()
    }

    pub fn put(mut self, name: &str, value: impl Display) -> Dumper {
        self.parts.push(format!("{}={}", name, value));
        self
    }

    // None values are left out
    pub fn put_opt(self, name: &str, value: Option<impl Display>) -> Dumper {
        match value {
            Some(value) => self.put(name, value),
            None => self,
        }
    }

    pub fn finish(self, delimiter: &str) -> String {
        self.parts.join(delimiter)
    }
}

/// One row of the CTD chemical-gene interactions file
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InteractionRecord {
    pub chemical_name: ChemicalName,
    // always has the MESH: prefix
    pub chemical_id: ChemicalId,
    pub cas_number: Option<CasNumber>,
    pub gene_symbol: GeneSymbol,
    pub external_gene_id: ExternalGeneId,
    pub gene_forms: Vec<FlexStr>,
    pub organism: OrganismName,
    pub taxonid: OrganismTaxonId,
    pub interaction: String,
    pub actions: Vec<FlexStr>,
    // "PMID:123|PMID:456"
    pub pubmed_ids: String,
}

impl InteractionRecord {
    // "123|456" -> "PMID:123|PMID:456"
    pub fn normalize_pubmed_ids(raw_ids: &str) -> String {
        let ids: Vec<String> = raw_ids.split('|')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(|id| {
                if id.starts_with(PUBMED_PREFIX) {
                    id.to_owned()
                } else {
                    format!("{}{}", PUBMED_PREFIX, id)
                }
            })
            .collect();
        ids.join(XREF_SOURCE_DELIMITER)
    }
}

impl Dump for InteractionRecord {
    fn dump(&self, delimiter: &str) -> String {
        Dumper::new()
            .put("CHEMICAL", &self.chemical_name)
            .put("ID", &self.chemical_id)
            .put_opt("CAS", self.cas_number.as_ref())
            .put("GENE", &self.gene_symbol)
            .put("GENE_ID", &self.external_gene_id)
            .put("TAXON", self.taxonid)
            .put("INTERACTION", &self.interaction)
            .put("ACTIONS", join(&self.actions, "|"))
            .put("PMIDS", &self.pubmed_ids)
            .finish(delimiter)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MatchStrategy {
    CasNumber,
    ExternalId,
    Name,
}

/// A row from the CTD chemicals file.  Chemicals are equal iff their
/// chemical ids are equal.
#[derive(Clone, Debug)]
pub struct Chemical {
    pub name: ChemicalName,
    pub chemical_id: ChemicalId,
    pub cas_number: Option<CasNumber>,
    pub definition: Option<String>,
    pub parent_ids: Vec<FlexStr>,
    pub tree_numbers: Vec<FlexStr>,
    pub parent_tree_numbers: Vec<FlexStr>,
    pub synonyms: Vec<FlexStr>,
    // filled in once the chemical is matched to the vocabulary
    pub terms: Vec<TermRef>,
    pub match_strategy: Option<MatchStrategy>,
}

impl PartialEq for Chemical {
    fn eq(&self, other: &Chemical) -> bool {
        self.chemical_id == other.chemical_id
    }
}

impl Eq for Chemical {}

impl Hash for Chemical {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.chemical_id.hash(state);
    }
}

impl Dump for Chemical {
    fn dump(&self, delimiter: &str) -> String {
        Dumper::new()
            .put("CHEMICAL", &self.name)
            .put("ID", &self.chemical_id)
            .put_opt("CAS", self.cas_number.as_ref())
            .finish(delimiter)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TermRef {
    pub accession: TermAcc,
    pub name: TermName,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Synonym {
    pub term_acc: TermAcc,
    pub synonym_type: SynonymType,
    pub name: FlexStr,
    pub source: Option<FlexStr>,
}

impl Dump for Synonym {
    fn dump(&self, delimiter: &str) -> String {
        Dumper::new()
            .put("TERM_ACC", &self.term_acc)
            .put("TYPE", &self.synonym_type)
            .put("NAME", &self.name)
            .put_opt("SOURCE", self.source.as_ref())
            .finish(delimiter)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Gene {
    pub id: GeneId,
    pub symbol: GeneSymbol,
    pub name: Option<GeneName>,
    pub taxonid: OrganismTaxonId,
    pub active: bool,
}

/// A weak ortholog association of a gene.  detail_gene is None if the
/// association points at a gene id that is no longer valid.
#[derive(Clone, Debug)]
pub struct OrthologAssociation {
    pub detail_gene_id: GeneId,
    pub detail_gene: Option<Gene>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EvidenceClass {
    // annotation of the gene that matched the interaction
    Direct,
    // propagated to an ortholog of the gene that matched
    Inferred,
}

impl EvidenceClass {
    pub fn code(&self) -> &'static str {
        match self {
            EvidenceClass::Direct => "EXP",
            EvidenceClass::Inferred => "ISO",
        }
    }
}

impl Display for EvidenceClass {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// The fields that identify an annotation for merging and for matching
/// against existing annotations.  The xref source and notes are not part
/// of the key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SemanticKey {
    pub term_acc: TermAcc,
    pub gene_id: GeneId,
    pub reference_id: Option<ReferenceId>,
    pub evidence: EvidenceClass,
    pub with_info: Option<WithInfo>,
    pub qualifier: Option<Qualifier>,
}

impl Display for SemanticKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}~{}~{}~{}~{}~{}",
               self.term_acc, self.gene_id,
               self.reference_id.unwrap_or(0),
               self.evidence,
               self.with_info.as_ref().map(FlexStr::as_str).unwrap_or(""),
               self.qualifier.as_ref().map(FlexStr::as_str).unwrap_or(""))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnnotationCandidate {
    pub term: TermRef,
    pub gene_id: GeneId,
    pub gene_symbol: GeneSymbol,
    pub gene_name: Option<GeneName>,
    pub taxonid: OrganismTaxonId,
    pub evidence: EvidenceClass,
    pub notes: String,
    pub xref_source: String,
    pub qualifier: Option<Qualifier>,
    // the gene the annotation was inferred from, for ISO annotations
    pub with_info: Option<WithInfo>,
    pub aspect: Aspect,
    pub owner: OwnerId,
    pub data_source: DataSource,
    pub reference_id: Option<ReferenceId>,
}

impl AnnotationCandidate {
    pub fn semantic_key(&self) -> SemanticKey {
        SemanticKey {
            term_acc: self.term.accession.clone(),
            gene_id: self.gene_id,
            // 0 and no reference are the same in the store
            reference_id: self.reference_id.filter(|ref_id| *ref_id != 0),
            evidence: self.evidence,
            with_info: self.with_info.clone(),
            qualifier: self.qualifier.clone(),
        }
    }
}

impl Dump for AnnotationCandidate {
    fn dump(&self, delimiter: &str) -> String {
        Dumper::new()
            .put("GENE_ID", self.gene_id)
            .put("SYMBOL", &self.gene_symbol)
            .put("TERM_ACC", &self.term.accession)
            .put("TERM", &self.term.name)
            .put("EVIDENCE", self.evidence)
            .put_opt("WITH", self.with_info.as_ref())
            .put_opt("QUALIFIER", self.qualifier.as_ref())
            .put("XREF_SOURCE", &self.xref_source)
            .put("NOTES", &self.notes)
            .finish(delimiter)
    }
}

/// An annotation already in the store
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PersistedAnnotation {
    pub key: AnnotationKey,
    pub term_acc: TermAcc,
    pub gene_id: GeneId,
    pub reference_id: Option<ReferenceId>,
    pub evidence: EvidenceCode,
    pub with_info: Option<WithInfo>,
    pub qualifier: Option<Qualifier>,
    pub notes: String,
    pub xref_source: String,
    pub aspect: Aspect,
    pub owner: OwnerId,
    pub last_modified: DateTime<Utc>,
}

impl PersistedAnnotation {
    pub fn matches_key(&self, key: &SemanticKey) -> bool {
        self.term_acc == key.term_acc &&
            self.gene_id == key.gene_id &&
            self.reference_id.unwrap_or(0) == key.reference_id.unwrap_or(0) &&
            self.evidence.as_str() == key.evidence.code() &&
            self.with_info == key.with_info &&
            self.qualifier == key.qualifier
    }
}

impl Dump for PersistedAnnotation {
    fn dump(&self, delimiter: &str) -> String {
        Dumper::new()
            .put("KEY", self.key)
            .put("GENE_ID", self.gene_id)
            .put("TERM_ACC", &self.term_acc)
            .put("EVIDENCE", &self.evidence)
            .put_opt("REF_ID", self.reference_id)
            .put_opt("WITH", self.with_info.as_ref())
            .put_opt("QUALIFIER", self.qualifier.as_ref())
            .put("XREF_SOURCE", &self.xref_source)
            .put("NOTES", &self.notes)
            .put("LAST_MODIFIED", self.last_modified.format("%Y-%m-%d %H:%M:%S"))
            .finish(delimiter)
    }
}

#[cfg(test)]
fn test_candidate(evidence: EvidenceClass, with_info: Option<&'static str>) -> AnnotationCandidate {
    AnnotationCandidate {
        term: TermRef {
            accession: "CHEBI:16842".into(),
            name: "formaldehyde".into(),
        },
        gene_id: 2300,
        gene_symbol: "Cyp1a1".into(),
        gene_name: None,
        taxonid: RAT_TAXONID,
        evidence,
        notes: "formaldehyde results in increased expression of CYP1A1 mRNA".into(),
        xref_source: "PMID:1".into(),
        qualifier: Some("increases expression".into()),
        with_info: with_info.map(|w| w.into()),
        aspect: "E".into(),
        owner: 192,
        data_source: "CTD".into(),
        reference_id: Some(7421),
    }
}

#[test]
fn test_semantic_key_ignores_text() {
    let c1 = test_candidate(EvidenceClass::Direct, None);
    let mut c2 = c1.clone();
    c2.notes = "something else".into();
    c2.xref_source = "PMID:2|PMID:3".into();
    assert_eq!(c1.semantic_key(), c2.semantic_key());

    let c3 = test_candidate(EvidenceClass::Inferred, Some("RGD:2300"));
    assert_ne!(c1.semantic_key(), c3.semantic_key());

    assert_eq!(format!("{}", c1.semantic_key()),
               "CHEBI:16842~2300~7421~EXP~~increases expression");
    assert_eq!(format!("{}", c3.semantic_key()),
               "CHEBI:16842~2300~7421~ISO~RGD:2300~increases expression");
}

#[test]
fn test_semantic_key_zero_reference() {
    let mut no_reference = test_candidate(EvidenceClass::Direct, None);
    no_reference.reference_id = None;
    let mut zero_reference = no_reference.clone();
    zero_reference.reference_id = Some(0);

    assert_eq!(no_reference.semantic_key(), zero_reference.semantic_key());

    let mut keys = std::collections::HashSet::new();
    keys.insert(no_reference.semantic_key());
    keys.insert(zero_reference.semantic_key());
    assert_eq!(keys.len(), 1);

    let persisted = PersistedAnnotation {
        key: 1,
        term_acc: "CHEBI:16842".into(),
        gene_id: 2300,
        reference_id: Some(0),
        evidence: "EXP".into(),
        with_info: None,
        qualifier: Some("increases expression".into()),
        notes: String::new(),
        xref_source: String::new(),
        aspect: "E".into(),
        owner: 192,
        last_modified: Utc::now(),
    };
    assert!(persisted.matches_key(&no_reference.semantic_key()));
    assert!(persisted.matches_key(&zero_reference.semantic_key()));
}

#[test]
fn test_normalize_pubmed_ids() {
    assert_eq!(InteractionRecord::normalize_pubmed_ids("123|456"), "PMID:123|PMID:456");
    assert_eq!(InteractionRecord::normalize_pubmed_ids("123"), "PMID:123");
    assert_eq!(InteractionRecord::normalize_pubmed_ids(""), "");
    assert_eq!(InteractionRecord::normalize_pubmed_ids("PMID:7|8"), "PMID:7|PMID:8");
}

#[test]
fn test_dump() {
    let synonym = Synonym {
        term_acc: "CHEBI:16842".into(),
        synonym_type: XREF_MESH_SYNONYM_TYPE.into(),
        name: "MESH:D005557".into(),
        source: None,
    };
    assert_eq!(synonym.dump("|"), "TERM_ACC=CHEBI:16842|TYPE=xref_mesh|NAME=MESH:D005557");
}

#[test]
fn test_evidence_codes() {
    assert_eq!(EvidenceClass::Direct.code(), "EXP");
    assert_eq!(EvidenceClass::Inferred.to_string(), "ISO");
}
