use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use ctdannot::config::Config;
use ctdannot::data_types::*;
use ctdannot::store::memory::MemoryStore;
use ctdannot::types::*;

pub const NCBI_GENE_XDB_KEY: XdbKey = 3;
pub const PIPELINE_OWNER: OwnerId = 192;

pub const RAT_CYP1A1: GeneId = 2458;
pub const MOUSE_CYP1A1: GeneId = 3001;
pub const HUMAN_CYP1A1: GeneId = 3002;

pub const FORMALDEHYDE: &str = "CHEBI:16842";
pub const CAFFEINE: &str = "CHEBI:27732";
pub const ASPIRIN: &str = "CHEBI:15365";

#[allow(dead_code)]
pub fn test_file_path(file_name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push(file_name);
    path.to_string_lossy().into_owned()
}

#[allow(dead_code)]
pub fn test_config() -> Config {
    Config::read(&test_file_path("test_config.json")).unwrap()
}

#[allow(dead_code)]
pub fn make_gene(id: GeneId, symbol: &'static str, taxonid: OrganismTaxonId) -> Gene {
    Gene {
        id,
        symbol: symbol.into(),
        name: None,
        taxonid,
        active: true,
    }
}

// Cyp1a1 in rat, mouse and human, all strong orthologs of each other,
// and three CHEBI terms: formaldehyde with a CAS number, caffeine with a
// MeSH id and acetylsalicylic acid with neither
#[allow(dead_code)]
pub fn test_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());

    store.add_term("CHEBI", FORMALDEHYDE, "formaldehyde", false);
    store.add_synonym(FORMALDEHYDE, XREF_SYNONYM_TYPE, "CAS:50-00-0 \"ChemIDplus\"");
    store.add_term("CHEBI", CAFFEINE, "caffeine", false);
    store.add_synonym(CAFFEINE, XREF_MESH_SYNONYM_TYPE, "MESH:D002110");
    store.add_term("CHEBI", ASPIRIN, "acetylsalicylic acid", false);

    store.add_gene(make_gene(RAT_CYP1A1, "Cyp1a1", RAT_TAXONID));
    store.add_gene(make_gene(MOUSE_CYP1A1, "Cyp1a1", MOUSE_TAXONID));
    store.add_gene(make_gene(HUMAN_CYP1A1, "CYP1A1", HUMAN_TAXONID));

    store.add_external_id(NCBI_GENE_XDB_KEY, "24296", RAT_CYP1A1);
    store.add_external_id(NCBI_GENE_XDB_KEY, "13076", MOUSE_CYP1A1);
    store.add_external_id(NCBI_GENE_XDB_KEY, "1543", HUMAN_CYP1A1);

    store.add_strong_ortholog(RAT_CYP1A1, MOUSE_CYP1A1);
    store.add_strong_ortholog(RAT_CYP1A1, HUMAN_CYP1A1);
    store.add_strong_ortholog(MOUSE_CYP1A1, HUMAN_CYP1A1);

    store
}

#[allow(dead_code)]
pub fn make_chemical(name: &'static str, chemical_id: &'static str,
                     cas_number: Option<&'static str>) -> Chemical {
    Chemical {
        name: name.into(),
        chemical_id: chemical_id.into(),
        cas_number: cas_number.map(|cas| cas.into()),
        definition: None,
        parent_ids: vec![],
        tree_numbers: vec![],
        parent_tree_numbers: vec![],
        synonyms: vec![],
        terms: vec![],
        match_strategy: None,
    }
}

#[allow(dead_code)]
pub fn make_candidate(term_acc: &'static str, gene_id: GeneId, notes: &str, xref_source: &str)
    -> AnnotationCandidate
{
    AnnotationCandidate {
        term: TermRef {
            accession: term_acc.into(),
            name: "formaldehyde".into(),
        },
        gene_id,
        gene_symbol: "Cyp1a1".into(),
        gene_name: None,
        taxonid: RAT_TAXONID,
        evidence: EvidenceClass::Direct,
        notes: notes.to_owned(),
        xref_source: xref_source.to_owned(),
        qualifier: Some("increases expression".into()),
        with_info: None,
        aspect: "E".into(),
        owner: PIPELINE_OWNER,
        data_source: "CTD".into(),
        reference_id: None,
    }
}

// an annotation as it would have been stored by an earlier run
#[allow(dead_code)]
pub fn make_persisted(candidate: &AnnotationCandidate, last_modified: DateTime<Utc>)
    -> PersistedAnnotation
{
    PersistedAnnotation {
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
        last_modified,
    }
}

#[allow(dead_code)]
pub fn days_ago(days: i64) -> DateTime<Utc> {
    Utc::now() - chrono::Duration::days(days)
}
