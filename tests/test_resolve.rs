extern crate ctdannot;

mod util;

use std::sync::Arc;

use ctdannot::cache::OnceMap;
use ctdannot::data_types::*;
use ctdannot::resolve::*;
use ctdannot::synonym::SynonymGuarantor;
use ctdannot::types::*;

use util::*;

fn gene_resolver(store: &Arc<ctdannot::store::memory::MemoryStore>) -> GeneResolver {
    GeneResolver::new(store.clone(), Arc::new(GeneCaches::new()), NCBI_GENE_XDB_KEY)
}

fn matched_gene(resolution: GeneResolution) -> (GeneId, MatchKind) {
    match resolution {
        GeneResolution::Matched { gene, kind } => (gene.id, kind),
        GeneResolution::Unresolved(reason) => panic!("expected a match, got {:?}", reason),
    }
}

#[tokio::test]
async fn test_resolve_chemicals() {
    let store = test_store();
    store.add_term("CHEBI", "CHEBI:99999", "obsolete formaldehyde", true);
    store.add_synonym("CHEBI:99999", XREF_SYNONYM_TYPE, "CAS:50-00-0");

    let resolver = TermResolver::new(store.clone(), &"CHEBI".into());

    let stats = resolver.preload().await.unwrap();
    assert_eq!(stats.cas_numbers, 1);
    assert_eq!(stats.cas_terms, 1);
    assert_eq!(stats.mesh_ids, 1);

    // matched by CAS even though the term has no MeSH id
    let formaldehyde = make_chemical("Formaldehyde", "MESH:D005557", Some("50-00-0"));
    let term_match = resolver.resolve(&formaldehyde).await.unwrap().unwrap();
    assert_eq!(term_match.strategy, MatchStrategy::CasNumber);
    assert_eq!(term_match.terms.len(), 1);
    assert_eq!(term_match.terms[0].accession.as_str(), FORMALDEHYDE);

    let caffeine = make_chemical("Caffeine", "MESH:D002110", None);
    let term_match = resolver.resolve(&caffeine).await.unwrap().unwrap();
    assert_eq!(term_match.strategy, MatchStrategy::ExternalId);
    assert_eq!(term_match.terms[0].accession.as_str(), CAFFEINE);

    let aspirin = make_chemical("Acetylsalicylic  ACID", "MESH:D001241", Some("50-78-2"));
    let term_match = resolver.resolve(&aspirin).await.unwrap().unwrap();
    assert_eq!(term_match.strategy, MatchStrategy::Name);
    assert_eq!(term_match.terms[0].accession.as_str(), ASPIRIN);

    let unknown = make_chemical("Unobtainium", "MESH:D999999", None);
    assert!(resolver.resolve(&unknown).await.unwrap().is_none());
}

#[tokio::test]
async fn test_resolve_chemical_ambiguous_name() {
    let store = test_store();
    store.add_term("CHEBI", "CHEBI:100", "sodium acetate", false);
    store.add_term("CHEBI", "CHEBI:101", "acetate, sodium", false);

    let resolver = TermResolver::new(store.clone(), &"CHEBI".into());
    let chemical = make_chemical("Sodium Acetate", "MESH:D019342", None);

    assert!(resolver.resolve(&chemical).await.unwrap().is_none());
}

#[tokio::test]
async fn test_resolve_gene_single() {
    let store = test_store();
    let resolver = gene_resolver(&store);

    let resolution = resolver.resolve_gene(&"24296".into(), &"Cyp1a1".into(), RAT_TAXONID)
        .await.unwrap();
    assert_eq!(matched_gene(resolution), (RAT_CYP1A1, MatchKind::Single));
}

#[tokio::test]
async fn test_resolve_gene_by_alias() {
    let store = test_store();
    store.add_alias(RAT_CYP1A1, "P450c");
    let resolver = gene_resolver(&store);

    let resolution = resolver.resolve_gene(&"0".into(), &"P450C".into(), RAT_TAXONID)
        .await.unwrap();
    assert_eq!(matched_gene(resolution), (RAT_CYP1A1, MatchKind::Single));

    let resolution = resolver.resolve_gene(&"0".into(), &"Nosuch1".into(), RAT_TAXONID)
        .await.unwrap();
    assert_eq!(resolution, GeneResolution::Unresolved(SkipReason::NoGeneMatch));
}

#[tokio::test]
async fn test_resolve_gene_other_organism_uses_ortholog() {
    let store = test_store();
    // a human row whose NCBI Gene id is for the mouse gene
    store.add_external_id(NCBI_GENE_XDB_KEY, "99999", MOUSE_CYP1A1);
    let resolver = gene_resolver(&store);

    let resolution = resolver.resolve_gene(&"99999".into(), &"CYP1A1".into(), HUMAN_TAXONID)
        .await.unwrap();
    assert_eq!(matched_gene(resolution), (HUMAN_CYP1A1, MatchKind::Ortholog));
}

#[tokio::test]
async fn test_resolve_gene_species_mixup() {
    let store = test_store();
    store.add_gene(make_gene(5001, "cyp1a", 7955));
    store.add_external_id(NCBI_GENE_XDB_KEY, "30203", 5001);
    let resolver = gene_resolver(&store);

    let resolution = resolver.resolve_gene(&"30203".into(), &"Cyp1a1".into(), RAT_TAXONID)
        .await.unwrap();
    assert_eq!(resolution, GeneResolution::Unresolved(SkipReason::SpeciesMismatch));
}

#[tokio::test]
async fn test_resolve_gene_multi_match() {
    let store = test_store();
    store.add_gene(make_gene(3003, "CYP1A1P1", HUMAN_TAXONID));
    store.add_external_id(NCBI_GENE_XDB_KEY, "1543", 3003);
    let resolver = gene_resolver(&store);

    let resolution = resolver.resolve_gene(&"1543".into(), &"cyp1a1".into(), HUMAN_TAXONID)
        .await.unwrap();
    assert_eq!(matched_gene(resolution), (HUMAN_CYP1A1, MatchKind::MultiMatchResolvedBySymbol));

    let resolution = resolver.resolve_gene(&"1543".into(), &"CYP1A2".into(), HUMAN_TAXONID)
        .await.unwrap();
    assert_eq!(resolution, GeneResolution::Unresolved(SkipReason::AmbiguousGeneMatch));
}

#[tokio::test]
async fn test_weak_ortholog_closest_symbol() {
    let store = test_store();
    let dog_gene = 4001;
    store.add_gene(make_gene(dog_gene, "CYP1A2", 9615));
    store.add_gene(make_gene(2459, "Cyp1a2", RAT_TAXONID));
    store.add_gene(make_gene(2460, "Cyp2a2", RAT_TAXONID));
    store.add_external_id(NCBI_GENE_XDB_KEY, "403103", dog_gene);
    // the first association is for a gene that no longer exists
    store.add_weak_ortholog(dog_gene, 999999);
    store.add_weak_ortholog(dog_gene, 2460);
    store.add_weak_ortholog(dog_gene, RAT_CYP1A1);
    store.add_weak_ortholog(dog_gene, 2459);

    let resolver = gene_resolver(&store);

    let resolution = resolver.resolve_gene(&"403103".into(), &"Cyp1a2".into(), RAT_TAXONID)
        .await.unwrap();
    assert_eq!(matched_gene(resolution), (2459, MatchKind::Ortholog));

    // Cyp1a1 and Cyp1a2 are both one edit from Cyp1a3; the first is kept
    let ortholog = resolver.ortholog(dog_gene, RAT_TAXONID, &"Cyp1a3".into()).await.unwrap();
    assert_eq!(ortholog.map(|gene| gene.id), Some(RAT_CYP1A1));

    let ortholog = resolver.ortholog(dog_gene, MOUSE_TAXONID, &"Cyp1a2".into()).await.unwrap();
    assert!(ortholog.is_none());
}

#[tokio::test]
async fn test_homologs_for_propagation() {
    let store = test_store();
    store.add_gene(make_gene(5001, "cyp1a", 7955));
    store.add_strong_ortholog(5001, RAT_CYP1A1);
    let resolver = gene_resolver(&store);

    let rat_gene = make_gene(RAT_CYP1A1, "Cyp1a1", RAT_TAXONID);
    let mut homolog_ids: Vec<GeneId> = resolver.homologs_for_propagation(&rat_gene).await.unwrap()
        .iter().map(|gene| gene.id).collect();
    // the gene itself is last
    assert_eq!(homolog_ids.pop(), Some(RAT_CYP1A1));
    homolog_ids.sort();
    assert_eq!(homolog_ids, vec![MOUSE_CYP1A1, HUMAN_CYP1A1]);

    // only the gene itself outside rat, mouse and human
    let fish_gene = make_gene(5001, "cyp1a", 7955);
    let homologs = resolver.homologs_for_propagation(&fish_gene).await.unwrap();
    assert_eq!(homologs, vec![fish_gene]);
}

#[tokio::test]
async fn test_gene_lookups_are_cached() {
    let store = test_store();
    let caches = Arc::new(GeneCaches::new());
    let resolver = GeneResolver::new(store.clone(), caches.clone(), NCBI_GENE_XDB_KEY);

    let rat_gene = make_gene(RAT_CYP1A1, "Cyp1a1", RAT_TAXONID);

    for _ in 0..5 {
        resolver.resolve_gene(&"24296".into(), &"Cyp1a1".into(), RAT_TAXONID).await.unwrap();
        resolver.homologs_for_propagation(&rat_gene).await.unwrap();
    }

    assert_eq!(store.external_id_lookups(), 1);
    assert_eq!(store.triad_ortholog_lookups(), 1);
    assert_eq!(caches.by_external_id.len(), 1);

    // a second resolver sharing the caches doesn't go to the store
    let other_resolver = GeneResolver::new(store.clone(), caches, NCBI_GENE_XDB_KEY);
    other_resolver.resolve_gene(&"24296".into(), &"Cyp1a1".into(), RAT_TAXONID).await.unwrap();
    assert_eq!(store.external_id_lookups(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_synonym_inserted_once_concurrently() {
    let store = test_store();
    let guarantor = Arc::new(SynonymGuarantor::new(store.clone(), &"CTDChemDrug".into(),
                                                   Arc::new(OnceMap::new())));

    let mut handles = vec![];

    for _ in 0..20 {
        let guarantor = guarantor.clone();
        handles.push(tokio::spawn(async move {
            let term_acc: TermAcc = FORMALDEHYDE.into();
            let mesh_id: ChemicalId = "MESH:D005557".into();
            guarantor.ensure_cross_reference(&term_acc, &mesh_id).await.unwrap()
        }));
    }

    let mut inserted_count = 0;
    for handle in handles {
        if !handle.await.unwrap() {
            inserted_count += 1;
        }
    }

    assert_eq!(inserted_count, 1);
    assert_eq!(store.synonym_lookups(), 1);
    assert_eq!(store.synonym_inserts(), 1);

    let mesh_synonyms: Vec<_> = store.synonyms(FORMALDEHYDE).into_iter()
        .filter(|synonym| synonym.synonym_type.as_str() == XREF_MESH_SYNONYM_TYPE)
        .collect();
    assert_eq!(mesh_synonyms.len(), 1);
    assert_eq!(mesh_synonyms[0].name.as_str(), "MESH:D005557");
    assert_eq!(mesh_synonyms[0].source.as_ref().map(|s| s.as_str()), Some("CTDChemDrug"));

    // a term that already has one
    let caffeine: TermAcc = CAFFEINE.into();
    assert!(guarantor.ensure_cross_reference(&caffeine, &"MESH:D002110".into()).await.unwrap());
    assert_eq!(store.synonym_inserts(), 1);
}
