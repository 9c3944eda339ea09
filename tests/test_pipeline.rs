extern crate ctdannot;

mod util;

use chrono::Utc;

use ctdannot::counters::Counters;
use ctdannot::data_types::*;
use ctdannot::pipeline::Pipeline;
use ctdannot::store::Stores;
use ctdannot::store::memory::MemoryStore;
use ctdannot::types::ChemicalId;

use util::*;

fn test_pipeline(store: &std::sync::Arc<MemoryStore>) -> Pipeline {
    Pipeline::new(test_config(), Stores::from_single(store.clone()))
}

async fn run_pipeline(pipeline: &Pipeline) -> ctdannot::pipeline::RunSummary {
    pipeline.run(&test_file_path("data/CTD_chemicals.tsv"),
                 &test_file_path("data/CTD_chem_gene_ixns.tsv")).await.unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_pipeline_run() {
    let store = test_store();

    // from an earlier run, with fewer PubMed ids
    let earlier = make_candidate(FORMALDEHYDE, RAT_CYP1A1,
                                 "Formaldehyde results in increased expression of CYP1A1 mRNA",
                                 "PMID:1234");
    let earlier_key = store.add_annotation(make_persisted(&earlier, days_ago(30)));

    // no longer in the CTD file
    let stale = make_candidate(ASPIRIN, RAT_CYP1A1, "Aspirin affects Cyp1a1", "PMID:42");
    store.add_annotation(make_persisted(&stale, days_ago(30)));

    let mut other_owner = make_persisted(&stale, days_ago(30));
    other_owner.owner = PIPELINE_OWNER + 1;
    store.add_annotation(other_owner);

    let summary = run_pipeline(&test_pipeline(&store)).await;
    let counters = &summary.counters;

    assert_eq!(counters.get("CHEMICALS_PROCESSED"), 4);
    assert_eq!(counters.get("CHEMICALS__LOADED_MATCH_BY_CASRN"), 1);
    assert_eq!(counters.get("CHEMICALS__LOADED_MATCH_BY_MESH"), 1);
    assert_eq!(counters.get("CHEMICALS__LOADED_MATCH_BY_TERMNAME"), 1);
    assert_eq!(counters.get("CHEMICALS__IGNORED_NOT_MATCH"), 1);
    assert_eq!(counters.get("CHEMICALS__WITHOUT_CASRN"), 2);
    assert_eq!(counters.get("CHEBI_TERMS_WITH_CASRN"), 1);

    assert_eq!(counters.get("INTERACTIONS__LOADED"), 4);
    assert_eq!(counters.get("INTERACTIONS_FOR_SPECIES RATTUS NORVEGICUS"), 3);
    assert_eq!(counters.get("INTERACTIONS_FOR_SPECIES HOMO SAPIENS"), 1);
    assert_eq!(counters.get("INTERACTION_SKIPPED_UNSUPPORTED_ORGANISM"), 1);
    assert_eq!(counters.get("INTERACTION_SKIPPED_CHEMICAL_NOT_MATCHING_CHEBI"), 1);

    assert_eq!(counters.get("SINGLE MATCH"), 3);
    assert_eq!(counters.get("NO MATCH BY NCBI GENEID AND BY GENE SYMBOL"), 1);
    assert_eq!(counters.get("XREF_MESH_SYNONYMS_ADDED"), 1);

    assert_eq!(counters.get("ANNOTATIONS_EXP_INSERTED"), 1);
    assert_eq!(counters.get("ANNOTATIONS_EXP_MATCHED"), 1);
    assert_eq!(counters.get("ANNOTATIONS_ISO_INSERTED"), 4);
    assert_eq!(counters.get("ANNOTATIONS_RAT_MATCHED"), 1);
    assert_eq!(counters.get("ANNOTATIONS_RAT_INSERTED"), 1);
    assert_eq!(counters.get("ANNOTATIONS_MOUSE_INSERTED"), 2);
    assert_eq!(counters.get("ANNOTATIONS_HUMAN_INSERTED"), 2);
    assert_eq!(counters.get("ANNOTATIONS_UPDATED_TIME_NOTES_XREFSRC"), 1);
    assert_eq!(counters.get("ANNOTATIONS_UPDATED_TIME"), 0);
    assert_eq!(counters.get("ANNOTATIONS_EXP_DELETED"), 1);

    assert!(counters.get("TOTAL_XREF_SOURCE_LENGTH_AT_FINISH") >
            counters.get("TOTAL_XREF_SOURCE_LENGTH_AT_BEGIN"));

    assert_eq!(summary.write_count(), 6);
    assert!(!summary.sweep.aborted);

    // the six from this run and the one with another owner
    let annotations = store.annotations();
    assert_eq!(annotations.len(), 7);

    // rows differing only in the case of the notes are merged
    let updated = store.annotation(earlier_key).unwrap();
    assert_eq!(updated.notes, "Formaldehyde results in increased expression of CYP1A1 mRNA");
    assert_eq!(updated.xref_source, "PMID:1234|PMID:5678|PMID:9999");

    let inferred_from_rat: Vec<_> = annotations.iter()
        .filter(|a| a.with_info.as_ref().map(|w| w.as_str()) == Some("RGD:2458"))
        .collect();
    assert_eq!(inferred_from_rat.len(), 2);
    assert!(inferred_from_rat.iter().all(|a| a.evidence.as_str() == "ISO" &&
                                         a.term_acc.as_str() == FORMALDEHYDE));

    let caffeine_annotations: Vec<_> = annotations.iter()
        .filter(|a| a.term_acc.as_str() == CAFFEINE)
        .collect();
    assert_eq!(caffeine_annotations.len(), 3);
    assert!(caffeine_annotations.iter()
            .all(|a| a.qualifier.as_ref().map(|q| q.as_str()) == Some("decreases activity")));

    let mesh_synonyms: Vec<_> = store.synonyms(FORMALDEHYDE).into_iter()
        .filter(|synonym| synonym.synonym_type.as_str() == XREF_MESH_SYNONYM_TYPE)
        .collect();
    assert_eq!(mesh_synonyms.len(), 1);
    assert_eq!(mesh_synonyms[0].name.as_str(), "MESH:D005557");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_pipeline_second_run_only_refreshes() {
    let store = test_store();

    let first = run_pipeline(&test_pipeline(&store)).await;
    assert_eq!(first.counters.get("ANNOTATIONS_EXP_INSERTED"), 2);
    assert_eq!(first.counters.get("ANNOTATIONS_ISO_INSERTED"), 4);

    let before: Vec<_> = store.annotations().into_iter()
        .map(|a| (a.key, a.notes, a.xref_source))
        .collect();

    let second = run_pipeline(&test_pipeline(&store)).await;
    let counters = &second.counters;

    assert_eq!(counters.get("ANNOTATIONS_UPDATED_TIME"), 6);
    assert_eq!(counters.get("ANNOTATIONS_UPDATED_TIME_NOTES_XREFSRC"), 0);
    assert_eq!(counters.get("ANNOTATIONS_EXP_INSERTED"), 0);
    assert_eq!(counters.get("ANNOTATIONS_ISO_INSERTED"), 0);
    assert_eq!(counters.get("ANNOTATIONS_EXP_MATCHED"), 2);
    assert_eq!(counters.get("ANNOTATIONS_ISO_MATCHED"), 4);
    assert_eq!(counters.get("XREF_MESH_SYNONYMS_ADDED"), 0);
    assert_eq!(second.sweep.deleted_count, 0);

    let after: Vec<_> = store.annotations().into_iter()
        .map(|a| (a.key, a.notes, a.xref_source))
        .collect();
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_pipeline_sweep_over_limit() {
    let store = test_store();

    for gene_id in 0..500 {
        let candidate = make_candidate(FORMALDEHYDE, 10000 + gene_id, "note", "PMID:1");
        store.add_annotation(make_persisted(&candidate, days_ago(1)));
    }

    let pipeline = test_pipeline(&store);
    let summary = pipeline.process_records(Utc::now(), vec![], Counters::new()).await.unwrap();

    assert!(summary.sweep.aborted);
    assert_eq!(summary.sweep.obsolete_count, 500);
    assert_eq!(summary.counters.get("OBSOLETE_ANNOTATIONS"), 500);
    assert_eq!(summary.counters.get("ANNOTATIONS_EXP_DELETED"), 0);
    assert_eq!(store.annotations().len(), 500);
}

#[tokio::test]
async fn test_match_chemicals() {
    let store = test_store();
    let pipeline = test_pipeline(&store);

    let mut counters = Counters::new();
    assert!(pipeline.match_chemicals(vec![], &mut counters).await.is_err());

    let chemicals = vec![
        make_chemical("Formaldehyde", "MESH:D005557", Some("50-00-0")),
        make_chemical("Caffeine", "MESH:D002110", None),
        make_chemical("Unobtainium", "MESH:D999999", None),
    ];

    let matched = pipeline.match_chemicals(chemicals, &mut counters).await.unwrap();
    assert_eq!(matched.len(), 2);

    let formaldehyde_id: ChemicalId = "MESH:D005557".into();
    let formaldehyde = &matched[&formaldehyde_id];
    assert_eq!(formaldehyde.match_strategy, Some(MatchStrategy::CasNumber));
    assert_eq!(formaldehyde.terms[0].accession.as_str(), FORMALDEHYDE);

    assert_eq!(counters.get("CHEMICALS_PROCESSED"), 3);
    assert_eq!(counters.get("CHEMICALS__IGNORED_NOT_MATCH"), 1);
    assert_eq!(counters.get("CHEMICALS__WITHOUT_CASRN"), 2);
}
