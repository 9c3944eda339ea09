extern crate ctdannot;

mod util;

use std::collections::HashMap;
use std::io::{Read, Write};
use std::sync::Arc;

use flate2::Compression;
use flate2::write::GzEncoder;

use ctdannot::counters::Counters;
use ctdannot::data_types::*;
use ctdannot::source::{open_reader, parse_chemicals, parse_interactions};
use ctdannot::types::*;

use util::*;

fn matched_chemicals() -> HashMap<ChemicalId, Arc<Chemical>> {
    let mut formaldehyde = make_chemical("Formaldehyde", "MESH:D005557", Some("50-00-0"));
    formaldehyde.terms = vec![TermRef {
        accession: FORMALDEHYDE.into(),
        name: "formaldehyde".into(),
    }];
    formaldehyde.match_strategy = Some(MatchStrategy::CasNumber);

    let mut chemicals = HashMap::new();
    chemicals.insert(formaldehyde.chemical_id.clone(), Arc::new(formaldehyde));
    chemicals
}

#[test]
fn test_config_read() {
    let config = test_config();

    assert_eq!(config.vocabulary.as_str(), "CHEBI");
    assert_eq!(config.owner, PIPELINE_OWNER);
    assert_eq!(config.gene_xdb_key, NCBI_GENE_XDB_KEY);
    assert_eq!(config.reference_id, None);
    assert_eq!(config.worker_count, 4);
    assert_eq!(config.organisms.len(), 3);

    let rat = config.organism_by_name("Rattus norvegicus").unwrap();
    assert_eq!(rat.taxonid, RAT_TAXONID);
    assert_eq!(config.organism_counter_name(MOUSE_TAXONID).as_str(), "MOUSE");
    assert_eq!(config.organism_counter_name(7955).as_str(), "TAXON 7955");
}

#[test]
fn test_parse_interactions() {
    let config = test_config();
    let data = "# Fields:\n\
                Formaldehyde\tD005557\t50-00-0\tCyp1a1\t24296\tmRNA|protein\tRattus norvegicus\t10116\tFormaldehyde results in increased expression of CYP1A1 mRNA\tincreases^expression\t1234| 5678\n\
                Formaldehyde\tD005557\t50-00-0\tcyp1a\t30203\tmRNA\tDanio rerio\t7955\tFormaldehyde affects cyp1a\taffects^expression\t7777\n\
                Unobtainium\tD999999\t\tCyp1a1\t24296\tmRNA\tRattus norvegicus\t10116\tUnobtainium affects Cyp1a1\taffects^expression\t8888\n\
                Unobtainium\tD999999\t\tCyp1a1\t24296\tmRNA\tRattus norvegicus\t10116\tUnobtainium affects Cyp1a1 again\taffects^expression\t8889\n\
                Too\tfew\tcolumns\n";

    let mut counters = Counters::new();
    let records = parse_interactions(data.as_bytes(), &config.organisms_by_name(),
                                     &matched_chemicals(), &mut counters).unwrap();

    assert_eq!(records.len(), 1);

    let interaction = &records[0].interaction;
    assert_eq!(interaction.chemical_id.as_str(), "MESH:D005557");
    assert_eq!(interaction.taxonid, RAT_TAXONID);
    assert_eq!(interaction.gene_forms.len(), 2);
    assert_eq!(interaction.actions.len(), 1);
    assert_eq!(interaction.pubmed_ids, "PMID:1234|PMID:5678");
    assert_eq!(records[0].chemical.terms[0].accession.as_str(), FORMALDEHYDE);

    assert_eq!(counters.get("INTERACTIONS__LOADED"), 1);
    assert_eq!(counters.get("INTERACTIONS_FOR_SPECIES RATTUS NORVEGICUS"), 1);
    assert_eq!(counters.get("INTERACTION_SKIPPED_UNSUPPORTED_ORGANISM"), 1);
    assert_eq!(counters.get("INTERACTION_SKIPPED_CHEMICAL_NOT_MATCHING_CHEBI"), 2);
}

#[test]
fn test_open_gzipped_file() {
    let mut plain_contents = String::new();
    open_reader(&test_file_path("data/CTD_chemicals.tsv")).unwrap()
        .read_to_string(&mut plain_contents).unwrap();

    let mut gz_path = std::env::temp_dir();
    gz_path.push(format!("ctd-annot-test-{}.tsv.gz", std::process::id()));
    let gz_file_name = gz_path.to_string_lossy().into_owned();

    let mut encoder = GzEncoder::new(std::fs::File::create(&gz_path).unwrap(),
                                     Compression::default());
    encoder.write_all(plain_contents.as_bytes()).unwrap();
    encoder.finish().unwrap();

    let chemicals = parse_chemicals(open_reader(&gz_file_name).unwrap()).unwrap();
    std::fs::remove_file(&gz_path).unwrap();

    assert_eq!(chemicals.len(), 4);
    assert_eq!(chemicals[1].name.as_str(), "Caffeine");
    assert!(chemicals[1].cas_number.is_none());
    assert_eq!(chemicals[2].synonyms.len(), 1);

    assert!(open_reader("/no/such/file.tsv").is_err());
}
