use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::sync::Arc;

use anyhow::{Context, Result};
use flate2::read::MultiGzDecoder;
use flexstr::{SharedStr as FlexStr, ToSharedStr};

use crate::config::ConfigOrganism;
use crate::counters::Counters;
use crate::data_types::*;
use crate::resolve::SkipReason;
use crate::types::*;
use crate::utils::split_list;

const INTERACTION_COLUMN_COUNT: usize = 11;
const MIN_CHEMICAL_COLUMN_COUNT: usize = 8;

/// An interaction row whose chemical matched the vocabulary
#[derive(Clone, Debug)]
pub struct CtdRecord {
    pub interaction: InteractionRecord,
    pub chemical: Arc<Chemical>,
}

/// Open a plain or gzipped (if the name ends with ".gz") file
pub fn open_reader(file_name: &str) -> Result<Box<dyn BufRead + Send>> {
    let file = File::open(file_name)
        .with_context(|| format!("failed to open {}", file_name))?;

    if file_name.ends_with(".gz") {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

fn tsv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(b'\t')
        .flexible(true)
        .quoting(false)
        .comment(Some(b'#'))
        .from_reader(reader)
}

fn record_fields(record: &csv::ByteRecord) -> Vec<String> {
    record.iter()
        .map(|field| String::from_utf8_lossy(field).into_owned())
        .collect()
}

fn non_empty(value: &str) -> Option<FlexStr> {
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_shared_str())
    }
}

fn with_mesh_prefix(chemical_id: &str) -> FlexStr {
    if chemical_id.starts_with(MESH_PREFIX) {
        chemical_id.to_shared_str()
    } else {
        format!("{}{}", MESH_PREFIX, chemical_id).into()
    }
}

/// Read the CTD chemicals file.  Rows with fewer than 8 columns are
/// skipped.
pub fn parse_chemicals<R: Read>(reader: R) -> Result<Vec<Chemical>> {
    let mut csv_reader = tsv_reader(reader);
    let mut chemicals = vec![];

    for result in csv_reader.byte_records() {
        let record = result.context("failed to read chemicals file")?;
        let fields = record_fields(&record);

        if fields.len() < MIN_CHEMICAL_COLUMN_COUNT {
            continue;
        }

        chemicals.push(Chemical {
            name: fields[0].to_shared_str(),
            chemical_id: with_mesh_prefix(&fields[1]),
            cas_number: non_empty(&fields[2]),
            definition: non_empty(&fields[3]).map(|definition| definition.to_string()),
            parent_ids: split_list(&fields[4]),
            tree_numbers: split_list(&fields[5]),
            parent_tree_numbers: split_list(&fields[6]),
            synonyms: split_list(&fields[7]),
            terms: vec![],
            match_strategy: None,
        });
    }

    Ok(chemicals)
}

fn log_rejected_summary(rejected_counts: HashMap<String, usize>) {
    let mut rejected: Vec<(String, usize)> = rejected_counts.into_iter().collect();
    // most frequent first
    rejected.sort_by(|(key_a, count_a), (key_b, count_b)| {
        count_b.cmp(count_a).then_with(|| key_a.cmp(key_b))
    });

    debug!(target: "rejected_annots_summary", "CHEMICAL|ID|CAS|ANNOT_COUNT");
    for (key, count) in rejected {
        debug!(target: "rejected_annots_summary", "{}|{}", key, count);
    }
}

/// Read the CTD chemical-gene interactions file, keeping the rows for the
/// configured organisms whose chemical is in chemicals.
pub fn parse_interactions<R: Read>(reader: R,
                                   organisms: &HashMap<OrganismName, ConfigOrganism>,
                                   chemicals: &HashMap<ChemicalId, Arc<Chemical>>,
                                   counters: &mut Counters)
    -> Result<Vec<CtdRecord>>
{
    let mut csv_reader = tsv_reader(reader);
    let mut records = vec![];
    let mut rejected_counts: HashMap<String, usize> = HashMap::new();

    for result in csv_reader.byte_records() {
        let record = result.context("failed to read interactions file")?;
        let fields = record_fields(&record);

        if fields.len() != INTERACTION_COLUMN_COUNT {
            continue;
        }

        let organism_name = fields[6].to_shared_str();

        let Some(organism) = organisms.get(&organism_name)
        else {
            counters.increment(SkipReason::UnsupportedOrganism.counter_name());
            continue;
        };

        if fields[7] != organism.taxonid.to_string() {
            warn!("unexpected organism id {} for {}", fields[7], organism_name);
        }

        let interaction = InteractionRecord {
            chemical_name: fields[0].to_shared_str(),
            chemical_id: with_mesh_prefix(&fields[1]),
            cas_number: non_empty(&fields[2]),
            gene_symbol: fields[3].to_shared_str(),
            external_gene_id: fields[4].trim().to_shared_str(),
            gene_forms: split_list(&fields[5]),
            organism: organism_name.clone(),
            taxonid: organism.taxonid,
            interaction: fields[8].clone(),
            actions: split_list(&fields[9]),
            pubmed_ids: InteractionRecord::normalize_pubmed_ids(&fields[10]),
        };

        let Some(chemical) = chemicals.get(&interaction.chemical_id)
        else {
            counters.increment(SkipReason::ChemicalNotMatched.counter_name());
            debug!(target: "rejected_annots", "{}", interaction.dump("|"));

            let key = format!("{}|{}|{}", interaction.chemical_name, interaction.chemical_id,
                              interaction.cas_number.as_ref().map(|cas| cas.as_str()).unwrap_or(""));
            *rejected_counts.entry(key).or_insert(0) += 1;
            continue;
        };

        counters.increment(format!("INTERACTIONS_FOR_SPECIES {}", organism_name.to_uppercase()));

        records.push(CtdRecord {
            interaction,
            chemical: chemical.clone(),
        });
    }

    log_rejected_summary(rejected_counts);

    counters.add("INTERACTIONS__LOADED", records.len() as u64);

    Ok(records)
}

#[test]
fn test_parse_chemicals() {
    let data = "# Chemicals\n\
                # fields: ...\n\
                Formaldehyde\tMESH:D005557\t50-00-0\tA highly reactive aldehyde\tMESH:D000447\tD02.047.555\tD02.047\tFormalin|Methanal\n\
                Short row\tMESH:D000001\n\
                Caffeine\tD002110\t\t\t\t\t\t\n";

    let chemicals = parse_chemicals(data.as_bytes()).unwrap();
    assert_eq!(chemicals.len(), 2);

    assert_eq!(chemicals[0].chemical_id.as_str(), "MESH:D005557");
    assert_eq!(chemicals[0].cas_number.as_ref().map(|c| c.as_str()), Some("50-00-0"));
    assert_eq!(chemicals[0].synonyms.len(), 2);

    assert_eq!(chemicals[1].chemical_id.as_str(), "MESH:D002110");
    assert!(chemicals[1].cas_number.is_none());
    assert!(chemicals[1].definition.is_none());
}
