use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;

use anyhow::{Context, Result};
use flexstr::{SharedStr as FlexStr, shared_fmt as flex_fmt};
use serde::Deserialize;

use crate::types::*;

#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ConfigOrganism {
    pub taxonid: OrganismTaxonId,
    // as used in the Organism column of the interactions file,
    // eg. "Rattus norvegicus"
    pub scientific_name: OrganismName,
    // eg. "rat", used in counter names
    pub common_name: OrganismName,
}

fn default_with_info_prefix() -> FlexStr {
    "RGD:".into()
}

fn default_worker_count() -> usize {
    8
}

#[derive(Deserialize, Clone, Debug)]
pub struct Config {
    pub version: String,
    // the ontology that chemicals are matched against, eg. "CHEBI"
    pub vocabulary: VocabularyName,
    pub aspect: Aspect,
    // annotations created by this pipeline have this owner; the obsolete
    // annotation sweep only looks at annotations with this owner
    pub owner: OwnerId,
    pub data_source: DataSource,
    #[serde(default)]
    pub reference_id: Option<ReferenceId>,
    // external database key of NCBI Gene ids
    pub gene_xdb_key: XdbKey,
    #[serde(default = "default_with_info_prefix")]
    pub with_info_prefix: FlexStr,
    // source tag of inserted xref_mesh synonyms
    pub synonym_source: FlexStr,
    pub max_xref_source_length: usize,
    pub obsolete_annotation_limit: usize,
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    pub organisms: Vec<ConfigOrganism>,
}

impl Config {
    pub fn read(config_file_name: &str) -> Result<Config> {
        let file = File::open(config_file_name)
            .with_context(|| format!("failed to read {}", config_file_name))?;
        let reader = BufReader::new(file);

        serde_json::from_reader(reader)
            .with_context(|| format!("failed to parse {}", config_file_name))
    }

    pub fn organism_by_name(&self, scientific_name: &str) -> Option<&ConfigOrganism> {
        self.organisms.iter()
            .find(|organism| organism.scientific_name.as_str() == scientific_name)
    }

    pub fn organisms_by_name(&self) -> HashMap<OrganismName, ConfigOrganism> {
        self.organisms.iter()
            .map(|organism| (organism.scientific_name.clone(), organism.clone()))
            .collect()
    }

    // upper case name for use in counters, eg. "RAT"
    pub fn organism_counter_name(&self, taxonid: OrganismTaxonId) -> FlexStr {
        if let Some(organism) = self.organisms.iter().find(|o| o.taxonid == taxonid) {
            organism.common_name.as_str().to_uppercase().into()
        } else {
            flex_fmt!("TAXON {}", taxonid)
        }
    }
}
