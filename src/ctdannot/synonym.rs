use std::sync::Arc;

use anyhow::{Context, Result};
use flexstr::SharedStr as FlexStr;

use crate::cache::OnceMap;
use crate::data_types::*;
use crate::store::VocabularyStore;
use crate::types::*;

/// Makes sure that each term a chemical resolved to has an xref_mesh
/// synonym.  The check is done once per term per run.
pub struct SynonymGuarantor {
    store: Arc<dyn VocabularyStore>,
    source: FlexStr,
    // term accession -> true if the term had an xref_mesh synonym before
    // this run
    checked_terms: Arc<OnceMap<TermAcc, bool>>,
}

impl SynonymGuarantor {
    pub fn new(store: Arc<dyn VocabularyStore>, source: &FlexStr,
               checked_terms: Arc<OnceMap<TermAcc, bool>>)
        -> SynonymGuarantor
    {
        SynonymGuarantor {
            store,
            source: source.clone(),
            checked_terms,
        }
    }

    /// Returns true if the term already had an xref_mesh synonym.  Returns
    /// false if a synonym with external_id was inserted by this call.  For
    /// concurrent calls with the same term only one inserts.
    pub async fn ensure_cross_reference(&self, term_acc: &TermAcc, external_id: &ChemicalId)
        -> Result<bool>
    {
        let (had_synonym, checked_here) =
            self.checked_terms.get_or_try_init(term_acc, || async {
                let synonyms = self.store.synonyms_of(term_acc).await
                    .with_context(|| format!("failed to read synonyms of {}", term_acc))?;

                let has_mesh_synonym = synonyms.iter()
                    .any(|synonym| synonym.synonym_type.as_str() == XREF_MESH_SYNONYM_TYPE);

                if !has_mesh_synonym {
                    let synonym = Synonym {
                        term_acc: term_acc.clone(),
                        synonym_type: XREF_MESH_SYNONYM_TYPE.into(),
                        name: external_id.clone(),
                        source: Some(self.source.clone()),
                    };
                    self.store.insert_synonym(&synonym).await?;
                    info!(target: "inserted_synonyms", "{}", synonym.dump("|"));
                }

                Ok::<_, anyhow::Error>(has_mesh_synonym)
            }).await?;

        Ok(had_synonym || !checked_here)
    }
}

#[tokio::test]
async fn test_ensure_cross_reference() {
    use crate::store::memory::MemoryStore;

    let store = Arc::new(MemoryStore::new());
    store.add_term("CHEBI", "CHEBI:16842", "formaldehyde", false);
    store.add_term("CHEBI", "CHEBI:27732", "caffeine", false);
    store.add_synonym("CHEBI:27732", XREF_MESH_SYNONYM_TYPE, "MESH:D002110");

    let guarantor = SynonymGuarantor::new(store.clone(), &"CTDChemDrug".into(),
                                          Arc::new(OnceMap::new()));

    let formaldehyde: TermAcc = "CHEBI:16842".into();
    let mesh_id: ChemicalId = "MESH:D005557".into();

    assert!(!guarantor.ensure_cross_reference(&formaldehyde, &mesh_id).await.unwrap());
    assert!(guarantor.ensure_cross_reference(&formaldehyde, &mesh_id).await.unwrap());
    assert!(guarantor.ensure_cross_reference(&"CHEBI:27732".into(), &"MESH:D002110".into())
            .await.unwrap());

    let synonyms = store.synonyms("CHEBI:16842");
    assert_eq!(synonyms.len(), 1);
    assert_eq!(synonyms[0].name.as_str(), "MESH:D005557");
    assert_eq!(synonyms[0].source.as_ref().map(|s| s.as_str()), Some("CTDChemDrug"));
    assert_eq!(store.synonym_inserts(), 1);
    // each term is only looked up once
    assert_eq!(store.synonym_lookups(), 2);
}
