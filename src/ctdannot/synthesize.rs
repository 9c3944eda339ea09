use flexstr::{SharedStr as FlexStr, shared_fmt as flex_fmt};

use crate::config::Config;
use crate::data_types::*;
use crate::types::*;

/// The fields that are the same for every annotation made in a run
#[derive(Clone, Debug)]
pub struct AnnotationDefaults {
    pub aspect: Aspect,
    pub owner: OwnerId,
    pub data_source: DataSource,
    pub reference_id: Option<ReferenceId>,
    pub with_info_prefix: FlexStr,
}

impl AnnotationDefaults {
    pub fn from_config(config: &Config) -> AnnotationDefaults {
        AnnotationDefaults {
            aspect: config.aspect.clone(),
            owner: config.owner,
            data_source: config.data_source.clone(),
            reference_id: config.reference_id,
            with_info_prefix: config.with_info_prefix.clone(),
        }
    }
}

/// "increases^expression" -> "increases expression", several actions ->
/// "multiple interactions", no actions -> None
pub fn qualifier_from_actions(actions: &[FlexStr]) -> Option<Qualifier> {
    match actions {
        [] => None,
        [action] => Some(action.replace('^', " ").into()),
        _ => Some(MULTIPLE_INTERACTIONS_QUALIFIER.into()),
    }
}

/// Make one candidate annotation for each term and each gene in homologs.
/// source_gene is the gene that matched the interaction; annotations of
/// other genes are inferred from it.
pub fn synthesize(defaults: &AnnotationDefaults, interaction: &InteractionRecord,
                  source_gene: &Gene, homologs: &[Gene], terms: &[TermRef])
    -> Vec<AnnotationCandidate>
{
    let qualifier = qualifier_from_actions(&interaction.actions);

    let mut candidates = vec![];

    for term in terms {
        for gene in homologs {
            let (evidence, with_info) =
                if gene.id == source_gene.id {
                    (EvidenceClass::Direct, None)
                } else {
                    (EvidenceClass::Inferred,
                     Some(flex_fmt!("{}{}", defaults.with_info_prefix, source_gene.id)))
                };

            candidates.push(AnnotationCandidate {
                term: term.clone(),
                gene_id: gene.id,
                gene_symbol: gene.symbol.clone(),
                gene_name: gene.name.clone(),
                taxonid: gene.taxonid,
                evidence,
                notes: interaction.interaction.clone(),
                xref_source: interaction.pubmed_ids.clone(),
                qualifier: qualifier.clone(),
                with_info,
                aspect: defaults.aspect.clone(),
                owner: defaults.owner,
                data_source: defaults.data_source.clone(),
                reference_id: defaults.reference_id,
            });
        }
    }

    candidates
}

#[cfg(test)]
fn test_gene(id: GeneId, symbol: &'static str, taxonid: OrganismTaxonId) -> Gene {
    Gene {
        id,
        symbol: symbol.into(),
        name: None,
        taxonid,
        active: true,
    }
}

#[test]
fn test_qualifier_from_actions() {
    assert_eq!(qualifier_from_actions(&[]), None);
    assert_eq!(qualifier_from_actions(&["increases^expression".into()]),
               Some("increases expression".into()));
    assert_eq!(qualifier_from_actions(&["increases^expression".into(),
                                        "affects^binding".into()]),
               Some(MULTIPLE_INTERACTIONS_QUALIFIER.into()));
}

#[test]
fn test_synthesize() {
    let defaults = AnnotationDefaults {
        aspect: "E".into(),
        owner: 192,
        data_source: "CTD".into(),
        reference_id: Some(7421),
        with_info_prefix: "RGD:".into(),
    };
    let interaction = InteractionRecord {
        chemical_name: "Formaldehyde".into(),
        chemical_id: "MESH:D005557".into(),
        cas_number: Some("50-00-0".into()),
        gene_symbol: "CYP1A1".into(),
        external_gene_id: "1543".into(),
        gene_forms: vec!["mRNA".into()],
        organism: "Homo sapiens".into(),
        taxonid: HUMAN_TAXONID,
        interaction: "Formaldehyde results in increased expression of CYP1A1 mRNA".into(),
        actions: vec!["increases^expression".into()],
        pubmed_ids: "PMID:1|PMID:2".into(),
    };
    let human = test_gene(11, "CYP1A1", HUMAN_TAXONID);
    let rat = test_gene(2458, "Cyp1a1", RAT_TAXONID);
    let terms = vec![
        TermRef { accession: "CHEBI:16842".into(), name: "formaldehyde".into() },
        TermRef { accession: "CHEBI:16842x".into(), name: "formaldehyde x".into() },
    ];

    let candidates = synthesize(&defaults, &interaction, &human,
                                &[rat.clone(), human.clone()], &terms);

    assert_eq!(candidates.len(), 4);

    let direct: Vec<_> = candidates.iter()
        .filter(|c| c.evidence == EvidenceClass::Direct)
        .collect();
    assert_eq!(direct.len(), 2);
    assert!(direct.iter().all(|c| c.gene_id == 11 && c.with_info.is_none()));

    let inferred: Vec<_> = candidates.iter()
        .filter(|c| c.evidence == EvidenceClass::Inferred)
        .collect();
    assert_eq!(inferred.len(), 2);
    assert!(inferred.iter().all(|c| c.gene_id == 2458 &&
                                c.with_info.as_ref().map(|w| w.as_str()) == Some("RGD:11")));

    assert_eq!(candidates[0].qualifier.as_ref().map(|q| q.as_str()), Some("increases expression"));
    assert_eq!(candidates[0].xref_source, "PMID:1|PMID:2");
}
