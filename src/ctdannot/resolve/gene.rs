use std::sync::Arc;

use anyhow::Result;

use crate::cache::OnceMap;
use crate::data_types::*;
use crate::store::GeneStore;
use crate::types::*;
use crate::utils::eq_ignore_case;

/// Gene lookups shared by all workers of a run.  Each entry is loaded
/// from the store once, concurrent callers for the same key wait for
/// the first load.
#[derive(Default)]
pub struct GeneCaches {
    pub by_external_id: OnceMap<ExternalGeneId, Arc<Vec<Gene>>>,
    // strong orthologs of a gene in rat, mouse and human
    pub triad_homologs: OnceMap<GeneId, Arc<Vec<Gene>>>,
    pub organism_orthologs: OnceMap<(GeneId, OrganismTaxonId), Arc<Vec<Gene>>>,
}

impl GeneCaches {
    pub fn new() -> GeneCaches {
        GeneCaches::default()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MatchKind {
    // exactly one gene for the external id or symbol, in the right organism
    Single,
    // exactly one gene, but in another organism, so its ortholog was used
    Ortholog,
    // several genes for the external id, one with the same symbol
    MultiMatchResolvedBySymbol,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SkipReason {
    NoGeneMatch,
    AmbiguousGeneMatch,
    SpeciesMismatch,
    UnsupportedOrganism,
    ChemicalNotMatched,
}

impl SkipReason {
    pub fn counter_name(&self) -> &'static str {
        match self {
            SkipReason::NoGeneMatch => "NO MATCH BY NCBI GENEID AND BY GENE SYMBOL",
            SkipReason::AmbiguousGeneMatch => "MULTIMATCH",
            SkipReason::SpeciesMismatch => "SPECIES TYPE MIXUP",
            SkipReason::UnsupportedOrganism => "INTERACTION_SKIPPED_UNSUPPORTED_ORGANISM",
            SkipReason::ChemicalNotMatched => "INTERACTION_SKIPPED_CHEMICAL_NOT_MATCHING_CHEBI",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GeneResolution {
    Matched {
        gene: Gene,
        kind: MatchKind,
    },
    Unresolved(SkipReason),
}

pub struct GeneResolver {
    store: Arc<dyn GeneStore>,
    caches: Arc<GeneCaches>,
    xdb_key: XdbKey,
}

impl GeneResolver {
    pub fn new(store: Arc<dyn GeneStore>, caches: Arc<GeneCaches>, xdb_key: XdbKey)
        -> GeneResolver
    {
        GeneResolver {
            store,
            caches,
            xdb_key,
        }
    }

    async fn genes_by_external_id(&self, external_id: &ExternalGeneId) -> Result<Arc<Vec<Gene>>> {
        let (genes, _) = self.caches.by_external_id.get_or_try_init(external_id, || async {
            let genes = self.store.active_genes_by_external_id(self.xdb_key, external_id).await?;
            Ok::<_, anyhow::Error>(Arc::new(genes))
        }).await?;
        Ok(genes)
    }

    async fn triad_homologs(&self, gene_id: GeneId) -> Result<Arc<Vec<Gene>>> {
        let (genes, _) = self.caches.triad_homologs.get_or_try_init(&gene_id, || async {
            let genes = self.store.strong_orthologs_in_triad(gene_id).await?;
            Ok::<_, anyhow::Error>(Arc::new(genes))
        }).await?;
        Ok(genes)
    }

    async fn organism_orthologs(&self, gene_id: GeneId, taxonid: OrganismTaxonId)
        -> Result<Arc<Vec<Gene>>>
    {
        let key = (gene_id, taxonid);
        let (genes, _) = self.caches.organism_orthologs.get_or_try_init(&key, || async {
            let genes = self.store.strong_orthologs(gene_id, taxonid).await?;
            Ok::<_, anyhow::Error>(Arc::new(genes))
        }).await?;
        Ok(genes)
    }

    async fn active_only(&self, genes: Vec<Gene>) -> Result<Vec<Gene>> {
        let mut active_genes = vec![];
        for gene in genes {
            if self.store.is_active(gene.id).await? {
                active_genes.push(gene);
            }
        }
        Ok(active_genes)
    }

    // active genes with the symbol, or failing that with the symbol as an alias
    async fn genes_by_symbol(&self, symbol: &GeneSymbol, taxonid: OrganismTaxonId)
        -> Result<Vec<Gene>>
    {
        let genes = self.store.genes_by_symbol(symbol, taxonid).await?;
        let genes = self.active_only(genes).await?;
        if !genes.is_empty() {
            return Ok(genes);
        }
        let genes = self.store.genes_by_alias(symbol, taxonid).await?;
        self.active_only(genes).await
    }

    /// Find the gene for an interaction row
    pub async fn resolve_gene(&self, external_id: &ExternalGeneId, symbol: &GeneSymbol,
                              taxonid: OrganismTaxonId)
        -> Result<GeneResolution>
    {
        let mut genes = self.genes_by_external_id(external_id).await?.as_ref().clone();

        if genes.is_empty() {
            genes = self.genes_by_symbol(symbol, taxonid).await?;
            if genes.is_empty() {
                info!(target: "no_match", "GENEID={} SYMBOL={} TAXON={}",
                      external_id, symbol, taxonid);
                return Ok(GeneResolution::Unresolved(SkipReason::NoGeneMatch));
            }
        }

        if genes.len() > 1 {
            let mut message = format!("GENEID={} SYMBOL={} TAXON={}", external_id, symbol, taxonid);
            for gene in &genes {
                message.push_str(&format!("\n   GENE_ID={} SYMBOL={}", gene.id, gene.symbol));
            }

            let by_symbol = genes.iter().find(|gene| eq_ignore_case(&gene.symbol, symbol));

            let resolution =
                if let Some(gene) = by_symbol {
                    message.push_str("\n   MULTIMATCH BY NCBI GENEID; SINGLE MATCH BY GENE SYMBOL");
                    GeneResolution::Matched {
                        gene: gene.clone(),
                        kind: MatchKind::MultiMatchResolvedBySymbol,
                    }
                } else {
                    GeneResolution::Unresolved(SkipReason::AmbiguousGeneMatch)
                };

            info!(target: "multi_match", "{}", message);

            return Ok(resolution);
        }

        let gene = genes.remove(0);

        if gene.taxonid == taxonid {
            return Ok(GeneResolution::Matched {
                gene,
                kind: MatchKind::Single,
            });
        }

        // the gene for the external id is in another organism
        match self.ortholog(gene.id, taxonid, symbol).await? {
            Some(ortholog) => Ok(GeneResolution::Matched {
                gene: ortholog,
                kind: MatchKind::Ortholog,
            }),
            None => Ok(GeneResolution::Unresolved(SkipReason::SpeciesMismatch)),
        }
    }

    /// Return the ortholog of gene_id in the organism with taxonid.  Strong
    /// orthologs are preferred.  Otherwise the weak ortholog with the
    /// symbol closest to symbol is returned.
    pub async fn ortholog(&self, gene_id: GeneId, taxonid: OrganismTaxonId, symbol: &GeneSymbol)
        -> Result<Option<Gene>>
    {
        let strong_orthologs =
            if in_reference_triad(taxonid) {
                self.triad_homologs(gene_id).await?
            } else {
                self.organism_orthologs(gene_id, taxonid).await?
            };

        if let Some(ortholog) = strong_orthologs.iter().find(|gene| gene.taxonid == taxonid) {
            return Ok(Some(ortholog.clone()));
        }

        let mut best_match: Option<(usize, Gene)> = None;

        for association in self.store.weak_ortholog_associations(gene_id).await? {
            let Some(gene) = association.detail_gene
            else {
                warn!("gene id is invalid: {}", association.detail_gene_id);
                continue;
            };

            if gene.taxonid != taxonid {
                continue;
            }

            let score = strsim::levenshtein(&gene.symbol, symbol);

            // ties keep the first one seen
            let is_better = match best_match {
                Some((best_score, _)) => score < best_score,
                None => true,
            };
            if is_better {
                best_match = Some((score, gene));
            }
        }

        Ok(best_match.map(|(_, gene)| gene))
    }

    /// The genes that annotations for a matched gene are made for: its
    /// rat, mouse and human strong orthologs, then the gene itself.  Genes
    /// outside rat, mouse and human get no ortholog annotations.
    pub async fn homologs_for_propagation(&self, gene: &Gene) -> Result<Vec<Gene>> {
        let mut homologs: Vec<Gene> =
            if in_reference_triad(gene.taxonid) {
                self.triad_homologs(gene.id).await?.iter()
                    .filter(|homolog| homolog.id != gene.id)
                    .cloned()
                    .collect()
            } else {
                vec![]
            };

        homologs.push(gene.clone());

        Ok(homologs)
    }
}

#[test]
fn test_symbol_distance() {
    assert_eq!(strsim::levenshtein("kitten", "sitting"), 3);
    assert_eq!(strsim::levenshtein("Cyp1a1", "Cyp1a1"), 0);
    assert_eq!(strsim::levenshtein("Cyp1a1", "Cyp1a2"), 1);
    // case matters
    assert_eq!(strsim::levenshtein("Tp53", "TP53"), 1);
}
