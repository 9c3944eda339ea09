use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};

use crate::cache::OnceMap;
use crate::config::Config;
use crate::counters::Counters;
use crate::data_types::*;
use crate::reconcile::{BucketReport, Buckets, Reconciler, ReconcileAction};
use crate::resolve::{GeneCaches, GeneResolution, GeneResolver, MatchKind, SkipReason,
                     TermResolver};
use crate::source::{open_reader, parse_chemicals, parse_interactions, CtdRecord};
use crate::store::Stores;
use crate::sweep::{sweep_obsolete, SweepReport};
use crate::synonym::SynonymGuarantor;
use crate::synthesize::{synthesize, AnnotationDefaults};
use crate::types::*;
use crate::workers::run_worker_pool;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RowOutcome {
    Matched(MatchKind),
    Skipped(SkipReason),
}

impl RowOutcome {
    pub fn counter_name(&self) -> &'static str {
        match self {
            RowOutcome::Matched(MatchKind::Single) |
            RowOutcome::Matched(MatchKind::Ortholog) => "SINGLE MATCH",
            RowOutcome::Matched(MatchKind::MultiMatchResolvedBySymbol) =>
                "MULTIMATCH BY NCBI GENEID; SINGLE MATCH BY GENE SYMBOL",
            RowOutcome::Skipped(reason) => reason.counter_name(),
        }
    }
}

/// What processing one interaction row produced.  Rows are processed
/// concurrently and the results are combined by the caller.
#[derive(Clone, Debug)]
pub struct RowResult {
    pub outcome: RowOutcome,
    pub candidates: Vec<AnnotationCandidate>,
    // number of xref_mesh synonyms inserted while processing this row
    pub synonyms_added: u64,
}

/// Turns an interaction row into candidate annotations
pub struct RowProcessor {
    gene_resolver: GeneResolver,
    synonym_guarantor: SynonymGuarantor,
    defaults: AnnotationDefaults,
}

impl RowProcessor {
    pub fn new(gene_resolver: GeneResolver, synonym_guarantor: SynonymGuarantor,
               defaults: AnnotationDefaults)
        -> RowProcessor
    {
        RowProcessor {
            gene_resolver,
            synonym_guarantor,
            defaults,
        }
    }

    pub async fn process(&self, record: &CtdRecord) -> Result<RowResult> {
        let interaction = &record.interaction;
        let terms = &record.chemical.terms;

        let mut synonyms_added = 0;
        for term in terms {
            let had_synonym = self.synonym_guarantor
                .ensure_cross_reference(&term.accession, &interaction.chemical_id).await?;
            if !had_synonym {
                synonyms_added += 1;
            }
        }

        let resolution = self.gene_resolver
            .resolve_gene(&interaction.external_gene_id, &interaction.gene_symbol,
                          interaction.taxonid).await?;

        let (gene, kind) = match resolution {
            GeneResolution::Matched { gene, kind } => (gene, kind),
            GeneResolution::Unresolved(reason) => {
                return Ok(RowResult {
                    outcome: RowOutcome::Skipped(reason),
                    candidates: vec![],
                    synonyms_added,
                });
            }
        };

        let homologs = self.gene_resolver.homologs_for_propagation(&gene).await?;

        let candidates = synthesize(&self.defaults, interaction, &gene, &homologs, terms);

        Ok(RowResult {
            outcome: RowOutcome::Matched(kind),
            candidates,
            synonyms_added,
        })
    }
}

#[derive(Clone, Debug)]
pub struct RunSummary {
    pub counters: Counters,
    pub bucket_reports: Vec<BucketReport>,
    pub sweep: SweepReport,
}

impl RunSummary {
    // number of inserts and updates made to the store
    pub fn write_count(&self) -> usize {
        self.bucket_reports.iter()
            .map(|report| report.decisions.len())
            .sum()
    }
}

pub struct Pipeline {
    config: Config,
    stores: Stores,
    term_resolver: Arc<TermResolver>,
    row_processor: Arc<RowProcessor>,
    gene_caches: Arc<GeneCaches>,
    synonym_cache: Arc<OnceMap<TermAcc, bool>>,
}

impl Pipeline {
    pub fn new(config: Config, stores: Stores) -> Pipeline {
        Pipeline::with_caches(config, stores, Arc::new(GeneCaches::new()),
                              Arc::new(OnceMap::new()))
    }

    pub fn with_caches(config: Config, stores: Stores, gene_caches: Arc<GeneCaches>,
                       synonym_cache: Arc<OnceMap<TermAcc, bool>>)
        -> Pipeline
    {
        let term_resolver =
            Arc::new(TermResolver::new(stores.vocabulary.clone(), &config.vocabulary));
        let gene_resolver =
            GeneResolver::new(stores.genes.clone(), gene_caches.clone(), config.gene_xdb_key);
        let synonym_guarantor =
            SynonymGuarantor::new(stores.vocabulary.clone(), &config.synonym_source,
                                  synonym_cache.clone());
        let row_processor =
            Arc::new(RowProcessor::new(gene_resolver, synonym_guarantor,
                                       AnnotationDefaults::from_config(&config)));

        Pipeline {
            config,
            stores,
            term_resolver,
            row_processor,
            gene_caches,
            synonym_cache,
        }
    }

    async fn count_text_totals(&self, stat_name: &str, counters: &mut Counters) -> Result<()> {
        let totals = self.stores.annotations.text_totals(&self.config.aspect).await?;

        info!("TOTAL_NOTES_LENGTH_{}: {} bytes", stat_name, totals.notes_length);
        info!("TOTAL_XREF_SOURCE_LENGTH_{}: {} bytes", stat_name, totals.xref_source_length);

        counters.add(format!("TOTAL_NOTES_LENGTH_{}", stat_name), totals.notes_length);
        counters.add(format!("TOTAL_XREF_SOURCE_LENGTH_{}", stat_name), totals.xref_source_length);

        Ok(())
    }

    /// Resolve each chemical to vocabulary terms, returning the chemicals
    /// that matched by chemical id
    pub async fn match_chemicals(&self, chemicals: Vec<Chemical>, counters: &mut Counters)
        -> Result<HashMap<ChemicalId, Arc<Chemical>>>
    {
        if chemicals.is_empty() {
            bail!("no chemicals read from the chemicals file");
        }

        let stats = self.term_resolver.preload().await?;
        let vocabulary = &self.config.vocabulary;
        counters.add(format!("{}_TERMS_WITH_CASRN", vocabulary), stats.cas_numbers as u64);
        counters.add(format!("{}_TERMS_CASRN_COUNT", vocabulary), stats.cas_terms as u64);
        counters.add(format!("{}_TERMS_WITH_MESH", vocabulary), stats.mesh_ids as u64);
        counters.add(format!("{}_TERMS_MESH_COUNT", vocabulary), stats.mesh_terms as u64);

        let resolver = self.term_resolver.clone();
        let resolved = run_worker_pool(chemicals, self.config.worker_count, move |chemical| {
            let resolver = resolver.clone();
            async move {
                let term_match = resolver.resolve(&chemical).await?;
                Ok::<_, anyhow::Error>((chemical, term_match))
            }
        }).await?;

        let mut matched = HashMap::new();

        for (mut chemical, term_match) in resolved {
            counters.increment("CHEMICALS_PROCESSED");
            if chemical.cas_number.is_none() {
                counters.increment("CHEMICALS__WITHOUT_CASRN");
            }

            let Some(term_match) = term_match
            else {
                counters.increment("CHEMICALS__IGNORED_NOT_MATCH");
                continue;
            };

            let counter_name = match term_match.strategy {
                MatchStrategy::CasNumber => "CHEMICALS__LOADED_MATCH_BY_CASRN",
                MatchStrategy::ExternalId => "CHEMICALS__LOADED_MATCH_BY_MESH",
                MatchStrategy::Name => "CHEMICALS__LOADED_MATCH_BY_TERMNAME",
            };
            counters.increment(counter_name);

            chemical.terms = term_match.terms;
            chemical.match_strategy = Some(term_match.strategy);

            matched.insert(chemical.chemical_id.clone(), Arc::new(chemical));
        }

        Ok(matched)
    }

    /// Read both CTD files and bring the store in sync with them
    pub async fn run(&self, chemicals_file_name: &str, interactions_file_name: &str)
        -> Result<RunSummary>
    {
        let run_start = Utc::now();
        let mut counters = Counters::new();

        self.count_text_totals("AT_BEGIN", &mut counters).await?;

        let chemicals = parse_chemicals(open_reader(chemicals_file_name)?)?;
        info!("read {} chemicals from {}", chemicals.len(), chemicals_file_name);

        let chemicals = self.match_chemicals(chemicals, &mut counters).await?;

        let records = parse_interactions(open_reader(interactions_file_name)?,
                                         &self.config.organisms_by_name(),
                                         &chemicals, &mut counters)?;
        info!("read {} interactions from {}", records.len(), interactions_file_name);

        self.process_records(run_start, records, counters).await
    }

    fn count_bucket_report(&self, report: &BucketReport, counters: &mut Counters) {
        if report.overflow > 0 {
            counters.add("XREF_SOURCE_OVERFLOW", report.overflow as u64);
        }

        for decision in &report.decisions {
            let evidence = decision.evidence.code();
            let organism = self.config.organism_counter_name(decision.taxonid);

            match decision.action {
                ReconcileAction::Insert => {
                    counters.increment(format!("ANNOTATIONS_{}_INSERTED", evidence));
                    counters.increment(format!("ANNOTATIONS_{}_INSERTED", organism));
                },
                ReconcileAction::RefreshTimestamp | ReconcileAction::UpdateText => {
                    counters.increment(format!("ANNOTATIONS_{}_MATCHED", evidence));
                    counters.increment(format!("ANNOTATIONS_{}_MATCHED", organism));
                    if decision.action == ReconcileAction::RefreshTimestamp {
                        counters.increment("ANNOTATIONS_UPDATED_TIME");
                    } else {
                        counters.increment("ANNOTATIONS_UPDATED_TIME_NOTES_XREFSRC");
                    }
                },
            }
        }
    }

    /// Make annotations from the records and reconcile them with the
    /// store, then remove the annotations of this pipeline that were not
    /// touched since run_start.
    pub async fn process_records(&self, run_start: DateTime<Utc>, records: Vec<CtdRecord>,
                                 mut counters: Counters)
        -> Result<RunSummary>
    {
        let processor = self.row_processor.clone();
        let row_results = run_worker_pool(records, self.config.worker_count, move |record| {
            let processor = processor.clone();
            async move { processor.process(&record).await }
        }).await?;

        debug!("cached genes for {} NCBI gene ids and homologs of {} genes, \
                checked {} terms for MeSH synonyms",
               self.gene_caches.by_external_id.len(), self.gene_caches.triad_homologs.len(),
               self.synonym_cache.len());

        let mut buckets = Buckets::new();

        for row_result in row_results {
            counters.increment(row_result.outcome.counter_name());
            if row_result.synonyms_added > 0 {
                counters.add("XREF_MESH_SYNONYMS_ADDED", row_result.synonyms_added);
            }
            buckets.extend(row_result.candidates);
        }

        debug!("{} candidate annotations in {} buckets",
               buckets.candidate_count(), buckets.len());

        if buckets.is_empty() {
            warn!("no annotations were made from the interactions");
        }

        let reconciler = Reconciler::new(self.stores.annotations.clone(),
                                         self.config.max_xref_source_length,
                                         self.config.worker_count);
        let bucket_reports = reconciler.reconcile(buckets).await?;

        for report in &bucket_reports {
            self.count_bucket_report(report, &mut counters);
        }

        let sweep = sweep_obsolete(self.stores.annotations.as_ref(), self.config.owner,
                                   run_start, self.config.obsolete_annotation_limit).await?;

        if sweep.aborted {
            counters.add("OBSOLETE_ANNOTATIONS", sweep.obsolete_count as u64);
        } else {
            for (evidence, count) in &sweep.deleted_by_evidence {
                counters.add(format!("ANNOTATIONS_{}_DELETED", evidence), *count as u64);
            }
        }

        self.count_text_totals("AT_FINISH", &mut counters).await?;

        info!("\n{}", counters.dump_alphabetically());

        Ok(RunSummary {
            counters,
            bucket_reports,
            sweep,
        })
    }
}
