use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_postgres::{Client, Manager, Pool};
use flexstr::{SharedStr as FlexStr, ToSharedStr};
use tokio_postgres::Row;

use crate::data_types::*;
use crate::store::*;

const ACTIVE_STATUS: &str = "ACTIVE";
const WEAK_ORTHOLOG_ASSOC_TYPE: &str = "weak_ortholog";
// RGD object key of genes
const GENE_OBJECT_KEY: i32 = 1;

const GENE_SELECT: &str =
    "SELECT g.rgd_id, g.gene_symbol, g.full_name, s.taxonomic_id, r.object_status
       FROM genes g
       JOIN rgd_ids r ON r.rgd_id = g.rgd_id
       JOIN species_types s ON s.species_type_key = r.species_type_key";

const ANNOTATION_SELECT: &str =
    "SELECT full_annot_key, term_acc, annotated_object_rgd_id, ref_rgd_id, evidence,
            with_info, qualifier, notes, xref_source, aspect, last_modified_by,
            last_modified_date
       FROM full_annot";

fn gene_from_row(row: &Row) -> Gene {
    let taxonid: i32 = row.get(3);
    let status: String = row.get(4);
    Gene {
        id: row.get(0),
        symbol: row.get::<_, String>(1).to_shared_str(),
        name: row.get::<_, Option<String>>(2).map(|name| name.to_shared_str()),
        taxonid: taxonid as OrganismTaxonId,
        active: status == ACTIVE_STATUS,
    }
}

fn annotation_from_row(row: &Row) -> PersistedAnnotation {
    PersistedAnnotation {
        key: row.get(0),
        term_acc: row.get::<_, String>(1).to_shared_str(),
        gene_id: row.get(2),
        reference_id: row.get(3),
        evidence: row.get::<_, String>(4).to_shared_str(),
        with_info: row.get::<_, Option<String>>(5).map(|s| s.to_shared_str()),
        qualifier: row.get::<_, Option<String>>(6).map(|s| s.to_shared_str()),
        notes: row.get::<_, Option<String>>(7).unwrap_or_default(),
        xref_source: row.get::<_, Option<String>>(8).unwrap_or_default(),
        aspect: row.get::<_, String>(9).to_shared_str(),
        owner: row.get(10),
        last_modified: row.get(11),
    }
}

/// Implements the store traits against an RGD-style PostgreSQL schema
pub struct PgStore {
    pool: Pool,
}

impl PgStore {
    pub fn new(pool: Pool) -> PgStore {
        PgStore {
            pool,
        }
    }

    pub fn connect(connection_string: &str, max_size: usize) -> Result<PgStore> {
        let pg_config = tokio_postgres::Config::from_str(connection_string)
            .context("failed to parse PostgreSQL connection string")?;
        let manager = Manager::new(pg_config, tokio_postgres::NoTls);
        let pool = Pool::builder(manager).max_size(max_size).build()
            .map_err(|err| anyhow!("failed to create connection pool: {}", err))?;

        Ok(PgStore::new(pool))
    }

    async fn client(&self) -> Result<Client> {
        self.pool.get().await
            .context("failed to get a database connection")
    }

    async fn query_genes(&self, sql: &str, params: &[&(dyn tokio_postgres::types::ToSql + Sync)])
        -> Result<Vec<Gene>>
    {
        let conn = self.client().await?;
        let rows = conn.query(sql, params).await
            .with_context(|| format!("gene query failed: {}", sql))?;
        Ok(rows.iter().map(gene_from_row).collect())
    }
}

#[async_trait]
impl VocabularyStore for PgStore {
    async fn active_terms(&self, vocabulary: &VocabularyName) -> Result<Vec<TermRef>> {
        let conn = self.client().await?;
        let rows = conn.query("SELECT term_acc, term FROM ont_terms
                                WHERE ont_id = $1 AND is_obsolete = 0",
                              &[&vocabulary.as_str()]).await
            .with_context(|| format!("failed to read terms of {}", vocabulary))?;

        Ok(rows.iter()
           .map(|row| TermRef {
               accession: row.get::<_, String>(0).to_shared_str(),
               name: row.get::<_, String>(1).to_shared_str(),
           })
           .collect())
    }

    async fn term_by_accession(&self, term_acc: &TermAcc) -> Result<Option<TermRef>> {
        let conn = self.client().await?;
        let row = conn.query_opt("SELECT term_acc, term FROM ont_terms WHERE term_acc = $1",
                                 &[&term_acc.as_str()]).await
            .with_context(|| format!("failed to read term {}", term_acc))?;

        Ok(row.map(|row| TermRef {
            accession: row.get::<_, String>(0).to_shared_str(),
            name: row.get::<_, String>(1).to_shared_str(),
        }))
    }

    async fn synonyms_of(&self, term_acc: &TermAcc) -> Result<Vec<Synonym>> {
        let conn = self.client().await?;
        let rows = conn.query("SELECT term_acc, synonym_type, synonym_name, source
                                 FROM ont_synonyms WHERE term_acc = $1",
                              &[&term_acc.as_str()]).await
            .with_context(|| format!("failed to read synonyms of {}", term_acc))?;

        Ok(rows.iter()
           .map(|row| Synonym {
               term_acc: row.get::<_, String>(0).to_shared_str(),
               synonym_type: row.get::<_, String>(1).to_shared_str(),
               name: row.get::<_, String>(2).to_shared_str(),
               source: row.get::<_, Option<String>>(3).map(|s| s.to_shared_str()),
           })
           .collect())
    }

    async fn insert_synonym(&self, synonym: &Synonym) -> Result<()> {
        let conn = self.client().await?;
        let source = synonym.source.as_ref().map(|s| s.as_str());
        conn.execute("INSERT INTO ont_synonyms
                        (term_acc, synonym_type, synonym_name, source, created_date, last_modified_date)
                      VALUES ($1, $2, $3, $4, now(), now())",
                     &[&synonym.term_acc.as_str(), &synonym.synonym_type.as_str(),
                       &synonym.name.as_str(), &source]).await
            .with_context(|| format!("failed to insert synonym {}", synonym.dump("|")))?;
        Ok(())
    }

    async fn xref_synonyms(&self, vocabulary: &VocabularyName, synonym_type: &str,
                           value_prefix: &str)
        -> Result<Vec<(TermAcc, FlexStr)>>
    {
        let conn = self.client().await?;
        let pattern = format!("{}%", value_prefix);
        let rows = conn.query("SELECT DISTINCT s.term_acc, s.synonym_name
                                 FROM ont_synonyms s
                                WHERE s.synonym_type = $1 AND s.synonym_name LIKE $2
                                  AND EXISTS (SELECT 1 FROM ont_terms t
                                               WHERE t.term_acc = s.term_acc
                                                 AND t.is_obsolete = 0 AND t.ont_id = $3)
                                ORDER BY s.term_acc, s.synonym_name",
                              &[&synonym_type, &pattern, &vocabulary.as_str()]).await
            .with_context(|| format!("failed to read {} synonyms of {}", synonym_type, vocabulary))?;

        Ok(rows.iter()
           .map(|row| (row.get::<_, String>(0).to_shared_str(),
                       row.get::<_, String>(1).to_shared_str()))
           .collect())
    }
}

#[async_trait]
impl GeneStore for PgStore {
    async fn active_genes_by_external_id(&self, xdb_key: XdbKey, external_id: &ExternalGeneId)
        -> Result<Vec<Gene>>
    {
        let sql = format!("{} JOIN rgd_acc_xdb x ON x.rgd_id = g.rgd_id
                           WHERE x.xdb_key = $1 AND x.acc_id = $2 AND r.object_status = $3
                           ORDER BY g.rgd_id", GENE_SELECT);
        self.query_genes(&sql, &[&xdb_key, &external_id.as_str(), &ACTIVE_STATUS]).await
    }

    async fn genes_by_symbol(&self, symbol: &GeneSymbol, taxonid: OrganismTaxonId)
        -> Result<Vec<Gene>>
    {
        let sql = format!("{} WHERE LOWER(g.gene_symbol) = LOWER($1) AND s.taxonomic_id = $2
                           ORDER BY g.rgd_id", GENE_SELECT);
        self.query_genes(&sql, &[&symbol.as_str(), &(taxonid as i32)]).await
    }

    async fn genes_by_alias(&self, alias: &GeneSymbol, taxonid: OrganismTaxonId)
        -> Result<Vec<Gene>>
    {
        let sql = format!("{} JOIN aliases a ON a.rgd_id = g.rgd_id
                           WHERE LOWER(a.alias_value) = LOWER($1) AND s.taxonomic_id = $2
                           ORDER BY g.rgd_id", GENE_SELECT);
        self.query_genes(&sql, &[&alias.as_str(), &(taxonid as i32)]).await
    }

    async fn strong_orthologs_in_triad(&self, gene_id: GeneId) -> Result<Vec<Gene>> {
        let triad: Vec<i32> = REFERENCE_TRIAD.iter().map(|taxonid| *taxonid as i32).collect();
        let sql = format!("{} JOIN genetogene_rgd_id_rlt o ON o.dest_rgd_id = g.rgd_id
                           WHERE o.src_rgd_id = $1 AND r.object_status = $2
                             AND s.taxonomic_id = ANY($3)
                           ORDER BY g.rgd_id", GENE_SELECT);
        self.query_genes(&sql, &[&gene_id, &ACTIVE_STATUS, &triad]).await
    }

    async fn strong_orthologs(&self, gene_id: GeneId, taxonid: OrganismTaxonId)
        -> Result<Vec<Gene>>
    {
        let sql = format!("{} JOIN genetogene_rgd_id_rlt o ON o.dest_rgd_id = g.rgd_id
                           WHERE o.src_rgd_id = $1 AND r.object_status = $2
                             AND s.taxonomic_id = $3
                           ORDER BY g.rgd_id", GENE_SELECT);
        self.query_genes(&sql, &[&gene_id, &ACTIVE_STATUS, &(taxonid as i32)]).await
    }

    async fn weak_ortholog_associations(&self, gene_id: GeneId)
        -> Result<Vec<OrthologAssociation>>
    {
        let conn = self.client().await?;
        let rows = conn.query("SELECT a.detail_rgd_id, g.rgd_id, g.gene_symbol, g.full_name,
                                      s.taxonomic_id, r.object_status
                                 FROM rgd_associations a
                                 LEFT JOIN genes g ON g.rgd_id = a.detail_rgd_id
                                 LEFT JOIN rgd_ids r ON r.rgd_id = g.rgd_id
                                 LEFT JOIN species_types s ON s.species_type_key = r.species_type_key
                                WHERE a.master_rgd_id = $1 AND a.assoc_type = $2
                                ORDER BY a.detail_rgd_id",
                              &[&gene_id, &WEAK_ORTHOLOG_ASSOC_TYPE]).await
            .with_context(|| format!("failed to read weak orthologs of {}", gene_id))?;

        let mut associations = vec![];
        for row in &rows {
            let detail_gene_id: i32 = row.get(0);
            let found_gene_id: Option<i32> = row.get(1);
            let taxonid: Option<i32> = row.get(4);

            let detail_gene =
                match (found_gene_id, taxonid) {
                    (Some(id), Some(taxonid)) => {
                        let status: Option<String> = row.get(5);
                        Some(Gene {
                            id,
                            symbol: row.get::<_, String>(2).to_shared_str(),
                            name: row.get::<_, Option<String>>(3).map(|s| s.to_shared_str()),
                            taxonid: taxonid as OrganismTaxonId,
                            active: status.as_deref() == Some(ACTIVE_STATUS),
                        })
                    },
                    _ => None,
                };

            associations.push(OrthologAssociation {
                detail_gene_id,
                detail_gene,
            });
        }

        Ok(associations)
    }

    async fn is_active(&self, gene_id: GeneId) -> Result<bool> {
        let conn = self.client().await?;
        let row = conn.query_opt("SELECT object_status FROM rgd_ids WHERE rgd_id = $1",
                                 &[&gene_id]).await
            .with_context(|| format!("failed to read status of {}", gene_id))?;

        Ok(row.map(|row| row.get::<_, String>(0) == ACTIVE_STATUS).unwrap_or(false))
    }
}

#[async_trait]
impl AnnotationStore for PgStore {
    async fn find(&self, key: &SemanticKey) -> Result<Vec<PersistedAnnotation>> {
        let conn = self.client().await?;
        let sql = format!("{} WHERE term_acc = $1 AND annotated_object_rgd_id = $2 AND evidence = $3
                                AND COALESCE(ref_rgd_id, 0) = COALESCE($4, 0)
                                AND COALESCE(with_info, '*') = COALESCE($5, '*')
                                AND COALESCE(qualifier, '*') = COALESCE($6, '*')
                              ORDER BY full_annot_key", ANNOTATION_SELECT);
        let with_info = key.with_info.as_ref().map(|s| s.as_str());
        let qualifier = key.qualifier.as_ref().map(|s| s.as_str());
        let rows = conn.query(&sql, &[&key.term_acc.as_str(), &key.gene_id, &key.evidence.code(),
                                      &key.reference_id, &with_info, &qualifier]).await
            .with_context(|| format!("failed to find annotations for {}", key))?;

        Ok(rows.iter().map(annotation_from_row).collect())
    }

    async fn insert(&self, candidate: &AnnotationCandidate) -> Result<AnnotationKey> {
        let conn = self.client().await?;
        let gene_name = candidate.gene_name.as_ref().map(|s| s.as_str());
        let with_info = candidate.with_info.as_ref().map(|s| s.as_str());
        let qualifier = candidate.qualifier.as_ref().map(|s| s.as_str());

        let row = conn.query_one(
            "INSERT INTO full_annot
               (term_acc, term, annotated_object_rgd_id, rgd_object_key, data_src,
                object_symbol, object_name, ref_rgd_id, evidence, with_info, aspect,
                qualifier, notes, xref_source, created_by, last_modified_by,
                created_date, last_modified_date)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $15,
                     now(), now())
             RETURNING full_annot_key",
            &[&candidate.term.accession.as_str(), &candidate.term.name.as_str(),
              &candidate.gene_id, &GENE_OBJECT_KEY, &candidate.data_source.as_str(),
              &candidate.gene_symbol.as_str(), &gene_name, &candidate.reference_id,
              &candidate.evidence.code(), &with_info, &candidate.aspect.as_str(),
              &qualifier, &candidate.notes, &candidate.xref_source, &candidate.owner]).await
            .with_context(|| format!("failed to insert annotation {}", candidate.dump("|")))?;

        Ok(row.get(0))
    }

    async fn update_text(&self, key: AnnotationKey, notes: &str, xref_source: &str) -> Result<()> {
        let conn = self.client().await?;
        conn.execute("UPDATE full_annot SET xref_source = $1, notes = $2, last_modified_date = now()
                       WHERE full_annot_key = $3",
                     &[&xref_source, &notes, &key]).await
            .with_context(|| format!("failed to update annotation {}", key))?;
        Ok(())
    }

    async fn touch_timestamp(&self, key: AnnotationKey) -> Result<()> {
        let conn = self.client().await?;
        conn.execute("UPDATE full_annot SET last_modified_date = now() WHERE full_annot_key = $1",
                     &[&key]).await
            .with_context(|| format!("failed to update timestamp of annotation {}", key))?;
        Ok(())
    }

    async fn find_modified_before(&self, owner: OwnerId, timestamp: DateTime<Utc>)
        -> Result<Vec<PersistedAnnotation>>
    {
        let conn = self.client().await?;
        let sql = format!("{} WHERE last_modified_by = $1 AND last_modified_date < $2
                              ORDER BY full_annot_key", ANNOTATION_SELECT);
        let rows = conn.query(&sql, &[&owner, &timestamp]).await
            .context("failed to read annotations not modified in this run")?;

        Ok(rows.iter().map(annotation_from_row).collect())
    }

    async fn delete(&self, keys: &[AnnotationKey]) -> Result<usize> {
        if keys.is_empty() {
            return Ok(0);
        }
        let conn = self.client().await?;
        let count = conn.execute("DELETE FROM full_annot WHERE full_annot_key = ANY($1)",
                                 &[&keys]).await
            .context("failed to delete annotations")?;
        Ok(count as usize)
    }

    async fn text_totals(&self, aspect: &Aspect) -> Result<TextTotals> {
        let conn = self.client().await?;
        let row = conn.query_one("SELECT COALESCE(SUM(LENGTH(notes)), 0)::bigint,
                                         COALESCE(SUM(LENGTH(xref_source)), 0)::bigint
                                    FROM full_annot WHERE aspect = $1",
                                 &[&aspect.as_str()]).await
            .with_context(|| format!("failed to read text totals for aspect {}", aspect))?;

        let notes_length: i64 = row.get(0);
        let xref_source_length: i64 = row.get(1);

        Ok(TextTotals {
            notes_length: notes_length as u64,
            xref_source_length: xref_source_length as u64,
        })
    }
}
