use std::collections::BTreeMap;

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::data_types::*;
use crate::store::AnnotationStore;
use crate::types::*;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    // annotations of this owner not touched since the run started
    pub obsolete_count: usize,
    pub deleted_count: usize,
    // true if obsolete_count was over the limit so nothing was deleted
    pub aborted: bool,
    // evidence code -> number of annotations deleted
    pub deleted_by_evidence: BTreeMap<String, usize>,
}

/// Delete the annotations of owner that were not inserted or updated
/// since run_start, unless there are more than obsolete_annotation_limit
/// of them.
pub async fn sweep_obsolete(store: &dyn AnnotationStore, owner: OwnerId,
                            run_start: DateTime<Utc>, obsolete_annotation_limit: usize)
    -> Result<SweepReport>
{
    let obsolete_annotations = store.find_modified_before(owner, run_start).await?;
    let obsolete_count = obsolete_annotations.len();

    if obsolete_count > obsolete_annotation_limit {
        warn!("*******************************\n\
               There are more obsolete annotations ({}) than the delete limit of {}; \
               DELETE ABORTED!\n\
               *******************************",
              obsolete_count, obsolete_annotation_limit);

        return Ok(SweepReport {
            obsolete_count,
            aborted: true,
            ..SweepReport::default()
        });
    }

    let mut deleted_by_evidence = BTreeMap::new();

    for annotation in &obsolete_annotations {
        info!(target: "deleted_annots", "DELETE {}", annotation.dump("|"));
        *deleted_by_evidence.entry(annotation.evidence.to_string()).or_insert(0) += 1;
    }

    let keys: Vec<AnnotationKey> = obsolete_annotations.iter()
        .map(|annotation| annotation.key)
        .collect();

    let deleted_count = store.delete(&keys).await?;

    Ok(SweepReport {
        obsolete_count,
        deleted_count,
        aborted: false,
        deleted_by_evidence,
    })
}
