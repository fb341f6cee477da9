use crate::{Fetcher, SearchStore, StoreError};
use benchres_core::{flatten, Query};
use std::collections::BTreeSet;
use std::ops::ControlFlow;

/// Sorted union of flattened field names across the first `sample_size`
/// documents matching `query`.
///
/// Fields that only appear after the sample are not seen; callers that
/// write against this header should expect to drop them.
pub async fn discover_fields<S: SearchStore + ?Sized>(
    store: &S,
    query: &Query,
    sample_size: usize,
    page_size: usize,
) -> Result<Vec<String>, StoreError> {
    if sample_size == 0 {
        return Ok(Vec::new());
    }
    let fetcher = Fetcher::new(store, page_size.min(sample_size))?;

    let mut fields = BTreeSet::new();
    let mut sampled = 0;
    fetcher
        .for_each(query, |doc| {
            fields.extend(flatten(&doc).into_keys());
            sampled += 1;
            Ok::<_, StoreError>(if sampled >= sample_size {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            })
        })
        .await?;

    tracing::debug!(sampled, fields = fields.len(), "discovered fields");
    Ok(fields.into_iter().collect())
}
