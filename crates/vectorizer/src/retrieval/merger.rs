//! Merging per-query-text result sets into one ranked list

use std::collections::HashSet;

use crate::types::QueryResult;

/// Flattens, deduplicates and ranks query results
pub struct QueryMerger;

impl QueryMerger {
    /// Merge result sets in the order given.
    ///
    /// The first occurrence of each `scoped_id` wins, the survivors are sorted
    /// by ascending distance (stable, so equal distances keep first-seen
    /// order) and at most `top_k` are returned.
    pub fn merge(result_sets: Vec<Vec<QueryResult>>, top_k: usize) -> Vec<QueryResult> {
        let mut seen = HashSet::new();
        let mut merged: Vec<QueryResult> = result_sets
            .into_iter()
            .flatten()
            .filter(|result| seen.insert(result.scoped_id.clone()))
            .collect();

        merged.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        merged.truncate(top_k);
        merged
    }
}
