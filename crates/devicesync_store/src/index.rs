//! Field indexes.

use devicesync_api::Resource;
use std::sync::Arc;

/// Field name of the pool-affiliation index.
pub const NODE_POOL_FIELD: &str = "spec.nodePool";

/// Extracts the indexed value of one field from a record.
pub type FieldIndexer<R> = Arc<dyn Fn(&R) -> String + Send + Sync>;

/// Indexer for `spec.nodePool`.
pub fn node_pool_indexer<R: Resource>() -> FieldIndexer<R> {
    Arc::new(|record: &R| record.node_pool().to_string())
}
