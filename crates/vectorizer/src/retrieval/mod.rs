//! Scoped retrieval over the vector collection

mod merger;
mod scoped_store;

pub use merger::QueryMerger;
pub use scoped_store::ScopedStore;
