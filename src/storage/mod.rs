//! Everything the planner knows about the storage engine: its predicate format and how buckets
//! are addressed.

pub mod bucket;
pub mod predicate;
pub mod translate;

pub use bucket::{resolve_bucket_id, BucketId, BucketLookup, OrgId, StaticBucketLookup};
pub use predicate::{Comparison, Literal, Logical, Node, Predicate, TagKey};
pub use translate::{merge_predicates, to_storage_predicate};
