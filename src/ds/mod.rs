pub mod recency_list;
pub mod selector;

pub use recency_list::{NodeId, RecencyList};
pub use selector::PartitionSelector;
