//! Catalog tables read by the dashboards.

pub mod topic_mappings;

pub use topic_mappings::{TopicMappingsProps, TopicMappingsTable};
