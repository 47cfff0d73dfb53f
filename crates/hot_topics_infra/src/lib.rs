//! Declarative infrastructure for the hot-topics analysis solution.
//!
//! Resource definitions are plain functions from props structs to
//! CloudFormation resource descriptions. A [`stack::Stack`] collects them and
//! synthesizes a static [`template::Template`]. Nothing in this crate talks to
//! AWS; provisioning is left to CloudFormation.

pub mod error;
pub mod events;
pub mod firehose;
pub mod glue;
pub mod iam;
pub mod ingestion;
pub mod integration;
pub mod kms;
pub mod lambda_fn;
pub mod logs;
pub mod s3;
pub mod solution;
pub mod stack;
pub mod template;
pub mod visualization;

pub use error::SynthError;
pub use stack::{Scope, Stack};
pub use template::{LogicalId, Template};
