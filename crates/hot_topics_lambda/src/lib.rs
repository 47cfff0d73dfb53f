//! Runtime side of the hot-topics deployment.
//!
//! Holds the parameter-store adapter boundary, the bearer-token secret
//! retriever, and the ingestion-producer handler. The Lambda binary under
//! `src/bin/` supplies the SSM-backed adapter.

pub mod adapters;
pub mod handlers;
pub mod secrets;
