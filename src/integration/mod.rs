//! Broker integration: pub/sub client and discovery documents.

pub mod discovery;
pub mod mqtt;
