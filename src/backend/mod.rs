//! Off-chain metadata backend (GraphQL)
//!
//! Descriptions, configuration-change hints and drafts live in a GraphQL backend
//! keyed by vault id and call hash. Chain state never comes from here.

pub mod client;
pub mod types;

pub use client::BackendClient;
pub use types::{GraphQLError, GraphQLResponse, PageParams, TxDraftRow, TxMetadataRow};
