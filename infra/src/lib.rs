//! Storage plumbing shared by the canteen services: typed identifiers,
//! document metadata and the pooled document stores.

pub mod documents;
pub mod ids;
pub mod persistence;
