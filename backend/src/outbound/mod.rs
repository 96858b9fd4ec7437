//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! Adapters translate between domain types and storage representations and
//! carry no workflow rules of their own.

pub mod persistence;
