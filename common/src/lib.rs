//! Shared vocabulary of the camscout workspace.
//!
//! Everything that more than one crate needs to agree on lives here: the device models,
//! the [`discovery::ProtocolDiscovery`] capability set that the scanner drives, the outbound
//! identification traits, configuration and target parsing.

pub mod config;
pub mod discovery;
pub mod error;
pub mod identify;
pub mod models;
pub mod network;
