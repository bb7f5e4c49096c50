//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. Ports are interfaces that the domain core
//! depends on, but whose implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`ICloudProvider`] - Remote drive operations (OneDrive)
//! - [`IMetadataStore`] - Persistent records of uploaded files
//! - [`ITokenProvider`] - Bearer credential supply and refresh

pub mod cloud_provider;
pub mod metadata_store;
pub mod token_provider;

pub use cloud_provider::{ChunkOutcome, DeleteOutcome, ICloudProvider, RemoteItem};
pub use metadata_store::IMetadataStore;
pub use token_provider::{ITokenProvider, Tokens};
