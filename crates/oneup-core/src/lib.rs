//! OneUp Core - Domain logic and port definitions
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain types** - `RelativePath`, `RemotePath`, `FileRecord`, `LocalSnapshot`,
//!   `UploadSession`, `SyncPlan`
//! - **Port definitions** - Traits for adapters: `ICloudProvider`, `IMetadataStore`,
//!   `ITokenProvider`
//! - **Configuration** - YAML configuration with defaults and validation
//!
//! # Architecture
//!
//! This crate follows the hexagonal (ports & adapters) architecture pattern.
//! The domain module contains pure logic with no I/O.
//! Ports define trait interfaces that adapter crates implement.

pub mod config;
pub mod domain;
pub mod ports;
