//! Integration tests for oneup-graph
//!
//! Uses wiremock to simulate the Microsoft Graph API and verifies
//! end-to-end behavior of the retry-wrapped transport, folder operations,
//! uploads and deletions.

mod common;

mod test_drive_operations;
mod test_transport;
