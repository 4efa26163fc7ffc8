//! Integration tests for kcustomize-api
//!
//! Uses wiremock to simulate the kintone REST API and verifies the
//! requests the client sends and how responses are classified.

mod common;

mod test_customize;
mod test_deploy;
mod test_upload;
