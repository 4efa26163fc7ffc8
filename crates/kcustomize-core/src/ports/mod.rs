//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. Ports are interfaces that the workflow depends
//! on, but whose implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`ICustomizeClient`] - Remote customize operations (upload, update, deploy)
//! - [`IWorkflowObserver`] - Progress reporting for the upload/deploy workflow

pub mod customize_client;
pub mod observer;

pub use customize_client::ICustomizeClient;
pub use observer::{IWorkflowObserver, NoopObserver, WorkflowEvent};
