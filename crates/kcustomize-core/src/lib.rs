//! kcustomize Core - Domain logic for the kintone customize uploader
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain types** - `CustomizeManifest`, `FileIdentity`, `CustomizeEntry`, `CustomizeSetting`
//! - **File tracker** - `FileTracker`, which decides whether a file can skip re-upload
//! - **Use cases** - `UploadDeployUseCase` (upload, update, deploy with retry)
//! - **Port definitions** - Traits for adapters: `ICustomizeClient`, `IWorkflowObserver`
//! - **Messages** - English/Japanese user-facing text
//!
//! # Architecture
//!
//! The domain module contains pure data types and the tracker.
//! Ports define trait interfaces that adapter crates implement.
//! Use cases orchestrate domain types through port interfaces.

pub mod config;
pub mod domain;
pub mod messages;
pub mod ports;
pub mod usecases;
