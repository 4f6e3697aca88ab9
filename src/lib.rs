//! Library entrypoint for assemble-installer.
//!
//! The primary interface is the `assemble-installer` binary. The modules are
//! exposed so that integration tests can drive the pipeline with fakes.

pub mod bundle;
pub mod config;
pub mod error;
pub mod git;
pub mod hydra;
pub mod manifest;
pub mod output;
pub mod publish;
pub mod release;
pub mod resolve;
pub mod store;
pub mod template;
