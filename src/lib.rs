//! vpcaudit
//!
//! Multi-region security, backup and capacity analysis for IBM Cloud VPC.
//! [`inspector::VpcInspector`] is the entry point; everything below it is
//! either plumbing (`vpc`, `resource`, `executor`) or pure analysis.

pub mod analysis;
pub mod config;
pub mod error;
pub mod executor;
pub mod inspector;
pub mod resource;
pub mod vpc;

pub use error::{Error, Result};
pub use executor::{FailureKind, MultiRegionExecutor, MultiRegionResult, RegionFailure};
pub use inspector::VpcInspector;
