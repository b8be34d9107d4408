//! Analysis Module
//!
//! Pure evaluation of listed resources: rule exposure and risk, backup
//! health, storage usage, VPC roll-ups and name lookups. None of these touch
//! the network.

pub mod backup;
pub mod capacity;
pub mod inventory;
pub mod names;
pub mod security;

pub use backup::{
    BackupAnalysis, BackupHealthEvaluator, BackupPolicySummary, HealthVerdict, PolicyHealth,
};
pub use capacity::{CapacityAggregator, UsageReport};
pub use inventory::VpcSummary;
pub use names::{resolve, NameMatch, NamedResource};
pub use security::{PortQuery, RiskLevel, RiskPolicy, RuleScan, SecurityRuleAnalyzer};
