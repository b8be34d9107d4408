//! VPC Inspector
//!
//! The typed operations exposed upward. Each one validates its input, fans the
//! raw listings out across the requested regions and hands them to the
//! analyzers. Only [`crate::error::Error`] leaves this module.

use crate::analysis::backup::{BackupHealthEvaluator, BackupPolicySummary};
use crate::analysis::capacity::{CapacityAggregator, UsageReport};
use crate::analysis::inventory::VpcSummary;
use crate::analysis::names::{self, NameMatch};
use crate::analysis::security::{PortQuery, RiskLevel, RuleScan, SecurityRuleAnalyzer};
use crate::analysis::BackupAnalysis;
use crate::config::Config;
use crate::error::{self, Error};
use crate::executor::{MultiRegionExecutor, MultiRegionResult};
use crate::resource::{fetcher, BackupJob, BackupPlan, RoutingTable, Vpc};
use crate::vpc::auth::IamCredentials;
use crate::vpc::client::VpcClient;
use crate::vpc::http::VpcHttpClient;
use crate::vpc::regions::{Region, RegionDirectory};
use crate::vpc::registry::RegionalClientRegistry;
use chrono::{DateTime, Utc};
use std::sync::Arc;

pub struct VpcInspector {
    registry: Arc<RegionalClientRegistry>,
    executor: MultiRegionExecutor,
    analyzer: SecurityRuleAnalyzer,
    backup: BackupHealthEvaluator,
    capacity: CapacityAggregator,
    recent_job_limit: usize,
}

impl VpcInspector {
    /// Build from configuration, reading the API key from the environment
    pub fn from_config(config: &Config) -> error::Result<Self> {
        let http = VpcHttpClient::new(config.request_timeout())
            .map_err(|e| Error::validation(format!("Invalid HTTP settings: {}", e)))?;
        let credentials = IamCredentials::from_env(&config.effective_iam_url(), http.clone())?;
        Ok(Self::with_credentials(config, credentials, http))
    }

    pub fn with_credentials(config: &Config, credentials: IamCredentials, http: VpcHttpClient) -> Self {
        let registry = Arc::new(RegionalClientRegistry::new(
            credentials,
            http,
            config.effective_endpoint(),
        ));
        let directory = Arc::new(RegionDirectory::new(
            registry.clone(),
            &config.effective_bootstrap_region(),
        ));
        let executor = MultiRegionExecutor::new(
            directory,
            config.region_timeout(),
            config.effective_max_concurrent(),
        );

        Self {
            registry,
            executor,
            analyzer: SecurityRuleAnalyzer::new(config.risk_policy.clone()),
            backup: BackupHealthEvaluator::new(config.cadence_window_multiplier()),
            capacity: CapacityAggregator,
            recent_job_limit: config.recent_job_limit(),
        }
    }

    pub async fn list_regions(&self) -> error::Result<Vec<Region>> {
        Ok(self.executor.directory().regions().await?.to_vec())
    }

    // =========================================================================
    // Security groups
    // =========================================================================

    /// Rules exposing `query` in every region of `scope`
    pub async fn find_exposed_port(
        &self,
        scope: &[String],
        query: &PortQuery,
        vpc_id: Option<&str>,
    ) -> error::Result<MultiRegionResult<RuleScan>> {
        require_optional_id("VPC id", vpc_id)?;
        let result = self
            .executor
            .run_scoped(scope, |region| self.exposure_in(region, query, vpc_id))
            .await?;
        escalate(result)
    }

    pub async fn find_open_ssh(
        &self,
        scope: &[String],
        vpc_id: Option<&str>,
    ) -> error::Result<MultiRegionResult<RuleScan>> {
        self.find_exposed_port(scope, &PortQuery::ssh(), vpc_id).await
    }

    pub async fn find_open_rdp(
        &self,
        scope: &[String],
        vpc_id: Option<&str>,
    ) -> error::Result<MultiRegionResult<RuleScan>> {
        self.find_exposed_port(scope, &PortQuery::rdp(), vpc_id).await
    }

    /// Every rule at or above `min_level`, most severe first
    pub async fn scan_security_groups(
        &self,
        scope: &[String],
        vpc_id: Option<&str>,
        min_level: RiskLevel,
    ) -> error::Result<MultiRegionResult<RuleScan>> {
        require_optional_id("VPC id", vpc_id)?;
        let result = self
            .executor
            .run_scoped(scope, |region| self.risk_scan_in(region, vpc_id, min_level))
            .await?;
        escalate(result)
    }

    async fn exposure_in(
        &self,
        region: Region,
        query: &PortQuery,
        vpc_id: Option<&str>,
    ) -> anyhow::Result<RuleScan> {
        let client = self.client(&region).await?;
        let groups = fetcher::list_security_groups(&client, vpc_id).await?;
        Ok(self.analyzer.find_exposed_port(&groups, query))
    }

    async fn risk_scan_in(
        &self,
        region: Region,
        vpc_id: Option<&str>,
        min_level: RiskLevel,
    ) -> anyhow::Result<RuleScan> {
        let client = self.client(&region).await?;
        let groups = fetcher::list_security_groups(&client, vpc_id).await?;
        Ok(self.analyzer.scan_groups(&groups, min_level))
    }

    // =========================================================================
    // Backups
    // =========================================================================

    pub async fn analyze_backup_policies(
        &self,
        scope: &[String],
        resource_group_id: Option<&str>,
    ) -> error::Result<MultiRegionResult<BackupAnalysis>> {
        self.analyze_backup_policies_at(scope, resource_group_id, Utc::now())
            .await
    }

    /// As [`Self::analyze_backup_policies`], evaluated at a fixed instant
    pub async fn analyze_backup_policies_at(
        &self,
        scope: &[String],
        resource_group_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> error::Result<MultiRegionResult<BackupAnalysis>> {
        require_optional_id("resource group id", resource_group_id)?;
        let result = self
            .executor
            .run_scoped(scope, |region| self.backups_in(region, resource_group_id, now))
            .await?;
        escalate(result)
    }

    async fn backups_in(
        &self,
        region: Region,
        resource_group_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> anyhow::Result<BackupAnalysis> {
        let client = self.client(&region).await?;
        let policies = fetcher::list_backup_policies(&client, resource_group_id).await?;

        let mut health = Vec::with_capacity(policies.len());
        for policy in &policies {
            let plans = fetcher::list_backup_policy_plans(&client, &policy.id).await?;
            let jobs = self.plan_jobs(&client, &policy.id, &plans).await?;
            health.push(self.backup.evaluate(policy, &plans, &jobs, now));
        }

        Ok(self.backup.summarize(health))
    }

    /// One policy with its plans, newest jobs and health
    pub async fn backup_policy_summary(
        &self,
        scope: &[String],
        backup_policy_id: &str,
    ) -> error::Result<MultiRegionResult<BackupPolicySummary>> {
        self.backup_policy_summary_at(scope, backup_policy_id, Utc::now())
            .await
    }

    /// As [`Self::backup_policy_summary`], evaluated at a fixed instant
    pub async fn backup_policy_summary_at(
        &self,
        scope: &[String],
        backup_policy_id: &str,
        now: DateTime<Utc>,
    ) -> error::Result<MultiRegionResult<BackupPolicySummary>> {
        require_id("backup policy id", backup_policy_id)?;
        let result = self
            .executor
            .run_scoped(scope, |region| {
                self.policy_summary_in(region, backup_policy_id, now)
            })
            .await?;
        escalate(result)
    }

    async fn policy_summary_in(
        &self,
        region: Region,
        backup_policy_id: &str,
        now: DateTime<Utc>,
    ) -> anyhow::Result<BackupPolicySummary> {
        let client = self.client(&region).await?;
        let policy = fetcher::get_backup_policy(&client, backup_policy_id).await?;
        let plans = fetcher::list_backup_policy_plans(&client, &policy.id).await?;

        let mut jobs = self.plan_jobs(&client, &policy.id, &plans).await?;
        // Jobs of deleted or inactive plans still belong in the history
        let recent =
            fetcher::list_backup_policy_jobs(&client, &policy.id, None, self.recent_job_limit)
                .await?;
        for job in recent {
            if !jobs.iter().any(|j| j.id == job.id) {
                jobs.push(job);
            }
        }

        Ok(self
            .backup
            .summarize_policy(policy, plans, jobs, self.recent_job_limit, now))
    }

    /// Newest jobs of every active plan, fetched plan by plan so a frequent
    /// plan cannot crowd out a slower one
    async fn plan_jobs(
        &self,
        client: &VpcClient,
        backup_policy_id: &str,
        plans: &[BackupPlan],
    ) -> anyhow::Result<Vec<BackupJob>> {
        let mut jobs = Vec::new();
        for plan in plans.iter().filter(|p| p.active) {
            jobs.extend(
                fetcher::list_backup_policy_jobs(
                    client,
                    backup_policy_id,
                    Some(plan.id.as_str()),
                    self.recent_job_limit,
                )
                .await?,
            );
        }
        Ok(jobs)
    }

    // =========================================================================
    // Storage
    // =========================================================================

    pub async fn analyze_storage_usage(
        &self,
        scope: &[String],
    ) -> error::Result<MultiRegionResult<UsageReport>> {
        let result = self
            .executor
            .run_scoped(scope, |region| self.storage_in(region))
            .await?;
        escalate(result)
    }

    async fn storage_in(&self, region: Region) -> anyhow::Result<UsageReport> {
        let client = self.client(&region).await?;
        let volumes = fetcher::list_volumes(&client).await?;
        let snapshots = fetcher::list_snapshots(&client).await?;
        Ok(self.capacity.summarize(&volumes, &snapshots))
    }

    // =========================================================================
    // Name lookups
    // =========================================================================

    pub async fn find_routing_table_by_name(
        &self,
        scope: &[String],
        vpc_id: &str,
        name: &str,
    ) -> error::Result<MultiRegionResult<NameMatch<RoutingTable>>> {
        require_id("VPC id", vpc_id)?;
        require_name(name)?;
        let result = self
            .executor
            .run_scoped(scope, |region| self.routing_table_in(region, vpc_id, name))
            .await?;
        escalate(result)
    }

    pub async fn find_vpc_by_name(
        &self,
        scope: &[String],
        name: &str,
    ) -> error::Result<MultiRegionResult<NameMatch<Vpc>>> {
        require_name(name)?;
        let result = self
            .executor
            .run_scoped(scope, |region| self.vpc_in(region, name))
            .await?;
        escalate(result)
    }

    async fn routing_table_in(
        &self,
        region: Region,
        vpc_id: &str,
        name: &str,
    ) -> anyhow::Result<NameMatch<RoutingTable>> {
        let client = self.client(&region).await?;
        let tables = fetcher::list_routing_tables(&client, vpc_id).await?;
        Ok(names::resolve(&tables, name)?)
    }

    async fn vpc_in(&self, region: Region, name: &str) -> anyhow::Result<NameMatch<Vpc>> {
        let client = self.client(&region).await?;
        let vpcs = fetcher::list_vpcs(&client).await?;
        Ok(names::resolve(&vpcs, name)?)
    }

    // =========================================================================
    // VPC roll-up
    // =========================================================================

    /// Resource counts and SSH exposure of one VPC
    pub async fn vpc_summary(
        &self,
        scope: &[String],
        vpc_id: &str,
    ) -> error::Result<MultiRegionResult<VpcSummary>> {
        require_id("VPC id", vpc_id)?;
        let result = self
            .executor
            .run_scoped(scope, |region| self.vpc_summary_in(region, vpc_id))
            .await?;
        escalate(result)
    }

    async fn vpc_summary_in(&self, region: Region, vpc_id: &str) -> anyhow::Result<VpcSummary> {
        let client = self.client(&region).await?;
        let vpc = fetcher::get_vpc(&client, vpc_id).await?;
        let subnets = fetcher::list_subnets(&client, vpc_id).await?;
        let instances = fetcher::list_instances(&client, vpc_id).await?;
        let groups = fetcher::list_security_groups(&client, Some(vpc_id)).await?;
        let gateways = fetcher::list_public_gateways(&client, vpc_id).await?;
        let ssh = self.analyzer.find_open_ssh(&groups);

        Ok(VpcSummary::build(
            vpc, &subnets, &instances, &groups, &gateways, ssh,
        ))
    }

    async fn client(&self, region: &Region) -> anyhow::Result<VpcClient> {
        self.registry.get(&region.code).await
    }
}

/// Credentials are shared by every region; one rejection is fatal
fn escalate<T>(result: MultiRegionResult<T>) -> error::Result<MultiRegionResult<T>> {
    match result.authentication_failure() {
        Some(err) => Err(err),
        None => Ok(result),
    }
}

fn require_id(kind: &str, id: &str) -> error::Result<()> {
    if id.trim().is_empty() {
        return Err(Error::validation(format!("{} must not be empty", kind)));
    }
    Ok(())
}

fn require_optional_id(kind: &str, id: Option<&str>) -> error::Result<()> {
    id.map_or(Ok(()), |id| require_id(kind, id))
}

fn require_name(name: &str) -> error::Result<()> {
    if name.trim().is_empty() {
        return Err(Error::validation("Name must not be empty"));
    }
    Ok(())
}
