//! Backup policy health
//!
//! Health is a pure function of a policy, its plans, its recent jobs and the
//! evaluation instant. Nothing here touches the network.

use crate::error::Error;
use crate::resource::{BackupJob, BackupPlan, BackupPolicy, JobStatus};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Interval assumed when a plan's cron spec cannot be read
const FALLBACK_INTERVAL_HOURS: i64 = 24;

/// Upper bound on the cadence window multiplier
pub const MAX_CADENCE_WINDOW_MULTIPLIER: f64 = 100.0;

/// Newest jobs considered by the health score
const SCORED_JOB_COUNT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthVerdict {
    Healthy,
    Degraded,
    Unhealthy,
    Unconfigured,
}

impl fmt::Display for HealthVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HealthVerdict::Healthy => "healthy",
            HealthVerdict::Degraded => "degraded",
            HealthVerdict::Unhealthy => "unhealthy",
            HealthVerdict::Unconfigured => "unconfigured",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanStatus {
    Ok,
    Late,
    Stalled,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanHealth {
    pub plan_id: String,
    pub plan_name: String,
    pub cron_spec: String,
    pub interval_minutes: i64,
    pub status: PlanStatus,
    pub last_job_at: Option<DateTime<Utc>>,
    pub last_success_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyHealth {
    pub policy_id: String,
    pub policy_name: String,
    pub lifecycle_state: String,
    pub verdict: HealthVerdict,
    /// 0 to 100, lowered for every problem found in the recent job history
    pub health_score: u8,
    pub plans: Vec<PlanHealth>,
    pub inactive_plans: usize,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
    pub last_job_status: Option<JobStatus>,
    pub last_job_at: Option<DateTime<Utc>>,
    pub job_status_summary: BTreeMap<JobStatus, usize>,
}

impl PolicyHealth {
    pub fn has_failed_jobs(&self) -> bool {
        self.job_status_summary
            .get(&JobStatus::Failed)
            .is_some_and(|n| *n > 0)
    }

    pub fn has_stalled_plans(&self) -> bool {
        self.plans.iter().any(|p| p.status == PlanStatus::Stalled)
    }

    pub fn is_stable(&self) -> bool {
        self.lifecycle_state == "stable"
    }
}

/// Everything known about a single policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupPolicySummary {
    pub policy: BackupPolicy,
    pub plans: Vec<BackupPlan>,
    /// Newest jobs of the policy, newest first
    pub recent_jobs: Vec<BackupJob>,
    pub job_status_summary: BTreeMap<JobStatus, usize>,
    pub health: PolicyHealth,
}

/// Region-level roll-up of policy health
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackupAnalysis {
    pub total_policies: usize,
    pub active_policies: usize,
    pub inactive_policies: usize,
    pub policies_with_failed_jobs: Vec<String>,
    pub policies_without_recent_jobs: Vec<String>,
    pub verdicts: BTreeMap<HealthVerdict, usize>,
    pub policies: Vec<PolicyHealth>,
}

/// Scheduled interval of a 5-field cron spec
pub fn schedule_interval(cron_spec: &str) -> Result<Duration, Error> {
    let fields: Vec<&str> = cron_spec.split_whitespace().collect();
    let [minute, hour, day_of_month, _month, day_of_week] = fields.as_slice() else {
        return Err(Error::validation(format!(
            "Cron spec '{}' must have 5 fields",
            cron_spec
        )));
    };

    let restricted = |field: &str| field != "*" && field != "?";

    if restricted(*day_of_week) {
        return Ok(Duration::days(7));
    }
    if restricted(*day_of_month) {
        return Ok(Duration::days(31));
    }
    if let Some(step) = hour.strip_prefix("*/") {
        return Ok(Duration::hours(parse_step(step, "hour", cron_spec)?));
    }
    if *hour != "*" {
        return Ok(Duration::days(1));
    }
    if let Some(step) = minute.strip_prefix("*/") {
        return Ok(Duration::minutes(parse_step(step, "minute", cron_spec)?));
    }
    if *minute == "*" {
        return Ok(Duration::minutes(1));
    }
    Ok(Duration::hours(1))
}

fn parse_step(step: &str, field: &str, cron_spec: &str) -> Result<i64, Error> {
    match step.parse::<i64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(Error::validation(format!(
            "Cron spec '{}' has an invalid {} step",
            cron_spec, field
        ))),
    }
}

/// Short human form of a duration, in minutes below two hours
fn describe(duration: Duration) -> String {
    if duration.num_minutes() < 120 {
        format!("{}m", duration.num_minutes())
    } else {
        format!("{}h", duration.num_hours())
    }
}

#[derive(Debug, Clone)]
pub struct BackupHealthEvaluator {
    cadence_window_multiplier: f64,
}

impl Default for BackupHealthEvaluator {
    fn default() -> Self {
        Self::new(2.0)
    }
}

impl BackupHealthEvaluator {
    /// The multiplier is clamped to `1.0..=MAX_CADENCE_WINDOW_MULTIPLIER`; NaN becomes 1.0
    pub fn new(cadence_window_multiplier: f64) -> Self {
        Self {
            cadence_window_multiplier: cadence_window_multiplier
                .max(1.0)
                .min(MAX_CADENCE_WINDOW_MULTIPLIER),
        }
    }

    fn cadence_window(&self, interval: Duration) -> Duration {
        let secs = interval.num_seconds() as f64 * self.cadence_window_multiplier;
        Duration::try_seconds(secs.round() as i64).unwrap_or(Duration::MAX)
    }

    pub fn evaluate(
        &self,
        policy: &BackupPolicy,
        plans: &[BackupPlan],
        jobs: &[BackupJob],
        now: DateTime<Utc>,
    ) -> PolicyHealth {
        let active: Vec<&BackupPlan> = plans.iter().filter(|p| p.active).collect();
        let mut issues = Vec::new();
        let unstable = policy.lifecycle_state != "stable";
        if unstable {
            issues.push(format!(
                "Policy is not in stable state ({})",
                policy.lifecycle_state
            ));
        }

        let mut job_status_summary: BTreeMap<JobStatus, usize> = BTreeMap::new();
        for job in jobs {
            *job_status_summary.entry(job.status).or_default() += 1;
        }
        let latest = jobs.iter().max_by_key(|j| j.created_at);

        let plan_health: Vec<PlanHealth> = active
            .iter()
            .map(|plan| {
                // Jobs without a plan reference belong to a policy's only plan
                let owned: Vec<&BackupJob> = jobs
                    .iter()
                    .filter(|j| match &j.plan {
                        Some(r) => r.id == plan.id,
                        None => active.len() == 1,
                    })
                    .collect();
                self.evaluate_plan(plan, &owned, now, &mut issues)
            })
            .collect();

        let verdict = if plan_health.is_empty() {
            issues.push(if plans.is_empty() {
                "No backup plans configured".to_string()
            } else {
                "All backup plans are inactive".to_string()
            });
            HealthVerdict::Unconfigured
        } else {
            let any = |status: PlanStatus| plan_health.iter().any(|p| p.status == status);
            let all_failed = plan_health.iter().all(|p| p.status == PlanStatus::Failed);

            if all_failed || any(PlanStatus::Stalled) {
                HealthVerdict::Unhealthy
            } else if any(PlanStatus::Failed) || any(PlanStatus::Late) || unstable {
                HealthVerdict::Degraded
            } else {
                HealthVerdict::Healthy
            }
        };

        let (health_score, recommendations) = score(unstable, jobs, now, &mut issues);

        PolicyHealth {
            policy_id: policy.id.clone(),
            policy_name: policy.name.clone(),
            lifecycle_state: policy.lifecycle_state.clone(),
            verdict,
            health_score,
            plans: plan_health,
            inactive_plans: plans.len() - active.len(),
            issues,
            recommendations,
            last_job_status: latest.map(|j| j.status),
            last_job_at: latest.map(|j| j.created_at),
            job_status_summary,
        }
    }

    fn evaluate_plan(
        &self,
        plan: &BackupPlan,
        jobs: &[&BackupJob],
        now: DateTime<Utc>,
        issues: &mut Vec<String>,
    ) -> PlanHealth {
        let interval = schedule_interval(&plan.cron_spec).unwrap_or_else(|e| {
            issues.push(e.to_string());
            Duration::hours(FALLBACK_INTERVAL_HOURS)
        });
        let window = self.cadence_window(interval);

        let last_job = jobs.iter().map(|j| j.created_at).max();
        let last_completed = jobs
            .iter()
            .filter(|j| matches!(j.status, JobStatus::Succeeded | JobStatus::Failed))
            .max_by_key(|j| j.created_at);
        let last_success = jobs
            .iter()
            .filter(|j| j.status == JobStatus::Succeeded)
            .map(|j| j.created_at)
            .max();

        let status = if last_completed.is_some_and(|j| j.status == JobStatus::Failed) {
            issues.push(format!("Latest job of plan {} failed", plan.name));
            PlanStatus::Failed
        } else if last_job.map_or(true, |at| now - at > window) {
            issues.push(format!(
                "Plan {} has no job within {}",
                plan.name,
                describe(window)
            ));
            PlanStatus::Stalled
        } else if last_success.map_or(true, |at| now - at > interval) {
            issues.push(format!("Plan {} has no recent successful job", plan.name));
            PlanStatus::Late
        } else {
            PlanStatus::Ok
        };

        PlanHealth {
            plan_id: plan.id.clone(),
            plan_name: plan.name.clone(),
            cron_spec: plan.cron_spec.clone(),
            interval_minutes: interval.num_minutes(),
            status,
            last_job_at: last_job,
            last_success_at: last_success,
        }
    }

    /// Roll individual policy results up into a region summary
    pub fn summarize(&self, policies: Vec<PolicyHealth>) -> BackupAnalysis {
        let mut analysis = BackupAnalysis {
            total_policies: policies.len(),
            ..Default::default()
        };

        for health in &policies {
            if health.is_stable() {
                analysis.active_policies += 1;
            } else {
                analysis.inactive_policies += 1;
            }
            if health.has_failed_jobs() {
                analysis
                    .policies_with_failed_jobs
                    .push(health.policy_name.clone());
            }
            if health.has_stalled_plans() {
                analysis
                    .policies_without_recent_jobs
                    .push(health.policy_name.clone());
            }
            *analysis.verdicts.entry(health.verdict).or_default() += 1;
        }

        analysis.policies = policies;
        analysis
    }

    /// Combine a policy with its plans and job history
    pub fn summarize_policy(
        &self,
        policy: BackupPolicy,
        plans: Vec<BackupPlan>,
        mut jobs: Vec<BackupJob>,
        recent_job_limit: usize,
        now: DateTime<Utc>,
    ) -> BackupPolicySummary {
        let health = self.evaluate(&policy, &plans, &jobs, now);
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs.truncate(recent_job_limit);

        BackupPolicySummary {
            job_status_summary: health.job_status_summary.clone(),
            policy,
            plans,
            recent_jobs: jobs,
            health,
        }
    }
}

/// Health score and recommendations from the lifecycle state and newest jobs.
/// Score-only findings are appended to `issues`.
fn score(
    unstable: bool,
    jobs: &[BackupJob],
    now: DateTime<Utc>,
    issues: &mut Vec<String>,
) -> (u8, Vec<String>) {
    let mut score: i32 = 100;
    let mut recommendations = Vec::new();

    if unstable {
        score -= 30;
        recommendations.push("Ensure policy is in stable state".to_string());
    }

    let mut recent: Vec<&BackupJob> = jobs.iter().collect();
    recent.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    recent.truncate(SCORED_JOB_COUNT);

    let Some(latest) = recent.first() else {
        score -= 40;
        issues.push("No backup jobs found".to_string());
        recommendations
            .push("Verify that backup schedules are active and resources are attached".to_string());
        return (score.clamp(0, 100) as u8, recommendations);
    };

    let failed = recent
        .iter()
        .filter(|j| j.status == JobStatus::Failed)
        .count();
    let failure_rate = failed as f64 / recent.len() as f64;
    if failure_rate > 0.5 {
        score -= 30;
        issues.push(format!(
            "High failure rate: {}/{} recent jobs failed",
            failed,
            recent.len()
        ));
        recommendations.push("Investigate job failures and fix underlying issues".to_string());
    } else if failure_rate > 0.2 {
        score -= 15;
        issues.push(format!(
            "Some recent failures: {}/{} recent jobs failed",
            failed,
            recent.len()
        ));
        recommendations.push("Monitor job failures and address any issues".to_string());
    }

    if recent.len() < 5 {
        score -= 10;
        issues.push("Few recent backup jobs".to_string());
        recommendations.push("Consider increasing backup frequency if appropriate".to_string());
    }

    let days_ago = (now - latest.created_at).num_days();
    if days_ago > 7 {
        score -= 20;
        issues.push(format!("Last backup job was {} days ago", days_ago));
        recommendations.push("Check if backup schedule is still active".to_string());
    } else if days_ago > 3 {
        score -= 10;
        issues.push(format!("Last backup job was {} days ago", days_ago));
    }

    (score.clamp(0, 100) as u8, recommendations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ResourceRef;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn policy(state: &str) -> BackupPolicy {
        BackupPolicy {
            id: "bp-1".into(),
            name: "daily-volumes".into(),
            lifecycle_state: state.into(),
            resource_group: None,
        }
    }

    fn plan(id: &str, cron: &str, active: bool) -> BackupPlan {
        BackupPlan {
            id: id.into(),
            name: format!("plan-{}", id),
            cron_spec: cron.into(),
            active,
            lifecycle_state: "stable".into(),
        }
    }

    fn job(plan_id: &str, status: JobStatus, hours_ago: i64) -> BackupJob {
        BackupJob {
            id: format!("job-{}-{}", plan_id, hours_ago),
            status,
            plan: Some(ResourceRef {
                id: plan_id.into(),
                name: String::new(),
            }),
            created_at: now() - Duration::hours(hours_ago),
            completed_at: None,
        }
    }

    #[test]
    fn test_schedule_interval() {
        assert_eq!(schedule_interval("0 2 * * *").unwrap(), Duration::days(1));
        assert_eq!(schedule_interval("30 */6 * * *").unwrap(), Duration::hours(6));
        assert_eq!(schedule_interval("0 * * * *").unwrap(), Duration::hours(1));
        assert_eq!(schedule_interval("0 3 * * 0").unwrap(), Duration::days(7));
        assert_eq!(schedule_interval("0 3 1 * *").unwrap(), Duration::days(31));
        assert!(schedule_interval("0 3 * *").is_err());
        assert!(schedule_interval("0 */0 * * *").is_err());
    }

    #[test]
    fn test_schedule_interval_minute_steps() {
        assert_eq!(schedule_interval("*/15 * * * *").unwrap(), Duration::minutes(15));
        assert_eq!(schedule_interval("* * * * *").unwrap(), Duration::minutes(1));
        assert_eq!(schedule_interval("*/15 3 * * *").unwrap(), Duration::days(1));
        assert!(schedule_interval("*/x * * * *").is_err());
    }

    #[test]
    fn test_quarter_hourly_plan_goes_stalled_after_half_an_hour() {
        let plans = vec![plan("a", "*/15 * * * *", true)];
        let evaluator = BackupHealthEvaluator::default();

        let fresh = BackupJob {
            created_at: now() - Duration::minutes(10),
            ..job("a", JobStatus::Succeeded, 0)
        };
        let health = evaluator.evaluate(&policy("stable"), &plans, &[fresh], now());
        assert_eq!(health.plans[0].status, PlanStatus::Ok);
        assert_eq!(health.plans[0].interval_minutes, 15);

        let health =
            evaluator.evaluate(&policy("stable"), &plans, &[job("a", JobStatus::Succeeded, 1)], now());
        assert_eq!(health.plans[0].status, PlanStatus::Stalled);
        assert!(health.issues.iter().any(|i| i.ends_with("within 30m")));
    }

    #[test]
    fn test_huge_multiplier_is_clamped() {
        let plans = vec![plan("a", "0 3 1 * *", true)];
        let jobs = vec![job("a", JobStatus::Succeeded, 24 * 400)];
        for multiplier in [1e30, f64::INFINITY, f64::NAN] {
            let health = BackupHealthEvaluator::new(multiplier).evaluate(
                &policy("stable"),
                &plans,
                &jobs,
                now(),
            );
            assert_eq!(health.plans.len(), 1);
        }
    }

    #[test]
    fn test_no_plans_is_unconfigured() {
        let health = BackupHealthEvaluator::default().evaluate(&policy("stable"), &[], &[], now());
        assert_eq!(health.verdict, HealthVerdict::Unconfigured);
    }

    #[test]
    fn test_inactive_plans_are_ignored() {
        let plans = vec![plan("a", "0 2 * * *", false)];
        let health =
            BackupHealthEvaluator::default().evaluate(&policy("stable"), &plans, &[], now());
        assert_eq!(health.verdict, HealthVerdict::Unconfigured);
        assert_eq!(health.inactive_plans, 1);
    }

    #[test]
    fn test_recent_success_is_healthy() {
        let plans = vec![plan("a", "0 2 * * *", true)];
        let jobs = vec![job("a", JobStatus::Succeeded, 10), job("a", JobStatus::Failed, 34)];
        let health =
            BackupHealthEvaluator::default().evaluate(&policy("stable"), &plans, &jobs, now());
        assert_eq!(health.verdict, HealthVerdict::Healthy);
        assert_eq!(health.last_job_status, Some(JobStatus::Succeeded));
        assert_eq!(health.job_status_summary[&JobStatus::Failed], 1);
    }

    #[test]
    fn test_late_success_is_degraded() {
        let plans = vec![plan("a", "0 2 * * *", true)];
        let jobs = vec![job("a", JobStatus::Succeeded, 30)];
        let health =
            BackupHealthEvaluator::default().evaluate(&policy("stable"), &plans, &jobs, now());
        assert_eq!(health.plans[0].status, PlanStatus::Late);
        assert_eq!(health.verdict, HealthVerdict::Degraded);
    }

    #[test]
    fn test_never_run_is_unhealthy() {
        let plans = vec![plan("a", "0 2 * * *", true), plan("b", "0 4 * * *", true)];
        let jobs = vec![job("a", JobStatus::Succeeded, 2)];
        let health =
            BackupHealthEvaluator::default().evaluate(&policy("stable"), &plans, &jobs, now());
        assert_eq!(health.plans[1].status, PlanStatus::Stalled);
        assert_eq!(health.verdict, HealthVerdict::Unhealthy);
    }

    #[test]
    fn test_one_failed_plan_is_degraded_all_failed_unhealthy() {
        let plans = vec![plan("a", "0 2 * * *", true), plan("b", "0 4 * * *", true)];
        let jobs = vec![job("a", JobStatus::Failed, 2), job("b", JobStatus::Succeeded, 2)];
        let evaluator = BackupHealthEvaluator::default();
        let health = evaluator.evaluate(&policy("stable"), &plans, &jobs, now());
        assert_eq!(health.verdict, HealthVerdict::Degraded);

        let jobs = vec![job("a", JobStatus::Failed, 2), job("b", JobStatus::Failed, 3)];
        let health = evaluator.evaluate(&policy("stable"), &plans, &jobs, now());
        assert_eq!(health.verdict, HealthVerdict::Unhealthy);
    }

    #[test]
    fn test_running_job_does_not_mask_failure() {
        let plans = vec![plan("a", "0 2 * * *", true), plan("b", "0 4 * * *", true)];
        let jobs = vec![
            job("a", JobStatus::Running, 1),
            job("a", JobStatus::Failed, 3),
            job("b", JobStatus::Succeeded, 3),
        ];
        let health =
            BackupHealthEvaluator::default().evaluate(&policy("stable"), &plans, &jobs, now());
        assert_eq!(health.plans[0].status, PlanStatus::Failed);
    }

    #[test]
    fn test_unstable_lifecycle_is_degraded() {
        let plans = vec![plan("a", "0 2 * * *", true)];
        let jobs = vec![job("a", JobStatus::Succeeded, 1)];
        let health =
            BackupHealthEvaluator::default().evaluate(&policy("updating"), &plans, &jobs, now());
        assert_eq!(health.verdict, HealthVerdict::Degraded);
    }

    #[test]
    fn test_summarize_counts() {
        let evaluator = BackupHealthEvaluator::default();
        let plans = vec![plan("a", "0 2 * * *", true)];
        let healthy = evaluator.evaluate(
            &policy("stable"),
            &plans,
            &[job("a", JobStatus::Succeeded, 1)],
            now(),
        );
        let stalled = evaluator.evaluate(&policy("stable"), &plans, &[], now());
        let empty = evaluator.evaluate(&policy("stable"), &[], &[], now());

        let analysis = evaluator.summarize(vec![healthy, stalled, empty]);
        assert_eq!(analysis.total_policies, 3);
        assert_eq!(analysis.active_policies, 3);
        assert_eq!(analysis.inactive_policies, 0);
        assert_eq!(analysis.policies_without_recent_jobs.len(), 1);
        assert_eq!(analysis.verdicts[&HealthVerdict::Unhealthy], 1);
        assert_eq!(analysis.verdicts[&HealthVerdict::Unconfigured], 1);
    }

    #[test]
    fn test_active_count_follows_lifecycle_state() {
        let evaluator = BackupHealthEvaluator::default();
        let plans = vec![plan("a", "0 2 * * *", true)];
        let failed = evaluator.evaluate(
            &policy("failed"),
            &plans,
            &[job("a", JobStatus::Succeeded, 1)],
            now(),
        );
        let unplanned = evaluator.evaluate(&policy("stable"), &[], &[], now());
        assert!(failed
            .issues
            .iter()
            .any(|i| i.starts_with("Policy is not in stable state")));

        let analysis = evaluator.summarize(vec![failed, unplanned]);
        assert_eq!(analysis.active_policies, 1);
        assert_eq!(analysis.inactive_policies, 1);
    }

    #[test]
    fn test_health_score_and_recommendations() {
        let evaluator = BackupHealthEvaluator::default();
        let plans = vec![plan("a", "0 */4 * * *", true)];

        let jobs: Vec<BackupJob> = (0..10).map(|i| job("a", JobStatus::Succeeded, i * 4)).collect();
        let clean = evaluator.evaluate(&policy("stable"), &plans, &jobs, now());
        assert_eq!(clean.health_score, 100);
        assert!(clean.recommendations.is_empty());

        let empty = evaluator.evaluate(&policy("updating"), &plans, &[], now());
        assert_eq!(empty.health_score, 30);
        assert_eq!(
            empty.recommendations,
            vec![
                "Ensure policy is in stable state",
                "Verify that backup schedules are active and resources are attached",
            ]
        );

        let jobs = vec![
            job("a", JobStatus::Failed, 24 * 8),
            job("a", JobStatus::Failed, 24 * 9),
            job("a", JobStatus::Succeeded, 24 * 10),
        ];
        let failing = evaluator.evaluate(&policy("stable"), &plans, &jobs, now());
        // high failure rate, few jobs, last job 8 days ago
        assert_eq!(failing.health_score, 40);
        assert!(failing.issues.contains(&"High failure rate: 2/3 recent jobs failed".to_string()));
        assert!(failing
            .recommendations
            .contains(&"Check if backup schedule is still active".to_string()));
    }

    #[test]
    fn test_policy_summary_keeps_newest_jobs() {
        let plans = vec![plan("a", "0 * * * *", true)];
        let jobs: Vec<BackupJob> = (0..30).rev().map(|i| job("a", JobStatus::Succeeded, i)).collect();
        let summary = BackupHealthEvaluator::default().summarize_policy(
            policy("stable"),
            plans,
            jobs,
            10,
            now(),
        );
        assert_eq!(summary.recent_jobs.len(), 10);
        assert_eq!(summary.recent_jobs[0].created_at, now());
        assert_eq!(summary.job_status_summary[&JobStatus::Succeeded], 30);
        assert_eq!(summary.health.verdict, HealthVerdict::Healthy);
    }
}
