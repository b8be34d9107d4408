//! Resource Fetcher
//!
//! Paginated listing of VPC collections and conversion into typed resources.

use super::model::{
    BackupJob, BackupPlan, BackupPolicy, Instance, PublicGateway, ResourceRef, RoutingTable,
    SecurityGroup, SecurityGroupRule, Snapshot, Subnet, Volume, Vpc,
};
use crate::error::{self, Error};
use crate::vpc::client::VpcClient;
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

/// Upper bound on pages followed for one collection
const MAX_PAGES: usize = 500;

/// Page size requested from the API
const PAGE_LIMIT: &str = "100";

/// Result of paginated fetch
pub struct PaginatedResult {
    pub items: Vec<Value>,
    pub next_start: Option<String>,
}

/// Fetch all items of a collection (auto-paginate)
pub async fn fetch_collection(
    client: &VpcClient,
    path: &str,
    key: &str,
    params: &[(&str, &str)],
) -> Result<Vec<Value>> {
    let mut all_items = Vec::new();
    let mut start: Option<String> = None;

    for _ in 0..MAX_PAGES {
        let result = fetch_page(client, path, key, params, start.as_deref()).await?;
        all_items.extend(result.items);

        match result.next_start {
            Some(next) if start.as_deref() != Some(next.as_str()) => start = Some(next),
            _ => return Ok(all_items),
        }
    }

    tracing::warn!(
        "Stopped paginating {} in {} after {} pages",
        path,
        client.region,
        MAX_PAGES
    );
    Ok(all_items)
}

/// Fetch one page of a collection
pub async fn fetch_page(
    client: &VpcClient,
    path: &str,
    key: &str,
    params: &[(&str, &str)],
    start: Option<&str>,
) -> Result<PaginatedResult> {
    let mut query: Vec<(&str, &str)> = params.to_vec();
    if !query.iter().any(|(k, _)| *k == "limit") {
        query.push(("limit", PAGE_LIMIT));
    }
    if let Some(start) = start {
        query.push(("start", start));
    }

    let url = client.vpc_url_with(path, &query);
    let response = client
        .get(&url)
        .await
        .with_context(|| format!("Failed to list {} in {}", path, client.region))?;

    let items = response
        .get(key)
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();

    Ok(PaginatedResult {
        items,
        next_start: next_start(&response),
    })
}

/// Extract the `start` token from a collection's `next.href`
pub fn next_start(response: &Value) -> Option<String> {
    let href = response.get("next")?.get("href")?.as_str()?;
    let url = Url::parse(href).ok()?;
    url.query_pairs()
        .find(|(k, _)| k == "start")
        .map(|(_, v)| v.into_owned())
}

/// Deserialize raw items into typed resources
pub fn parse_items<T: DeserializeOwned>(items: Vec<Value>, kind: &str) -> Result<Vec<T>> {
    items
        .into_iter()
        .enumerate()
        .map(|(idx, item)| {
            serde_json::from_value(item)
                .with_context(|| format!("Malformed {} at position {}", kind, idx))
        })
        .collect()
}

/// Fetch a single resource; a 404 becomes [`Error::NotFound`]
pub async fn fetch_resource<T: DeserializeOwned>(
    client: &VpcClient,
    path: &str,
    kind: &'static str,
    id: &str,
) -> Result<T> {
    let url = client.vpc_url(path);
    let value = match client.get(&url).await {
        Ok(value) => value,
        Err(e) if error::status_of(&e) == Some(404) => {
            return Err(Error::NotFound {
                kind,
                id: id.to_string(),
            }
            .into())
        }
        Err(e) => return Err(e.context(format!("Failed to get {} {} in {}", kind, id, client.region))),
    };
    serde_json::from_value(value).with_context(|| format!("Malformed {} {}", kind, id))
}

// =============================================================================
// Typed listings
// =============================================================================

pub async fn list_vpcs(client: &VpcClient) -> Result<Vec<Vpc>> {
    let items = fetch_collection(client, "vpcs", "vpcs", &[]).await?;
    parse_items(items, "vpc")
}

pub async fn get_vpc(client: &VpcClient, vpc_id: &str) -> Result<Vpc> {
    fetch_resource(client, &format!("vpcs/{}", vpc_id), "VPC", vpc_id).await
}

pub async fn list_subnets(client: &VpcClient, vpc_id: &str) -> Result<Vec<Subnet>> {
    let items = fetch_collection(client, "subnets", "subnets", &[("vpc.id", vpc_id)]).await?;
    let mut subnets: Vec<Subnet> = parse_items(items, "subnet")?;
    subnets.retain(|s| s.vpc.id == vpc_id);
    Ok(subnets)
}

pub async fn list_instances(client: &VpcClient, vpc_id: &str) -> Result<Vec<Instance>> {
    let items = fetch_collection(client, "instances", "instances", &[("vpc.id", vpc_id)]).await?;
    let mut instances: Vec<Instance> = parse_items(items, "instance")?;
    instances.retain(|i| i.vpc.id == vpc_id);
    Ok(instances)
}

/// Public gateways of one VPC; the collection has no VPC filter
pub async fn list_public_gateways(client: &VpcClient, vpc_id: &str) -> Result<Vec<PublicGateway>> {
    let items = fetch_collection(client, "public_gateways", "public_gateways", &[]).await?;
    let mut gateways: Vec<PublicGateway> = parse_items(items, "public gateway")?;
    gateways.retain(|g| g.vpc.id == vpc_id);
    Ok(gateways)
}

/// Security groups with their rules, optionally restricted to one VPC
pub async fn list_security_groups(
    client: &VpcClient,
    vpc_id: Option<&str>,
) -> Result<Vec<SecurityGroup>> {
    let params: Vec<(&str, &str)> = vpc_id.map(|id| vec![("vpc.id", id)]).unwrap_or_default();
    let items = fetch_collection(client, "security_groups", "security_groups", &params).await?;

    let mut groups = Vec::with_capacity(items.len());
    for item in items {
        let embedded_rules = item.get("rules").is_some();
        let mut group: SecurityGroup =
            serde_json::from_value(item).context("Malformed security group")?;

        // Older API versions omit rules from the collection
        if !embedded_rules {
            group.rules = list_security_group_rules(client, &group.id).await?;
        }
        for rule in &mut group.rules {
            rule.security_group_id = group.id.clone();
        }
        groups.push(group);
    }

    // The filter is also applied locally for endpoints that ignore `vpc.id`
    if let Some(vpc_id) = vpc_id {
        groups.retain(|g| g.vpc.id == vpc_id);
    }

    Ok(groups)
}

pub async fn list_security_group_rules(
    client: &VpcClient,
    security_group_id: &str,
) -> Result<Vec<SecurityGroupRule>> {
    let url = client.vpc_url(&format!("security_groups/{}/rules", security_group_id));
    let response = client
        .get(&url)
        .await
        .with_context(|| format!("Failed to list rules of security group {}", security_group_id))?;

    let items = response
        .get("rules")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();

    let mut rules: Vec<SecurityGroupRule> = parse_items(items, "security group rule")?;
    for rule in &mut rules {
        rule.security_group_id = security_group_id.to_string();
    }
    Ok(rules)
}

pub async fn list_backup_policies(
    client: &VpcClient,
    resource_group_id: Option<&str>,
) -> Result<Vec<BackupPolicy>> {
    let params: Vec<(&str, &str)> = resource_group_id
        .map(|id| vec![("resource_group.id", id)])
        .unwrap_or_default();
    let items = fetch_collection(client, "backup_policies", "backup_policies", &params).await?;
    parse_items(items, "backup policy")
}

pub async fn get_backup_policy(client: &VpcClient, backup_policy_id: &str) -> Result<BackupPolicy> {
    let path = format!("backup_policies/{}", backup_policy_id);
    fetch_resource(client, &path, "backup policy", backup_policy_id).await
}

pub async fn list_backup_policy_plans(
    client: &VpcClient,
    backup_policy_id: &str,
) -> Result<Vec<BackupPlan>> {
    let url = client.vpc_url(&format!("backup_policies/{}/plans", backup_policy_id));
    let response = client
        .get(&url)
        .await
        .with_context(|| format!("Failed to list plans of backup policy {}", backup_policy_id))?;

    let items = response
        .get("plans")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();
    parse_items(items, "backup plan")
}

/// Most recent jobs of a policy, newest first, optionally for one plan only.
///
/// Jobs returned for a plan carry that plan's reference even when the API
/// leaves it out.
pub async fn list_backup_policy_jobs(
    client: &VpcClient,
    backup_policy_id: &str,
    plan_id: Option<&str>,
    limit: usize,
) -> Result<Vec<BackupJob>> {
    let limit = limit.to_string();
    let path = format!("backup_policies/{}/jobs", backup_policy_id);
    let mut params = vec![("sort", "-created_at"), ("limit", limit.as_str())];
    if let Some(plan_id) = plan_id {
        params.push(("backup_policy_plan.id", plan_id));
    }

    let page = fetch_page(client, &path, "jobs", &params, None).await?;
    let mut jobs: Vec<BackupJob> = parse_items(page.items, "backup job")?;

    if let Some(plan_id) = plan_id {
        jobs.retain(|j| j.plan.as_ref().map_or(true, |p| p.id == plan_id));
        for job in &mut jobs {
            job.plan.get_or_insert_with(|| ResourceRef {
                id: plan_id.to_string(),
                name: String::new(),
            });
        }
    }
    Ok(jobs)
}

pub async fn list_volumes(client: &VpcClient) -> Result<Vec<Volume>> {
    let items = fetch_collection(client, "volumes", "volumes", &[]).await?;
    parse_items(items, "volume")
}

pub async fn list_snapshots(client: &VpcClient) -> Result<Vec<Snapshot>> {
    let items = fetch_collection(client, "snapshots", "snapshots", &[]).await?;
    parse_items(items, "snapshot")
}

pub async fn list_routing_tables(client: &VpcClient, vpc_id: &str) -> Result<Vec<RoutingTable>> {
    let path = format!("vpcs/{}/routing_tables", vpc_id);
    let items = fetch_collection(client, &path, "routing_tables", &[]).await?;
    let mut tables: Vec<RoutingTable> = parse_items(items, "routing table")?;
    for table in &mut tables {
        table.vpc_id = vpc_id.to_string();
    }
    Ok(tables)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_next_start_from_href() {
        let response = json!({
            "next": {"href": "https://us-south.iaas.cloud.ibm.com/v1/volumes?start=r006-abc&limit=100"}
        });
        assert_eq!(next_start(&response), Some("r006-abc".to_string()));
    }

    #[test]
    fn test_next_start_absent() {
        assert_eq!(next_start(&json!({"volumes": []})), None);
        assert_eq!(next_start(&json!({"next": {"href": "not a url"}})), None);
    }

    #[test]
    fn test_parse_items_reports_position() {
        let items = vec![
            json!({"id": "a", "name": "one", "size": 10}),
            json!({"id": "b", "name": "two"}),
        ];
        let err = parse_items::<Snapshot>(items, "snapshot").unwrap_err();
        assert!(err.to_string().contains("position 1"));
    }
}
