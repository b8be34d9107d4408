//! Per-VPC resource roll-up

use crate::analysis::security::RuleScan;
use crate::resource::{Instance, PublicGateway, ResourceRef, SecurityGroup, Subnet, Vpc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Counts of what lives in one VPC, plus its SSH exposure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VpcSummary {
    pub vpc: Vpc,
    pub subnet_count: usize,
    /// Zones with at least one subnet, sorted
    pub zones: Vec<String>,
    pub instance_count: usize,
    pub instances_by_status: BTreeMap<String, usize>,
    pub security_group_count: usize,
    pub public_gateway_count: usize,
    /// Groups with an inbound rule opening SSH to the internet
    pub ssh_exposed_groups: Vec<ResourceRef>,
    pub ssh_exposure: RuleScan,
}

impl VpcSummary {
    pub fn build(
        vpc: Vpc,
        subnets: &[Subnet],
        instances: &[Instance],
        groups: &[SecurityGroup],
        gateways: &[PublicGateway],
        ssh_exposure: RuleScan,
    ) -> Self {
        let mut zones: Vec<String> = subnets.iter().map(|s| s.zone.name.clone()).collect();
        zones.sort();
        zones.dedup();

        let mut instances_by_status: BTreeMap<String, usize> = BTreeMap::new();
        for instance in instances {
            *instances_by_status.entry(instance.status.clone()).or_default() += 1;
        }

        let ssh_exposed_groups = ssh_exposure
            .affected_groups()
            .into_iter()
            .map(|id| ResourceRef {
                id: id.to_string(),
                name: groups
                    .iter()
                    .find(|g| g.id == id)
                    .map(|g| g.name.clone())
                    .unwrap_or_default(),
            })
            .collect();

        Self {
            vpc,
            subnet_count: subnets.len(),
            zones,
            instance_count: instances.len(),
            instances_by_status,
            security_group_count: groups.len(),
            public_gateway_count: gateways.len(),
            ssh_exposed_groups,
            ssh_exposure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::security::SecurityRuleAnalyzer;
    use crate::resource::{Direction, Protocol, Remote, SecurityGroupRule};

    fn reference(id: &str, name: &str) -> ResourceRef {
        ResourceRef {
            id: id.into(),
            name: name.into(),
        }
    }

    fn subnet(id: &str, zone: &str) -> Subnet {
        Subnet {
            id: id.into(),
            name: id.into(),
            vpc: reference("vpc-1", "prod"),
            zone: reference(zone, zone),
            ipv4_cidr_block: None,
            available_ipv4_address_count: 0,
            public_gateway: None,
        }
    }

    fn instance(id: &str, status: &str) -> Instance {
        Instance {
            id: id.into(),
            name: id.into(),
            vpc: reference("vpc-1", "prod"),
            status: status.into(),
            zone: None,
        }
    }

    fn group(id: &str, name: &str, open_port: u16) -> SecurityGroup {
        SecurityGroup {
            id: id.into(),
            name: name.into(),
            vpc: reference("vpc-1", "prod"),
            rules: vec![SecurityGroupRule {
                id: format!("{}-r", id),
                security_group_id: id.into(),
                direction: Direction::Inbound,
                protocol: Protocol::Tcp,
                port_min: Some(open_port),
                port_max: Some(open_port),
                remote: Remote::Cidr {
                    cidr_block: "0.0.0.0/0".into(),
                },
            }],
        }
    }

    #[test]
    fn test_summary_counts_and_ssh_groups() {
        let vpc = Vpc {
            id: "vpc-1".into(),
            name: "prod".into(),
            status: "available".into(),
            default_security_group: None,
            created_at: None,
        };
        let subnets = vec![
            subnet("s-1", "us-south-2"),
            subnet("s-2", "us-south-1"),
            subnet("s-3", "us-south-2"),
        ];
        let instances = vec![
            instance("i-1", "running"),
            instance("i-2", "running"),
            instance("i-3", "stopped"),
        ];
        let groups = vec![group("sg-1", "bastion", 22), group("sg-2", "web", 443)];
        let ssh = SecurityRuleAnalyzer::default().find_open_ssh(&groups);

        let summary = VpcSummary::build(vpc, &subnets, &instances, &groups, &[], ssh);
        assert_eq!(summary.subnet_count, 3);
        assert_eq!(summary.zones, vec!["us-south-1", "us-south-2"]);
        assert_eq!(summary.instances_by_status["running"], 2);
        assert_eq!(summary.security_group_count, 2);
        assert_eq!(summary.public_gateway_count, 0);
        assert_eq!(summary.ssh_exposed_groups, vec![reference("sg-1", "bastion")]);
    }
}
