//! Typed VPC resources
//!
//! Every payload that enters the analyzers is deserialized into one of these
//! structs first. Optional API fields are `Option`s or carry serde defaults.

use crate::error::Error;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

/// Reference to another resource (`{id, name, ...}`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

// =============================================================================
// Networking
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vpc {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub default_security_group: Option<ResourceRef>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subnet {
    pub id: String,
    pub name: String,
    pub vpc: ResourceRef,
    pub zone: ResourceRef,
    #[serde(default)]
    pub ipv4_cidr_block: Option<String>,
    #[serde(default)]
    pub available_ipv4_address_count: u64,
    #[serde(default)]
    pub public_gateway: Option<ResourceRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    pub id: String,
    pub name: String,
    pub vpc: ResourceRef,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub zone: Option<ResourceRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicGateway {
    pub id: String,
    pub name: String,
    pub vpc: ResourceRef,
    pub zone: ResourceRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingTable {
    pub id: String,
    pub name: String,
    /// Filled in by the fetcher; the API nests tables under their VPC
    #[serde(default)]
    pub vpc_id: String,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub lifecycle_state: String,
    #[serde(default)]
    pub route_direct_link_ingress: bool,
    #[serde(default)]
    pub route_transit_gateway_ingress: bool,
    #[serde(default)]
    pub route_vpc_zone_ingress: bool,
    #[serde(default)]
    pub subnets: Vec<ResourceRef>,
    #[serde(default)]
    pub routes: Vec<ResourceRef>,
}

// =============================================================================
// Security groups
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityGroup {
    pub id: String,
    pub name: String,
    pub vpc: ResourceRef,
    #[serde(default)]
    pub rules: Vec<SecurityGroupRule>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Inbound,
    Outbound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
    Icmp,
    #[serde(alias = "any", alias = "icmp_tcp_udp")]
    All,
    /// Protocols without ports that the analyzers do not model (gre, esp, ...)
    #[serde(other)]
    Other,
}

impl Protocol {
    /// Whether rules of this protocol carry a port range
    pub fn has_ports(self) -> bool {
        matches!(self, Protocol::Tcp | Protocol::Udp | Protocol::All)
    }

    /// `all` on either side matches every protocol
    pub fn matches(self, other: Protocol) -> bool {
        self == Protocol::All || other == Protocol::All || self == other
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
            Protocol::Icmp => "icmp",
            Protocol::All => "all",
            Protocol::Other => "other",
        };
        f.write_str(s)
    }
}

impl FromStr for Protocol {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tcp" => Ok(Protocol::Tcp),
            "udp" => Ok(Protocol::Udp),
            "icmp" => Ok(Protocol::Icmp),
            "all" | "any" | "icmp_tcp_udp" => Ok(Protocol::All),
            other => Err(Error::validation(format!(
                "Unsupported protocol '{}': expected tcp, udp, icmp or all",
                other
            ))),
        }
    }
}

/// Traffic source/destination of a rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Remote {
    Cidr {
        cidr_block: String,
    },
    Address {
        address: String,
    },
    SecurityGroup {
        id: String,
        #[serde(default)]
        name: Option<String>,
    },
}

impl Remote {
    /// The remote as a CIDR; `None` for security-group references.
    /// A single address is treated as a host route.
    pub fn cidr(&self) -> Option<Result<Cidr, Error>> {
        match self {
            Remote::Cidr { cidr_block } => Some(cidr_block.parse()),
            Remote::Address { address } => Some(address.parse()),
            Remote::SecurityGroup { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityGroupRule {
    pub id: String,
    /// Filled in by the fetcher from the owning group
    #[serde(default)]
    pub security_group_id: String,
    pub direction: Direction,
    pub protocol: Protocol,
    #[serde(default)]
    pub port_min: Option<u16>,
    #[serde(default)]
    pub port_max: Option<u16>,
    pub remote: Remote,
}

impl SecurityGroupRule {
    /// Effective inclusive port range; unset bounds widen to 0 and 65535.
    /// Errors if the bounds are inverted.
    pub fn port_range(&self) -> Result<(u16, u16), Error> {
        let min = self.port_min.unwrap_or(0);
        let max = self.port_max.unwrap_or(u16::MAX);
        if min > max {
            return Err(Error::validation(format!(
                "Rule {} has inverted port range {}-{}",
                self.id, min, max
            )));
        }
        Ok((min, max))
    }
}

/// IPv4 or IPv6 network in prefix notation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cidr {
    pub addr: IpAddr,
    pub prefix: u8,
}

impl Cidr {
    /// `0.0.0.0/0` or `::/0`
    pub fn is_internet(&self) -> bool {
        self.prefix == 0
    }
}

impl FromStr for Cidr {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (addr_part, prefix_part) = match s.split_once('/') {
            Some((addr, prefix)) => (addr, Some(prefix)),
            None => (s, None),
        };

        let addr: IpAddr = addr_part
            .parse()
            .map_err(|_| Error::validation(format!("Malformed CIDR '{}'", s)))?;
        let max_prefix = if addr.is_ipv4() { 32 } else { 128 };
        let prefix = match prefix_part {
            Some(p) => p
                .parse::<u8>()
                .ok()
                .filter(|p| *p <= max_prefix)
                .ok_or_else(|| Error::validation(format!("Malformed CIDR '{}'", s)))?,
            None => max_prefix,
        };

        Ok(Self { addr, prefix })
    }
}

impl fmt::Display for Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.prefix)
    }
}

// =============================================================================
// Backups
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupPolicy {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub lifecycle_state: String,
    #[serde(default)]
    pub resource_group: Option<ResourceRef>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupPlan {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub cron_spec: String,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub lifecycle_state: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Running,
    Succeeded,
    Failed,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::Running => "running",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
            JobStatus::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupJob {
    pub id: String,
    pub status: JobStatus,
    #[serde(rename = "backup_policy_plan", default)]
    pub plan: Option<ResourceRef>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Block storage
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentState {
    Attached,
    #[default]
    Unattached,
    Unusable,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for AttachmentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AttachmentState::Attached => "attached",
            AttachmentState::Unattached => "unattached",
            AttachmentState::Unusable => "unusable",
            AttachmentState::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volume {
    pub id: String,
    pub name: String,
    #[serde(rename = "capacity")]
    pub capacity_gb: u64,
    #[serde(default)]
    pub iops: u64,
    pub profile: ResourceRef,
    pub zone: ResourceRef,
    #[serde(default)]
    pub attachment_state: AttachmentState,
    #[serde(default)]
    pub encryption: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: String,
    pub name: String,
    #[serde(rename = "size")]
    pub size_gb: u64,
    #[serde(default)]
    pub source_volume: Option<ResourceRef>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rule_remote_variants() {
        let rule: SecurityGroupRule = serde_json::from_value(json!({
            "id": "r1",
            "direction": "inbound",
            "protocol": "tcp",
            "port_min": 22,
            "port_max": 22,
            "remote": {"cidr_block": "0.0.0.0/0"}
        }))
        .unwrap();
        assert_eq!(
            rule.remote,
            Remote::Cidr {
                cidr_block: "0.0.0.0/0".to_string()
            }
        );

        let rule: SecurityGroupRule = serde_json::from_value(json!({
            "id": "r2",
            "direction": "outbound",
            "protocol": "all",
            "remote": {"id": "sg-1", "name": "web", "crn": "crn:v1:x", "href": "https://x"}
        }))
        .unwrap();
        assert!(matches!(rule.remote, Remote::SecurityGroup { ref id, .. } if id == "sg-1"));
        assert_eq!(rule.port_range().unwrap(), (0, 65535));

        let rule: SecurityGroupRule = serde_json::from_value(json!({
            "id": "r3",
            "direction": "inbound",
            "protocol": "icmp",
            "remote": {"address": "10.1.2.3"}
        }))
        .unwrap();
        let cidr = rule.remote.cidr().unwrap().unwrap();
        assert_eq!(cidr.to_string(), "10.1.2.3/32");
    }

    #[test]
    fn test_protocol_aliases() {
        let p: Protocol = serde_json::from_value(json!("icmp_tcp_udp")).unwrap();
        assert_eq!(p, Protocol::All);
        let p: Protocol = serde_json::from_value(json!("gre")).unwrap();
        assert_eq!(p, Protocol::Other);
        assert!("TCP".parse::<Protocol>().is_ok());
        assert!("sctp".parse::<Protocol>().is_err());
    }

    #[test]
    fn test_inverted_port_range_is_rejected() {
        let rule = SecurityGroupRule {
            id: "bad".into(),
            security_group_id: "sg".into(),
            direction: Direction::Inbound,
            protocol: Protocol::Tcp,
            port_min: Some(100),
            port_max: Some(10),
            remote: Remote::Cidr {
                cidr_block: "0.0.0.0/0".into(),
            },
        };
        assert!(matches!(rule.port_range(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_cidr_parsing() {
        let c: Cidr = "0.0.0.0/0".parse().unwrap();
        assert!(c.is_internet());
        let c: Cidr = "::/0".parse().unwrap();
        assert!(c.is_internet());
        assert!("10.0.0.0/33".parse::<Cidr>().is_err());
        assert!("not-a-cidr".parse::<Cidr>().is_err());
        assert_eq!("192.168.0.0/16".parse::<Cidr>().unwrap().prefix, 16);
    }

    #[test]
    fn test_volume_and_job_shapes() {
        let vol: Volume = serde_json::from_value(json!({
            "id": "v1",
            "name": "data",
            "capacity": 100,
            "iops": 3000,
            "profile": {"name": "general-purpose"},
            "zone": {"name": "us-south-1"}
        }))
        .unwrap();
        assert_eq!(vol.attachment_state, AttachmentState::Unattached);
        assert_eq!(vol.capacity_gb, 100);

        let job: BackupJob = serde_json::from_value(json!({
            "id": "j1",
            "status": "succeeded",
            "backup_policy_plan": {"id": "p1", "name": "daily"},
            "created_at": "2026-10-01T00:00:00Z"
        }))
        .unwrap();
        assert_eq!(job.plan.unwrap().id, "p1");
        assert_eq!(job.status, JobStatus::Succeeded);
    }
}
