//! Security group rule analysis
//!
//! Two questions are answered here: "which rules expose this port to this
//! source?" ([`SecurityRuleAnalyzer::find_exposed_port`]) and "how risky is
//! this rule?" ([`SecurityRuleAnalyzer::classify_risk`]).

use crate::error::Error;
use crate::resource::{Cidr, Direction, Protocol, ResourceRef, SecurityGroup, SecurityGroupRule};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unrestricted IPv4 source
pub const INTERNET_CIDR: &str = "0.0.0.0/0";

pub const SSH_PORT: u16 = 22;
pub const RDP_PORT: u16 = 3389;

/// Well-known services, used to label sensitive ports in findings
const SERVICE_NAMES: &[(u16, &str)] = &[
    (21, "FTP"),
    (22, "SSH"),
    (23, "Telnet"),
    (25, "SMTP"),
    (445, "SMB"),
    (1433, "SQL Server"),
    (1521, "Oracle"),
    (3306, "MySQL"),
    (3389, "RDP"),
    (5432, "PostgreSQL"),
    (5900, "VNC"),
    (6379, "Redis"),
    (9200, "Elasticsearch"),
    (27017, "MongoDB"),
];

fn service_name(port: u16) -> &'static str {
    SERVICE_NAMES
        .iter()
        .find(|(p, _)| *p == port)
        .map(|(_, name)| *name)
        .unwrap_or("service")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for RiskLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(RiskLevel::Low),
            "medium" => Ok(RiskLevel::Medium),
            "high" => Ok(RiskLevel::High),
            "critical" => Ok(RiskLevel::Critical),
            other => Err(Error::validation(format!("Unknown risk level '{}'", other))),
        }
    }
}

/// Thresholds for risk classification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskPolicy {
    /// Ports whose exposure to the internet is `high`
    pub sensitive_ports: Vec<u16>,
    /// Internet-facing ranges wider than this are `medium`
    pub wide_port_range: u32,
    /// Non-internet sources with a prefix shorter than this are `medium`
    pub broad_prefix_floor: u8,
}

impl Default for RiskPolicy {
    fn default() -> Self {
        Self {
            sensitive_ports: SERVICE_NAMES.iter().map(|(port, _)| *port).collect(),
            wide_port_range: 1000,
            broad_prefix_floor: 8,
        }
    }
}

/// Risk level plus every factor that contributed to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub level: RiskLevel,
    pub reason: String,
    pub factors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFinding {
    pub security_group_id: String,
    pub security_group_name: String,
    pub vpc: ResourceRef,
    pub rule: SecurityGroupRule,
    pub risk_level: RiskLevel,
    pub reason: String,
    pub factors: Vec<String>,
}

/// A rule that could not be evaluated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidRule {
    pub security_group_id: String,
    pub security_group_name: String,
    pub rule_id: String,
    pub error: String,
}

/// Findings from one region's security groups
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleScan {
    pub criteria: String,
    pub groups_scanned: usize,
    pub rules_scanned: usize,
    pub findings: Vec<RiskFinding>,
    pub invalid_rules: Vec<InvalidRule>,
}

impl RuleScan {
    /// Distinct security groups with at least one finding, in finding order
    pub fn affected_groups(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::new();
        for finding in &self.findings {
            if !ids.contains(&finding.security_group_id.as_str()) {
                ids.push(&finding.security_group_id);
            }
        }
        ids
    }
}

/// Protocol/port/source exposure query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortQuery {
    pub protocol: Protocol,
    /// `None` matches any port
    pub port: Option<u16>,
    pub source_cidr: Cidr,
}

impl PortQuery {
    /// Build a query, validating the source CIDR
    pub fn new(protocol: Protocol, port: Option<u16>, source_cidr: &str) -> Result<Self, Error> {
        if protocol == Protocol::Other {
            return Err(Error::validation("Protocol must be tcp, udp, icmp or all"));
        }
        Ok(Self {
            protocol,
            port,
            source_cidr: source_cidr.parse()?,
        })
    }

    pub fn ssh() -> Self {
        Self::internet(Protocol::Tcp, SSH_PORT)
    }

    pub fn rdp() -> Self {
        Self::internet(Protocol::Tcp, RDP_PORT)
    }

    fn internet(protocol: Protocol, port: u16) -> Self {
        Self {
            protocol,
            port: Some(port),
            source_cidr: Cidr {
                addr: std::net::IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED),
                prefix: 0,
            },
        }
    }

    /// Human-readable summary, e.g. "TCP port 22 from 0.0.0.0/0"
    pub fn describe(&self) -> String {
        let mut desc = self.protocol.to_string().to_uppercase();
        if let Some(port) = self.port {
            desc.push_str(&format!(" port {}", port));
        }
        desc.push_str(&format!(" from {}", self.source_cidr));
        desc
    }
}

/// Classifies rules against a [`RiskPolicy`]
#[derive(Debug, Clone, Default)]
pub struct SecurityRuleAnalyzer {
    policy: RiskPolicy,
}

impl SecurityRuleAnalyzer {
    pub fn new(policy: RiskPolicy) -> Self {
        Self { policy }
    }

    /// Risk level of a single rule. First matching level wins:
    /// critical, high, medium, low.
    pub fn classify_risk(&self, rule: &SecurityGroupRule) -> Result<RiskLevel, Error> {
        self.assess(rule).map(|a| a.level)
    }

    /// Risk level with the factors behind it
    pub fn assess(&self, rule: &SecurityGroupRule) -> Result<RiskAssessment, Error> {
        let (min, max) = rule.port_range()?;
        let remote = rule.remote.cidr().transpose()?;

        if rule.direction == Direction::Outbound {
            return Ok(RiskAssessment {
                level: RiskLevel::Low,
                reason: "Outbound rule".to_string(),
                factors: Vec::new(),
            });
        }

        let internet = remote.map(|c| c.is_internet()).unwrap_or(false);
        let ported = rule.protocol.has_ports();
        let full_range = min <= 1 && max == u16::MAX;
        let width = u32::from(max) - u32::from(min);
        let source = remote
            .map(|c| c.to_string())
            .unwrap_or_else(|| "a security group".to_string());

        let mut factors = Vec::new();
        if internet {
            factors.push(format!("Source allows traffic from anywhere ({})", source));
        }

        let mut exposed: Vec<u16> = Vec::new();
        if ported {
            for port in &self.policy.sensitive_ports {
                if (min..=max).contains(port) && !exposed.contains(port) {
                    exposed.push(*port);
                    factors.push(format!("Exposes {} (port {})", service_name(*port), port));
                }
            }
        }

        let wide = ported && width > self.policy.wide_port_range;
        if wide {
            factors.push(format!("Very wide port range ({}-{})", min, max));
        }

        let broad = remote
            .map(|c| !c.is_internet() && c.prefix < self.policy.broad_prefix_floor)
            .unwrap_or(false);
        if broad {
            factors.push(format!("Source {} is overly broad", source));
        }

        let (level, reason) = if rule.protocol == Protocol::All && full_range && internet {
            (
                RiskLevel::Critical,
                format!("All protocols and ports open to {}", source),
            )
        } else if internet && !exposed.is_empty() {
            let labels: Vec<String> = exposed
                .iter()
                .map(|p| format!("{} ({})", service_name(*p), p))
                .collect();
            (
                RiskLevel::High,
                format!("Exposes {} to {}", labels.join(", "), source),
            )
        } else if internet && wide {
            (
                RiskLevel::Medium,
                format!("Port range {}-{} open to {}", min, max, source),
            )
        } else if broad {
            (
                RiskLevel::Medium,
                format!("Source {} is broader than /{}", source, self.policy.broad_prefix_floor),
            )
        } else {
            (
                RiskLevel::Low,
                factors
                    .first()
                    .cloned()
                    .unwrap_or_else(|| "No elevated exposure".to_string()),
            )
        };

        Ok(RiskAssessment {
            level,
            reason,
            factors,
        })
    }

    /// Whether an inbound rule admits `query`'s traffic
    pub fn rule_matches(&self, rule: &SecurityGroupRule, query: &PortQuery) -> Result<bool, Error> {
        let (min, max) = rule.port_range()?;
        let remote = rule.remote.cidr().transpose()?;

        if rule.direction != Direction::Inbound || !rule.protocol.matches(query.protocol) {
            return Ok(false);
        }

        // Port-less protocols (icmp) admit every port query
        if let Some(port) = query.port {
            if rule.protocol.has_ports() && !(min..=max).contains(&port) {
                return Ok(false);
            }
        }

        Ok(remote.map(|c| c == query.source_cidr).unwrap_or(false))
    }

    /// Inbound rules exposing `query.port` over `query.protocol` to `query.source_cidr`
    pub fn find_exposed_port(&self, groups: &[SecurityGroup], query: &PortQuery) -> RuleScan {
        self.scan(groups, query.describe(), |rule| {
            if !self.rule_matches(rule, query)? {
                return Ok(None);
            }
            self.assess(rule).map(Some)
        })
    }

    /// TCP/22 from anywhere
    pub fn find_open_ssh(&self, groups: &[SecurityGroup]) -> RuleScan {
        self.find_exposed_port(groups, &PortQuery::ssh())
    }

    /// TCP/3389 from anywhere
    pub fn find_open_rdp(&self, groups: &[SecurityGroup]) -> RuleScan {
        self.find_exposed_port(groups, &PortQuery::rdp())
    }

    /// Every rule at or above `min_level`, most severe first
    pub fn scan_groups(&self, groups: &[SecurityGroup], min_level: RiskLevel) -> RuleScan {
        let mut scan = self.scan(groups, format!("risk level >= {}", min_level), |rule| {
            let assessment = self.assess(rule)?;
            Ok((assessment.level >= min_level).then_some(assessment))
        });
        // Stable: ties keep group/rule order
        scan.findings
            .sort_by(|a, b| b.risk_level.cmp(&a.risk_level));
        scan
    }

    fn scan<F>(&self, groups: &[SecurityGroup], criteria: String, mut evaluate: F) -> RuleScan
    where
        F: FnMut(&SecurityGroupRule) -> Result<Option<RiskAssessment>, Error>,
    {
        let mut scan = RuleScan {
            criteria,
            groups_scanned: groups.len(),
            ..Default::default()
        };

        for group in groups {
            for rule in &group.rules {
                scan.rules_scanned += 1;
                match evaluate(rule) {
                    Ok(Some(assessment)) => scan.findings.push(RiskFinding {
                        security_group_id: group.id.clone(),
                        security_group_name: group.name.clone(),
                        vpc: group.vpc.clone(),
                        rule: rule.clone(),
                        risk_level: assessment.level,
                        reason: assessment.reason,
                        factors: assessment.factors,
                    }),
                    Ok(None) => {}
                    Err(e) => {
                        tracing::debug!("Rule {} in {} is invalid: {}", rule.id, group.id, e);
                        scan.invalid_rules.push(InvalidRule {
                            security_group_id: group.id.clone(),
                            security_group_name: group.name.clone(),
                            rule_id: rule.id.clone(),
                            error: e.to_string(),
                        });
                    }
                }
            }
        }

        scan
    }
}
