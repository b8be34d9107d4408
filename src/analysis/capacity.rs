//! Block storage usage summaries

use crate::resource::{AttachmentState, Snapshot, Volume};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneUsage {
    pub count: usize,
    pub capacity_gb: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUsage {
    pub count: usize,
    pub capacity_gb: u64,
    pub iops: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageReport {
    pub total_volumes: usize,
    pub total_capacity_gb: u64,
    pub attached_volumes: usize,
    pub unattached_volumes: usize,
    pub attachment_percentage: f64,
    pub by_zone: BTreeMap<String, ZoneUsage>,
    pub by_profile: BTreeMap<String, ProfileUsage>,
    pub by_attachment_state: BTreeMap<AttachmentState, usize>,
    pub unattached: Vec<Volume>,
    pub total_snapshots: usize,
    pub total_snapshot_gb: u64,
    pub orphaned_snapshots: Vec<Snapshot>,
}

impl UsageReport {
    /// Fold another report (typically another region's) into this one
    pub fn merge(&mut self, other: UsageReport) {
        self.total_volumes += other.total_volumes;
        self.total_capacity_gb += other.total_capacity_gb;
        self.attached_volumes += other.attached_volumes;
        self.unattached_volumes += other.unattached_volumes;

        for (zone, usage) in other.by_zone {
            let entry = self.by_zone.entry(zone).or_default();
            entry.count += usage.count;
            entry.capacity_gb += usage.capacity_gb;
        }
        for (profile, usage) in other.by_profile {
            let entry = self.by_profile.entry(profile).or_default();
            entry.count += usage.count;
            entry.capacity_gb += usage.capacity_gb;
            entry.iops += usage.iops;
        }
        for (state, count) in other.by_attachment_state {
            *self.by_attachment_state.entry(state).or_default() += count;
        }

        self.unattached.extend(other.unattached);
        self.total_snapshots += other.total_snapshots;
        self.total_snapshot_gb += other.total_snapshot_gb;
        self.orphaned_snapshots.extend(other.orphaned_snapshots);
        self.attachment_percentage = percentage(self.attached_volumes, self.total_volumes);
    }

    /// Capacity held by unattached volumes
    pub fn unattached_capacity_gb(&self) -> u64 {
        self.unattached.iter().map(|v| v.capacity_gb).sum()
    }
}

fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let pct = part as f64 / total as f64 * 100.0;
    (pct * 100.0).round() / 100.0
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CapacityAggregator;

impl CapacityAggregator {
    pub fn summarize(&self, volumes: &[Volume], snapshots: &[Snapshot]) -> UsageReport {
        let mut report = UsageReport {
            total_volumes: volumes.len(),
            total_snapshots: snapshots.len(),
            ..Default::default()
        };

        for volume in volumes {
            report.total_capacity_gb += volume.capacity_gb;

            let zone = report.by_zone.entry(volume.zone.name.clone()).or_default();
            zone.count += 1;
            zone.capacity_gb += volume.capacity_gb;

            let profile = report
                .by_profile
                .entry(volume.profile.name.clone())
                .or_default();
            profile.count += 1;
            profile.capacity_gb += volume.capacity_gb;
            profile.iops += volume.iops;

            *report
                .by_attachment_state
                .entry(volume.attachment_state)
                .or_default() += 1;

            match volume.attachment_state {
                AttachmentState::Attached => report.attached_volumes += 1,
                AttachmentState::Unattached => {
                    report.unattached_volumes += 1;
                    report.unattached.push(volume.clone());
                }
                _ => {}
            }
        }
        report.attachment_percentage = percentage(report.attached_volumes, report.total_volumes);

        let volume_ids: HashSet<&str> = volumes.iter().map(|v| v.id.as_str()).collect();
        for snapshot in snapshots {
            report.total_snapshot_gb += snapshot.size_gb;
            let orphaned = snapshot
                .source_volume
                .as_ref()
                .map_or(true, |source| !volume_ids.contains(source.id.as_str()));
            if orphaned {
                report.orphaned_snapshots.push(snapshot.clone());
            }
        }

        tracing::debug!(
            "Summarized {} volumes and {} snapshots ({} orphaned)",
            report.total_volumes,
            report.total_snapshots,
            report.orphaned_snapshots.len()
        );
        report
    }
}
