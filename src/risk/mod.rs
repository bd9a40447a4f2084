//! Risk reports built from path searches and degree statistics.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::backend::{BackendKind, BackendSelector};
use crate::config::RiskConfig;
use crate::error::{Result, VendorGraphError};
use crate::model::{PathQuery, RelationshipPath, MAX_TRAVERSAL_DEPTH};

/// How repeated paths to one vendor fold into `avg_risk_score`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskAveraging {
    /// `avg = (avg + risk) / 2` per additional path; later paths weigh more.
    #[default]
    #[serde(rename = "pairwise")]
    Pairwise,
    #[serde(rename = "mean")]
    ArithmeticMean,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HotspotLevel {
    Medium,
    High,
    Critical,
}

/// CRITICAL at 10+ connections, HIGH at 7+, MEDIUM below.
pub fn classify_hotspot(total_connections: usize) -> HotspotLevel {
    match total_connections {
        n if n >= 10 => HotspotLevel::Critical,
        n if n >= 7 => HotspotLevel::High,
        _ => HotspotLevel::Medium,
    }
}

pub fn party_classification(party_level: usize) -> String {
    match party_level {
        1 => "First-party (Direct vendors)".to_string(),
        2 => "Second-party (Vendors' vendors)".to_string(),
        3 => "3rd-party vendors".to_string(),
        n => format!("{}th-party vendors", n),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SupplyChainReport {
    pub source_vendor_id: String,
    pub source_vendor_name: String,
    pub backend: BackendKind,
    pub paths_found: usize,
    /// Riskiest first.
    pub paths: Vec<RelationshipPath>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelStats {
    pub depth: usize,
    /// Paths ending at this depth.
    pub vendors_found: usize,
    pub avg_risk_score: f64,
    pub min_risk_score: f64,
    pub max_risk_score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeepSearchReport {
    pub source_vendor_id: String,
    pub source_vendor_name: String,
    pub backend: BackendKind,
    pub max_depth_searched: usize,
    pub total_paths_found: usize,
    pub levels: Vec<LevelStats>,
    pub top_risk_paths: Vec<RelationshipPath>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hotspot {
    pub vendor_id: String,
    pub vendor_name: String,
    pub industry: Option<String>,
    pub total_connections: usize,
    pub outgoing_connections: usize,
    pub incoming_connections: usize,
    pub risk_classification: HotspotLevel,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HotspotSummary {
    pub critical: Vec<String>,
    pub high: Vec<String>,
    pub medium: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HotspotReport {
    pub backend: BackendKind,
    pub min_connections: usize,
    pub hotspots_found: usize,
    pub hotspots: Vec<Hotspot>,
    pub summary: HotspotSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NthPartyVendor {
    pub vendor_id: String,
    pub vendor_name: String,
    pub industry: Option<String>,
    pub paths_to_target: usize,
    pub avg_risk_score: f64,
    pub strongest_path_strength: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct NthPartyReport {
    pub source_vendor_id: String,
    pub source_vendor_name: String,
    pub backend: BackendKind,
    pub party_level: usize,
    pub party_classification: String,
    pub vendors_found: usize,
    pub vendors: Vec<NthPartyVendor>,
}

/// Risk-management views over a [`BackendSelector`].
pub struct RiskAggregator {
    selector: BackendSelector,
    config: RiskConfig,
}

impl RiskAggregator {
    pub fn new(selector: BackendSelector, config: RiskConfig) -> Self {
        Self { selector, config }
    }

    pub fn selector(&self) -> &BackendSelector {
        &self.selector
    }

    /// Run `query` and order its paths by risk score, highest first.
    pub async fn supply_chain_analysis(&self, query: &PathQuery) -> Result<SupplyChainReport> {
        query.validate()?;
        let source = self.selector.vendor(&query.source_vendor_id).await?;
        let search = self.selector.find_paths(query).await?;
        let mut paths = search.paths;
        sort_by_risk(&mut paths);
        Ok(SupplyChainReport {
            source_vendor_id: source.vendor_id,
            source_vendor_name: source.name,
            backend: search.backend,
            paths_found: paths.len(),
            paths,
        })
    }

    pub async fn deep_search(&self, vendor_id: &str, max_depth: usize) -> Result<DeepSearchReport> {
        check_depth("max_depth", max_depth)?;
        let source = self.selector.vendor(vendor_id).await?;
        let query = PathQuery::new(vendor_id, 1, max_depth).with_limit(self.config.deep_search_limit);
        let search = self.selector.find_paths(&query).await?;

        let levels = level_statistics(&search.paths);
        let mut top_risk_paths = search.paths;
        sort_by_risk(&mut top_risk_paths);
        top_risk_paths.truncate(self.config.top_risk_paths);

        log::debug!(
            "Deep search from {}: {} paths over {} levels",
            vendor_id,
            search.paths_found,
            levels.len()
        );
        Ok(DeepSearchReport {
            source_vendor_id: source.vendor_id,
            source_vendor_name: source.name,
            backend: search.backend,
            max_depth_searched: max_depth,
            total_paths_found: search.paths_found,
            levels,
            top_risk_paths,
        })
    }

    /// Vendors with at least `min_connections` direct edges, most connected
    /// first.
    pub async fn hotspots(&self, min_connections: usize) -> Result<HotspotReport> {
        if min_connections == 0 {
            return Err(VendorGraphError::Validation(
                "min_connections must be at least 1".to_string(),
            ));
        }
        let (backend, rows) = self.selector.all_network_stats().await?;
        let mut hotspots = Vec::new();
        for (vendor, stats) in rows {
            if stats.total_connections < min_connections {
                continue;
            }
            hotspots.push(Hotspot {
                vendor_id: vendor.vendor_id,
                vendor_name: vendor.name,
                industry: vendor.industry,
                total_connections: stats.total_connections,
                outgoing_connections: stats.outgoing_count,
                incoming_connections: stats.incoming_count,
                risk_classification: classify_hotspot(stats.total_connections),
            });
        }
        Ok(hotspot_report(backend, min_connections, hotspots))
    }

    /// Distinct vendors exactly `party_level` hops away, riskiest first.
    pub async fn nth_party_assessment(
        &self,
        vendor_id: &str,
        party_level: usize,
    ) -> Result<NthPartyReport> {
        check_depth("party_level", party_level)?;
        let source = self.selector.vendor(vendor_id).await?;
        let query = PathQuery::new(vendor_id, party_level, party_level)
            .with_limit(self.config.nth_party_limit);
        let search = self.selector.find_paths(&query).await?;
        let vendors = group_nth_party(&search.paths, self.config.nth_party_averaging);

        Ok(NthPartyReport {
            source_vendor_id: source.vendor_id,
            source_vendor_name: source.name,
            backend: search.backend,
            party_level,
            party_classification: party_classification(party_level),
            vendors_found: vendors.len(),
            vendors,
        })
    }
}

fn check_depth(name: &str, value: usize) -> Result<()> {
    if !(1..=MAX_TRAVERSAL_DEPTH).contains(&value) {
        return Err(VendorGraphError::Validation(format!(
            "{} must be between 1 and {}, got {}",
            name, MAX_TRAVERSAL_DEPTH, value
        )));
    }
    Ok(())
}

fn sort_by_risk(paths: &mut [RelationshipPath]) {
    paths.sort_by(|a, b| b.risk_score.total_cmp(&a.risk_score));
}

/// Per-depth counts and risk spread, shallowest first.
pub fn level_statistics(paths: &[RelationshipPath]) -> Vec<LevelStats> {
    let mut by_depth: BTreeMap<usize, Vec<f64>> = BTreeMap::new();
    for path in paths {
        by_depth.entry(path.path_length).or_default().push(path.risk_score);
    }
    by_depth
        .into_iter()
        .map(|(depth, risks)| LevelStats {
            depth,
            vendors_found: risks.len(),
            avg_risk_score: risks.iter().sum::<f64>() / risks.len() as f64,
            min_risk_score: risks.iter().copied().fold(f64::INFINITY, f64::min),
            max_risk_score: risks.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        })
        .collect()
}

pub fn hotspot_report(
    backend: BackendKind,
    min_connections: usize,
    mut hotspots: Vec<Hotspot>,
) -> HotspotReport {
    hotspots.sort_by(|a, b| {
        b.total_connections
            .cmp(&a.total_connections)
            .then_with(|| a.vendor_id.cmp(&b.vendor_id))
    });
    let mut summary = HotspotSummary::default();
    for h in &hotspots {
        let bucket = match h.risk_classification {
            HotspotLevel::Critical => &mut summary.critical,
            HotspotLevel::High => &mut summary.high,
            HotspotLevel::Medium => &mut summary.medium,
        };
        bucket.push(h.vendor_id.clone());
    }
    HotspotReport {
        backend,
        min_connections,
        hotspots_found: hotspots.len(),
        hotspots,
        summary,
    }
}

/// Fold paths into one entry per target vendor, in path order, then sort by
/// average risk descending (ties by vendor id).
pub fn group_nth_party(paths: &[RelationshipPath], averaging: RiskAveraging) -> Vec<NthPartyVendor> {
    let mut order: Vec<String> = Vec::new();
    let mut grouped: BTreeMap<String, (NthPartyVendor, f64)> = BTreeMap::new();

    for path in paths {
        let Some(target) = path.nodes.last() else {
            continue;
        };
        match grouped.get_mut(&target.vendor_id) {
            Some((entry, risk_sum)) => {
                entry.paths_to_target += 1;
                *risk_sum += path.risk_score;
                entry.avg_risk_score = match averaging {
                    RiskAveraging::Pairwise => (entry.avg_risk_score + path.risk_score) / 2.0,
                    RiskAveraging::ArithmeticMean => *risk_sum / entry.paths_to_target as f64,
                };
                entry.strongest_path_strength =
                    entry.strongest_path_strength.max(path.total_strength);
            }
            None => {
                order.push(target.vendor_id.clone());
                grouped.insert(
                    target.vendor_id.clone(),
                    (
                        NthPartyVendor {
                            vendor_id: target.vendor_id.clone(),
                            vendor_name: target.vendor_name.clone(),
                            industry: target.industry.clone(),
                            paths_to_target: 1,
                            avg_risk_score: path.risk_score,
                            strongest_path_strength: path.total_strength,
                        },
                        path.risk_score,
                    ),
                );
            }
        }
    }

    let mut vendors: Vec<NthPartyVendor> = order
        .into_iter()
        .filter_map(|id| grouped.remove(&id).map(|(entry, _)| entry))
        .collect();
    vendors.sort_by(|a, b| {
        b.avg_risk_score
            .total_cmp(&a.avg_risk_score)
            .then_with(|| a.vendor_id.cmp(&b.vendor_id))
    });
    vendors
}
