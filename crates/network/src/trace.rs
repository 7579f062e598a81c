//! Upstream network tracing
//!
//! Computes the hydrologic upstream closure of a catchment: every catchment
//! and nexus whose flow eventually passes through the query catchment.
//!
//! The network is dendritic by assumption — each catchment drains to exactly
//! one nexus and each nexus to exactly one catchment, though a nexus may
//! receive several upstream catchments (a confluence). A catchment with more
//! than one inflow nexus violates the assumption; the tracer warns and
//! follows every inflow rather than dropping any.

use crate::hydrofabric::{waterbody_to_catchment, Hydrofabric};
use hydroforce_core::Result;
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::warn;

/// Result of an upstream trace: disjoint catchment and nexus id sets.
///
/// The query catchment is always a member of `catchments`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpstreamIds {
    pub catchments: HashSet<String>,
    pub nexuses: HashSet<String>,
}

/// Traversal layer marker for the work queue.
enum Visit {
    Catchment(String),
    Nexus(String),
}

/// Inverted `toid` indexes over a hydrofabric.
///
/// Built once per query batch so each traversal step is a hash lookup
/// instead of a table scan.
pub struct NetworkIndex {
    /// catchment id -> nexuses whose `toid` is that catchment (its inflows)
    inflows: HashMap<String, Vec<String>>,
    /// nexus id -> catchments whose `toid` is that nexus (its contributors)
    contributors: HashMap<String, Vec<String>>,
}

impl NetworkIndex {
    pub fn build(fabric: &Hydrofabric) -> Self {
        let mut inflows: HashMap<String, Vec<String>> = HashMap::new();
        for nexus in fabric.nexuses() {
            // Normalize wb- aliases so nexus toids land in catchment key space
            let downstream = waterbody_to_catchment(&nexus.toid);
            inflows.entry(downstream).or_default().push(nexus.id.clone());
        }

        let mut contributors: HashMap<String, Vec<String>> = HashMap::new();
        for divide in fabric.divides() {
            contributors
                .entry(divide.toid.clone())
                .or_default()
                .push(divide.id.clone());
        }

        Self {
            inflows,
            contributors,
        }
    }

    /// Breadth-first upstream closure of `catchment_id`.
    ///
    /// Alternates between the catchment and nexus layers: a catchment's
    /// inflow nexuses are enqueued, then each nexus's contributing
    /// catchments. Per-layer visited sets guarantee termination even on
    /// cyclic input. Headwaters (no inflow nexus) end their branch quietly.
    pub fn upstream_of(&self, catchment_id: &str) -> UpstreamIds {
        let mut cat_ids: HashSet<String> = HashSet::new();
        let mut nex_ids: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<Visit> = VecDeque::new();
        queue.push_back(Visit::Catchment(catchment_id.to_string()));

        while let Some(visit) = queue.pop_front() {
            match visit {
                Visit::Catchment(id) => {
                    if !cat_ids.insert(id.clone()) {
                        continue;
                    }
                    match self.inflows.get(&id) {
                        None => {} // headwater
                        Some(inflow) => {
                            if inflow.len() > 1 {
                                warn!(
                                    catchment = %id,
                                    inflows = inflow.len(),
                                    "catchment network is not dendritic; following all inflows"
                                );
                            }
                            for nexus in inflow {
                                queue.push_back(Visit::Nexus(nexus.clone()));
                            }
                        }
                    }
                }
                Visit::Nexus(id) => {
                    if !nex_ids.insert(id.clone()) {
                        continue;
                    }
                    if let Some(cats) = self.contributors.get(&id) {
                        for cat in cats {
                            queue.push_back(Visit::Catchment(cat.clone()));
                        }
                    }
                }
            }
        }

        UpstreamIds {
            catchments: cat_ids,
            nexuses: nex_ids,
        }
    }
}

/// Trace the upstream closure of one catchment.
///
/// Fails with `Error::NotFound` when `catchment_id` is not in the divides
/// table; an id with no upstream network returns just itself.
pub fn trace_upstream(fabric: &Hydrofabric, catchment_id: &str) -> Result<UpstreamIds> {
    fabric.require_divide(catchment_id)?;
    let index = NetworkIndex::build(fabric);
    Ok(index.upstream_of(catchment_id))
}

/// Number of upstream catchments for every catchment in the hydrofabric,
/// sorted most-upstream-first.
///
/// The count includes the catchment itself, matching the closure returned
/// by [`trace_upstream`].
pub fn upstream_counts(fabric: &Hydrofabric) -> Vec<(String, usize)> {
    let index = NetworkIndex::build(fabric);
    let mut counts: Vec<(String, usize)> = fabric
        .divides()
        .iter()
        .map(|d| {
            let up = index.upstream_of(&d.id);
            (d.id.clone(), up.catchments.len())
        })
        .collect();
    // Descending by count; id ties broken lexically for stable output
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hydrofabric::{Divide, Nexus};
    use geo_types::MultiPolygon;
    use hydroforce_core::{Crs, Error};

    fn divide(id: &str, toid: &str) -> Divide {
        Divide {
            id: id.to_string(),
            toid: toid.to_string(),
            geometry: MultiPolygon(vec![]),
        }
    }

    fn nexus(id: &str, toid: &str) -> Nexus {
        Nexus {
            id: id.to_string(),
            toid: toid.to_string(),
        }
    }

    /// Five catchments, three nexuses, one confluence:
    ///
    /// ```text
    /// cat-1 ─┐
    ///        ├─> nex-1 ─> cat-3 ─> nex-2 ─> cat-4 ─> nex-3 ─> cat-5
    /// cat-2 ─┘
    /// ```
    fn tree() -> Hydrofabric {
        Hydrofabric::new(
            vec![
                divide("cat-1", "nex-1"),
                divide("cat-2", "nex-1"),
                divide("cat-3", "nex-2"),
                divide("cat-4", "nex-3"),
                divide("cat-5", "nex-terminal"),
            ],
            vec![
                nexus("nex-1", "cat-3"),
                nexus("nex-2", "cat-4"),
                nexus("nex-3", "cat-5"),
            ],
            Crs::wgs84(),
        )
    }

    fn ids(items: &[&str]) -> HashSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_leaf_is_its_own_closure() {
        let up = trace_upstream(&tree(), "cat-1").unwrap();
        assert_eq!(up.catchments, ids(&["cat-1"]));
        assert!(up.nexuses.is_empty());
    }

    #[test]
    fn test_root_collects_everything() {
        let up = trace_upstream(&tree(), "cat-5").unwrap();
        assert_eq!(
            up.catchments,
            ids(&["cat-1", "cat-2", "cat-3", "cat-4", "cat-5"])
        );
        assert_eq!(up.nexuses, ids(&["nex-1", "nex-2", "nex-3"]));
    }

    #[test]
    fn test_confluence_includes_both_branches() {
        let up = trace_upstream(&tree(), "cat-3").unwrap();
        assert_eq!(up.catchments, ids(&["cat-1", "cat-2", "cat-3"]));
        assert_eq!(up.nexuses, ids(&["nex-1"]));
    }

    #[test]
    fn test_idempotent() {
        let fabric = tree();
        let a = trace_upstream(&fabric, "cat-4").unwrap();
        let b = trace_upstream(&fabric, "cat-4").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_unknown_catchment_is_not_found() {
        let err = trace_upstream(&tree(), "cat-99").unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[test]
    fn test_empty_fabric_is_not_found() {
        let fabric = Hydrofabric::new(vec![], vec![], Crs::wgs84());
        assert!(trace_upstream(&fabric, "cat-1").is_err());
    }

    #[test]
    fn test_degenerate_fabric_returns_query_only() {
        let fabric = Hydrofabric::new(vec![divide("cat-1", "nex-1")], vec![], Crs::wgs84());
        let up = trace_upstream(&fabric, "cat-1").unwrap();
        assert_eq!(up.catchments, ids(&["cat-1"]));
        assert!(up.nexuses.is_empty());
    }

    #[test]
    fn test_wb_alias_toids_resolve() {
        // nex-1 drains to wb-3, the waterbody alias of cat-3
        let fabric = Hydrofabric::new(
            vec![
                divide("cat-1", "nex-1"),
                divide("cat-3", "nex-2"),
            ],
            vec![nexus("nex-1", "wb-3")],
            Crs::wgs84(),
        );
        let up = trace_upstream(&fabric, "cat-3").unwrap();
        assert_eq!(up.catchments, ids(&["cat-1", "cat-3"]));
        assert_eq!(up.nexuses, ids(&["nex-1"]));
    }

    #[test]
    fn test_non_dendritic_follows_all_inflows() {
        // Two nexuses both claim cat-3 as their downstream catchment
        let fabric = Hydrofabric::new(
            vec![
                divide("cat-1", "nex-1"),
                divide("cat-2", "nex-2"),
                divide("cat-3", "nex-out"),
            ],
            vec![nexus("nex-1", "cat-3"), nexus("nex-2", "cat-3")],
            Crs::wgs84(),
        );
        let up = trace_upstream(&fabric, "cat-3").unwrap();
        assert_eq!(up.catchments, ids(&["cat-1", "cat-2", "cat-3"]));
        assert_eq!(up.nexuses, ids(&["nex-1", "nex-2"]));
    }

    #[test]
    fn test_cyclic_input_terminates() {
        // cat-1 -> nex-1 -> cat-2 -> nex-2 -> cat-1 (malformed loop)
        let fabric = Hydrofabric::new(
            vec![divide("cat-1", "nex-1"), divide("cat-2", "nex-2")],
            vec![nexus("nex-1", "cat-2"), nexus("nex-2", "cat-1")],
            Crs::wgs84(),
        );
        let up = trace_upstream(&fabric, "cat-1").unwrap();
        assert_eq!(up.catchments, ids(&["cat-1", "cat-2"]));
        assert_eq!(up.nexuses, ids(&["nex-1", "nex-2"]));
    }

    #[test]
    fn test_upstream_counts_sorted_descending() {
        let counts = upstream_counts(&tree());
        assert_eq!(counts[0], ("cat-5".to_string(), 5));
        assert_eq!(counts[1], ("cat-4".to_string(), 4));
        assert_eq!(counts[2], ("cat-3".to_string(), 3));
        // Leaves tie at 1, ordered by id
        assert_eq!(counts[3], ("cat-1".to_string(), 1));
        assert_eq!(counts[4], ("cat-2".to_string(), 1));
    }
}
