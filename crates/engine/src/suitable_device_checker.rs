// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Suitable-Device Checker (§4.3.1): a periodic guard that only fires
//! when no allocation has happened yet. Builds a bipartite graph between
//! sub-device slots and candidate device ids, and proves at least one
//! full assignment exists via maximum-cardinality matching (Kuhn's
//! augmenting-path algorithm).

use ats_adapters::{DeviceQueryFilter, DeviceQuerier};
use ats_core::DeviceId;
use std::collections::HashMap;

/// One sub-device slot's filter, as issued against the device fleet.
pub struct SubDeviceQuery {
    pub slot_index: usize,
    pub filter: DeviceQueryFilter,
}

/// Bipartite graph: slot index -> candidate device ids that satisfy its
/// filter. Built by issuing one query per slot and combining the
/// positive results (§4.3.1: "Query failures are ignored").
pub struct SuitabilityGraph {
    candidates: Vec<Vec<DeviceId>>,
}

impl SuitabilityGraph {
    /// Runs one query per slot through `querier`, ignoring failures
    /// (the caller re-counts them toward the query-times threshold).
    pub async fn build(
        queries: &[SubDeviceQuery],
        querier: &dyn DeviceQuerier,
    ) -> (Self, usize) {
        let mut candidates = Vec::with_capacity(queries.len());
        let mut failures = 0;
        for query in queries {
            match querier.query(&query.filter).await {
                Ok(devices) => candidates.push(devices.into_iter().map(|d| d.device_id).collect()),
                Err(_) => {
                    candidates.push(Vec::new());
                    failures += 1;
                }
            }
        }
        (Self { candidates }, failures)
    }

    pub fn slot_count(&self) -> usize {
        self.candidates.len()
    }

    /// Maximum-cardinality bipartite matching size between slots and
    /// distinct devices, via Kuhn's augmenting-path algorithm.
    pub fn max_matching(&self) -> usize {
        let mut device_index: HashMap<&DeviceId, usize> = HashMap::new();
        for candidates in &self.candidates {
            for device in candidates {
                let next = device_index.len();
                device_index.entry(device).or_insert(next);
            }
        }
        let num_devices = device_index.len();
        let adjacency: Vec<Vec<usize>> = self
            .candidates
            .iter()
            .map(|candidates| candidates.iter().map(|d| device_index[d]).collect())
            .collect();

        let mut match_device_to_slot = vec![None; num_devices];
        let mut matched = 0;

        for slot in 0..adjacency.len() {
            let mut visited = vec![false; num_devices];
            if try_augment(slot, &adjacency, &mut visited, &mut match_device_to_slot) {
                matched += 1;
            }
        }
        matched
    }

    /// True when every slot can be simultaneously assigned a distinct
    /// device: the maximum matching equals the number of slots.
    pub fn proves_satisfiable(&self) -> bool {
        self.slot_count() > 0 && self.max_matching() == self.slot_count()
    }
}

fn try_augment(
    slot: usize,
    adjacency: &[Vec<usize>],
    visited: &mut [bool],
    match_device_to_slot: &mut [Option<usize>],
) -> bool {
    for &device in &adjacency[slot] {
        if visited[device] {
            continue;
        }
        visited[device] = true;
        let free = match match_device_to_slot[device] {
            None => true,
            Some(other_slot) => try_augment(other_slot, adjacency, visited, match_device_to_slot),
        };
        if free {
            match_device_to_slot[device] = Some(slot);
            return true;
        }
    }
    false
}

#[cfg(test)]
#[path = "suitable_device_checker_tests.rs"]
mod tests;
