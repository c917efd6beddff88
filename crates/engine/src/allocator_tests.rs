// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use ats_adapters::FakeDeviceQuerier;
use ats_core::DeviceInfo;
use std::collections::BTreeMap;

fn device(id: &str) -> DeviceInfo {
    DeviceInfo {
        device_id: ats_core::DeviceId::from(id),
        product_type: "walleye".into(),
        sdk_level: 33,
        battery_level: Some(90),
        properties: BTreeMap::new(),
        available: true,
    }
}

#[tokio::test]
async fn scheduler_mediated_drains_delivered_allocations() {
    let allocator = SchedulerMediatedAllocator::new();
    allocator.deliver(AllocationWithStats {
        test_id: TestLocatorId::from("test-1"),
        allocation: Allocation {
            sub_devices: vec![],
        },
        wait_ms: 10,
    });

    let drained = allocator.poll_allocations().await;
    assert_eq!(drained.len(), 1);
    assert!(allocator.poll_allocations().await.is_empty());
    assert!(!allocator.is_local());
}

#[tokio::test]
async fn proxy_mediated_lease_succeeds_when_querier_has_a_match() {
    let querier = Arc::new(FakeDeviceQuerier::with_devices(vec![device("dev-1")]));
    let allocator = ProxyMediatedAllocator::new(querier, true);

    let leased = allocator
        .try_lease(TestLocatorId::from("test-1"), &DeviceQueryFilter::default())
        .await;
    assert!(leased);

    let drained = allocator.poll_allocations().await;
    assert_eq!(drained.len(), 1);
    assert_eq!(
        drained[0].allocation.sub_devices[0].device,
        Some(ats_core::DeviceId::from("dev-1"))
    );
    assert!(allocator.is_local());
}

#[tokio::test]
async fn proxy_mediated_lease_fails_when_no_device_matches() {
    let querier = Arc::new(FakeDeviceQuerier::new());
    let allocator = ProxyMediatedAllocator::new(querier, false);
    let leased = allocator
        .try_lease(TestLocatorId::from("test-1"), &DeviceQueryFilter::default())
        .await;
    assert!(!leased);
    assert!(allocator.poll_allocations().await.is_empty());
}
