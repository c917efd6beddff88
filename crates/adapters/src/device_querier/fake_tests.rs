// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use ats_core::DeviceId;
use std::collections::BTreeMap;

fn device(id: &str, product_type: &str, sdk: u32, battery: Option<u32>) -> DeviceInfo {
    DeviceInfo {
        device_id: DeviceId::from(id),
        product_type: product_type.into(),
        sdk_level: sdk,
        battery_level: battery,
        properties: BTreeMap::new(),
        available: true,
    }
}

#[tokio::test]
async fn filters_by_product_type_and_sdk_level() {
    let querier = FakeDeviceQuerier::with_devices(vec![
        device("dev-1", "walleye", 33, Some(90)),
        device("dev-2", "coral", 30, Some(90)),
    ]);
    let filter = DeviceQueryFilter {
        product_types: vec!["walleye".into()],
        min_sdk_level: Some(31),
        ..Default::default()
    };
    let result = querier.query(&filter).await.unwrap();
    assert_eq!(result.len(), 1);
    assert_eq!(result[0].device_id, DeviceId::from("dev-1"));
}

#[tokio::test]
async fn records_every_call() {
    let querier = FakeDeviceQuerier::new();
    querier.query(&DeviceQueryFilter::default()).await.unwrap();
    querier.query(&DeviceQueryFilter::default()).await.unwrap();
    assert_eq!(querier.calls().len(), 2);
}

#[tokio::test]
async fn armed_failure_fires_once() {
    let querier = FakeDeviceQuerier::new();
    querier.arm_failure();
    assert!(querier.query(&DeviceQueryFilter::default()).await.is_err());
    assert!(querier.query(&DeviceQueryFilter::default()).await.is_ok());
}

#[tokio::test]
async fn idle_only_excludes_unavailable_devices() {
    let mut busy = device("dev-1", "walleye", 33, Some(90));
    busy.available = false;
    let querier = FakeDeviceQuerier::with_devices(vec![busy]);
    let filter = DeviceQueryFilter {
        idle_only: true,
        ..Default::default()
    };
    assert!(querier.query(&filter).await.unwrap().is_empty());
}
