//! Convergence properties over generated edge populations.

use devicesync_api::{edge_name, local_name, Device, IsSynced, ObjectKey, Resource};
use devicesync_edge::{EdgeCall, MockEdgeClient, Placement};
use devicesync_engine::{
    DeviceManagedState, DeviceStatusRefresh, MemoryStores, Reconciler, RecordReconciler, Syncer,
    SyncerConfig,
};
use devicesync_store::{RecordStore, Scheme};
use devicesync_testkit::fixtures::{self, NAMESPACE};
use devicesync_testkit::strategies::{edge_names, property_value};
use proptest::prelude::*;
use std::sync::Arc;

const POOL: &str = "hangzhou";

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(future)
}

fn edge() -> Arc<MockEdgeClient<Device>> {
    Arc::new(MockEdgeClient::<Device>::new(Placement::new(NAMESPACE, POOL)))
}

#[tokio::test]
async fn labelled_record_keeps_its_edge_name() {
    let stores = MemoryStores::open(&Scheme::with_device_kinds()).unwrap();
    let edge = edge();
    let reconciler = RecordReconciler::<Device>::new(
        stores.devices.clone(),
        edge.clone(),
        Arc::new(DeviceManagedState::new(edge.clone(), edge.clone())),
        POOL,
    );
    let device = fixtures::device_for_edge_name(POOL, "hangzhou-lamp-01", "Lamp-01");
    stores.devices.create(&device).await.unwrap();

    reconciler.reconcile(&device.key()).await.unwrap();

    assert!(edge.contains("Lamp-01"));
    assert!(!edge.contains("hangzhou-lamp-01"));
    let stored = stores.devices.get(&device.key()).await.unwrap();
    assert!(stored.is_synced());
    assert_eq!(edge_name(&stored), "Lamp-01");
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn syncer_mirrors_every_edge_object_once(names in edge_names(10)) {
        block_on(async {
            let stores = MemoryStores::open(&Scheme::with_device_kinds()).unwrap();
            let edge = edge();
            for name in &names {
                edge.insert(name, Device::new("", name.clone()));
            }
            let syncer = Syncer::<Device>::new(
                stores.devices.clone(),
                edge.clone(),
                Arc::new(DeviceStatusRefresh::new(edge.clone())),
                POOL,
                NAMESPACE,
                SyncerConfig::default(),
            );

            let first = syncer.sync_once().await.unwrap();
            assert_eq!(first.created, names.len());
            assert_eq!(stores.devices.len(), names.len());
            for name in &names {
                let key = ObjectKey::new(NAMESPACE, local_name(POOL, name));
                let local = stores.devices.get(&key).await.unwrap();
                assert_eq!(edge_name(&local), name.as_str());
                assert!(!local.spec.managed);
            }

            let second = syncer.sync_once().await.unwrap();
            assert_eq!(second.created, 0);
            assert_eq!(second.deleted, 0);
            assert_eq!(stores.devices.len(), names.len());
        });
    }

    #[test]
    fn managed_property_reaches_desired_value(
        initial in property_value(),
        desired in property_value(),
    ) {
        block_on(async {
            let stores = MemoryStores::open(&Scheme::with_device_kinds()).unwrap();
            let edge = edge();
            edge.set_property("lamp", "brightness", &initial);
            let reconciler = RecordReconciler::<Device>::new(
                stores.devices.clone(),
                edge.clone(),
                Arc::new(DeviceManagedState::new(edge.clone(), edge.clone())),
                POOL,
            );
            let device = fixtures::managed_device(POOL, "lamp")
                .with_desired_property("brightness", &desired);
            stores.devices.create(&device).await.unwrap();

            // Created on the first pass, pushed on the second.
            reconciler.reconcile(&device.key()).await.unwrap();
            reconciler.reconcile(&device.key()).await.unwrap();

            assert_eq!(edge.property("lamp", "brightness"), Some(desired.clone()));
            let writes = edge.count_calls(|c| matches!(c, EdgeCall::UpdateProperty { .. }));
            assert_eq!(writes, usize::from(initial != desired));
            let stored = stores.devices.get(&device.key()).await.unwrap();
            assert_eq!(stored.status.device_properties["brightness"].actual_value, desired);
        });
    }
}
