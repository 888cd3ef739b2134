//! EdgexClient against the simulated platform.

use devicesync_api::{
    AdminState, Device, DeviceProfile, DeviceService, DesiredPropertyState, IsSynced, Resource,
};
use devicesync_edge::{
    DevicePropertyClient, EdgeClient, EdgeConfig, EdgeError, EdgeListOptions, EdgexClient,
    LoopbackClient, Method, Placement,
};
use devicesync_testkit::fixtures::{self, wire_device, wire_profile, wire_service};
use devicesync_testkit::EdgePlatformSim;

const POOL: &str = "hangzhou";

fn setup() -> (EdgePlatformSim, EdgexClient<LoopbackClient<EdgePlatformSim>>) {
    let config = EdgeConfig::new();
    let sim = EdgePlatformSim::new(&config);
    let client = sim.client(config, Placement::new(fixtures::NAMESPACE, POOL));
    (sim, client)
}

#[tokio::test]
async fn device_lifecycle() {
    let (sim, edge) = setup();
    let device = fixtures::device(POOL, "lamp");

    let id = EdgeClient::<Device>::create(&edge, &device).await.unwrap();
    assert_eq!(sim.device("lamp").unwrap().id, id);

    let err = EdgeClient::<Device>::create(&edge, &device).await.unwrap_err();
    assert!(err.is_already_exists());

    let fetched = EdgeClient::<Device>::get(&edge, "lamp").await.unwrap();
    assert_eq!(fetched.metadata.name, "hangzhou-lamp");
    assert_eq!(fetched.edge_id(), Some(id.as_str()));
    assert!(fetched.is_synced());

    EdgeClient::<Device>::delete(&edge, "lamp").await.unwrap();
    let err = EdgeClient::<Device>::get(&edge, "lamp").await.unwrap_err();
    assert!(err.is_not_found());
    let err = EdgeClient::<Device>::delete(&edge, "lamp").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn device_state_update() {
    let (sim, edge) = setup();
    sim.add_device(wire_device("lamp"));

    let mut device = fixtures::device(POOL, "lamp");
    device.spec.admin_state = Some(AdminState::Locked);
    EdgeClient::<Device>::update(&edge, &device).await.unwrap();

    let stored = sim.device("lamp").unwrap();
    assert_eq!(stored.admin_state, "LOCKED");
    assert_eq!(stored.operating_state, "ENABLED");
}

#[tokio::test]
async fn list_places_records_in_pool() {
    let (sim, edge) = setup();
    sim.add_device(wire_device("Sensor-1"));
    sim.add_device(wire_device("lamp"));

    let devices = EdgeClient::<Device>::list(&edge, &EdgeListOptions::all())
        .await
        .unwrap();
    let names: Vec<_> = devices.iter().map(|d| d.metadata.name.as_str()).collect();
    assert_eq!(names, vec!["hangzhou-sensor-1", "hangzhou-lamp"]);
    assert!(devices.iter().all(|d| d.spec.node_pool == POOL));
}

#[tokio::test]
async fn removed_device_drops_out_of_list() {
    let (sim, edge) = setup();
    sim.add_device(wire_device("lamp"));
    sim.add_device(wire_device("fan"));
    assert!(sim.remove_device("fan").is_some());

    let devices = EdgeClient::<Device>::list(&edge, &EdgeListOptions::all())
        .await
        .unwrap();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].metadata.name, "hangzhou-lamp");
}

#[tokio::test]
async fn service_create_registers_addressable() {
    let (sim, edge) = setup();
    let service = fixtures::device_service(POOL, "device-virtual");

    EdgeClient::<DeviceService>::create(&edge, &service).await.unwrap();
    assert!(sim.addressables().contains("device-virtual-address"));

    let mut second = fixtures::device_service(POOL, "device-modbus");
    second.spec.addressable.name = "device-virtual-address".to_string();
    EdgeClient::<DeviceService>::create(&edge, &second).await.unwrap();
    assert!(sim.service("device-modbus").is_some());
}

#[tokio::test]
async fn service_state_update_and_delete() {
    let (sim, edge) = setup();
    sim.add_service(wire_service("device-virtual"));

    let mut service = fixtures::device_service(POOL, "device-virtual");
    service.spec.admin_state = Some(AdminState::Locked);
    EdgeClient::<DeviceService>::update(&edge, &service).await.unwrap();
    assert_eq!(sim.service("device-virtual").unwrap().admin_state, "LOCKED");
    assert_eq!(
        sim.count_requests(
            Method::Put,
            "/api/v1/deviceservice/name/device-virtual/adminstate/LOCKED"
        ),
        1
    );

    EdgeClient::<DeviceService>::delete(&edge, "device-virtual")
        .await
        .unwrap();
    assert!(sim.service("device-virtual").is_none());
}

#[tokio::test]
async fn profile_roundtrip() {
    let (sim, edge) = setup();
    sim.add_profile(wire_profile("lamp-profile"));

    let mut profile = EdgeClient::<DeviceProfile>::get(&edge, "lamp-profile")
        .await
        .unwrap();
    profile.spec.model = "L-2".to_string();
    EdgeClient::<DeviceProfile>::update(&edge, &profile).await.unwrap();
    assert_eq!(sim.profile("lamp-profile").unwrap().model, "L-2");
}

#[tokio::test]
async fn property_read_and_write() {
    let (sim, edge) = setup();
    sim.add_device(wire_device("lamp"));
    sim.add_command("lamp", "brightness", Some("30"));

    let device = fixtures::device(POOL, "lamp");
    let actual = edge.get_property_state("brightness", &device).await.unwrap();
    assert_eq!(actual.actual_value, "30");
    assert!(actual.get_url.ends_with("/command/brightness"));

    let desired = DesiredPropertyState {
        name: "brightness".to_string(),
        put_url: String::new(),
        desired_value: "50".to_string(),
    };
    edge.update_property_state(&desired, &device).await.unwrap();
    assert_eq!(sim.reading("lamp", "brightness").as_deref(), Some("50"));
}

#[tokio::test]
async fn cached_get_url_skips_command_lookup() {
    let (sim, edge) = setup();
    sim.add_device(wire_device("lamp"));
    sim.add_command("lamp", "brightness", Some("30"));

    let mut device = fixtures::device(POOL, "lamp");
    let first = edge.get_property_state("brightness", &device).await.unwrap();
    device
        .status
        .device_properties
        .insert("brightness".to_string(), first);

    edge.get_property_state("brightness", &device).await.unwrap();
    assert_eq!(sim.count_requests(Method::Get, "/api/v1/device/name/lamp"), 1);
}

#[tokio::test]
async fn locked_device_read_is_rejected() {
    let (sim, edge) = setup();
    let mut wire = wire_device("lamp");
    wire.admin_state = "LOCKED".to_string();
    sim.add_device(wire);
    sim.add_command("lamp", "brightness", Some("30"));

    let err = edge
        .get_property_state("brightness", &fixtures::device(POOL, "lamp"))
        .await
        .unwrap_err();
    assert!(matches!(err, EdgeError::Rejected { status: 423, .. }));
}

#[tokio::test]
async fn downstream_write_failure_is_rejected() {
    let (sim, edge) = setup();
    sim.add_device(wire_device("lamp"));
    sim.add_command("lamp", "brightness", Some("30"));
    sim.set_fail_writes(true);

    let desired = DesiredPropertyState {
        name: "brightness".to_string(),
        put_url: String::new(),
        desired_value: "50".to_string(),
    };
    let err = edge
        .update_property_state(&desired, &fixtures::device(POOL, "lamp"))
        .await
        .unwrap_err();
    assert!(matches!(err, EdgeError::Rejected { status: 200, .. }));
    assert_eq!(sim.reading("lamp", "brightness").as_deref(), Some("30"));
}

#[tokio::test]
async fn unknown_property_is_reported() {
    let (sim, edge) = setup();
    sim.add_device(wire_device("lamp"));

    let err = edge
        .get_property_state("color", &fixtures::device(POOL, "lamp"))
        .await
        .unwrap_err();
    assert!(matches!(err, EdgeError::PropertyNotFound { .. }));
}

#[tokio::test]
async fn list_properties_includes_failed_reads() {
    let (sim, edge) = setup();
    sim.add_device(wire_device("lamp"));
    sim.add_command("lamp", "brightness", Some("30"));
    sim.add_command("lamp", "color", None);

    let (desired, actual) = edge
        .list_properties_state(&fixtures::device(POOL, "lamp"))
        .await
        .unwrap();
    assert_eq!(desired.len(), 2);
    assert!(desired["brightness"].put_url.ends_with("/command/brightness"));
    assert_eq!(actual["brightness"].actual_value, "30");
    assert_eq!(actual["color"].actual_value, "");
}

#[tokio::test]
async fn ping_and_outage() {
    let (sim, edge) = setup();
    edge.ping_all().await.unwrap();
    let pinged: Vec<_> = sim.requests().into_iter().map(|(_, path)| path).collect();
    assert_eq!(pinged, vec!["/api/v1/ping"; 3]);

    sim.set_down(true);
    let err = edge.ping_all().await.unwrap_err();
    assert!(err.is_unreachable());
    let err = EdgeClient::<Device>::list(&edge, &EdgeListOptions::all())
        .await
        .unwrap_err();
    assert!(err.is_unreachable());
}
