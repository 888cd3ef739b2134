//! An in-process edge platform speaking the legacy `/api/v1` REST API.
//!
//! Serves core-metadata and core-command at the addresses of an
//! `EdgeConfig`, plus ping on every service. Attach it to an
//! `EdgexClient` through a `LoopbackClient`; no sockets are opened.

use devicesync_api::{Addressable, Command, CommandAction, CommandResponse};
use devicesync_edge::wire::{
    WireCommandResponse, WireDevice, WireDeviceProfile, WireDeviceService, WireEvent, WireReading,
};
use devicesync_edge::{
    EdgeConfig, EdgexClient, HttpRequest, HttpResponse, LoopbackClient, LoopbackServer, Method,
    Placement,
};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

const NOT_FOUND: &str = "Item not found\n";

#[derive(Default)]
struct SimState {
    devices: BTreeMap<String, WireDevice>,
    services: BTreeMap<String, WireDeviceService>,
    profiles: BTreeMap<String, WireDeviceProfile>,
    addressables: BTreeSet<String>,
    commands: BTreeMap<String, BTreeSet<String>>,
    readings: BTreeMap<(String, String), String>,
    requests: Vec<(Method, String)>,
    next_id: u64,
    down: bool,
    fail_writes: bool,
}

impl SimState {
    fn allocate_id(&mut self) -> String {
        self.next_id += 1;
        format!("sim-{}", self.next_id)
    }

    fn device_by_id(&self, id: &str) -> Option<&WireDevice> {
        self.devices.values().find(|d| d.id == id)
    }
}

/// A simulated edge platform. Clones share state.
#[derive(Clone)]
pub struct EdgePlatformSim {
    metadata: String,
    command: String,
    state: Arc<Mutex<SimState>>,
}

impl EdgePlatformSim {
    /// Creates an empty platform serving the addresses in `config`.
    pub fn new(config: &EdgeConfig) -> Self {
        Self {
            metadata: config.core_metadata_address.clone(),
            command: config.core_command_address.clone(),
            state: Arc::new(Mutex::new(SimState::default())),
        }
    }

    /// Builds a client for this platform.
    pub fn client(
        &self,
        config: EdgeConfig,
        placement: Placement,
    ) -> EdgexClient<LoopbackClient<EdgePlatformSim>> {
        EdgexClient::new(config, placement, LoopbackClient::new(self.clone()))
    }

    /// Adds a device. Returns its id.
    pub fn add_device(&self, mut device: WireDevice) -> String {
        let mut state = self.state.lock();
        device.id = state.allocate_id();
        let id = device.id.clone();
        state.devices.insert(device.name.clone(), device);
        id
    }

    /// Adds a device service. Returns its id.
    pub fn add_service(&self, mut service: WireDeviceService) -> String {
        let mut state = self.state.lock();
        service.id = state.allocate_id();
        let id = service.id.clone();
        state.services.insert(service.name.clone(), service);
        id
    }

    /// Adds a device profile. Returns its id.
    pub fn add_profile(&self, mut profile: WireDeviceProfile) -> String {
        let mut state = self.state.lock();
        profile.id = state.allocate_id();
        let id = profile.id.clone();
        state.profiles.insert(profile.name.clone(), profile);
        id
    }

    /// Declares a readable and writable command on a device.
    pub fn add_command(&self, device: &str, command: &str, value: Option<&str>) {
        let mut state = self.state.lock();
        state
            .commands
            .entry(device.to_string())
            .or_default()
            .insert(command.to_string());
        if let Some(value) = value {
            state
                .readings
                .insert((device.to_string(), command.to_string()), value.to_string());
        }
    }

    /// The current reading of a device command.
    pub fn reading(&self, device: &str, command: &str) -> Option<String> {
        self.state
            .lock()
            .readings
            .get(&(device.to_string(), command.to_string()))
            .cloned()
    }

    /// A device as stored.
    pub fn device(&self, name: &str) -> Option<WireDevice> {
        self.state.lock().devices.get(name).cloned()
    }

    /// A device service as stored.
    pub fn service(&self, name: &str) -> Option<WireDeviceService> {
        self.state.lock().services.get(name).cloned()
    }

    /// A device profile as stored.
    pub fn profile(&self, name: &str) -> Option<WireDeviceProfile> {
        self.state.lock().profiles.get(name).cloned()
    }

    /// Removes a device as if deleted out-of-band.
    pub fn remove_device(&self, name: &str) -> Option<WireDevice> {
        self.state.lock().devices.remove(name)
    }

    /// Names of the addressables created.
    pub fn addressables(&self) -> BTreeSet<String> {
        self.state.lock().addressables.clone()
    }

    /// Makes every request fail at the transport level.
    pub fn set_down(&self, down: bool) {
        self.state.lock().down = down;
    }

    /// Makes command writes answer 200 with a downstream failure body.
    pub fn set_fail_writes(&self, fail: bool) {
        self.state.lock().fail_writes = fail;
    }

    /// Requests served so far, as `(method, path)`.
    pub fn requests(&self) -> Vec<(Method, String)> {
        self.state.lock().requests.clone()
    }

    /// Counts requests with this method and path.
    pub fn count_requests(&self, method: Method, path: &str) -> usize {
        self.state
            .lock()
            .requests
            .iter()
            .filter(|(m, p)| *m == method && p == path)
            .count()
    }

    fn command_url(&self, device_id: &str, command: &str) -> String {
        format!(
            "http://{}/api/v1/device/{device_id}/command/{command}",
            self.command
        )
    }

    fn serve_metadata(&self, method: Method, segments: &[&str], body: &[u8]) -> HttpResponse {
        let mut state = self.state.lock();
        match (method, segments) {
            (Method::Get, ["device"]) => {
                HttpResponse::json(&state.devices.values().collect::<Vec<_>>())
            }
            (Method::Get, ["device", "label", label]) => HttpResponse::json(
                &state
                    .devices
                    .values()
                    .filter(|d| d.labels.iter().any(|l| l.as_str() == *label))
                    .collect::<Vec<_>>(),
            ),
            (Method::Post, ["device"]) => match decode::<WireDevice>(body) {
                Ok(mut device) if !state.devices.contains_key(&device.name) => {
                    device.id = state.allocate_id();
                    let id = device.id.clone();
                    state.devices.insert(device.name.clone(), device);
                    HttpResponse::new(200, id)
                }
                Ok(device) => duplicate(&device.name),
                Err(e) => e,
            },
            (Method::Get, ["device", "name", name]) => match state.devices.get(*name) {
                Some(device) => HttpResponse::json(device),
                None => HttpResponse::new(404, NOT_FOUND),
            },
            (Method::Put, ["device", "name", name]) => {
                let fields = match decode::<BTreeMap<String, String>>(body) {
                    Ok(fields) => fields,
                    Err(e) => return e,
                };
                match state.devices.get_mut(*name) {
                    Some(device) => {
                        if let Some(admin) = fields.get("adminState") {
                            device.admin_state = admin.clone();
                        }
                        if let Some(operating) = fields.get("operatingState") {
                            device.operating_state = operating.clone();
                        }
                        HttpResponse::new(200, "")
                    }
                    None => HttpResponse::new(404, NOT_FOUND),
                }
            }
            (Method::Delete, ["device", "name", name]) => match state.devices.remove(*name) {
                Some(_) => HttpResponse::new(200, "true"),
                None => HttpResponse::new(404, NOT_FOUND),
            },

            (Method::Get, ["deviceservice"]) => {
                HttpResponse::json(&state.services.values().collect::<Vec<_>>())
            }
            (Method::Post, ["deviceservice"]) => match decode::<WireDeviceService>(body) {
                Ok(mut service) if !state.services.contains_key(&service.name) => {
                    service.id = state.allocate_id();
                    let id = service.id.clone();
                    state.services.insert(service.name.clone(), service);
                    HttpResponse::new(200, id)
                }
                Ok(service) => duplicate(&service.name),
                Err(e) => e,
            },
            (Method::Get, ["deviceservice", "name", name]) => match state.services.get(*name) {
                Some(service) => HttpResponse::json(service),
                None => HttpResponse::new(404, NOT_FOUND),
            },
            (Method::Put, ["deviceservice", "name", name, field, value]) => {
                match state.services.get_mut(*name) {
                    Some(service) => match *field {
                        "adminstate" => {
                            service.admin_state = value.to_string();
                            HttpResponse::new(200, "")
                        }
                        "opstate" => {
                            service.operating_state = value.to_string();
                            HttpResponse::new(200, "")
                        }
                        _ => HttpResponse::new(400, format!("unknown field {field}")),
                    },
                    None => HttpResponse::new(404, NOT_FOUND),
                }
            }
            (Method::Delete, ["deviceservice", "name", name]) => {
                match state.services.remove(*name) {
                    Some(_) => HttpResponse::new(200, "true"),
                    None => HttpResponse::new(404, NOT_FOUND),
                }
            }

            (Method::Get, ["deviceprofile"]) => {
                HttpResponse::json(&state.profiles.values().collect::<Vec<_>>())
            }
            (Method::Post, ["deviceprofile"]) => match decode::<WireDeviceProfile>(body) {
                Ok(mut profile) if !state.profiles.contains_key(&profile.name) => {
                    profile.id = state.allocate_id();
                    let id = profile.id.clone();
                    state.profiles.insert(profile.name.clone(), profile);
                    HttpResponse::new(200, id)
                }
                Ok(profile) => duplicate(&profile.name),
                Err(e) => e,
            },
            (Method::Put, ["deviceprofile"]) => match decode::<WireDeviceProfile>(body) {
                Ok(mut profile) => match state.profiles.get(&profile.name) {
                    Some(existing) => {
                        profile.id = existing.id.clone();
                        state.profiles.insert(profile.name.clone(), profile);
                        HttpResponse::new(200, "true")
                    }
                    None => HttpResponse::new(404, NOT_FOUND),
                },
                Err(e) => e,
            },
            (Method::Get, ["deviceprofile", "name", name]) => match state.profiles.get(*name) {
                Some(profile) => HttpResponse::json(profile),
                None => HttpResponse::new(404, NOT_FOUND),
            },
            (Method::Delete, ["deviceprofile", "name", name]) => {
                match state.profiles.remove(*name) {
                    Some(_) => HttpResponse::new(200, "true"),
                    None => HttpResponse::new(404, NOT_FOUND),
                }
            }

            (Method::Post, ["addressable"]) => {
                match decode::<Addressable>(body) {
                    Ok(addressable) if state.addressables.insert(addressable.name.clone()) => {
                        let id = state.allocate_id();
                        HttpResponse::new(200, id)
                    }
                    Ok(addressable) => duplicate(&addressable.name),
                    Err(e) => e,
                }
            }
            _ => HttpResponse::new(404, "no such route"),
        }
    }

    fn serve_command(&self, method: Method, segments: &[&str], body: &[u8]) -> HttpResponse {
        let mut state = self.state.lock();
        match (method, segments) {
            (Method::Get, ["device", "name", name]) => {
                let Some(device) = state.devices.get(*name) else {
                    return HttpResponse::new(404, NOT_FOUND);
                };
                let commands = state
                    .commands
                    .get(*name)
                    .into_iter()
                    .flatten()
                    .map(|cmd| {
                        let url = self.command_url(&device.id, cmd);
                        Command {
                            id: String::new(),
                            name: cmd.clone(),
                            get: CommandAction {
                                path: String::new(),
                                responses: vec![CommandResponse {
                                    code: "200".to_string(),
                                    description: String::new(),
                                    expected_values: vec![cmd.clone()],
                                }],
                                url: url.clone(),
                                parameter_names: Vec::new(),
                            },
                            put: CommandAction {
                                url,
                                parameter_names: vec![cmd.clone()],
                                ..CommandAction::default()
                            },
                        }
                    })
                    .collect();
                HttpResponse::json(&WireCommandResponse {
                    id: device.id.clone(),
                    name: device.name.clone(),
                    commands,
                })
            }
            (Method::Get, ["device", id, "command", cmd]) => {
                let Some(device) = state.device_by_id(id).cloned() else {
                    return HttpResponse::new(404, NOT_FOUND);
                };
                if device.admin_state == "LOCKED" || device.operating_state == "DISABLED" {
                    return HttpResponse::new(423, "device locked");
                }
                match state
                    .readings
                    .get(&(device.name.clone(), cmd.to_string()))
                {
                    Some(value) => HttpResponse::json(&WireEvent {
                        device: device.name.clone(),
                        origin: 0,
                        readings: vec![WireReading {
                            name: cmd.to_string(),
                            value: value.clone(),
                        }],
                    }),
                    None => HttpResponse::new(404, "no reading"),
                }
            }
            (Method::Put, ["device", id, "command", cmd]) => {
                let Some(device) = state.device_by_id(id).cloned() else {
                    return HttpResponse::new(404, NOT_FOUND);
                };
                if state.fail_writes {
                    return HttpResponse::new(200, "error in execWriteCmd: device offline");
                }
                let values = match decode::<BTreeMap<String, String>>(body) {
                    Ok(values) => values,
                    Err(e) => return e,
                };
                match values.get(*cmd) {
                    Some(value) => {
                        state
                            .readings
                            .insert((device.name, cmd.to_string()), value.clone());
                        HttpResponse::new(200, "")
                    }
                    None => HttpResponse::new(400, format!("missing value for {cmd}")),
                }
            }
            _ => HttpResponse::new(404, "no such route"),
        }
    }
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, HttpResponse> {
    serde_json::from_slice(body).map_err(|e| HttpResponse::new(400, e.to_string()))
}

fn duplicate(name: &str) -> HttpResponse {
    HttpResponse::new(409, format!("duplicate name {name}"))
}

impl LoopbackServer for EdgePlatformSim {
    fn handle(&self, request: &HttpRequest) -> Result<HttpResponse, String> {
        let path = request.path().to_string();
        {
            let mut state = self.state.lock();
            state.requests.push((request.method, path.clone()));
            if state.down {
                return Err("connection refused".to_string());
            }
        }

        if path == "/api/v1/ping" {
            return Ok(HttpResponse::new(200, "pong"));
        }
        let Some(rest) = path.strip_prefix("/api/v1/") else {
            return Ok(HttpResponse::new(404, "no such route"));
        };
        let segments: Vec<&str> = rest.split('/').collect();
        let body = request.body.as_deref().unwrap_or_default();

        let authority = request.authority();
        if authority == self.metadata {
            Ok(self.serve_metadata(request.method, &segments, body))
        } else if authority == self.command {
            Ok(self.serve_command(request.method, &segments, body))
        } else {
            Ok(HttpResponse::new(404, "no such route"))
        }
    }
}
