//! REST client for the edge platform's legacy (`/api/v1`) API.

use crate::client::{DevicePropertyClient, EdgeClient, EdgeListOptions, PropertyStates};
use crate::config::EdgeConfig;
use crate::convert::{self, Placement};
use crate::error::{classify_response, is_success_envelope, EdgeError, EdgeResult};
use crate::http::{HttpClient, HttpRequest, HttpResponse, Method};
use crate::wire::{WireCommandResponse, WireDevice, WireDeviceProfile, WireDeviceService, WireEvent};
use async_trait::async_trait;
use devicesync_api::{
    edge_name, ActualPropertyState, DesiredPropertyState, Device, DeviceProfile, DeviceService,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, trace};

const DEVICE_PATH: &str = "/api/v1/device";
const DEVICE_SERVICE_PATH: &str = "/api/v1/deviceservice";
const DEVICE_PROFILE_PATH: &str = "/api/v1/deviceprofile";
const ADDRESSABLE_PATH: &str = "/api/v1/addressable";
const PING_PATH: &str = "/api/v1/ping";

/// Marker the command service puts in a 200 body when a write failed downstream.
const WRITE_FAILURE_MARKER: &str = "execWriteCmd";

/// Client for core-metadata, core-command and core-data.
///
/// One instance serves every kind; it implements `EdgeClient` for devices,
/// device services and device profiles, plus `DevicePropertyClient`.
pub struct EdgexClient<C: HttpClient> {
    config: EdgeConfig,
    placement: Placement,
    http: C,
}

impl<C: HttpClient> EdgexClient<C> {
    /// Creates a client.
    ///
    /// Records built from edge objects are placed in `placement`.
    pub fn new(config: EdgeConfig, placement: Placement, http: C) -> Self {
        Self {
            config,
            placement,
            http,
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &EdgeConfig {
        &self.config
    }

    /// Returns the HTTP client.
    pub fn http(&self) -> &C {
        &self.http
    }

    fn metadata_url(&self, path: &str) -> String {
        format!("http://{}{}", self.config.core_metadata_address, path)
    }

    fn command_url(&self, path: &str) -> String {
        format!("http://{}{}", self.config.core_command_address, path)
    }

    fn data_url(&self, path: &str) -> String {
        format!("http://{}{}", self.config.core_data_address, path)
    }

    /// Sends a request without interpreting the status.
    async fn send(&self, request: HttpRequest) -> EdgeResult<HttpResponse> {
        trace!(method = %request.method, url = %request.url, "edge request");
        self.http
            .send(request)
            .await
            .map_err(EdgeError::Unreachable)
    }

    /// Sends a request and maps failures onto `EdgeError`.
    async fn execute(&self, request: HttpRequest) -> EdgeResult<HttpResponse> {
        let response = self.send(request).await?;
        classify_response(response.status, &response.text())?;
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String) -> EdgeResult<T> {
        let response = self.execute(HttpRequest::new(Method::Get, url)).await?;
        Ok(serde_json::from_slice(&response.body)?)
    }

    /// POSTs a JSON body and returns the id from the raw response body.
    async fn post_for_id<T: Serialize>(&self, url: String, body: &T) -> EdgeResult<String> {
        let request = HttpRequest::new(Method::Post, url).with_body(serde_json::to_vec(body)?);
        let response = self.execute(request).await?;
        Ok(response.text().trim().to_string())
    }

    async fn delete_by_name(&self, path: &str, name: &str) -> EdgeResult<HttpResponse> {
        let url = self.metadata_url(&format!("{path}/name/{name}"));
        self.execute(HttpRequest::new(Method::Delete, url)).await
    }

    fn list_url(&self, path: &str, options: &EdgeListOptions) -> String {
        match &options.label {
            Some(label) => self.metadata_url(&format!("{path}/label/{label}")),
            None => self.metadata_url(path),
        }
    }

    /// Fetches the command metadata of a device.
    ///
    /// # Errors
    ///
    /// Returns `EdgeError::NotFound` if core-command does not know the device.
    pub async fn command_metadata(&self, device_name: &str) -> EdgeResult<WireCommandResponse> {
        let url = self.command_url(&format!("{DEVICE_PATH}/name/{device_name}"));
        let response = self.send(HttpRequest::new(Method::Get, url)).await?;
        let text = response.text();
        if text.contains("Item not found") {
            return Err(EdgeError::NotFound(format!("commands of {device_name}")));
        }
        classify_response(response.status, &text)?;
        Ok(serde_json::from_slice(&response.body)?)
    }

    /// Checks that core-data, core-metadata and core-command all respond.
    ///
    /// # Errors
    ///
    /// Returns the first failure.
    pub async fn ping_all(&self) -> EdgeResult<()> {
        for url in [
            self.data_url(PING_PATH),
            self.metadata_url(PING_PATH),
            self.command_url(PING_PATH),
        ] {
            self.execute(HttpRequest::new(Method::Get, url.clone()))
                .await?;
            debug!(%url, "edge service is up");
        }
        Ok(())
    }

    /// Creates an addressable, tolerating one that already exists.
    async fn ensure_addressable(&self, service: &DeviceService) -> EdgeResult<()> {
        let addressable = &service.spec.addressable;
        if addressable.name.is_empty() {
            return Ok(());
        }
        match self
            .post_for_id(self.metadata_url(ADDRESSABLE_PATH), addressable)
            .await
        {
            Ok(id) => {
                debug!(addressable = %addressable.name, %id, "created addressable");
                Ok(())
            }
            Err(e) if e.is_already_exists() => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn get_property_url(
        &self,
        device_name: &str,
        property: &str,
        put: bool,
    ) -> EdgeResult<String> {
        let commands = self.command_metadata(device_name).await?;
        commands
            .commands
            .iter()
            .find(|c| c.name == property)
            .map(|c| if put { c.put.url.clone() } else { c.get.url.clone() })
            .filter(|url| !url.is_empty())
            .ok_or_else(|| EdgeError::PropertyNotFound {
                device: device_name.to_string(),
                property: property.to_string(),
            })
    }

    /// Reads a property URL and decodes the event.
    async fn read_event(&self, url: &str) -> EdgeResult<WireEvent> {
        let response = self.send(HttpRequest::new(Method::Get, url)).await?;
        let body = response.text();
        match response.status {
            200..=299 => Ok(serde_json::from_slice(&response.body)?),
            400 => Err(EdgeError::Rejected {
                status: 400,
                body: format!("request is in an invalid state: {body}"),
            }),
            404 => Err(EdgeError::NotFound(format!(
                "the requested resource does not exist: {url}"
            ))),
            423 => Err(EdgeError::Rejected {
                status: 423,
                body: "the device is locked (AdminState) or down (OperatingState)".into(),
            }),
            500 => Err(EdgeError::Rejected {
                status: 500,
                body: format!("an unexpected error occurred on the server: {body}"),
            }),
            status => Err(EdgeError::Rejected { status, body }),
        }
    }
}

/// Success for deletes that answer with a bare `true`.
fn expect_true(response: &HttpResponse) -> EdgeResult<()> {
    let body = response.text();
    if body.trim() == "true" || is_success_envelope(&body) {
        Ok(())
    } else {
        Err(EdgeError::Rejected {
            status: response.status,
            body,
        })
    }
}

#[async_trait]
impl<C: HttpClient> EdgeClient<Device> for EdgexClient<C> {
    async fn create(&self, record: &Device) -> EdgeResult<String> {
        let wire = convert::device_to_wire(record);
        debug!(device = %wire.name, "creating device on edge");
        self.post_for_id(self.metadata_url(DEVICE_PATH), &wire).await
    }

    async fn delete(&self, edge_name: &str) -> EdgeResult<()> {
        debug!(device = %edge_name, "deleting device on edge");
        let response = self.delete_by_name(DEVICE_PATH, edge_name).await?;
        expect_true(&response)
    }

    async fn update(&self, record: &Device) -> EdgeResult<Option<Device>> {
        let mut fields = BTreeMap::new();
        if let Some(admin) = record.spec.admin_state {
            fields.insert("adminState", admin.as_str());
        }
        if let Some(operating) = record.spec.operating_state {
            fields.insert("operatingState", operating.as_str());
        }
        if fields.is_empty() {
            return Ok(None);
        }

        let name = edge_name(record);
        let url = self.metadata_url(&format!("{DEVICE_PATH}/name/{name}"));
        let request = HttpRequest::new(Method::Put, url).with_body(serde_json::to_vec(&fields)?);
        self.execute(request).await?;
        Ok(Some(record.clone()))
    }

    async fn get(&self, edge_name: &str) -> EdgeResult<Device> {
        let url = self.metadata_url(&format!("{DEVICE_PATH}/name/{edge_name}"));
        let wire: WireDevice = self.get_json(url).await?;
        Ok(convert::device_from_wire(&wire, &self.placement))
    }

    async fn list(&self, options: &EdgeListOptions) -> EdgeResult<Vec<Device>> {
        let wires: Vec<WireDevice> = self.get_json(self.list_url(DEVICE_PATH, options)).await?;
        Ok(wires
            .iter()
            .map(|w| convert::device_from_wire(w, &self.placement))
            .collect())
    }
}

#[async_trait]
impl<C: HttpClient> EdgeClient<DeviceService> for EdgexClient<C> {
    async fn create(&self, record: &DeviceService) -> EdgeResult<String> {
        self.ensure_addressable(record).await?;
        let wire = convert::service_to_wire(record);
        debug!(service = %wire.name, "creating device service on edge");
        self.post_for_id(self.metadata_url(DEVICE_SERVICE_PATH), &wire)
            .await
    }

    async fn delete(&self, edge_name: &str) -> EdgeResult<()> {
        debug!(service = %edge_name, "deleting device service on edge");
        let response = self.delete_by_name(DEVICE_SERVICE_PATH, edge_name).await?;
        expect_true(&response)
    }

    async fn update(&self, record: &DeviceService) -> EdgeResult<Option<DeviceService>> {
        let name = edge_name(record);
        let base = format!("{DEVICE_SERVICE_PATH}/name/{name}");
        let mut sent = false;

        if let Some(admin) = record.spec.admin_state {
            let url = self.metadata_url(&format!("{base}/adminstate/{admin}"));
            self.execute(HttpRequest::new(Method::Put, url)).await?;
            sent = true;
        }
        if let Some(operating) = record.spec.operating_state {
            let url = self.metadata_url(&format!("{base}/opstate/{operating}"));
            self.execute(HttpRequest::new(Method::Put, url)).await?;
            sent = true;
        }
        Ok(sent.then(|| record.clone()))
    }

    async fn get(&self, edge_name: &str) -> EdgeResult<DeviceService> {
        let url = self.metadata_url(&format!("{DEVICE_SERVICE_PATH}/name/{edge_name}"));
        let wire: WireDeviceService = self.get_json(url).await?;
        Ok(convert::service_from_wire(&wire, &self.placement))
    }

    async fn list(&self, options: &EdgeListOptions) -> EdgeResult<Vec<DeviceService>> {
        let wires: Vec<WireDeviceService> = self
            .get_json(self.list_url(DEVICE_SERVICE_PATH, options))
            .await?;
        Ok(wires
            .iter()
            .map(|w| convert::service_from_wire(w, &self.placement))
            .collect())
    }
}

#[async_trait]
impl<C: HttpClient> EdgeClient<DeviceProfile> for EdgexClient<C> {
    async fn create(&self, record: &DeviceProfile) -> EdgeResult<String> {
        let wire = convert::profile_to_wire(record);
        debug!(profile = %wire.name, "creating device profile on edge");
        self.post_for_id(self.metadata_url(DEVICE_PROFILE_PATH), &wire)
            .await
    }

    async fn delete(&self, edge_name: &str) -> EdgeResult<()> {
        debug!(profile = %edge_name, "deleting device profile on edge");
        let response = self.delete_by_name(DEVICE_PROFILE_PATH, edge_name).await?;
        expect_true(&response)
    }

    async fn update(&self, record: &DeviceProfile) -> EdgeResult<Option<DeviceProfile>> {
        let wire = convert::profile_to_wire(record);
        let request = HttpRequest::new(Method::Put, self.metadata_url(DEVICE_PROFILE_PATH))
            .with_body(serde_json::to_vec(&wire)?);
        self.execute(request).await?;
        Ok(Some(record.clone()))
    }

    async fn get(&self, edge_name: &str) -> EdgeResult<DeviceProfile> {
        let url = self.metadata_url(&format!("{DEVICE_PROFILE_PATH}/name/{edge_name}"));
        let wire: WireDeviceProfile = self.get_json(url).await?;
        Ok(convert::profile_from_wire(&wire, &self.placement))
    }

    async fn list(&self, options: &EdgeListOptions) -> EdgeResult<Vec<DeviceProfile>> {
        let wires: Vec<WireDeviceProfile> = self
            .get_json(self.list_url(DEVICE_PROFILE_PATH, options))
            .await?;
        Ok(wires
            .iter()
            .map(|w| convert::profile_from_wire(w, &self.placement))
            .collect())
    }
}

#[async_trait]
impl<C: HttpClient> DevicePropertyClient for EdgexClient<C> {
    async fn get_property_state(
        &self,
        property: &str,
        device: &Device,
    ) -> EdgeResult<ActualPropertyState> {
        let device_name = edge_name(device);
        let get_url = match device.status.device_properties.get(property) {
            Some(cached) if !cached.get_url.is_empty() => cached.get_url.clone(),
            _ => self.get_property_url(device_name, property, false).await?,
        };

        let event = self.read_event(&get_url).await?;
        Ok(ActualPropertyState {
            name: property.to_string(),
            actual_value: convert::property_value(property, &event),
            get_url,
        })
    }

    async fn update_property_state(
        &self,
        desired: &DesiredPropertyState,
        device: &Device,
    ) -> EdgeResult<()> {
        let put_url = if desired.put_url.is_empty() {
            self.get_property_url(edge_name(device), &desired.name, true)
                .await?
        } else {
            desired.put_url.clone()
        };

        let body = serde_json::to_vec(&BTreeMap::from([(
            desired.name.as_str(),
            desired.desired_value.as_str(),
        )]))?;
        debug!(property = %desired.name, url = %put_url, "setting property");
        let response = self
            .send(HttpRequest::new(Method::Put, put_url).with_body(body))
            .await?;
        let text = response.text();
        if response.status != 200 || text.contains(WRITE_FAILURE_MARKER) {
            return Err(EdgeError::Rejected {
                status: response.status,
                body: format!("failed to set property {}: {text}", desired.name),
            });
        }
        Ok(())
    }

    async fn list_properties_state(&self, device: &Device) -> EdgeResult<PropertyStates> {
        let commands = self.command_metadata(edge_name(device)).await?;
        let mut desired = BTreeMap::new();
        let mut actual = BTreeMap::new();

        for command in &commands.commands {
            desired.insert(
                command.name.clone(),
                DesiredPropertyState {
                    name: command.name.clone(),
                    put_url: command.put.url.clone(),
                    desired_value: String::new(),
                },
            );

            let mut state = ActualPropertyState {
                name: command.name.clone(),
                get_url: command.get.url.clone(),
                actual_value: String::new(),
            };
            match self.read_event(&command.get.url).await {
                Ok(event) => {
                    state.actual_value =
                        convert::property_value(convert::reading_name(command), &event);
                }
                Err(EdgeError::Decode(reason)) => {
                    debug!(command = %command.name, %reason, "skipping undecodable reading");
                    continue;
                }
                Err(e) => {
                    trace!(command = %command.name, error = %e, "property read failed");
                }
            }
            actual.insert(command.name.clone(), state);
        }
        Ok((desired, actual))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::LoopbackClient;
    use devicesync_api::{Command, CommandAction, Resource};
    use serde_json::json;

    type Handler = fn(&HttpRequest) -> Result<HttpResponse, String>;

    fn client(handler: Handler) -> EdgexClient<LoopbackClient<Handler>> {
        EdgexClient::new(
            EdgeConfig::new()
                .with_core_metadata("meta:48081")
                .with_core_command("cmd:48082")
                .with_core_data("data:48080"),
            Placement::new("default", "pool-a"),
            LoopbackClient::new(handler),
        )
    }

    #[tokio::test]
    async fn get_missing_device_is_not_found() {
        let edge = client(|_| Ok(HttpResponse::new(404, "Item not found\n")));
        let err = EdgeClient::<Device>::get(&edge, "lamp").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn transport_failure_is_unreachable() {
        let edge = client(|_| Err("connection refused".into()));
        let err = EdgeClient::<Device>::list(&edge, &EdgeListOptions::all())
            .await
            .unwrap_err();
        assert!(err.is_unreachable());
    }

    #[tokio::test]
    async fn list_by_label_uses_label_path() {
        let edge = client(|req| {
            assert_eq!(req.path(), "/api/v1/device/label/lights");
            Ok(HttpResponse::json(&json!([{"id": "e1", "name": "Lamp"}])))
        });
        let devices = EdgeClient::<Device>::list(&edge, &EdgeListOptions::with_label("lights"))
            .await
            .unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].metadata.name, "pool-a-lamp");
        assert_eq!(devices[0].edge_id(), Some("e1"));
    }

    #[tokio::test]
    async fn update_without_state_fields_sends_nothing() {
        let edge = client(|_| panic!("no request expected"));
        let device = Device::new("default", "lamp");
        assert!(EdgeClient::<Device>::update(&edge, &device)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn service_delete_requires_true_body() {
        let edge = client(|_| Ok(HttpResponse::new(200, "false")));
        let err = EdgeClient::<DeviceService>::delete(&edge, "svc")
            .await
            .unwrap_err();
        assert!(matches!(err, EdgeError::Rejected { .. }));

        let edge = client(|_| Ok(HttpResponse::new(200, "true")));
        assert!(EdgeClient::<DeviceService>::delete(&edge, "svc").await.is_ok());
    }

    #[tokio::test]
    async fn device_delete_requires_true_body() {
        let edge = client(|_| Ok(HttpResponse::new(200, "false")));
        let err = EdgeClient::<Device>::delete(&edge, "lamp")
            .await
            .unwrap_err();
        assert!(matches!(err, EdgeError::Rejected { status: 200, .. }));

        let edge = client(|_| Ok(HttpResponse::new(200, "true")));
        assert!(EdgeClient::<Device>::delete(&edge, "lamp").await.is_ok());
    }

    #[tokio::test]
    async fn profile_delete_requires_true_body() {
        let edge = client(|_| Ok(HttpResponse::new(200, "")));
        let err = EdgeClient::<DeviceProfile>::delete(&edge, "lamp-profile")
            .await
            .unwrap_err();
        assert!(matches!(err, EdgeError::Rejected { status: 200, .. }));

        let edge = client(|_| Ok(HttpResponse::new(200, "true")));
        assert!(EdgeClient::<DeviceProfile>::delete(&edge, "lamp-profile")
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn write_failure_marker_is_rejected() {
        let edge = client(|_| Ok(HttpResponse::new(200, "error in execWriteCmd")));
        let desired = DesiredPropertyState {
            name: "brightness".into(),
            put_url: "http://cmd:48082/put".into(),
            desired_value: "50".into(),
        };
        let err = edge
            .update_property_state(&desired, &Device::new("default", "lamp"))
            .await
            .unwrap_err();
        assert!(matches!(err, EdgeError::Rejected { status: 200, .. }));
    }

    #[tokio::test]
    async fn locked_device_read_is_rejected() {
        let edge = client(|req| {
            if req.authority() == "cmd:48082" && req.path().starts_with("/api/v1/device/name") {
                let commands = WireCommandResponse {
                    name: "lamp".into(),
                    commands: vec![Command {
                        name: "brightness".into(),
                        get: CommandAction {
                            url: "http://cmd:48082/get/brightness".into(),
                            ..Default::default()
                        },
                        ..Default::default()
                    }],
                    ..Default::default()
                };
                Ok(HttpResponse::json(&commands))
            } else {
                Ok(HttpResponse::new(423, ""))
            }
        });
        let err = edge
            .get_property_state("brightness", &Device::new("default", "lamp"))
            .await
            .unwrap_err();
        assert!(matches!(err, EdgeError::Rejected { status: 423, .. }));
        assert!(err.is_retryable());
    }
}
