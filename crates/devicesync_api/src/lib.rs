//! # devicesync API
//!
//! Record types shared by the desired-state store, the edge client and the
//! synchronization engine.
//!
//! This crate provides:
//! - `ObjectMeta` with optimistic-concurrency stamps and finalizers
//! - `Device`, `DeviceService` and `DeviceProfile` records (spec + status)
//! - `Condition` / `Conditions` with severities and a summary condition
//! - The `Resource` trait the engine is generic over
//! - The `IsSynced` capability used to filter redundant update events
//! - Identity correlation between local and edge-platform names
//!
//! This is a pure data crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

#[macro_use]
mod macros;

mod condition;
mod device;
mod device_profile;
mod device_service;
mod error;
mod meta;
mod resource;
mod state;

pub use condition::{Condition, ConditionSeverity, Conditions};
pub use device::{ActualPropertyState, DesiredPropertyState, Device, DeviceSpec, DeviceStatus};
pub use device_profile::{
    Command, CommandAction, CommandResponse, DeviceProfile, DeviceProfileSpec,
    DeviceProfileStatus, DeviceResource, ProfileProperty, ProfileResource, PropertyValue,
    ResourceOperation, Units,
};
pub use device_service::{Addressable, DeviceService, DeviceServiceSpec, DeviceServiceStatus};
pub use error::{ApiError, ApiResult};
pub use meta::{ObjectKey, ObjectMeta, EDGE_OBJECT_NAME_LABEL, READY_CONDITION};
pub use resource::{edge_name, local_name, IsSynced, Kind, Resource};
pub use state::{AdminState, OperatingState};
