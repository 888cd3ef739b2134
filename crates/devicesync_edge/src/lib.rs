//! # devicesync Edge
//!
//! Client for the edge device-management platform's REST API.
//!
//! This crate provides:
//! - `EdgeClient<R>`: create/get/update/delete/list per record kind
//! - `DevicePropertyClient`: device property reads and writes
//! - `EdgeError`: one error taxonomy for every protocol variant
//! - `HttpClient` abstraction with a `reqwest` implementation and an
//!   in-process loopback for tests
//! - `EdgexClient`: the legacy `/api/v1` implementation
//! - `MockEdgeClient`: an in-memory platform for engine tests
//!
//! Callers never inspect response bodies: not-found and already-exists are
//! recognised here, whether the platform signals them with sentinel strings
//! or with structured status codes.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod client;
mod config;
pub mod convert;
mod edgex;
mod error;
mod http;
mod mock;
pub mod wire;

pub use client::{DevicePropertyClient, EdgeClient, EdgeListOptions, PropertyStates};
pub use config::{validate_address, EdgeConfig};
pub use convert::Placement;
pub use edgex::EdgexClient;
pub use error::{classify_response, EdgeError, EdgeResult};
pub use http::{
    HttpClient, HttpRequest, HttpResponse, LoopbackClient, LoopbackServer, Method, ReqwestClient,
};
pub use mock::{EdgeCall, MockEdgeClient, MockOp};
