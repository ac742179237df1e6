// lumen-api: Resilient async client for the lumen lighting-controller backend

pub mod client;
mod endpoints;
pub mod error;
pub mod models;
pub mod transport;

pub use client::{CallOptions, DEFAULT_BACKOFF, Payload, RequestPolicy, ResilientClient};
pub use error::Error;
pub use models::{DeviceState, ProbeInfo, Rgbw};
pub use transport::{HttpTransport, OutboundRequest, RawResponse, Transport, TransportConfig};
