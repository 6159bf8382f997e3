//! LinkPlay device control over the `httpapi.asp` command interface

pub mod client;
pub mod http;
pub mod models;

pub use client::{ClientSettings, LinkplayClient};
pub use http::{HttpTransport, TransportSettings};
pub use models::{DeviceStatus, MasterRef, MultiroomInfo, PlayerStatus, WifiAuth};
