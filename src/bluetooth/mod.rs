// Copyright 2026 Daniel Pelikan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Bluetooth collaborators.
//!
//! The terminal core only talks to the platform stack through the traits in
//! this module. [`BluezStack`] implements them on top of BlueZ, and the
//! [`stub`] module provides in-memory versions for tests.

mod adapter;
mod pairing;
pub mod stub;
mod transport;

use anyhow::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;
use tokio::io::{AsyncRead, AsyncWrite};
use uuid::Uuid;

pub use adapter::{BluezDiscovery, BluezStack};
pub use bluer::Address;
pub use pairing::BluezPairing;
pub use transport::BluezTransport;

/// Standard SPP UUID.
pub const SPP_UUID: Uuid = Uuid::from_u128(0x00001101_0000_1000_8000_00805F9B34FB);

/// A device reported by a discovery pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    pub address: Address,
    pub name: String,
    /// Whether the device is already paired with this host.
    pub authenticated: bool,
}

impl Device {
    pub fn new(address: Address, name: impl Into<String>, authenticated: bool) -> Self {
        Self {
            address,
            name: name.into(),
            authenticated,
        }
    }
}

/// Byte stream to a remote service.
pub trait Link: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> Link for T {}

/// Produces nearby devices.
#[async_trait]
pub trait DiscoveryProvider: Send + Sync {
    /// Start a discovery pass.
    ///
    /// The returned stream is lazy and finite: it yields devices as they are
    /// found and ends when the provider decides the scan is over.
    async fn scan(&self) -> Result<BoxStream<'static, Device>>;
}

/// Pairs this host with a remote device.
#[async_trait]
pub trait PairingService: Send + Sync {
    /// Pair with `address`, answering PIN prompts with `pin` if given.
    ///
    /// May block until the remote side or the OS completes the handshake.
    async fn pair(&self, address: Address, pin: Option<&str>) -> Result<()>;
}

/// Opens stream connections to a remote service.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Refresh cached connection metadata for `address`.
    async fn refresh(&self, address: Address) -> Result<()>;

    /// Connect to `service` on `address`.
    async fn connect(&self, address: Address, service: Uuid) -> Result<Box<dyn Link>>;

    /// Whether the transport currently holds a connection to `address`.
    async fn is_connected(&self, address: Address) -> bool;

    /// Drop anything kept alive for the connection to `address`.
    ///
    /// Called after the link to `address` is closed or abandoned.
    async fn release(&self, address: Address);
}
