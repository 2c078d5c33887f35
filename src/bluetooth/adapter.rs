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

//! BlueZ adapter setup and device discovery.

use anyhow::Result;
use async_stream::stream;
use async_trait::async_trait;
use bluer::{Adapter, AdapterEvent, Address, DiscoveryFilter, DiscoveryTransport};
use futures::stream::{BoxStream, StreamExt};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info};

use super::pairing::BluezPairing;
use super::transport::BluezTransport;
use super::{Device, DiscoveryProvider};
use crate::config::BluetoothConfig;

/// Handle on the local BlueZ adapter.
///
/// Hands out the discovery, pairing and transport collaborators, which all
/// share the same session and adapter.
pub struct BluezStack {
    session: bluer::Session,
    adapter: Adapter,
    scan_duration: Duration,
}

impl BluezStack {
    /// Open a BlueZ session and prepare the adapter.
    pub async fn new(config: &BluetoothConfig) -> Result<Self> {
        info!("Initializing Bluetooth stack...");

        let session = bluer::Session::new().await?;
        info!("BlueZ session created");

        let adapter = match &config.adapter {
            Some(name) => session.adapter(name)?,
            None => session.default_adapter().await?,
        };
        info!("Using Bluetooth adapter: {}", adapter.name());

        if !adapter.is_powered().await? {
            info!("Powering on Bluetooth adapter...");
            adapter.set_powered(true).await?;
        }

        Ok(Self {
            session,
            adapter,
            scan_duration: Duration::from_secs(config.scan_duration_secs),
        })
    }

    /// Get the adapter address.
    pub async fn address(&self) -> Result<Address> {
        Ok(self.adapter.address().await?)
    }

    pub fn discovery(&self) -> BluezDiscovery {
        BluezDiscovery {
            adapter: self.adapter.clone(),
            scan_duration: self.scan_duration,
        }
    }

    pub fn pairing(&self) -> BluezPairing {
        BluezPairing::new(self.session.clone(), self.adapter.clone())
    }

    pub fn transport(&self) -> BluezTransport {
        BluezTransport::new(self.session.clone(), self.adapter.clone())
    }
}

/// Discovery over BR/EDR inquiry.
pub struct BluezDiscovery {
    adapter: Adapter,
    scan_duration: Duration,
}

impl BluezDiscovery {
    /// Read name and pairing state of a discovered device.
    async fn describe(adapter: &Adapter, address: Address) -> Result<Device> {
        let device = adapter.device(address)?;
        let name = device.name().await?.unwrap_or_default();
        let authenticated = device.is_paired().await?;
        Ok(Device::new(address, name, authenticated))
    }
}

#[async_trait]
impl DiscoveryProvider for BluezDiscovery {
    async fn scan(&self) -> Result<BoxStream<'static, Device>> {
        let filter = DiscoveryFilter {
            transport: DiscoveryTransport::BrEdr,
            ..Default::default()
        };
        self.adapter.set_discovery_filter(filter).await?;

        // Start discovery before returning so adapter failures reach the caller.
        let events = self.adapter.discover_devices().await?;
        let adapter = self.adapter.clone();
        let scan_duration = self.scan_duration;
        info!("Scanning for {:?}...", scan_duration);

        let devices = stream! {
            futures::pin_mut!(events);

            let deadline = tokio::time::sleep(scan_duration);
            tokio::pin!(deadline);

            let mut seen = HashSet::new();
            loop {
                let event = tokio::select! {
                    _ = &mut deadline => None,
                    event = events.next() => event,
                };

                match event {
                    Some(AdapterEvent::DeviceAdded(address)) => {
                        if !seen.insert(address) {
                            continue;
                        }
                        match Self::describe(&adapter, address).await {
                            Ok(device) => {
                                debug!("Discovered {} ({:?})", address, device.name);
                                yield device;
                            }
                            Err(e) => debug!("Skipping {}: {}", address, e),
                        }
                    }
                    Some(_) => {}
                    None => break,
                }
            }

            info!("Discovery pass finished, {} devices seen", seen.len());
        };

        Ok(devices.boxed())
    }
}
