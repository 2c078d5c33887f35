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

//! RFCOMM client connections through BlueZ profiles.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use bluer::rfcomm::{Profile, ProfileHandle, Role};
use bluer::{Adapter, Address};
use futures::StreamExt;
use parking_lot::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{Link, Transport};

/// Connects to serial-port-style services over RFCOMM.
pub struct BluezTransport {
    session: bluer::Session,
    adapter: Adapter,
    /// Registration backing the current connection.
    profile: Mutex<Option<ProfileHandle>>,
}

impl BluezTransport {
    pub(crate) fn new(session: bluer::Session, adapter: Adapter) -> Self {
        Self {
            session,
            adapter,
            profile: Mutex::new(None),
        }
    }
}

#[async_trait]
impl Transport for BluezTransport {
    async fn refresh(&self, address: Address) -> Result<()> {
        let device = self.adapter.device(address)?;
        let connected = device.is_connected().await?;
        let paired = device.is_paired().await?;
        let rssi = device.rssi().await.ok().flatten();
        debug!(
            "Refreshed {}: connected={} paired={} rssi={:?}",
            address, connected, paired, rssi
        );
        Ok(())
    }

    async fn connect(&self, address: Address, service: Uuid) -> Result<Box<dyn Link>> {
        // Release the registration of any earlier connection first.
        self.profile.lock().take();

        let profile = Profile {
            uuid: service,
            role: Some(Role::Client),
            require_authentication: Some(false),
            require_authorization: Some(false),
            auto_connect: Some(false),
            ..Default::default()
        };
        let mut handle = self.session.register_profile(profile).await?;
        info!("Registered RFCOMM client profile {}", service);

        let device = self.adapter.device(address)?;
        let connect = device.connect_profile(&service);
        tokio::pin!(connect);

        info!("Connecting to {} on {}...", address, service);
        let mut connect_done = false;
        let request = loop {
            tokio::select! {
                res = &mut connect, if !connect_done => {
                    res?;
                    connect_done = true;
                }
                req = handle.next() => {
                    let req = req.ok_or_else(|| anyhow!("profile registration closed"))?;
                    if req.device() != address {
                        // Dropping the request rejects it.
                        warn!("Rejecting unexpected connection from {}", req.device());
                        continue;
                    }
                    break req;
                }
            }
        };

        let stream = request.accept()?;
        *self.profile.lock() = Some(handle);
        info!("RFCOMM stream open to {}", address);

        Ok(Box::new(stream))
    }

    async fn is_connected(&self, address: Address) -> bool {
        match self.adapter.device(address) {
            Ok(device) => device.is_connected().await.unwrap_or(false),
            Err(_) => false,
        }
    }

    async fn release(&self, address: Address) {
        if self.profile.lock().take().is_some() {
            info!("Unregistered RFCOMM client profile used for {}", address);
        }
    }
}
