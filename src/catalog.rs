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

//! Devices found during the current run.

use futures::StreamExt;
use tracing::{debug, info};

use crate::bluetooth::{Device, DiscoveryProvider};
use crate::error::SessionError;

/// Insertion-ordered cache of discovered devices.
pub struct DeviceCatalog {
    provider: Box<dyn DiscoveryProvider>,
    devices: Vec<Device>,
}

impl DeviceCatalog {
    pub fn new(provider: Box<dyn DiscoveryProvider>) -> Self {
        Self {
            provider,
            devices: Vec::new(),
        }
    }

    /// Run a discovery pass unless the catalog is already populated.
    ///
    /// Returns the number of devices held afterwards.
    pub async fn discover(&mut self) -> Result<usize, SessionError> {
        if !self.devices.is_empty() {
            debug!("Catalog already holds {} devices", self.devices.len());
            return Ok(self.devices.len());
        }

        let mut found = self
            .provider
            .scan()
            .await
            .map_err(SessionError::Discovery)?;

        while let Some(device) = found.next().await {
            if device.name.trim().is_empty() {
                debug!("Ignoring unnamed device {}", device.address);
                continue;
            }
            debug!("Adding {} ({})", device.name, device.address);
            self.devices.push(device);
        }

        info!("Discovery complete: {} devices", self.devices.len());
        Ok(self.devices.len())
    }

    /// Forget all devices and discover again.
    pub async fn refresh(&mut self) -> Result<usize, SessionError> {
        self.devices.clear();
        self.discover().await
    }

    /// Display names in discovery order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.devices.iter().map(|d| d.name.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// First device whose name matches exactly.
    pub fn find_by_name(&self, name: &str) -> Option<&Device> {
        self.devices.iter().find(|d| d.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bluetooth::stub::{device, StubDiscovery};

    fn catalog_with(devices: Vec<Device>) -> (DeviceCatalog, StubDiscovery) {
        let stub = StubDiscovery::new(devices);
        (DeviceCatalog::new(Box::new(stub.clone())), stub)
    }

    #[tokio::test]
    async fn test_blank_names_are_dropped() {
        let (mut catalog, _) = catalog_with(vec![
            device(1, "A", false),
            device(2, "", false),
            device(3, "   ", true),
            device(4, "B", true),
        ]);

        assert_eq!(catalog.discover().await.unwrap(), 2);
        assert_eq!(catalog.names().collect::<Vec<_>>(), vec!["A", "B"]);
    }

    #[tokio::test]
    async fn test_empty_scan() {
        let (mut catalog, _) = catalog_with(vec![]);

        assert_eq!(catalog.discover().await.unwrap(), 0);
        assert!(catalog.is_empty());
    }

    #[tokio::test]
    async fn test_discover_is_idempotent() {
        let (mut catalog, stub) = catalog_with(vec![device(1, "A", false)]);

        catalog.discover().await.unwrap();
        stub.set_devices(vec![device(2, "B", false)]);
        catalog.discover().await.unwrap();

        assert_eq!(stub.scans(), 1);
        assert_eq!(catalog.names().collect::<Vec<_>>(), vec!["A"]);
    }

    #[tokio::test]
    async fn test_refresh_clears_before_rescanning() {
        let (mut catalog, stub) = catalog_with(vec![device(1, "A", false)]);
        catalog.discover().await.unwrap();

        stub.set_devices(vec![]);
        assert_eq!(catalog.refresh().await.unwrap(), 0);

        assert_eq!(stub.scans(), 2);
        assert!(catalog.is_empty());
    }

    #[tokio::test]
    async fn test_find_by_name_is_exact_and_returns_first() {
        let (mut catalog, _) = catalog_with(vec![
            device(1, "Sensor", false),
            device(2, "Sensor", true),
        ]);
        catalog.discover().await.unwrap();

        assert_eq!(catalog.find_by_name("Sensor").unwrap().address, device(1, "", false).address);
        assert!(catalog.find_by_name("sensor").is_none());
        assert!(catalog.find_by_name("Sensor ").is_none());
    }

    #[tokio::test]
    async fn test_scan_failure_is_reported() {
        let (mut catalog, stub) = catalog_with(vec![device(1, "A", false)]);
        stub.set_fail(true);

        let err = catalog.discover().await.unwrap_err();
        assert!(matches!(err, SessionError::Discovery(_)));
        assert!(catalog.is_empty());
    }
}
