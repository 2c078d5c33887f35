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

//! In-memory collaborators for running the terminal without radio hardware.

use anyhow::{bail, Result};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use parking_lot::Mutex;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tracing::info;
use uuid::Uuid;

use super::{Address, Device, DiscoveryProvider, Link, PairingService, Transport};

/// Build a device with a synthetic address ending in `last`.
pub fn device(last: u8, name: &str, authenticated: bool) -> Device {
    Device::new(Address::new([0x00, 0x1A, 0x7D, 0xDA, 0x71, last]), name, authenticated)
}

/// Discovery that replays a fixed device list.
#[derive(Clone, Default)]
pub struct StubDiscovery {
    inner: Arc<Mutex<DiscoveryLog>>,
}

#[derive(Default)]
struct DiscoveryLog {
    devices: Vec<Device>,
    scans: usize,
    fail: bool,
}

impl StubDiscovery {
    pub fn new(devices: Vec<Device>) -> Self {
        let stub = Self::default();
        stub.set_devices(devices);
        stub
    }

    /// Replace what the next scans return.
    pub fn set_devices(&self, devices: Vec<Device>) {
        self.inner.lock().devices = devices;
    }

    pub fn set_fail(&self, fail: bool) {
        self.inner.lock().fail = fail;
    }

    /// Number of scans started so far.
    pub fn scans(&self) -> usize {
        self.inner.lock().scans
    }
}

#[async_trait]
impl DiscoveryProvider for StubDiscovery {
    async fn scan(&self) -> Result<BoxStream<'static, Device>> {
        let mut log = self.inner.lock();
        if log.fail {
            bail!("adapter not available");
        }
        log.scans += 1;
        info!("[STUB] Scan #{} yields {} devices", log.scans, log.devices.len());
        Ok(stream::iter(log.devices.clone()).boxed())
    }
}

/// Pairing that records requests.
#[derive(Clone, Default)]
pub struct StubPairing {
    inner: Arc<Mutex<PairingLog>>,
}

#[derive(Default)]
struct PairingLog {
    calls: Vec<(Address, Option<String>)>,
    reject: bool,
}

impl StubPairing {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every pairing attempt fail.
    pub fn set_reject(&self, reject: bool) {
        self.inner.lock().reject = reject;
    }

    /// Pairing requests made so far, with the PIN that was offered.
    pub fn calls(&self) -> Vec<(Address, Option<String>)> {
        self.inner.lock().calls.clone()
    }
}

#[async_trait]
impl PairingService for StubPairing {
    async fn pair(&self, address: Address, pin: Option<&str>) -> Result<()> {
        let mut log = self.inner.lock();
        log.calls.push((address, pin.map(str::to_string)));
        info!("[STUB] Would pair with {} (pin: {:?})", address, pin);
        if log.reject {
            bail!("authentication rejected by {}", address);
        }
        Ok(())
    }
}

/// Transport whose links write into a shared buffer.
#[derive(Clone, Default)]
pub struct StubTransport {
    inner: Arc<Mutex<TransportLog>>,
}

#[derive(Default)]
struct TransportLog {
    refreshes: Vec<Address>,
    connects: Vec<(Address, Uuid)>,
    connected: Option<Address>,
    refuse: bool,
    report_disconnected: bool,
    fail_writes: bool,
    written: Vec<u8>,
    flushes: usize,
    shutdowns: usize,
    releases: Vec<Address>,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make connection attempts fail.
    pub fn set_refuse(&self, refuse: bool) {
        self.inner.lock().refuse = refuse;
    }

    /// Open links but report the device as disconnected afterwards.
    pub fn set_report_disconnected(&self, report: bool) {
        self.inner.lock().report_disconnected = report;
    }

    /// Make writes on open links fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.lock().fail_writes = fail;
    }

    pub fn refreshes(&self) -> Vec<Address> {
        self.inner.lock().refreshes.clone()
    }

    pub fn connects(&self) -> Vec<(Address, Uuid)> {
        self.inner.lock().connects.clone()
    }

    /// Bytes that reached the link, across all connections.
    pub fn written(&self) -> Vec<u8> {
        self.inner.lock().written.clone()
    }

    pub fn flushes(&self) -> usize {
        self.inner.lock().flushes
    }

    pub fn shutdowns(&self) -> usize {
        self.inner.lock().shutdowns
    }

    /// Addresses whose connection resources were released.
    pub fn releases(&self) -> Vec<Address> {
        self.inner.lock().releases.clone()
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn refresh(&self, address: Address) -> Result<()> {
        self.inner.lock().refreshes.push(address);
        Ok(())
    }

    async fn connect(&self, address: Address, service: Uuid) -> Result<Box<dyn Link>> {
        let mut log = self.inner.lock();
        log.connects.push((address, service));
        if log.refuse {
            bail!("connection refused by {}", address);
        }
        log.connected = Some(address);
        info!("[STUB] Would connect to {} on {}", address, service);
        Ok(Box::new(StubLink {
            inner: self.inner.clone(),
        }))
    }

    async fn is_connected(&self, address: Address) -> bool {
        let log = self.inner.lock();
        !log.report_disconnected && log.connected == Some(address)
    }

    async fn release(&self, address: Address) {
        let mut log = self.inner.lock();
        if log.connected == Some(address) {
            log.connected = None;
        }
        log.releases.push(address);
        info!("[STUB] Released {}", address);
    }
}

/// Link that appends writes to the owning [`StubTransport`].
struct StubLink {
    inner: Arc<Mutex<TransportLog>>,
}

impl AsyncRead for StubLink {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for StubLink {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let mut log = self.inner.lock();
        if log.fail_writes {
            return Poll::Ready(Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "link closed by remote",
            )));
        }
        log.written.extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.inner.lock().flushes += 1;
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let mut log = self.inner.lock();
        log.shutdowns += 1;
        log.connected = None;
        Poll::Ready(Ok(()))
    }
}
