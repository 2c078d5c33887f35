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

//! Session state machine.
//!
//! A session moves from `Idle` to `Selected` once a device is chosen, and to
//! `Connected` once a stream to the device's serial service is open. The
//! stream only exists inside the `Connected` state, so it can never outlive
//! the connection it belongs to.

use anyhow::anyhow;
use std::mem;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::bluetooth::{Device, Link, PairingService, Transport};
use crate::error::SessionError;

/// Terminator written after every message.
const LINE_TERMINATOR: &[u8] = b"\r\n";

/// Observable state of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Selected,
    Connected,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Idle => "Idle",
            SessionState::Selected => "Selected",
            SessionState::Connected => "Connected",
        }
    }
}

/// Snapshot used to render the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    pub device_name: Option<String>,
    pub connected: bool,
}

impl SessionStatus {
    pub fn prompt(&self) -> String {
        match (&self.device_name, self.connected) {
            (Some(name), true) => format!("$({})>> ", name),
            (Some(name), false) => format!("({})>> ", name),
            (None, _) => ">> ".to_string(),
        }
    }
}

enum Phase {
    Idle,
    Selected(Device),
    Connected {
        device: Device,
        link: BufWriter<Box<dyn Link>>,
    },
}

/// The single logical session of a terminal run.
pub struct Session {
    pairing: Box<dyn PairingService>,
    transport: Box<dyn Transport>,
    service: Uuid,
    phase: Phase,
}

impl Session {
    /// Create an idle session that connects to `service` on selected devices.
    pub fn new(
        pairing: Box<dyn PairingService>,
        transport: Box<dyn Transport>,
        service: Uuid,
    ) -> Self {
        Self {
            pairing,
            transport,
            service,
            phase: Phase::Idle,
        }
    }

    pub fn state(&self) -> SessionState {
        match self.phase {
            Phase::Idle => SessionState::Idle,
            Phase::Selected(_) => SessionState::Selected,
            Phase::Connected { .. } => SessionState::Connected,
        }
    }

    pub fn selected(&self) -> Option<&Device> {
        match &self.phase {
            Phase::Idle => None,
            Phase::Selected(device) | Phase::Connected { device, .. } => Some(device),
        }
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            device_name: self.selected().map(|d| d.name.clone()),
            connected: self.state() == SessionState::Connected,
        }
    }

    /// Make `device` the target of later connect and send calls.
    ///
    /// An open stream to the previously selected device is closed first.
    pub async fn select(&mut self, device: Device) {
        info!("Selected {} ({})", device.name, device.address);
        let previous = mem::replace(&mut self.phase, Phase::Selected(device));
        if let Phase::Connected { device, link } = previous {
            self.close(&device, link).await;
        }
    }

    /// Pair if needed, then open a stream to the selected device.
    ///
    /// On failure the session stays `Selected` and holds no stream.
    pub async fn connect(&mut self, pin: Option<&str>) -> Result<(), SessionError> {
        let device = match mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Idle => return Err(SessionError::NoDeviceSelected),
            Phase::Selected(device) => device,
            Phase::Connected { device, link } => {
                self.close(&device, link).await;
                device
            }
        };
        self.phase = Phase::Selected(device.clone());

        let link = self.open(&device, pin).await?;
        info!("Connected to {}", device.name);
        self.phase = Phase::Connected { device, link };
        Ok(())
    }

    async fn open(
        &self,
        device: &Device,
        pin: Option<&str>,
    ) -> Result<BufWriter<Box<dyn Link>>, SessionError> {
        let connect_error = |reason| SessionError::Connect {
            device: device.name.clone(),
            reason,
        };

        if !device.authenticated {
            debug!("{} is not paired, pairing first", device.name);
            self.pairing
                .pair(device.address, pin)
                .await
                .map_err(|reason| SessionError::Pairing {
                    device: device.name.clone(),
                    reason,
                })?;
        }

        self.transport
            .refresh(device.address)
            .await
            .map_err(connect_error)?;

        let mut link = self
            .transport
            .connect(device.address, self.service)
            .await
            .map_err(connect_error)?;

        if !self.transport.is_connected(device.address).await {
            let _ = link.shutdown().await;
            self.transport.release(device.address).await;
            return Err(connect_error(anyhow!("link dropped right after connecting")));
        }

        Ok(BufWriter::new(link))
    }

    /// Write `message` as one line and flush it.
    pub async fn send(&mut self, message: &str) -> Result<(), SessionError> {
        let link = match &mut self.phase {
            Phase::Idle => return Err(SessionError::NoDeviceSelected),
            _ if message.trim().is_empty() => return Err(SessionError::EmptyMessage),
            Phase::Selected(device) => return Err(SessionError::NotConnected(device.name.clone())),
            Phase::Connected { link, .. } => link,
        };

        if let Err(e) = write_line(link, message).await {
            // A stream that failed a write is not kept as connected.
            if let Phase::Connected { device, link } = mem::replace(&mut self.phase, Phase::Idle) {
                warn!("Write to {} failed, dropping stream: {}", device.name, e);
                drop(link);
                self.transport.release(device.address).await;
                self.phase = Phase::Selected(device);
            }
            return Err(SessionError::Write(e));
        }

        debug!("Sent {} bytes", message.len());
        Ok(())
    }

    /// Close the stream, if one is open.
    pub async fn dispose(&mut self) {
        if let Phase::Connected { device, link } = mem::replace(&mut self.phase, Phase::Idle) {
            self.close(&device, link).await;
            self.phase = Phase::Selected(device);
        }
    }

    async fn close(&self, device: &Device, mut link: BufWriter<Box<dyn Link>>) {
        if let Err(e) = link.shutdown().await {
            warn!("Error closing stream to {}: {}", device.name, e);
        } else {
            info!("Closed stream to {}", device.name);
        }
        self.transport.release(device.address).await;
    }
}

/// Encode `message` as ASCII, followed by a terminator and a blank line.
fn encode_line(message: &str) -> Vec<u8> {
    let mut line: Vec<u8> = message
        .chars()
        .map(|c| if c.is_ascii() { c as u8 } else { b'?' })
        .collect();
    line.extend_from_slice(LINE_TERMINATOR);
    line.extend_from_slice(LINE_TERMINATOR);
    line
}

async fn write_line(link: &mut BufWriter<Box<dyn Link>>, message: &str) -> std::io::Result<()> {
    link.write_all(&encode_line(message)).await?;
    link.flush().await
}
