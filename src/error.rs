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

//! Errors reported to the user by terminal commands.

use thiserror::Error;

/// Failure of a single command. Always rendered as one line of output.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Device '{0}' not found")]
    DeviceNotFound(String),

    #[error("No device selected")]
    NoDeviceSelected,

    #[error("Message is empty")]
    EmptyMessage,

    #[error("Missing argument: {0}")]
    MissingArgument(&'static str),

    #[error("Not connected to {0}")]
    NotConnected(String),

    #[error("Discovery failed: {0:#}")]
    Discovery(anyhow::Error),

    #[error("Pairing with {device} failed: {reason:#}")]
    Pairing {
        device: String,
        reason: anyhow::Error,
    },

    #[error("Could not connect to {device}: {reason:#}")]
    Connect {
        device: String,
        reason: anyhow::Error,
    },

    #[error("Failed to send message: {0}")]
    Write(#[from] std::io::Error),
}

impl SessionError {
    /// Whether the error came from a collaborator rather than user input.
    pub fn is_collaborator_failure(&self) -> bool {
        matches!(
            self,
            Self::Discovery(_) | Self::Pairing { .. } | Self::Connect { .. } | Self::Write(_)
        )
    }
}
