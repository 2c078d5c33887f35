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

//! Pairing through a BlueZ agent.

use anyhow::Result;
use async_trait::async_trait;
use bluer::agent::{
    Agent, ReqError, ReqResult, RequestConfirmation, RequestConfirmationFn, RequestPasskey,
    RequestPasskeyFn, RequestPinCode, RequestPinCodeFn,
};
use bluer::{Adapter, Address};
use tracing::{info, warn};

use super::PairingService;

/// Pairs devices by registering a short-lived agent that answers with a PIN.
pub struct BluezPairing {
    session: bluer::Session,
    adapter: Adapter,
}

impl BluezPairing {
    pub(crate) fn new(session: bluer::Session, adapter: Adapter) -> Self {
        Self { session, adapter }
    }

    /// Build an agent that answers PIN and passkey prompts with `pin`.
    fn agent(pin: Option<String>) -> Agent {
        let passkey = pin.as_deref().and_then(|p| p.parse::<u32>().ok());

        let request_pin_code = pin.map(|pin| -> RequestPinCodeFn {
            Box::new(move |req| Box::pin(answer_pin_code(req, pin.clone())))
        });
        let request_passkey = passkey.map(|passkey| -> RequestPasskeyFn {
            Box::new(move |req| Box::pin(answer_passkey(req, passkey)))
        });
        let request_confirmation: RequestConfirmationFn =
            Box::new(|req| Box::pin(confirm_passkey(req)));

        Agent {
            request_default: true,
            request_pin_code,
            request_passkey,
            request_confirmation: Some(request_confirmation),
            ..Default::default()
        }
    }
}

async fn answer_pin_code(req: RequestPinCode, pin: String) -> ReqResult<String> {
    info!("PIN code requested by {}", req.device);
    Ok(pin)
}

async fn answer_passkey(req: RequestPasskey, passkey: u32) -> ReqResult<u32> {
    info!("Passkey requested by {}", req.device);
    Ok(passkey)
}

async fn confirm_passkey(req: RequestConfirmation) -> ReqResult<()> {
    info!("Confirming passkey {:06} for {}", req.passkey, req.device);
    if req.passkey > 999_999 {
        warn!("Passkey out of range");
        return Err(ReqError::Rejected);
    }
    Ok(())
}

#[async_trait]
impl PairingService for BluezPairing {
    async fn pair(&self, address: Address, pin: Option<&str>) -> Result<()> {
        let device = self.adapter.device(address)?;
        if device.is_paired().await? {
            info!("{} is already paired", address);
            return Ok(());
        }

        // The agent stays registered only while this handle is alive.
        let _agent = self
            .session
            .register_agent(Self::agent(pin.map(str::to_string)))
            .await?;

        info!("Pairing with {}...", address);
        device.pair().await?;
        device.set_trusted(true).await?;
        info!("Paired with {}", address);

        Ok(())
    }
}
