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

//! Bluetooth Terminal

use anyhow::Result;
use tokio::io::BufReader;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bt_terminal::bluetooth::BluezStack;
use bt_terminal::catalog::DeviceCatalog;
use bt_terminal::commands::Interpreter;
use bt_terminal::config::Config;
use bt_terminal::session::Session;
use bt_terminal::terminal::TerminalLoop;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("bt_terminal=warn")),
        )
        .init();

    info!("Starting Bluetooth Terminal v{}...", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = Config::load()?;
    info!("Configuration loaded");

    // Initialize Bluetooth stack
    let stack = BluezStack::new(&config.bluetooth).await?;
    info!("Bluetooth adapter address: {}", stack.address().await?);

    let catalog = DeviceCatalog::new(Box::new(stack.discovery()));
    let session = Session::new(
        Box::new(stack.pairing()),
        Box::new(stack.transport()),
        config.bluetooth.service_uuid,
    );
    let interpreter = Interpreter::new(catalog, session);

    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = std::io::stdout();
    TerminalLoop::new(stdin, stdout.lock(), interpreter)
        .run()
        .await?;

    info!("Bluetooth Terminal stopped");
    Ok(())
}
