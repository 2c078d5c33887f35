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

//! Command dispatch against the catalog and session.

use std::io::{self, Write};
use tracing::{debug, warn};

use super::Command;
use crate::catalog::DeviceCatalog;
use crate::error::SessionError;
use crate::session::Session;

/// Static command reference.
pub const HELP_TEXT: &str = "\
Commands:
  help, h              Show this help
  list, l              List discovered devices
  refresh, r           Discover devices again
  select, s <name>     Select a device by name
  connect, c [pin]     Connect to the selected device, pairing with pin if needed
  msg <message>        Send a message to the connected device
  quit, q              Exit";

/// Whether the terminal keeps reading commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

enum Reply {
    Lines(Vec<String>),
    Quit,
}

/// Routes parsed commands to the catalog and session and renders the result.
pub struct Interpreter {
    catalog: DeviceCatalog,
    session: Session,
}

impl Interpreter {
    pub fn new(catalog: DeviceCatalog, session: Session) -> Self {
        Self { catalog, session }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Prompt reflecting the current session state.
    pub fn prompt(&self) -> String {
        self.session.status().prompt()
    }

    /// Run the initial discovery pass.
    pub async fn discover(&mut self) -> Result<usize, SessionError> {
        self.catalog.discover().await
    }

    /// Release the session's stream.
    pub async fn dispose(&mut self) {
        self.session.dispose().await;
    }

    /// Parse and run one input line, writing any output to `out`.
    ///
    /// Command failures are written as a single line. Only errors writing
    /// to `out` are returned.
    pub async fn execute<W: Write>(&mut self, line: &str, out: &mut W) -> io::Result<Flow> {
        let command = match Command::parse(line) {
            Ok(Some(command)) => command,
            Ok(None) => {
                debug!("Ignoring input: {:?}", line);
                return Ok(Flow::Continue);
            }
            Err(e) => {
                writeln!(out, "{}", e)?;
                out.flush()?;
                return Ok(Flow::Continue);
            }
        };

        debug!("Dispatching {}", command.as_str());
        if let Some(progress) = self.progress(&command) {
            writeln!(out, "{}", progress)?;
            out.flush()?;
        }

        match self.dispatch(command).await {
            Ok(Reply::Quit) => return Ok(Flow::Quit),
            Ok(Reply::Lines(lines)) => {
                for line in lines {
                    writeln!(out, "{}", line)?;
                }
            }
            Err(e) => {
                if e.is_collaborator_failure() {
                    warn!("{}", e);
                }
                writeln!(out, "{}", e)?;
            }
        }
        out.flush()?;

        Ok(Flow::Continue)
    }

    /// Line shown before a command that may take a while.
    fn progress(&self, command: &Command) -> Option<String> {
        match command {
            Command::Refresh => Some("Refreshing devices...".to_string()),
            Command::Connect(_) => self
                .session
                .selected()
                .map(|device| format!("Connecting to {}...", device.name)),
            _ => None,
        }
    }

    async fn dispatch(&mut self, command: Command) -> Result<Reply, SessionError> {
        let lines = match command {
            Command::Help => HELP_TEXT.lines().map(str::to_string).collect(),
            Command::List => {
                if self.catalog.is_empty() {
                    vec!["No devices".to_string()]
                } else {
                    self.catalog.names().map(str::to_string).collect()
                }
            }
            Command::Refresh => {
                self.catalog.refresh().await?;
                vec!["Done!".to_string()]
            }
            Command::Select(name) => {
                let device = self
                    .catalog
                    .find_by_name(&name)
                    .cloned()
                    .ok_or(SessionError::DeviceNotFound(name))?;
                let line = format!("Selected {}", device.name);
                self.session.select(device).await;
                vec![line]
            }
            Command::Connect(pin) => {
                self.session.connect(pin.as_deref()).await?;
                vec!["Connected".to_string()]
            }
            Command::Msg(message) => {
                self.session.send(&message).await?;
                Vec::new()
            }
            Command::Quit => return Ok(Reply::Quit),
        };

        Ok(Reply::Lines(lines))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bluetooth::stub::{device, StubDiscovery, StubPairing, StubTransport};
    use crate::bluetooth::SPP_UUID;
    use crate::session::SessionState;

    struct Harness {
        interpreter: Interpreter,
        discovery: StubDiscovery,
        pairing: StubPairing,
        transport: StubTransport,
    }

    impl Harness {
        async fn new(devices: Vec<crate::bluetooth::Device>) -> Self {
            let discovery = StubDiscovery::new(devices);
            let pairing = StubPairing::new();
            let transport = StubTransport::new();
            let mut interpreter = Interpreter::new(
                DeviceCatalog::new(Box::new(discovery.clone())),
                Session::new(
                    Box::new(pairing.clone()),
                    Box::new(transport.clone()),
                    SPP_UUID,
                ),
            );
            interpreter.discover().await.unwrap();
            Self {
                interpreter,
                discovery,
                pairing,
                transport,
            }
        }

        async fn run(&mut self, line: &str) -> (Flow, String) {
            let mut out = Vec::new();
            let flow = self.interpreter.execute(line, &mut out).await.unwrap();
            (flow, String::from_utf8(out).unwrap())
        }
    }

    #[tokio::test]
    async fn test_list_without_devices() {
        let mut h = Harness::new(vec![]).await;

        let (flow, out) = h.run("list").await;
        assert_eq!(flow, Flow::Continue);
        assert_eq!(out, "No devices\n");
    }

    #[tokio::test]
    async fn test_list_skips_blank_names() {
        let mut h = Harness::new(vec![
            device(1, "A", false),
            device(2, "", false),
            device(3, "B", false),
        ])
        .await;

        let (_, out) = h.run("l").await;
        assert_eq!(out, "A\nB\n");
    }

    #[tokio::test]
    async fn test_refresh_reports_done_even_when_empty() {
        let mut h = Harness::new(vec![device(1, "A", false)]).await;
        h.discovery.set_devices(vec![]);

        let (_, out) = h.run("refresh").await;
        assert_eq!(out, "Refreshing devices...\nDone!\n");

        let (_, out) = h.run("list").await;
        assert_eq!(out, "No devices\n");
    }

    #[tokio::test]
    async fn test_refresh_failure_is_reported() {
        let mut h = Harness::new(vec![device(1, "A", false)]).await;
        h.discovery.set_fail(true);

        let (flow, out) = h.run("refresh").await;
        assert_eq!(flow, Flow::Continue);
        assert_eq!(
            out,
            "Refreshing devices...\nDiscovery failed: adapter not available\n"
        );
    }

    #[tokio::test]
    async fn test_select_unknown_device() {
        let mut h = Harness::new(vec![device(1, "A", false)]).await;

        let (flow, out) = h.run("select X").await;
        assert_eq!(flow, Flow::Continue);
        assert_eq!(out, "Device 'X' not found\n");
        assert_eq!(h.interpreter.session().state(), SessionState::Idle);
        assert_eq!(h.interpreter.prompt(), ">> ");
    }

    #[tokio::test]
    async fn test_missing_argument_is_reported() {
        let mut h = Harness::new(vec![device(1, "A", false)]).await;

        let (flow, out) = h.run("select").await;
        assert_eq!(flow, Flow::Continue);
        assert_eq!(out, "Missing argument: name\n");
    }

    #[tokio::test]
    async fn test_unknown_command_is_silent() {
        let mut h = Harness::new(vec![]).await;

        let (flow, out) = h.run("foo").await;
        assert_eq!(flow, Flow::Continue);
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_connect_and_msg_when_idle() {
        let mut h = Harness::new(vec![device(1, "A", false)]).await;

        let (_, out) = h.run("connect 1234").await;
        assert_eq!(out, "No device selected\n");
        let (_, out) = h.run("msg hi").await;
        assert_eq!(out, "No device selected\n");

        assert!(h.pairing.calls().is_empty());
        assert!(h.transport.connects().is_empty());
    }

    #[tokio::test]
    async fn test_select_connect_send() {
        let mut h = Harness::new(vec![device(1, "DeviceA", false), device(2, "DeviceB", true)]).await;

        let (_, out) = h.run("s DeviceB").await;
        assert_eq!(out, "Selected DeviceB\n");
        assert_eq!(h.interpreter.prompt(), "(DeviceB)>> ");

        let (_, out) = h.run("c").await;
        assert_eq!(out, "Connecting to DeviceB...\nConnected\n");
        assert_eq!(h.interpreter.prompt(), "$(DeviceB)>> ");
        assert!(h.pairing.calls().is_empty());

        let (_, out) = h.run("msg hello world").await;
        assert!(out.is_empty());
        assert_eq!(h.transport.written(), b"hello world\r\n\r\n");

        let (_, out) = h.run("msg   ").await;
        assert_eq!(out, "Message is empty\n");
    }

    #[tokio::test]
    async fn test_pairing_failure_is_reported() {
        let mut h = Harness::new(vec![device(1, "DeviceA", false)]).await;
        h.pairing.set_reject(true);

        h.run("select DeviceA").await;
        let (flow, out) = h.run("connect 0000").await;

        assert_eq!(flow, Flow::Continue);
        assert!(out.contains("Pairing with DeviceA failed"));
        assert_eq!(h.interpreter.prompt(), "(DeviceA)>> ");
    }

    #[tokio::test]
    async fn test_quit() {
        let mut h = Harness::new(vec![]).await;

        assert_eq!(h.run("quit").await.0, Flow::Quit);
        assert_eq!(h.run("q").await.0, Flow::Quit);
    }
}
