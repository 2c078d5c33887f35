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

//! Terminal command parsing and dispatch.

mod interpreter;

pub use interpreter::{Flow, Interpreter, HELP_TEXT};

use crate::error::SessionError;

/// A parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print the command reference.
    Help,
    /// List discovered devices.
    List,
    /// Discard the catalog and discover again.
    Refresh,
    /// Select a device by display name.
    Select(String),
    /// Connect to the selected device, pairing with an optional PIN.
    Connect(Option<String>),
    /// Send a message to the connected device.
    Msg(String),
    /// Leave the terminal.
    Quit,
}

impl Command {
    /// Parse one input line.
    ///
    /// Tokens are separated by single spaces. Returns `Ok(None)` for empty
    /// or unknown commands.
    pub fn parse(line: &str) -> Result<Option<Self>, SessionError> {
        let mut tokens = line.split(' ');
        let name = tokens.next().unwrap_or_default();
        let args: Vec<&str> = tokens.collect();

        let command = match name {
            "help" | "h" => Self::Help,
            "list" | "l" => Self::List,
            "refresh" | "r" => Self::Refresh,
            "select" | "s" => {
                let device = args.join(" ");
                if device.is_empty() {
                    return Err(SessionError::MissingArgument("name"));
                }
                Self::Select(device)
            }
            // Extra spaces around the PIN are not significant.
            "connect" | "c" => Self::Connect(
                args.iter()
                    .find(|pin| !pin.is_empty())
                    .map(|pin| pin.to_string()),
            ),
            "msg" => Self::Msg(args.join(" ")),
            "quit" | "q" => Self::Quit,
            _ => return Ok(None),
        };

        Ok(Some(command))
    }

    /// Get the canonical command name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Help => "help",
            Self::List => "list",
            Self::Refresh => "refresh",
            Self::Select(_) => "select",
            Self::Connect(_) => "connect",
            Self::Msg(_) => "msg",
            Self::Quit => "quit",
        }
    }
}
