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

//! Interactive read-dispatch-render loop.

use anyhow::{bail, Result};
use crossterm::cursor::MoveTo;
use crossterm::execute;
use crossterm::terminal::{Clear, ClearType};
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, error, info};

use crate::commands::{Flow, Interpreter};

const BANNER: &str = "Bluetooth Terminal";

/// Owns the interpreter for one terminal run.
pub struct TerminalLoop<R, W> {
    input: R,
    output: W,
    interpreter: Interpreter,
}

impl<R, W> TerminalLoop<R, W>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    pub fn new(input: R, output: W, interpreter: Interpreter) -> Self {
        Self {
            input,
            output,
            interpreter,
        }
    }

    /// Run until `quit`.
    ///
    /// End of input is fatal and returned as an error.
    pub async fn run(mut self) -> Result<()> {
        self.startup().await?;

        let result = self.command_loop().await;

        self.interpreter.dispose().await;
        if result.is_ok() {
            writeln!(self.output, "Bye!")?;
            self.output.flush()?;
        }
        result
    }

    async fn startup(&mut self) -> Result<()> {
        execute!(self.output, Clear(ClearType::All), MoveTo(0, 0))?;
        writeln!(self.output, "{}", BANNER)?;
        writeln!(self.output, "Type 'help' for a list of commands.")?;
        writeln!(self.output)?;
        writeln!(self.output, "Discovering devices...")?;
        self.output.flush()?;

        match self.interpreter.discover().await {
            Ok(count) => info!("Startup discovery found {} devices", count),
            Err(e) => {
                error!("Startup discovery failed: {}", e);
                writeln!(self.output, "{}", e)?;
            }
        }
        writeln!(self.output, "Done!")?;
        self.output.flush()?;

        Ok(())
    }

    async fn command_loop(&mut self) -> Result<()> {
        let mut buf = Vec::new();

        loop {
            write!(self.output, "{}", self.interpreter.prompt())?;
            self.output.flush()?;

            buf.clear();
            if self.input.read_until(b'\n', &mut buf).await? == 0 {
                bail!("end of input");
            }
            // Undecodable bytes become U+FFFD instead of ending the session.
            let line = String::from_utf8_lossy(&buf);
            let command = line.trim_end_matches(['\r', '\n']);

            if self.interpreter.execute(command, &mut self.output).await? == Flow::Quit {
                info!("Quit requested");
                return Ok(());
            }
            debug!("Session state: {}", self.interpreter.session().state().as_str());
        }
    }
}
