//! Line-oriented [`CommandSource`] implementation.
//!
//! Reads newline-delimited JSON commands from any [`BufRead`]: stdin when
//! the tray front-end spawns the daemon as a child process, a file or an
//! in-memory buffer in tests.
//!
//! # Wire format
//!
//! Every message is a single line of JSON followed by `\n`:
//!
//! ```json
//! {"SwitchTo":2}
//! "Next"
//! "Previous"
//! {"Go":"left"}
//! "Refresh"
//! ```

use crate::command::Command;
use crate::traits::CommandSource;
use log::{debug, error, info};
use std::io::BufRead;
use std::sync::mpsc;

/// A [`CommandSource`] that parses one JSON command per line.
///
/// Blank lines are skipped and malformed lines are logged and dropped.
/// The source finishes when the reader reaches end of input.
pub struct LineListener<R> {
    reader: R,
}

/// Errors produced by the line listener.
#[derive(Debug, thiserror::Error)]
pub enum LineListenerError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl<R: BufRead + Send> LineListener<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: BufRead + Send> CommandSource for LineListener<R> {
    type Error = LineListenerError;

    /// Read lines until end of input or until the sink is closed.
    fn run(&mut self, sink: mpsc::Sender<Command>) -> Result<(), Self::Error> {
        let mut line = String::new();
        loop {
            line.clear();
            if self.reader.read_line(&mut line)? == 0 {
                info!("command input closed");
                return Ok(());
            }
            let text = line.trim();
            if text.is_empty() {
                continue;
            }
            match serde_json::from_str::<Command>(text) {
                Ok(cmd) => {
                    debug!("received {:?}", cmd);
                    if sink.send(cmd).is_err() {
                        info!("sink closed, shutting down");
                        return Ok(());
                    }
                }
                Err(e) => {
                    error!("bad command: {} ({})", text, e);
                }
            }
        }
    }
}

//  Tests
