//! Clipboard session state machine.
//!
//! One [`Session`] per process invocation. The driver feeds it [`Event`]s
//! one at a time and carries out each returned [`Step`]; the machine itself
//! never performs I/O and never blocks. Waiting is expressed by staying in a
//! non-terminal state until the next event arrives.

use crate::codec;
use crate::protocol::{Event, Response, Selection, Step};

/// How the invocation uses the clipboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Write the payload and quit as soon as it is flushed.
    WriteOnly,
    /// Write the payload, then wait for the terminal to acknowledge it.
    WriteThenWait,
    /// Request the clipboard contents and wait for them.
    ReadOnly,
}

/// Where the session currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Init,
    AwaitingCapabilityAck,
    AwaitingClipboardResponse,
    ReadyToQuit,
    Terminated,
}

/// Options and payload for one session, assembled by the CLI layer.
///
/// The CLI guarantees that exactly one of `payload` / `get_clipboard` is
/// set; the session assumes it.
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    /// Bytes to copy to the clipboard; `None` means no write was requested.
    pub payload: Option<Vec<u8>>,
    pub get_clipboard: bool,
    pub use_primary: bool,
    pub wait_for_completion: bool,
}

/// The protocol state for one invocation.
pub struct Session {
    mode: Mode,
    selection: Selection,
    pending_payload: Option<Vec<u8>>,
    result_text: Option<String>,
    exit_code: Option<i32>,
    state: State,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        let mode = if config.get_clipboard {
            Mode::ReadOnly
        } else if config.wait_for_completion {
            Mode::WriteThenWait
        } else {
            Mode::WriteOnly
        };
        Self {
            mode,
            selection: Selection::from_flag(config.use_primary),
            pending_payload: config.payload,
            result_text: None,
            exit_code: None,
            state: State::Init,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Set exactly once, by the terminating transition.
    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    /// Clipboard text received in read mode, if any arrived before the end.
    pub fn result_text(&self) -> Option<&str> {
        self.result_text.as_deref()
    }

    pub fn take_result_text(&mut self) -> Option<String> {
        self.result_text.take()
    }

    /// Advance the machine by one event.
    ///
    /// Once terminated the session absorbs every further event unchanged.
    /// Events that do not match the current state (stray flushes,
    /// unrecognized or mismatched responses) are no-ops.
    pub fn advance(&mut self, event: Event) -> Step {
        match (self.state, event) {
            (State::Terminated, _) => Step::default(),
            (State::Init, Event::Start) => self.start(),
            (State::ReadyToQuit, Event::WriteFlushed) => self.terminate(0),
            (State::AwaitingCapabilityAck, Event::Response(Response::Capability { .. })) => {
                self.terminate(0)
            }
            (State::AwaitingClipboardResponse, Event::Response(Response::Clipboard { text, .. })) => {
                self.result_text = Some(text);
                self.terminate(0)
            }
            (_, Event::Interrupt | Event::EndOfInput) => self.terminate(1),
            _ => Step::default(),
        }
    }

    fn start(&mut self) -> Step {
        match self.mode {
            Mode::WriteOnly => {
                let payload = self.pending_payload.take().unwrap_or_default();
                self.state = State::ReadyToQuit;
                Step {
                    writes: vec![codec::encode_clipboard_write(&payload, self.selection)],
                    exit: None,
                }
            }
            Mode::WriteThenWait => {
                // The terminal answers responses in send order, so the reply
                // to a capability query placed after the write proves the
                // write has been processed.
                let payload = self.pending_payload.take().unwrap_or_default();
                self.state = State::AwaitingCapabilityAck;
                Step {
                    writes: vec![
                        codec::encode_clipboard_write(&payload, self.selection),
                        codec::encode_capability_query(codec::ACK_CAPABILITY),
                    ],
                    exit: None,
                }
            }
            Mode::ReadOnly => {
                self.state = State::AwaitingClipboardResponse;
                Step {
                    writes: vec![codec::encode_clipboard_read_request(self.selection)],
                    exit: None,
                }
            }
        }
    }

    fn terminate(&mut self, code: i32) -> Step {
        self.state = State::Terminated;
        self.exit_code = Some(code);
        Step {
            writes: Vec::new(),
            exit: Some(code),
        }
    }
}
