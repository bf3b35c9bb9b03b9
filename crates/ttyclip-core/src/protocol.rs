//! Protocol vocabulary shared by the codec and the session state machine.

/// Which clipboard buffer an operation addresses.
///
/// Terminals on systems with a primary selection (X11) keep it separate from
/// the clipboard proper; everywhere else the distinction is the terminal's
/// problem, not ours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// The system clipboard.
    Clipboard,
    /// The primary selection.
    Primary,
}

impl Selection {
    /// Selection addressed by the `--use-primary` flag.
    pub fn from_flag(use_primary: bool) -> Self {
        if use_primary {
            Self::Primary
        } else {
            Self::Clipboard
        }
    }

    /// OSC 52 selection code.
    pub(crate) fn code(self) -> char {
        match self {
            Self::Clipboard => 'c',
            Self::Primary => 'p',
        }
    }
}

/// A terminal response decoded from one complete escape sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Clipboard contents sent back by the terminal.
    Clipboard { text: String, from_primary: bool },
    /// Answer to a terminfo capability query. `value` is `None` when the
    /// terminal reported the capability as unknown.
    Capability { name: String, value: Option<String> },
    /// Anything the codec could not make sense of.
    Unrecognized,
}

/// An input to the session state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Session startup. Issued exactly once, by the driver.
    Start,
    /// Every byte queued at startup has been written and flushed.
    WriteFlushed,
    /// A decoded terminal response.
    Response(Response),
    /// Ctrl-C or SIGINT.
    Interrupt,
    /// The terminal input stream closed.
    EndOfInput,
}

/// What a single transition asks the driver to do.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Step {
    /// Messages to write to the terminal, in order.
    pub writes: Vec<Vec<u8>>,
    /// Process exit code. Present exactly once, on the terminating
    /// transition; every later event yields an empty step.
    pub exit: Option<i32>,
}
