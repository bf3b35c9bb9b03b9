//! Process driver binding the session state machine to the real terminal.
//!
//! The driver owns all I/O: it performs the writes each transition asks
//! for, turns raw terminal input and signals into session events, and
//! reports the final outcome. The state machine never touches a descriptor.

pub mod tty;

use std::io::Write;

use anyhow::Result;
use tracing::debug;
use ttyclip_core::codec::{self, InputScanner, TermInput};
use ttyclip_core::protocol::{Event, Response};
use ttyclip_core::session::{Mode, Session, SessionConfig};

use crate::driver::tty::Tty;

/// Byte the terminal sends for Ctrl-C in raw mode.
const CTRL_C: u8 = 0x03;
/// Byte for Ctrl-D (end of transmission).
const CTRL_D: u8 = 0x04;

/// Notice shown on the terminal while waiting for the copy acknowledgement.
const WAIT_NOTICE: &[u8] = b"Waiting for completion...\r\n";

/// Result of a completed session.
#[derive(Debug, PartialEq, Eq)]
pub struct Outcome {
    pub exit_code: i32,
    pub clipboard_text: Option<String>,
}

/// Run one clipboard session against the controlling terminal.
pub async fn run(config: SessionConfig) -> Result<Outcome> {
    let (tty, mut input) = Tty::open()?;
    let mut session = Session::new(config);

    // Startup: emit the initial messages, then report the completed flush.
    // The flush event only terminates the session when no acknowledgement
    // is expected; the waiting modes ignore it.
    if let Some(code) = perform(&mut session, Event::Start, &tty).await? {
        return Ok(finish(session, code));
    }
    if session.mode() == Mode::WriteThenWait {
        tty.write(WAIT_NOTICE.to_vec()).await?;
    }
    if let Some(code) = perform(&mut session, Event::WriteFlushed, &tty).await? {
        return Ok(finish(session, code));
    }

    let mut scanner = InputScanner::new();
    loop {
        tokio::select! {
            chunk = input.recv() => match chunk {
                Some(bytes) => {
                    for byte in bytes {
                        let Some(item) = scanner.advance(byte) else { continue };
                        let Some(event) = input_to_event(item) else { continue };
                        if let Some(code) = perform(&mut session, event, &tty).await? {
                            return Ok(finish(session, code));
                        }
                    }
                }
                None => {
                    if let Some(code) =
                        perform(&mut session, Event::EndOfInput, &tty).await?
                    {
                        return Ok(finish(session, code));
                    }
                }
            },
            _ = tokio::signal::ctrl_c() => {
                if let Some(code) = perform(&mut session, Event::Interrupt, &tty).await? {
                    return Ok(finish(session, code));
                }
            }
        }
    }
}

/// Feed one event to the session and carry out the resulting step.
async fn perform(session: &mut Session, event: Event, tty: &Tty) -> Result<Option<i32>> {
    let step = session.advance(event);
    for message in step.writes {
        tty.write(message).await?;
    }
    Ok(step.exit)
}

/// Map one scanned unit of terminal input to a session event.
///
/// Key presses other than Ctrl-C / Ctrl-D mean nothing here and are
/// dropped. Unrecognized sequences still become events so the session can
/// ignore them on the record.
fn input_to_event(input: TermInput) -> Option<Event> {
    match input {
        TermInput::Sequence(raw) => {
            let response = codec::decode_response(&raw);
            if response == Response::Unrecognized {
                debug!("Ignoring unrecognized terminal response ({} bytes)", raw.len());
            }
            Some(Event::Response(response))
        }
        TermInput::Byte(CTRL_C) => Some(Event::Interrupt),
        TermInput::Byte(CTRL_D) => Some(Event::EndOfInput),
        TermInput::Byte(_) => None,
    }
}

fn finish(mut session: Session, exit_code: i32) -> Outcome {
    Outcome {
        exit_code,
        clipboard_text: session.take_result_text(),
    }
}

/// Write the fetched clipboard text to `out`, verbatim.
///
/// Nothing is written unless the session succeeded and actually produced
/// text; no trailing newline is added and no encoding transformation is
/// applied.
pub fn write_clipboard_output(outcome: &Outcome, out: &mut impl Write) -> std::io::Result<()> {
    if outcome.exit_code != 0 {
        return Ok(());
    }
    match outcome.clipboard_text.as_deref() {
        Some(text) if !text.is_empty() => {
            out.write_all(text.as_bytes())?;
            out.flush()
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Feed raw terminal bytes through the scanner and session the way the
    /// event loop does, collecting the writes each step requests.
    fn feed(
        session: &mut Session,
        scanner: &mut InputScanner,
        bytes: &[u8],
        writes: &mut Vec<Vec<u8>>,
    ) -> Option<i32> {
        for &byte in bytes {
            let Some(input) = scanner.advance(byte) else {
                continue;
            };
            let Some(event) = input_to_event(input) else {
                continue;
            };
            let step = session.advance(event);
            writes.extend(step.writes);
            if step.exit.is_some() {
                return step.exit;
            }
        }
        None
    }

    #[test]
    fn test_input_to_event_maps_control_bytes() {
        assert_eq!(input_to_event(TermInput::Byte(CTRL_C)), Some(Event::Interrupt));
        assert_eq!(input_to_event(TermInput::Byte(CTRL_D)), Some(Event::EndOfInput));
        assert_eq!(input_to_event(TermInput::Byte(b'q')), None);
    }

    #[test]
    fn test_input_to_event_decodes_sequences() {
        let event = input_to_event(TermInput::Sequence(b"\x1b]52;c;aGk=\x07".to_vec()));
        assert_eq!(
            event,
            Some(Event::Response(Response::Clipboard {
                text: "hi".to_string(),
                from_primary: false,
            }))
        );

        let event = input_to_event(TermInput::Sequence(b"\x1b]junk\x07".to_vec()));
        assert_eq!(event, Some(Event::Response(Response::Unrecognized)));
    }

    #[test]
    fn test_read_mode_pipeline_writes_text_verbatim() {
        let mut session = Session::new(SessionConfig {
            get_clipboard: true,
            ..SessionConfig::default()
        });
        let mut scanner = InputScanner::new();
        let mut writes = Vec::new();

        let step = session.advance(Event::Start);
        assert_eq!(step.writes, vec![b"\x1b]52;c;?\x07".to_vec()]);
        assert_eq!(session.advance(Event::WriteFlushed).exit, None);

        // Terminal reply, split across two chunks, with key noise around it.
        let exit = feed(&mut session, &mut scanner, b"x\x1b]52;c;aGVs", &mut writes);
        assert_eq!(exit, None);
        let exit = feed(&mut session, &mut scanner, b"bG8=\x07", &mut writes);
        assert_eq!(exit, Some(0));

        let outcome = finish(session, 0);
        let mut out = Vec::new();
        write_clipboard_output(&outcome, &mut out).unwrap();
        assert_eq!(out, b"hello");
    }

    #[test]
    fn test_interrupt_byte_suppresses_buffered_response() {
        let mut session = Session::new(SessionConfig {
            get_clipboard: true,
            ..SessionConfig::default()
        });
        let mut scanner = InputScanner::new();
        let mut writes = Vec::new();
        session.advance(Event::Start);

        // Ctrl-C arrives ahead of an already-buffered clipboard response.
        let mut stream = vec![CTRL_C];
        stream.extend_from_slice(b"\x1b]52;c;aGVsbG8=\x07");
        let exit = feed(&mut session, &mut scanner, &stream, &mut writes);
        assert_eq!(exit, Some(1));

        let outcome = finish(session, 1);
        assert_eq!(outcome.clipboard_text, None);
        let mut out = Vec::new();
        write_clipboard_output(&outcome, &mut out).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_write_then_wait_pipeline_ends_on_capability_answer() {
        let mut session = Session::new(SessionConfig {
            payload: Some(b"copy me".to_vec()),
            wait_for_completion: true,
            ..SessionConfig::default()
        });
        let mut scanner = InputScanner::new();
        let mut writes = Vec::new();

        let step = session.advance(Event::Start);
        assert_eq!(step.writes.len(), 2);
        assert_eq!(session.advance(Event::WriteFlushed).exit, None);

        let exit = feed(
            &mut session,
            &mut scanner,
            b"\x1bP1+r544e=787465726d\x1b\\",
            &mut writes,
        );
        assert_eq!(exit, Some(0));
        assert!(writes.is_empty());
    }

    #[test]
    fn test_write_clipboard_output_skips_failures_and_empty_text() {
        let mut out = Vec::new();
        write_clipboard_output(
            &Outcome {
                exit_code: 1,
                clipboard_text: Some("partial".to_string()),
            },
            &mut out,
        )
        .unwrap();
        assert!(out.is_empty());

        write_clipboard_output(
            &Outcome {
                exit_code: 0,
                clipboard_text: Some(String::new()),
            },
            &mut out,
        )
        .unwrap();
        assert!(out.is_empty());

        write_clipboard_output(
            &Outcome {
                exit_code: 0,
                clipboard_text: None,
            },
            &mut out,
        )
        .unwrap();
        assert!(out.is_empty());
    }
}
