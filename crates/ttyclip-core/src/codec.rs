//! Escape-sequence codec for the terminal clipboard protocol.
//!
//! Outgoing messages use OSC 52 for clipboard traffic and XTGETTCAP (DCS
//! `+q`) for capability queries. Encoders are pure functions returning
//! complete wire messages; [`decode_response`] turns one complete inbound
//! sequence into a [`Response`] and never fails: garbage decodes to
//! [`Response::Unrecognized`]. [`InputScanner`] splits the raw terminal
//! input stream into complete sequences and loose bytes so callers can feed
//! arbitrary read chunks.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::error::DecodeError;
use crate::protocol::{Response, Selection};

const ESC: u8 = 0x1b;
/// BEL terminates OSC sequences; ST (`ESC \`) is also accepted inbound.
const BEL: u8 = 0x07;

/// Raw payload bytes per OSC 52 write chunk.
///
/// Each chunk is base64-encoded on its own, so a chunk boundary never falls
/// inside an encoded unit and the terminal can decode chunks independently.
const WRITE_CHUNK_SIZE: usize = 512;

/// Terminfo capability queried to obtain an ordered acknowledgement.
///
/// Any capability the terminal always answers works; `TN` (terminal name) is
/// universally present. Because responses preserve send order, an answer to
/// this query means everything queued before it has been processed.
pub const ACK_CAPABILITY: &str = "TN";

/// Encode a clipboard write as a clear marker followed by payload chunks.
///
/// The leading `!` payload resets the terminal-side buffer; each subsequent
/// message appends one base64-encoded chunk to it. An empty payload produces
/// only the clear marker, which clears the clipboard.
pub fn encode_clipboard_write(payload: &[u8], selection: Selection) -> Vec<u8> {
    let code = selection.code();
    let mut out = format!("\x1b]52;{code};!\x07").into_bytes();
    for chunk in payload.chunks(WRITE_CHUNK_SIZE) {
        out.extend_from_slice(format!("\x1b]52;{code};{}\x07", STANDARD.encode(chunk)).as_bytes());
    }
    out
}

/// Encode a request for the terminal to send back clipboard contents.
pub fn encode_clipboard_read_request(selection: Selection) -> Vec<u8> {
    format!("\x1b]52;{};?\x07", selection.code()).into_bytes()
}

/// Encode an XTGETTCAP query for the named terminfo capability.
pub fn encode_capability_query(name: &str) -> Vec<u8> {
    let mut out = b"\x1bP+q".to_vec();
    for byte in name.bytes() {
        out.extend_from_slice(format!("{byte:02x}").as_bytes());
    }
    out.extend_from_slice(b"\x1b\\");
    out
}

/// Decode one complete inbound escape sequence.
///
/// Tolerant by contract: anything that is not a well-formed clipboard or
/// capability response comes back as [`Response::Unrecognized`] instead of
/// an error.
pub fn decode_response(raw: &[u8]) -> Response {
    parse_response(raw).unwrap_or(Response::Unrecognized)
}

fn parse_response(raw: &[u8]) -> Result<Response, DecodeError> {
    if let Some(body) = strip_osc(raw) {
        parse_clipboard_response(body)
    } else if let Some(body) = strip_dcs(raw) {
        parse_capability_response(body)
    } else {
        Err(DecodeError::UnknownIntroducer)
    }
}

/// Strip `ESC ]` and a BEL or ST terminator, yielding the OSC body.
fn strip_osc(raw: &[u8]) -> Option<&[u8]> {
    let body = raw.strip_prefix(b"\x1b]")?;
    body.strip_suffix(&[BEL])
        .or_else(|| body.strip_suffix(b"\x1b\\"))
}

/// Strip `ESC P` and the ST terminator, yielding the DCS body.
fn strip_dcs(raw: &[u8]) -> Option<&[u8]> {
    raw.strip_prefix(b"\x1bP")?.strip_suffix(b"\x1b\\")
}

/// Parse an OSC body of the form `52;<sel>;<base64>`.
fn parse_clipboard_response(body: &[u8]) -> Result<Response, DecodeError> {
    let body = std::str::from_utf8(body).map_err(|_| DecodeError::NotUtf8)?;
    let mut fields = body.splitn(3, ';');
    if fields.next() != Some("52") {
        return Err(DecodeError::NotClipboard);
    }
    let selection = fields.next().ok_or(DecodeError::Truncated)?;
    let data = fields.next().ok_or(DecodeError::Truncated)?;
    let bytes = STANDARD.decode(data)?;
    Ok(Response::Clipboard {
        text: String::from_utf8_lossy(&bytes).into_owned(),
        from_primary: selection.contains('p'),
    })
}

/// Parse a DCS body of the form `1+r<hex-name>=<hex-value>` or `0+r<hex-name>`.
fn parse_capability_response(body: &[u8]) -> Result<Response, DecodeError> {
    let body = std::str::from_utf8(body).map_err(|_| DecodeError::NotUtf8)?;
    let (found, rest) = if let Some(rest) = body.strip_prefix('1') {
        (true, rest)
    } else if let Some(rest) = body.strip_prefix('0') {
        (false, rest)
    } else {
        return Err(DecodeError::NotCapability);
    };
    let rest = rest.strip_prefix("+r").ok_or(DecodeError::NotCapability)?;

    if found {
        let (name, value) = match rest.split_once('=') {
            Some((name, value)) => (decode_hex(name)?, Some(decode_hex(value)?)),
            None => (decode_hex(rest)?, None),
        };
        Ok(Response::Capability { name, value })
    } else {
        Ok(Response::Capability {
            name: decode_hex(rest)?,
            value: None,
        })
    }
}

fn decode_hex(field: &str) -> Result<String, DecodeError> {
    let raw = field.as_bytes();
    if raw.len() % 2 != 0 {
        return Err(DecodeError::Hex);
    }
    let mut bytes = Vec::with_capacity(raw.len() / 2);
    for pair in raw.chunks(2) {
        let hi = hex_digit(pair[0]).ok_or(DecodeError::Hex)?;
        let lo = hex_digit(pair[1]).ok_or(DecodeError::Hex)?;
        bytes.push((hi << 4) | lo);
    }
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn hex_digit(byte: u8) -> Option<u8> {
    (byte as char).to_digit(16).map(|v| v as u8)
}

/// One unit of terminal input produced by [`InputScanner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TermInput {
    /// A complete escape sequence, introducer and terminator included.
    Sequence(Vec<u8>),
    /// A single byte outside any escape sequence (a key press or control
    /// byte).
    Byte(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Ground,
    Escape,
    Osc,
    OscEsc,
    Dcs,
    DcsEsc,
}

/// Incremental splitter for the raw terminal input stream.
///
/// Feed bytes as they arrive, in any chunking; complete items fall out one
/// at a time. Only OSC (BEL or ST terminated) and DCS (ST terminated)
/// sequences are collected; other escape sequences are swallowed and their
/// introducers never surface as loose bytes.
#[derive(Debug, Default)]
pub struct InputScanner {
    state: ScanState,
    buf: Vec<u8>,
}

impl Default for ScanState {
    fn default() -> Self {
        Self::Ground
    }
}

impl InputScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one byte, yielding a complete item when one finishes.
    pub fn advance(&mut self, byte: u8) -> Option<TermInput> {
        match self.state {
            ScanState::Ground => {
                if byte == ESC {
                    self.begin_escape();
                    None
                } else {
                    Some(TermInput::Byte(byte))
                }
            }
            ScanState::Escape => {
                self.dispatch_escape(byte);
                None
            }
            ScanState::Osc => match byte {
                BEL => Some(self.complete(byte)),
                ESC => {
                    self.buf.push(byte);
                    self.state = ScanState::OscEsc;
                    None
                }
                _ => {
                    self.buf.push(byte);
                    None
                }
            },
            ScanState::OscEsc | ScanState::DcsEsc => {
                if byte == b'\\' {
                    Some(self.complete(byte))
                } else {
                    // The sequence was abandoned mid-stream; the pending ESC
                    // starts over.
                    self.begin_escape();
                    self.dispatch_escape(byte);
                    None
                }
            }
            ScanState::Dcs => {
                if byte == ESC {
                    self.buf.push(byte);
                    self.state = ScanState::DcsEsc;
                } else {
                    self.buf.push(byte);
                }
                None
            }
        }
    }

    fn begin_escape(&mut self) {
        self.buf.clear();
        self.buf.push(ESC);
        self.state = ScanState::Escape;
    }

    fn dispatch_escape(&mut self, byte: u8) {
        match byte {
            b']' => {
                self.buf.push(byte);
                self.state = ScanState::Osc;
            }
            b'P' => {
                self.buf.push(byte);
                self.state = ScanState::Dcs;
            }
            // A stray ESC restarts the introducer.
            ESC => {}
            _ => {
                self.buf.clear();
                self.state = ScanState::Ground;
            }
        }
    }

    fn complete(&mut self, terminator: u8) -> TermInput {
        self.buf.push(terminator);
        self.state = ScanState::Ground;
        TermInput::Sequence(std::mem::take(&mut self.buf))
    }
}
