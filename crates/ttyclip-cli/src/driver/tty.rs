//! Controlling-terminal access for the driver.
//!
//! The clipboard conversation happens on `/dev/tty`, not stdin: stdin may be
//! a pipe carrying the payload. The terminal is switched into raw mode for
//! the lifetime of the session so responses and control bytes arrive
//! unbuffered and unechoed, and a background thread bridges the blocking
//! reads into the tokio world over a channel.

use std::fs::File;
use std::io::{Read, Write};
use std::os::unix::io::AsRawFd;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Buffer size for reading from the terminal.
const READ_BUFFER_SIZE: usize = 4096;

/// Restores the saved termios state when dropped.
struct RawModeGuard {
    fd: i32,
    saved: libc::termios,
}

impl RawModeGuard {
    /// Switch the terminal into raw mode, remembering the previous state.
    fn enable(fd: i32) -> Result<Self> {
        // SAFETY: termios is plain old data; tcgetattr only fills the struct
        // we hand it, and both calls operate on a descriptor we hold open.
        unsafe {
            let mut saved: libc::termios = std::mem::zeroed();
            if libc::tcgetattr(fd, &mut saved) != 0 {
                return Err(std::io::Error::last_os_error())
                    .context("Failed to query terminal attributes");
            }
            let mut raw = saved;
            libc::cfmakeraw(&mut raw);
            if libc::tcsetattr(fd, libc::TCSADRAIN, &raw) != 0 {
                return Err(std::io::Error::last_os_error())
                    .context("Failed to switch terminal into raw mode");
            }
            Ok(Self { fd, saved })
        }
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        // SAFETY: writes back the attribute block captured in enable() on
        // the same descriptor.
        let rc = unsafe { libc::tcsetattr(self.fd, libc::TCSADRAIN, &self.saved) };
        if rc != 0 {
            warn!("Failed to restore terminal attributes");
        }
    }
}

/// Write handle for the controlling terminal.
///
/// [`Tty::open`] hands back this handle together with the inbound byte
/// channel: a background thread performs the blocking reads and forwards
/// chunks over the channel; writes run on the blocking pool and are flushed
/// before the call returns.
pub struct Tty {
    // Declared before `writer` so raw mode is restored while the
    // descriptor is still open.
    _raw: RawModeGuard,
    writer: Arc<Mutex<File>>,
}

impl Tty {
    /// Open the controlling terminal and enter raw mode.
    ///
    /// The receiver yields input chunks as they arrive and closes when the
    /// terminal input stream does.
    pub fn open() -> Result<(Self, mpsc::Receiver<Vec<u8>>)> {
        let reader = File::options()
            .read(true)
            .write(true)
            .open("/dev/tty")
            .context("Failed to open /dev/tty (is this process attached to a terminal?)")?;
        let writer = reader
            .try_clone()
            .context("Failed to clone terminal handle")?;
        // The guard keeps the writer's descriptor: the reader handle moves
        // into the background thread and may close on EOF.
        let raw = RawModeGuard::enable(writer.as_raw_fd())?;

        let (read_tx, read_rx) = mpsc::channel::<Vec<u8>>(64);
        std::thread::spawn(move || reader_loop(reader, read_tx));

        let tty = Self {
            _raw: raw,
            writer: Arc::new(Mutex::new(writer)),
        };
        Ok((tty, read_rx))
    }

    /// Write a message to the terminal and flush it.
    ///
    /// When this returns, the bytes have been handed to the terminal driver,
    /// which is the strongest flush guarantee user space can get.
    pub async fn write(&self, data: Vec<u8>) -> Result<()> {
        let writer = self.writer.clone();
        tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            let mut file = writer
                .lock()
                .map_err(|_| std::io::Error::other("terminal writer mutex poisoned"))?;
            file.write_all(&data)?;
            file.flush()
        })
        .await
        .context("Terminal write task failed")?
        .context("Failed to write to terminal")
    }
}

/// Reader loop running in a background thread.
///
/// Exits on EOF, on a read error, or once the receiving side is gone. Not
/// joined on drop: a thread blocked in read() cannot be interrupted without
/// closing the descriptor, and it holds nothing that needs cleanup.
fn reader_loop(mut reader: File, read_tx: mpsc::Sender<Vec<u8>>) {
    let mut buf = vec![0u8; READ_BUFFER_SIZE];

    loop {
        match reader.read(&mut buf) {
            Ok(0) => {
                debug!("Terminal input EOF");
                break;
            }
            Ok(n) => {
                // Use blocking send since we're in a thread
                if read_tx.blocking_send(buf[..n].to_vec()).is_err() {
                    debug!("Terminal read channel closed");
                    break;
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!("Terminal read error: {}", e);
                break;
            }
        }
    }
}

/// Read the write payload from stdin when stdin is not an interactive
/// terminal.
///
/// The whole stream is consumed up front; the session never returns to
/// stdin once the terminal conversation has started.
pub fn read_piped_payload() -> Result<Option<Vec<u8>>> {
    // SAFETY: isatty only inspects the descriptor; stdin is always open.
    let interactive = unsafe { libc::isatty(libc::STDIN_FILENO) } == 1;
    if interactive {
        return Ok(None);
    }

    let mut data = Vec::new();
    std::io::stdin()
        .read_to_end(&mut data)
        .context("Failed to read piped input")?;
    Ok(Some(data))
}
