//! Trait abstraction for serial port operations to enable testing

use async_trait::async_trait;
use std::io;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::debug;

use crate::error::Result;

/// Trait for line-oriented reads from an NMEA source
#[async_trait]
pub trait NmeaPort: Send {
    /// Read the next line, including its terminator if one arrived.
    ///
    /// Returns `Ok(None)` once the stream has ended. Bytes are returned raw;
    /// receivers occasionally emit non-UTF-8 noise.
    async fn read_line(&mut self) -> io::Result<Option<Vec<u8>>>;
}

/// Opens NMEA ports by name
pub trait PortOpener: Send + Sync {
    /// Open `port_name` at `baud_rate`
    fn open(&self, port_name: &str, baud_rate: u32) -> Result<Box<dyn NmeaPort>>;
}

/// Longest partial line kept between reads; NMEA sentences are at most 82 bytes
pub const MAX_LINE_BYTES: usize = 1024;

/// Line reader over a serial stream that implements NmeaPort
///
/// Generic over the stream so any `AsyncRead` can stand in for the port.
pub struct TokioSerialPort<S = tokio_serial::SerialStream> {
    reader: BufReader<S>,
    port_name: String,
    /// Bytes of a line whose read was interrupted by a timeout
    pending: Vec<u8>,
}

impl<S> std::fmt::Debug for TokioSerialPort<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokioSerialPort")
            .field("port_name", &self.port_name)
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}

impl<S: AsyncRead + Unpin + Send> TokioSerialPort<S> {
    pub fn new(port: S, port_name: &str) -> Self {
        Self {
            reader: BufReader::new(port),
            port_name: port_name.to_string(),
            pending: Vec::new(),
        }
    }
}

#[async_trait]
impl<S: AsyncRead + Unpin + Send> NmeaPort for TokioSerialPort<S> {
    async fn read_line(&mut self) -> io::Result<Option<Vec<u8>>> {
        // Bytes move from the BufReader into `pending` before they are
        // consumed, so a read cancelled by a timeout resumes the same line
        loop {
            let available = self.reader.fill_buf().await?;
            if available.is_empty() {
                if self.pending.is_empty() {
                    return Ok(None);
                }
                return Ok(Some(std::mem::take(&mut self.pending)));
            }

            let (chunk, complete) = match available.iter().position(|&b| b == b'\n') {
                Some(end) => (&available[..=end], true),
                None => (available, false),
            };
            self.pending.extend_from_slice(chunk);
            let used = chunk.len();
            self.reader.consume(used);

            if self.pending.len() > MAX_LINE_BYTES {
                debug!(
                    "Discarding {} bytes without a line break from {}",
                    self.pending.len(),
                    self.port_name
                );
                self.pending.clear();
                continue;
            }
            if complete {
                return Ok(Some(std::mem::take(&mut self.pending)));
            }
        }
    }
}

#[cfg(test)]
pub mod mocks {
    use super::*;
    use crate::error::InstalogError;
    use std::collections::{HashMap, VecDeque};
    use std::sync::{Arc, Mutex};

    /// One scripted event on a mock port
    #[derive(Debug, Clone)]
    pub enum Script {
        /// Deliver a line
        Line(String),
        /// Stay silent until the reader gives up
        Silence,
        /// Fail the read
        Error(io::ErrorKind),
        /// End the stream
        Eof,
    }

    impl Script {
        pub fn lines(lines: &[&str]) -> Vec<Script> {
            lines.iter().map(|line| Script::Line(format!("{}\r\n", line))).collect()
        }
    }

    /// Mock serial port that plays back a script, then stays silent
    pub struct MockNmeaPort {
        script: VecDeque<Script>,
        pub reads: Arc<Mutex<usize>>,
    }

    impl MockNmeaPort {
        pub fn new(script: Vec<Script>) -> Self {
            Self {
                script: script.into(),
                reads: Arc::new(Mutex::new(0)),
            }
        }
    }

    #[async_trait]
    impl NmeaPort for MockNmeaPort {
        async fn read_line(&mut self) -> io::Result<Option<Vec<u8>>> {
            *self.reads.lock().unwrap() += 1;
            match self.script.pop_front() {
                Some(Script::Line(line)) => Ok(Some(line.into_bytes())),
                Some(Script::Error(kind)) => Err(io::Error::new(kind, "Mock read error")),
                Some(Script::Eof) => Ok(None),
                Some(Script::Silence) | None => std::future::pending().await,
            }
        }
    }

    /// Mock opener with one script queue per port name.
    ///
    /// Each `open` pops the next script for that port; unknown ports fail to
    /// open, and a port whose queue is exhausted opens silent.
    #[derive(Clone, Default)]
    pub struct MockPortOpener {
        scripts: Arc<Mutex<HashMap<String, VecDeque<Vec<Script>>>>>,
        pub opened: Arc<Mutex<Vec<String>>>,
    }

    impl MockPortOpener {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_port(self, port_name: &str, script: Vec<Script>) -> Self {
            self.scripts
                .lock()
                .unwrap()
                .entry(port_name.to_string())
                .or_default()
                .push_back(script);
            self
        }

        pub fn get_opened(&self) -> Vec<String> {
            self.opened.lock().unwrap().clone()
        }
    }

    impl PortOpener for MockPortOpener {
        fn open(&self, port_name: &str, _baud_rate: u32) -> Result<Box<dyn NmeaPort>> {
            let mut scripts = self.scripts.lock().unwrap();
            let queue = scripts.get_mut(port_name).ok_or_else(|| {
                InstalogError::Serial(format!("Failed to open {}: mock port missing", port_name))
            })?;
            self.opened.lock().unwrap().push(port_name.to_string());
            let script = queue.pop_front().unwrap_or_default();
            Ok(Box::new(MockNmeaPort::new(script)))
        }
    }
}
