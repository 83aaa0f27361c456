//! # Port Discovery
//!
//! Finds the serial port a GPS receiver is attached to and learns which NMEA
//! sentence kinds it emits.
//!
//! Each candidate port is opened in turn and listened to for a fixed window.
//! Lines are only classified here, not decoded: a marker appearing anywhere in
//! the raw bytes is enough to bind its slot in the [`SentenceTypeTable`].
//! Receivers differ in which sentences they emit, so partial coverage is
//! accepted and the decoder's trust policy adapts to it.

use std::time::Duration;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};

use crate::error::{InstalogError, Result};
use crate::nmea::{SentenceKind, SentenceTypeTable};
use crate::serial::{NmeaPort, PortOpener};

/// How long each candidate port is listened to
pub const DISCOVERY_WINDOW: Duration = Duration::from_secs(3);

/// Outcome of a successful discovery
pub struct DiscoveredPort {
    /// Port the acquisition loop should read from
    pub port_name: String,

    /// Sentence kinds seen across all scanned ports
    pub sentence_types: SentenceTypeTable,

    /// Open connection to `port_name`, handed over to the acquisition loop
    pub port: Box<dyn NmeaPort>,
}

impl std::fmt::Debug for DiscoveredPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscoveredPort")
            .field("port_name", &self.port_name)
            .field("sentence_types", &self.sentence_types)
            .finish_non_exhaustive()
    }
}

/// Scan candidate ports for a GPS receiver
///
/// A port failing to open is logged and skipped. The scan stops as soon as
/// all three sentence kinds are known. The selected port is the last one on
/// which a not-yet-known kind was first seen.
///
/// # Arguments
///
/// * `opener` - Opens ports by name
/// * `candidates` - Port names to try, in order
/// * `baud_rate` - Line speed to open each port at
/// * `window` - How long to listen to each port
///
/// # Returns
///
/// * `Result<DiscoveredPort>` - The selected port, still open, and the
///   sentence-type table
///
/// # Errors
///
/// Returns `GpsNotFound` if no candidate produced a recognized sentence
pub async fn discover(
    opener: &dyn PortOpener,
    candidates: &[String],
    baud_rate: u32,
    window: Duration,
) -> Result<DiscoveredPort> {
    let mut table = SentenceTypeTable::new();
    let mut selected: Option<(String, Box<dyn NmeaPort>)> = None;

    for port_name in candidates {
        let mut port = match opener.open(port_name, baud_rate) {
            Ok(port) => port,
            Err(e) => {
                warn!("Skipping {}: {}", port_name, e);
                continue;
            }
        };

        debug!("Probing {} at {} baud", port_name, baud_rate);
        let newly_bound = listen_on_port(port.as_mut(), &mut table, window).await;
        if newly_bound > 0 {
            info!(
                "{} emits {} new sentence kind(s), table is now {}",
                port_name, newly_bound, table
            );
            selected = Some((port_name.clone(), port));
        }

        if table.is_complete() {
            break;
        }
    }

    match selected {
        Some((port_name, port)) => {
            info!("Selected GPS port {} with sentences {}", port_name, table);
            Ok(DiscoveredPort {
                port_name,
                sentence_types: table,
                port,
            })
        }
        None => Err(InstalogError::GpsNotFound(candidates.join(", "))),
    }
}

/// Listen to one port until the window elapses or the table is complete
///
/// Stops early on end of stream or a read error.
///
/// # Returns
///
/// * `usize` - Number of slots this port bound
async fn listen_on_port(
    port: &mut dyn NmeaPort,
    table: &mut SentenceTypeTable,
    window: Duration,
) -> usize {
    let deadline = Instant::now() + window;
    let mut newly_bound = 0;

    while !table.is_complete() {
        let line = match timeout_at(deadline, port.read_line()).await {
            Ok(Ok(Some(line))) => line,
            Ok(Ok(None)) => {
                debug!("Stream ended while probing");
                break;
            }
            Ok(Err(e)) => {
                warn!("Read error while probing: {}", e);
                break;
            }
            Err(_) => break,
        };

        for kind in SentenceKind::ALL {
            if contains(&line, kind.marker().as_bytes()) && table.bind(kind) {
                debug!("Found {} sentences", kind);
                newly_bound += 1;
            }
        }
    }

    newly_bound
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack
        .windows(needle.len())
        .any(|window| window == needle)
}
