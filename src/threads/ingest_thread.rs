//! Ingest thread: receive → decode → evaluate → publish, strictly in arrival order.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use crate::engine::{FilterEngine, is_packet_error};
use crate::error::Result;
use crate::io::udp_receiver::{MAX_DATAGRAM_SIZE, UdpReceiver};

/// Handle to the running ingest thread.
#[derive(Debug)]
pub struct IngestThread {
    handle: JoinHandle<()>,
}

impl IngestThread {
    /// Spawn the ingest thread.
    ///
    /// The loop exits within one receive timeout of `running` being cleared.
    pub fn spawn(
        receiver: UdpReceiver,
        engine: Arc<FilterEngine>,
        running: Arc<AtomicBool>,
    ) -> Result<Self> {
        let handle = thread::Builder::new()
            .name("dhara-ingest".into())
            .spawn(move || run_ingest_loop(receiver, engine, running))?;

        Ok(Self { handle })
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for thread to finish.
    pub fn join(self) -> thread::Result<()> {
        self.handle.join()
    }
}

fn run_ingest_loop(receiver: UdpReceiver, engine: Arc<FilterEngine>, running: Arc<AtomicBool>) {
    log::info!("Ingest thread started on {}", receiver.local_addr());

    let mut buffer = vec![0u8; MAX_DATAGRAM_SIZE];

    while running.load(Ordering::Relaxed) {
        let (len, src) = match receiver.recv(&mut buffer) {
            Ok(Some(received)) => received,
            Ok(None) => continue,
            Err(e) => {
                log::error!("UDP recv error: {}", e);
                continue;
            }
        };

        match engine.process_datagram(&buffer[..len]) {
            Ok(events) => {
                for event in &events {
                    log::info!(
                        "{} {} threshold {} (from {})",
                        event.filter_id,
                        event.rule,
                        if event.new_state.is_matched() {
                            "achieved"
                        } else {
                            "cleared"
                        },
                        src
                    );
                }
            }
            Err(e) if is_packet_error(&e) => {
                log::warn!("Dropped datagram from {}: {}", src, e);
            }
            Err(e) => log::error!("Datagram from {} failed: {}", src, e),
        }
    }

    log::info!("Ingest thread stopped");
}
