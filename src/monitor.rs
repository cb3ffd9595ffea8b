//! Monitor runtime: sockets, engine and ingest thread as one owned instance.
//!
//! ```no_run
//! use dhara::{Config, Monitor};
//!
//! let mut monitor = Monitor::start(&Config::default())?;
//! let events = monitor.subscribe();
//! monitor.engine().add_filter_str("Ia > 5")?;
//!
//! for event in events.iter().take(1) {
//!     println!("{} -> {:?}", event.rule, event.new_state);
//! }
//! monitor.shutdown();
//! # Ok::<(), dhara::Error>(())
//! ```

use crossbeam_channel::Receiver;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::Config;
use crate::engine::FilterEngine;
use crate::error::Result;
use crate::io::udp_notifier::StatusNotifier;
use crate::io::udp_receiver::UdpReceiver;
use crate::state::publisher::TransitionEvent;
use crate::threads::IngestThread;

/// Running threshold monitor.
#[derive(Debug)]
pub struct Monitor {
    engine: Arc<FilterEngine>,
    running: Arc<AtomicBool>,
    ingest: Option<IngestThread>,
    local_addr: SocketAddr,
}

impl Monitor {
    /// Bind sockets, install startup filters and spawn the ingest thread.
    ///
    /// A receive socket that cannot be bound is fatal. A notifier that cannot
    /// be set up is logged and notifications are disabled.
    pub fn start(config: &Config) -> Result<Self> {
        let receiver = UdpReceiver::bind(&config.network)?;
        let local_addr = receiver.local_addr();

        let notifier = if config.notify.enabled {
            match StatusNotifier::new(&config.notify) {
                Ok(n) => Some(n),
                Err(e) => {
                    log::warn!("Status notifications disabled: {}", e);
                    None
                }
            }
        } else {
            None
        };

        let engine = Arc::new(FilterEngine::new(
            notifier,
            config.events.channel_capacity,
        ));
        engine.install_filters(&config.filters)?;

        let running = Arc::new(AtomicBool::new(true));
        let ingest = IngestThread::spawn(receiver, Arc::clone(&engine), Arc::clone(&running))?;

        log::info!(
            "Monitor started on {} with {} filter(s)",
            local_addr,
            engine.filter_count()
        );

        Ok(Self {
            engine,
            running,
            ingest: Some(ingest),
            local_addr,
        })
    }

    /// Shared engine handle for presentation-layer operations.
    pub fn engine(&self) -> &Arc<FilterEngine> {
        &self.engine
    }

    /// Subscribe to transition events.
    pub fn subscribe(&self) -> Receiver<TransitionEvent> {
        self.engine.subscribe()
    }

    /// Bound receive address.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Whether the ingest thread is still running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
            && self.ingest.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop ingestion and wait for the ingest thread. Idempotent.
    pub fn shutdown(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(ingest) = self.ingest.take() {
            if ingest.join().is_err() {
                log::error!("Ingest thread panicked");
            }
            log::info!("Monitor on {} stopped", self.local_addr);
        }
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        self.shutdown();
    }
}
