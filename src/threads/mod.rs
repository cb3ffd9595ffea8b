//! Worker threads of the monitor daemon.
//!
//! - `IngestThread`: datagram receive and evaluation (one per monitor)

mod ingest_thread;

pub use ingest_thread::IngestThread;
