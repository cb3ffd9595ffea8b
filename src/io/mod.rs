//! Network I/O: datagram decoding, the receive socket and status notifications.

pub mod decoder;
pub mod udp_notifier;
pub mod udp_receiver;

pub use decoder::{decode, decode_reading};
pub use udp_notifier::{StatusMessage, StatusNotifier};
pub use udp_receiver::{MAX_DATAGRAM_SIZE, UdpReceiver};
