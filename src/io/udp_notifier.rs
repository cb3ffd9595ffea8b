//! Best-effort UDP status notifications.
//!
//! Sends one JSON datagram per filter state transition to the configured
//! broadcast destination. The socket is non-blocking: a full send buffer
//! drops the notification instead of stalling the ingest thread.
//!
//! # Wire Format
//!
//! ```text
//! {"id": 3, "device": 1, "channel": "Ia", "filter": "Ia > 5",
//!  "threshold_achieved": true, "timestamp_us": 1700000000000000}
//! ```

use serde::Serialize;
use std::io::ErrorKind;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::NotifyConfig;
use crate::core::types::Channel;
use crate::error::{Error, Result};
use crate::state::publisher::TransitionEvent;

/// Status message sent on every transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusMessage {
    /// Filter id
    pub id: u64,
    /// Device number (1..=4) of the filter's channel
    pub device: u8,
    pub channel: Channel,
    /// Canonical rule text
    pub filter: String,
    pub threshold_achieved: bool,
    /// Timestamp of the reading that caused the transition
    pub timestamp_us: u64,
}

impl From<&TransitionEvent> for StatusMessage {
    fn from(event: &TransitionEvent) -> Self {
        Self {
            id: event.filter_id.get(),
            device: event.rule.channel.device().id(),
            channel: event.rule.channel,
            filter: event.rule.to_string(),
            threshold_achieved: event.new_state.is_matched(),
            timestamp_us: event.reading_timestamp_us,
        }
    }
}

/// Outbound notifier with send counters.
#[derive(Debug)]
pub struct StatusNotifier {
    socket: UdpSocket,
    target: SocketAddr,
    sent: AtomicU64,
    failed: AtomicU64,
}

impl StatusNotifier {
    /// Bind the sending socket and resolve the destination.
    pub fn new(config: &NotifyConfig) -> Result<Self> {
        let bind_addr = format!("{}:0", config.bind_address);
        let socket = UdpSocket::bind(&bind_addr).map_err(|e| Error::network(&bind_addr, e))?;
        socket
            .set_broadcast(true)
            .map_err(|e| Error::network(&bind_addr, e))?;
        socket
            .set_nonblocking(true)
            .map_err(|e| Error::network(&bind_addr, e))?;

        let target_addr = config.target_address();
        let target = target_addr
            .to_socket_addrs()
            .map_err(|e| Error::network(&target_addr, e))?
            .next()
            .ok_or_else(|| Error::Other(format!("cannot resolve {}", target_addr)))?;

        log::info!("Status notifications to {}", target);

        Ok(Self {
            socket,
            target,
            sent: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        })
    }

    /// Send the status message for `event`.
    pub fn notify(&self, event: &TransitionEvent) -> Result<()> {
        let message = StatusMessage::from(event);
        let payload = match serde_json::to_vec(&message) {
            Ok(p) => p,
            Err(e) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                return Err(e.into());
            }
        };

        match self.socket.send_to(&payload, self.target) {
            Ok(_) => {
                self.sent.fetch_add(1, Ordering::Relaxed);
                log::trace!("Sent status for {} to {}", event.filter_id, self.target);
                Ok(())
            }
            Err(e) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                if e.kind() == ErrorKind::WouldBlock {
                    log::debug!("Send buffer full, status for {} dropped", event.filter_id);
                }
                Err(Error::network(self.target.to_string(), e))
            }
        }
    }

    /// Notifications sent successfully.
    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    /// Notifications that could not be sent.
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rule::{FilterRule, RuleSpec};
    use crate::core::types::FilterId;
    use crate::state::publisher::MatchState;
    use std::time::Duration;

    fn event() -> TransitionEvent {
        let id = FilterId::new(3);
        TransitionEvent {
            filter_id: id,
            rule: FilterRule::new(id, RuleSpec::parse("Id<12").unwrap()),
            old_state: MatchState::Unmatched,
            new_state: MatchState::Matched,
            reading_timestamp_us: 99,
        }
    }

    #[test]
    fn test_status_message_json() {
        let json = serde_json::to_value(StatusMessage::from(&event())).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": 3,
                "device": 2,
                "channel": "Id",
                "filter": "Id < 12",
                "threshold_achieved": true,
                "timestamp_us": 99,
            })
        );
    }

    #[test]
    fn test_notify_loopback() {
        let listener = UdpSocket::bind("127.0.0.1:0").unwrap();
        listener
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();

        let config = NotifyConfig {
            enabled: true,
            broadcast_address: "127.0.0.1".to_string(),
            send_port: listener.local_addr().unwrap().port(),
            bind_address: "127.0.0.1".to_string(),
        };
        let notifier = StatusNotifier::new(&config).unwrap();
        notifier.notify(&event()).unwrap();
        assert_eq!(notifier.sent(), 1);
        assert_eq!(notifier.failed(), 0);

        let mut buffer = [0u8; 512];
        let (len, _) = listener.recv_from(&mut buffer).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&buffer[..len]).unwrap();
        assert_eq!(json["filter"], "Id < 12");
        assert_eq!(json["threshold_achieved"], true);
    }

    #[test]
    fn test_unresolvable_target() {
        let config = NotifyConfig {
            broadcast_address: "not an address".to_string(),
            bind_address: "127.0.0.1".to_string(),
            ..NotifyConfig::default()
        };
        assert!(StatusNotifier::new(&config).is_err());
    }
}
