//! Core data types for channels, readings and filter identity.
//!
//! Key types:
//! - [`Channel`]: one of the eight current lines `Ia`..`Ih`
//! - [`Device`]: the fixed pairing of channels onto four devices
//! - [`Reading`]: one decoded datagram worth of currents for all eight channels
//! - [`ChannelSample`]: a single-channel measurement (per-device datagram format)
//! - [`FilterId`]: unique, monotonically assigned filter identifier

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of current channels per reading.
pub const CHANNEL_COUNT: usize = 8;

/// Current measurement channel.
///
/// Channels are wired to devices in fixed pairs:
/// `{Ia, Ib}` → 1, `{Ic, Id}` → 2, `{Ie, If}` → 3, `{Ig, Ih}` → 4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Channel {
    Ia,
    Ib,
    Ic,
    Id,
    Ie,
    If,
    Ig,
    Ih,
}

impl Channel {
    /// All channels in wire order.
    pub const ALL: [Channel; CHANNEL_COUNT] = [
        Channel::Ia,
        Channel::Ib,
        Channel::Ic,
        Channel::Id,
        Channel::Ie,
        Channel::If,
        Channel::Ig,
        Channel::Ih,
    ];

    /// Position of this channel in a reading.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Channel at wire position `index`.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Channel for the lowercase letter after the `I` prefix (`'a'`..=`'h'`).
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'a'..='h' => Self::from_index(letter as usize - 'a' as usize),
            _ => None,
        }
    }

    /// Lowercase channel letter.
    pub fn letter(self) -> char {
        (b'a' + self as u8) as char
    }

    /// Device this channel belongs to.
    #[inline]
    pub const fn device(self) -> Device {
        match self {
            Channel::Ia | Channel::Ib => Device::One,
            Channel::Ic | Channel::Id => Device::Two,
            Channel::Ie | Channel::If => Device::Three,
            Channel::Ig | Channel::Ih => Device::Four,
        }
    }

    /// Channel name as used on the wire and in rules (`"Ia"`).
    pub const fn name(self) -> &'static str {
        match self {
            Channel::Ia => "Ia",
            Channel::Ib => "Ib",
            Channel::Ic => "Ic",
            Channel::Id => "Id",
            Channel::Ie => "Ie",
            Channel::If => "If",
            Channel::Ig => "Ig",
            Channel::Ih => "Ih",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        match (chars.next(), chars.next(), chars.next()) {
            (Some('I'), Some(letter), None) => Channel::from_letter(letter)
                .ok_or_else(|| format!("channel '{}' out of range Ia..Ih", s)),
            _ => Err(format!("unknown channel '{}'", s)),
        }
    }
}

/// Logical device grouping two channels. Display grouping only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Device {
    One = 1,
    Two = 2,
    Three = 3,
    Four = 4,
}

impl Device {
    /// All devices in order.
    pub const ALL: [Device; 4] = [Device::One, Device::Two, Device::Three, Device::Four];

    /// Numeric device id (1..=4).
    #[inline]
    pub const fn id(self) -> u8 {
        self as u8
    }

    /// Device for numeric id, if in range.
    pub fn from_id(id: u64) -> Option<Self> {
        match id {
            1 => Some(Device::One),
            2 => Some(Device::Two),
            3 => Some(Device::Three),
            4 => Some(Device::Four),
            _ => None,
        }
    }

    /// The two channels of this device.
    pub const fn channels(self) -> [Channel; 2] {
        match self {
            Device::One => [Channel::Ia, Channel::Ib],
            Device::Two => [Channel::Ic, Channel::Id],
            Device::Three => [Channel::Ie, Channel::If],
            Device::Four => [Channel::Ig, Channel::Ih],
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Device{}", self.id())
    }
}

/// Unique filter identifier.
///
/// Assigned from a monotonically increasing counter and never reused within
/// one engine, so ordering by id is insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterId(u64);

impl FilterId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for FilterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl FromStr for FilterId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        s.strip_prefix('#').unwrap_or(s).parse().map(FilterId)
    }
}

/// Currents for all eight channels from one datagram.
///
/// Values are unscaled amperes, always finite and non-negative.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    /// Arrival timestamp in microseconds since the UNIX epoch.
    pub timestamp_us: u64,
    /// Current per channel, indexed by [`Channel::index`].
    pub currents: [f64; CHANNEL_COUNT],
}

impl Reading {
    pub fn new(currents: [f64; CHANNEL_COUNT], timestamp_us: u64) -> Self {
        Self {
            timestamp_us,
            currents,
        }
    }

    /// Current measured on `channel`.
    #[inline]
    pub fn current(&self, channel: Channel) -> f64 {
        self.currents[channel.index()]
    }
}

/// Single-channel measurement, as sent by per-device producers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelSample {
    pub channel: Channel,
    /// Current in amperes (finite, non-negative).
    pub value: f64,
    /// Arrival timestamp in microseconds since the UNIX epoch.
    pub timestamp_us: u64,
}

/// A decoded datagram.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Measurement {
    /// Full eight-channel reading.
    Reading(Reading),
    /// One channel only; rules on other channels are not evaluated.
    Sample(ChannelSample),
}

impl Measurement {
    pub fn timestamp_us(&self) -> u64 {
        match self {
            Measurement::Reading(r) => r.timestamp_us,
            Measurement::Sample(s) => s.timestamp_us,
        }
    }

    /// Current for `channel`, if this measurement carries it.
    #[inline]
    pub fn current(&self, channel: Channel) -> Option<f64> {
        match self {
            Measurement::Reading(r) => Some(r.current(channel)),
            Measurement::Sample(s) if s.channel == channel => Some(s.value),
            Measurement::Sample(_) => None,
        }
    }
}

/// Current wall-clock time in microseconds since the UNIX epoch.
#[inline]
pub fn now_us() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_pairs() {
        assert_eq!(Channel::Ia.device(), Device::One);
        assert_eq!(Channel::Ib.device(), Device::One);
        assert_eq!(Channel::Ic.device(), Device::Two);
        assert_eq!(Channel::Id.device(), Device::Two);
        assert_eq!(Channel::Ie.device(), Device::Three);
        assert_eq!(Channel::If.device(), Device::Three);
        assert_eq!(Channel::Ig.device(), Device::Four);
        assert_eq!(Channel::Ih.device(), Device::Four);

        for device in Device::ALL {
            for channel in device.channels() {
                assert_eq!(channel.device(), device);
            }
        }
    }

    #[test]
    fn test_channel_letters() {
        for (i, channel) in Channel::ALL.iter().enumerate() {
            assert_eq!(channel.index(), i);
            assert_eq!(Channel::from_letter(channel.letter()), Some(*channel));
            assert_eq!(channel.name().parse::<Channel>(), Ok(*channel));
        }
        assert_eq!(Channel::from_letter('z'), None);
        assert!("Iz".parse::<Channel>().is_err());
        assert!("IA".parse::<Channel>().is_err());
        assert!("Iab".parse::<Channel>().is_err());
    }

    #[test]
    fn test_filter_id_parse() {
        assert_eq!("12".parse::<FilterId>(), Ok(FilterId::new(12)));
        assert_eq!("#3".parse::<FilterId>(), Ok(FilterId::new(3)));
        assert!("x".parse::<FilterId>().is_err());
        assert_eq!(FilterId::new(3).to_string(), "#3");
    }

    #[test]
    fn test_measurement_current() {
        let reading = Reading::new([1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0], 10);
        let m = Measurement::Reading(reading);
        assert_eq!(m.current(Channel::Ic), Some(3.0));

        let m = Measurement::Sample(ChannelSample {
            channel: Channel::Ig,
            value: 18.0,
            timestamp_us: 20,
        });
        assert_eq!(m.current(Channel::Ig), Some(18.0));
        assert_eq!(m.current(Channel::Ia), None);
        assert_eq!(m.timestamp_us(), 20);
    }
}
