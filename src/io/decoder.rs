//! Datagram decoder for current readings.
//!
//! Pure and stateless: bytes in, [`Measurement`] out. Failures are reported
//! as [`Error::MalformedPacket`]; the caller logs and drops them.
//!
//! # Accepted Payloads
//!
//! ```text
//! 10,0,3.5,8,13,12,18,19          delimited record, channel order Ia..Ih
//! 10;0;3.5;8;13;12;18;19          (',' or ';' or whitespace separated)
//! [10, 0, 3.5, 8, 13, 12, 18, 19] JSON array, channel order Ia..Ih
//! {"Ia": 10, "Ib": 0, ... "Ih": 19}
//! {"id": 1, "device": "Ia", "measurement[A]": 4}   single channel sample
//! ```
//!
//! Every value must be a finite, non-negative number of amperes.

use serde::Deserialize;
use std::collections::BTreeMap;

use crate::core::types::{CHANNEL_COUNT, Channel, ChannelSample, Device, Measurement, Reading};
use crate::error::{Error, Result};

/// Per-device datagram: one channel, tagged with its device id.
#[derive(Debug, Deserialize)]
struct DeviceSample {
    #[serde(default)]
    id: Option<u64>,
    device: String,
    #[serde(rename = "measurement[A]")]
    measurement: f64,
}

/// Decode a raw datagram received at `timestamp_us`.
pub fn decode(payload: &[u8], timestamp_us: u64) -> Result<Measurement> {
    let text = std::str::from_utf8(payload)
        .map_err(|e| Error::MalformedPacket(format!("payload is not UTF-8: {}", e)))?
        .trim();

    if text.is_empty() {
        return Err(Error::MalformedPacket("empty payload".to_string()));
    }

    match text.as_bytes()[0] {
        b'[' => decode_json_array(text, timestamp_us).map(Measurement::Reading),
        b'{' => decode_json_object(text, timestamp_us),
        _ => decode_delimited(text, timestamp_us).map(Measurement::Reading),
    }
}

/// Decode a payload that must be a full eight-channel reading.
pub fn decode_reading(payload: &[u8], timestamp_us: u64) -> Result<Reading> {
    match decode(payload, timestamp_us)? {
        Measurement::Reading(reading) => Ok(reading),
        Measurement::Sample(sample) => Err(Error::MalformedPacket(format!(
            "expected {} channels, got a single {} sample",
            CHANNEL_COUNT, sample.channel
        ))),
    }
}

fn decode_delimited(text: &str, timestamp_us: u64) -> Result<Reading> {
    let fields: Vec<&str> = if text.contains([',', ';']) {
        text.split([',', ';']).map(str::trim).collect()
    } else {
        text.split_whitespace().collect()
    };

    if fields.len() != CHANNEL_COUNT {
        return Err(Error::MalformedPacket(format!(
            "expected {} fields, got {}",
            CHANNEL_COUNT,
            fields.len()
        )));
    }

    let mut currents = [0.0; CHANNEL_COUNT];
    for (channel, (slot, field)) in Channel::ALL.iter().zip(currents.iter_mut().zip(fields)) {
        let value: f64 = field.parse().map_err(|_| {
            Error::MalformedPacket(format!("{}: '{}' is not a number", channel, field))
        })?;
        *slot = check_current(*channel, value)?;
    }

    Ok(Reading::new(currents, timestamp_us))
}

fn decode_json_array(text: &str, timestamp_us: u64) -> Result<Reading> {
    let values: Vec<f64> = serde_json::from_str(text)
        .map_err(|e| Error::MalformedPacket(format!("invalid JSON array: {}", e)))?;

    if values.len() != CHANNEL_COUNT {
        return Err(Error::MalformedPacket(format!(
            "expected {} values, got {}",
            CHANNEL_COUNT,
            values.len()
        )));
    }

    let mut currents = [0.0; CHANNEL_COUNT];
    for (channel, value) in Channel::ALL.iter().zip(values) {
        currents[channel.index()] = check_current(*channel, value)?;
    }

    Ok(Reading::new(currents, timestamp_us))
}

fn decode_json_object(text: &str, timestamp_us: u64) -> Result<Measurement> {
    let value: serde_json::Value = serde_json::from_str(text)
        .map_err(|e| Error::MalformedPacket(format!("invalid JSON: {}", e)))?;

    if value.get("measurement[A]").is_some() {
        return decode_device_sample(value, timestamp_us).map(Measurement::Sample);
    }

    let map: BTreeMap<String, f64> = serde_json::from_value(value)
        .map_err(|e| Error::MalformedPacket(format!("invalid channel map: {}", e)))?;

    if map.len() != CHANNEL_COUNT {
        return Err(Error::MalformedPacket(format!(
            "expected {} channels, got {}",
            CHANNEL_COUNT,
            map.len()
        )));
    }

    let mut currents = [0.0; CHANNEL_COUNT];
    for channel in Channel::ALL {
        let value = map
            .get(channel.name())
            .copied()
            .ok_or_else(|| Error::MalformedPacket(format!("missing channel {}", channel)))?;
        currents[channel.index()] = check_current(channel, value)?;
    }

    Ok(Measurement::Reading(Reading::new(currents, timestamp_us)))
}

fn decode_device_sample(value: serde_json::Value, timestamp_us: u64) -> Result<ChannelSample> {
    let sample: DeviceSample = serde_json::from_value(value)
        .map_err(|e| Error::MalformedPacket(format!("invalid device sample: {}", e)))?;

    let channel: Channel = sample
        .device
        .parse()
        .map_err(|e: String| Error::MalformedPacket(e))?;

    if let Some(id) = sample.id {
        let expected = channel.device();
        if Device::from_id(id) != Some(expected) {
            return Err(Error::MalformedPacket(format!(
                "device id {} does not match channel {} ({})",
                id, channel, expected
            )));
        }
    }

    Ok(ChannelSample {
        channel,
        value: check_current(channel, sample.measurement)?,
        timestamp_us,
    })
}

fn check_current(channel: Channel, value: f64) -> Result<f64> {
    if !value.is_finite() || value < 0.0 {
        return Err(Error::MalformedPacket(format!(
            "{}: {} is not a valid current",
            channel, value
        )));
    }
    Ok(value)
}
