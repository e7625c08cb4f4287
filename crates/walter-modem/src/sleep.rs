//! Deep-sleep persistence codec (spec §6 "Persisted state across deep
//! sleep", §9 design note).
//!
//! Ground: `original_source/walter_modem/mixins/mqtt.py`'s
//! `__mqtt_deep_sleep_prepare`/`__mqtt_deep_sleep_wake` — a one-byte flag
//! (subscriptions present/absent) followed by, per subscription, a 4-byte
//! little-endian length, the topic bytes, and a 1-byte QoS. The codec here
//! only encodes/decodes the blob; the actual retained-memory read/write is
//! the board-supplied [`RetainedMemory`](crate::hal::RetainedMemory) HAL
//! trait, since the retention mechanism (RTC memory, battery-backed SRAM,
//! a flash page) is board-specific.

use heapless::{String, Vec};

use crate::config::{MQTT_MAX_SUBSCRIPTIONS, MQTT_TOPIC_LEN, RETAINED_BLOB_CAPACITY};
use crate::error::WalterError;

/// One subscription entry as recovered from a retained-memory blob.
#[derive(Debug, Clone)]
pub struct RetainedSubscription {
    pub topic: String<MQTT_TOPIC_LEN>,
    pub qos: u8,
}

/// Encode `subscriptions` into the retained-memory wire format. An empty
/// slice encodes as a single `0` flag byte, matching `persist_mqtt_subs =
/// false` in the original (`struct.pack('B', 0)`).
pub fn encode_retained(
    subscriptions: &[(&str, u8)],
) -> Result<Vec<u8, RETAINED_BLOB_CAPACITY>, WalterError> {
    let mut buf: Vec<u8, RETAINED_BLOB_CAPACITY> = Vec::new();
    if subscriptions.is_empty() {
        buf.push(0).map_err(|_| WalterError::BufferFull)?;
        return Ok(buf);
    }

    buf.push(1).map_err(|_| WalterError::BufferFull)?;
    for (topic, qos) in subscriptions {
        let topic_bytes = topic.as_bytes();
        buf.extend_from_slice(&(topic_bytes.len() as u32).to_le_bytes())
            .map_err(|_| WalterError::BufferFull)?;
        buf.extend_from_slice(topic_bytes)
            .map_err(|_| WalterError::BufferFull)?;
        buf.push(*qos).map_err(|_| WalterError::BufferFull)?;
    }
    Ok(buf)
}

/// Decode a retained-memory blob back into a subscription list.
///
/// Rejects blobs whose declared entry length exceeds the bytes remaining
/// (spec §9: "reject blobs whose declared lengths exceed the blob's
/// remaining size") rather than reading out of bounds. An empty or all-zero
/// blob (cold boot, or `persist_mqtt_subs = false`) decodes to an empty list.
pub fn decode_retained(
    data: &[u8],
) -> Result<Vec<RetainedSubscription, MQTT_MAX_SUBSCRIPTIONS>, WalterError> {
    let mut out = Vec::new();
    let Some((&flag, mut rest)) = data.split_first() else {
        return Ok(out);
    };
    if flag == 0 {
        return Ok(out);
    }

    while !rest.is_empty() {
        if rest.len() < 4 {
            return Err(WalterError::InvalidRetainedState);
        }
        let (len_bytes, after_len) = rest.split_at(4);
        let len = u32::from_le_bytes(len_bytes.try_into().unwrap()) as usize;
        if len.saturating_add(1) > after_len.len() {
            return Err(WalterError::InvalidRetainedState);
        }

        let (topic_bytes, after_topic) = after_len.split_at(len);
        let (&qos, remainder) = after_topic.split_first().ok_or(WalterError::InvalidRetainedState)?;
        let topic = core::str::from_utf8(topic_bytes).map_err(|_| WalterError::InvalidRetainedState)?;
        out.push(RetainedSubscription {
            topic: String::try_from(topic).map_err(|_| WalterError::InvalidRetainedState)?,
            qos,
        })
        .map_err(|_| WalterError::InvalidRetainedState)?;

        rest = remainder;
    }

    Ok(out)
}
