//! MQTT mirror state (spec §3, §4.5): connection status, a bounded inbox of
//! received messages, and a bounded subscription list.
//!
//! Ground: `structs.py::ModemMqttMessage` (topic, qos, payload) for the inbox
//! entry shape; `core.py`'s MQTT URC handling appends to a ring buffer rather
//! than blocking the dispatcher on a full inbox.

use heapless::{Deque, String, Vec};

use crate::config::{MQTT_INBOX_CAPACITY, MQTT_MAX_SUBSCRIPTIONS, MQTT_TOPIC_LEN as TOPIC_LEN};

const MQTT_BODY_CAPACITY: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MqttState {
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Debug, Clone)]
pub struct MqttMessage {
    pub topic: String<TOPIC_LEN>,
    pub qos: u8,
    pub payload: Vec<u8, MQTT_BODY_CAPACITY>,
}

pub struct MqttMirror {
    pub state: MqttState,
    inbox: Deque<MqttMessage, MQTT_INBOX_CAPACITY>,
    subscriptions: Vec<String<TOPIC_LEN>, MQTT_MAX_SUBSCRIPTIONS>,
}

impl MqttMirror {
    pub fn new() -> Self {
        Self {
            state: MqttState::Disconnected,
            inbox: Deque::new(),
            subscriptions: Vec::new(),
        }
    }

    /// Push a received message onto the inbox, dropping the oldest entry if
    /// it is already full (spec §4.5: mirror tables never block the
    /// dispatcher).
    pub fn push_message(&mut self, message: MqttMessage) {
        if self.inbox.is_full() {
            self.inbox.pop_front();
        }
        let _ = self.inbox.push_back(message);
    }

    pub fn pop_message(&mut self) -> Option<MqttMessage> {
        self.inbox.pop_front()
    }

    pub fn inbox_len(&self) -> usize {
        self.inbox.len()
    }

    pub fn add_subscription(&mut self, topic: String<TOPIC_LEN>) -> Result<(), String<TOPIC_LEN>> {
        self.subscriptions.push(topic)
    }

    pub fn subscriptions(&self) -> &[String<TOPIC_LEN>] {
        &self.subscriptions
    }

    pub fn reset(&mut self) {
        self.state = MqttState::Disconnected;
        self.inbox.clear();
        self.subscriptions.clear();
    }
}

impl Default for MqttMirror {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_message_drops_oldest_when_full() {
        let mut mqtt = MqttMirror::new();
        let topics = ["t0", "t1", "t2", "t3", "t4", "t5", "t6", "t7"];
        for i in 0..MQTT_INBOX_CAPACITY {
            mqtt.push_message(MqttMessage {
                topic: String::try_from(topics[i % topics.len()]).unwrap(),
                qos: 0,
                payload: Vec::new(),
            });
        }
        assert_eq!(mqtt.inbox_len(), MQTT_INBOX_CAPACITY);
        mqtt.push_message(MqttMessage {
            topic: String::try_from("overflow").unwrap(),
            qos: 1,
            payload: Vec::new(),
        });
        assert_eq!(mqtt.inbox_len(), MQTT_INBOX_CAPACITY);
        let first = mqtt.pop_message().unwrap();
        assert_ne!(first.topic.as_str(), "t0");
    }

    #[test]
    fn reset_clears_inbox_and_subscriptions() {
        let mut mqtt = MqttMirror::new();
        mqtt.add_subscription(String::try_from("topic/a").unwrap())
            .unwrap();
        mqtt.push_message(MqttMessage {
            topic: String::try_from("topic/a").unwrap(),
            qos: 0,
            payload: Vec::new(),
        });
        mqtt.state = MqttState::Connected;
        mqtt.reset();
        assert_eq!(mqtt.state, MqttState::Disconnected);
        assert_eq!(mqtt.inbox_len(), 0);
        assert!(mqtt.subscriptions().is_empty());
    }
}
