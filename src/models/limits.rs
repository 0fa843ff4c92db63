use crate::models::{Data, Envelope, Properties};
use serde_json::Value;
use tracing::debug;

const ENVELOPE_NAME_MAX_LEN: usize = 1024;
const EVENT_NAME_MAX_LEN: usize = 512;
const MESSAGE_MAX_LEN: usize = 32768;
const REQUEST_NAME_MAX_LEN: usize = 1024;
const URL_MAX_LEN: usize = 2048;
const PROPERTY_KEY_MAX_LEN: usize = 150;
const PROPERTY_VALUE_MAX_LEN: usize = 8192;

/// Clamp fields to the maximum lengths the ingestion service accepts.
pub(crate) trait LimitLength {
    fn limit_length(&mut self);
}

impl LimitLength for Envelope {
    fn limit_length(&mut self) {
        truncate_chars(&mut self.name, ENVELOPE_NAME_MAX_LEN);
        match &mut self.data {
            Data::Event(data) => {
                truncate_chars(&mut data.name, EVENT_NAME_MAX_LEN);
                data.properties.limit_length();
            }
            Data::Message(data) => {
                truncate_chars(&mut data.message, MESSAGE_MAX_LEN);
                data.properties.limit_length();
            }
            Data::Request(data) => {
                truncate_chars(&mut data.name, REQUEST_NAME_MAX_LEN);
                if let Some(url) = data.url.as_mut() {
                    truncate_chars(url, URL_MAX_LEN);
                }
                data.properties.limit_length();
            }
        }
    }
}

impl LimitLength for Properties {
    fn limit_length(&mut self) {
        let long_keys: Vec<_> = self
            .keys()
            .filter(|k| k.chars().count() > PROPERTY_KEY_MAX_LEN)
            .cloned()
            .collect();
        for long_key in long_keys {
            let Some((mut key, value)) = self.remove_entry(&long_key) else {
                continue;
            };
            truncate_chars(&mut key, PROPERTY_KEY_MAX_LEN);
            if self.contains_key(&key) {
                debug!(
                    "Truncated property name overrides property with the same name: {}",
                    key
                );
            }
            self.insert(key, value);
        }
        for value in self.values_mut() {
            if let Value::String(value) = value {
                truncate_chars(value, PROPERTY_VALUE_MAX_LEN);
            }
        }
    }
}

/// Truncate to at most `max` characters without splitting a UTF-8 sequence.
fn truncate_chars(value: &mut String, max: usize) {
    if let Some((idx, _)) = value.char_indices().nth(max) {
        value.truncate(idx);
    }
}
