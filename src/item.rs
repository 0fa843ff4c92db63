use crate::{
    convert::now_string,
    models::{Data, Envelope, EventData, Properties, CLOUD_ROLE, EVENT_ENVELOPE_NAME},
};

/// A buffered telemetry record.
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryItem {
    /// Loosely typed record. Wrapped into an `EventData` envelope when sent.
    Raw(RawItem),
    /// Fully shaped envelope. Sent as-is apart from filling in `iKey` and `time`.
    Shaped(Envelope),
}

/// Loosely typed telemetry record, e.g. a custom event or a tracked dependency.
#[derive(Debug, Clone, PartialEq)]
pub struct RawItem {
    /// Kind of the record: `event`, `exception`, `dependency`, `db`, ...
    pub kind: String,
    /// Optional name. The event name falls back to `kind` if this is not set.
    pub name: Option<String>,
    /// Timestamp in ISO-8601 UTC.
    pub time: Option<String>,
    /// Custom properties.
    pub properties: Properties,
}

impl From<RawItem> for TelemetryItem {
    fn from(item: RawItem) -> Self {
        TelemetryItem::Raw(item)
    }
}

impl From<Envelope> for TelemetryItem {
    fn from(envelope: Envelope) -> Self {
        TelemetryItem::Shaped(envelope)
    }
}

impl TelemetryItem {
    /// Turn the item into the envelope that goes on the wire.
    pub(crate) fn into_envelope(self, instrumentation_key: &str, role_name: Option<&str>) -> Envelope {
        let mut envelope = match self {
            TelemetryItem::Shaped(mut envelope) => {
                if envelope.i_key.as_deref().map_or(true, str::is_empty) {
                    envelope.i_key = Some(instrumentation_key.to_string());
                }
                if envelope.time.as_deref().map_or(true, str::is_empty) {
                    envelope.time = Some(now_string());
                }
                envelope
            }
            TelemetryItem::Raw(item) => {
                let name = item
                    .name
                    .filter(|name| !name.is_empty())
                    .or_else(|| Some(item.kind).filter(|kind| !kind.is_empty()))
                    .unwrap_or_else(|| "event".into());
                Envelope {
                    name: EVENT_ENVELOPE_NAME.into(),
                    time: Some(item.time.unwrap_or_else(now_string)),
                    i_key: Some(instrumentation_key.to_string()),
                    tags: None,
                    data: Data::Event(EventData {
                        ver: 2,
                        name,
                        properties: item.properties,
                    }),
                }
            }
        };

        if let Some(role_name) = role_name {
            envelope
                .tags
                .get_or_insert_with(Default::default)
                .entry(CLOUD_ROLE.to_string())
                .or_insert_with(|| role_name.to_string());
        }

        envelope
    }
}
