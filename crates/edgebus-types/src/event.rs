//! Event records and the typed message catalogue.
//!
//! An [`EventRecord`] is what producers emit and what delivery sinks receive.
//! Its serialized form is the wire format sent to the edge:
//!
//! ```json
//! [{ "type": "Commerce.Cart.ADD_TO_CART", "data": { "sku": "abc" } }]
//! ```

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A single emitted event: a routing key plus an arbitrary JSON payload.
///
/// Fields are private so a record cannot be mutated once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    data: serde_json::Value,
}

impl EventRecord {
    pub fn new(event_type: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            event_type: event_type.into(),
            data,
        }
    }

    /// The routing key (e.g. `"Commerce.Cart.ADD_TO_CART"`).
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// The raw JSON payload.
    pub fn data(&self) -> &serde_json::Value {
        &self.data
    }

    /// Split into `(event_type, data)`.
    pub fn into_parts(self) -> (String, serde_json::Value) {
        (self.event_type, self.data)
    }

    /// Deserialize the payload into a typed message.
    pub fn decode<M: DeserializeOwned>(&self) -> Result<M, serde_json::Error> {
        M::deserialize(&self.data)
    }
}

/// A message type with a well-known event type string and payload shape.
///
/// Emitting through `MessageBus::emit_message` keeps the type string and the
/// payload in sync at compile time.
pub trait KnownMessage: Serialize + DeserializeOwned {
    /// Event type this payload is emitted under.
    const TYPE: &'static str;
}

/// Payload of `Commerce.Cart.CHECKOUT_STARTED`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutStarted {
    pub items: Vec<CheckoutItem>,
}

/// One line item of a started checkout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutItem {
    pub product_id: String,
    pub quantity: u32,
}

impl KnownMessage for CheckoutStarted {
    const TYPE: &'static str = "Commerce.Cart.CHECKOUT_STARTED";
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_serializes_to_wire_format() {
        let record = EventRecord::new("A", json!({"n": 1}));
        let wire = serde_json::to_value(&record).unwrap();
        assert_eq!(wire, json!({"type": "A", "data": {"n": 1}}));
    }

    #[test]
    fn batch_preserves_order_on_the_wire() {
        let batch = vec![
            EventRecord::new("A", json!({"n": 1})),
            EventRecord::new("B", json!({})),
        ];
        let body = serde_json::to_string(&batch).unwrap();
        assert_eq!(body, r#"[{"type":"A","data":{"n":1}},{"type":"B","data":{}}]"#);
    }

    #[test]
    fn missing_data_deserializes_as_null() {
        let record: EventRecord = serde_json::from_str(r#"{"type":"Page.VIEW"}"#).unwrap();
        assert_eq!(record.event_type(), "Page.VIEW");
        assert!(record.data().is_null());
    }

    #[test]
    fn missing_type_is_rejected() {
        let result: Result<EventRecord, _> = serde_json::from_str(r#"{"data":{}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn checkout_started_uses_camel_case_fields() {
        let msg = CheckoutStarted {
            items: vec![CheckoutItem {
                product_id: "sku-1".to_string(),
                quantity: 2,
            }],
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value, json!({"items": [{"productId": "sku-1", "quantity": 2}]}));

        let record = EventRecord::new(CheckoutStarted::TYPE, value);
        assert_eq!(record.event_type(), "Commerce.Cart.CHECKOUT_STARTED");
        let decoded: CheckoutStarted = record.decode().unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn decode_reports_shape_mismatch() {
        let record = EventRecord::new(CheckoutStarted::TYPE, json!({"items": "nope"}));
        assert!(record.decode::<CheckoutStarted>().is_err());
    }
}
