//! Wire messages exchanged with the embedded widget.
//!
//! Host → widget ([`Outbound`]):
//!
//! | type      | payload            |
//! |-----------|--------------------|
//! | `open`    | none               |
//! | `close`   | none               |
//! | `toggle`  | none               |
//! | `message` | `{ text: string }` |
//!
//! Widget → host ([`Inbound`]):
//!
//! | type               | payload             |
//! |--------------------|---------------------|
//! | `resize`           | `{ width, height }` |
//! | `loaded` / `ready` | none                |
//! | `open` / `close`   | none                |
//!
//! Inbound messages with any other `type` are not errors; [`Inbound::parse`]
//! simply returns `None` for them.

use serde::Serialize;
use serde_json::Value;

use crate::{Dimension, ParleyEmbedError};

/// A message posted from the host page to the embedded widget
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum Outbound {
    /// Expand the widget
    Open,
    /// Collapse the widget
    Close,
    /// Flip between expanded and collapsed
    Toggle,
    /// Send a chat message on the visitor's behalf
    Message {
        /// The message text
        text: String,
    },
}

impl Outbound {
    /// Encode as the JSON object posted across the document boundary
    pub fn to_json(&self) -> Result<String, ParleyEmbedError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// A message received from the embedded widget
#[derive(Clone, Debug, PartialEq)]
pub enum Inbound {
    /// The widget wants its transport resized
    Resize {
        /// New width, if given
        width: Option<Dimension>,
        /// New height, if given
        height: Option<Dimension>,
    },
    /// The widget document finished loading
    Loaded,
    /// The widget is ready to receive commands
    Ready,
    /// The widget expanded
    Open,
    /// The widget collapsed
    Close,
}

impl Inbound {
    /// Interpret a received message. Returns `None` for anything that is not
    /// an object with a recognised `type`.
    ///
    /// `resize` dimensions are read from `payload`, falling back to fields
    /// on the message itself.
    pub fn parse(data: &Value) -> Option<Self> {
        let kind = data.get("type")?.as_str()?;

        Some(match kind {
            "resize" => {
                let payload = data.get("payload").filter(|payload| payload.is_object());
                let dimension = |key: &str| {
                    payload
                        .and_then(|payload| payload.get(key))
                        .or_else(|| data.get(key))
                        .and_then(|value| serde_json::from_value(value.clone()).ok())
                };

                Inbound::Resize {
                    width: dimension("width"),
                    height: dimension("height"),
                }
            }
            "loaded" => Inbound::Loaded,
            "ready" => Inbound::Ready,
            "open" => Inbound::Open,
            "close" => Inbound::Close,
            _ => return None,
        })
    }

    /// Parse a message that arrived as a JSON string
    pub fn from_json(json: &str) -> Option<Self> {
        serde_json::from_str::<Value>(json)
            .ok()
            .and_then(|value| Self::parse(&value))
    }

    /// The wire name of this message
    pub fn kind(&self) -> &'static str {
        match self {
            Inbound::Resize { .. } => "resize",
            Inbound::Loaded => "loaded",
            Inbound::Ready => "ready",
            Inbound::Open => "open",
            Inbound::Close => "close",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use testresult::TestResult;

    #[test]
    fn it_encodes_commands_without_payload() -> TestResult {
        assert_eq!(Outbound::Open.to_json()?, r#"{"type":"open"}"#);
        assert_eq!(Outbound::Close.to_json()?, r#"{"type":"close"}"#);
        assert_eq!(Outbound::Toggle.to_json()?, r#"{"type":"toggle"}"#);
        Ok(())
    }

    #[test]
    fn it_encodes_chat_messages_with_a_text_payload() -> TestResult {
        let encoded = Outbound::Message {
            text: "hello \"there\"".into(),
        }
        .to_json()?;

        assert_eq!(
            serde_json::from_str::<Value>(&encoded)?,
            json!({ "type": "message", "payload": { "text": "hello \"there\"" } })
        );
        Ok(())
    }

    #[test]
    fn it_reads_resize_dimensions_from_the_payload() {
        assert_eq!(
            Inbound::parse(&json!({
                "type": "resize",
                "payload": { "width": 380, "height": "600px" }
            })),
            Some(Inbound::Resize {
                width: Some(Dimension::Pixels(380.0)),
                height: Some(Dimension::Css("600px".into())),
            })
        );
    }

    #[test]
    fn it_reads_flat_resize_dimensions() {
        assert_eq!(
            Inbound::parse(&json!({ "type": "resize", "width": 60, "height": 60 })),
            Some(Inbound::Resize {
                width: Some(Dimension::Pixels(60.0)),
                height: Some(Dimension::Pixels(60.0)),
            })
        );
        assert_eq!(
            Inbound::parse(&json!({ "type": "resize" })),
            Some(Inbound::Resize {
                width: None,
                height: None
            })
        );
    }

    #[test]
    fn it_recognises_lifecycle_messages() {
        for (kind, expected) in [
            ("loaded", Inbound::Loaded),
            ("ready", Inbound::Ready),
            ("open", Inbound::Open),
            ("close", Inbound::Close),
        ] {
            let parsed = Inbound::parse(&json!({ "type": kind }));
            assert_eq!(parsed.as_ref().map(Inbound::kind), Some(kind));
            assert_eq!(parsed, Some(expected));
        }
    }

    #[test]
    fn it_ignores_unknown_or_malformed_messages() {
        assert_eq!(Inbound::parse(&json!({ "type": "telemetry" })), None);
        assert_eq!(Inbound::parse(&json!({ "type": 3 })), None);
        assert_eq!(Inbound::parse(&json!({ "kind": "ready" })), None);
        assert_eq!(Inbound::parse(&json!("ready")), None);
        assert_eq!(Inbound::from_json("not json"), None);
        assert_eq!(
            Inbound::from_json(r#"{"type":"ready"}"#),
            Some(Inbound::Ready)
        );
    }
}
