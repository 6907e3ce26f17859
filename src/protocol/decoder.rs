//! Frame decoding collaborator.
//!
//! The receive loop hands every non-empty text unit to a [`FrameDecoder`].
//! A decode failure is never fatal to the session.

// ============================================================================
// Imports
// ============================================================================

use serde_json::Value;

use crate::error::{Error, Result};

use super::frame::{Frame, FrameKind};

// ============================================================================
// FrameDecoder
// ============================================================================

/// Turns a raw text unit into a [`Frame`].
pub trait FrameDecoder: Send + Sync {
    /// Decodes one text unit.
    ///
    /// # Errors
    ///
    /// Returns an error if the unit is not a valid frame. The caller logs it
    /// and moves on to the next unit.
    fn decode(&self, raw: &str) -> Result<Frame>;
}

// ============================================================================
// JsonFrameDecoder
// ============================================================================

/// Default decoder for OneBot-style JSON frames.
///
/// | Input | Kind |
/// |-------|------|
/// | `post_type` = `message` / `message_sent` | [`FrameKind::Message`] |
/// | `post_type` = `request` | [`FrameKind::Request`] |
/// | `post_type` = `notice` | [`FrameKind::Notice`] |
/// | `post_type` = `meta_event` | [`FrameKind::Meta`] |
/// | no `post_type`, has `retcode` or `status` | [`FrameKind::Response`] |
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFrameDecoder;

impl FrameDecoder for JsonFrameDecoder {
    fn decode(&self, raw: &str) -> Result<Frame> {
        let value: Value = serde_json::from_str(raw)?;
        if !value.is_object() {
            return Err(Error::decode("frame is not a JSON object"));
        }

        let kind = match value.get("post_type").and_then(Value::as_str) {
            Some("message" | "message_sent") => FrameKind::Message,
            Some("request") => FrameKind::Request,
            Some("notice") => FrameKind::Notice,
            Some("meta_event") => FrameKind::Meta,
            Some(other) => {
                return Err(Error::decode(format!("unknown post_type: {other}")));
            }
            None if value.get("retcode").is_some() || value.get("status").is_some() => {
                FrameKind::Response
            }
            None => return Err(Error::decode("frame has neither post_type nor retcode")),
        };

        Ok(Frame::new(kind, value))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_message() {
        let frame = JsonFrameDecoder
            .decode(r#"{"post_type":"message","time":1,"message":"hi"}"#)
            .unwrap();
        assert!(frame.is_message());
        assert_eq!(frame.time(), Some(1));
    }

    #[test]
    fn test_decode_event_kinds() {
        let decoder = JsonFrameDecoder;
        assert!(decoder.decode(r#"{"post_type":"request"}"#).unwrap().is_request());
        assert!(decoder.decode(r#"{"post_type":"notice"}"#).unwrap().is_notice());
        assert!(decoder.decode(r#"{"post_type":"meta_event"}"#).unwrap().is_meta());
        assert!(decoder.decode(r#"{"post_type":"message_sent"}"#).unwrap().is_message());
    }

    #[test]
    fn test_decode_response() {
        let frame = JsonFrameDecoder
            .decode(r#"{"status":"ok","retcode":0,"data":null,"echo":"7"}"#)
            .unwrap();
        assert!(frame.is_response());
        assert_eq!(frame.echo(), Some("7"));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let decoder = JsonFrameDecoder;
        assert!(matches!(decoder.decode("not json"), Err(Error::Json(_))));
        assert!(matches!(decoder.decode("[1,2]"), Err(Error::Decode { .. })));
        assert!(matches!(decoder.decode("{}"), Err(Error::Decode { .. })));
        assert!(matches!(
            decoder.decode(r#"{"post_type":"telepathy"}"#),
            Err(Error::Decode { .. })
        ));
    }
}
