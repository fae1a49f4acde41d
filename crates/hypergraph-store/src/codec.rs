// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Dragonscale Team

//! Content codecs.
//!
//! Vertex payloads are opaque to the store; a codec keyed by the tag in
//! the binary envelope turns them into values and back. The registry is
//! write-once at startup and read-only afterwards.

use anyhow::{Result, anyhow};
use bytes::Bytes;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// A decoded vertex payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    /// Payload decoded by the default JSON codec: arbitrary opaque maps
    /// (or any other JSON value).
    Json(Value),
    /// Payload whose tag has no registered codec; raw bytes preserved so
    /// the envelope still round-trips.
    Raw { tag: String, bytes: Bytes },
}

impl Content {
    pub fn json(value: Value) -> Self {
        Content::Json(value)
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Content::Json(value) => Some(value),
            Content::Raw { .. } => None,
        }
    }

    /// The codec tag this content encodes under.
    pub fn tag(&self) -> &str {
        match self {
            Content::Json(_) => JsonCodec::TAG,
            Content::Raw { tag, .. } => tag,
        }
    }
}

pub trait Codec: Send + Sync {
    fn tag(&self) -> &str;
    fn encode(&self, content: &Content) -> Result<Bytes>;
    fn decode(&self, bytes: &[u8]) -> Result<Content>;
}

/// Default codec: serde_json, which serializes object keys in sorted
/// order and therefore encodes equal inputs identically.
pub struct JsonCodec;

impl JsonCodec {
    pub const TAG: &'static str = "json";
}

impl Codec for JsonCodec {
    fn tag(&self) -> &str {
        Self::TAG
    }

    fn encode(&self, content: &Content) -> Result<Bytes> {
        let value = content
            .as_json()
            .ok_or_else(|| anyhow!("JsonCodec cannot encode non-JSON content"))?;
        Ok(Bytes::from(serde_json::to_vec(value)?))
    }

    fn decode(&self, bytes: &[u8]) -> Result<Content> {
        Ok(Content::Json(serde_json::from_slice(bytes)?))
    }
}

/// Tag-to-codec registry shared by every reader and writer of a graph.
pub struct CodecRegistry {
    codecs: RwLock<HashMap<String, Arc<dyn Codec>>>,
}

impl CodecRegistry {
    pub fn new() -> Self {
        let registry = Self {
            codecs: RwLock::new(HashMap::new()),
        };
        registry.register(Arc::new(JsonCodec));
        registry
    }

    pub fn register(&self, codec: Arc<dyn Codec>) {
        self.codecs
            .write()
            .insert(codec.tag().to_string(), codec);
    }

    /// Encodes content to `(tag, bytes)`. Raw content with no registered
    /// codec re-emits its original bytes unchanged.
    pub fn encode(&self, content: &Content) -> Result<(String, Bytes)> {
        let tag = content.tag().to_string();
        if let Some(codec) = self.codecs.read().get(&tag) {
            return Ok((tag, codec.encode(content)?));
        }
        match content {
            Content::Raw { bytes, .. } => Ok((tag, bytes.clone())),
            Content::Json(_) => Err(anyhow!("No codec registered for tag '{}'", tag)),
        }
    }

    /// Decodes payload bytes. An unknown tag is not an error: the bytes
    /// are preserved in a [`Content::Raw`] wrapper.
    pub fn decode(&self, tag: &str, bytes: &[u8]) -> Result<Content> {
        match self.codecs.read().get(tag) {
            Some(codec) => codec.decode(bytes),
            None => Ok(Content::Raw {
                tag: tag.to_string(),
                bytes: Bytes::copy_from_slice(bytes),
            }),
        }
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_round_trip() {
        let registry = CodecRegistry::new();
        let content = Content::json(json!({"name": "foo", "size": 3}));
        let (tag, bytes) = registry.encode(&content).unwrap();
        assert_eq!(tag, "json");
        let decoded = registry.decode(&tag, &bytes).unwrap();
        assert_eq!(decoded, content);
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let registry = CodecRegistry::new();
        let a = Content::json(json!({"b": 1, "a": 2}));
        let b = Content::json(json!({"a": 2, "b": 1}));
        assert_eq!(
            registry.encode(&a).unwrap().1,
            registry.encode(&b).unwrap().1
        );
    }

    #[test]
    fn test_unknown_tag_preserves_bytes() {
        let registry = CodecRegistry::new();
        let decoded = registry.decode("cbor", b"\xa1\x61\x61\x01").unwrap();
        match &decoded {
            Content::Raw { tag, bytes } => {
                assert_eq!(tag, "cbor");
                assert_eq!(&bytes[..], b"\xa1\x61\x61\x01");
            }
            other => panic!("expected raw wrapper, got {:?}", other),
        }
        // Re-encoding a raw wrapper reproduces the original bytes.
        let (tag, bytes) = registry.encode(&decoded).unwrap();
        assert_eq!(tag, "cbor");
        assert_eq!(&bytes[..], b"\xa1\x61\x61\x01");
    }

    #[test]
    fn test_custom_codec_registration() {
        struct UpperCodec;
        impl Codec for UpperCodec {
            fn tag(&self) -> &str {
                "upper"
            }
            fn encode(&self, content: &Content) -> Result<Bytes> {
                match content {
                    Content::Raw { bytes, .. } => Ok(bytes.clone()),
                    Content::Json(_) => Err(anyhow!("not raw")),
                }
            }
            fn decode(&self, bytes: &[u8]) -> Result<Content> {
                Ok(Content::Raw {
                    tag: "upper".to_string(),
                    bytes: Bytes::from(bytes.to_ascii_uppercase()),
                })
            }
        }

        let registry = CodecRegistry::new();
        registry.register(Arc::new(UpperCodec));
        let decoded = registry.decode("upper", b"abc").unwrap();
        match decoded {
            Content::Raw { bytes, .. } => assert_eq!(&bytes[..], b"ABC"),
            other => panic!("unexpected {:?}", other),
        }
    }
}
