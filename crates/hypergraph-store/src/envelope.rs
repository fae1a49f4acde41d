// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Dragonscale Team

//! Binary vertex envelope.
//!
//! One envelope per feed record: a varint preamble (`prev_id` first, so
//! revision chains can be indexed without decoding full records, then
//! `timestamp`), followed by the length-prefixed codec tag, the content
//! payload and the edge list. Encoding is deterministic — metadata maps
//! are sorted — and round-trips byte-exactly.

use crate::vertex::{Edge, Restriction};
use anyhow::{Result, anyhow, bail, ensure};
use bytes::{Bytes, BytesMut};
use hypergraph_common::{FeedKey, VertexId};
use std::collections::BTreeMap;

pub(crate) fn write_varint(buf: &mut BytesMut, mut v: u64) {
    loop {
        let byte = (v & 0x7f) as u8;
        v >>= 7;
        if v == 0 {
            buf.extend_from_slice(&[byte]);
            return;
        }
        buf.extend_from_slice(&[byte | 0x80]);
    }
}

pub(crate) fn read_varint(input: &mut &[u8]) -> Result<u64> {
    let mut value: u64 = 0;
    let mut shift: u32 = 0;
    loop {
        let (&byte, rest) = input
            .split_first()
            .ok_or_else(|| anyhow!("Truncated varint"))?;
        *input = rest;
        ensure!(shift < 64, "Varint overflows u64");
        let low = (byte & 0x7f) as u64;
        ensure!(
            shift != 63 || low <= 1,
            "Varint overflows u64"
        );
        value |= low << shift;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
        shift += 7;
    }
}

fn write_bytes(buf: &mut BytesMut, bytes: &[u8]) {
    write_varint(buf, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

fn read_bytes(input: &mut &[u8]) -> Result<Bytes> {
    let len = read_varint(input)? as usize;
    ensure!(input.len() >= len, "Truncated byte field");
    let (head, rest) = input.split_at(len);
    *input = rest;
    Ok(Bytes::copy_from_slice(head))
}

fn write_str(buf: &mut BytesMut, s: &str) {
    write_bytes(buf, s.as_bytes());
}

fn read_str(input: &mut &[u8]) -> Result<String> {
    let bytes = read_bytes(input)?;
    String::from_utf8(bytes.to_vec()).map_err(|e| anyhow!("Invalid UTF-8 in envelope: {}", e))
}

/// Decoded form of one feed record.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexEnvelope {
    /// Prior revision of the same vertex, if any.
    pub prev_id: Option<VertexId>,
    /// Milliseconds since epoch, stamped at persist time.
    pub timestamp: u64,
    /// Names the codec that produced `content`.
    pub codec_tag: String,
    /// Encoded payload; `None` for content-less vertices.
    pub content: Option<Bytes>,
    pub edges: Vec<Edge>,
}

impl VertexEnvelope {
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::new();
        write_varint(&mut buf, self.prev_id.map_or(0, |id| id.as_u64()));
        write_varint(&mut buf, self.timestamp);
        write_str(&mut buf, &self.codec_tag);
        match &self.content {
            Some(content) => write_bytes(&mut buf, content),
            None => write_varint(&mut buf, 0),
        }
        write_varint(&mut buf, self.edges.len() as u64);
        for edge in &self.edges {
            encode_edge(&mut buf, edge);
        }
        buf.freeze()
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut input = bytes;
        let prev_id = VertexId::from_wire(read_varint(&mut input)?);
        let timestamp = read_varint(&mut input)?;
        let codec_tag = read_str(&mut input)?;
        let content = read_bytes(&mut input)?;
        let content = if content.is_empty() {
            None
        } else {
            Some(content)
        };
        let edge_count = read_varint(&mut input)? as usize;
        let mut edges = Vec::with_capacity(edge_count);
        for _ in 0..edge_count {
            edges.push(decode_edge(&mut input)?);
        }
        ensure!(input.is_empty(), "Trailing bytes after envelope");
        Ok(Self {
            prev_id,
            timestamp,
            codec_tag,
            content,
            edges,
        })
    }
}

/// Reads only the leading `prev_id` varint of a record. Used by the
/// revision index, which must not pay full decode cost per block.
pub(crate) fn peek_prev_id(bytes: &[u8]) -> Result<u64> {
    let mut input = bytes;
    read_varint(&mut input)
}

fn encode_edge(buf: &mut BytesMut, edge: &Edge) {
    write_str(buf, &edge.label);
    write_varint(buf, edge.target.as_u64());
    match edge.feed {
        Some(feed) => write_bytes(buf, feed.as_bytes()),
        None => write_varint(buf, 0),
    }
    write_str(buf, edge.view.as_deref().unwrap_or(""));
    write_varint(buf, edge.metadata.len() as u64);
    for (key, value) in &edge.metadata {
        write_str(buf, key);
        write_bytes(buf, value);
    }
    write_varint(buf, edge.restrictions.len() as u64);
    for restriction in &edge.restrictions {
        write_str(buf, &restriction.rule);
        buf.extend_from_slice(&[restriction.exclude as u8]);
    }
    write_varint(buf, edge.version.unwrap_or(0));
}

fn decode_edge(input: &mut &[u8]) -> Result<Edge> {
    let label = read_str(input)?;
    let target = VertexId::from_wire(read_varint(input)?)
        .ok_or_else(|| anyhow!("Edge '{}' has target id 0", label))?;
    let feed_bytes = read_bytes(input)?;
    let feed = if feed_bytes.is_empty() {
        None
    } else {
        Some(FeedKey::from_slice(&feed_bytes)?)
    };
    let view = read_str(input)?;
    let view = if view.is_empty() { None } else { Some(view) };
    let metadata_count = read_varint(input)? as usize;
    let mut metadata = BTreeMap::new();
    for _ in 0..metadata_count {
        let key = read_str(input)?;
        let value = read_bytes(input)?;
        metadata.insert(key, value);
    }
    let restriction_count = read_varint(input)? as usize;
    let mut restrictions = Vec::with_capacity(restriction_count);
    for _ in 0..restriction_count {
        let rule = read_str(input)?;
        let (&flag, rest) = input
            .split_first()
            .ok_or_else(|| anyhow!("Truncated restriction flag"))?;
        *input = rest;
        let exclude = match flag {
            0 => false,
            1 => true,
            other => bail!("Invalid restriction flag {}", other),
        };
        restrictions.push(Restriction { rule, exclude });
    }
    let version = read_varint(input)?;
    let version = if version == 0 { None } else { Some(version) };
    Ok(Edge {
        label,
        target,
        feed,
        view,
        metadata,
        restrictions,
        version,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_edge() -> Edge {
        let mut metadata = BTreeMap::new();
        metadata.insert("key".to_string(), Bytes::from_static(b"\x01\x02"));
        metadata.insert("alg".to_string(), Bytes::from_static(b"xsalsa20"));
        Edge {
            label: "child".to_string(),
            target: VertexId::new(7),
            feed: Some(FeedKey::from_bytes([0xaa; 32])),
            view: Some("graph".to_string()),
            metadata,
            restrictions: vec![
                Restriction {
                    rule: "docs/**".to_string(),
                    exclude: false,
                },
                Restriction {
                    rule: "**/secret".to_string(),
                    exclude: true,
                },
            ],
            version: Some(42),
        }
    }

    #[test]
    fn test_varint_round_trip() {
        let mut buf = BytesMut::new();
        for v in [0u64, 1, 127, 128, 300, u32::MAX as u64, u64::MAX] {
            buf.clear();
            write_varint(&mut buf, v);
            let mut input = &buf[..];
            assert_eq!(read_varint(&mut input).unwrap(), v);
            assert!(input.is_empty());
        }
    }

    #[test]
    fn test_varint_rejects_overflow() {
        // 11 continuation bytes encode more than 64 bits.
        let bad = [0xffu8; 11];
        let mut input = &bad[..];
        assert!(read_varint(&mut input).is_err());
    }

    #[test]
    fn test_envelope_round_trip() {
        let envelope = VertexEnvelope {
            prev_id: Some(VertexId::new(3)),
            timestamp: 1_700_000_000_123,
            codec_tag: "json".to_string(),
            content: Some(Bytes::from_static(b"{\"name\":\"foo\"}")),
            edges: vec![
                sample_edge(),
                Edge {
                    label: "parent".to_string(),
                    target: VertexId::new(1),
                    feed: None,
                    view: None,
                    metadata: BTreeMap::new(),
                    restrictions: Vec::new(),
                    version: None,
                },
            ],
        };
        let bytes = envelope.encode();
        let decoded = VertexEnvelope::decode(&bytes).unwrap();
        assert_eq!(decoded, envelope);
        // Canonical: re-encoding reproduces the exact bytes.
        assert_eq!(decoded.encode(), bytes);
    }

    #[test]
    fn test_minimal_envelope() {
        let envelope = VertexEnvelope {
            prev_id: None,
            timestamp: 0,
            codec_tag: String::new(),
            content: None,
            edges: Vec::new(),
        };
        let bytes = envelope.encode();
        assert_eq!(bytes.len(), 5);
        let decoded = VertexEnvelope::decode(&bytes).unwrap();
        assert_eq!(decoded, envelope);
    }

    #[test]
    fn test_peek_prev_id_matches_decode() {
        let envelope = VertexEnvelope {
            prev_id: Some(VertexId::new(300)),
            timestamp: 5,
            codec_tag: "json".to_string(),
            content: None,
            edges: Vec::new(),
        };
        let bytes = envelope.encode();
        assert_eq!(peek_prev_id(&bytes).unwrap(), 300);
    }

    #[test]
    fn test_decode_rejects_trailing_bytes() {
        let envelope = VertexEnvelope {
            prev_id: None,
            timestamp: 1,
            codec_tag: "json".to_string(),
            content: None,
            edges: Vec::new(),
        };
        let mut bytes = envelope.encode().to_vec();
        bytes.push(0x00);
        assert!(VertexEnvelope::decode(&bytes).is_err());
    }

    #[test]
    fn test_decode_rejects_zero_edge_target() {
        let mut buf = BytesMut::new();
        write_varint(&mut buf, 0); // prev
        write_varint(&mut buf, 1); // timestamp
        write_str(&mut buf, "json");
        write_varint(&mut buf, 0); // no content
        write_varint(&mut buf, 1); // one edge
        write_str(&mut buf, "child");
        write_varint(&mut buf, 0); // target 0: invalid
        assert!(VertexEnvelope::decode(&buf).is_err());
    }
}
