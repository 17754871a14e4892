//! Relay wire protocol between nodes and the gateway.
//!
//! This module defines the JSON frame format exchanged over the relay
//! WebSocket. Each frame has a `type` field that determines its structure.
//!
//! # Protocol Overview
//!
//! 1. Node connects to `/relay/connect?token=<enrollment token>`
//! 2. Missing/invalid tokens close the connection before any frame exchange
//!    (see the close-code constants below)
//! 3. Node sends `hello` advertising its models and capacity
//! 4. Gateway replies with `hello_ack` carrying the (possibly
//!    server-assigned) node id
//! 5. Gateway sends `req` frames; the node answers each with exactly one
//!    `res` frame carrying the same `id`
//!
//! Requests are correlated purely by `id`; responses may arrive in any
//! order. A streaming chat variant may emit `delta` frames followed by
//! `done` instead of a single `res` - the request/response hub does not
//! consume those, they exist for out-of-band readers.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Protocol version constant.
pub const PROTOCOL_VERSION: u32 = 1;

/// Close code: first frame was not a well-formed `hello`.
pub const CLOSE_PROTOCOL_ERROR: u16 = 4400;
/// Close code: no enrollment token supplied.
pub const CLOSE_MISSING_TOKEN: u16 = 4401;
/// Close code: enrollment token invalid or expired.
pub const CLOSE_INVALID_TOKEN: u16 = 4403;

/// Operation names a node is expected to serve.
pub mod ops {
    pub const CHAT: &str = "chat";
    pub const EMBEDDINGS: &str = "embeddings";
    pub const MODELS: &str = "models";
}

/// Frames sent from node to gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeFrame {
    /// Attach request, sent once after connecting.
    Hello(Hello),
    /// Result of a dispatched call.
    Res(ResFrame),
    /// Streaming partial (extension).
    Delta { id: String, content: String },
    /// Streaming end (extension).
    Done { id: String },
}

/// Frames sent from gateway to node.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GatewayFrame {
    /// Attach confirmed; `node_id` is authoritative from here on.
    HelloAck { node_id: String },
    /// Dispatch call the node must answer with a matching `res`.
    Req(ReqFrame),
}

/// Attach payload advertising what a node can serve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hello {
    /// Stable node identifier; the gateway assigns one when omitted.
    #[serde(default)]
    pub node_id: Option<String>,
    /// Capability tags for routing.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Models the node claims to serve.
    #[serde(default)]
    pub models: Vec<String>,
    /// Concurrent-request capacity hint.
    #[serde(default = "default_capacity")]
    pub capacity: u32,
    /// Open provenance map (e.g. platform).
    #[serde(default)]
    pub meta: HashMap<String, String>,
}

fn default_capacity() -> u32 {
    1
}

/// A correlated request frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReqFrame {
    pub id: String,
    /// One of [`ops`]; unknown values are answered with `ok:false`.
    pub op: String,
    #[serde(default)]
    pub payload: Value,
}

/// The single reply to a [`ReqFrame`] with the same `id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResFrame {
    pub id: String,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResFrame {
    /// Build a successful reply.
    pub fn success(id: impl Into<String>, data: Value) -> Self {
        Self {
            id: id.into(),
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    /// Build a failed reply carrying an error message.
    pub fn failure(id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ok: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_hello_serialization() {
        let msg = NodeFrame::Hello(Hello {
            node_id: Some("node-1".to_string()),
            tags: vec!["gpu".to_string()],
            models: vec!["llama3".to_string()],
            capacity: 2,
            meta: HashMap::new(),
        });
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""type":"hello""#));
        assert!(json.contains(r#""node_id":"node-1""#));
    }

    #[test]
    fn test_hello_defaults() {
        let frame: NodeFrame = serde_json::from_str(r#"{"type":"hello"}"#).unwrap();
        match frame {
            NodeFrame::Hello(h) => {
                assert!(h.node_id.is_none());
                assert!(h.tags.is_empty());
                assert!(h.models.is_empty());
                assert_eq!(h.capacity, 1);
            }
            _ => panic!("Expected hello frame"),
        }
    }

    #[test]
    fn test_req_roundtrip() {
        let msg = GatewayFrame::Req(ReqFrame {
            id: "req-1".to_string(),
            op: ops::CHAT.to_string(),
            payload: json!({"model": "llama3"}),
        });
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""type":"req""#));

        let parsed: GatewayFrame = serde_json::from_str(&json).unwrap();
        match parsed {
            GatewayFrame::Req(req) => {
                assert_eq!(req.id, "req-1");
                assert_eq!(req.op, "chat");
                assert_eq!(req.payload["model"], "llama3");
            }
            _ => panic!("Expected req frame"),
        }
    }

    #[test]
    fn test_res_success_omits_error() {
        let res = ResFrame::success("req-1", json!({"content": "hi"}));
        let json = serde_json::to_string(&NodeFrame::Res(res)).unwrap();
        assert!(json.contains(r#""ok":true"#));
        assert!(!json.contains("error"));
    }

    #[test]
    fn test_res_failure_carries_message() {
        let res = ResFrame::failure("req-2", "unknown op: tokenize");
        assert!(!res.ok);
        assert_eq!(res.error.as_deref(), Some("unknown op: tokenize"));
        assert!(res.data.is_none());
    }

    #[test]
    fn test_hello_ack_serialization() {
        let msg = GatewayFrame::HelloAck {
            node_id: "node-1".to_string(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""type":"hello_ack""#));
    }

    #[test]
    fn test_streaming_frames_parse() {
        let delta: NodeFrame =
            serde_json::from_str(r#"{"type":"delta","id":"r","content":"tok"}"#).unwrap();
        assert!(matches!(delta, NodeFrame::Delta { .. }));

        let done: NodeFrame = serde_json::from_str(r#"{"type":"done","id":"r"}"#).unwrap();
        assert!(matches!(done, NodeFrame::Done { .. }));
    }
}
