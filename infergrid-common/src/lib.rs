//! Infergrid Common Types
//!
//! Shared types used by both the gateway and the node agent.

pub mod chat;
pub mod protocol;

pub use chat::ChatMessage;
pub use protocol::{
    GatewayFrame, Hello, NodeFrame, ReqFrame, ResFrame, CLOSE_INVALID_TOKEN, CLOSE_MISSING_TOKEN,
    CLOSE_PROTOCOL_ERROR, PROTOCOL_VERSION,
};
