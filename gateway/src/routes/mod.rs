//! HTTP front door and admin surface.
//!
//! These routes are thin clients of the dispatch core: they decode
//! OpenAI-style bodies, call the dispatcher, and shape responses.

pub mod admin;
pub mod chat;
pub mod embeddings;
pub mod health;
pub mod models;
