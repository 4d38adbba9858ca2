//! HTTP request handlers
//!
//! This module organizes all API handlers into logical groups:
//! - `api` - Health check endpoint
//! - `food` - Cart and order data for the demo profile
//! - `homepage` - Homepage layout read and reset
//! - `livekit` - LiveKit token generation and agent dispatch
//! - `openai` - OpenAI realtime key, speech and transcription proxies

pub mod api;
pub mod food;
pub mod homepage;
pub mod livekit;
pub mod openai;
