//! Maps Assistant API Library
//!
//! This library provides the core functionality for the Maps Assistant
//! API: request validation, intent extraction against a local language
//! model, paced place-search provider calls, and the HTTP handlers that
//! orchestrate them.
//!
//! # Modules
//!
//! - `config`: Configuration management.
//! - `errors`: Error handling types and the JSON error envelope.
//! - `handlers`: HTTP request handlers and route table.
//! - `intent`: Intent extraction with deterministic keyword fallback.
//! - `llm_client`: Local language-model (Ollama) client.
//! - `maps_client`: Place-search provider client with outbound pacing.
//! - `models`: Core data models and wire types.
//! - `validation`: Request validation schemas.

pub mod config;
pub mod errors;
pub mod handlers;
pub mod intent;
pub mod llm_client;
pub mod maps_client;
pub mod models;
pub mod validation;
