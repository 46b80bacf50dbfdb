//! Value codec
//!
//! Bidirectional mapping between [`Value`](crate::value::Value)s and each
//! backend's wire representation. Encoding follows the value; decoding
//! always matches on the *declared* field kind. The relational backend's
//! marshalling is bind/decode-based and lives with that backend.

pub mod json;

#[cfg(feature = "mongo")]
pub mod bson;
