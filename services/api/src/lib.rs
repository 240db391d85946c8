//! services/api/src/lib.rs
//!
//! The HTTP service around `math_tutor_core`: configuration, concrete port
//! adapters and the axum web layer.

pub mod adapters;
pub mod config;
pub mod error;
pub mod web;
