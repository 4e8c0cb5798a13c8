//! # mcpki
//!
//! A Model Context Protocol gateway that lets AI agents drive a Certificate Authority
//! REST backend (EJBCA REST API) through a small set of tools.
//!
//! The gateway validates every caller value before it reaches the backend, turns the
//! backend's base64 answers into PEM, keeps the backend location out of every message
//! it returns, and maps failures onto JSON-RPC error codes.

pub mod certificate;
pub mod common;
pub mod config;
pub mod fetcher;
pub mod pem;
pub mod registry;
pub mod sanitizer;
pub mod server;
pub mod tool_error;
pub mod tools;
pub mod validation;
