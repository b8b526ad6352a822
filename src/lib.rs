// src/lib.rs

//! Conversation Compression Core: keeps a growing chat history bounded in
//! token count while preserving semantic fidelity, via a pluggable
//! retention policy and three interchangeable compression strategies
//! (sliding window, semantic summarization, hybrid).
//!
//! See [`compression`] for the full public surface.

pub mod cloudllm;

pub use cloudllm::compression;
