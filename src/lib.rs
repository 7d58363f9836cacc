//! Bookshelf - Library Catalog Service
//!
//! This crate implements a small HTTP service for managing an in-memory book
//! catalog. Every request passes through a per-client sliding-window rate
//! limiter before it reaches a handler.

pub mod books;
pub mod config;
pub mod error;
pub mod http;
pub mod ratelimit;
