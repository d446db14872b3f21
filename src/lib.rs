//! Core library for the `blitz` HTTP load generator.
//!
//! The binary parses flags into a [`domain::run::RunConfig`], loads a
//! [`requests::RequestSet`], and hands both to [`app::RunController`], which
//! drives a dispatcher and a fixed worker pool over idle-timed HTTP/1.1
//! connections and aggregates the results into a [`metrics::Report`].
pub mod app;
pub mod args;
pub mod config;
pub mod domain;
pub mod entry;
pub mod error;
pub mod http;
pub mod logger;
pub mod metrics;
pub mod requests;
pub mod shutdown;
pub mod shutdown_handlers;
