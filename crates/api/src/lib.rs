//! HTTP API: server, routing, and response normalization.
//!
//! Every response leaving the router goes through [`app::normalize`], which
//! renders handler outcomes and faults into one [`app::envelope::Envelope`]
//! shape.

pub mod app;
pub mod context;
pub mod middleware;
