//! HTTP middleware stack.
//!
//! CORS configuration and the per-request trace / body logging layer.

pub mod cors;
pub mod trace;
