//! URL handling module
//!
//! The crawler treats URLs as opaque strings everywhere except for host
//! extraction, which keys per-host admission control.

mod domain;

pub use domain::{extract_domain, extract_host};
