//! Error types, re-exported from the gf-error crate

pub use gf_error::{GpufanError, Result};
