//! Conversion between the upstream and local dialects
//!
//! Only the payloads the proxy synthesizes or augments are converted here;
//! everything else passes through as opaque bytes.

pub mod chat;
pub mod model_list;
