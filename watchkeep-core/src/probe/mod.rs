//! Protocol liveness probes.

mod lmtp;

pub use lmtp::{check_lmtp, probe_lmtp};
