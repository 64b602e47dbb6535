//! The review interface: serving the next candidate, recording decisions and
//! reporting per-job stats.

pub mod handlers;
