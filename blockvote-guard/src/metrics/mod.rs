pub mod counters;

use prometheus::{Encoder, TextEncoder};

/// Prometheus text exposition of everything registered so far.
pub fn gather_as_text() -> anyhow::Result<String> {
    let mut buf = Vec::new();
    TextEncoder::new().encode(&prometheus::gather(), &mut buf)?;
    Ok(String::from_utf8(buf)?)
}
