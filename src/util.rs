use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::path::Path;
use time::{format_description, format_description::well_known::Rfc3339, OffsetDateTime};

pub fn ensure_dir(p: &Path) -> Result<()> {
    std::fs::create_dir_all(p).with_context(|| format!("create_dir_all {}", p.display()))
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut h = Sha256::new();
    h.update(bytes);
    format!("{:x}", h.finalize())
}

pub fn rfc3339(t: OffsetDateTime) -> String {
    t.format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

pub fn parse_rfc3339(s: &str) -> Result<OffsetDateTime> {
    OffsetDateTime::parse(s, &Rfc3339).with_context(|| format!("parsing RFC 3339 instant: {s}"))
}

/// Formats with a runtime `time` format description, falling back to RFC 3339
/// when the description does not parse.
pub fn format_instant(fmt: &str, t: OffsetDateTime) -> String {
    format_description::parse(fmt)
        .ok()
        .and_then(|items| t.format(&items).ok())
        .unwrap_or_else(|| rfc3339(t))
}
