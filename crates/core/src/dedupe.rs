//! Inbound event dedupe fingerprint
//!
//! Exact re-delivery of the same inbound event must be a no-op. The
//! fingerprint covers tenant, customer, message id, normalized text and a
//! minute bucket, so a retry lands on the same key while a genuinely new
//! message (same text, minutes later) does not.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

/// Normalize message text for fingerprinting: lowercase, collapsed
/// whitespace.
fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Compute the dedupe fingerprint for one inbound event.
pub fn fingerprint(
    tenant: &str,
    customer: &str,
    message_id: &str,
    text: &str,
    at: DateTime<Utc>,
) -> String {
    let minute_bucket = at.timestamp() / 60;
    let mut hasher = Sha256::new();
    hasher.update(tenant.as_bytes());
    hasher.update(b"\x1f");
    hasher.update(customer.as_bytes());
    hasher.update(b"\x1f");
    hasher.update(message_id.as_bytes());
    hasher.update(b"\x1f");
    hasher.update(normalize(text).as_bytes());
    hasher.update(b"\x1f");
    hasher.update(minute_bucket.to_le_bytes());
    format!("{:x}", hasher.finalize())
}
