//! Deterministic bucketing hash.
//!
//! `rolling_hash` is the classic `h = h * 31 + unit` polynomial over the
//! UTF-16 code units of the input, wrapping at 32 bits after every step.
//! Keeping the exact unit sequence and wrap points means a given bucketing
//! key always lands in the same bucket, across restarts and across any other
//! implementation of the same formula.

/// Number of buckets a hash is folded into.
pub const BUCKETS: u32 = 100;

/// 32-bit signed polynomial rolling hash over UTF-16 code units.
pub fn rolling_hash(input: &str) -> i32 {
    input
        .encode_utf16()
        .fold(0i32, |hash, unit| hash.wrapping_mul(31).wrapping_add(i32::from(unit)))
}

/// Fold a hash into `[0, BUCKETS)`.
///
/// Uses the magnitude of the hash, so `i32::MIN` counts as 2^31 instead of
/// overflowing.
pub fn bucket(hash: i32) -> u32 {
    hash.unsigned_abs() % BUCKETS
}

/// Bucketing key for a session, experiment and optional salt.
pub fn bucketing_key(session_id: &str, experiment: &str, salt: Option<&str>) -> String {
    let salt = salt.unwrap_or("");
    let mut key = String::with_capacity(session_id.len() + experiment.len() + salt.len());
    key.push_str(session_id);
    key.push_str(experiment);
    key.push_str(salt);
    key
}
