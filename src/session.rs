use axum::http::HeaderMap;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};

pub const SESSION_HEADER: &str = "x-session-id";

// Rate limit key when the client address is not available
pub const UNKNOWN_CLIENT: &str = "unknown";

const MAX_SESSION_ID_LEN: usize = 128;

static MINTED: AtomicU64 = AtomicU64::new(0);

// Client key - first x-forwarded-for hop, then x-real-ip, else "unknown"
pub fn client_key(headers: &HeaderMap) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty());

    let real_ip = || {
        headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
    };

    forwarded
        .or_else(real_ip)
        .unwrap_or(UNKNOWN_CLIENT)
        .to_string()
}

// Session id sent by the page, if usable
pub fn session_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty() && id.len() <= MAX_SESSION_ID_LEN)
        .map(str::to_string)
}

// New session id - hash of time, a process counter and the client key
pub fn mint_session_id(client_key: &str) -> String {
    let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let seq = MINTED.fetch_add(1, Ordering::Relaxed);

    let mut hasher = Sha256::new();
    hasher.update(nanos.to_be_bytes());
    hasher.update(seq.to_be_bytes());
    hasher.update(client_key);
    let digest = format!("{:x}", hasher.finalize());
    digest[..32].to_string()
}
