use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, Gauge, Histogram, register_counter, register_counter_vec, register_gauge,
    register_histogram,
};


lazy_static! {
    pub static ref REQUEST_TOTAL: Counter =
        register_counter!("gateway_requests_total", "Total number of requests").unwrap();
    pub static ref RATE_LIMITED_TOTAL: CounterVec = register_counter_vec!(
        "gateway_rate_limited_total",
        "Requests rejected by the rate limiter",
        &["endpoint"]
    )
    .unwrap();
    pub static ref ASSIGNMENTS_TOTAL: CounterVec = register_counter_vec!(
        "gateway_assignments_total",
        "New sticky variant assignments",
        &["experiment", "variant"]
    )
    .unwrap();
    pub static ref EVENTS_TOTAL: CounterVec = register_counter_vec!(
        "gateway_events_total",
        "Counted experiment conversion events",
        &["experiment", "event"]
    )
    .unwrap();
    pub static ref LEADS_TOTAL: Counter =
        register_counter!("gateway_leads_total", "Accepted contact form submissions").unwrap();
    pub static ref REQUEST_LATENCY: Histogram = register_histogram!(
        "gateway_request_latency_seconds",
        "Request latency in seconds"
    )
    .unwrap();
    pub static ref RATE_LIMIT_ENTRIES: Gauge =
        register_gauge!("gateway_rate_limit_entries", "Client keys tracked by the rate limiter").unwrap();
    pub static ref SESSIONS: Gauge =
        register_gauge!("gateway_sessions", "Sessions with at least one assignment").unwrap();
}
