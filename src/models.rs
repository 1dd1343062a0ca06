use serde::{Deserialize, Serialize};

// POST /api/variant body
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct VariantRequest {
    pub experiment: String,
    // extra bucketing entropy, e.g. a persona label
    #[serde(default)]
    pub salt: Option<String>,
    // returned when the experiment is unknown or inactive
    #[serde(default)]
    pub default: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct VariantResponse {
    pub experiment: String,
    pub variant: Option<String>,
    pub session_id: String,
    pub fallback: bool,
}

// POST /api/track body
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct TrackRequest {
    pub experiment: String,
    pub event: String,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct TrackResponse {
    pub experiment: String,
    pub variant: Option<String>,
    pub counted: bool,
}

// POST /api/contact body
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct ContactRequest {
    pub name: String,
    pub email: String,
    pub message: String,
    #[serde(default)]
    pub company: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct ContactResponse {
    pub status: String,
}
