//! Runtime settings, read from the environment at startup.

use std::env;

#[derive(Debug, Clone)]
pub struct Settings {
    /// Backend host for the ingestion API.
    pub backend_host: String,
    pub backend_port: u16,
    /// Path prefix of the ingestion routes.
    pub base_path: String,
    /// Ask the backend to drop records not seen in this run.
    pub garbage_collect: bool,
    /// Opaque value for the IngestAuthorization header.
    pub ingest_token: String,
}

impl Settings {
    pub fn from_env() -> Self {
        Self {
            backend_host: env::var("TARGET").unwrap_or_else(|_| "api-server".to_string()),
            backend_port: env::var("TARGET_PORT")
                .ok()
                .and_then(|port| port.parse().ok())
                .unwrap_or(8000),
            base_path: env::var("BASE_PATH").unwrap_or_else(|_| "/api/v1/ingest".to_string()),
            garbage_collect: env::var("GARBAGE_COLLECT")
                .map(|flag| flag.to_lowercase() == "true")
                .unwrap_or(true),
            ingest_token: env::var("INGEST_TOKEN").unwrap_or_default(),
        }
    }
}
