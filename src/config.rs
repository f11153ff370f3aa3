use std::env;

use tracing::{info, warn};

pub const DEFAULT_API_PATH: &str = "/admin/opportunities";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub api_url: Option<String>,
    pub api_token: Option<String>,
    pub api_path: String,
}

impl Config {
    pub fn load() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let api_url = var("VOLUNTEER_API_URL");
        let api_token = var("VOLUNTEER_API_TOKEN");
        if api_url.is_some() && api_token.is_none() {
            warn!("VOLUNTEER_API_TOKEN not set, requests will be sent without a bearer token");
        }

        let api_path = var("VOLUNTEER_API_PATH").unwrap_or_else(|| {
            info!("VOLUNTEER_API_PATH not set, using default: {DEFAULT_API_PATH}");
            DEFAULT_API_PATH.to_string()
        });

        Self {
            api_url,
            api_token,
            api_path,
        }
    }
}
