use anyhow::Result;
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub llm: LlmConfig,
    pub scrape: ScrapeConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub gemini_api_key: String,
    pub model: String,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
}

impl LlmConfig {
    /// Returns the API key only when one is actually configured.
    pub fn active_api_key(&self) -> Option<&str> {
        if self.gemini_api_key.is_empty() {
            None
        } else {
            Some(&self.gemini_api_key)
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScrapeConfig {
    pub page_timeout_secs: u64,
    pub image_timeout_secs: u64,
    pub min_text_len: usize,
    pub max_text_len: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    pub ttl_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            server: ServerConfig {
                port: env::var("PORT")
                    .unwrap_or_else(|_| "3000".to_string())
                    .parse()?,
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                cors_allowed_origins: env::var("ALLOWED_ORIGINS")
                    .unwrap_or_else(|_| "http://localhost:3000,http://localhost:5173".to_string())
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .collect(),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL")
                    .expect("DATABASE_URL must be set"),
                max_connections: env::var("DB_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()?,
                min_connections: env::var("DB_MIN_CONNECTIONS")
                    .unwrap_or_else(|_| "1".to_string())
                    .parse()?,
            },
            llm: LlmConfig {
                gemini_api_key: env::var("GEMINI_API_KEY").unwrap_or_default(),
                model: env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-2.0-flash".to_string()),
                max_retries: env::var("LLM_MAX_RETRIES")
                    .unwrap_or_else(|_| "3".to_string())
                    .parse()?,
                retry_base_delay_ms: env::var("LLM_RETRY_BASE_DELAY_MS")
                    .unwrap_or_else(|_| "1000".to_string())
                    .parse()?,
            },
            scrape: ScrapeConfig {
                page_timeout_secs: env::var("SCRAPE_PAGE_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()?,
                image_timeout_secs: env::var("SCRAPE_IMAGE_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()?,
                min_text_len: env::var("SCRAPE_MIN_TEXT_LEN")
                    .unwrap_or_else(|_| "200".to_string())
                    .parse()?,
                max_text_len: env::var("SCRAPE_MAX_TEXT_LEN")
                    .unwrap_or_else(|_| "15000".to_string())
                    .parse()?,
            },
            cache: CacheConfig {
                ttl_secs: env::var("AGENT_CACHE_TTL_SECS")
                    .unwrap_or_else(|_| "86400".to_string())
                    .parse()?,
            },
        })
    }
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            page_timeout_secs: 10,
            image_timeout_secs: 5,
            min_text_len: 200,
            max_text_len: 15000,
        }
    }
}
