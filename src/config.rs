use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub moderation: ModerationConfig,
    pub assistant: AssistantConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    #[serde(default = "default_access_ttl_minutes")]
    pub access_ttl_minutes: i64,
    #[serde(default = "default_refresh_ttl_days")]
    pub refresh_ttl_days: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModerationConfig {
    /// HTTP endpoint of the sentiment classifier. Empty disables screening.
    #[serde(default)]
    pub endpoint: String,
}

impl ModerationConfig {
    pub fn endpoint(&self) -> Option<&str> {
        let trimmed = self.endpoint.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssistantConfig {
    /// HTTP endpoint of the text-completion backend. Empty disables the
    /// assistant endpoints.
    #[serde(default)]
    pub endpoint: String,
}

impl AssistantConfig {
    pub fn endpoint(&self) -> Option<&str> {
        let trimmed = self.endpoint.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_max_connections() -> u32 {
    10
}

fn default_access_ttl_minutes() -> i64 {
    30
}

fn default_refresh_ttl_days() -> i64 {
    365
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::Environment::default().separator("__"))
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("database.url", "postgres://localhost/prolocate")?
            .set_default("database.max_connections", 10)?
            .set_default("jwt.secret", "development-secret-change-in-production")?
            .set_default("jwt.access_ttl_minutes", 30)?
            .set_default("jwt.refresh_ttl_days", 365)?
            .set_default("moderation.endpoint", "")?
            .set_default("assistant.endpoint", "")?
            .build()?;

        Ok(config.try_deserialize()?)
    }
}
