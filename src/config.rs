use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub discord: DiscordConfig,
    #[serde(default = "default_server_config")]
    pub server: ServerConfig,
    #[serde(default = "default_http_config")]
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DiscordConfig {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub application_id: String,
    /// Hex-encoded Ed25519 public key from the developer portal
    #[serde(default)]
    pub public_key: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            application_id: String::new(),
            public_key: String::new(),
            api_base: default_api_base(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    /// Per-request timeout for outbound Discord API calls
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_api_base() -> String {
    "https://discord.com/api/v10".to_string()
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8787
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_server_config() -> ServerConfig {
    ServerConfig {
        bind_address: default_bind_address(),
        port: default_port(),
    }
}

fn default_http_config() -> HttpConfig {
    HttpConfig {
        timeout_secs: default_timeout_secs(),
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        default_server_config()
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        default_http_config()
    }
}

impl Config {
    /// Load the config file (if present), then apply `DISCORD_*` environment
    /// overrides and check that all secrets are set.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::parse(&content)?
        } else {
            Config::default()
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config file")
    }

    /// Environment variables win over the file so secrets can stay out of it.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = non_empty("DISCORD_TOKEN") {
            self.discord.token = token;
        }
        if let Some(app_id) = non_empty("DISCORD_APPLICATION_ID") {
            self.discord.application_id = app_id;
        }
        if let Some(key) = non_empty("DISCORD_PUBLIC_KEY") {
            self.discord.public_key = key;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.discord.token.is_empty() {
            anyhow::bail!("Discord bot token is not set (discord.token or DISCORD_TOKEN)");
        }
        if self.discord.application_id.is_empty() {
            anyhow::bail!(
                "Discord application id is not set (discord.application_id or DISCORD_APPLICATION_ID)"
            );
        }
        if self.discord.public_key.is_empty() {
            anyhow::bail!(
                "Discord public key is not set (discord.public_key or DISCORD_PUBLIC_KEY)"
            );
        }
        if self.http.timeout_secs == 0 {
            anyhow::bail!("http.timeout_secs must be greater than zero");
        }
        Ok(())
    }

    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.server.bind_address, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_fill_missing_sections() {
        let config = Config::parse(
            r#"
[discord]
token = "t"
application_id = "1"
public_key = "ab"
"#,
        )
        .unwrap();

        assert_eq!(config.discord.api_base, "https://discord.com/api/v10");
        assert_eq!(config.listen_address(), "0.0.0.0:8787");
        assert_eq!(config.http.timeout(), Duration::from_secs(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides_file_values() {
        let mut config = Config::parse(
            r#"
[discord]
token = "from-file"
application_id = "1"
public_key = "ab"
"#,
        )
        .unwrap();

        let env: HashMap<&str, &str> =
            HashMap::from([("DISCORD_TOKEN", "from-env"), ("DISCORD_PUBLIC_KEY", "  ")]);
        config.apply_env_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.discord.token, "from-env");
        // blank values are ignored
        assert_eq!(config.discord.public_key, "ab");
    }

    #[test]
    fn test_validate_rejects_missing_secrets() {
        let config = Config::default();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("DISCORD_TOKEN"));
    }

    #[test]
    fn test_custom_server_and_timeout() {
        let config = Config::parse(
            r#"
[server]
bind_address = "127.0.0.1"
port = 9000

[http]
timeout_secs = 3
"#,
        )
        .unwrap();

        assert_eq!(config.listen_address(), "127.0.0.1:9000");
        assert_eq!(config.http.timeout(), Duration::from_secs(3));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let config = Config::parse(
            r#"
[discord]
token = "t"
application_id = "1"
public_key = "ab"

[http]
timeout_secs = 0
"#,
        )
        .unwrap();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("timeout_secs"));
    }
}
