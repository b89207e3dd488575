use crate::layering::UiTextLayer;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Web server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct WebConfig {
    #[serde(default = "default_web_host")]
    pub host: String,
    #[serde(default = "default_web_port")]
    pub port: u16,
    /// External origin used for absolute links; derived from the `Host`
    /// header when empty
    #[serde(default)]
    pub base_url: String,
}

fn default_web_host() -> String {
    "0.0.0.0".to_string()
}

fn default_web_port() -> u16 {
    3000
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_web_host(),
            port: default_web_port(),
            base_url: String::new(),
        }
    }
}

/// Admin surface configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AdminConfig {
    /// Secret path segment the admin pages live under. Obscurity only; the
    /// password check still applies.
    #[serde(default = "default_admin_path")]
    pub path: String,
    /// Plaintext admin password. Login is impossible while empty.
    #[serde(default)]
    pub password: String,
    /// HMAC secret for session tokens and cookie signing. A random secret is
    /// generated at startup when empty.
    #[serde(default)]
    pub cookie_secret: String,
}

fn default_admin_path() -> String {
    "admin".to_string()
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            path: default_admin_path(),
            password: String::new(),
            cookie_secret: String::new(),
        }
    }
}

/// Database configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_url() -> String {
    "sqlite://data.db?mode=rwc".to_string()
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

/// Static panel content; the deployment layer of the resolved panel config
#[derive(Debug, Deserialize, Clone)]
pub struct PanelConfig {
    #[serde(default = "default_brand_name")]
    pub brand_name: String,
    /// Plain-text banner shown on every public page
    #[serde(default)]
    pub announcement: String,
    #[serde(default = "default_telegram_admin_text")]
    pub telegram_admin_text: String,
    #[serde(default = "default_link")]
    pub telegram_admin_url: String,
    #[serde(default = "default_telegram_channel_text")]
    pub telegram_channel_text: String,
    #[serde(default = "default_link")]
    pub telegram_channel_url: String,
    /// UI text overrides (layer 2)
    #[serde(default)]
    pub ui_text: UiTextLayer,
}

fn default_brand_name() -> String {
    "VPN KEY".to_string()
}

fn default_telegram_admin_text() -> String {
    "Contact Admin".to_string()
}

fn default_telegram_channel_text() -> String {
    "Join Channel".to_string()
}

fn default_link() -> String {
    "#".to_string()
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            brand_name: default_brand_name(),
            announcement: String::new(),
            telegram_admin_text: default_telegram_admin_text(),
            telegram_admin_url: default_link(),
            telegram_channel_text: default_telegram_channel_text(),
            telegram_channel_url: default_link(),
            ui_text: UiTextLayer::default(),
        }
    }
}

/// Root application configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub admin: AdminConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub panel: PanelConfig,
}

/// Plain deployment variables and the config keys they override.
const PLAIN_ENV_OVERRIDES: [(&str, &str); 4] = [
    ("PORT", "web.port"),
    ("BASE_URL", "web.base_url"),
    ("ADMIN_PASSWORD", "admin.password"),
    ("COOKIE_SECRET", "admin.cookie_secret"),
];

impl AppConfig {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            // Start with default config file
            .add_source(File::with_name("config/default").required(false))
            // Override with local config if present
            .add_source(File::with_name("config/local").required(false))
            // Override with environment variables (prefix: KEYPANEL__)
            // e.g., KEYPANEL__ADMIN__PATH, KEYPANEL__PANEL__BRAND_NAME
            .add_source(
                Environment::with_prefix("KEYPANEL")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        for (var, key) in PLAIN_ENV_OVERRIDES {
            let value = std::env::var(var).ok().filter(|v| !v.trim().is_empty());
            builder = builder.set_override_option(key, value)?;
        }

        let config: Self = builder.build()?.try_deserialize()?;
        Ok(config.normalized())
    }

    /// Trim user-facing strings. A blank admin path, brand name or Telegram
    /// field takes its default again.
    fn normalized(mut self) -> Self {
        self.web.base_url = self.web.base_url.trim().trim_end_matches('/').to_string();
        self.admin.path = self.admin.path.trim().trim_matches('/').to_string();
        if self.admin.path.is_empty() {
            self.admin.path = default_admin_path();
        }
        self.admin.password = self.admin.password.trim().to_string();
        self.admin.cookie_secret = self.admin.cookie_secret.trim().to_string();

        let panel = &mut self.panel;
        fill_blank(&mut panel.brand_name, default_brand_name);
        fill_blank(&mut panel.telegram_admin_text, default_telegram_admin_text);
        fill_blank(&mut panel.telegram_admin_url, default_link);
        fill_blank(&mut panel.telegram_channel_text, default_telegram_channel_text);
        fill_blank(&mut panel.telegram_channel_url, default_link);
        self
    }

    /// Socket address to bind
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.web.host, self.web.port)
    }
}

/// Trim `value`; a blank result takes the default.
fn fill_blank(value: &mut String, default: fn() -> String) {
    let trimmed = value.trim();
    *value = if trimmed.is_empty() {
        default()
    } else {
        trimmed.to_string()
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.web.port, 3000);
        assert_eq!(config.admin.path, "admin");
        assert_eq!(config.panel.brand_name, "VPN KEY");
        assert_eq!(config.panel.telegram_admin_url, "#");
        assert_eq!(config.listen_addr(), "0.0.0.0:3000");
    }

    #[test]
    fn test_toml_panel_layer() {
        let config: AppConfig = Config::builder()
            .add_source(config::File::from_str(
                r#"
                [admin]
                path = "/secret-door/"

                [panel]
                brand_name = "  My Keys "

                [panel.ui_text]
                back_text = "Home"

                [panel.ui_text.labels]
                copy_btn = "Copy it"
                "#,
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize::<AppConfig>()
            .unwrap()
            .normalized();

        assert_eq!(config.admin.path, "secret-door");
        assert_eq!(config.panel.brand_name, "My Keys");
        assert_eq!(config.panel.ui_text.back_text.as_deref(), Some("Home"));
        assert_eq!(config.panel.ui_text.labels.copy_btn.as_deref(), Some("Copy it"));
        assert_eq!(config.panel.ui_text.labels.gb_short, None);
        assert_eq!(config.database.max_connections, 5);
    }

    #[test]
    fn test_blank_admin_path_falls_back() {
        let mut config = AppConfig::default();
        config.admin.path = " / ".to_string();
        assert_eq!(config.normalized().admin.path, "admin");
    }

    #[test]
    fn test_blank_panel_texts_fall_back() {
        let mut config = AppConfig::default();
        config.panel.brand_name = "   ".to_string();
        config.panel.telegram_admin_text = String::new();
        config.panel.telegram_admin_url = " ".to_string();
        config.panel.telegram_channel_text = "  News  ".to_string();
        config.panel.telegram_channel_url = String::new();

        let panel = config.normalized().panel;
        assert_eq!(panel.brand_name, "VPN KEY");
        assert_eq!(panel.telegram_admin_text, "Contact Admin");
        assert_eq!(panel.telegram_admin_url, "#");
        assert_eq!(panel.telegram_channel_text, "News");
        assert_eq!(panel.telegram_channel_url, "#");
    }
}
