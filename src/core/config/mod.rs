use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

pub const MEMORY_DATABASE_URL: &str = "memory://";
pub const CONFIG_FILE: &str = "crmserver.toml";
pub const ENV_PREFIX: &str = "CRM_";
pub const APP_DIR: &str = "crmserver";

/// `crmserver.toml` under the user's configuration directory.
pub fn user_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FrontendMode {
    /// API and static files from one process.
    #[default]
    Embedded,
    /// Static files here, `/api/*` forwarded to a separate backend.
    Relay,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub database_pool_size: u32,
    pub jwt_secret: String,
    pub token_ttl_minutes: i64,
    pub frontend_mode: FrontendMode,
    pub static_dir: PathBuf,
    pub backend_url: String,
    pub cors_origins: Vec<String>,
    pub seed_admin: bool,
    pub seed_admin_username: String,
    pub seed_admin_email: String,
    pub seed_admin_password: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            database_url: MEMORY_DATABASE_URL.to_string(),
            database_pool_size: 10,
            jwt_secret: String::new(),
            token_ttl_minutes: 60,
            frontend_mode: FrontendMode::Embedded,
            static_dir: PathBuf::from("frontend/dist"),
            backend_url: "http://127.0.0.1:8001".to_string(),
            cors_origins: Vec::new(),
            seed_admin: true,
            seed_admin_username: "admin".to_string(),
            seed_admin_email: "admin@company.com".to_string(),
            seed_admin_password: "admin123".to_string(),
        }
    }
}

impl AppConfig {
    /// Defaults, then the user's `crmserver.toml`, then `./crmserver.toml`,
    /// then `DATABASE_URL`, then `CRM_*`.
    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = user_config_file() {
            figment = figment.merge(Toml::file(path));
        }
        figment
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::raw().only(&["DATABASE_URL"]))
            .merge(Env::prefixed(ENV_PREFIX))
    }

    pub fn load() -> Result<Self, figment::Error> {
        Self::from_figment(Self::figment())
    }

    pub fn from_figment(figment: Figment) -> Result<Self, figment::Error> {
        figment.extract()
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    pub fn uses_memory_store(&self) -> bool {
        self.database_url.trim() == MEMORY_DATABASE_URL
    }

    /// Whether `backend_url` names this process's own listening address.
    pub fn relays_to_itself(&self) -> bool {
        let Ok(url) = reqwest::Url::parse(&self.backend_url) else {
            return false;
        };
        if url.port_or_known_default() != Some(self.port) {
            return false;
        }
        let local = |host: &str| {
            host.eq_ignore_ascii_case("localhost")
                || host
                    .trim_matches(|c| c == '[' || c == ']')
                    .parse::<IpAddr>()
                    .is_ok_and(|ip| ip.is_loopback() || ip.is_unspecified())
        };
        match url.host_str() {
            Some(host) => host == self.host || (local(host) && local(&self.host)),
            None => false,
        }
    }
}
