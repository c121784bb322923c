//! Configuration management.

use crate::resolver::{Delivery, ResolveOptions};
use crate::server::ServerConfig;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use local_media_types::{
    DEFAULT_BASELINK, DEFAULT_HEIGHT, DEFAULT_MAX_EMBEDS, DEFAULT_PORT, DEFAULT_WIDTH,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Name of the per-directory config file.
pub const LOCAL_CONFIG_FILE: &str = ".local-media.toml";

/// Prefix of environment overrides, e.g. `LOCAL_MEDIA_SERVER__PORT=6000`.
pub const ENV_PREFIX: &str = "LOCAL_MEDIA_";

/// Configuration structure that matches the TOML file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    server: ServerSection,
    #[serde(default)]
    media: MediaSection,
    #[serde(default)]
    ui: UiSection,
    #[serde(default)]
    logging: LoggingSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ServerSection {
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default = "default_baselink")]
    baselink: String,
    #[serde(default = "default_true")]
    enable_caching: bool,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            port: default_port(),
            baselink: default_baselink(),
            enable_caching: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MediaSection {
    #[serde(default = "default_width")]
    default_width: u32,
    #[serde(default = "default_height")]
    default_height: u32,
    #[serde(default = "default_max_embeds")]
    max_embeds: usize,
    #[serde(default = "default_true")]
    traversal_guard: bool,
    /// Host resource origin (e.g. `app://local`); local server delivery when unset
    resource_origin: Option<String>,
}

impl Default for MediaSection {
    fn default() -> Self {
        Self {
            default_width: default_width(),
            default_height: default_height(),
            max_embeds: default_max_embeds(),
            traversal_guard: true,
            resource_origin: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct UiSection {
    #[serde(default = "default_true")]
    show_in_menu_item: bool,
}

impl Default for UiSection {
    fn default() -> Self {
        Self {
            show_in_menu_item: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct LoggingSection {
    /// Path to log file (if set, logs will be written to file in addition to stderr)
    log_file: Option<PathBuf>,
    /// Log level (trace, debug, info, warn, error)
    log_level: Option<String>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_baselink() -> String {
    DEFAULT_BASELINK.to_string()
}

fn default_width() -> u32 {
    DEFAULT_WIDTH
}

fn default_height() -> u32 {
    DEFAULT_HEIGHT
}

fn default_max_embeds() -> usize {
    DEFAULT_MAX_EMBEDS
}

fn default_true() -> bool {
    true
}

/// Values given on the command line. They win over every other source.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub config_file: Option<PathBuf>,
    pub port: Option<u16>,
    pub baselink: Option<String>,
    pub enable_caching: Option<bool>,
    pub max_embeds: Option<usize>,
    pub log_level: Option<String>,
}

/// Extension settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Port of the loopback media server
    pub port: u16,
    /// Base link used in rendered markup
    pub baselink: String,
    /// Send cache headers for served files
    pub enable_caching: bool,
    pub default_width: u32,
    pub default_height: u32,
    /// Show the embed entries in the editor context menu
    pub show_in_menu_item: bool,
    /// Cap on files a directory reference expands to
    pub max_embeds: usize,
    pub traversal_guard: bool,
    pub resource_origin: Option<String>,
    pub log_file: Option<PathBuf>,
    pub log_level: Option<String>,
}

impl Settings {
    /// Load settings with the full priority chain: CLI > env vars > config files > defaults.
    ///
    /// Config files are merged in this order:
    /// 1. `config.toml` in the user config directory (~/.config/local-media/ on Linux)
    /// 2. `.local-media.toml` in the current directory
    /// 3. an explicit `--config` file
    pub fn load(overrides: Overrides) -> anyhow::Result<Self> {
        let user_config = directories::ProjectDirs::from("", "", "local-media")
            .map(|dirs| dirs.config_dir().join("config.toml"));
        let local_config = std::env::current_dir()
            .ok()
            .map(|dir| dir.join(LOCAL_CONFIG_FILE));

        let mut figment = Figment::new().merge(Serialized::defaults(ConfigFile::default()));

        for path in [user_config, local_config].into_iter().flatten() {
            if path.exists() {
                figment = figment.merge(Toml::file(path));
            }
        }

        if let Some(ref path) = overrides.config_file {
            if !path.exists() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        if let Some(port) = overrides.port {
            figment = figment.merge(Serialized::default("server.port", port));
        }
        if let Some(ref baselink) = overrides.baselink {
            figment = figment.merge(Serialized::default("server.baselink", baselink));
        }
        if let Some(enable_caching) = overrides.enable_caching {
            figment = figment.merge(Serialized::default("server.enable_caching", enable_caching));
        }
        if let Some(max_embeds) = overrides.max_embeds {
            figment = figment.merge(Serialized::default("media.max_embeds", max_embeds));
        }
        if let Some(ref level) = overrides.log_level {
            figment = figment.merge(Serialized::default("logging.log_level", level));
        }

        let file: ConfigFile = figment.extract()?;
        let settings = Self::from(file);
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.port != 0 && self.port < 1024 {
            anyhow::bail!("Server port must be between 1024 and 65535, got {}", self.port);
        }
        if self.max_embeds == 0 {
            anyhow::bail!("max_embeds must be at least 1");
        }
        Ok(())
    }

    /// Configuration for the loopback media server.
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            port: self.port,
            enable_caching: self.enable_caching,
        }
    }

    /// Delivery scheme for local files in rendered markup.
    pub fn delivery(&self) -> Delivery {
        match &self.resource_origin {
            Some(origin) if !origin.trim().is_empty() => Delivery::AppResource {
                origin: origin.trim().to_string(),
            },
            _ => Delivery::LocalServer {
                baselink: self.baselink.clone(),
                port: self.port,
            },
        }
    }

    pub fn resolve_options(&self) -> ResolveOptions {
        ResolveOptions {
            delivery: self.delivery(),
            traversal_guard: self.traversal_guard,
        }
    }
}

impl From<ConfigFile> for Settings {
    fn from(file: ConfigFile) -> Self {
        Self {
            port: file.server.port,
            baselink: file.server.baselink,
            enable_caching: file.server.enable_caching,
            default_width: file.media.default_width,
            default_height: file.media.default_height,
            show_in_menu_item: file.ui.show_in_menu_item,
            max_embeds: file.media.max_embeds,
            traversal_guard: file.media.traversal_guard,
            resource_origin: file.media.resource_origin,
            log_file: file.logging.log_file,
            log_level: file.logging.log_level,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::from(ConfigFile::default())
    }
}
