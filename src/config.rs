use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::utils;
use crate::view::SortRequest;

/// Current configuration version
pub const CURRENT_CONFIG_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_config_version")]
    pub config_version: Option<u32>,
    #[serde(default = "default_sidebar_width")]
    pub sidebar_width_percent: u16,
    /// Used when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_current_theme")]
    pub current_theme: String,
    #[serde(default)]
    pub api: ApiConfig,
    /// Server-side ordering for the first load; unset keeps the API's default
    #[serde(default)]
    pub default_sort: Option<SortRequest>,
    #[serde(default)]
    pub key_bindings: KeyBindings,
    #[serde(default)]
    pub themes: HashMap<String, Theme>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyBindings {
    #[serde(default = "default_quit")]
    pub quit: String,
    #[serde(default = "default_new")]
    pub new: String,
    #[serde(default = "default_new_subtask")]
    pub new_subtask: String,
    #[serde(default = "default_edit")]
    pub edit: String,
    #[serde(default = "default_delete")]
    pub delete: String,
    #[serde(default = "default_save")]
    pub save: String,
    #[serde(default = "default_search")]
    pub search: String,
    #[serde(default = "default_filter")]
    pub filter: String,
    #[serde(default = "default_toggle_complete")]
    pub toggle_complete: String,
    #[serde(default = "default_expand")]
    pub expand: String,
    #[serde(default = "default_reload")]
    pub reload: String,
    #[serde(default = "default_sort")]
    pub sort: String,
    #[serde(default = "default_sort_order")]
    pub sort_order: String,
    #[serde(default = "default_tab_left")]
    pub tab_left: String,
    #[serde(default = "default_tab_right")]
    pub tab_right: String,
    #[serde(default = "default_list_up")]
    pub list_up: String,
    #[serde(default = "default_list_down")]
    pub list_down: String,
    #[serde(default = "default_help")]
    pub help: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Theme {
    #[serde(default = "default_fg")]
    pub fg: String,
    #[serde(default = "default_bg")]
    pub bg: String,
    #[serde(default = "default_highlight_bg")]
    pub highlight_bg: String,
    /// Empty means "pick a readable color for highlight_bg"
    #[serde(default = "default_highlight_fg")]
    pub highlight_fg: String,
    #[serde(default = "default_tab_bg")]
    pub tab_bg: String,
    #[serde(default = "default_muted_fg")]
    pub muted_fg: String,
    #[serde(default = "default_error_fg")]
    pub error_fg: String,
}

impl Default for Config {
    fn default() -> Self {
        let mut themes = HashMap::new();

        // sample user theme so the file shows the shape
        themes.insert(
            "lightblue".to_string(),
            Theme {
                fg: "cyan".to_string(),
                highlight_bg: "blue".to_string(),
                ..Theme::default()
            },
        );

        Self {
            config_version: Some(CURRENT_CONFIG_VERSION),
            api: ApiConfig::default(),
            default_sort: None,
            sidebar_width_percent: default_sidebar_width(),
            log_level: default_log_level(),
            key_bindings: KeyBindings::default(),
            current_theme: default_current_theme(),
            themes,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            quit: default_quit(),
            new: default_new(),
            new_subtask: default_new_subtask(),
            edit: default_edit(),
            delete: default_delete(),
            save: default_save(),
            search: default_search(),
            filter: default_filter(),
            toggle_complete: default_toggle_complete(),
            expand: default_expand(),
            reload: default_reload(),
            sort: default_sort(),
            sort_order: default_sort_order(),
            tab_left: default_tab_left(),
            tab_right: default_tab_right(),
            list_up: default_list_up(),
            list_down: default_list_down(),
            help: default_help(),
        }
    }
}

impl KeyBindings {
    /// Every binding with its name, for validation and the help screen
    pub fn entries(&self) -> Vec<(&'static str, &str)> {
        vec![
            ("quit", &self.quit),
            ("new", &self.new),
            ("new_subtask", &self.new_subtask),
            ("edit", &self.edit),
            ("delete", &self.delete),
            ("save", &self.save),
            ("search", &self.search),
            ("filter", &self.filter),
            ("toggle_complete", &self.toggle_complete),
            ("expand", &self.expand),
            ("reload", &self.reload),
            ("sort", &self.sort),
            ("sort_order", &self.sort_order),
            ("tab_left", &self.tab_left),
            ("tab_right", &self.tab_right),
            ("list_up", &self.list_up),
            ("list_down", &self.list_down),
            ("help", &self.help),
        ]
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, binding) in self.entries() {
            utils::parse_key_binding(binding)
                .map_err(|e| ConfigError::InvalidKeyBinding(name.to_string(), e))?;
        }
        Ok(())
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            fg: default_fg(),
            bg: default_bg(),
            highlight_bg: default_highlight_bg(),
            highlight_fg: default_highlight_fg(),
            tab_bg: default_tab_bg(),
            muted_fg: default_muted_fg(),
            error_fg: default_error_fg(),
        }
    }
}

impl Theme {
    fn preset(fg: &str, bg: &str, highlight_bg: &str, highlight_fg: &str) -> Theme {
        Theme {
            fg: fg.to_string(),
            bg: bg.to_string(),
            highlight_bg: highlight_bg.to_string(),
            highlight_fg: highlight_fg.to_string(),
            ..Theme::default()
        }
    }

    /// Themes that are always available
    pub fn get_preset_themes() -> HashMap<String, Theme> {
        let mut themes = HashMap::new();
        themes.insert("default".to_string(), Theme::default());
        themes.insert("dark".to_string(), Theme::preset("white", "black", "cyan", "black"));
        themes.insert("light".to_string(), Theme::preset("black", "white", "blue", "white"));
        themes.insert("green".to_string(), Theme::preset("green", "black", "yellow", "black"));
        themes.insert("monochrome".to_string(), Theme::preset("white", "black", "white", "black"));
        themes
    }
}

fn default_config_version() -> Option<u32> {
    Some(CURRENT_CONFIG_VERSION)
}

fn default_base_url() -> String {
    "http://localhost:8000/api".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_sidebar_width() -> u16 {
    40
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_current_theme() -> String {
    "default".to_string()
}

fn default_quit() -> String {
    "q".to_string()
}

fn default_new() -> String {
    "n".to_string()
}

fn default_new_subtask() -> String {
    "a".to_string()
}

fn default_edit() -> String {
    "e".to_string()
}

fn default_delete() -> String {
    "d".to_string()
}

fn default_save() -> String {
    "Ctrl+s".to_string()
}

fn default_search() -> String {
    "/".to_string()
}

fn default_filter() -> String {
    "f".to_string()
}

fn default_toggle_complete() -> String {
    "Space".to_string()
}

fn default_expand() -> String {
    "Enter".to_string()
}

fn default_reload() -> String {
    "r".to_string()
}

fn default_sort() -> String {
    "s".to_string()
}

fn default_sort_order() -> String {
    "o".to_string()
}

fn default_tab_left() -> String {
    "Left".to_string()
}

fn default_tab_right() -> String {
    "Right".to_string()
}

fn default_list_up() -> String {
    "k".to_string()
}

fn default_list_down() -> String {
    "j".to_string()
}

fn default_help() -> String {
    "F1".to_string()
}

fn default_fg() -> String {
    "white".to_string()
}

fn default_bg() -> String {
    "black".to_string()
}

fn default_highlight_bg() -> String {
    "blue".to_string()
}

fn default_highlight_fg() -> String {
    "white".to_string()
}

fn default_tab_bg() -> String {
    "gray".to_string()
}

fn default_muted_fg() -> String {
    "darkgray".to_string()
}

fn default_error_fg() -> String {
    "red".to_string()
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config directory: {0}")]
    ConfigDirError(String),
    #[error("Failed to read config file: {0}")]
    ReadError(String),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to write config file: {0}")]
    WriteError(String),
    #[error("Invalid key binding for '{0}': {1}")]
    InvalidKeyBinding(String, String),
}

impl Config {
    /// Load the profile's config file, creating it with defaults when missing
    pub fn load_with_profile(profile: utils::Profile) -> Result<Self, ConfigError> {
        let config_path = Self::get_config_path(profile)?;
        Self::load_from_path(&config_path)
    }

    /// Load a specific config file, creating it with defaults when missing
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let config = if path.exists() {
            let contents =
                fs::read_to_string(path).map_err(|e| ConfigError::ReadError(e.to_string()))?;
            toml::from_str::<Config>(&contents)?
        } else {
            let mut config = Config::default();
            config.save_to_path(path)?;
            config
        };
        config.key_bindings.validate()?;
        Ok(config)
    }

    pub fn save_to_path(&mut self, path: &Path) -> Result<(), ConfigError> {
        self.config_version = Some(CURRENT_CONFIG_VERSION);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError(e.to_string()))?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::WriteError(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string).map_err(|e| ConfigError::WriteError(e.to_string()))?;

        Ok(())
    }

    pub fn get_config_path(profile: utils::Profile) -> Result<PathBuf, ConfigError> {
        let config_dir = utils::get_config_dir(profile).ok_or_else(|| {
            ConfigError::ConfigDirError("Could not determine config directory".to_string())
        })?;
        Ok(config_dir.join("config.toml"))
    }

    /// User theme, then preset, then `default`. An empty `highlight_fg` is
    /// replaced by a color that contrasts with `highlight_bg`.
    pub fn get_active_theme(&self) -> Theme {
        use crate::tui::widgets::color::{format_color_for_display, get_contrast_text_color, parse_color};

        let mut theme = self
            .themes
            .get(&self.current_theme)
            .cloned()
            .or_else(|| Theme::get_preset_themes().remove(&self.current_theme))
            .unwrap_or_default();

        if theme.highlight_fg.is_empty() {
            let contrast = get_contrast_text_color(parse_color(&theme.highlight_bg));
            theme.highlight_fg = format_color_for_display(&contrast);
        }

        theme
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_is_created_with_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("taskdeck").join("config.toml");
        let config = Config::load_from_path(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.api.base_url, "http://localhost:8000/api");
        assert_eq!(config.api.timeout_secs, 10);
        assert!(config.default_sort.is_none());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
log_level = "debug"

[api]
base_url = "https://tasks.example.com/api"

[default_sort]
sort_by = "estimated_time"
order = "desc"

[key_bindings]
quit = "Ctrl+q"
"#,
        )
        .unwrap();

        let config = Config::load_from_path(&path).unwrap();
        assert_eq!(config.api.base_url, "https://tasks.example.com/api");
        assert_eq!(config.api.timeout_secs, 10);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.key_bindings.quit, "Ctrl+q");
        assert_eq!(config.key_bindings.new, "n");
        let sort = config.default_sort.unwrap();
        assert_eq!(sort.query(), [("sort_by", "estimated_time"), ("order", "desc")]);
    }

    #[test]
    fn bad_key_binding_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[key_bindings]\nreload = \"Hyper+r\"\n").unwrap();
        match Config::load_from_path(&path) {
            Err(ConfigError::InvalidKeyBinding(name, _)) => assert_eq!(name, "reload"),
            other => panic!("expected key binding error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn unknown_theme_falls_back_to_default() {
        let config = Config {
            current_theme: "nope".into(),
            ..Config::default()
        };
        assert_eq!(config.get_active_theme(), Theme::default());

        let config = Config {
            current_theme: "green".into(),
            ..Config::default()
        };
        assert_eq!(config.get_active_theme().fg, "green");
    }

    #[test]
    fn empty_highlight_fg_gets_contrast_color() {
        let mut config = Config::default();
        config.themes.insert(
            "custom".into(),
            Theme {
                highlight_bg: "yellow".into(),
                highlight_fg: String::new(),
                ..Theme::default()
            },
        );
        config.current_theme = "custom".into();
        assert!(!config.get_active_theme().highlight_fg.is_empty());
    }
}
