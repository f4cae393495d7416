use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeZone, Utc};
use crossterm::event::{KeyCode, KeyModifiers};
use directories::{BaseDirs, ProjectDirs};
use std::path::PathBuf;

/// Which set of config/data/session files to use; `--dev` keeps a separate set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    Dev,
    Prod,
}

impl Profile {
    pub fn from_dev_flag(dev: bool) -> Self {
        if dev { Profile::Dev } else { Profile::Prod }
    }

    fn app_name(&self) -> &'static str {
        match self {
            Profile::Dev => "taskdeck-dev",
            Profile::Prod => "taskdeck",
        }
    }

    fn dirs(&self) -> Option<ProjectDirs> {
        ProjectDirs::from("com", "taskdeck", self.app_name())
    }
}

pub fn get_config_dir(profile: Profile) -> Option<PathBuf> {
    profile.dirs().map(|dirs| dirs.config_dir().to_path_buf())
}

/// Holds the session file and the log
pub fn get_data_dir(profile: Profile) -> Option<PathBuf> {
    profile.dirs().map(|dirs| dirs.data_dir().to_path_buf())
}

/// Expand `~` in a path string to the user's home directory
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = BaseDirs::new().map(|d| d.home_dir().to_path_buf()) {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Parse a date string in ISO 8601 format (YYYY-MM-DD)
pub fn parse_date(date_str: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d")
}

/// Local calendar date, the reference point for due-date filters
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Midnight of `date` in the local timezone, as a UTC instant.
/// Falls back to UTC midnight when local midnight does not exist (DST gap).
pub fn to_local_midnight(date: NaiveDate) -> DateTime<Utc> {
    let naive = date.and_time(NaiveTime::MIN);
    match Local.from_local_datetime(&naive).earliest() {
        Some(local) => local.with_timezone(&Utc),
        None => Utc.from_utc_datetime(&naive),
    }
}

/// Short local rendering of a due timestamp
pub fn format_due(due: &DateTime<Utc>) -> String {
    due.with_timezone(&Local).format("%Y-%m-%d").to_string()
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedKeyBinding {
    pub key_code: KeyCode,
    pub requires_ctrl: bool,
}

impl ParsedKeyBinding {
    pub fn matches(&self, code: KeyCode, modifiers: KeyModifiers) -> bool {
        self.key_code == code && self.requires_ctrl == has_primary_modifier(modifiers)
    }
}

/// Ctrl on Windows/Linux; Ctrl or Option on macOS
pub fn has_primary_modifier(modifiers: KeyModifiers) -> bool {
    #[cfg(target_os = "macos")]
    {
        modifiers.contains(KeyModifiers::CONTROL) || modifiers.contains(KeyModifiers::ALT)
    }

    #[cfg(not(target_os = "macos"))]
    {
        modifiers.contains(KeyModifiers::CONTROL)
    }
}

/// Key binding as shown in hints; macOS users see "Opt+" for the primary modifier
pub fn format_key_binding_for_display(key_binding: &str) -> String {
    #[cfg(target_os = "macos")]
    {
        key_binding.replace("Ctrl+", "Opt+")
    }

    #[cfg(not(target_os = "macos"))]
    {
        key_binding.to_string()
    }
}

/// Parse a configured binding: "q", "Enter", "Ctrl+s", "F5"
pub fn parse_key_binding(key_str: &str) -> Result<ParsedKeyBinding, String> {
    let key_str = key_str.trim();
    match key_str.strip_prefix("Ctrl+") {
        Some(key_part) => Ok(ParsedKeyBinding {
            key_code: parse_key_code(key_part)?,
            requires_ctrl: true,
        }),
        None => Ok(ParsedKeyBinding {
            key_code: parse_key_code(key_str)?,
            requires_ctrl: false,
        }),
    }
}

fn parse_key_code(key_str: &str) -> Result<KeyCode, String> {
    let code = match key_str {
        "Enter" => KeyCode::Enter,
        "Esc" | "Escape" => KeyCode::Esc,
        "Backspace" => KeyCode::Backspace,
        "Tab" => KeyCode::Tab,
        "BackTab" => KeyCode::BackTab,
        "Space" | " " => KeyCode::Char(' '),
        "Left" => KeyCode::Left,
        "Right" => KeyCode::Right,
        "Up" => KeyCode::Up,
        "Down" => KeyCode::Down,
        "Home" => KeyCode::Home,
        "End" => KeyCode::End,
        "PageUp" => KeyCode::PageUp,
        "PageDown" => KeyCode::PageDown,
        "Delete" => KeyCode::Delete,
        _ => {
            if let Some(n) = key_str.strip_prefix('F').and_then(|n| n.parse::<u8>().ok()) {
                if (1..=12).contains(&n) {
                    return Ok(KeyCode::F(n));
                }
            }
            let mut chars = key_str.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => KeyCode::Char(c),
                _ => return Err(format!("Unknown key binding: {}", key_str)),
            }
        }
    };
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_ctrl_bindings() {
        assert_eq!(
            parse_key_binding("Ctrl+s"),
            Ok(ParsedKeyBinding {
                key_code: KeyCode::Char('s'),
                requires_ctrl: true
            })
        );
        assert_eq!(parse_key_binding("F5").map(|b| b.key_code), Ok(KeyCode::F(5)));
        assert_eq!(parse_key_binding(" Enter ").map(|b| b.key_code), Ok(KeyCode::Enter));
        assert!(parse_key_binding("F13").is_err());
        assert!(parse_key_binding("Hyper+x").is_err());
    }

    #[test]
    fn binding_matches_modifiers() {
        let save = parse_key_binding("Ctrl+s").unwrap();
        assert!(save.matches(KeyCode::Char('s'), KeyModifiers::CONTROL));
        assert!(!save.matches(KeyCode::Char('s'), KeyModifiers::NONE));
        let quit = parse_key_binding("q").unwrap();
        assert!(quit.matches(KeyCode::Char('q'), KeyModifiers::NONE));
    }

    #[test]
    fn local_midnight_round_trips_to_the_same_day() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let instant = to_local_midnight(day);
        assert_eq!(instant.with_timezone(&Local).date_naive(), day);
        assert_eq!(format_due(&instant), "2024-03-10");
    }

    #[test]
    fn expand_path_leaves_plain_paths() {
        assert_eq!(expand_path("/tmp/x.toml"), PathBuf::from("/tmp/x.toml"));
    }
}
