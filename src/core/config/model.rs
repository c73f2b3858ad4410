use serde::{Deserialize, Deserializer, Serialize};

pub const DEFAULT_GAME_NAME: &str = "ExoGame";
const DEFAULT_INSTALLER_VERSION: &str = "1.0.0";
const FALLBACK_ARCHIVE_NAME: &str = "client.bin";

/// Which source satisfied the configuration fetch.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConfigOrigin {
    #[default]
    Remote,
    Local,
}

impl std::fmt::Display for ConfigOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigOrigin::Remote => write!(f, "remote"),
            ConfigOrigin::Local => write!(f, "local"),
        }
    }
}

/// A patch-note line. The config may carry plain strings or tagged objects.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ChangelogEntry {
    Text(String),
    Tagged {
        #[serde(default = "default_tag")]
        tag: String,
        text: String,
    },
}

fn default_tag() -> String {
    "update".to_string()
}

impl ChangelogEntry {
    pub fn tag(&self) -> &str {
        match self {
            ChangelogEntry::Text(_) => "update",
            ChangelogEntry::Tagged { tag, .. } => tag,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            ChangelogEntry::Text(text) => text,
            ChangelogEntry::Tagged { text, .. } => text,
        }
    }
}

/// Product description fetched from the configuration endpoint.
///
/// Branding fields (`logo_url`, `backgrounds`, `news`, ...) are carried for
/// the presentation layer and never interpreted by the install pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemoteConfig {
    pub game_name: String,
    pub exe_name: String,
    pub game_version: String,
    pub client_url: String,

    #[serde(default)]
    pub installer_name: Option<String>,
    #[serde(default)]
    pub installer_version: Option<String>,
    #[serde(default)]
    pub installer_icon: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub splash_logo_url: Option<String>,
    #[serde(default)]
    pub welcome_text: Option<String>,
    #[serde(default, deserialize_with = "size_in_mb")]
    pub file_size_mb: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub backgrounds: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub news: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub changelog: Vec<ChangelogEntry>,

    /// Set by the resolver, never read from the wire.
    #[serde(skip_deserializing, rename = "_origin")]
    pub origin: ConfigOrigin,
}

/// `null` reads the same as an absent field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SizeValue {
    Number(f64),
    Text(String),
}

/// Whole megabytes, rounded up. Accepts any JSON number or numeric string.
/// Anything else reads as 0, the "unknown size" value.
fn size_in_mb<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let mb = match Option::<SizeValue>::deserialize(deserializer)? {
        Some(SizeValue::Number(n)) => n,
        Some(SizeValue::Text(text)) => text.trim().parse().unwrap_or(0.0),
        None => 0.0,
    };
    if mb.is_finite() && mb > 0.0 {
        Ok(mb.ceil() as u64)
    } else {
        Ok(0)
    }
}

impl RemoteConfig {
    pub fn display_name(&self) -> &str {
        if self.game_name.trim().is_empty() {
            DEFAULT_GAME_NAME
        } else {
            &self.game_name
        }
    }

    /// File name for the downloaded archive: last path segment of
    /// `client_url`, without query or fragment.
    pub fn archive_file_name(&self) -> String {
        let without_query = self
            .client_url
            .split(['?', '#'])
            .next()
            .unwrap_or_default();
        let name = without_query.rsplit('/').next().unwrap_or_default();
        if name.is_empty() {
            FALLBACK_ARCHIVE_NAME.to_string()
        } else {
            name.to_string()
        }
    }

    pub fn installer_version_label(&self) -> String {
        format!(
            "v{}",
            self.installer_version
                .as_deref()
                .unwrap_or(DEFAULT_INSTALLER_VERSION)
        )
    }

    /// Required disk space, e.g. `"850 MB"` or `"2.5 GB"`.
    pub fn required_size_label(&self) -> String {
        let mb = self.file_size_mb;
        if mb >= 1024 {
            format!("{:.1} GB", mb as f64 / 1024.0)
        } else {
            format!("{mb} MB")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> RemoteConfig {
        serde_json::from_str(
            r#"{
                "game_name": "Exo",
                "exe_name": "Silkroad.exe",
                "game_version": "1.2.0",
                "client_url": "http://cdn.example.com/files/Exo_Client.7z?token=abc"
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn optional_fields_default() {
        let config = minimal();
        assert_eq!(config.file_size_mb, 0);
        assert!(config.news.is_empty());
        assert!(config.installer_name.is_none());
        assert_eq!(config.origin, ConfigOrigin::Remote);
        assert_eq!(config.installer_version_label(), "v1.0.0");
    }

    #[test]
    fn null_optional_fields_read_as_absent() {
        let json = r#"{
            "game_name": "Exo", "exe_name": "a.exe", "game_version": "1.0.0",
            "client_url": "http://x/a.zip",
            "news": null, "backgrounds": null, "changelog": null,
            "logo_url": null, "file_size_mb": null
        }"#;
        let config: RemoteConfig = serde_json::from_str(json).unwrap();
        assert!(config.news.is_empty());
        assert!(config.backgrounds.is_empty());
        assert!(config.changelog.is_empty());
        assert!(config.logo_url.is_none());
        assert_eq!(config.file_size_mb, 0);
    }

    #[test]
    fn file_size_accepts_any_number() {
        let parse = |size: &str| {
            let json = format!(
                r#"{{ "game_name": "Exo", "exe_name": "a.exe", "game_version": "1.0.0",
                      "client_url": "http://x/a.zip", "file_size_mb": {size} }}"#
            );
            serde_json::from_str::<RemoteConfig>(&json).unwrap().file_size_mb
        };
        assert_eq!(parse("850.5"), 851);
        assert_eq!(parse("2048"), 2048);
        assert_eq!(parse(r#""1200""#), 1200);
        assert_eq!(parse("-5"), 0);
        assert_eq!(parse(r#""big""#), 0);
    }

    #[test]
    fn missing_required_field_is_rejected() {
        let result = serde_json::from_str::<RemoteConfig>(
            r#"{ "game_name": "Exo", "exe_name": "a.exe", "game_version": "1.0.0" }"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn archive_file_name_strips_query() {
        assert_eq!(minimal().archive_file_name(), "Exo_Client.7z");

        let mut config = minimal();
        config.client_url = "http://cdn.example.com/".into();
        assert_eq!(config.archive_file_name(), "client.bin");
    }

    #[test]
    fn changelog_accepts_strings_and_objects() {
        let json = r#"{
            "game_name": "Exo", "exe_name": "a.exe", "game_version": "1.0.0",
            "client_url": "http://x/a.zip",
            "changelog": ["Plain line", { "tag": "fix", "text": "Crash fixed" }, { "text": "No tag" }]
        }"#;
        let config: RemoteConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.changelog[0].tag(), "update");
        assert_eq!(config.changelog[0].text(), "Plain line");
        assert_eq!(config.changelog[1].tag(), "fix");
        assert_eq!(config.changelog[2].tag(), "update");
        assert_eq!(config.changelog[2].text(), "No tag");
    }

    #[test]
    fn size_label() {
        let mut config = minimal();
        config.file_size_mb = 850;
        assert_eq!(config.required_size_label(), "850 MB");
        config.file_size_mb = 2560;
        assert_eq!(config.required_size_label(), "2.5 GB");
    }

    #[test]
    fn origin_is_not_read_from_the_wire() {
        let json = r#"{
            "game_name": "Exo", "exe_name": "a.exe", "game_version": "1.0.0",
            "client_url": "http://x/a.zip", "_origin": "local"
        }"#;
        let config: RemoteConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.origin, ConfigOrigin::Remote);
    }
}
