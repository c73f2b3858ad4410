// ─── Config Resolver ───
// Fetches the game configuration from the remote endpoint, falling back to
// the configuration file bundled with the installer.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, error, info, warn};

use super::model::{ConfigOrigin, RemoteConfig};
use super::ConfigSource;
use crate::core::error::{InstallerError, InstallerResult};
use crate::core::http::build_config_client;
use crate::core::state::InstallerSettings;

/// Remote-then-local configuration resolver.
///
/// Holds no cache: every `resolve` repeats the full remote-then-local attempt.
pub struct ConfigResolver {
    client: Client,
    config_url: String,
    local_path: PathBuf,
}

impl ConfigResolver {
    pub fn new(client: Client, config_url: impl Into<String>, local_path: PathBuf) -> Self {
        Self {
            client,
            config_url: config_url.into(),
            local_path,
        }
    }

    pub fn from_settings(settings: &InstallerSettings) -> InstallerResult<Self> {
        let client = build_config_client(settings.config_timeout())?;
        Ok(Self::new(
            client,
            settings.config_url.clone(),
            settings.local_config_path.clone(),
        ))
    }

    async fn fetch_remote(&self) -> InstallerResult<RemoteConfig> {
        debug!("GET {}", self.config_url);
        let response = self.client.get(&self.config_url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(InstallerError::Other(format!(
                "config endpoint returned HTTP {}",
                status.as_u16()
            )));
        }

        let body = response.text().await?;
        let mut config: RemoteConfig = serde_json::from_str(&body)?;
        config.origin = ConfigOrigin::Remote;
        Ok(config)
    }

    async fn load_local(&self) -> InstallerResult<RemoteConfig> {
        read_local_config(&self.local_path).await
    }
}

#[async_trait]
impl ConfigSource for ConfigResolver {
    async fn resolve(&self) -> InstallerResult<RemoteConfig> {
        info!("Fetching remote config from: {}", self.config_url);

        let remote_err = match self.fetch_remote().await {
            Ok(config) => {
                info!("Remote config loaded ({} {})", config.game_name, config.game_version);
                return Ok(config);
            }
            Err(e) => {
                warn!("Remote config unavailable: {}", e);
                e
            }
        };

        match self.load_local().await {
            Ok(config) => {
                info!("Using local config fallback at {:?}", self.local_path);
                Ok(config)
            }
            Err(local_err) => {
                error!("No configuration available: remote={remote_err}, local={local_err}");
                Err(InstallerError::ConfigUnavailable {
                    remote: remote_err.to_string(),
                    local: local_err.to_string(),
                })
            }
        }
    }
}

async fn read_local_config(path: &Path) -> InstallerResult<RemoteConfig> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| InstallerError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    let mut config: RemoteConfig = serde_json::from_str(&raw)?;
    config.origin = ConfigOrigin::Local;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::Router;

    use super::*;
    use crate::core::test_support::{self, TestServer};

    const CONFIG_JSON: &str = r#"{
        "game_name": "Exo",
        "exe_name": "Silkroad.exe",
        "game_version": "1.2.0",
        "client_url": "http://cdn.example.com/Exo.zip"
    }"#;

    async fn server() -> TestServer {
        let router = Router::new()
            .route("/config.json", get(|| async { CONFIG_JSON }))
            .route("/broken.json", get(|| async { "<html>oops</html>" }))
            .route(
                "/missing.json",
                get(|| async { (StatusCode::NOT_FOUND, CONFIG_JSON) }),
            );
        test_support::serve(router).await
    }

    fn resolver(url: String, local_path: PathBuf) -> ConfigResolver {
        let client = build_config_client(Duration::from_secs(10)).unwrap();
        ConfigResolver::new(client, url, local_path)
    }

    fn write_local(dir: &Path) -> PathBuf {
        let path = dir.join("config.json");
        std::fs::write(&path, CONFIG_JSON.replace("1.2.0", "1.1.9")).unwrap();
        path
    }

    #[tokio::test]
    async fn remote_success_is_tagged_remote() {
        let server = server().await;
        let dir = tempfile::tempdir().unwrap();
        let local = write_local(dir.path());

        let config = resolver(server.url("/config.json"), local)
            .resolve()
            .await
            .unwrap();
        assert_eq!(config.origin, ConfigOrigin::Remote);
        assert_eq!(config.game_version, "1.2.0");
    }

    #[tokio::test]
    async fn malformed_remote_body_falls_back_to_local() {
        let server = server().await;
        let dir = tempfile::tempdir().unwrap();
        let local = write_local(dir.path());

        let config = resolver(server.url("/broken.json"), local)
            .resolve()
            .await
            .unwrap();
        assert_eq!(config.origin, ConfigOrigin::Local);
        assert_eq!(config.game_version, "1.1.9");
    }

    #[tokio::test]
    async fn http_error_falls_back_to_local() {
        let server = server().await;
        let dir = tempfile::tempdir().unwrap();
        let local = write_local(dir.path());

        let config = resolver(server.url("/missing.json"), local)
            .resolve()
            .await
            .unwrap();
        assert_eq!(config.origin, ConfigOrigin::Local);
    }

    #[tokio::test]
    async fn unreachable_remote_and_no_local_is_config_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let url = test_support::unreachable_url("/config.json").await;

        let err = resolver(url, dir.path().join("absent.json"))
            .resolve()
            .await
            .unwrap_err();
        assert!(matches!(err, InstallerError::ConfigUnavailable { .. }));
    }
}
