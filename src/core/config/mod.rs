pub mod model;
pub mod resolver;

use async_trait::async_trait;

use crate::core::error::InstallerResult;

pub use model::{ChangelogEntry, ConfigOrigin, RemoteConfig, DEFAULT_GAME_NAME};
pub use resolver::ConfigResolver;

/// Anything that can produce the game configuration for a session.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    async fn resolve(&self) -> InstallerResult<RemoteConfig>;
}
