//! Template and logo providers.

use crate::error::{ReportError, Result};

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::OnceCell;
use tracing::debug;

/// Supplies the two-page template PDF and an optional PNG logo.
///
/// Implementations may cache across calls.
#[async_trait(?Send)]
pub trait AssetProvider {
    async fn template(&self) -> Result<Vec<u8>>;
    async fn logo(&self) -> Result<Option<Vec<u8>>>;
}

/// Assets held in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticAssets {
    template: Vec<u8>,
    logo: Option<Vec<u8>>,
}

impl StaticAssets {
    pub fn new(template: Vec<u8>) -> Self {
        Self {
            template,
            logo: None,
        }
    }

    pub fn with_logo(mut self, logo: Vec<u8>) -> Self {
        self.logo = Some(logo);
        self
    }
}

#[async_trait(?Send)]
impl AssetProvider for StaticAssets {
    async fn template(&self) -> Result<Vec<u8>> {
        Ok(self.template.clone())
    }

    async fn logo(&self) -> Result<Option<Vec<u8>>> {
        Ok(self.logo.clone())
    }
}

/// Assets read from disk on first use and cached afterwards.
#[derive(Debug)]
pub struct FileAssets {
    template_path: PathBuf,
    logo_path: Option<PathBuf>,
    template: OnceCell<Vec<u8>>,
    logo: OnceCell<Option<Vec<u8>>>,
}

impl FileAssets {
    pub fn new(template_path: impl Into<PathBuf>) -> Self {
        Self {
            template_path: template_path.into(),
            logo_path: None,
            template: OnceCell::new(),
            logo: OnceCell::new(),
        }
    }

    pub fn with_logo(mut self, logo_path: impl Into<PathBuf>) -> Self {
        self.logo_path = Some(logo_path.into());
        self
    }

    pub fn template_path(&self) -> &Path {
        &self.template_path
    }
}

async fn read_asset(path: &Path) -> Result<Vec<u8>> {
    debug!(path = %path.display(), "Loading report asset");
    tokio::fs::read(path).await.map_err(|e| {
        ReportError::Io(std::io::Error::new(
            e.kind(),
            format!("{}: {}", path.display(), e),
        ))
    })
}

#[async_trait(?Send)]
impl AssetProvider for FileAssets {
    async fn template(&self) -> Result<Vec<u8>> {
        let bytes = self
            .template
            .get_or_try_init(|| read_asset(&self.template_path))
            .await?;
        Ok(bytes.clone())
    }

    async fn logo(&self) -> Result<Option<Vec<u8>>> {
        let logo = self
            .logo
            .get_or_try_init(|| async {
                match &self.logo_path {
                    Some(path) => read_asset(path).await.map(Some),
                    None => Ok(None),
                }
            })
            .await?;
        Ok(logo.clone())
    }
}
