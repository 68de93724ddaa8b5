//! File-backed parameter store: parameter `/a/b/c` lives at `<root>/a/b/c`.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use crate::error::DirectoryError;
use crate::store::traits::ParameterStore;

pub struct FsParameterStore {
    root: PathBuf,
}

impl FsParameterStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn resolve_path(&self, name: &str) -> Result<PathBuf, DirectoryError> {
        let relative = Path::new(name.trim_start_matches('/'));
        let contained = !relative.as_os_str().is_empty()
            && relative.components().all(|c| matches!(c, Component::Normal(_)));
        if !contained {
            return Err(DirectoryError::InvalidName(name.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ParameterStore for FsParameterStore {
    async fn get_parameter(&self, name: &str) -> Result<String, DirectoryError> {
        let path = self.resolve_path(name)?;
        fs::read_to_string(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => DirectoryError::NotFound(name.to_string()),
            _ => DirectoryError::Io(e),
        })
    }
}
