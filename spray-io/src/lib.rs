use std::path::{Path, PathBuf};

use spray_core::drawing::Drawing;
use spray_core::pass::Configuration;
use thiserror::Error;

pub mod dxf;
pub mod persist;

pub use dxf::DxfFacade;
pub use persist::{JsonConfigurationFacade, load_or_default};

#[derive(Debug, Error)]
pub enum IoError {
    #[error("failed to read file {path:?}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write file {path:?}: {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid drawing structure: {0}")]
    InvalidDrawing(String),
    #[error("malformed persisted configuration: {0}")]
    MalformedConfiguration(String),
}

/// 图纸导入：把文件解析为带稳定实体 ID 的 [`Drawing`]。
pub trait DrawingLoader {
    fn load(&self, path: &Path) -> Result<Drawing, IoError>;
}

pub trait ConfigurationLoader {
    fn load(&self, path: &Path) -> Result<Configuration, IoError>;
}

pub trait ConfigurationSaver {
    fn save(&self, configuration: &Configuration, path: &Path) -> Result<(), IoError>;
}

fn read_file(path: &Path) -> Result<String, IoError> {
    std::fs::read_to_string(path).map_err(|source| IoError::ReadError {
        path: path.to_path_buf(),
        source,
    })
}
