use std::env;
use std::ffi::OsString;
use std::fs;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// 指定配置文件路径的环境变量。
pub const CONFIG_ENV_VAR: &str = "SPRAY_CONFIG";

/// 应用配置的根结构。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub path: PathConfig,
    #[serde(default)]
    pub passes: PassConfig,
}

impl AppConfig {
    /// 从显式路径加载配置。
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate().map_err(|message| ConfigError::Invalid {
            path: path.to_path_buf(),
            message,
        })?;
        Ok(config)
    }

    /// 检查数值参数的取值范围，返回第一条不满足的说明。
    pub fn validate(&self) -> Result<(), String> {
        self.path.validate()
    }

    /// 自动发现配置文件：优先读取环境变量 `SPRAY_CONFIG`，否则寻找 `./config/default.toml`。
    /// 若文件缺失，则返回默认配置。
    pub fn discover() -> Result<Self, ConfigError> {
        let working_dir = env::current_dir().map_err(|source| ConfigError::Context {
            message: "获取当前工作目录失败".to_string(),
            source,
        })?;
        Self::discover_in(env::var_os(CONFIG_ENV_VAR), &working_dir)
    }

    fn discover_in(env_path: Option<OsString>, working_dir: &Path) -> Result<Self, ConfigError> {
        if let Some(path) = env_path {
            return Self::from_file(PathBuf::from(path));
        }

        let default_path = working_dir.join("config").join("default.toml");
        if default_path.exists() {
            Self::from_file(default_path)
        } else {
            Ok(Self::default())
        }
    }
}

/// 日志配置，支持设置默认等级。
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

/// 轨迹离散化参数。
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PathConfig {
    /// 圆弧/整圆的角度步长（度）。
    #[serde(default = "PathConfig::default_resolution")]
    pub resolution_degrees: f64,
    /// 方向指示箭头长度。
    #[serde(default = "PathConfig::default_indicator_length")]
    pub indicator_length: f64,
}

impl PathConfig {
    /// 允许的角度步长范围（度）。更小的步长会产生过多的离散点。
    pub const RESOLUTION_RANGE: RangeInclusive<f64> = 0.01..=360.0;

    fn validate(&self) -> Result<(), String> {
        if !Self::RESOLUTION_RANGE.contains(&self.resolution_degrees) {
            return Err(format!(
                "path.resolution_degrees 必须在 {} 到 {} 之间（当前：{}）",
                Self::RESOLUTION_RANGE.start(),
                Self::RESOLUTION_RANGE.end(),
                self.resolution_degrees
            ));
        }
        if !(self.indicator_length.is_finite() && self.indicator_length >= 0.0) {
            return Err(format!(
                "path.indicator_length 必须是非负有限值（当前：{}）",
                self.indicator_length
            ));
        }
        Ok(())
    }

    fn default_resolution() -> f64 {
        5.0
    }

    fn default_indicator_length() -> f64 {
        10.0
    }
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            resolution_degrees: Self::default_resolution(),
            indicator_length: Self::default_indicator_length(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PassConfig {
    /// 新道次的默认名称前缀，实际名称为 `<前缀> <序号>`。
    #[serde(default = "PassConfig::default_pass_name")]
    pub default_pass_name: String,
    #[serde(default = "PassConfig::default_product_name")]
    pub default_product_name: String,
}

impl PassConfig {
    fn default_pass_name() -> String {
        "Pass".to_string()
    }

    fn default_product_name() -> String {
        "Untitled".to_string()
    }
}

impl Default for PassConfig {
    fn default() -> Self {
        Self {
            default_pass_name: Self::default_pass_name(),
            default_product_name: Self::default_product_name(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("读取配置文件 {path:?} 失败: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("解析配置文件 {path:?} 失败: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("配置文件 {path:?} 无效: {message}")]
    Invalid { path: PathBuf, message: String },
    #[error("{message}")]
    Context {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_returned_when_file_missing() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let cfg = AppConfig::discover_in(None, dir.path()).expect("discover should succeed");
        assert_eq!(cfg.logging.level, "info");
        assert_eq!(cfg.path.resolution_degrees, 5.0);
        assert_eq!(cfg.path.indicator_length, 10.0);
        assert_eq!(cfg.passes.default_pass_name, "Pass");
        assert_eq!(cfg.passes.default_product_name, "Untitled");
    }

    #[test]
    fn load_from_temp_file() {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        writeln!(
            file,
            r#"
            [logging]
            level = "debug"

            [path]
            resolution_degrees = 2.5

            [passes]
            default_pass_name = "Coat"
            "#
        )
        .unwrap();

        let cfg = AppConfig::from_file(file.path()).expect("load config");
        assert_eq!(cfg.logging.level, "debug");
        assert_eq!(cfg.path.resolution_degrees, 2.5);
        assert_eq!(cfg.path.indicator_length, 10.0);
        assert_eq!(cfg.passes.default_pass_name, "Coat");
        assert_eq!(cfg.passes.default_product_name, "Untitled");
    }

    #[test]
    fn discovery_prefers_env_path_then_working_dir() {
        let dir = tempfile::tempdir().expect("create temp dir");
        fs::create_dir(dir.path().join("config")).unwrap();
        fs::write(
            dir.path().join("config").join("default.toml"),
            "[logging]\nlevel = \"warn\"\n",
        )
        .unwrap();
        let cfg = AppConfig::discover_in(None, dir.path()).unwrap();
        assert_eq!(cfg.logging.level, "warn");

        let explicit = dir.path().join("explicit.toml");
        fs::write(&explicit, "[path]\nindicator_length = 4.0\n").unwrap();
        let cfg = AppConfig::discover_in(Some(explicit.into_os_string()), dir.path()).unwrap();
        assert_eq!(cfg.logging.level, "info");
        assert_eq!(cfg.path.indicator_length, 4.0);
    }

    #[test]
    fn parse_errors_carry_the_path() {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        writeln!(file, "[path]\nresolution_degrees = \"fine\"").unwrap();
        let err = AppConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { ref path, .. } if path == file.path()));

        let missing = AppConfig::discover_in(Some("/definitely/not/here.toml".into()), Path::new("."));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn out_of_range_path_settings_are_rejected() {
        for body in [
            "[path]\nresolution_degrees = 1e-9\n",
            "[path]\nresolution_degrees = 0.0\n",
            "[path]\nresolution_degrees = -5.0\n",
            "[path]\nresolution_degrees = 720.0\n",
            "[path]\nresolution_degrees = nan\n",
            "[path]\nresolution_degrees = inf\n",
            "[path]\nindicator_length = -1.0\n",
        ] {
            let mut file = tempfile::NamedTempFile::new().expect("create temp file");
            write!(file, "{body}").unwrap();
            let err = AppConfig::from_file(file.path()).unwrap_err();
            assert!(
                matches!(err, ConfigError::Invalid { ref path, .. } if path == file.path()),
                "{body}: {err}"
            );
        }
    }

    #[test]
    fn resolution_range_bounds_are_accepted() {
        for value in ["0.01", "360.0"] {
            let mut file = tempfile::NamedTempFile::new().expect("create temp file");
            write!(file, "[path]\nresolution_degrees = {value}\nindicator_length = 0.0\n").unwrap();
            assert!(AppConfig::from_file(file.path()).is_ok(), "{value}");
        }
        assert!(AppConfig::default().validate().is_ok());
    }
}
