use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use spray_config::{AppConfig, ConfigError};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

mod cli;

/// 喷涂道次编辑工具（批处理模式）。
#[derive(Debug, Parser)]
#[command(name = "spray-app", version, about = "导入图纸、编辑喷涂道次并保存配置")]
pub struct Args {
    /// 应用配置文件（TOML）。
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// 要导入的 DXF 图纸。
    #[arg(long)]
    pub drawing: Option<PathBuf>,
    /// 要加载的喷涂配置（JSON）。
    #[arg(long)]
    pub load: Option<PathBuf>,
    /// 执行完命令后保存喷涂配置的位置。
    #[arg(long)]
    pub save: Option<PathBuf>,
    /// 产品名称。
    #[arg(long)]
    pub product: Option<String>,
    /// 依次执行的命令，例如 `--command "toggle_entity 0"`。
    #[arg(long = "command", value_name = "COMMAND")]
    pub commands: Vec<String>,
}

fn main() -> ExitCode {
    let args = Args::parse();
    let config = load_configuration(args.config.clone());
    init_logging(&config);
    info!("启动喷涂轨迹工具");

    match cli::run(&args, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "执行失败");
            eprintln!("错误：{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn load_configuration(override_path: Option<PathBuf>) -> AppConfig {
    match override_path {
        Some(path) => AppConfig::from_file(&path).unwrap_or_else(|err| {
            warn!(path = %path.display(), error = %err, "加载指定配置失败，使用默认配置");
            AppConfig::default()
        }),
        None => match AppConfig::discover() {
            Ok(cfg) => cfg,
            Err(err) => {
                match &err {
                    ConfigError::Io { path, .. }
                    | ConfigError::Parse { path, .. }
                    | ConfigError::Invalid { path, .. } => {
                        warn!(path = %path.display(), error = %err, "加载默认配置失败，使用内建默认值");
                    }
                    ConfigError::Context { .. } => {
                        warn!(error = %err, "加载默认配置失败，使用内建默认值");
                    }
                }
                AppConfig::default()
            }
        },
    }
}

fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_new(config.logging.level.clone()).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if subscriber.try_init().is_err() {
        // 已初始化，忽略
    }
}
