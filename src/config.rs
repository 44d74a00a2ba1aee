//! 应用配置模块
//!
//! 配置文件为 JSON（camelCase），缺失的字段回退到默认值；
//! 运行开始后配置不再修改。

use crate::core::SyncTarget;
use crate::error::{SyncError, SyncResult};
use crate::logging::LogConfig;
use crate::storage::{IO_TIMEOUT_SECS, OP_TIMEOUT_SECS};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// FTP 连接配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_user")]
    pub user: String,
    #[serde(default)]
    pub password: String,
    /// 非 IO 操作超时（秒）
    #[serde(default = "default_op_timeout")]
    pub op_timeout_secs: u64,
    /// 数据流读取超时（秒）
    #[serde(default = "default_io_timeout")]
    pub io_timeout_secs: u64,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    21
}

fn default_user() -> String {
    "anonymous".to_string()
}

fn default_op_timeout() -> u64 {
    OP_TIMEOUT_SECS
}

fn default_io_timeout() -> u64 {
    IO_TIMEOUT_SECS
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            user: default_user(),
            password: String::new(),
            op_timeout_secs: default_op_timeout(),
            io_timeout_secs: default_io_timeout(),
        }
    }
}

impl ConnectionConfig {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            user: user.into(),
            password: password.into(),
            ..Default::default()
        }
    }

    /// opendal FTP 服务使用的 endpoint
    pub fn endpoint(&self) -> String {
        format!("ftp://{}:{}", self.host, self.port)
    }
}

/// 同步目标配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SyncSection {
    #[serde(default)]
    pub remote: String,
    #[serde(default = "default_local")]
    pub local: String,
    #[serde(default)]
    pub exclude_extensions: Vec<String>,
    #[serde(default = "default_preserve_root")]
    pub preserve_root_path: bool,
}

fn default_local() -> String {
    ".".to_string()
}

fn default_preserve_root() -> bool {
    true
}

impl Default for SyncSection {
    fn default() -> Self {
        Self {
            remote: String::new(),
            local: default_local(),
            exclude_extensions: Vec::new(),
            preserve_root_path: default_preserve_root(),
        }
    }
}

impl SyncSection {
    pub fn to_target(&self) -> SyncResult<SyncTarget> {
        if self.remote.trim().is_empty() {
            return Err(SyncError::Config("remote directory is required".to_string()));
        }
        Ok(SyncTarget::new(&self.remote, &self.local)?
            .exclude_extensions(self.exclude_extensions.iter().cloned())
            .preserve_root_segment(self.preserve_root_path))
    }
}

/// 完整配置文件
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub sync: SyncSection,
    #[serde(default)]
    pub silent: bool,
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default)]
    pub log: LogConfig,
}

impl Settings {
    /// 从配置文件加载
    pub fn load(config_file: &Path) -> SyncResult<Self> {
        let content =
            fs::read_to_string(config_file).map_err(|e| SyncError::filesystem(config_file, e))?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> SyncResult<Self> {
        serde_json::from_str(content).map_err(|e| SyncError::Config(e.to_string()))
    }
}
