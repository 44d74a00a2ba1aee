//! 同步错误类型
//!
//! 存储层统一返回 `anyhow::Result`，由引擎按所处阶段归类为 [`SyncError`]。

use crate::core::engine::SyncReport;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    /// 连接、认证或远程列表失败
    #[error("connection failed: {0}")]
    Connection(String),

    /// 服务器拒绝下载请求
    #[error("server rejected download of {path}: {detail}")]
    StreamAcquisition { path: String, detail: String },

    /// 数据流在传输途中中断
    #[error("download of {path} interrupted: {detail}")]
    Download { path: String, detail: String },

    #[error("filesystem error at {}: {source}", .path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("sync cancelled")]
    Cancelled,

    #[error("invalid configuration: {0}")]
    Config(String),

    /// 列表之后的失败会终止整个运行，附带已完成部分的报告
    #[error("sync aborted after {} file(s): {source}", .report.files_downloaded)]
    Aborted {
        report: Box<SyncReport>,
        #[source]
        source: Box<SyncError>,
    },
}

impl SyncError {
    pub(crate) fn filesystem(path: impl Into<PathBuf>, source: io::Error) -> Self {
        SyncError::Filesystem {
            path: path.into(),
            source,
        }
    }

    /// 返回导致中止的根本错误
    pub fn root_cause(&self) -> &SyncError {
        match self {
            SyncError::Aborted { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

pub type SyncResult<T> = Result<T, SyncError>;
