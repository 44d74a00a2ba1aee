use std::sync::Arc;

pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod storage;

pub use config::{ConnectionConfig, Settings};
pub use self::core::{Reporter, SyncConfig, SyncEngine, SyncReport, SyncStatus, SyncTarget};
pub use error::{SyncError, SyncResult};

/// 连接 FTP 服务器并把 `target` 同步到本地
///
/// 使用默认的 [`SyncConfig`]（不重试）和标准输出终端。
pub async fn synchronize(
    connection: &ConnectionConfig,
    target: &SyncTarget,
    silent: bool,
) -> SyncResult<SyncReport> {
    let storage = storage::FtpStorage::new(connection)
        .map_err(|e| SyncError::Connection(format!("{:#}", e)))?;
    SyncEngine::new(Arc::new(storage), Reporter::new(silent))
        .run(target)
        .await
}
