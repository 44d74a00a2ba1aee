use super::entry::RemoteEntry;
use super::target::SyncTarget;
use crate::error::{SyncError, SyncResult};
use crate::storage::RemoteStorage;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// 远程列表器：递归列出远程目录并过滤出需要比较的文件
///
/// 过滤顺序：目录 → 排除的扩展名 → 同步根自身。结果保持远程列表的原始顺序。
#[derive(Debug, Clone, Default)]
pub struct RemoteLister {
    cancel: CancellationToken,
}

impl RemoteLister {
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建带取消令牌的列表器
    pub fn with_cancel(cancel: CancellationToken) -> Self {
        Self { cancel }
    }

    pub async fn list(
        &self,
        storage: &dyn RemoteStorage,
        target: &SyncTarget,
    ) -> SyncResult<Vec<RemoteEntry>> {
        if self.cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }

        let root = target.remote_root().to_string();
        info!("开始列出远程目录: {} ({})", root, storage.name());

        let listing = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(SyncError::Cancelled),
            result = storage.list_files(&root) => {
                result.map_err(|e| SyncError::Connection(format!("{:#}", e)))?
            }
        };
        info!("list_files 返回 {} 个条目", listing.len());

        let mut entries = Vec::new();
        let mut dir_count = 0;
        let mut excluded_count = 0;

        for entry in listing.into_iter().map(RemoteEntry::from) {
            if !entry.is_file() {
                dir_count += 1;
                continue;
            }

            if target.is_excluded(&entry.path) {
                debug!("排除文件: {}", entry.path);
                excluded_count += 1;
                continue;
            }

            // 某些服务器会把根目录自身作为一条记录返回
            if &entry.path == target.remote_root() {
                debug!("跳过根目录自身: {}", entry.path);
                continue;
            }

            entries.push(entry);
        }

        info!(
            "列表完成: {} 个文件, {} 个目录, {} 个被排除",
            entries.len(),
            dir_count,
            excluded_count
        );

        Ok(entries)
    }
}
