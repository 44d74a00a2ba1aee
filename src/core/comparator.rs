use super::entry::RemoteEntry;
use super::target::SyncTarget;
use crate::error::{SyncError, SyncResult};
use crate::storage::LocalStorage;
use serde::Serialize;
use std::path::PathBuf;

/// 需要（或不需要）下载的原因
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum DecisionReason {
    /// 本地同步根目录不存在
    LocalRootMissing,
    /// 本地文件不存在
    LocalFileMissing,
    /// 大小不同
    SizeMismatch { remote: u64, local: u64 },
    /// 大小相同，视为已是最新
    UpToDate,
}

/// 单个远程条目的下载决定
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferDecision {
    pub entry: RemoteEntry,
    pub destination: PathBuf,
    pub should_download: bool,
    pub reason: DecisionReason,
}

/// 变化检测器
///
/// 只比较字节长度：大小相同但内容不同的文件会被视为最新。
/// 不比较修改时间，也不计算内容哈希。
#[derive(Debug, Clone)]
pub struct ChangeDetector {
    local: LocalStorage,
}

impl ChangeDetector {
    pub fn new(local: LocalStorage) -> Self {
        Self { local }
    }

    pub fn for_target(target: &SyncTarget) -> Self {
        Self::new(LocalStorage::new(target.local_root()))
    }

    pub async fn decide(
        &self,
        entry: &RemoteEntry,
        target: &SyncTarget,
    ) -> SyncResult<TransferDecision> {
        let destination = target.local_path_for(entry);

        let reason = if !self.local.root_exists().await {
            DecisionReason::LocalRootMissing
        } else {
            match self
                .local
                .file_len(&destination)
                .await
                .map_err(|e| SyncError::filesystem(&destination, e))?
            {
                None => DecisionReason::LocalFileMissing,
                Some(local) if local != entry.size => DecisionReason::SizeMismatch {
                    remote: entry.size,
                    local,
                },
                Some(_) => DecisionReason::UpToDate,
            }
        };

        tracing::debug!("{} -> {:?}", entry.path, reason);

        Ok(TransferDecision {
            entry: entry.clone(),
            destination,
            should_download: reason != DecisionReason::UpToDate,
            reason,
        })
    }

    pub async fn should_download(
        &self,
        entry: &RemoteEntry,
        target: &SyncTarget,
    ) -> SyncResult<bool> {
        Ok(self.decide(entry, target).await?.should_download)
    }
}
