//! 单文件传输：获取下载流、删除旧文件、按块追加写入并报告进度

use super::entry::RemoteEntry;
use super::reporter::{MessageKind, Reporter};
use crate::error::{SyncError, SyncResult};
use crate::storage::{BlockStream, LocalStorage, RemoteStorage};
use futures::StreamExt;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

/// 传输结果状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferStatus {
    Completed,
    Skipped,
    Failed,
}

impl std::fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransferStatus::Completed => write!(f, "completed"),
            TransferStatus::Skipped => write!(f, "skipped"),
            TransferStatus::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferResult {
    pub entry: RemoteEntry,
    pub destination: PathBuf,
    pub bytes_written: u64,
    pub status: TransferStatus,
}

impl TransferResult {
    pub fn skipped(entry: RemoteEntry, destination: PathBuf) -> Self {
        Self {
            entry,
            destination,
            bytes_written: 0,
            status: TransferStatus::Skipped,
        }
    }

    pub fn failed(entry: RemoteEntry, destination: PathBuf) -> Self {
        Self {
            entry,
            destination,
            bytes_written: 0,
            status: TransferStatus::Failed,
        }
    }
}

/// 获取下载流时的重试策略，默认不重试
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::from_millis(2000),
        }
    }
}

impl RetryPolicy {
    /// 指数退避
    pub fn delay(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2_u32.saturating_pow(attempt.min(16)))
    }
}

/// 进度百分比，预期大小为 0 时不计算
pub fn progress_percent(written: u64, expected: u64) -> Option<u64> {
    if expected == 0 {
        return None;
    }
    Some((u128::from(written) * 100 / u128::from(expected)) as u64)
}

/// 传输引擎
pub struct TransferEngine {
    storage: Arc<dyn RemoteStorage>,
    local: LocalStorage,
    reporter: Reporter,
    retry: RetryPolicy,
    cancel: CancellationToken,
}

impl TransferEngine {
    pub fn new(storage: Arc<dyn RemoteStorage>, local: LocalStorage, reporter: Reporter) -> Self {
        Self {
            storage,
            local,
            reporter,
            retry: RetryPolicy::default(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// 下载一个远程文件到 `destination`
    ///
    /// 中途失败或取消时删除已写入的部分文件，不会留下半截内容。
    pub async fn transfer(
        &self,
        entry: &RemoteEntry,
        destination: &Path,
    ) -> SyncResult<TransferResult> {
        let mut stream = self.acquire(entry).await?;

        self.local
            .remove_if_exists(destination)
            .await
            .map_err(|e| SyncError::filesystem(destination, e))?;
        self.local
            .ensure_parents(destination)
            .await
            .map_err(|e| SyncError::filesystem(destination, e))?;

        let mut file = self
            .local
            .open_append(destination)
            .await
            .map_err(|e| SyncError::filesystem(destination, e))?;

        loop {
            let block = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    drop(file);
                    self.discard_partial(destination).await;
                    return Err(SyncError::Cancelled);
                }
                block = stream.next() => block,
            };

            let Some(block) = block else {
                break;
            };

            let block = match block {
                Ok(block) => block,
                Err(e) => {
                    error!("读取数据块失败: {} - {:#}", entry.path, e);
                    drop(file);
                    self.discard_partial(destination).await;
                    return Err(SyncError::Download {
                        path: entry.path.to_string(),
                        detail: format!("{:#}", e),
                    });
                }
            };

            if let Err(e) = file.append(&block).await {
                drop(file);
                self.discard_partial(destination).await;
                return Err(SyncError::filesystem(destination, e));
            }

            if let Some(percent) = progress_percent(file.written(), entry.size) {
                self.reporter
                    .progress(format!("{} {}%", entry.path, percent), MessageKind::Info);
            }
        }

        // 关闭下载流
        drop(stream);

        let bytes_written = match file.finish().await {
            Ok(n) => n,
            Err(e) => {
                self.discard_partial(destination).await;
                return Err(SyncError::filesystem(destination, e));
            }
        };

        if bytes_written != entry.size {
            warn!(
                "文件大小与列表不一致: {} (列表={}, 实际={})",
                entry.path, entry.size, bytes_written
            );
        }
        debug!("写入完成: {} ({} 字节)", destination.display(), bytes_written);

        Ok(TransferResult {
            entry: entry.clone(),
            destination: destination.to_path_buf(),
            bytes_written,
            status: TransferStatus::Completed,
        })
    }

    /// 获取下载流，按策略重试
    async fn acquire(&self, entry: &RemoteEntry) -> SyncResult<BlockStream> {
        let path = entry.path.to_string();
        let mut attempt = 0;

        loop {
            let result = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(SyncError::Cancelled),
                result = self.storage.open_download(&path) => result,
            };

            match result {
                Ok(stream) => return Ok(stream),
                Err(e) if attempt < self.retry.max_retries => {
                    let delay = self.retry.delay(attempt);
                    warn!(
                        "打开下载流失败，{}ms 后重试 ({}/{}): {:#}",
                        delay.as_millis(),
                        attempt + 1,
                        self.retry.max_retries,
                        e
                    );
                    tokio::select! {
                        biased;
                        _ = self.cancel.cancelled() => return Err(SyncError::Cancelled),
                        _ = tokio::time::sleep(delay) => {}
                    }
                    attempt += 1;
                }
                Err(e) => {
                    error!("打开下载流失败: {} - {:#}", path, e);
                    return Err(SyncError::StreamAcquisition {
                        path,
                        detail: format!("{:#}", e),
                    });
                }
            }
        }
    }

    async fn discard_partial(&self, destination: &Path) {
        if let Err(e) = self.local.remove_if_exists(destination).await {
            warn!("删除未完成文件失败: {} - {}", destination.display(), e);
        }
    }
}
