use crate::core::comparator::{ChangeDetector, TransferDecision};
use crate::core::entry::RemoteEntry;
use crate::core::reporter::{MessageKind, Reporter};
use crate::core::scanner::RemoteLister;
use crate::core::target::SyncTarget;
use crate::core::transfer::{RetryPolicy, TransferEngine, TransferResult, TransferStatus};
use crate::error::{SyncError, SyncResult};
use crate::storage::{LocalStorage, RemoteStorage};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use uuid::Uuid;

/// 同步配置
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// 获取下载流失败时的最大重试次数，0 表示不重试
    pub max_retries: u32,
    /// 重试基础延迟（毫秒）
    pub retry_base_delay_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            retry_base_delay_ms: 2000,
        }
    }
}

/// 一次运行的最终状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SyncStatus {
    Completed,
    /// 远程目录为空，没有任何条目需要处理
    NothingToDownload,
    Aborted,
    Cancelled,
}

/// 同步报告
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub run_id: Uuid,
    pub status: SyncStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub files_listed: usize,
    pub files_downloaded: usize,
    pub files_skipped: usize,
    pub bytes_transferred: u64,
    pub results: Vec<TransferResult>,
}

impl SyncReport {
    fn new(run_id: Uuid, started_at: DateTime<Utc>, files_listed: usize) -> Self {
        Self {
            run_id,
            status: SyncStatus::Completed,
            started_at,
            finished_at: started_at,
            files_listed,
            files_downloaded: 0,
            files_skipped: 0,
            bytes_transferred: 0,
            results: Vec::new(),
        }
    }

    fn record(&mut self, result: TransferResult) {
        match result.status {
            TransferStatus::Completed => {
                self.files_downloaded += 1;
                self.bytes_transferred += result.bytes_written;
            }
            TransferStatus::Skipped => self.files_skipped += 1,
            TransferStatus::Failed => {}
        }
        self.results.push(result);
    }

    fn finish(mut self, status: SyncStatus) -> Self {
        self.status = status;
        self.finished_at = Utc::now();
        self
    }
}

/// 同步引擎
///
/// 一次运行在单个连接上顺序执行：列表 → 逐个判断 → 下载。
/// 列表之后任何一个文件失败都会中止整个运行，剩余条目不再尝试。
pub struct SyncEngine {
    storage: Arc<dyn RemoteStorage>,
    reporter: Reporter,
    config: SyncConfig,
    cancel: CancellationToken,
}

impl SyncEngine {
    pub fn new(storage: Arc<dyn RemoteStorage>, reporter: Reporter) -> Self {
        Self::with_config(storage, reporter, SyncConfig::default())
    }

    pub fn with_config(
        storage: Arc<dyn RemoteStorage>,
        reporter: Reporter,
        config: SyncConfig,
    ) -> Self {
        Self {
            storage,
            reporter,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// 使用外部的取消令牌
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// 取消令牌，可在其他任务中调用 `cancel()`
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// 取消同步
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// 只列表和比较，不修改本地文件系统
    pub async fn plan(&self, target: &SyncTarget) -> SyncResult<Vec<TransferDecision>> {
        let entries = RemoteLister::with_cancel(self.cancel.clone())
            .list(self.storage.as_ref(), target)
            .await?;
        let detector = ChangeDetector::for_target(target);

        let mut decisions = Vec::with_capacity(entries.len());
        for entry in &entries {
            decisions.push(detector.decide(entry, target).await?);
        }
        Ok(decisions)
    }

    /// 计划并通过终端输出每个决定，不下载
    pub async fn preview(&self, target: &SyncTarget) -> SyncResult<Vec<TransferDecision>> {
        let decisions = self.plan(target).await?;

        if decisions.is_empty() {
            self.reporter.emit("Nothing to download", MessageKind::Info);
            return Ok(decisions);
        }

        let pending = decisions.iter().filter(|d| d.should_download).count();
        self.reporter.emit(
            format!(
                "Files ({}/{}) from {} would be downloaded to {}",
                pending,
                decisions.len(),
                target.remote_root(),
                target.local_root().display()
            ),
            MessageKind::Info,
        );
        for decision in &decisions {
            if decision.should_download {
                self.reporter.emit(
                    format!(
                        "+ {} -> {}",
                        decision.entry.path,
                        decision.destination.display()
                    ),
                    MessageKind::Added,
                );
            } else {
                self.reporter.emit(
                    format!("= {} is up to date", decision.entry.path),
                    MessageKind::Info,
                );
            }
        }

        Ok(decisions)
    }

    /// 运行同步任务
    pub async fn run(&self, target: &SyncTarget) -> SyncResult<SyncReport> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let remote_root = target.remote_root().to_string();

        info!(
            "开始同步任务: {} -> {} ({})",
            remote_root,
            target.local_root().display(),
            run_id
        );

        // 任何退出路径都会恢复光标
        let _cursor = self.reporter.hide_cursor();

        let entries = match RemoteLister::with_cancel(self.cancel.clone())
            .list(self.storage.as_ref(), target)
            .await
        {
            Ok(entries) => entries,
            Err(e) => {
                error!("列出远程目录失败: {}", e);
                self.reporter.emit(
                    format!("Failed to list {}: {}", remote_root, e),
                    MessageKind::Warning,
                );
                return Err(e);
            }
        };

        let mut report = SyncReport::new(run_id, started_at, entries.len());

        if entries.is_empty() {
            info!("远程目录为空，无需下载: {}", remote_root);
            self.reporter.emit("Nothing to download", MessageKind::Info);
            return Ok(report.finish(SyncStatus::NothingToDownload));
        }

        self.reporter.emit(
            format!(
                "Files ({}) from {} start downloading to {}",
                entries.len(),
                remote_root,
                target.local_root().display()
            ),
            MessageKind::Info,
        );

        let detector = ChangeDetector::for_target(target);
        let transfer = TransferEngine::new(
            self.storage.clone(),
            LocalStorage::new(target.local_root()),
            self.reporter.clone(),
        )
        .with_retry(RetryPolicy {
            max_retries: self.config.max_retries,
            base_delay: Duration::from_millis(self.config.retry_base_delay_ms),
        })
        .with_cancel(self.cancel.clone());

        let total = entries.len();
        for (i, entry) in entries.iter().enumerate() {
            if self.cancel.is_cancelled() {
                return Err(self.abort(report, entry, None, SyncError::Cancelled));
            }

            let decision = match detector.decide(entry, target).await {
                Ok(decision) => decision,
                Err(e) => return Err(self.abort(report, entry, None, e)),
            };

            if !decision.should_download {
                debug!("文件未变化，跳过: {}", entry.path);
                self.reporter.emit(
                    format!("= ({}/{}) {} is up to date", i + 1, total, entry.path),
                    MessageKind::Info,
                );
                report.record(TransferResult::skipped(entry.clone(), decision.destination));
                continue;
            }

            debug!("需要下载: {} ({:?})", entry.path, decision.reason);
            self.reporter
                .emit(format!("- {}", entry.path), MessageKind::Removed);

            match transfer.transfer(entry, &decision.destination).await {
                Ok(result) => {
                    self.reporter.emit(
                        format!(
                            "+ ({}/{}) {} -> {}",
                            i + 1,
                            total,
                            entry.path,
                            decision.destination.display()
                        ),
                        MessageKind::Added,
                    );
                    report.record(result);
                }
                Err(e) => return Err(self.abort(report, entry, Some(decision), e)),
            }
        }

        self.reporter.emit("Files downloaded", MessageKind::Success);
        let report = report.finish(SyncStatus::Completed);

        info!(
            "同步任务完成: {} - 下载 {}, 跳过 {}, {} 字节",
            run_id, report.files_downloaded, report.files_skipped, report.bytes_transferred
        );

        Ok(report)
    }

    /// 记录失败条目并生成中止错误
    fn abort(
        &self,
        mut report: SyncReport,
        entry: &RemoteEntry,
        decision: Option<TransferDecision>,
        error: SyncError,
    ) -> SyncError {
        let status = if matches!(error, SyncError::Cancelled) {
            SyncStatus::Cancelled
        } else {
            SyncStatus::Aborted
        };

        if let Some(decision) = decision {
            report.record(TransferResult::failed(entry.clone(), decision.destination));
        }

        error!(
            "同步任务中止: {} - {} (已下载 {})",
            report.run_id, error, report.files_downloaded
        );
        self.reporter
            .emit(format!("! {}: {}", entry.path, error), MessageKind::Warning);

        SyncError::Aborted {
            report: Box::new(report.finish(status)),
            source: Box::new(error),
        }
    }
}
