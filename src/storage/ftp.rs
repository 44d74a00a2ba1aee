use super::{BlockStream, FileInfo, RemoteStorage};
use crate::config::ConnectionConfig;
use anyhow::Result;
use async_trait::async_trait;
use futures::TryStreamExt;
use opendal::{layers::TimeoutLayer, Metakey, Operator};
use std::time::Duration;

/// 基于 opendal FTP 服务的远程存储
///
/// 同一个 `Operator` 承载整个同步运行，列表与下载按顺序进行。
pub struct FtpStorage {
    operator: Operator,
    name: String,
}

impl FtpStorage {
    pub fn new(config: &ConnectionConfig) -> Result<Self> {
        use opendal::services::Ftp;

        let endpoint = config.endpoint();
        let builder = Ftp::default()
            .endpoint(&endpoint)
            .user(&config.user)
            .password(&config.password);

        // 超时由连接层负责，引擎自身不设截止时间
        let operator = Operator::new(builder)?
            .layer(
                TimeoutLayer::default()
                    .with_timeout(Duration::from_secs(config.op_timeout_secs))
                    .with_io_timeout(Duration::from_secs(config.io_timeout_secs)),
            )
            .finish();

        let name = format!("{}@{}", config.user, endpoint);
        tracing::info!("初始化FTP存储: {}", name);

        Ok(Self { operator, name })
    }

    /// 使用现成的 `Operator`（例如内存服务）
    pub fn from_operator(operator: Operator, name: impl Into<String>) -> Self {
        Self {
            operator,
            name: name.into(),
        }
    }

    fn list_path(root: &str) -> String {
        let root = super::normalize_remote_path(root);
        if root.is_empty() {
            "/".to_string()
        } else {
            format!("{}/", root)
        }
    }
}

#[async_trait]
impl RemoteStorage for FtpStorage {
    async fn list_files(&self, root: &str) -> Result<Vec<FileInfo>> {
        let mut files = Vec::new();

        let mut lister = self
            .operator
            .lister_with(&Self::list_path(root))
            .recursive(true)
            .metakey(Metakey::ContentLength | Metakey::Mode)
            .await?;

        while let Some(entry) = lister.try_next().await? {
            let meta = entry.metadata();
            files.push(FileInfo {
                path: entry.path().trim_start_matches('/').to_string(),
                size: if meta.is_dir() { 0 } else { meta.content_length() },
                is_dir: meta.is_dir(),
            });
        }

        tracing::debug!("{} 列表返回 {} 个条目", self.name, files.len());
        Ok(files)
    }

    async fn open_download(&self, path: &str) -> Result<BlockStream> {
        let reader = self.operator.reader(path).await?;
        let stream = reader
            .into_bytes_stream(..)
            .await?
            .map_err(anyhow::Error::from);
        Ok(Box::pin(stream))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use opendal::services::Memory;

    async fn memory_storage() -> FtpStorage {
        let operator = Operator::new(Memory::default()).unwrap().finish();
        operator.write("data/a.txt", b"0123456789".to_vec()).await.unwrap();
        operator.write("data/sub/b.log", vec![7u8; 20]).await.unwrap();
        operator.write("other/c.txt", b"c".to_vec()).await.unwrap();
        FtpStorage::from_operator(operator, "memory")
    }

    #[test]
    fn list_path_always_ends_with_slash() {
        assert_eq!(FtpStorage::list_path("/data"), "data/");
        assert_eq!(FtpStorage::list_path("data/sub/"), "data/sub/");
        assert_eq!(FtpStorage::list_path(""), "/");
    }

    #[tokio::test]
    async fn lists_files_below_root_with_sizes() {
        let storage = memory_storage().await;

        let mut files: Vec<_> = storage
            .list_files("/data")
            .await
            .unwrap()
            .into_iter()
            .filter(|f| !f.is_dir)
            .collect();
        files.sort_by(|a, b| a.path.cmp(&b.path));

        assert_eq!(
            files,
            vec![
                FileInfo {
                    path: "data/a.txt".to_string(),
                    size: 10,
                    is_dir: false,
                },
                FileInfo {
                    path: "data/sub/b.log".to_string(),
                    size: 20,
                    is_dir: false,
                },
            ]
        );
    }

    #[tokio::test]
    async fn download_stream_yields_file_content() {
        let storage = memory_storage().await;

        let mut stream = storage.open_download("data/a.txt").await.unwrap();
        let mut content = Vec::new();
        while let Some(block) = stream.next().await {
            content.extend_from_slice(&block.unwrap());
        }

        assert_eq!(content, b"0123456789");
    }
}
