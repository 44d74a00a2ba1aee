//! 本地文件系统物化
//!
//! 引擎对本地文件系统的全部写操作都经过这里：创建父目录、删除旧文件、追加写入。

use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// 以同步根目录为基准的本地存储
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// 同步根目录是否存在
    pub async fn root_exists(&self) -> bool {
        fs::metadata(&self.base_path)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }

    /// 本地文件字节长度，不存在时返回 `None`
    pub async fn file_len(&self, path: &Path) -> io::Result<Option<u64>> {
        match fs::metadata(path).await {
            Ok(metadata) if metadata.is_file() => Ok(Some(metadata.len())),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// 创建所有缺失的上级目录
    pub async fn ensure_parents(&self, path: &Path) -> io::Result<()> {
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent).await,
            _ => Ok(()),
        }
    }

    /// 删除文件，文件不存在时视为成功
    pub async fn remove_if_exists(&self, path: &Path) -> io::Result<()> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// 以追加模式打开文件，不存在时创建
    pub async fn open_append(&self, path: &Path) -> io::Result<AppendFile> {
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        Ok(AppendFile {
            file,
            path: path.to_path_buf(),
            written: 0,
        })
    }
}

/// 追加写入句柄，按调用顺序写入数据块
#[derive(Debug)]
pub struct AppendFile {
    file: fs::File,
    path: PathBuf,
    written: u64,
}

impl AppendFile {
    pub async fn append(&mut self, block: &[u8]) -> io::Result<()> {
        self.file.write_all(block).await?;
        self.written += block.len() as u64;
        Ok(())
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 刷盘并关闭，返回写入的总字节数
    pub async fn finish(mut self) -> io::Result<u64> {
        self.file.flush().await?;
        self.file.sync_all().await?;
        Ok(self.written)
    }
}
