//! 远程条目模型

use crate::storage::FileInfo;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// 远程路径，按段存储，不含空段
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RemotePath(Vec<String>);

impl RemotePath {
    /// 从 `/` 分隔的字符串解析
    pub fn parse(path: &str) -> Self {
        Self(
            crate::storage::normalize_remote_path(path)
                .split('/')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn file_name(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// 扩展名（不含点），`.bashrc` 这类隐藏文件没有扩展名
    pub fn extension(&self) -> Option<&str> {
        let name = self.file_name()?;
        let (stem, ext) = name.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            None
        } else {
            Some(ext)
        }
    }

    pub fn starts_with(&self, prefix: &RemotePath) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// 去掉前缀段；不以该前缀开头时返回原路径
    pub fn strip_prefix(&self, prefix: &RemotePath) -> RemotePath {
        if self.starts_with(prefix) {
            RemotePath(self.0[prefix.0.len()..].to_vec())
        } else {
            self.clone()
        }
    }

    /// 转为本地相对路径
    pub fn to_relative_path(&self) -> PathBuf {
        self.0.iter().collect()
    }
}

impl fmt::Display for RemotePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}

/// 一次同步中列表得到的远程条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteEntry {
    /// 相对服务器根的完整路径（包含同步根自身的段）
    pub path: RemotePath,
    pub kind: EntryKind,
    pub size: u64,
}

impl RemoteEntry {
    pub fn file(path: &str, size: u64) -> Self {
        Self {
            path: RemotePath::parse(path),
            kind: EntryKind::File,
            size,
        }
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }
}

impl From<FileInfo> for RemoteEntry {
    fn from(info: FileInfo) -> Self {
        Self {
            path: RemotePath::parse(&info.path),
            kind: if info.is_dir {
                EntryKind::Directory
            } else {
                EntryKind::File
            },
            size: info.size,
        }
    }
}
