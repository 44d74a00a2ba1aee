use super::entry::{RemoteEntry, RemotePath};
use crate::error::{SyncError, SyncResult};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// 一次同步运行的目标，构造后不再修改
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncTarget {
    remote_root: RemotePath,
    local_root: PathBuf,
    /// 不含前导点的扩展名
    excluded_extensions: BTreeSet<String>,
    preserve_root_segment: bool,
}

impl SyncTarget {
    /// 相对的本地目录在构造时按当前工作目录解析为绝对路径
    pub fn new(remote_root: &str, local_root: impl AsRef<Path>) -> SyncResult<Self> {
        let local_root = local_root.as_ref();
        let local_root = if local_root.is_absolute() {
            local_root.to_path_buf()
        } else {
            std::env::current_dir()
                .map_err(|e| SyncError::filesystem(local_root, e))?
                .join(local_root)
        };

        Ok(Self {
            remote_root: RemotePath::parse(remote_root),
            local_root,
            excluded_extensions: BTreeSet::new(),
            preserve_root_segment: true,
        })
    }

    /// 排除的扩展名，`.log` 与 `log` 等价，大小写敏感
    pub fn exclude_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.excluded_extensions = extensions
            .into_iter()
            .map(|e| e.as_ref().trim().trim_start_matches('.').to_string())
            .filter(|e| !e.is_empty())
            .collect();
        self
    }

    /// `false` 时去掉远程根目录自身的路径段
    pub fn preserve_root_segment(mut self, preserve: bool) -> Self {
        self.preserve_root_segment = preserve;
        self
    }

    pub fn remote_root(&self) -> &RemotePath {
        &self.remote_root
    }

    pub fn local_root(&self) -> &Path {
        &self.local_root
    }

    pub fn preserves_root_segment(&self) -> bool {
        self.preserve_root_segment
    }

    pub fn is_excluded(&self, path: &RemotePath) -> bool {
        path.extension()
            .map(|ext| self.excluded_extensions.contains(ext))
            .unwrap_or(false)
    }

    /// 远程条目对应的本地文件路径
    pub fn local_path_for(&self, entry: &RemoteEntry) -> PathBuf {
        let relative = if self.preserve_root_segment {
            entry.path.clone()
        } else {
            entry.path.strip_prefix(&self.remote_root)
        };
        self.local_root.join(relative.to_relative_path())
    }
}
