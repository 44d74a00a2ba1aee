pub mod ftp;
pub mod local;

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;

pub use ftp::FtpStorage;
pub use local::{AppendFile, LocalStorage};

// ============ 公共常量 ============

/// 非 IO 操作超时（秒）- list, stat 等
pub const OP_TIMEOUT_SECS: u64 = 60;
/// IO 操作超时（秒）- 数据流读取
pub const IO_TIMEOUT_SECS: u64 = 300;

/// 远程列表中的一条记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// 相对服务器根的路径，不带前导 `/`，目录以 `/` 结尾
    pub path: String,
    pub size: u64,
    pub is_dir: bool,
}

/// 下载数据流，按到达顺序产出数据块
pub type BlockStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// 远程存储能力：递归列表 + 打开下载流
#[async_trait]
pub trait RemoteStorage: Send + Sync {
    /// 递归列出 `root` 下的所有条目（包含目录）
    async fn list_files(&self, root: &str) -> Result<Vec<FileInfo>>;

    /// 打开远程文件的下载流，服务器拒绝时返回错误
    async fn open_download(&self, path: &str) -> Result<BlockStream>;

    /// 获取存储名称（用于日志）
    fn name(&self) -> &str;
}

/// 规范化远程路径：统一分隔符，去掉首尾的 `/` 以及 `.`、`..` 段
pub fn normalize_remote_path(path: &str) -> String {
    path.replace('\\', "/")
        .split('/')
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
pub(crate) mod testing {
    //! 测试用的脚本化远程存储

    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    pub struct ScriptedRemote {
        entries: Vec<(FileInfo, Vec<Vec<u8>>)>,
        reject: HashSet<String>,
        interrupt: HashSet<String>,
        flaky: Mutex<HashMap<String, u32>>,
        fail_listing: bool,
        opened: Mutex<Vec<String>>,
    }

    impl ScriptedRemote {
        pub fn new() -> Self {
            Self {
                entries: Vec::new(),
                reject: HashSet::new(),
                interrupt: HashSet::new(),
                flaky: Mutex::new(HashMap::new()),
                fail_listing: false,
                opened: Mutex::new(Vec::new()),
            }
        }

        pub fn dir(mut self, path: &str) -> Self {
            self.entries.push((
                FileInfo {
                    path: format!("{}/", path.trim_end_matches('/')),
                    size: 0,
                    is_dir: true,
                },
                Vec::new(),
            ));
            self
        }

        pub fn file(self, path: &str, content: &[u8]) -> Self {
            self.file_in_blocks(path, content.chunks(4).map(<[u8]>::to_vec).collect())
        }

        pub fn file_in_blocks(mut self, path: &str, blocks: Vec<Vec<u8>>) -> Self {
            let size = blocks.iter().map(Vec::len).sum::<usize>() as u64;
            self.entries.push((
                FileInfo {
                    path: path.to_string(),
                    size,
                    is_dir: false,
                },
                blocks,
            ));
            self
        }

        /// 列表中声明的大小与实际内容不同
        pub fn file_with_declared_size(
            mut self,
            path: &str,
            declared: u64,
            content: &[u8],
        ) -> Self {
            self.entries.push((
                FileInfo {
                    path: path.to_string(),
                    size: declared,
                    is_dir: false,
                },
                vec![content.to_vec()],
            ));
            self
        }

        pub fn reject(mut self, path: &str) -> Self {
            self.reject.insert(path.to_string());
            self
        }

        /// 前 `failures` 次打开失败，之后成功
        pub fn flaky(self, path: &str, failures: u32) -> Self {
            self.flaky.lock().unwrap().insert(path.to_string(), failures);
            self
        }

        /// 数据块发送完之后以错误结束流
        pub fn interrupt(mut self, path: &str) -> Self {
            self.interrupt.insert(path.to_string());
            self
        }

        pub fn failing_listing(mut self) -> Self {
            self.fail_listing = true;
            self
        }

        pub fn opened(&self) -> Vec<String> {
            self.opened.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RemoteStorage for ScriptedRemote {
        async fn list_files(&self, root: &str) -> Result<Vec<FileInfo>> {
            if self.fail_listing {
                anyhow::bail!("530 Login incorrect");
            }
            let root = normalize_remote_path(root);
            Ok(self
                .entries
                .iter()
                .map(|(info, _)| info.clone())
                .filter(|info| {
                    let path = normalize_remote_path(&info.path);
                    root.is_empty() || path == root || path.starts_with(&format!("{}/", root))
                })
                .collect())
        }

        async fn open_download(&self, path: &str) -> Result<BlockStream> {
            self.opened.lock().unwrap().push(path.to_string());
            if self.reject.contains(path) {
                anyhow::bail!("550 {}: Permission denied", path);
            }
            if let Some(remaining) = self.flaky.lock().unwrap().get_mut(path) {
                if *remaining > 0 {
                    *remaining -= 1;
                    anyhow::bail!("421 Service not available");
                }
            }
            let (_, blocks) = self
                .entries
                .iter()
                .find(|(info, _)| info.path == path)
                .ok_or_else(|| anyhow::anyhow!("550 {}: No such file", path))?;
            let mut blocks: Vec<Result<Bytes>> =
                blocks.iter().map(|b| Ok(Bytes::from(b.clone()))).collect();
            if self.interrupt.contains(path) {
                blocks.push(Err(anyhow::anyhow!("426 Connection closed; transfer aborted")));
            }
            Ok(Box::pin(futures::stream::iter(blocks)))
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }
}
