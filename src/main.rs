use anyhow::Context;
use clap::Parser;
use ftpsync_lib::config::Settings;
use ftpsync_lib::core::{Reporter, SyncConfig, SyncEngine};
use ftpsync_lib::logging::{init_logging, log_dir};
use ftpsync_lib::storage::FtpStorage;
use ftpsync_lib::SyncError;
use std::path::PathBuf;
use std::sync::Arc;

/// Download new or resized files from an FTP directory
#[derive(Debug, Parser)]
#[command(name = "ftpsync", version, about)]
struct Cli {
    /// JSON settings file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long)]
    host: Option<String>,

    #[arg(long)]
    port: Option<u16>,

    #[arg(long)]
    user: Option<String>,

    #[arg(long)]
    password: Option<String>,

    /// Remote directory to mirror
    #[arg(short, long)]
    remote: Option<String>,

    /// Local destination directory
    #[arg(short, long)]
    local: Option<String>,

    /// File extension to skip, may be repeated (e.g. --exclude .log)
    #[arg(short, long = "exclude")]
    exclude: Vec<String>,

    /// Do not recreate the remote root directory locally
    #[arg(long)]
    flatten: bool,

    /// Suppress terminal status output
    #[arg(short, long)]
    silent: bool,

    /// List and compare only, do not download
    #[arg(long)]
    dry_run: bool,

    /// Retries when a download cannot be started
    #[arg(long)]
    retries: Option<u32>,
}

impl Cli {
    /// 命令行参数覆盖配置文件
    fn apply(&self, settings: &mut Settings) {
        let connection = &mut settings.connection;
        if let Some(host) = &self.host {
            connection.host = host.clone();
        }
        if let Some(port) = self.port {
            connection.port = port;
        }
        if let Some(user) = &self.user {
            connection.user = user.clone();
        }
        if let Some(password) = &self.password {
            connection.password = password.clone();
        }

        let sync = &mut settings.sync;
        if let Some(remote) = &self.remote {
            sync.remote = remote.clone();
        }
        if let Some(local) = &self.local {
            sync.local = local.clone();
        }
        if !self.exclude.is_empty() {
            sync.exclude_extensions = self.exclude.clone();
        }
        if self.flatten {
            sync.preserve_root_path = false;
        }

        if self.silent {
            settings.silent = true;
        }
        if let Some(retries) = self.retries {
            settings.max_retries = retries;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = match &cli.config {
        Some(path) => Settings::load(path)
            .with_context(|| format!("failed to load settings from {}", path.display()))?,
        None => Settings::default(),
    };
    cli.apply(&mut settings);

    init_logging(&settings.log, &log_dir(&settings.log));

    let target = settings.sync.to_target()?;
    let storage = FtpStorage::new(&settings.connection)
        .with_context(|| format!("failed to connect to {}", settings.connection.endpoint()))?;

    let engine = SyncEngine::with_config(
        Arc::new(storage),
        Reporter::new(settings.silent),
        SyncConfig {
            max_retries: settings.max_retries,
            ..SyncConfig::default()
        },
    );

    let cancel = engine.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("收到中断信号，正在取消同步");
            cancel.cancel();
        }
    });

    if cli.dry_run {
        let decisions = engine.preview(&target).await?;
        tracing::info!("预览完成: {} 个条目", decisions.len());
        return Ok(());
    }

    match engine.run(&target).await {
        Ok(report) => {
            tracing::info!(
                "运行结束: {:?}, 下载 {} 个文件",
                report.status,
                report.files_downloaded
            );
            Ok(())
        }
        Err(SyncError::Aborted { report, source }) => {
            tracing::error!(
                "运行中止: {:?}, 已下载 {} 个文件",
                report.status,
                report.files_downloaded
            );
            Err(anyhow::Error::new(*source).context(format!(
                "sync stopped after {} of {} file(s)",
                report.files_downloaded, report.files_listed
            )))
        }
        Err(e) => Err(e.into()),
    }
}
