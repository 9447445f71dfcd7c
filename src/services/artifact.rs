//! 下载文件服务 - 业务能力层
//!
//! 只负责"等站点写完固定文件名的下载，然后改成确定性的文件名"

use std::cell::Cell;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, warn};

use crate::error::{ExportError, ExportResult};
use crate::utils::PollPolicy;

/// Chromium 下载过程中的临时文件后缀
const PARTIAL_SUFFIX: &str = ".crdownload";

/// 判定下载完成前，文件大小需要保持不变的轮询间隔数
pub const STABLE_INTERVALS: u32 = 2;

/// 下载文件监视器
///
/// 职责：
/// - 清理上一次残留的固定文件名下载
/// - 轮询等待文件出现，并确认大小不再变化
/// - 在同一目录内原子地改名
pub struct ArtifactWatcher {
    download_dir: PathBuf,
    file_name: String,
    policy: PollPolicy,
}

impl ArtifactWatcher {
    pub fn new(download_dir: impl Into<PathBuf>, file_name: impl Into<String>, policy: PollPolicy) -> Self {
        Self {
            download_dir: download_dir.into(),
            file_name: file_name.into(),
            policy,
        }
    }

    /// 站点写入的固定文件路径
    pub fn pending_path(&self) -> PathBuf {
        self.download_dir.join(&self.file_name)
    }

    fn partial_path(&self) -> PathBuf {
        self.download_dir
            .join(format!("{}{}", self.file_name, PARTIAL_SUFFIX))
    }

    /// 固定文件名的扩展名（用于生成最终文件名）
    pub fn extension(&self) -> Option<&str> {
        Path::new(&self.file_name).extension().and_then(|e| e.to_str())
    }

    /// 删除残留的固定文件名下载，避免被误认为本次导出的结果
    pub async fn clear_stale(&self) -> ExportResult<()> {
        for path in [self.pending_path(), self.partial_path()] {
            match fs::remove_file(&path).await {
                Ok(()) => warn!("🗑️ 已删除残留的下载文件: {}", path.display()),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// 等待固定文件名的下载完成
    ///
    /// 文件需要存在、没有未完成的临时文件，并且大小在连续
    /// [`STABLE_INTERVALS`] 个轮询间隔内保持不变。
    pub async fn wait_until_complete(&self) -> ExportResult<PathBuf> {
        let pending = self.pending_path();
        let partial = self.partial_path();
        let last_size: Cell<Option<u64>> = Cell::new(None);
        let stable: Cell<u32> = Cell::new(0);
        let (pending_ref, partial_ref, last, streak) = (&pending, &partial, &last_size, &stable);

        let settled = self
            .policy
            .poll(move |attempt| async move {
                let size = match fs::metadata(pending_ref).await {
                    Ok(meta) => meta.len(),
                    Err(e) if e.kind() == ErrorKind::NotFound => {
                        last.set(None);
                        streak.set(0);
                        return Ok(None);
                    }
                    Err(e) => return Err(e.into()),
                };
                let previous = last.replace(Some(size));
                let in_flight = fs::try_exists(partial_ref).await?;

                if in_flight || previous != Some(size) {
                    streak.set(0);
                } else {
                    streak.set(streak.get() + 1);
                }
                debug!(
                    "下载文件大小: {} 字节，已稳定 {} 次 (第 {} 次检查)",
                    size,
                    streak.get(),
                    attempt + 1
                );
                Ok((streak.get() >= STABLE_INTERVALS).then_some(size))
            })
            .await?;

        match settled {
            Some(size) => {
                debug!("下载文件已稳定: {} ({} 字节)", pending.display(), size);
                Ok(pending)
            }
            None => Err(ExportError::ArtifactTimeout {
                path: pending,
                waited: self.policy.timeout,
            }),
        }
    }

    /// 把已完成的下载改名为 `final_name`，已存在的同名文件会被覆盖
    pub async fn promote(&self, final_name: &str) -> ExportResult<PathBuf> {
        let source = self.pending_path();
        let target = self.download_dir.join(final_name);
        fs::rename(&source, &target).await?;
        Ok(target)
    }
}
