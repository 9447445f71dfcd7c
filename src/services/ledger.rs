//! 完成记录服务 - 业务能力层
//!
//! 只负责"记住哪些网格已经导出"，不关心流程

use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::models::LeafId;

/// 完成记录
///
/// 职责：
/// - 追加写入已完成的网格 ID，一行一个
/// - 写入后立即刷盘，保证重启后仍然可见
/// - 从不删除记录
pub struct Ledger {
    path: PathBuf,
    completed: HashSet<LeafId>,
    /// 按写入顺序保存，重复项只保留第一次
    order: Vec<LeafId>,
}

impl Ledger {
    /// 打开完成记录，文件不存在时视为空记录
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut ledger = Self {
            path,
            completed: HashSet::new(),
            order: Vec::new(),
        };

        let content = match std::fs::read_to_string(&ledger.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => String::new(),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("无法读取完成记录: {}", ledger.path.display()))
            }
        };

        // 没有换行结尾的最后一行是中断的写入，不算完成
        let complete = content.rfind('\n').map_or("", |i| &content[..=i]);
        if complete.len() < content.len() {
            warn!(
                "⚠️ 完成记录末尾有未写完的行，忽略: {:?}",
                &content[complete.len()..]
            );
        }

        // 兼容 CSV 格式：只取每行第一列
        for line in complete.lines() {
            let id = line.split(',').next().unwrap_or("").trim();
            if !id.is_empty() {
                ledger.remember(LeafId::new(id));
            }
        }

        debug!(
            "已加载完成记录 {}: {} 条",
            ledger.path.display(),
            ledger.order.len()
        );
        Ok(ledger)
    }

    pub fn is_completed(&self, id: &LeafId) -> bool {
        self.completed.contains(id)
    }

    /// 追加一条完成记录，返回前已写入磁盘
    pub fn mark_completed(&mut self, id: &LeafId) -> Result<()> {
        let raw = id.as_str();
        if raw.contains(['\n', '\r', ',']) {
            anyhow::bail!("网格 ID 含有分隔符，无法写入完成记录: {:?}", raw);
        }
        if raw.is_empty() || raw.trim() != raw {
            anyhow::bail!("网格 ID 为空或首尾有空白，无法写入完成记录: {:?}", raw);
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("无法打开完成记录: {}", self.path.display()))?;
        drop_torn_tail(&mut file)
            .with_context(|| format!("无法修复完成记录: {}", self.path.display()))?;

        writeln!(file, "{}", id)?;
        file.flush()?;
        file.sync_all()?;

        self.remember(id.clone());
        debug!("写入完成记录: {}", id);
        Ok(())
    }

    /// 已完成的网格，按首次写入顺序
    pub fn entries(&self) -> &[LeafId] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn remember(&mut self, id: LeafId) {
        if self.completed.insert(id.clone()) {
            self.order.push(id);
        }
    }
}

/// 截掉文件末尾没有换行的残行，保证下一条记录从新行开始
fn drop_torn_tail(file: &mut File) -> Result<()> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(());
    }

    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1))?;
    file.read_exact(&mut last)?;
    if last[0] == b'\n' {
        return Ok(());
    }

    let mut content = Vec::new();
    file.seek(SeekFrom::Start(0))?;
    file.read_to_end(&mut content)?;
    let keep = content
        .iter()
        .rposition(|&b| b == b'\n')
        .map_or(0, |i| i as u64 + 1);
    warn!("⚠️ 截掉完成记录末尾未写完的 {} 字节", len - keep);
    file.set_len(keep)?;
    Ok(())
}
