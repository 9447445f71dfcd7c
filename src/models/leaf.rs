//! 网格（叶子节点）相关的数据类型

use std::fmt::Display;
use serde::{Deserialize, Serialize};

use crate::error::ExportError;

/// 下拉框中的一个选项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub label: String,
    pub value: String,
}

impl SelectOption {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// 网格标识（网格下拉框的 value）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LeafId(String);

impl LeafId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for LeafId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LeafId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// 网格首次被发现时所在的完整路径（州 → 县 → 网格）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafPath {
    pub region: SelectOption,
    pub sub_region: SelectOption,
    pub grid: SelectOption,
}

impl Display for LeafPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} / {} / {}",
            self.region.label, self.sub_region.label, self.grid.label
        )
    }
}

/// 一个待导出的网格
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Leaf {
    pub id: LeafId,
    pub path: LeafPath,
}

impl Leaf {
    pub fn new(path: LeafPath) -> Self {
        Self {
            id: LeafId::new(path.grid.value.clone()),
            path,
        }
    }
}

/// 导出的年份范围
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearRange {
    start: u16,
    end: u16,
}

impl YearRange {
    pub fn new(start: u16, end: u16) -> Result<Self, ExportError> {
        if start > end {
            return Err(ExportError::selection(
                "year range",
                format!("{}-{}", start, end),
            ));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> u16 {
        self.start
    }

    pub fn end(&self) -> u16 {
        self.end
    }
}

/// 导出文件的确定性文件名: `leaf-{id}-{start}-{end}{.ext}`
///
/// `extension` 取自站点固定下载文件名的扩展名，id 中的路径分隔符替换为 `_`。
pub fn artifact_file_name(id: &LeafId, range: YearRange, extension: Option<&str>) -> String {
    let safe_id: String = id
        .as_str()
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | ':') { '_' } else { c })
        .collect();
    let stem = format!("leaf-{}-{}-{}", safe_id, range.start, range.end);
    match extension {
        Some(ext) if !ext.is_empty() => format!("{}.{}", stem, ext),
        _ => stem,
    }
}
