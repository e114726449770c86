// 该文件是 Kanjian （看见） 项目的一部分。
// src/label.rs - 类别标签列表
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Kanjian contributors

use std::{
  io::BufRead,
  path::{Path, PathBuf},
  sync::Arc,
};

use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum LabelError {
  #[error("读取标签文件失败: {0}")]
  Io(#[from] std::io::Error),
  #[error("标签文件为空: {0}")]
  Empty(PathBuf),
}

/// 类别标签列表，每个输出类别通道对应一个标签。
///
/// 加载后只读，克隆只增加引用计数。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelList {
  labels: Arc<[String]>,
}

impl From<Vec<String>> for LabelList {
  fn from(labels: Vec<String>) -> Self {
    Self {
      labels: labels.into(),
    }
  }
}

impl LabelList {
  /// 从标签文件加载
  pub fn from_path(path: impl AsRef<Path>) -> Result<Self, LabelError> {
    let path = path.as_ref();
    info!("加载标签文件: {}", path.display());
    let file = std::fs::File::open(path)?;
    let labels = Self::read_lines(std::io::BufReader::new(file))?;
    if labels.is_empty() {
      return Err(LabelError::Empty(path.to_path_buf()));
    }
    debug!("标签数量: {}", labels.len());
    Ok(labels)
  }

  /// 从内存中的文本解析
  pub fn parse(text: &str) -> Result<Self, LabelError> {
    let labels = Self::read_lines(text.as_bytes())?;
    if labels.is_empty() {
      return Err(LabelError::Empty(PathBuf::from("<memory>")));
    }
    Ok(labels)
  }

  // 每行一个标签，遇到第一个空行或文件结尾即停止
  fn read_lines<R: BufRead>(reader: R) -> Result<Self, std::io::Error> {
    let mut labels = Vec::new();
    for line in reader.lines() {
      let line = line?;
      let line = line.strip_suffix('\r').unwrap_or(&line);
      if line.is_empty() {
        break;
      }
      labels.push(line.to_string());
    }
    Ok(Self::from(labels))
  }

  pub fn len(&self) -> usize {
    self.labels.len()
  }

  pub fn is_empty(&self) -> bool {
    self.labels.is_empty()
  }

  pub fn get(&self, index: usize) -> Option<&str> {
    self.labels.get(index).map(String::as_str)
  }

  pub fn iter(&self) -> impl Iterator<Item = &str> {
    self.labels.iter().map(String::as_str)
  }
}
