// 该文件是 Kanjian （看见） 项目的一部分。
// src/output/log_output.rs - 日志输出
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

use thiserror::Error;
use tracing::info;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::TensorFrame,
  model::DetectResult,
  output::Render,
};

const DEFAULT_COUNT_CLASS: &str = "person";

#[derive(Error, Debug)]
pub enum LogOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
}

/// 通过日志报告每帧的检测结果以及指定类别的数量
///
/// `log:///?count=person`
#[derive(Debug, Clone)]
pub struct LogOutput {
  count_class: String,
}

impl Default for LogOutput {
  fn default() -> Self {
    Self {
      count_class: DEFAULT_COUNT_CLASS.to_string(),
    }
  }
}

impl FromUrlWithScheme for LogOutput {
  const SCHEME: &'static str = "log";
}

impl FromUrl for LogOutput {
  type Error = LogOutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(LogOutputError::SchemeMismatch);
    }

    let count_class = url
      .query_pairs()
      .find(|(k, _)| k == "count")
      .map(|(_, v)| v.into_owned())
      .unwrap_or_else(|| DEFAULT_COUNT_CLASS.to_string());

    Ok(LogOutput { count_class })
  }
}

impl LogOutput {
  pub fn count_class(&self) -> &str {
    &self.count_class
  }
}

impl Render<TensorFrame, DetectResult> for LogOutput {
  type Error = LogOutputError;

  fn render_result(&self, frame: &TensorFrame, result: &DetectResult) -> Result<(), Self::Error> {
    if result.is_empty() {
      info!("帧 {}: 未检测到物体, {}: 0", frame.index(), self.count_class);
      return Ok(());
    }

    info!(
      "帧 {}: 检测到 {} 个物体, {}: {}",
      frame.index(),
      result.len(),
      self.count_class,
      result.count_class(&self.count_class)
    );
    for item in result {
      info!(
        "  - {} at ({:.3}, {:.3}, {:.3}, {:.3})",
        item.label(),
        item.x1,
        item.y1,
        item.x2,
        item.y2
      );
    }
    Ok(())
  }
}
