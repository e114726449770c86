// 该文件是 Kanjian （看见） 项目的一部分。
// src/model/postprocess.rs - 后处理流水线
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

use tracing::debug;

use crate::{
  config::{ConfigError, DetectorConfig},
  model::{DetectResult, decode, suppress},
};

/// 解码输出张量并进行非极大值抑制。
///
/// 只有没有候选框时才返回空结果。贪心抑制总会保留第一个候选框，
/// 因此候选框非空时结果至少含一个框。
pub fn detect_core(tensor: &[f32], config: &DetectorConfig) -> Result<DetectResult, ConfigError> {
  let candidates = decode(tensor, config)?;
  if candidates.is_empty() {
    debug!("未检测到任何候选框");
    return Ok(DetectResult::default());
  }

  let items = suppress(&candidates, config.iou_threshold());
  debug!("非极大值抑制: {} -> {}", candidates.len(), items.len());

  Ok(DetectResult {
    items: items.into_boxed_slice(),
    candidates: candidates.len(),
  })
}
