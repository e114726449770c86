// 该文件是 Kanjian （看见） 项目的一部分。
// src/model/decode.rs - 输出张量解码
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
  config::{ConfigError, DetectorConfig, GEOMETRY_CHANNELS},
  model::DetectionBox,
  tensor::ChannelMajor,
};

const CHANNEL_CX: usize = 0;
const CHANNEL_CY: usize = 1;
const CHANNEL_W: usize = 2;
const CHANNEL_H: usize = 3;

/// 将 `[1, num_channels, num_elements]` 的输出张量解码为候选框。
///
/// 每个元素取分数最高的类别通道（严格大于比较，并列时取通道序号较小者），
/// 分数不超过置信度阈值或任一角点落在 [0, 1] 之外的元素直接丢弃，不做截断。
/// 返回的候选框按元素序号递增排列。
pub fn decode(tensor: &[f32], config: &DetectorConfig) -> Result<Vec<DetectionBox>, ConfigError> {
  let view = ChannelMajor::new(tensor, config.shape())?;
  let shape = view.shape();
  let labels = config.labels();
  let threshold = config.confidence_threshold();

  let mut boxes = Vec::new();

  for c in 0..shape.num_elements {
    let mut max_conf = f32::NEG_INFINITY;
    let mut best = None;
    for (channel, score) in view.column(c, GEOMETRY_CHANNELS..shape.num_channels) {
      if score > max_conf {
        max_conf = score;
        best = Some(channel - GEOMETRY_CHANNELS);
      }
    }

    let Some(class_index) = best else {
      continue;
    };
    if max_conf <= threshold {
      continue;
    }

    let cx = view.get(CHANNEL_CX, c);
    let cy = view.get(CHANNEL_CY, c);
    let w = view.get(CHANNEL_W, c);
    let h = view.get(CHANNEL_H, c);

    let x1 = cx - (w / 2.0);
    let y1 = cy - (h / 2.0);
    let x2 = cx + (w / 2.0);
    let y2 = cy + (h / 2.0);

    if [x1, y1, x2, y2]
      .iter()
      .any(|v| !(0.0..=1.0).contains(v))
    {
      continue;
    }

    let class_name = labels
      .get(class_index)
      .ok_or(ConfigError::ChannelMismatch {
        channels: shape.num_channels,
        labels: labels.len(),
      })?
      .to_string();

    boxes.push(DetectionBox {
      x1,
      y1,
      x2,
      y2,
      cx,
      cy,
      w,
      h,
      confidence: max_conf,
      class_index,
      class_name,
    });
  }

  debug!("解码得到 {} 个候选框", boxes.len());
  Ok(boxes)
}
