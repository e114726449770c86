// 该文件是 Kanjian （看见） 项目的一部分。
// src/config.rs - 检测器配置
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

use crate::label::LabelList;

/// 几何通道数量: cx, cy, w, h
pub const GEOMETRY_CHANNELS: usize = 4;

pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.45;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
  #[error("配置项未初始化: {0}")]
  Uninitialized(&'static str),
  #[error("通道数量与标签不一致: 通道 {channels}, 标签 {labels} (期望通道 = 4 + 标签)")]
  ChannelMismatch { channels: usize, labels: usize },
  #[error("输出张量长度错误: 期望 {expected}, 实际 {actual}")]
  TensorLength { expected: usize, actual: usize },
  #[error("阈值 {name} 超出范围 [0, 1]: {value}")]
  InvalidThreshold { name: &'static str, value: f32 },
}

/// 模型输出张量形状 `[1, num_channels, num_elements]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputShape {
  pub num_channels: usize,
  pub num_elements: usize,
}

impl OutputShape {
  pub fn new(num_channels: usize, num_elements: usize) -> Self {
    Self {
      num_channels,
      num_elements,
    }
  }

  /// 扁平缓冲区应有的长度
  pub fn len(&self) -> usize {
    self.num_channels * self.num_elements
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// 类别通道数量
  pub fn num_classes(&self) -> usize {
    self.num_channels.saturating_sub(GEOMETRY_CHANNELS)
  }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
  pub confidence: f32,
  pub iou: f32,
}

impl Default for Thresholds {
  fn default() -> Self {
    Self {
      confidence: DEFAULT_CONFIDENCE_THRESHOLD,
      iou: DEFAULT_IOU_THRESHOLD,
    }
  }
}

impl Thresholds {
  fn validate(&self) -> Result<(), ConfigError> {
    for (name, value) in [("confidence", self.confidence), ("iou", self.iou)] {
      if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::InvalidThreshold { name, value });
      }
    }
    Ok(())
  }
}

/// 初始化完成后不再变化的检测配置。
///
/// 只能通过 [`DetectorConfig::new`] 构造，构造时即校验形状与标签一致，
/// 之后以引用方式传入每一次后处理调用。
#[derive(Debug, Clone)]
pub struct DetectorConfig {
  shape: OutputShape,
  labels: LabelList,
  thresholds: Thresholds,
}

impl DetectorConfig {
  pub fn new(
    shape: OutputShape,
    labels: LabelList,
    thresholds: Thresholds,
  ) -> Result<Self, ConfigError> {
    if shape.num_channels == 0 {
      return Err(ConfigError::Uninitialized("num_channels"));
    }
    if shape.num_elements == 0 {
      return Err(ConfigError::Uninitialized("num_elements"));
    }
    if labels.is_empty() {
      return Err(ConfigError::Uninitialized("labels"));
    }
    if shape.num_channels != GEOMETRY_CHANNELS + labels.len() {
      return Err(ConfigError::ChannelMismatch {
        channels: shape.num_channels,
        labels: labels.len(),
      });
    }
    thresholds.validate()?;

    Ok(Self {
      shape,
      labels,
      thresholds,
    })
  }

  pub fn shape(&self) -> OutputShape {
    self.shape
  }

  pub fn labels(&self) -> &LabelList {
    &self.labels
  }

  pub fn thresholds(&self) -> Thresholds {
    self.thresholds
  }

  pub fn confidence_threshold(&self) -> f32 {
    self.thresholds.confidence
  }

  pub fn iou_threshold(&self) -> f32 {
    self.thresholds.iou
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn labels(names: &[&str]) -> LabelList {
    LabelList::parse(&names.join("\n")).unwrap()
  }

  #[test]
  fn accepts_consistent_shape() {
    let config =
      DetectorConfig::new(OutputShape::new(6, 10), labels(&["person", "car"]), Thresholds::default())
        .unwrap();
    assert_eq!(config.shape().num_classes(), 2);
    assert_eq!(config.confidence_threshold(), 0.5);
    assert_eq!(config.iou_threshold(), 0.45);
  }

  #[test]
  fn rejects_channel_label_mismatch() {
    let err = DetectorConfig::new(OutputShape::new(7, 10), labels(&["person", "car"]), Thresholds::default())
      .unwrap_err();
    assert_eq!(
      err,
      ConfigError::ChannelMismatch {
        channels: 7,
        labels: 2
      }
    );
  }

  #[test]
  fn rejects_unset_dimensions() {
    let err = DetectorConfig::new(OutputShape::new(0, 10), labels(&["person"]), Thresholds::default())
      .unwrap_err();
    assert_eq!(err, ConfigError::Uninitialized("num_channels"));

    let err = DetectorConfig::new(OutputShape::new(5, 0), labels(&["person"]), Thresholds::default())
      .unwrap_err();
    assert_eq!(err, ConfigError::Uninitialized("num_elements"));
  }

  #[test]
  fn rejects_out_of_range_threshold() {
    let thresholds = Thresholds {
      confidence: 1.5,
      iou: 0.45,
    };
    let err = DetectorConfig::new(OutputShape::new(5, 1), labels(&["person"]), thresholds).unwrap_err();
    assert_eq!(
      err,
      ConfigError::InvalidThreshold {
        name: "confidence",
        value: 1.5
      }
    );
  }
}
