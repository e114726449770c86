// 该文件是 Kanjian （看见） 项目的一部分。
// src/tensor.rs - 通道优先的输出张量访问
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

use crate::config::{ConfigError, OutputShape};

/// 形状为 `[1, num_channels, num_elements]` 的扁平输出张量视图。
///
/// 同一通道的所有元素连续存放，通道 `j` 元素 `c` 位于
/// `c + num_elements * j`。下标公式只在 [`ChannelMajor::offset`] 中出现。
#[derive(Debug, Clone, Copy)]
pub struct ChannelMajor<'a> {
  data: &'a [f32],
  shape: OutputShape,
}

impl<'a> ChannelMajor<'a> {
  pub fn new(data: &'a [f32], shape: OutputShape) -> Result<Self, ConfigError> {
    if data.len() != shape.len() {
      return Err(ConfigError::TensorLength {
        expected: shape.len(),
        actual: data.len(),
      });
    }
    Ok(Self { data, shape })
  }

  pub fn shape(&self) -> OutputShape {
    self.shape
  }

  #[inline]
  pub fn offset(&self, channel: usize, element: usize) -> usize {
    element + self.shape.num_elements * channel
  }

  /// 调用方保证 `channel < num_channels` 且 `element < num_elements`
  #[inline]
  pub fn get(&self, channel: usize, element: usize) -> f32 {
    self.data[self.offset(channel, element)]
  }

  /// 某一元素在 `channels` 范围内各通道的取值
  pub fn column(
    &self,
    element: usize,
    channels: std::ops::Range<usize>,
  ) -> impl Iterator<Item = (usize, f32)> + '_ {
    channels.map(move |channel| (channel, self.get(channel, element)))
  }
}
