// 该文件是 Kanjian （看见） 项目的一部分。
// src/frame.rs - 输出张量帧定义
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

use std::path::{Path, PathBuf};

use image::RgbImage;

use crate::model::AsOutputTensor;

const F32_BYTES: usize = std::mem::size_of::<f32>();

/// 可附带原始图像的帧，用于绘制检测结果
pub trait AsRgbImage {
  fn as_rgb_image(&self) -> Option<&RgbImage>;
}

/// 一帧模型输出: 扁平的 `f32` 张量以及可选的原始图像
#[derive(Debug, Clone)]
pub struct TensorFrame {
  index: usize,
  source: PathBuf,
  tensor: Box<[f32]>,
  image: Option<RgbImage>,
}

impl TensorFrame {
  pub fn new(index: usize, source: impl Into<PathBuf>, tensor: Box<[f32]>) -> Self {
    Self {
      index,
      source: source.into(),
      tensor,
      image: None,
    }
  }

  pub fn with_image(mut self, image: RgbImage) -> Self {
    self.image = Some(image);
    self
  }

  pub fn index(&self) -> usize {
    self.index
  }

  pub fn source(&self) -> &Path {
    &self.source
  }

  pub fn len(&self) -> usize {
    self.tensor.len()
  }

  pub fn is_empty(&self) -> bool {
    self.tensor.is_empty()
  }
}

impl AsOutputTensor for TensorFrame {
  fn as_output_tensor(&self) -> &[f32] {
    &self.tensor
  }
}

impl AsRgbImage for TensorFrame {
  fn as_rgb_image(&self) -> Option<&RgbImage> {
    self.image.as_ref()
  }
}

/// 将小端字节序的原始转储解析为 `f32` 序列，长度不是 4 的倍数时返回 `None`
pub fn f32_from_le_bytes(bytes: &[u8]) -> Option<Box<[f32]>> {
  if bytes.len() % F32_BYTES != 0 {
    return None;
  }
  Some(
    bytes
      .chunks_exact(F32_BYTES)
      .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
      .collect(),
  )
}
