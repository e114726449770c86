// 该文件是 Kanjian （看见） 项目的一部分。
// src/model.rs - 模型与检测结果
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

pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

/// 携带模型原始输出张量的帧
pub trait AsOutputTensor {
  fn as_output_tensor(&self) -> &[f32];
}

/// 检测框，坐标均归一化到模型输入尺寸 [0, 1]
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionBox {
  pub x1: f32,
  pub y1: f32,
  pub x2: f32,
  pub y2: f32,
  // 张量中直接读出的中心形式，仅用于调试
  pub cx: f32,
  pub cy: f32,
  pub w: f32,
  pub h: f32,
  pub confidence: f32,
  pub class_index: usize,
  pub class_name: String,
}

impl DetectionBox {
  /// 标签文本，置信度截断为整数百分比，例如 `person 87%`
  pub fn label(&self) -> String {
    format!("{} {}%", self.class_name, (self.confidence * 100.0) as i32)
  }
}

impl Corners for DetectionBox {
  fn corners(&self) -> [f32; 4] {
    [self.x1, self.y1, self.x2, self.y2]
  }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectResult {
  pub items: Box<[DetectionBox]>,
  /// 抑制前的候选框数量
  pub candidates: usize,
}

impl DetectResult {
  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn iter(&self) -> std::slice::Iter<'_, DetectionBox> {
    self.items.iter()
  }

  /// 指定类别的检测框数量，例如行人计数
  pub fn count_class(&self, class_name: &str) -> usize {
    self.iter().filter(|item| item.class_name == class_name).count()
  }

  /// 只保留指定类别的检测框
  pub fn retain_class(&self, class_name: &str) -> DetectResult {
    DetectResult {
      items: self
        .iter()
        .filter(|item| item.class_name == class_name)
        .cloned()
        .collect(),
      candidates: self.candidates,
    }
  }
}

impl<'a> IntoIterator for &'a DetectResult {
  type Item = &'a DetectionBox;
  type IntoIter = std::slice::Iter<'a, DetectionBox>;

  fn into_iter(self) -> Self::IntoIter {
    self.items.iter()
  }
}

mod decode;
mod geometry;
mod postprocess;
mod suppress;
mod yolov8;

pub use self::decode::decode;
pub use self::geometry::{Corners, area, iou};
pub use self::postprocess::detect_core;
pub use self::suppress::suppress;
pub use self::yolov8::{YoloV8, YoloV8Builder, YoloV8Error};
