// 该文件是 Kanjian （看见） 项目的一部分。
// src/output/draw.rs - 目标检测结果可视化
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

use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::{
  drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut},
  rect::Rect,
};
use thiserror::Error;
use tracing::info;

use crate::model::{DetectResult, DetectionBox};

// 文本渲染常量
const LABEL_FONT_SIZE: f32 = 20.0;
const LABEL_TEXT_HEIGHT: i32 = 24;
const LABEL_CHAR_WIDTH: f32 = 11.0; // 每字符平均宽度（粗略估计）
const LABEL_TEXT_VERTICAL_PADDING: i32 = 2;
const BOX_THICKNESS: i32 = 2;
const PALETTE_SIZE: usize = 80;

#[derive(Error, Debug)]
pub enum DrawError {
  #[error("读取字体文件失败: {0}")]
  Io(#[from] std::io::Error),
  #[error("无效的字体文件: {0}")]
  InvalidFont(#[from] ab_glyph::InvalidFont),
}

pub struct Draw {
  font_size: f32,
  label_text_height: i32,
  label_char_width: f32,
  label_text_vertical_padding: i32,
  thickness: i32,
  // 未提供字体时只画边框
  font: Option<FontVec>,
  colors: Vec<Rgb<u8>>,
}

impl Default for Draw {
  fn default() -> Self {
    // 每个类别一种颜色
    let colors = (0..PALETTE_SIZE)
      .map(|i| {
        let hue = (i as f32 / PALETTE_SIZE as f32) * 360.0;
        hsv_to_rgb(hue, 0.8, 0.9)
      })
      .collect();

    Self {
      font_size: LABEL_FONT_SIZE,
      label_text_height: LABEL_TEXT_HEIGHT,
      label_char_width: LABEL_CHAR_WIDTH,
      label_text_vertical_padding: LABEL_TEXT_VERTICAL_PADDING,
      thickness: BOX_THICKNESS,
      font: None,
      colors,
    }
  }
}

/// HSV 转 RGB
fn hsv_to_rgb(h: f32, s: f32, v: f32) -> Rgb<u8> {
  let c = v * s;
  let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
  let m = v - c;

  let (r, g, b) = if h < 60.0 {
    (c, x, 0.0)
  } else if h < 120.0 {
    (x, c, 0.0)
  } else if h < 180.0 {
    (0.0, c, x)
  } else if h < 240.0 {
    (0.0, x, c)
  } else if h < 300.0 {
    (x, 0.0, c)
  } else {
    (c, 0.0, x)
  };

  Rgb([
    ((r + m) * 255.0) as u8,
    ((g + m) * 255.0) as u8,
    ((b + m) * 255.0) as u8,
  ])
}

impl Draw {
  pub fn with_font_file(path: impl AsRef<Path>) -> Result<Self, DrawError> {
    let path = path.as_ref();
    info!("加载字体文件: {}", path.display());
    let font = FontVec::try_from_vec(std::fs::read(path)?)?;
    Ok(Self {
      font: Some(font),
      ..Self::default()
    })
  }

  pub fn color_for(&self, class_index: usize) -> Rgb<u8> {
    self.colors[class_index % self.colors.len()]
  }

  /// 归一化坐标转为像素坐标并限制在图像范围内
  fn pixel_rect(item: &DetectionBox, image: &RgbImage) -> Option<(i32, i32, i32, i32)> {
    let (w, h) = (image.width() as f32, image.height() as f32);

    let x_min = ((item.x1 * w).floor() as i32).clamp(0, w as i32 - 1);
    let y_min = ((item.y1 * h).floor() as i32).clamp(0, h as i32 - 1);
    let x_max = ((item.x2 * w).ceil() as i32).clamp(0, w as i32 - 1);
    let y_max = ((item.y2 * h).ceil() as i32).clamp(0, h as i32 - 1);

    if x_min >= x_max || y_min >= y_max {
      return None;
    }
    Some((x_min, y_min, x_max, y_max))
  }

  fn draw_bbox_with_label(&self, image: &mut RgbImage, item: &DetectionBox) {
    if image.width() == 0 || image.height() == 0 {
      return;
    }
    let Some((x_min, y_min, x_max, y_max)) = Self::pixel_rect(item, image) else {
      return;
    };
    let color = self.color_for(item.class_index);

    // 逐层向内绘制边框以加粗
    for t in 0..self.thickness {
      let width = x_max - x_min - 2 * t + 1;
      let height = y_max - y_min - 2 * t + 1;
      if width <= 0 || height <= 0 {
        break;
      }
      let rect = Rect::at(x_min + t, y_min + t).of_size(width as u32, height as u32);
      draw_hollow_rect_mut(image, rect, color);
    }

    let Some(font) = &self.font else {
      return;
    };

    let label = item.label();
    let text_width = (label.chars().count() as f32 * self.label_char_width) as i32;

    // 标签背景放在边框上方，超出顶部时贴边
    let label_x = x_min;
    let label_y = (y_min - self.label_text_height).max(0);
    let label_width = text_width.min(image.width() as i32 - label_x);

    if label_width > 0 {
      let rect = Rect::at(label_x, label_y).of_size(label_width as u32, self.label_text_height as u32);
      draw_filled_rect_mut(image, rect, color);
      draw_text_mut(
        image,
        Rgb([255u8, 255u8, 255u8]),
        label_x,
        label_y + self.label_text_vertical_padding,
        PxScale::from(self.font_size),
        font,
        &label,
      );
    }
  }

  pub fn draw_detections_on_image(&self, image: &mut RgbImage, result: &DetectResult) {
    for item in result {
      self.draw_bbox_with_label(image, item);
    }
  }

  pub fn draw_detection(&self, image: &RgbImage, result: &DetectResult) -> RgbImage {
    let mut image = image.clone();
    self.draw_detections_on_image(&mut image, result);
    image
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn item(x1: f32, y1: f32, x2: f32, y2: f32) -> DetectionBox {
    DetectionBox {
      x1,
      y1,
      x2,
      y2,
      cx: (x1 + x2) / 2.0,
      cy: (y1 + y2) / 2.0,
      w: x2 - x1,
      h: y2 - y1,
      confidence: 0.876,
      class_index: 0,
      class_name: "person".to_string(),
    }
  }

  #[test]
  fn draws_box_outline() {
    let draw = Draw::default();
    let result = DetectResult {
      items: vec![item(0.25, 0.25, 0.75, 0.75)].into_boxed_slice(),
      candidates: 1,
    };
    let image = draw.draw_detection(&RgbImage::new(20, 20), &result);
    let color = draw.color_for(0);

    assert_eq!(*image.get_pixel(5, 5), color);
    assert_eq!(*image.get_pixel(15, 10), color);
    assert_eq!(*image.get_pixel(10, 10), Rgb([0, 0, 0]));
    assert_eq!(*image.get_pixel(0, 0), Rgb([0, 0, 0]));
  }

  #[test]
  fn skips_degenerate_boxes() {
    let draw = Draw::default();
    let result = DetectResult {
      items: vec![item(0.5, 0.1, 0.5, 0.9)].into_boxed_slice(),
      candidates: 1,
    };
    let image = draw.draw_detection(&RgbImage::new(10, 10), &result);
    assert!(image.pixels().all(|p| *p == Rgb([0, 0, 0])));
  }
}
