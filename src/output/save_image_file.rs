// 该文件是 Kanjian （看见） 项目的一部分。
// src/output/save_image_file.rs - 保存图像文件
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

use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::{AsRgbImage, TensorFrame},
  model::DetectResult,
  output::{
    Render,
    draw::{Draw, DrawError},
  },
};

const DEFAULT_DRAW_CLASS: &str = "person";

/// 在原始图像上绘制检测框并保存。
///
/// 默认只绘制 `person`，`?only=car` 指定其他类别，`?all` 绘制全部类别。
pub struct SaveImageFileOutput {
  path: String,
  draw: Draw,
  only_class: Option<String>,
}

#[derive(Error, Debug)]
pub enum SaveImageFileError {
  #[error("I/O 错误: {0}")]
  IoError(std::io::Error),
  #[error("图像错误: {0}")]
  ImageError(image::ImageError),
  #[error("字体错误: {0}")]
  DrawError(#[from] DrawError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

impl FromUrlWithScheme for SaveImageFileOutput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for SaveImageFileOutput {
  type Error = SaveImageFileError;

  /// `image:///path/to/out.png?font=/path/to/font.ttf&only=person`
  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(SaveImageFileError::SchemeMismatch(format!(
        "期望保存方式 '{}', 实际保存方式 '{}'",
        Self::SCHEME,
        uri.scheme()
      )));
    }

    let draw = match uri.query_pairs().find(|(k, _)| k == "font") {
      Some((_, font)) => Draw::with_font_file(font.into_owned())?,
      None => Draw::default(),
    };

    let only_class = if uri.query_pairs().any(|(k, _)| k == "all") {
      None
    } else {
      let class = uri
        .query_pairs()
        .find(|(k, _)| k == "only")
        .map(|(_, v)| v.into_owned())
        .unwrap_or_else(|| DEFAULT_DRAW_CLASS.to_string());
      Some(class)
    };

    Ok(SaveImageFileOutput {
      path: uri.path().to_string(),
      draw,
      only_class,
    })
  }
}

impl SaveImageFileOutput {
  pub fn only_class(&self) -> Option<&str> {
    self.only_class.as_deref()
  }

  fn save_image(&self, image: image::RgbImage) -> Result<(), SaveImageFileError> {
    if let Some(parent) = Path::new(&self.path).parent() {
      if !parent.as_os_str().is_empty() {
        std::fs::create_dir_all(parent).map_err(SaveImageFileError::IoError)?;
      }
    }

    image
      .save(&self.path)
      .map_err(SaveImageFileError::ImageError)?;

    info!("保存图像到文件: {}", self.path);

    Ok(())
  }
}

impl Render<TensorFrame, DetectResult> for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn render_result(&self, frame: &TensorFrame, result: &DetectResult) -> Result<(), Self::Error> {
    let Some(image) = frame.as_rgb_image() else {
      warn!("帧 {} 没有原始图像，跳过绘制", frame.index());
      return Ok(());
    };
    let image = match &self.only_class {
      Some(class) => self.draw.draw_detection(image, &result.retain_class(class)),
      None => self.draw.draw_detection(image, result),
    };
    self.save_image(image)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::DetectionBox;
  use image::RgbImage;

  #[test]
  fn saves_only_frames_with_images() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("nested").join("out.png");
    let url = Url::parse(&format!("image://{}", target.display())).unwrap();
    let output = SaveImageFileOutput::from_url(&url).unwrap();

    let frame = TensorFrame::new(0, "a.bin", Box::new([]));
    output.render_result(&frame, &DetectResult::default()).unwrap();
    assert!(!target.exists());

    let frame = frame.with_image(RgbImage::new(16, 12));
    output.render_result(&frame, &DetectResult::default()).unwrap();
    let saved = image::open(&target).unwrap();
    assert_eq!((saved.width(), saved.height()), (16, 12));
  }

  fn item(x1: f32, x2: f32, class_index: usize, class_name: &str) -> DetectionBox {
    DetectionBox {
      x1,
      y1: 0.25,
      x2,
      y2: 0.75,
      cx: (x1 + x2) / 2.0,
      cy: 0.5,
      w: x2 - x1,
      h: 0.5,
      confidence: 0.9,
      class_index,
      class_name: class_name.to_string(),
    }
  }

  #[test]
  fn draws_only_selected_class() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("out.png");
    let result = DetectResult {
      items: vec![item(0.05, 0.35, 0, "person"), item(0.55, 0.85, 2, "car")].into_boxed_slice(),
      candidates: 2,
    };
    let frame = TensorFrame::new(0, "a.bin", Box::new([])).with_image(RgbImage::new(20, 20));
    let black = image::Rgb([0u8, 0, 0]);

    let url = Url::parse(&format!("image://{}", target.display())).unwrap();
    let output = SaveImageFileOutput::from_url(&url).unwrap();
    assert_eq!(output.only_class(), Some("person"));
    output.render_result(&frame, &result).unwrap();
    let saved = image::open(&target).unwrap().to_rgb8();
    // person 框左边在 x=1，car 框左边在 x=11
    assert_ne!(*saved.get_pixel(1, 10), black);
    assert_eq!(*saved.get_pixel(11, 10), black);

    let url = Url::parse(&format!("image://{}?only=car", target.display())).unwrap();
    SaveImageFileOutput::from_url(&url)
      .unwrap()
      .render_result(&frame, &result)
      .unwrap();
    let saved = image::open(&target).unwrap().to_rgb8();
    assert_eq!(*saved.get_pixel(1, 10), black);
    assert_ne!(*saved.get_pixel(11, 10), black);

    let url = Url::parse(&format!("image://{}?all", target.display())).unwrap();
    let output = SaveImageFileOutput::from_url(&url).unwrap();
    assert_eq!(output.only_class(), None);
    output.render_result(&frame, &result).unwrap();
    let saved = image::open(&target).unwrap().to_rgb8();
    assert_ne!(*saved.get_pixel(1, 10), black);
    assert_ne!(*saved.get_pixel(11, 10), black);
  }

  #[test]
  fn missing_font_is_reported() {
    let url = Url::parse("image:///tmp/out.png?font=/nonexistent/font.ttf").unwrap();
    assert!(matches!(
      SaveImageFileOutput::from_url(&url),
      Err(SaveImageFileError::DrawError(DrawError::Io(_)))
    ));
  }
}
