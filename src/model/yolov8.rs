// 该文件是 Kanjian （看见） 项目的一部分。
// src/model/yolov8.rs - YOLOv8 输出后处理模型
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

use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  config::{ConfigError, DetectorConfig, OutputShape, Thresholds},
  label::{LabelError, LabelList},
  model::{AsOutputTensor, DetectResult, Model, detect_core},
};

/// 对单输出 YOLOv8 检测模型的输出张量做后处理。
///
/// 张量由外部推理运行时产生，本结构只持有冻结后的配置。
pub struct YoloV8<Frame> {
  config: DetectorConfig,
  _phantom: std::marker::PhantomData<Frame>,
}

#[derive(Error, Debug)]
pub enum YoloV8Error {
  #[error("URI 方案不匹配: 期望 '{expected}', 实际 '{actual}'")]
  SchemeMismatch {
    expected: &'static str,
    actual: String,
  },
  #[error("无效的查询参数 {key}={value}")]
  InvalidQuery { key: String, value: String },
  #[error("标签错误: {0}")]
  Label(#[from] LabelError),
  #[error("配置错误: {0}")]
  Config(#[from] ConfigError),
}

#[derive(Debug, Clone, Default)]
pub struct YoloV8Builder {
  labels_path: Option<PathBuf>,
  labels: Option<LabelList>,
  num_channels: Option<usize>,
  num_elements: Option<usize>,
  thresholds: Thresholds,
}

impl FromUrlWithScheme for YoloV8Builder {
  const SCHEME: &'static str = "yolov8";
}

impl FromUrl for YoloV8Builder {
  type Error = YoloV8Error;

  /// `yolov8:///path/to/labels.txt?channels=84&elements=8400&confidence=0.5&iou=0.45`
  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(YoloV8Error::SchemeMismatch {
        expected: Self::SCHEME,
        actual: url.scheme().to_string(),
      });
    }

    let mut builder = YoloV8Builder::default().labels_path(url.path());

    for (key, value) in url.query_pairs() {
      let invalid = || YoloV8Error::InvalidQuery {
        key: key.to_string(),
        value: value.to_string(),
      };
      builder = match key.as_ref() {
        "channels" => builder.num_channels(value.parse().map_err(|_| invalid())?),
        "elements" => builder.num_elements(value.parse().map_err(|_| invalid())?),
        "confidence" => builder.confidence_threshold(value.parse().map_err(|_| invalid())?),
        "iou" => builder.iou_threshold(value.parse().map_err(|_| invalid())?),
        _ => return Err(invalid()),
      };
    }

    Ok(builder)
  }
}

impl YoloV8Builder {
  pub fn labels_path(mut self, path: impl Into<PathBuf>) -> Self {
    self.labels_path = Some(path.into());
    self
  }

  /// 直接给定标签列表，优先于标签文件
  pub fn labels(mut self, labels: LabelList) -> Self {
    self.labels = Some(labels);
    self
  }

  pub fn num_channels(mut self, num_channels: usize) -> Self {
    self.num_channels = Some(num_channels);
    self
  }

  pub fn num_elements(mut self, num_elements: usize) -> Self {
    self.num_elements = Some(num_elements);
    self
  }

  /// 按输出张量形状 `[1, channels, elements]` 设置
  pub fn output_shape(self, shape: OutputShape) -> Self {
    self
      .num_channels(shape.num_channels)
      .num_elements(shape.num_elements)
  }

  pub fn confidence_threshold(mut self, threshold: f32) -> Self {
    self.thresholds.confidence = threshold;
    self
  }

  pub fn iou_threshold(mut self, threshold: f32) -> Self {
    self.thresholds.iou = threshold;
    self
  }

  pub fn build_config(self) -> Result<DetectorConfig, YoloV8Error> {
    let num_channels = self
      .num_channels
      .ok_or(ConfigError::Uninitialized("num_channels"))?;
    let num_elements = self
      .num_elements
      .ok_or(ConfigError::Uninitialized("num_elements"))?;

    let labels = match (self.labels, self.labels_path) {
      (Some(labels), _) => labels,
      (None, Some(path)) => LabelList::from_path(path)?,
      (None, None) => return Err(ConfigError::Uninitialized("labels").into()),
    };

    let shape = OutputShape::new(num_channels, num_elements);
    let config = DetectorConfig::new(shape, labels, self.thresholds)?;
    debug!(
      "输出张量形状: [1, {}, {}], 类别数量: {}",
      shape.num_channels,
      shape.num_elements,
      config.labels().len()
    );
    Ok(config)
  }

  pub fn build<Frame>(self) -> Result<YoloV8<Frame>, YoloV8Error> {
    let config = self.build_config()?;
    info!(
      "检测器就绪: 置信度阈值 {}, IoU 阈值 {}",
      config.confidence_threshold(),
      config.iou_threshold()
    );
    Ok(YoloV8::with_config(config))
  }
}

impl<Frame> YoloV8<Frame> {
  pub fn with_config(config: DetectorConfig) -> Self {
    let _phantom = std::marker::PhantomData::<Frame>;
    Self { config, _phantom }
  }

  pub fn config(&self) -> &DetectorConfig {
    &self.config
  }

  pub fn postprocess(&self, tensor: &[f32]) -> Result<DetectResult, ConfigError> {
    detect_core(tensor, &self.config)
  }
}

impl<Frame: AsOutputTensor> Model for YoloV8<Frame> {
  type Input = Frame;
  type Output = DetectResult;
  type Error = ConfigError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    let now = std::time::Instant::now();
    let result = self.postprocess(input.as_output_tensor())?;
    debug!("后处理完成，耗时: {:.2?}, 检测到 {} 个物体", now.elapsed(), result.len());
    Ok(result)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  struct Raw(Vec<f32>);

  impl AsOutputTensor for Raw {
    fn as_output_tensor(&self) -> &[f32] {
      &self.0
    }
  }

  #[test]
  fn parses_url_query() {
    let url = Url::parse("yolov8:///tmp/labels.txt?channels=6&elements=1&confidence=0.3&iou=0.6")
      .unwrap();
    let builder = YoloV8Builder::from_url(&url).unwrap();
    assert_eq!(builder.labels_path, Some(PathBuf::from("/tmp/labels.txt")));
    assert_eq!(builder.num_channels, Some(6));
    assert_eq!(builder.num_elements, Some(1));
    assert_eq!(builder.thresholds.confidence, 0.3);
    assert_eq!(builder.thresholds.iou, 0.6);
  }

  #[test]
  fn rejects_foreign_scheme_and_bad_query() {
    let url = Url::parse("image:///tmp/labels.txt").unwrap();
    assert!(matches!(
      YoloV8Builder::from_url(&url),
      Err(YoloV8Error::SchemeMismatch { .. })
    ));

    let url = Url::parse("yolov8:///tmp/labels.txt?channels=abc").unwrap();
    assert!(matches!(
      YoloV8Builder::from_url(&url),
      Err(YoloV8Error::InvalidQuery { .. })
    ));
  }

  #[test]
  fn missing_shape_is_reported() {
    let labels = LabelList::parse("person\ncar").unwrap();
    let err = YoloV8Builder::default()
      .labels(labels.clone())
      .num_elements(1)
      .build_config()
      .unwrap_err();
    assert!(matches!(
      err,
      YoloV8Error::Config(ConfigError::Uninitialized("num_channels"))
    ));

    let err = YoloV8Builder::default()
      .num_channels(6)
      .num_elements(1)
      .build_config()
      .unwrap_err();
    assert!(matches!(
      err,
      YoloV8Error::Config(ConfigError::Uninitialized("labels"))
    ));
  }

  #[test]
  fn infers_from_frame() {
    let model: YoloV8<Raw> = YoloV8Builder::default()
      .labels(LabelList::parse("person\ncar").unwrap())
      .output_shape(OutputShape::new(6, 1))
      .build()
      .unwrap();
    let result = model.infer(&Raw(vec![0.5, 0.5, 0.2, 0.2, 0.1, 0.7])).unwrap();
    assert_eq!(result.len(), 1);
    assert_eq!(result.items[0].class_name, "car");
  }
}
