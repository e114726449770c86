// 该文件是 Kanjian （看见） 项目的一部分。
// src/args.rs - 项目参数配置
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

use clap::Parser;
use tracing::info;
use url::Url;

use crate::{
  FromUrl,
  model::{YoloV8Builder, YoloV8Error},
};

/// Kanjian 项目参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 检测器配置，例如
  /// yolov8:///path/to/labels.txt?channels=84&elements=8400
  #[arg(long, value_name = "DETECTOR")]
  pub detector: Url,

  /// 输入来源，例如 tensor:///path/to/dumps
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,

  /// 输出路径
  /// 支持:
  /// - 日志: log:///?count=person
  /// - 图片: image:///path/to/out.png?font=/path/to/font.ttf
  /// - 记录目录: folder:///path/to/records?always
  #[arg(long, value_name = "OUTPUT", default_value = "log:///")]
  pub output: Url,

  /// 置信度阈值 (0.0 - 1.0)，覆盖检测器配置中的值
  #[arg(long, value_name = "THRESHOLD")]
  pub confidence: Option<f32>,

  /// NMS IoU 阈值 (0.0 - 1.0)，覆盖检测器配置中的值
  #[arg(long, value_name = "THRESHOLD")]
  pub iou: Option<f32>,

  /// 最大处理帧数，不指定时处理全部帧
  #[arg(long, value_name = "FRAME_NUMBER")]
  pub frame_number: Option<usize>,
}

impl Args {
  pub fn log_args(&self) {
    info!("检测器配置: {}", self.detector);
    info!("输入来源: {}", self.input);
    info!("输出路径: {}", self.output);
  }

  /// 由检测器 URL 构造构建器，并应用命令行中的阈值覆盖
  pub fn detector_builder(&self) -> Result<YoloV8Builder, YoloV8Error> {
    let mut builder = YoloV8Builder::from_url(&self.detector)?;
    if let Some(confidence) = self.confidence {
      builder = builder.confidence_threshold(confidence);
    }
    if let Some(iou) = self.iou {
      builder = builder.iou_threshold(iou);
    }
    Ok(builder)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::label::LabelList;

  #[test]
  fn overrides_thresholds_from_url() {
    let args = Args::parse_from([
      "kanjian",
      "--detector",
      "yolov8:///labels.txt?channels=6&elements=2&confidence=0.3",
      "--input",
      "tensor:///dumps",
      "--iou",
      "0.6",
    ]);
    assert_eq!(args.output.scheme(), "log");
    assert_eq!(args.frame_number, None);

    let config = args
      .detector_builder()
      .unwrap()
      .labels(LabelList::from(vec!["person".to_string(), "car".to_string()]))
      .build_config()
      .unwrap();
    assert_eq!(config.confidence_threshold(), 0.3);
    assert_eq!(config.iou_threshold(), 0.6);
  }

  #[test]
  fn rejects_invalid_detector_url() {
    assert!(Args::try_parse_from(["kanjian", "--detector", "not a url", "--input", "tensor:///x"]).is_err());
  }
}
