// 该文件是 Kanjian （看见） 项目的一部分。
// src/output/directory_record.rs - 目录记录输出
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

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU16, Ordering};

use chrono::{DateTime, Datelike, Utc};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::debug;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::TensorFrame,
  model::{DetectResult, DetectionBox},
  output::Render,
};

#[derive(Error, Debug)]
pub enum DirectoryRecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 错误: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("无法在 {0} 中创建新的记录文件")]
  NameExhausted(PathBuf),
}

// 同名文件已存在时递增序号重试的次数上限
const MAX_NAME_ATTEMPTS: usize = 64;

/// 每帧写入一个 JSON 记录，按 `年/月/日` 分目录存放。
///
/// `folder:///path/to/records?always` 时空结果也会写入。
pub struct DirectoryRecordOutput {
  directory: PathBuf,
  frame_counter: AtomicU16,
  always: bool,
}

impl FromUrlWithScheme for DirectoryRecordOutput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn from_url(uri: &url::Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(DirectoryRecordOutputError::SchemeMismatch);
    }

    let always = uri.query_pairs().any(|(k, _)| k == "always");

    Ok(DirectoryRecordOutput {
      directory: PathBuf::from(uri.path()),
      frame_counter: AtomicU16::new(0),
      always,
    })
  }
}

fn box_record(item: &DetectionBox) -> Value {
  json!({
    "class_index": item.class_index,
    "class_name": item.class_name,
    "confidence": item.confidence,
    "bbox": [item.x1, item.y1, item.x2, item.y2],
    "center": [item.cx, item.cy, item.w, item.h],
  })
}

/// 单帧检测结果的 JSON 记录
pub fn frame_record(frame: &TensorFrame, result: &DetectResult, now: DateTime<Utc>) -> Value {
  json!({
    "frame": frame.index(),
    "source": frame.source().display().to_string(),
    "timestamp": now.to_rfc3339(),
    "candidates": result.candidates,
    "detections": result.iter().map(box_record).collect::<Vec<_>>(),
  })
}

impl DirectoryRecordOutput {
  fn frame_id(&self) -> u16 {
    self.frame_counter.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
  }

  fn day_directory(&self, now: DateTime<Utc>) -> Result<PathBuf, DirectoryRecordOutputError> {
    let directory = self
      .directory
      .join(now.year().to_string())
      .join(format!("{:02}", now.month()))
      .join(format!("{:02}", now.day()));
    std::fs::create_dir_all(&directory)?;
    Ok(directory)
  }

  /// 以 `create_new` 打开记录文件，不覆盖已有记录。
  ///
  /// 文件名为 `HH-MM-SS.ffffff-{帧序号}-{计数:04X}.json`，重名时递增计数。
  fn create_record_file(
    &self,
    directory: &Path,
    frame_index: usize,
    now: DateTime<Utc>,
  ) -> Result<(PathBuf, std::fs::File), DirectoryRecordOutputError> {
    let stamp = now.format("%H-%M-%S%.6f");
    for _ in 0..MAX_NAME_ATTEMPTS {
      let path = directory.join(format!("{}-{}-{:04X}.json", stamp, frame_index, self.frame_id()));
      match OpenOptions::new().write(true).create_new(true).open(&path) {
        Ok(file) => return Ok((path, file)),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
          debug!("记录文件已存在: {}", path.display());
        }
        Err(e) => return Err(e.into()),
      }
    }
    Err(DirectoryRecordOutputError::NameExhausted(directory.to_path_buf()))
  }
}

impl Render<TensorFrame, DetectResult> for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn render_result(&self, frame: &TensorFrame, result: &DetectResult) -> Result<(), Self::Error> {
    if !self.always && result.is_empty() {
      return Ok(());
    }

    let now = Utc::now();
    let directory = self.day_directory(now)?;
    let record = frame_record(frame, result, now);
    let (path, mut file) = self.create_record_file(&directory, frame.index(), now)?;
    file.write_all(&serde_json::to_vec_pretty(&record)?)?;
    debug!("写入检测记录: {}", path.display());
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn walk(dir: &std::path::Path, found: &mut Vec<PathBuf>) {
    for entry in std::fs::read_dir(dir).unwrap() {
      let path = entry.unwrap().path();
      if path.is_dir() {
        walk(&path, found);
      } else {
        found.push(path);
      }
    }
  }

  fn result() -> DetectResult {
    DetectResult {
      items: vec![DetectionBox {
        x1: 0.4,
        y1: 0.4,
        x2: 0.6,
        y2: 0.6,
        cx: 0.5,
        cy: 0.5,
        w: 0.2,
        h: 0.2,
        confidence: 0.9,
        class_index: 0,
        class_name: "person".to_string(),
      }]
      .into_boxed_slice(),
      candidates: 2,
    }
  }

  #[test]
  fn record_contains_boxes() {
    let frame = TensorFrame::new(7, "frame.bin", Box::new([]));
    let record = frame_record(&frame, &result(), Utc::now());
    assert_eq!(record["frame"], 7);
    assert_eq!(record["candidates"], 2);
    assert_eq!(record["detections"][0]["class_name"], "person");
    assert_eq!(record["detections"][0]["bbox"].as_array().map(Vec::len), Some(4));
  }

  #[test]
  fn skips_empty_results_unless_always() {
    let dir = tempfile::tempdir().unwrap();
    let frame = TensorFrame::new(0, "frame.bin", Box::new([]));

    let url = url::Url::parse(&format!("folder://{}", dir.path().display())).unwrap();
    let output = DirectoryRecordOutput::from_url(&url).unwrap();
    output.render_result(&frame, &DetectResult::default()).unwrap();
    let mut found = Vec::new();
    walk(dir.path(), &mut found);
    assert!(found.is_empty());

    output.render_result(&frame, &result()).unwrap();
    let url = url::Url::parse(&format!("folder://{}?always", dir.path().display())).unwrap();
    let output = DirectoryRecordOutput::from_url(&url).unwrap();
    output.render_result(&frame, &DetectResult::default()).unwrap();

    let mut found = Vec::new();
    walk(dir.path(), &mut found);
    assert_eq!(found.len(), 2);
    assert!(found.iter().all(|p| p.extension().is_some_and(|e| e == "json")));
  }

  #[test]
  fn outputs_sharing_a_folder_keep_every_record() {
    let dir = tempfile::tempdir().unwrap();
    let url = url::Url::parse(&format!("folder://{}?always", dir.path().display())).unwrap();
    let frame = TensorFrame::new(0, "frame.bin", Box::new([]));

    // 两个实例的计数都从 0 开始，同一时刻写入同一帧
    let first = DirectoryRecordOutput::from_url(&url).unwrap();
    let second = DirectoryRecordOutput::from_url(&url).unwrap();
    for _ in 0..3 {
      first.render_result(&frame, &DetectResult::default()).unwrap();
      second.render_result(&frame, &DetectResult::default()).unwrap();
    }

    let mut found = Vec::new();
    walk(dir.path(), &mut found);
    assert_eq!(found.len(), 6);
  }

  #[test]
  fn existing_record_is_not_overwritten() {
    let dir = tempfile::tempdir().unwrap();
    let url = url::Url::parse(&format!("folder://{}", dir.path().display())).unwrap();
    let output = DirectoryRecordOutput::from_url(&url).unwrap();
    let now = Utc::now();

    let directory = output.day_directory(now).unwrap();
    let (taken, _) = output.create_record_file(&directory, 3, now).unwrap();
    std::fs::write(&taken, "keep").unwrap();

    // 计数归零后再次生成同名文件
    output.frame_counter.store(0, Ordering::Relaxed);
    let (path, _) = output.create_record_file(&directory, 3, now).unwrap();
    assert_ne!(path, taken);
    assert_eq!(std::fs::read_to_string(&taken).unwrap(), "keep");
  }
}
