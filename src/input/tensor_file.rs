// 该文件是 Kanjian （看见） 项目的一部分。
// src/input/tensor_file.rs - 输出张量转储文件输入
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

use image::{ImageReader, RgbImage};
use thiserror::Error;
use tracing::{debug, error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::{TensorFrame, f32_from_le_bytes},
};

const TENSOR_EXTENSION: &str = "bin";
const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

#[derive(Error, Debug)]
pub enum TensorFileInputError {
  #[error("URI schema mismatch")]
  SchemaMismatch,
  #[error("I/O error: {0}")]
  IoError(#[from] std::io::Error),
  #[error("No tensor files found in {0}")]
  NoTensorFiles(PathBuf),
}

/// 逐帧读取已转储的模型输出张量。
///
/// 每个 `.bin` 文件是一帧小端 `f32` 原始数据；路径为目录时按文件名排序依次读取。
/// 与张量文件同名的 png/jpg/jpeg 图像作为该帧的原始图像一并加载。
pub struct TensorFileInput {
  files: std::vec::IntoIter<PathBuf>,
  index: usize,
}

impl FromUrlWithScheme for TensorFileInput {
  const SCHEME: &'static str = "tensor";
}

impl FromUrl for TensorFileInput {
  type Error = TensorFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(TensorFileInputError::SchemaMismatch);
    }
    Self::open(url.path())
  }
}

impl TensorFileInput {
  pub fn open(path: impl AsRef<Path>) -> Result<Self, TensorFileInputError> {
    let path = path.as_ref();
    let files = if path.is_dir() {
      let mut files = Vec::new();
      for entry in std::fs::read_dir(path)? {
        let file = entry?.path();
        if file.extension().is_some_and(|ext| ext == TENSOR_EXTENSION) {
          files.push(file);
        }
      }
      files.sort();
      files
    } else {
      // 单个文件时直接确认可读
      std::fs::metadata(path)?;
      vec![path.to_path_buf()]
    };

    if files.is_empty() {
      return Err(TensorFileInputError::NoTensorFiles(path.to_path_buf()));
    }

    info!("张量输入: {} 个文件", files.len());
    Ok(Self {
      files: files.into_iter(),
      index: 0,
    })
  }
}

fn read_frame(index: usize, path: &Path) -> Option<TensorFrame> {
  let bytes = match std::fs::read(path) {
    Ok(bytes) => bytes,
    Err(e) => {
      error!("读取张量文件 {} 失败: {}", path.display(), e);
      return None;
    }
  };

  let Some(tensor) = f32_from_le_bytes(&bytes) else {
    error!(
      "张量文件 {} 长度 {} 不是 4 的倍数",
      path.display(),
      bytes.len()
    );
    return None;
  };

  let frame = TensorFrame::new(index, path, tensor);
  match companion_image(path) {
    Some(image) => Some(frame.with_image(image)),
    None => Some(frame),
  }
}

fn companion_image(path: &Path) -> Option<RgbImage> {
  let image_path = IMAGE_EXTENSIONS
    .iter()
    .map(|ext| path.with_extension(ext))
    .find(|candidate| candidate.is_file())?;

  let decoded = ImageReader::open(&image_path)
    .map_err(image::ImageError::IoError)
    .and_then(|reader| reader.decode());
  match decoded {
    Ok(image) => {
      debug!("加载原始图像: {}", image_path.display());
      Some(image.to_rgb8())
    }
    Err(e) => {
      error!("加载图像 {} 失败: {}", image_path.display(), e);
      None
    }
  }
}

impl Iterator for TensorFileInput {
  type Item = TensorFrame;

  fn next(&mut self) -> Option<Self::Item> {
    // 无法读取的文件记录错误后跳过
    for path in self.files.by_ref() {
      if let Some(frame) = read_frame(self.index, &path) {
        self.index += 1;
        return Some(frame);
      }
    }
    None
  }
}
