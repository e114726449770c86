// 该文件是 Kanjian （看见） 项目的一部分。
// src/model/suppress.rs - 非极大值抑制
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

use super::geometry::{Corners, iou};

/// 贪心非极大值抑制。
///
/// 按候选框原有的解码顺序遍历，**不按置信度排序**：仍处于激活状态的框被保留，
/// 并将其后所有与之 IoU 超过 `iou_threshold` 的激活框标记为抑制。
/// 抑制不区分类别，因此靠前的低分框可以抑制靠后的高分框，
/// 不同类别的重叠框之间也会互相抑制。
///
/// 结果保持原有顺序，框本身不会被修改。
pub fn suppress<T: Corners + Clone>(candidates: &[T], iou_threshold: f32) -> Vec<T> {
  let mut selected = Vec::new();
  let mut active = vec![true; candidates.len()];

  for (i, candidate) in candidates.iter().enumerate() {
    if !active[i] {
      continue;
    }
    selected.push(candidate.clone());

    for j in (i + 1)..candidates.len() {
      if active[j] && iou(candidate, &candidates[j]) > iou_threshold {
        active[j] = false;
      }
    }
  }

  selected
}
