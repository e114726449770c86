// 该文件是 Kanjian （看见） 项目的一部分。
// src/model/geometry.rs - 检测框几何计算
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

/// 角点形式的框 `[x_min, y_min, x_max, y_max]`
pub trait Corners {
  fn corners(&self) -> [f32; 4];
}

impl Corners for [f32; 4] {
  fn corners(&self) -> [f32; 4] {
    *self
  }
}

pub fn area<B: Corners + ?Sized>(b: &B) -> f32 {
  let [x1, y1, x2, y2] = b.corners();
  (x2 - x1) * (y2 - y1)
}

/// 计算两个框的 IoU，任一框面积不大于 0 时为 0
pub fn iou<A: Corners + ?Sized, B: Corners + ?Sized>(a: &A, b: &B) -> f32 {
  let area_a = area(a);
  let area_b = area(b);
  if area_a <= 0.0 || area_b <= 0.0 {
    return 0.0;
  }

  let [ax1, ay1, ax2, ay2] = a.corners();
  let [bx1, by1, bx2, by2] = b.corners();

  let ix1 = ax1.max(bx1);
  let iy1 = ay1.max(by1);
  let ix2 = ax2.min(bx2);
  let iy2 = ay2.min(by2);

  let intersection = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);

  intersection / (area_a + area_b - intersection)
}
