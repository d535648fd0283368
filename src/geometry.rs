// 该文件是 Shanan （山南西风） 项目的一部分。
// src/geometry.rs - 矩形几何工具
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

/// 相对坐标边界框 [y_min, x_min, y_max, x_max]，取值范围 [0, 1]
pub type RelBox = [f64; 4];

/// 像素坐标边界框 [y_min, x_min, y_max, x_max]
pub type AbsBox = [i64; 4];

/// 两个轴对齐矩形的交集面积，不相交时为 0
///
/// 两个矩形的坐标顺序需一致，计算对 x/y 轴对称。
pub fn intersection_area(a: &RelBox, b: &RelBox) -> f64 {
  let overlap_0 = (a[2].min(b[2]) - a[0].max(b[0])).max(0.0);
  let overlap_1 = (a[3].min(b[3]) - a[1].max(b[1])).max(0.0);
  overlap_0 * overlap_1
}

/// 矩形面积，与角点顺序无关
pub fn area(rect: &RelBox) -> f64 {
  (rect[2] - rect[0]).abs() * (rect[3] - rect[1]).abs()
}

/// 交集面积与较小矩形面积之比 (IoM)
pub fn overlap_ratio(a: &RelBox, b: &RelBox) -> f64 {
  let min_area = area(a).min(area(b));
  if min_area > 0.0 {
    intersection_area(a, b) / min_area
  } else {
    0.0
  }
}

/// 交并比 (IoU)
pub fn iou(a: &RelBox, b: &RelBox) -> f64 {
  let intersection = intersection_area(a, b);
  let union = area(a) + area(b) - intersection;
  if union > 0.0 {
    intersection / union
  } else {
    0.0
  }
}
