// 该文件是 Shanan （山南西风） 项目的一部分。
// src/coords.rs - 相对坐标到像素坐标的映射
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use crate::geometry::{AbsBox, RelBox};

/// 将 [y_min, x_min, y_max, x_max] 相对坐标转换为像素坐标
///
/// 每个坐标乘以对应尺寸后向零截断，不做裁剪。坐标 1.0 会映射为完整的
/// 尺寸值，切片时应作为开区间上界使用。
pub fn to_absolute(rel: &RelBox, height: u32, width: u32) -> AbsBox {
  let (h, w) = (f64::from(height), f64::from(width));
  [
    (rel[0] * h) as i64,
    (rel[1] * w) as i64,
    (rel[2] * h) as i64,
    (rel[3] * w) as i64,
  ]
}

/// 将像素坐标裁剪到图像范围内，返回 (x, y, 宽, 高)
///
/// 裁剪后宽或高为 0 时返回 `None`。
pub fn clamp_to_image(abs: &AbsBox, height: u32, width: u32) -> Option<(u32, u32, u32, u32)> {
  let (h, w) = (i64::from(height), i64::from(width));
  let y_min = abs[0].min(abs[2]).clamp(0, h);
  let y_max = abs[0].max(abs[2]).clamp(0, h);
  let x_min = abs[1].min(abs[3]).clamp(0, w);
  let x_max = abs[1].max(abs[3]).clamp(0, w);

  if x_max <= x_min || y_max <= y_min {
    return None;
  }

  Some((
    x_min as u32,
    y_min as u32,
    (x_max - x_min) as u32,
    (y_max - y_min) as u32,
  ))
}
