// 该文件是 Shanan （山南西风） 项目的一部分。
// src/output/draw.rs - 目标检测结果可视化
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::Path;

use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use tracing::{info, warn};

use crate::geometry::AbsBox;
use crate::output::OutputError;

// 文本渲染常量
const LABEL_FONT_SIZE: f32 = 20.0;
const LABEL_OFFSET: i32 = 15; // 标签位于左上角上方
const BOX_COLOR: [u8; 3] = [255, 0, 0]; // 红色
const BOX_THICKNESS: u32 = 2;

/// 从文件加载 TrueType/OpenType 字体
pub fn load_font(path: impl AsRef<Path>) -> Result<FontArc, OutputError> {
  let path = path.as_ref();
  info!("加载字体文件: {}", path.display());
  let data = std::fs::read(path)?;
  Ok(FontArc::try_from_vec(data)?)
}

/// 标签文本，`show_confidence` 时附加百分比分数
pub fn label_text(class_name: &str, score: f32, show_confidence: bool) -> String {
  if show_confidence {
    format!("{}-{:.2}%", class_name, score * 100.0)
  } else {
    class_name.to_string()
  }
}

#[derive(Clone)]
pub struct Draw {
  font: FontArc,
  font_scale: PxScale,
  label_offset: i32,
  color: Rgb<u8>,
  thickness: u32,
}

impl Draw {
  pub fn new(font: FontArc) -> Self {
    Self {
      font,
      font_scale: PxScale::from(LABEL_FONT_SIZE),
      label_offset: LABEL_OFFSET,
      color: Rgb(BOX_COLOR),
      thickness: BOX_THICKNESS,
    }
  }

  /// 在图像上绘制像素坐标框 [y_min, x_min, y_max, x_max] 及其标签
  pub fn draw_bbox_with_label(&self, image: &mut RgbImage, bbox: &AbsBox, label: &str) {
    let (Ok(y1), Ok(x1), Ok(y2), Ok(x2)) = (
      i32::try_from(bbox[0]),
      i32::try_from(bbox[1]),
      i32::try_from(bbox[2]),
      i32::try_from(bbox[3]),
    ) else {
      warn!("检测框超出可绘制范围，跳过: {:?}", bbox);
      return;
    };
    let (left, right) = (x1.min(x2), x1.max(x2));
    let (top, bottom) = (y1.min(y2), y1.max(y2));

    // 边框包含右下角像素，逐层向内收缩
    for t in 0..i64::from(self.thickness) {
      let Some(rect) = stroke_rect(
        image,
        i64::from(left) + t,
        i64::from(top) + t,
        i64::from(right) - t,
        i64::from(bottom) - t,
      ) else {
        break;
      };
      draw_hollow_rect_mut(image, rect, self.color);
    }

    draw_text_mut(
      image,
      self.color,
      left,
      top.saturating_sub(self.label_offset),
      self.font_scale,
      &self.font,
      label,
    );
  }
}

/// 一层边框对应的矩形，超出图像的边裁剪到图像外一个像素
fn stroke_rect(image: &RgbImage, left: i64, top: i64, right: i64, bottom: i64) -> Option<Rect> {
  if right < left || bottom < top {
    return None;
  }
  let clip_x = |v: i64| v.clamp(-1, i64::from(image.width()));
  let clip_y = |v: i64| v.clamp(-1, i64::from(image.height()));
  let (left, right) = (clip_x(left), clip_x(right));
  let (top, bottom) = (clip_y(top), clip_y(bottom));

  let width = i32::try_from(right - left + 1).ok()?;
  let height = i32::try_from(bottom - top + 1).ok()?;
  let left = i32::try_from(left).ok()?;
  let top = i32::try_from(top).ok()?;
  // Rect 的右、下边界需在 i32 内
  left.checked_add(width)?;
  top.checked_add(height)?;
  Some(Rect::at(left, top).of_size(width.unsigned_abs(), height.unsigned_abs()))
}

#[cfg(test)]
mod tests {
  use super::*;

  const FONT: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");

  fn draw() -> Draw {
    Draw::new(FontArc::try_from_slice(FONT).unwrap())
  }

  fn painted(image: &RgbImage, xs: std::ops::Range<u32>, ys: std::ops::Range<u32>) -> usize {
    ys.flat_map(|y| xs.clone().map(move |x| (x, y)))
      .filter(|&(x, y)| *image.get_pixel(x, y) != Rgb([0, 0, 0]))
      .count()
  }

  #[test]
  fn label_with_and_without_confidence() {
    assert_eq!(label_text("placa", 0.875, false), "placa");
    assert_eq!(label_text("placa", 0.875, true), "placa-87.50%");
  }

  #[test]
  fn draws_two_pixel_border_through_far_corner() {
    let mut image = RgbImage::new(40, 40);
    draw().draw_bbox_with_label(&mut image, &[20, 4, 30, 14], "");

    let red = Rgb(BOX_COLOR);
    assert_eq!(*image.get_pixel(4, 20), red);
    assert_eq!(*image.get_pixel(5, 21), red);
    // 右下角 (x2, y2) 本身也被绘制
    assert_eq!(*image.get_pixel(14, 30), red);
    assert_eq!(*image.get_pixel(13, 29), red);
    assert_eq!(*image.get_pixel(15, 30), Rgb([0, 0, 0]));
    assert_eq!(*image.get_pixel(14, 31), Rgb([0, 0, 0]));
    assert_eq!(*image.get_pixel(9, 25), Rgb([0, 0, 0]));
  }

  #[test]
  fn label_is_drawn_above_the_box() {
    let mut image = RgbImage::new(200, 200);
    // [0.5, 0.2, 0.9, 0.8] 映射到 200x200
    draw().draw_bbox_with_label(&mut image, &[100, 40, 180, 160], "placa-90.00%");

    // 标签区域: 左上角上方 15 像素，边框之外
    let above = painted(&image, 40..160, 85..100);
    assert!(above > 0, "no label pixels above the box");
    assert_eq!(painted(&image, 0..200, 0..80), 0);
  }

  #[test]
  fn longer_label_covers_more_columns() {
    let mut short = RgbImage::new(200, 200);
    let mut long = RgbImage::new(200, 200);
    draw().draw_bbox_with_label(&mut short, &[100, 20, 180, 190], "placa");
    draw().draw_bbox_with_label(&mut long, &[100, 20, 180, 190], "placa-90.00%");

    let last_column = |image: &RgbImage| {
      (0..200)
        .rev()
        .find(|&x| painted(image, x..x + 1, 85..100) > 0)
        .unwrap()
    };
    assert!(last_column(&long) > last_column(&short));
  }

  #[test]
  fn degenerate_box_draws_a_line() {
    let mut image = RgbImage::new(40, 40);
    draw().draw_bbox_with_label(&mut image, &[25, 5, 25, 9], "");
    assert!((5..=9).all(|x| *image.get_pixel(x, 25) == Rgb(BOX_COLOR)));
    assert_eq!(painted(&image, 0..40, 26..40), 0);
  }

  #[test]
  fn far_out_of_range_box_is_clipped() {
    let mut image = RgbImage::new(30, 30);
    draw().draw_bbox_with_label(&mut image, &[20, 2, 1_000_000_000, 1_500_000_000], "");
    assert_eq!(*image.get_pixel(10, 20), Rgb(BOX_COLOR));
    assert_eq!(*image.get_pixel(2, 29), Rgb(BOX_COLOR));
  }

  #[test]
  fn box_beyond_i32_is_skipped() {
    let mut image = RgbImage::new(30, 30);
    draw().draw_bbox_with_label(&mut image, &[20, 0, 25, i64::MAX / 2], "placa");
    assert_eq!(painted(&image, 0..30, 0..30), 0);
  }
}
