// 该文件是 Shanan （山南西风） 项目的一部分。
// src/output.rs - 输出定义
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::fmt;
use std::io::Cursor;
use std::str::FromStr;

use clap::ValueEnum;
use image::{ImageFormat, RgbImage};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pipeline::RankedResult;

pub mod draw;

mod boxes;
pub use self::boxes::{BoxesOutput, CoordinateRecord};

mod crops;
pub use self::crops::CropsOutput;

mod vis_objects;
pub use self::vis_objects::VisObjectsOutput;

#[derive(Error, Debug)]
pub enum OutputError {
  #[error("图像数量与检测结果数量不一致: 图像 {images}, 检测结果 {results}")]
  BatchMismatch { images: usize, results: usize },
  #[error("图像编码错误: {0}")]
  EncodeError(#[from] image::ImageError),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("字体无效: {0}")]
  InvalidFont(#[from] ab_glyph::InvalidFont),
  #[error("标注输出需要字体")]
  MissingFont,
}

/// 将检测结果渲染为某种输出
pub trait Render {
  type Output;

  fn render_result(
    &self,
    images: &[RgbImage],
    results: &[RankedResult],
  ) -> Result<Self::Output, OutputError>;
}

/// 输出类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum OutputKind {
  /// 像素坐标、分数与类别名称
  Boxes,
  /// 每个检测目标的裁剪图像
  Crops,
  /// 标注了检测框的整幅图像
  VisObjects,
}

impl fmt::Display for OutputKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      OutputKind::Boxes => write!(f, "boxes"),
      OutputKind::Crops => write!(f, "crops"),
      OutputKind::VisObjects => write!(f, "vis_objects"),
    }
  }
}

impl FromStr for OutputKind {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "boxes" | "coordinates" | "output_boxes" => Ok(OutputKind::Boxes),
      "crops" | "crop" | "output_crops" => Ok(OutputKind::Crops),
      "vis_objects" | "vis-objects" | "output_vis_objects" => Ok(OutputKind::VisObjects),
      other => Err(format!("未知的输出类型: {}", other)),
    }
  }
}

/// 编码后的图像格式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ImageEncoding {
  #[default]
  Png,
  Jpeg,
}

impl ImageEncoding {
  pub fn format(self) -> ImageFormat {
    match self {
      ImageEncoding::Png => ImageFormat::Png,
      ImageEncoding::Jpeg => ImageFormat::Jpeg,
    }
  }

  pub fn extension(self) -> &'static str {
    match self {
      ImageEncoding::Png => "png",
      ImageEncoding::Jpeg => "jpg",
    }
  }

  pub fn encode(self, image: &RgbImage) -> Result<Vec<u8>, OutputError> {
    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, self.format())?;
    Ok(buffer.into_inner())
  }
}

/// 各输出类型的渲染结果
#[derive(Debug, Clone, PartialEq)]
pub enum Rendered {
  Boxes(Vec<Vec<CoordinateRecord>>),
  Crops(Vec<Vec<Vec<u8>>>),
  /// 空批次时为 `None`
  VisObjects(Option<Vec<u8>>),
}

impl Rendered {
  pub fn kind(&self) -> OutputKind {
    match self {
      Rendered::Boxes(_) => OutputKind::Boxes,
      Rendered::Crops(_) => OutputKind::Crops,
      Rendered::VisObjects(_) => OutputKind::VisObjects,
    }
  }
}

/// 固定的三种渲染器
pub enum OutputWrapper {
  Boxes(BoxesOutput),
  Crops(CropsOutput),
  VisObjects(VisObjectsOutput),
}

impl Render for OutputWrapper {
  type Output = Rendered;

  fn render_result(
    &self,
    images: &[RgbImage],
    results: &[RankedResult],
  ) -> Result<Self::Output, OutputError> {
    match self {
      OutputWrapper::Boxes(output) => output.render_result(images, results).map(Rendered::Boxes),
      OutputWrapper::Crops(output) => output.render_result(images, results).map(Rendered::Crops),
      OutputWrapper::VisObjects(output) => output
        .render_result(images, results)
        .map(Rendered::VisObjects),
    }
  }
}

fn check_batch(images: &[RgbImage], results: &[RankedResult]) -> Result<(), OutputError> {
  if images.len() != results.len() {
    return Err(OutputError::BatchMismatch {
      images: images.len(),
      results: results.len(),
    });
  }
  Ok(())
}
