// 该文件是 Shanan （山南西风） 项目的一部分。
// src/output/vis_objects.rs - 标注图像输出
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::sync::Arc;

use image::RgbImage;
use tracing::{debug, warn};

use crate::label_map::LabelMap;
use crate::output::draw::{Draw, label_text};
use crate::output::{ImageEncoding, OutputError, Render, check_batch};
use crate::pipeline::RankedResult;

pub struct VisObjectsOutput {
  label_map: Arc<LabelMap>,
  draw: Draw,
  show_confidence: bool,
  encoding: ImageEncoding,
}

impl VisObjectsOutput {
  pub fn new(label_map: Arc<LabelMap>, draw: Draw, show_confidence: bool) -> Self {
    Self {
      label_map,
      draw,
      show_confidence,
      encoding: ImageEncoding::default(),
    }
  }

  pub fn with_encoding(mut self, encoding: ImageEncoding) -> Self {
    self.encoding = encoding;
    self
  }

  /// 在图像副本上绘制，原图保持不变
  pub fn annotate(&self, image: &RgbImage, result: &RankedResult) -> RgbImage {
    let mut annotated = image.clone();
    // 按排名顺序绘制，排名靠后的覆盖在上层
    for det in result {
      let class_name = self.label_map.display_name(det.class_id);
      let label = label_text(&class_name, det.score, self.show_confidence);
      debug!("绘制 {} at {:?}", label, det.bbox);
      self.draw.draw_bbox_with_label(&mut annotated, &det.bbox, &label);
    }
    annotated
  }
}

impl Render for VisObjectsOutput {
  type Output = Option<Vec<u8>>;

  /// 仅处理批次中的第一张图像
  fn render_result(
    &self,
    images: &[RgbImage],
    results: &[RankedResult],
  ) -> Result<Self::Output, OutputError> {
    check_batch(images, results)?;
    let (Some(image), Some(result)) = (images.first(), results.first()) else {
      return Ok(None);
    };
    if images.len() > 1 {
      warn!("标注输出只处理第一张图像，忽略其余 {} 张", images.len() - 1);
    }

    let annotated = self.annotate(image, result);
    self.encoding.encode(&annotated).map(Some)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::pipeline::RankedDetection;
  use ab_glyph::FontArc;
  use image::Rgb;

  const FONT: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");

  fn output_with(show_confidence: bool) -> VisObjectsOutput {
    let label_map: LabelMap = [(1, "placa".to_string())].into_iter().collect();
    let draw = Draw::new(FontArc::try_from_slice(FONT).unwrap());
    VisObjectsOutput::new(Arc::new(label_map), draw, show_confidence)
  }

  fn output() -> VisObjectsOutput {
    output_with(true)
  }

  fn label_band(image: &RgbImage) -> Vec<u32> {
    // 左上角 (40, 100) 上方 15 像素的标签带
    (40..200)
      .filter(|&x| (85..100).any(|y| *image.get_pixel(x, y) != Rgb([0, 0, 0])))
      .collect()
  }

  #[test]
  fn annotation_leaves_original_untouched() {
    let image = RgbImage::from_pixel(20, 20, Rgb([9, 9, 9]));
    let result = vec![RankedDetection {
      bbox: [2, 2, 10, 10],
      score: 0.9,
      class_id: 1,
    }];

    let annotated = output().annotate(&image, &result);
    assert!(image.pixels().all(|p| *p == Rgb([9, 9, 9])));
    assert_eq!(*annotated.get_pixel(2, 2), Rgb([255, 0, 0]));
  }

  #[test]
  fn confidence_extends_the_label() {
    let image = RgbImage::new(200, 200);
    let result = vec![RankedDetection {
      bbox: [100, 40, 180, 160],
      score: 0.9,
      class_id: 1,
    }];

    let plain = label_band(&output_with(false).annotate(&image, &result));
    let scored = label_band(&output_with(true).annotate(&image, &result));
    assert!(!plain.is_empty());
    assert!(scored.last() > plain.last());
  }

  #[test]
  fn renders_only_first_image() {
    let images = vec![RgbImage::new(30, 20), RgbImage::new(5, 5)];
    let results = vec![vec![], vec![]];
    let bytes = output().render_result(&images, &results).unwrap().unwrap();
    let decoded = image::load_from_memory(&bytes).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (30, 20));
  }

  #[test]
  fn empty_batch_gives_none() {
    assert_eq!(output().render_result(&[], &[]).unwrap(), None);
  }
}
