// 该文件是 Shanan （山南西风） 项目的一部分。
// src/output/crops.rs - 检测目标裁剪输出
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use image::RgbImage;
use image::imageops::crop_imm;
use tracing::warn;

use crate::coords::clamp_to_image;
use crate::output::{ImageEncoding, OutputError, Render, check_batch};
use crate::pipeline::{RankedDetection, RankedResult};

#[derive(Debug, Clone, Copy, Default)]
pub struct CropsOutput {
  encoding: ImageEncoding,
}

impl CropsOutput {
  pub fn new(encoding: ImageEncoding) -> Self {
    Self { encoding }
  }

  fn crop(&self, image: &RgbImage, det: &RankedDetection) -> Result<Option<Vec<u8>>, OutputError> {
    let Some((x, y, w, h)) = clamp_to_image(&det.bbox, image.height(), image.width()) else {
      warn!("检测框 {:?} 在图像内面积为 0，跳过裁剪", det.bbox);
      return Ok(None);
    };

    let roi = crop_imm(image, x, y, w, h).to_image();
    self.encoding.encode(&roi).map(Some)
  }

  fn crop_all(&self, image: &RgbImage, result: &RankedResult) -> Result<Vec<Vec<u8>>, OutputError> {
    let mut crops = Vec::with_capacity(result.len());
    for det in result {
      if let Some(bytes) = self.crop(image, det)? {
        crops.push(bytes);
      }
    }
    Ok(crops)
  }

  /// 单图模式：只裁剪排名第一的目标，未检测到时返回 `None`
  pub fn render_first(
    &self,
    image: &RgbImage,
    result: &RankedResult,
  ) -> Result<Option<Vec<u8>>, OutputError> {
    match result.first() {
      Some(det) => self.crop(image, det),
      None => Ok(None),
    }
  }
}

impl Render for CropsOutput {
  type Output = Vec<Vec<Vec<u8>>>;

  fn render_result(
    &self,
    images: &[RgbImage],
    results: &[RankedResult],
  ) -> Result<Self::Output, OutputError> {
    check_batch(images, results)?;
    images
      .iter()
      .zip(results)
      .map(|(image, result)| self.crop_all(image, result))
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::Rgb;

  fn det(bbox: [i64; 4], score: f32) -> RankedDetection {
    RankedDetection {
      bbox,
      score,
      class_id: 1,
    }
  }

  fn decode_size(bytes: &[u8]) -> (u32, u32) {
    let image = image::load_from_memory(bytes).unwrap();
    (image.width(), image.height())
  }

  #[test]
  fn crops_every_kept_detection() {
    let image = RgbImage::from_pixel(100, 200, Rgb([1, 2, 3]));
    let results = vec![vec![det([50, 10, 150, 90], 0.9), det([0, 0, 20, 40], 0.8)]];

    let crops = CropsOutput::default()
      .render_result(&[image], &results)
      .unwrap();
    assert_eq!(crops.len(), 1);
    assert_eq!(crops[0].len(), 2);
    // (宽, 高)
    assert_eq!(decode_size(&crops[0][0]), (80, 100));
    assert_eq!(decode_size(&crops[0][1]), (40, 20));
  }

  #[test]
  fn crop_content_matches_source_region() {
    let mut image = RgbImage::from_pixel(10, 10, Rgb([0, 0, 0]));
    image.put_pixel(3, 2, Rgb([200, 100, 50]));
    let results = vec![vec![det([2, 3, 4, 5], 0.9)]];

    let crops = CropsOutput::default()
      .render_result(&[image], &results)
      .unwrap();
    let roi = image::load_from_memory(&crops[0][0]).unwrap().to_rgb8();
    assert_eq!(roi.dimensions(), (2, 2));
    assert_eq!(*roi.get_pixel(0, 0), Rgb([200, 100, 50]));
  }

  #[test]
  fn empty_result_gives_empty_list_and_none_sentinel() {
    let image = RgbImage::new(10, 10);
    let output = CropsOutput::default();
    let crops = output
      .render_result(std::slice::from_ref(&image), &[vec![]])
      .unwrap();
    assert_eq!(crops, vec![Vec::<Vec<u8>>::new()]);
    assert_eq!(output.render_first(&image, &vec![]).unwrap(), None);
  }

  #[test]
  fn degenerate_crop_is_skipped() {
    let image = RgbImage::new(10, 10);
    let results = vec![vec![det([5, 5, 5, 9], 0.9), det([20, 20, 30, 30], 0.8)]];
    let crops = CropsOutput::default()
      .render_result(&[image], &results)
      .unwrap();
    assert!(crops[0].is_empty());
  }
}
