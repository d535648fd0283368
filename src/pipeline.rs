// 该文件是 Shanan （山南西风） 项目的一部分。
// src/pipeline.rs - 检测后处理流水线
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use image::RgbImage;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use thiserror::Error;
use tracing::debug;

use crate::config::OutputConfig;
use crate::coords::to_absolute;
use crate::geometry::AbsBox;
use crate::model::{Detection, Detections};
use crate::suppress::{Suppress, SuppressionStrategy};

#[derive(Error, Debug)]
pub enum PipelineError {
  #[error("检测数组长度不一致: boxes {boxes}, scores {scores}, classes {classes}")]
  InputShapeMismatch {
    boxes: usize,
    scores: usize,
    classes: usize,
  },
  #[error("num_detections {num_detections} 超出数组长度 {available}")]
  NumDetectionsOutOfRange {
    num_detections: usize,
    available: usize,
  },
  #[error("图像数量与检测结果数量不一致: 图像 {images}, 检测结果 {detections}")]
  BatchMismatch { images: usize, detections: usize },
}

/// 排序后的单个检测结果（像素坐标）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedDetection {
  pub bbox: AbsBox, // [y_min, x_min, y_max, x_max]
  pub score: f32,
  pub class_id: i64,
}

/// 单张图像的最终结果，按分数降序
pub type RankedResult = Vec<RankedDetection>;

/// 过滤 → 抑制 → 排序 → 截断
#[derive(Debug, Clone)]
pub struct DetectionPipeline<S = SuppressionStrategy> {
  config: OutputConfig,
  suppression: S,
}

impl DetectionPipeline<SuppressionStrategy> {
  pub fn with_config(config: OutputConfig) -> Self {
    Self::new(config, SuppressionStrategy::default())
  }
}

impl<S: Suppress> DetectionPipeline<S> {
  pub fn new(config: OutputConfig, suppression: S) -> Self {
    Self {
      config,
      suppression,
    }
  }

  /// 仅保留分数严格大于置信度阈值的检测
  pub fn filter(&self, detections: &Detections) -> Detections {
    let threshold = self.config.confidence_threshold;
    detections.iter().filter(|d| d.score > threshold).collect()
  }

  /// 单张图像的相对坐标结果
  pub fn select(&self, detections: &Detections) -> Vec<Detection> {
    let filtered = self.filter(detections);
    let survivors = self
      .suppression
      .suppress(&filtered, self.config.nms_threshold);

    // 稳定排序，同分保持抑制输出顺序
    let mut ranked: Vec<Detection> = survivors.iter().collect();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked.truncate(self.config.max_objects);

    debug!(
      "候选 {} 个, 过滤后 {} 个, 抑制后 {} 个, 输出 {} 个",
      detections.len(),
      filtered.len(),
      survivors.len(),
      ranked.len()
    );

    ranked
  }

  /// 单张图像的像素坐标结果
  pub fn process(&self, detections: &Detections, height: u32, width: u32) -> RankedResult {
    self
      .select(detections)
      .into_iter()
      .map(|d| RankedDetection {
        bbox: to_absolute(&d.bbox, height, width),
        score: d.score,
        class_id: d.class_id,
      })
      .collect()
  }
}

impl<S: Suppress + Sync> DetectionPipeline<S> {
  /// 批量处理，第 i 个结果对应第 i 张图像
  pub fn process_batch(
    &self,
    batch: &[Detections],
    images: &[RgbImage],
  ) -> Result<Vec<RankedResult>, PipelineError> {
    if batch.len() != images.len() {
      return Err(PipelineError::BatchMismatch {
        images: images.len(),
        detections: batch.len(),
      });
    }

    let process = |(detections, image): (&Detections, &RgbImage)| {
      self.process(detections, image.height(), image.width())
    };

    #[cfg(feature = "parallel")]
    let results = batch.par_iter().zip(images.par_iter()).map(process).collect();
    #[cfg(not(feature = "parallel"))]
    let results = batch.iter().zip(images.iter()).map(process).collect();

    Ok(results)
  }
}
