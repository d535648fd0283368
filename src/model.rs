// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model.rs - 模型边界与检测数据定义
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::Path;

use image::RgbImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::geometry::RelBox;
use crate::pipeline::PipelineError;

/// 模型推理边界：输入一批图像，返回每张图像的原始检测结果
pub trait DetectionSource {
  type Error;

  fn infer(&self, images: &[RgbImage]) -> Result<Vec<RawDetections>, Self::Error>;
}

/// 单个检测结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
  pub bbox: RelBox, // [y_min, x_min, y_max, x_max]
  pub score: f32,
  pub class_id: i64,
}

/// 模型输出的原始检测数组（单张图像）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawDetections {
  pub detection_boxes: Vec<[f64; 4]>,
  pub detection_scores: Vec<f32>,
  pub detection_classes: Vec<f64>,
  #[serde(default)]
  pub num_detections: Option<usize>,
}

/// 按索引对齐的检测数组
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Detections {
  boxes: Vec<RelBox>,
  scores: Vec<f32>,
  classes: Vec<i64>,
}

impl Detections {
  pub fn new(
    boxes: Vec<RelBox>,
    scores: Vec<f32>,
    classes: Vec<i64>,
  ) -> Result<Self, PipelineError> {
    if boxes.len() != scores.len() || boxes.len() != classes.len() {
      return Err(PipelineError::InputShapeMismatch {
        boxes: boxes.len(),
        scores: scores.len(),
        classes: classes.len(),
      });
    }

    Ok(Self {
      boxes,
      scores,
      classes,
    })
  }

  pub fn len(&self) -> usize {
    self.boxes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.boxes.is_empty()
  }

  pub fn boxes(&self) -> &[RelBox] {
    &self.boxes
  }

  pub fn scores(&self) -> &[f32] {
    &self.scores
  }

  pub fn classes(&self) -> &[i64] {
    &self.classes
  }

  pub fn iter(&self) -> impl Iterator<Item = Detection> + '_ {
    self
      .boxes
      .iter()
      .zip(&self.scores)
      .zip(&self.classes)
      .map(|((bbox, score), class_id)| Detection {
        bbox: *bbox,
        score: *score,
        class_id: *class_id,
      })
  }

  /// 按索引挑选子集，保持给定索引顺序
  pub fn select(&self, indices: &[usize]) -> Self {
    Self {
      boxes: indices.iter().map(|&i| self.boxes[i]).collect(),
      scores: indices.iter().map(|&i| self.scores[i]).collect(),
      classes: indices.iter().map(|&i| self.classes[i]).collect(),
    }
  }
}

impl FromIterator<Detection> for Detections {
  fn from_iter<T: IntoIterator<Item = Detection>>(iter: T) -> Self {
    let mut detections = Detections::default();
    for Detection {
      bbox,
      score,
      class_id,
    } in iter
    {
      detections.boxes.push(bbox);
      detections.scores.push(score);
      detections.classes.push(class_id);
    }
    detections
  }
}

impl TryFrom<RawDetections> for Detections {
  type Error = PipelineError;

  fn try_from(raw: RawDetections) -> Result<Self, Self::Error> {
    let RawDetections {
      mut detection_boxes,
      mut detection_scores,
      mut detection_classes,
      num_detections,
    } = raw;

    if let Some(n) = num_detections {
      let shortest = detection_boxes
        .len()
        .min(detection_scores.len())
        .min(detection_classes.len());
      if n > shortest {
        return Err(PipelineError::NumDetectionsOutOfRange {
          num_detections: n,
          available: shortest,
        });
      }
      detection_boxes.truncate(n);
      detection_scores.truncate(n);
      detection_classes.truncate(n);
    }

    // 类别需为整数
    let classes = detection_classes.into_iter().map(|c| c as i64).collect();
    Detections::new(detection_boxes, detection_scores, classes)
  }
}

#[derive(Error, Debug)]
pub enum JsonDetectionSourceError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 解析错误: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("检测结果数量与图像数量不一致: 图像 {images}, 检测结果 {detections}")]
  BatchMismatch { images: usize, detections: usize },
}

/// 从 JSON 文件读取预先计算的模型输出
///
/// 文件内容为 `RawDetections` 数组，每个元素对应一张图像。
#[derive(Debug, Clone)]
pub struct JsonDetectionSource {
  batch: Vec<RawDetections>,
}

impl JsonDetectionSource {
  pub fn open(path: impl AsRef<Path>) -> Result<Self, JsonDetectionSourceError> {
    let path = path.as_ref();
    info!("加载检测结果文件: {}", path.display());
    let content = std::fs::read_to_string(path)?;
    Self::from_json(&content)
  }

  pub fn from_json(content: &str) -> Result<Self, JsonDetectionSourceError> {
    let batch: Vec<RawDetections> = serde_json::from_str(content)?;
    debug!("读取到 {} 张图像的检测结果", batch.len());
    Ok(Self { batch })
  }
}

impl From<Vec<RawDetections>> for JsonDetectionSource {
  fn from(batch: Vec<RawDetections>) -> Self {
    Self { batch }
  }
}

impl DetectionSource for JsonDetectionSource {
  type Error = JsonDetectionSourceError;

  fn infer(&self, images: &[RgbImage]) -> Result<Vec<RawDetections>, Self::Error> {
    if images.len() != self.batch.len() {
      return Err(JsonDetectionSourceError::BatchMismatch {
        images: images.len(),
        detections: self.batch.len(),
      });
    }
    Ok(self.batch.clone())
  }
}
