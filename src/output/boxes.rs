// 该文件是 Shanan （山南西风） 项目的一部分。
// src/output/boxes.rs - 坐标记录输出
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::sync::Arc;

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::geometry::AbsBox;
use crate::label_map::LabelMap;
use crate::output::{OutputError, Render, check_batch};
use crate::pipeline::RankedResult;

const SCORE_PRECISION: usize = 4; // 分数保留小数位数

/// 单个检测目标的坐标记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinateRecord {
  pub detection_box: AbsBox, // [y1, x1, y2, x2]
  pub detection_score: String,
  pub detection_class: String,
}

pub struct BoxesOutput {
  label_map: Arc<LabelMap>,
}

impl BoxesOutput {
  pub fn new(label_map: Arc<LabelMap>) -> Self {
    Self { label_map }
  }

  fn record(&self, result: &RankedResult) -> Vec<CoordinateRecord> {
    result
      .iter()
      .map(|det| CoordinateRecord {
        detection_box: det.bbox,
        detection_score: format!("{:.*}", SCORE_PRECISION, det.score),
        detection_class: self.label_map.display_name(det.class_id),
      })
      .collect()
  }
}

impl Render for BoxesOutput {
  type Output = Vec<Vec<CoordinateRecord>>;

  fn render_result(
    &self,
    images: &[RgbImage],
    results: &[RankedResult],
  ) -> Result<Self::Output, OutputError> {
    check_batch(images, results)?;
    Ok(results.iter().map(|result| self.record(result)).collect())
  }
}
