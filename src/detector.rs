// 该文件是 Shanan （山南西风） 项目的一部分。
// src/detector.rs - 目标检测器门面
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::sync::Arc;

use ab_glyph::FontArc;
use image::RgbImage;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{ConfigError, OutputsConfig};
use crate::label_map::LabelMap;
use crate::model::{DetectionSource, Detections, RawDetections};
use crate::output::draw::Draw;
use crate::output::{
  BoxesOutput, CropsOutput, ImageEncoding, OutputError, OutputKind, OutputWrapper, Render,
  Rendered, VisObjectsOutput,
};
use crate::pipeline::{DetectionPipeline, PipelineError};
use crate::suppress::SuppressionStrategy;

#[derive(Error, Debug)]
pub enum DetectorError {
  #[error("配置错误: {0}")]
  ConfigError(#[from] ConfigError),
  #[error("后处理错误: {0}")]
  PipelineError(#[from] PipelineError),
  #[error("输出错误: {0}")]
  OutputError(#[from] OutputError),
  #[error("推理错误: {0}")]
  InferenceError(Box<dyn std::error::Error + Send + Sync>),
}

/// 持有标签映射与各输出配置，按输出类型完成后处理
pub struct ObjectDetector {
  label_map: Arc<LabelMap>,
  outputs: OutputsConfig,
  strategy: SuppressionStrategy,
  font: Option<FontArc>,
  encoding: ImageEncoding,
}

impl ObjectDetector {
  pub fn new(label_map: Arc<LabelMap>, outputs: OutputsConfig) -> Result<Self, DetectorError> {
    outputs.validate()?;
    Ok(Self {
      label_map,
      outputs,
      strategy: SuppressionStrategy::default(),
      font: None,
      encoding: ImageEncoding::default(),
    })
  }

  pub fn with_strategy(mut self, strategy: SuppressionStrategy) -> Self {
    self.strategy = strategy;
    self
  }

  /// 标注输出绘制标签文本所用的字体
  pub fn with_font(mut self, font: FontArc) -> Self {
    self.font = Some(font);
    self
  }

  pub fn with_encoding(mut self, encoding: ImageEncoding) -> Self {
    self.encoding = encoding;
    self
  }

  pub fn pipeline(&self, kind: OutputKind) -> DetectionPipeline {
    DetectionPipeline::new(*self.outputs.get(kind), self.strategy)
  }

  pub fn renderer(&self, kind: OutputKind) -> Result<OutputWrapper, OutputError> {
    let renderer = match kind {
      OutputKind::Boxes => OutputWrapper::Boxes(BoxesOutput::new(self.label_map.clone())),
      OutputKind::Crops => OutputWrapper::Crops(CropsOutput::new(self.encoding)),
      OutputKind::VisObjects => {
        let font = self.font.clone().ok_or(OutputError::MissingFont)?;
        OutputWrapper::VisObjects(
          VisObjectsOutput::new(
            self.label_map.clone(),
            Draw::new(font),
            self.outputs.vis_objects.show_confidence,
          )
          .with_encoding(self.encoding),
        )
      }
    };
    Ok(renderer)
  }

  /// 对已有的模型输出做后处理并渲染
  pub fn postprocess(
    &self,
    images: &[RgbImage],
    raw: Vec<RawDetections>,
    kind: OutputKind,
  ) -> Result<Rendered, DetectorError> {
    let renderer = self.renderer(kind)?;
    let batch = raw
      .into_iter()
      .map(Detections::try_from)
      .collect::<Result<Vec<_>, _>>()?;

    let results = self.pipeline(kind).process_batch(&batch, images)?;
    debug!(
      "各图像保留数量: {:?}",
      results.iter().map(Vec::len).collect::<Vec<_>>()
    );

    Ok(renderer.render_result(images, &results)?)
  }

  /// 推理 + 后处理
  pub fn predict<D>(
    &self,
    source: &D,
    images: &[RgbImage],
    kind: OutputKind,
  ) -> Result<Rendered, DetectorError>
  where
    D: DetectionSource,
    D::Error: std::error::Error + Send + Sync + 'static,
  {
    info!("开始预测: {} 张图像, 输出类型 {}", images.len(), kind);
    let now = std::time::Instant::now();

    let raw = source
      .infer(images)
      .map_err(|e| DetectorError::InferenceError(Box::new(e)))?;
    let rendered = self.postprocess(images, raw, kind)?;

    info!("预测完成，耗时: {:.2?}", now.elapsed());
    Ok(rendered)
  }
}
