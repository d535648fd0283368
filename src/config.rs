// 该文件是 Shanan （山南西风） 项目的一部分。
// src/config.rs - 输出配置
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::output::OutputKind;

const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;
const DEFAULT_NMS_THRESHOLD: f32 = 0.5;
const DEFAULT_MAX_OBJECTS: usize = 1;

#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("阈值 {name} 超出范围 [0, 1]: {value}")]
  InvalidThreshold { name: &'static str, value: f32 },
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 解析错误: {0}")]
  JsonError(#[from] serde_json::Error),
}

/// 单个输出类型的后处理参数
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
  pub confidence_threshold: f32,
  #[serde(rename = "non_maximum_suppression_threshold", alias = "nms_threshold")]
  pub nms_threshold: f32,
  pub max_objects: usize,
  pub show_confidence: bool,
}

impl Default for OutputConfig {
  fn default() -> Self {
    Self {
      confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
      nms_threshold: DEFAULT_NMS_THRESHOLD,
      max_objects: DEFAULT_MAX_OBJECTS,
      show_confidence: false,
    }
  }
}

impl OutputConfig {
  pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
    self.confidence_threshold = threshold;
    self
  }

  pub fn with_nms_threshold(mut self, threshold: f32) -> Self {
    self.nms_threshold = threshold;
    self
  }

  pub fn with_max_objects(mut self, max_objects: usize) -> Self {
    self.max_objects = max_objects;
    self
  }

  pub fn with_show_confidence(mut self, show_confidence: bool) -> Self {
    self.show_confidence = show_confidence;
    self
  }

  /// 阈值需位于 [0, 1]，NaN 视为非法
  pub fn validate(&self) -> Result<(), ConfigError> {
    check_threshold("confidence_threshold", self.confidence_threshold)?;
    check_threshold("non_maximum_suppression_threshold", self.nms_threshold)
  }
}

fn check_threshold(name: &'static str, value: f32) -> Result<(), ConfigError> {
  if (0.0..=1.0).contains(&value) {
    Ok(())
  } else {
    Err(ConfigError::InvalidThreshold { name, value })
  }
}

/// 各输出类型的配置
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputsConfig {
  pub boxes: OutputConfig,
  pub crops: OutputConfig,
  pub vis_objects: OutputConfig,
}

impl Default for OutputsConfig {
  fn default() -> Self {
    let service = OutputConfig::default()
      .with_max_objects(5)
      .with_confidence_threshold(0.4);

    Self {
      boxes: service,
      crops: service,
      vis_objects: service.with_show_confidence(true),
    }
  }
}

impl OutputsConfig {
  pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
    let path = path.as_ref();
    info!("加载输出配置: {}", path.display());
    let content = std::fs::read_to_string(path)?;
    Self::from_json(&content)
  }

  pub fn from_json(content: &str) -> Result<Self, ConfigError> {
    let config: Self = serde_json::from_str(content)?;
    config.validate()?;
    Ok(config)
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    self.boxes.validate()?;
    self.crops.validate()?;
    self.vis_objects.validate()
  }

  pub fn get(&self, kind: OutputKind) -> &OutputConfig {
    match kind {
      OutputKind::Boxes => &self.boxes,
      OutputKind::Crops => &self.crops,
      OutputKind::VisObjects => &self.vis_objects,
    }
  }
}
