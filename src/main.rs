// 该文件是 Shanan （山南西风） 项目的一部分。
// src/main.rs - 项目主程序
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

mod args;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Datelike, Local};
use clap::Parser;
use tracing::{info, warn};

use shanan_postprocess::{
  FromUrl, LabelMap, ObjectDetector, OutputsConfig, Rendered,
  input::ImageFileInput,
  model::JsonDetectionSource,
  output::{ImageEncoding, draw::load_font},
};

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = args::Args::parse();

  info!("输入图像数量: {}", args.input.len());
  info!("检测结果文件: {}", args.detections.display());
  info!("输出类型: {}", args.output);
  info!("抑制策略: {}", args.strategy);

  let label_map = match &args.label_map {
    Some(path) => LabelMap::load(path)?,
    None => {
      warn!("未指定标签映射，类别名称将使用类别 ID");
      LabelMap::default()
    }
  };

  let outputs = match &args.config {
    Some(path) => OutputsConfig::load(path)?,
    None => OutputsConfig::default(),
  };

  let mut detector = ObjectDetector::new(Arc::new(label_map), outputs)?
    .with_strategy(args.strategy)
    .with_encoding(args.encoding);
  if let Some(path) = &args.font {
    detector = detector.with_font(load_font(path)?);
  }

  let images = args
    .input
    .iter()
    .map(|url| -> Result<_> {
      let image = ImageFileInput::from_url(url)?.decode()?;
      Ok(image)
    })
    .collect::<Result<Vec<_>>>()?;

  let source = JsonDetectionSource::open(&args.detections)?;
  let rendered = detector.predict(&source, &images, args.output)?;

  match rendered {
    Rendered::Boxes(records) => {
      let json = serde_json::to_string_pretty(&records)?;
      match &args.dest {
        Some(path) => {
          std::fs::write(path, json).with_context(|| format!("无法写入: {}", path.display()))?;
          info!("坐标结果已保存: {}", path.display());
        }
        None => println!("{}", json),
      }
    }
    Rendered::Crops(crops) => {
      let directory = args.dest.clone().unwrap_or_else(|| PathBuf::from("."));
      let saved = save_crops(&directory, &crops, args.encoding)?;
      if saved == 0 {
        warn!("未检测到任何目标");
      }
    }
    Rendered::VisObjects(image) => {
      let Some(bytes) = image else {
        warn!("没有可标注的图像");
        return Ok(());
      };
      let path = args
        .dest
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("vis_objects.{}", args.encoding.extension())));
      std::fs::write(&path, bytes).with_context(|| format!("无法保存图片: {}", path.display()))?;
      info!("标注图像已保存: {}", path.display());
    }
  }

  Ok(())
}

/// 按 年/月/日 分层保存裁剪结果，返回保存数量
fn save_crops(root: &Path, crops: &[Vec<Vec<u8>>], encoding: ImageEncoding) -> Result<usize> {
  let now = Local::now();
  let directory = root
    .join(now.year().to_string())
    .join(format!("{:02}", now.month()))
    .join(format!("{:02}", now.day()));
  std::fs::create_dir_all(&directory)
    .with_context(|| format!("无法创建目录: {}", directory.display()))?;

  let mut saved = 0;
  for (image_index, image_crops) in crops.iter().enumerate() {
    if image_crops.is_empty() {
      info!("第 {} 张图像未检测到目标", image_index);
    }
    for (crop_index, bytes) in image_crops.iter().enumerate() {
      let path = directory.join(format!(
        "{}-{:02}-{:02}.{}",
        now.format("%H-%M-%S"),
        image_index,
        crop_index,
        encoding.extension()
      ));
      std::fs::write(&path, bytes).with_context(|| format!("无法保存裁剪: {}", path.display()))?;
      saved += 1;
    }
  }

  info!("共保存 {} 个裁剪到 {}", saved, directory.display());
  Ok(saved)
}
