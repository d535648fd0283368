// 该文件是 Shanan （山南西风） 项目的一部分。
// src/args.rs - 项目参数配置
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::PathBuf;

use clap::Parser;
use url::Url;

use shanan_postprocess::SuppressionStrategy;
use shanan_postprocess::output::{ImageEncoding, OutputKind};

/// 检测后处理参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 输入图像，可重复指定，例如 image:///data/car.jpg
  #[arg(long, value_name = "SOURCE", required = true)]
  pub input: Vec<Url>,

  /// 模型输出 JSON 文件，每张图像一个元素
  #[arg(long, value_name = "FILE")]
  pub detections: PathBuf,

  /// 标签映射文件（.pbtxt 或 .json）
  #[arg(long, value_name = "FILE")]
  pub label_map: Option<PathBuf>,

  /// 各输出类型的配置 JSON，缺省使用内置配置
  #[arg(long, value_name = "FILE")]
  pub config: Option<PathBuf>,

  /// 输出类型
  #[arg(long, value_enum, default_value_t = OutputKind::Boxes)]
  pub output: OutputKind,

  /// 抑制策略: iom-cluster 或 iou-greedy
  #[arg(long, default_value_t = SuppressionStrategy::IomCluster, value_name = "STRATEGY")]
  pub strategy: SuppressionStrategy,

  /// 输出图像编码
  #[arg(long, value_enum, default_value_t = ImageEncoding::Png)]
  pub encoding: ImageEncoding,

  /// 标签文本字体文件，vis-objects 输出时必须指定
  #[arg(long, value_name = "FILE", required_if_eq("output", "vis-objects"))]
  pub font: Option<PathBuf>,

  /// 输出位置
  /// - boxes: JSON 文件，缺省输出到标准输出
  /// - crops: 目录，按日期分层保存
  /// - vis-objects: 图像文件
  #[arg(long, value_name = "PATH")]
  pub dest: Option<PathBuf>,
}
