// 该文件是 Shanan （山南西风） 项目的一部分。
// src/suppress.rs - 非极大值抑制
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::geometry::{intersection_area, iou, overlap_ratio};
use crate::model::Detections;

/// 抑制算法接口
///
/// 阈值应在配置阶段完成校验，这里假定其位于 [0, 1]。
pub trait Suppress {
  /// 返回保留下来的索引，按输入顺序升序排列
  fn keep_indices(&self, detections: &Detections, threshold: f32) -> Vec<usize>;

  fn suppress(&self, detections: &Detections, threshold: f32) -> Detections {
    let keep = self.keep_indices(detections, threshold);
    debug!("抑制前 {} 个, 抑制后 {} 个", detections.len(), keep.len());
    detections.select(&keep)
  }
}

/// 可选的抑制策略
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SuppressionStrategy {
  /// 交集 / 较小面积 的聚类抑制，每个聚类保留最高分
  #[default]
  IomCluster,
  /// 按分数降序的标准 IoU 贪心抑制
  IouGreedy,
}

impl Suppress for SuppressionStrategy {
  fn keep_indices(&self, detections: &Detections, threshold: f32) -> Vec<usize> {
    match self {
      SuppressionStrategy::IomCluster => iom_cluster(detections, f64::from(threshold)),
      SuppressionStrategy::IouGreedy => iou_greedy(detections, f64::from(threshold)),
    }
  }
}

impl fmt::Display for SuppressionStrategy {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      SuppressionStrategy::IomCluster => write!(f, "iom-cluster"),
      SuppressionStrategy::IouGreedy => write!(f, "iou-greedy"),
    }
  }
}

impl FromStr for SuppressionStrategy {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "iom-cluster" | "iom" => Ok(SuppressionStrategy::IomCluster),
      "iou-greedy" | "iou" => Ok(SuppressionStrategy::IouGreedy),
      other => Err(format!("未知的抑制策略: {}", other)),
    }
  }
}

fn iom_cluster(detections: &Detections, threshold: f64) -> Vec<usize> {
  let boxes = detections.boxes();
  let scores = detections.scores();
  let n = boxes.len();
  let mut removed = vec![false; n];

  for i in 0..n {
    if removed[i] {
      continue;
    }

    // 聚类：i 本身及与其 IoM 达到阈值的未移除候选
    let cluster: Vec<usize> = (i..n)
      .filter(|&j| {
        j == i
          || (!removed[j]
            && intersection_area(&boxes[i], &boxes[j]) > 0.0
            && overlap_ratio(&boxes[i], &boxes[j]) >= threshold)
      })
      .collect();

    // 分数相同时保留索引最小者
    let best = cluster
      .iter()
      .copied()
      .fold(i, |best, k| if scores[k] > scores[best] { k } else { best });

    for k in cluster {
      if k != best {
        removed[k] = true;
      }
    }
  }

  (0..n).filter(|&k| !removed[k]).collect()
}

fn iou_greedy(detections: &Detections, threshold: f64) -> Vec<usize> {
  let boxes = detections.boxes();
  let scores = detections.scores();
  let n = boxes.len();

  let mut order: Vec<usize> = (0..n).collect();
  order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

  let mut suppressed = vec![false; n];
  let mut keep = Vec::new();

  for (pos, &i) in order.iter().enumerate() {
    if suppressed[i] {
      continue;
    }
    keep.push(i);

    for &j in &order[pos + 1..] {
      if !suppressed[j]
        && intersection_area(&boxes[i], &boxes[j]) > 0.0
        && iou(&boxes[i], &boxes[j]) >= threshold
      {
        suppressed[j] = true;
      }
    }
  }

  keep.sort_unstable();
  keep
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::geometry::RelBox;

  const STRATEGIES: [SuppressionStrategy; 2] = [
    SuppressionStrategy::IomCluster,
    SuppressionStrategy::IouGreedy,
  ];

  fn detections(items: &[(RelBox, f32)]) -> Detections {
    Detections::new(
      items.iter().map(|(b, _)| *b).collect(),
      items.iter().map(|(_, s)| *s).collect(),
      vec![1; items.len()],
    )
    .unwrap()
  }

  #[test]
  fn empty_input_gives_empty_output() {
    for strategy in STRATEGIES {
      let out = strategy.suppress(&Detections::default(), 0.5);
      assert!(out.is_empty());
    }
  }

  #[test]
  fn nested_box_is_suppressed() {
    let input = detections(&[
      ([0.0, 0.0, 0.5, 0.5], 0.9),
      ([0.05, 0.05, 0.45, 0.45], 0.6),
    ]);
    for strategy in STRATEGIES {
      let out = strategy.suppress(&input, 0.5);
      assert_eq!(out.scores(), &[0.9], "{}", strategy);
    }
  }

  #[test]
  fn iom_suppresses_small_box_inside_large_one_where_iou_does_not() {
    // 小框完全位于大框内，IoU 只有 0.04
    let input = detections(&[
      ([0.0, 0.0, 1.0, 1.0], 0.9),
      ([0.1, 0.1, 0.3, 0.3], 0.8),
    ]);
    assert_eq!(
      SuppressionStrategy::IomCluster.keep_indices(&input, 0.5),
      vec![0]
    );
    assert_eq!(
      SuppressionStrategy::IouGreedy.keep_indices(&input, 0.5),
      vec![0, 1]
    );
  }

  #[test]
  fn cluster_keeps_highest_score_even_if_not_first() {
    let input = detections(&[
      ([0.0, 0.0, 0.5, 0.5], 0.6),
      ([0.0, 0.0, 0.5, 0.5], 0.95),
      ([0.6, 0.6, 0.9, 0.9], 0.7),
    ]);
    assert_eq!(
      SuppressionStrategy::IomCluster.keep_indices(&input, 0.5),
      vec![1, 2]
    );
  }

  #[test]
  fn threshold_zero_collapses_any_positive_overlap() {
    let input = detections(&[
      ([0.0, 0.0, 0.5, 0.5], 0.7),
      ([0.49, 0.49, 0.9, 0.9], 0.8),
      ([0.95, 0.95, 1.0, 1.0], 0.3),
    ]);
    for strategy in STRATEGIES {
      assert_eq!(strategy.keep_indices(&input, 0.0), vec![1, 2], "{}", strategy);
    }
  }

  #[test]
  fn threshold_one_merges_only_exact_duplicates() {
    let input = detections(&[
      ([0.0, 0.0, 0.5, 0.5], 0.7),
      ([0.0, 0.0, 0.5, 0.5], 0.8),
      ([0.1, 0.0, 0.6, 0.5], 0.9),
      ([0.7, 0.7, 0.9, 0.9], 0.4),
    ]);
    for strategy in STRATEGIES {
      assert_eq!(
        strategy.keep_indices(&input, 1.0),
        vec![1, 2, 3],
        "{}",
        strategy
      );
    }
  }

  #[test]
  fn suppression_is_idempotent() {
    let input = detections(&[
      ([0.0, 0.0, 0.4, 0.4], 0.5),
      ([0.1, 0.1, 0.5, 0.5], 0.9),
      ([0.2, 0.2, 0.6, 0.6], 0.7),
      ([0.3, 0.3, 0.7, 0.7], 0.8),
      ([0.65, 0.65, 1.0, 1.0], 0.6),
    ]);
    for strategy in STRATEGIES {
      for threshold in [0.0, 0.25, 0.5, 0.75, 1.0] {
        let once = strategy.suppress(&input, threshold);
        let twice = strategy.suppress(&once, threshold);
        assert_eq!(once, twice, "{} @ {}", strategy, threshold);
      }
    }
  }

  #[test]
  fn strategy_parses_from_name() {
    assert_eq!(
      "iou-greedy".parse::<SuppressionStrategy>().unwrap(),
      SuppressionStrategy::IouGreedy
    );
    assert_eq!(
      "iom".parse::<SuppressionStrategy>().unwrap(),
      SuppressionStrategy::IomCluster
    );
    assert!("soft".parse::<SuppressionStrategy>().is_err());
  }
}
