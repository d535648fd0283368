// 该文件是 Shanan （山南西风） 项目的一部分。
// src/label_map.rs - 类别标签映射
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::collections::HashMap;
use std::path::Path;

use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum LabelMapError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 解析错误: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("第 {line} 行的类别 ID 无效: {value}")]
  InvalidId { line: usize, value: String },
}

/// 类别 ID 到显示名称的只读映射
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelMap {
  labels: HashMap<i64, String>,
}

impl LabelMap {
  /// 根据扩展名选择格式：`.json` 按 JSON 对象解析，其他按 pbtxt 解析
  pub fn load(path: impl AsRef<Path>) -> Result<Self, LabelMapError> {
    let path = path.as_ref();
    info!("加载标签映射: {}", path.display());
    let content = std::fs::read_to_string(path)?;

    let is_json = path
      .extension()
      .map(|ext| ext.eq_ignore_ascii_case("json"))
      .unwrap_or(false);

    let map = if is_json {
      Self::from_json(&content)?
    } else {
      Self::from_pbtxt(&content)?
    };
    info!("标签映射共 {} 个类别", map.len());
    Ok(map)
  }

  /// 解析 protobuf 文本格式
  ///
  /// ```text
  /// item {
  ///   id: 1
  ///   display_name: "plate"
  /// }
  /// ```
  pub fn from_pbtxt(content: &str) -> Result<Self, LabelMapError> {
    let mut labels = HashMap::new();
    let mut item_id = None;
    let mut item_name = None;

    for (index, line) in content.lines().enumerate() {
      let Some((key, value)) = line.split_once(':') else {
        continue;
      };

      match key.trim() {
        "id" => {
          let value = value.trim();
          let id = value.parse::<i64>().map_err(|_| LabelMapError::InvalidId {
            line: index + 1,
            value: value.to_string(),
          })?;
          item_id = Some(id);
        }
        "display_name" => {
          item_name = Some(value.trim().trim_matches(['"', '\'']).to_string());
        }
        other => debug!("忽略标签映射字段: {}", other),
      }

      if let (Some(id), Some(name)) = (item_id, item_name.as_ref()) {
        if labels.insert(id, name.clone()).is_some() {
          warn!("类别 ID {} 重复定义，使用后者: {}", id, name);
        }
        item_id = None;
        item_name = None;
      }
    }

    Ok(Self { labels })
  }

  /// 解析 `{"1": "plate", "2": "car"}` 形式的 JSON
  pub fn from_json(content: &str) -> Result<Self, LabelMapError> {
    let raw: HashMap<String, String> = serde_json::from_str(content)?;
    let mut labels = HashMap::with_capacity(raw.len());
    for (key, name) in raw {
      let id = key
        .trim()
        .parse::<i64>()
        .map_err(|_| LabelMapError::InvalidId {
          line: 0,
          value: key.clone(),
        })?;
      labels.insert(id, name);
    }
    Ok(Self { labels })
  }

  pub fn get(&self, class_id: i64) -> Option<&str> {
    self.labels.get(&class_id).map(String::as_str)
  }

  /// 查找显示名称，缺失时回退为类别 ID 字符串
  pub fn display_name(&self, class_id: i64) -> String {
    self
      .get(class_id)
      .map(str::to_string)
      .unwrap_or_else(|| class_id.to_string())
  }

  pub fn len(&self) -> usize {
    self.labels.len()
  }

  pub fn is_empty(&self) -> bool {
    self.labels.is_empty()
  }
}

impl FromIterator<(i64, String)> for LabelMap {
  fn from_iter<T: IntoIterator<Item = (i64, String)>>(iter: T) -> Self {
    Self {
      labels: iter.into_iter().collect(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_pbtxt_items() {
    let content = r#"
item {
  id: 1
  display_name: "placa"
}
item {
  display_name: "carro"
  id: 2
}
"#;
    let map = LabelMap::from_pbtxt(content).unwrap();
    assert_eq!(map.len(), 2);
    assert_eq!(map.get(1), Some("placa"));
    assert_eq!(map.get(2), Some("carro"));
  }

  #[test]
  fn invalid_pbtxt_id_is_reported_with_line() {
    let err = LabelMap::from_pbtxt("item {\n  id: one\n}").unwrap_err();
    assert!(matches!(err, LabelMapError::InvalidId { line: 2, .. }));
  }

  #[test]
  fn parses_json_object() {
    let map = LabelMap::from_json(r#"{"1": "plate", "7": "truck"}"#).unwrap();
    assert_eq!(map.get(7), Some("truck"));
    assert!(LabelMap::from_json(r#"{"x": "plate"}"#).is_err());
  }

  #[test]
  fn missing_class_falls_back_to_id() {
    let map: LabelMap = [(1, "plate".to_string())].into_iter().collect();
    assert_eq!(map.display_name(1), "plate");
    assert_eq!(map.display_name(42), "42");
  }
}
