//! 检测结果数据结构

use crate::{Bbox, COCO_NAMES};

/// 单个检测结果: 检测框 + 类别名
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub bbox: Bbox,
    pub label: String,
}

impl Detection {
    pub fn new(bbox: Bbox, label: impl Into<String>) -> Self {
        Self {
            bbox,
            label: label.into(),
        }
    }

    /// 用 COCO 类别名构造
    pub fn coco(bbox: Bbox) -> Self {
        let label = COCO_NAMES
            .get(bbox.id())
            .map(|s| s.to_string())
            .unwrap_or_else(|| format!("class{}", bbox.id()));
        Self { bbox, label }
    }

    pub fn class_id(&self) -> usize {
        self.bbox.id()
    }

    pub fn confidence(&self) -> f32 {
        self.bbox.confidence()
    }

    /// 标注文字, 例如 `person 0.87`
    pub fn caption(&self) -> String {
        format!("{} {:.2}", self.label, self.confidence())
    }

    /// 是否满足类别与阈值条件 (`classes` 为空表示不限类别)
    pub fn accepted(&self, classes: &[usize], conf: f32) -> bool {
        self.confidence() >= conf && (classes.is_empty() || classes.contains(&self.class_id()))
    }
}
