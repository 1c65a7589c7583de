//! 预设结果的检测器
//!
//! 不加载模型; 第 N 次调用返回第 N 帧的预设结果 (超出范围时循环使用或返回空),
//! 并按类别/阈值过滤, 行为与真实检测器一致。

use image::RgbImage;
use log::debug;

use crate::{detection::Detection, Detector, Error, Result};

#[derive(Debug, Clone, Default)]
pub struct StubDetector {
    script: Vec<Vec<Detection>>,
    repeat: bool,
    fail_at: Option<usize>,
    calls: usize,
}

impl StubDetector {
    /// 每帧返回空结果
    pub fn empty() -> Self {
        Self::default()
    }

    /// 每帧返回相同的检测结果
    pub fn fixed(detections: Vec<Detection>) -> Self {
        Self {
            script: vec![detections],
            repeat: true,
            ..Default::default()
        }
    }

    /// 第 i 次调用返回 `script[i]`, 之后返回空
    pub fn scripted(script: Vec<Vec<Detection>>) -> Self {
        Self {
            script,
            ..Default::default()
        }
    }

    /// 第 `call` 次调用 (从0开始) 返回推理错误
    pub fn fail_at(mut self, call: usize) -> Self {
        self.fail_at = Some(call);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls
    }

    /// 重新从第一帧开始
    pub fn reset(&mut self) {
        self.calls = 0;
    }
}

impl Detector for StubDetector {
    fn detect(&mut self, frame: &RgbImage, classes: &[usize], conf: f32) -> Result<Vec<Detection>> {
        let call = self.calls;
        self.calls += 1;

        if self.fail_at == Some(call) {
            return Err(Error::inference(format!("预设失败: 第 {} 帧", call)));
        }

        let entry = if self.repeat && !self.script.is_empty() {
            self.script.get(call % self.script.len())
        } else {
            self.script.get(call)
        };

        let (w, h) = frame.dimensions();
        let ys: Vec<Detection> = entry
            .into_iter()
            .flatten()
            .filter(|d| d.accepted(classes, conf))
            .map(|d| Detection {
                bbox: d.bbox.clip(w as f32, h as f32),
                label: d.label.clone(),
            })
            .collect();
        debug!("stub detect #{}: {} 个目标", call, ys.len());
        Ok(ys)
    }
}
