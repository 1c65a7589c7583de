/// 检测系统 (Detection System)
///
/// 流水线只依赖 `Detector` trait:
/// - YoloDetector: ONNX 模型推理 (`models::Model`)
/// - StubDetector: 按帧预设结果, 用于测试与离线回放
pub mod detector;
pub mod stub;
pub mod types;

pub use detector::YoloDetector;
pub use stub::StubDetector;
pub use types::Detection;

use image::RgbImage;

use crate::Result;

/// 目标检测器
///
/// 一次调用处理一帧; `classes` 为允许的类别ID, `conf` 为置信度阈值。
/// 阈值不做范围检查, 例如 1.01 时应返回空结果而不是报错。
pub trait Detector {
    fn detect(&mut self, frame: &RgbImage, classes: &[usize], conf: f32) -> Result<Vec<Detection>>;
}

impl<D: Detector + ?Sized> Detector for Box<D> {
    fn detect(&mut self, frame: &RgbImage, classes: &[usize], conf: f32) -> Result<Vec<Detection>> {
        (**self).detect(frame, classes, conf)
    }
}
