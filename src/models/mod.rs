//! 模型统一接口与实现
//!
//! ## Model Trait
//! 统一的模型接口，定义标准流程: preprocess → run → postprocess
//!
//! ```text
//! RGB帧 → preprocess → NCHW张量
//!        ↓
//!   OrtBackend::run
//!        ↓
//!   原始输出 → postprocess → 每帧的 Vec<Bbox>
//! ```
//!
//! ## 使用示例
//! ```no_run
//! use yolov8_people::models::{Model, YOLOv8};
//! use yolov8_people::ModelConfig;
//!
//! # fn main() -> yolov8_people::Result<()> {
//! let mut model = YOLOv8::new(&ModelConfig::default(), 0.5, false)?;
//! let frame = image::RgbImage::new(640, 480);
//! let boxes = model.forward(&[frame])?;
//! println!("{} person(s)", boxes[0].len());
//! # Ok(())
//! # }
//! ```

use image::RgbImage;
use ndarray::{Array, IxDyn};

use crate::{Bbox, OrtBackend, Result};

/// 统一的深度学习模型接口
pub trait Model {
    /// 预处理: RGB帧 → NCHW 张量 (批量)
    fn preprocess(&mut self, images: &[RgbImage]) -> Result<Array<f32, IxDyn>>;

    /// 推理: 执行模型前向传播, 返回未解码的原始输出
    fn run(&mut self, xs: Array<f32, IxDyn>, profile: bool) -> Result<Vec<Array<f32, IxDyn>>>;

    /// 后处理: 原始输出 → 每张图的检测框 (坐标已还原到原图)
    fn postprocess(&self, xs: Vec<Array<f32, IxDyn>>, xs0: &[RgbImage]) -> Result<Vec<Vec<Bbox>>>;

    /// 完整的推理流程: preprocess → run → postprocess
    fn forward(&mut self, images: &[RgbImage]) -> Result<Vec<Vec<Bbox>>> {
        let xs = self.preprocess(images)?;
        let ys = self.run(xs, false)?;
        self.postprocess(ys, images)
    }

    /// 当前置信度阈值
    fn conf(&self) -> f32;

    /// 调整置信度阈值 (检测器每次调用都会同步)
    fn set_conf(&mut self, conf: f32);

    /// 只保留这些类别, 为空表示不过滤
    fn set_classes(&mut self, classes: &[usize]);

    /// 类别名, 下标即类别ID
    fn names(&self) -> &[String];

    /// 获取底层推理引擎的可变引用
    fn engine_mut(&mut self) -> &mut OrtBackend;

    /// 打印模型信息
    fn summary(&self);
}

pub mod yolov8; // YOLOv8 检测模型

pub use yolov8::YOLOv8;
