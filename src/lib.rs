// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
pub mod assets; // 字体/模型下载缓存
pub mod compress; // 第二阶段: 外部工具压缩
pub mod config; // 运行配置
pub mod detection; // 检测器接口与实现
pub mod error;
pub mod input; // 视频输入 (解码)
pub mod models; // 模型接口与具体实现
pub mod output; // 视频输出 (编码)
pub mod pipeline; // 逐帧处理流水线
pub mod renderer; // 检测结果绘制

pub mod ort_backend;

pub use crate::compress::{CompressOutcome, CompressState, Compressor};
pub use crate::config::{Args, CompressConfig, ModelConfig, PipelineConfig};
pub use crate::detection::{Detection, Detector, StubDetector, YoloDetector};
pub use crate::error::{Error, Result};
pub use crate::input::{FfmpegSource, FrameQueue, VideoInfo, VideoSource};
pub use crate::models::{Model, YOLOv8};
pub use crate::ort_backend::{OrtBackend, OrtConfig, OrtEP};
pub use crate::output::{FfmpegSink, FourCC, FrameCollector, VideoSink};
pub use crate::pipeline::{detect_people_in_video, Pipeline, ProcessReport};
pub use crate::renderer::Plotter;

/// COCO 类别中 "person" 的ID
pub const PERSON_CLASS: usize = 0;

pub fn non_max_suppression(xs: &mut Vec<Bbox>, iou_threshold: f32) {
    xs.sort_by(|b1, b2| b2.confidence().total_cmp(&b1.confidence()));

    let mut current_index = 0;
    for index in 0..xs.len() {
        let mut drop = false;
        for prev_index in 0..current_index {
            let iou = xs[prev_index].iou(&xs[index]);
            if iou > iou_threshold {
                drop = true;
                break;
            }
        }
        if !drop {
            xs.swap(current_index, index);
            current_index += 1;
        }
    }
    xs.truncate(current_index);
}

/// COCO 80 类名称 (模型元数据缺少 names 时使用)
pub const COCO_NAMES: [&str; 80] = [
    "person",
    "bicycle",
    "car",
    "motorcycle",
    "airplane",
    "bus",
    "train",
    "truck",
    "boat",
    "traffic light",
    "fire hydrant",
    "stop sign",
    "parking meter",
    "bench",
    "bird",
    "cat",
    "dog",
    "horse",
    "sheep",
    "cow",
    "elephant",
    "bear",
    "zebra",
    "giraffe",
    "backpack",
    "umbrella",
    "handbag",
    "tie",
    "suitcase",
    "frisbee",
    "skis",
    "snowboard",
    "sports ball",
    "kite",
    "baseball bat",
    "baseball glove",
    "skateboard",
    "surfboard",
    "tennis racket",
    "bottle",
    "wine glass",
    "cup",
    "fork",
    "knife",
    "spoon",
    "bowl",
    "banana",
    "apple",
    "sandwich",
    "orange",
    "broccoli",
    "carrot",
    "hot dog",
    "pizza",
    "donut",
    "cake",
    "chair",
    "couch",
    "potted plant",
    "bed",
    "dining table",
    "toilet",
    "tv",
    "laptop",
    "mouse",
    "remote",
    "keyboard",
    "cell phone",
    "microwave",
    "oven",
    "toaster",
    "sink",
    "refrigerator",
    "book",
    "clock",
    "vase",
    "scissors",
    "teddy bear",
    "hair drier",
    "toothbrush",
];

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Bbox {
    // a bounding box around an object
    xmin: f32,
    ymin: f32,
    width: f32,
    height: f32,
    id: usize,
    confidence: f32,
}

impl Bbox {
    pub fn new(xmin: f32, ymin: f32, width: f32, height: f32, id: usize, confidence: f32) -> Self {
        Self {
            xmin,
            ymin,
            width,
            height,
            id,
            confidence,
        }
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn xmin(&self) -> f32 {
        self.xmin
    }

    pub fn ymin(&self) -> f32 {
        self.ymin
    }

    pub fn xmax(&self) -> f32 {
        self.xmin + self.width
    }

    pub fn ymax(&self) -> f32 {
        self.ymin + self.height
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    pub fn intersection_area(&self, another: &Bbox) -> f32 {
        let l = self.xmin.max(another.xmin);
        let r = (self.xmin + self.width).min(another.xmin + another.width);
        let t = self.ymin.max(another.ymin);
        let b = (self.ymin + self.height).min(another.ymin + another.height);
        (r - l + 1.).max(0.) * (b - t + 1.).max(0.)
    }

    pub fn union(&self, another: &Bbox) -> f32 {
        self.area() + another.area() - self.intersection_area(another)
    }

    pub fn iou(&self, another: &Bbox) -> f32 {
        self.intersection_area(another) / self.union(another)
    }

    /// 裁剪到图像范围内, 宽高随之收缩
    pub fn clip(&self, img_w: f32, img_h: f32) -> Self {
        let x1 = self.xmin.clamp(0., img_w);
        let y1 = self.ymin.clamp(0., img_h);
        let x2 = self.xmax().clamp(0., img_w);
        let y2 = self.ymax().clamp(0., img_h);
        Self {
            xmin: x1,
            ymin: y1,
            width: (x2 - x1).max(0.),
            height: (y2 - y1).max(0.),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nms_keeps_highest_confidence() {
        let mut boxes = vec![
            Bbox::new(10., 10., 100., 200., 0, 0.6),
            Bbox::new(12., 11., 100., 200., 0, 0.9),
            Bbox::new(400., 50., 80., 160., 0, 0.7),
        ];
        non_max_suppression(&mut boxes, 0.7);
        assert_eq!(boxes.len(), 2);
        assert_eq!(boxes[0].confidence(), 0.9);
        assert_eq!(boxes[1].confidence(), 0.7);
    }

    #[test]
    fn test_clip() {
        let b = Bbox::new(-20., 30., 100., 500., 0, 0.8).clip(640., 480.);
        assert_eq!(b.xmin(), 0.);
        assert_eq!(b.width(), 80.);
        assert_eq!(b.ymax(), 480.);
        assert_eq!(b.confidence(), 0.8);
    }

    #[test]
    fn test_coco_person_is_class_zero() {
        assert_eq!(COCO_NAMES[PERSON_CLASS], "person");
    }
}
