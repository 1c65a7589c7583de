//! 基于 ONNX 模型的检测器

use image::RgbImage;

use crate::{detection::Detection, models::Model, Detector, Result};

/// 把 `Model` 适配为 `Detector`: 单帧批量, 同步阈值与类别过滤
pub struct YoloDetector<M: Model> {
    model: M,
}

impl<M: Model> YoloDetector<M> {
    pub fn new(model: M) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    pub fn into_inner(self) -> M {
        self.model
    }
}

impl<M: Model> Detector for YoloDetector<M> {
    fn detect(&mut self, frame: &RgbImage, classes: &[usize], conf: f32) -> Result<Vec<Detection>> {
        self.model.set_conf(conf);
        self.model.set_classes(classes);

        let frames = std::slice::from_ref(frame);
        let boxes = self.model.forward(frames)?.into_iter().next().unwrap_or_default();

        let names = self.model.names();
        Ok(boxes
            .into_iter()
            .map(|bbox| match names.get(bbox.id()) {
                Some(name) => Detection::new(bbox, name.clone()),
                None => Detection::coco(bbox),
            })
            .filter(|d| d.accepted(classes, conf))
            .collect())
    }
}
