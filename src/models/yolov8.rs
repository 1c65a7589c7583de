// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//
// YOLOv8 检测模型
// 包含: 模型加载、letterbox预处理、推理、解码 + NMS

use std::time::Instant;

use fast_image_resize as fr;
use image::RgbImage;
use log::{debug, info};
use ndarray::{s, Array, Axis, IxDyn};

use crate::{
    models::Model, non_max_suppression, Bbox, Error, ModelConfig, OrtBackend, OrtConfig, OrtEP,
    Result, COCO_NAMES,
};

const CXYWH_OFFSET: usize = 4;

/// letterbox 填充值 (与训练时一致)
const PAD_VALUE: f32 = 144.0 / 255.0;

/// YOLOv8 检测模型
pub struct YOLOv8 {
    engine: OrtBackend,
    height: u32,
    width: u32,
    conf: f32,
    iou: f32,
    classes: Vec<usize>,
    names: Vec<String>,
    profile: bool,
}

impl YOLOv8 {
    /// 从配置创建 YOLOv8 模型
    pub fn new(config: &ModelConfig, conf: f32, profile: bool) -> Result<Self> {
        // execution provider
        let ep = if config.trt {
            OrtEP::Trt(config.device_id)
        } else if config.cuda {
            OrtEP::CUDA(config.device_id)
        } else {
            OrtEP::CPU
        };

        let engine = OrtBackend::build(OrtConfig {
            ep,
            f: config.path.clone(),
            trt_fp16: config.fp16,
            image_size: (config.height, config.width),
        })?;

        let (height, width) = (engine.height(), engine.width());
        let names = engine
            .names()
            .unwrap_or_else(|| COCO_NAMES.iter().map(|s| s.to_string()).collect());

        Ok(Self {
            engine,
            height,
            width,
            conf,
            iou: config.iou,
            classes: Vec::new(),
            names,
            profile,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn iou(&self) -> f32 {
        self.iou
    }
}

impl Model for YOLOv8 {
    fn preprocess(&mut self, images: &[RgbImage]) -> Result<Array<f32, IxDyn>> {
        let t = Instant::now();
        let ys = letterbox(images, self.width, self.height)?;
        if self.profile {
            debug!("[Model Preprocess]: {:?}", t.elapsed());
        }
        Ok(ys)
    }

    fn run(&mut self, xs: Array<f32, IxDyn>, profile: bool) -> Result<Vec<Array<f32, IxDyn>>> {
        let t = Instant::now();
        let ys = self.engine.run(xs, profile || self.profile)?;
        if profile || self.profile {
            debug!("[Model Inference]: {:?}", t.elapsed());
        }
        Ok(ys)
    }

    fn postprocess(&self, xs: Vec<Array<f32, IxDyn>>, xs0: &[RgbImage]) -> Result<Vec<Vec<Bbox>>> {
        let t = Instant::now();
        let preds = xs
            .first()
            .ok_or_else(|| Error::inference("模型没有输出"))?;
        let sizes: Vec<(u32, u32)> = xs0.iter().map(|x| x.dimensions()).collect();
        let ys = decode(
            preds,
            &sizes,
            (self.width, self.height),
            self.conf,
            self.iou,
            &self.classes,
        )?;
        if self.profile {
            debug!("[Model Postprocess]: {:?}", t.elapsed());
        }
        Ok(ys)
    }

    fn conf(&self) -> f32 {
        self.conf
    }

    fn set_conf(&mut self, conf: f32) {
        self.conf = conf;
    }

    fn set_classes(&mut self, classes: &[usize]) {
        self.classes = classes.to_vec();
    }

    fn names(&self) -> &[String] {
        &self.names
    }

    fn engine_mut(&mut self) -> &mut OrtBackend {
        &mut self.engine
    }

    fn summary(&self) {
        info!(
            "\nSummary:\n\
            > Task: Detect{}\n\
            > EP: {:?} {}\n\
            > Height: {}, Width: {}\n\
            > nc: {}, conf: {}, iou: {}\n",
            match self.engine.author().zip(self.engine.version()) {
                Some((author, ver)) => format!(" ({} {})", author, ver),
                None => String::new(),
            },
            self.engine.ep(),
            if let OrtEP::CPU = self.engine.ep() {
                ""
            } else {
                "(May still fall back to CPU)"
            },
            self.height,
            self.width,
            self.names.len(),
            self.conf,
            self.iou,
        );
    }
}

/// 等比缩放比例及缩放后的宽高
pub fn scale_wh(w0: f32, h0: f32, w1: f32, h1: f32) -> (f32, f32, f32) {
    let r = (w1 / w0).min(h1 / h0);
    (r, (w0 * r).round(), (h0 * r).round())
}

/// letterbox: 等比缩放后贴到左上角, 其余区域用灰色填充, 输出 NCHW
pub fn letterbox(images: &[RgbImage], width: u32, height: u32) -> Result<Array<f32, IxDyn>> {
    let mut ys = Array::from_elem(
        (images.len(), 3, height as usize, width as usize),
        PAD_VALUE,
    )
    .into_dyn();

    let mut resizer = fr::Resizer::new();
    let options =
        fr::ResizeOptions::new().resize_alg(fr::ResizeAlg::Convolution(fr::FilterType::Bilinear));
    for (idx, x) in images.iter().enumerate() {
        let (w0, h0) = x.dimensions();
        if w0 == 0 || h0 == 0 {
            continue;
        }
        let (_, w_new, h_new) = scale_wh(w0 as f32, h0 as f32, width as f32, height as f32);
        let w_new = (w_new as u32).clamp(1, width);
        let h_new = (h_new as u32).clamp(1, height);

        let src = fr::images::ImageRef::new(w0, h0, x.as_raw(), fr::PixelType::U8x3)
            .map_err(|e| Error::inference(format!("缩放输入无效: {}", e)))?;
        let mut dst = fr::images::Image::new(w_new, h_new, fr::PixelType::U8x3);
        resizer
            .resize(&src, &mut dst, Some(&options))
            .map_err(|e| Error::inference(format!("缩放失败: {}", e)))?;

        for (i, rgb) in dst.buffer().chunks_exact(3).enumerate() {
            let y = i / w_new as usize;
            let x = i % w_new as usize;
            ys[[idx, 0, y, x]] = rgb[0] as f32 / 255.0;
            ys[[idx, 1, y, x]] = rgb[1] as f32 / 255.0;
            ys[[idx, 2, y, x]] = rgb[2] as f32 / 255.0;
        }
    }
    Ok(ys)
}

/// 解码 `[batch, 4 + nc, anchors]` 输出
///
/// 每个 anchor 取最大类别分数; 低于 `conf` 或不在 `classes` 中的丢弃,
/// 坐标除以缩放比例还原到原图并裁剪, 最后逐图做 NMS。
pub fn decode(
    preds: &Array<f32, IxDyn>,
    sizes: &[(u32, u32)],
    input_wh: (u32, u32),
    conf: f32,
    iou: f32,
    classes: &[usize],
) -> Result<Vec<Vec<Bbox>>> {
    if preds.ndim() != 3 || preds.shape()[1] <= CXYWH_OFFSET {
        return Err(Error::inference(format!(
            "不支持的输出形状: {:?}",
            preds.shape()
        )));
    }
    if preds.shape()[0] < sizes.len() {
        return Err(Error::inference(format!(
            "输出批量 {} 小于输入 {}",
            preds.shape()[0],
            sizes.len()
        )));
    }

    let mut ys = Vec::with_capacity(sizes.len());
    for (anchor, &(w0, h0)) in preds.axis_iter(Axis(0)).zip(sizes) {
        let w0f = w0 as f32;
        let h0f = h0 as f32;
        let ratio = (input_wh.0 as f32 / w0f).min(input_wh.1 as f32 / h0f);

        let mut boxes = Vec::new();
        for pred in anchor.axis_iter(Axis(1)) {
            let bbox = pred.slice(s![0..CXYWH_OFFSET]);
            let clss = pred.slice(s![CXYWH_OFFSET..]);

            let Some((id, &confidence)) = clss
                .iter()
                .enumerate()
                .reduce(|max, x| if x.1 > max.1 { x } else { max })
            else {
                continue;
            };

            if confidence < conf || (!classes.is_empty() && !classes.contains(&id)) {
                continue;
            }

            let cx = bbox[0] / ratio;
            let cy = bbox[1] / ratio;
            let w = bbox[2] / ratio;
            let h = bbox[3] / ratio;
            let y_bbox = Bbox::new(cx - w / 2., cy - h / 2., w, h, id, confidence)
                .clip(w0f, h0f);
            boxes.push(y_bbox);
        }

        non_max_suppression(&mut boxes, iou);
        ys.push(boxes);
    }
    Ok(ys)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 构造 [1, 4 + nc, anchors] 的输出
    fn fake_output(nc: usize, anchors: &[([f32; 4], usize, f32)]) -> Array<f32, IxDyn> {
        let mut ys = Array::zeros((1, CXYWH_OFFSET + nc, anchors.len())).into_dyn();
        for (i, (xywh, cls, score)) in anchors.iter().enumerate() {
            for (k, v) in xywh.iter().enumerate() {
                ys[[0, k, i]] = *v;
            }
            ys[[0, CXYWH_OFFSET + cls, i]] = *score;
        }
        ys
    }

    #[test]
    fn test_scale_wh() {
        let (r, w, h) = scale_wh(1280., 720., 640., 640.);
        assert_eq!(r, 0.5);
        assert_eq!((w, h), (640., 360.));
    }

    #[test]
    fn test_letterbox_pads_bottom() {
        let img = RgbImage::from_pixel(64, 32, image::Rgb([255, 0, 0]));
        let xs = letterbox(&[img], 32, 32).unwrap();
        assert_eq!(xs.shape(), &[1, 3, 32, 32]);
        // 上半部分是缩放后的原图
        assert!((xs[[0, 0, 0, 0]] - 1.0).abs() < 1e-3);
        assert!(xs[[0, 1, 0, 0]].abs() < 1e-3);
        // 下半部分是填充
        assert_eq!(xs[[0, 0, 31, 31]], PAD_VALUE);
    }

    #[test]
    fn test_decode_scales_and_filters() {
        let preds = fake_output(
            3,
            &[
                ([100., 100., 40., 80.], 0, 0.9),  // person
                ([300., 100., 40., 80.], 2, 0.95), // car
                ([500., 100., 40., 80.], 0, 0.3),  // 低分
            ],
        );
        // 原图 1280x1280, 输入 640x640 → 比例 0.5
        let ys = decode(&preds, &[(1280, 1280)], (640, 640), 0.5, 0.7, &[0]).unwrap();
        assert_eq!(ys.len(), 1);
        assert_eq!(ys[0].len(), 1);
        let b = &ys[0][0];
        assert_eq!(b.id(), 0);
        assert_eq!(b.xmin(), 160.);
        assert_eq!(b.ymin(), 120.);
        assert_eq!(b.width(), 80.);
        assert_eq!(b.height(), 160.);
    }

    #[test]
    fn test_decode_no_class_filter_and_nms() {
        let preds = fake_output(
            2,
            &[
                ([100., 100., 40., 80.], 0, 0.9),
                ([101., 100., 40., 80.], 0, 0.8),
                ([300., 300., 40., 80.], 1, 0.6),
            ],
        );
        let ys = decode(&preds, &[(640, 640)], (640, 640), 0.5, 0.7, &[]).unwrap();
        assert_eq!(ys[0].len(), 2);
        assert_eq!(ys[0][0].confidence(), 0.9);
        assert_eq!(ys[0][1].id(), 1);
    }

    #[test]
    fn test_decode_clips_to_image() {
        let preds = fake_output(1, &[([630., 10., 40., 40.], 0, 0.9)]);
        let ys = decode(&preds, &[(640, 640)], (640, 640), 0.5, 0.7, &[]).unwrap();
        let b = &ys[0][0];
        assert_eq!(b.xmax(), 640.);
        assert_eq!(b.ymin(), 0.);
    }

    #[test]
    fn test_decode_rejects_bad_shape() {
        let preds = Array::zeros((1, 3)).into_dyn();
        assert!(decode(&preds, &[(640, 640)], (640, 640), 0.5, 0.7, &[]).is_err());
    }
}
