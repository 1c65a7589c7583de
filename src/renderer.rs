//! 检测结果绘制 (Renderer)
//!
//! 在帧的副本上画检测框和 `person 0.87` 标签, 风格与 Ultralytics 一致:
//! 线宽随分辨率变化, 标签为实心色块 + 白字。

use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use log::{debug, warn};

use crate::{assets, detection::Detection, Error, Result};

/// Ultralytics 调色板
const PALETTE: [&str; 20] = [
    "FF3838", "FF9D97", "FF701F", "FFB21D", "CFD231", "48F90A", "92CC17", "3DDB86", "1A9334",
    "00D4BB", "2C99A8", "00C2FF", "344593", "6473FF", "0018EC", "8438FF", "520085", "CB38FF",
    "FF95C8", "FF37C7",
];

const TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

pub struct Plotter {
    font: Option<FontVec>,
    palette: Vec<Rgb<u8>>,
}

impl Default for Plotter {
    /// 只画框, 不画文字
    fn default() -> Self {
        Self::new(None)
    }
}

impl Plotter {
    pub fn new(font: Option<FontVec>) -> Self {
        Self {
            font,
            palette: PALETTE.iter().filter_map(|hex| hex_to_rgb(hex)).collect(),
        }
    }

    /// 从 TTF 文件加载字体
    pub fn from_font_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(Some(load_font(path.as_ref())?)))
    }

    /// 字体查找顺序: 指定路径 → 缓存的 Arial.ttf → 下载; 全部失败时只画框
    pub fn resolve(font: Option<&Path>) -> Self {
        let loaded = match font {
            Some(path) => load_font(path),
            None => assets::font_path().and_then(|path| load_font(&path)),
        };
        match loaded {
            Ok(font) => Self::new(Some(font)),
            Err(e) => {
                warn!("⚠️ 字体不可用, 标注将只画框: {}", e);
                Self::new(None)
            }
        }
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// 类别对应的颜色
    pub fn color(&self, class_id: usize) -> Rgb<u8> {
        self.palette
            .get(class_id % self.palette.len().max(1))
            .copied()
            .unwrap_or(Rgb([255, 56, 56]))
    }

    /// 返回标注后的副本, 原帧不变
    pub fn annotate(&self, frame: &RgbImage, detections: &[Detection]) -> RgbImage {
        let mut canvas = frame.clone();
        self.draw(&mut canvas, detections);
        canvas
    }

    pub fn draw(&self, img: &mut RgbImage, detections: &[Detection]) {
        let (w, h) = img.dimensions();
        if w == 0 || h == 0 {
            return;
        }
        let lw = line_width(w, h);
        let scale = PxScale::from(font_size(w, h));

        for det in detections {
            let color = self.color(det.class_id());
            let bbox = det.bbox.clip(w as f32, h as f32);
            let x = bbox.xmin().round() as i32;
            let y = bbox.ymin().round() as i32;
            let bw = bbox.width().round() as u32;
            let bh = bbox.height().round() as u32;
            if bw == 0 || bh == 0 {
                continue;
            }

            // 向内描边, 保持在框内
            for offset in 0..lw {
                let (iw, ih) = (bw as i32 - 2 * offset, bh as i32 - 2 * offset);
                if iw <= 0 || ih <= 0 {
                    break;
                }
                let rect = Rect::at(x + offset, y + offset).of_size(iw as u32, ih as u32);
                draw_hollow_rect_mut(img, rect, color);
            }

            if let Some(font) = &self.font {
                let label = det.caption();
                let (tw, th) = text_size(scale, font, &label);
                let pad = lw.max(2);
                let bg_w = tw + 2 * pad as u32;
                let bg_h = th + 2 * pad as u32;
                // 框上方放得下就放上方, 否则放在框内顶部
                let bg_y = if y >= bg_h as i32 { y - bg_h as i32 } else { y };
                draw_filled_rect_mut(img, Rect::at(x, bg_y).of_size(bg_w, bg_h), color);
                draw_text_mut(img, TEXT_COLOR, x + pad, bg_y + pad, scale, font, &label);
            }
        }
        debug!("绘制 {} 个目标", detections.len());
    }
}

/// 线宽: max(round((h + w) / 2 * 0.003), 2)
pub fn line_width(w: u32, h: u32) -> i32 {
    (((w + h) as f32 / 2.0 * 0.003).round() as i32).max(2)
}

/// 字号: max(round((h + w) / 2 * 0.035), 12)
pub fn font_size(w: u32, h: u32) -> f32 {
    ((w + h) as f32 / 2.0 * 0.035).round().max(12.0)
}

fn load_font(path: &Path) -> Result<FontVec> {
    let data = std::fs::read(path)?;
    FontVec::try_from_vec(data)
        .map_err(|e| Error::Config(format!("无效字体 {}: {}", path.display(), e)))
}

fn hex_to_rgb(hex: &str) -> Option<Rgb<u8>> {
    let v = u32::from_str_radix(hex, 16).ok()?;
    Some(Rgb([(v >> 16) as u8, (v >> 8) as u8, v as u8]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Bbox;

    #[test]
    fn test_line_width() {
        assert_eq!(line_width(640, 480), 2);
        assert_eq!(line_width(2560, 1440), 6);
        assert_eq!(line_width(3840, 2160), 9);
    }

    #[test]
    fn test_person_color() {
        assert_eq!(Plotter::default().color(0), Rgb([0xFF, 0x38, 0x38]));
        assert_eq!(Plotter::default().color(20), Rgb([0xFF, 0x38, 0x38]));
    }

    #[test]
    fn test_annotate_draws_on_copy() {
        let frame = RgbImage::from_pixel(100, 80, Rgb([0, 0, 0]));
        let det = Detection::coco(Bbox::new(10., 20., 30., 40., 0, 0.9));
        let out = Plotter::default().annotate(&frame, &[det]);

        assert_eq!(frame.get_pixel(10, 20), &Rgb([0, 0, 0]));
        assert_eq!(out.get_pixel(10, 20), &Rgb([0xFF, 0x38, 0x38]));
        assert_eq!(out.get_pixel(11, 21), &Rgb([0xFF, 0x38, 0x38]));
        // 框内部不变
        assert_eq!(out.get_pixel(25, 40), &Rgb([0, 0, 0]));
        assert_eq!(out.dimensions(), frame.dimensions());
    }

    #[test]
    fn test_boxes_outside_frame_are_clipped() {
        let frame = RgbImage::new(50, 50);
        let dets = vec![
            Detection::coco(Bbox::new(-30., -30., 200., 200., 0, 0.9)),
            Detection::coco(Bbox::new(80., 80., 10., 10., 0, 0.9)),
        ];
        let out = Plotter::default().annotate(&frame, &dets);
        assert_eq!(out.get_pixel(0, 0), &Rgb([0xFF, 0x38, 0x38]));
    }

    #[test]
    fn test_missing_font_file() {
        assert!(Plotter::from_font_file("fonts/missing.ttf").is_err());
        assert!(!Plotter::resolve(Some(Path::new("fonts/missing.ttf"))).has_font());
    }
}
