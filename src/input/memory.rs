//! 内存帧序列

use std::collections::VecDeque;

use image::RgbImage;

use super::{VideoInfo, VideoSource};

/// 预先准备好的帧序列, 按顺序读出
#[derive(Debug, Clone)]
pub struct FrameQueue {
    info: VideoInfo,
    frames: VecDeque<RgbImage>,
    released: bool,
}

impl FrameQueue {
    /// `total_frames` 记为帧数
    pub fn new(frames: Vec<RgbImage>, fps: u32) -> Self {
        let (width, height) = frames.first().map(|f| f.dimensions()).unwrap_or((0, 0));
        let info = VideoInfo::new(width, height, fps).with_total_frames(frames.len() as u64);
        Self::with_info(frames, info)
    }

    /// 自定义元数据, 例如总帧数与实际不符的情况
    pub fn with_info(frames: Vec<RgbImage>, info: VideoInfo) -> Self {
        Self {
            info,
            frames: frames.into(),
            released: false,
        }
    }

    /// 生成 n 帧纯色画面, 灰度随帧号变化
    pub fn solid(n: usize, width: u32, height: u32, fps: u32) -> Self {
        let frames = (0..n)
            .map(|i| RgbImage::from_pixel(width, height, image::Rgb([(i % 256) as u8; 3])))
            .collect::<Vec<_>>();
        let info = VideoInfo::new(width, height, fps).with_total_frames(n as u64);
        Self::with_info(frames, info)
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl VideoSource for FrameQueue {
    fn info(&self) -> &VideoInfo {
        &self.info
    }

    fn read(&mut self) -> Option<RgbImage> {
        if self.released {
            return None;
        }
        self.frames.pop_front()
    }

    fn release(&mut self) {
        self.released = true;
        self.frames.clear();
    }
}
