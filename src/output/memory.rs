//! 内存帧收集器

use image::RgbImage;

use super::VideoSink;
use crate::error::{Error, Result};

/// 把写入的帧保存在内存中, 用于检查输出
#[derive(Debug, Clone, Default)]
pub struct FrameCollector {
    size: Option<(u32, u32)>,
    fps: u32,
    frames: Vec<RgbImage>,
    finished: usize,
}

impl FrameCollector {
    /// 限定帧尺寸
    pub fn new(width: u32, height: u32, fps: u32) -> Self {
        Self {
            size: Some((width, height)),
            fps,
            ..Default::default()
        }
    }

    /// 不检查尺寸
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> &[RgbImage] {
        &self.frames
    }

    pub fn into_frames(self) -> Vec<RgbImage> {
        self.frames
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    pub fn size(&self) -> Option<(u32, u32)> {
        self.size
    }

    pub fn is_finished(&self) -> bool {
        self.finished > 0
    }

    /// finish 被调用的次数
    pub fn finish_calls(&self) -> usize {
        self.finished
    }
}

impl VideoSink for FrameCollector {
    fn write(&mut self, frame: &RgbImage) -> Result<()> {
        if self.finished > 0 {
            return Err(Error::Encode("输出已结束".to_string()));
        }
        if let Some(expected) = self.size {
            let actual = frame.dimensions();
            if actual != expected {
                return Err(Error::FrameSize { expected, actual });
            }
        }
        self.frames.push(frame.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.finished += 1;
        Ok(())
    }

    fn frames_written(&self) -> u64 {
        self.frames.len() as u64
    }
}
