/// 视频输入系统 (Video Input System)
///
/// - VideoSource: 按顺序逐帧读取的有限帧序列
/// - FfmpegSource: 调用 ffmpeg 解码为 RGB24 原始帧
/// - FrameQueue: 内存中的帧序列 (测试 / 嵌入使用)
/// - probe: ffprobe 读取宽高、帧率、总帧数
pub mod decoder;
pub mod memory;
pub mod probe;

pub use decoder::FfmpegSource;
pub use memory::FrameQueue;
pub use probe::{probe, VideoInfo};

use image::RgbImage;

/// 视频输入
///
/// `read` 返回 `None` 表示流结束; 解码失败同样按流结束处理。
pub trait VideoSource {
    fn info(&self) -> &VideoInfo;

    fn read(&mut self) -> Option<RgbImage>;

    /// 释放底层资源, 可重复调用
    fn release(&mut self);
}

impl<S: VideoSource + ?Sized> VideoSource for Box<S> {
    fn info(&self) -> &VideoInfo {
        (**self).info()
    }

    fn read(&mut self) -> Option<RgbImage> {
        (**self).read()
    }

    fn release(&mut self) {
        (**self).release()
    }
}
