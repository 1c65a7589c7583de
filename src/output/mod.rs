/// 视频输出系统 (Video Output System)
///
/// - VideoSink: 只追加、保持顺序的输出
/// - FfmpegSink: RGB24 原始帧写入 ffmpeg stdin 编码
/// - FrameCollector: 内存收集 (测试 / 嵌入使用)
pub mod encoder;
pub mod memory;

pub use encoder::FfmpegSink;
pub use memory::FrameCollector;

use image::RgbImage;

use crate::Result;

/// 视频输出
pub trait VideoSink {
    /// 追加一帧, 尺寸必须与创建时一致
    fn write(&mut self, frame: &RgbImage) -> Result<()>;

    /// 结束写入并落盘, 可重复调用
    fn finish(&mut self) -> Result<()>;

    fn frames_written(&self) -> u64;
}

impl<S: VideoSink + ?Sized> VideoSink for Box<S> {
    fn write(&mut self, frame: &RgbImage) -> Result<()> {
        (**self).write(frame)
    }

    fn finish(&mut self) -> Result<()> {
        (**self).finish()
    }

    fn frames_written(&self) -> u64 {
        (**self).frames_written()
    }
}

/// 四字符编码标签到 ffmpeg 编码器的映射
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FourCC {
    pub tag: &'static str,
    pub encoder: &'static str,
    /// 是否写入容器的 codec tag (`-tag:v`)
    pub write_tag: bool,
    pub pix_fmt: Option<&'static str>,
}

const FOURCCS: &[FourCC] = &[
    FourCC::new("mp4v", "mpeg4", true, Some("yuv420p")),
    FourCC::new("xvid", "mpeg4", false, Some("yuv420p")),
    FourCC::new("divx", "mpeg4", false, Some("yuv420p")),
    FourCC::new("avc1", "libx264", true, Some("yuv420p")),
    FourCC::new("h264", "libx264", false, Some("yuv420p")),
    FourCC::new("x264", "libx264", false, Some("yuv420p")),
    FourCC::new("hvc1", "libx265", true, Some("yuv420p")),
    FourCC::new("hev1", "libx265", false, Some("yuv420p")),
    FourCC::new("mjpg", "mjpeg", false, Some("yuvj420p")),
    FourCC::new("vp09", "libvpx-vp9", false, Some("yuv420p")),
];

impl FourCC {
    const fn new(
        tag: &'static str,
        encoder: &'static str,
        write_tag: bool,
        pix_fmt: Option<&'static str>,
    ) -> Self {
        Self {
            tag,
            encoder,
            write_tag,
            pix_fmt,
        }
    }

    /// 大小写不敏感查找
    pub fn lookup(tag: &str) -> Option<Self> {
        let tag = tag.to_ascii_lowercase();
        FOURCCS.iter().find(|f| f.tag == tag).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fourcc_lookup() {
        let mp4v = FourCC::lookup("mp4v").unwrap();
        assert_eq!(mp4v.encoder, "mpeg4");
        assert!(mp4v.write_tag);
        assert_eq!(FourCC::lookup("MJPG").unwrap().encoder, "mjpeg");
        assert_eq!(FourCC::lookup("XVID").unwrap().encoder, "mpeg4");
        assert_eq!(FourCC::lookup("avc1").unwrap().encoder, "libx264");
        assert!(FourCC::lookup("abcd").is_none());
    }
}
