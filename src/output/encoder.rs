//! ffmpeg 编码器
//!
//! 启动 `ffmpeg -f rawvideo -pix_fmt rgb24 -s WxH -r FPS -i - -c:v <encoder> -tag:v <fourcc> <out>`,
//! 把 RGB24 帧写入 stdin。`finish` 关闭 stdin 并等待进程退出, 非零退出码视为编码失败。

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::ChildStdin;

use ffmpeg_sidecar::child::FfmpegChild;
use ffmpeg_sidecar::command::FfmpegCommand;
use image::RgbImage;
use log::{debug, error};

use super::{FourCC, VideoSink};
use crate::error::{Error, Result};

pub struct FfmpegSink {
    path: PathBuf,
    size: (u32, u32),
    fps: u32,
    child: Option<FfmpegChild>,
    stdin: Option<ChildStdin>,
    frames_written: u64,
}

impl FfmpegSink {
    pub fn create<P: AsRef<Path>>(
        path: P,
        fourcc: &str,
        width: u32,
        height: u32,
        fps: u32,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let codec = FourCC::lookup(fourcc)
            .ok_or_else(|| Error::sink_open(&path, format!("不支持的 fourcc: {}", fourcc)))?;
        if width == 0 || height == 0 {
            return Err(Error::sink_open(
                &path,
                format!("无效的分辨率 {}x{}", width, height),
            ));
        }

        // 输出目录需已存在, 这里不创建
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.is_dir() {
                return Err(Error::sink_open(
                    &path,
                    format!("输出目录不存在: {}", parent.display()),
                ));
            }
        }

        let mut cmd = FfmpegCommand::new();
        cmd.hide_banner()
            .args(["-loglevel", "error", "-nostats"])
            .format("rawvideo")
            .pix_fmt("rgb24")
            .size(width, height)
            .rate(fps.max(1) as f32)
            .input("-")
            .codec_video(codec.encoder);
        if codec.write_tag {
            cmd.args(["-tag:v", codec.tag]);
        }
        if let Some(pix_fmt) = codec.pix_fmt {
            cmd.pix_fmt(pix_fmt);
        }
        cmd.overwrite().output(&*path.to_string_lossy());

        let mut child = cmd
            .spawn()
            .map_err(|e| Error::sink_open(&path, format!("无法启动 ffmpeg: {}", e)))?;
        let stdin = child.take_stdin();
        if stdin.is_none() {
            let _ = child.kill();
            let _ = child.wait();
            return Err(Error::sink_open(&path, "无法获取 ffmpeg stdin"));
        }

        debug!(
            "创建输出 {} ({}x{} @ {} fps, {} → {})",
            path.display(),
            width,
            height,
            fps,
            codec.tag,
            codec.encoder
        );

        Ok(Self {
            path,
            size: (width, height),
            fps,
            child: Some(child),
            stdin,
            frames_written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    /// 关闭 stdin, 读取 stderr, 等待退出
    fn close(&mut self) -> Result<()> {
        drop(self.stdin.take());
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };

        let mut stderr = String::new();
        if let Some(mut pipe) = child.take_stderr() {
            let _ = pipe.read_to_string(&mut stderr);
        }
        let status = child.wait()?;
        if status.success() {
            debug!(
                "输出完成 {} ({} 帧)",
                self.path.display(),
                self.frames_written
            );
            Ok(())
        } else {
            error!("❌ ffmpeg 编码失败 ({}): {}", status, stderr.trim());
            Err(Error::Encode(format!("ffmpeg 退出 {}: {}", status, stderr.trim())))
        }
    }
}

impl VideoSink for FfmpegSink {
    fn write(&mut self, frame: &RgbImage) -> Result<()> {
        let actual = frame.dimensions();
        if actual != self.size {
            return Err(Error::FrameSize {
                expected: self.size,
                actual,
            });
        }
        let Some(stdin) = self.stdin.as_mut() else {
            return Err(Error::Encode("输出已结束".to_string()));
        };
        if let Err(e) = stdin.write_all(frame.as_raw()) {
            // 管道断开通常意味着 ffmpeg 已退出, 把它的错误信息带出来
            return match self.close() {
                Err(encode) => Err(encode),
                Ok(()) => Err(Error::Encode(e.to_string())),
            };
        }
        self.frames_written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.close()
    }

    fn frames_written(&self) -> u64 {
        self.frames_written
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_parent_is_not_created() {
        let dir = tempfile::tempdir().unwrap();
        let parent = dir.path().join("no-such-dir");
        let err = FfmpegSink::create(parent.join("out.mp4"), "mp4v", 32, 32, 25)
            .err()
            .unwrap();
        assert!(matches!(err, Error::SinkOpen { .. }));
        assert!(!parent.exists());
    }

    #[test]
    fn test_unknown_fourcc_and_empty_size() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.mp4");
        assert!(matches!(
            FfmpegSink::create(&out, "zzzz", 32, 32, 25),
            Err(Error::SinkOpen { .. })
        ));
        assert!(matches!(
            FfmpegSink::create(&out, "mp4v", 0, 32, 25),
            Err(Error::SinkOpen { .. })
        ));
        assert!(!out.exists());
    }
}
