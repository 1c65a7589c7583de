//! ffmpeg 解码器
//!
//! 启动 `ffmpeg -i <path> -fps_mode passthrough -f rawvideo -pix_fmt rgb24 -`, 从 stdout 按帧读取 RGB24 数据。
//! 打开前先用 ffprobe 读取元数据, 输入不可用时在创建任何输出之前返回 `SourceOpen`。
//!
//! ffmpeg 会按显示矩阵自动旋转画面, 而 ffprobe 报告的是存储尺寸。`open` 预先解码第一帧,
//! `info()` 中的宽高以实际解码出的帧为准。

use std::path::{Path, PathBuf};

use ffmpeg_sidecar::child::FfmpegChild;
use ffmpeg_sidecar::command::FfmpegCommand;
use ffmpeg_sidecar::event::{FfmpegEvent, LogLevel};
use ffmpeg_sidecar::iter::FfmpegIterator;
use image::RgbImage;
use log::{debug, info, warn};

use super::{probe, VideoInfo, VideoSource};
use crate::error::{Error, Result};

pub struct FfmpegSource {
    path: PathBuf,
    info: VideoInfo,
    child: Option<FfmpegChild>,
    events: Option<FfmpegIterator>,
    /// `open` 时预读的第一帧
    pending: Option<RgbImage>,
    frames_read: u64,
}

impl FfmpegSource {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let info = probe(&path)?;

        // passthrough: 每个解码帧原样输出, 可变帧率输入不补帧也不丢帧
        let mut child = FfmpegCommand::new()
            .hide_banner()
            .input(&*path.to_string_lossy())
            .args(["-nostdin", "-map", "0:v:0", "-an", "-sn"])
            .fps_mode("passthrough")
            .rawvideo()
            .spawn()
            .map_err(|e| Error::source_open(&path, format!("无法启动 ffmpeg: {}", e)))?;

        let events = match child.iter() {
            Ok(events) => events,
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(Error::source_open(&path, e.to_string()));
            }
        };

        let mut source = Self {
            path,
            info,
            child: Some(child),
            events: Some(events),
            pending: None,
            frames_read: 0,
        };
        source.prime();

        debug!(
            "🎬 打开视频 {} ({}x{} @ {} fps, 总帧数 {:?})",
            source.path.display(),
            source.info.width,
            source.info.height,
            source.info.fps,
            source.info.total_frames
        );
        Ok(source)
    }

    /// 预读第一帧, 用解码尺寸修正元数据 (带旋转信息的视频宽高会互换)
    fn prime(&mut self) {
        let Some(frame) = self.next_frame() else {
            return;
        };
        let (w, h) = frame.dimensions();
        if (w, h) != (self.info.width, self.info.height) {
            info!(
                "🔄 解码尺寸 {}x{} 与存储尺寸 {}x{} 不同 (旋转), 按解码尺寸输出",
                w, h, self.info.width, self.info.height
            );
            self.info.width = w;
            self.info.height = h;
        }
        self.pending = Some(frame);
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    /// 取下一个解码帧; 数据不完整或解码出错都视为流结束
    fn next_frame(&mut self) -> Option<RgbImage> {
        let events = self.events.as_mut()?;
        for event in events.by_ref() {
            match event {
                FfmpegEvent::OutputFrame(frame) => {
                    let (w, h) = (frame.width, frame.height);
                    match RgbImage::from_raw(w, h, frame.data) {
                        Some(img) => {
                            self.frames_read += 1;
                            return Some(img);
                        }
                        None => {
                            // 数据长度与宽高不符, 视为流结束
                            warn!("⚠️ 第 {} 帧数据不完整 ({}x{})", self.frames_read, w, h);
                            return None;
                        }
                    }
                }
                FfmpegEvent::Error(e) | FfmpegEvent::Log(LogLevel::Error, e) => {
                    warn!("⚠️ 解码: {}", e);
                }
                FfmpegEvent::Log(LogLevel::Fatal, e) => {
                    warn!("❌ 解码: {}", e);
                }
                FfmpegEvent::Done => break,
                _ => {}
            }
        }
        None
    }
}

impl VideoSource for FfmpegSource {
    fn info(&self) -> &VideoInfo {
        &self.info
    }

    fn read(&mut self) -> Option<RgbImage> {
        self.pending.take().or_else(|| self.next_frame())
    }

    fn release(&mut self) {
        self.pending = None;
        self.events = None;
        if let Some(mut child) = self.child.take() {
            // 提前结束时 ffmpeg 可能仍在写 stdout
            let _ = child.kill();
            let _ = child.wait();
            debug!(
                "释放输入 {} (已读取 {} 帧)",
                self.path.display(),
                self.frames_read
            );
        }
    }
}

impl Drop for FfmpegSource {
    fn drop(&mut self) {
        self.release();
    }
}
