//! ffprobe 元数据读取

use std::path::Path;

use log::{debug, warn};

use crate::error::{Error, Result};

/// 帧率缺失或为0时的默认值
pub const FALLBACK_FPS: u32 = 30;

/// 视频元数据
#[derive(Debug, Clone, PartialEq)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    /// 取整后的帧率, 输出视频使用
    pub fps: u32,
    pub fps_raw: f64,
    /// 容器记录的总帧数 (仅供参考, 可能缺失或不准)
    pub total_frames: Option<u64>,
    /// 时长 (秒)
    pub duration: Option<f64>,
}

impl VideoInfo {
    pub fn new(width: u32, height: u32, fps: u32) -> Self {
        Self {
            width,
            height,
            fps,
            fps_raw: fps as f64,
            total_frames: None,
            duration: None,
        }
    }

    pub fn with_total_frames(mut self, total: u64) -> Self {
        self.total_frames = Some(total);
        self
    }

    /// 循环上限: 总帧数已知且大于0时使用, 否则读到流结束
    pub fn frame_limit(&self) -> Option<u64> {
        self.total_frames.filter(|&n| n > 0)
    }

    /// 进度条长度: 优先总帧数, 其次按时长估算
    pub fn estimated_frames(&self) -> Option<u64> {
        self.frame_limit().or_else(|| {
            self.duration
                .map(|d| (d * self.fps_raw).round() as u64)
                .filter(|&n| n > 0)
        })
    }
}

/// 用 ffprobe 读取第一个视频流的信息
pub fn probe(path: &Path) -> Result<VideoInfo> {
    if !path.exists() {
        return Err(Error::source_open(path, "文件不存在"));
    }

    let metadata = ffprobe::ffprobe(path)
        .map_err(|e| Error::source_open(path, format!("ffprobe 失败: {:?}", e)))?;

    let stream = metadata
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| Error::source_open(path, "没有视频流"))?;

    let (width, height) = match (stream.width, stream.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w as u32, h as u32),
        _ => return Err(Error::source_open(path, "无法获取分辨率")),
    };

    let fps_raw = parse_frame_rate(&stream.r_frame_rate)
        .or_else(|| parse_frame_rate(&stream.avg_frame_rate));
    let (fps, fps_raw) = match fps_raw {
        Some(raw) => (round_fps(raw), raw),
        None => {
            warn!(
                "⚠️ 无法获取帧率 ({} / {}), 使用 {} fps",
                stream.r_frame_rate, stream.avg_frame_rate, FALLBACK_FPS
            );
            (FALLBACK_FPS, FALLBACK_FPS as f64)
        }
    };

    let total_frames = stream
        .nb_frames
        .as_deref()
        .and_then(|n| n.trim().parse::<u64>().ok());
    let duration = metadata
        .format
        .duration
        .as_deref()
        .and_then(|d| d.trim().parse::<f64>().ok());

    let info = VideoInfo {
        width,
        height,
        fps,
        fps_raw,
        total_frames,
        duration,
    };
    debug!("probe {}: {:?}", path.display(), info);
    Ok(info)
}

/// 解析 `30000/1001`、`25/1`、`29.97` 形式的帧率; 0、负数、非有限值返回 None
pub fn parse_frame_rate(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    let value = match raw.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => raw.parse().ok()?,
    };
    (value.is_finite() && value > 0.0).then_some(value)
}

/// 帧率取整 (最小为1)
pub fn round_fps(raw: f64) -> u32 {
    (raw.round() as u32).max(1)
}
