//! 错误类型 (Error types)

use std::path::PathBuf;

use thiserror::Error;

/// 库内统一的 Result 别名
pub type Result<T> = std::result::Result<T, Error>;

/// 流水线错误
///
/// 只有 `SourceOpen` 是显式的致命错误: 输入视频打不开时立即返回,
/// 此时还没有创建任何输出文件。读帧失败不是错误,按流结束处理。
#[derive(Error, Debug)]
pub enum Error {
    #[error("无法打开视频文件 {path}: {reason}")]
    SourceOpen { path: PathBuf, reason: String },

    #[error("无法创建输出视频 {path}: {reason}")]
    SinkOpen { path: PathBuf, reason: String },

    #[error("视频编码失败: {0}")]
    Encode(String),

    #[error("帧尺寸不匹配: 期望 {expected:?}, 实际 {actual:?}")]
    FrameSize {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("模型加载失败: {0}")]
    ModelLoad(String),

    #[error("推理失败: {0}")]
    Inference(String),

    #[error("无法启动外部程序 {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("下载失败 {url}: {reason}")]
    Download { url: String, reason: String },

    #[error("配置错误: {0}")]
    Config(String),

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("图像处理错误: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON解析错误: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn source_open<P: Into<PathBuf>, S: Into<String>>(path: P, reason: S) -> Self {
        Self::SourceOpen {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn sink_open<P: Into<PathBuf>, S: Into<String>>(path: P, reason: S) -> Self {
        Self::SinkOpen {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn model_load<S: Into<String>>(msg: S) -> Self {
        Self::ModelLoad(msg.into())
    }

    pub fn inference<S: Into<String>>(msg: S) -> Self {
        Self::Inference(msg.into())
    }

    /// 是否为"输入打不开"这一类致命错误
    pub fn is_source_open(&self) -> bool {
        matches!(self, Self::SourceOpen { .. })
    }
}
