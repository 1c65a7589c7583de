//! 运行配置 - 命令行参数 + 可选JSON文件
//!
//! 默认值即脚本中写死的路径与阈值; JSON文件覆盖默认值, 命令行再覆盖JSON。

use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use log::info;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const DEFAULT_INPUT: &str = "data/crowd.mp4";
pub const DEFAULT_OUTPUT: &str = "results/output_crowd_detected_person_05.mp4";
pub const DEFAULT_FINAL_OUTPUT: &str = "results/output_crowd_detected_person_05_compressed.mp4";
pub const DEFAULT_MODEL: &str = "models/yolov8s.onnx";
pub const DEFAULT_CONF: f32 = 0.5;
pub const DEFAULT_FOURCC: &str = "mp4v";

/// 流水线配置
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    /// 置信度阈值, 不做范围校验, 原样交给检测器
    pub conf: f32,
    /// 输出视频的四字符编码标签
    pub fourcc: String,
    pub model: ModelConfig,
    /// 标注字体 (TTF), 为空时使用缓存/下载的 Arial.ttf
    pub font: Option<PathBuf>,
    pub progress: bool,
    pub profile: bool,
    /// 第二阶段压缩, None 表示不压缩
    pub compress: Option<CompressConfig>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from(DEFAULT_INPUT),
            output: PathBuf::from(DEFAULT_OUTPUT),
            conf: DEFAULT_CONF,
            fourcc: DEFAULT_FOURCC.to_string(),
            model: ModelConfig::default(),
            font: None,
            progress: true,
            profile: false,
            compress: None,
        }
    }
}

/// 检测模型配置
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModelConfig {
    pub path: PathBuf,
    /// 模型文件不存在时的下载地址
    pub url: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// NMS IOU阈值
    pub iou: f32,
    pub cuda: bool,
    pub trt: bool,
    pub fp16: bool,
    pub device_id: i32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_MODEL),
            url: None,
            width: None,
            height: None,
            iou: 0.7,
            cuda: false,
            trt: false,
            fp16: false,
            device_id: 0,
        }
    }
}

/// 压缩阶段配置: `<tool> -i <in> -vcodec <codec> -crf <crf> <out>`
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CompressConfig {
    pub tool: String,
    pub codec: String,
    pub crf: u8,
    pub output: PathBuf,
    /// 在参数最前面加 `-y` 覆盖已存在的目标文件; 默认关闭, 目标已存在时 ffmpeg 读到 EOF 后拒绝覆盖
    pub overwrite: bool,
    /// 压缩进程非零退出时是否让整个程序失败
    pub strict: bool,
}

impl Default for CompressConfig {
    fn default() -> Self {
        Self {
            tool: "ffmpeg".to_string(),
            codec: "libx264".to_string(),
            crf: 28,
            output: PathBuf::from(DEFAULT_FINAL_OUTPUT),
            overwrite: false,
            strict: false,
        }
    }
}

impl PipelineConfig {
    /// 从JSON文件加载配置, 文件不存在时写出一份默认配置
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            info!("📝 配置文件不存在,创建默认配置: {}", path.display());
            let config = Self::default();
            config.save(path)?;
            return Ok(config);
        }

        let json = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        info!("✅ 配置已从 {} 加载", path.display());
        Ok(config)
    }

    /// 保存配置到JSON文件
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), json)?;
        info!("💾 配置已保存到 {}", path.as_ref().display());
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.fourcc.chars().count() != 4 {
            return Err(Error::Config(format!(
                "fourcc 必须是4个字符: {:?}",
                self.fourcc
            )));
        }
        if let Some(compress) = &self.compress {
            if compress.output == self.output {
                return Err(Error::Config(
                    "压缩输出不能与检测输出是同一个文件".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// 视频人物检测参数
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "YOLOv8 视频人物检测", long_about = None)]
pub struct Args {
    /// JSON配置文件 (命令行参数优先)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// 输入视频路径
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// 输出视频路径
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// ONNX模型路径
    #[arg(short, long)]
    pub model: Option<PathBuf>,

    /// 模型不存在时的下载地址
    #[arg(long)]
    pub model_url: Option<String>,

    /// 置信度阈值
    #[arg(long)]
    pub conf: Option<f32>,

    /// NMS IOU阈值
    #[arg(long)]
    pub iou: Option<f32>,

    /// 推理输入宽度
    #[arg(long)]
    pub width: Option<u32>,

    /// 推理输入高度
    #[arg(long)]
    pub height: Option<u32>,

    /// 输出视频编码标签
    #[arg(long)]
    pub fourcc: Option<String>,

    /// 标注字体 (TTF)
    #[arg(long)]
    pub font: Option<PathBuf>,

    /// 使用CUDA
    #[arg(long)]
    pub cuda: bool,

    /// 使用TensorRT
    #[arg(long)]
    pub trt: bool,

    /// TensorRT FP16
    #[arg(long)]
    pub fp16: bool,

    /// 设备ID
    #[arg(long)]
    pub device_id: Option<i32>,

    /// 检测完成后调用外部工具压缩
    #[arg(long)]
    pub compress: bool,

    /// 压缩后的最终输出路径
    #[arg(long)]
    pub final_output: Option<PathBuf>,

    /// 压缩工具 (默认 ffmpeg)
    #[arg(long)]
    pub compress_tool: Option<String>,

    /// 压缩编码器 (默认 libx264)
    #[arg(long)]
    pub compress_codec: Option<String>,

    /// 压缩质量 CRF
    #[arg(long)]
    pub crf: Option<u8>,

    /// 压缩时覆盖已存在的最终输出 (`-y`)
    #[arg(long)]
    pub overwrite: bool,

    /// 压缩失败时返回错误
    #[arg(long)]
    pub strict_compress: bool,

    /// 关闭进度条
    #[arg(long)]
    pub no_progress: bool,

    /// 启用性能分析
    #[arg(long)]
    pub profile: bool,

    /// 调试日志
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// 合并 默认值 → JSON文件 → 命令行
    pub fn into_config(self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::load(path)?,
            None => PipelineConfig::default(),
        };

        if let Some(input) = self.input {
            config.input = input;
        }
        if let Some(output) = self.output {
            config.output = output;
        }
        if let Some(conf) = self.conf {
            config.conf = conf;
        }
        if let Some(fourcc) = self.fourcc {
            config.fourcc = fourcc;
        }
        if let Some(font) = self.font {
            config.font = Some(font);
        }
        if self.no_progress {
            config.progress = false;
        }
        config.profile |= self.profile;

        let model = &mut config.model;
        if let Some(path) = self.model {
            model.path = path;
        }
        if let Some(url) = self.model_url {
            model.url = Some(url);
        }
        if let Some(iou) = self.iou {
            model.iou = iou;
        }
        if self.width.is_some() {
            model.width = self.width;
        }
        if self.height.is_some() {
            model.height = self.height;
        }
        if let Some(device_id) = self.device_id {
            model.device_id = device_id;
        }
        model.cuda |= self.cuda;
        model.trt |= self.trt;
        model.fp16 |= self.fp16;

        let wants_compress = self.compress
            || self.strict_compress
            || self.overwrite
            || self.final_output.is_some()
            || self.compress_tool.is_some()
            || self.compress_codec.is_some()
            || self.crf.is_some();
        if wants_compress {
            let compress = config.compress.get_or_insert_with(CompressConfig::default);
            if let Some(output) = self.final_output {
                compress.output = output;
            }
            if let Some(tool) = self.compress_tool {
                compress.tool = tool;
            }
            if let Some(codec) = self.compress_codec {
                compress.codec = codec;
            }
            if let Some(crf) = self.crf {
                compress.crf = crf;
            }
            compress.strict |= self.strict_compress;
            compress.overwrite |= self.overwrite;
        }

        config.validate()?;
        Ok(config)
    }
}
