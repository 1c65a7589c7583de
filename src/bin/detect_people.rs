//! 视频人物检测 (Video Person Detection)
//!
//! 流程:
//! 1. 读取输入视频, 逐帧用 YOLOv8 检测人物并绘制标注
//! 2. 按原分辨率/帧率写出 mp4v 视频
//! 3. (可选) 调用 ffmpeg 压缩为最终视频

use anyhow::{bail, Context, Result};
use clap::Parser;
use env_logger::Env;
use log::{info, warn};
use mimalloc::MiMalloc;

use yolov8_people::compress::Compressor;
use yolov8_people::{
    assets, detect_people_in_video, Args, Model, PipelineConfig, YOLOv8, YoloDetector,
};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn main() -> Result<()> {
    let args = Args::parse();
    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    let config = args.into_config().context("配置无效")?;
    run(&config)
}

fn run(config: &PipelineConfig) -> Result<()> {
    info!("🚀 视频人物检测启动");
    info!("📹 输入: {}", config.input.display());
    info!("💾 输出: {}", config.output.display());
    info!("📦 模型: {} (conf {})", config.model.path.display(), config.conf);

    assets::ensure_model(&config.model.path, config.model.url.as_deref())?;
    let model = YOLOv8::new(&config.model, config.conf, config.profile)
        .with_context(|| format!("无法加载模型 {}", config.model.path.display()))?;
    model.summary();

    let mut detector = YoloDetector::new(model);
    let report = detect_people_in_video(&mut detector, config)?;
    info!(
        "📊 {} 帧, 检测到 {} 个人物 ({:.1} fps)",
        report.frames_written,
        report.total_detections(),
        report.fps()
    );

    let Some(compress) = &config.compress else {
        return Ok(());
    };

    let mut compressor = Compressor::new(compress.clone());
    let outcome = compressor.run(&config.output)?;
    if outcome.success {
        info!("✅ 最终视频已就绪: {}", outcome.output.display());
    } else if compress.strict {
        bail!(
            "压缩失败 (退出码 {:?}): {}",
            outcome.status,
            outcome.last_error_line().unwrap_or("")
        );
    } else {
        warn!(
            "⚠️ 压缩失败, 检测结果仍保存在 {}",
            config.output.display()
        );
    }
    Ok(())
}
