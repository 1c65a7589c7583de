//! 视频处理流水线 (Video Processing Pipeline)
//!
//! 单线程同步循环: 读帧 → 检测 (仅 person) → 绘制 → 写入。
//! 无论成功还是中途出错, 输出和输入都会被关闭/释放, 返回第一个错误。

mod progress;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use image::RgbImage;
use log::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::detection::{Detection, Detector};
use crate::input::{FfmpegSource, VideoSource};
use crate::output::{FfmpegSink, VideoSink};
use crate::renderer::Plotter;
use crate::{Result, PERSON_CLASS};

pub use progress::frame_progress;

/// 一次处理的结果
#[derive(Debug, Clone, Default)]
pub struct ProcessReport {
    pub output: Option<PathBuf>,
    pub frames_read: u64,
    pub frames_written: u64,
    /// 每帧绘制的检测结果, 与输出帧一一对应
    pub detections: Vec<Vec<Detection>>,
    /// 输入容器记录的总帧数
    pub reported_total: Option<u64>,
    pub elapsed: Duration,
}

impl ProcessReport {
    pub fn total_detections(&self) -> usize {
        self.detections.iter().map(Vec::len).sum()
    }

    /// 平均处理速度 (帧/秒)
    pub fn fps(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.frames_written as f64 / secs
        } else {
            0.0
        }
    }
}

pub struct Pipeline<'a, D: Detector + ?Sized> {
    detector: &'a mut D,
    plotter: Plotter,
    conf: f32,
    classes: Vec<usize>,
    output: Option<PathBuf>,
    progress: bool,
    profile: bool,
}

impl<'a, D: Detector + ?Sized> Pipeline<'a, D> {
    /// 只检测 person, `conf` 不做范围检查
    pub fn new(detector: &'a mut D, conf: f32) -> Self {
        Self {
            detector,
            plotter: Plotter::default(),
            conf,
            classes: vec![PERSON_CLASS],
            output: None,
            progress: false,
            profile: false,
        }
    }

    pub fn with_plotter(mut self, plotter: Plotter) -> Self {
        self.plotter = plotter;
        self
    }

    /// 写入报告的输出路径
    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_profile(mut self, profile: bool) -> Self {
        self.profile = profile;
        self
    }

    pub fn conf(&self) -> f32 {
        self.conf
    }

    /// 处理单帧: 返回标注后的副本和保留下来的检测结果
    pub fn process_frame(&mut self, frame: &RgbImage) -> Result<(RgbImage, Vec<Detection>)> {
        let t = Instant::now();
        let detections: Vec<Detection> = self
            .detector
            .detect(frame, &self.classes, self.conf)?
            .into_iter()
            .filter(|d| d.class_id() == PERSON_CLASS && d.confidence() >= self.conf)
            .collect();
        let t_detect = t.elapsed();

        let annotated = self.plotter.annotate(frame, &detections);
        if self.profile {
            debug!(
                "[Frame] detect: {:?}, draw: {:?}, persons: {}",
                t_detect,
                t.elapsed() - t_detect,
                detections.len()
            );
        }
        Ok((annotated, detections))
    }

    /// 运行整个循环
    ///
    /// 总帧数已知且大于0时最多读取该数量, 否则读到 `read()` 返回 `None`。
    /// `sink.finish()` 与 `source.release()` 在任何情况下都会执行。
    pub fn run<S, K>(&mut self, source: &mut S, sink: &mut K) -> Result<ProcessReport>
    where
        S: VideoSource + ?Sized,
        K: VideoSink + ?Sized,
    {
        let start = Instant::now();
        let info = source.info().clone();
        let limit = info.frame_limit();
        let pb = frame_progress(info.estimated_frames(), self.progress);

        let mut report = ProcessReport {
            output: self.output.clone(),
            reported_total: info.total_frames,
            ..Default::default()
        };

        let looped = self.drive(source, sink, limit, &pb, &mut report);
        pb.finish_and_clear();

        let finished = sink.finish();
        source.release();
        report.frames_written = sink.frames_written();
        report.elapsed = start.elapsed();

        // 第一个错误优先
        looped?;
        finished?;

        if let Some(total) = limit {
            if report.frames_read < total {
                warn!(
                    "⚠️ 视频提前结束: 读取 {} 帧, 元数据记录 {} 帧",
                    report.frames_read, total
                );
            }
        }
        info!(
            "✅ 处理完成: {} 帧, {} 个人物, 耗时 {:.1}s ({:.1} fps)",
            report.frames_written,
            report.total_detections(),
            report.elapsed.as_secs_f64(),
            report.fps()
        );
        Ok(report)
    }

    fn drive<S, K>(
        &mut self,
        source: &mut S,
        sink: &mut K,
        limit: Option<u64>,
        pb: &indicatif::ProgressBar,
        report: &mut ProcessReport,
    ) -> Result<()>
    where
        S: VideoSource + ?Sized,
        K: VideoSink + ?Sized,
    {
        loop {
            if limit.is_some_and(|total| report.frames_read >= total) {
                break;
            }
            let Some(frame) = source.read() else {
                break;
            };
            report.frames_read += 1;

            let (annotated, detections) = self.process_frame(&frame)?;
            sink.write(&annotated)?;
            report.detections.push(detections);
            pb.inc(1);
        }
        Ok(())
    }
}

/// 检测视频中的人物并输出标注后的视频
///
/// 输入打不开时返回 `SourceOpen`, 此时不会创建输出文件。
pub fn detect_people_in_video<D: Detector + ?Sized>(
    detector: &mut D,
    config: &PipelineConfig,
) -> Result<ProcessReport> {
    let mut source = FfmpegSource::open(&config.input)?;
    let info = source.info().clone();
    info!(
        "🎬 输入 {} ({}x{} @ {} fps, 总帧数 {})",
        config.input.display(),
        info.width,
        info.height,
        info.fps,
        info.total_frames
            .map(|n| n.to_string())
            .unwrap_or_else(|| "未知".to_string())
    );

    // 字体可能需要下载, 在启动编码进程之前准备好
    let plotter = Plotter::resolve(config.font.as_deref());

    let mut sink = match FfmpegSink::create(
        &config.output,
        &config.fourcc,
        info.width,
        info.height,
        info.fps,
    ) {
        Ok(sink) => sink,
        Err(e) => {
            source.release();
            return Err(e);
        }
    };

    let report = Pipeline::new(detector, config.conf)
        .with_plotter(plotter)
        .with_output(&config.output)
        .with_progress(config.progress)
        .with_profile(config.profile)
        .run(&mut source, &mut sink)?;

    info!("✅ 视频已保存: {}", config.output.display());
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::FrameQueue;
    use crate::output::FrameCollector;
    use crate::{Bbox, StubDetector};

    fn person(conf: f32) -> Detection {
        Detection::coco(Bbox::new(4., 4., 8., 8., PERSON_CLASS, conf))
    }

    #[test]
    fn test_limit_caps_reading() {
        // 元数据记录 2 帧, 实际有 4 帧
        let frames = vec![RgbImage::new(16, 16); 4];
        let info = crate::input::VideoInfo::new(16, 16, 25).with_total_frames(2);
        let mut source = FrameQueue::with_info(frames, info);
        let mut sink = FrameCollector::new(16, 16, 25);
        let mut detector = StubDetector::empty();

        let report = Pipeline::new(&mut detector, 0.5)
            .run(&mut source, &mut sink)
            .unwrap();
        assert_eq!(report.frames_read, 2);
        assert_eq!(report.frames_written, 2);
        assert!(source.is_released());
    }

    #[test]
    fn test_filters_non_person_even_if_detector_returns_them() {
        struct Noisy;
        impl Detector for Noisy {
            fn detect(&mut self, _: &RgbImage, _: &[usize], _: f32) -> Result<Vec<Detection>> {
                Ok(vec![
                    person(0.9),
                    person(0.2),
                    Detection::coco(Bbox::new(1., 1., 4., 4., 2, 0.99)),
                ])
            }
        }

        let mut source = FrameQueue::solid(1, 16, 16, 25);
        let mut sink = FrameCollector::new(16, 16, 25);
        let report = Pipeline::new(&mut Noisy, 0.5)
            .run(&mut source, &mut sink)
            .unwrap();
        assert_eq!(report.detections[0], vec![person(0.9)]);
    }

    #[test]
    fn test_report_totals() {
        let report = ProcessReport {
            frames_written: 10,
            detections: vec![vec![person(0.9)], vec![], vec![person(0.6), person(0.7)]],
            elapsed: Duration::from_secs(2),
            ..Default::default()
        };
        assert_eq!(report.total_detections(), 3);
        assert_eq!(report.fps(), 5.0);
    }
}
