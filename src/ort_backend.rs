// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//
// ONNX Runtime 推理后端
// 负责: 执行提供者选择、模型加载、元数据读取、前向推理

use std::collections::BTreeMap;
use std::path::PathBuf;

use log::{debug, info, warn};
use ndarray::{Array, IxDyn};
use ort::execution_providers::{CUDAExecutionProvider, TensorRTExecutionProvider};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::TensorRef;
use regex::Regex;

use crate::error::{Error, Result};

/// 执行提供者 (Execution Provider)
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OrtEP {
    CPU,
    CUDA(i32),
    Trt(i32),
}

#[derive(Debug, Clone)]
pub struct OrtConfig {
    pub ep: OrtEP,
    pub f: PathBuf,
    pub trt_fp16: bool,
    /// (height, width), None 时读取模型元数据 imgsz, 再缺省为 640
    pub image_size: (Option<u32>, Option<u32>),
}

pub struct OrtBackend {
    session: Session,
    ep: OrtEP,
    height: u32,
    width: u32,
    names: Option<Vec<String>>,
    task: Option<String>,
    author: Option<String>,
    version: Option<String>,
}

impl OrtBackend {
    pub fn build(args: OrtConfig) -> Result<Self> {
        if !args.f.exists() {
            return Err(Error::model_load(format!(
                "模型文件不存在: {}",
                args.f.display()
            )));
        }

        let builder = Session::builder()
            .map_err(|e| Error::model_load(e.to_string()))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| Error::model_load(e.to_string()))?;

        // 注册失败时 ONNX Runtime 会退回 CPU
        let builder = match args.ep {
            OrtEP::CPU => builder,
            OrtEP::CUDA(device_id) => builder
                .with_execution_providers([CUDAExecutionProvider::default()
                    .with_device_id(device_id)
                    .build()])
                .map_err(|e| Error::model_load(e.to_string()))?,
            OrtEP::Trt(device_id) => builder
                .with_execution_providers([
                    TensorRTExecutionProvider::default()
                        .with_device_id(device_id)
                        .with_fp16(args.trt_fp16)
                        .build(),
                    CUDAExecutionProvider::default()
                        .with_device_id(device_id)
                        .build(),
                ])
                .map_err(|e| Error::model_load(e.to_string()))?,
        };

        let session = builder
            .commit_from_file(&args.f)
            .map_err(|e| Error::model_load(format!("{}: {}", args.f.display(), e)))?;

        // 读取 Ultralytics 导出时写入的自定义元数据
        let (names, imgsz, task, author, version) = {
            let metadata = session
                .metadata()
                .map_err(|e| Error::model_load(e.to_string()))?;
            let custom = |key: &str| metadata.custom(key).ok().flatten();
            (
                custom("names").map(|s| parse_names(&s)),
                custom("imgsz").and_then(|s| parse_imgsz(&s)),
                custom("task"),
                custom("author"),
                custom("version"),
            )
        };

        let (height, width) = match (args.image_size, imgsz) {
            ((Some(h), Some(w)), _) => (h, w),
            ((h, w), Some((mh, mw))) => (h.unwrap_or(mh), w.unwrap_or(mw)),
            ((h, w), None) => (h.unwrap_or(640), w.unwrap_or(640)),
        };

        if let Some(task) = &task {
            if task != "detect" {
                warn!("⚠️ 模型任务为 {}, 仅按检测任务解码", task);
            }
        }

        info!(
            "✅ 模型加载成功: {} ({}x{}, {:?})",
            args.f.display(),
            width,
            height,
            args.ep
        );

        Ok(Self {
            session,
            ep: args.ep,
            height,
            width,
            names: names.filter(|n| !n.is_empty()),
            task,
            author,
            version,
        })
    }

    pub fn run(&mut self, xs: Array<f32, IxDyn>, profile: bool) -> Result<Vec<Array<f32, IxDyn>>> {
        let t = std::time::Instant::now();
        let input = TensorRef::from_array_view(&xs).map_err(|e| Error::inference(e.to_string()))?;
        let outputs = self
            .session
            .run(ort::inputs![input])
            .map_err(|e| Error::inference(e.to_string()))?;

        let mut ys = Vec::with_capacity(outputs.len());
        for idx in 0..outputs.len() {
            let y = outputs[idx]
                .try_extract_array::<f32>()
                .map_err(|e| Error::inference(e.to_string()))?
                .into_owned();
            ys.push(y);
        }
        if profile {
            debug!("[ORT Run]: {:?}", t.elapsed());
        }
        Ok(ys)
    }

    pub fn ep(&self) -> &OrtEP {
        &self.ep
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn names(&self) -> Option<Vec<String>> {
        self.names.clone()
    }

    pub fn task(&self) -> Option<&str> {
        self.task.as_deref()
    }

    pub fn author(&self) -> Option<&str> {
        self.author.as_deref()
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }
}

/// 解析元数据中的类别名: `{0: 'person', 1: 'bicycle', ...}`
pub fn parse_names(raw: &str) -> Vec<String> {
    let Ok(re) = Regex::new(r#"(\d+):\s*['"]([^'"]*)['"]"#) else {
        return Vec::new();
    };
    let names: BTreeMap<usize, String> = re
        .captures_iter(raw)
        .filter_map(|c| Some((c[1].parse().ok()?, c[2].to_string())))
        .collect();
    names.into_values().collect()
}

/// 解析元数据中的输入尺寸: `[640, 640]` → (h, w)
pub fn parse_imgsz(raw: &str) -> Option<(u32, u32)> {
    let re = Regex::new(r"\d+").ok()?;
    let dims: Vec<u32> = re
        .find_iter(raw)
        .filter_map(|m| m.as_str().parse().ok())
        .collect();
    match dims.as_slice() {
        [s] => Some((*s, *s)),
        [h, w, ..] => Some((*h, *w)),
        _ => None,
    }
}
