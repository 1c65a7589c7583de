//! 第二阶段: 调用外部工具压缩输出视频
//!
//! `<tool> [-y] -i <in> -vcodec <codec> -crf <crf> <out>`, 阻塞等待退出。
//! 只有无法启动进程才返回 `Err`; 退出码记录在 `CompressOutcome` 中, 由调用方决定如何处理。

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Instant;

use log::{debug, info, warn};

use crate::config::CompressConfig;
use crate::error::{Error, Result};

/// 压缩进度状态; 无论退出码如何, 结束后都是 `Done`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressState {
    #[default]
    NotStarted,
    Running,
    Done,
}

/// 外部工具的执行结果
#[derive(Debug, Clone)]
pub struct CompressOutcome {
    /// 退出码, 被信号终止时为 None
    pub status: Option<i32>,
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    pub output: PathBuf,
}

impl CompressOutcome {
    /// 成功且输出文件非空
    pub fn produced_output(&self) -> bool {
        self.success
            && std::fs::metadata(&self.output)
                .map(|m| m.len() > 0)
                .unwrap_or(false)
    }

    /// stderr 最后一行, 用于日志
    pub fn last_error_line(&self) -> Option<&str> {
        self.stderr.lines().rev().find(|l| !l.trim().is_empty())
    }
}

/// 带状态的压缩器
#[derive(Debug, Clone)]
pub struct Compressor {
    config: CompressConfig,
    state: CompressState,
}

impl Compressor {
    pub fn new(config: CompressConfig) -> Self {
        Self {
            config,
            state: CompressState::NotStarted,
        }
    }

    pub fn state(&self) -> CompressState {
        self.state
    }

    pub fn config(&self) -> &CompressConfig {
        &self.config
    }

    /// 压缩到配置中的输出路径
    pub fn run(&mut self, input: &Path) -> Result<CompressOutcome> {
        self.state = CompressState::Running;
        let outcome = compress(input, &self.config.output, &self.config);
        self.state = CompressState::Done;
        outcome
    }
}

/// 命令行参数 (不含程序名)
pub fn build_args(input: &Path, output: &Path, config: &CompressConfig) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::with_capacity(8);
    if config.overwrite {
        args.push("-y".into());
    }
    args.push("-i".into());
    args.push(input.into());
    args.push("-vcodec".into());
    args.push(config.codec.as_str().into());
    args.push("-crf".into());
    args.push(config.crf.to_string().into());
    args.push(output.into());
    args
}

pub fn compress(input: &Path, output: &Path, config: &CompressConfig) -> Result<CompressOutcome> {
    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let args = build_args(input, output, config);
    debug!("执行: {} {:?}", config.tool, args);
    info!(
        "🗜️ 压缩 {} → {} ({}, crf {})",
        input.display(),
        output.display(),
        config.codec,
        config.crf
    );

    let start = Instant::now();
    let result = Command::new(&config.tool)
        .args(&args)
        .stdin(Stdio::null())
        .output()
        .map_err(|source| Error::Spawn {
            program: config.tool.clone(),
            source,
        })?;

    let outcome = CompressOutcome {
        status: result.status.code(),
        success: result.status.success(),
        stdout: String::from_utf8_lossy(&result.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&result.stderr).into_owned(),
        output: output.to_path_buf(),
    };

    if outcome.success {
        info!(
            "✅ 压缩完成: {} ({:.1}s)",
            output.display(),
            start.elapsed().as_secs_f64()
        );
    } else {
        warn!(
            "⚠️ 压缩工具退出码 {:?}: {}",
            outcome.status,
            outcome.last_error_line().unwrap_or("")
        );
    }
    Ok(outcome)
}
