//! 资源下载与缓存 (字体、模型权重)

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::error::{Error, Result};

/// 标注字体
pub const FONT_NAME: &str = "Arial.ttf";
pub const FONT_URL: &str = "https://github.com/ultralytics/assets/releases/download/v0.0.0/Arial.ttf";

/// 缓存目录: `<config_dir>/Ultralytics`, 取不到系统配置目录时退回临时目录
pub fn cache_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("Ultralytics")
}

/// 下载到 `dst`; 先写入 `.part` 临时文件, 完成后再改名, 失败时不留下残缺文件
pub fn download(url: &str, dst: &Path) -> Result<()> {
    if let Some(parent) = dst.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    info!("⬇️ 下载 {} → {}", url, dst.display());
    let response = ureq::get(url).call().map_err(|e| Error::Download {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    let part = dst.with_extension("part");
    let written = File::create(&part).and_then(|mut file| {
        let mut reader = response.into_reader();
        io::copy(&mut reader, &mut file)
    });
    match written {
        Ok(0) => {
            let _ = fs::remove_file(&part);
            Err(Error::Download {
                url: url.to_string(),
                reason: "响应为空".to_string(),
            })
        }
        Ok(bytes) => {
            fs::rename(&part, dst)?;
            info!("✅ 下载完成: {} ({} bytes)", dst.display(), bytes);
            Ok(())
        }
        Err(e) => {
            let _ = fs::remove_file(&part);
            Err(Error::Download {
                url: url.to_string(),
                reason: e.to_string(),
            })
        }
    }
}

/// 标注字体路径, 本地没有缓存时下载
pub fn font_path() -> Result<PathBuf> {
    let path = cache_dir().join(FONT_NAME);
    if !path.exists() {
        download(FONT_URL, &path)?;
    }
    Ok(path)
}

/// 确保模型文件存在; 不存在且配置了下载地址时下载
pub fn ensure_model(path: &Path, url: Option<&str>) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    match url {
        Some(url) => {
            warn!("⚠️ 模型文件不存在, 开始下载: {}", path.display());
            download(url, path)
        }
        None => Err(Error::model_load(format!(
            "模型文件不存在: {} (可用 --model-url 指定下载地址)",
            path.display()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_dir_name() {
        assert!(cache_dir().ends_with("Ultralytics"));
    }

    #[test]
    fn test_ensure_model_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let model = dir.path().join("yolov8s.onnx");
        fs::write(&model, b"onnx").unwrap();
        assert!(ensure_model(&model, None).is_ok());
    }

    #[test]
    fn test_ensure_model_missing_without_url() {
        let dir = tempfile::tempdir().unwrap();
        let model = dir.path().join("missing.onnx");
        assert!(matches!(
            ensure_model(&model, None),
            Err(Error::ModelLoad(_))
        ));
    }

    #[test]
    fn test_failed_download_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let dst = dir.path().join("models").join("yolov8s.onnx");
        // 端口 9 (discard) 本地无人监听, 连接立即被拒绝
        let err = download("http://127.0.0.1:9/yolov8s.onnx", &dst).unwrap_err();
        assert!(matches!(err, Error::Download { .. }));
        assert!(!dst.exists());
        assert!(!dst.with_extension("part").exists());
    }
}
