//! 压缩阶段集成测试: 用 shell 脚本代替真实编码器
#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use yolov8_people::compress::compress;
use yolov8_people::{CompressConfig, CompressState, Compressor, Error};

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn config_for(tool: &Path, output: &Path) -> CompressConfig {
    CompressConfig {
        tool: tool.to_string_lossy().into_owned(),
        output: output.to_path_buf(),
        ..Default::default()
    }
}

#[test]
fn successful_tool_produces_non_empty_file() {
    let dir = tempfile::tempdir().unwrap();
    // 把 -i 后面的输入复制到最后一个参数
    let tool = write_script(
        dir.path(),
        "fake-encoder.sh",
        r#"while [ $# -gt 0 ]; do
  case "$1" in
    -i) src="$2"; shift 2 ;;
    *) dst="$1"; shift ;;
  esac
done
cp "$src" "$dst""#,
    );
    let input = dir.path().join("stage1.mp4");
    fs::write(&input, b"stage one video").unwrap();
    let output = dir.path().join("final").join("stage2.mp4");

    let outcome = compress(&input, &output, &config_for(&tool, &output)).unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.status, Some(0));
    assert!(outcome.produced_output());
    assert!(fs::metadata(&output).unwrap().len() > 0);
}

#[test]
fn failing_tool_is_not_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let tool = write_script(
        dir.path(),
        "broken-encoder.sh",
        "echo 'encoder exploded' >&2\nexit 3",
    );
    let output = dir.path().join("stage2.mp4");

    let mut compressor = Compressor::new(config_for(&tool, &output));
    let outcome = compressor.run(&dir.path().join("stage1.mp4")).unwrap();
    assert!(!outcome.success);
    assert_eq!(outcome.status, Some(3));
    assert_eq!(outcome.last_error_line(), Some("encoder exploded"));
    assert!(!outcome.produced_output());
    assert_eq!(compressor.state(), CompressState::Done);
}

#[test]
fn arguments_follow_the_documented_order() {
    let dir = tempfile::tempdir().unwrap();
    let tool = write_script(dir.path(), "echo-args.sh", r#"echo "$@""#);
    let output = dir.path().join("out.mp4");
    let input = dir.path().join("in.mp4");

    let outcome = compress(&input, &output, &config_for(&tool, &output)).unwrap();
    assert_eq!(
        outcome.stdout.trim(),
        format!(
            "-i {} -vcodec libx264 -crf 28 {}",
            input.display(),
            output.display()
        )
    );
}

#[test]
fn overwrite_prepends_the_yes_flag() {
    let dir = tempfile::tempdir().unwrap();
    let tool = write_script(dir.path(), "echo-args.sh", r#"echo "$@""#);
    let output = dir.path().join("out.mp4");
    let config = CompressConfig {
        overwrite: true,
        ..config_for(&tool, &output)
    };

    let outcome = compress(&dir.path().join("in.mp4"), &output, &config).unwrap();
    assert!(outcome.stdout.starts_with("-y -i "));
}

#[test]
fn missing_tool_is_a_spawn_error() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.mp4");
    let config = CompressConfig {
        tool: dir.path().join("no-such-tool").to_string_lossy().into_owned(),
        output: output.clone(),
        ..Default::default()
    };
    let err = compress(&dir.path().join("in.mp4"), &output, &config).unwrap_err();
    assert!(matches!(err, Error::Spawn { .. }));
}
