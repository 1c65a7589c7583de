//! 逐帧进度条

use std::io::IsTerminal;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

/// 已知总帧数时显示进度条, 否则显示计数 spinner; 关闭或 stderr 不是终端时隐藏
pub fn frame_progress(total: Option<u64>, enabled: bool) -> ProgressBar {
    if !enabled || !std::io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }

    match total {
        Some(total) => {
            let pb = ProgressBar::new(total);
            if let Ok(style) = ProgressStyle::default_bar().template(
                "{spinner:.green} {msg} [{bar:40.cyan/blue}] {pos}/{len} ({per_sec}, {eta})",
            ) {
                pb.set_style(style.progress_chars("█▓▒░ "));
            }
            pb.set_message("🎬 处理中");
            pb
        }
        None => {
            let pb = ProgressBar::new_spinner();
            let template = "{spinner} {msg} {pos} 帧 ({per_sec})";
            if let Ok(style) = ProgressStyle::default_spinner().template(template) {
                pb.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
            }
            pb.set_message("🎬 处理中");
            pb.enable_steady_tick(Duration::from_millis(120));
            pb
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_progress_is_hidden() {
        assert!(frame_progress(Some(10), false).is_hidden());
        assert!(frame_progress(None, false).is_hidden());
    }
}
