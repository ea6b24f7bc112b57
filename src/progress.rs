//! Progress bars for long embedding runs, and a log writer that prints
//! above them instead of tearing through them.

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io::{self, Write};
use std::sync::OnceLock;
use tracing_subscriber::fmt::MakeWriter;

static MULTI_PROGRESS: OnceLock<MultiProgress> = OnceLock::new();

fn multi_progress() -> &'static MultiProgress {
    MULTI_PROGRESS.get_or_init(|| {
        let mp = MultiProgress::new();
        mp.set_draw_target(ProgressDrawTarget::stderr_with_hz(10));
        mp
    })
}

/// A bar counting `len` items, labelled with what is being counted
pub fn add_progress_bar(len: u64, label: &str) -> ProgressBar {
    let pb = multi_progress().add(ProgressBar::new(len));
    let template = format!("{{bar:40}} {{pos}}/{{len}} {}", label);
    if let Ok(style) = ProgressStyle::with_template(&template) {
        pb.set_style(style);
    }
    pb
}

/// `MakeWriter` for the console log layer
#[derive(Default, Clone)]
pub struct LogWriterFactory;

pub struct LogWriter {
    pending: String,
}

fn emit(line: &str) {
    let _ = multi_progress().println(line.trim_end_matches('\r'));
}

/// Remove and return every newline-terminated line from `buffer`
fn take_complete_lines(buffer: &mut String) -> Vec<String> {
    let Some(last) = buffer.rfind('\n') else {
        return Vec::new();
    };
    let rest = buffer.split_off(last + 1);
    let complete = std::mem::replace(buffer, rest);
    complete
        .strip_suffix('\n')
        .unwrap_or(&complete)
        .split('\n')
        .map(str::to_string)
        .collect()
}

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.push_str(&String::from_utf8_lossy(buf));
        for line in take_complete_lines(&mut self.pending) {
            emit(&line);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if !self.pending.is_empty() {
            emit(&self.pending);
            self.pending.clear();
        }
        Ok(())
    }
}

impl Drop for LogWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

impl<'a> MakeWriter<'a> for LogWriterFactory {
    type Writer = LogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogWriter {
            pending: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_lines_stay_buffered() {
        let mut buffer = "first\nsecond\r\nthi".to_string();
        let lines = take_complete_lines(&mut buffer);
        assert_eq!(lines, vec!["first", "second\r"]);
        assert_eq!(buffer, "thi");

        assert!(take_complete_lines(&mut buffer).is_empty());

        buffer.push_str("rd\n\n");
        assert_eq!(take_complete_lines(&mut buffer), vec!["third", ""]);
        assert!(buffer.is_empty());
    }
}
