//! Batch progress bar that shares the terminal with tracing output.
//!
//! While a bar is active, log lines are printed through it so they appear
//! above the bar instead of tearing it.

use std::io::Write;
use std::sync::{Mutex, MutexGuard};

use indicatif::{ProgressBar, ProgressStyle};
use tldscout_core::ProgressCallback;

static ACTIVE_BAR: Mutex<Option<ProgressBar>> = Mutex::new(None);

fn active_bar() -> MutexGuard<'static, Option<ProgressBar>> {
    ACTIVE_BAR.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Progress bar for one enrichment run. Unregisters itself on drop.
pub struct BatchProgress {
    bar: ProgressBar,
}

impl BatchProgress {
    pub fn start(total: usize) -> Self {
        let bar = ProgressBar::new(total as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            bar.set_style(style.progress_chars("█▓░"));
        }
        *active_bar() = Some(bar.clone());
        Self { bar }
    }

    /// Callback that advances this bar as domains complete.
    pub fn callback(&self) -> ProgressCallback {
        let bar = self.bar.clone();
        Box::new(move |processed, total, domain| {
            bar.set_length(total as u64);
            bar.set_position(processed as u64);
            bar.set_message(domain.to_string());
        })
    }

    pub fn finish(self) {
        self.bar.finish_and_clear();
    }
}

impl Drop for BatchProgress {
    fn drop(&mut self) {
        *active_bar() = None;
    }
}

fn emit(line: &str) -> std::io::Result<()> {
    match active_bar().as_ref() {
        Some(bar) => {
            bar.println(line);
            Ok(())
        }
        None => {
            let mut stderr = std::io::stderr();
            stderr.write_all(line.as_bytes())?;
            stderr.write_all(b"\n")
        }
    }
}

/// Line-buffered writer for tracing output.
#[derive(Default)]
pub struct ProgressWriter {
    buffer: Vec<u8>,
}

impl Write for ProgressWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.extend_from_slice(buf);

        while let Some(newline_pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline_pos).collect();
            emit(String::from_utf8_lossy(&line).trim_end_matches('\n'))?;
        }

        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        if !self.buffer.is_empty() {
            let rest = String::from_utf8_lossy(&self.buffer).trim_end().to_string();
            self.buffer.clear();
            if !rest.is_empty() {
                emit(&rest)?;
            }
        }
        Ok(())
    }
}

impl Drop for ProgressWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

#[derive(Default)]
pub struct ProgressWriterFactory;

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for ProgressWriterFactory {
    type Writer = ProgressWriter;

    fn make_writer(&'a self) -> Self::Writer {
        ProgressWriter::default()
    }
}
