use std::collections::VecDeque;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use tracing_subscriber::fmt::MakeWriter;

const MAX_LINES: usize = 512;

/// A bounded in-memory tail of formatted log lines, so the driver's "view
/// logs" menu option (`original_source`'s `display_logs`, which tailed
/// `logs/node.log`) has something to read without reopening a log file —
/// the subscriber installed in [`crate::logging::init`] both prints to
/// stdout and feeds this buffer.
#[derive(Clone, Default)]
pub struct LogTail(Arc<Mutex<VecDeque<String>>>);

impl LogTail {
    pub fn last(&self, n: usize) -> Vec<String> {
        let buf = self.0.lock().expect("log buffer poisoned");
        buf.iter().rev().take(n).rev().cloned().collect()
    }

    fn push(&self, line: String) {
        let mut buf = self.0.lock().expect("log buffer poisoned");
        buf.push_back(line);
        while buf.len() > MAX_LINES {
            buf.pop_front();
        }
    }
}

struct TailWriter(LogTail);

impl Write for TailWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let text = String::from_utf8_lossy(buf);
        for line in text.lines() {
            self.0.push(line.to_string());
        }
        io::stdout().write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stdout().flush()
    }
}

impl<'a> MakeWriter<'a> for LogTail {
    type Writer = TailWriter;

    fn make_writer(&'a self) -> Self::Writer {
        TailWriter(self.clone())
    }
}

/// Installs the process-wide `tracing` subscriber (spec SPEC_FULL §10.2),
/// returning the [`LogTail`] handle the menu's "view logs" option reads
/// from.
pub fn init() -> LogTail {
    let tail = LogTail::default();
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(tail.clone())
        .init();
    tail
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tail_keeps_only_the_most_recent_lines() {
        let tail = LogTail::default();
        for i in 0..(MAX_LINES + 10) {
            tail.push(format!("line {i}"));
        }
        let last5 = tail.last(5);
        assert_eq!(last5.len(), 5);
        assert_eq!(last5[4], format!("line {}", MAX_LINES + 9));
    }
}
