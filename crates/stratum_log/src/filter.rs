//! Level filtering for raw sink output.

use std::io::{self, Write};

use crate::logger::Level;
use crate::record::LogRecord;

/// Writer that drops labeled lines ranked below a minimum level.
///
/// Lines without a recognized label are always passed through, and the
/// filtered writer still reports the whole buffer as consumed.
#[derive(Debug)]
pub struct LevelFilter<W> {
    min_level: Level,
    writer: W,
}

impl<W: Write> LevelFilter<W> {
    pub fn new(min_level: Level, writer: W) -> Self {
        Self { min_level, writer }
    }

    pub fn min_level(&self) -> Level {
        self.min_level
    }

    /// Whether a write would reach the wrapped writer.
    pub fn allows(&self, buf: &[u8]) -> bool {
        match LogRecord::parse(&String::from_utf8_lossy(buf)).level() {
            Some(level) => level >= self.min_level,
            None => true,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Write for LevelFilter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.allows(buf) {
            self.writer.write_all(buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drops_lines_below_minimum() {
        let mut filter = LevelFilter::new(Level::Warn, Vec::new());

        filter.write_all(b"2024/01/02 03:04:05 [DEBUG] noise\n").unwrap();
        filter.write_all(b"2024/01/02 03:04:05 [ERROR] kept\n").unwrap();
        filter.write_all(b"no label here\n").unwrap();
        filter.write_all(b"2024/01/02 03:04:05 [CUSTOM] kept too\n").unwrap();

        let out = String::from_utf8(filter.into_inner()).unwrap();
        assert!(!out.contains("noise"));
        assert!(out.contains("kept\n"));
        assert!(out.contains("no label here"));
        assert!(out.contains("[CUSTOM] kept too"));
    }
}
