use std::fmt::{self, Write};

use crate::utils::truncate_to;

/// Fixed-capacity text buffer supplied by the caller of a tool.
///
/// Each [`BoundedOutput::set_line`] replaces the contents with a single line.
/// Text past the capacity is dropped at a character boundary, so the buffer
/// never holds more than `capacity` bytes.
#[derive(Debug, Clone)]
pub struct BoundedOutput {
    buf: String,
    capacity: usize,
}

impl BoundedOutput {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: String::with_capacity(capacity),
            capacity,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }

    /// Replace the contents with the formatted line, truncating if needed.
    pub fn set_line(&mut self, args: fmt::Arguments<'_>) {
        self.buf.clear();
        // BoundedWriter never reports an error; overflow is silently cut
        let _ = BoundedWriter { out: self }.write_fmt(args);
    }
}

impl fmt::Display for BoundedOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.buf)
    }
}

struct BoundedWriter<'a> {
    out: &'a mut BoundedOutput,
}

impl Write for BoundedWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let room = self.out.capacity.saturating_sub(self.out.buf.len());
        let fitting = truncate_to(s, room);
        self.out.buf.push_str(fitting);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_fits() {
        let mut out = BoundedOutput::with_capacity(64);
        out.set_line(format_args!("OK: {} bytes", 2));
        assert_eq!(out.as_str(), "OK: 2 bytes");
    }

    #[test]
    fn test_line_truncated_at_capacity() {
        let mut out = BoundedOutput::with_capacity(8);
        out.set_line(format_args!("Error: {}", "invalid JSON input"));
        assert_eq!(out.as_str(), "Error: i");
        assert_eq!(out.as_str().len(), 8);
    }

    #[test]
    fn test_truncation_keeps_utf8_valid() {
        let mut out = BoundedOutput::with_capacity(5);
        out.set_line(format_args!("ab{}", "日本"));
        // "日" takes three bytes, "本" would overflow
        assert_eq!(out.as_str(), "ab日");
    }

    #[test]
    fn test_set_line_replaces_previous_contents() {
        let mut out = BoundedOutput::with_capacity(32);
        out.set_line(format_args!("first line"));
        out.set_line(format_args!("second"));
        assert_eq!(out.as_str(), "second");
    }

    #[test]
    fn test_zero_capacity_stays_empty() {
        let mut out = BoundedOutput::with_capacity(0);
        out.set_line(format_args!("anything"));
        assert!(out.as_str().is_empty());
    }
}
