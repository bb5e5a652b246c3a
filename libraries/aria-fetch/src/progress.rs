use regex::Regex;

/// Parses one line of external-tool output into a completion percentage.
///
/// Output formats drift across tool versions, so the parser is a narrow seam
/// swappable per tool.
pub trait ProgressParser: Send + Sync {
    /// Returns the percentage carried by this line, if any
    fn parse_line(&self, line: &str) -> Option<f32>;
}

/// Parser for `yt-dlp` `[download]  42.7% of ...` progress lines
pub struct YtDlpProgressParser {
    pattern: Regex,
}

impl YtDlpProgressParser {
    pub fn new() -> Self {
        Self {
            pattern: Regex::new(r"(\d{1,3}(?:\.\d+)?)%").expect("static pattern compiles"),
        }
    }
}

impl Default for YtDlpProgressParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressParser for YtDlpProgressParser {
    fn parse_line(&self, line: &str) -> Option<f32> {
        let captures = self.pattern.captures(line)?;
        let percent: f32 = captures.get(1)?.as_str().parse().ok()?;
        Some(percent.clamp(0.0, 100.0))
    }
}
