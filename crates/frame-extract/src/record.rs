use once_cell::sync::Lazy;
use regex::Regex;

const DEFAULT_TAG: &str = "AutoOnline:";
const DEFAULT_MARKER: &str = "ws send base64=";

static DEFAULT_PATTERN: Lazy<TracePattern> = Lazy::new(|| {
    TracePattern::with_tag(DEFAULT_TAG, DEFAULT_MARKER).expect("default trace pattern compiles")
});

/// Grouping key for fragments: logcat stamps every piece of a split message
/// with the same time, pid and tid. The date is not part of the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordKey {
    pub time: String,
    pub pid: String,
    pub tid: String,
}

/// One matching logcat line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceRecord<'a> {
    pub date: &'a str,
    pub time: &'a str,
    pub pid: &'a str,
    pub tid: &'a str,
    pub severity: char,
    pub chunk: &'a str,
}

impl TraceRecord<'_> {
    pub fn key(&self) -> RecordKey {
        RecordKey {
            time: self.time.to_string(),
            pid: self.pid.to_string(),
            tid: self.tid.to_string(),
        }
    }
}

/// Compiled matcher for `MM-DD HH:MM:SS.mmm PID TID L TAG MARKER<chunk>`.
#[derive(Debug, Clone)]
pub struct TracePattern {
    regex: Regex,
}

impl TracePattern {
    /// Pattern for a different logcat tag or payload marker. Both are matched
    /// literally.
    pub fn with_tag(tag: &str, marker: &str) -> Result<Self, regex::Error> {
        let source = format!(
            r"^(?P<date>\d{{2}}-\d{{2}})\s+(?P<time>\d{{2}}:\d{{2}}:\d{{2}}\.\d{{3}})\s+(?P<pid>\d+)\s+(?P<tid>\d+)\s+(?P<level>[VDIWEF])\s+{}\s+{}(?P<data>\S+)",
            regex::escape(tag),
            regex::escape(marker),
        );
        Ok(Self {
            regex: Regex::new(&source)?,
        })
    }

    pub fn parse<'a>(&self, line: &'a str) -> Option<TraceRecord<'a>> {
        let caps = self.regex.captures(line)?;
        Some(TraceRecord {
            date: caps.name("date")?.as_str(),
            time: caps.name("time")?.as_str(),
            pid: caps.name("pid")?.as_str(),
            tid: caps.name("tid")?.as_str(),
            severity: caps.name("level")?.as_str().chars().next()?,
            chunk: caps.name("data")?.as_str(),
        })
    }
}

impl Default for TracePattern {
    fn default() -> Self {
        DEFAULT_PATTERN.clone()
    }
}
