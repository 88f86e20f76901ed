//! Stack-trace parser.
//!
//! Two frame grammars are tried in order:
//!
//! 1. Traceback style: `File "<path>", line <n>, in <function>`, one frame per
//!    line, optionally followed by a source line.
//! 2. JVM style: `at <qualified.method>(<File.ext>:<n>)`, anywhere in the text.
//!
//! Each frame is then classified as framework or business code by matching its
//! file path against known library/framework path signatures.

use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};
use tracing::debug;

use crate::domain::{ParsedStackTrace, StackFrame};

static TRACEBACK_FRAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"File "([^"]+)", line (\d+), in ([\w<>.]+)"#).expect("valid traceback frame regex")
});

static TRACEBACK_EXCEPTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^(\w+(?:\.\w+)*(?:Error|Exception|Warning)?): (.+)$")
        .expect("valid traceback exception regex")
});

static JVM_FRAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"at ([\w.$]+)\(([\w$-]+\.\w+):(\d+)\)").expect("valid jvm frame regex")
});

static JVM_EXCEPTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^([\w.]+(?:Exception|Error)): (.+)$").expect("valid jvm exception regex")
});

/// File-path signatures of third-party, standard-library and framework code.
pub const FRAMEWORK_PATTERNS: &[&str] = &[
    r"site-packages",
    r"dist-packages",
    r"lib/python",
    r"node_modules",
    r"java\.lang\.",
    r"java\.util\.",
    r"org\.springframework\.",
    r"com\.sun\.",
    r"sun\.",
    r"fastapi",
    r"starlette",
    r"uvicorn",
    r"asyncio",
    r"concurrent",
];

static DEFAULT_FRAMEWORK_REGEXES: LazyLock<Vec<Regex>> =
    LazyLock::new(|| compile_patterns(FRAMEWORK_PATTERNS.iter().copied()));

fn compile_patterns<'a>(patterns: impl Iterator<Item = &'a str>) -> Vec<Regex> {
    patterns
        .filter_map(|p| match RegexBuilder::new(p).case_insensitive(true).build() {
            Ok(re) => Some(re),
            Err(e) => {
                tracing::warn!(pattern = p, error = %e, "skipping invalid framework pattern");
                None
            }
        })
        .collect()
}

const UNKNOWN_MESSAGE: &str = "Unable to parse exception";

/// Parses raw stack-trace text into exception and classified frames.
#[derive(Debug, Clone)]
pub struct StackParser {
    extra_framework: Vec<Regex>,
}

impl Default for StackParser {
    fn default() -> Self {
        Self::new()
    }
}

impl StackParser {
    pub fn new() -> Self {
        Self {
            extra_framework: Vec::new(),
        }
    }

    /// Add framework-path patterns on top of [`FRAMEWORK_PATTERNS`].
    ///
    /// Invalid patterns are skipped with a warning; validate config upfront to reject them.
    pub fn with_extra_patterns<S: AsRef<str>>(mut self, patterns: &[S]) -> Self {
        self.extra_framework
            .extend(compile_patterns(patterns.iter().map(|p| -> &str { p.as_ref() })));
        self
    }

    /// Parse `stack_text`. Never fails: unrecognised input yields placeholder values.
    pub fn parse(&self, stack_text: &str) -> ParsedStackTrace {
        if stack_text.is_empty() {
            return ParsedStackTrace::new("Unknown", "No stack trace provided", Vec::new());
        }

        let mut frames = parse_traceback_frames(stack_text);
        let (mut exception_type, mut exception_message) = match_exception(
            &TRACEBACK_EXCEPTION,
            stack_text,
            "UnknownError",
        );

        if frames.is_empty() {
            frames = parse_jvm_frames(stack_text);
            if !frames.is_empty() {
                (exception_type, exception_message) =
                    match_exception(&JVM_EXCEPTION, stack_text, "UnknownException");
            }
        }

        for frame in &mut frames {
            frame.is_framework = self.is_framework_code(&frame.file);
        }

        debug!(
            frames = frames.len(),
            exception_type = %exception_type,
            "parsed stack trace"
        );
        ParsedStackTrace::new(exception_type, exception_message, frames)
    }

    /// Business-only frames of `parsed`, in call order.
    pub fn get_business_frames(&self, parsed: &ParsedStackTrace) -> Vec<StackFrame> {
        parsed.business_frames()
    }

    /// True when `file_path` matches any framework signature (case-insensitive).
    pub fn is_framework_code(&self, file_path: &str) -> bool {
        DEFAULT_FRAMEWORK_REGEXES
            .iter()
            .chain(self.extra_framework.iter())
            .any(|re| re.is_match(file_path))
    }
}

fn parse_traceback_frames(text: &str) -> Vec<StackFrame> {
    let lines: Vec<&str> = text.lines().collect();
    let mut frames = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        let Some(caps) = TRACEBACK_FRAME.captures(line) else {
            continue;
        };
        let mut frame = StackFrame::new(&caps[1], parse_line_number(&caps[2]), &caps[3]);
        if let Some(next) = lines.get(i + 1) {
            let next = next.trim();
            if !next.is_empty() && !next.starts_with("File") {
                frame.code = Some(next.to_string());
            }
        }
        frames.push(frame);
    }

    frames
}

fn parse_jvm_frames(text: &str) -> Vec<StackFrame> {
    JVM_FRAME
        .captures_iter(text)
        .map(|caps| StackFrame::new(&caps[2], parse_line_number(&caps[3]), &caps[1]))
        .collect()
}

/// Digits-only capture; only overflow can fail, which saturates.
fn parse_line_number(digits: &str) -> u64 {
    digits.parse().unwrap_or(u64::MAX)
}

fn match_exception(re: &Regex, text: &str, unknown_type: &str) -> (String, String) {
    match re.captures(text) {
        Some(caps) => (
            caps[1].to_string(),
            caps[2].trim_end_matches('\r').to_string(),
        ),
        None => (unknown_type.to_string(), UNKNOWN_MESSAGE.to_string()),
    }
}
