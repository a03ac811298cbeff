//! Line patterns locating qualified names inside text lines.
//!
//! An expression mixes literal regular-expression text with placeholders:
//!
//! | code | captures |
//! | --- | --- |
//! | `%c` | class name, dotted |
//! | `%C` | class name, slashed |
//! | `%s` | source file |
//! | `%l` | line number |
//! | `%t` | type |
//! | `%f` | field name |
//! | `%m` | method name |
//! | `%a` | comma separated argument types |
//!
//! The whole line must match. Formatting re-renders the matched line with the
//! captured spans replaced by a frame's values and everything else kept as is.

use anyhow::{Context, Result};
use regex::Regex;

pub const CLASS_EXPRESSION: &str = "%c";
pub const METHOD_EXPRESSION: &str = r"%t %c\.%m\(%a\)";

const REGEX_CLASS: &str = r#"(?:[^\s":./()]+\.)*[^\s":./()]+"#;
const REGEX_CLASS_SLASH: &str = r#"(?:[^\s":./()]+/)*[^\s":./()]+"#;
const REGEX_SOURCE_FILE: &str = r"[^:()]*";
const REGEX_LINE_NUMBER: &str = r"-?\b\d+\b";
const REGEX_MEMBER: &str = r#"<?[^\s":./()]+>?"#;

/// One qualified name unit: what a pattern extracts from a line, and what the
/// mapping resolver turns into original names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    pub class_name: Option<String>,
    pub source_file: Option<String>,
    /// `0` when the line carries no line number.
    pub line_number: usize,
    pub ty: Option<String>,
    pub field_name: Option<String>,
    pub method_name: Option<String>,
    pub arguments: Option<String>,
}

impl Frame {
    pub fn class(class_name: impl Into<String>) -> Self {
        Self {
            class_name: Some(class_name.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct FramePattern {
    regex: Regex,
    codes: Vec<char>,
}

impl FramePattern {
    pub fn new(expression: &str) -> Result<Self> {
        let mut source = String::from("^");
        let mut codes = Vec::new();

        let mut chars = expression.chars().peekable();
        while let Some(c) = chars.next() {
            let group = match (c, chars.peek().copied()) {
                ('%', Some(code)) => code_regex(code).map(|re| (code, re)),
                _ => None,
            };
            match group {
                Some((code, re)) => {
                    chars.next();
                    codes.push(code);
                    source.push('(');
                    source.push_str(&re);
                    source.push(')');
                }
                None => source.push(c),
            }
        }
        source.push('$');

        let regex = Regex::new(&source)
            .with_context(|| format!("Invalid line pattern expression: {expression}"))?;
        Ok(Self { regex, codes })
    }

    pub fn parse(&self, line: &str) -> Option<Frame> {
        let captures = self.regex.captures(line)?;
        let mut frame = Frame::default();

        for (i, code) in self.codes.iter().enumerate() {
            let Some(m) = captures.get(i + 1) else {
                continue;
            };
            let text = m.as_str().to_string();
            match code {
                'c' => frame.class_name = Some(text),
                'C' => frame.class_name = Some(text.replace('/', ".")),
                's' => frame.source_file = Some(text),
                'l' => frame.line_number = text.parse::<usize>().unwrap_or(0),
                't' => frame.ty = Some(text),
                'f' => frame.field_name = Some(text),
                'm' => frame.method_name = Some(text),
                'a' => frame.arguments = Some(text),
                _ => {}
            }
        }

        Some(frame)
    }

    /// Re-renders `line` with the captured spans replaced by `frame`'s values.
    /// Spans the frame has no value for keep their original text.
    pub fn format(&self, line: &str, frame: &Frame) -> Option<String> {
        let captures = self.regex.captures(line)?;
        let mut out = String::with_capacity(line.len());
        let mut last = 0;

        for (i, code) in self.codes.iter().enumerate() {
            let Some(m) = captures.get(i + 1) else {
                continue;
            };
            out.push_str(&line[last..m.start()]);
            match frame_value(*code, frame) {
                Some(value) => out.push_str(&value),
                None => out.push_str(m.as_str()),
            }
            last = m.end();
        }
        out.push_str(&line[last..]);

        Some(out)
    }
}

fn code_regex(code: char) -> Option<String> {
    let re = match code {
        'c' => REGEX_CLASS.to_string(),
        'C' => REGEX_CLASS_SLASH.to_string(),
        's' => REGEX_SOURCE_FILE.to_string(),
        'l' => REGEX_LINE_NUMBER.to_string(),
        't' => type_regex(),
        'f' | 'm' => REGEX_MEMBER.to_string(),
        'a' => {
            let ty = type_regex();
            format!(r"(?:{ty}(?:\s*,\s*{ty})*)?")
        }
        _ => return None,
    };
    Some(re)
}

fn type_regex() -> String {
    format!(r"{REGEX_CLASS}(?:\[\])*")
}

fn frame_value(code: char, frame: &Frame) -> Option<String> {
    match code {
        'c' => frame.class_name.clone(),
        'C' => frame.class_name.as_ref().map(|c| c.replace('.', "/")),
        's' => frame.source_file.clone(),
        'l' => (frame.line_number > 0).then(|| frame.line_number.to_string()),
        't' => frame.ty.clone(),
        'f' => frame.field_name.clone(),
        'm' => frame.method_name.clone(),
        'a' => frame.arguments.as_deref().map(render_arguments),
        _ => None,
    }
}

/// Canonical `, ` separated argument list.
pub fn render_arguments(arguments: &str) -> String {
    arguments
        .split(',')
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}
