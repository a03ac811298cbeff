//! Replacing obfuscated names in formatted lines with their originals.

use std::collections::BTreeSet;

use crate::mapping::MappingResolver;
use crate::pattern::FramePattern;

/// Rewrites every line of `lines` that `pattern` recognises through
/// `resolver`. Lines the pattern does not match are kept unchanged.
///
/// When one line expands to several candidates and carries no line number,
/// each candidate after the first has the prefix it shares with its
/// predecessor blanked out (see [`trim_common_prefix`]).
///
/// Returns `false`, leaving `lines` untouched, when nothing was produced.
pub fn unmap(
    resolver: &dyn MappingResolver,
    pattern: &FramePattern,
    lines: &mut BTreeSet<String>,
) -> bool {
    let mut result = BTreeSet::new();

    for line in lines.iter() {
        let Some(obfuscated) = pattern.parse(line) else {
            result.insert(line.clone());
            continue;
        };

        let mut previous: Option<String> = None;
        for frame in resolver.transform(&obfuscated) {
            let Some(retraced) = pattern.format(line, &frame) else {
                continue;
            };

            let trimmed = match previous.as_deref() {
                Some(prev) if obfuscated.line_number == 0 => trim_common_prefix(&retraced, prev),
                _ => Some(retraced.clone()),
            };
            if let Some(trimmed) = trimmed {
                result.insert(trimmed);
            }

            previous = Some(retraced);
        }
    }

    if result.is_empty() {
        return false;
    }
    *lines = result;
    true
}

/// Blanks the leading characters `line` shares with `previous`, stopping at
/// the last non-identifier character so no identifier is cut in half. The
/// boundary character itself stays visible.
///
/// Returns `None` when `line` has nothing beyond the shared prefix.
pub fn trim_common_prefix(line: &str, previous: &str) -> Option<String> {
    let chars: Vec<char> = line.chars().collect();
    let common = chars
        .iter()
        .zip(previous.chars())
        .take_while(|(a, b)| **a == *b)
        .count();
    if common == chars.len() {
        return None;
    }

    let end = chars[..=common]
        .iter()
        .rposition(|c| !is_identifier_part(*c))
        .unwrap_or(0);

    Some(
        chars
            .iter()
            .enumerate()
            .map(|(i, c)| if i < end && !c.is_whitespace() { ' ' } else { *c })
            .collect(),
    )
}

fn is_identifier_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}
