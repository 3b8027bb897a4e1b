//! File name cleaning rules.
//!
//! [`clean_segment`] applies the built-in rule set to a single path segment.
//! [`ClearRule`] combines it with an optional user supplied regular
//! expression substitution.

use regex::Regex;

/// Replacement for characters that are not allowed in names.
const REPLACEMENT: char = '_';

/// Apply the built-in rules to one path segment.
///
/// Rules, in order:
/// 1. control characters, `* : < > | { }` become `_`
/// 2. private use code points (U+E000..U+F8FF) are dropped
/// 3. leading and trailing whitespace is trimmed
/// 4. curly double quotes, curly single quotes and backticks become `"`
/// 5. runs of spaces collapse into one
/// 6. `—` becomes `-`
/// 7. a leading `.` becomes `_`, otherwise a leading `~` becomes `-`
///
/// Rule 7 only fires for names longer than one character.
pub fn clean_segment(name: &str) -> String {
    let replaced: String = name
        .chars()
        .filter(|c| !is_private_use(*c))
        .map(|c| if is_forbidden(c) { REPLACEMENT } else { c })
        .collect();

    let trimmed = replaced
        .trim_start_matches(is_leading_space)
        .trim_end_matches(is_trailing_space);

    let mut result = String::with_capacity(trimmed.len());
    let mut previous_blank = false;
    for c in trimmed.chars() {
        let c = match c {
            '\u{201C}' | '\u{201D}' => '"',
            // Single quotes fold to a double quote as well.
            '\u{2018}' | '\u{2019}' | '`' => '"',
            '\u{2014}' => '-',
            c => c,
        };
        if c == ' ' {
            if previous_blank {
                continue;
            }
            previous_blank = true;
        } else {
            previous_blank = false;
        }
        result.push(c);
    }

    let mut chars = result.chars();
    match (chars.next(), chars.next()) {
        (Some('.'), Some(_)) => format!("{REPLACEMENT}{}", &result[1..]),
        (Some('~'), Some(_)) => format!("-{}", &result[1..]),
        _ => result,
    }
}

fn is_forbidden(c: char) -> bool {
    matches!(c, '\u{0}'..='\u{1F}' | '\u{7F}' | '*' | ':' | '<' | '>' | '|' | '{' | '}')
}

fn is_private_use(c: char) -> bool {
    ('\u{E000}'..='\u{F8FF}').contains(&c)
}

fn is_leading_space(c: char) -> bool {
    matches!(
        c,
        '\t' | '\n'..='\r'
            | ' '
            | '\u{85}'
            | '\u{A0}'
            | '\u{1680}'
            | '\u{2000}'..='\u{200F}'
            | '\u{2028}'
            | '\u{2029}'
            | '\u{202F}'
            | '\u{205F}'
            | '\u{3000}'
    )
}

// Wider than the leading set: U+2000..U+20A0 also covers dashes and curly
// quotes, which are therefore trimmed at the end of a name.
fn is_trailing_space(c: char) -> bool {
    matches!(
        c,
        '\t' | '\n'..='\r'
            | ' '
            | '\u{85}'
            | '\u{A0}'
            | '\u{1680}'
            | '\u{2000}'..='\u{20A0}'
            | '\u{3000}'
    )
}

/// A regular expression substitution applied to segment names.
#[derive(Debug, Clone)]
pub struct Replacement {
    pattern: Regex,
    replacement: String,
}

impl Replacement {
    pub fn new(pattern: Regex, replacement: impl Into<String>) -> Self {
        Self {
            pattern,
            replacement: replacement.into(),
        }
    }

    /// Substitute inside `name`.
    ///
    /// Without capture groups every match is replaced (`$n` references are
    /// expanded). With capture groups only the non-empty group spans are
    /// replaced by the literal replacement, rightmost first so earlier
    /// offsets stay valid. A span overlapping one already replaced is skipped.
    pub fn apply(&self, name: &str) -> String {
        if self.pattern.captures_len() <= 1 {
            return self
                .pattern
                .replace_all(name, self.replacement.as_str())
                .into_owned();
        }

        let mut spans: Vec<(usize, usize)> = self
            .pattern
            .captures_iter(name)
            .flat_map(|caps| {
                caps.iter()
                    .skip(1)
                    .flatten()
                    .filter(|m| !m.is_empty())
                    .map(|m| (m.start(), m.end()))
                    .collect::<Vec<_>>()
            })
            .collect();
        spans.sort_by(|a, b| b.0.cmp(&a.0).then(b.1.cmp(&a.1)));

        let mut result = name.to_string();
        let mut boundary = name.len();
        for (start, end) in spans {
            if end > boundary {
                continue;
            }
            result.replace_range(start..end, &self.replacement);
            boundary = start;
        }
        result
    }
}

/// How names are rewritten by [`PathTree::clear`](crate::PathTree::clear).
#[derive(Debug, Clone, Default)]
pub struct ClearRule {
    /// Apply [`clean_segment`] first.
    pub auto: bool,
    /// Substitution applied after the automatic rules.
    pub replace: Option<Replacement>,
}

impl ClearRule {
    /// Only the built-in rules.
    pub fn auto() -> Self {
        Self {
            auto: true,
            replace: None,
        }
    }

    /// Only a regular expression substitution.
    pub fn replace(pattern: Regex, replacement: impl Into<String>) -> Self {
        Self {
            auto: false,
            replace: Some(Replacement::new(pattern, replacement)),
        }
    }

    /// Also run the built-in rules before the substitution.
    pub fn with_auto(mut self, auto: bool) -> Self {
        self.auto = auto;
        self
    }

    /// The new name, or `None` if the rule leaves `name` untouched.
    pub fn apply(&self, name: &str) -> Option<String> {
        let mut current = if self.auto {
            clean_segment(name)
        } else {
            name.to_string()
        };
        if let Some(ref replace) = self.replace {
            current = replace.apply(&current);
        }
        (current != name).then_some(current)
    }
}
