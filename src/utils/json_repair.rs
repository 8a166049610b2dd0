//! Best-effort recovery of a JSON object from free text emitted by a model.
//!
//! Repairs run as an ordered chain. Each stage rewrites the candidate left by
//! the previous one and the first candidate that parses as an object wins.

use serde_json::Value;

pub struct RepairStage {
    pub name: &'static str,
    pub apply: fn(&str) -> Option<String>,
}

pub const REPAIR_CHAIN: &[RepairStage] = &[
    RepairStage {
        name: "strict",
        apply: keep,
    },
    RepairStage {
        name: "outer_braces",
        apply: outer_braces,
    },
    RepairStage {
        name: "balance_braces",
        apply: balance_braces,
    },
    RepairStage {
        name: "strip_line_comments",
        apply: strip_comments_and_balance,
    },
];

/// Parses `text` through the repair chain, returning the object and the name
/// of the stage that produced it.
pub fn parse_with_repairs(text: &str) -> Option<(Value, &'static str)> {
    let mut candidate = text.to_string();
    for stage in REPAIR_CHAIN {
        let Some(next) = (stage.apply)(&candidate) else {
            return None;
        };
        if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(&next) {
            return Some((value, stage.name));
        }
        candidate = next;
    }
    None
}

fn keep(text: &str) -> Option<String> {
    Some(text.trim().to_string())
}

fn outer_braces(text: &str) -> Option<String> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(text[start..=end].to_string())
}

/// Drops closing braces that have no opener and appends the closers that are
/// missing. Braces inside string literals are ignored.
fn balance_braces(text: &str) -> Option<String> {
    let mut out = String::with_capacity(text.len() + 4);
    let mut depth: usize = 0;
    let mut in_string = false;
    let mut escaped = false;
    for ch in text.chars() {
        if in_string {
            out.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => {
                in_string = true;
                out.push(ch);
            }
            '{' => {
                depth += 1;
                out.push(ch);
            }
            '}' => {
                if depth > 0 {
                    depth -= 1;
                    out.push(ch);
                }
            }
            _ => out.push(ch),
        }
    }
    out.push_str(&"}".repeat(depth));
    Some(out)
}

/// Removes `//` comments that start outside string literals, through end of
/// line.
fn strip_line_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut in_string = false;
    let mut escaped = false;
    while let Some(ch) = chars.next() {
        if in_string {
            out.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        if ch == '/' && chars.peek() == Some(&'/') {
            for skipped in chars.by_ref() {
                if skipped == '\n' {
                    out.push('\n');
                    break;
                }
            }
            continue;
        }
        if ch == '"' {
            in_string = true;
        }
        out.push(ch);
    }
    out
}

fn strip_comments_and_balance(text: &str) -> Option<String> {
    balance_braces(&strip_line_comments(text))
}
