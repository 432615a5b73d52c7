//! Text cleanup applied to raw model output before it is executed.
//!
//! The rules are cosmetic. They raise the odds that the model's answer is a
//! runnable statement; they are not a safety filter.

use std::sync::LazyLock;

use regex::Regex;

static SPACED_NEGATIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(-)\s*(\d+)").expect("static regex"));

static BRACKETED_IDENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\s*([A-Za-z0-9_]+)\s*\]").expect("static regex"));

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("static regex"));

/// Normalize generated text into a single-line statement.
///
/// Repeats the cleanup pass until nothing changes, so
/// `clean(clean(x)) == clean(x)` for every input. A pass never lengthens its
/// input, so the loop terminates.
pub fn clean(raw: &str) -> String {
    let mut current = clean_once(raw);
    loop {
        let next = clean_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn clean_once(raw: &str) -> String {
    // Rule order matters; later rules assume the earlier ones ran.
    let text = raw.replace("  ", " ");
    let text = text.trim();

    // Case-sensitive: strips the tag left by a ```sql fence, and also any
    // "sql" inside an identifier such as `sql_flag`.
    let text = text.replace("sql", "");
    let text = text.trim();

    let text = SPACED_NEGATIVE.replace_all(text, "$1$2");
    let text = BRACKETED_IDENT.replace_all(&text, "$1");
    let text = text.replace('`', "");

    WHITESPACE_RUN.replace_all(&text, " ").trim().to_owned()
}
