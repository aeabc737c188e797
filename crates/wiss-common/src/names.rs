/// Person-name normalization for DBpedia author lookups.
use std::sync::LazyLock;

use regex::Regex;

static PARENTHESIZED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([\p{L}\p{N}]+\)").expect("valid regex"));
static BRACKETED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[\p{L}\p{N}]+\]").expect("valid regex"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Turn a catalogue display name into the "First Last" form DBpedia uses for `foaf:name`.
///
/// `(word)` and `[word]` disambiguators are removed in a single pass per pattern, so nested
/// tokens such as `((x))` leave their outer brackets behind. A comma marks "Last, First";
/// only the first comma splits, anything after it stays in the first-name part.
pub fn normalize(name: &str) -> String {
    let stripped = PARENTHESIZED.replace_all(name, "");
    let stripped = BRACKETED.replace_all(&stripped, "");
    let collapsed = WHITESPACE.replace_all(stripped.trim(), " ");

    match collapsed.split_once(',') {
        Some((last, first)) => {
            let (last, first) = (last.trim(), first.trim());
            if first.is_empty() {
                last.to_string()
            } else if last.is_empty() {
                first.to_string()
            } else {
                format!("{first} {last}")
            }
        }
        None => collapsed.into_owned(),
    }
}
