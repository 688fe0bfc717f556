// cleans up whatever the model sent back into a single line of sql
// models love wrapping sql in markdown fences and splitting it over lines

const FENCE: &str = "```";

// language tags that can follow an opening fence, longest first so
// "sqlite" wins over "sql"
const DIALECT_TAGS: [&str; 8] = [
    "postgresql",
    "postgres",
    "sqlite",
    "plsql",
    "mysql",
    "psql",
    "tsql",
    "sql",
];

/// Turns a raw generation into a single-line statement.
///
/// Strips code fences (optionally tagged with an sql dialect), collapses
/// newlines into spaces and trims. The pass is repeated until nothing
/// changes, so `normalize(normalize(s)) == normalize(s)` for any input.
pub fn normalize(raw: &str) -> String {
    let mut current = raw.trim().to_string();

    loop {
        let next = pass(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn pass(s: &str) -> String {
    let s = strip_tagged_fence(s.trim()).trim();
    let s = s.strip_prefix(FENCE).unwrap_or(s).trim();
    let s = s.strip_suffix(FENCE).unwrap_or(s).trim();

    collapse_newlines(s).trim().to_string()
}

// only a fence sitting at the very start, with the tag glued right onto it
fn strip_tagged_fence(s: &str) -> &str {
    let Some(rest) = s.strip_prefix(FENCE) else {
        return s;
    };

    for tag in DIALECT_TAGS {
        if let Some(head) = rest.get(..tag.len())
            && head.eq_ignore_ascii_case(tag)
        {
            return &rest[tag.len()..];
        }
    }

    s
}

fn collapse_newlines(s: &str) -> String {
    s.replace("\r\n", " ").replace(['\n', '\r'], " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_is_case_insensitive() {
        assert_eq!(strip_tagged_fence("```SQL\nSELECT 1"), "\nSELECT 1");
        assert_eq!(strip_tagged_fence("```SqLite SELECT 1"), " SELECT 1");
    }

    #[test]
    fn tag_must_follow_fence_directly() {
        assert_eq!(strip_tagged_fence("``` sql"), "``` sql");
        assert_eq!(strip_tagged_fence("select ```sql"), "select ```sql");
    }

    #[test]
    fn untagged_fence_is_left_for_the_bare_step() {
        assert_eq!(strip_tagged_fence("```\nSELECT 1"), "```\nSELECT 1");
    }

    #[test]
    fn crlf_becomes_one_space() {
        assert_eq!(collapse_newlines("a\r\nb\nc\rd"), "a b c d");
    }

    #[test]
    fn multibyte_after_fence_does_not_panic() {
        assert_eq!(normalize("```é"), "é");
    }
}
