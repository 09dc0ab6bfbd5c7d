//! `@import` directive parsing

const IMPORT: &str = "@import";

/// Extract the request strings of every `@import "<request>"` line, in order.
///
/// Single or double quotes are accepted. Lines that are not import directives
/// are module body and ignored here.
pub fn parse_imports(source: &str) -> Vec<String> {
    source
        .lines()
        .filter_map(|line| {
            let rest = line.trim().strip_prefix(IMPORT)?;
            if !rest.starts_with(char::is_whitespace) {
                return None;
            }
            unquote(rest.trim())
        })
        .collect()
}

fn unquote(s: &str) -> Option<String> {
    let quote = s.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let inner = &s[1..];
    let end = inner.find(quote)?;
    let request = &inner[..end];
    (!request.is_empty()).then(|| request.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_imports() {
        let source = r#"
@import "./b.mod"
  @import './c.mod'
value = 1
@import "util"
"#;
        assert_eq!(parse_imports(source), vec!["./b.mod", "./c.mod", "util"]);
    }

    #[test]
    fn test_malformed_directives_are_ignored() {
        let source = "@importx \"./b.mod\"\n@import ./c.mod\n@import \"\"\n@import \"./d.mod";
        assert!(parse_imports(source).is_empty());
    }
}
