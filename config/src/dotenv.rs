//! Project `.env` file as a key/value map. Nothing is written to the process environment.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::LoadError;

/// `.env` in `dir`, if it exists.
pub fn dotenv_file(dir: &Path) -> Option<PathBuf> {
    let path = dir.join(".env");
    path.is_file().then_some(path)
}

/// Unquotes one value.
///
/// Double quotes support `\"`, `\\` and `\n`; single quotes are literal. Unquoted values
/// end at ` #` (inline comment).
fn parse_value(raw: &str) -> String {
    let raw = raw.trim();
    if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
        let inner = &raw[1..raw.len() - 1];
        let mut out = String::with_capacity(inner.len());
        let mut chars = inner.chars();
        while let Some(c) = chars.next() {
            if c != '\\' {
                out.push(c);
                continue;
            }
            match chars.next() {
                Some('n') => out.push('\n'),
                Some(other) => out.push(other),
                None => out.push('\\'),
            }
        }
        return out;
    }
    if raw.len() >= 2 && raw.starts_with('\'') && raw.ends_with('\'') {
        return raw[1..raw.len() - 1].to_string();
    }
    match raw.find(" #") {
        Some(i) => raw[..i].trim_end().to_string(),
        None => raw.to_string(),
    }
}

/// Parses `KEY=VALUE` lines. Blank lines, `#` comments, lines without `=` and empty keys
/// are skipped; a leading `export ` is ignored. Later lines win.
pub fn parse_dotenv(content: &str) -> HashMap<String, String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let line = line.strip_prefix("export ").unwrap_or(line);
            let (k, v) = line.split_once('=')?;
            let key = k.trim();
            (!key.is_empty()).then(|| (key.to_string(), parse_value(v)))
        })
        .collect()
}

/// Reads `<dir>/.env`. A missing file yields an empty map.
pub fn load_env_map(dir: &Path) -> Result<HashMap<String, String>, LoadError> {
    let Some(path) = dotenv_file(dir) else {
        return Ok(HashMap::new());
    };
    let content = std::fs::read_to_string(&path).map_err(|source| LoadError::Read {
        path: path.clone(),
        source,
    })?;
    Ok(parse_dotenv(&content))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get<'a>(m: &'a HashMap<String, String>, k: &str) -> Option<&'a str> {
        m.get(k).map(String::as_str)
    }

    #[test]
    fn parse_simple() {
        let m = parse_dotenv("RECAP_ENABLED=true\nRECAP_BLOCK_SIZE_CHARS=500\n");
        assert_eq!(get(&m, "RECAP_ENABLED"), Some("true"));
        assert_eq!(get(&m, "RECAP_BLOCK_SIZE_CHARS"), Some("500"));
    }

    #[test]
    fn skips_comments_blank_and_malformed_lines() {
        let m = parse_dotenv("\n# comment\nNOT_A_PAIR\n=orphan\nKEY=val\n  \n");
        assert_eq!(m.len(), 1);
        assert_eq!(get(&m, "KEY"), Some("val"));
    }

    #[test]
    fn export_prefix_is_ignored() {
        let m = parse_dotenv("export RECAP_API_URL=http://localhost:5000\n");
        assert_eq!(get(&m, "RECAP_API_URL"), Some("http://localhost:5000"));
    }

    #[test]
    fn double_quotes_unescape() {
        let m = parse_dotenv(r#"T="say \"hi\"\nbye""#);
        assert_eq!(get(&m, "T"), Some("say \"hi\"\nbye"));
    }

    #[test]
    fn single_quotes_are_literal() {
        let m = parse_dotenv(r"T='a \n b # c'");
        assert_eq!(get(&m, "T"), Some(r"a \n b # c"));
    }

    #[test]
    fn inline_comment_after_unquoted_value() {
        let m = parse_dotenv("A=1 # one\nB=x#y\n");
        assert_eq!(get(&m, "A"), Some("1"));
        assert_eq!(get(&m, "B"), Some("x#y"));
    }

    #[test]
    fn empty_values() {
        let m = parse_dotenv("A=\nB=\"\"\n");
        assert_eq!(get(&m, "A"), Some(""));
        assert_eq!(get(&m, "B"), Some(""));
    }

    #[test]
    fn later_line_wins() {
        let m = parse_dotenv("A=1\nA=2\n");
        assert_eq!(get(&m, "A"), Some("2"));
    }

    #[test]
    fn load_missing_and_present_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_env_map(dir.path()).unwrap().is_empty());
        std::fs::write(dir.path().join(".env"), "A=1\n").unwrap();
        assert_eq!(get(&load_env_map(dir.path()).unwrap(), "A"), Some("1"));
    }
}
