use std::collections::VecDeque;

/// Escape that stands for a newline in single-line script text.
pub const EOL_ESCAPE: &str = ":eol:";

const COMMENT_PREFIXES: [&str; 2] = ["//", "rem"];

/// Turn raw script text into the instruction queue of a pipe.
///
/// Lines are trimmed; blank lines and lines starting with `//` or `rem`
/// are dropped.
pub fn instructions(text: &str) -> VecDeque<String> {
    text.replace(EOL_ESCAPE, "\n")
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !COMMENT_PREFIXES.iter().any(|p| line.starts_with(p)))
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_blank_and_comment_lines() {
        let queue = instructions("// header\n\n  copy a b  \nrem note\n   \n:end");
        assert_eq!(queue, vec!["copy a b", ":end"]);
    }

    #[test]
    fn eol_escape_splits_lines() {
        let queue = instructions("mkdir out:eol:copy a out:eol:// skipped");
        assert_eq!(queue, vec!["mkdir out", "copy a out"]);
    }

    #[test]
    fn comment_only_script_is_empty() {
        assert!(instructions("// one\nrem two\n\n").is_empty());
        assert!(instructions("").is_empty());
    }

    #[test]
    fn handles_crlf() {
        let queue = instructions("echo a\r\necho b\r\n");
        assert_eq!(queue, vec!["echo a", "echo b"]);
    }
}
