//! Splitting of one instruction line into a command name and its arguments.
//!
//! Words are separated by whitespace; single or double quotes group text
//! (including whitespace) into one word and are removed. Backslashes are
//! ordinary characters so Windows paths survive untouched. An unterminated
//! quote runs to the end of the line instead of failing.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    Word,
    SingleQuote,
    DoubleQuote,
}

struct Extractor {
    state: State,
    current: String,
    /// Whether `current` holds a word even if empty (`""` is a word).
    in_word: bool,
    out: Vec<String>,
}

impl Extractor {
    fn new() -> Self {
        Extractor {
            state: State::Start,
            current: String::new(),
            in_word: false,
            out: Vec::new(),
        }
    }

    fn feed(&mut self, ch: char) {
        match self.state {
            State::Start | State::Word => match ch {
                '\'' => self.open(State::SingleQuote),
                '"' => self.open(State::DoubleQuote),
                c if c.is_whitespace() => self.finish_word(),
                c => {
                    self.current.push(c);
                    self.in_word = true;
                    self.state = State::Word;
                }
            },
            State::SingleQuote => self.quoted(ch, '\''),
            State::DoubleQuote => self.quoted(ch, '"'),
        }
    }

    fn open(&mut self, state: State) {
        self.in_word = true;
        self.state = state;
    }

    fn quoted(&mut self, ch: char, close: char) {
        if ch == close {
            self.state = State::Word;
        } else {
            self.current.push(ch);
        }
    }

    fn finish_word(&mut self) {
        if self.in_word {
            self.out.push(std::mem::take(&mut self.current));
            self.in_word = false;
        }
        self.state = State::Start;
    }

    fn finish(mut self) -> Vec<String> {
        self.finish_word();
        self.out
    }
}

/// Split `line` into tokens: element 0 is the command or directive name.
pub fn extract(line: &str) -> Vec<String> {
    let mut extractor = Extractor::new();
    for ch in line.chars() {
        extractor.feed(ch);
    }
    extractor.finish()
}

#[cfg(test)]
mod tests {
    use super::extract;

    #[test]
    fn extract_simple() {
        assert_eq!(extract("copy a.txt b.txt"), vec!["copy", "a.txt", "b.txt"]);
    }

    #[test]
    fn extract_collapses_whitespace() {
        assert_eq!(extract("  mkdir \t out  "), vec!["mkdir", "out"]);
    }

    #[test]
    fn extract_double_quoted() {
        assert_eq!(
            extract("copy \"my file.txt\" dest"),
            vec!["copy", "my file.txt", "dest"]
        );
    }

    #[test]
    fn extract_single_quoted_keeps_double_quotes() {
        assert_eq!(
            extract("echo 'say \"hi\"'"),
            vec!["echo", "say \"hi\""]
        );
    }

    #[test]
    fn extract_quotes_glue_to_word() {
        assert_eq!(extract("set a=\"b c\"d"), vec!["set", "a=b cd"]);
    }

    #[test]
    fn extract_empty_quotes_are_a_word() {
        assert_eq!(extract("set name \"\""), vec!["set", "name", ""]);
    }

    #[test]
    fn extract_unterminated_quote_runs_to_end() {
        assert_eq!(
            extract("echo \"unterminated text"),
            vec!["echo", "unterminated text"]
        );
    }

    #[test]
    fn extract_backslashes_are_literal() {
        assert_eq!(
            extract(r"copy C:\src\a.txt D:\dst"),
            vec!["copy", r"C:\src\a.txt", r"D:\dst"]
        );
    }

    #[test]
    fn extract_empty_line() {
        assert!(extract("   ").is_empty());
    }
}
