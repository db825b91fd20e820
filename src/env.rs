use regex::{Captures, Regex};
use std::collections::HashMap;
use std::env as stdenv;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static VARIABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$([A-Za-z_][A-Za-z0-9_]*)").expect("variable pattern is valid"));

/// A value bound to a pipe variable.
///
/// Scripts only ever see the textual form (see the `Display` impl); the typed
/// form is kept so expressions can compare numbers as numbers.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Empty,
}

impl Value {
    /// Truthiness used by `:if`.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Str(s) => !s.is_empty(),
            Value::Int(n) => *n != 0,
            Value::Float(f) => *f != 0.0 && !f.is_nan(),
            Value::Bool(b) => *b,
            Value::Empty => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => f.write_str(s),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Empty => Ok(()),
        }
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Int(i64::try_from(n).unwrap_or(i64::MAX))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&Path> for Value {
    fn from(p: &Path) -> Self {
        Value::Str(p.to_string_lossy().into_owned())
    }
}

/// Variable table keyed by name without the `$` sigil.
pub type Variables = HashMap<String, Value>;

/// State owned by one pipe: its variables and its working directory.
///
/// Each pipe exclusively owns its environment. Child pipes get a
/// [`fork`](Environment::fork), never a shared reference, so nothing a child
/// binds is visible to its parent or siblings.
#[derive(Debug, Clone)]
pub struct Environment {
    /// Variable bindings, substituted into instructions as `$name`.
    pub vars: Variables,
    /// Directory that relative paths and `:each` listings resolve against.
    pub current_dir: PathBuf,
    /// Extra diagnostics from directives.
    pub verbose: bool,
}

impl Environment {
    /// Environment rooted at `current_dir` with no variables bound.
    pub fn new(current_dir: impl Into<PathBuf>) -> Self {
        Self {
            vars: HashMap::new(),
            current_dir: current_dir.into(),
            verbose: false,
        }
    }

    /// Environment rooted at the process working directory.
    pub fn from_process() -> Self {
        Self::new(stdenv::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    }

    pub fn get_var(&self, name: &str) -> Option<&Value> {
        self.vars.get(strip_sigil(name))
    }

    /// Set or override a binding. `"$eval"` and `"eval"` name the same variable.
    pub fn set_var(&mut self, name: impl AsRef<str>, value: impl Into<Value>) {
        self.vars
            .insert(strip_sigil(name.as_ref()).to_string(), value.into());
    }

    pub fn set_vars<K, V>(&mut self, bindings: impl IntoIterator<Item = (K, V)>)
    where
        K: AsRef<str>,
        V: Into<Value>,
    {
        for (name, value) in bindings {
            self.set_var(name, value);
        }
    }

    /// Replace every `$name` in `text` with the bound value.
    ///
    /// Unbound names are left as written. Substituted text is not scanned
    /// again, so a value containing `$` never expands further.
    pub fn apply_variables(&self, text: &str) -> String {
        VARIABLE
            .replace_all(text, |caps: &Captures| match self.vars.get(&caps[1]) {
                Some(value) => value.to_string(),
                None => caps[0].to_string(),
            })
            .into_owned()
    }

    /// Independent copy of this environment, optionally moved to `current_dir`.
    pub fn fork(&self, current_dir: Option<PathBuf>) -> Environment {
        let mut child = self.clone();
        if let Some(dir) = current_dir {
            child.current_dir = dir;
        }
        child
    }

    /// Resolve `path` against the working directory unless it is absolute.
    pub fn resolve_path(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.current_dir.join(path)
        }
    }
}

fn strip_sigil(name: &str) -> &str {
    name.strip_prefix('$').unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env() -> Environment {
        Environment::new("/work")
    }

    #[test]
    fn test_set_and_get_var_with_or_without_sigil() {
        let mut env = env();
        assert_eq!(env.get_var("eval"), None);

        env.set_var("$eval", 2i64);

        assert_eq!(env.get_var("eval"), Some(&Value::Int(2)));
        assert_eq!(env.get_var("$eval"), Some(&Value::Int(2)));
    }

    #[test]
    fn test_apply_variables_substitutes_bound_names() {
        let mut env = env();
        env.set_var("name", "world");
        env.set_var("count", 3usize);
        assert_eq!(
            env.apply_variables("hello $name x$count"),
            "hello world x3"
        );
    }

    #[test]
    fn test_unbound_variable_is_left_verbatim() {
        let env = env();
        assert_eq!(env.apply_variables("copy $missing out"), "copy $missing out");
    }

    #[test]
    fn test_longest_name_wins() {
        let mut env = env();
        env.set_var("currentFolder", "a");
        env.set_var("currentFolderPath", "/work/a");
        assert_eq!(
            env.apply_variables("$currentFolder:$currentFolderPath"),
            "a:/work/a"
        );
    }

    #[test]
    fn test_substitution_is_not_recursive() {
        let mut env = env();
        env.set_var("a", "$b");
        env.set_var("b", "$a");
        assert_eq!(env.apply_variables("$a $b"), "$b $a");
    }

    #[test]
    fn test_fork_is_isolated_from_parent() {
        let mut parent = env();
        parent.set_var("shared", "parent");

        let mut child = parent.fork(None);
        assert_eq!(child.current_dir, PathBuf::from("/work"));
        child.set_var("shared", "child");
        child.set_var("only_child", 1i64);

        assert_eq!(parent.get_var("shared"), Some(&Value::from("parent")));
        assert_eq!(parent.get_var("only_child"), None);
    }

    #[test]
    fn test_fork_with_new_cwd_keeps_verbose() {
        let mut parent = env();
        parent.verbose = true;
        let child = parent.fork(Some(PathBuf::from("/elsewhere")));
        assert_eq!(child.current_dir, PathBuf::from("/elsewhere"));
        assert!(child.verbose);
    }

    #[test]
    fn test_resolve_path() {
        let env = env();
        assert_eq!(env.resolve_path("a/b.txt"), PathBuf::from("/work/a/b.txt"));
        #[cfg(unix)]
        assert_eq!(env.resolve_path("/abs"), PathBuf::from("/abs"));
    }

    #[test]
    fn test_value_display_and_truthiness() {
        assert_eq!(Value::Float(2.0).to_string(), "2");
        assert_eq!(Value::Float(2.5).to_string(), "2.5");
        assert_eq!(Value::Empty.to_string(), "");
        assert!(!Value::Int(0).is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(!Value::Float(f64::NAN).is_truthy());
        assert!(Value::from("0").is_truthy());
        assert!(Value::Bool(true).is_truthy());
    }
}
