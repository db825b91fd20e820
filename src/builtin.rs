use crate::command::{Command, CommandFactory, Factory, ResultCode};
use crate::env::Environment;
use crate::pipe::Session;
use anyhow::{Context, Result};
use argh::{EarlyExit, FromArgs};
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// Built-in commands known to the interpreter at compile time.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`) and executed
/// in-process against the environment of the pipe that dispatched them.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the command, e.g. "copy" or "cd".
    fn name() -> &'static str;

    /// Executes the command. Failures that are not argument problems are
    /// returned as errors and fail the pipe.
    fn execute(self, env: &mut Environment, session: Session<'_>) -> Result<ResultCode>;
}

impl<T: BuiltinCommand> Command for T {
    fn execute(self: Box<Self>, env: &mut Environment, session: Session<'_>) -> Result<ResultCode> {
        T::execute(*self, env, session)
    }
}

/// Stand-in for a builtin whose arguments did not parse.
struct Rejected {
    name: &'static str,
    output: String,
    code: ResultCode,
}

impl Command for Rejected {
    fn execute(self: Box<Self>, _env: &mut Environment, _session: Session<'_>) -> Result<ResultCode> {
        if self.code.is_success() {
            print!("{}", self.output);
        } else {
            warn!("{}: {}", self.name, self.output.trim_end());
        }
        Ok(self.code)
    }
}

impl<T: BuiltinCommand + 'static> CommandFactory for Factory<T> {
    fn create(&self, args: &[String]) -> Box<dyn Command> {
        let argv: Vec<&str> = args.iter().map(String::as_str).collect();
        match T::from_args(&[T::name()], &argv) {
            Ok(cmd) => Box::new(cmd),
            Err(EarlyExit { output, status }) => {
                let code = match (status, argv.is_empty()) {
                    (Ok(()), _) => ResultCode::Success,
                    (Err(()), true) => ResultCode::MissingArguments,
                    (Err(()), false) => ResultCode::InvalidArguments,
                };
                Box::new(Rejected {
                    name: T::name(),
                    output,
                    code,
                })
            }
        }
    }
}

#[derive(FromArgs)]
/// Print a message from the script, e.g. progress between long steps.
pub struct Echo {
    #[argh(switch, short = 'n')]
    /// keep the cursor on the same line.
    pub inline: bool,

    #[argh(positional, greedy)]
    /// message words.
    pub words: Vec<String>,
}

impl BuiltinCommand for Echo {
    fn name() -> &'static str {
        "echo"
    }

    fn execute(self, _env: &mut Environment, _session: Session<'_>) -> Result<ResultCode> {
        let message = self.words.join(" ");
        match self.inline {
            true => print!("{message}"),
            false => println!("{message}"),
        }
        Ok(ResultCode::Success)
    }
}

#[derive(FromArgs)]
/// Bind a variable in the current pipe.
pub struct Set {
    #[argh(positional)]
    /// variable name, with or without the leading `$`.
    pub variable: String,

    #[argh(positional, greedy)]
    /// value words, joined by single spaces.
    pub value: Vec<String>,
}

impl BuiltinCommand for Set {
    fn name() -> &'static str {
        "set"
    }

    fn execute(self, env: &mut Environment, _session: Session<'_>) -> Result<ResultCode> {
        env.set_var(&self.variable, self.value.join(" "));
        Ok(ResultCode::Success)
    }
}

#[derive(FromArgs)]
/// Move the current pipe to another directory. Later relative paths and
/// `:each` listings use it; forks inherit it.
pub struct Cd {
    #[argh(positional)]
    /// destination, relative to the pipe directory; $HOME when missing.
    pub dir: Option<String>,
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn execute(self, env: &mut Environment, _session: Session<'_>) -> Result<ResultCode> {
        let dir = match self.dir.filter(|d| !d.is_empty()) {
            Some(dir) => PathBuf::from(dir),
            None => std::env::var_os("HOME")
                .map(PathBuf::from)
                .context("cd: no directory given and HOME is unset")?,
        };

        let wanted = env.resolve_path(dir);
        let resolved = fs::canonicalize(&wanted)
            .with_context(|| format!("cd: {} not found", wanted.display()))?;
        anyhow::ensure!(resolved.is_dir(), "cd: {} is not a directory", resolved.display());
        env.current_dir = resolved;
        Ok(ResultCode::Success)
    }
}

#[derive(FromArgs)]
/// Copy a file, or a directory with everything below it.
pub struct CopyPath {
    #[argh(positional)]
    /// file or directory to copy.
    pub source: String,

    #[argh(positional)]
    /// destination path; directories are created as needed.
    pub destination: String,

    #[argh(option, short = 'i')]
    /// skip entries with this name (or path suffix); may be repeated.
    pub ignore: Vec<String>,

    #[argh(switch, short = 'q')]
    /// do not log every copied entry.
    pub quiet: bool,
}

impl CopyPath {
    fn is_ignored(&self, path: &Path) -> bool {
        let path = path.to_string_lossy();
        self.ignore.iter().any(|ignore| {
            path == ignore.as_str()
                || path.ends_with(&format!("/{ignore}"))
                || path.ends_with(&format!("\\{ignore}"))
        })
    }

    fn copy_tree(&self, src: &Path, dst: &Path) -> Result<()> {
        if self.is_ignored(src) {
            return Ok(());
        }
        if !self.quiet {
            info!("{}", src.display());
            info!(" => {}", dst.display());
        }

        if src.is_dir() {
            fs::create_dir_all(dst)
                .with_context(|| format!("copy: can't create {}", dst.display()))?;
            let entries = fs::read_dir(src)
                .with_context(|| format!("copy: can't list {}", src.display()))?;
            for entry in entries {
                let entry = entry?;
                self.copy_tree(&entry.path(), &dst.join(entry.file_name()))?;
            }
        } else {
            if let Some(parent) = dst.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("copy: can't create {}", parent.display()))?;
            }
            fs::copy(src, dst).with_context(|| {
                format!("copy: can't copy {} to {}", src.display(), dst.display())
            })?;
        }
        Ok(())
    }
}

impl BuiltinCommand for CopyPath {
    fn name() -> &'static str {
        "copy"
    }

    fn execute(self, env: &mut Environment, _session: Session<'_>) -> Result<ResultCode> {
        let src = env.resolve_path(&self.source);
        let dst = env.resolve_path(&self.destination);
        if !src.exists() {
            return Err(anyhow::anyhow!("copy: {} does not exist", src.display()));
        }
        self.copy_tree(&src, &dst)?;
        Ok(ResultCode::Success)
    }
}

#[derive(FromArgs)]
/// Move or rename a file or directory.
pub struct MovePath {
    #[argh(positional)]
    /// path to move.
    pub source: String,

    #[argh(positional)]
    /// new path.
    pub destination: String,
}

impl BuiltinCommand for MovePath {
    fn name() -> &'static str {
        "move"
    }

    fn execute(self, env: &mut Environment, _session: Session<'_>) -> Result<ResultCode> {
        let src = env.resolve_path(&self.source);
        let dst = env.resolve_path(&self.destination);
        fs::rename(&src, &dst)
            .with_context(|| format!("move: can't move {} to {}", src.display(), dst.display()))?;
        Ok(ResultCode::Success)
    }
}

#[derive(FromArgs)]
/// Create a directory and any missing parents.
pub struct MakeDir {
    #[argh(positional)]
    /// directory to create.
    pub path: String,
}

impl BuiltinCommand for MakeDir {
    fn name() -> &'static str {
        "mkdir"
    }

    fn execute(self, env: &mut Environment, _session: Session<'_>) -> Result<ResultCode> {
        let dir = env.resolve_path(&self.path);
        fs::create_dir_all(&dir)
            .with_context(|| format!("mkdir: can't create {}", dir.display()))?;
        Ok(ResultCode::Success)
    }
}

#[derive(FromArgs)]
/// Delete a file or a directory with everything below it.
pub struct Delete {
    #[argh(positional)]
    /// file or directory to delete.
    pub path: String,

    #[argh(switch, short = 'f')]
    /// succeed when the path does not exist.
    pub force: bool,
}

impl BuiltinCommand for Delete {
    fn name() -> &'static str {
        "delete"
    }

    fn execute(self, env: &mut Environment, _session: Session<'_>) -> Result<ResultCode> {
        let path = env.resolve_path(&self.path);
        let metadata = match fs::symlink_metadata(&path) {
            Ok(m) => m,
            Err(_) if self.force => return Ok(ResultCode::Success),
            Err(e) => {
                return Err(e).with_context(|| format!("delete: {}", path.display()));
            }
        };
        let removed = if metadata.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        removed.with_context(|| format!("delete: can't remove {}", path.display()))?;
        Ok(ResultCode::Success)
    }
}

#[derive(FromArgs)]
/// Stop the current pipe; enclosing pipes carry on.
pub struct Return {}

impl BuiltinCommand for Return {
    fn name() -> &'static str {
        "return"
    }

    fn execute(self, _env: &mut Environment, _session: Session<'_>) -> Result<ResultCode> {
        Ok(ResultCode::ExitPipe)
    }
}

#[derive(FromArgs)]
/// Stop every pipe of the run.
pub struct Exit {}

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn execute(self, _env: &mut Environment, _session: Session<'_>) -> Result<ResultCode> {
        Ok(ResultCode::ExitProcess)
    }
}
