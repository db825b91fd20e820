use crate::command::{Command, CommandFactory, Factory, ResultCode};
use crate::env::Environment;
use crate::pipe::Session;
use anyhow::{Context, Result};
use log::debug;
use std::borrow::Cow;
use std::ffi::OsStr;
use std::path::Path;
use std::process::ExitStatus;

/// Fallback command: runs an external program in the pipe's working directory.
///
/// Instructions whose name is not registered arrive here with the name as
/// the first argument, so `git pull --rebase` in a script runs `git`.
pub struct RunCommand {
    args: Vec<String>,
}

impl CommandFactory for Factory<RunCommand> {
    fn create(&self, args: &[String]) -> Box<dyn Command> {
        Box::new(RunCommand {
            args: args.to_vec(),
        })
    }
}

impl Command for RunCommand {
    fn execute(self: Box<Self>, env: &mut Environment, _session: Session<'_>) -> Result<ResultCode> {
        let Some((name, args)) = self.args.split_first() else {
            return Ok(ResultCode::MissingArguments);
        };

        let search_paths = std::env::var_os("PATH").unwrap_or_default();
        let program = find_command_path(&search_paths, &env.current_dir, Path::new(name))
            .ok_or_else(|| anyhow::anyhow!("command not found: {}", name))?;

        debug!("run {} {:?} in {}", program.display(), args, env.current_dir.display());
        let status = std::process::Command::new(program.as_ref())
            .args(args)
            .current_dir(&env.current_dir)
            .status()
            .with_context(|| format!("failed to spawn {}", name))?;

        if status.success() {
            Ok(ResultCode::Success)
        } else {
            let code = status.code().unwrap_or_else(|| terminated_by_signal(status));
            Err(anyhow::anyhow!("{} exited with status {}", name, code))
        }
    }
}

#[cfg(unix)]
fn terminated_by_signal(exit_status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    if let Some(signal) = ExitStatusExt::signal(&exit_status) {
        128 + signal
    } else if ExitStatusExt::core_dumped(&exit_status) {
        255
    } else {
        -1
    }
}

#[cfg(not(unix))]
fn terminated_by_signal(_exit_status: ExitStatus) -> i32 {
    -1
}

/// Locate the program an instruction names.
///
/// A bare name (`git`) is looked up in each directory of `search_paths`.
/// Anything with a directory part (`bin/tool`, `./build.sh`) is taken
/// relative to `cwd`, the pipe directory, not the process directory.
/// Windows also tries `cwd` for bare names before searching.
pub fn find_command_path<'a>(search_paths: &OsStr, cwd: &Path, name: &'a Path) -> Option<Cow<'a, Path>> {
    if name.is_absolute() {
        return name.exists().then_some(Cow::Borrowed(name));
    }

    let mut components = name.components();
    let bare = match (components.next(), components.next()) {
        (None, _) => return None,
        (Some(first), None) => Some(first.as_os_str()),
        _ => None,
    };

    let local = cwd.join(name);
    match bare {
        Some(_) if cfg!(not(unix)) && local.exists() => Some(Cow::Owned(local)),
        Some(program) => std::env::split_paths(search_paths)
            .map(|dir| dir.join(program))
            .find(|candidate| candidate.exists())
            .map(Cow::Owned),
        None => local.exists().then_some(Cow::Owned(local)),
    }
}
