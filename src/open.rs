use crate::builtin::BuiltinCommand;
use crate::command::ResultCode;
use crate::env::Environment;
use crate::pipe::{Pipe, Session};
use anyhow::Result;
use argh::FromArgs;
use log::warn;

#[derive(FromArgs)]
/// Run another pipe script in a fork of the current environment.
pub struct OpenCommand {
    #[argh(positional)]
    /// pipe script to run, relative to the working directory.
    pub file: String,

    #[argh(option)]
    /// bind a variable in the opened pipe, as name=value; may be repeated.
    pub set: Vec<String>,

    #[argh(switch)]
    /// enable verbose diagnostics in the opened pipe.
    pub verbose: bool,
}

impl BuiltinCommand for OpenCommand {
    fn name() -> &'static str {
        "open"
    }

    fn execute(self, env: &mut Environment, session: Session<'_>) -> Result<ResultCode> {
        let path = env.resolve_path(&self.file);
        let mut fork = env.fork(None);
        fork.verbose |= self.verbose;

        for binding in &self.set {
            let Some((name, value)) = binding.split_once('=') else {
                warn!("open: expected name=value, got {binding:?}");
                return Ok(ResultCode::InvalidArguments);
            };
            fork.set_var(name.trim(), value);
        }

        let mut pipe = Pipe::new(fork, session).with_id(format!("open:{}", self.file));
        Ok(pipe.run_file(&path)?)
    }
}
