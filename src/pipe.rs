use crate::command::ResultCode;
use crate::debug::{Breakpoint, Debugger, NoDebugger};
use crate::directive::Flow;
use crate::env::Environment;
use crate::error::PipeError;
use crate::eval::{Evaluator, ExprEvaluator};
use crate::extractor;
use crate::registry::{CommandRegistry, FALLBACK_COMMAND};
use crate::script;
use log::{debug, info};
use std::collections::VecDeque;
use std::fs;
use std::path::Path;

/// Id of a pipe that was not forked from another one.
pub const ROOT_PIPE_ID: &str = "1";

/// Services shared by every pipe of one run.
///
/// All members are shared references, so a session is `Copy` and each
/// forked pipe simply receives its parent's session.
#[derive(Clone, Copy)]
pub struct Session<'a> {
    pub registry: &'a CommandRegistry,
    pub evaluator: &'a dyn Evaluator,
    pub debugger: &'a dyn Debugger,
}

impl<'a> Session<'a> {
    pub fn with_registry(mut self, registry: &'a CommandRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_evaluator(mut self, evaluator: &'a dyn Evaluator) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn with_debugger(mut self, debugger: &'a dyn Debugger) -> Self {
        self.debugger = debugger;
        self
    }
}

impl Default for Session<'static> {
    /// The process-wide registry, the `evalexpr` evaluator and no debugger.
    fn default() -> Self {
        Session {
            registry: CommandRegistry::global(),
            evaluator: &ExprEvaluator,
            debugger: &NoDebugger,
        }
    }
}

/// One script execution: an instruction queue bound to an [`Environment`].
///
/// Example
/// ```
/// use pipe_runner::{Environment, Pipe, ResultCode, Session};
/// let mut pipe = Pipe::new(Environment::new("."), Session::default());
/// let code = pipe.run(":eval 40 + 2").unwrap();
/// assert_eq!(code, ResultCode::Success);
/// assert_eq!(pipe.env().get_var("$eval").unwrap().to_string(), "42");
/// ```
pub struct Pipe<'a> {
    pub(crate) id: String,
    pub(crate) env: Environment,
    pub(crate) session: Session<'a>,
}

impl<'a> Pipe<'a> {
    pub fn new(env: Environment, session: Session<'a>) -> Self {
        Self {
            id: ROOT_PIPE_ID.to_string(),
            env,
            session,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Hierarchical id, e.g. `1.3.2` for the second fork of the third fork of the root.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn into_env(self) -> Environment {
        self.env
    }

    /// Read a script file and run it.
    pub fn run_file(&mut self, path: &Path) -> Result<ResultCode, PipeError> {
        let text = fs::read_to_string(path).map_err(|source| PipeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.run(&text)
    }

    /// Run script text to completion.
    ///
    /// Returns `Success` when the script ran out or a command asked to leave
    /// this pipe, and `ExitProcess` when the whole run must stop.
    pub fn run(&mut self, text: &str) -> Result<ResultCode, PipeError> {
        self.run_queue(script::instructions(text))
    }

    pub(crate) fn run_queue(&mut self, mut queue: VecDeque<String>) -> Result<ResultCode, PipeError> {
        info!("Running pipe \"{}\"", self.id);
        self.pause(Breakpoint::Start);

        match self.drain(&mut queue) {
            Ok(code) => {
                debug!("Pipe \"{}\" finished successfully", self.id);
                Ok(code)
            }
            Err(err) => {
                debug!("Pipe \"{}\" failed", self.id);
                self.pause(Breakpoint::Error(&err));
                Err(err)
            }
        }
    }

    fn drain(&mut self, queue: &mut VecDeque<String>) -> Result<ResultCode, PipeError> {
        while let Some(current) = queue.pop_front() {
            if current.starts_with(':') {
                match self.process_directive(&current, queue)? {
                    Flow::Continue => continue,
                    Flow::Finish => break,
                    Flow::Terminate => return Ok(ResultCode::ExitProcess),
                }
            }

            match self.process_command(&current)? {
                ResultCode::Success => {}
                ResultCode::InvalidArguments => {
                    return Err(PipeError::InvalidArguments { instruction: current });
                }
                ResultCode::MissingArguments => {
                    return Err(PipeError::MissingArguments { instruction: current });
                }
                ResultCode::ExitPipe => {
                    debug!("Pipe \"{}\" exited early", self.id);
                    break;
                }
                ResultCode::ExitProcess => {
                    debug!("Pipe \"{}\" stopped the run", self.id);
                    return Ok(ResultCode::ExitProcess);
                }
            }
        }
        Ok(ResultCode::Success)
    }

    fn process_command(&mut self, current: &str) -> Result<ResultCode, PipeError> {
        let mut args: Vec<String> = extractor::extract(current)
            .iter()
            .map(|token| self.env.apply_variables(token))
            .collect();
        if args.is_empty() {
            return Ok(ResultCode::Success);
        }

        let registry = self.session.registry;
        let factory = match registry.resolve(&args[0]) {
            Some(factory) => {
                args.remove(0);
                factory
            }
            None => registry.resolve(FALLBACK_COMMAND).ok_or_else(|| PipeError::Command {
                instruction: current.to_string(),
                source: anyhow::anyhow!(
                    "unknown command {} and no `{}` command registered",
                    args[0],
                    FALLBACK_COMMAND
                ),
            })?,
        };

        self.pause(Breakpoint::Instruction(current));

        let code = factory
            .create(&args)
            .execute(&mut self.env, self.session)
            .map_err(|source| PipeError::Command {
                instruction: current.to_string(),
                source,
            })?;

        match code {
            ResultCode::InvalidArguments => debug!(" - Invalid arguments"),
            ResultCode::MissingArguments => debug!(" - Missing arguments"),
            _ => debug!(" - Success"),
        }
        Ok(code)
    }

    pub(crate) fn pause(&self, at: Breakpoint<'_>) {
        self.session.debugger.pause(&self.id, at, &self.env);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{Command, CommandFactory};
    use std::sync::{Arc, Mutex};

    struct Echoed {
        seen: Arc<Mutex<Vec<Vec<String>>>>,
    }

    struct EchoedCommand {
        seen: Arc<Mutex<Vec<Vec<String>>>>,
        args: Vec<String>,
    }

    impl CommandFactory for Echoed {
        fn create(&self, args: &[String]) -> Box<dyn Command> {
            Box::new(EchoedCommand {
                seen: self.seen.clone(),
                args: args.to_vec(),
            })
        }
    }

    impl Command for EchoedCommand {
        fn execute(self: Box<Self>, _env: &mut Environment, _session: Session<'_>) -> anyhow::Result<ResultCode> {
            self.seen.lock().unwrap().push(self.args);
            Ok(ResultCode::Success)
        }
    }

    fn registry(seen: &Arc<Mutex<Vec<Vec<String>>>>) -> CommandRegistry {
        let mut registry = CommandRegistry::empty();
        registry.register("say", Box::new(Echoed { seen: seen.clone() }));
        registry.register(FALLBACK_COMMAND, Box::new(Echoed { seen: seen.clone() }));
        registry
    }

    #[test]
    fn arguments_are_substituted_per_token() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let registry = registry(&seen);
        let mut env = Environment::new(".");
        env.set_var("who", "big world");

        let mut pipe = Pipe::new(env, Session::default().with_registry(&registry));
        pipe.run("say hello $who \"$missing\"").unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![vec!["hello".to_string(), "big world".into(), "$missing".into()]]
        );
    }

    #[test]
    fn unknown_command_goes_to_fallback_with_its_name() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let registry = registry(&seen);

        let mut pipe = Pipe::new(Environment::new("."), Session::default().with_registry(&registry));
        pipe.run("git status --short").unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![vec!["git".to_string(), "status".into(), "--short".into()]]
        );
    }

    #[test]
    fn unknown_command_without_fallback_fails() {
        let registry = CommandRegistry::empty();
        let mut pipe = Pipe::new(Environment::new("."), Session::default().with_registry(&registry));
        let err = pipe.run("git status").unwrap_err();
        assert!(matches!(err, PipeError::Command { ref instruction, .. } if instruction == "git status"));
    }

    #[test]
    fn file_that_cannot_be_read_is_io_error() {
        let mut pipe = Pipe::new(Environment::new("."), Session::default());
        let err = pipe.run_file(Path::new("/definitely/missing/script.pipe")).unwrap_err();
        assert!(matches!(err, PipeError::Io { .. }));
    }

    #[test]
    fn with_id_sets_id() {
        let pipe = Pipe::new(Environment::new("."), Session::default()).with_id("1.4");
        assert_eq!(pipe.id(), "1.4");
    }
}
