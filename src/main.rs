use argh::FromArgs;
use log::error;
use pipe_runner::config::Config;
use pipe_runner::debug::{Debugger, NoDebugger, StepDebugger};
use pipe_runner::{Environment, Pipe, ResultCode, Session, logging};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(FromArgs)]
/// Run a pipe script: file-system commands plus :if, :each, :eval and :open directives.
struct Args {
    #[argh(positional)]
    /// pipe script to run.
    script: Option<PathBuf>,

    #[argh(option, short = 'e')]
    /// inline script text; use :eol: to separate instructions.
    eval: Option<String>,

    #[argh(option, short = 'C')]
    /// working directory of the root pipe (defaults to the current directory).
    cwd: Option<PathBuf>,

    #[argh(option)]
    /// bind a variable as name=value before the script starts; may be repeated.
    set: Vec<String>,

    #[argh(switch, short = 'v')]
    /// verbose diagnostics.
    verbose: bool,

    #[argh(switch, short = 's')]
    /// stop at every breakpoint and wait for input.
    step: bool,

    #[argh(option)]
    /// configuration file merged over the defaults.
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args: Args = argh::from_env();

    let config = match Config::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("pipe_runner: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let verbose = args.verbose || config.settings.verbose;
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        logging::parse_level(&config.settings.log_level)
    };
    logging::init(level);

    let mut env = match &args.cwd {
        Some(dir) => Environment::new(dir.clone()),
        None => Environment::from_process(),
    };
    env.verbose = verbose;
    env.set_vars(config.variables.iter().map(|(k, v)| (k, v.as_str())));
    for binding in &args.set {
        match binding.split_once('=') {
            Some((name, value)) => env.set_var(name.trim(), value),
            None => {
                error!("--set expects name=value, got {binding:?}");
                return ExitCode::FAILURE;
            }
        }
    }

    let step_debugger;
    let debugger: &dyn Debugger = if args.step || config.settings.step {
        step_debugger = StepDebugger::new();
        &step_debugger
    } else {
        &NoDebugger
    };
    let session = Session::default().with_debugger(debugger);
    let mut pipe = Pipe::new(env, session);

    let result = match (&args.script, &args.eval) {
        (Some(path), None) => pipe.run_file(&resolve_script(path, args.cwd.as_deref())),
        (None, Some(text)) => pipe.run(text),
        _ => {
            error!("give either a script file or --eval text");
            return ExitCode::FAILURE;
        }
    };

    match result {
        Ok(ResultCode::ExitProcess) => {
            log::debug!("run stopped by exit");
            ExitCode::SUCCESS
        }
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            error!("Pipe \"{}\" failed: {err}", pipe.id());
            ExitCode::FAILURE
        }
    }
}

/// Script paths are taken relative to the process directory, not `--cwd`,
/// unless they only exist under `--cwd`.
fn resolve_script(path: &Path, cwd: Option<&Path>) -> PathBuf {
    match cwd {
        Some(dir) if !path.exists() && path.is_relative() => dir.join(path),
        _ => path.to_path_buf(),
    }
}
