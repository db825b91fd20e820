//! Breakpoints: voluntary suspension points offered by running pipes.
//!
//! A debugger can observe the pipe and its environment but never changes
//! what runs next.

use crate::env::Environment;
use crate::error::PipeError;
use log::{trace, warn};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::cell::{Cell, RefCell};

/// Where a pipe is when it offers to stop.
#[derive(Debug)]
pub enum Breakpoint<'a> {
    /// The pipe is about to execute its first instruction.
    Start,
    /// The pipe is about to execute this instruction.
    Instruction(&'a str),
    /// A `:each` directive is about to start the child pipe with this id.
    Fork(&'a str),
    /// A `:break` directive.
    Manual,
    /// Something went wrong that ends the pipe without an error, e.g. a failed `:open`.
    Failure(&'a str),
    /// The pipe failed and is about to hand the error to its caller.
    Error(&'a PipeError),
}

pub trait Debugger {
    fn pause(&self, pipe_id: &str, at: Breakpoint<'_>, env: &Environment);
}

/// Never stops.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDebugger;

impl Debugger for NoDebugger {
    fn pause(&self, pipe_id: &str, at: Breakpoint<'_>, _env: &Environment) {
        trace!("[{pipe_id}] breakpoint {at:?}");
    }
}

/// Stops at every breakpoint and waits for a line on the terminal.
///
/// Enter steps to the next breakpoint, `c` runs to the end without stopping,
/// `v` prints the variables. End of input behaves like `c`.
pub struct StepDebugger {
    editor: RefCell<Option<DefaultEditor>>,
    stepping: Cell<bool>,
}

impl StepDebugger {
    pub fn new() -> Self {
        let editor = match DefaultEditor::new() {
            Ok(editor) => Some(editor),
            Err(e) => {
                warn!("step debugger disabled: {e}");
                None
            }
        };
        Self {
            stepping: Cell::new(editor.is_some()),
            editor: RefCell::new(editor),
        }
    }
}

impl Default for StepDebugger {
    fn default() -> Self {
        Self::new()
    }
}

impl Debugger for StepDebugger {
    fn pause(&self, pipe_id: &str, at: Breakpoint<'_>, env: &Environment) {
        if !self.stepping.get() {
            return;
        }
        let mut guard = self.editor.borrow_mut();
        let Some(editor) = guard.as_mut() else {
            return;
        };

        match &at {
            Breakpoint::Start => println!("[pipe {pipe_id}] start in {}", env.current_dir.display()),
            Breakpoint::Instruction(text) => println!("[pipe {pipe_id}] next: {text}"),
            Breakpoint::Fork(child) => println!("[pipe {pipe_id}] forking pipe {child}"),
            Breakpoint::Manual => println!("[pipe {pipe_id}] manual breakpoint"),
            Breakpoint::Failure(message) => println!("[pipe {pipe_id}] {message}"),
            Breakpoint::Error(err) => println!("[pipe {pipe_id}] failed: {err}"),
        }

        loop {
            match editor.readline(&format!("[pipe {pipe_id}] > ")) {
                Ok(line) => match line.trim() {
                    "" => break,
                    "c" => {
                        self.stepping.set(false);
                        break;
                    }
                    "v" => print_variables(env),
                    other => println!("unknown input {other:?}: <enter> step, c continue, v variables"),
                },
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                    self.stepping.set(false);
                    break;
                }
                Err(err) => {
                    warn!("step debugger disabled: {err}");
                    self.stepping.set(false);
                    break;
                }
            }
        }
    }
}

fn print_variables(env: &Environment) {
    let mut names: Vec<&String> = env.vars.keys().collect();
    names.sort();
    for name in names {
        println!("  ${name} = {}", env.vars[name]);
    }
}
