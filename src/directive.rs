//! Control-flow directives: instructions starting with `:` that the pipe
//! interprets itself instead of dispatching to a command.

use crate::builtin::BuiltinCommand;
use crate::command::{CommandFactory, Factory, ResultCode};
use crate::debug::Breakpoint;
use crate::env::Value;
use crate::error::PipeError;
use crate::extractor;
use crate::open::OpenCommand;
use crate::pipe::Pipe;
use log::{debug, error, info, warn};
use std::collections::VecDeque;
use std::fmt;
use std::fs;
use std::path::Path;

/// Variable that receives the result of `:eval`.
pub const EVAL_VARIABLE: &str = "$eval";

const BEGIN: &str = ":begin";
const END: &str = ":end";

/// What the pipe does after a directive ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    /// Go on with the next instruction.
    Continue,
    /// Stop this pipe successfully.
    Finish,
    /// Stop this pipe and every pipe above it.
    Terminate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Folder,
    File,
}

impl EntryKind {
    fn matches(self, metadata: &fs::Metadata) -> bool {
        match self {
            EntryKind::Folder => metadata.is_dir(),
            EntryKind::File => metadata.is_file(),
        }
    }

    /// Variables bound in the fork for the entry `name` at `index` of `count`.
    fn bindings(self, root: &Path, name: &str, index: usize, count: usize) -> [(&'static str, Value); 5] {
        let path = root.join(name);
        let absolute = std::path::absolute(&path).unwrap_or_else(|_| path.clone());
        match self {
            EntryKind::Folder => [
                ("currentFolder", Value::from(name)),
                ("currentFolderPath", Value::from(path.as_path())),
                ("currentFolderAbsolutePath", Value::from(absolute.as_path())),
                ("foldersCount", Value::from(count)),
                ("folderIndex", Value::from(index)),
            ],
            EntryKind::File => [
                ("currentFile", Value::from(name)),
                ("currentFilePath", Value::from(path.as_path())),
                ("currentFileAbsolutePath", Value::from(absolute.as_path())),
                ("filesCount", Value::from(count)),
                ("fileIndex", Value::from(index)),
            ],
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EntryKind::Folder => "folder",
            EntryKind::File => "file",
        })
    }
}

/// A parsed directive line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive<'a> {
    Begin,
    End,
    Break,
    /// Expression text as written, possibly empty.
    Eval(&'a str),
    If(&'a str),
    Each(EntryKind),
    /// File token of `:open`, if any.
    Open(Option<String>),
    Unknown,
}

impl<'a> Directive<'a> {
    pub fn parse(line: &'a str) -> Self {
        let tokens = extractor::extract(line);
        let expression = line
            .split_once(char::is_whitespace)
            .map(|(_, rest)| rest.trim())
            .unwrap_or("");

        match tokens.first().map(String::as_str) {
            Some(BEGIN) => Directive::Begin,
            Some(END) => Directive::End,
            Some(":break") => Directive::Break,
            Some(":eval") => Directive::Eval(expression),
            Some(":if") => Directive::If(expression),
            Some(":each") => match tokens.get(1).map(String::as_str) {
                Some("folder") => Directive::Each(EntryKind::Folder),
                Some("file") => Directive::Each(EntryKind::File),
                _ => Directive::Unknown,
            },
            Some(":open") => Directive::Open(tokens.get(1).cloned()),
            _ => Directive::Unknown,
        }
    }
}

/// An expression written as one quoted string is first tried as the
/// expression it quotes, then as the string itself.
fn unquote(expression: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = expression
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            if !inner.contains(quote) {
                return inner.trim();
            }
        }
    }
    expression
}

/// Drop what a falsy `:if` guards: a whole `:begin` .. `:end` block, or the
/// single instruction that follows it.
fn skip_guarded(queue: &mut VecDeque<String>) {
    if queue.pop_front().as_deref() == Some(BEGIN) {
        while let Some(next) = queue.pop_front() {
            if next == END {
                break;
            }
        }
    }
}

fn list_entries(root: &Path, kind: EntryKind) -> Result<Vec<String>, PipeError> {
    let io_err = |source| PipeError::Io {
        path: root.to_path_buf(),
        source,
    };

    let mut names = Vec::new();
    for entry in fs::read_dir(root).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        let path = entry.path();
        match fs::metadata(&path) {
            Ok(metadata) if kind.matches(&metadata) => {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
            Ok(_) => {}
            Err(e) => warn!("skipping {}: {}", path.display(), e),
        }
    }
    names.sort();
    Ok(names)
}

impl Pipe<'_> {
    pub(crate) fn process_directive(
        &mut self,
        current: &str,
        queue: &mut VecDeque<String>,
    ) -> Result<Flow, PipeError> {
        match Directive::parse(current) {
            Directive::Begin => debug!("Begin"),
            Directive::End => debug!("End"),
            Directive::Break => self.pause(Breakpoint::Manual),
            Directive::Eval(expression) => {
                info!("{current}");
                self.pause(Breakpoint::Instruction(current));
                let value = self.evaluate(current, expression)?;
                self.env.set_var(EVAL_VARIABLE, value);
            }
            Directive::If(expression) => {
                info!("{current}");
                self.pause(Breakpoint::Instruction(current));
                let value = self.evaluate(current, expression)?;

                if !value.is_truthy() {
                    skip_guarded(queue);
                }
                if self.env.verbose {
                    debug!("Inline if evaluated to {value:?}");
                }
            }
            Directive::Each(kind) => return self.each_entry(kind, queue),
            Directive::Open(file) => return self.open(current, file, queue),
            Directive::Unknown => warn!("Ignoring directive \"{current}\""),
        }
        Ok(Flow::Continue)
    }

    fn evaluate(&self, current: &str, expression: &str) -> Result<Value, PipeError> {
        if expression.is_empty() {
            return Err(PipeError::MissingArguments {
                instruction: current.to_string(),
            });
        }
        let evaluator = self.session.evaluator;
        let unquoted = unquote(expression);
        if unquoted != expression {
            let inner = self.env.apply_variables(unquoted);
            match evaluator.evaluate(&inner, &self.env.vars) {
                Ok(value) => return Ok(value),
                Err(e) => debug!("\"{inner}\" is not an expression ({e}), taking it as a string"),
            }
        }

        let expression = self.env.apply_variables(expression);
        evaluator
            .evaluate(&expression, &self.env.vars)
            .map_err(|source| PipeError::Evaluation { expression, source })
    }

    /// Run the rest of the queue once per entry of the working directory.
    ///
    /// Children run one after another, each over its own copy of the
    /// remaining instructions; the parent has nothing left to run afterwards.
    fn each_entry(&mut self, kind: EntryKind, queue: &mut VecDeque<String>) -> Result<Flow, PipeError> {
        let root = self.env.current_dir.clone();
        let names = list_entries(&root, kind)?;
        let body: Vec<String> = queue.drain(..).collect();

        for (index, name) in names.iter().enumerate() {
            let child_id = format!("{}.{}", self.id, index + 1);
            debug!("Forking pipe {child_id} for {kind} {name}");
            self.pause(Breakpoint::Fork(&child_id));

            let mut fork = self.env.fork(None);
            fork.set_vars(kind.bindings(&root, name, index, names.len()));

            let code = Pipe::new(fork, self.session)
                .with_id(child_id.clone())
                .run_queue(body.iter().cloned().collect())
                .map_err(|source| PipeError::Fork {
                    pipe_id: child_id,
                    source: Box::new(source),
                })?;

            if code == ResultCode::ExitProcess {
                return Ok(Flow::Terminate);
            }
        }
        Ok(Flow::Finish)
    }

    fn open(
        &mut self,
        current: &str,
        file: Option<String>,
        queue: &mut VecDeque<String>,
    ) -> Result<Flow, PipeError> {
        let Some(file) = file else {
            return Err(PipeError::MissingArguments {
                instruction: current.to_string(),
            });
        };
        info!("{current}");

        let mut args = vec![self.env.apply_variables(&file)];
        while let Some(line) = queue.front().filter(|next| next.starts_with('-')).cloned() {
            queue.pop_front();
            debug!(" - Instruction added: {line}");
            args.extend(
                extractor::extract(&line)
                    .iter()
                    .map(|token| self.env.apply_variables(token)),
            );
        }

        info!("Running {} command...", OpenCommand::name());
        self.pause(Breakpoint::Instruction(current));

        let code = Factory::<OpenCommand>::default()
            .create(&args)
            .execute(&mut self.env, self.session)
            .map_err(|source| PipeError::Command {
                instruction: current.to_string(),
                source,
            })?;

        match code {
            ResultCode::Success => {
                info!("Open command success");
                Ok(Flow::Continue)
            }
            ResultCode::ExitProcess => Ok(Flow::Terminate),
            other => {
                let message = format!("Open command has exited with an error code: {other}.");
                error!("{message}");
                self.pause(Breakpoint::Failure(&message));
                Ok(Flow::Finish)
            }
        }
    }
}
