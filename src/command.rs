use crate::env::Environment;
use crate::pipe::Session;
use anyhow::Result;
use std::fmt;

/// Closed set of codes a command hands back to the pipe that ran it.
///
/// Only `MissingArguments` and `InvalidArguments` are failures. `ExitPipe`
/// ends the current pipe as if its script ran out, and `ExitProcess` stops
/// every pipe in the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultCode {
    Success,
    MissingArguments,
    InvalidArguments,
    ExitPipe,
    ExitProcess,
}

impl ResultCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ResultCode::Success => "success",
            ResultCode::MissingArguments => "missingArguments",
            ResultCode::InvalidArguments => "invalidArguments",
            ResultCode::ExitPipe => "exitPipe",
            ResultCode::ExitProcess => "exitProcess",
        }
    }

    pub fn is_success(self) -> bool {
        self == ResultCode::Success
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Object-safe trait for anything a pipe can dispatch an instruction to.
///
/// Implemented by built-ins via a blanket impl and directly by the
/// `run` fallback and by test doubles.
pub trait Command {
    /// Executes the command against the environment of the pipe that owns it.
    fn execute(self: Box<Self>, env: &mut Environment, session: Session<'_>) -> Result<ResultCode>;
}

/// Creates a command instance from the argument tokens of one instruction.
///
/// Factories live in the process-wide registry, so they must be shareable
/// between threads even though pipes themselves run sequentially.
pub trait CommandFactory: Send + Sync {
    fn create(&self, args: &[String]) -> Box<dyn Command>;
}

/// Factory for commands defined in this crate.
///
/// The type parameter selects the command; the blanket impl for built-ins
/// lives in [`crate::builtin`], the `run` fallback in [`crate::external`].
pub struct Factory<T> {
    _phantom: std::marker::PhantomData<fn() -> T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ResultCode;

    #[test]
    fn only_success_is_success() {
        assert!(ResultCode::Success.is_success());
        assert!(!ResultCode::ExitPipe.is_success());
        assert!(!ResultCode::InvalidArguments.is_success());
    }

    #[test]
    fn codes_display_as_sentinel_names() {
        assert_eq!(ResultCode::MissingArguments.to_string(), "missingArguments");
        assert_eq!(ResultCode::ExitProcess.to_string(), "exitProcess");
    }
}
