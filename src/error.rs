use crate::eval::EvalError;
use std::path::PathBuf;
use thiserror::Error;

/// Why a pipe stopped with a failure.
///
/// `exitPipe` and `exitProcess` are not represented here: they are control
/// signals and travel as [`ResultCode`](crate::command::ResultCode)s.
#[derive(Debug, Error)]
pub enum PipeError {
    #[error("Missing arguments in instruction \"{instruction}\".")]
    MissingArguments { instruction: String },

    #[error("Invalid arguments in instruction \"{instruction}\".")]
    InvalidArguments { instruction: String },

    #[error("Cannot evaluate \"{expression}\": {source}")]
    Evaluation {
        expression: String,
        #[source]
        source: EvalError,
    },

    #[error("Instruction \"{instruction}\" failed: {source:#}")]
    Command {
        instruction: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A child pipe started by `:each` failed; `pipe_id` names the child.
    #[error("Pipe \"{pipe_id}\" failed: {source}")]
    Fork {
        pipe_id: String,
        #[source]
        source: Box<PipeError>,
    },
}

impl PipeError {
    /// The failure that started a chain of [`PipeError::Fork`] wrappers.
    pub fn innermost(&self) -> &PipeError {
        match self {
            PipeError::Fork { source, .. } => source.innermost(),
            other => other,
        }
    }

    /// Id of the deepest pipe the failure passed through, if it came from a fork.
    pub fn origin_pipe(&self) -> Option<&str> {
        match self {
            PipeError::Fork { pipe_id, source } => source.origin_pipe().or(Some(pipe_id.as_str())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fork_chain_reports_innermost_and_origin() {
        let leaf = PipeError::InvalidArguments {
            instruction: "copy a".into(),
        };
        let err = PipeError::Fork {
            pipe_id: "1.2".into(),
            source: Box::new(PipeError::Fork {
                pipe_id: "1.2.1".into(),
                source: Box::new(leaf),
            }),
        };

        assert!(matches!(
            err.innermost(),
            PipeError::InvalidArguments { instruction } if instruction == "copy a"
        ));
        assert_eq!(err.origin_pipe(), Some("1.2.1"));
        assert_eq!(
            err.to_string(),
            "Pipe \"1.2\" failed: Pipe \"1.2.1\" failed: Invalid arguments in instruction \"copy a\"."
        );
    }
}
