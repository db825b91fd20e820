//! An interpreter for line-oriented automation scripts ("pipes").
//!
//! A pipe is a list of instructions: file-system commands such as `copy` or
//! `mkdir`, anything else is handed to the `run` command and executed as an
//! external program. Lines starting with `:` are directives the interpreter
//! handles itself: `:if`/`:begin`/`:end` conditionals, `:eval` expressions,
//! `:each folder` and `:each file` iteration, and `:open` for running another
//! pipe script.
//!
//! The main entry point is [`Pipe`], which runs script text against an
//! [`Environment`] using the services of a [`Session`]. The public modules
//! [`command`] and [`registry`] expose the traits and types needed to add
//! commands of your own.
//!
//! ```
//! use pipe_runner::{Environment, Pipe, ResultCode, Session};
//! let script = "set name world:eol::if \"$name\" == \"nobody\":eol:exit:eol::eval 1 + 1";
//! let mut pipe = Pipe::new(Environment::new("."), Session::default());
//! assert_eq!(pipe.run(script).unwrap(), ResultCode::Success);
//! assert_eq!(pipe.env().get_var("eval").unwrap().to_string(), "2");
//! ```

mod builtin;
pub mod command;
pub mod config;
pub mod debug;
pub mod directive;
pub mod env;
pub mod error;
pub mod eval;
mod external;
pub mod extractor;
pub mod logging;
mod open;
mod pipe;
pub mod registry;
pub mod script;

pub use command::ResultCode;
pub use env::{Environment, Value};
pub use error::PipeError;
pub use pipe::{Pipe, ROOT_PIPE_ID, Session};
