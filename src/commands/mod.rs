//! # CLI Command Implementations
//!
//! One module per subcommand of the `pkgset` command-line tool. Each
//! module defines an `Args` struct (derived with `clap`) and an
//! `execute` function that performs the operation, translating library
//! errors into user-friendly output via `anyhow`.

pub mod completions;
pub mod graph;
pub mod sync;
