//! docshape CLI library
//!
//! Command-line front end for `docshape-query`: argument definitions,
//! configuration loading, and the subcommand implementations.

pub mod cli;
pub mod commands;
pub mod config;
