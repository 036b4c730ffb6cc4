use std::fmt;
use std::path::PathBuf;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Direction { Input, Output }

impl Direction {
	pub fn operator(self) -> &'static str {
		match self {
			Direction::Input => "<",
			Direction::Output => ">",
		}
	}
}

impl fmt::Display for Direction {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.write_str(self.operator())
	}
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Token {
	Word(String),
	Redirect(Direction, String),
	Pipe,
}

#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct RedirectSpec {
	pub stdin_path: Option<PathBuf>,
	pub stdout_path: Option<PathBuf>,
}

impl RedirectSpec {
	pub fn slot(&mut self, direction: Direction) -> &mut Option<PathBuf> {
		match direction {
			Direction::Input => &mut self.stdin_path,
			Direction::Output => &mut self.stdout_path,
		}
	}
}

/// Program name followed by its arguments, plus the streams it should be wired to.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct CommandSpec {
	pub(crate) tokens: Vec<String>,
	pub redirect: RedirectSpec,
}

impl CommandSpec {
	// `None` for an empty token list, so `name` always has something to return
	pub fn new(tokens: Vec<String>) -> Option<CommandSpec> {
		if tokens.is_empty() {
			return None;
		}
		Some(CommandSpec { tokens: tokens, redirect: RedirectSpec::default() })
	}

	pub fn tokens(&self) -> &[String] {
		&self.tokens
	}

	pub fn name(&self) -> &str {
		&self.tokens[0]
	}

	pub fn arguments(&self) -> &[String] {
		&self.tokens[1..]
	}
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct PipeSpec {
	pub left: CommandSpec,
	pub right: CommandSpec,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Line {
	Simple(CommandSpec),
	Pipe(PipeSpec),
}
