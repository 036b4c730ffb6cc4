use std::{env,fs,io};
use std::ffi::{OsStr,OsString};
use std::io::Write;
use std::path::{Path,PathBuf};

use crate::builtin;
use crate::eval::{self,Outcome};
use crate::job::JobRegistry;
use crate::parser::{self,ParseError};
use crate::search;
use crate::types::Line;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Flow {
	Continue,
	Exit,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum CdError {
	#[error("cd: no such file or directory: {0}")]
	NotFound(String),
	#[error("cd: not a directory: {0}")]
	NotADirectory(String),
	#[error("cd: HOME not set")]
	NoHome,
}

/// Interpreter state that children inherit: where they run, what environment they
/// get, and the background jobs still waiting to be reaped.
#[derive(Debug)]
pub struct Session {
	pub cwd: PathBuf,
	pub env: Vec<(OsString, OsString)>,
	pub jobs: JobRegistry,
}

/// Splits off a trailing `&`.
pub fn strip_background(line: &str) -> (&str, bool) {
	let trimmed = line.trim_end();
	match trimmed.strip_suffix('&') {
		Some(rest) => (rest, true),
		None => (trimmed, false),
	}
}

impl Session {
	pub fn new(cwd: PathBuf, env: Vec<(OsString, OsString)>) -> Session {
		Session { cwd: cwd, env: env, jobs: JobRegistry::new() }
	}

	pub fn from_process() -> io::Result<Session> {
		Ok(Session::new(env::current_dir()?, env::vars_os().collect()))
	}

	pub fn var(&self, key: &str) -> Option<&OsStr> {
		self.env.iter().find(|&&(ref k, _)| k == key).map(|&(_, ref v)| v.as_os_str())
	}

	pub fn set_var(&mut self, key: &str, value: &OsStr) {
		match self.env.iter_mut().find(|&&mut (ref k, _)| k == key) {
			Some(entry) => entry.1 = value.to_os_string(),
			None => self.env.push((OsString::from(key), value.to_os_string())),
		}
	}

	pub fn search_path(&self) -> Option<&OsStr> {
		self.var(search::PATH_KEY)
	}

	// `None` means HOME
	pub fn change_dir(&mut self, target: Option<&str>) -> Result<(), CdError> {
		let target = match target {
			Some(t) => PathBuf::from(t),
			None => self.var("HOME").map(PathBuf::from).ok_or(CdError::NoHome)?,
		};
		let shown = target.display().to_string();
		let resolved = fs::canonicalize(self.cwd.join(&target)).map_err(|_| CdError::NotFound(shown.clone()))?;
		if !resolved.is_dir() {
			return Err(CdError::NotADirectory(shown));
		}
		tracing::debug!(from = %self.cwd.display(), to = %resolved.display(), "changing directory");
		self.set_var("PWD", resolved.as_os_str());
		self.cwd = resolved;
		Ok(())
	}

	pub fn cwd(&self) -> &Path {
		&self.cwd
	}

	pub fn reap_background(&mut self, out: &mut dyn Write) {
		for (pid, code) in self.jobs.drain() {
			tracing::info!(pid = %pid, code, "background task finished");
			if code > 0 {
				let _ = writeln!(out, "Background task terminated with exit code {}", code);
			}
		}
	}

	fn run_command(&mut self, line: &str, out: &mut dyn Write, err: &mut dyn Write) {
		let (line, background) = strip_background(line);
		let parsed = parser::parse(line);
		let detached = background && matches!(parsed, Ok(Line::Simple(_)));
		match parsed {
			Err(ParseError::Empty) => {},
			Err(e) => {
				let _ = writeln!(err, "minish: {}", e);
			},
			Ok(Line::Simple(command)) => match eval::execute_command(self, &command, background) {
				Ok(Outcome::Finished(code)) => if code != 0 {
					let _ = writeln!(err, "Program terminated with exit code {}", code);
				},
				Ok(Outcome::Started(pid)) => {
					let _ = writeln!(out, "Background task {} started", pid);
				},
				Err(e) => {
					let _ = writeln!(err, "{}", e);
				},
			},
			Ok(Line::Pipe(pipe)) => {
				if background {
					tracing::debug!("pipes always run in the foreground, ignoring `&`");
				}
				match eval::execute_pipe(self, &pipe) {
					Ok(0) => {},
					Ok(code) => {
						let _ = writeln!(err, "Program terminated with exit code {}", code);
					},
					Err(e) => {
						let _ = writeln!(err, "{}", e);
					},
				}
			},
		}
		if !detached {
			self.reap_background(out);
		}
	}

	pub fn run_line(&mut self, line: &str, out: &mut dyn Write, err: &mut dyn Write) -> Flow {
		let line = line.trim_end_matches(|c| c == '\n' || c == '\r');
		if let Some((builtin, argument)) = builtin::match_builtin(line) {
			return builtin(self, argument, out, err);
		}
		self.run_command(line, out, err);
		Flow::Continue
	}
}
