use std::io::Write;

use crate::global::{Flow,Session};

pub type Builtin = fn(&mut Session, &str, &mut dyn Write, &mut dyn Write) -> Flow;

pub fn builtin_exit(session: &mut Session, _: &str, out: &mut dyn Write, _: &mut dyn Write) -> Flow {
	session.reap_background(out);
	if !session.jobs.is_empty() {
		tracing::info!(running = session.jobs.len(), "exiting with background tasks still running");
	}
	Flow::Exit
}

pub fn builtin_cd(session: &mut Session, argument: &str, _: &mut dyn Write, err: &mut dyn Write) -> Flow {
	let target = if argument.is_empty() { None } else { Some(argument) };
	if let Err(e) = session.change_dir(target) {
		let _ = writeln!(err, "{}", e);
	}
	Flow::Continue
}

// matched on the raw line, before `&` handling and parsing
pub fn match_builtin(line: &str) -> Option<(Builtin, &str)> {
	let line = line.trim();
	match line {
		"exit" => return Some((builtin_exit as Builtin, "")),
		"cd" => return Some((builtin_cd as Builtin, "")),
		_ => {},
	}
	match line.strip_prefix("cd") {
		Some(rest) if rest.starts_with(|c: char| c == ' ' || c == '\t') => Some((builtin_cd as Builtin, rest.trim())),
		_ => None,
	}
}
