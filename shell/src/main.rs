use std::io;
use io::Write;
use io::BufRead;
use std::process;

use minish::{Config,Flow,Session};

fn main() {
	let config = Config::from_env();
	config.init_logging();

	let mut session = match Session::from_process() {
		Ok(s) => s,
		Err(e) => {
			let _ = writeln!(io::stderr(), "minish: {}", e);
			process::exit(1);
		},
	};
	tracing::debug!(cwd = %session.cwd().display(), "session started");

	let stdin = io::stdin();
	let mut stdin_locked = stdin.lock();
	let mut stdout = io::stdout();
	let mut stderr = io::stderr();
	loop {
		let _ = stdout.write_all(config.prompt.as_bytes());
		let _ = stdout.flush();
		let mut line = String::new();
		match stdin_locked.read_line(&mut line) {
			Ok(0) => {
				session.run_line("exit", &mut stdout, &mut stderr);
				break;
			},
			Ok(_) => {},
			Err(e) => {
				tracing::error!(error = %e, "reading standard input failed");
				break;
			},
		}
		if session.run_line(&line, &mut stdout, &mut stderr) == Flow::Exit {
			break;
		}
	}
	let _ = stdout.flush();
}
