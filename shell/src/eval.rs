use std::ffi::{self,CStr,CString};
use std::os::fd::{AsRawFd,BorrowedFd,RawFd};
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use nix::errno::Errno;
use nix::fcntl::{self,OFlag};
use nix::sys::stat::Mode;
use nix::unistd::{self,Pid};

use crate::global::Session;
use crate::job::{self,ChildHandle,Side};
use crate::search::{self,ResolveError};
use crate::types::*;

#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
	#[error(transparent)]
	NotFound(#[from] ResolveError),
	#[error("argument contains a NUL byte: {0}")]
	Nul(#[from] ffi::NulError),
	#[error("cannot start process: {0}")]
	Sys(#[from] nix::Error),
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Outcome {
	Finished(i32),
	Started(Pid),
}

pub const EXIT_NOT_FOUND: i32 = 127;
pub const EXIT_NOT_EXECUTABLE: i32 = 126;
pub const EXIT_SETUP_FAILED: i32 = 1;

const OUTPUT_MODE: libc::mode_t = 0o644;

fn cstring(path: &Path) -> Result<CString, ffi::NulError> {
	CString::new(path.as_os_str().as_bytes())
}

/// Per-launch snapshot of the session, converted for `execve` before forking.
struct Context {
	cwd: CString,
	envp: Vec<CString>,
}

impl Context {
	fn of(session: &Session) -> Result<Context, ffi::NulError> {
		let envp: Result<Vec<CString>, ffi::NulError> = session.env.iter().map(|&(ref k, ref v)| {
			let mut entry = k.as_bytes().to_vec();
			entry.push(b'=');
			entry.extend_from_slice(v.as_bytes());
			CString::new(entry)
		}).collect();
		Ok(Context { cwd: cstring(&session.cwd)?, envp: envp? })
	}
}

/// Everything a child needs, so that nothing is allocated between `fork` and `execve`.
struct Image<'a> {
	name: &'a str,
	path: Option<CString>,
	argv: Vec<CString>,
	context: &'a Context,
	stdin: Option<CString>,
	stdout: Option<CString>,
	not_found: Vec<u8>,
}

impl<'a> Image<'a> {
	fn prepare(command: &'a CommandSpec, path: Option<&Path>, context: &'a Context) -> Result<Image<'a>, LaunchError> {
		let argv: Result<Vec<CString>, ffi::NulError> = command.tokens.iter().map(|t| CString::new(t.as_str())).collect();
		let path = match path {
			Some(p) => Some(cstring(p)?),
			None => None,
		};
		let stdin = match command.redirect.stdin_path {
			Some(ref p) => Some(cstring(p)?),
			None => None,
		};
		let stdout = match command.redirect.stdout_path {
			Some(ref p) => Some(cstring(p)?),
			None => None,
		};
		let not_found = format!("{}\n", ResolveError { name: command.name().to_string() }).into_bytes();
		Ok(Image {
			name: command.name(),
			path: path,
			argv: argv?,
			context: context,
			stdin: stdin,
			stdout: stdout,
			not_found: not_found,
		})
	}

	// returns only on failure, with the child's exit status
	fn enter(&self) -> i32 {
		if let Err(e) = unistd::chdir(self.context.cwd.as_c_str()) {
			report(&[self.context.cwd.to_bytes(), b": ", e.desc().as_bytes(), b"\n"]);
			return EXIT_SETUP_FAILED;
		}
		if let Some(ref target) = self.stdin {
			if let Err(e) = rebind(target, OFlag::O_RDONLY, libc::STDIN_FILENO) {
				report(&[target.to_bytes(), b": ", e.desc().as_bytes(), b"\n"]);
				return EXIT_SETUP_FAILED;
			}
		}
		if let Some(ref target) = self.stdout {
			let flags = OFlag::O_CREAT | OFlag::O_WRONLY | OFlag::O_TRUNC;
			if let Err(e) = rebind(target, flags, libc::STDOUT_FILENO) {
				report(&[target.to_bytes(), b": ", e.desc().as_bytes(), b"\n"]);
				return EXIT_SETUP_FAILED;
			}
		}
		let path = match self.path {
			Some(ref p) => p,
			None => {
				report(&[self.not_found.as_slice()]);
				return EXIT_NOT_FOUND;
			},
		};
		let errno = replace_image(path, &self.argv, &self.context.envp);
		report(&[self.not_found.as_slice()]);
		match errno {
			Errno::ENOENT => EXIT_NOT_FOUND,
			_ => EXIT_NOT_EXECUTABLE,
		}
	}
}

/// Writes straight to descriptor 2; the only kind of output a forked child produces.
fn report(parts: &[&[u8]]) {
	let stderr = unsafe { BorrowedFd::borrow_raw(libc::STDERR_FILENO) };
	for part in parts {
		let _ = unistd::write(stderr, part);
	}
}

fn rebind(target: &CStr, flags: OFlag, stream: RawFd) -> nix::Result<()> {
	let fd = fcntl::open(target, flags, Mode::from_bits_truncate(OUTPUT_MODE))?;
	if fd != stream {
		unistd::dup2(fd, stream)?;
		unistd::close(fd)?;
	}
	Ok(())
}

pub fn replace_image(path: &CStr, argv: &[CString], envp: &[CString]) -> Errno {
	match unistd::execve(path, argv, envp) {
		Ok(never) => match never {},
		Err(e) => e,
	}
}

fn finish(image: &Image, wiring: nix::Result<()>) -> ! {
	let code = match wiring {
		Ok(()) => image.enter(),
		Err(e) => {
			report(&["pipe: ".as_bytes(), e.desc().as_bytes(), b"\n"]);
			EXIT_SETUP_FAILED
		},
	};
	unsafe { libc::_exit(code) }
}

pub fn execute_command(session: &mut Session, command: &CommandSpec, background: bool) -> Result<Outcome, LaunchError> {
	let path = search::lookup(command.name(), session.search_path(), session.cwd())?;
	tracing::debug!(name = command.name(), args = ?command.arguments(), background, "launching");
	let context = Context::of(session)?;
	let image = Image::prepare(command, Some(&path), &context)?;

	let handle = match job::spawn_child(background)? {
		Side::Child => finish(&image, Ok(())),
		Side::Parent(handle) => handle,
	};
	if background {
		let pid = handle.pid;
		session.jobs.push(handle);
		Ok(Outcome::Started(pid))
	} else {
		Ok(Outcome::Finished(handle.wait()?))
	}
}

fn resolve_stage(session: &Session, command: &CommandSpec) -> Option<std::path::PathBuf> {
	search::lookup(command.name(), session.search_path(), session.cwd()).ok()
}

fn wire(close: RawFd, from: RawFd, to: RawFd) -> nix::Result<()> {
	unistd::close(close)
		.and_then(|()| unistd::dup2(from, to))
		.and_then(|_| unistd::close(from))
}

// exit code of the right side
pub fn execute_pipe(session: &Session, pipe: &PipeSpec) -> Result<i32, LaunchError> {
	let context = Context::of(session)?;
	let left_path = resolve_stage(session, &pipe.left);
	let right_path = resolve_stage(session, &pipe.right);
	let left = Image::prepare(&pipe.left, left_path.as_deref(), &context)?;
	let right = Image::prepare(&pipe.right, right_path.as_deref(), &context)?;

	let (read, write) = unistd::pipe()?;
	let (read_fd, write_fd) = (read.as_raw_fd(), write.as_raw_fd());

	let first: ChildHandle = match job::spawn_child(false)? {
		Side::Child => finish(&left, wire(read_fd, write_fd, libc::STDOUT_FILENO)),
		Side::Parent(handle) => handle,
	};
	let second = match job::spawn_child(false) {
		Ok(Side::Child) => finish(&right, wire(write_fd, read_fd, libc::STDIN_FILENO)),
		Ok(Side::Parent(handle)) => Ok(handle),
		Err(e) => Err(e),
	};
	drop(read);
	drop(write);

	if let Err(e) = first.wait() {
		tracing::warn!(error = %e, "waiting for the left side of a pipe failed");
	}
	Ok(second?.wait()?)
}
