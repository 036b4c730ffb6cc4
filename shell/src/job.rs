use std::io;
use io::Write;

use nix::errno::Errno;
use nix::sys::wait::{self,WaitPidFlag,WaitStatus};
use nix::unistd::{self,Pid};

pub trait WaitStatusExt {
	/// Exit code of a terminated child, `128 + signal` if it was killed,
	/// `None` while it is still around.
	fn code(self) -> Option<i32>;
}

impl WaitStatusExt for WaitStatus {
	fn code(self) -> Option<i32> {
		match self {
			WaitStatus::Exited(_, code) => Some(code),
			WaitStatus::Signaled(_, signal, _) => Some(128 + signal as i32),
			_ => None,
		}
	}
}

#[derive(Debug, PartialEq, Eq)]
pub struct ChildHandle {
	pub pid: Pid,
	pub background: bool,
}

impl ChildHandle {
	pub fn wait(self) -> nix::Result<i32> {
		loop {
			match wait::waitpid(self.pid, None) {
				Ok(status) => if let Some(code) = status.code() {
					tracing::debug!(pid = %self.pid, code, "reaped foreground child");
					return Ok(code);
				},
				Err(Errno::EINTR) => {},
				Err(e) => return Err(e),
			}
		}
	}
}

pub enum Side {
	Child,
	Parent(ChildHandle),
}

pub fn spawn_child(background: bool) -> nix::Result<Side> {
	let _ = io::stdout().flush();
	match unsafe { unistd::fork() }? {
		unistd::ForkResult::Parent{ child } => {
			tracing::debug!(pid = %child, background, "spawned child");
			Ok(Side::Parent(ChildHandle { pid: child, background: background }))
		},
		unistd::ForkResult::Child => Ok(Side::Child),
	}
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Poll {
	Terminated(Pid, i32),
	NoneReady,
	NoChildren,
}

/// Background children that have not been reaped yet.
#[derive(Debug, Default)]
pub struct JobRegistry {
	pending: Vec<ChildHandle>,
}

impl JobRegistry {
	pub fn new() -> JobRegistry {
		JobRegistry { pending: vec![] }
	}

	pub fn push(&mut self, handle: ChildHandle) {
		self.pending.push(handle);
	}

	pub fn len(&self) -> usize {
		self.pending.len()
	}

	pub fn is_empty(&self) -> bool {
		self.pending.is_empty()
	}

	pub fn contains(&self, pid: Pid) -> bool {
		self.pending.iter().any(|h| h.pid == pid)
	}

	pub fn poll_once(&mut self) -> Poll {
		let mut i = 0;
		while i < self.pending.len() {
			let pid = self.pending[i].pid;
			match wait::waitpid(pid, Some(WaitPidFlag::WNOHANG)) {
				Ok(status) => match status.code() {
					Some(code) => {
						self.pending.remove(i);
						tracing::debug!(pid = %pid, code, "reaped background child");
						return Poll::Terminated(pid, code);
					},
					None => i += 1,
				},
				Err(Errno::EINTR) => {},
				Err(e) => {
					// already reaped elsewhere or never ours
					tracing::debug!(pid = %pid, error = %e, "dropping unpollable background child");
					self.pending.remove(i);
				},
			}
		}
		if self.pending.is_empty() { Poll::NoChildren } else { Poll::NoneReady }
	}

	pub fn drain(&mut self) -> Vec<(Pid, i32)> {
		let mut reaped = vec![];
		loop {
			match self.poll_once() {
				Poll::Terminated(pid, code) => reaped.push((pid, code)),
				Poll::NoneReady | Poll::NoChildren => break,
			}
		}
		reaped
	}
}
