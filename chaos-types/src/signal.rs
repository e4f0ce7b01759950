//! POSIX signals used as fault primitives.

use std::fmt;

/// Signals the controller sends to daemon processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    /// Suspend execution (cannot be caught).
    Stop,
    /// Continue a stopped process.
    Cont,
    /// Terminate immediately (cannot be caught).
    Kill,
    /// Null signal: only checks that the pid exists.
    Probe,
}

impl Signal {
    /// Flag for the `kill` utility, e.g. `-STOP`.
    pub fn as_flag(&self) -> &'static str {
        match self {
            Signal::Stop => "-STOP",
            Signal::Cont => "-CONT",
            Signal::Kill => "-KILL",
            Signal::Probe => "-0",
        }
    }

    /// Shell command that delivers this signal to `pid`.
    pub fn command(&self, pid: u32) -> String {
        format!("kill {} {}", self.as_flag(), pid)
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Signal::Stop => "SIGSTOP",
            Signal::Cont => "SIGCONT",
            Signal::Kill => "SIGKILL",
            Signal::Probe => "signal 0",
        };
        f.write_str(name)
    }
}
