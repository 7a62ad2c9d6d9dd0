//! Test utility functions for driving the built binary as a subprocess.

use std::ffi::OsStr;
use std::process::{Command, ExitStatus};

#[allow(dead_code)]
pub fn bulkup_exec() -> String {
    debug_binary!().display().to_string()
}

#[allow(dead_code)]
pub fn run_and_wait<I, S>(home: &std::path::Path, args: I) -> (ExitStatus, String)
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let exe = bulkup_exec();
    let o = Command::new(exe)
        .env("HOME", home)
        .args(args)
        .output()
        .unwrap();
    let status = o.status;
    let output = String::from_utf8_lossy(&o.stdout).trim().to_string();
    (status, output)
}
