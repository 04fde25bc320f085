use std::{
    io::Read,
    path::Path,
    process::{Command, Stdio},
    thread,
};

use anyhow::{anyhow, Context, Result};
use tracing::trace;

const MAX_CAPTURE_BYTES: usize = 1024 * 1024;
const TRUNCATION_MARKER: &str = "\n[...truncated...]";

#[derive(Clone, Debug)]
pub struct RunOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Runs `program` in `cwd`, capturing both output streams. Capture stops at
/// a fixed cap, but the pipes are always drained so the child never stalls.
pub fn run_command(program: &str, args: &[String], cwd: &Path) -> Result<RunOutput> {
    trace!("spawning {program} {args:?} in {}", cwd.display());
    let mut child = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("failed to spawn {program} in {}", cwd.display()))?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let stdout_reader = thread::spawn(move || read_capped(stdout));
    let stderr_reader = thread::spawn(move || read_capped(stderr));

    let status = child
        .wait()
        .with_context(|| format!("failed to wait for {program}"))?;
    let stdout = stdout_reader
        .join()
        .map_err(|_| anyhow!("stdout reader panicked"))?;
    let stderr = stderr_reader
        .join()
        .map_err(|_| anyhow!("stderr reader panicked"))?;

    Ok(RunOutput {
        code: status.code().unwrap_or(-1),
        stdout,
        stderr,
    })
}

/// Runs `program` with inherited stdio, for tools that talk to the user
/// directly, like the editor launcher.
pub fn run_command_passthrough(program: &str, args: &[String], cwd: &Path) -> Result<RunOutput> {
    trace!("spawning {program} {args:?} in {} with inherited stdio", cwd.display());
    let status = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .status()
        .with_context(|| format!("failed to spawn {program} in {}", cwd.display()))?;
    Ok(RunOutput {
        code: status.code().unwrap_or(-1),
        stdout: String::new(),
        stderr: String::new(),
    })
}

fn read_capped(stream: Option<impl Read>) -> String {
    let Some(mut stream) = stream else {
        return String::new();
    };
    let mut buf: Vec<u8> = Vec::new();
    let mut chunk = [0u8; 8192];
    let mut truncated = false;
    loop {
        match stream.read(&mut chunk) {
            Ok(0) => break,
            Ok(read) => {
                if buf.len() < MAX_CAPTURE_BYTES {
                    let take = read.min(MAX_CAPTURE_BYTES - buf.len());
                    buf.extend_from_slice(&chunk[..take]);
                    if take < read {
                        truncated = true;
                    }
                } else {
                    truncated = true;
                }
            }
            Err(_) => break,
        }
    }
    let mut text = String::from_utf8_lossy(&buf).into_owned();
    if truncated {
        text.push_str(TRUNCATION_MARKER);
    }
    text
}

/// Splits a configured command string into program and arguments. Single
/// and double quotes group words; there is no escape processing beyond
/// that, matching how these commands are written in settings files.
pub fn split_command(command: &str) -> Result<(String, Vec<String>)> {
    let mut parts: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quote: Option<char> = None;

    for ch in command.chars() {
        if let Some(open) = quote {
            if ch == open {
                quote = None;
            } else {
                current.push(ch);
            }
            continue;
        }
        match ch {
            '\'' | '"' => {
                quote = Some(ch);
                in_token = true;
            }
            ch if ch.is_whitespace() => {
                if in_token {
                    parts.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            ch => {
                current.push(ch);
                in_token = true;
            }
        }
    }
    if quote.is_some() {
        return Err(anyhow!("unterminated quote in command `{command}`"));
    }
    if in_token {
        parts.push(current);
    }

    let mut parts = parts.into_iter();
    let Some(program) = parts.next() else {
        return Err(anyhow!("empty command"));
    };
    Ok((program, parts.collect()))
}
