use super::{CommandSpec, ExecError, ProcessOutput, ProcessRunner};
use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Runs commands as real child processes.
#[derive(Debug, Clone, Default)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessRunner for SystemRunner {
    fn run(&self, spec: &CommandSpec) -> Result<ProcessOutput, ExecError> {
        let command_line = spec.display();
        debug!(
            command = %command_line,
            cwd = ?spec.cwd,
            timeout = ?spec.timeout,
            "spawning"
        );

        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args);
        if let Some(dir) = &spec.cwd {
            cmd.current_dir(dir);
        }
        for (k, v) in &spec.env {
            cmd.env(k, v);
        }
        // Nothing we run is interactive; a tool waiting on stdin would hang the batch.
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|source| ExecError::Spawn {
            program: spec.program.clone(),
            source,
        })?;

        let started = Instant::now();
        let out = wait_with_timeout(&mut child, spec.timeout, &command_line)?;
        debug!(
            command = %command_line,
            code = ?out.code,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "finished"
        );
        Ok(out)
    }
}

/// How long to keep reading after the child exits. A background process it
/// left behind may hold the pipes open indefinitely.
const PIPE_GRACE: Duration = Duration::from_secs(2);
const POLL: Duration = Duration::from_millis(25);

fn wait_with_timeout(
    child: &mut Child,
    timeout: Option<Duration>,
    command: &str,
) -> Result<ProcessOutput, ExecError> {
    // Drain pipes while waiting so a verbose build tool can't deadlock the child
    // on a full stdout/stderr buffer.
    let stdout = Pipe::drain(child.stdout.take());
    let stderr = Pipe::drain(child.stderr.take());

    let io_err = |message: String| ExecError::Io {
        command: command.to_string(),
        message,
    };

    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait().map_err(|e| io_err(e.to_string()))? {
            let mut grace = PIPE_GRACE;
            if let Some(limit) = timeout {
                grace = grace.min(limit.saturating_sub(start.elapsed()));
            }
            let deadline = Instant::now() + grace;
            while !(stdout.is_finished() && stderr.is_finished()) && Instant::now() < deadline {
                std::thread::sleep(POLL);
            }
            if !(stdout.is_finished() && stderr.is_finished()) {
                warn!("output pipes still open after exit, keeping partial output: {}", command);
            }
            return Ok(ProcessOutput {
                code: status.code(),
                stdout: stdout.collect().map_err(io_err)?,
                stderr: stderr.collect().map_err(io_err)?,
            });
        }

        if let Some(limit) = timeout {
            if start.elapsed() > limit {
                warn!("process timed out after {:?}: {}", limit, command);
                let _ = child.kill();
                child.wait().map_err(|e| io_err(e.to_string()))?;
                return Err(ExecError::TimedOut {
                    command: command.to_string(),
                    timeout: limit,
                    stderr: stderr.collect().unwrap_or_default(),
                });
            }
        }

        std::thread::sleep(POLL);
    }
}

/// A pipe read on a background thread into a shared buffer, so whatever has
/// arrived can be taken without waiting for EOF.
struct Pipe {
    buf: Arc<Mutex<Vec<u8>>>,
    handle: JoinHandle<std::io::Result<()>>,
}

impl Pipe {
    fn drain<R: Read + Send + 'static>(reader: Option<R>) -> Self {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&buf);
        let handle = std::thread::spawn(move || {
            let Some(mut r) = reader else {
                return Ok(());
            };
            let mut chunk = [0u8; 8192];
            loop {
                match r.read(&mut chunk) {
                    Ok(0) => return Ok(()),
                    Ok(n) => sink
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .extend_from_slice(&chunk[..n]),
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                    Err(e) => return Err(e),
                }
            }
        });
        Self { buf, handle }
    }

    fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Output so far. Read errors only surface once the reader has stopped;
    /// an unfinished reader is left detached.
    fn collect(self) -> Result<String, String> {
        if self.handle.is_finished() {
            self.handle
                .join()
                .map_err(|_| "pipe reader thread panicked".to_string())?
                .map_err(|e| format!("reading pipe: {e}"))?;
        }
        let bytes = self.buf.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}
