use anyhow::{Context, Result};
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::debug;

/// Opens a local file for a human to look at. Best effort, never awaited.
pub trait BrowserOpener {
    fn open(&self, path: &Path) -> Result<()>;
}

pub struct SystemOpener {
    program: Option<String>,
}

impl SystemOpener {
    /// `program` empty means the platform default opener.
    pub fn new(program: &str) -> Self {
        let program = program.trim();
        Self {
            program: (!program.is_empty()).then(|| program.to_string()),
        }
    }

    fn command(&self, target: &str) -> Command {
        if let Some(p) = &self.program {
            let mut c = Command::new(p);
            c.arg(target);
            return c;
        }
        if cfg!(target_os = "macos") {
            let mut c = Command::new("open");
            c.arg(target);
            c
        } else if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.args(["/C", "start", "", target]);
            c
        } else {
            let mut c = Command::new("xdg-open");
            c.arg(target);
            c
        }
    }
}

impl BrowserOpener for SystemOpener {
    fn open(&self, path: &Path) -> Result<()> {
        let target = path
            .canonicalize()
            .with_context(|| format!("resolving {}", path.display()))?;
        let target = target.display().to_string();
        debug!("opening {} in browser", target);
        let mut child = self
            .command(&target)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("launching browser for {target}"))?;
        // Reaped off-thread so a long batch doesn't collect zombies.
        std::thread::spawn(move || child.wait());
        Ok(())
    }
}
