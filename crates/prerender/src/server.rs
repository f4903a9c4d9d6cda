use anyhow::{Context, Result, bail};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;

/// A preview server running as a child process for the duration of a snapshot run.
///
/// The child is killed on drop as a last resort; callers should still call
/// [`PreviewServer::shutdown`] on every exit path.
pub struct PreviewServer {
    child: Child,
    stderr_task: Option<JoinHandle<()>>,
}

impl PreviewServer {
    /// Start `program args...` in `cwd`
    pub fn spawn(program: &str, args: &[String], cwd: &Path) -> Result<Self> {
        let mut child = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to start preview server '{}'", program))?;

        // Only surface lines that look like errors; the rest is noise
        let stderr_task = child.stderr.take().map(|stderr| {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if line.to_lowercase().contains("error") {
                        log::warn!("Preview server: {}", line);
                    } else {
                        log::debug!("Preview server: {}", line);
                    }
                }
            })
        });

        Ok(Self { child, stderr_task })
    }

    /// Poll `url` until it answers with a success status.
    ///
    /// Gives up after `attempts` tries spaced `interval` apart, or as soon as
    /// the child process exits.
    pub async fn wait_ready(&mut self, url: &str, attempts: u32, interval: Duration) -> Result<()> {
        let client = reqwest::Client::builder()
            .timeout(interval.max(Duration::from_secs(1)))
            .build()
            .context("Failed to build HTTP client")?;

        for attempt in 1..=attempts {
            if let Some(status) = self.child.try_wait()? {
                bail!("Preview server exited before becoming ready ({})", status);
            }

            match client.get(url).send().await {
                Ok(response) if response.status().is_success() => {
                    log::info!("Preview server is ready at {}", url);
                    return Ok(());
                }
                Ok(response) => {
                    log::debug!("Readiness attempt {}: {}", attempt, response.status());
                }
                Err(e) => {
                    log::debug!("Readiness attempt {}: {}", attempt, e);
                }
            }

            if attempt < attempts {
                tokio::time::sleep(interval).await;
            }
        }

        bail!(
            "Server did not start in time ({} attempts at {})",
            attempts,
            url
        )
    }

    /// Stop the child process and wait for it to exit
    pub async fn shutdown(mut self) {
        match self.child.try_wait() {
            Ok(Some(_)) => {}
            _ => {
                if let Err(e) = self.child.kill().await {
                    log::warn!("Failed to stop preview server: {}", e);
                }
            }
        }
        if let Some(task) = self.stderr_task.take() {
            task.abort();
        }
        log::info!("Preview server stopped");
    }
}
