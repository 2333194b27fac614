//! Server management - spawning the application and waiting until it answers

use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::config::WebServerConfig;
use crate::error::{E2eError, E2eResult};

const GRACEFUL_STOP: Duration = Duration::from_millis(500);
const EXIT_POLL: Duration = Duration::from_millis(10);

/// Handle to a running application server
pub struct ServerHandle {
    child: Child,
    base_url: String,
}

impl ServerHandle {
    /// Spawn the configured command and wait for `base_url` to respond
    pub async fn spawn(config: &WebServerConfig, base_url: &str) -> E2eResult<Self> {
        info!(command = %config.command, args = ?config.args, "Spawning web server");

        let mut cmd = Command::new(&config.command);
        cmd.args(&config.args)
            .envs(&config.env)
            .stdout(Stdio::null())
            .stderr(Stdio::inherit());
        if let Some(cwd) = &config.cwd {
            cmd.current_dir(cwd);
        }

        let child = cmd.spawn().map_err(|e| {
            E2eError::ServerStartup(format!("Failed to spawn {}: {}", config.command, e))
        })?;

        let mut handle = ServerHandle {
            child,
            base_url: base_url.trim_end_matches('/').to_string(),
        };

        let health_url = format!("{}{}", handle.base_url, config.health_path);
        if let Err(e) = wait_for_reachable(&health_url, config.startup_timeout()).await {
            handle.stop()?;
            return Err(e);
        }

        info!("Server is reachable at {}", handle.base_url);
        Ok(handle)
    }

    /// Stop the server
    pub fn stop(&mut self) -> E2eResult<()> {
        if let Ok(Some(_)) = self.child.try_wait() {
            return Ok(());
        }
        info!("Stopping server at {} (pid: {})", self.base_url, self.child.id());

        // Try graceful shutdown first
        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            let pid = Pid::from_raw(self.child.id() as i32);
            if kill(pid, Signal::SIGTERM).is_ok() && self.exited_within(GRACEFUL_STOP) {
                return Ok(());
            }
        }

        // Force kill if still running
        let _ = self.child.kill();
        let _ = self.child.wait();

        Ok(())
    }

    /// Poll for exit, returning as soon as the process is gone
    fn exited_within(&mut self, grace: Duration) -> bool {
        let deadline = Instant::now() + grace;
        loop {
            match self.child.try_wait() {
                Ok(Some(_)) => return true,
                Ok(None) if Instant::now() < deadline => std::thread::sleep(EXIT_POLL),
                _ => return false,
            }
        }
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// Poll `url` until it answers with a non-5xx status
pub async fn wait_for_reachable(url: &str, timeout_duration: Duration) -> E2eResult<()> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(2))
        .build()?;

    let start = Instant::now();
    let mut attempts = 0;

    while start.elapsed() < timeout_duration {
        attempts += 1;

        match client.get(url).send().await {
            Ok(resp) if !resp.status().is_server_error() => {
                return Ok(());
            }
            Ok(resp) => {
                warn!("Health check returned {}", resp.status());
            }
            Err(e) => {
                if attempts == 1 {
                    info!("Waiting for server to start...");
                }
                // Connection refused is expected while server is starting
                if !e.is_connect() {
                    warn!("Health check error: {}", e);
                }
            }
        }

        sleep(Duration::from_millis(100)).await;
    }

    Err(E2eError::ServerHealthCheck(attempts))
}
