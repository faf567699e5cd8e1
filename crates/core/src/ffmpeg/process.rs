//! Running one ffmpeg process with progress, timeout and stop handling.

use regex_lite::Regex;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio::sync::{mpsc, watch};
use tokio::time::{sleep, Duration};
use tracing::debug;

use super::config::FfmpegConfig;
use super::error::FfmpegError;
use crate::worker::StopSignal;

/// Stderr lines kept for error reports.
const STDERR_TAIL_LINES: usize = 20;

/// One ffmpeg invocation.
///
/// Progress is read from `-progress pipe:2` output. A [`StopSignal::Stop`]
/// asks ffmpeg to quit by writing `q` to its stdin; [`StopSignal::Terminate`]
/// kills it.
pub struct FfmpegProcess<'a> {
    config: &'a FfmpegConfig,
    args: Vec<String>,
    duration_secs: Option<f64>,
}

impl<'a> FfmpegProcess<'a> {
    pub fn new(config: &'a FfmpegConfig, args: Vec<String>) -> Self {
        Self {
            config,
            args,
            duration_secs: None,
        }
    }

    /// Expected output duration, used to turn `out_time_ms` into percent.
    pub fn with_duration(mut self, duration_secs: Option<f64>) -> Self {
        self.duration_secs = duration_secs.filter(|d| *d > 0.0);
        self
    }

    /// Runs the process to completion and returns its non-progress stderr.
    pub async fn run(
        self,
        progress_tx: Option<mpsc::Sender<u8>>,
        mut stop: watch::Receiver<StopSignal>,
    ) -> Result<String, FfmpegError> {
        if *stop.borrow_and_update() != StopSignal::Run {
            return Err(FfmpegError::Cancelled);
        }

        debug!(args = ?self.args, "Running ffmpeg");

        let mut child = Command::new(&self.config.ffmpeg_path)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    FfmpegError::NotFound {
                        path: self.config.ffmpeg_path.clone(),
                    }
                } else {
                    FfmpegError::Io(e)
                }
            })?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| std::io::Error::other("ffmpeg stderr was not captured"))?;
        let mut stdin = child.stdin.take();
        let mut reader = BufReader::new(stderr).lines();

        let progress_line = Regex::new(r"^[a-z_0-9]+=\S*$").ok();
        let time_regex = Regex::new(r"^out_time_ms=(\d+)").ok();

        let mut output = String::new();
        let mut last_percent: Option<u8> = None;
        let mut stopping = false;
        let mut stop_open = true;

        let deadline = sleep(Duration::from_secs(self.config.timeout_secs));
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                line = reader.next_line() => {
                    let Some(line) = line? else { break };

                    if let Some(percent) = self.parse_percent(time_regex.as_ref(), &line) {
                        if last_percent != Some(percent) {
                            last_percent = Some(percent);
                            if let Some(ref tx) = progress_tx {
                                // Non-blocking send
                                let _ = tx.try_send(percent);
                            }
                        }
                    }

                    if !progress_line.as_ref().is_some_and(|re| re.is_match(&line)) {
                        output.push_str(&line);
                        output.push('\n');
                    }
                }
                changed = stop.changed(), if stop_open => {
                    if changed.is_err() {
                        stop_open = false;
                        continue;
                    }
                    let signal = *stop.borrow_and_update();
                    match signal {
                        StopSignal::Run => {}
                        StopSignal::Stop => {
                            stopping = true;
                            if let Some(mut pipe) = stdin.take() {
                                let _ = pipe.write_all(b"q\n").await;
                            }
                        }
                        StopSignal::Terminate => {
                            stopping = true;
                            let _ = child.start_kill();
                        }
                    }
                }
                _ = &mut deadline => {
                    let _ = child.start_kill();
                    let _ = child.wait().await;
                    return Err(FfmpegError::Timeout {
                        timeout_secs: self.config.timeout_secs,
                    });
                }
            }
        }

        drop(stdin);
        let status = child.wait().await?;

        if stopping {
            return Err(FfmpegError::Cancelled);
        }
        if !status.success() {
            return Err(FfmpegError::Failed {
                code: status.code(),
                stderr: tail(&output, STDERR_TAIL_LINES),
            });
        }

        if let Some(ref tx) = progress_tx {
            let _ = tx.try_send(100);
        }
        Ok(output)
    }

    fn parse_percent(&self, re: Option<&Regex>, line: &str) -> Option<u8> {
        let duration = self.duration_secs?;
        let caps = re?.captures(line)?;
        // out_time_ms is in microseconds
        let micros: f64 = caps.get(1)?.as_str().parse().ok()?;
        let percent = (micros / 1_000_000.0 / duration * 100.0).clamp(0.0, 100.0);
        Some(percent as u8)
    }
}

fn tail(text: &str, lines: usize) -> String {
    let all: Vec<&str> = text.lines().collect();
    all[all.len().saturating_sub(lines)..].join("\n")
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn shell() -> FfmpegConfig {
        FfmpegConfig::with_path(PathBuf::from("sh")).with_timeout(10)
    }

    fn script(body: &str) -> Vec<String> {
        vec!["-c".to_string(), body.to_string()]
    }

    #[tokio::test]
    async fn test_progress_and_output() {
        let config = shell();
        let (_stop_tx, stop_rx) = watch::channel(StopSignal::Run);
        let (tx, mut rx) = mpsc::channel(16);

        let output = FfmpegProcess::new(
            &config,
            script("printf 'out_time_ms=5000000\\nprogress=continue\\ntrack_gain = -3.00 dB\\n' >&2"),
        )
        .with_duration(Some(10.0))
        .run(Some(tx), stop_rx)
        .await
        .unwrap();

        assert_eq!(output.trim(), "track_gain = -3.00 dB");
        assert_eq!(rx.recv().await, Some(50));
        assert_eq!(rx.recv().await, Some(100));
    }

    #[tokio::test]
    async fn test_failure_keeps_stderr_tail() {
        let config = shell();
        let (_stop_tx, stop_rx) = watch::channel(StopSignal::Run);

        let err = FfmpegProcess::new(&config, script("echo 'Invalid data found' >&2; exit 3"))
            .run(None, stop_rx)
            .await
            .unwrap_err();

        match err {
            FfmpegError::Failed { code, stderr } => {
                assert_eq!(code, Some(3));
                assert!(stderr.contains("Invalid data found"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_terminate_kills_process() {
        let config = shell();
        let (stop_tx, stop_rx) = watch::channel(StopSignal::Run);

        let run = tokio::spawn(async move {
            FfmpegProcess::new(&config, script("exec sleep 30")).run(None, stop_rx).await
        });
        tokio::time::sleep(Duration::from_millis(100)).await;
        stop_tx.send(StopSignal::Terminate).unwrap();

        let result = run.await.unwrap();
        assert!(matches!(result, Err(FfmpegError::Cancelled)));
    }

    #[tokio::test]
    async fn test_already_stopped() {
        let config = shell();
        let (_stop_tx, stop_rx) = watch::channel(StopSignal::Stop);
        let result = FfmpegProcess::new(&config, script("true")).run(None, stop_rx).await;
        assert!(matches!(result, Err(FfmpegError::Cancelled)));
    }

    #[tokio::test]
    async fn test_missing_binary() {
        let config = FfmpegConfig::with_path(PathBuf::from("/nonexistent/ffmpeg"));
        let (_stop_tx, stop_rx) = watch::channel(StopSignal::Run);
        let result = FfmpegProcess::new(&config, Vec::new()).run(None, stop_rx).await;
        assert!(matches!(result, Err(FfmpegError::NotFound { .. })));
    }

    #[test]
    fn test_tail() {
        assert_eq!(tail("a\nb\nc", 2), "b\nc");
        assert_eq!(tail("a", 5), "a");
    }
}
