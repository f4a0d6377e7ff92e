//! External transcoder invocation.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::TranscodeError;
use crate::Result;

/// How a transcoder run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscodeOutcome {
    /// Exited with status 0.
    Succeeded,
    /// Exited with a non-zero status or was killed by a signal.
    Failed(ExitStatus),
    /// Killed because the pipeline is shutting down.
    Interrupted,
}

/// The external transcoding command.
///
/// Invoked as `<program> <input-flags...> -i <input> <output-flags...> <output>`.
#[derive(Debug, Clone)]
pub struct Transcoder {
    program: PathBuf,
    input_flags: Vec<String>,
    output_flags: Vec<String>,
}

impl Transcoder {
    /// Create a transcoder for an already resolved program path.
    pub fn new(
        program: impl Into<PathBuf>,
        input_flags: Vec<String>,
        output_flags: Vec<String>,
    ) -> Self {
        Self {
            program: program.into(),
            input_flags,
            output_flags,
        }
    }

    /// Resolve the configured program on the executable search path.
    ///
    /// # Errors
    ///
    /// Returns `TranscodeError::NotFound` if the program cannot be found.
    pub fn locate(config: &Config) -> Result<Self> {
        let program = which::which(&config.transcoder).map_err(|e| TranscodeError::NotFound {
            program: config.transcoder.clone(),
            reason: e.to_string(),
        })?;

        tracing::info!(program = %program.display(), "Found transcoder");

        Ok(Self::new(
            program,
            config.input_flags.clone(),
            config.output_flags.clone(),
        ))
    }

    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Full argument list for one job.
    #[must_use]
    pub fn args(&self, input: &Path, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> =
            Vec::with_capacity(self.input_flags.len() + self.output_flags.len() + 3);
        args.extend(self.input_flags.iter().map(OsString::from));
        args.push("-i".into());
        args.push(input.into());
        args.extend(self.output_flags.iter().map(OsString::from));
        args.push(output.into());
        args
    }

    /// Run the transcoder to completion.
    ///
    /// The child's stdout and stderr are inherited; stdin is closed. If
    /// `cancel` fires first the child is killed and reaped before returning.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or waited on.
    pub async fn run(
        &self,
        input: &Path,
        output: &Path,
        cancel: &CancellationToken,
    ) -> Result<TranscodeOutcome> {
        let args = self.args(input, output);
        tracing::debug!(program = %self.program.display(), ?args, "Running transcoder");

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| TranscodeError::SpawnFailed {
                program: self.program.clone(),
                reason: e.to_string(),
            })?;

        let waited = tokio::select! {
            status = child.wait() => Some(status),
            () = cancel.cancelled() => None,
        };

        let status = match waited {
            Some(status) => status,
            None => {
                tracing::warn!(input = %input.display(), "Stopping transcoder for shutdown");
                if let Err(e) = child.start_kill() {
                    tracing::debug!(error = %e, "Transcoder already exited");
                }
                child.wait().await.map_err(|e| self.wait_failed(&e))?;
                return Ok(TranscodeOutcome::Interrupted);
            }
        };

        let status = status.map_err(|e| self.wait_failed(&e))?;
        if status.success() {
            Ok(TranscodeOutcome::Succeeded)
        } else {
            Ok(TranscodeOutcome::Failed(status))
        }
    }

    fn wait_failed(&self, err: &std::io::Error) -> TranscodeError {
        TranscodeError::WaitFailed {
            program: self.program.clone(),
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_order() {
        let transcoder = Transcoder::new(
            "/usr/bin/ffmpeg",
            vec!["-hwaccel".to_string(), "auto".to_string()],
            vec!["-c:v".to_string(), "libx264".to_string()],
        );

        let args = transcoder.args(
            Path::new("/b/queue/a.mov"),
            Path::new("/b/working/a.mp4"),
        );
        assert_eq!(
            args,
            [
                "-hwaccel",
                "auto",
                "-i",
                "/b/queue/a.mov",
                "-c:v",
                "libx264",
                "/b/working/a.mp4"
            ]
            .map(OsString::from)
        );
    }

    #[test]
    fn test_args_without_flags() {
        let transcoder = Transcoder::new("ffmpeg", vec![], vec![]);
        let args = transcoder.args(Path::new("in.mkv"), Path::new("out.mp4"));
        assert_eq!(args, ["-i", "in.mkv", "out.mp4"].map(OsString::from));
    }

    #[test]
    fn test_locate_missing_program() {
        let config = Config {
            transcoder: "ffqueue-definitely-not-a-real-program".to_string(),
            ..Config::default()
        };
        let err = Transcoder::locate(&config).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Transcode(TranscodeError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_spawn_failure() {
        let transcoder = Transcoder::new("/nonexistent/ffmpeg", vec![], vec![]);
        let err = transcoder
            .run(
                Path::new("a.mov"),
                Path::new("a.mp4"),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(!err.is_fatal());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exit_status() {
        let ok = Transcoder::new("true", vec![], vec![]);
        let cancel = CancellationToken::new();
        let outcome = ok
            .run(Path::new("a"), Path::new("b"), &cancel)
            .await
            .unwrap();
        assert_eq!(outcome, TranscodeOutcome::Succeeded);

        let fail = Transcoder::new("false", vec![], vec![]);
        let outcome = fail
            .run(Path::new("a"), Path::new("b"), &cancel)
            .await
            .unwrap();
        assert!(matches!(outcome, TranscodeOutcome::Failed(s) if !s.success()));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_cancel_kills_child() {
        // `-i <input> <output>` end up as positional parameters of the script.
        let transcoder = Transcoder::new(
            "sh",
            vec!["-c".to_string(), "exec sleep 30".to_string()],
            vec![],
        );
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let started = std::time::Instant::now();
        let outcome = transcoder
            .run(Path::new("a"), Path::new("b"), &cancel)
            .await
            .unwrap();
        assert_eq!(outcome, TranscodeOutcome::Interrupted);
        assert!(started.elapsed() < std::time::Duration::from_secs(10));
    }
}
