use std::io::{BufRead, BufReader};
use std::process::{Command, Stdio};

use anyhow::{Context, Result};
use thiserror::Error;

use crate::config::PlayerConfig;

/// Marker the player is told to print in front of its status line.
pub const STATUS_MARKER: &str = "Playback Status:";

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Progress {
    pub position: f64,
    pub duration: f64,
}

#[derive(Debug, Error, PartialEq)]
pub enum StatusLineError {
    #[error("status line has fewer than two fields")]
    MissingFields,
    #[error("invalid number {0:?}")]
    InvalidNumber(String),
}

/// Parse a `Playback Status: <position> <duration>` line.
///
/// Lines without the marker are not status lines and yield `None`.
pub fn parse_status(line: &str) -> Option<Result<Progress, StatusLineError>> {
    let line = line.trim();
    let (_, rest) = line.split_once(STATUS_MARKER)?;
    let fields: Vec<&str> = rest.split_whitespace().collect();
    let &[.., position, duration] = fields.as_slice() else {
        return Some(Err(StatusLineError::MissingFields));
    };
    let number = |field: &str| {
        field
            .parse::<f64>()
            .map_err(|_| StatusLineError::InvalidNumber(field.to_string()))
    };
    Some(number(position).and_then(|position| {
        Ok(Progress {
            position,
            duration: number(duration)?,
        })
    }))
}

/// Run `command` to completion, reporting every status line from its merged output.
///
/// Returns the last progress seen, if any.
pub fn run_player(mut command: Command, on_progress: &mut dyn FnMut(Progress)) -> Result<Option<Progress>> {
    let (reader, writer) = std::io::pipe()?;
    command
        .stdin(Stdio::null())
        .stdout(writer.try_clone()?)
        .stderr(writer);
    let mut child = command
        .spawn()
        .with_context(|| format!("starting {:?}", command.get_program()))?;
    // The command still holds the write end; the reader only sees EOF once it is gone.
    drop(command);

    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    let mut last = None;
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        let text = String::from_utf8_lossy(&buf);
        // Terminal status messages redraw in place with carriage returns.
        for segment in text.split('\r') {
            match parse_status(segment) {
                Some(Ok(progress)) => {
                    on_progress(progress);
                    last = Some(progress);
                }
                Some(Err(err)) => {
                    log::warn!("Error parsing player output ({}): {err}", segment.trim())
                }
                None => {}
            }
        }
    }

    let status = child.wait()?;
    if !status.success() {
        log::warn!("Player exited with {status}");
    }
    Ok(last)
}

/// Something that can play a stream starting at a given offset.
pub trait Player {
    /// Human-readable command line, for the log.
    fn describe(&self, url: &str, start: f64) -> String;

    fn play(&mut self, url: &str, start: f64, on_progress: &mut dyn FnMut(Progress)) -> Result<Option<Progress>>;
}

/// Plays through streamlink, which hands the stream to a terminal player.
pub struct Streamlink {
    config: PlayerConfig,
}

impl Streamlink {
    pub fn new(config: PlayerConfig) -> Self {
        Self { config }
    }

    pub fn args(&self, url: &str, start: f64) -> Vec<String> {
        let mut player_args = vec![
            format!("--start={start:.0}"),
            format!("--term-status-msg \"{STATUS_MARKER} ${{=time-pos}} ${{=duration}}\""),
        ];
        if !self.config.player_args.trim().is_empty() {
            player_args.push(self.config.player_args.trim().to_string());
        }
        player_args.push("{filename}".to_string());
        vec![
            url.to_string(),
            self.config.quality.clone(),
            "--verbose-player".to_string(),
            "--player".to_string(),
            self.config.player.clone(),
            "--player-args".to_string(),
            player_args.join(" "),
        ]
    }

    pub fn command(&self, url: &str, start: f64) -> Command {
        let mut command = Command::new(&self.config.program);
        command.args(self.args(url, start));
        command
    }
}

impl Player for Streamlink {
    fn describe(&self, url: &str, start: f64) -> String {
        format!("$ {} {}", self.config.program, self.args(url, start).join(" "))
    }

    fn play(&mut self, url: &str, start: f64, on_progress: &mut dyn FnMut(Progress)) -> Result<Option<Progress>> {
        run_player(self.command(url, start), on_progress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status_line() {
        assert_eq!(
            parse_status("Playback Status: 12.5 1420.0"),
            Some(Ok(Progress {
                position: 12.5,
                duration: 1420.0
            }))
        );
        assert_eq!(
            parse_status("  [cli][info] Playback Status: 3 1400 \n"),
            Some(Ok(Progress {
                position: 3.0,
                duration: 1400.0
            }))
        );
    }

    #[test]
    fn test_non_status_lines_ignored() {
        assert_eq!(parse_status("[cli][info] Starting player: mpv"), None);
        assert_eq!(parse_status(""), None);
    }

    #[test]
    fn test_malformed_status_lines() {
        assert_eq!(
            parse_status("Playback Status: 12.5"),
            Some(Err(StatusLineError::MissingFields))
        );
        assert_eq!(
            parse_status("Playback Status: 12.5 (unavailable)"),
            Some(Err(StatusLineError::InvalidNumber("(unavailable)".into())))
        );
    }

    #[test]
    fn test_streamlink_args() {
        let player = Streamlink::new(PlayerConfig {
            player_args: String::new(),
            ..PlayerConfig::default()
        });
        let args = player.args("https://example.org/ep1", 95.4);
        assert_eq!(args[0], "https://example.org/ep1");
        assert_eq!(args[1], "best");
        assert_eq!(args[4], "mpv");
        assert_eq!(
            args[6],
            "--start=95 --term-status-msg \"Playback Status: ${=time-pos} ${=duration}\" {filename}"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_run_player_reads_merged_output() {
        let mut command = Command::new("sh");
        command.arg("-c").arg(
            "printf 'Playback Status: 1 100\\rPlayback Status: 2 100\\n'; \
             echo 'Playback Status: oops 100' >&2; \
             echo 'Playback Status: 42 100' >&2",
        );
        let mut seen = Vec::new();
        let last = run_player(command, &mut |p| seen.push(p.position)).unwrap();
        assert_eq!(seen, vec![1.0, 2.0, 42.0]);
        assert_eq!(last.map(|p| p.position), Some(42.0));
    }

    #[cfg(unix)]
    #[test]
    fn test_run_player_without_status() {
        let mut command = Command::new("sh");
        command.arg("-c").arg("echo nothing to see");
        let last = run_player(command, &mut |_| {}).unwrap();
        assert_eq!(last, None);
    }

    #[test]
    fn test_missing_program_is_an_error() {
        let command = Command::new("definitely-not-a-real-player-binary");
        assert!(run_player(command, &mut |_| {}).is_err());
    }
}
