use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Parser};
use tracing::debug;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "sweep",
    version,
    about = "Sweep: a single-list task editor with a trash can",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    /// More log output on stderr; repeat for more.
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    /// Less log output on stderr; repeat for less.
    #[arg(short = 'q', long = "quiet", action = ArgAction::Count)]
    pub quiet: u8,

    /// Override one setting, e.g. `--rc color=off`.
    #[arg(
        long = "rc",
        value_name = "KEY=VALUE",
        value_parser = parse_override,
        action = ArgAction::Append
    )]
    pub overrides: Vec<(String, String)>,

    /// Settings file to read instead of `$SWEEPRC` or `~/.sweeprc`.
    #[arg(long = "sweeprc", value_name = "PATH")]
    pub sweeprc: Option<PathBuf>,

    /// Read commands from this file instead of stdin.
    #[arg(long = "file", short = 'f', value_name = "PATH")]
    pub file: Option<PathBuf>,
}

impl GlobalCli {
    /// Parses the process arguments after [`normalize_args`]. `--help` and
    /// `--version` print and exit.
    pub fn from_args(raw: Vec<OsString>) -> anyhow::Result<Self> {
        match Self::try_parse_from(normalize_args(raw)) {
            Ok(cli) => Ok(cli),
            Err(err) if !err.use_stderr() => err.exit(),
            Err(err) => Err(err.into()),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        log_level(self.verbose, self.quiet)
    }
}

/// Splits `KEY=VALUE` or `KEY:VALUE` at whichever separator comes first.
pub fn parse_override(raw: &str) -> anyhow::Result<(String, String)> {
    let split = raw
        .find(['=', ':'])
        .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {raw}"))?;
    let key = raw[..split].trim();
    if key.is_empty() {
        return Err(anyhow!("missing key in override: {raw}"));
    }
    Ok((key.to_string(), raw[split + 1..].trim().to_string()))
}

/// Rewrites bare `rc.KEY=VALUE` arguments into `--rc KEY=VALUE` so clap
/// sees a single form.
pub fn normalize_args(raw: Vec<OsString>) -> Vec<OsString> {
    let mut out = Vec::with_capacity(raw.len());
    for (idx, arg) in raw.into_iter().enumerate() {
        let bare = (idx > 0)
            .then(|| arg.to_str())
            .flatten()
            .and_then(|s| s.strip_prefix("rc."))
            .filter(|rest| rest.contains(['=', ':']))
            .map(str::to_string);

        match bare {
            Some(setting) => {
                debug!(%setting, "positional override");
                out.push(OsString::from("--rc"));
                out.push(OsString::from(setting));
            }
            None => out.push(arg),
        }
    }
    out
}

/// Net verbosity: each `-v` raises the level by one step from `warn`,
/// each `-q` lowers it.
pub fn log_level(verbose: u8, quiet: u8) -> LevelFilter {
    match i16::from(verbose) - i16::from(quiet) {
        ..=-2 => LevelFilter::OFF,
        -1 => LevelFilter::ERROR,
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Logs go to stderr so they never mix with rendered views. `RUST_LOG`
/// takes precedence over `level`.
pub fn init_tracing(level: LevelFilter) -> anyhow::Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env()
        .map_err(|e| anyhow!("invalid RUST_LOG: {e}"))?;

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();
    if let Err(err) = installed {
        debug!(error = %err, "subscriber already installed");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::ffi::OsString;

    use tracing_subscriber::filter::LevelFilter;

    use super::{GlobalCli, log_level, normalize_args, parse_override};

    fn args(raw: &[&str]) -> Vec<OsString> {
        raw.iter().map(OsString::from).collect()
    }

    #[test]
    fn positional_overrides_become_flags() {
        let normalized = normalize_args(args(&[
            "sweep",
            "rc.color=off",
            "-v",
            "rc.default.filter:trash",
            "rc.nothing",
        ]));

        assert_eq!(
            normalized,
            args(&[
                "sweep",
                "--rc",
                "color=off",
                "-v",
                "--rc",
                "default.filter:trash",
                "rc.nothing",
            ])
        );
    }

    #[test]
    fn override_splits_at_first_separator() {
        assert_eq!(
            parse_override("default.filter:trash").expect("colon"),
            ("default.filter".to_string(), "trash".to_string())
        );
        assert_eq!(
            parse_override(" prompt = a:b ").expect("equals"),
            ("prompt".to_string(), "a:b".to_string())
        );
        assert!(parse_override("nokey").is_err());
        assert!(parse_override("=on").is_err());
    }

    #[test]
    fn parses_flags_and_positional_overrides() {
        let cli = GlobalCli::from_args(args(&[
            "sweep",
            "-vv",
            "--rc",
            "auto.list=off",
            "rc.color=off",
            "--file",
            "session.txt",
        ]))
        .expect("parse");

        assert_eq!(cli.verbose, 2);
        assert_eq!(
            cli.overrides,
            vec![
                ("auto.list".to_string(), "off".to_string()),
                ("color".to_string(), "off".to_string()),
            ]
        );
        assert_eq!(
            cli.file.as_deref().and_then(|p| p.to_str()),
            Some("session.txt")
        );
        assert_eq!(cli.log_level(), LevelFilter::DEBUG);
    }

    #[test]
    fn rejects_bad_override() {
        assert!(GlobalCli::from_args(args(&["sweep", "--rc", "nokey"])).is_err());
    }

    #[test]
    fn verbose_and_quiet_cancel_out() {
        assert_eq!(log_level(0, 0), LevelFilter::WARN);
        assert_eq!(log_level(2, 2), LevelFilter::WARN);
        assert_eq!(log_level(1, 0), LevelFilter::INFO);
        assert_eq!(log_level(0, 1), LevelFilter::ERROR);
        assert_eq!(log_level(0, 5), LevelFilter::OFF);
        assert_eq!(log_level(9, 0), LevelFilter::TRACE);
    }
}
