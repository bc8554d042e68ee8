use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow
};
use tracing::{
  debug,
  info,
  trace,
  warn
};

use crate::filter::ViewFilter;

/// Editor settings. Built from defaults, then the rc file, then command
/// line overrides; later sources win key by key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
  default_filter: ViewFilter,
  color: bool,
  auto_list: bool,
  prompt: bool,
  source: Option<PathBuf>
}

impl Default for Config {
  fn default() -> Self {
    Self {
      default_filter: ViewFilter::All,
      color: true,
      auto_list: true,
      prompt: true,
      source: None
    }
  }
}

impl Config {
  /// Reads the rc file named by `explicit`, else `$SWEEPRC`, else
  /// `~/.sweeprc` when it exists. An explicit path must be readable.
  #[tracing::instrument(skip(explicit))]
  pub fn load(
    explicit: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = Self::default();
    match locate_rc(explicit) {
      | Some(path) => {
        info!(rc = %path.display(), "reading sweeprc");
        cfg.read_file(&path)?;
      }
      | None => {
        debug!("no sweeprc; using defaults")
      }
    }
    Ok(cfg)
  }

  pub fn default_filter(
    &self
  ) -> ViewFilter {
    self.default_filter
  }

  pub fn color(&self) -> bool {
    self.color
  }

  pub fn auto_list(&self) -> bool {
    self.auto_list
  }

  pub fn prompt(&self) -> bool {
    self.prompt
  }

  /// The rc file the settings were read from, if any.
  pub fn source(
    &self
  ) -> Option<&Path> {
    self.source.as_deref()
  }

  /// Sets one key. A leading `rc.` is accepted; unknown keys are logged
  /// and ignored.
  pub fn set(
    &mut self,
    key: &str,
    value: &str
  ) -> anyhow::Result<()> {
    let key = key
      .strip_prefix("rc.")
      .unwrap_or(key);
    trace!(key, value, "setting");

    match key {
      | "default.filter" => {
        self.default_filter = value
          .parse::<ViewFilter>()
          .with_context(|| {
            format!(
              "invalid default.filter: \
               {value}"
            )
          })?;
      }
      | "color" => {
        self.color =
          parse_switch(key, value)?
      }
      | "auto.list" => {
        self.auto_list =
          parse_switch(key, value)?
      }
      | "prompt" => {
        self.prompt =
          parse_switch(key, value)?
      }
      | other => {
        warn!(key = other, "unknown setting ignored")
      }
    }
    Ok(())
  }

  #[tracing::instrument(skip_all)]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) -> anyhow::Result<()>
  where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (key, value) in overrides {
      debug!(%key, %value, "override");
      self
        .set(&key, &value)
        .with_context(|| {
          format!("override {key}")
        })?;
    }
    Ok(())
  }

  fn read_file(
    &mut self,
    path: &Path
  ) -> anyhow::Result<()> {
    let text = fs::read_to_string(path)
      .with_context(|| {
        format!(
          "failed to read {}",
          path.display()
        )
      })?;

    for (idx, raw) in
      text.lines().enumerate()
    {
      let line = raw
        .split_once('#')
        .map_or(raw, |(kept, _)| kept)
        .trim();
      if line.is_empty() {
        continue;
      }

      let at = format!(
        "{}:{}",
        path.display(),
        idx + 1
      );
      let (key, value) = line
        .split_once('=')
        .ok_or_else(|| {
          anyhow!(
            "{at}: expected KEY = \
             VALUE, got: {}",
            raw.trim()
          )
        })?;
      self
        .set(key.trim(), value.trim())
        .with_context(|| at.clone())?;
    }

    self.source = Some(path.to_path_buf());
    Ok(())
  }
}

fn locate_rc(
  explicit: Option<&Path>
) -> Option<PathBuf> {
  if let Some(path) = explicit {
    return Some(path.to_path_buf());
  }

  if let Ok(env) = std::env::var("SWEEPRC")
  {
    if env.is_empty() || env == "/dev/null"
    {
      return None;
    }
    return Some(PathBuf::from(env));
  }

  let Some(home) = dirs::home_dir() else {
    warn!(
      "no home directory; skipping \
       sweeprc"
    );
    return None;
  };
  let candidate = home.join(".sweeprc");
  candidate.exists().then_some(candidate)
}

fn parse_switch(
  key: &str,
  value: &str
) -> anyhow::Result<bool> {
  match value
    .to_ascii_lowercase()
    .as_str()
  {
    | "on" | "yes" | "true" | "1" => {
      Ok(true)
    }
    | "off" | "no" | "false" | "0" => {
      Ok(false)
    }
    | _ => Err(anyhow!(
      "{key} expects on or off, got: \
       {value}"
    ))
  }
}

#[cfg(test)]
mod tests {
  use std::fs;

  use tempfile::tempdir;

  use super::Config;
  use crate::filter::ViewFilter;

  #[test]
  fn defaults_without_file() {
    let cfg = Config::default();
    assert_eq!(
      cfg.default_filter(),
      ViewFilter::All
    );
    assert!(cfg.color());
    assert!(cfg.auto_list());
    assert!(cfg.prompt());
    assert!(cfg.source().is_none());
  }

  #[test]
  fn reads_settings_and_comments() {
    let dir =
      tempdir().expect("tempdir");
    let rc = dir.path().join("sweeprc");
    fs::write(
      &rc,
      "# editor settings\n\
       default.filter = current  # \
       start on open tasks\n\
       \n\
       color=off\n\
       auto.list = No\n"
    )
    .expect("write rc");

    let cfg = Config::load(Some(&rc))
      .expect("load config");

    assert_eq!(
      cfg.default_filter(),
      ViewFilter::Pending
    );
    assert!(!cfg.color());
    assert!(!cfg.auto_list());
    assert!(cfg.prompt());
    assert_eq!(
      cfg.source(),
      Some(rc.as_path())
    );
  }

  #[test]
  fn bad_lines_report_their_location() {
    let dir =
      tempdir().expect("tempdir");
    let rc = dir.path().join("sweeprc");

    fs::write(&rc, "color = on\nbogus\n")
      .expect("write rc");
    let err = Config::load(Some(&rc))
      .expect_err("missing equals");
    assert!(
      err.to_string().contains(":2:")
    );

    fs::write(
      &rc,
      "prompt = on\ncolor = maybe\n"
    )
    .expect("write rc");
    let err = Config::load(Some(&rc))
      .expect_err("bad switch");
    assert!(
      err.to_string().ends_with(":2")
    );
    assert!(
      format!("{err:#}")
        .contains("color expects on or off")
    );
  }

  #[test]
  fn missing_explicit_file_is_an_error() {
    let dir =
      tempdir().expect("tempdir");
    let missing = dir.path().join("nope");
    assert!(
      Config::load(Some(&missing)).is_err()
    );
  }

  #[test]
  fn overrides_strip_rc_prefix() {
    let mut cfg = Config::default();
    cfg
      .apply_overrides(vec![
        (
          "rc.default.filter".to_string(),
          "trash".to_string()
        ),
        (
          "auto.list".to_string(),
          "off".to_string()
        ),
        (
          "rc.colour".to_string(),
          "off".to_string()
        ),
      ])
      .expect("overrides");

    assert_eq!(
      cfg.default_filter(),
      ViewFilter::Trashed
    );
    assert!(!cfg.auto_list());
    assert!(cfg.color(), "unknown key leaves color alone");
  }

  #[test]
  fn invalid_default_filter_is_an_error()
  {
    let mut cfg = Config::default();
    let err = cfg
      .set("default.filter", "someday")
      .expect_err("unknown filter");
    assert!(
      err
        .to_string()
        .contains("invalid default.filter")
    );
    assert_eq!(
      cfg.default_filter(),
      ViewFilter::All
    );
  }
}
