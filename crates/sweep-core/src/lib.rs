pub mod cli;
pub mod collection;
pub mod commands;
pub mod config;
pub mod filter;
pub mod ids;
pub mod render;
pub mod store;
pub mod task;

use std::ffi::OsString;
use std::fs::File;
use std::io::{
  self,
  BufReader,
  IsTerminal,
  Write
};

use anyhow::Context;
use tracing::{
  debug,
  info
};

pub use collection::TaskCollection;
pub use filter::ViewFilter;
pub use store::TaskStore;
pub use task::{
  Task,
  TaskId
};

pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let stdout = io::stdout();
  run_with_output(
    raw_args,
    stdout.lock()
  )?;
  Ok(())
}

/// Runs one session writing views to `out` and returns the final store.
#[tracing::instrument(skip_all)]
pub fn run_with_output<W: Write>(
  raw_args: Vec<OsString>,
  out: W
) -> anyhow::Result<TaskStore> {
  let cli =
    cli::GlobalCli::from_args(raw_args)?;
  cli::init_tracing(cli.log_level())?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting sweep"
  );

  let mut cfg = config::Config::load(
    cli.sweeprc.as_deref()
  )?;
  cfg.apply_overrides(cli.overrides)?;
  debug!(?cfg, "effective config");

  let session = commands::Session::new(
    TaskStore::with_filter(
      cfg.default_filter()
    ),
    render::Renderer::new(&cfg),
    out
  )
  .with_auto_list(cfg.auto_list());

  let store = match cli.file {
    | Some(path) => {
      let file = File::open(&path)
        .with_context(|| {
          format!(
            "failed to open {}",
            path.display()
          )
        })?;
      finish(
        session,
        BufReader::new(file)
      )?
    }
    | None => {
      let stdin = io::stdin();
      let prompt = cfg.prompt()
        && stdin.is_terminal();
      finish(
        session.with_prompt(prompt),
        stdin.lock()
      )?
    }
  };

  info!(
    tasks = store.tasks().len(),
    "done"
  );
  Ok(store)
}

fn finish<W: Write, R: io::BufRead>(
  mut session: commands::Session<W>,
  input: R
) -> anyhow::Result<TaskStore> {
  session.run(input)?;
  Ok(session.into_store())
}
