use std::io::{BufRead, Write};

use anyhow::{Context, anyhow};
use tracing::{debug, info, instrument, warn};

use crate::filter::ViewFilter;
use crate::render::Renderer;
use crate::store::TaskStore;
use crate::task::{Task, TaskId};

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "add", "draft", "submit", "edit", "done", "toggle", "trash", "restore", "purge", "filter",
        "list", "export", "reset", "help", "quit", "exit",
    ]
}

pub fn expand_command_abbrev<'a>(token: &'a str, known: &[&'a str]) -> Option<&'a str> {
    if known.contains(&token) {
        return Some(token);
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Add(String),
    Draft(String),
    Submit,
    Edit { id: TaskId, text: String },
    ToggleDone(TaskId),
    ToggleTrashed(TaskId),
    Purge,
    Filter(ViewFilter),
    List,
    Export,
    Reset,
    Help,
    Quit,
}

impl Command {
    /// Parses one input line. Blank lines and `#` comments yield `None`.
    pub fn parse(line: &str) -> anyhow::Result<Option<Self>> {
        let line = line.trim_start();
        if line.trim().is_empty() || line.starts_with('#') {
            return Ok(None);
        }

        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest),
            None => (line, ""),
        };
        let known = known_command_names();
        let command = expand_command_abbrev(word, &known)
            .ok_or_else(|| anyhow!("unknown or ambiguous command: {word}"))?;
        debug!(token = %word, expanded = %command, "resolved command token");

        let parsed = match command {
            "add" => Command::Add(rest.trim().to_string()),
            "draft" => Command::Draft(rest.trim().to_string()),
            "submit" => Command::Submit,
            "edit" => {
                let rest = rest.trim_start();
                let (raw_id, text) = match rest.split_once(char::is_whitespace) {
                    Some((raw_id, text)) => (raw_id, text.trim()),
                    None => (rest, ""),
                };
                Command::Edit {
                    id: parse_id(raw_id)?,
                    text: text.to_string(),
                }
            }
            "done" | "toggle" => Command::ToggleDone(parse_id(rest)?),
            "trash" | "restore" => Command::ToggleTrashed(parse_id(rest)?),
            "purge" => Command::Purge,
            "filter" => Command::Filter(rest.parse()?),
            "list" => Command::List,
            "export" => Command::Export,
            "reset" => Command::Reset,
            "help" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => return Err(anyhow!("unhandled command: {other}")),
        };

        Ok(Some(parsed))
    }

    fn mutates(&self) -> bool {
        !matches!(
            self,
            Command::Filter(_) | Command::List | Command::Export | Command::Help | Command::Quit
        )
    }
}

fn parse_id(raw: &str) -> anyhow::Result<TaskId> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(anyhow!("missing task id"));
    }
    raw.parse()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Line-oriented host around a [`TaskStore`]: reads a command, calls the
/// store, re-renders the view.
pub struct Session<W: Write> {
    store: TaskStore,
    renderer: Renderer,
    out: W,
    auto_list: bool,
    prompt: bool,
}

impl<W: Write> Session<W> {
    pub fn new(store: TaskStore, renderer: Renderer, out: W) -> Self {
        Self {
            store,
            renderer,
            out,
            auto_list: true,
            prompt: false,
        }
    }

    pub fn with_auto_list(mut self, auto_list: bool) -> Self {
        self.auto_list = auto_list;
        self
    }

    pub fn with_prompt(mut self, prompt: bool) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn into_output(self) -> W {
        self.out
    }

    pub fn into_store(self) -> TaskStore {
        self.store
    }

    /// Runs commands until input ends or `quit`. Malformed commands are
    /// reported on stderr and do not end the session.
    #[instrument(skip_all)]
    pub fn run<R: BufRead>(&mut self, input: R) -> anyhow::Result<()> {
        info!(filter = %self.store.filter(), "session started");
        self.show_prompt()?;

        for (idx, line) in input.lines().enumerate() {
            let line = line.with_context(|| format!("failed reading input line {}", idx + 1))?;
            match self.run_line(&line) {
                Ok(Flow::Quit) => break,
                Ok(Flow::Continue) => {}
                Err(err) => {
                    warn!(line = idx + 1, error = %err, "command failed");
                    eprintln!("error: {err:#}");
                }
            }
            self.show_prompt()?;
        }

        info!(tasks = self.store.tasks().len(), "session ended");
        Ok(())
    }

    pub fn run_line(&mut self, line: &str) -> anyhow::Result<Flow> {
        match Command::parse(line)? {
            Some(command) => self.execute(command),
            None => Ok(Flow::Continue),
        }
    }

    #[instrument(skip(self))]
    pub fn execute(&mut self, command: Command) -> anyhow::Result<Flow> {
        let relist = self.auto_list && command.mutates();

        match command {
            Command::Add(text) => self.cmd_add(&text)?,
            Command::Draft(text) => {
                self.store.set_draft(&text);
                writeln!(self.out, "Draft: {text}")?;
            }
            Command::Submit => self.cmd_submit()?,
            Command::Edit { id, text } => self.cmd_edit(id, &text)?,
            Command::ToggleDone(id) => self.cmd_toggle_done(id)?,
            Command::ToggleTrashed(id) => {
                if self.ensure_known(id)? {
                    self.store.toggle_trashed(id);
                    let trashed = self.store.tasks().get(id).is_some_and(|task| task.trashed);
                    let state = if trashed { "moved to the trash" } else { "restored" };
                    writeln!(self.out, "Task {id} {state}.")?;
                }
            }
            Command::Purge => self.cmd_purge()?,
            Command::Filter(filter) => {
                self.store.set_filter(filter);
                self.list()?;
            }
            Command::List => self.list()?,
            Command::Export => self.cmd_export()?,
            Command::Reset => {
                self.store.reset();
                writeln!(self.out, "Reset.")?;
            }
            Command::Help => self.cmd_help()?,
            Command::Quit => return Ok(Flow::Quit),
        }

        if relist {
            self.list()?;
        }
        Ok(Flow::Continue)
    }

    fn cmd_add(&mut self, text: &str) -> anyhow::Result<()> {
        if !self.store.can_add() {
            writeln!(
                self.out,
                "Adding is not available in the {} view.",
                self.store.filter().label()
            )?;
            return Ok(());
        }
        if text.is_empty() {
            writeln!(self.out, "Nothing to add.")?;
            return Ok(());
        }

        let before = self.store.tasks().len();
        self.store.add(text);
        self.report_created(before)
    }

    fn cmd_submit(&mut self) -> anyhow::Result<()> {
        if !self.store.can_add() {
            writeln!(
                self.out,
                "Adding is not available in the {} view.",
                self.store.filter().label()
            )?;
            return Ok(());
        }
        if self.store.draft().is_empty() {
            writeln!(self.out, "Nothing to add.")?;
            return Ok(());
        }

        let before = self.store.tasks().len();
        self.store.submit_draft();
        self.report_created(before)
    }

    fn cmd_edit(&mut self, id: TaskId, text: &str) -> anyhow::Result<()> {
        if !self.ensure_known(id)? {
            return Ok(());
        }
        if !self.store.can_edit(id) {
            writeln!(
                self.out,
                "Task {id} cannot be edited while completed or in the trash."
            )?;
            return Ok(());
        }

        self.store.edit_text(id, text);
        writeln!(self.out, "Edited task {id}.")?;
        Ok(())
    }

    fn cmd_toggle_done(&mut self, id: TaskId) -> anyhow::Result<()> {
        if !self.ensure_known(id)? {
            return Ok(());
        }
        if !self.store.can_toggle_done(id) {
            writeln!(self.out, "Task {id} is in the trash; restore it first.")?;
            return Ok(());
        }

        self.store.toggle_done(id);
        let done = self.store.tasks().get(id).is_some_and(|task| task.done);
        let state = if done { "completed" } else { "current" };
        writeln!(self.out, "Task {id} is now {state}.")?;
        Ok(())
    }

    fn report_created(&mut self, before: usize) -> anyhow::Result<()> {
        if self.store.tasks().len() == before {
            writeln!(self.out, "No task was created.")?;
            return Ok(());
        }
        if let Some(task) = self.store.tasks().iter().next() {
            writeln!(self.out, "Created task {}.", task.id)?;
        }
        Ok(())
    }

    fn cmd_purge(&mut self) -> anyhow::Result<()> {
        if !self.store.has_trashed() {
            writeln!(self.out, "The trash is empty.")?;
            return Ok(());
        }
        if !self.store.can_purge() {
            writeln!(self.out, "Switch to the trash view to purge (filter trash).")?;
            return Ok(());
        }

        let purged = self.store.counts().trashed;
        self.store.purge_trashed();
        writeln!(self.out, "Purged {purged} task(s).")?;
        Ok(())
    }

    fn cmd_export(&mut self) -> anyhow::Result<()> {
        let view = self.store.view();
        let tasks: Vec<&Task> = view.iter().map(|task| task.as_ref()).collect();
        let json = serde_json::to_string_pretty(&tasks).context("failed to serialize tasks")?;
        writeln!(self.out, "{json}")?;
        Ok(())
    }

    fn cmd_help(&mut self) -> anyhow::Result<()> {
        let lines = [
            "add <text>         add a task",
            "draft <text>       set the draft",
            "submit             add the draft as a task",
            "edit <id> <text>   change a task's text",
            "done <id>          toggle completion (alias: toggle)",
            "trash <id>         toggle trashed (alias: restore)",
            "purge              empty the trash (trash view only)",
            "filter <tag>       all | completed | pending | trashed",
            "list               show the current view",
            "export             print the current view as JSON",
            "reset              drop all tasks",
            "quit               end the session (alias: exit)",
        ];
        for line in lines {
            writeln!(self.out, "{line}")?;
        }
        Ok(())
    }

    fn ensure_known(&mut self, id: TaskId) -> anyhow::Result<bool> {
        if self.store.tasks().contains(id) {
            return Ok(true);
        }
        debug!(%id, "unknown task id");
        writeln!(self.out, "No task {id}.")?;
        Ok(false)
    }

    fn list(&mut self) -> anyhow::Result<()> {
        let view = self.store.view();
        self.renderer
            .write_view(&mut self.out, &self.store.title(), &view, self.store.counts())
    }

    fn show_prompt(&mut self) -> anyhow::Result<()> {
        if self.prompt {
            write!(self.out, "> ")?;
            self.out.flush()?;
        }
        Ok(())
    }
}
