use std::io::{self, IsTerminal, Write};
use std::sync::Arc;

use unicode_width::UnicodeWidthStr;

use crate::collection::ViewCounts;
use crate::config::Config;
use crate::task::Task;

const BOLD: &str = "1";
const DIM: &str = "2";
const YELLOW: &str = "33";

const HEADERS: [&str; 3] = ["ID", "Done", "Text"];

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    /// Colors only when the config allows it and stdout is a terminal.
    pub fn new(cfg: &Config) -> Self {
        Self {
            color: cfg.color() && io::stdout().is_terminal(),
        }
    }

    pub fn plain() -> Self {
        Self { color: false }
    }

    /// Title line, the task table (or a placeholder) and a counts line.
    pub fn write_view<W: Write>(
        &self,
        mut writer: W,
        title: &str,
        tasks: &[Arc<Task>],
        counts: ViewCounts,
    ) -> anyhow::Result<()> {
        writeln!(writer, "{}", self.paint(title, BOLD))?;

        if tasks.is_empty() {
            writeln!(writer, "{}", self.paint("(no tasks)", DIM))?;
        } else {
            self.write_table(&mut writer, tasks)?;
        }

        writeln!(
            writer,
            "{} task(s): {} current, {} completed, {} in trash",
            counts.all, counts.pending, counts.completed, counts.trashed
        )?;
        Ok(())
    }

    fn write_table<W: Write>(&self, writer: &mut W, tasks: &[Arc<Task>]) -> anyhow::Result<()> {
        let rows: Vec<[String; 3]> = tasks.iter().map(|task| cells(task)).collect();

        let mut widths = HEADERS.map(|header| header.width());
        for row in &rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.width());
            }
        }

        let header = HEADERS.map(|h| (h.to_string(), None));
        writeln!(writer, "{}", self.line(&header, &widths))?;
        let rule = widths.map(|w| ("-".repeat(w), None));
        writeln!(writer, "{}", self.line(&rule, &widths))?;

        for (task, row) in tasks.iter().zip(rows) {
            let [id, done, text] = row;
            let styled = [
                (id, Some(YELLOW)),
                (done, None),
                (text, task.done.then_some(DIM)),
            ];
            writeln!(writer, "{}", self.line(&styled, &widths))?;
        }
        Ok(())
    }

    /// Joins cells with one space. Padding is measured on the plain text
    /// and added after painting; the last column is not padded.
    fn line(&self, cells: &[(String, Option<&str>); 3], widths: &[usize; 3]) -> String {
        let mut out = String::new();
        for (idx, ((text, style), width)) in cells.iter().zip(widths).enumerate() {
            if idx > 0 {
                out.push(' ');
            }
            match style {
                Some(code) => out.push_str(&self.paint(text, code)),
                None => out.push_str(text),
            }
            if idx + 1 < cells.len() {
                out.push_str(&" ".repeat(width.saturating_sub(text.width())));
            }
        }
        out
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || text.is_empty() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn cells(task: &Task) -> [String; 3] {
    let done = if task.done { "x" } else { "" };
    [task.id.to_string(), done.to_string(), task.text.clone()]
}
