use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use serde::{
  Deserialize,
  Serialize
};
use tracing::trace;

use crate::task::Task;

/// Selects which subset of the collection
/// is displayed.
#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ViewFilter {
  #[default]
  All,
  Completed,
  Pending,
  Trashed
}

impl ViewFilter {
  /// Selector order.
  pub const ALL: [ViewFilter; 4] = [
    ViewFilter::All,
    ViewFilter::Completed,
    ViewFilter::Pending,
    ViewFilter::Trashed
  ];

  pub fn matches(
    self,
    task: &Task
  ) -> bool {
    let ok = match self {
      | ViewFilter::All => !task.trashed,
      | ViewFilter::Completed => {
        task.done && !task.trashed
      }
      | ViewFilter::Pending => {
        !task.done && !task.trashed
      }
      | ViewFilter::Trashed => {
        task.trashed
      }
    };

    trace!(filter = ?self, id = %task.id, ok, "filter predicate evaluation");
    ok
  }

  pub fn label(self) -> &'static str {
    match self {
      | ViewFilter::All => "all tasks",
      | ViewFilter::Completed => {
        "completed tasks"
      }
      | ViewFilter::Pending => {
        "current tasks"
      }
      | ViewFilter::Trashed => "trash"
    }
  }

  pub fn title(self) -> String {
    format!("TODO: {}", self.label())
  }

  pub fn tag(self) -> &'static str {
    match self {
      | ViewFilter::All => "all",
      | ViewFilter::Completed => {
        "completed"
      }
      | ViewFilter::Pending => "pending",
      | ViewFilter::Trashed => "trashed"
    }
  }
}

/// Free-function form of
/// [`ViewFilter::label`] for hosts.
pub fn label(
  filter: ViewFilter
) -> &'static str {
  filter.label()
}

impl fmt::Display for ViewFilter {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.tag())
  }
}

impl FromStr for ViewFilter {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    let tag =
      s.trim().to_ascii_lowercase();
    match tag.as_str() {
      | "all" => Ok(ViewFilter::All),
      | "completed" | "done"
      | "checked" => {
        Ok(ViewFilter::Completed)
      }
      | "pending" | "current"
      | "unchecked" => {
        Ok(ViewFilter::Pending)
      }
      | "trashed" | "trash"
      | "removed" => {
        Ok(ViewFilter::Trashed)
      }
      | _ => {
        Err(anyhow!(
          "unknown filter: {s} \
           (expected all, completed, \
           pending or trashed)"
        ))
      }
    }
  }
}
