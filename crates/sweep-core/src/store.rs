use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::collection::{TaskCollection, ViewCounts};
use crate::filter::ViewFilter;
use crate::ids::IdAllocator;
use crate::task::{Task, TaskId};

/// Everything the editor shows: the add-form draft, the collection and the
/// active filter.
#[derive(Debug, Clone, Default)]
struct StoreState {
    draft: String,
    tasks: TaskCollection,
    filter: ViewFilter,
}

/// Single owner of the editor state. Each operation replaces the collection
/// with a new one and hands it back; old snapshots stay valid.
#[derive(Debug, Clone, Default)]
pub struct TaskStore {
    state: StoreState,
    ids: IdAllocator,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(filter: ViewFilter) -> Self {
        Self {
            state: StoreState {
                filter,
                ..StoreState::default()
            },
            ids: IdAllocator::new(),
        }
    }

    pub fn tasks(&self) -> &TaskCollection {
        &self.state.tasks
    }

    pub fn filter(&self) -> ViewFilter {
        self.state.filter
    }

    pub fn draft(&self) -> &str {
        &self.state.draft
    }

    pub fn add(&mut self, text: &str) -> TaskCollection {
        self.add_at(text, Utc::now())
    }

    /// Adds with an explicit clock reading for id allocation.
    #[tracing::instrument(skip(self, text, now))]
    pub fn add_at(&mut self, text: &str, now: DateTime<Utc>) -> TaskCollection {
        if text.is_empty() {
            debug!("empty text; nothing added");
            return self.state.tasks.clone();
        }

        let Some(id) = self.ids.next_at(now) else {
            warn!("no task id left; nothing added");
            return self.state.tasks.clone();
        };
        self.state.tasks = self.state.tasks.add(id, text);
        debug!(%id, len = self.state.tasks.len(), "task added");
        self.state.tasks.clone()
    }

    pub fn set_draft(&mut self, text: &str) {
        self.state.draft = text.to_string();
    }

    pub fn submit_draft(&mut self) -> TaskCollection {
        self.submit_draft_at(Utc::now())
    }

    /// Adds the draft as a task and clears it. An empty draft is left as is.
    #[tracing::instrument(skip(self, now))]
    pub fn submit_draft_at(&mut self, now: DateTime<Utc>) -> TaskCollection {
        if self.state.draft.is_empty() {
            debug!("empty draft; nothing submitted");
            return self.state.tasks.clone();
        }

        let before = self.state.tasks.len();
        let draft = std::mem::take(&mut self.state.draft);
        let tasks = self.add_at(&draft, now);
        if tasks.len() == before {
            self.state.draft = draft;
        }
        tasks
    }

    pub fn edit_text(&mut self, id: TaskId, text: &str) -> TaskCollection {
        self.state.tasks = self.state.tasks.edit_text(id, text);
        self.state.tasks.clone()
    }

    pub fn toggle_done(&mut self, id: TaskId) -> TaskCollection {
        self.state.tasks = self.state.tasks.toggle_done(id);
        self.state.tasks.clone()
    }

    pub fn toggle_trashed(&mut self, id: TaskId) -> TaskCollection {
        self.state.tasks = self.state.tasks.toggle_trashed(id);
        self.state.tasks.clone()
    }

    pub fn purge_trashed(&mut self) -> TaskCollection {
        self.state.tasks = self.state.tasks.purge_trashed();
        self.state.tasks.clone()
    }

    /// Empties the collection, clears the draft and selects `All`. The id
    /// allocator keeps running so ids are never reused.
    #[tracing::instrument(skip(self))]
    pub fn reset(&mut self) -> (TaskCollection, ViewFilter) {
        info!(dropped = self.state.tasks.len(), "resetting store");
        self.state = StoreState::default();
        (self.state.tasks.clone(), self.state.filter)
    }

    pub fn set_filter(&mut self, filter: ViewFilter) -> ViewFilter {
        debug!(from = ?self.state.filter, to = ?filter, "filter changed");
        self.state.filter = filter;
        filter
    }

    pub fn view(&self) -> Vec<Arc<Task>> {
        self.state.tasks.view(self.state.filter)
    }

    pub fn title(&self) -> String {
        self.state.filter.title()
    }

    pub fn has_trashed(&self) -> bool {
        self.state.tasks.has_trashed()
    }

    /// Whether the add form is offered under the current filter.
    pub fn can_add(&self) -> bool {
        matches!(self.state.filter, ViewFilter::All | ViewFilter::Pending)
    }

    /// Whether the purge affordance is offered.
    pub fn can_purge(&self) -> bool {
        self.state.filter == ViewFilter::Trashed && self.has_trashed()
    }

    /// Text is editable only while the task is current.
    pub fn can_edit(&self, id: TaskId) -> bool {
        self.state
            .tasks
            .get(id)
            .is_some_and(|task| !task.done && !task.trashed)
    }

    /// Trashed tasks keep their completion state frozen.
    pub fn can_toggle_done(&self, id: TaskId) -> bool {
        self.state.tasks.get(id).is_some_and(|task| !task.trashed)
    }

    pub fn counts(&self) -> ViewCounts {
        self.state.tasks.counts()
    }
}
