use std::sync::Arc;

use tracing::debug;

use crate::filter::ViewFilter;
use crate::task::{Task, TaskId};

/// Newest-first sequence of tasks.
///
/// Every operation returns a new collection. The slice of handles is copied
/// on each change; the task records behind them are shared, so a task an
/// operation does not touch keeps its identity, a task it changes is a fresh
/// record, and older snapshots never observe the change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskCollection {
    tasks: Arc<[Arc<Task>]>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewCounts {
    pub all: usize,
    pub completed: usize,
    pub pending: usize,
    pub trashed: usize,
}

impl ViewCounts {
    pub fn get(&self, filter: ViewFilter) -> usize {
        match filter {
            ViewFilter::All => self.all,
            ViewFilter::Completed => self.completed,
            ViewFilter::Pending => self.pending,
            ViewFilter::Trashed => self.trashed,
        }
    }
}

impl TaskCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Task>> {
        self.tasks.iter()
    }

    pub fn get(&self, id: TaskId) -> Option<&Arc<Task>> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.get(id).is_some()
    }

    /// Prepends a new pending task. Empty text and an id already present in
    /// the collection are no-ops.
    #[tracing::instrument(skip(self, text), fields(len = self.len()))]
    pub fn add(&self, id: TaskId, text: &str) -> Self {
        if text.is_empty() {
            debug!("empty text; nothing added");
            return self.clone();
        }
        if self.contains(id) {
            debug!("id already in collection; nothing added");
            return self.clone();
        }

        let mut tasks = Vec::with_capacity(self.len() + 1);
        tasks.push(Arc::new(Task::new_pending(id, text.to_string())));
        tasks.extend(self.tasks.iter().cloned());
        Self {
            tasks: tasks.into(),
        }
    }

    #[tracing::instrument(skip(self, text))]
    pub fn edit_text(&self, id: TaskId, text: &str) -> Self {
        self.replace(id, |task| task.with_text(text.to_string()))
    }

    #[tracing::instrument(skip(self))]
    pub fn toggle_done(&self, id: TaskId) -> Self {
        self.replace(id, Task::with_done_toggled)
    }

    #[tracing::instrument(skip(self))]
    pub fn toggle_trashed(&self, id: TaskId) -> Self {
        self.replace(id, Task::with_trashed_toggled)
    }

    #[tracing::instrument(skip(self))]
    pub fn purge_trashed(&self) -> Self {
        if !self.has_trashed() {
            debug!("nothing trashed; purge is a no-op");
            return self.clone();
        }

        let before = self.len();
        let kept: Vec<Arc<Task>> = self
            .tasks
            .iter()
            .filter(|task| !task.trashed)
            .cloned()
            .collect();
        debug!(before, after = kept.len(), "purged trashed tasks");
        Self { tasks: kept.into() }
    }

    /// Order-preserving projection of the collection through `filter`.
    pub fn view(&self, filter: ViewFilter) -> Vec<Arc<Task>> {
        self.tasks
            .iter()
            .filter(|task| filter.matches(task))
            .cloned()
            .collect()
    }

    pub fn has_trashed(&self) -> bool {
        self.tasks.iter().any(|task| task.trashed)
    }

    pub fn counts(&self) -> ViewCounts {
        let mut counts = ViewCounts::default();
        for task in self.tasks.iter() {
            if task.trashed {
                counts.trashed += 1;
                continue;
            }
            counts.all += 1;
            if task.done {
                counts.completed += 1;
            } else {
                counts.pending += 1;
            }
        }
        counts
    }

    fn replace<F>(&self, id: TaskId, change: F) -> Self
    where
        F: FnOnce(&Task) -> Task,
    {
        let Some(idx) = self.tasks.iter().position(|task| task.id == id) else {
            debug!(%id, "task not found; no-op");
            return self.clone();
        };

        let mut tasks = self.tasks.to_vec();
        tasks[idx] = Arc::new(change(&self.tasks[idx]));
        Self {
            tasks: tasks.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::TaskCollection;
    use crate::filter::ViewFilter;
    use crate::task::{Task, TaskId};

    fn sample() -> TaskCollection {
        TaskCollection::new()
            .add(TaskId(1), "a")
            .add(TaskId(2), "b")
            .add(TaskId(3), "c")
    }

    fn texts(tasks: &[Arc<Task>]) -> Vec<&str> {
        tasks.iter().map(|task| task.text.as_str()).collect()
    }

    #[test]
    fn add_prepends_and_rejects_empty_or_duplicate() {
        let c = sample();
        assert_eq!(texts(&c.view(ViewFilter::All)), vec!["c", "b", "a"]);

        let head = c.iter().next().expect("head");
        assert!(!head.done);
        assert!(!head.trashed);

        assert_eq!(c.add(TaskId(9), ""), c);
        assert_eq!(c.add(TaskId(2), "dup"), c);
    }

    #[test]
    fn edit_keeps_other_tasks_by_identity() {
        let c = sample();
        let edited = c.edit_text(TaskId(2), "");

        assert_eq!(edited.get(TaskId(2)).expect("task 2").text, "");
        assert_eq!(c.get(TaskId(2)).expect("task 2").text, "b");

        let old_one = c.get(TaskId(1)).expect("task 1");
        let new_one = edited.get(TaskId(1)).expect("task 1");
        assert!(Arc::ptr_eq(old_one, new_one));
    }

    #[test]
    fn unknown_id_is_a_no_op() {
        let c = sample();
        assert_eq!(c.toggle_done(TaskId(99)), c);
        assert_eq!(c.toggle_trashed(TaskId(99)), c);
        assert_eq!(c.edit_text(TaskId(99), "x"), c);
    }

    #[test]
    fn double_toggle_restores_state() {
        let c = sample();
        let back = c.toggle_done(TaskId(2)).toggle_done(TaskId(2));
        assert_eq!(back, c);

        let back = c.toggle_trashed(TaskId(3)).toggle_trashed(TaskId(3));
        assert_eq!(back, c);
    }

    #[test]
    fn trashing_does_not_touch_done() {
        let c = sample().toggle_done(TaskId(1)).toggle_trashed(TaskId(1));
        let task = c.get(TaskId(1)).expect("task 1");
        assert!(task.done);
        assert!(task.trashed);
    }

    #[test]
    fn purge_removes_exactly_trashed_and_keeps_order() {
        let c = sample()
            .toggle_trashed(TaskId(2))
            .toggle_done(TaskId(1));
        let purged = c.purge_trashed();

        assert_eq!(texts(&purged.view(ViewFilter::All)), vec!["c", "a"]);
        assert!(!purged.has_trashed());
        assert_eq!(purged.purge_trashed(), purged);
    }

    #[test]
    fn counts_match_views() {
        let c = sample()
            .toggle_done(TaskId(1))
            .toggle_trashed(TaskId(3));
        let counts = c.counts();
        for filter in ViewFilter::ALL {
            assert_eq!(counts.get(filter), c.view(filter).len(), "{filter:?}");
        }
    }
}
