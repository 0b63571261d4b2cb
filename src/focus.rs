use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::block::BlockId;
use crate::caret::{self, TextSurface};
use crate::interpreter::FocusRequest;

pub type Task = Box<dyn FnOnce() + 'static>;

pub trait Scheduler {
    fn defer(&self, task: Task);
}

/// Runs tasks on the browser's next macrotask (`setTimeout(0)`).
#[derive(Clone, Copy, Debug, Default)]
pub struct TimeoutScheduler;

impl Scheduler for TimeoutScheduler {
    fn defer(&self, task: Task) {
        use wasm_bindgen::closure::Closure;
        use wasm_bindgen::JsCast;

        let Some(window) = web_sys::window() else {
            leptos::logging::warn!("no window; running focus task inline");
            task();
            return;
        };
        let callback = Closure::once_into_js(move || task());
        if let Err(err) = window
            .set_timeout_with_callback_and_timeout_and_arguments_0(callback.unchecked_ref(), 0)
        {
            leptos::logging::error!("failed to schedule focus task: {err:?}");
        }
    }
}

/// FIFO queue drained explicitly by the owner.
#[derive(Clone, Default)]
pub struct QueueScheduler {
    pending: Rc<RefCell<VecDeque<Task>>>,
}

impl QueueScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.pending.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.borrow().is_empty()
    }

    /// Runs queued tasks in order, including ones they enqueue. Returns how many ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        loop {
            let next = self.pending.borrow_mut().pop_front();
            let Some(task) = next else {
                return ran;
            };
            task();
            ran += 1;
        }
    }
}

impl Scheduler for QueueScheduler {
    fn defer(&self, task: Task) {
        self.pending.borrow_mut().push_back(task);
    }
}

/// A surface that can also take keyboard focus.
pub trait Focusable: TextSurface {
    fn focus(&self);
}

/// Activates the requested block, focuses its surface and places the caret.
///
/// `activate` runs first and must report whether the block still exists;
/// returns `false` when it does not or when no surface is rendered for it.
pub fn apply_focus<S, A>(request: &FocusRequest, activate: A, surface: Option<S>) -> bool
where
    S: Focusable,
    A: FnOnce(&BlockId) -> bool,
{
    if !activate(&request.block) {
        return false;
    }
    let Some(mut surface) = surface else {
        return false;
    };
    surface.focus();
    caret::set_caret_at_offset(&mut surface, request.offset);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockType;
    use crate::caret::{MarkupSurface, Selection};
    use crate::store::BlockStore;

    #[test]
    fn queue_runs_in_order_and_only_when_drained() {
        let scheduler = QueueScheduler::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        for n in 0..3 {
            let log = log.clone();
            scheduler.defer(Box::new(move || log.borrow_mut().push(n)));
        }
        assert!(log.borrow().is_empty());
        assert_eq!(scheduler.len(), 3);

        assert_eq!(scheduler.run_pending(), 3);
        assert_eq!(*log.borrow(), vec![0, 1, 2]);
        assert!(scheduler.is_empty());
    }

    #[test]
    fn tasks_enqueued_while_draining_also_run() {
        let scheduler = QueueScheduler::new();
        let hits = Rc::new(RefCell::new(0));
        let inner_scheduler = scheduler.clone();
        let inner_hits = hits.clone();
        scheduler.defer(Box::new(move || {
            *inner_hits.borrow_mut() += 1;
            let again = inner_hits.clone();
            inner_scheduler.defer(Box::new(move || *again.borrow_mut() += 1));
        }));
        assert_eq!(scheduler.run_pending(), 2);
        assert_eq!(*hits.borrow(), 2);
    }

    #[test]
    fn apply_focus_activates_then_places_clamped_caret() {
        let mut store = BlockStore::new();
        let id = store.append(BlockType::Paragraph);
        let probe = Rc::new(RefCell::new(Probe::default()));

        let ok = apply_focus(
            &FocusRequest {
                block: id.clone(),
                offset: 10,
            },
            |target| store.set_active(target),
            Some(RecordingSurface(MarkupSurface::new("abc"), probe.clone())),
        );

        assert!(ok);
        assert_eq!(store.active(), &id);
        assert_eq!(probe.borrow().focused, 1);
        assert_eq!(probe.borrow().selection, Some(Selection::cursor(3)));
    }

    #[test]
    fn apply_focus_on_missing_block_fails() {
        let mut store = BlockStore::new();
        let probe = Rc::new(RefCell::new(Probe::default()));
        let ok = apply_focus(
            &FocusRequest {
                block: BlockId::from("gone"),
                offset: 0,
            },
            |target| store.set_active(target),
            Some(RecordingSurface(MarkupSurface::new(""), probe.clone())),
        );
        assert!(!ok);
        assert_eq!(probe.borrow().focused, 0);
    }

    #[derive(Default)]
    struct Probe {
        focused: usize,
        selection: Option<Selection>,
    }

    struct RecordingSurface(MarkupSurface, Rc<RefCell<Probe>>);

    impl TextSurface for RecordingSurface {
        fn plain_text(&self) -> String {
            self.0.plain_text()
        }
        fn markup(&self) -> String {
            self.0.markup()
        }
        fn set_markup(&mut self, html: &str) {
            self.0.set_markup(html)
        }
        fn selection(&self) -> Option<Selection> {
            self.0.selection()
        }
        fn set_selection(&mut self, selection: Selection) {
            self.0.set_selection(selection);
            self.1.borrow_mut().selection = self.0.selection();
        }
    }

    impl Focusable for RecordingSurface {
        fn focus(&self) {
            self.1.borrow_mut().focused += 1;
        }
    }
}
