//! Typed in-process dispatch for notice events and display filters.

use tracing::trace;

/// Events published by the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoticeEvent {
    /// A notice was hidden through a dismiss link.
    Dismissed { id: String },
}

impl NoticeEvent {
    pub fn notice_id(&self) -> &str {
        match self {
            NoticeEvent::Dismissed { id } => id,
        }
    }

    /// Action name string-keyed hosts know this event by, e.g.
    /// `everest_forms_hide_update_notice`.
    pub fn legacy_hook_name(&self) -> String {
        match self {
            NoticeEvent::Dismissed { id } => format!("everest_forms_hide_{id}_notice"),
        }
    }
}

type Handler = Box<dyn FnMut(&NoticeEvent)>;
type ShowFilter = Box<dyn Fn(bool, &str) -> bool>;

struct Entry<T> {
    priority: i32,
    seq: usize,
    callback: T,
}

/// Ordered handler and filter lists.
///
/// Callbacks run in ascending priority; equal priorities run in registration
/// order.
#[derive(Default)]
pub struct HookBus {
    handlers: Vec<Entry<Handler>>,
    show_filters: Vec<Entry<ShowFilter>>,
    seq: usize,
}

/// Priority used when callers have no preference.
pub const DEFAULT_PRIORITY: i32 = 10;

impl HookBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for every [`NoticeEvent`].
    pub fn subscribe(&mut self, priority: i32, handler: impl FnMut(&NoticeEvent) + 'static) {
        let seq = self.next_seq();
        insert_sorted(
            &mut self.handlers,
            Entry {
                priority,
                seq,
                callback: Box::new(handler),
            },
        );
    }

    /// Register a filter deciding whether a core notice is shown. Filters get
    /// the running verdict and the notice id.
    pub fn add_show_filter(&mut self, priority: i32, filter: impl Fn(bool, &str) -> bool + 'static) {
        let seq = self.next_seq();
        insert_sorted(
            &mut self.show_filters,
            Entry {
                priority,
                seq,
                callback: Box::new(filter),
            },
        );
    }

    /// Publish `event`; returns how many handlers ran.
    pub fn emit(&mut self, event: &NoticeEvent) -> usize {
        trace!(hook = %event.legacy_hook_name(), handlers = self.handlers.len(), "emit");
        for entry in &mut self.handlers {
            (entry.callback)(event);
        }
        self.handlers.len()
    }

    /// Fold the show filters over `true` for notice `id`.
    pub fn apply_show_notice(&self, id: &str) -> bool {
        self.show_filters
            .iter()
            .fold(true, |show, entry| (entry.callback)(show, id))
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    fn next_seq(&mut self) -> usize {
        self.seq += 1;
        self.seq
    }
}

fn insert_sorted<T>(list: &mut Vec<Entry<T>>, entry: Entry<T>) {
    let pos = list
        .iter()
        .position(|e| (e.priority, e.seq) > (entry.priority, entry.seq))
        .unwrap_or(list.len());
    list.insert(pos, entry);
}
