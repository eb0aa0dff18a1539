use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

pub type ChangeListener = Box<dyn Fn() + Send + Sync>;

/// Handle returned by [`TextSource::subscribe`], used to remove the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// The editable text widget, as seen by the engine.
///
/// Implementations fire every subscribed listener after each edit. Undo
/// history, selection and rendering stay on the widget's side.
pub trait TextSource: Send + Sync + 'static {
    fn text(&self) -> String;

    fn replace_text(&self, text: &str);

    /// Puts the caret at a byte offset and scrolls it into view.
    fn move_caret(&self, offset: usize);

    fn subscribe(&self, listener: ChangeListener) -> SubscriptionId;

    /// Removes a listener. Unknown ids are ignored.
    fn unsubscribe(&self, id: SubscriptionId);
}

/// In-memory text source used by the headless binary and the tests.
#[derive(Default)]
pub struct TextBuffer {
    text: RwLock<String>,
    caret: AtomicUsize,
    listeners: Mutex<Vec<(SubscriptionId, ChangeListener)>>,
    next_id: AtomicU64,
}

impl TextBuffer {
    pub fn new(text: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            text: RwLock::new(text.into()),
            ..Self::default()
        })
    }

    /// Applies an edit in place, then notifies listeners.
    pub fn edit(&self, f: impl FnOnce(&mut String)) {
        {
            let mut guard = self.text.write();
            f(&mut guard);
        } // guard dropped before listeners run
        self.notify();
    }

    pub fn insert(&self, offset: usize, s: &str) {
        self.edit(|text| {
            let at = floor_char_boundary(text, offset);
            text.insert_str(at, s);
        });
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    pub fn caret(&self) -> usize {
        self.caret.load(Ordering::SeqCst)
    }

    fn notify(&self) {
        for (_, listener) in self.listeners.lock().iter() {
            listener();
        }
    }
}

impl TextSource for TextBuffer {
    fn text(&self) -> String {
        self.text.read().clone()
    }

    fn replace_text(&self, text: &str) {
        self.edit(|current| {
            current.clear();
            current.push_str(text);
        });
    }

    fn move_caret(&self, offset: usize) {
        let len = self.text.read().len();
        self.caret.store(offset.min(len), Ordering::SeqCst);
    }

    fn subscribe(&self, listener: ChangeListener) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().push((id, listener));
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.listeners.lock().retain(|(existing, _)| *existing != id);
    }
}

fn floor_char_boundary(text: &str, offset: usize) -> usize {
    let mut at = offset.min(text.len());
    while !text.is_char_boundary(at) {
        at -= 1;
    }
    at
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edits_notify_listeners() {
        let buffer = TextBuffer::new("{}");
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        buffer.subscribe(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        buffer.insert(1, "\"a\": 1");
        buffer.replace_text("[]");
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert_eq!(buffer.text(), "[]");
    }

    #[test]
    fn unsubscribed_listener_is_not_called() {
        let buffer = TextBuffer::new("[]");
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let id = buffer.subscribe(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        let other = buffer.subscribe(Box::new(|| {}));
        assert_ne!(id, other);

        buffer.replace_text("[1]");
        buffer.unsubscribe(id);
        buffer.replace_text("[2]");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(buffer.listener_count(), 1);
    }

    #[test]
    fn caret_is_clamped() {
        let buffer = TextBuffer::new("[1]");
        buffer.move_caret(99);
        assert_eq!(buffer.caret(), 3);
    }

    #[test]
    fn insert_snaps_to_char_boundary() {
        let buffer = TextBuffer::new("é");
        buffer.insert(1, "x");
        assert_eq!(buffer.text(), "xé");
    }
}
