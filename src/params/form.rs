use std::cell::RefCell;
use std::rc::{Rc, Weak};
use tokio::sync::mpsc::UnboundedSender;

// ── Fields ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Slider with a live `(value)` label next to it.
    Range,
    Select,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: Option<String>,
    pub kind: FieldKind,
    pub value: String,
    /// Visible live-value label. Only range fields carry one.
    pub label: Option<String>,
    /// Inclusive integer bounds: the slider extent of a range field, or
    /// the option values of a select. Unbounded fields take any text.
    pub bounds: Option<(i64, i64)>,
}

impl Field {
    pub fn range(name: &str, value: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            kind: FieldKind::Range,
            value: value.to_string(),
            label: Some(range_label(value)),
            bounds: None,
        }
    }

    pub fn select(name: &str, value: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            kind: FieldKind::Select,
            value: value.to_string(),
            label: None,
            bounds: None,
        }
    }

    /// A control with no `name`; it takes input but is never persisted or submitted.
    pub fn unnamed(kind: FieldKind, value: &str) -> Self {
        Self {
            name: None,
            kind,
            value: value.to_string(),
            label: (kind == FieldKind::Range).then(|| range_label(value)),
            bounds: None,
        }
    }

    pub fn with_bounds(mut self, min: i64, max: i64) -> Self {
        self.bounds = Some((min, max));
        self
    }

    pub fn is_named(&self) -> bool {
        self.name.as_deref().is_some_and(|n| !n.is_empty())
    }

    /// The value the control would actually hold after being given `value`.
    ///
    /// Range fields round to a whole step and clamp into their bounds;
    /// select fields only take one of their options. `None` means the
    /// control rejects the value and keeps its current one.
    pub fn accept(&self, value: &str) -> Option<String> {
        let Some((min, max)) = self.bounds else {
            return Some(value.to_string());
        };
        match self.kind {
            FieldKind::Range => {
                let n = value.trim().parse::<f64>().ok().filter(|n| n.is_finite())?;
                Some((n.round() as i64).clamp(min, max).to_string())
            }
            FieldKind::Select => {
                let n = value.trim().parse::<i64>().ok()?;
                (min..=max).contains(&n).then(|| n.to_string())
            }
        }
    }
}

pub fn range_label(value: &str) -> String {
    format!("({})", value)
}

// ── Events ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldEventKind {
    /// Continuous edit, e.g. a slider being dragged.
    Input,
    /// Committed edit.
    Change,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldEvent {
    pub kind: FieldEventKind,
    /// Position of the field in the form.
    pub index: usize,
}

type Listeners = Rc<RefCell<ListenerList>>;

#[derive(Default)]
struct ListenerList {
    next_id: u64,
    senders: Vec<(u64, UnboundedSender<FieldEvent>)>,
}

/// Disposer for a form listener. Dropping it also unsubscribes.
pub struct Subscription {
    id: u64,
    listeners: Weak<RefCell<ListenerList>>,
}

impl Subscription {
    pub fn dispose(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners
                .borrow_mut()
                .senders
                .retain(|(id, _)| *id != self.id);
        }
    }
}

// ── Form ───────────────────────────────────────────────

/// The voice parameter form: an ordered list of range/select controls.
///
/// `input`/`change` model user edits and notify subscribers in order;
/// `set_value` is a programmatic write and is silent.
pub struct ParameterForm {
    fields: Vec<Field>,
    listeners: Listeners,
}

impl ParameterForm {
    pub fn new(fields: Vec<Field>) -> Self {
        Self {
            fields,
            listeners: Rc::new(RefCell::new(ListenerList::default())),
        }
    }

    /// The standard synthesis form with its initial values.
    pub fn yukkuri() -> Self {
        Self::new(yukkuri_fields())
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, index: usize) -> Option<&Field> {
        self.fields.get(index)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields
            .iter()
            .position(|f| f.name.as_deref() == Some(name))
    }

    pub fn value(&self, name: &str) -> Option<&str> {
        self.index_of(name).map(|i| self.fields[i].value.as_str())
    }

    pub fn label(&self, name: &str) -> Option<&str> {
        self.index_of(name)
            .and_then(|i| self.fields[i].label.as_deref())
    }

    /// Named fields as `(name, value)` pairs, in form order.
    pub fn named_values(&self) -> Vec<(String, String)> {
        self.fields
            .iter()
            .filter(|f| f.is_named())
            .filter_map(|f| f.name.clone().map(|n| (n, f.value.clone())))
            .collect()
    }

    /// Programmatic write. Does not emit events or touch the label.
    /// Returns false if the field is missing or rejects the value.
    pub fn set_value(&mut self, index: usize, value: &str) -> bool {
        let Some(field) = self.fields.get_mut(index) else {
            return false;
        };
        match field.accept(value) {
            Some(value) => {
                field.value = value;
                true
            }
            None => false,
        }
    }

    /// Refresh the live label of a range field from its current value.
    pub fn sync_label(&mut self, index: usize) {
        if let Some(field) = self.fields.get_mut(index) {
            if field.kind == FieldKind::Range {
                field.label = Some(range_label(&field.value));
            }
        }
    }

    pub fn subscribe(&self, sender: UnboundedSender<FieldEvent>) -> Subscription {
        let mut list = self.listeners.borrow_mut();
        let id = list.next_id;
        list.next_id += 1;
        list.senders.push((id, sender));
        Subscription {
            id,
            listeners: Rc::downgrade(&self.listeners),
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().senders.len()
    }

    /// User edit by field name. Returns false if no such field exists or
    /// the field rejects the value; a rejected edit emits nothing.
    pub fn input(&mut self, name: &str, value: &str) -> bool {
        self.edit_named(name, value, FieldEventKind::Input)
    }

    pub fn change(&mut self, name: &str, value: &str) -> bool {
        self.edit_named(name, value, FieldEventKind::Change)
    }

    /// User edit by position; the only way to reach an unnamed field.
    pub fn edit_at(&mut self, index: usize, value: &str, kind: FieldEventKind) -> bool {
        let Some(field) = self.fields.get_mut(index) else {
            return false;
        };
        let Some(value) = field.accept(value) else {
            return false;
        };
        field.value = value;
        self.emit(FieldEvent { kind, index });
        true
    }

    fn edit_named(&mut self, name: &str, value: &str, kind: FieldEventKind) -> bool {
        match self.index_of(name) {
            Some(index) => self.edit_at(index, value, kind),
            None => false,
        }
    }

    fn emit(&self, event: FieldEvent) {
        self.listeners
            .borrow_mut()
            .senders
            .retain(|(_, tx)| tx.send(event.clone()).is_ok());
    }
}

/// Controls of the synthesis form with their initial values.
///
/// `type` picks the base voice (0..6 = F1..R2); `bas` the base timbre;
/// the sliders are speed, volume, pitch, accent, low-mid and
/// frequency scale.
pub fn yukkuri_fields() -> Vec<Field> {
    vec![
        Field::select("type", "0").with_bounds(0, 6),
        Field::select("bas", "0").with_bounds(0, 2),
        Field::range("spd", "100").with_bounds(50, 300),
        Field::range("vol", "100").with_bounds(0, 300),
        Field::range("pit", "100").with_bounds(20, 200),
        Field::range("acc", "100").with_bounds(0, 200),
        Field::range("lmd", "100").with_bounds(0, 200),
        Field::range("fsc", "100").with_bounds(50, 200),
    ]
}
