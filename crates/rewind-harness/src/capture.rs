#![forbid(unsafe_code)]

//! Capture of `tracing` spans and events.
//!
//! ```ignore
//! let (_, logs) = capture_logs(|| {
//!     undo.undo(Target::Global).unwrap();
//! });
//! assert!(logs.events_for("rewind::undo").iter().any(|e| e.message == "step replayed"));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id, Record};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

/// A span seen by [`LogCapture`].
#[derive(Debug, Clone)]
pub struct CapturedSpan {
    pub name: String,
    pub target: String,
    pub level: Level,
    pub fields: HashMap<String, String>,
    pub parent_name: Option<String>,
}

/// An event seen by [`LogCapture`].
#[derive(Debug, Clone)]
pub struct CapturedEvent {
    pub level: Level,
    pub target: String,
    pub message: String,
    pub fields: HashMap<String, String>,
    pub parent_span_name: Option<String>,
}

impl CapturedEvent {
    /// Value of a structured field, as formatted by the visitor.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

#[derive(Default)]
struct Captured {
    spans: Vec<CapturedSpan>,
    events: Vec<CapturedEvent>,
    span_index: HashMap<u64, usize>,
}

/// Layer that stores every span and event it sees.
#[derive(Clone, Default)]
pub struct LogCapture {
    captured: Arc<Mutex<Captured>>,
}

impl fmt::Debug for LogCapture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogCapture").finish_non_exhaustive()
    }
}

impl LogCapture {
    /// Create a layer and a handle reading what it captures.
    #[must_use]
    pub fn new() -> (Self, CaptureHandle) {
        let layer = Self::default();
        let handle = CaptureHandle {
            captured: layer.captured.clone(),
        };
        (layer, handle)
    }

    fn with<R>(&self, f: impl FnOnce(&mut Captured) -> R) -> R {
        f(&mut self.captured.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

/// Read side of a [`LogCapture`].
#[derive(Clone)]
pub struct CaptureHandle {
    captured: Arc<Mutex<Captured>>,
}

impl fmt::Debug for CaptureHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureHandle")
            .field("spans", &self.spans().len())
            .field("events", &self.events().len())
            .finish()
    }
}

impl CaptureHandle {
    #[must_use]
    pub fn spans(&self) -> Vec<CapturedSpan> {
        self.captured
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .spans
            .clone()
    }

    #[must_use]
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.captured
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .events
            .clone()
    }

    /// Events whose target is `target`.
    #[must_use]
    pub fn events_for(&self, target: &str) -> Vec<CapturedEvent> {
        self.events()
            .into_iter()
            .filter(|event| event.target == target)
            .collect()
    }

    /// Whether an event with `message` was logged under `target`.
    #[must_use]
    pub fn saw(&self, target: &str, message: &str) -> bool {
        self.events()
            .iter()
            .any(|event| event.target == target && event.message == message)
    }
}

struct FieldVisitor(Vec<(String, String)>);

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0.push((field.name().to_string(), format!("{value:?}")));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.0.push((field.name().to_string(), value.to_string()));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.0.push((field.name().to_string(), value.to_string()));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.push((field.name().to_string(), value.to_string()));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.0.push((field.name().to_string(), value.to_string()));
    }
}

impl<S> Layer<S> for LogCapture
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor(Vec::new());
        attrs.record(&mut visitor);
        let parent_name = ctx
            .current_span()
            .id()
            .and_then(|pid| ctx.span(pid))
            .map(|span| span.name().to_string());

        self.with(|captured| {
            let index = captured.spans.len();
            captured.spans.push(CapturedSpan {
                name: attrs.metadata().name().to_string(),
                target: attrs.metadata().target().to_string(),
                level: *attrs.metadata().level(),
                fields: visitor.0.into_iter().collect(),
                parent_name,
            });
            captured.span_index.insert(id.into_u64(), index);
        });
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, _ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor(Vec::new());
        values.record(&mut visitor);
        self.with(|captured| {
            let Some(&index) = captured.span_index.get(&id.into_u64()) else {
                return;
            };
            if let Some(span) = captured.spans.get_mut(index) {
                span.fields.extend(visitor.0);
            }
        });
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor(Vec::new());
        event.record(&mut visitor);
        let mut fields: HashMap<String, String> = visitor.0.into_iter().collect();
        let message = fields.remove("message").unwrap_or_default();
        let parent_span_name = ctx
            .event_span(event)
            .map(|span| span.name().to_string());

        self.with(|captured| {
            captured.events.push(CapturedEvent {
                level: *event.metadata().level(),
                target: event.metadata().target().to_string(),
                message,
                fields,
                parent_span_name,
            });
        });
    }
}

/// Run `f` with a capturing subscriber installed for the current thread.
pub fn capture_logs<R>(f: impl FnOnce() -> R) -> (R, CaptureHandle) {
    let (layer, handle) = LogCapture::new();
    let subscriber = tracing_subscriber::registry()
        .with(tracing_subscriber::filter::LevelFilter::TRACE)
        .with(layer);
    let result = tracing::subscriber::with_default(subscriber, f);
    (result, handle)
}
