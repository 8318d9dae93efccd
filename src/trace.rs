use std::fmt;
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id, Record};
use tracing::Subscriber;
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Registry;

/// Trace and span identifiers of the current span, plus its attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpanContext {
    pub trace_id: String,
    pub span_id: String,
    pub attributes: Vec<(String, String)>,
}

impl SpanContext {
    /// Both identifiers are non-empty, hexadecimal and not all zeros.
    pub fn is_valid(&self) -> bool {
        fn valid_id(id: &str) -> bool {
            !id.is_empty() && id.bytes().all(|b| b.is_ascii_hexdigit()) && id.bytes().any(|b| b != b'0')
        }
        valid_id(&self.trace_id) && valid_id(&self.span_id)
    }
}

/// Read-only accessor for the span active in a context value.
///
/// The logger never creates or mutates spans; it only asks the context it
/// was handed for identifiers. `()` is the empty background context.
pub trait TraceContext {
    fn span_context(&self, include_attributes: bool) -> Option<SpanContext>;
}

impl TraceContext for () {
    fn span_context(&self, _include_attributes: bool) -> Option<SpanContext> {
        None
    }
}

impl TraceContext for SpanContext {
    fn span_context(&self, include_attributes: bool) -> Option<SpanContext> {
        if !self.is_valid() {
            return None;
        }
        let mut ctx = self.clone();
        if !include_attributes {
            ctx.attributes.clear();
        }
        Some(ctx)
    }
}

impl<T: TraceContext> TraceContext for Option<T> {
    fn span_context(&self, include_attributes: bool) -> Option<SpanContext> {
        self.as_ref().and_then(|ctx| ctx.span_context(include_attributes))
    }
}

impl<T: TraceContext + ?Sized> TraceContext for &T {
    fn span_context(&self, include_attributes: bool) -> Option<SpanContext> {
        (**self).span_context(include_attributes)
    }
}

/// Identifiers come from [`TraceContextLayer`]; spans observed by a
/// subscriber without that layer carry no context.
impl TraceContext for tracing::Span {
    fn span_context(&self, include_attributes: bool) -> Option<SpanContext> {
        self.with_subscriber(|(id, dispatch)| {
            let registry = dispatch.downcast_ref::<Registry>()?;
            let span = registry.span(id)?;
            let extensions = span.extensions();
            let ids = extensions.get::<SpanIds>()?;
            Some(SpanContext {
                trace_id: format!("{:032x}", ids.trace_id),
                span_id: format!("{:016x}", ids.span_id),
                attributes: if include_attributes { ids.attributes.clone() } else { Vec::new() },
            })
        })
        .flatten()
    }
}

#[derive(Debug, Clone)]
struct SpanIds {
    trace_id: u128,
    span_id: u64,
    attributes: Vec<(String, String)>,
}

/// `tracing_subscriber` layer that assigns trace/span identifiers to every
/// new span.
///
/// Root spans start a new random 128-bit trace; child spans inherit the
/// trace id of their parent. Every span gets a random 64-bit span id, and
/// its fields are kept as attributes.
#[derive(Debug, Clone, Copy, Default)]
pub struct TraceContextLayer;

impl TraceContextLayer {
    pub fn new() -> Self {
        TraceContextLayer
    }
}

impl<S> Layer<S> for TraceContextLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let trace_id = span
            .parent()
            .and_then(|parent| {
                let extensions = parent.extensions();
                extensions.get::<SpanIds>().map(|ids| ids.trace_id)
            })
            .unwrap_or_else(|| non_zero(rand::random::<u128>));

        let mut attributes = Vec::new();
        attrs.record(&mut FieldVisitor { fields: &mut attributes });

        span.extensions_mut().insert(SpanIds {
            trace_id,
            span_id: non_zero(rand::random::<u64>),
            attributes,
        });
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut extensions = span.extensions_mut();
        if let Some(ids) = extensions.get_mut::<SpanIds>() {
            values.record(&mut FieldVisitor { fields: &mut ids.attributes });
        }
    }
}

fn non_zero<T: PartialEq + Default>(mut next: impl FnMut() -> T) -> T {
    loop {
        let value = next();
        if value != T::default() {
            return value;
        }
    }
}

struct FieldVisitor<'a> {
    fields: &'a mut Vec<(String, String)>,
}

impl FieldVisitor<'_> {
    fn set(&mut self, field: &Field, value: String) {
        match self.fields.iter_mut().find(|(k, _)| k == field.name()) {
            Some((_, v)) => *v = value,
            None => self.fields.push((field.name().to_string(), value)),
        }
    }
}

impl Visit for FieldVisitor<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.set(field, value.to_string());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.set(field, value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.set(field, value.to_string());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.set(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.set(field, format!("{:?}", value));
    }
}
