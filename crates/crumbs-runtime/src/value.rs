use std::any::Any;
use std::fmt;
use std::sync::Arc;

trait ErasedValue: Send + Sync {
    fn fmt_display(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result;
    fn as_any(&self) -> &dyn Any;
    fn type_name(&self) -> &'static str;
}

impl<T> ErasedValue for T
where
    T: fmt::Display + Send + Sync + 'static,
{
    fn fmt_display(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

/// A type-erased value held by one context frame.
///
/// Frames pushed from different call sites carry different static types, so the
/// stack stores them behind an `Arc`. Cloning a `FrameValue` is a refcount bump.
/// The null value stands for "nothing was pushed here" and renders as `null`
/// under the default formatter.
#[derive(Clone)]
pub struct FrameValue {
    inner: Option<Arc<dyn ErasedValue>>,
}

impl FrameValue {
    pub fn new<T>(value: T) -> Self
    where
        T: fmt::Display + Send + Sync + 'static,
    {
        Self {
            inner: Some(Arc::new(value)),
        }
    }

    pub const fn null() -> Self {
        Self { inner: None }
    }

    pub fn is_null(&self) -> bool {
        self.inner.is_none()
    }

    /// Returns the payload if it was pushed as a `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.as_deref()?.as_any().downcast_ref::<T>()
    }

    pub fn is<T: Any>(&self) -> bool {
        self.downcast_ref::<T>().is_some()
    }

    /// Name of the pushed type, `None` for the null value.
    pub fn type_name(&self) -> Option<&'static str> {
        self.inner.as_deref().map(ErasedValue::type_name)
    }
}

impl fmt::Display for FrameValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.as_deref() {
            Some(value) => value.fmt_display(f),
            None => f.write_str("null"),
        }
    }
}

impl fmt::Debug for FrameValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.as_deref() {
            Some(value) => f
                .debug_tuple("FrameValue")
                .field(&self.to_string())
                .field(&value.type_name())
                .finish(),
            None => f.write_str("FrameValue(null)"),
        }
    }
}

/// Converts frame values to text.
///
/// Implemented for closures, so a one-off formatter can be written inline:
///
/// ```
/// use std::fmt::{self, Write as _};
/// use crumbs_runtime::{FrameValue, ValueFormatter};
///
/// let upper = |value: &FrameValue, out: &mut dyn fmt::Write| -> fmt::Result {
///     write!(out, "{}", value.to_string().to_uppercase())
/// };
/// let mut text = String::new();
/// upper.format_value(&FrameValue::new("step"), &mut text).unwrap();
/// assert_eq!(text, "STEP");
/// ```
pub trait ValueFormatter: Send + Sync {
    fn format_value(&self, value: &FrameValue, out: &mut dyn fmt::Write) -> fmt::Result;
}

impl<F> ValueFormatter for F
where
    F: Fn(&FrameValue, &mut dyn fmt::Write) -> fmt::Result + Send + Sync,
{
    fn format_value(&self, value: &FrameValue, out: &mut dyn fmt::Write) -> fmt::Result {
        self(value, out)
    }
}

/// The fallback formatter: the value's own `Display`, or `null`.
#[derive(Clone, Copy, Debug, Default)]
pub struct DisplayFormatter;

impl ValueFormatter for DisplayFormatter {
    fn format_value(&self, value: &FrameValue, out: &mut dyn fmt::Write) -> fmt::Result {
        write!(out, "{value}")
    }
}

pub(crate) fn write_value(
    formatter: Option<&dyn ValueFormatter>,
    value: &FrameValue,
    out: &mut dyn fmt::Write,
) -> fmt::Result {
    formatter
        .unwrap_or(&DisplayFormatter)
        .format_value(value, out)
}

/// Renders `value` through `formatter`, falling back to [`DisplayFormatter`].
pub fn convert_to_string(value: &FrameValue, formatter: Option<&dyn ValueFormatter>) -> String {
    let mut text = String::new();
    // Writing into a String only fails if the formatter itself reports an error,
    // in which case whatever it wrote so far is kept.
    let _ = write_value(formatter, value, &mut text);
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct RequestId(u64);

    impl fmt::Display for RequestId {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "RequestId={}", self.0)
        }
    }

    #[test]
    fn default_conversion_uses_display() {
        let value = FrameValue::new(RequestId(42));
        assert_eq!(convert_to_string(&value, None), "RequestId=42");
    }

    #[test]
    fn null_renders_as_literal_null() {
        let value = FrameValue::null();
        assert!(value.is_null());
        assert_eq!(value.type_name(), None);
        assert_eq!(convert_to_string(&value, None), "null");
    }

    #[test]
    fn injected_formatter_wins_over_display() {
        let value = FrameValue::new(RequestId(7));
        let bracketed = |value: &FrameValue, out: &mut dyn fmt::Write| -> fmt::Result {
            match value.downcast_ref::<RequestId>() {
                Some(id) => write!(out, "<{}>", id.0),
                None => write!(out, "{value}"),
            }
        };
        assert_eq!(convert_to_string(&value, Some(&bracketed)), "<7>");
        assert_eq!(
            convert_to_string(&FrameValue::new("plain"), Some(&bracketed)),
            "plain"
        );
    }

    #[test]
    fn downcast_recovers_the_pushed_type() {
        let value = FrameValue::new(RequestId(3));
        assert!(value.is::<RequestId>());
        assert!(!value.is::<String>());
        assert_eq!(value.downcast_ref::<RequestId>(), Some(&RequestId(3)));
        assert!(
            value
                .type_name()
                .expect("non-null value has a type name")
                .ends_with("RequestId")
        );
    }
}
