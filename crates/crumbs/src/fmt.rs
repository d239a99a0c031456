//! Context prefixes for `tracing-subscriber`'s fmt layer.

use std::fmt::{self, Write as _};

use crumbs_runtime::{RenderOptions, ValueFormatter};
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

/// Wraps an event formatter so each line starts with `[<context>] `.
///
/// The context is read from the flow that emits the event. Lines emitted with an
/// empty stack are left as the inner formatter writes them.
pub struct ContextPrefix<E> {
    inner: E,
    options: RenderOptions,
    formatter: Option<Box<dyn ValueFormatter>>,
}

pub fn with_context<E>(inner: E) -> ContextPrefix<E> {
    ContextPrefix {
        inner,
        options: RenderOptions::default(),
        formatter: None,
    }
}

impl<E> ContextPrefix<E> {
    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_formatter(mut self, formatter: impl ValueFormatter + 'static) -> Self {
        self.formatter = Some(Box::new(formatter));
        self
    }
}

impl<S, N, E> FormatEvent<S, N> for ContextPrefix<E>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
    E: FormatEvent<S, N>,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        if !crumbs_runtime::is_empty() {
            let mut prefix = String::new();
            // A failing value formatter costs the prefix, never the event.
            let rendered = self
                .options
                .append_current(self.formatter.as_deref(), &mut prefix);
            if rendered.is_ok() && !prefix.is_empty() {
                write!(writer, "[{prefix}] ")?;
            }
        }
        self.inner.format_event(ctx, writer, event)
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::Arc;

    use parking_lot::Mutex;
    use tracing_subscriber::Registry;
    use tracing_subscriber::fmt::MakeWriter;
    use tracing_subscriber::fmt::format::{DefaultFields, Format, Full};

    use super::*;
    use crate::{FrameValue, in_current_context, push, spawn};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Captured {
        fn lines(&self) -> Vec<String> {
            String::from_utf8_lossy(&self.0.lock())
                .lines()
                .map(str::to_owned)
                .collect()
        }
    }

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Captured {
        type Writer = Captured;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn plain() -> Format<Full, ()> {
        tracing_subscriber::fmt::format()
            .without_time()
            .with_level(false)
            .with_target(false)
    }

    fn subscriber<E>(
        captured: Captured,
        event_format: E,
    ) -> impl Subscriber + Send + Sync + 'static
    where
        E: FormatEvent<Registry, DefaultFields> + Send + Sync + 'static,
    {
        tracing_subscriber::fmt()
            .with_writer(captured)
            .with_ansi(false)
            .event_format(event_format)
            .finish()
    }

    #[test]
    fn events_are_prefixed_with_the_current_context() {
        crate::clear();
        let captured = Captured::default();
        let subscriber = subscriber(captured.clone(), with_context(plain()));
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("before");
            let _request = push("RequestId=42");
            let _step = push("validate");
            tracing::info!("rejected payload");
        });
        let lines = captured.lines();
        assert_eq!(lines.len(), 2, "{lines:?}");
        assert_eq!(lines[0].trim(), "before");
        assert_eq!(lines[1].trim(), "[validate > RequestId=42] rejected payload");
    }

    #[test]
    fn options_and_formatter_shape_the_prefix() {
        crate::clear();
        let captured = Captured::default();
        let options = RenderOptions {
            top_frames: Some(2),
            bottom_frames: None,
            separator: "/".to_owned(),
        };
        let upper = |value: &FrameValue, out: &mut dyn fmt::Write| -> fmt::Result {
            write!(out, "{}", value.to_string().to_uppercase())
        };
        tracing::subscriber::with_default(
            subscriber(
                captured.clone(),
                with_context(plain())
                    .with_options(options)
                    .with_formatter(upper),
            ),
            || {
                let _guards: Vec<_> = ["a", "b", "c"].into_iter().map(push).collect();
                tracing::info!("deep");
            },
        );
        assert_eq!(captured.lines()[0].trim(), "[C/B] deep");
    }

    #[test]
    fn failing_formatter_drops_the_prefix_but_keeps_the_event() {
        crate::clear();
        let captured = Captured::default();
        let picky = |value: &FrameValue, out: &mut dyn fmt::Write| -> fmt::Result {
            match value.downcast_ref::<&str>() {
                Some(&"unprintable") => Err(fmt::Error),
                _ => write!(out, "{value}"),
            }
        };
        tracing::subscriber::with_default(
            subscriber(captured.clone(), with_context(plain()).with_formatter(picky)),
            || {
                let _bad = push("unprintable");
                let _request = push("request");
                tracing::info!("payload kept");
            },
        );
        let lines = captured.lines();
        assert_eq!(lines.len(), 1, "{lines:?}");
        assert_eq!(lines[0].trim(), "payload kept");
    }

    // Runs on this thread so the per-thread default subscriber sees the task.
    #[tokio::test]
    async fn unscoped_tasks_log_their_own_frames() {
        let captured = Captured::default();
        let _default =
            tracing::subscriber::set_default(subscriber(captured.clone(), with_context(plain())));
        tokio::spawn(async {
            let _task = push("bare-task");
            tokio::task::yield_now().await;
            tracing::info!("from bare task");
        })
        .await
        .expect("task should not panic");
        tracing::info!("from test body");
        let lines = captured.lines();
        assert_eq!(lines.len(), 2, "{lines:?}");
        assert_eq!(lines[0].trim(), "[bare-task] from bare task");
        assert_eq!(lines[1].trim(), "from test body");
    }

    // `set_default` is per-thread, so the spawned task must run on this thread.
    #[tokio::test]
    async fn spawned_tasks_log_their_own_context() {
        let captured = Captured::default();
        let _default =
            tracing::subscriber::set_default(subscriber(captured.clone(), with_context(plain())));
        in_current_context(async {
            let _request = push("request");
            spawn(async {
                let _child = push("child");
                tokio::task::yield_now().await;
                tracing::info!("from child");
            })
            .await
            .expect("child should not panic");
            tracing::info!("from parent");
        })
        .await;
        let lines = captured.lines();
        assert_eq!(lines.len(), 2, "{lines:?}");
        assert_eq!(lines[0].trim(), "[child > request] from child");
        assert_eq!(lines[1].trim(), "[request] from parent");
    }
}
