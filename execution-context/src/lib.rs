//! Ambient execution frame
//!
//! Strategies, cached indicator computations and risk validations all need to
//! know which strategy / exchange / backtest frame they are running under,
//! without that identity being threaded through every call. This crate keeps
//! a task-local stack of frames:
//! - `run_scoped` wraps a stream so the frame is active while the stream is
//!   being polled, and only then
//! - `scope` does the same for a single future
//! - `snapshot` / `propagate` carry the active stack into spawned tasks
//!
//! The frame is installed for the duration of each poll and removed when the
//! poll returns (or unwinds), so completion, early `break`, errors, panics and
//! dropping the stream all leave the stack as it was before.

use futures::Stream;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tracing::trace;

tokio::task_local! {
    static ACTIVE: Option<Arc<ActiveFrame>>;
}

/// Identity of the code currently executing
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExecutionFrame {
    pub strategy_name: String,
    pub exchange_name: String,
    pub frame_name: String,
}

impl ExecutionFrame {
    pub fn new(
        strategy_name: impl Into<String>,
        exchange_name: impl Into<String>,
        frame_name: impl Into<String>,
    ) -> Self {
        Self {
            strategy_name: strategy_name.into(),
            exchange_name: exchange_name.into(),
            frame_name: frame_name.into(),
        }
    }

    /// True for the default frame returned when nothing is active
    pub fn is_empty(&self) -> bool {
        self.strategy_name.is_empty() && self.exchange_name.is_empty() && self.frame_name.is_empty()
    }
}

impl fmt::Display for ExecutionFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.strategy_name, self.exchange_name, self.frame_name
        )
    }
}

/// Node of the frame stack: a frame plus the frame it was pushed over
#[derive(Debug)]
pub struct ActiveFrame {
    frame: ExecutionFrame,
    parent: Option<Arc<ActiveFrame>>,
    depth: usize,
}

impl ActiveFrame {
    fn push(frame: ExecutionFrame, parent: Option<Arc<ActiveFrame>>) -> Arc<Self> {
        let depth = parent.as_ref().map_or(1, |p| p.depth + 1);
        Arc::new(Self {
            frame,
            parent,
            depth,
        })
    }

    pub fn frame(&self) -> &ExecutionFrame {
        &self.frame
    }

    pub fn parent(&self) -> Option<&Arc<ActiveFrame>> {
        self.parent.as_ref()
    }

    /// 1 for a root frame
    pub fn depth(&self) -> usize {
        self.depth
    }
}

/// Captured frame stack, used to re-enter the same context in another task
#[derive(Debug, Clone, Default)]
pub struct ContextSnapshot(Option<Arc<ActiveFrame>>);

impl ContextSnapshot {
    pub fn frame(&self) -> ExecutionFrame {
        self.0
            .as_ref()
            .map(|node| node.frame.clone())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }
}

/// Top of the frame stack, if any
pub fn active_frame() -> Option<Arc<ActiveFrame>> {
    ACTIVE.try_with(|active| active.clone()).ok().flatten()
}

/// The active frame, or `ExecutionFrame::default()` when the stack is empty
pub fn current_frame() -> ExecutionFrame {
    active_frame()
        .map(|node| node.frame.clone())
        .unwrap_or_default()
}

/// Number of frames on the stack
pub fn depth() -> usize {
    active_frame().map_or(0, |node| node.depth)
}

pub fn snapshot() -> ContextSnapshot {
    ContextSnapshot(active_frame())
}

/// Run `future` with the frame stack captured in `snapshot`.
///
/// Needed for `tokio::spawn`, since task-locals do not cross task boundaries.
pub fn propagate<F>(snapshot: ContextSnapshot, future: F) -> impl Future<Output = F::Output>
where
    F: Future,
{
    ACTIVE.scope(snapshot.0, future)
}

/// Run `future` with `frame` pushed on top of the current stack
pub async fn scope<F>(frame: ExecutionFrame, future: F) -> F::Output
where
    F: Future,
{
    let node = ActiveFrame::push(frame, active_frame());
    trace!(frame = %node.frame, depth = node.depth, "Entering execution frame");
    ACTIVE.scope(Some(node), future).await
}

/// Wrap `source` so that `frame` is the active frame whenever it is polled
pub fn run_scoped<S>(source: S, frame: ExecutionFrame) -> ScopedStream<S>
where
    S: Stream,
{
    ScopedStream {
        inner: Box::pin(source),
        frame,
        node: None,
    }
}

/// Stream returned by [`run_scoped`]
pub struct ScopedStream<S> {
    inner: Pin<Box<S>>,
    frame: ExecutionFrame,
    node: Option<Arc<ActiveFrame>>,
}

impl<S> ScopedStream<S> {
    pub fn frame(&self) -> &ExecutionFrame {
        &self.frame
    }

    /// Stack node for this poll. Reused while the parent is unchanged so that
    /// nested scopes see a stable parent.
    fn enter(&mut self) -> Arc<ActiveFrame> {
        let parent = active_frame();

        if let Some(node) = &self.node {
            let same_parent = match (node.parent.as_ref(), parent.as_ref()) {
                (None, None) => true,
                (Some(a), Some(b)) => Arc::ptr_eq(a, b),
                _ => false,
            };
            if same_parent {
                return Arc::clone(node);
            }
        }

        let node = ActiveFrame::push(self.frame.clone(), parent);
        trace!(frame = %node.frame, depth = node.depth, "Entering scoped stream frame");
        self.node = Some(Arc::clone(&node));
        node
    }
}

impl<S> Stream for ScopedStream<S>
where
    S: Stream,
{
    type Item = S::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let node = this.enter();
        let inner = &mut this.inner;
        ACTIVE.sync_scope(Some(node), || inner.as_mut().poll_next(cx))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}
