//! Scripted provider for relay tests.
//!
//! [`ScriptedProvider`] yields a fixed (or prompt-derived) list of fragments
//! and can be told to fail, hang, or pace itself, so relay and bridge code
//! can be exercised without a network.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::provider::{Provider, ProviderError, ProviderResult, StreamEvent, StreamEventStream};

type Script = Box<dyn Fn(&str) -> Vec<String> + Send + Sync>;

/// In-memory [`Provider`] with scripted output.
pub struct ScriptedProvider {
    script: Script,
    fail_on_start: bool,
    fail_after: Option<usize>,
    hang_after: Option<usize>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    active: Arc<AtomicUsize>,
    peak_active: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    /// Yield `fragments` for every prompt.
    pub fn new<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fragments: Vec<String> = fragments.into_iter().map(Into::into).collect();
        Self::from_fn(move |_| fragments.clone())
    }

    /// Derive the fragments from the prompt.
    pub fn from_fn(script: impl Fn(&str) -> Vec<String> + Send + Sync + 'static) -> Self {
        Self {
            script: Box::new(script),
            fail_on_start: false,
            fail_after: None,
            hang_after: None,
            delay: None,
            calls: AtomicUsize::new(0),
            active: Arc::new(AtomicUsize::new(0)),
            peak_active: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Fail before the stream opens.
    #[must_use]
    pub fn failing_on_start(mut self) -> Self {
        self.fail_on_start = true;
        self
    }

    /// Yield a mid-stream error after `n` fragments.
    #[must_use]
    pub fn failing_after(mut self, n: usize) -> Self {
        self.fail_after = Some(n);
        self
    }

    /// Stop producing (without ending) after `n` fragments.
    #[must_use]
    pub fn hanging_after(mut self, n: usize) -> Self {
        self.hang_after = Some(n);
        self
    }

    /// Sleep before each fragment.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of `stream` calls made.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Streams opened and not yet dropped.
    pub fn active_streams(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Highest number of streams that were open at the same time.
    pub fn peak_active_streams(&self) -> usize {
        self.peak_active.load(Ordering::SeqCst)
    }

    /// Prompts received, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

struct ActiveGuard(Arc<AtomicUsize>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        let _ = self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-model"
    }

    async fn stream(&self, prompt: &str) -> ProviderResult<StreamEventStream> {
        let _ = self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().push(prompt.to_string());

        if self.fail_on_start {
            return Err(ProviderError::Api {
                status: 500,
                message: "scripted start failure".into(),
                code: None,
                retryable: true,
            });
        }

        let fragments = (self.script)(prompt);
        let fail_after = self.fail_after;
        let hang_after = self.hang_after;
        let delay = self.delay;
        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        let _ = self.peak_active.fetch_max(now_active, Ordering::SeqCst);
        let guard = ActiveGuard(Arc::clone(&self.active));

        Ok(Box::pin(async_stream::stream! {
            let _guard = guard;
            for (i, delta) in fragments.into_iter().enumerate() {
                if fail_after == Some(i) {
                    yield Err(ProviderError::Stream { message: "scripted failure".into() });
                    return;
                }
                if hang_after == Some(i) {
                    futures::future::pending::<()>().await;
                }
                if let Some(d) = delay {
                    tokio::time::sleep(d).await;
                }
                yield Ok(StreamEvent::TextDelta { delta });
            }
            if fail_after.is_some() {
                yield Err(ProviderError::Stream { message: "scripted failure".into() });
                return;
            }
            if hang_after.is_some() {
                futures::future::pending::<()>().await;
            }
            yield Ok(StreamEvent::Done { stop_reason: "end_turn" });
        }))
    }
}
