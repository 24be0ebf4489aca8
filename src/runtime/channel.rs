use std::sync::{Arc, PoisonError, RwLock};

use futures::future::BoxFuture;
use tokio::{runtime::Handle, sync::broadcast::error::RecvError};
use tracing::warn;

use crate::{
    NavflowError, Result, ShareLock,
    common::{BroadcastQueue, Shutdown},
    events::Message,
    runtime::RunId,
};

macro_rules! dispatch_event {
    ($handles:expr, $(&$item:ident), +) => {
        let handlers = $handles.read().unwrap_or_else(PoisonError::into_inner);
        for handle in handlers.iter() {
            (handle)($(&$item),+);
        }
    };
}

macro_rules! dispatch_event_async {
    ($handle:expr, $handles:expr, $(&$item:ident), +) => {
        let handles = $handles.clone();

        $handle.spawn(async move {
            let handlers = handles.read().unwrap_or_else(PoisonError::into_inner).clone();
            for handle in handlers.iter() {
                (handle)($(&$item),+).await;
            }
        });
    };
}

const EVENT_QUEUE_SIZE: usize = 4096;

pub type EventHandle = Arc<dyn Fn(&Message) + Send + Sync>;
pub type EventHandleAsync = Arc<dyn Fn(&Message) -> BoxFuture<'static, ()> + Send + Sync>;

#[derive(Debug, Clone)]
pub struct ChannelOptions {
    /// use the glob pattern to match the run id
    /// eg. run1*
    pub run_id: String,

    /// use the glob pattern to match the device id
    /// eg. stb-*
    pub device_id: String,
}

impl Default for ChannelOptions {
    fn default() -> Self {
        Self {
            run_id: "*".to_string(),
            device_id: "*".to_string(),
        }
    }
}

impl ChannelOptions {
    pub fn new(
        run_id: String,
        device_id: String,
    ) -> Self {
        Self {
            run_id,
            device_id,
        }
    }

    pub fn with_run_id(run_id: String) -> Self {
        Self {
            run_id,
            device_id: "*".to_string(),
        }
    }

    pub fn with_device_id(device_id: String) -> Self {
        Self {
            run_id: "*".to_string(),
            device_id,
        }
    }
}

/// Event bus of an engine.
///
/// Messages go out on a broadcast queue; sending never blocks and is dropped when
/// nobody listens. Registered handlers are invoked by the listener task.
#[derive(Clone)]
pub struct Channel {
    event_queue: Arc<BroadcastQueue<Message>>,

    events: ShareLock<Vec<EventHandle>>,
    events_async: ShareLock<Vec<EventHandleAsync>>,

    handle: Handle,
    shutdown: Arc<Shutdown>,
}

impl Channel {
    pub(crate) fn new(handle: Handle) -> Self {
        Self {
            event_queue: BroadcastQueue::new(EVENT_QUEUE_SIZE),
            events: Arc::new(RwLock::new(Vec::new())),
            events_async: Arc::new(RwLock::new(Vec::new())),
            handle,
            shutdown: Arc::new(Shutdown::new()),
        }
    }

    pub(crate) fn event_queue(&self) -> Arc<BroadcastQueue<Message>> {
        self.event_queue.clone()
    }

    /// Publishes a message to every subscriber.
    pub(crate) fn emit(
        &self,
        message: Message,
    ) {
        // no subscriber is not an error
        let _ = self.event_queue.send(message);
    }

    pub(crate) fn listen(&self) {
        let mut event_queue = self.event_queue.subscribe();
        let events = self.events.clone();
        let events_async = self.events_async.clone();

        let shutdown = self.shutdown.clone();
        let handle = self.handle.clone();
        self.handle.spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.wait() => break,
                    received = event_queue.recv() => match received {
                        Ok(e) => {
                            let evt = e.clone();
                            dispatch_event!(events, &evt);
                            dispatch_event_async!(handle, events_async, &e);
                        }
                        Err(RecvError::Lagged(skipped)) => warn!("channel listener lagged, {} events skipped", skipped),
                        Err(RecvError::Closed) => break,
                    }
                }
            }
        });
    }

    pub(crate) fn shutdown(&self) {
        self.shutdown.shutdown();
    }
}

/// Filtered subscription to a [`Channel`].
#[derive(Clone)]
pub struct ChannelEvent {
    channel: Arc<Channel>,

    glob: (globset::GlobMatcher, globset::GlobMatcher),
}

impl ChannelEvent {
    pub fn channel(
        channel: Arc<Channel>,
        options: ChannelOptions,
    ) -> Result<Self> {
        let matcher = |pattern: &str| globset::Glob::new(pattern).map(|g| g.compile_matcher()).map_err(|e| NavflowError::Config(format!("invalid channel pattern '{}': {}", pattern, e)));

        Ok(Self {
            channel,
            glob: (matcher(&options.run_id)?, matcher(&options.device_id)?),
        })
    }

    pub fn on_complete(
        &self,
        f: impl Fn(RunId) + Send + Sync + 'static,
    ) {
        let glob = self.glob.clone();

        self.channel.events.write().unwrap_or_else(PoisonError::into_inner).push(Arc::new(move |e| {
            if e.event.is_complete() && is_match(&glob, e) {
                f(e.run_id.clone());
            }
        }));
    }

    pub fn on_error(
        &self,
        f: impl Fn(&Message) + Send + Sync + 'static,
    ) {
        let glob = self.glob.clone();

        self.channel.events.write().unwrap_or_else(PoisonError::into_inner).push(Arc::new(move |e| {
            if e.event.is_error() && is_match(&glob, e) {
                f(e);
            }
        }));
    }

    pub fn on_event(
        &self,
        f: impl Fn(&Message) + Send + Sync + 'static,
    ) {
        let glob = self.glob.clone();

        self.channel.events.write().unwrap_or_else(PoisonError::into_inner).push(Arc::new(move |e| {
            if is_match(&glob, e) {
                f(e);
            }
        }));
    }

    pub fn on_event_async<F>(
        &self,
        f: F,
    ) where
        F: Fn(&Message) -> BoxFuture<'static, ()> + Send + Sync + 'static,
    {
        let glob = self.glob.clone();

        self.channel.events_async.write().unwrap_or_else(PoisonError::into_inner).push(Arc::new(move |e| {
            if is_match(&glob, e) {
                f(e)
            } else {
                Box::pin(async {})
            }
        }));
    }
}

fn is_match(
    glob: &(globset::GlobMatcher, globset::GlobMatcher),
    e: &Message,
) -> bool {
    let (pat_run, pat_device) = glob;
    pat_run.is_match(&e.run_id) && pat_device.is_match(&e.device_id)
}

#[cfg(test)]
mod test {
    use std::{
        sync::{
            Arc,
            atomic::{AtomicUsize, Ordering},
        },
        time::Duration,
    };

    use tokio::runtime::Handle;

    use crate::events::{ExecutionEvent, Message, RunEvent, RunFailedEvent};

    use super::{Channel, ChannelEvent, ChannelOptions};

    fn message(
        run_id: &str,
        event: RunEvent,
    ) -> Message {
        Message {
            run_id: run_id.to_string(),
            device_id: "stb-1".to_string(),
            event: ExecutionEvent::Run(event),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_handlers_filter_by_run() {
        let channel = Arc::new(Channel::new(Handle::current()));
        channel.listen();

        let completed = Arc::new(AtomicUsize::new(0));
        let seen = Arc::new(AtomicUsize::new(0));

        let events = ChannelEvent::channel(channel.clone(), ChannelOptions::with_run_id("run-a*".to_string())).unwrap();
        let c = completed.clone();
        events.on_complete(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        let s = seen.clone();
        events.on_event(move |_| {
            s.fetch_add(1, Ordering::SeqCst);
        });

        channel.emit(message("run-a1", RunEvent::Completed));
        channel.emit(message("run-b1", RunEvent::Completed));
        channel.emit(message("run-a2", RunEvent::Cancelled));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(completed.load(Ordering::SeqCst), 1);
        assert_eq!(seen.load(Ordering::SeqCst), 2);
        channel.shutdown();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_error_and_async_handlers() {
        let channel = Arc::new(Channel::new(Handle::current()));
        channel.listen();

        let errors = Arc::new(AtomicUsize::new(0));
        let handled = Arc::new(AtomicUsize::new(0));

        let events = ChannelEvent::channel(channel.clone(), ChannelOptions::with_device_id("stb-*".to_string())).unwrap();
        let e = errors.clone();
        events.on_error(move |message| {
            if let ExecutionEvent::Run(RunEvent::Failed(failed)) = &message.event {
                assert_eq!(failed.error, "plan generation timed out after 100ms");
            }
            e.fetch_add(1, Ordering::SeqCst);
        });
        let h = handled.clone();
        events.on_event_async(move |_| {
            let h = h.clone();
            Box::pin(async move {
                h.fetch_add(1, Ordering::SeqCst);
            })
        });

        channel.emit(message(
            "run-a1",
            RunEvent::Failed(RunFailedEvent {
                error: "plan generation timed out after 100ms".to_string(),
            }),
        ));
        channel.emit(message("run-a2", RunEvent::Completed));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(errors.load(Ordering::SeqCst), 1);
        assert_eq!(handled.load(Ordering::SeqCst), 2);
        channel.shutdown();
    }

    #[tokio::test]
    async fn test_invalid_pattern() {
        let channel = Arc::new(Channel::new(Handle::current()));
        assert!(ChannelEvent::channel(channel, ChannelOptions::with_run_id("run[".to_string())).is_err());
    }
}
