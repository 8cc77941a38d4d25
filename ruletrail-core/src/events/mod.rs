//! Asynchronous event messages and handlers.
//!
//! A [`Message`] is an opaque payload plus the [`Context`] it travels with.
//! Handlers consume one message and may produce follow-up messages.

pub mod middleware;

use anyhow::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::future::Future;
use std::marker::PhantomData;
use uuid::Uuid;

use crate::telemetry::Context;

pub use middleware::TelemetryMiddleware;

/// One dispatched event.
#[derive(Debug, Clone)]
pub struct Message {
    pub uuid: Uuid,
    pub metadata: BTreeMap<String, String>,
    pub payload: Vec<u8>,
    pub context: Context,
}

impl Message {
    pub fn new(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            uuid: Uuid::now_v7(),
            metadata: BTreeMap::new(),
            payload: payload.into(),
            context: Context::background(),
        }
    }

    pub fn with_context(mut self, context: Context) -> Self {
        self.context = context;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Handles one message, returning any messages to publish next.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, msg: Message) -> Result<Vec<Message>>;
}

#[async_trait]
impl<H: Handler + ?Sized> Handler for std::sync::Arc<H> {
    async fn handle(&self, msg: Message) -> Result<Vec<Message>> {
        (**self).handle(msg).await
    }
}

/// Handler backed by an async closure. Built with [`handler_fn`].
pub struct HandlerFn<F, Fut> {
    f: F,
    _fut: PhantomData<fn() -> Fut>,
}

/// Wrap an async closure as a [`Handler`].
pub fn handler_fn<F, Fut>(f: F) -> HandlerFn<F, Fut>
where
    F: Fn(Message) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Vec<Message>>> + Send,
{
    HandlerFn {
        f,
        _fut: PhantomData,
    }
}

#[async_trait]
impl<F, Fut> Handler for HandlerFn<F, Fut>
where
    F: Fn(Message) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Vec<Message>>> + Send,
{
    async fn handle(&self, msg: Message) -> Result<Vec<Message>> {
        (self.f)(msg).await
    }
}
