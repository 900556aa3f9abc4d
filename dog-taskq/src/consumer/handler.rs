use std::future::Future;

use async_trait::async_trait;

use crate::message::MessageRef;

/// Per-message callback run by a consumer.
///
/// The handler owns the message until it acks or rejects it. Returning
/// without doing either leaves the message pending, which the consumer
/// reports as a warning.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, message: MessageRef);
}

/// Handler built from an async closure
pub struct HandlerFn<F> {
    f: F,
}

/// Wrap an async closure as a [`Handler`]
pub fn handler_fn<F, Fut>(f: F) -> HandlerFn<F>
where
    F: Fn(MessageRef) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    HandlerFn { f }
}

#[async_trait]
impl<F, Fut> Handler for HandlerFn<F>
where
    F: Fn(MessageRef) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn handle(&self, message: MessageRef) {
        (self.f)(message).await
    }
}
