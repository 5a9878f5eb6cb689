//! Test utilities and mock removal services
//!
//! These implementations of [`BackgroundRemovalService`] let tests decide when
//! and how each removal request resolves, without timers or network access.

use crate::{
    error::{BackZapError, Result},
    removal::{BackgroundRemovalService, RemovalOutput},
    types::ImageRef,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::{mpsc, oneshot};

/// A removal call waiting for the test to resolve it
#[derive(Debug)]
pub struct PendingRemoval {
    /// Image the controller submitted
    pub image: ImageRef,
    responder: oneshot::Sender<Result<RemovalOutput>>,
}

impl PendingRemoval {
    /// Resolve with a processed image; `false` if the caller stopped waiting
    pub fn succeed<I: Into<ImageRef>>(self, processed: I) -> bool {
        self.responder
            .send(Ok(RemovalOutput::new(processed.into())))
            .is_ok()
    }

    /// Resolve with a failure; `false` if the caller stopped waiting
    pub fn fail<S: Into<String>>(self, message: S) -> bool {
        self.responder
            .send(Err(BackZapError::removal_failed(message)))
            .is_ok()
    }
}

/// Removal service whose calls are resolved by the test
///
/// Every `remove` call is forwarded as a [`PendingRemoval`] on the channel
/// returned by [`ScriptedRemovalService::new`]. Dropping a pending request
/// without answering fails the call.
#[derive(Debug)]
pub struct ScriptedRemovalService {
    requests: mpsc::UnboundedSender<PendingRemoval>,
    calls: AtomicUsize,
    call_history: Mutex<Vec<ImageRef>>,
}

impl ScriptedRemovalService {
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<PendingRemoval>) {
        let (requests, receiver) = mpsc::unbounded_channel();
        (
            Self {
                requests,
                calls: AtomicUsize::new(0),
                call_history: Mutex::new(Vec::new()),
            },
            receiver,
        )
    }

    /// Number of `remove` calls made so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Images submitted, in call order
    pub fn get_call_history(&self) -> Vec<ImageRef> {
        self.call_history.lock().unwrap().clone()
    }
}

#[async_trait]
impl BackgroundRemovalService for ScriptedRemovalService {
    async fn remove(&self, image: &ImageRef) -> Result<RemovalOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.call_history.lock().unwrap().push(image.clone());

        let (responder, response) = oneshot::channel();
        self.requests
            .send(PendingRemoval {
                image: image.clone(),
                responder,
            })
            .map_err(|_| BackZapError::removal("scripted service receiver closed"))?;

        response
            .await
            .map_err(|_| BackZapError::removal("scripted request dropped without a response"))?
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Removal service that resolves immediately
///
/// Successful results are `<uri>#processed`. Failure can be toggled between
/// calls.
#[derive(Debug, Default)]
pub struct InstantRemovalService {
    fail: AtomicBool,
    calls: AtomicUsize,
}

impl InstantRemovalService {
    #[must_use]
    pub fn succeeding() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn failing() -> Self {
        let service = Self::default();
        service.set_failing(true);
        service
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BackgroundRemovalService for InstantRemovalService {
    async fn remove(&self, image: &ImageRef) -> Result<RemovalOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            Err(BackZapError::removal_failed("instant failure"))
        } else {
            Ok(RemovalOutput::new(image.derived("processed")))
        }
    }

    fn name(&self) -> &str {
        "instant"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_service_resolves_from_test() {
        let (service, mut requests) = ScriptedRemovalService::new();
        let call = tokio::spawn(async move {
            let result = service.remove(&ImageRef::new("img1")).await;
            (result, service.call_count())
        });

        let pending = requests.recv().await.unwrap();
        assert_eq!(pending.image, ImageRef::new("img1"));
        assert!(pending.succeed("img1_result"));

        let (result, calls) = call.await.unwrap();
        assert_eq!(result.unwrap().processed_image, ImageRef::new("img1_result"));
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_dropped_request_fails_call() {
        let (service, mut requests) = ScriptedRemovalService::new();
        let call = tokio::spawn(async move { service.remove(&ImageRef::new("a")).await });

        drop(requests.recv().await.unwrap());
        assert!(matches!(call.await.unwrap(), Err(BackZapError::Removal(_))));
    }

    #[tokio::test]
    async fn test_instant_service_toggle() {
        let service = InstantRemovalService::succeeding();
        assert!(service.remove(&ImageRef::new("a")).await.is_ok());
        service.set_failing(true);
        assert!(service.remove(&ImageRef::new("a")).await.is_err());
        assert_eq!(service.call_count(), 2);
        assert!(InstantRemovalService::failing().remove(&ImageRef::new("b")).await.is_err());
    }
}
