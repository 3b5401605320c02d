#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use rollcall_core::{
    AnalyzerError, BoundingBox, Descriptor, Detection, FaceAnalyzer, Frame, Identity, MatchResult,
    ReferenceDescriptor, ReferenceSet, SourceError, VideoSource,
};
use rollcall_notify::{ChannelError, Notification, NotificationChannel};
use rollcalld::{PresentationSink, SamplerError};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

pub fn alice() -> Identity {
    Identity {
        name: "Alice".into(),
        photo: "a.jpg".into(),
        email: "a@x.com".into(),
    }
}

pub fn alice_references() -> Arc<ReferenceSet> {
    Arc::new(ReferenceSet::new(vec![ReferenceDescriptor {
        identity: alice(),
        descriptor: Descriptor::new(vec![0.0, 0.0, 0.0]),
    }]))
}

pub fn detection(values: Vec<f32>) -> Detection {
    Detection {
        bbox: BoundingBox { x: 10.0, y: 20.0, width: 64.0, height: 64.0, confidence: 0.9 },
        descriptor: Descriptor::new(values),
    }
}

/// Video source that becomes ready once `open()` is called (or immediately).
pub struct FakeSource {
    ready: watch::Sender<Option<Result<(u32, u32), String>>>,
    dims: (u32, u32),
    pub captures: AtomicU64,
}

impl FakeSource {
    pub fn ready(width: u32, height: u32) -> Arc<Self> {
        let source = Self::gated(width, height);
        source.open();
        source
    }

    pub fn gated(width: u32, height: u32) -> Arc<Self> {
        let (ready, _) = watch::channel(None);
        Arc::new(Self {
            ready,
            dims: (width, height),
            captures: AtomicU64::new(0),
        })
    }

    pub fn denied() -> Arc<Self> {
        let source = Self::gated(0, 0);
        source.ready.send_replace(Some(Err("denied".into())));
        source
    }

    pub fn open(&self) {
        self.ready.send_replace(Some(Ok(self.dims)));
    }

    pub fn captures(&self) -> u64 {
        self.captures.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VideoSource for FakeSource {
    async fn wait_ready(&self) -> Result<(u32, u32), SourceError> {
        let mut rx = self.ready.subscribe();
        let state = rx
            .wait_for(|s| s.is_some())
            .await
            .map_err(|_| SourceError::Closed)?
            .clone();
        match state {
            Some(Ok(dims)) => Ok(dims),
            _ => Err(SourceError::PermissionDenied),
        }
    }

    async fn capture(&self) -> Result<Frame, SourceError> {
        let seq = self.captures.fetch_add(1, Ordering::SeqCst) + 1;
        let (w, h) = self.dims;
        Ok(Frame::new(vec![128; (w * h) as usize], w, h, seq))
    }
}

type Script = Box<dyn Fn(usize) -> Result<Vec<Detection>, AnalyzerError> + Send + Sync>;

/// Analyzer whose `detect_all` output is scripted per call index.
pub struct ScriptedAnalyzer {
    script: Script,
    /// Delay applied to the first call only.
    first_call_delay: Option<Duration>,
    pub calls: AtomicUsize,
}

impl ScriptedAnalyzer {
    pub fn new(
        script: impl Fn(usize) -> Result<Vec<Detection>, AnalyzerError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            script: Box::new(script),
            first_call_delay: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn slow_first(
        delay: Duration,
        script: impl Fn(usize) -> Result<Vec<Detection>, AnalyzerError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            script: Box::new(script),
            first_call_delay: Some(delay),
            calls: AtomicUsize::new(0),
        })
    }

    /// Always returns the same detections.
    pub fn constant(detections: Vec<Detection>) -> Arc<Self> {
        Self::new(move |_| Ok(detections.clone()))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FaceAnalyzer for ScriptedAnalyzer {
    async fn detect_all(&self, _frame: &Frame) -> Result<Vec<Detection>, AnalyzerError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call == 0 {
            if let Some(delay) = self.first_call_delay {
                tokio::time::sleep(delay).await;
            }
        }
        (self.script)(call)
    }

    async fn detect_one(&self, _image: &Frame) -> Result<Option<Detection>, AnalyzerError> {
        Ok(Some(detection(vec![0.0, 0.0, 0.0])))
    }
}

/// Sink that keeps everything it is shown.
#[derive(Default)]
pub struct RecordingSink {
    pub results: Mutex<Vec<MatchResult>>,
    pub ticks: AtomicUsize,
    pub errors: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn labels(&self) -> Vec<String> {
        self.results.lock().iter().map(|r| r.display_name().to_string()).collect()
    }
}

impl PresentationSink for RecordingSink {
    fn on_results(&self, _frame: &Frame, results: &[MatchResult]) {
        self.ticks.fetch_add(1, Ordering::SeqCst);
        self.results.lock().extend(results.iter().cloned());
    }

    fn on_error(&self, error: &SamplerError) {
        self.errors.lock().push(error.to_string());
    }
}

/// Notification channel that records what it is asked to send.
#[derive(Default)]
pub struct RecordingChannel {
    pub sent: Mutex<Vec<Notification>>,
}

impl RecordingChannel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().len()
    }
}

#[async_trait]
impl NotificationChannel for RecordingChannel {
    async fn send(&self, notification: &Notification) -> Result<String, ChannelError> {
        self.sent.lock().push(notification.clone());
        Ok(format!("Welcome email sent to {}", notification.email))
    }
}
