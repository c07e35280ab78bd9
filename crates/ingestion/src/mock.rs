//! Scripted frame source
//!
//! Replays a fixed script of upstream sessions for tests without a live
//! feed. Each `connect` consumes the next scripted session; once the script is
//! exhausted every further connect is refused.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use contracts::{ContractError, FrameSource, RawFrame};
use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// How a scripted session ends after its last frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionClose {
    /// Server-initiated normal close
    Normal,
    /// Transport error
    Error,
    /// Stay connected without sending anything
    Hang,
}

/// One scripted connect attempt
#[derive(Debug, Clone)]
pub enum Session {
    /// Connect fails immediately
    Refuse,
    /// Connect never completes
    Stall,
    /// Connect succeeds, then the frames are delivered
    Frames {
        frames: Vec<RawFrame>,
        close: SessionClose,
    },
}

impl Session {
    pub fn frames(frames: Vec<RawFrame>, close: SessionClose) -> Self {
        Self::Frames { frames, close }
    }

    /// Session of text frames
    pub fn text(lines: &[&str], close: SessionClose) -> Self {
        Self::frames(lines.iter().map(|l| RawFrame::from(*l)).collect(), close)
    }
}

/// Observes a [`ScriptedSource`] after it moved into a connector
#[derive(Debug, Clone, Default)]
pub struct ScriptHandle {
    connect_times: Arc<Mutex<Vec<Instant>>>,
}

impl ScriptHandle {
    /// Number of connect attempts so far
    pub fn connects(&self) -> usize {
        self.connect_times.lock().len()
    }

    /// Instant of every connect attempt, in order
    pub fn connect_times(&self) -> Vec<Instant> {
        self.connect_times.lock().clone()
    }

    fn record_connect(&self) {
        self.connect_times.lock().push(Instant::now());
    }
}

/// Frame source driven by a script of sessions
pub struct ScriptedSource {
    endpoint: String,
    script: VecDeque<Session>,
    current: Option<(VecDeque<RawFrame>, SessionClose)>,
    frame_interval: Option<Duration>,
    handle: ScriptHandle,
}

impl ScriptedSource {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            script: VecDeque::new(),
            current: None,
            frame_interval: None,
            handle: ScriptHandle::default(),
        }
    }

    /// Append a session to the script
    pub fn session(mut self, session: Session) -> Self {
        self.script.push_back(session);
        self
    }

    /// Append a refused connect
    pub fn refuse(self) -> Self {
        self.session(Session::Refuse)
    }

    /// Append a connect that never completes
    pub fn stall(self) -> Self {
        self.session(Session::Stall)
    }

    /// Pause before each delivered frame
    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = Some(interval);
        self
    }

    pub fn handle(&self) -> ScriptHandle {
        self.handle.clone()
    }
}

impl FrameSource for ScriptedSource {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn connect(&mut self) -> Result<(), ContractError> {
        self.current = None;
        self.handle.record_connect();

        match self.script.pop_front() {
            Some(Session::Frames { frames, close }) => {
                debug!(frames = frames.len(), ?close, "Scripted session opened");
                self.current = Some((frames.into(), close));
                Ok(())
            }
            Some(Session::Stall) => std::future::pending().await,
            Some(Session::Refuse) => Err(ContractError::upstream_connect(
                &self.endpoint,
                "connection refused",
            )),
            None => Err(ContractError::upstream_connect(
                &self.endpoint,
                "script exhausted",
            )),
        }
    }

    async fn next_frame(&mut self) -> Result<Option<RawFrame>, ContractError> {
        let Some((frames, close)) = self.current.as_mut() else {
            return Err(ContractError::upstream_read(&self.endpoint, "not connected"));
        };

        if let Some(frame) = frames.pop_front() {
            if let Some(interval) = self.frame_interval {
                tokio::time::sleep(interval).await;
            }
            return Ok(Some(frame));
        }

        match *close {
            SessionClose::Normal => Ok(None),
            SessionClose::Error => Err(ContractError::upstream_read(
                &self.endpoint,
                "connection reset by peer",
            )),
            SessionClose::Hang => std::future::pending().await,
        }
    }

    async fn close(&mut self) {
        self.current = None;
    }
}
