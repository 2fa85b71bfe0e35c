//! Test doubles for the execution API and terminal channels

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use openapi_client::models::{CanaryResponse, ContinueRequest};
use tokio::sync::mpsc;
use uuid::Uuid;

use runme_console::errors::ConsoleError;
use runme_console::exec::api::{ExecutionApi, TriggerResponse};
use runme_console::models::{
    CanaryResult, ExecutableTask, ExecutionSession, ExecutionStatus, HostExecutionRecord, HostId,
    TaskKind, TaskRef,
};
use runme_console::terminal::channel::{ChannelConnector, ChannelEvent, ChannelLink, OutboundFrame};
use runme_console::terminal::viewport::{ViewportProbe, ViewportSize};

pub fn server_error(body: &str) -> ConsoleError {
    ConsoleError::RequestError {
        status: 500,
        body: body.to_string(),
    }
}

pub fn script(id: i64) -> ExecutableTask {
    ExecutableTask {
        id,
        kind: TaskKind::Script,
        name: format!("script-{}", id),
        payload: "uptime".to_string(),
        host_group_id: Some(1),
        target_host_id: None,
    }
}

/// Scripted execution API that counts every request
#[derive(Default)]
pub struct FakeApi {
    /// `None` makes the trigger fail
    pub trigger: Mutex<Option<TriggerResponse>>,

    /// Status reads in order; once exhausted, `fallback_status` answers
    pub statuses: Mutex<VecDeque<Result<Option<ExecutionStatus>, String>>>,
    pub fallback_status: Mutex<Option<Result<Option<ExecutionStatus>, String>>>,

    pub canary: Mutex<Option<CanaryResponse>>,
    pub continue_fails: Mutex<bool>,
    pub continue_requests: Mutex<Vec<ContinueRequest>>,

    pub sessions: Mutex<Option<Vec<ExecutionSession>>>,
    pub logs: Mutex<Vec<HostExecutionRecord>>,

    pub execute_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
    pub canary_calls: AtomicUsize,
    pub log_calls: AtomicUsize,
}

impl FakeApi {
    pub fn polling() -> Self {
        let api = Self::default();
        *api.trigger.lock().unwrap() = Some(TriggerResponse {
            status: None,
            session_name: Some("nightly_2024-05-01_12:00:00".to_string()),
            message: None,
        });
        api
    }

    pub fn completing(status: ExecutionStatus) -> Self {
        let api = Self::default();
        *api.trigger.lock().unwrap() = Some(TriggerResponse {
            status: Some(status),
            session_name: None,
            message: Some("done".to_string()),
        });
        api
    }

    pub fn with_statuses(self, statuses: Vec<Result<Option<ExecutionStatus>, String>>) -> Self {
        *self.statuses.lock().unwrap() = statuses.into();
        self
    }

    pub fn with_fallback(self, status: Result<Option<ExecutionStatus>, String>) -> Self {
        *self.fallback_status.lock().unwrap() = Some(status);
        self
    }

    pub fn with_canary(self, response: CanaryResponse) -> Self {
        *self.canary.lock().unwrap() = Some(response);
        self
    }

    pub fn executes(&self) -> usize {
        self.execute_calls.load(Ordering::SeqCst)
    }

    pub fn status_reads(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn canaries(&self) -> usize {
        self.canary_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExecutionApi for FakeApi {
    async fn execute(&self, _task: &ExecutableTask) -> Result<TriggerResponse, ConsoleError> {
        self.execute_calls.fetch_add(1, Ordering::SeqCst);
        self.trigger
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| server_error(r#"{"error": "executor unavailable"}"#))
    }

    async fn execute_canary(&self, task: &TaskRef) -> Result<CanaryResult, ConsoleError> {
        self.canary_calls.fetch_add(1, Ordering::SeqCst);
        let response = self.canary.lock().unwrap().clone();
        match response {
            Some(response) => Ok(CanaryResult::from_response(*task, response)),
            None => Err(server_error(r#"{"error": "no hosts in group"}"#)),
        }
    }

    async fn continue_execution(
        &self,
        _task: &TaskRef,
        request: &ContinueRequest,
    ) -> Result<(), ConsoleError> {
        self.continue_requests.lock().unwrap().push(request.clone());
        if *self.continue_fails.lock().unwrap() {
            return Err(server_error(r#"{"error": "session expired"}"#));
        }
        Ok(())
    }

    async fn list_sessions(&self, _task: &TaskRef) -> Result<Vec<ExecutionSession>, ConsoleError> {
        self.sessions
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| server_error(""))
    }

    async fn get_logs(
        &self,
        _task: &TaskRef,
        _session_name: &str,
    ) -> Result<Vec<HostExecutionRecord>, ConsoleError> {
        self.log_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.logs.lock().unwrap().clone())
    }

    async fn task_status(&self, _task: &TaskRef) -> Result<Option<ExecutionStatus>, ConsoleError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.statuses.lock().unwrap().pop_front();
        let answer = match next {
            Some(answer) => answer,
            None => self
                .fallback_status
                .lock()
                .unwrap()
                .clone()
                .unwrap_or(Ok(Some(ExecutionStatus::Running))),
        };
        answer.map_err(|e| server_error(&e))
    }
}

/// Server side of a fake terminal channel
pub struct Peer {
    pub host_id: HostId,
    pub events: mpsc::UnboundedSender<ChannelEvent>,
    pub outbound: mpsc::UnboundedReceiver<OutboundFrame>,
}

impl Peer {
    pub fn push(&self, event: ChannelEvent) {
        self.events.send(event).unwrap();
    }

    pub fn push_message(&self, json: &str) {
        self.push(ChannelEvent::Message(json.to_string()));
    }

    /// Frames the view has queued so far
    pub fn frames(&mut self) -> Vec<OutboundFrame> {
        let mut frames = Vec::new();
        while let Ok(frame) = self.outbound.try_recv() {
            frames.push(frame);
        }
        frames
    }
}

#[derive(Default)]
pub struct FakeConnector {
    pub peers: Mutex<Vec<Peer>>,
    pub refuse: bool,
}

impl FakeConnector {
    pub fn opens(&self) -> usize {
        self.peers.lock().unwrap().len()
    }

    pub fn take_peer(&self) -> Peer {
        self.peers.lock().unwrap().remove(0)
    }
}

#[async_trait]
impl ChannelConnector for FakeConnector {
    async fn open(&self, host_id: HostId) -> Result<ChannelLink, ConsoleError> {
        if self.refuse {
            return Err(ConsoleError::ChannelError("connection refused".to_string()));
        }
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        self.peers.lock().unwrap().push(Peer {
            host_id,
            events: events_tx,
            outbound: outbound_rx,
        });
        Ok(ChannelLink {
            id: Uuid::new_v4(),
            outbound: outbound_tx,
            events: events_rx,
        })
    }
}

/// Viewport that fails a fixed number of times before answering
pub struct FlakyProbe {
    pub failures: usize,
    pub calls: AtomicUsize,
    pub size: ViewportSize,
}

impl FlakyProbe {
    pub fn new(failures: usize, cols: u16, rows: u16) -> Self {
        Self {
            failures,
            calls: AtomicUsize::new(0),
            size: ViewportSize { cols, rows },
        }
    }
}

impl ViewportProbe for FlakyProbe {
    fn size(&self) -> Result<ViewportSize, ConsoleError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            return Err(ConsoleError::ChannelError("not laid out yet".to_string()));
        }
        Ok(self.size)
    }
}
