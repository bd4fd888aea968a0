//! # Gate Service
//!
//! Single-writer actor around the gate. Commands from any number of
//! `GateHandle`s are queued on one `mpsc` channel and answered over
//! `oneshot`. The fail-safe deadline is awaited in the same `select!`, so an
//! expiry is just one more event in the queue and can never interleave with
//! a command.
//!
//! After every event the actor publishes a `GateSnapshot` on a `watch`
//! channel, so attribute readers never wait behind commands.

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::domain::{
    CallerContext, CommissioningGate, FailSafeState, GateError, GatePhase, ServiceError,
    TcAttributes, ROOT_ENDPOINT,
};
#[cfg(any(test, feature = "test-hooks"))]
use crate::domain::CommissioningTestConfig;
use crate::ipc::{
    AttributeId, Command, CommandDispatcher, CommandResponse, InvokeRequest, ReadRequest,
    ReadResult, Request, Response,
};
use crate::ports::{CommissioningApi, KeyValueStore, TimeSource, TokioClock};

/// State published after every event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GateSnapshot {
    pub tc: TcAttributes,
    pub fail_safe: FailSafeState,
    pub phase: GatePhase,
}

impl GateSnapshot {
    fn of<S: KeyValueStore, T: TimeSource>(gate: &CommissioningGate<S, T>) -> Self {
        Self {
            tc: gate.tc_attributes(),
            fail_safe: gate.fail_safe_state(),
            phase: gate.phase(),
        }
    }
}

/// Messages accepted by the service task.
#[derive(Debug)]
enum GateCommand {
    Request {
        request: Request,
        reply: oneshot::Sender<Response>,
    },
    FactoryReset {
        reply: oneshot::Sender<Result<(), GateError>>,
    },
    #[cfg(any(test, feature = "test-hooks"))]
    SetTestConfig {
        config: CommissioningTestConfig,
        reply: oneshot::Sender<()>,
    },
}

/// The actor owning the gate.
pub struct GateService<S> {
    dispatcher: CommandDispatcher<S, TokioClock>,
    receiver: mpsc::Receiver<GateCommand>,
    snapshots: watch::Sender<GateSnapshot>,
}

impl<S: KeyValueStore + 'static> GateService<S> {
    /// Wrap `gate` in a service and return the service with its first handle.
    pub fn new(gate: CommissioningGate<S, TokioClock>, queue_depth: usize) -> (Self, GateHandle) {
        let (sender, receiver) = mpsc::channel(queue_depth.max(1));
        let (snapshots, snapshot_rx) = watch::channel(GateSnapshot::of(&gate));
        let service = Self {
            dispatcher: CommandDispatcher::new(gate),
            receiver,
            snapshots,
        };
        let handle = GateHandle {
            sender,
            snapshots: snapshot_rx,
        };
        (service, handle)
    }

    /// Spawn the service on the current runtime.
    ///
    /// The task ends once every handle is dropped and yields the gate back.
    pub fn spawn(
        gate: CommissioningGate<S, TokioClock>,
        queue_depth: usize,
    ) -> (GateHandle, JoinHandle<CommissioningGate<S, TokioClock>>) {
        let (service, handle) = Self::new(gate, queue_depth);
        (handle, tokio::spawn(service.run()))
    }

    /// Run until all handles are dropped.
    pub async fn run(mut self) -> CommissioningGate<S, TokioClock> {
        info!("[service] Gate service started");
        loop {
            let gate = self.dispatcher.gate();
            let deadline = gate
                .fail_safe_deadline()
                .map(|deadline| gate.clock().instant_at(deadline));

            tokio::select! {
                biased;
                command = self.receiver.recv() => match command {
                    Some(command) => self.handle(command),
                    None => break,
                },
                _ = sleep_until(deadline) => self.on_deadline(),
            }
            self.publish();
        }
        info!("[service] All handles dropped, gate service stopping");
        self.dispatcher.into_gate()
    }

    #[instrument(level = "debug", skip_all)]
    fn handle(&mut self, command: GateCommand) {
        match command {
            GateCommand::Request { request, reply } => {
                let response = self.dispatcher.handle(request);
                if reply.send(response).is_err() {
                    debug!("[service] Requester went away before the reply");
                }
            }
            GateCommand::FactoryReset { reply } => {
                let result = self.dispatcher.gate_mut().factory_reset();
                let _ = reply.send(result);
            }
            #[cfg(any(test, feature = "test-hooks"))]
            GateCommand::SetTestConfig { config, reply } => {
                self.dispatcher.gate_mut().set_test_config(config);
                let _ = reply.send(());
            }
        }
    }

    #[instrument(level = "debug", skip_all)]
    fn on_deadline(&mut self) {
        let gate = self.dispatcher.gate_mut();
        let now = gate.clock().now();
        if !gate.expire_if_due(now) {
            warn!(now, "[service] Deadline woke the service but nothing expired");
        }
    }

    fn publish(&self) {
        let next = GateSnapshot::of(self.dispatcher.gate());
        self.snapshots.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
    }
}

async fn sleep_until(deadline: Option<tokio::time::Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

/// Cloneable client of a running `GateService`.
#[derive(Clone, Debug)]
pub struct GateHandle {
    sender: mpsc::Sender<GateCommand>,
    snapshots: watch::Receiver<GateSnapshot>,
}

impl GateHandle {
    /// Latest published state.
    pub fn snapshot(&self) -> GateSnapshot {
        *self.snapshots.borrow()
    }

    /// A receiver that is notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<GateSnapshot> {
        self.snapshots.clone()
    }

    /// Override the test configuration of the next session.
    #[cfg(any(test, feature = "test-hooks"))]
    pub async fn set_test_config(&self, config: CommissioningTestConfig) -> Result<(), ServiceError> {
        let (reply, rx) = oneshot::channel();
        self.send(GateCommand::SetTestConfig { config, reply }).await?;
        rx.await.map_err(|_| ServiceError::Closed)
    }

    async fn send(&self, command: GateCommand) -> Result<(), ServiceError> {
        self.sender
            .send(command)
            .await
            .map_err(|_| ServiceError::Closed)
    }
}

#[async_trait]
impl CommissioningApi for GateHandle {
    async fn invoke(
        &self,
        caller: CallerContext,
        command: Command,
    ) -> Result<CommandResponse, ServiceError> {
        let request = Request::Invoke(InvokeRequest {
            correlation_id: Uuid::new_v4(),
            endpoint: ROOT_ENDPOINT,
            caller,
            command,
        });
        match self.request(request).await? {
            Response::Invoke(response) => Ok(response.response),
            Response::Read(_) => Err(ServiceError::UnexpectedResponse),
        }
    }

    async fn read(
        &self,
        caller: CallerContext,
        attribute: AttributeId,
    ) -> Result<ReadResult, ServiceError> {
        let request = Request::Read(ReadRequest {
            correlation_id: Uuid::new_v4(),
            endpoint: ROOT_ENDPOINT,
            caller,
            attribute,
        });
        match self.request(request).await? {
            Response::Read(response) => Ok(response.result),
            Response::Invoke(_) => Err(ServiceError::UnexpectedResponse),
        }
    }

    async fn request(&self, request: Request) -> Result<Response, ServiceError> {
        let (reply, rx) = oneshot::channel();
        self.send(GateCommand::Request { request, reply }).await?;
        rx.await.map_err(|_| ServiceError::Closed)
    }

    async fn factory_reset(&self) -> Result<(), ServiceError> {
        let (reply, rx) = oneshot::channel();
        self.send(GateCommand::FactoryReset { reply }).await?;
        rx.await.map_err(|_| ServiceError::Closed)??;
        Ok(())
    }

    fn tc_attributes(&self) -> TcAttributes {
        self.snapshots.borrow().tc
    }
}
