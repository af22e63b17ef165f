use std::sync::Arc;

use shared::{domain::Plan, protocol::SourcingAck};
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::{
    backend::{CallPolicy, PlanningBackend},
    correlator::{correlate, CorrelationStrategy, SubstringCorrelation},
    error::{BackendError, WorkflowError},
    inventory::{check_inventory, fuse},
    plan::{parse_plan, PlanError},
    shortage::{ShortageSession, ShortageState},
    view::PlanView,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Error,
}

#[derive(Debug, Clone)]
pub enum WorkflowEvent {
    PlanReady(PlanView),
    ShortageUpdated {
        part_number: String,
        state: ShortageState,
    },
    Notification {
        severity: Severity,
        message: String,
    },
}

/// The plan of the last successful run together with its rendered view.
#[derive(Debug, Default, Clone)]
pub struct PlanContext {
    prompt: Option<String>,
    plan: Option<Plan>,
    view: Option<PlanView>,
}

impl PlanContext {
    pub fn prompt(&self) -> Option<&str> {
        self.prompt.as_deref()
    }

    pub fn plan(&self) -> Option<&Plan> {
        self.plan.as_ref()
    }

    pub fn view(&self) -> Option<&PlanView> {
        self.view.as_ref()
    }
}

pub struct WorkflowOrchestrator {
    backend: Arc<dyn PlanningBackend>,
    strategy: Box<dyn CorrelationStrategy>,
    policy: CallPolicy,
    context: PlanContext,
    shortage: Option<ShortageSession>,
    events: broadcast::Sender<WorkflowEvent>,
}

impl WorkflowOrchestrator {
    pub fn new(backend: Arc<dyn PlanningBackend>, policy: CallPolicy) -> Self {
        Self::with_strategy(backend, policy, Box::new(SubstringCorrelation))
    }

    pub fn with_strategy(
        backend: Arc<dyn PlanningBackend>,
        policy: CallPolicy,
        strategy: Box<dyn CorrelationStrategy>,
    ) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            backend,
            strategy,
            policy,
            context: PlanContext::default(),
            shortage: None,
            events,
        }
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.events.subscribe()
    }

    pub fn context(&self) -> &PlanContext {
        &self.context
    }

    pub fn shortage(&self) -> Option<&ShortageSession> {
        self.shortage.as_ref()
    }

    /// prompt -> plan -> correlation -> inventory check -> ready to render.
    ///
    /// The context is only replaced once every stage has succeeded; any failure
    /// leaves the previously rendered plan in place.
    pub async fn generate_plan(&mut self, prompt: &str) -> Result<&PlanView, WorkflowError> {
        match self.run_plan_stages(prompt).await {
            Ok((plan, view)) => {
                info!(
                    parts = plan.parts.len(),
                    steps = plan.steps.len(),
                    shortages = view.shortages().count(),
                    "plan ready"
                );
                self.shortage = None;
                self.context = PlanContext {
                    prompt: Some(prompt.trim().to_string()),
                    plan: Some(plan),
                    view: Some(view.clone()),
                };
                self.emit(WorkflowEvent::PlanReady(view));
                self.context.view.as_ref().ok_or(WorkflowError::NoActivePlan)
            }
            Err(err) => {
                error!(error = %err, "plan workflow aborted");
                self.notify(Severity::Error, err.to_string());
                Err(err)
            }
        }
    }

    async fn run_plan_stages(&self, prompt: &str) -> Result<(Plan, PlanView), WorkflowError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(WorkflowError::EmptyPrompt);
        }

        let backend = self.backend.as_ref();
        info!(prompt_len = prompt.len(), "requesting plan");
        let raw = self
            .policy
            .once("generate_plan", backend.generate_plan(prompt))
            .await
            .map_err(|error| match error {
                // A success reply that is not JSON breaks the plan contract.
                BackendError::Decode(reason) => PlanError::NotJson(reason).into(),
                other => WorkflowError::PlanGenerationFailed(other),
            })?;
        let plan = parse_plan(raw)?;

        let requirements = correlate(&plan, self.strategy.as_ref());
        let verdicts = check_inventory(backend, &self.policy, &requirements)
            .await
            .map_err(WorkflowError::InventoryCheckFailed)?;

        let view = fuse(&plan, &verdicts);
        Ok((plan, view))
    }

    /// Opens the resolution view for an out-of-stock part, discarding any
    /// previously open one. A part that cannot be resolved leaves the open
    /// resolution in place.
    pub async fn open_shortage(
        &mut self,
        part_number: &str,
    ) -> Result<&ShortageSession, WorkflowError> {
        let session = self.session_for(part_number);
        let mut session = self.surfaced(session)?;

        if let Some(previous) = self.shortage.take() {
            if previous.part_number() != part_number {
                info!(part_number = %previous.part_number(), "discarding open shortage resolution");
            }
        }

        self.emit(WorkflowEvent::ShortageUpdated {
            part_number: part_number.to_string(),
            state: ShortageState::LocationsLoading,
        });
        let loaded = session
            .load_locations(self.backend.as_ref(), &self.policy)
            .await;
        self.emit(WorkflowEvent::ShortageUpdated {
            part_number: part_number.to_string(),
            state: session.state().clone(),
        });
        match session.state() {
            ShortageState::NoSupplyFound => self.notify(
                Severity::Info,
                format!("No stock of {part_number} is available at any location"),
            ),
            ShortageState::LocationsLoadFailed(_) => {
                if let Err(err) = &loaded {
                    self.notify(Severity::Error, err.to_string());
                }
            }
            _ => {}
        }

        let session = self.shortage.insert(session);
        loaded.map(|()| &*session)
    }

    pub fn select_source(&mut self, location: &str) -> Result<(), WorkflowError> {
        let result = match self.shortage.as_mut() {
            Some(session) => session.select_source(location),
            None => Err(WorkflowError::NoActiveResolution),
        };
        self.surfaced(result)
    }

    pub fn set_quantity(&mut self, quantity: u32) -> Result<(), WorkflowError> {
        let result = match self.shortage.as_mut() {
            Some(session) => session.set_quantity(quantity),
            None => Err(WorkflowError::NoActiveResolution),
        };
        self.surfaced(result)
    }

    /// Submits the open resolution. The plan context is never touched.
    pub async fn submit_sourcing_request(&mut self) -> Result<SourcingAck, WorkflowError> {
        let Some(session) = self.shortage.as_mut() else {
            return self.surfaced(Err(WorkflowError::NoActiveResolution));
        };
        let result = session.submit(self.backend.as_ref(), &self.policy).await;
        let part_number = session.part_number().to_string();
        let state = session.state().clone();

        match &result {
            Ok(ack) => {
                self.emit(WorkflowEvent::ShortageUpdated { part_number, state });
                self.notify(
                    Severity::Info,
                    format!("Sourcing request {} submitted", ack.request_id),
                );
            }
            Err(err) => {
                warn!(%part_number, error = %err, "sourcing request failed");
                self.notify(Severity::Error, err.to_string());
            }
        }
        result
    }

    pub fn close_shortage(&mut self) {
        self.shortage = None;
    }

    fn session_for(&self, part_number: &str) -> Result<ShortageSession, WorkflowError> {
        let view = self.context.view().ok_or(WorkflowError::NoActivePlan)?;
        let row = view
            .row(part_number)
            .ok_or_else(|| WorkflowError::UnknownPart(part_number.to_string()))?;
        ShortageSession::for_row(row)
    }

    /// Publishes a failure as an error notification before handing it back.
    fn surfaced<T>(&self, result: Result<T, WorkflowError>) -> Result<T, WorkflowError> {
        if let Err(err) = &result {
            warn!(error = %err, "shortage action rejected");
            self.notify(Severity::Error, err.to_string());
        }
        result
    }

    fn notify(&self, severity: Severity, message: String) {
        self.emit(WorkflowEvent::Notification { severity, message });
    }

    fn emit(&self, event: WorkflowEvent) {
        // No subscribers is fine; the caller still gets the result.
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
#[path = "tests/orchestrator_tests.rs"]
mod tests;
