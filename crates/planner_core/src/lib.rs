//! Plan orchestration for the manufacturing planner: turns an operator prompt
//! into a stock-annotated plan and drives shortage sourcing.

pub mod backend;
pub mod config;
pub mod correlator;
pub mod error;
pub mod inventory;
pub mod orchestrator;
pub mod plan;
pub mod shortage;
pub mod view;

pub use backend::{CallPolicy, HttpPlanningBackend, PlanningBackend};
pub use config::{load_client_settings, ClientSettings};
pub use correlator::{correlate, CorrelationStrategy, SubstringCorrelation};
pub use error::{BackendError, WorkflowError};
pub use orchestrator::{PlanContext, Severity, WorkflowEvent, WorkflowOrchestrator};
pub use shortage::{ResolutionView, ShortageSession, ShortageState};
pub use view::{PartRow, PlanView, StockAnnotation};

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;
