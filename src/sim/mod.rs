pub mod energy;
/// Engine collaborator trait, outputs and the replay double.
pub mod engine;
/// Category-ordered assembly and execution.
pub mod orchestrator;
pub mod params;
/// Per-category assignment status.
pub mod status;

pub use engine::{EngineOutputs, ReplayEngine, SimulationEngine};
pub use orchestrator::{AssemblyPlan, Orchestrator, RunTarget, Settings, Sources};
pub use params::{ParamGroup, ParamValue, ParameterSet};
pub use status::{AssignmentStatus, Category, StatusBoard};
