//! windowfleet-core: action feasibility and effect engine for a window
//! cleaning fleet (one carrier, several cleaning units, fixed targets).
//!
//! Controllers ask the `Engine` which actions are allowed (and safe), pick
//! one, and have it applied either run-to-completion (`Engine::apply`) or
//! incrementally (`Engine::tick`).

pub mod action;
pub mod catalogue;
pub mod clock;
pub mod config;
pub mod controller;
pub mod effect;
pub mod energy;
pub mod engine;
pub mod entity;
pub mod error;
pub mod event;
pub mod lookahead;
pub mod rng;
pub mod scenario;
pub mod simulation;
pub mod snapshot;
pub mod stepping;
pub mod types;
pub mod world;

pub use action::{Action, ActionKind, Actor};
pub use config::{CatalogueMode, EngineConfig, ScenarioConfig};
pub use effect::EffectPlan;
pub use engine::Engine;
pub use error::{EngineError, EngineResult};
pub use lookahead::SafetyVerdict;
pub use simulation::{RunOutcome, SnapshotSimulation, SteppingSimulation};
pub use stepping::{StepReport, Stepper};
pub use types::Vec3;
pub use world::World;
