//! AI-assisted induction planning flows for a metro rail fleet.
//!
//! `fleetwise` wraps a generative-model service behind four schema-bound
//! flows: predictive maintenance alerts, induction ranking, what-if schedule
//! simulation, and certificate-clearance probability. Every flow runs the
//! same pipeline — validate the input against its schema, render a prompt
//! template, call the model once, coerce the response, and check it against
//! the declared output shape — and surfaces failures as a three-kind error
//! taxonomy (validation / service / parse).
//!
//! The flows are registered once in a [`flow::FlowRegistry`] and looked up by
//! name; the model call goes through the [`client::GenerativeModel`] trait so
//! callers (and tests) can substitute their own transport.
//!
//! ```rust,no_run
//! use fleetwise::client::HttpModelClient;
//! use fleetwise::flow::FlowRegistry;
//! use fleetwise::flows::simulation::SimulationInput;
//!
//! fn main() -> Result<(), fleetwise::error::FlowError> {
//!     let registry = FlowRegistry::standard();
//!     let client = HttpModelClient::from_env()?;
//!     let projection = registry.run_what_if_simulation(
//!         &client,
//!         &SimulationInput {
//!             maintenance_delay: "HVAC repair on T-003 delayed by 2 hours".to_string(),
//!             certificate_risk: "T-007 has a 50% chance of failing inspection".to_string(),
//!             cleaning_slot: "Washing line 1 occupied until 4 PM".to_string(),
//!             track_closure: "None planned".to_string(),
//!             demand: "High demand expected for evening peak hours".to_string(),
//!             weather: "Heavy rain expected".to_string(),
//!         },
//!     )?;
//!     println!("{}", projection.predicted_schedule_impact);
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod coerce;
pub mod error;
pub mod flow;
pub mod flows;
pub mod schema;
pub mod template;

pub use client::{GenerativeModel, HttpModelClient, ModelConfig};
pub use error::FlowError;
pub use flow::{FlowDefinition, FlowRegistry};
