//! Flow definitions, the registry, and the execution pipeline.
//!
//! A [`FlowDefinition`] binds a name, an input schema, an output schema, and
//! a prompt template. Execution is a fixed sequence: validate the input,
//! render the prompt, call the model, coerce the response, check it against
//! the output schema. Flow-specific output contracts (ranking completeness,
//! probability bounds, nested JSON-string payloads) live with the typed
//! wrappers in [`crate::flows`].

use crate::client::GenerativeModel;
use crate::coerce;
use crate::error::FlowError;
use crate::flows::alerts::{self, AlertsInput, PredictiveAlert};
use crate::flows::clearance::{self, ClearanceInput, ClearanceOutput};
use crate::flows::ranking::{self, RankingInput, RankingOutput};
use crate::flows::simulation::{self, SimulationInput, SimulationOutput};
use crate::schema::SchemaDescriptor;
use crate::template::PromptTemplate;
use serde_json::Value;
use std::collections::BTreeMap;

/// One named, schema-bound operation. Immutable once registered.
pub struct FlowDefinition {
    name: &'static str,
    input_schema: SchemaDescriptor,
    output_schema: SchemaDescriptor,
    template: PromptTemplate,
    json_string_field: Option<&'static str>,
}

impl FlowDefinition {
    pub(crate) fn new(
        name: &'static str,
        input_schema: SchemaDescriptor,
        output_schema: SchemaDescriptor,
        template_source: &str,
    ) -> Self {
        let template =
            PromptTemplate::parse(template_source).expect("parse bundled prompt template");
        FlowDefinition {
            name,
            input_schema,
            output_schema,
            template,
            json_string_field: None,
        }
    }

    /// Mark an output field whose string value is itself a JSON document.
    pub(crate) fn with_json_string_field(mut self, field: &'static str) -> Self {
        self.json_string_field = Some(field);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn input_schema(&self) -> &SchemaDescriptor {
        &self.input_schema
    }

    pub fn output_schema(&self) -> &SchemaDescriptor {
        &self.output_schema
    }

    pub fn template(&self) -> &PromptTemplate {
        &self.template
    }

    pub fn json_string_field(&self) -> Option<&'static str> {
        self.json_string_field
    }

    /// Run the pipeline against an untyped input object.
    ///
    /// Short-circuits on the first failing stage. Output-shape violations
    /// after a successful parse are reported as parse failures with the
    /// payload attached.
    pub fn execute(&self, model: &dyn GenerativeModel, input: &Value) -> Result<Value, FlowError> {
        self.input_schema.validate(input)?;
        let prompt = self.template.render(input)?;
        tracing::debug!(flow = self.name, prompt_bytes = prompt.len(), "prompt rendered");
        let raw = model.generate(&prompt, &self.output_schema)?;
        let value = coerce::coerce_json(&raw)?;
        if let Err(FlowError::Validation { detail }) = self.output_schema.validate(&value) {
            return Err(FlowError::parse(
                format!("model response does not match the declared output shape: {detail}"),
                value.to_string(),
            ));
        }
        Ok(value)
    }
}

/// The set of registered flows, constructed once and passed by reference.
pub struct FlowRegistry {
    flows: BTreeMap<&'static str, FlowDefinition>,
}

impl FlowRegistry {
    /// Build the standard registry with all four advisory flows.
    pub fn standard() -> Self {
        let mut registered = BTreeMap::new();
        for definition in [
            alerts::definition(),
            ranking::definition(),
            simulation::definition(),
            clearance::definition(),
        ] {
            registered.insert(definition.name(), definition);
        }
        FlowRegistry { flows: registered }
    }

    pub fn get(&self, name: &str) -> Option<&FlowDefinition> {
        self.flows.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FlowDefinition> {
        self.flows.values()
    }

    fn flow(&self, name: &str) -> &FlowDefinition {
        self.flows.get(name).expect("flow registered at construction")
    }

    /// Predictive maintenance alerts from a component-condition report.
    pub fn generate_predictive_alerts(
        &self,
        model: &dyn GenerativeModel,
        input: &AlertsInput,
    ) -> Result<Vec<PredictiveAlert>, FlowError> {
        alerts::run(self.flow(alerts::FLOW_NAME), model, input)
    }

    /// Rank the given trains for nightly induction.
    pub fn rank_trains_for_induction(
        &self,
        model: &dyn GenerativeModel,
        input: &RankingInput,
    ) -> Result<RankingOutput, FlowError> {
        ranking::run(self.flow(ranking::FLOW_NAME), model, input)
    }

    /// Project schedule impact for a what-if operational scenario.
    pub fn run_what_if_simulation(
        &self,
        model: &dyn GenerativeModel,
        input: &SimulationInput,
    ) -> Result<SimulationOutput, FlowError> {
        simulation::run(self.flow(simulation::FLOW_NAME), model, input)
    }

    /// Estimate the probability of fitness-certificate clearance.
    pub fn predict_certificate_clearance(
        &self,
        model: &dyn GenerativeModel,
        input: &ClearanceInput,
    ) -> Result<ClearanceOutput, FlowError> {
        clearance::run(self.flow(clearance::FLOW_NAME), model, input)
    }
}
