//! What-if projections over operational scenario conditions.

use crate::client::GenerativeModel;
use crate::error::FlowError;
use crate::flow::FlowDefinition;
use crate::schema::{FieldSpec, SchemaDescriptor};
use serde::{Deserialize, Serialize};

pub const FLOW_NAME: &str = "what_if_simulation";

const PROMPT: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/what_if_simulation.md"
));

/// Free-text scenario conditions to project against the schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationInput {
    pub maintenance_delay: String,
    pub certificate_risk: String,
    pub cleaning_slot: String,
    pub track_closure: String,
    pub demand: String,
    pub weather: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationOutput {
    pub predicted_schedule_impact: String,
    pub resource_allocation_changes: String,
    pub potential_disruptions: String,
}

pub(crate) fn definition() -> FlowDefinition {
    let input_schema = SchemaDescriptor::new()
        .field(FieldSpec::string(
            "maintenance_delay",
            "Potential delays in maintenance activities (e.g., \"HVAC repair on T-003 \
             delayed by 2 hours\").",
        ))
        .field(FieldSpec::string(
            "certificate_risk",
            "Risks related to certificate clearance (e.g., \"T-007 has a 50% chance of \
             failing inspection\").",
        ))
        .field(FieldSpec::string(
            "cleaning_slot",
            "Availability of cleaning slots (e.g., \"Washing line 1 occupied until 4 PM\").",
        ))
        .field(FieldSpec::string(
            "track_closure",
            "Any planned or unplanned track closures (e.g., \"Mainline South closed for \
             1 hour\").",
        ))
        .field(FieldSpec::string(
            "demand",
            "Passenger demand forecasts (e.g., \"High demand expected for evening peak \
             hours\").",
        ))
        .field(FieldSpec::string(
            "weather",
            "Current or forecasted weather conditions (e.g., \"Heavy rain expected\").",
        ));

    let output_schema = SchemaDescriptor::new()
        .field(FieldSpec::string(
            "predicted_schedule_impact",
            "The predicted impact on the train schedule.",
        ))
        .field(FieldSpec::string(
            "resource_allocation_changes",
            "The recommended changes to resource allocation.",
        ))
        .field(FieldSpec::string(
            "potential_disruptions",
            "A description of potential disruptions.",
        ));

    FlowDefinition::new(FLOW_NAME, input_schema, output_schema, PROMPT)
}

pub(crate) fn run(
    definition: &FlowDefinition,
    model: &dyn GenerativeModel,
    input: &SimulationInput,
) -> Result<SimulationOutput, FlowError> {
    let input = serde_json::to_value(input)
        .map_err(|err| FlowError::validation(format!("input failed to serialize: {err}")))?;
    let output = definition.execute(model, &input)?;
    serde_json::from_value(output.clone()).map_err(|err| {
        FlowError::parse(
            format!("simulation result does not match the expected shape: {err}"),
            output.to_string(),
        )
    })
}
