//! Certificate-clearance probability estimates.

use crate::client::GenerativeModel;
use crate::error::FlowError;
use crate::flow::FlowDefinition;
use crate::schema::{FieldSpec, SchemaDescriptor, StringFormat};
use serde::{Deserialize, Serialize};

pub const FLOW_NAME: &str = "certificate_clearance";

const PROMPT: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/certificate_clearance.md"
));

/// Conditions weighed when estimating clearance probability for one train.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearanceInput {
    pub weather_condition: String,
    pub train_model: String,
    pub maintenance_history: String,
    /// `YYYY-MM-DD`.
    pub last_inspection_date: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearanceOutput {
    /// Probability of clearance in the closed interval [0, 1].
    pub probability: f64,
    pub reasoning: String,
}

pub(crate) fn definition() -> FlowDefinition {
    let input_schema = SchemaDescriptor::new()
        .field(FieldSpec::string(
            "weather_condition",
            "The prevailing weather condition (e.g., Sunny, Rainy, Stormy).",
        ))
        .field(FieldSpec::string(
            "train_model",
            "The model of the train under inspection.",
        ))
        .field(FieldSpec::string(
            "maintenance_history",
            "A summary of recent maintenance activity and reported issues.",
        ))
        .field(
            FieldSpec::string(
                "last_inspection_date",
                "The date of the last fitness inspection.",
            )
            .with_format(StringFormat::Date),
        );

    let output_schema = SchemaDescriptor::new()
        .field(FieldSpec::number(
            "probability",
            "The probability of certificate clearance, between 0 and 1.",
        ))
        .field(FieldSpec::string(
            "reasoning",
            "The reasoning behind the estimated probability.",
        ));

    FlowDefinition::new(FLOW_NAME, input_schema, output_schema, PROMPT)
}

pub(crate) fn run(
    definition: &FlowDefinition,
    model: &dyn GenerativeModel,
    input: &ClearanceInput,
) -> Result<ClearanceOutput, FlowError> {
    let input = serde_json::to_value(input)
        .map_err(|err| FlowError::validation(format!("input failed to serialize: {err}")))?;
    let output = definition.execute(model, &input)?;
    let clearance: ClearanceOutput = serde_json::from_value(output.clone()).map_err(|err| {
        FlowError::parse(
            format!("clearance result does not match the expected shape: {err}"),
            output.to_string(),
        )
    })?;
    if !(0.0..=1.0).contains(&clearance.probability) {
        return Err(FlowError::parse(
            format!(
                "probability {} is outside the [0, 1] range",
                clearance.probability
            ),
            output.to_string(),
        ));
    }
    Ok(clearance)
}
