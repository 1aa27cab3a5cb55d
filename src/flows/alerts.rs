//! Predictive maintenance alerts from component-condition reports.
//!
//! The one flow whose model output is a JSON document inside a string field,
//! so the returned text passes through coercion twice: once for the response
//! object, once for the embedded alert array.

use crate::client::GenerativeModel;
use crate::coerce;
use crate::error::FlowError;
use crate::flow::FlowDefinition;
use crate::schema::{FieldSpec, SchemaDescriptor};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const FLOW_NAME: &str = "predictive_alerts";

const OUTPUT_FIELD: &str = "predictive_alerts";

const PROMPT: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/predictive_alerts.md"
));

/// Free-text condition report covering the fleet's components.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertsInput {
    pub component_conditions: String,
}

/// One predictive maintenance alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictiveAlert {
    pub affected_component: String,
    /// 0-100, higher is more urgent.
    pub risk_score: f64,
    pub recommended_actions: String,
}

pub(crate) fn definition() -> FlowDefinition {
    let input_schema = SchemaDescriptor::new().field(FieldSpec::string(
        "component_conditions",
        "A detailed description of the current conditions of various train components, \
         including sensor readings, maintenance history, and observed anomalies.",
    ));
    let output_schema = SchemaDescriptor::new().field(FieldSpec::string(
        OUTPUT_FIELD,
        "A JSON array of predictive maintenance alerts, each including the affected \
         component, a risk score (0-100), and recommended actions.",
    ));
    FlowDefinition::new(FLOW_NAME, input_schema, output_schema, PROMPT)
        .with_json_string_field(OUTPUT_FIELD)
}

pub(crate) fn run(
    definition: &FlowDefinition,
    model: &dyn GenerativeModel,
    input: &AlertsInput,
) -> Result<Vec<PredictiveAlert>, FlowError> {
    let input = serde_json::to_value(input)
        .map_err(|err| FlowError::validation(format!("input failed to serialize: {err}")))?;
    let output = definition.execute(model, &input)?;
    let raw = output
        .get(OUTPUT_FIELD)
        .and_then(Value::as_str)
        .ok_or_else(|| {
            FlowError::parse(
                format!("model response is missing the `{OUTPUT_FIELD}` text field"),
                output.to_string(),
            )
        })?;
    let alerts = coerce::coerce_json(raw)?;
    serde_json::from_value(alerts.clone()).map_err(|err| {
        FlowError::parse(
            format!("alert array does not match the expected shape: {err}"),
            alerts.to_string(),
        )
    })
}
