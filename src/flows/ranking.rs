//! Induction ranking across the available fleet.

use crate::client::GenerativeModel;
use crate::error::FlowError;
use crate::flow::FlowDefinition;
use crate::schema::{FieldSpec, SchemaDescriptor};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const FLOW_NAME: &str = "induction_ranking";

const PROMPT: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/induction_ranking.md"
));

/// Attributes weighed when ranking one train for induction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainAttributes {
    pub train_id: String,
    pub fitness_certificate_status: String,
    pub job_card_status: String,
    /// Higher is more important.
    pub branding_priority: f64,
    pub mileage: f64,
    pub last_cleaning_date: String,
    pub stabling_constraints: String,
    /// 0-100.
    pub reliability_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingInput {
    pub trains: Vec<TrainAttributes>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedTrain {
    pub train_id: String,
    /// 1 is the strongest induction candidate.
    pub rank: u32,
    pub reasoning: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingOutput {
    pub ranked_trains: Vec<RankedTrain>,
}

pub(crate) fn definition() -> FlowDefinition {
    let train = SchemaDescriptor::new()
        .field(FieldSpec::string(
            "train_id",
            "The unique identifier of the train.",
        ))
        .field(FieldSpec::string(
            "fitness_certificate_status",
            "The status of the train fitness certificate (e.g., Valid, Expired).",
        ))
        .field(FieldSpec::string(
            "job_card_status",
            "The status of the job card (e.g., Open, Completed).",
        ))
        .field(FieldSpec::number(
            "branding_priority",
            "The branding priority of the train (higher is more important).",
        ))
        .field(FieldSpec::number(
            "mileage",
            "The current mileage of the train.",
        ))
        .field(FieldSpec::string(
            "last_cleaning_date",
            "The last cleaning date of the train.",
        ))
        .field(FieldSpec::string(
            "stabling_constraints",
            "Any stabling constraints for the train (related to accessibility).",
        ))
        .field(FieldSpec::number(
            "reliability_score",
            "The reliability score of the train (0-100%).",
        ));
    let input_schema = SchemaDescriptor::new().field(FieldSpec::array(
        "trains",
        train,
        "An array of train objects with their respective attributes.",
    ));

    let ranked = SchemaDescriptor::new()
        .field(FieldSpec::string(
            "train_id",
            "The unique identifier of the train.",
        ))
        .field(FieldSpec::number(
            "rank",
            "The rank of the train (lower is better).",
        ))
        .field(FieldSpec::string(
            "reasoning",
            "The reasoning for the assigned rank.",
        ));
    let output_schema = SchemaDescriptor::new().field(FieldSpec::array(
        "ranked_trains",
        ranked,
        "An array of ranked train objects with their reasoning.",
    ));

    FlowDefinition::new(FLOW_NAME, input_schema, output_schema, PROMPT)
}

pub(crate) fn run(
    definition: &FlowDefinition,
    model: &dyn GenerativeModel,
    input: &RankingInput,
) -> Result<RankingOutput, FlowError> {
    let input_value = serde_json::to_value(input)
        .map_err(|err| FlowError::validation(format!("input failed to serialize: {err}")))?;
    let output = definition.execute(model, &input_value)?;
    let ranking: RankingOutput = serde_json::from_value(output.clone()).map_err(|err| {
        FlowError::parse(
            format!("ranking does not match the expected shape: {err}"),
            output.to_string(),
        )
    })?;
    if let Err(detail) = check_completeness(&input.trains, &ranking) {
        return Err(FlowError::parse(detail, output.to_string()));
    }
    Ok(ranking)
}

/// Every input train must appear exactly once, with ranks forming a
/// permutation of `1..=N`.
fn check_completeness(trains: &[TrainAttributes], ranking: &RankingOutput) -> Result<(), String> {
    let expected: BTreeSet<&str> = trains.iter().map(|train| train.train_id.as_str()).collect();
    let entries = &ranking.ranked_trains;
    if entries.len() != trains.len() {
        return Err(format!(
            "ranking covers {} trains, expected {}",
            entries.len(),
            trains.len()
        ));
    }
    let mut seen = BTreeSet::new();
    for entry in entries {
        if !expected.contains(entry.train_id.as_str()) {
            return Err(format!("ranking names unknown train `{}`", entry.train_id));
        }
        if !seen.insert(entry.train_id.as_str()) {
            return Err(format!("train `{}` is ranked more than once", entry.train_id));
        }
    }
    let mut ranks: Vec<u32> = entries.iter().map(|entry| entry.rank).collect();
    ranks.sort_unstable();
    let sequential = ranks
        .iter()
        .enumerate()
        .all(|(index, rank)| *rank as usize == index + 1);
    if !sequential {
        return Err(format!(
            "ranks must form a permutation of 1..={}",
            entries.len()
        ));
    }
    Ok(())
}
