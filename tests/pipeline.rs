//! Flow pipeline tests against scripted model doubles.

use std::sync::Mutex;

use fleetwise::client::GenerativeModel;
use fleetwise::error::FlowError;
use fleetwise::flow::FlowRegistry;
use fleetwise::flows::alerts::{AlertsInput, PredictiveAlert};
use fleetwise::flows::clearance::ClearanceInput;
use fleetwise::flows::ranking::{RankingInput, TrainAttributes};
use fleetwise::flows::simulation::SimulationInput;
use fleetwise::schema::SchemaDescriptor;
use serde_json::json;

/// Returns a fixed response regardless of the prompt.
struct ScriptedModel {
    response: String,
}

impl ScriptedModel {
    fn new(response: impl Into<String>) -> Self {
        ScriptedModel {
            response: response.into(),
        }
    }
}

impl GenerativeModel for ScriptedModel {
    fn generate(&self, _prompt: &str, _schema: &SchemaDescriptor) -> Result<String, FlowError> {
        Ok(self.response.clone())
    }
}

/// Fails the test if the pipeline reaches the model call.
struct UnreachableModel;

impl GenerativeModel for UnreachableModel {
    fn generate(&self, _prompt: &str, _schema: &SchemaDescriptor) -> Result<String, FlowError> {
        panic!("model must not be invoked for invalid input");
    }
}

/// Always reports an upstream service failure.
struct FailingModel;

impl GenerativeModel for FailingModel {
    fn generate(&self, _prompt: &str, _schema: &SchemaDescriptor) -> Result<String, FlowError> {
        Err(FlowError::service("upstream unavailable"))
    }
}

/// Records every prompt it receives before answering.
struct RecordingModel {
    response: String,
    prompts: Mutex<Vec<String>>,
}

impl RecordingModel {
    fn new(response: impl Into<String>) -> Self {
        RecordingModel {
            response: response.into(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn last_prompt(&self) -> String {
        self.prompts
            .lock()
            .expect("prompt log")
            .last()
            .cloned()
            .expect("at least one prompt recorded")
    }
}

impl GenerativeModel for RecordingModel {
    fn generate(&self, prompt: &str, _schema: &SchemaDescriptor) -> Result<String, FlowError> {
        self.prompts
            .lock()
            .expect("prompt log")
            .push(prompt.to_string());
        Ok(self.response.clone())
    }
}

fn train(id: &str, mileage: f64) -> TrainAttributes {
    TrainAttributes {
        train_id: id.to_string(),
        fitness_certificate_status: "Valid".to_string(),
        job_card_status: "Completed".to_string(),
        branding_priority: 3.0,
        mileage,
        last_cleaning_date: "2024-07-28".to_string(),
        stabling_constraints: "None".to_string(),
        reliability_score: 95.0,
    }
}

fn ranking_response(entries: &[(&str, u32)]) -> String {
    let ranked: Vec<_> = entries
        .iter()
        .map(|(id, rank)| json!({"train_id": id, "rank": rank, "reasoning": "fit for service"}))
        .collect();
    json!({"ranked_trains": ranked}).to_string()
}

#[test]
fn predictive_alerts_strip_fences_and_parse() {
    let registry = FlowRegistry::standard();
    let inner = "```json\n[{\"affected_component\":\"Bearing\",\"risk_score\":10,\"recommended_actions\":\"Monitor\"}]\n```";
    let model = ScriptedModel::new(json!({"predictive_alerts": inner}).to_string());

    let alerts = registry
        .generate_predictive_alerts(
            &model,
            &AlertsInput {
                component_conditions: "Train X: bearing temperature nominal.".to_string(),
            },
        )
        .expect("alerts flow");

    assert_eq!(
        alerts,
        vec![PredictiveAlert {
            affected_component: "Bearing".to_string(),
            risk_score: 10.0,
            recommended_actions: "Monitor".to_string(),
        }]
    );
}

#[test]
fn predictive_alerts_accept_fence_free_payloads() {
    let registry = FlowRegistry::standard();
    let inner = "[{\"affected_component\":\"Bearing\",\"risk_score\":10,\"recommended_actions\":\"Monitor\"}]";
    let model = ScriptedModel::new(json!({"predictive_alerts": inner}).to_string());

    let alerts = registry
        .generate_predictive_alerts(
            &model,
            &AlertsInput {
                component_conditions: "Train X: bearing temperature nominal.".to_string(),
            },
        )
        .expect("alerts flow");

    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].affected_component, "Bearing");
}

#[test]
fn garbled_alert_payload_is_a_parse_error_with_payload() {
    let registry = FlowRegistry::standard();
    let model = ScriptedModel::new(json!({"predictive_alerts": "```\nnot json\n```"}).to_string());

    let err = registry
        .generate_predictive_alerts(
            &model,
            &AlertsInput {
                component_conditions: "All nominal.".to_string(),
            },
        )
        .unwrap_err();

    match err {
        FlowError::Parse { payload, .. } => assert_eq!(payload, "not json"),
        other => panic!("expected parse error, got {other}"),
    }
}

#[test]
fn ranking_returns_the_model_permutation() {
    let registry = FlowRegistry::standard();
    let model = ScriptedModel::new(ranking_response(&[("T-002", 1), ("T-001", 2)]));
    let input = RankingInput {
        trains: vec![train("T-001", 18000.0), train("T-002", 9000.0)],
    };

    let ranking = registry
        .rank_trains_for_induction(&model, &input)
        .expect("ranking flow");

    assert_eq!(ranking.ranked_trains.len(), 2);
    assert_eq!(ranking.ranked_trains[0].train_id, "T-002");
    assert_eq!(ranking.ranked_trains[0].rank, 1);
}

#[test]
fn incomplete_ranking_is_rejected_as_parse_error() {
    let registry = FlowRegistry::standard();
    let model = ScriptedModel::new(ranking_response(&[("T-001", 1)]));
    let input = RankingInput {
        trains: vec![train("T-001", 18000.0), train("T-002", 9000.0)],
    };

    let err = registry.rank_trains_for_induction(&model, &input).unwrap_err();
    assert!(matches!(err, FlowError::Parse { .. }));
}

#[test]
fn duplicated_rank_is_rejected_as_parse_error() {
    let registry = FlowRegistry::standard();
    let model = ScriptedModel::new(ranking_response(&[("T-001", 1), ("T-002", 1)]));
    let input = RankingInput {
        trains: vec![train("T-001", 18000.0), train("T-002", 9000.0)],
    };

    let err = registry.rank_trains_for_induction(&model, &input).unwrap_err();
    match err {
        FlowError::Parse { detail, .. } => assert!(detail.contains("permutation")),
        other => panic!("expected parse error, got {other}"),
    }
}

#[test]
fn ranking_prompt_lists_every_train_in_input_order() {
    let registry = FlowRegistry::standard();
    let model = RecordingModel::new(ranking_response(&[("T-001", 1), ("T-002", 2)]));
    let input = RankingInput {
        trains: vec![train("T-001", 18000.0), train("T-002", 9000.0)],
    };

    registry
        .rank_trains_for_induction(&model, &input)
        .expect("ranking flow");

    let prompt = model.last_prompt();
    let first = prompt.find("Train ID: T-001").expect("first train in prompt");
    let second = prompt.find("Train ID: T-002").expect("second train in prompt");
    assert!(first < second);
    assert!(prompt.contains("Mileage: 18000"));
}

#[test]
fn invalid_input_never_reaches_the_model() {
    let registry = FlowRegistry::standard();
    let cases = [
        ("predictive_alerts", json!({})),
        ("induction_ranking", json!({"trains": [{"train_id": "T-001"}]})),
        ("what_if_simulation", json!({"maintenance_delay": "none"})),
        ("certificate_clearance", json!({"weather_condition": "Sunny"})),
    ];
    for (name, input) in cases {
        let flow = registry.get(name).expect("registered flow");
        let err = flow.execute(&UnreachableModel, &input).unwrap_err();
        assert!(
            matches!(err, FlowError::Validation { .. }),
            "flow `{name}` should fail validation"
        );
    }
}

#[test]
fn simulation_passes_structured_output_through() {
    let registry = FlowRegistry::standard();
    let model = ScriptedModel::new(
        json!({
            "predicted_schedule_impact": "Evening peak headway widens by 3 minutes.",
            "resource_allocation_changes": "Move T-004 to standby on Mainline South.",
            "potential_disruptions": "Washing backlog may delay two departures.",
        })
        .to_string(),
    );
    let input = SimulationInput {
        maintenance_delay: "HVAC repair on T-003 delayed by 2 hours".to_string(),
        certificate_risk: "T-007 has a 50% chance of failing inspection".to_string(),
        cleaning_slot: "Washing line 1 occupied until 4 PM".to_string(),
        track_closure: "Mainline South closed for 1 hour".to_string(),
        demand: "High demand expected for evening peak hours".to_string(),
        weather: "Heavy rain expected".to_string(),
    };

    let projection = registry
        .run_what_if_simulation(&model, &input)
        .expect("simulation flow");
    assert!(projection.predicted_schedule_impact.contains("headway"));
}

#[test]
fn service_failure_is_passed_through_unchanged() {
    let registry = FlowRegistry::standard();
    let input = SimulationInput {
        maintenance_delay: "None".to_string(),
        certificate_risk: "None".to_string(),
        cleaning_slot: "Free".to_string(),
        track_closure: "None".to_string(),
        demand: "Normal".to_string(),
        weather: "Sunny".to_string(),
    };

    let err = registry
        .run_what_if_simulation(&FailingModel, &input)
        .unwrap_err();
    match err {
        FlowError::Service { detail } => assert!(detail.contains("upstream unavailable")),
        other => panic!("expected service error, got {other}"),
    }
}

#[test]
fn clearance_probability_within_bounds_is_accepted() {
    let registry = FlowRegistry::standard();
    let model = ScriptedModel::new(
        json!({"probability": 0.85, "reasoning": "Recent maintenance is clean."}).to_string(),
    );
    let input = ClearanceInput {
        weather_condition: "Rainy".to_string(),
        train_model: "Alstom Metropolis".to_string(),
        maintenance_history: "Regular 30-day check completed last week.".to_string(),
        last_inspection_date: "2024-07-01".to_string(),
    };

    let clearance = registry
        .predict_certificate_clearance(&model, &input)
        .expect("clearance flow");
    assert!((0.0..=1.0).contains(&clearance.probability));
}

#[test]
fn out_of_range_probability_is_a_parse_error() {
    let registry = FlowRegistry::standard();
    let model = ScriptedModel::new(
        json!({"probability": 1.2, "reasoning": "Over-confident."}).to_string(),
    );
    let input = ClearanceInput {
        weather_condition: "Sunny".to_string(),
        train_model: "Alstom Metropolis".to_string(),
        maintenance_history: "No issues.".to_string(),
        last_inspection_date: "2024-07-01".to_string(),
    };

    let err = registry
        .predict_certificate_clearance(&model, &input)
        .unwrap_err();
    match err {
        FlowError::Parse { detail, .. } => assert!(detail.contains("outside")),
        other => panic!("expected parse error, got {other}"),
    }
}

#[test]
fn malformed_inspection_date_fails_validation() {
    let registry = FlowRegistry::standard();
    let input = ClearanceInput {
        weather_condition: "Sunny".to_string(),
        train_model: "Alstom Metropolis".to_string(),
        maintenance_history: "No issues.".to_string(),
        last_inspection_date: "July 1st".to_string(),
    };

    let err = registry
        .predict_certificate_clearance(&UnreachableModel, &input)
        .unwrap_err();
    assert!(matches!(err, FlowError::Validation { .. }));
}
