#[cfg(test)]
mod tests {
    use super::super::events::*;
    use super::super::scenario::*;
    use super::super::scheduler::EventScheduler;

    fn closure_event(step: u32, event_id: Option<&str>) -> ScenarioEvent {
        ScenarioEvent {
            kind: EventKind::BranchClosure(BranchClosureParams {
                location: "Sfax".to_string(),
                impact_intensity: 0.2,
                ..Default::default()
            }),
            step,
            event_id: event_id.map(|s| s.to_string()),
            description: None,
        }
    }

    #[test]
    fn test_scenario_creation_and_defaults() {
        let scenario = Scenario::new("test_scenario");
        assert_eq!(scenario.metadata.name, "test_scenario");
        assert_eq!(scenario.metadata.version, "1.0");
        assert_eq!(scenario.parameters.duration_steps, 100);
        assert!(scenario.events.is_empty());
        assert!(scenario.validate().is_valid());
    }

    #[test]
    fn test_validation_collects_all_issues() {
        let mut scenario = Scenario::new("");
        scenario.parameters.duration_steps = 0;
        scenario.parameters.agent_population = 0;
        scenario.expected_outcomes.push(ExpectedOutcome {
            metric_name: "churn_rate".to_string(),
            target_value: 0.1,
            tolerance: -0.5,
            measurement_steps: vec![500],
            comparison_type: ComparisonType::Equals,
        });

        let report = scenario.validate();
        assert!(!report.is_valid());
        // Every violation is listed, not just the first.
        assert!(report.issues.len() >= 4);
    }

    #[test]
    fn test_late_events_are_warnings_not_errors() {
        let mut scenario = Scenario::new("late");
        scenario.parameters.duration_steps = 10;
        scenario.events.push(closure_event(50, None));

        let report = scenario.validate();
        assert!(report.is_valid());
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("after simulation end"));
    }

    #[test]
    fn test_conflicting_events_flagged() {
        let mut scenario = Scenario::new("conflict");
        scenario.events.push(closure_event(5, None));
        scenario.events.push(ScenarioEvent {
            kind: EventKind::MarketingCampaign(MarketingCampaignParams {
                intensity: 0.5,
                ..Default::default()
            }),
            step: 5,
            event_id: None,
            description: None,
        });

        let report = scenario.validate();
        assert!(report.is_valid());
        assert!(report
            .warnings
            .iter()
            .any(|w| w.contains("conflicting events")));
    }

    #[test]
    fn test_measurement_steps_beyond_duration_are_hard_errors() {
        let mut scenario = Scenario::new("outcomes");
        scenario.parameters.duration_steps = 50;
        scenario.expected_outcomes.push(ExpectedOutcome {
            metric_name: "churn_rate".to_string(),
            target_value: 0.05,
            tolerance: 0.01,
            measurement_steps: vec![10, 50, 80],
            comparison_type: ComparisonType::LessThan,
        });

        let report = scenario.validate();
        assert!(!report.is_valid());
        assert!(report.issues[0].contains("churn_rate"));
    }

    #[test]
    fn test_duplicate_event_ids_yield_one_injected_one_failed() {
        let mut scenario = Scenario::new("duplicates");
        scenario.events.push(closure_event(5, Some("same_id")));
        scenario.events.push(closure_event(8, Some("same_id")));

        let mut scheduler = EventScheduler::new();
        let summary = scenario.execute(&mut scheduler);
        assert_eq!(
            summary,
            ExecutionSummary {
                injected: 1,
                failed: 1
            }
        );
        assert_eq!(scheduler.pending().len(), 1);
    }

    #[test]
    fn test_execute_clears_prior_pending_events() {
        let mut scheduler = EventScheduler::new();
        scheduler
            .inject(Event::new(
                "stale",
                3,
                EventKind::EconomicShock(EconomicShockParams {
                    severity: 0.9,
                    ..Default::default()
                }),
            ))
            .unwrap();

        let mut scenario = Scenario::new("fresh");
        scenario.events.push(closure_event(5, None));
        let summary = scenario.execute(&mut scheduler);

        assert_eq!(summary.injected, 1);
        let pending_ids: Vec<&str> =
            scheduler.pending().iter().map(|e| e.id.as_str()).collect();
        assert!(!pending_ids.contains(&"stale"));
    }

    #[test]
    fn test_scenario_document_roundtrip() {
        let json = r#"{
            "scenario_metadata": {
                "name": "Digital Push Q3",
                "description": "Accelerated digital adoption",
                "version": "1.0",
                "tags": ["digital"],
                "difficulty_level": "medium",
                "estimated_duration": 100
            },
            "simulation_parameters": {
                "duration_steps": 100,
                "warm_up_steps": 10,
                "agent_population": 1000,
                "random_seed": 42,
                "output_frequency": 5
            },
            "events": [
                {
                    "event_type": "DigitalTransformationEvent",
                    "step": 10,
                    "parameters": {
                        "service_type": "mobile_app",
                        "user_experience_score": 0.8
                    },
                    "description": "App relaunch"
                }
            ],
            "expected_outcomes": [
                {
                    "metric_name": "digital_share",
                    "target_value": 0.4,
                    "tolerance": 0.05,
                    "measurement_steps": [99],
                    "comparison_type": "greater_than"
                }
            ],
            "key_metrics_to_track": ["digital_share"],
            "risk_factors": []
        }"#;

        let scenario: Scenario = serde_json::from_str(json).unwrap();
        assert_eq!(scenario.metadata.name, "Digital Push Q3");
        assert_eq!(scenario.events.len(), 1);
        assert_eq!(scenario.events[0].step, 10);
        assert_eq!(
            scenario.expected_outcomes[0].comparison_type,
            ComparisonType::GreaterThan
        );
        assert!(scenario.validate().is_valid());

        let back = serde_json::to_string(&scenario).unwrap();
        let reparsed: Scenario = serde_json::from_str(&back).unwrap();
        assert_eq!(reparsed.metadata.name, scenario.metadata.name);
        assert_eq!(reparsed.events.len(), scenario.events.len());
    }

    #[test]
    fn test_expected_outcome_comparisons() {
        let outcome = ExpectedOutcome {
            metric_name: "churn_rate".to_string(),
            target_value: 0.05,
            tolerance: 0.01,
            measurement_steps: vec![50],
            comparison_type: ComparisonType::LessThan,
        };

        assert!(outcome.check(0.04, 50));
        assert!(!outcome.check(0.07, 50));
        // Vacuously true outside measurement steps.
        assert!(outcome.check(0.99, 10));

        let equals = ExpectedOutcome {
            metric_name: "avg_satisfaction".to_string(),
            target_value: 0.6,
            tolerance: 0.05,
            measurement_steps: vec![20],
            comparison_type: ComparisonType::Equals,
        };
        assert!(equals.check(0.64, 20));
        assert!(!equals.check(0.66, 20));
    }

    #[test]
    fn test_complexity_score_bounds() {
        let simple = Scenario::new("simple");
        let score = simple.complexity_score();
        assert!(score >= 0.0 && score <= 1.0);

        let mut busy = Scenario::new("busy");
        busy.parameters.duration_steps = 500;
        busy.parameters.agent_population = 100_000;
        for step in 0..40 {
            busy.events.push(closure_event(step, None));
        }
        let busy_score = busy.complexity_score();
        assert!(busy_score > score);
        assert!(busy_score <= 1.0);
    }

    #[test]
    fn test_standard_scenarios_all_validate() {
        for (name, scenario) in standard_scenarios() {
            let report = scenario.validate();
            assert!(report.is_valid(), "scenario '{name}' invalid: {report}");
        }
    }
}
