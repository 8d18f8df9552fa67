#[cfg(test)]
mod tests {
    use super::super::metrics::*;
    use super::super::scenario::{ComparisonType, ExpectedOutcome};

    fn observation(total: usize, active: usize, satisfaction_sum: f64) -> PopulationObservation {
        PopulationObservation {
            total,
            active,
            satisfaction_sum,
            digital_dominant: active / 2,
            products_sum: active * 2,
        }
    }

    #[test]
    fn test_record_math() {
        let mut collector = MetricsCollector::new();
        collector.observe(0, &observation(100, 80, 48.0));

        let record = collector.latest().unwrap();
        assert_eq!(record.step, 0);
        assert!((record.avg_satisfaction - 0.6).abs() < 1e-9);
        assert!((record.churn_rate - 0.2).abs() < 1e-9);
        assert!((record.retention_rate - 0.8).abs() < 1e-9);
        assert!((record.digital_share - 0.5).abs() < 1e-9);
        assert!((record.active_products - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_metric_lookup_by_name() {
        let mut collector = MetricsCollector::new();
        collector.observe(3, &observation(10, 10, 6.0));
        let record = collector.record_at(3).unwrap();

        assert_eq!(record.metric("avg_satisfaction"), Some(0.6));
        assert_eq!(record.metric("churn_rate"), Some(0.0));
        assert_eq!(record.metric("not_a_metric"), None);
    }

    #[test]
    fn test_validate_less_than_outcome() {
        // Churn target < 0.05 with tolerance 0.01 at step 50 passes at
        // 0.04 and fails at 0.07.
        let outcome = ExpectedOutcome {
            metric_name: "churn_rate".to_string(),
            target_value: 0.05,
            tolerance: 0.01,
            measurement_steps: vec![50],
            comparison_type: ComparisonType::LessThan,
        };

        let mut passing = MetricsCollector::new();
        passing.observe(50, &observation(100, 96, 50.0));
        let results = passing.validate(std::slice::from_ref(&outcome));
        assert_eq!(results.len(), 1);
        assert!(results[0].valid);
        assert_eq!(results[0].actual_value, Some(0.04));

        let mut failing = MetricsCollector::new();
        failing.observe(50, &observation(100, 93, 50.0));
        let results = failing.validate(std::slice::from_ref(&outcome));
        assert!(!results[0].valid);
        assert_eq!(results[0].actual_value, Some(0.07));
    }

    #[test]
    fn test_validate_equals_with_tolerance() {
        let outcome = ExpectedOutcome {
            metric_name: "avg_satisfaction".to_string(),
            target_value: 0.6,
            tolerance: 0.05,
            measurement_steps: vec![10],
            comparison_type: ComparisonType::Equals,
        };

        let mut collector = MetricsCollector::new();
        collector.observe(10, &observation(10, 10, 6.3));
        let results = collector.validate(std::slice::from_ref(&outcome));
        assert!(results[0].valid);

        let mut out_of_band = MetricsCollector::new();
        out_of_band.observe(10, &observation(10, 10, 6.7));
        let results = out_of_band.validate(std::slice::from_ref(&outcome));
        assert!(!results[0].valid);
    }

    #[test]
    fn test_validate_missing_snapshot_fails() {
        let outcome = ExpectedOutcome {
            metric_name: "churn_rate".to_string(),
            target_value: 0.1,
            tolerance: 0.01,
            measurement_steps: vec![42],
            comparison_type: ComparisonType::LessThan,
        };

        let collector = MetricsCollector::new();
        let results = collector.validate(std::slice::from_ref(&outcome));
        assert_eq!(results.len(), 1);
        assert!(!results[0].valid);
        assert_eq!(results[0].actual_value, None);
    }

    #[test]
    fn test_one_result_per_measurement_step() {
        let outcome = ExpectedOutcome {
            metric_name: "retention_rate".to_string(),
            target_value: 0.5,
            tolerance: 0.0,
            measurement_steps: vec![10, 20, 30],
            comparison_type: ComparisonType::GreaterThan,
        };

        let mut collector = MetricsCollector::new();
        for step in [10, 20, 30] {
            collector.observe(step, &observation(100, 90, 50.0));
        }
        let results = collector.validate(std::slice::from_ref(&outcome));
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.valid));
    }

    #[test]
    fn test_empty_population_yields_zeroes() {
        let mut collector = MetricsCollector::new();
        collector.observe(0, &PopulationObservation::default());
        let record = collector.latest().unwrap();
        assert_eq!(record.avg_satisfaction, 0.0);
        assert_eq!(record.retention_rate, 0.0);
    }

    #[test]
    fn test_validation_result_display() {
        let result = ValidationResult {
            metric_name: "churn_rate".to_string(),
            step: 50,
            target_value: 0.05,
            actual_value: Some(0.04),
            comparison_type: ComparisonType::LessThan,
            valid: true,
        };
        let display = format!("{result}");
        assert!(display.contains("churn_rate"));
        assert!(display.contains("step 50"));
        assert!(display.contains("ok"));
    }
}
