use carbon_audit::{
    aggregate, score, EmissionFactorTable, OverallStatus, QuantityRecord, SourceType,
};
use proptest::prelude::*;
use proptest::test_runner::Config;

fn source_type_strategy() -> impl Strategy<Value = SourceType> {
    prop_oneof![
        Just(SourceType::Electricity),
        Just(SourceType::NaturalGas),
        Just(SourceType::Diesel),
        Just(SourceType::Gasoline),
        Just(SourceType::PeakDemand),
        Just(SourceType::Other("propane".to_string())),
    ]
}

fn record_strategy() -> impl Strategy<Value = QuantityRecord> {
    (
        source_type_strategy(),
        0.0_f64..1_000_000.0,
        0.0_f64..=1.0,
        0_usize..4,
    )
        .prop_map(|(source_type, value, confidence, doc)| QuantityRecord {
            source_type,
            value,
            unit: "unit".to_string(),
            confidence,
            source: "generated".to_string(),
            document_id: format!("doc_{doc}"),
        })
}

fn factor_table_strategy() -> impl Strategy<Value = EmissionFactorTable> {
    proptest::collection::vec(0.0_f64..50.0, 5).prop_map(|factors| {
        EmissionFactorTable::from_entries(SourceType::KNOWN.into_iter().zip(factors))
            .expect("generated factors are valid")
    })
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
}

proptest! {
    #![proptest_config(Config::with_cases(128))]

    #[test]
    fn totals_stay_finite_for_any_magnitude(
        values in proptest::collection::vec(0.0_f64..=f64::MAX, 0..10),
    ) {
        let records: Vec<QuantityRecord> = values
            .into_iter()
            .map(|value| QuantityRecord {
                source_type: SourceType::Diesel,
                value,
                unit: "gallons".to_string(),
                confidence: 0.9,
                source: "generated".to_string(),
                document_id: "doc_0".to_string(),
            })
            .collect();
        let agg = aggregate(&records, &EmissionFactorTable::default());
        prop_assert!(agg.total_emissions.is_finite());
        for detail in &agg.calculation_details {
            prop_assert!(detail.emissions.is_finite());
        }
        let result = score(&agg);
        prop_assert!(result.overall_score.is_finite());
    }

    #[test]
    fn total_is_sum_of_value_times_factor(
        records in proptest::collection::vec(record_strategy(), 0..40),
        factors in factor_table_strategy(),
    ) {
        let agg = aggregate(&records, &factors);
        let expected: f64 = records
            .iter()
            .map(|r| r.value * factors.factor_for(&r.source_type))
            .sum();
        prop_assert!(close(agg.total_emissions, expected));

        let from_details: f64 = agg.calculation_details.iter().map(|d| d.emissions).sum();
        prop_assert!(close(agg.total_emissions, from_details));
        prop_assert_eq!(agg.calculation_details.len(), records.len());
    }

    #[test]
    fn type_totals_add_up_to_total(
        records in proptest::collection::vec(record_strategy(), 0..40),
        factors in factor_table_strategy(),
    ) {
        let agg = aggregate(&records, &factors);
        let by_type: f64 = agg.emissions_by_type.iter().map(|t| t.total).sum();
        prop_assert!(close(by_type, agg.total_emissions));

        let counted: usize = agg.emissions_by_type.iter().map(|t| t.count).sum();
        prop_assert_eq!(counted, records.len());

        let by_document: f64 = agg.emissions_by_document.iter().map(|d| d.emissions).sum();
        prop_assert!(close(by_document, agg.total_emissions));
    }

    #[test]
    fn total_never_decreases_as_records_are_added(
        records in proptest::collection::vec(record_strategy(), 1..30),
        factors in factor_table_strategy(),
    ) {
        let mut previous = 0.0;
        for n in 0..=records.len() {
            let total = aggregate(&records[..n], &factors).total_emissions;
            prop_assert!(total >= previous);
            previous = total;
        }
    }

    #[test]
    fn overall_score_is_bounded_and_matches_status(
        records in proptest::collection::vec(record_strategy(), 0..40),
    ) {
        let result = score(&aggregate(&records, &EmissionFactorTable::default()));
        prop_assert!((0.0..=100.0).contains(&result.overall_score));

        let mean = result.checks.iter().map(|c| c.score).sum::<f64>() / result.checks.len() as f64;
        prop_assert!(close(mean, result.overall_score));

        let expected = if result.overall_score >= 80.0 {
            OverallStatus::Compliant
        } else if result.overall_score >= 60.0 {
            OverallStatus::Partial
        } else {
            OverallStatus::NonCompliant
        };
        prop_assert_eq!(result.overall_status, expected);
        for check in &result.checks {
            prop_assert!(check.score.is_finite());
            prop_assert!((0.0..=100.0).contains(&check.score));
        }
    }

    #[test]
    fn repeated_runs_are_bit_identical(
        records in proptest::collection::vec(record_strategy(), 0..40),
    ) {
        let factors = EmissionFactorTable::default();
        let first = aggregate(&records, &factors);
        let second = aggregate(&records, &factors);
        prop_assert_eq!(first.total_emissions.to_bits(), second.total_emissions.to_bits());
        prop_assert_eq!(&first, &second);

        let a = score(&first);
        let b = score(&second);
        prop_assert_eq!(a.overall_score.to_bits(), b.overall_score.to_bits());
        prop_assert_eq!(&a, &b);
    }
}
