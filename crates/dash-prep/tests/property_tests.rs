//! Property tests for label normalization, type inference and JSON export.

use dash_prep::export::json_values;
use dash_prep::utils::BOOLEAN_TOKENS;
use dash_prep::{
    ColumnNameNormalizer, DataCleaner, InferredType, ProcessorConfig, ProfiledTable,
    StatisticsCalculator, TableSchema, TypeInferencer,
};
use polars::prelude::*;
use proptest::prelude::*;
use serde_json::Value;

/// Infer, clean and re-infer a single-column table.
fn types_before_and_after(series: Series) -> (InferredType, InferredType) {
    let config = ProcessorConfig::default();
    let inferred = TypeInferencer::infer(&series, &config);
    let profile = StatisticsCalculator::profile_column(&series, "value", inferred, &config);
    let table = ProfiledTable {
        schema: TableSchema::new(vec![profile]),
        frame: DataFrame::new(vec![series.into()]).unwrap(),
    };

    let cleaned = DataCleaner::clean(&table, false, &config).unwrap();
    let after = TypeInferencer::infer(
        cleaned.frame.column("value").unwrap().as_materialized_series(),
        &config,
    );
    (inferred, after)
}

fn any_present<T>(values: &[Option<T>]) -> bool {
    values.iter().any(Option::is_some)
}

proptest! {
    #[test]
    fn normalize_is_idempotent(raw in "\\PC{0,24}") {
        let once = ColumnNameNormalizer::normalize(&raw);
        prop_assert_eq!(ColumnNameNormalizer::normalize(&once), once.clone());
        prop_assert!(!once.is_empty());
    }

    #[test]
    fn normalize_all_yields_unique_names(
        labels in prop::collection::vec("[ a-zA-Z_$.-]{0,6}", 0..12)
    ) {
        let names = ColumnNameNormalizer::normalize_all(&labels);
        let distinct: std::collections::HashSet<&String> = names.iter().collect();
        prop_assert_eq!(names.len(), labels.len());
        prop_assert_eq!(distinct.len(), names.len());
    }

    #[test]
    fn json_values_are_always_finite(values in prop::collection::vec(
        prop::option::of(prop_oneof![
            any::<f64>(),
            Just(f64::NAN),
            Just(f64::INFINITY),
            Just(f64::NEG_INFINITY),
        ]),
        0..40,
    )) {
        let series = Series::new("x".into(), &values);
        for value in json_values(&series) {
            match value {
                Value::Null => {}
                Value::Number(n) => prop_assert!(n.as_f64().is_some_and(f64::is_finite)),
                other => prop_assert!(false, "unexpected value {:?}", other),
            }
        }
    }

    #[test]
    fn integer_columns_stay_integer(
        values in prop::collection::vec(prop::option::of(any::<i32>()), 1..40)
            .prop_filter("needs a value", |v| any_present(v))
    ) {
        let values: Vec<Option<i64>> = values.into_iter().map(|v| v.map(i64::from)).collect();
        let (before, after) = types_before_and_after(Series::new("value".into(), &values));
        prop_assert_eq!(before, InferredType::Int);
        prop_assert_eq!(after, InferredType::Int);
    }

    #[test]
    fn float_columns_stay_float(
        values in prop::collection::vec(prop::option::of(-1.0e6f64..1.0e6), 1..40)
            .prop_filter("needs a value", |v| any_present(v))
    ) {
        let (before, after) = types_before_and_after(Series::new("value".into(), &values));
        prop_assert_eq!(before, InferredType::Float);
        prop_assert_eq!(after, InferredType::Float);
    }

    #[test]
    fn word_columns_stay_text(
        values in prop::collection::vec(
            prop::option::of(
                "[a-z]{3,8}".prop_filter("not a boolean token", |w| {
                    !BOOLEAN_TOKENS.contains(&w.as_str())
                })
            ),
            1..30,
        )
        .prop_filter("needs a value", |v| any_present(v))
    ) {
        let (before, after) = types_before_and_after(Series::new("value".into(), &values));
        prop_assert_eq!(before, InferredType::String);
        prop_assert_eq!(after, InferredType::String);
    }
}
