//! Plan-driven derived columns.
//!
//! KPI aggregates requested by a dashboard plan are appended after the
//! cleaned columns, followed by calendar columns for every timestamp
//! column.

use chrono::Datelike;
use polars::prelude::*;
use std::collections::HashSet;
use tracing::{debug, warn};

use super::CleanedTable;
use crate::config::ProcessorConfig;
use crate::error::{Result, ResultExt};
use crate::profiler::ColumnNameNormalizer;
use crate::types::{DashboardPlan, InferredType, Kpi, KpiCalculation};
use crate::utils::{is_integer_dtype, millis_to_datetime, series_to_f64, series_to_millis};

/// Builder of plan-requested and calendar columns.
pub struct DerivedColumns;

impl DerivedColumns {
    /// Append KPI columns for `plan` and calendar columns for every
    /// timestamp column.
    pub fn apply(
        table: &mut CleanedTable,
        plan: &DashboardPlan,
        config: &ProcessorConfig,
    ) -> Result<()> {
        for kpi in &plan.kpis {
            Self::apply_kpi(table, kpi, config)?;
        }
        Self::add_calendar_columns(table)
    }

    fn apply_kpi(table: &mut CleanedTable, kpi: &Kpi, config: &ProcessorConfig) -> Result<()> {
        if kpi.name.is_empty() || kpi.field.is_empty() {
            return Ok(());
        }
        let Some(calculation) = kpi.parsed_calculation() else {
            debug!(
                "Ignoring KPI '{}' with calculation '{}'",
                kpi.name, kpi.calculation
            );
            return Ok(());
        };
        let Some(field) = Self::resolve_field(&table.frame, &kpi.field) else {
            debug!("Ignoring KPI '{}': no column '{}'", kpi.name, kpi.field);
            return Ok(());
        };

        let source = table.frame.column(&field)?.as_materialized_series().clone();
        let numeric = table
            .column_types
            .iter()
            .any(|(name, t)| name == &field && t.is_numeric());
        if calculation != KpiCalculation::Count && !numeric {
            warn!(
                "Skipping KPI '{}': column '{}' is not numeric",
                kpi.name, field
            );
            return Ok(());
        }

        let output = format!("{}_{}", kpi.name, calculation.column_suffix());
        let (series, output_type) = match calculation {
            KpiCalculation::Sum if is_integer_dtype(source.dtype()) => {
                let values = source.cast(&DataType::Int64)?;
                let values: Vec<Option<i64>> = values.i64()?.into_iter().collect();
                (
                    Series::new(output.as_str().into(), running_sum_int(&values)),
                    InferredType::Int,
                )
            }
            KpiCalculation::Sum => (
                Series::new(output.as_str().into(), running_sum(&series_to_f64(&source)?)),
                InferredType::Float,
            ),
            KpiCalculation::Average => (
                Series::new(
                    output.as_str().into(),
                    rolling_mean(&series_to_f64(&source)?, config.rolling_window),
                ),
                InferredType::Float,
            ),
            KpiCalculation::Count => (
                Series::new(output.as_str().into(), vec![1i64; source.len()]),
                InferredType::Int,
            ),
        };

        let output = Self::put_column(table, series, output_type)?;
        table.steps.push(format!(
            "Added KPI column '{}' ({} of '{}')",
            output,
            kpi.calculation.trim().to_ascii_uppercase(),
            field
        ));
        Ok(())
    }

    /// Year, month, quarter and weekday name for every timestamp column.
    fn add_calendar_columns(table: &mut CleanedTable) -> Result<()> {
        let date_columns: Vec<String> = table
            .column_types
            .iter()
            .filter(|(_, t)| *t == InferredType::Datetime)
            .map(|(name, _)| name.clone())
            .collect();

        for name in date_columns {
            let series = table.frame.column(&name)?.as_materialized_series().clone();
            let dates: Vec<_> = series_to_millis(&series)?
                .into_iter()
                .map(|v| v.and_then(millis_to_datetime))
                .collect();

            let year: Vec<Option<i64>> = dates.iter().map(|d| d.map(|d| d.year() as i64)).collect();
            let month: Vec<Option<i64>> =
                dates.iter().map(|d| d.map(|d| d.month() as i64)).collect();
            let quarter: Vec<Option<i64>> = dates
                .iter()
                .map(|d| d.map(|d| ((d.month() - 1) / 3 + 1) as i64))
                .collect();
            let weekday: Vec<Option<String>> = dates
                .iter()
                .map(|d| d.map(|d| d.format("%A").to_string()))
                .collect();

            Self::put_column(
                table,
                Series::new(format!("{}_Year", name).into(), year),
                InferredType::Int,
            )?;
            Self::put_column(
                table,
                Series::new(format!("{}_Month", name).into(), month),
                InferredType::Int,
            )?;
            Self::put_column(
                table,
                Series::new(format!("{}_Quarter", name).into(), quarter),
                InferredType::Int,
            )?;
            Self::put_column(
                table,
                Series::new(format!("{}_DayOfWeek", name).into(), weekday),
                InferredType::String,
            )?;
            table
                .steps
                .push(format!("Added calendar columns for '{}'", name));
        }
        Ok(())
    }

    /// Exact column name first, then the normalized form of `field`.
    fn resolve_field(frame: &DataFrame, field: &str) -> Option<String> {
        let has = |name: &str| frame.get_column_names().iter().any(|c| c.as_str() == name);
        if has(field) {
            return Some(field.to_string());
        }
        let normalized = ColumnNameNormalizer::normalize(field);
        has(&normalized).then_some(normalized)
    }

    /// Append a column, keeping `column_types` in step. A name already in
    /// the table gets a `_2`, `_3`, ... suffix; the final name is returned.
    fn put_column(
        table: &mut CleanedTable,
        series: Series,
        data_type: InferredType,
    ) -> Result<String> {
        let taken: HashSet<String> = table
            .frame
            .get_column_names()
            .into_iter()
            .map(|n| n.to_string())
            .collect();
        let name = ColumnNameNormalizer::disambiguate(series.name().as_str(), &taken);
        if name != series.name().as_str() {
            warn!(
                "Column '{}' already exists, adding derived column as '{}'",
                series.name(),
                name
            );
        }

        table
            .frame
            .with_column(series.with_name(name.as_str().into()))
            .context(format!("Failed to add column '{}'", name))?;
        table.column_types.push((name.clone(), data_type));
        Ok(name)
    }
}

/// Cumulative sum in row order; nulls stay null and do not reset the total.
fn running_sum(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut total = 0.0;
    values
        .iter()
        .map(|v| {
            v.map(|x| {
                total += x;
                total
            })
        })
        .collect()
}

fn running_sum_int(values: &[Option<i64>]) -> Vec<Option<i64>> {
    let mut total = 0i64;
    values
        .iter()
        .map(|v| {
            v.map(|x| {
                total = total.saturating_add(x);
                total
            })
        })
        .collect()
}

/// Trailing mean over `window` rows, allowing partial windows.
fn rolling_mean(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    let window = window.max(1);
    (0..values.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(window);
            let present: Vec<f64> = values[start..=i].iter().flatten().copied().collect();
            if present.is_empty() {
                None
            } else {
                Some(present.iter().sum::<f64>() / present.len() as f64)
            }
        })
        .collect()
}
