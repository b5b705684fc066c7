//! Descriptive summaries of a table, for the runner's report.
//!
//! Numeric columns get count/mean/std/min/quartiles/max over their set
//! cells (sample std, quartiles by linear interpolation). Text columns get
//! count/unique/top/freq; ties for `top` go to the label seen first.
//! Liability histograms share one symmetric range across groups so their
//! shapes can be compared directly.

use crate::{
    error::{SimError, SimResult},
    stats,
    table::{Column, Table},
    types::{DISEASE_LIABILITY_COLUMN, GROUP_COLUMN},
};
use std::collections::HashMap;
use std::fmt;

const STAGE: &str = "summary";

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnSummary {
    Numeric {
        name:  String,
        count: usize,
        mean:  f64,
        std:   f64,
        min:   f64,
        q25:   f64,
        q50:   f64,
        q75:   f64,
        max:   f64,
    },
    Text {
        name:   String,
        count:  usize,
        unique: usize,
        top:    Option<String>,
        freq:   usize,
    },
}

pub fn describe(table: &Table) -> Vec<ColumnSummary> {
    table
        .columns()
        .map(|(name, column)| match column {
            Column::Text(values) => describe_text(name, values),
            _ => {
                let values: Vec<f64> = (0..column.len()).filter_map(|r| column.numeric(r)).collect();
                describe_numeric(name, &values)
            }
        })
        .collect()
}

fn describe_numeric(name: &str, values: &[f64]) -> ColumnSummary {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let q = |p: f64| {
        if sorted.is_empty() {
            f64::NAN
        } else {
            stats::percentile_sorted(&sorted, p)
        }
    };
    ColumnSummary::Numeric {
        name:  name.to_string(),
        count: values.len(),
        mean:  stats::mean(values),
        std:   stats::sample_std(values),
        min:   q(0.0),
        q25:   q(25.0),
        q50:   q(50.0),
        q75:   q(75.0),
        max:   q(100.0),
    }
}

fn describe_text(name: &str, values: &[Option<String>]) -> ColumnSummary {
    let mut order: Vec<&str> = Vec::new();
    let mut freq: HashMap<&str, usize> = HashMap::new();
    for v in values.iter().flatten() {
        let count = freq.entry(v.as_str()).or_insert(0);
        if *count == 0 {
            order.push(v.as_str());
        }
        *count += 1;
    }
    let mut top: Option<(&str, usize)> = None;
    for label in &order {
        let n = freq[label];
        if top.map_or(true, |(_, best)| n > best) {
            top = Some((*label, n));
        }
    }
    ColumnSummary::Text {
        name:   name.to_string(),
        count:  values.iter().flatten().count(),
        unique: order.len(),
        top:    top.map(|(label, _)| label.to_string()),
        freq:   top.map_or(0, |(_, n)| n),
    }
}

impl fmt::Display for ColumnSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric { name, count, mean, std, min, q25, q50, q75, max } => write!(
                f,
                "{name:<28} count={count:<6} mean={mean:>10.4} std={std:>9.4} \
                 min={min:>10.4} 25%={q25:>10.4} 50%={q50:>10.4} 75%={q75:>10.4} max={max:>10.4}"
            ),
            Self::Text { name, count, unique, top, freq } => write!(
                f,
                "{name:<28} count={count:<6} unique={unique:<3} top={:<10} freq={freq}",
                top.as_deref().unwrap_or("-")
            ),
        }
    }
}

/// Histogram of one group's liability values over `[lower, upper]`.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupHistogram {
    pub group:  String,
    pub lower:  f64,
    pub upper:  f64,
    pub counts: Vec<usize>,
}

impl GroupHistogram {
    pub fn bin_width(&self) -> f64 {
        (self.upper - self.lower) / self.counts.len() as f64
    }
}

/// Per-group histograms of the liability column, groups in order of first
/// appearance, all over `[-m, m]` with `m` the largest absolute liability.
pub fn liability_histograms(table: &Table, bins: usize) -> SimResult<Vec<GroupHistogram>> {
    if bins == 0 {
        return Err(SimError::config(STAGE, "bins", "must be positive"));
    }
    let liability = table.dense_numeric(DISEASE_LIABILITY_COLUMN, STAGE)?;
    let groups = table.text(GROUP_COLUMN, STAGE)?;

    let bound = liability.iter().fold(0.0f64, |m, l| m.max(l.abs()));
    let (lower, upper) = if bound > 0.0 { (-bound, bound) } else { (-1.0, 1.0) };
    let width = (upper - lower) / bins as f64;

    let mut histograms: Vec<GroupHistogram> = Vec::new();
    for (value, group) in liability.iter().zip(groups) {
        let Some(group) = group else { continue };
        let index = match histograms.iter().position(|h| &h.group == group) {
            Some(i) => i,
            None => {
                histograms.push(GroupHistogram {
                    group: group.clone(),
                    lower,
                    upper,
                    counts: vec![0; bins],
                });
                histograms.len() - 1
            }
        };
        let bin = (((value - lower) / width) as usize).min(bins - 1);
        histograms[index].counts[bin] += 1;
    }
    Ok(histograms)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> Table {
        let mut table = Table::with_rows(4);
        table
            .add_column(
                GROUP_COLUMN,
                Column::dense_text(vec!["b".into(), "a".into(), "b".into(), "b".into()]),
            )
            .unwrap();
        table
            .add_column(DISEASE_LIABILITY_COLUMN, Column::dense_float(vec![-2.0, 0.5, 1.0, 2.0]))
            .unwrap();
        table
            .add_column("sparse", Column::Int(vec![Some(1), None, Some(3), None]))
            .unwrap();
        table
    }

    #[test]
    fn describe_skips_unset_cells() {
        let summaries = describe(&sample_table());
        match &summaries[2] {
            ColumnSummary::Numeric { count, mean, min, max, .. } => {
                assert_eq!(*count, 2);
                assert_eq!(*mean, 2.0);
                assert_eq!((*min, *max), (1.0, 3.0));
            }
            other => panic!("expected numeric summary, got {other:?}"),
        }
        match &summaries[0] {
            ColumnSummary::Text { count, unique, top, freq, .. } => {
                assert_eq!((*count, *unique, *freq), (4, 2, 3));
                assert_eq!(top.as_deref(), Some("b"));
            }
            other => panic!("expected text summary, got {other:?}"),
        }
    }

    #[test]
    fn histograms_share_symmetric_range() {
        let histograms = liability_histograms(&sample_table(), 4).unwrap();
        assert_eq!(histograms.len(), 2);
        assert_eq!(histograms[0].group, "b");
        for h in &histograms {
            assert_eq!((h.lower, h.upper), (-2.0, 2.0));
        }
        // b: -2.0 -> bin 0, 1.0 -> bin 3, 2.0 -> clamped to bin 3
        assert_eq!(histograms[0].counts, vec![1, 0, 0, 2]);
        // a: 0.5 -> bin 2
        assert_eq!(histograms[1].counts, vec![0, 0, 1, 0]);
    }
}
