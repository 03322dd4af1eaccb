use std::{
    collections::{BTreeMap, BTreeSet},
    io::Read,
    str::FromStr,
};

use csv::StringRecord;
use tracing::{debug, trace};

use crate::{
    config::ChartConfig,
    dimension::{DimensionAssignment, DimensionKey, Dimensions},
    error::{Error, Result},
    table::Table,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPoint {
    pub x: String,
    pub y: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Series {
    pub label: String,
    pub points: Vec<DataPoint>,
}

/// Orders series numerically when every label is an integer, by label otherwise.
pub fn sort_series(series: &mut [Series]) {
    if series.iter().all(|s| s.label.parse::<i64>().is_ok()) {
        series.sort_by_key(|s| s.label.parse::<i64>().unwrap_or_default());
    } else {
        series.sort_by(|a, b| a.label.cmp(&b.label));
    }
}

/// Keeps only the rows where `column` equals `value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowFilter {
    pub column: String,
    pub value: String,
}

impl FromStr for RowFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once('=') {
            Some((column, value)) if !column.is_empty() => Ok(Self {
                column: column.to_owned(),
                value: value.to_owned(),
            }),
            _ => Err(Error::InvalidFilter(s.to_owned())),
        }
    }
}

impl RowFilter {
    pub fn matches(&self, table: &Table, row: &StringRecord) -> Result<bool> {
        Ok(table.get(row, &self.column)? == self.value)
    }
}

/// One chart of a pivot: the assignment of every dimension but the excluded
/// one, and one series per value the excluded dimension took.
#[derive(Debug, Clone, PartialEq)]
pub struct PivotGroup {
    pub assignment: DimensionAssignment,
    pub series: Vec<Series>,
}

/// Data points grouped by their full dimension assignment.
#[derive(Debug, Clone)]
pub struct PlotGroups {
    dimensions: Dimensions,
    groups: BTreeMap<DimensionKey, Vec<DataPoint>>,
    dictionaries: Vec<BTreeSet<String>>,
}

impl PlotGroups {
    pub fn new(dimensions: Dimensions) -> Self {
        let dictionaries = vec![BTreeSet::new(); dimensions.len()];
        Self {
            dimensions,
            groups: BTreeMap::new(),
            dictionaries,
        }
    }

    /// Reads CSV (header included) and groups every row passing `filters`.
    pub fn from_csv<R: Read>(input: R, config: &ChartConfig, filters: &[RowFilter]) -> Result<Self> {
        let mut reader = csv::Reader::from_reader(input);
        let table = Table::new(reader.headers()?.iter())?;
        let dimensions = config.dimensions();

        for column in [&config.x_axis, &config.y_axis]
            .into_iter()
            .chain(dimensions.names())
            .chain(filters.iter().map(|f| &f.column))
        {
            table.column(column)?;
        }

        let mut groups = Self::new(dimensions);
        let mut skipped = 0;
        'rows: for row in reader.records() {
            let row = row?;
            for filter in filters {
                if !filter.matches(&table, &row)? {
                    skipped += 1;
                    continue 'rows;
                }
            }
            groups.add_row(&table, &row, &config.x_axis, &config.y_axis)?;
        }
        if skipped > 0 {
            debug!("Filtered out {skipped} rows");
        }
        Ok(groups)
    }

    pub fn add_row(
        &mut self,
        table: &Table,
        row: &StringRecord,
        x_axis: &str,
        y_axis: &str,
    ) -> Result<()> {
        let mut assignment = self.dimensions.assignment();
        for (i, name) in self.dimensions.names().iter().enumerate() {
            let value = table.get(row, name)?;
            assignment.assign(name, value)?;
            self.dictionaries[i].insert(value.to_owned());
        }

        let point = DataPoint {
            x: table.get(row, x_axis)?.to_owned(),
            y: table.get(row, y_axis)?.to_owned(),
        };
        let key = assignment.key()?;
        trace!("{key}: {point:?}");
        self.groups.entry(key).or_default().push(point);
        Ok(())
    }

    pub fn dimensions(&self) -> &Dimensions {
        &self.dimensions
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DimensionKey, &[DataPoint])> {
        self.groups.iter().map(|(key, points)| (key, points.as_slice()))
    }

    /// Every value seen for each dimension, in dimension order.
    pub fn dictionaries(&self) -> impl Iterator<Item = (&str, &BTreeSet<String>)> {
        self.dimensions
            .names()
            .iter()
            .map(String::as_str)
            .zip(&self.dictionaries)
    }

    /// Regroups by every dimension except the one at `excluded`, whose value
    /// becomes the series label.
    pub fn pivot(&self, excluded: usize) -> Result<Vec<PivotGroup>> {
        let remaining = self.dimensions.without(excluded);
        let mut pivoted: BTreeMap<DimensionKey, Vec<Series>> = BTreeMap::new();

        for (key, points) in &self.groups {
            let original = self.dimensions.parse_key(key)?;
            let mut reduced = remaining.assignment();
            let mut label = None;
            for (i, (name, value)) in original.iter().enumerate() {
                let value = value.ok_or_else(|| Error::Unassigned(name.to_owned()))?;
                if i == excluded {
                    label = Some(value.to_owned());
                } else {
                    reduced.assign(name, value)?;
                }
            }
            let label = label.ok_or_else(|| {
                Error::UnknownDimension(format!("dimension index {excluded}"))
            })?;

            pivoted.entry(reduced.key()?).or_default().push(Series {
                label,
                points: points.clone(),
            });
        }

        pivoted
            .into_iter()
            .map(|(key, mut series)| {
                sort_series(&mut series);
                Ok(PivotGroup {
                    assignment: remaining.parse_key(&key)?,
                    series,
                })
            })
            .collect()
    }
}
