//! Station-weighted interpolation of drying-rate parameters.
//!
//! Each reference cell carries up to three station codes with precomputed
//! weights. A derived quantity for the cell is the weighted sum of the
//! stations' parameter values; a station missing from the parameter table
//! contributes zero.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::error::{HydroGridError, Result};

/// Normalised station code.
///
/// Codes arrive as integers, floats or strings depending on the source table;
/// `7`, `7.0` and `" 7 "` all normalise to the same code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StationId(String);

impl StationId {
    /// Normalise a textual code. Blank text yields `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        match trimmed.parse::<f64>() {
            Ok(number) => Self::from_f64(number),
            Err(_) => Some(Self(trimmed.to_string())),
        }
    }

    pub fn from_i64(code: i64) -> Self {
        Self(code.to_string())
    }

    /// Integral floats become integer codes; NaN means "no station".
    pub fn from_f64(code: f64) -> Option<Self> {
        if code.is_nan() {
            None
        } else if code.fract() == 0.0 && code.abs() < i64::MAX as f64 {
            Some(Self::from_i64(code as i64))
        } else {
            Some(Self(code.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The drying-rate parameters tabulated per station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParameterColumn {
    /// Drying rate while above field capacity
    UntilFieldCapacity,
    /// Drying rate between field capacity and wilting point
    AfterFieldCapacity,
    /// Drying rate below the wilting point
    BelowWiltingPoint,
}

impl ParameterColumn {
    pub const ALL: [ParameterColumn; 3] = [
        ParameterColumn::UntilFieldCapacity,
        ParameterColumn::AfterFieldCapacity,
        ParameterColumn::BelowWiltingPoint,
    ];

    /// Header of the column in the parameter table.
    pub fn source_name(&self) -> &'static str {
        match self {
            ParameterColumn::UntilFieldCapacity => "Hasta CC",
            ParameterColumn::AfterFieldCapacity => "Tras CC",
            ParameterColumn::BelowWiltingPoint => "Por debajo PtoM",
        }
    }

    /// Name of the interpolated column in the drying-rates table.
    pub fn output_name(&self) -> &'static str {
        match self {
            ParameterColumn::UntilFieldCapacity => "ts_hasta_cc",
            ParameterColumn::AfterFieldCapacity => "ts_tras_cc",
            ParameterColumn::BelowWiltingPoint => "ts_tras_pm",
        }
    }
}

/// Parameter values of one station.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StationParameters {
    pub until_field_capacity: f64,
    pub after_field_capacity: f64,
    pub below_wilting_point: f64,
}

impl StationParameters {
    pub fn get(&self, column: ParameterColumn) -> f64 {
        match column {
            ParameterColumn::UntilFieldCapacity => self.until_field_capacity,
            ParameterColumn::AfterFieldCapacity => self.after_field_capacity,
            ParameterColumn::BelowWiltingPoint => self.below_wilting_point,
        }
    }
}

/// Station code to parameter lookup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterTable {
    stations: HashMap<StationId, StationParameters>,
}

impl ParameterTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a station, rejecting a code that is already present.
    pub fn insert(&mut self, station: StationId, parameters: StationParameters) -> Result<()> {
        if self.stations.contains_key(&station) {
            return Err(HydroGridError::ParameterTable {
                message: format!("Station {} appears more than once", station),
            });
        }
        self.stations.insert(station, parameters);
        Ok(())
    }

    pub fn get(&self, station: &StationId) -> Option<&StationParameters> {
        self.stations.get(station)
    }

    /// Parameter value of a station, or 0 when the station is unknown.
    pub fn value_or_zero(&self, station: Option<&StationId>, column: ParameterColumn) -> f64 {
        station
            .and_then(|id| self.stations.get(id))
            .map(|parameters| parameters.get(column))
            .unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }
}

/// The stations and weights attached to one reference cell.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StationAssignment {
    pub stations: [Option<StationId>; 3],
    pub weights: [f64; 3],
}

impl StationAssignment {
    pub fn new(stations: [Option<StationId>; 3], weights: [f64; 3]) -> Self {
        Self { stations, weights }
    }

    /// `Σ weight_i * parameter(station_i)` with unknown stations counting as zero.
    pub fn weighted_value(&self, table: &ParameterTable, column: ParameterColumn) -> f64 {
        self.stations
            .iter()
            .zip(self.weights.iter())
            .map(|(station, weight)| weight * table.value_or_zero(station.as_ref(), column))
            .sum()
    }
}

/// Interpolate `column` for every assignment.
///
/// Rows are evaluated in parallel; the output keeps the input order.
pub fn interpolate_column(
    assignments: &[StationAssignment],
    table: &ParameterTable,
    column: ParameterColumn,
) -> Vec<f64> {
    assignments
        .par_iter()
        .map(|assignment| assignment.weighted_value(table, column))
        .collect()
}
