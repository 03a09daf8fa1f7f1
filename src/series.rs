//! Value series keyed by the reference spatial index.
//!
//! A [`ReferenceIndex`] is the ordered set of flat cell indices that every
//! output table is keyed by. A [`ValueSeries`] stores one optional value per
//! reference entry, positionally aligned with the index.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{HydroGridError, Result};
use crate::grid::Grid;

/// Ordered set of flat indices participating in all downstream tables.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceIndex {
    indices: Vec<usize>,
    positions: HashMap<usize, usize>,
}

impl ReferenceIndex {
    /// Build an index from flat indices in table order.
    ///
    /// Every index must address a cell of `grid` and appear once.
    pub fn new(indices: Vec<usize>, grid: &Grid) -> Result<Self> {
        let mut positions = HashMap::with_capacity(indices.len());
        for (position, &index) in indices.iter().enumerate() {
            if !grid.contains_index(index) {
                return Err(HydroGridError::ReferenceTable {
                    message: format!(
                        "Reference index {} lies outside the {}x{} grid",
                        index,
                        grid.width(),
                        grid.height()
                    ),
                });
            }
            if positions.insert(index, position).is_some() {
                return Err(HydroGridError::ReferenceTable {
                    message: format!("Reference index {} appears more than once", index),
                });
            }
        }
        Ok(Self { indices, positions })
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn contains(&self, index: usize) -> bool {
        self.positions.contains_key(&index)
    }

    /// Row position of a flat index within the reference table.
    pub fn position(&self, index: usize) -> Option<usize> {
        self.positions.get(&index).copied()
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.indices.iter().copied()
    }
}

/// The six soil properties delivered as rasters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoilProperty {
    WiltingPoint,
    FieldCapacity,
    TotalCapacity,
    DryThreshold,
    IntermediateThreshold,
    WetThreshold,
}

impl SoilProperty {
    /// All properties in input order.
    pub const ALL: [SoilProperty; 6] = [
        SoilProperty::WiltingPoint,
        SoilProperty::FieldCapacity,
        SoilProperty::TotalCapacity,
        SoilProperty::DryThreshold,
        SoilProperty::IntermediateThreshold,
        SoilProperty::WetThreshold,
    ];

    /// Column name used in the output tables.
    pub fn column_name(&self) -> &'static str {
        match self {
            SoilProperty::WiltingPoint => "punto_marchitez",
            SoilProperty::FieldCapacity => "capacidad_campo",
            SoilProperty::TotalCapacity => "cap_total",
            SoilProperty::DryThreshold => "umbral_seco",
            SoilProperty::IntermediateThreshold => "umbral_intermedio",
            SoilProperty::WetThreshold => "umbral_humedo",
        }
    }

    /// Default raster file name for this property.
    pub fn default_file_name(&self) -> &'static str {
        match self {
            SoilProperty::WiltingPoint => "punto_marchitez.txt",
            SoilProperty::FieldCapacity => "capacidad_campo.txt",
            SoilProperty::TotalCapacity => "capacidad_total.txt",
            SoilProperty::DryThreshold => "umbral_seco.txt",
            SoilProperty::IntermediateThreshold => "umbral_intermedio.txt",
            SoilProperty::WetThreshold => "umbral_humedo.txt",
        }
    }
}

/// Optional values aligned with a [`ReferenceIndex`].
#[derive(Debug, Clone, PartialEq)]
pub struct ValueSeries {
    name: String,
    values: Vec<Option<f64>>,
}

impl ValueSeries {
    /// Wrap values already aligned with a reference index.
    pub fn new(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// Re-express a full-domain raster over the reference index.
    ///
    /// Raster cells outside the index are dropped; reference entries beyond the
    /// end of `raw` become missing.
    pub fn reindex(
        name: impl Into<String>,
        raw: &[Option<f64>],
        reference: &ReferenceIndex,
    ) -> Self {
        let values = reference
            .iter()
            .map(|index| raw.get(index).copied().flatten())
            .collect();
        Self::new(name, values)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [Option<f64>] {
        &mut self.values
    }

    /// Value stored for the reference row at `position`.
    pub fn get(&self, position: usize) -> Option<f64> {
        self.values.get(position).copied().flatten()
    }

    /// Number of missing entries.
    pub fn missing_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_none()).count()
    }

    pub fn into_values(self) -> Vec<Option<f64>> {
        self.values
    }
}
