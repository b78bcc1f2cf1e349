//! Dataset inspection and variable description
//!
//! This module turns a loaded [`Dataset`] into readable summaries: an
//! overview of dimensions, coordinates and variables, structured metadata
//! for a single variable, and quick statistics over its values.

use crate::dataset::{DataVariable, Dataset, DimensionInfo};
use crate::errors::{PolarFetchError, Result};
use netcdf::AttributeValue;
use std::collections::HashMap;
use std::fmt;

/// Structured metadata for a dataset variable
#[derive(Debug, Clone)]
pub struct VariableMetadata {
    pub name: String,
    pub dimensions: Vec<DimensionInfo>,
    pub attributes: HashMap<String, AttributeValue>,
    pub total_elements: usize,
    pub estimated_size_bytes: usize,
}

/// Quick statistics over the valid values of a variable
#[derive(Debug, Clone, PartialEq)]
pub struct VariableSummary {
    pub name: String,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
    pub valid_count: usize,
    pub total_count: usize,
}

impl fmt::Display for VariableSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Summary for Variable: {}", self.name)?;
        writeln!(f, "   Min: {}", self.min)?;
        writeln!(f, "   Max: {}", self.max)?;
        writeln!(f, "   Mean: {:.2}", self.mean)?;
        writeln!(f, "   Std Dev: {:.2}", self.std_dev)?;
        write!(f, "   Valid elements: {} / {}", self.valid_count, self.total_count)
    }
}

fn format_attribute(value: &AttributeValue) -> String {
    match value {
        AttributeValue::Str(s) => format!("\"{}\"", s),
        AttributeValue::Float(v) => v.to_string(),
        AttributeValue::Double(v) => v.to_string(),
        AttributeValue::Int(v) => v.to_string(),
        AttributeValue::Short(v) => v.to_string(),
        AttributeValue::Uchar(v) => v.to_string(),
        AttributeValue::Ushort(v) => v.to_string(),
        AttributeValue::Uint(v) => v.to_string(),
        other => format!("{:?}", other),
    }
}

fn format_shape(variable: &DataVariable) -> String {
    if variable.dimensions.is_empty() {
        return "scalar".to_string();
    }
    let dims: Vec<String> = variable
        .dimensions
        .iter()
        .zip(variable.shape())
        .map(|(name, len)| format!("{}[{}]", name, len))
        .collect();
    format!("({})", dims.join(", "))
}

fn sorted_attributes(attributes: &HashMap<String, AttributeValue>) -> Vec<(&String, &AttributeValue)> {
    let mut sorted: Vec<_> = attributes.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    sorted
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Dimensions:")?;
        if self.dimensions().is_empty() {
            writeln!(f, "    (none)")?;
        }
        for dim in self.dimensions() {
            if dim.is_unlimited {
                writeln!(f, "    {} = {} (unlimited)", dim.name, dim.length)?;
            } else {
                writeln!(f, "    {} = {}", dim.name, dim.length)?;
            }
        }

        writeln!(f, "Coordinates:")?;
        for var in self.coordinates() {
            writeln!(f, "    {} {}", var.name, format_shape(var))?;
        }

        writeln!(f, "Data variables:")?;
        for var in self.data_variables() {
            writeln!(f, "    {} {}", var.name, format_shape(var))?;
            for key in ["units", "long_name"] {
                if let Some(AttributeValue::Str(value)) = var.attributes.get(key) {
                    writeln!(f, "      {}: {}", key, value)?;
                }
            }
        }

        writeln!(f, "Attributes:")?;
        for (name, value) in sorted_attributes(self.attributes()) {
            writeln!(f, "    {}: {}", name, format_attribute(value))?;
        }

        if !self.sources().is_empty() {
            writeln!(f, "Sources:")?;
            for source in self.sources() {
                writeln!(f, "    {}", source.display())?;
            }
        }

        Ok(())
    }
}

/// Prints dimensions, variables and global attributes of a dataset.
pub fn print_metadata(dataset: &Dataset) {
    println!("{}", dataset);
}

/// Get structured metadata for a variable
pub fn describe_variable(dataset: &Dataset, var_name: &str) -> Result<VariableMetadata> {
    let var = dataset.require_variable(var_name)?;

    let dimensions: Vec<DimensionInfo> = var
        .dimensions
        .iter()
        .zip(var.shape())
        .map(|(name, &length)| DimensionInfo {
            name: name.clone(),
            length,
            is_unlimited: dataset
                .dimension(name)
                .map(|d| d.is_unlimited)
                .unwrap_or(false),
        })
        .collect();

    let total_elements = var.data.len();

    Ok(VariableMetadata {
        name: var.name.clone(),
        dimensions,
        attributes: var.attributes.clone(),
        total_elements,
        estimated_size_bytes: total_elements * std::mem::size_of::<f64>(),
    })
}

/// Computes quick statistics (min/mean/max/std) on a variable.
///
/// Non-finite values and values equal to `_FillValue` are ignored. A
/// variable without valid values is reported as an error.
pub fn compute_variable_summary(dataset: &Dataset, var_name: &str) -> Result<VariableSummary> {
    let var = dataset.require_variable(var_name)?;
    let fill = var.fill_value();

    let valid: Vec<f64> = var
        .data
        .iter()
        .copied()
        .filter(|x| x.is_finite() && Some(*x) != fill)
        .collect();

    if valid.is_empty() {
        return Err(PolarFetchError::Generic(format!(
            "Variable '{}' has no valid values",
            var_name
        )));
    }

    let count = valid.len() as f64;
    let min = valid.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = valid.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let mean = valid.iter().sum::<f64>() / count;
    let std_dev = (valid.iter().map(|&x| (x - mean).powi(2)).sum::<f64>() / count).sqrt();

    Ok(VariableSummary {
        name: var_name.to_string(),
        min,
        max,
        mean,
        std_dev,
        valid_count: valid.len(),
        total_count: var.data.len(),
    })
}
