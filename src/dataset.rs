//! In-memory dataset model
//!
//! A [`Dataset`] owns everything read from one or more NetCDF files:
//! dimensions in file order, variables with their data as `ArrayD<f64>`,
//! and global attributes. Nothing is read lazily; once a dataset exists
//! the source files are no longer needed.

use crate::errors::{PolarFetchError, Result};
use ndarray::{ArrayD, ArrayViewD, Axis, IxDyn};
use netcdf::AttributeValue;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Name of the dimension multi-file loads are concatenated along
pub const TIME_DIM: &str = "time";

/// Information about a dimension
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionInfo {
    pub name: String,
    pub length: usize,
    pub is_unlimited: bool,
}

/// A named, fully materialized variable
#[derive(Debug, Clone)]
pub struct DataVariable {
    pub name: String,
    pub dimensions: Vec<String>,
    pub data: ArrayD<f64>,
    pub attributes: HashMap<String, AttributeValue>,
}

impl DataVariable {
    pub fn new(name: &str, dimensions: &[&str], data: ArrayD<f64>) -> Self {
        Self {
            name: name.to_string(),
            dimensions: dimensions.iter().map(|d| d.to_string()).collect(),
            data,
            attributes: HashMap::new(),
        }
    }

    pub fn with_attribute<T: Into<AttributeValue>>(mut self, name: &str, value: T) -> Self {
        self.attributes.insert(name.to_string(), value.into());
        self
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    /// Position of `dim` in this variable's dimensions
    pub fn axis_of(&self, dim: &str) -> Option<usize> {
        self.dimensions.iter().position(|d| d == dim)
    }

    /// A coordinate variable has exactly one dimension, named like itself.
    pub fn is_coordinate(&self) -> bool {
        self.dimensions.len() == 1 && self.dimensions[0] == self.name
    }

    /// Numeric `_FillValue` attribute, if any
    pub fn fill_value(&self) -> Option<f64> {
        match self.attributes.get("_FillValue")? {
            AttributeValue::Double(v) => Some(*v),
            AttributeValue::Float(v) => Some(f64::from(*v)),
            AttributeValue::Int(v) => Some(f64::from(*v)),
            AttributeValue::Short(v) => Some(f64::from(*v)),
            AttributeValue::Schar(v) => Some(f64::from(*v)),
            AttributeValue::Uchar(v) => Some(f64::from(*v)),
            AttributeValue::Ushort(v) => Some(f64::from(*v)),
            AttributeValue::Uint(v) => Some(f64::from(*v)),
            AttributeValue::Longlong(v) => Some(*v as f64),
            AttributeValue::Ulonglong(v) => Some(*v as f64),
            _ => None,
        }
    }
}

/// Dimensions, variables and attributes loaded from NetCDF files
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    dimensions: Vec<DimensionInfo>,
    variables: Vec<DataVariable>,
    attributes: HashMap<String, AttributeValue>,
    sources: Vec<PathBuf>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a dimension, replacing the length of an existing one with the same name
    pub fn add_dimension(&mut self, name: &str, length: usize, is_unlimited: bool) {
        match self.dimensions.iter_mut().find(|d| d.name == name) {
            Some(existing) => {
                existing.length = length;
                existing.is_unlimited = is_unlimited;
            }
            None => self.dimensions.push(DimensionInfo {
                name: name.to_string(),
                length,
                is_unlimited,
            }),
        }
    }

    /// Add a variable whose dimensions are already defined and whose shape matches them
    pub fn add_variable(&mut self, variable: DataVariable) -> Result<()> {
        if variable.dimensions.len() != variable.data.ndim() {
            return Err(PolarFetchError::Generic(format!(
                "Variable '{}' names {} dimensions but its data has {}",
                variable.name,
                variable.dimensions.len(),
                variable.data.ndim()
            )));
        }

        for (dim_name, &len) in variable.dimensions.iter().zip(variable.data.shape()) {
            let dim = self.dimension(dim_name).ok_or_else(|| {
                PolarFetchError::Generic(format!(
                    "Variable '{}' uses undefined dimension '{}'",
                    variable.name, dim_name
                ))
            })?;
            if dim.length != len {
                return Err(PolarFetchError::Generic(format!(
                    "Variable '{}' has length {} along '{}', dimension length is {}",
                    variable.name, len, dim_name, dim.length
                )));
            }
        }

        match self.variables.iter_mut().find(|v| v.name == variable.name) {
            Some(existing) => *existing = variable,
            None => self.variables.push(variable),
        }
        Ok(())
    }

    pub fn set_attribute<T: Into<AttributeValue>>(&mut self, name: &str, value: T) {
        self.attributes.insert(name.to_string(), value.into());
    }

    pub fn add_source<P: AsRef<Path>>(&mut self, path: P) {
        self.sources.push(path.as_ref().to_path_buf());
    }

    pub fn dimensions(&self) -> &[DimensionInfo] {
        &self.dimensions
    }

    pub fn dimension(&self, name: &str) -> Option<&DimensionInfo> {
        self.dimensions.iter().find(|d| d.name == name)
    }

    pub fn variables(&self) -> &[DataVariable] {
        &self.variables
    }

    pub fn variable(&self, name: &str) -> Option<&DataVariable> {
        self.variables.iter().find(|v| v.name == name)
    }

    /// Variable lookup that reports a missing name as an error
    pub fn require_variable(&self, name: &str) -> Result<&DataVariable> {
        self.variable(name)
            .ok_or_else(|| PolarFetchError::VariableNotFound {
                var: name.to_string(),
            })
    }

    /// Coordinate variables, in file order
    pub fn coordinates(&self) -> impl Iterator<Item = &DataVariable> {
        self.variables.iter().filter(|v| v.is_coordinate())
    }

    /// Non-coordinate variables, in file order
    pub fn data_variables(&self) -> impl Iterator<Item = &DataVariable> {
        self.variables.iter().filter(|v| !v.is_coordinate())
    }

    pub fn attributes(&self) -> &HashMap<String, AttributeValue> {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    /// Files this dataset was read from, in load order
    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    /// Add `dim` as a leading dimension of length 1 to every data variable
    fn expand_dims(&mut self, dim: &str) {
        self.dimensions.insert(
            0,
            DimensionInfo {
                name: dim.to_string(),
                length: 1,
                is_unlimited: false,
            },
        );

        for var in self.variables.iter_mut().filter(|v| !v.is_coordinate()) {
            let data = std::mem::replace(&mut var.data, ArrayD::zeros(IxDyn(&[0])));
            var.data = data.insert_axis(Axis(0));
            var.dimensions.insert(0, dim.to_string());
        }
    }

    fn describe_sources(&self) -> String {
        if self.sources.is_empty() {
            "<memory>".to_string()
        } else {
            self.sources
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        }
    }
}

/// Concatenate datasets along `dim`, preserving their order.
///
/// Variables that span `dim` are joined along it and must exist, with the
/// same dimension names, in every dataset. Variables without `dim` and the
/// global attributes come from the first dataset. When no dataset has `dim`,
/// each one first gets it as a new leading dimension of length 1 on its
/// data variables; a mix of datasets with and without `dim` is an error.
pub fn concat_datasets(mut datasets: Vec<Dataset>, dim: &str) -> Result<Dataset> {
    if datasets.is_empty() {
        return Err(PolarFetchError::ConcatError {
            message: "no datasets given".to_string(),
        });
    }

    if datasets.iter().all(|ds| ds.dimension(dim).is_none()) {
        for ds in &mut datasets {
            ds.expand_dims(dim);
        }
    }

    let first = &datasets[0];

    let mut total_length = 0;
    for ds in &datasets {
        let info = ds.dimension(dim).ok_or_else(|| PolarFetchError::ConcatError {
            message: format!("dataset from {} has no '{}' dimension", ds.describe_sources(), dim),
        })?;
        total_length += info.length;
    }

    for ds in &datasets[1..] {
        if let Some(extra) = ds
            .variables
            .iter()
            .filter(|v| v.axis_of(dim).is_some())
            .find(|v| {
                first
                    .variable(&v.name)
                    .map_or(true, |f| f.axis_of(dim).is_none())
            })
        {
            return Err(PolarFetchError::ConcatError {
                message: format!(
                    "variable '{}' from {} does not span '{}' in every dataset",
                    extra.name,
                    ds.describe_sources(),
                    dim
                ),
            });
        }
    }

    let mut variables = Vec::with_capacity(first.variables.len());
    for var in &first.variables {
        let Some(axis) = var.axis_of(dim) else {
            variables.push(var.clone());
            continue;
        };

        let mut views: Vec<ArrayViewD<'_, f64>> = Vec::with_capacity(datasets.len());
        for ds in &datasets {
            let other = ds.variable(&var.name).ok_or_else(|| PolarFetchError::ConcatError {
                message: format!(
                    "variable '{}' is missing from {}",
                    var.name,
                    ds.describe_sources()
                ),
            })?;
            if other.dimensions != var.dimensions {
                return Err(PolarFetchError::ConcatError {
                    message: format!(
                        "variable '{}' has dimensions [{}] in {} but [{}] in {}",
                        var.name,
                        other.dimensions.join(", "),
                        ds.describe_sources(),
                        var.dimensions.join(", "),
                        first.describe_sources()
                    ),
                });
            }
            views.push(other.data.view());
        }

        variables.push(DataVariable {
            name: var.name.clone(),
            dimensions: var.dimensions.clone(),
            data: ndarray::concatenate(Axis(axis), &views)?,
            attributes: var.attributes.clone(),
        });
    }

    let dimensions = first
        .dimensions
        .iter()
        .map(|d| DimensionInfo {
            length: if d.name == dim { total_length } else { d.length },
            ..d.clone()
        })
        .collect();

    let sources = datasets
        .iter()
        .flat_map(|ds| ds.sources.iter().cloned())
        .collect();

    Ok(Dataset {
        dimensions,
        variables,
        attributes: first.attributes.clone(),
        sources,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, Array2};

    fn grid(times: &[f64], fill: f64) -> Dataset {
        let mut ds = Dataset::new();
        ds.add_dimension(TIME_DIM, times.len(), true);
        ds.add_dimension("x", 2, false);
        ds.add_variable(DataVariable::new(
            TIME_DIM,
            &[TIME_DIM],
            arr1(times).into_dyn(),
        ))
        .unwrap();
        ds.add_variable(DataVariable::new("x", &["x"], arr1(&[10.0, 20.0]).into_dyn()))
            .unwrap();
        ds.add_variable(
            DataVariable::new(
                "ice",
                &[TIME_DIM, "x"],
                Array2::from_elem((times.len(), 2), fill).into_dyn(),
            )
            .with_attribute("units", "1"),
        )
        .unwrap();
        ds.set_attribute("title", "grid");
        ds
    }

    #[test]
    fn test_add_variable_rejects_bad_shape() {
        let mut ds = Dataset::new();
        ds.add_dimension("x", 3, false);
        let result = ds.add_variable(DataVariable::new("v", &["x"], arr1(&[1.0, 2.0]).into_dyn()));
        assert!(result.is_err());

        let result = ds.add_variable(DataVariable::new("w", &["y"], arr1(&[1.0]).into_dyn()));
        assert!(result.is_err());
    }

    #[test]
    fn test_coordinates_and_data_variables() {
        let ds = grid(&[0.0], 1.0);
        let coords: Vec<&str> = ds.coordinates().map(|v| v.name.as_str()).collect();
        let data: Vec<&str> = ds.data_variables().map(|v| v.name.as_str()).collect();
        assert_eq!(coords, vec!["time", "x"]);
        assert_eq!(data, vec!["ice"]);
    }

    #[test]
    fn test_concat_along_time() {
        let combined = concat_datasets(vec![grid(&[0.0, 1.0], 1.0), grid(&[2.0], 2.0)], TIME_DIM)
            .unwrap();

        assert_eq!(combined.dimension(TIME_DIM).unwrap().length, 3);
        assert_eq!(combined.dimension("x").unwrap().length, 2);

        let time = combined.variable(TIME_DIM).unwrap();
        assert_eq!(time.data.iter().cloned().collect::<Vec<_>>(), vec![0.0, 1.0, 2.0]);

        let ice = combined.variable("ice").unwrap();
        assert_eq!(ice.shape(), &[3, 2]);
        assert_eq!(ice.data[[1, 1]], 1.0);
        assert_eq!(ice.data[[2, 0]], 2.0);
        assert!(ice.attributes.contains_key("units"));

        assert_eq!(combined.variable("x").unwrap().shape(), &[2]);
    }

    #[test]
    fn test_concat_requires_dimension() {
        let mut no_time = Dataset::new();
        no_time.add_dimension("x", 1, false);
        let result = concat_datasets(vec![grid(&[0.0], 1.0), no_time], TIME_DIM);
        assert!(matches!(result, Err(PolarFetchError::ConcatError { .. })));
    }

    #[test]
    fn test_concat_adds_missing_dimension() {
        let flat = |value: f64| {
            let mut ds = Dataset::new();
            ds.add_dimension("x", 2, false);
            ds.add_variable(DataVariable::new("x", &["x"], arr1(&[10.0, 20.0]).into_dyn()))
                .unwrap();
            ds.add_variable(DataVariable::new(
                "ice",
                &["x"],
                arr1(&[value, value + 1.0]).into_dyn(),
            ))
            .unwrap();
            ds
        };

        let combined = concat_datasets(vec![flat(1.0), flat(5.0)], TIME_DIM).unwrap();

        assert_eq!(combined.dimensions()[0].name, TIME_DIM);
        assert_eq!(combined.dimension(TIME_DIM).unwrap().length, 2);

        let ice = combined.variable("ice").unwrap();
        assert_eq!(ice.dimensions, vec!["time", "x"]);
        assert_eq!(ice.shape(), &[2, 2]);
        assert_eq!(ice.data[[0, 1]], 2.0);
        assert_eq!(ice.data[[1, 0]], 5.0);

        // Coordinates keep their shape
        assert_eq!(combined.variable("x").unwrap().dimensions, vec!["x"]);
    }

    #[test]
    fn test_concat_rejects_variable_gaining_dimension() {
        let mut first = grid(&[0.0], 1.0);
        first.add_variable(DataVariable::new("mask", &["x"], arr1(&[0.0, 1.0]).into_dyn()))
            .unwrap();
        let mut second = grid(&[1.0], 2.0);
        second
            .add_variable(DataVariable::new(
                "mask",
                &[TIME_DIM, "x"],
                Array2::from_elem((1, 2), 1.0).into_dyn(),
            ))
            .unwrap();

        let result = concat_datasets(vec![first, second], TIME_DIM);
        assert!(matches!(result, Err(PolarFetchError::ConcatError { .. })));
    }

    #[test]
    fn test_fill_value_unsigned_and_wide() {
        let var = DataVariable::new("v", &[], ndarray::arr0(0.0).into_dyn());
        let with_fill = |value: AttributeValue| var.clone().with_attribute("_FillValue", value).fill_value();

        assert_eq!(with_fill(AttributeValue::Ushort(65535)), Some(65535.0));
        assert_eq!(with_fill(AttributeValue::Uint(7)), Some(7.0));
        assert_eq!(with_fill(AttributeValue::Longlong(-9)), Some(-9.0));
        assert_eq!(with_fill(AttributeValue::Ulonglong(9)), Some(9.0));
        assert_eq!(with_fill(AttributeValue::Str("none".to_string())), None);
    }

    #[test]
    fn test_concat_missing_variable() {
        let mut partial = grid(&[5.0], 0.0);
        partial.variables.retain(|v| v.name != "ice");
        let result = concat_datasets(vec![grid(&[0.0], 1.0), partial], TIME_DIM);
        assert!(matches!(result, Err(PolarFetchError::ConcatError { .. })));
    }

    #[test]
    fn test_concat_empty() {
        assert!(concat_datasets(Vec::new(), TIME_DIM).is_err());
    }
}
