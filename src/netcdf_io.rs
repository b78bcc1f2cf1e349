//! NetCDF I/O operations
//!
//! Reading turns a `netcdf::File` into an owned [`Dataset`], pulling every
//! numeric variable into memory. Writing saves a dataset to a new NetCDF file
//! with attributes preserved and a `history` entry appended.

use crate::dataset::{DataVariable, Dataset};
use crate::errors::Result;
use chrono::Utc;
use ndarray::{ArrayD, IxDyn};
use netcdf::{create, AttributeValue, File};
use std::collections::HashMap;
use std::io::Write;
use std::{fs, path::Path};
use tracing::{debug, warn};

/// Read all dimensions, global attributes and numeric variables of an open file.
///
/// Values are read as `f64`. Variables that cannot be read as numbers
/// (char and string variables) are skipped with a warning.
pub fn read_dataset(file: &File) -> Result<Dataset> {
    let mut dataset = Dataset::new();

    for dim in file.dimensions() {
        dataset.add_dimension(&dim.name(), dim.len(), dim.is_unlimited());
    }

    for attr in file.attributes() {
        dataset.set_attribute(attr.name(), attr.value()?);
    }

    for var in file.variables() {
        let name = var.name().to_string();
        let dimensions: Vec<String> = var
            .dimensions()
            .iter()
            .map(|d| d.name().to_string())
            .collect();
        let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();

        let values: Vec<f64> = match var.get_values::<f64, _>(..) {
            Ok(values) => values,
            Err(e) => {
                warn!("Skipping non-numeric variable '{}': {}", name, e);
                continue;
            }
        };

        let mut attributes = HashMap::new();
        for attr in var.attributes() {
            attributes.insert(attr.name().to_string(), attr.value()?);
        }

        dataset.add_variable(DataVariable {
            name,
            dimensions,
            data: ArrayD::from_shape_vec(IxDyn(&shape), values)?,
            attributes,
        })?;
    }

    Ok(dataset)
}

/// Open a NetCDF file from disk and load it completely
pub fn open_dataset<P: AsRef<Path>>(path: P) -> Result<Dataset> {
    let path = path.as_ref();
    let file = netcdf::open(path)?;
    let mut dataset = read_dataset(&file)?;
    dataset.add_source(path);

    debug!(
        "Loaded {} variables from {}",
        dataset.variables().len(),
        path.display()
    );
    Ok(dataset)
}

/// Load a NetCDF file held in memory, recording `source` as its origin.
///
/// `nc_open_mem` only exists when libnetcdf is built with in-memory support,
/// which the statically linked build does not guarantee, so the bytes go
/// through a scratch file that is removed once the dataset has been read.
pub fn open_dataset_from_bytes<P: AsRef<Path>>(bytes: &[u8], source: P) -> Result<Dataset> {
    let mut scratch = tempfile::Builder::new()
        .prefix("polar_fetch")
        .suffix(".nc")
        .tempfile()?;
    scratch.write_all(bytes)?;
    scratch.flush()?;

    let file = netcdf::open(scratch.path())?;
    let mut dataset = read_dataset(&file)?;
    dataset.add_source(source.as_ref());
    Ok(dataset)
}

/// Writer that saves a [`Dataset`] as a NetCDF file
pub struct NetCDFWriter<'a> {
    dataset: &'a Dataset,
    output_path: &'a Path,
}

impl<'a> NetCDFWriter<'a> {
    /// Create a new NetCDF writer
    pub fn new(dataset: &'a Dataset, output_path: &'a Path) -> Self {
        Self {
            dataset,
            output_path,
        }
    }

    /// Write the dataset, replacing any file at the output path.
    ///
    /// Every dimension is written with a fixed size and every variable as `f64`.
    pub fn write(&self) -> Result<()> {
        if self.output_path.exists() {
            fs::remove_file(self.output_path)?;
        }

        let mut file = create(self.output_path)?;

        for dim in self.dataset.dimensions() {
            file.add_dimension(&dim.name, dim.length)?;
        }

        for var in self.dataset.variables() {
            let dim_refs: Vec<&str> = var.dimensions.iter().map(|s| s.as_str()).collect();
            let mut new_var = file.add_variable::<f64>(&var.name, &dim_refs)?;

            // _FillValue has to be defined before data is written
            if let Some(fv) = var.fill_value() {
                new_var.put_attribute("_FillValue", fv)?;
            }

            if var.data.ndim() == 0 {
                new_var.put(var.data.view(), &[] as &[usize])?;
            } else {
                new_var.put(var.data.view(), ..)?;
            }

            for (name, value) in var.attributes.iter().filter(|(n, _)| *n != "_FillValue") {
                new_var.put_attribute(name, value.clone())?;
            }
        }

        for (name, value) in self.dataset.attributes().iter().filter(|(n, _)| *n != "history") {
            file.add_attribute(name, value.clone())?;
        }

        let entry = format!("Created by polar_fetch on {}", Utc::now().to_rfc3339());
        let history = match self.dataset.attribute("history") {
            Some(AttributeValue::Str(previous)) => format!("{}\n{}", entry, previous),
            _ => entry,
        };
        file.add_attribute("history", history)?;

        debug!(
            "Wrote {} variables to {}",
            self.dataset.variables().len(),
            self.output_path.display()
        );
        Ok(())
    }
}

/// Writes a dataset to a new NetCDF file with attributes copied.
pub fn write_dataset<P: AsRef<Path>>(dataset: &Dataset, output_path: P) -> Result<()> {
    NetCDFWriter::new(dataset, output_path.as_ref()).write()
}
