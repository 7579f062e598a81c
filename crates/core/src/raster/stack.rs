//! Stacked variable buffer for one forcing time step
//!
//! All requested variables of one forcing file are loaded into a single
//! `vars x rows x cols` array so the file is opened and decoded once, then
//! sliced per catchment during aggregation. No-data values are mapped to
//! NaN at load time; downstream means are NaN-skipping.

use crate::error::{Error, Result};
use ndarray::{Array2, Array3, ArrayView2};

/// Named 2-D variables sharing one grid, stored as one contiguous buffer.
#[derive(Debug, Clone)]
pub struct VariableStack {
    names: Vec<String>,
    data: Array3<f32>,
}

impl VariableStack {
    /// Assemble a stack from per-variable arrays in declared order.
    ///
    /// All arrays must share the same shape.
    pub fn from_bands(bands: Vec<(String, Array2<f32>)>) -> Result<Self> {
        let Some((_, first)) = bands.first() else {
            return Err(Error::Other("variable stack cannot be empty".to_string()));
        };
        let (rows, cols) = first.dim();

        let mut names = Vec::with_capacity(bands.len());
        let mut data = Array3::zeros((bands.len(), rows, cols));
        for (i, (name, band)) in bands.into_iter().enumerate() {
            let (ar, ac) = band.dim();
            if (ar, ac) != (rows, cols) {
                return Err(Error::ShapeMismatch {
                    er: rows,
                    ec: cols,
                    ar,
                    ac,
                });
            }
            data.index_axis_mut(ndarray::Axis(0), i).assign(&band);
            names.push(name);
        }

        Ok(Self { names, data })
    }

    /// Variable names in declared order
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn num_vars(&self) -> usize {
        self.names.len()
    }

    /// Grid shape as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        let (_, rows, cols) = self.data.dim();
        (rows, cols)
    }

    /// View of one variable's 2-D array by stack position
    pub fn band(&self, index: usize) -> ArrayView2<'_, f32> {
        self.data.index_axis(ndarray::Axis(0), index)
    }

    /// View of one variable's 2-D array by name
    pub fn band_by_name(&self, name: &str) -> Option<ArrayView2<'_, f32>> {
        let i = self.names.iter().position(|n| n == name)?;
        Some(self.band(i))
    }
}
