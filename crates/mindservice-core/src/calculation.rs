// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Pluggable calculations.
//!
//! A calculation turns the merged input table into the output table. The
//! [`CalculationRegistry`] doubles as the allow-list checked at submit time.

use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::table::Table;

/// Errors raised while transforming a table.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CalculationError {
    /// A field could not be interpreted as a number.
    #[error("could not convert {value:?} to a number (row {row}, column {column})")]
    NotANumber {
        /// Zero-based row index in the merged table.
        row: usize,
        /// Zero-based column index.
        column: usize,
        /// The offending raw value.
        value: String,
    },

    /// Other calculation failure.
    #[error("{0}")]
    Other(String),
}

/// Trait for calculations.
///
/// Calculations are pure: they receive the merged table and return the
/// transformed one. They run on a blocking worker thread.
pub trait Calculation: Send + Sync {
    /// Name clients use to request this calculation.
    fn name(&self) -> &'static str;

    /// Transform the merged input table.
    fn transform(&self, table: Table) -> Result<Table, CalculationError>;
}

/// Multiplies every field by two.
#[derive(Debug, Clone, Copy, Default)]
pub struct DoubleMatrix;

impl DoubleMatrix {
    /// Registered name.
    pub const NAME: &'static str = "doubleMatrix";
}

impl Calculation for DoubleMatrix {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn transform(&self, table: Table) -> Result<Table, CalculationError> {
        let rows = table
            .into_rows()
            .into_iter()
            .enumerate()
            .map(|(row, fields)| {
                fields
                    .into_iter()
                    .enumerate()
                    .map(|(column, value)| {
                        parse_number(&value, row, column).map(|n| format_number(n * 2.0))
                    })
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Table::from_rows(rows))
    }
}

/// Parse a raw field as a float, ignoring surrounding whitespace.
pub fn parse_number(value: &str, row: usize, column: usize) -> Result<f64, CalculationError> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| CalculationError::NotANumber {
            row,
            column,
            value: value.to_string(),
        })
}

/// Render a float in its shortest round-trip form (`2.0` becomes `2`).
pub fn format_number(value: f64) -> String {
    value.to_string()
}

/// Allow-list of calculations, keyed by name.
#[derive(Clone, Default)]
pub struct CalculationRegistry {
    calculations: HashMap<&'static str, Arc<dyn Calculation>>,
}

impl CalculationRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the built-in calculations.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(DoubleMatrix));
        registry
    }

    /// Add a calculation, replacing any previous one with the same name.
    pub fn register(&mut self, calculation: Arc<dyn Calculation>) {
        self.calculations.insert(calculation.name(), calculation);
    }

    /// Look up a calculation by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Calculation>> {
        self.calculations.get(name).cloned()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.calculations.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for CalculationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CalculationRegistry")
            .field("calculations", &self.names())
            .finish()
    }
}
