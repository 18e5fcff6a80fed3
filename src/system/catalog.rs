//! JSON system catalog.
//!
//! A catalog maps system names to their demand and a unit table:
//!
//! ```json
//! {
//!   "s3": {
//!     "demand": 200.0,
//!     "data": [
//!       ["tgu", "opz", "a", "b", "c", "Pmin", "Pmax"],
//!       [1, 1, 10.0, 2.0, 0.01, 10, 50],
//!       [1, 2, 12.0, 2.1, 0.01, 60, 90],
//!       [2, 1, 8.0, 1.8, 0.02, 20, 80]
//!     ]
//!   }
//! }
//! ```
//!
//! The first row of `data` names the columns. Each following row is one
//! operative zone. Columns `d`, `e`, … after `c` extend the cost polynomial
//! to higher degree.

use super::model::PowerSystem;
use super::types::{CostCurve, Unit, Zone};
use crate::error::ConfigError;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::Path;

const REQUIRED_COLUMNS: [&str; 7] = ["tgu", "opz", "a", "b", "c", "Pmin", "Pmax"];
const EXTRA_COEFFICIENTS: [&str; 5] = ["d", "e", "f", "g", "h"];

#[derive(Debug, Deserialize)]
struct RawSystem {
    demand: f64,
    data: Vec<Vec<Value>>,
}

/// A parsed catalog of named power systems.
///
/// Entries are only interpreted when requested, so one malformed system
/// does not prevent loading the others.
#[derive(Debug, Clone)]
pub struct SystemCatalog {
    entries: Map<String, Value>,
}

impl SystemCatalog {
    /// Parses a catalog from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let entries: Map<String, Value> = serde_json::from_str(json)?;
        Ok(Self { entries })
    }

    /// Reads and parses a catalog file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Names of all systems in the catalog.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Builds the system called `name`.
    pub fn system(&self, name: &str) -> Result<PowerSystem, ConfigError> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| ConfigError::MissingSystem(name.to_string()))?;
        let malformed = |reason: String| ConfigError::Malformed {
            system: name.to_string(),
            reason,
        };

        let raw = RawSystem::deserialize(entry).map_err(|e| malformed(e.to_string()))?;
        let units = parse_units(&raw.data).map_err(|reason| match reason {
            TableError::Malformed(reason) => malformed(reason),
            TableError::Unit(e) => e,
        })?;

        PowerSystem::new(name, units, raw.demand)
    }
}

impl PowerSystem {
    /// Loads the system called `name` from a catalog file.
    pub fn from_catalog_file(path: impl AsRef<Path>, name: &str) -> Result<Self, ConfigError> {
        SystemCatalog::from_path(path)?.system(name)
    }
}

enum TableError {
    Malformed(String),
    Unit(ConfigError),
}

struct Columns {
    tgu: usize,
    opz: usize,
    p_min: usize,
    p_max: usize,
    coefficients: Vec<usize>,
}

impl Columns {
    fn from_header(header: &[Value]) -> Result<Self, String> {
        let names: Vec<&str> = header
            .iter()
            .map(|v| v.as_str().ok_or("header row must contain only strings"))
            .collect::<Result<_, _>>()?;
        let find = |col: &str| names.iter().position(|&n| n == col);

        for col in REQUIRED_COLUMNS {
            if find(col).is_none() {
                return Err(format!("missing column '{col}'"));
            }
        }
        let required = |col: &str| find(col).unwrap_or_default();

        let mut coefficients = vec![required("a"), required("b"), required("c")];
        for col in EXTRA_COEFFICIENTS {
            match find(col) {
                Some(i) => coefficients.push(i),
                None => break,
            }
        }

        Ok(Self {
            tgu: required("tgu"),
            opz: required("opz"),
            p_min: required("Pmin"),
            p_max: required("Pmax"),
            coefficients,
        })
    }
}

/// Groups table rows into units, keeping units in first-appearance order.
fn parse_units(data: &[Vec<Value>]) -> Result<Vec<Unit>, TableError> {
    let (header, rows) = data
        .split_first()
        .ok_or_else(|| TableError::Malformed("data table is empty".into()))?;
    let columns = Columns::from_header(header).map_err(TableError::Malformed)?;

    let mut grouped: Vec<(String, Vec<Zone>)> = Vec::new();
    for (i, row) in rows.iter().enumerate() {
        let zone_row = |reason: String| TableError::Malformed(format!("row {}: {reason}", i + 1));
        let cell = |col: usize| row.get(col).ok_or_else(|| zone_row("row is too short".into()));

        let unit_id = unit_label(cell(columns.tgu)?).map_err(&zone_row)?;
        let number = zone_number(cell(columns.opz)?).map_err(&zone_row)?;
        let p_min = number_of(cell(columns.p_min)?).map_err(&zone_row)?;
        let p_max = number_of(cell(columns.p_max)?).map_err(&zone_row)?;
        let coefficients = columns
            .coefficients
            .iter()
            .map(|&c| cell(c).and_then(|v| number_of(v).map_err(&zone_row)))
            .collect::<Result<Vec<f64>, _>>()?;

        let zone = Zone::new(number, p_min, p_max, CostCurve::new(coefficients));
        match grouped.iter_mut().find(|(id, _)| *id == unit_id) {
            Some((_, zones)) => zones.push(zone),
            None => grouped.push((unit_id, vec![zone])),
        }
    }

    grouped
        .into_iter()
        .map(|(id, zones)| Unit::new(id, zones).map_err(TableError::Unit))
        .collect()
}

fn unit_label(value: &Value) -> Result<String, String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => Ok(i.to_string()),
            (None, Some(f)) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                Ok((f as i64).to_string())
            }
            _ => Ok(n.to_string()),
        },
        other => Err(format!("invalid unit id {other}")),
    }
}

fn zone_number(value: &Value) -> Result<usize, String> {
    let n = number_of(value)?;
    if n >= 1.0 && n.fract() == 0.0 {
        Ok(n as usize)
    } else {
        Err(format!("zone number must be a positive integer, got {value}"))
    }
}

fn number_of(value: &Value) -> Result<f64, String> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| format!("number {n} is out of range")),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("expected a number, got \"{s}\"")),
        other => Err(format!("expected a number, got {other}")),
    }
}
