//! Keyed parameter groups handed to the simulation engine.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single engine input value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Number(f64),
    Array(Vec<f64>),
    Matrix(Vec<Vec<f64>>),
    Text(String),
}

impl ParamValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[f64]> {
        match self {
            Self::Array(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_matrix(&self) -> Option<&[Vec<f64>]> {
        match self {
            Self::Matrix(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<u32> for ParamValue {
    fn from(v: u32) -> Self {
        Self::Number(f64::from(v))
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        Self::Number(f64::from(v))
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        Self::Number(if v { 1.0 } else { 0.0 })
    }
}

impl From<Vec<f64>> for ParamValue {
    fn from(v: Vec<f64>) -> Self {
        Self::Array(v)
    }
}

impl From<Vec<Vec<f64>>> for ParamValue {
    fn from(v: Vec<Vec<f64>>) -> Self {
        Self::Matrix(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

/// Flat key/value table for one engine group (e.g. `Losses`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamGroup(BTreeMap<String, ParamValue>);

impl ParamGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Copies every entry of `other` into `self`, overwriting duplicates.
    pub fn extend(&mut self, other: ParamGroup) {
        self.0.extend(other.0);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.0.iter()
    }
}

/// Named groups assigned to the engine in one call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSet(BTreeMap<String, ParamGroup>);

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set holding a single group.
    pub fn single(name: &str, group: ParamGroup) -> Self {
        let mut set = Self::new();
        set.insert_group(name, group);
        set
    }

    pub fn insert_group(&mut self, name: &str, group: ParamGroup) {
        self.0.insert(name.to_string(), group);
    }

    pub fn group(&self, name: &str) -> Option<&ParamGroup> {
        self.0.get(name)
    }

    pub fn groups(&self) -> impl Iterator<Item = (&String, &ParamGroup)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Merges `other` group by group.
    pub fn merge(&mut self, other: &ParameterSet) {
        for (name, group) in &other.0 {
            self.0
                .entry(name.clone())
                .or_default()
                .extend(group.clone());
        }
    }
}
