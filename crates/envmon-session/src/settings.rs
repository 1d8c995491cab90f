//! Server-supplied settings model
//!
//! The same shape is bundled with the console as static configuration and
//! served by the backend's `setting` endpoint. Restoration always uses the
//! bundled copy; the persisted one is write-only.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::Result;

/// Measurement method bits an entry's `method` mask may carry.
const METHOD_BITS: [u32; 3] = [1, 2, 4];

/// One monitored measurement item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProblemEntry {
    #[serde(default)]
    pub label: String,
    /// OR'd measurement method flags
    #[serde(default)]
    pub method: u32,
    /// Expanded form of `method`; recomputed on every (re)load
    #[serde(default)]
    pub values: Vec<u32>,
}

/// Reference-table row mapping a problem code to its descriptions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemCode {
    pub code: String,
    pub text: String,
    pub short: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub problem: BTreeMap<String, ProblemEntry>,
    #[serde(default)]
    pub codes: Vec<ProblemCode>,
}

impl Settings {
    /// Static configuration bundled with the console build.
    pub fn bundled() -> Result<Settings> {
        let mut settings: Settings =
            serde_json::from_str(include_str!("../assets/setting.json"))?;
        settings.expand_methods();
        Ok(settings)
    }

    /// Parses a server settings payload.
    pub fn from_value(value: serde_json::Value) -> Result<Settings> {
        let mut settings: Settings = serde_json::from_value(value)?;
        settings.expand_methods();
        Ok(settings)
    }

    /// Recomputes every entry's `values` from its `method` bitmask, in
    /// ascending bit order.
    pub fn expand_methods(&mut self) {
        for entry in self.problem.values_mut() {
            entry.values = METHOD_BITS
                .iter()
                .copied()
                .filter(|bit| entry.method & bit != 0)
                .collect();
        }
    }

    /// Long or short description for a problem code. Code `0` is the
    /// no-problem state; codes absent from the table render as `"-"`.
    pub fn problem_label(&self, code: u32, full_text: bool) -> String {
        if code == 0 {
            return "정상".to_string();
        }

        let code = code.to_string();
        match self.codes.iter().find(|entry| entry.code == code) {
            Some(entry) if full_text => entry.text.clone(),
            Some(entry) => entry.short.clone(),
            None => "-".to_string(),
        }
    }
}
