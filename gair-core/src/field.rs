//! Raw attribute taxonomy.
//!
//! Parsing a field name is the configuration boundary: an unrecognized name
//! fails here, before any data is fetched.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CalcError;

/// A recognized raw attribute column in the external store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Cadd,
    Cadw,
    Cadm,
    Cadq,
    Scdh1,
    Scdh2,
    Scdh3,
    Scdh4,
    Scdd,
    Scdw,
    Scdm,
    Scdq,
    Tid,
    Tiw,
    Tim,
    Tiq,
    AdjOpenPrice,
    AdjClosePrice,
}

impl Field {
    /// Every recognized field, in store order.
    pub const ALL: [Field; 18] = [
        Field::Cadd,
        Field::Cadw,
        Field::Cadm,
        Field::Cadq,
        Field::Scdh1,
        Field::Scdh2,
        Field::Scdh3,
        Field::Scdh4,
        Field::Scdd,
        Field::Scdw,
        Field::Scdm,
        Field::Scdq,
        Field::Tid,
        Field::Tiw,
        Field::Tim,
        Field::Tiq,
        Field::AdjOpenPrice,
        Field::AdjClosePrice,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Cadd => "cadd",
            Field::Cadw => "cadw",
            Field::Cadm => "cadm",
            Field::Cadq => "cadq",
            Field::Scdh1 => "scdh1",
            Field::Scdh2 => "scdh2",
            Field::Scdh3 => "scdh3",
            Field::Scdh4 => "scdh4",
            Field::Scdd => "scdd",
            Field::Scdw => "scdw",
            Field::Scdm => "scdm",
            Field::Scdq => "scdq",
            Field::Tid => "tid",
            Field::Tiw => "tiw",
            Field::Tim => "tim",
            Field::Tiq => "tiq",
            Field::AdjOpenPrice => "adj_open_price",
            Field::AdjClosePrice => "adj_close_price",
        }
    }

    /// Parse a list of names, failing on the first unrecognized one.
    pub fn parse_list<S: AsRef<str>>(names: &[S]) -> Result<Vec<Field>, CalcError> {
        let mut fields = names
            .iter()
            .map(|n| n.as_ref().parse())
            .collect::<Result<Vec<Field>, _>>()?;
        fields.sort_unstable();
        fields.dedup();
        Ok(fields)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Field {
    type Err = CalcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        Field::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == name)
            .ok_or(CalcError::InvalidField {
                name: s.to_string(),
            })
    }
}
