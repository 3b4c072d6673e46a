//! Olho Vivo payload records
//!
//! The upstream uses terse field names (`cl`, `lt`, `cp`, ...) and is not
//! consistent about numeric versus string encodings, so every field that
//! has been seen in both forms is decoded leniently.

use domain::{LineCandidate, LineCode, LineDirection, StopCandidate, StopCode};
use serde::Deserialize;
use serde_json::Value;

use crate::error::SptransError;

/// A value the upstream sends either as a JSON number or as a string
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Int(i64),
    Float(f64),
    Text(String),
}

impl NumberOrString {
    fn into_text(self) -> String {
        match self {
            Self::Int(n) => n.to_string(),
            Self::Float(n) => n.to_string(),
            Self::Text(s) => s.trim().to_string(),
        }
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<NumberOrString>::deserialize(deserializer)?.map(NumberOrString::into_text))
}

/// One entry of `/Linha/Buscar`
#[derive(Debug, Clone, Deserialize)]
pub struct RawLine {
    /// Canonical line code
    pub cl: i64,
    /// Circular route flag
    #[serde(default)]
    pub lc: bool,
    /// Route sign, e.g. "701U"
    #[serde(default, deserialize_with = "lenient_string")]
    pub lt: Option<String>,
    /// Direction: 1 main to secondary, 2 secondary to main
    #[serde(default)]
    pub sl: Option<u8>,
    /// Variant suffix, e.g. 10
    #[serde(default, deserialize_with = "lenient_string")]
    pub tl: Option<String>,
    /// Primary terminal description
    #[serde(default)]
    pub tp: Option<String>,
    /// Secondary terminal description
    #[serde(default)]
    pub ts: Option<String>,
}

impl From<RawLine> for LineCandidate {
    fn from(raw: RawLine) -> Self {
        Self {
            code: LineCode::new(raw.cl),
            headsign: raw.lt.unwrap_or_default(),
            variant: raw.tl.unwrap_or_default(),
            origin_description: raw.tp.unwrap_or_default(),
            destination_description: raw.ts.unwrap_or_default(),
            circular: raw.lc,
            direction: raw.sl.and_then(LineDirection::from_upstream),
        }
    }
}

/// One entry of `/Parada/Buscar` and `/Parada/BuscarParadasPorLinha`
#[derive(Debug, Clone, Deserialize)]
pub struct RawStop {
    /// Canonical stop code
    #[serde(default, deserialize_with = "lenient_string")]
    pub cp: Option<String>,
    /// Stop name
    #[serde(default)]
    pub np: Option<String>,
    /// Address
    #[serde(default)]
    pub ed: Option<String>,
    /// Latitude
    #[serde(default)]
    pub py: Option<f64>,
    /// Longitude
    #[serde(default)]
    pub px: Option<f64>,
    /// Neighborhood, reported by some endpoint versions
    #[serde(default, alias = "bairro")]
    pub b: Option<String>,
    /// Street name, reported by some endpoint versions
    #[serde(default, alias = "lda", alias = "logradouro")]
    pub lg: Option<String>,
}

impl RawStop {
    /// Convert to a candidate; records without a usable code are dropped
    #[must_use]
    pub fn into_candidate(self) -> Option<StopCandidate> {
        let code = StopCode::new(self.cp?).ok()?;
        Some(StopCandidate {
            code,
            name: self.np.unwrap_or_default(),
            address: self.ed.unwrap_or_default(),
            neighborhood: self.b.filter(|s| !s.trim().is_empty()),
            street: self.lg.filter(|s| !s.trim().is_empty()),
            latitude: self.py,
            longitude: self.px,
            destination_lines: None,
        })
    }
}

/// Decode a list endpoint; `null` is treated as an empty list
fn decode_list<T>(value: Value) -> Result<Vec<T>, SptransError>
where
    T: for<'de> Deserialize<'de>,
{
    if value.is_null() {
        return Ok(Vec::new());
    }
    serde_json::from_value(value).map_err(|e| SptransError::ParseError(e.to_string()))
}

/// Decode a `/Linha/Buscar` response, preserving upstream order
///
/// # Errors
///
/// Returns [`SptransError::ParseError`] if the payload is not a list of lines.
pub fn parse_lines(value: Value) -> Result<Vec<LineCandidate>, SptransError> {
    Ok(decode_list::<RawLine>(value)?
        .into_iter()
        .map(LineCandidate::from)
        .collect())
}

/// Decode a stop list response, preserving upstream order
///
/// # Errors
///
/// Returns [`SptransError::ParseError`] if the payload is not a list of stops.
pub fn parse_stops(value: Value) -> Result<Vec<StopCandidate>, SptransError> {
    Ok(decode_list::<RawStop>(value)?
        .into_iter()
        .filter_map(RawStop::into_candidate)
        .collect())
}
