//! Column aliasing for qSIP metadata.
//!
//! Callers may name their metadata columns differently from the canonical
//! names the qSIP2 engine expects. A [`ColumnAliases`] records, for each
//! canonical field, the caller's column name when it differs from the
//! canonical one.

use std::fmt;
use std::str::FromStr;

use crate::error::QsipError;
use crate::schema::{sample, source, COLUMN_PARAM_SUFFIX};

/// Which metadata table a canonical field lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Source,
    Sample,
}

impl Scope {
    pub fn label(self) -> &'static str {
        match self {
            Scope::Source => "source",
            Scope::Sample => "sample",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A metadata column the qSIP2 engine requires under a fixed name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CanonicalField {
    Isotope,
    Isotopolog,
    SourceMatId,
    GradientPosition,
    GradientPosDensity,
    GradientPosAmt,
}

impl CanonicalField {
    pub const ALL: [CanonicalField; 6] = [
        CanonicalField::Isotope,
        CanonicalField::Isotopolog,
        CanonicalField::SourceMatId,
        CanonicalField::GradientPosition,
        CanonicalField::GradientPosDensity,
        CanonicalField::GradientPosAmt,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CanonicalField::Isotope => source::ISOTOPE,
            CanonicalField::Isotopolog => source::ISOTOPOLOG,
            CanonicalField::SourceMatId => sample::SOURCE_MAT_ID,
            CanonicalField::GradientPosition => sample::GRADIENT_POSITION,
            CanonicalField::GradientPosDensity => sample::GRADIENT_POS_DENSITY,
            CanonicalField::GradientPosAmt => sample::GRADIENT_POS_AMT,
        }
    }

    pub fn scope(self) -> Scope {
        match self {
            CanonicalField::Isotope | CanonicalField::Isotopolog => Scope::Source,
            CanonicalField::SourceMatId
            | CanonicalField::GradientPosition
            | CanonicalField::GradientPosDensity
            | CanonicalField::GradientPosAmt => Scope::Sample,
        }
    }

    /// Fields belonging to `scope`, in declaration order.
    pub fn in_scope(scope: Scope) -> impl Iterator<Item = CanonicalField> {
        Self::ALL.into_iter().filter(move |f| f.scope() == scope)
    }

    /// Parse a caller-facing parameter name such as `isotope_column`.
    pub fn from_param(param: &str) -> Option<CanonicalField> {
        param
            .strip_suffix(COLUMN_PARAM_SUFFIX)
            .and_then(|stem| stem.parse().ok())
    }
}

impl FromStr for CanonicalField {
    type Err = QsipError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.name() == s)
            .ok_or_else(|| QsipError::InvalidData(format!("Unknown metadata field: '{s}'")))
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One column a table must contain: the canonical name and, if the caller
/// renamed it, the name actually expected in the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRequirement {
    pub default: String,
    pub provided: Option<String>,
}

impl ColumnRequirement {
    pub fn new(default: impl Into<String>, provided: Option<impl Into<String>>) -> Self {
        Self {
            default: default.into(),
            provided: provided.map(Into::into),
        }
    }

    /// Column name that must be present in the table.
    pub fn required(&self) -> &str {
        self.provided.as_deref().unwrap_or(&self.default)
    }
}

/// Caller-supplied column names for every canonical field.
///
/// `None` means the metadata uses the canonical name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnAliases {
    pub isotope: Option<String>,
    pub isotopolog: Option<String>,
    pub source_mat_id: Option<String>,
    pub gradient_position: Option<String>,
    pub gradient_pos_density: Option<String>,
    pub gradient_pos_amt: Option<String>,
}

impl ColumnAliases {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`ColumnAliases::set`].
    pub fn with_alias(mut self, field: CanonicalField, column: impl Into<String>) -> Self {
        self.set(field, column);
        self
    }

    /// Record the column name used for `field`. Passing the canonical name
    /// clears any alias.
    pub fn set(&mut self, field: CanonicalField, column: impl Into<String>) {
        let column = column.into();
        *self.slot_mut(field) = (column != field.name()).then_some(column);
    }

    pub fn alias(&self, field: CanonicalField) -> Option<&str> {
        match field {
            CanonicalField::Isotope => self.isotope.as_deref(),
            CanonicalField::Isotopolog => self.isotopolog.as_deref(),
            CanonicalField::SourceMatId => self.source_mat_id.as_deref(),
            CanonicalField::GradientPosition => self.gradient_position.as_deref(),
            CanonicalField::GradientPosDensity => self.gradient_pos_density.as_deref(),
            CanonicalField::GradientPosAmt => self.gradient_pos_amt.as_deref(),
        }
    }

    /// Column name the metadata must contain for `field`.
    pub fn required_column(&self, field: CanonicalField) -> &str {
        self.alias(field).unwrap_or(field.name())
    }

    /// Column that groups samples by source.
    pub fn source_id_column(&self) -> &str {
        self.required_column(CanonicalField::SourceMatId)
    }

    pub fn requirements(&self, scope: Scope) -> Vec<ColumnRequirement> {
        CanonicalField::in_scope(scope)
            .map(|f| ColumnRequirement::new(f.name(), self.alias(f)))
            .collect()
    }

    pub fn is_identity(&self) -> bool {
        CanonicalField::ALL.iter().all(|f| self.alias(*f).is_none())
    }

    fn slot_mut(&mut self, field: CanonicalField) -> &mut Option<String> {
        match field {
            CanonicalField::Isotope => &mut self.isotope,
            CanonicalField::Isotopolog => &mut self.isotopolog,
            CanonicalField::SourceMatId => &mut self.source_mat_id,
            CanonicalField::GradientPosition => &mut self.gradient_position,
            CanonicalField::GradientPosDensity => &mut self.gradient_pos_density,
            CanonicalField::GradientPosAmt => &mut self.gradient_pos_amt,
        }
    }
}

/// Build a [`ColumnAliases`] from `<field>_column` style parameters.
///
/// Parameters that do not name a canonical field are ignored, so a caller
/// can pass its whole argument list through.
pub fn build_column_mapping<I, K, V>(params: I) -> ColumnAliases
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut mapping = ColumnAliases::new();
    for (name, value) in params {
        if let Some(field) = CanonicalField::from_param(name.as_ref()) {
            mapping.set(field, value.as_ref());
        }
    }
    mapping
}
