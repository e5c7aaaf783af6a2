use std::fmt;

use serde::{Deserialize, Serialize};

/// Toolbox category an intervention belongs to.
///
/// Cardinality and outcome effect are not fixed here; the loaded catalog
/// decides whether a category is exclusive or multi-select and how it shifts
/// the success probability.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryKind {
    IntrinsicProgram,
    SupportCell,
    Astrocyte,
    Scaffold,
    SmallMolecule,
}

impl CategoryKind {
    pub const ALL: [CategoryKind; 5] = [
        CategoryKind::IntrinsicProgram,
        CategoryKind::SupportCell,
        CategoryKind::Astrocyte,
        CategoryKind::Scaffold,
        CategoryKind::SmallMolecule,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CategoryKind::IntrinsicProgram => "intrinsic_program",
            CategoryKind::SupportCell => "support_cell",
            CategoryKind::Astrocyte => "astrocyte",
            CategoryKind::Scaffold => "scaffold",
            CategoryKind::SmallMolecule => "small_molecule",
        }
    }

    /// Whether interventions of this kind may contribute a steady-state overlay.
    ///
    /// Intrinsic programs and small molecules only ever play a transient
    /// animation; the canvas does not change once it finishes.
    pub fn carries_overlay(self) -> bool {
        matches!(
            self,
            CategoryKind::SupportCell | CategoryKind::Astrocyte | CategoryKind::Scaffold
        )
    }

    /// Parses a user-facing token, accepting the short aliases hosts type.
    pub fn from_token(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().replace('-', "_").as_str() {
            "intrinsic_program" | "intrinsic" | "program" | "growth" => {
                Some(CategoryKind::IntrinsicProgram)
            }
            "support_cell" | "support" | "cell" | "cells" => Some(CategoryKind::SupportCell),
            "astrocyte" | "astrocytes" | "astro" => Some(CategoryKind::Astrocyte),
            "scaffold" | "scaffolds" | "physical_scaffold" => Some(CategoryKind::Scaffold),
            "small_molecule" | "molecule" | "molecules" | "drug" => {
                Some(CategoryKind::SmallMolecule)
            }
            _ => None,
        }
    }
}

impl fmt::Display for CategoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier of a catalog intervention such as `KLF7` or `Schwann`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InterventionId(String);

impl InterventionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InterventionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for InterventionId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Symbolic name of an image asset, resolved by the host's asset loader.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(String);

impl AssetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AssetId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}
