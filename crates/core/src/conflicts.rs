//! Conflicts
//!
//! Deciding which existing discounts have to go before a new one is created.
//!
//! The default rules are a heuristic. Title markers such as `"off"` or `"save"` match plenty of
//! legitimate discounts ("Spring 10% Off") and miss test discounts that were named anything else.
//! They are kept because they mirror how stores in the wild end up with stray test discounts, but
//! callers that know their store should load their own rules with
//! [`MarkerConflictPredicate::from_path`] rather than rely on the defaults.

use std::{fs, path::Path};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use thiserror::Error;

use crate::records::{DiscountRecord, RecordKind};

/// What the scanner knows about the store when it evaluates a record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanContext {
    /// Automatic discounts visible in the current listing.
    pub automatic_count: usize,

    /// Whether the discount about to be created is automatic.
    pub incoming_automatic: bool,
}

/// Decides whether an existing discount must be removed.
pub trait ConflictPredicate: Send + Sync {
    /// `true` when `record` conflicts and should be deleted.
    fn conflicts(&self, record: &DiscountRecord, context: &ScanContext) -> bool;
}

impl<F> ConflictPredicate for F
where
    F: Fn(&DiscountRecord, &ScanContext) -> bool + Send + Sync,
{
    fn conflicts(&self, record: &DiscountRecord, context: &ScanContext) -> bool {
        self(record, context)
    }
}

/// Errors loading conflict rules.
#[derive(Debug, Error)]
pub enum ConflictRulesError {
    /// IO error reading the rules file
    #[error("Failed to read conflict rules: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("Failed to parse conflict rules: {0}")]
    Yaml(#[from] serde_norway::Error),
}

/// Title markers plus value and stacking rules.
///
/// A record conflicts when any of these hold:
///
/// * it is a percentage discount at or above `percentage_ceiling` points;
/// * its title contains one of `markers`, compared case-insensitively;
/// * it is automatic, `exclusive_automatic` is set, and another automatic discount is visible or
///   the incoming discount is automatic too.
///
/// ```yaml
/// markers: [test, staging]
/// percentage_ceiling: 100
/// exclusive_automatic: true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerConflictPredicate {
    markers: SmallVec<[String; 6]>,
    percentage_ceiling: Decimal,
    exclusive_automatic: bool,
}

impl Default for MarkerConflictPredicate {
    fn default() -> Self {
        Self {
            markers: ["test", "cod", "prepaid", "discount", "save", "off"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            percentage_ceiling: Decimal::ONE_HUNDRED,
            exclusive_automatic: true,
        }
    }
}

impl MarkerConflictPredicate {
    /// Rules with the given markers and the default value and stacking rules.
    pub fn with_markers<I, S>(markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            markers: markers.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Parse rules from YAML. Omitted keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is malformed.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConflictRulesError> {
        Ok(serde_norway::from_str(yaml)?)
    }

    /// Load rules from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConflictRulesError> {
        let contents = fs::read_to_string(path)?;

        Self::from_yaml_str(&contents)
    }

    /// Configured title markers.
    pub fn markers(&self) -> &[String] {
        &self.markers
    }

    /// First marker found in `title`, if any.
    pub fn matching_marker(&self, title: &str) -> Option<&str> {
        let title = title.to_lowercase();

        self.markers
            .iter()
            .find(|marker| !marker.is_empty() && title.contains(&marker.to_lowercase()))
            .map(String::as_str)
    }

    fn exceeds_ceiling(&self, record: &DiscountRecord) -> bool {
        record
            .percentage_points()
            .is_some_and(|points| points >= self.percentage_ceiling)
    }

    fn stacks(&self, record: &DiscountRecord, context: &ScanContext) -> bool {
        self.exclusive_automatic
            && record.representation() == RecordKind::Automatic
            && (context.automatic_count > 1 || context.incoming_automatic)
    }
}

impl ConflictPredicate for MarkerConflictPredicate {
    fn conflicts(&self, record: &DiscountRecord, context: &ScanContext) -> bool {
        self.exceeds_ceiling(record)
            || self.matching_marker(&record.title).is_some()
            || self.stacks(record, context)
    }
}
