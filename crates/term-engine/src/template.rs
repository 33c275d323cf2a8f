//! Group templates -- shape donors for multiplier clauses.
//!
//! A pattern set may carry one template, e.g. `"Mi 1 Th 10"`. A multiplier
//! clause `x5` in that set means "five consecutive weeks in the template's
//! shape": the template's term, days and time, with weeks starting at the
//! template's first week.
//!
//! A [`GroupTemplate`] is a plain immutable value. Resolution consumes it, so
//! each expansion builds its own from the template string.

use std::str::FromStr;

use crate::atom::{Atom, Clause, Multiplier, WeekSpec};
use crate::error::{Result, TermError};
use crate::parser::parse;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupTemplate {
    atom: Atom,
}

impl GroupTemplate {
    /// Parse a template. It must be exactly one full atom.
    ///
    /// # Errors
    /// Syntax errors propagate from the parser. A template with more than one
    /// clause, or whose clause is itself a multiplier, is
    /// `TermError::InvalidTemplate`.
    pub fn parse(template: &str) -> Result<GroupTemplate> {
        let mut clauses = parse(template)?.into_clauses();
        if clauses.len() != 1 {
            return Err(TermError::InvalidTemplate(format!(
                "'{}' has {} clauses, expected one",
                template.trim(),
                clauses.len()
            )));
        }
        match clauses.pop() {
            Some(Clause::Atom(atom)) => Ok(GroupTemplate { atom }),
            _ => Err(TermError::InvalidTemplate(format!(
                "'{}' is a multiplier, not a full pattern",
                template.trim()
            ))),
        }
    }

    pub fn atom(&self) -> &Atom {
        &self.atom
    }

    /// Build the concrete atom a multiplier stands for.
    ///
    /// # Errors
    /// Returns `TermError::UnresolvedMultiplier` if the resulting weeks would
    /// run past the largest allowed week number.
    pub fn resolve_multiplier(&self, multiplier: Multiplier) -> Result<Atom> {
        let first = self.atom.weeks.first();
        let weeks = WeekSpec::consecutive(first, multiplier.count).ok_or_else(|| {
            TermError::UnresolvedMultiplier {
                count: multiplier.count,
                reason: format!("{} weeks from week {first} is out of range", multiplier.count),
            }
        })?;
        tracing::trace!(%multiplier, template = %self.atom, "resolved multiplier");
        Ok(Atom {
            weeks,
            ..self.atom.clone()
        })
    }

    /// Replace every multiplier in `clauses` with its resolved atom, consuming
    /// the template.
    pub fn resolve(self, clauses: Vec<Clause>) -> Result<Vec<Atom>> {
        resolve_clauses(clauses, Some(self))
    }
}

impl FromStr for GroupTemplate {
    type Err = TermError;

    fn from_str(s: &str) -> Result<GroupTemplate> {
        GroupTemplate::parse(s)
    }
}

/// Turn clauses into atoms, resolving multipliers against `template`.
///
/// # Errors
/// Returns `TermError::UnresolvedMultiplier` when a multiplier is present and
/// `template` is `None`.
pub fn resolve_clauses(clauses: Vec<Clause>, template: Option<GroupTemplate>) -> Result<Vec<Atom>> {
    clauses
        .into_iter()
        .map(|clause| match clause {
            Clause::Atom(atom) => Ok(atom),
            Clause::Multiplier(multiplier) => match &template {
                Some(template) => template.resolve_multiplier(multiplier),
                None => Err(TermError::UnresolvedMultiplier {
                    count: multiplier.count,
                    reason: "no group template supplied".to_string(),
                }),
            },
        })
        .collect()
}
