//! Engine errors.
//!
//! Expected match failure is not an error -- it is an empty `Choice`. The
//! types here cover the three real failure classes: malformed rules
//! (fatal, at construction), unresolvable references while rendering a
//! replacement (recoverable, that one replacement is skipped), and
//! cooperative cancellation (fatal for the whole match attempt).

use std::fmt;

/// A rule definition error, reported at rule-construction time.
#[derive(Clone, Debug, PartialEq)]
pub enum RuleError {
    /// A rule must have at least one before-template.
    NoBeforeTemplates,
    /// Before- and after-templates must be uniformly expression templates
    /// or uniformly block templates.
    MixedTemplateShapes,
    /// An after-template names arguments that are not present in every
    /// before-template.
    UnknownAfterArguments { arguments: Vec<String> },
    /// Negation requires every template to be a boolean expression
    /// template.
    NonBooleanNegation,
}

impl fmt::Display for RuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleError::NoBeforeTemplates => {
                write!(f, "a rewrite rule must declare at least one before-template")
            }
            RuleError::MixedTemplateShapes => write!(
                f,
                "before- and after-templates must be uniformly expression or block templates"
            ),
            RuleError::UnknownAfterArguments { arguments } => write!(
                f,
                "after-template defines arguments that are not present in all before-templates: {arguments:?}"
            ),
            RuleError::NonBooleanNegation => {
                write!(f, "negation requires boolean expression templates")
            }
        }
    }
}

impl std::error::Error for RuleError {}

/// A symbol could not be turned into a source reference while rendering a
/// replacement. Raised only for already-successful matches; the caller
/// logs it and abandons that one replacement.
#[derive(Clone, Debug, PartialEq)]
pub struct CouldNotResolveImport {
    pub name: String,
}

impl CouldNotResolveImport {
    pub fn new(name: impl Into<String>) -> Self {
        CouldNotResolveImport { name: name.into() }
    }
}

impl fmt::Display for CouldNotResolveImport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "could not resolve a source reference for {}", self.name)
    }
}

impl std::error::Error for CouldNotResolveImport {}

/// A fatal abort of a whole matching attempt.
#[derive(Clone, Debug, PartialEq)]
pub enum MatchError {
    /// The caller's cancellation flag was observed mid-search.
    Aborted,
}

impl fmt::Display for MatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchError::Aborted => write!(f, "matching was aborted by the caller"),
        }
    }
}

impl std::error::Error for MatchError {}
