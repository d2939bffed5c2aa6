//! Error types

use std::fmt;

/// Error returned when a rule set cannot be converted.
///
/// Conversion errors abort the whole rule set being analyzed: partial
/// automata are not composable, so no subtables are produced. Details of the
/// offending rule are reported through the converter's diagnostic sink
/// before the error is returned.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum ConvertError {
    /// A tuple had the wrong arity for the analyzer it was passed to.
    BadTupleLength,
    /// A negative (context) glyph appeared where only plain glyphs are legal.
    NegativeGlyph,
    /// Two ligature rules map the same input sequence to different actions.
    LigatureConflict,
    /// Consolidated classes would need conflicting keys in a merged
    /// substitution map.
    SubstitutionConflict,
    /// An insertion rule matches its input at neither end, so no anchored
    /// automaton exists for it.
    NoAnchoredMatch,
    /// A chaining rule ends in two or more lookahead glyphs.
    UnsupportedLookahead,
    /// Composite rules collide (a later trigger overlaps an earlier
    /// replacement), which per-kind regrouping cannot express.
    UnsupportedComposite,
}

impl fmt::Display for ConvertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConvertError::BadTupleLength => write!(f, "tuple has the wrong length"),
            ConvertError::NegativeGlyph => write!(f, "negative glyph outside chaining context"),
            ConvertError::LigatureConflict => write!(f, "conflicting ligature rules"),
            ConvertError::SubstitutionConflict => {
                write!(f, "conflicting keys in merged substitution map")
            }
            ConvertError::NoAnchoredMatch => {
                write!(f, "insertion rule matches at neither end")
            }
            ConvertError::UnsupportedLookahead => {
                write!(f, "two or more trailing lookahead glyphs are not supported")
            }
            ConvertError::UnsupportedComposite => {
                write!(f, "colliding composite rules are not supported")
            }
        }
    }
}

impl std::error::Error for ConvertError {}

/// Error returned when a subtable chain cannot be evaluated.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum ApplyError {
    /// A transition named a state the table does not contain.
    BadState,
    /// A state row is missing an entry for a resolved class.
    BadClass,
    /// A subtable failed to advance through the glyph stream.
    NoProgress,
}

impl fmt::Display for ApplyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplyError::BadState => write!(f, "transition to unknown state"),
            ApplyError::BadClass => write!(f, "state row is missing a class entry"),
            ApplyError::NoProgress => write!(f, "subtable failed to advance"),
        }
    }
}

impl std::error::Error for ApplyError {}
