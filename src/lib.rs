//! Compiler from OpenType GSUB substitution lookups to AAT `morx`
//! state-table subtables.
//!
//! GSUB expresses substitution as ordered, first-match rules over glyph
//! sequences; `morx` expresses it as finite-state machines over glyph
//! classes whose entries mark, substitute, stack, and insert. A single
//! subtable is structurally narrower than a rule list — a contextual table
//! cannot change sequence length, a ligature table only shrinks, an
//! insertion table only grows internally — so equivalence is reached by
//! classifying the rules, decomposing where needed through synthetic
//! trigger glyphs, and chaining several subtables in order.
//!
//! ```
//! use gsub2morx::Converter;
//!
//! let mut converter = Converter::new();
//! let chain = converter
//!     .analyze(&[vec![35], vec![19]], &[vec![4], vec![5]])
//!     .expect("single substitution converts");
//!
//! let mut glyphs = vec![35, 7, 19];
//! gsub2morx::apply(&chain, &mut glyphs).expect("chain applies");
//! assert_eq!(glyphs, vec![4, 7, 5]);
//! ```

#![warn(rust_2018_idioms)]

/// Application of subtable chains to glyph streams.
pub mod apply;
pub mod classtable;
pub mod convert;
pub mod diagnostic;
pub mod error;
pub mod glyph;
pub mod tables;

pub use crate::apply::apply;
pub use crate::classtable::{ClassName, ClassTable, StateName};
pub use crate::convert::{find_kind, Converter, InTuple, Kind, OutTuple};
pub use crate::diagnostic::{Diagnostic, DiagnosticSink, Severity};
pub use crate::error::{ApplyError, ConvertError};
pub use crate::glyph::{FakeGlyphs, GlyphId, GlyphNamer, InGlyph, DELETED_GLYPH};
pub use crate::tables::{
    Contextual, ContextualEntry, Insertion, InsertionEntry, Ligature, LigatureEntry,
    Noncontextual, StateTable, Subtable,
};
