//! ccx-deck - reader, validator and writer for CalculiX/Abaqus input decks
//!
//! A deck is a line-oriented keyword file: `**` starts a comment, `*KEYWORD`
//! lines open a block with `KEY=VALUE` options, and the comma separated data
//! records that follow belong to that block. This crate turns such a file into
//! a typed [`model::Deck`], checks its references, and writes it back out.
//!
//! ## Example
//! ```rust
//! use ccx_deck::prelude::*;
//!
//! let text = "*NODE, NSET=Nall\n1, 0, 0, 0\n2, 1, 0, 0\n\
//!             *ELEMENT, TYPE=T3D2, ELSET=Eall\n1, 1, 2\n";
//! let deck = read_str(text, &ReaderOptions::default()).unwrap();
//! assert_eq!(deck.elements[0].nodes, vec![1, 2]);
//!
//! let report = validate(&deck);
//! assert!(report.is_valid());
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod executor;
pub mod lexer;
pub mod model;
pub mod models;
pub mod reader;
pub mod summary;
pub mod validate;
pub mod writer;

// Re-export common types
pub mod prelude {
    pub use crate::error::{DeckError, DeckResult, Location};
    pub use crate::model::{
        Boundary, Deck, DloadKind, Element, ElementType, IgnoredOption, KeptOption, Load, Material, Node,
        OutputKind, Procedure, Section, Step, Target,
    };
    pub use crate::reader::{read_path, read_str, ReaderOptions};
    pub use crate::summary::{summarize, DeckSummary};
    pub use crate::validate::{validate, Issue, IssueKind, Severity, ValidationReport};
    pub use crate::writer::{write_deck, DeckWriter};
}
