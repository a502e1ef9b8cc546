//! TypeScript frontend: api file analysis and type erasure.

pub mod extract;
pub mod parser;
pub mod strip;

pub use extract::{extract_types, extract_types_with, ApiTypes, ApiTypesLiteral, ExtractedTypes, ImportContext};
pub use parser::TypeScriptParser;
pub use strip::{strip_types, strip_types_with};
