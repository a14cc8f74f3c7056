//! Symbol definitions and usages extracted from source files.

use serde::{Deserialize, Serialize};

/// A symbol definition site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolDef {
    /// The symbol's name as written in source (not case-folded).
    pub name: String,
    /// Path to the defining file.
    pub path: String,
    /// 1-based line number of the definition.
    pub line: u32,
}

/// A symbol usage site (a load-context name reference).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolUse {
    /// The symbol's name as written in source (not case-folded).
    pub name: String,
    /// Path to the file containing the reference.
    pub path: String,
    /// 1-based line number of the reference.
    pub line: u32,
}

/// Case-fold a symbol name into its lookup key.
pub fn fold_key(name: &str) -> String {
    name.to_lowercase()
}
