//! # CDVis Shader
//!
//! Keyword-variant shaders:
//! - `#pragma multi_compile` scanning for the keywords a shader declares
//! - one variant per subset of those keywords, produced by an
//!   `#ifdef` preprocessor over WGSL
//! - every variant parsed and validated through naga up front
//! - programs addressed by their exact active keyword set
//!
//! ## Architecture
//!
//! ```text
//! Source (.wgsl) ──► scan pragmas ──► permutations ──► preprocess ──► naga validate
//!                                                                        │
//!                                                                        ▼
//!                                   ProgramKey (name + keywords) ──► ShaderVariant
//! ```

pub mod keywords;
pub mod library;
pub mod preprocess;
pub mod variants;

pub use keywords::{KeywordSet, ProgramKey, ShaderProgram};
pub use library::ShaderLibrary;
pub use preprocess::preprocess;
pub use variants::{keyword_permutations, scan_multi_compile, ShaderVariant, ShaderVariantCollection};

use thiserror::Error;

/// Errors from shader variant compilation
#[derive(Debug, Error)]
pub enum ShaderError {
    #[error("Preprocessor error in '{shader}' line {line}: {message}")]
    Preprocess {
        shader: String,
        line: usize,
        message: String,
    },

    #[error("WGSL parse error in '{key}':\n{diagnostic}")]
    Parse { key: String, diagnostic: String },

    #[error("Validation error in '{key}':\n{diagnostic}")]
    Validation { key: String, diagnostic: String },

    #[error("Shader not found: {0}")]
    NotFound(String),

    #[error("No variant of '{shader}' for keywords [{keywords}]")]
    MissingVariant { shader: String, keywords: String },
}

pub type Result<T> = std::result::Result<T, ShaderError>;
