//! Keyword permutations and the variants compiled from them

use std::collections::HashMap;

use naga::valid::{Capabilities, ValidationFlags, Validator};

use crate::keywords::{KeywordSet, ProgramKey, ShaderProgram};
use crate::preprocess::preprocess;
use crate::{Result, ShaderError};

/// Keywords declared by `#pragma multi_compile` lines, in declaration
/// order, without duplicates
pub fn scan_multi_compile(source: &str) -> Vec<String> {
    let mut keywords: Vec<String> = Vec::new();
    for line in source.lines() {
        let mut tokens = line.split_whitespace();
        if tokens.next() != Some("#pragma") || tokens.next() != Some("multi_compile") {
            continue;
        }
        for token in tokens {
            if !keywords.iter().any(|k| k == token) {
                keywords.push(token.to_string());
            }
        }
    }
    keywords
}

/// Every subset of `keywords`, the empty set first
pub fn keyword_permutations(keywords: &[String]) -> Vec<KeywordSet> {
    let mut sets = vec![KeywordSet::new()];
    for keyword in keywords {
        let with: Vec<KeywordSet> = sets
            .iter()
            .map(|s| {
                let mut s = s.clone();
                s.insert(keyword.clone());
                s
            })
            .collect();
        sets.extend(with);
    }
    sets
}

/// One validated variant
#[derive(Debug)]
pub struct ShaderVariant {
    pub key: ProgramKey,
    /// Preprocessed WGSL
    pub source: String,
    pub module: naga::Module,
}

impl ShaderVariant {
    pub fn has_entry_point(&self, name: &str) -> bool {
        self.module.entry_points.iter().any(|ep| ep.name == name)
    }

    pub fn entry_points(&self) -> impl Iterator<Item = (&str, naga::ShaderStage)> {
        self.module.entry_points.iter().map(|ep| (ep.name.as_str(), ep.stage))
    }
}

/// All variants of one shader
#[derive(Debug)]
pub struct ShaderVariantCollection {
    name: String,
    keywords: Vec<String>,
    variants: HashMap<KeywordSet, ShaderVariant>,
}

impl ShaderVariantCollection {
    /// Scan, preprocess and validate every keyword permutation of `source`.
    ///
    /// The first failing variant aborts the whole collection.
    pub fn compile(name: impl Into<String>, source: &str) -> Result<Self> {
        let name = name.into();
        let keywords = scan_multi_compile(source);
        let permutations = keyword_permutations(&keywords);
        log::info!("{}: compiling {} shader variants", name, permutations.len());

        let mut variants = HashMap::with_capacity(permutations.len());
        for set in permutations {
            let key = ProgramKey::new(name.clone(), set.clone());
            let variant = compile_variant(key, source)?;
            variants.insert(set, variant);
        }

        Ok(Self {
            name,
            keywords,
            variants,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared keywords in declaration order
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    pub fn get(&self, keywords: &KeywordSet) -> Option<&ShaderVariant> {
        self.variants.get(keywords)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ShaderVariant> {
        self.variants.values()
    }

    /// Fresh keyword selection state for this shader
    pub fn program(&self) -> ShaderProgram {
        ShaderProgram::new(self.name.clone(), self.keywords.iter().cloned())
    }
}

fn compile_variant(key: ProgramKey, source: &str) -> Result<ShaderVariant> {
    let processed = preprocess(&key.shader, source, &key.keywords)?;

    let module = naga::front::wgsl::parse_str(&processed).map_err(|e| ShaderError::Parse {
        key: key.to_string(),
        diagnostic: e.emit_to_string(&processed),
    })?;

    let mut validator = Validator::new(ValidationFlags::all(), Capabilities::all());
    validator.validate(&module).map_err(|e| ShaderError::Validation {
        key: key.to_string(),
        diagnostic: format!("{:?}", e),
    })?;

    log::debug!("Compiled variant {}", key);
    Ok(ShaderVariant {
        key,
        source: processed,
        module,
    })
}
