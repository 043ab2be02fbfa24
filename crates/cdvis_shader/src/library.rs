//! Named shader collections

use std::collections::HashMap;

use crate::keywords::{ProgramKey, ShaderProgram};
use crate::variants::{ShaderVariant, ShaderVariantCollection};
use crate::{Result, ShaderError};

/// Every shader the renderer knows, by name
#[derive(Debug, Default)]
pub struct ShaderLibrary {
    shaders: HashMap<String, ShaderVariantCollection>,
}

impl ShaderLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile and register a shader, replacing any previous one
    pub fn load(&mut self, name: &str, source: &str) -> Result<ShaderProgram> {
        let collection = ShaderVariantCollection::compile(name, source)?;
        let program = collection.program();
        self.shaders.insert(name.to_string(), collection);
        Ok(program)
    }

    pub fn get(&self, name: &str) -> Option<&ShaderVariantCollection> {
        self.shaders.get(name)
    }

    pub fn program(&self, name: &str) -> Result<ShaderProgram> {
        self.shaders
            .get(name)
            .map(ShaderVariantCollection::program)
            .ok_or_else(|| ShaderError::NotFound(name.to_string()))
    }

    /// The variant a program key selects
    pub fn resolve(&self, key: &ProgramKey) -> Result<&ShaderVariant> {
        let collection = self
            .shaders
            .get(&key.shader)
            .ok_or_else(|| ShaderError::NotFound(key.shader.clone()))?;
        collection.get(&key.keywords).ok_or_else(|| ShaderError::MissingVariant {
            shader: key.shader.clone(),
            keywords: key.keywords.to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.shaders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shaders.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keywords::KeywordSet;

    const SRC: &str = "#pragma multi_compile FAST\n@compute @workgroup_size(8, 8, 8)\nfn cs_main() {}\n";

    #[test]
    fn test_library_resolve() {
        let mut library = ShaderLibrary::new();
        let mut program = library.load("compute", SRC).unwrap();
        program.enable_keyword("FAST");

        let variant = library.resolve(&program.active_key()).unwrap();
        assert!(variant.has_entry_point("cs_main"));
        assert_eq!(library.len(), 1);
    }

    #[test]
    fn test_library_missing() {
        let library = ShaderLibrary::new();
        assert!(matches!(library.program("nope"), Err(ShaderError::NotFound(_))));

        let mut library = ShaderLibrary::new();
        library.load("compute", SRC).unwrap();
        let key = ProgramKey::new("compute", ["SLOW"].into_iter().collect::<KeywordSet>());
        assert!(matches!(library.resolve(&key), Err(ShaderError::MissingVariant { .. })));
    }
}
