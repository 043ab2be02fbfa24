//! `#ifdef` preprocessing over WGSL
//!
//! Supports `#ifdef NAME`, `#ifndef NAME`, `#else` and `#endif`, nested.
//! `#pragma` lines are dropped. Excluded lines are replaced by blank lines
//! so naga diagnostics keep their original line numbers.

use crate::keywords::KeywordSet;
use crate::ShaderError;

struct Frame {
    /// Whether the enclosing region is emitted
    parent_active: bool,
    /// Condition of the current branch
    condition: bool,
    seen_else: bool,
}

impl Frame {
    fn active(&self) -> bool {
        self.parent_active && self.condition
    }
}

/// Produce the source of one variant
pub fn preprocess(shader: &str, source: &str, defines: &KeywordSet) -> Result<String, ShaderError> {
    let err = |line: usize, message: &str| ShaderError::Preprocess {
        shader: shader.to_string(),
        line,
        message: message.to_string(),
    };

    let mut out = String::with_capacity(source.len());
    let mut stack: Vec<Frame> = Vec::new();

    for (i, line) in source.lines().enumerate() {
        let line_no = i + 1;
        let trimmed = line.trim_start();
        let active = stack.last().map_or(true, Frame::active);

        let mut words = trimmed.split_whitespace();
        match words.next() {
            Some(directive @ ("#ifdef" | "#ifndef")) => {
                let name = words.next().ok_or_else(|| err(line_no, "missing keyword"))?;
                let defined = defines.contains(name);
                stack.push(Frame {
                    parent_active: active,
                    condition: if directive == "#ifdef" { defined } else { !defined },
                    seen_else: false,
                });
            }
            Some("#else") => {
                let frame = stack.last_mut().ok_or_else(|| err(line_no, "#else without #ifdef"))?;
                if frame.seen_else {
                    return Err(err(line_no, "duplicate #else"));
                }
                frame.seen_else = true;
                frame.condition = !frame.condition;
            }
            Some("#endif") => {
                stack.pop().ok_or_else(|| err(line_no, "#endif without #ifdef"))?;
            }
            Some("#pragma") => {}
            _ if active => out.push_str(line),
            _ => {}
        }
        out.push('\n');
    }

    if !stack.is_empty() {
        return Err(err(source.lines().count(), "unterminated #ifdef"));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SRC: &str = "\
#pragma multi_compile MASK
a
#ifdef MASK
b
#ifndef LIGHT
c
#endif
#else
d
#endif
e";

    fn lines(s: &str) -> Vec<&str> {
        s.lines().filter(|l| !l.is_empty()).collect()
    }

    #[test]
    fn test_preprocess_defined() {
        let defines: KeywordSet = ["MASK"].into_iter().collect();
        let out = preprocess("t", SRC, &defines).unwrap();
        assert_eq!(lines(&out), vec!["a", "b", "c", "e"]);
        // line numbers preserved
        assert_eq!(out.lines().count(), SRC.lines().count());
    }

    #[test]
    fn test_preprocess_nested_off() {
        let defines: KeywordSet = ["MASK", "LIGHT"].into_iter().collect();
        let out = preprocess("t", SRC, &defines).unwrap();
        assert_eq!(lines(&out), vec!["a", "b", "e"]);
    }

    #[test]
    fn test_preprocess_else_branch() {
        let out = preprocess("t", SRC, &KeywordSet::new()).unwrap();
        assert_eq!(lines(&out), vec!["a", "d", "e"]);
    }

    #[test]
    fn test_preprocess_errors() {
        let none = KeywordSet::new();
        assert!(matches!(
            preprocess("t", "#ifdef A\nx", &none),
            Err(ShaderError::Preprocess { .. })
        ));
        assert!(matches!(
            preprocess("t", "#endif", &none),
            Err(ShaderError::Preprocess { line: 1, .. })
        ));
        assert!(preprocess("t", "#ifdef A\n#else\n#else\n#endif", &none).is_err());
    }
}
