use serde::{Deserialize, Serialize};
use std::path::Path;

/// Source language of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    Rust,
    Python,
    JavaScript,
    TypeScript,
    Go,
    Java,
    C,
    Cpp,
    CSharp,
    Ruby,
    Swift,
    Kotlin,
    Unknown,
}

impl Language {
    /// Detect language from file extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "rs" => Language::Rust,
            "py" | "pyw" | "pyi" => Language::Python,
            "js" | "jsx" | "mjs" | "cjs" => Language::JavaScript,
            "ts" | "tsx" | "mts" | "cts" => Language::TypeScript,
            "go" => Language::Go,
            "java" => Language::Java,
            "c" | "h" => Language::C,
            "cpp" | "cc" | "cxx" | "hpp" | "hh" | "hxx" => Language::Cpp,
            "cs" => Language::CSharp,
            "rb" => Language::Ruby,
            "swift" => Language::Swift,
            "kt" | "kts" => Language::Kotlin,
            _ => Language::Unknown,
        }
    }

    /// Detect language from file path
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(Self::from_extension)
            .unwrap_or(Language::Unknown)
    }

    /// Get language name as string
    pub fn as_str(self) -> &'static str {
        match self {
            Language::Rust => "rust",
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Go => "go",
            Language::Java => "java",
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::CSharp => "csharp",
            Language::Ruby => "ruby",
            Language::Swift => "swift",
            Language::Kotlin => "kotlin",
            Language::Unknown => "unknown",
        }
    }

    /// Check if a tree-sitter grammar is bundled for this language
    pub fn has_grammar(self) -> bool {
        matches!(
            self,
            Language::Rust
                | Language::Python
                | Language::JavaScript
                | Language::TypeScript
                | Language::Go
        )
    }

    /// Get Tree-sitter language instance
    pub fn tree_sitter_language(self) -> Option<tree_sitter::Language> {
        match self {
            Language::Rust => Some(tree_sitter_rust::LANGUAGE.into()),
            Language::Python => Some(tree_sitter_python::LANGUAGE.into()),
            Language::JavaScript => Some(tree_sitter_javascript::LANGUAGE.into()),
            Language::TypeScript => Some(tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()),
            Language::Go => Some(tree_sitter_go::LANGUAGE.into()),
            _ => None,
        }
    }

    /// Lexical rules used by the heuristic scanner
    pub fn lexical_rules(self) -> LexicalRules {
        const C_FAMILY: LexicalRules = LexicalRules {
            line_comments: &["//"],
            block_comment: Some(("/*", "*/")),
            nested_block_comments: false,
            quotes: &['"', '\''],
            multiline_quotes: false,
            backtick_strings: false,
            triple_quotes: false,
            raw_strings: false,
            char_literals: CharLiterals::None,
            block_style: BlockStyle::Braces,
        };

        match self {
            Language::Rust => LexicalRules {
                nested_block_comments: true,
                quotes: &['"'],
                multiline_quotes: true,
                raw_strings: true,
                char_literals: CharLiterals::RustLike,
                ..C_FAMILY
            },
            Language::JavaScript | Language::TypeScript => LexicalRules {
                backtick_strings: true,
                ..C_FAMILY
            },
            Language::Go => LexicalRules {
                quotes: &['"'],
                backtick_strings: true,
                char_literals: CharLiterals::Simple,
                ..C_FAMILY
            },
            Language::Java | Language::Kotlin | Language::Swift => LexicalRules {
                quotes: &['"'],
                triple_quotes: true,
                char_literals: CharLiterals::Simple,
                ..C_FAMILY
            },
            Language::C | Language::Cpp | Language::CSharp => LexicalRules {
                quotes: &['"'],
                char_literals: CharLiterals::Simple,
                ..C_FAMILY
            },
            Language::Python => LexicalRules {
                line_comments: &["#"],
                block_comment: None,
                triple_quotes: true,
                block_style: BlockStyle::Indentation,
                ..C_FAMILY
            },
            Language::Ruby => LexicalRules {
                line_comments: &["#"],
                block_comment: Some(("=begin", "=end")),
                block_style: BlockStyle::EndKeyword,
                ..C_FAMILY
            },
            Language::Unknown => LexicalRules {
                quotes: &['"'],
                ..C_FAMILY
            },
        }
    }

    /// Get import/use statement patterns for this language
    pub fn import_patterns(self) -> &'static [&'static str] {
        match self {
            Language::Rust => &["use ", "extern crate "],
            Language::Python => &["import ", "from "],
            Language::JavaScript | Language::TypeScript => &["import ", "require("],
            Language::Go | Language::Java | Language::Swift | Language::Kotlin => &["import ", "package "],
            Language::CSharp => &["using "],
            Language::Ruby => &["require ", "include "],
            Language::C | Language::Cpp => &["#include "],
            Language::Unknown => &[],
        }
    }
}

/// How a language delimits declaration bodies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockStyle {
    /// `{ ... }`
    Braces,
    /// Body is everything indented deeper than the header
    Indentation,
    /// Indented body closed by an `end` line at the header's indentation
    EndKeyword,
}

/// How `'` is treated in code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharLiterals {
    /// `'` is an ordinary quote (see `LexicalRules::quotes`)
    None,
    /// `'x'` / `'\n'` literals; a lone `'` is a lifetime or label
    RustLike,
    /// `'x'` / `'\n'` literals only
    Simple,
}

/// Comment and literal syntax the heuristic scanner has to step over
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LexicalRules {
    pub line_comments: &'static [&'static str],
    pub block_comment: Option<(&'static str, &'static str)>,
    pub nested_block_comments: bool,
    pub quotes: &'static [char],
    /// Quoted strings may run across lines
    pub multiline_quotes: bool,
    /// Backtick strings (template literals, Go raw strings), always multi-line
    pub backtick_strings: bool,
    /// `"""` / `'''` strings, always multi-line
    pub triple_quotes: bool,
    /// Rust `r"..."` / `r#"..."#`
    pub raw_strings: bool,
    pub char_literals: CharLiterals,
    pub block_style: BlockStyle,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_language_from_document_name() {
        for (name, expected) in [
            ("src/lib.RS", Language::Rust),
            ("tools/reader.py", Language::Python),
            ("web/app.jsx", Language::JavaScript),
            ("web/auth.service.ts", Language::TypeScript),
            ("cmd/main.go", Language::Go),
            ("app/models/user.rb", Language::Ruby),
            ("Makefile", Language::Unknown),
            ("notes.txt", Language::Unknown),
        ] {
            assert_eq!(Language::from_path(name), expected, "{name}");
        }
    }

    #[test]
    fn test_grammars() {
        for lang in [
            Language::Rust,
            Language::Python,
            Language::JavaScript,
            Language::TypeScript,
            Language::Go,
        ] {
            assert!(lang.has_grammar());
            assert!(lang.tree_sitter_language().is_some(), "{lang:?}");
        }
        assert!(!Language::Java.has_grammar());
        assert!(Language::Unknown.tree_sitter_language().is_none());
    }

    #[test]
    fn test_lexical_rules() {
        let python = Language::Python.lexical_rules();
        assert_eq!(python.block_style, BlockStyle::Indentation);
        assert!(python.triple_quotes);
        assert!(python.line_comments.contains(&"#"));

        let rust = Language::Rust.lexical_rules();
        assert_eq!(rust.char_literals, CharLiterals::RustLike);
        assert!(rust.raw_strings && rust.nested_block_comments);

        let ts = Language::TypeScript.lexical_rules();
        assert!(ts.backtick_strings);
        assert!(ts.quotes.contains(&'\''));
    }

    #[test]
    fn test_import_patterns() {
        assert!(Language::Rust.import_patterns().contains(&"use "));
        assert!(Language::Python.import_patterns().contains(&"import "));
        assert!(Language::TypeScript.import_patterns().contains(&"import "));
    }
}
