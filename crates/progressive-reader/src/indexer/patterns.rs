//! Declaration-introducer patterns for the heuristic scanner.
//!
//! Patterns are matched against the trimmed text of a line that starts in
//! code. A pattern names the declaration through the `name` group and, for
//! keyword-driven families, its kind through the `kw` group.

use crate::language::Language;
use crate::types::DeclarationKind;
use once_cell::sync::Lazy;
use regex::Regex;

/// Declaration found at the start of a line
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Introducer {
    pub kind: DeclarationKind,
    pub name: Option<String>,
}

#[derive(Clone, Copy)]
enum RuleKind {
    Fixed(DeclarationKind),
    /// Kind derived from the `kw` capture
    Keyword,
}

struct Rule {
    regex: Regex,
    kind: RuleKind,
    /// Only valid directly inside a class-like body
    member_only: bool,
    /// Reported as a method when the enclosing declaration is a container
    method_in_container: bool,
}

fn rule(pattern: &str, kind: RuleKind) -> Rule {
    Rule {
        regex: Regex::new(pattern).unwrap_or_else(|e| panic!("invalid pattern {pattern}: {e}")),
        kind,
        member_only: false,
        method_in_container: false,
    }
}

fn function(pattern: &str) -> Rule {
    Rule {
        method_in_container: true,
        ..rule(pattern, RuleKind::Fixed(DeclarationKind::Function))
    }
}

fn member(pattern: &str) -> Rule {
    Rule {
        member_only: true,
        ..rule(pattern, RuleKind::Fixed(DeclarationKind::Method))
    }
}

const RESERVED: &[&str] = &[
    "if", "else", "for", "while", "do", "switch", "case", "catch", "try", "return", "throw",
    "new", "delete", "typeof", "instanceof", "await", "yield", "super", "this", "function",
    "sizeof", "extends", "implements", "with", "using", "lock", "foreach",
];

static JS_RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    const EXPORT: &str = r"^(?:export\s+(?:default\s+)?)?(?:declare\s+)?";
    vec![
        rule(
            &format!(r"{EXPORT}(?:abstract\s+)?class\b\s*(?P<name>[A-Za-z_$][\w$]*)?"),
            RuleKind::Fixed(DeclarationKind::Class),
        ),
        rule(
            &format!(r"{EXPORT}interface\s+(?P<name>[A-Za-z_$][\w$]*)"),
            RuleKind::Fixed(DeclarationKind::Interface),
        ),
        rule(
            &format!(r"{EXPORT}(?:const\s+)?enum\s+(?P<name>[A-Za-z_$][\w$]*)"),
            RuleKind::Fixed(DeclarationKind::Enum),
        ),
        rule(
            &format!(r"{EXPORT}type\s+(?P<name>[A-Za-z_$][\w$]*)\s*(?:<.*>)?\s*="),
            RuleKind::Fixed(DeclarationKind::Type),
        ),
        rule(
            &format!(r"{EXPORT}(?:namespace|module)\s+(?P<name>[A-Za-z_$][\w$.]*)"),
            RuleKind::Fixed(DeclarationKind::Module),
        ),
        function(&format!(
            r"{EXPORT}(?:async\s+)?function\b\s*\*?\s*(?P<name>[A-Za-z_$][\w$]*)?"
        )),
        function(
            r"^(?:export\s+)?(?:const|let|var)\s+(?P<name>[A-Za-z_$][\w$]*)\s*(?::[^=]+)?=\s*(?:async\s+)?(?:function\b|\([^)]*\)\s*(?::[^=]+)?=>|[A-Za-z_$][\w$]*\s*=>|\(\s*$)",
        ),
        rule(
            r"^(?:export\s+default\b|module\.exports\s*=)",
            RuleKind::Fixed(DeclarationKind::Export),
        ),
        member(
            r"^(?:(?:public|private|protected|static|readonly|abstract|override|async|get|set|declare)\s+)*\*?\s*(?P<name>#?[A-Za-z_$][\w$]*)\s*(?:<[^>]*>)?\s*\(",
        ),
        member(
            r"^(?:(?:public|private|protected|static|readonly)\s+)*(?P<name>#?[A-Za-z_$][\w$]*)\s*(?::[^=]+)?=\s*(?:async\s+)?(?:\([^)]*\)|[A-Za-z_$][\w$]*)\s*(?::[^=]+)?=>",
        ),
    ]
});

static RUST_RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    const VIS: &str = r"^(?:pub(?:\s*\([^)]*\))?\s+)?";
    vec![
        function(&format!(
            r#"{VIS}(?:default\s+)?(?:const\s+)?(?:async\s+)?(?:unsafe\s+)?(?:extern\s+(?:"[^"]*"\s+)?)?fn\s+(?P<name>[A-Za-z_]\w*)"#
        )),
        rule(
            &format!(r"{VIS}(?P<kw>struct|union|enum|trait|mod|type)\s+(?P<name>[A-Za-z_]\w*)"),
            RuleKind::Keyword,
        ),
        rule(
            &format!(r"{VIS}unsafe\s+(?P<kw>trait)\s+(?P<name>[A-Za-z_]\w*)"),
            RuleKind::Keyword,
        ),
        rule(
            r"^(?:unsafe\s+)?impl\b(?:\s*<.*?>)?\s+(?:.*?\bfor\s+)?&?\s*(?:[A-Za-z_]\w*::)*(?P<name>[A-Za-z_]\w*)",
            RuleKind::Fixed(DeclarationKind::Impl),
        ),
        rule(
            r"^macro_rules!\s*(?P<name>[A-Za-z_]\w*)",
            RuleKind::Fixed(DeclarationKind::Other),
        ),
    ]
});

static GO_RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        rule(
            r"^func\s+\([^)]*\)\s*(?P<name>[A-Za-z_]\w*)",
            RuleKind::Fixed(DeclarationKind::Method),
        ),
        rule(
            r"^func\s+(?P<name>[A-Za-z_]\w*)",
            RuleKind::Fixed(DeclarationKind::Function),
        ),
        rule(
            r"^type\s+(?P<name>[A-Za-z_]\w*)(?:\[[^\]]*\])?\s+(?P<kw>struct|interface)\b",
            RuleKind::Keyword,
        ),
        rule(
            r"^type\s+(?P<name>[A-Za-z_]\w*)",
            RuleKind::Fixed(DeclarationKind::Type),
        ),
    ]
});

static PYTHON_RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        function(r"^(?:async\s+)?def\s+(?P<name>[A-Za-z_]\w*)"),
        rule(
            r"^class\s+(?P<name>[A-Za-z_]\w*)",
            RuleKind::Fixed(DeclarationKind::Class),
        ),
    ]
});

static RUBY_RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        function(r"^def\s+(?P<name>(?:self\.)?[A-Za-z_]\w*[?!=]?)"),
        rule(
            r"^(?P<kw>class|module)\s+(?P<name>[A-Z][\w:]*)",
            RuleKind::Keyword,
        ),
    ]
});

static C_FAMILY_RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    const MODIFIERS: &str = r"^(?:(?:public|private|protected|internal|static|final|abstract|sealed|partial|open|data|inline|export|annotation|fileprivate|override|suspend|virtual|extern|unsafe|readonly)\s+)*";
    vec![
        rule(
            &format!(
                r"{MODIFIERS}(?:enum\s+)?(?P<kw>class|interface|enum|struct|record|object|trait|protocol|extension|namespace|union)\s+(?P<name>[A-Za-z_][\w.]*)"
            ),
            RuleKind::Keyword,
        ),
        function(&format!(
            r"{MODIFIERS}(?:fun|func)\s+(?:<[^>]*>\s*)?(?:[\w.]+\.)?(?P<name>[A-Za-z_]\w*)"
        )),
        // `Type name(args) {` style functions and methods
        function(
            r"^(?:[\w<>\[\],.*&:~]+\s+)+[*&]*(?P<name>[A-Za-z_~][\w:~]*)\s*\([^;]*$",
        ),
    ]
});

static GENERIC_RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        rule(
            r"^(?:export\s+)?(?:pub\s+)?(?P<kw>class|struct|interface|trait|enum|module|namespace)\s+(?P<name>[A-Za-z_$][\w$]*)",
            RuleKind::Keyword,
        ),
        function(
            r"^(?:export\s+)?(?:pub\s+)?(?:async\s+)?(?:function|fn|func|def|fun|sub|proc)\s+(?P<name>[A-Za-z_$][\w$]*)",
        ),
    ]
});

fn rules_for(language: Language) -> &'static [Rule] {
    match language {
        Language::JavaScript | Language::TypeScript => &JS_RULES,
        Language::Rust => &RUST_RULES,
        Language::Go => &GO_RULES,
        Language::Python => &PYTHON_RULES,
        Language::Ruby => &RUBY_RULES,
        Language::Java
        | Language::C
        | Language::Cpp
        | Language::CSharp
        | Language::Swift
        | Language::Kotlin => &C_FAMILY_RULES,
        Language::Unknown => &GENERIC_RULES,
    }
}

fn keyword_kind(keyword: &str) -> DeclarationKind {
    match keyword {
        "class" | "record" | "object" => DeclarationKind::Class,
        "interface" | "protocol" => DeclarationKind::Interface,
        "struct" | "union" => DeclarationKind::Struct,
        "enum" => DeclarationKind::Enum,
        "trait" => DeclarationKind::Trait,
        "extension" => DeclarationKind::Impl,
        "mod" | "module" | "namespace" => DeclarationKind::Module,
        "type" => DeclarationKind::Type,
        _ => DeclarationKind::Other,
    }
}

/// Match a declaration introducer at the start of `line` (already trimmed).
///
/// `enclosing` is the kind of the innermost open declaration, if any.
pub(crate) fn detect(
    language: Language,
    line: &str,
    enclosing: Option<DeclarationKind>,
) -> Option<Introducer> {
    let in_container = enclosing.is_some_and(DeclarationKind::is_container);

    for rule in rules_for(language) {
        if rule.member_only && !in_container {
            continue;
        }
        let Some(caps) = rule.regex.captures(line) else {
            continue;
        };

        let name = caps.name("name").map(|m| m.as_str().to_string());
        if name.as_deref().is_some_and(|n| RESERVED.contains(&n)) {
            continue;
        }

        let mut kind = match rule.kind {
            RuleKind::Fixed(kind) => kind,
            RuleKind::Keyword => caps
                .name("kw")
                .map_or(DeclarationKind::Other, |m| keyword_kind(m.as_str())),
        };
        if rule.method_in_container && in_container {
            kind = DeclarationKind::Method;
        }

        return Some(Introducer { kind, name });
    }

    None
}

/// Attribute / decorator lines that belong to the next declaration
pub(crate) fn is_decorator(language: Language, line: &str) -> bool {
    match language {
        Language::Rust => line.starts_with("#[") && line.ends_with(']'),
        Language::Python
        | Language::TypeScript
        | Language::JavaScript
        | Language::Java
        | Language::Kotlin
        | Language::Swift => line.starts_with('@'),
        Language::CSharp => line.starts_with('[') && line.ends_with(']'),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind_and_name(language: Language, line: &str) -> Option<(DeclarationKind, Option<String>)> {
        detect(language, line, None).map(|i| (i.kind, i.name))
    }

    fn named(kind: DeclarationKind, name: &str) -> Option<(DeclarationKind, Option<String>)> {
        Some((kind, Some(name.to_string())))
    }

    #[test]
    fn typescript_top_level() {
        let ts = Language::TypeScript;
        assert_eq!(
            kind_and_name(ts, "export class AuthService {"),
            named(DeclarationKind::Class, "AuthService")
        );
        assert_eq!(
            kind_and_name(ts, "export default abstract class Base<T> {"),
            named(DeclarationKind::Class, "Base")
        );
        assert_eq!(
            kind_and_name(ts, "export interface User {"),
            named(DeclarationKind::Interface, "User")
        );
        assert_eq!(
            kind_and_name(ts, "export type Id = string;"),
            named(DeclarationKind::Type, "Id")
        );
        assert_eq!(
            kind_and_name(ts, "export async function generateId(): string {"),
            named(DeclarationKind::Function, "generateId")
        );
        assert_eq!(
            kind_and_name(ts, "export const handler = async (req: Request) => {"),
            named(DeclarationKind::Function, "handler")
        );
        assert_eq!(
            kind_and_name(ts, "module.exports = { UserController };"),
            Some((DeclarationKind::Export, None))
        );
        assert_eq!(kind_and_name(ts, "const total = (a + b) * 2;"), None);
        assert_eq!(kind_and_name(ts, "import { User } from './user';"), None);
        assert_eq!(kind_and_name(ts, "if (x) {"), None);
    }

    #[test]
    fn typescript_members_need_a_container() {
        let ts = Language::TypeScript;
        let line = "private async validateCredentials(username: string): Promise<User> {";
        assert_eq!(detect(ts, line, None), None);

        let method = detect(ts, line, Some(DeclarationKind::Class)).unwrap();
        assert_eq!(method.kind, DeclarationKind::Method);
        assert_eq!(method.name.as_deref(), Some("validateCredentials"));

        assert_eq!(
            detect(ts, "constructor() {", Some(DeclarationKind::Class))
                .and_then(|i| i.name),
            Some("constructor".to_string())
        );
        assert_eq!(detect(ts, "if (ok) {", Some(DeclarationKind::Class)), None);
        assert_eq!(detect(ts, "return this.x;", Some(DeclarationKind::Class)), None);

        let field = detect(ts, "handle = async (e: Event) => {", Some(DeclarationKind::Class));
        assert_eq!(field.map(|i| i.kind), Some(DeclarationKind::Method));
    }

    #[test]
    fn rust_items() {
        let rs = Language::Rust;
        assert_eq!(
            kind_and_name(rs, "pub(crate) async fn load(path: &Path) -> Result<()> {"),
            named(DeclarationKind::Function, "load")
        );
        assert_eq!(
            kind_and_name(rs, "pub struct Point {"),
            named(DeclarationKind::Struct, "Point")
        );
        assert_eq!(
            kind_and_name(rs, "impl<T: Clone> Display for Wrapper<T> {"),
            named(DeclarationKind::Impl, "Wrapper")
        );
        assert_eq!(
            kind_and_name(rs, "impl std::fmt::Debug for Point {"),
            named(DeclarationKind::Impl, "Point")
        );
        assert_eq!(
            kind_and_name(rs, "mod tests {"),
            named(DeclarationKind::Module, "tests")
        );
        assert_eq!(
            detect(rs, "fn area(&self) -> f64 {", Some(DeclarationKind::Impl)).map(|i| i.kind),
            Some(DeclarationKind::Method)
        );
        assert_eq!(kind_and_name(rs, "let x = fn_ptr;"), None);
    }

    #[test]
    fn go_declarations() {
        let go = Language::Go;
        assert_eq!(
            kind_and_name(go, "func (r *UserRepository) FindByID(ctx context.Context) error {"),
            named(DeclarationKind::Method, "FindByID")
        );
        assert_eq!(
            kind_and_name(go, "func NewUserRepository(db *Database) *UserRepository {"),
            named(DeclarationKind::Function, "NewUserRepository")
        );
        assert_eq!(
            kind_and_name(go, "type User struct {"),
            named(DeclarationKind::Struct, "User")
        );
        assert_eq!(
            kind_and_name(go, "type Store interface {"),
            named(DeclarationKind::Interface, "Store")
        );
        assert_eq!(kind_and_name(go, "type ID string"), named(DeclarationKind::Type, "ID"));
    }

    #[test]
    fn python_and_ruby() {
        let py = Language::Python;
        assert_eq!(
            kind_and_name(py, "async def find_by_id(self, user_id: str):"),
            named(DeclarationKind::Function, "find_by_id")
        );
        assert_eq!(
            detect(py, "def create(self):", Some(DeclarationKind::Class)).map(|i| i.kind),
            Some(DeclarationKind::Method)
        );
        assert_eq!(
            kind_and_name(py, "class UserRepository:"),
            named(DeclarationKind::Class, "UserRepository")
        );
        assert_eq!(
            kind_and_name(Language::Ruby, "def valid?"),
            named(DeclarationKind::Function, "valid?")
        );
    }

    #[test]
    fn c_family() {
        assert_eq!(
            kind_and_name(Language::Java, "public final class UserService {"),
            named(DeclarationKind::Class, "UserService")
        );
        assert_eq!(
            kind_and_name(Language::C, "static int parse_line(const char *line) {"),
            named(DeclarationKind::Function, "parse_line")
        );
        assert_eq!(kind_and_name(Language::C, "int parse_line(const char *line);"), None);
        assert_eq!(kind_and_name(Language::Java, "return compute(x);"), None);
        assert_eq!(
            kind_and_name(Language::Kotlin, "suspend fun fetch(id: String): User {"),
            named(DeclarationKind::Function, "fetch")
        );
    }

    #[test]
    fn generic_fallback() {
        assert_eq!(
            kind_and_name(Language::Unknown, "function setup() {"),
            named(DeclarationKind::Function, "setup")
        );
        assert_eq!(kind_and_name(Language::Unknown, "plain prose line"), None);
    }

    #[test]
    fn decorators() {
        assert!(is_decorator(Language::Python, "@dataclass"));
        assert!(is_decorator(Language::Rust, "#[derive(Debug, Clone)]"));
        assert!(!is_decorator(Language::Rust, "#![allow(dead_code)"));
        assert!(!is_decorator(Language::Go, "@x"));
    }
}
