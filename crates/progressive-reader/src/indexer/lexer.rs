//! Line-at-a-time lexical state machine.
//!
//! The scanner only needs to know which characters are *code*: braces and
//! terminators inside strings and comments must not move the nesting depth.
//! Each scanned line is returned with every string/comment character masked
//! to a space, so column positions are preserved.

use crate::language::{CharLiterals, LexicalRules};
use crate::types::ScanDiagnostics;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexState {
    Code,
    BlockComment { depth: usize },
    Quoted(char),
    Backtick,
    Triple(char),
    Raw { hashes: usize },
}

pub(crate) struct LineLexer {
    rules: LexicalRules,
    state: LexState,
}

impl LineLexer {
    pub(crate) fn new(rules: LexicalRules) -> Self {
        Self {
            rules,
            state: LexState::Code,
        }
    }

    /// True when the next line starts outside any string or comment
    pub(crate) fn at_code(&self) -> bool {
        self.state == LexState::Code
    }

    /// Report a literal or comment left open at end of input
    pub(crate) fn finish(&self, diagnostics: &mut ScanDiagnostics) {
        if !self.at_code() {
            diagnostics.unterminated_literals += 1;
        }
    }

    /// Scan one line (without terminator) and return its masked code
    pub(crate) fn scan(&mut self, line: &str, diagnostics: &mut ScanDiagnostics) -> String {
        let chars: Vec<char> = line.chars().collect();
        let mut code = String::with_capacity(line.len());
        let mut i = 0;

        while i < chars.len() {
            match self.state {
                LexState::Code => i = self.scan_code(&chars, i, &mut code),
                LexState::BlockComment { depth } => {
                    let (open, close) = self.rules.block_comment.unwrap_or(("/*", "*/"));
                    if starts_with_at(&chars, i, close) {
                        mask(&mut code, close.chars().count());
                        i += close.chars().count();
                        self.state = if depth > 1 {
                            LexState::BlockComment { depth: depth - 1 }
                        } else {
                            LexState::Code
                        };
                    } else if self.rules.nested_block_comments && starts_with_at(&chars, i, open) {
                        mask(&mut code, open.chars().count());
                        i += open.chars().count();
                        self.state = LexState::BlockComment { depth: depth + 1 };
                    } else {
                        mask(&mut code, 1);
                        i += 1;
                    }
                }
                LexState::Quoted(quote) => {
                    if chars[i] == '\\' {
                        let n = (chars.len() - i).min(2);
                        mask(&mut code, n);
                        i += n;
                    } else {
                        if chars[i] == quote {
                            self.state = LexState::Code;
                        }
                        mask(&mut code, 1);
                        i += 1;
                    }
                }
                LexState::Backtick => {
                    if chars[i] == '\\' {
                        let n = (chars.len() - i).min(2);
                        mask(&mut code, n);
                        i += n;
                    } else {
                        if chars[i] == '`' {
                            self.state = LexState::Code;
                        }
                        mask(&mut code, 1);
                        i += 1;
                    }
                }
                LexState::Triple(quote) => {
                    if chars[i] == '\\' {
                        let n = (chars.len() - i).min(2);
                        mask(&mut code, n);
                        i += n;
                    } else if is_triple(&chars, i, quote) {
                        mask(&mut code, 3);
                        i += 3;
                        self.state = LexState::Code;
                    } else {
                        mask(&mut code, 1);
                        i += 1;
                    }
                }
                LexState::Raw { hashes } => {
                    if chars[i] == '"' && (1..=hashes).all(|k| chars.get(i + k) == Some(&'#')) {
                        mask(&mut code, hashes + 1);
                        i += hashes + 1;
                        self.state = LexState::Code;
                    } else {
                        mask(&mut code, 1);
                        i += 1;
                    }
                }
            }
        }

        if let LexState::Quoted(_) = self.state {
            if !self.rules.multiline_quotes {
                diagnostics.unterminated_literals += 1;
                self.state = LexState::Code;
            }
        }

        code
    }

    fn scan_code(&mut self, chars: &[char], i: usize, code: &mut String) -> usize {
        let rules = self.rules;
        let ch = chars[i];

        if let Some((open, _)) = rules.block_comment {
            // `=begin` style markers only count at the start of a line
            let positional = open.starts_with('=') && i != 0;
            if !positional && starts_with_at(chars, i, open) {
                mask(code, open.chars().count());
                self.state = LexState::BlockComment { depth: 1 };
                return i + open.chars().count();
            }
        }

        if rules
            .line_comments
            .iter()
            .any(|marker| starts_with_at(chars, i, marker))
        {
            mask(code, chars.len() - i);
            return chars.len();
        }

        if rules.triple_quotes
            && (ch == '"' || rules.quotes.contains(&ch))
            && is_triple(chars, i, ch)
        {
            mask(code, 3);
            self.state = LexState::Triple(ch);
            return i + 3;
        }

        if rules.raw_strings && (ch == 'r' || ch == 'b') {
            if let Some((consumed, hashes)) = raw_string_opener(chars, i) {
                mask(code, consumed);
                self.state = LexState::Raw { hashes };
                return i + consumed;
            }
        }

        if rules.backtick_strings && ch == '`' {
            mask(code, 1);
            self.state = LexState::Backtick;
            return i + 1;
        }

        if rules.quotes.contains(&ch) {
            mask(code, 1);
            self.state = LexState::Quoted(ch);
            return i + 1;
        }

        if ch == '\'' && rules.char_literals != CharLiterals::None {
            if let Some(len) = char_literal_len(chars, i) {
                mask(code, len);
                return i + len;
            }
        }

        code.push(ch);
        i + 1
    }
}

fn mask(code: &mut String, n: usize) {
    code.extend(std::iter::repeat(' ').take(n));
}

fn starts_with_at(chars: &[char], i: usize, pattern: &str) -> bool {
    let mut idx = i;
    for p in pattern.chars() {
        if chars.get(idx) != Some(&p) {
            return false;
        }
        idx += 1;
    }
    true
}

fn is_triple(chars: &[char], i: usize, quote: char) -> bool {
    chars.get(i) == Some(&quote) && chars.get(i + 1) == Some(&quote) && chars.get(i + 2) == Some(&quote)
}

/// `r"`, `r#"`, `br"`, `br##"` ... not preceded by an identifier character
fn raw_string_opener(chars: &[char], i: usize) -> Option<(usize, usize)> {
    if i > 0 && is_ident_char(chars[i - 1]) {
        return None;
    }
    let mut idx = i;
    if chars[idx] == 'b' {
        idx += 1;
    }
    if chars.get(idx) != Some(&'r') {
        return None;
    }
    idx += 1;
    let mut hashes = 0;
    while chars.get(idx) == Some(&'#') {
        hashes += 1;
        idx += 1;
    }
    (chars.get(idx) == Some(&'"')).then_some((idx + 1 - i, hashes))
}

/// Length of a `'x'` / `'\n'` / `'\u{1F600}'` literal starting at `i`
fn char_literal_len(chars: &[char], i: usize) -> Option<usize> {
    match chars.get(i + 1)? {
        '\\' => {
            let close = chars[i + 2..]
                .iter()
                .take(10)
                .position(|c| *c == '\'')?;
            Some(close + 3)
        }
        _ => (chars.get(i + 2) == Some(&'\'')).then_some(3),
    }
}

pub(crate) fn is_ident_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '$'
}
