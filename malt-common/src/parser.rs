// malt-common/src/parser.rs
//! Recursive-descent parser for formula documents.
//!
//! The directive language is method-call-shaped but is never executed as
//! host code: each line is tokenized and matched against the closed
//! directive grammar, producing the `Directive` tree plus guard ASTs.
//! Declaration order and nesting depth are preserved. Anything the
//! engine does not interpret (homepage, url, resource blocks, method
//! bodies) is skipped with balanced `end` tracking so it cannot
//! desynchronize directive nesting.

use std::str::FromStr;

use tracing::debug;

use crate::dependency::definition::{DependencyKind, DependencyTag};
use crate::dependency::expr::{BlockPredicate, Guard, SystemClause, VersionModifier};
use crate::dependency::requirement::Requirement;
use crate::error::{MaltError, Result};
use crate::model::formula::{Directive, FormulaDefinition};
use crate::model::version::{CmpOp, CpuArch, MacOSVersion, OsFamily, ToolVersion};

/// Parse one formula document into its directive tree.
pub fn parse_formula(name: &str, source: &str) -> Result<FormulaDefinition> {
    Parser::new(name).parse(source)
}

struct Parser<'a> {
    formula: &'a str,
}

/// One open scope while walking the document.
enum Frame {
    /// An `on_... do` block collecting directives.
    Block {
        predicate: BlockPredicate,
        body: Vec<Directive>,
        line: usize,
    },
    /// An uninterpreted host block (`resource ... do`, `def ...`);
    /// contents are skipped, nested openers/closers are counted.
    Opaque { depth: usize },
}

impl<'a> Parser<'a> {
    fn new(formula: &'a str) -> Self {
        Self { formula }
    }

    fn parse(&self, source: &str) -> Result<FormulaDefinition> {
        let mut root: Vec<Directive> = Vec::new();
        let mut stack: Vec<Frame> = Vec::new();
        let mut class_wrappers = 0usize;

        for (idx, raw) in source.lines().enumerate() {
            let line_no = idx + 1;
            let line = match strip_comment(raw) {
                Some(l) => l,
                None => continue,
            };

            // inside an opaque block only the open/close bookkeeping runs
            if let Some(Frame::Opaque { depth }) = stack.last_mut() {
                if is_end(&line) {
                    *depth -= 1;
                    if *depth == 0 {
                        stack.pop();
                    }
                } else if opens_host_block(&line) {
                    *depth += 1;
                }
                continue;
            }

            if let Some(rest) = line.strip_prefix("depends_on ") {
                let directive = self.parse_depends_on(rest.trim(), line_no)?;
                push_directive(&mut root, &mut stack, directive);
            } else if let Some(rest) = line.strip_prefix("uses_from_macos ") {
                let directive = self.parse_uses_from_macos(rest.trim(), line_no)?;
                push_directive(&mut root, &mut stack, directive);
            } else if let Some(rest) = line.strip_prefix("option ") {
                let directive = self.parse_option(rest.trim(), line_no)?;
                push_directive(&mut root, &mut stack, directive);
            } else if line.starts_with("on_") {
                let predicate = self.parse_on_head(&line, line_no)?;
                stack.push(Frame::Block {
                    predicate,
                    body: Vec::new(),
                    line: line_no,
                });
            } else if is_end(&line) {
                match stack.pop() {
                    Some(Frame::Block {
                        predicate, body, ..
                    }) => {
                        push_directive(
                            &mut root,
                            &mut stack,
                            Directive::OnBlock { predicate, body },
                        );
                    }
                    Some(frame @ Frame::Opaque { .. }) => {
                        // unreachable: opaque frames are handled above
                        stack.push(frame);
                    }
                    None => {
                        if class_wrappers > 0 {
                            class_wrappers -= 1;
                        } else {
                            return Err(self.err(line_no, "unexpected 'end'"));
                        }
                    }
                }
            } else if line.starts_with("class ") {
                class_wrappers += 1;
            } else if opens_host_block(&line) {
                debug!("'{}': skipping host block at line {line_no}", self.formula);
                stack.push(Frame::Opaque { depth: 1 });
            } else {
                // metadata the engine does not interpret (homepage, url, ...)
                debug!("'{}': ignoring line {line_no}: {line}", self.formula);
            }
        }

        if let Some(frame) = stack.last() {
            let line = match frame {
                Frame::Block { line, .. } => *line,
                Frame::Opaque { .. } => 0,
            };
            return Err(self.err(line, "unterminated block at end of file"));
        }

        Ok(FormulaDefinition::new(self.formula, root))
    }

    // ----- stanza parsing ---------------------------------------------------

    fn parse_depends_on(&self, rest: &str, line_no: usize) -> Result<Directive> {
        let (spec, guard_clause) = split_guard(rest);
        let tokens = tokenize(spec).map_err(|e| self.err(line_no, &e))?;
        let mut cursor = Cursor::new(&tokens);

        let directive = match cursor.next() {
            Some(Tok::Str(target)) => {
                let target = target.clone();
                let (tags, options) = self.parse_tag_spec(&mut cursor, line_no)?;
                let guard = match guard_clause {
                    Some(clause) => Some(self.parse_guard(clause, line_no)?),
                    None => None,
                };
                Directive::DependsOn {
                    target,
                    tags,
                    options,
                    guard,
                }
            }
            Some(Tok::Sym(sym)) => Directive::Requires(self.parse_requirement_symbol(
                sym,
                &mut cursor,
                line_no,
            )?),
            Some(Tok::Key(key)) => {
                let key = key.clone();
                Directive::Requires(self.parse_requirement_keyed(&key, &mut cursor, line_no)?)
            }
            _ => return Err(self.err(line_no, "malformed depends_on stanza")),
        };
        if !cursor.at_end() {
            return Err(self.err(line_no, "trailing tokens after depends_on stanza"));
        }
        Ok(directive)
    }

    fn parse_uses_from_macos(&self, rest: &str, line_no: usize) -> Result<Directive> {
        let tokens = tokenize(rest).map_err(|e| self.err(line_no, &e))?;
        let mut cursor = Cursor::new(&tokens);

        let target = match cursor.next() {
            Some(Tok::Str(s)) => s.clone(),
            _ => return Err(self.err(line_no, "uses_from_macos expects a quoted target")),
        };
        let (tags, options) = self.parse_tag_spec(&mut cursor, line_no)?;
        if !options.is_empty() {
            return Err(self.err(line_no, "uses_from_macos does not take option strings"));
        }

        let mut since = None;
        if cursor.eat(&Tok::Comma) {
            match (cursor.next(), cursor.next()) {
                (Some(Tok::Key(key)), Some(Tok::Sym(value))) if key == "since" => {
                    since = Some(
                        MacOSVersion::from_str(value)
                            .map_err(|_| self.err(line_no, &format!("unknown since: version ':{value}'")))?,
                    );
                }
                _ => return Err(self.err(line_no, "malformed since: clause")),
            }
        }
        if !cursor.at_end() {
            return Err(self.err(line_no, "trailing tokens after uses_from_macos stanza"));
        }
        Ok(Directive::UsesFromMacos {
            target,
            tags,
            since,
        })
    }

    fn parse_option(&self, rest: &str, line_no: usize) -> Result<Directive> {
        let tokens = tokenize(rest).map_err(|e| self.err(line_no, &e))?;
        let mut cursor = Cursor::new(&tokens);
        let name = match cursor.next() {
            Some(Tok::Str(s)) => s.clone(),
            _ => return Err(self.err(line_no, "option expects a quoted flag name")),
        };
        let description = if cursor.eat(&Tok::Comma) {
            match cursor.next() {
                Some(Tok::Str(s)) => s.clone(),
                _ => return Err(self.err(line_no, "option description must be a string")),
            }
        } else {
            String::new()
        };
        if !cursor.at_end() {
            return Err(self.err(line_no, "trailing tokens after option stanza"));
        }
        Ok(Directive::Option { name, description })
    }

    /// `=> :kind` or `=> [:kind, "opt-flag", ...]`; absent means runtime.
    fn parse_tag_spec(
        &self,
        cursor: &mut Cursor<'_>,
        line_no: usize,
    ) -> Result<(DependencyTag, Vec<String>)> {
        if !cursor.eat(&Tok::Arrow) {
            return Ok((DependencyTag::RUNTIME, Vec::new()));
        }
        let mut tags = DependencyTag::empty();
        let mut options = Vec::new();
        match cursor.next() {
            Some(Tok::Sym(sym)) => {
                tags |= self.kind_tag(sym, line_no)?;
            }
            Some(Tok::LBracket) => loop {
                match cursor.next() {
                    Some(Tok::Sym(sym)) => tags |= self.kind_tag(sym, line_no)?,
                    Some(Tok::Str(opt)) => options.push(opt.clone()),
                    Some(Tok::RBracket) => break,
                    _ => return Err(self.err(line_no, "malformed tag list")),
                }
                match cursor.next() {
                    Some(Tok::Comma) => continue,
                    Some(Tok::RBracket) => break,
                    _ => return Err(self.err(line_no, "malformed tag list")),
                }
            },
            _ => return Err(self.err(line_no, "expected tag symbol or list after '=>'")),
        }
        if tags.is_empty() {
            tags = DependencyTag::RUNTIME;
        }
        Ok((tags, options))
    }

    fn kind_tag(&self, sym: &str, line_no: usize) -> Result<DependencyTag> {
        DependencyKind::from_symbol(sym)
            .map(|k| k.tag())
            .ok_or_else(|| self.err(line_no, &format!("unknown dependency kind ':{sym}'")))
    }

    // ----- requirements -----------------------------------------------------

    fn parse_requirement_symbol(
        &self,
        sym: &str,
        _cursor: &mut Cursor<'_>,
        line_no: usize,
    ) -> Result<Requirement> {
        match sym {
            "macos" => Ok(Requirement::Macos),
            "linux" => Ok(Requirement::Linux),
            "xcode" => Ok(Requirement::Xcode { min: None }),
            _ => Err(self.err(line_no, &format!("unknown depends_on symbol ':{sym}'"))),
        }
    }

    fn parse_requirement_keyed(
        &self,
        key: &str,
        cursor: &mut Cursor<'_>,
        line_no: usize,
    ) -> Result<Requirement> {
        // `macos: [:catalina, :build]`-style lists carry the version first;
        // the trailing tags do not affect the requirement itself.
        let value = match cursor.next() {
            Some(Tok::LBracket) => {
                let first = match cursor.next() {
                    Some(tok @ (Tok::Sym(_) | Tok::Str(_))) => tok.clone(),
                    _ => return Err(self.err(line_no, "malformed requirement list")),
                };
                loop {
                    match cursor.next() {
                        Some(Tok::RBracket) => break,
                        Some(Tok::Comma | Tok::Sym(_) | Tok::Str(_)) => continue,
                        _ => return Err(self.err(line_no, "malformed requirement list")),
                    }
                }
                first
            }
            Some(tok @ (Tok::Sym(_) | Tok::Str(_))) => tok.clone(),
            _ => return Err(self.err(line_no, "malformed requirement value")),
        };

        match key {
            "arch" => match &value {
                Tok::Sym(s) if s == "arm64" || s == "arm" => Ok(Requirement::Arch(CpuArch::Arm64)),
                Tok::Sym(s) if s == "x86_64" || s == "intel" => {
                    Ok(Requirement::Arch(CpuArch::X86_64))
                }
                _ => Err(self.err(line_no, "unknown depends_on arch:")),
            },
            "macos" | "maximum_macos" => {
                let name = match &value {
                    Tok::Sym(s) => s.clone(),
                    _ => return Err(self.err(line_no, "macos: expects a version symbol")),
                };
                let version = MacOSVersion::from_str(&name)
                    .map_err(|_| self.err(line_no, &format!("unknown macOS version ':{name}'")))?;
                if key == "maximum_macos" {
                    Ok(Requirement::MacosAtMost(version))
                } else {
                    Ok(Requirement::MacosAtLeast(version))
                }
            }
            "xcode" => match &value {
                Tok::Str(v) => {
                    let min = ToolVersion::from_str(v)
                        .map_err(|_| self.err(line_no, &format!("invalid Xcode version '{v}'")))?;
                    Ok(Requirement::Xcode { min: Some(min) })
                }
                // `xcode: :build` and friends only assert presence
                Tok::Sym(_) => Ok(Requirement::Xcode { min: None }),
                _ => Err(self.err(line_no, "malformed xcode: requirement")),
            },
            _ => Err(self.err(line_no, &format!("unknown depends_on action '{key}:'"))),
        }
    }

    // ----- on_... block heads -----------------------------------------------

    fn parse_on_head(&self, line: &str, line_no: usize) -> Result<BlockPredicate> {
        let head = match line.strip_suffix("do") {
            Some(h) => h.trim_end(),
            None => return Err(self.err(line_no, "on_ block must end with 'do'")),
        };
        let (name, param) = match head.split_once(char::is_whitespace) {
            Some((n, p)) => (n, p.trim()),
            None => (head, ""),
        };

        match name {
            "on_macos" if param.is_empty() => Ok(BlockPredicate::Os(OsFamily::Macos)),
            "on_linux" if param.is_empty() => Ok(BlockPredicate::Os(OsFamily::Linux)),
            "on_arm" if param.is_empty() => Ok(BlockPredicate::Arch(CpuArch::Arm64)),
            "on_intel" if param.is_empty() => Ok(BlockPredicate::Arch(CpuArch::X86_64)),
            "on_arch" => match param {
                ":arm" => Ok(BlockPredicate::Arch(CpuArch::Arm64)),
                ":intel" => Ok(BlockPredicate::Arch(CpuArch::X86_64)),
                _ => Err(self.unknown_predicate(line_no, head)),
            },
            "on_system" if !param.is_empty() => {
                let clauses = param
                    .split(',')
                    .map(|clause| self.parse_system_clause(clause.trim(), line_no))
                    .collect::<Result<Vec<_>>>()?;
                Ok(BlockPredicate::System(clauses))
            }
            _ => {
                if let Some(os_name) = name.strip_prefix("on_") {
                    if let Ok(version) = MacOSVersion::from_str(os_name) {
                        let modifier = match param {
                            "" => None,
                            ":or_older" => Some(VersionModifier::OrOlder),
                            ":or_newer" => Some(VersionModifier::OrNewer),
                            _ => return Err(self.unknown_predicate(line_no, head)),
                        };
                        return Ok(BlockPredicate::MacVersion { version, modifier });
                    }
                }
                Err(self.unknown_predicate(line_no, head))
            }
        }
    }

    fn parse_system_clause(&self, clause: &str, line_no: usize) -> Result<SystemClause> {
        match clause {
            ":linux" => Ok(SystemClause::Linux),
            ":macos" => Ok(SystemClause::Macos),
            _ => {
                if let Some(value) = clause.strip_prefix("macos:") {
                    let name = value.trim().strip_prefix(':').unwrap_or(value.trim());
                    let (version, modifier) = self.parse_versioned_name(name, line_no)?;
                    return Ok(SystemClause::MacVersion { version, modifier });
                }
                Err(self.unknown_predicate(line_no, clause))
            }
        }
    }

    fn parse_versioned_name(
        &self,
        name: &str,
        line_no: usize,
    ) -> Result<(MacOSVersion, Option<VersionModifier>)> {
        let (base, modifier) = if let Some(base) = name.strip_suffix("_or_older") {
            (base, Some(VersionModifier::OrOlder))
        } else if let Some(base) = name.strip_suffix("_or_newer") {
            (base, Some(VersionModifier::OrNewer))
        } else {
            (name, None)
        };
        let version = MacOSVersion::from_str(base)
            .map_err(|_| self.unknown_predicate(line_no, name))?;
        Ok((version, modifier))
    }

    // ----- stanza guards ----------------------------------------------------

    fn parse_guard(&self, clause: &str, line_no: usize) -> Result<Guard> {
        let clause = clause.trim();

        if let Some(rest) = clause.strip_prefix("MacOS.version ") {
            let mut parts = rest.split_whitespace();
            let (op, name) = match (parts.next(), parts.next(), parts.next()) {
                (Some(op), Some(name), None) => (op, name),
                _ => return Err(self.unknown_predicate(line_no, clause)),
            };
            let op = CmpOp::from_str(op).map_err(|_| self.unknown_predicate(line_no, clause))?;
            let version = MacOSVersion::from_str(name.trim_start_matches(':'))
                .map_err(|_| self.unknown_predicate(line_no, clause))?;
            return Ok(Guard::MacosVersionCmp { op, version });
        }

        if let Some(name) = clause
            .strip_prefix("Formula[\"")
            .and_then(|r| r.strip_suffix("\"].any_version_installed?"))
        {
            return Ok(Guard::AnyVersionInstalled(name.to_string()));
        }

        if let Some(flag) = quoted_arg(clause, "build.with?") {
            return Ok(Guard::BuildWith(flag));
        }
        if let Some(flag) = quoted_arg(clause, "build.without?") {
            return Ok(Guard::BuildWithout(flag));
        }

        for (prefix, tool) in [
            ("DevelopmentTools.clang_build_version ", "clang"),
            ("DevelopmentTools.gcc_version ", "gcc"),
        ] {
            if let Some(rest) = clause.strip_prefix(prefix) {
                let mut parts = rest.split_whitespace();
                let (op, ver) = match (parts.next(), parts.next(), parts.next()) {
                    (Some(op), Some(ver), None) => (op, ver),
                    _ => return Err(self.unknown_predicate(line_no, clause)),
                };
                let op =
                    CmpOp::from_str(op).map_err(|_| self.unknown_predicate(line_no, clause))?;
                let version = ToolVersion::from_str(ver)
                    .map_err(|_| self.unknown_predicate(line_no, clause))?;
                return Ok(Guard::ToolVersionCmp {
                    tool: tool.to_string(),
                    op,
                    version,
                });
            }
        }

        Err(self.unknown_predicate(line_no, clause))
    }

    // ----- error helpers ----------------------------------------------------

    fn err(&self, line: usize, reason: &str) -> MaltError {
        MaltError::Parse {
            formula: self.formula.to_string(),
            line,
            reason: reason.to_string(),
        }
    }

    fn unknown_predicate(&self, line: usize, predicate: &str) -> MaltError {
        MaltError::UnknownPredicate {
            formula: self.formula.to_string(),
            line,
            predicate: predicate.trim().to_string(),
        }
    }
}

fn push_directive(root: &mut Vec<Directive>, stack: &mut [Frame], directive: Directive) {
    for frame in stack.iter_mut().rev() {
        if let Frame::Block { body, .. } = frame {
            body.push(directive);
            return;
        }
    }
    root.push(directive);
}

/// Strip a full-line or trailing `#` comment (quote-aware). Returns None
/// for lines with no content.
fn strip_comment(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }
    let mut in_quote = false;
    let mut out = String::with_capacity(trimmed.len());
    for c in trimmed.chars() {
        match c {
            '"' => {
                in_quote = !in_quote;
                out.push(c);
            }
            '#' if !in_quote => break,
            _ => out.push(c),
        }
    }
    let out = out.trim_end().to_string();
    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}

fn is_end(line: &str) -> bool {
    line == "end"
}

/// A host-language block the engine skips over (`bottle do`,
/// `resource "x" do`, `test do |t|`, `def install`).
fn opens_host_block(line: &str) -> bool {
    if line.starts_with("def ") {
        return true;
    }
    if line == "do" || line.ends_with(" do") {
        return true;
    }
    if line.ends_with('|') {
        if let Some(pos) = line.rfind(" do |") {
            return line[pos + 5..].chars().all(|c| c.is_alphanumeric() || c == '_' || c == ',' || c == ' ' || c == '|');
        }
    }
    false
}

/// `rest` of a stanza split at a top-level ` if ` (never inside quotes).
fn split_guard(rest: &str) -> (&str, Option<&str>) {
    let bytes = rest.as_bytes();
    let mut in_quote = false;
    let needle = b" if ";
    for i in 0..bytes.len() {
        match bytes[i] {
            b'"' => in_quote = !in_quote,
            b' ' if !in_quote && bytes[i..].starts_with(needle) => {
                return (rest[..i].trim_end(), Some(rest[i + needle.len()..].trim()));
            }
            _ => {}
        }
    }
    (rest, None)
}

fn quoted_arg(clause: &str, method: &str) -> Option<String> {
    clause
        .strip_prefix(method)
        .map(str::trim)
        .and_then(|r| r.strip_prefix('"'))
        .and_then(|r| r.strip_suffix('"'))
        .map(str::to_string)
}

// ----- tokenizer ------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
enum Tok {
    /// `"text"`
    Str(String),
    /// `:symbol`
    Sym(String),
    /// `keyword:`
    Key(String),
    /// `=>`
    Arrow,
    Comma,
    LBracket,
    RBracket,
}

fn tokenize(input: &str) -> std::result::Result<Vec<Tok>, String> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            c if c.is_whitespace() => {}
            '"' => {
                let mut s = String::new();
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some(c) => s.push(c),
                        None => return Err("unterminated string".to_string()),
                    }
                }
                tokens.push(Tok::Str(s));
            }
            ':' => {
                let mut s = String::new();
                while let Some(&c) = chars.peek() {
                    if is_word_char(c) {
                        s.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if s.is_empty() {
                    return Err("bare ':'".to_string());
                }
                tokens.push(Tok::Sym(s));
            }
            '=' => match chars.next() {
                Some('>') => tokens.push(Tok::Arrow),
                _ => return Err("expected '=>'".to_string()),
            },
            ',' => tokens.push(Tok::Comma),
            '[' => tokens.push(Tok::LBracket),
            ']' => tokens.push(Tok::RBracket),
            c if is_word_char(c) => {
                let mut s = String::new();
                s.push(c);
                while let Some(&c) = chars.peek() {
                    if is_word_char(c) {
                        s.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if chars.peek() == Some(&':') {
                    chars.next();
                    tokens.push(Tok::Key(s));
                } else {
                    return Err(format!("unexpected bare word '{s}'"));
                }
            }
            c => return Err(format!("unexpected character '{c}'")),
        }
    }
    Ok(tokens)
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '+' | '@' | '.')
}

struct Cursor<'a> {
    tokens: &'a [Tok],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(tokens: &'a [Tok]) -> Self {
        Self { tokens, pos: 0 }
    }

    fn next(&mut self) -> Option<&'a Tok> {
        let tok = self.tokens.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, expected: &Tok) -> bool {
        if self.tokens.get(self.pos) == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> FormulaDefinition {
        parse_formula("demo", source).unwrap()
    }

    #[test]
    fn plain_dependency_defaults_to_runtime() {
        let f = parse(r#"depends_on "zlib""#);
        assert_eq!(
            f.directives,
            vec![Directive::DependsOn {
                target: "zlib".into(),
                tags: DependencyTag::RUNTIME,
                options: Vec::new(),
                guard: None,
            }]
        );
    }

    #[test]
    fn tagged_dependency_single_and_list() {
        let f = parse(
            r#"
            depends_on "cmake" => :build
            depends_on "pkg-config" => [:build, :test]
            depends_on "curl" => ["with-ssl", :recommended]
            "#,
        );
        assert_eq!(f.directives.len(), 3);
        match &f.directives[1] {
            Directive::DependsOn { tags, .. } => {
                assert_eq!(*tags, DependencyTag::BUILD | DependencyTag::TEST)
            }
            other => panic!("unexpected {other:?}"),
        }
        match &f.directives[2] {
            Directive::DependsOn { tags, options, .. } => {
                assert_eq!(*tags, DependencyTag::RECOMMENDED);
                assert_eq!(options, &vec!["with-ssl".to_string()]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn nested_blocks_preserve_order_and_depth() {
        let f = parse(
            r#"
            on_macos do
              on_arm do
                depends_on "libx"
              end
              depends_on "liby"
            end
            "#,
        );
        match &f.directives[0] {
            Directive::OnBlock { predicate, body } => {
                assert_eq!(*predicate, BlockPredicate::Os(OsFamily::Macos));
                assert_eq!(body.len(), 2);
                match &body[0] {
                    Directive::OnBlock { predicate, body } => {
                        assert_eq!(*predicate, BlockPredicate::Arch(CpuArch::Arm64));
                        assert_eq!(body.len(), 1);
                    }
                    other => panic!("unexpected {other:?}"),
                }
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn version_block_heads_with_modifiers() {
        let f = parse(
            r#"
            on_mojave :or_newer do
              depends_on "a"
            end
            on_monterey :or_older do
              depends_on "b"
            end
            on_catalina do
              depends_on "c"
            end
            "#,
        );
        let preds: Vec<_> = f
            .directives
            .iter()
            .map(|d| match d {
                Directive::OnBlock { predicate, .. } => predicate.clone(),
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(
            preds,
            vec![
                BlockPredicate::MacVersion {
                    version: MacOSVersion::Mojave,
                    modifier: Some(VersionModifier::OrNewer),
                },
                BlockPredicate::MacVersion {
                    version: MacOSVersion::Monterey,
                    modifier: Some(VersionModifier::OrOlder),
                },
                BlockPredicate::MacVersion {
                    version: MacOSVersion::Catalina,
                    modifier: None,
                },
            ]
        );
    }

    #[test]
    fn on_system_clause_list() {
        let f = parse(
            r#"
            on_system :linux, macos: :sierra_or_older do
              depends_on "compat"
            end
            "#,
        );
        match &f.directives[0] {
            Directive::OnBlock { predicate, .. } => assert_eq!(
                *predicate,
                BlockPredicate::System(vec![
                    SystemClause::Linux,
                    SystemClause::MacVersion {
                        version: MacOSVersion::Sierra,
                        modifier: Some(VersionModifier::OrOlder),
                    },
                ])
            ),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn uses_from_macos_forms() {
        let f = parse(
            r#"
            uses_from_macos "zlib"
            uses_from_macos "bison" => :build
            uses_from_macos "curl", since: :catalina
            "#,
        );
        assert_eq!(
            f.directives[2],
            Directive::UsesFromMacos {
                target: "curl".into(),
                tags: DependencyTag::RUNTIME,
                since: Some(MacOSVersion::Catalina),
            }
        );
        match &f.directives[1] {
            Directive::UsesFromMacos { tags, since, .. } => {
                assert_eq!(*tags, DependencyTag::BUILD);
                assert!(since.is_none());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn guard_clauses() {
        let f = parse(
            r#"
            depends_on "gettext" if MacOS.version >= :catalina
            depends_on "openldap" if build.with? "ldap"
            depends_on "zlib" if Formula["zlib"].any_version_installed?
            depends_on "llvm" if DevelopmentTools.clang_build_version <= 1400
            "#,
        );
        let guards: Vec<_> = f
            .directives
            .iter()
            .map(|d| match d {
                Directive::DependsOn { guard, .. } => guard.clone().unwrap(),
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(
            guards[0],
            Guard::MacosVersionCmp {
                op: CmpOp::Ge,
                version: MacOSVersion::Catalina,
            }
        );
        assert_eq!(guards[1], Guard::BuildWith("ldap".into()));
        assert_eq!(guards[2], Guard::AnyVersionInstalled("zlib".into()));
        assert_eq!(
            guards[3],
            Guard::ToolVersionCmp {
                tool: "clang".into(),
                op: CmpOp::Le,
                version: ToolVersion::new(vec![1400]),
            }
        );
    }

    #[test]
    fn requirement_stanzas() {
        let f = parse(
            r#"
            depends_on :macos
            depends_on :xcode
            depends_on arch: :x86_64
            depends_on macos: :catalina
            depends_on maximum_macos: :monterey
            depends_on xcode: "8.3"
            "#,
        );
        let reqs: Vec<_> = f
            .directives
            .iter()
            .map(|d| match d {
                Directive::Requires(r) => r.clone(),
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(reqs[0], Requirement::Macos);
        assert_eq!(reqs[1], Requirement::Xcode { min: None });
        assert_eq!(reqs[2], Requirement::Arch(CpuArch::X86_64));
        assert_eq!(reqs[3], Requirement::MacosAtLeast(MacOSVersion::Catalina));
        assert_eq!(reqs[4], Requirement::MacosAtMost(MacOSVersion::Monterey));
        assert_eq!(
            reqs[5],
            Requirement::Xcode {
                min: Some(ToolVersion::new(vec![8, 3]))
            }
        );
    }

    #[test]
    fn comments_and_metadata_are_tolerated() {
        let f = parse(
            r#"
            class Demo < Formula
              # full-line comment
              homepage "https://example.org"
              url "https://example.org/demo-1.0.tar.gz"
              sha256 "0000000000000000000000000000000000000000000000000000000000000000"
              depends_on "zlib" # trailing comment
              bottle do
                sha256 arm64_sonoma: "1111"
              end
              resource "extra" do
                url "https://example.org/extra.tar.gz"
              end
              def install
                system "make", "install"
              end
            end
            "#,
        );
        assert_eq!(f.directives.len(), 1);
        match &f.directives[0] {
            Directive::DependsOn { target, .. } => assert_eq!(target, "zlib"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn option_stanza() {
        let f = parse(
            r#"
            option "with-ldap", "Build with LDAP support"
            on_linux do
              option "with-systemd", "Use systemd units"
            end
            "#,
        );
        assert_eq!(
            f.directives[0],
            Directive::Option {
                name: "with-ldap".into(),
                description: "Build with LDAP support".into(),
            }
        );
        assert_eq!(
            f.options(),
            vec![
                ("with-ldap", "Build with LDAP support"),
                ("with-systemd", "Use systemd units"),
            ]
        );
    }

    #[test]
    fn unterminated_block_is_a_parse_error() {
        let err = parse_formula("demo", "on_macos do\n  depends_on \"x\"\n").unwrap_err();
        assert!(matches!(err, MaltError::Parse { .. }), "{err:?}");
    }

    #[test]
    fn unexpected_end_is_a_parse_error() {
        let err = parse_formula("demo", "depends_on \"x\"\nend\n").unwrap_err();
        assert!(matches!(err, MaltError::Parse { .. }), "{err:?}");
    }

    #[test]
    fn unknown_on_head_is_an_unknown_predicate() {
        let err = parse_formula("demo", "on_windows do\nend\n").unwrap_err();
        assert!(matches!(err, MaltError::UnknownPredicate { .. }), "{err:?}");
    }

    #[test]
    fn unknown_guard_is_an_unknown_predicate() {
        let err =
            parse_formula("demo", "depends_on \"x\" if ENV.compiler == :clang\n").unwrap_err();
        assert!(matches!(err, MaltError::UnknownPredicate { .. }), "{err:?}");
    }

    #[test]
    fn unknown_kind_tag_is_a_parse_error() {
        let err = parse_formula("demo", "depends_on \"x\" => :sometimes\n").unwrap_err();
        assert!(matches!(err, MaltError::Parse { .. }), "{err:?}");
    }
}
