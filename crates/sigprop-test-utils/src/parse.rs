//! Java-like source parsing into a [`MemoryTree`]
//!
//! Only the shapes the engine edits get structure (calls, object and array
//! creation, references, method references, lambdas, assignments and
//! statements); every other expression is kept as opaque text.

use anyhow::{anyhow, bail, Result};
use sigprop_tree::{factory, MemoryTree, NodeId, NodeKind, SyntaxTree};

const MODIFIERS: &[&str] = &[
    "public",
    "protected",
    "private",
    "static",
    "final",
    "abstract",
    "synchronized",
    "native",
    "default",
];

const KEYWORDS: &[&str] = &[
    "return", "throw", "new", "try", "catch", "finally", "if", "else", "while", "for", "do",
    "switch", "case", "break", "continue", "yield",
];

fn is_modifier(text: &str) -> bool {
    MODIFIERS.iter().any(|m| *m == text)
}

fn is_keyword(text: &str) -> bool {
    KEYWORDS.iter().any(|k| *k == text)
}

fn is_constant(text: &str) -> bool {
    matches!(text, "true" | "false" | "null" | "this" | "super")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    Ident,
    Literal,
    Punct,
}

#[derive(Debug, Clone, Copy)]
struct Token {
    kind: TokenKind,
    start: usize,
    end: usize,
}

fn tokenize(src: &str) -> Result<Vec<Token>> {
    const MULTI: &[&str] = &["...", "::", "->", "==", "!=", "<=", ">=", "&&", "||", "++", "--", "+=", "-="];
    let bytes = src.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i] as char;
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        let start = i;
        let kind = if c.is_ascii_alphabetic() || c == '_' || c == '$' {
            while i < bytes.len() && ((bytes[i] as char).is_ascii_alphanumeric() || matches!(bytes[i], b'_' | b'$')) {
                i += 1;
            }
            TokenKind::Ident
        } else if c.is_ascii_digit() {
            while i < bytes.len() && ((bytes[i] as char).is_ascii_alphanumeric() || bytes[i] == b'.') {
                i += 1;
            }
            TokenKind::Literal
        } else if c == '"' || c == '\'' {
            i += 1;
            while i < bytes.len() && bytes[i] as char != c {
                if bytes[i] == b'\\' {
                    i += 1;
                }
                i += 1;
            }
            if i >= bytes.len() {
                bail!("unterminated literal at {start}");
            }
            i += 1;
            TokenKind::Literal
        } else {
            let rest = &src[i..];
            i += MULTI.iter().find(|m| rest.starts_with(*m)).map_or(1, |m| m.len());
            TokenKind::Punct
        };
        out.push(Token { kind, start, end: i });
    }
    Ok(out)
}

/// Class header parts: modifiers, name, direct supertypes
pub(crate) struct ClassHeader {
    pub(crate) modifiers: String,
    pub(crate) name: String,
    pub(crate) supertypes: Vec<String>,
}

/// Recursive-descent parser over one source snippet
pub(crate) struct Parser<'s, 't> {
    src: &'s str,
    tokens: Vec<Token>,
    pos: usize,
    tree: &'t mut MemoryTree,
}

impl<'s, 't> Parser<'s, 't> {
    pub(crate) fn new(src: &'s str, tree: &'t mut MemoryTree) -> Result<Self> {
        Ok(Self {
            src,
            tokens: tokenize(src)?,
            pos: 0,
            tree,
        })
    }

    fn text_at(&self, i: usize) -> Option<&'s str> {
        self.tokens.get(i).map(|t| &self.src[t.start..t.end])
    }

    fn peek(&self, n: usize) -> Option<&'s str> {
        self.text_at(self.pos + n)
    }

    fn is_ident_at(&self, i: usize) -> bool {
        self.tokens.get(i).is_some_and(|t| t.kind == TokenKind::Ident)
    }

    fn eat(&mut self, punct: &str) -> bool {
        if self.peek(0) == Some(punct) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, punct: &str) -> Result<()> {
        if self.eat(punct) {
            Ok(())
        } else {
            Err(anyhow!("expected `{punct}`, found {:?} in `{}`", self.peek(0), self.src))
        }
    }

    fn ident(&mut self) -> Result<String> {
        if self.is_ident_at(self.pos) {
            self.pos += 1;
            Ok(self.text_at(self.pos - 1).unwrap_or_default().to_string())
        } else {
            Err(anyhow!("expected identifier, found {:?} in `{}`", self.peek(0), self.src))
        }
    }

    fn span(&self, from: usize, to: usize) -> &'s str {
        if from >= to {
            return "";
        }
        &self.src[self.tokens[from].start..self.tokens[to - 1].end]
    }

    pub(crate) fn finish(&self) -> Result<()> {
        match self.peek(0) {
            None => Ok(()),
            Some(rest) => bail!("unexpected `{rest}` in `{}`", self.src),
        }
    }

    fn modifiers(&mut self) -> String {
        let mut mods = Vec::new();
        while let Some(m) = self.peek(0).filter(|m| is_modifier(m)) {
            mods.push(m);
            self.pos += 1;
        }
        mods.join(" ")
    }

    /// `Name(.Name)*[<...>]([])*[...]`
    fn type_text(&mut self) -> Result<String> {
        let start = self.pos;
        self.element_type()?;
        while self.peek(0) == Some("[") && self.peek(1) == Some("]") {
            self.pos += 2;
        }
        self.eat("...");
        Ok(self.span(start, self.pos).to_string())
    }

    /// `Name(.Name)*[<...>]`
    fn element_type(&mut self) -> Result<String> {
        let start = self.pos;
        self.ident()?;
        while self.peek(0) == Some(".") && self.is_ident_at(self.pos + 1) {
            self.pos += 2;
        }
        if self.eat("<") {
            let mut depth = 1;
            while depth > 0 {
                match self.peek(0) {
                    Some("<") => depth += 1,
                    Some(">") => depth -= 1,
                    None => bail!("unbalanced generic type in `{}`", self.src),
                    _ => {}
                }
                self.pos += 1;
            }
        }
        Ok(self.span(start, self.pos).to_string())
    }

    pub(crate) fn class_header(&mut self) -> Result<ClassHeader> {
        let modifiers = self.modifiers();
        if !(self.eat("class") || self.eat("interface")) {
            bail!("expected class header in `{}`", self.src);
        }
        let name = self.ident()?;
        let mut supertypes = Vec::new();
        while self.eat("extends") || self.eat("implements") || self.eat(",") {
            supertypes.push(self.type_text()?);
        }
        Ok(ClassHeader {
            modifiers,
            name,
            supertypes,
        })
    }

    /// Method, constructor or field of class `class_name`
    pub(crate) fn member(&mut self, class_name: &str) -> Result<NodeId> {
        let modifiers = self.modifiers();
        let is_constructor = !class_name.is_empty() && self.peek(0) == Some(class_name) && self.peek(1) == Some("(");
        let return_type = if is_constructor {
            None
        } else {
            Some(self.type_text()?)
        };
        let name = self.ident()?;

        let mods = self.tree.create(NodeKind::Modifiers, &modifiers);
        if let Some(ty) = return_type.as_deref().filter(|_| matches!(self.peek(0), Some("=" | ";"))) {
            let ty = self.tree.create(NodeKind::TypeRef, ty);
            let n = self.tree.create(NodeKind::Name, &name);
            let mut children = vec![mods, ty, n];
            if self.eat("=") {
                children.push(self.expression()?);
            }
            self.expect(";")?;
            return Ok(factory::node(self.tree, NodeKind::Field, "", &children)?);
        }

        self.expect("(")?;
        let params = self.tree.create(NodeKind::ParameterList, "");
        while !self.eat(")") {
            let ty = self.type_text()?;
            let n = self.ident()?;
            let p = factory::parameter(self.tree, &ty, &n)?;
            self.tree.append(params, p)?;
            self.eat(",");
        }
        let throws = self.tree.create(NodeKind::ThrowsList, "");
        if self.eat("throws") {
            loop {
                let ty = self.type_text()?;
                let t = self.tree.create(NodeKind::TypeRef, &ty);
                self.tree.append(throws, t)?;
                if !self.eat(",") {
                    break;
                }
            }
        }
        let body = if self.eat(";") { None } else { Some(self.block()?) };

        let n = self.tree.create(NodeKind::Name, &name);
        let mut children = vec![mods];
        if let Some(ret) = return_type {
            children.push(self.tree.create(NodeKind::TypeRef, &ret));
        }
        children.extend([n, params, throws]);
        children.extend(body);
        let kind = if is_constructor {
            NodeKind::Constructor
        } else {
            NodeKind::Method
        };
        Ok(factory::node(self.tree, kind, "", &children)?)
    }

    pub(crate) fn block(&mut self) -> Result<NodeId> {
        self.expect("{")?;
        let mut statements = Vec::new();
        while !self.eat("}") {
            if self.peek(0).is_none() {
                bail!("unterminated block in `{}`", self.src);
            }
            statements.push(self.statement()?);
        }
        Ok(factory::block(self.tree, &statements)?)
    }

    pub(crate) fn statement(&mut self) -> Result<NodeId> {
        match self.peek(0) {
            Some("{") => self.block(),
            Some("return") => {
                self.pos += 1;
                if self.eat(";") {
                    return Ok(factory::node(self.tree, NodeKind::Return, "", &[])?);
                }
                let value = self.expression()?;
                self.expect(";")?;
                Ok(factory::return_statement(self.tree, value)?)
            }
            Some("throw") => {
                self.pos += 1;
                let value = self.expression()?;
                self.expect(";")?;
                Ok(factory::node(self.tree, NodeKind::Throw, "", &[value])?)
            }
            Some("try") => self.try_statement(),
            _ if self.is_local_var_start() => {
                let var = self.local_var()?;
                self.expect(";")?;
                Ok(var)
            }
            _ => {
                let value = self.expression()?;
                self.expect(";")?;
                Ok(factory::expr_statement(self.tree, value)?)
            }
        }
    }

    fn is_local_var_start(&mut self) -> bool {
        if self.peek(0).map_or(true, |t| is_keyword(t) || is_constant(t)) {
            return false;
        }
        let saved = self.pos;
        let matched = self.type_text().is_ok()
            && self.is_ident_at(self.pos)
            && matches!(self.peek(1), Some("=" | ";"));
        self.pos = saved;
        matched
    }

    fn local_var(&mut self) -> Result<NodeId> {
        let ty = self.type_text()?;
        let name = self.ident()?;
        let init = if self.eat("=") {
            Some(self.expression()?)
        } else {
            None
        };
        Ok(factory::local_var(self.tree, &ty, &name, init)?)
    }

    fn try_statement(&mut self) -> Result<NodeId> {
        self.expect("try")?;
        let mut children = Vec::new();
        if self.eat("(") {
            let resources = self.tree.create(NodeKind::ResourceList, "");
            while !self.eat(")") {
                let var = self.local_var()?;
                self.tree.append(resources, var)?;
                self.eat(";");
            }
            children.push(resources);
        }
        children.push(self.block()?);
        while self.eat("catch") {
            self.expect("(")?;
            let ty = self.type_text()?;
            let name = self.ident()?;
            self.expect(")")?;
            let param = factory::parameter(self.tree, &ty, &name)?;
            let body = self.block()?;
            children.push(factory::node(self.tree, NodeKind::Catch, "", &[param, body])?);
        }
        if self.eat("finally") {
            let body = self.block()?;
            children.push(factory::node(self.tree, NodeKind::Finally, "", &[body])?);
        }
        Ok(factory::node(self.tree, NodeKind::Try, "", &children)?)
    }

    /// Expression up to the next top-level `;`, `,` or closing bracket
    pub(crate) fn expression(&mut self) -> Result<NodeId> {
        let start = self.pos;
        let mut depth = 0usize;
        let mut end = start;
        while let Some(t) = self.text_at(end) {
            match t {
                "(" | "[" | "{" => depth += 1,
                ")" | "]" | "}" if depth == 0 => break,
                ")" | "]" | "}" => depth -= 1,
                ";" | "," if depth == 0 => break,
                _ => {}
            }
            end += 1;
        }
        let node = self.expr_range(start, end)?;
        self.pos = end;
        Ok(node)
    }

    fn matching(&self, open: usize) -> Result<usize> {
        let mut depth = 0usize;
        for i in open..self.tokens.len() {
            match self.text_at(i) {
                Some("(" | "[" | "{") => depth += 1,
                Some(")" | "]" | "}") => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(i);
                    }
                }
                _ => {}
            }
        }
        bail!("unbalanced brackets in `{}`", self.src)
    }

    /// Comma separated sub-ranges at depth zero
    fn split(&self, start: usize, end: usize) -> Vec<(usize, usize)> {
        let mut out = Vec::new();
        if start >= end {
            return out;
        }
        let mut depth = 0usize;
        let mut from = start;
        for i in start..end {
            match self.text_at(i) {
                Some("(" | "[" | "{") => depth += 1,
                Some(")" | "]" | "}") => depth = depth.saturating_sub(1),
                Some(",") if depth == 0 => {
                    out.push((from, i));
                    from = i + 1;
                }
                _ => {}
            }
        }
        out.push((from, end));
        out
    }

    fn list(&mut self, kind: NodeKind, start: usize, end: usize) -> Result<NodeId> {
        let mut items = Vec::new();
        for (from, to) in self.split(start, end) {
            items.push(self.expr_range(from, to)?);
        }
        Ok(factory::node(self.tree, kind, "", &items)?)
    }

    fn expr_range(&mut self, start: usize, end: usize) -> Result<NodeId> {
        if start >= end {
            bail!("empty expression in `{}`", self.src);
        }
        if let Some(lambda) = self.lambda(start, end)? {
            return Ok(lambda);
        }

        let mut depth = 0usize;
        let assign = (start..end).find(|i| {
            match self.text_at(*i) {
                Some("(" | "[" | "{") => depth += 1,
                Some(")" | "]" | "}") => depth = depth.saturating_sub(1),
                Some("=") => return depth == 0,
                _ => {}
            }
            false
        });
        if let Some(k) = assign.filter(|k| *k > start) {
            let target = self.expr_range(start, k)?;
            let value = self.expr_range(k + 1, end)?;
            return Ok(factory::node(self.tree, NodeKind::Assignment, "", &[target, value])?);
        }

        match self.primary(start, end)? {
            Some(node) => Ok(node),
            None => Ok(factory::expression(self.tree, self.span(start, end))),
        }
    }

    fn lambda(&mut self, start: usize, end: usize) -> Result<Option<NodeId>> {
        let (params_range, arrow) = if self.is_ident_at(start) && self.text_at(start + 1) == Some("->") {
            ((start, start + 1), start + 1)
        } else if self.text_at(start) == Some("(") {
            let close = self.matching(start)?;
            if self.text_at(close + 1) != Some("->") {
                return Ok(None);
            }
            ((start + 1, close), close + 1)
        } else {
            return Ok(None);
        };

        let params = self.tree.create(NodeKind::ParameterList, "");
        for (from, to) in self.split(params_range.0, params_range.1) {
            let name = self.span(to - 1, to).to_string();
            let ty = self.span(from, to - 1).to_string();
            let p = factory::parameter(self.tree, &ty, &name)?;
            self.tree.append(params, p)?;
        }

        let body = if self.text_at(arrow + 1) == Some("{") {
            let saved = self.pos;
            self.pos = arrow + 1;
            let block = self.block()?;
            self.pos = saved;
            block
        } else {
            self.expr_range(arrow + 1, end)?
        };
        Ok(Some(factory::node(self.tree, NodeKind::Lambda, "", &[params, body])?))
    }

    fn primary(&mut self, start: usize, end: usize) -> Result<Option<NodeId>> {
        let mut i = start;
        let first = self.text_at(i).unwrap_or_default();
        let mut current = if first == "new" {
            let saved = self.pos;
            self.pos = i + 1;
            let ty = self.element_type();
            i = self.pos;
            self.pos = saved;
            let ty = ty?;
            match self.text_at(i) {
                Some("[") => {
                    let mut dims = 0;
                    while self.text_at(i) == Some("[") && self.text_at(i + 1) == Some("]") {
                        i += 2;
                        dims += 1;
                    }
                    if self.text_at(i) != Some("{") || dims == 0 {
                        return Ok(None);
                    }
                    let close = self.matching(i)?;
                    let init = self.list(NodeKind::ArrayInit, i + 1, close)?;
                    let array_type = format!("{ty}{}", "[]".repeat(dims));
                    let type_ref = self.tree.create(NodeKind::TypeRef, &array_type);
                    i = close + 1;
                    factory::node(self.tree, NodeKind::NewArray, "", &[type_ref, init])?
                }
                Some("(") => {
                    let close = self.matching(i)?;
                    let args = self.list(NodeKind::ArgumentList, i + 1, close)?;
                    let type_ref = self.tree.create(NodeKind::TypeRef, &ty);
                    let creation = factory::node(self.tree, NodeKind::New, "", &[type_ref, args])?;
                    i = close + 1;
                    if i < end && self.text_at(i) == Some("{") {
                        let close = self.matching(i)?;
                        let class = self.anonymous_class(i + 1, close)?;
                        self.tree.append(creation, class)?;
                        i = close + 1;
                    }
                    creation
                }
                _ => return Ok(None),
            }
        } else if self.is_ident_at(i) && !is_keyword(first) && self.text_at(i + 1) == Some("(") {
            let close = self.matching(i + 1)?;
            let callee = factory::reference(self.tree, None, first)?;
            let args = self.list(NodeKind::ArgumentList, i + 2, close)?;
            i = close + 1;
            factory::node(self.tree, NodeKind::Call, "", &[callee, args])?
        } else if is_constant(first) {
            i += 1;
            factory::expression(self.tree, first)
        } else if self.is_ident_at(i) && !is_keyword(first) {
            i += 1;
            factory::reference(self.tree, None, first)?
        } else if self.tokens[i].kind == TokenKind::Literal {
            i += 1;
            factory::expression(self.tree, first)
        } else {
            return Ok(None);
        };

        while i < end {
            match self.text_at(i) {
                Some(".") if self.is_ident_at(i + 1) => {
                    let name = self.text_at(i + 1).unwrap_or_default();
                    if i + 2 < end && self.text_at(i + 2) == Some("(") {
                        let close = self.matching(i + 2)?;
                        let callee = factory::reference(self.tree, Some(current), name)?;
                        let args = self.list(NodeKind::ArgumentList, i + 3, close)?;
                        current = factory::node(self.tree, NodeKind::Call, "", &[callee, args])?;
                        i = close + 1;
                    } else {
                        current = factory::reference(self.tree, Some(current), name)?;
                        i += 2;
                    }
                }
                Some("::") if self.is_ident_at(i + 1) => {
                    let text = format!("{}::{}", self.span(start, i), self.text_at(i + 1).unwrap_or_default());
                    current = self.tree.create(NodeKind::MethodRef, &text);
                    i += 2;
                }
                _ => break,
            }
        }
        Ok((i == end).then_some(current))
    }

    fn anonymous_class(&mut self, start: usize, end: usize) -> Result<NodeId> {
        let mods = self.tree.create(NodeKind::Modifiers, "");
        let class = factory::node(self.tree, NodeKind::Class, "", &[mods])?;
        let saved = self.pos;
        self.pos = start;
        while self.pos < end {
            let member = self.member("")?;
            self.tree.append(class, member)?;
        }
        self.pos = saved;
        Ok(class)
    }
}
