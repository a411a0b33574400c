//! Core traversal: symbols, literals, list dispatch and the rules for moving
//! between statement and expression position.

use crate::context::{LoweringContext, Suspension};
use crate::error::{codes, Result, SprigError};
use crate::forms::{Form, SpecialForm};
use crate::symbols::{is_chain, keyword_name, sanitize, sanitize_property, split_chain};
use rhizome_sprig_ir::{Function, LogicalOp, Node, NodeKind, Position, Program};
use rhizome_sprig_sexpr::{SExp, SExpKind};
use tracing::{debug, trace};

impl LoweringContext {
    /// Lower a whole unit. Forms that lower to nothing (macro definitions)
    /// leave a `null;` placeholder so statement indices line up with the
    /// source forms.
    pub fn lower_program(&mut self, forms: &[SExp]) -> Result<Program> {
        debug!(forms = forms.len(), dir = %self.context_dir().display(), "lowering unit");
        let mut body = Vec::with_capacity(forms.len());
        for form in forms {
            let node = match self.lower(form)? {
                Some(node) => statement(node),
                None => Node::expr_stmt(Node::null().at(form.position.clone())),
            };
            body.push(node);
        }
        debug!(statements = body.len(), functions = self.registry().len(), "lowered unit");
        Ok(Program::new(body))
    }

    /// Lower one AST node. `None` means the form was recognised and
    /// intentionally dropped.
    pub fn lower(&mut self, node: &SExp) -> Result<Option<Node>> {
        match &node.kind {
            SExpKind::Literal(lit) => Ok(Some(Node::literal(lit.clone()).at(node.position.clone()))),
            SExpKind::Symbol(name) => self.lower_symbol(name, node.position.as_ref()).map(Some),
            SExpKind::List(items) => self.lower_list(node, items),
        }
    }

    /// Lower a node in value position. Statements are wrapped so they
    /// produce a value; dropped forms become `null`.
    pub(crate) fn lower_expr(&mut self, node: &SExp) -> Result<Node> {
        let (lowered, suspension) = match node.kind {
            SExpKind::List(_) => self.in_expression(|ctx| ctx.lower(node))?,
            _ => (self.lower(node)?, Suspension::default()),
        };
        Ok(match lowered {
            Some(lowered) => as_expression(lowered, suspension),
            None => Node::null().at(node.position.clone()),
        })
    }

    pub(crate) fn lower_exprs(&mut self, nodes: &[SExp]) -> Result<Vec<Node>> {
        nodes.iter().map(|node| self.lower_expr(node)).collect()
    }

    /// Lower a node in statement position.
    pub(crate) fn lower_stmt(&mut self, node: &SExp) -> Result<Option<Node>> {
        Ok(self.lower(node)?.map(statement))
    }

    pub(crate) fn lower_body(&mut self, forms: &[SExp]) -> Result<Vec<Node>> {
        let mut body = Vec::with_capacity(forms.len());
        for form in forms {
            if let Some(stmt) = self.lower_stmt(form)? {
                body.push(stmt);
            }
        }
        Ok(body)
    }

    /// Lower a function body whose last form is the return value.
    pub(crate) fn lower_returning_body(&mut self, forms: &[SExp]) -> Result<Vec<Node>> {
        Ok(returning_all(self.lower_body(forms)?))
    }

    /// Wrap a body that used the throw-based return:
    ///
    /// ```text
    /// try { body } catch (e) { if (e && e[key]) return e.value; throw e; }
    /// ```
    pub(crate) fn catch_early_return(&self, body: Vec<Node>, position: Option<&Position>) -> Vec<Node> {
        let caught = || Node::ident("__sprig_escape").or_at(position);
        let key = Node::string(self.options.early_return_key.clone()).or_at(position);
        let marked = Node::logical(
            LogicalOp::And,
            caught(),
            Node::index(caught(), key).or_at(position),
        )
        .or_at(position);
        let value = Node::member(caught(), "value").or_at(position);
        let handler = Node::catch_clause(
            Some(caught()),
            Node::block(vec![
                Node::if_stmt(marked, Node::return_stmt(Some(value)).or_at(position), None)
                    .or_at(position),
                Node::throw_stmt(caught()).or_at(position),
            ])
            .or_at(position),
        )
        .or_at(position);
        let block = Node::block(body).or_at(position);
        vec![Node::try_stmt(block, Some(handler), None).or_at(position)]
    }

    pub(crate) fn lower_symbol(&mut self, name: &str, position: Option<&Position>) -> Result<Node> {
        let node = match name {
            "true" => Node::bool(true),
            "false" => Node::bool(false),
            "null" | "nil" => Node::null(),
            "undefined" => Node::undefined(),
            "this" => Node::this(),
            _ => {
                if let Some(foreign) = name.strip_prefix("js/") {
                    foreign_reference(foreign, position)?
                } else if let Some(keyword) = keyword_name(name) {
                    Node::string(keyword)
                } else if let Some(target) = name.strip_prefix("...").filter(|t| !t.is_empty()) {
                    Node::spread(self.lower_symbol(target, position)?)
                } else if is_chain(name) {
                    member_chain(name, position)?
                } else {
                    Node::ident(sanitize(name))
                }
            }
        };
        Ok(node.or_at(position))
    }

    fn lower_list(&mut self, node: &SExp, items: &[SExp]) -> Result<Option<Node>> {
        let position = node.position.as_ref();
        let Some(head) = items.first() else {
            return Ok(Some(Node::array(Vec::new()).at(node.position.clone())));
        };

        match &head.kind {
            SExpKind::Symbol(name) => {
                if let Some(special) = SpecialForm::from_name(name) {
                    trace!(form = %name, "special form");
                    let form = Form {
                        node,
                        name,
                        args: &items[1..],
                    };
                    return self
                        .lower_special(special, &form)
                        .map(|lowered| lowered.map(|n| n.or_at(position)))
                        .map_err(|e| e.in_form(name, position));
                }
                trace!(callee = %name, "call");
                self.lower_named_call(node, name, items)
                    .map(|n| Some(n.or_at(position)))
                    .map_err(|e| e.in_form(name, position))
            }
            SExpKind::Literal(_) => Err(SprigError::transform(format!(
                "Cannot call literal {} in {}",
                head, node
            ))
            .with_code(codes::NOT_CALLABLE)
            .at(head.position.clone().or_else(|| node.position.clone()))),
            SExpKind::List(_) => self.lower_applied(node, items).map(Some),
        }
    }
}

/// Put a lowered node in statement position.
pub(crate) fn statement(node: Node) -> Node {
    if node.is_statement() {
        node
    } else {
        let position = node.position.clone();
        Node::expr_stmt(node).at(position)
    }
}

/// Put a lowered node in value position. Statements become an immediately
/// invoked wrapper whose last statement returns the value; `suspension`
/// says what the statement contains.
pub(crate) fn as_expression(node: Node, suspension: Suspension) -> Node {
    if !node.is_statement() {
        return node;
    }
    let position = node.position.clone();
    match node.kind {
        NodeKind::ExpressionStatement(expr) => *expr,
        NodeKind::FunctionDeclaration(function) => Node::function_expr(*function).at(position),
        kind => {
            let body = returning(Node::new(kind).at(position.clone()));
            iife(body, suspension, position.as_ref())
        }
    }
}

/// Invoke `body` in place.
///
/// ```text
/// (() => { body })()
/// await (async () => { body })()          body awaits
/// yield* (function* () { body }).call(this)   body yields
/// ```
///
/// A generator cannot be an arrow, so the `this` of the enclosing function
/// is passed through explicitly.
pub(crate) fn iife(body: Vec<Node>, suspension: Suspension, position: Option<&Position>) -> Node {
    if suspension.yields {
        let generator = Function {
            is_generator: true,
            is_async: suspension.awaits,
            ..Function::anonymous(Vec::new(), body)
        };
        let callee = Node::member(Node::function_expr(generator).or_at(position), "call").or_at(position);
        let call = Node::call(callee, vec![Node::this().or_at(position)]).or_at(position);
        return Node::yield_expr(Some(call), true).or_at(position);
    }
    let arrow = Function {
        is_async: suspension.awaits,
        ..Function::arrow(Vec::new(), body)
    };
    let call = Node::call(Node::function_expr(arrow).or_at(position), Vec::new()).or_at(position);
    if suspension.awaits {
        Node::await_expr(call).or_at(position)
    } else {
        call
    }
}

/// Rewrite the last statement of a body so it returns its value.
pub(crate) fn returning_all(mut body: Vec<Node>) -> Vec<Node> {
    match body.pop() {
        Some(last) => {
            body.extend(returning(last));
            body
        }
        None => body,
    }
}

/// Make a statement produce its value through `return`.
pub(crate) fn returning(node: Node) -> Vec<Node> {
    let position = node.position.clone();
    let is_statement = node.is_statement();
    match node.kind {
        NodeKind::ExpressionStatement(expr) => {
            vec![Node::return_stmt(Some(*expr)).at(position)]
        }
        NodeKind::Block(stmts) => vec![Node::block(returning_all(stmts)).at(position)],
        NodeKind::If {
            test,
            consequent,
            alternate,
        } => vec![Node::if_stmt(
            *test,
            returning_branch(*consequent),
            alternate.map(|alt| returning_branch(*alt)),
        )
        .at(position)],
        NodeKind::Try {
            block,
            handler,
            finalizer,
        } => {
            let handler = handler.map(|h| {
                let handler_position = h.position.clone();
                match h.kind {
                    NodeKind::CatchClause { param, body } => Node::new(NodeKind::CatchClause {
                        param,
                        body: Box::new(returning_branch(*body)),
                    })
                    .at(handler_position),
                    kind => Node::new(kind).at(handler_position),
                }
            });
            vec![Node::new(NodeKind::Try {
                block: Box::new(returning_branch(*block)),
                handler: handler.map(Box::new),
                finalizer,
            })
            .at(position)]
        }
        kind @ (NodeKind::FunctionDeclaration(_)
        | NodeKind::ClassDeclaration(_)
        | NodeKind::EnumDeclaration(_)) => {
            let node = Node::new(kind).at(position.clone());
            let name = node.declared_name().map(str::to_string);
            match name {
                Some(name) => vec![
                    node,
                    Node::return_stmt(Some(Node::ident(name).at(position.clone()))).at(position),
                ],
                None => vec![node],
            }
        }
        NodeKind::VariableDeclaration { kind, declarations } => {
            let bound = match declarations.as_slice() {
                [only] => match &only.kind {
                    NodeKind::VariableDeclarator { id, .. } => {
                        id.as_identifier().map(str::to_string)
                    }
                    _ => None,
                },
                _ => None,
            };
            let decl = Node::new(NodeKind::VariableDeclaration { kind, declarations })
                .at(position.clone());
            match bound {
                Some(name) => vec![
                    decl,
                    Node::return_stmt(Some(Node::ident(name).at(position.clone()))).at(position),
                ],
                None => vec![decl],
            }
        }
        kind if is_statement => vec![Node::new(kind).at(position)],
        kind => vec![Node::return_stmt(Some(Node::new(kind).at(position.clone()))).at(position)],
    }
}

fn returning_branch(node: Node) -> Node {
    let position = node.position.clone();
    let mut stmts = returning(node);
    if stmts.len() == 1 {
        stmts.remove(0)
    } else {
        Node::block(stmts).at(position)
    }
}

/// `a.b?.c` to a left-associative member chain.
fn member_chain(name: &str, position: Option<&Position>) -> Result<Node> {
    let segments = split_chain(name).ok_or_else(|| {
        SprigError::validation(format!("Invalid member access '{}'", name)).at(position.cloned())
    })?;

    let mut segments = segments.into_iter();
    let mut chain = match segments.next() {
        Some(first) if first.name == "this" => Node::this(),
        Some(first) => Node::ident(sanitize(first.name)),
        None => return Err(SprigError::validation(format!("Invalid member access '{}'", name))),
    }
    .or_at(position);

    for segment in segments {
        chain = if segment.name.chars().all(|c| c.is_ascii_digit()) {
            let index: f64 = segment.name.parse().map_err(|_| {
                SprigError::validation(format!("Invalid index '{}' in '{}'", segment.name, name))
            })?;
            Node::index(chain, Node::number(index).or_at(position))
        } else if segment.optional {
            Node::optional_member(chain, sanitize_property(segment.name), true)
        } else {
            Node::member(chain, sanitize_property(segment.name))
        }
        .or_at(position);
    }
    Ok(chain)
}

/// `js/console.log` keeps its names exactly as written.
fn foreign_reference(name: &str, position: Option<&Position>) -> Result<Node> {
    let mut parts = name.split('.');
    let mut node = match parts.next() {
        Some(first) if !first.is_empty() => Node::ident(first),
        _ => {
            return Err(SprigError::validation(format!("Invalid foreign reference 'js/{}'", name))
                .at(position.cloned()))
        }
    };
    for part in parts {
        if part.is_empty() {
            return Err(SprigError::validation(format!("Invalid foreign reference 'js/{}'", name))
                .at(position.cloned()));
        }
        node = Node::member(node.or_at(position), part);
    }
    Ok(node.or_at(position))
}

/// Build a function node for a body that may contain a `return`.
pub(crate) fn function_node(function: Function, declaration: bool, position: Option<Position>) -> Node {
    if declaration && function.id.is_some() {
        Node::function_decl(function).at(position)
    } else {
        Node::function_expr(function).at(position)
    }
}
