//! The IR node and its discriminants.

use crate::{
    BinaryOp, Class, Enum, Function, InterfaceMember, Literal, LogicalOp, MethodKind,
    Position, TypeNode, UnaryOp, VariableKind,
};
use serde::{Deserialize, Serialize};

/// An IR node: a discriminant plus the position it inherited from the
/// source node it was derived from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

/// Every shape the lowering core can produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    // ----- expressions -----
    /// Variable reference, optionally annotated with a type.
    Identifier {
        name: String,
        type_annotation: Option<TypeNode>,
    },

    /// Literal value.
    Literal(Literal),

    /// Template literal: `quasis[0] ${expressions[0]} quasis[1] ...`.
    /// Always holds one more quasi than expressions.
    TemplateLiteral {
        quasis: Vec<String>,
        expressions: Vec<Node>,
    },

    /// Array literal: `[a, b, ...c]`.
    Array(Vec<Node>),

    /// Object literal; entries are `Property` or `Spread` nodes.
    Object(Vec<Node>),

    /// Object literal entry or object pattern entry.
    Property {
        key: Box<Node>,
        value: Box<Node>,
        computed: bool,
        shorthand: bool,
    },

    /// Spread element: `...argument`.
    Spread(Box<Node>),

    /// Function call: `callee(arguments...)`.
    Call {
        callee: Box<Node>,
        arguments: Vec<Node>,
        optional: bool,
    },

    /// Constructor call: `new callee(arguments...)`.
    New {
        callee: Box<Node>,
        arguments: Vec<Node>,
    },

    /// Member access: `object.property` or `object[property]`.
    Member {
        object: Box<Node>,
        property: Box<Node>,
        computed: bool,
    },

    /// Member access inside an optional chain: `object?.property`.
    OptionalMember {
        object: Box<Node>,
        property: Box<Node>,
        computed: bool,
        optional: bool,
    },

    /// Binary operation: `left op right`.
    Binary {
        operator: BinaryOp,
        left: Box<Node>,
        right: Box<Node>,
    },

    /// Short-circuiting operation: `&&`, `||`, `??`.
    Logical {
        operator: LogicalOp,
        left: Box<Node>,
        right: Box<Node>,
    },

    /// Unary operation: `op argument`.
    Unary {
        operator: UnaryOp,
        argument: Box<Node>,
    },

    /// Ternary: `test ? consequent : alternate`.
    Conditional {
        test: Box<Node>,
        consequent: Box<Node>,
        alternate: Box<Node>,
    },

    /// Assignment: `target = value`.
    Assignment {
        target: Box<Node>,
        value: Box<Node>,
    },

    /// Function or arrow function expression.
    Function(Box<Function>),

    /// `await argument`.
    Await(Box<Node>),

    /// `yield argument` / `yield* argument`.
    Yield {
        argument: Option<Box<Node>>,
        delegate: bool,
    },

    /// `this`.
    This,

    /// Type assertion: `expression as ty`.
    As {
        expression: Box<Node>,
        ty: TypeNode,
    },

    /// Dynamic import: `import(source)`.
    ImportExpression(Box<Node>),

    // ----- patterns -----
    /// `[a, , b, ...rest]`; `None` marks a skipped slot.
    ArrayPattern(Vec<Option<Node>>),

    /// `{ a, b: c, ...rest }`; entries are `Property` or `RestElement`.
    ObjectPattern(Vec<Node>),

    /// Pattern with a default: `target = default`.
    AssignmentPattern {
        target: Box<Node>,
        default: Box<Node>,
    },

    /// `...argument` in binding position.
    RestElement(Box<Node>),

    // ----- statements -----
    ExpressionStatement(Box<Node>),

    Block(Vec<Node>),

    /// `const`/`let` declaration with one or more declarators.
    VariableDeclaration {
        kind: VariableKind,
        declarations: Vec<Node>,
    },

    /// `id = init` inside a variable declaration.
    VariableDeclarator {
        id: Box<Node>,
        init: Option<Box<Node>>,
    },

    FunctionDeclaration(Box<Function>),

    Return(Option<Box<Node>>),

    If {
        test: Box<Node>,
        consequent: Box<Node>,
        alternate: Option<Box<Node>>,
    },

    Throw(Box<Node>),

    Try {
        block: Box<Node>,
        handler: Option<Box<Node>>,
        finalizer: Option<Box<Node>>,
    },

    CatchClause {
        param: Option<Box<Node>>,
        body: Box<Node>,
    },

    While {
        test: Box<Node>,
        body: Box<Node>,
    },

    For {
        init: Option<Box<Node>>,
        test: Option<Box<Node>>,
        update: Option<Box<Node>>,
        body: Box<Node>,
    },

    ForOf {
        left: Box<Node>,
        right: Box<Node>,
        body: Box<Node>,
        is_await: bool,
    },

    ForIn {
        left: Box<Node>,
        right: Box<Node>,
        body: Box<Node>,
    },

    Break(Option<String>),

    Continue(Option<String>),

    Labeled {
        label: String,
        body: Box<Node>,
    },

    Switch {
        discriminant: Box<Node>,
        cases: Vec<Node>,
    },

    /// `case test:` or `default:` when `test` is `None`.
    SwitchCase {
        test: Option<Box<Node>>,
        consequent: Vec<Node>,
    },

    ClassDeclaration(Box<Class>),

    /// Method inside a class body.
    MethodDefinition {
        key: String,
        function: Box<Function>,
        kind: MethodKind,
        is_static: bool,
    },

    /// Field inside a class body.
    PropertyDefinition {
        key: String,
        value: Option<Box<Node>>,
        is_static: bool,
        readonly: bool,
    },

    EnumDeclaration(Box<Enum>),

    /// `import { ... } from "source"`; empty specifiers is a side-effect import.
    ImportDeclaration {
        specifiers: Vec<Node>,
        source: String,
        /// `source` joined onto the importing file's directory, for
        /// relative specifiers.
        resolved: Option<String>,
    },

    /// `imported as local`.
    ImportSpecifier { imported: String, local: String },

    /// `* as local`.
    ImportNamespaceSpecifier(String),

    /// `export { ... }` or `export <declaration>`.
    ExportNamed {
        declaration: Option<Box<Node>>,
        specifiers: Vec<Node>,
    },

    /// `local as exported`.
    ExportSpecifier { local: String, exported: String },

    ExportDefault(Box<Node>),

    TypeAlias {
        name: String,
        type_params: Vec<String>,
        ty: TypeNode,
    },

    Interface {
        name: String,
        type_params: Vec<String>,
        extends: Vec<TypeNode>,
        members: Vec<InterfaceMember>,
    },
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            position: None,
        }
    }

    /// Attach a position, replacing any existing one.
    pub fn at(mut self, position: Option<Position>) -> Self {
        self.position = position;
        self
    }

    /// Attach a position only if the node has none yet.
    pub fn or_at(mut self, position: Option<&Position>) -> Self {
        if self.position.is_none() {
            self.position = position.cloned();
        }
        self
    }

    /// Returns true for nodes that can only appear in statement position.
    pub fn is_statement(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::ExpressionStatement(_)
                | NodeKind::Block(_)
                | NodeKind::VariableDeclaration { .. }
                | NodeKind::FunctionDeclaration(_)
                | NodeKind::Return(_)
                | NodeKind::If { .. }
                | NodeKind::Throw(_)
                | NodeKind::Try { .. }
                | NodeKind::While { .. }
                | NodeKind::For { .. }
                | NodeKind::ForOf { .. }
                | NodeKind::ForIn { .. }
                | NodeKind::Break(_)
                | NodeKind::Continue(_)
                | NodeKind::Labeled { .. }
                | NodeKind::Switch { .. }
                | NodeKind::ClassDeclaration(_)
                | NodeKind::EnumDeclaration(_)
                | NodeKind::ImportDeclaration { .. }
                | NodeKind::ExportNamed { .. }
                | NodeKind::ExportDefault(_)
                | NodeKind::TypeAlias { .. }
                | NodeKind::Interface { .. }
        )
    }

    /// Returns true for statements after which control never falls through.
    pub fn is_terminator(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::Return(_) | NodeKind::Throw(_) | NodeKind::Break(_) | NodeKind::Continue(_)
        )
    }

    /// The bound name of a declaration, if it has one.
    pub fn declared_name(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::FunctionDeclaration(f) => f.id.as_deref(),
            NodeKind::ClassDeclaration(c) => Some(&c.name),
            NodeKind::EnumDeclaration(e) => Some(&e.name),
            _ => None,
        }
    }

    /// The identifier name if this node is a plain identifier.
    pub fn as_identifier(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Identifier { name, .. } => Some(name),
            _ => None,
        }
    }
}
