//! Expression and pattern builders for the IR.

use crate::{Function, Node, NodeKind, TypeNode};
use serde::{Deserialize, Serialize};

/// Literal values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,

    // Comparison
    Eq,
    StrictEq,
    Ne,
    StrictNe,
    Lt,
    Le,
    Gt,
    Ge,

    // Relational
    InstanceOf,
    In,
}

impl BinaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => "**",
            BinaryOp::Eq => "==",
            BinaryOp::StrictEq => "===",
            BinaryOp::Ne => "!=",
            BinaryOp::StrictNe => "!==",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::InstanceOf => "instanceof",
            BinaryOp::In => "in",
        }
    }
}

/// Short-circuiting operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogicalOp {
    And,
    Or,
    Nullish,
}

impl LogicalOp {
    pub fn as_str(self) -> &'static str {
        match self {
            LogicalOp::And => "&&",
            LogicalOp::Or => "||",
            LogicalOp::Nullish => "??",
        }
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
    TypeOf,
    Void,
    Delete,
}

impl UnaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Plus => "+",
            UnaryOp::Not => "!",
            UnaryOp::TypeOf => "typeof",
            UnaryOp::Void => "void",
            UnaryOp::Delete => "delete",
        }
    }
}

// Builder methods for expressions
impl Node {
    pub fn null() -> Self {
        Node::new(NodeKind::Literal(Literal::Null))
    }

    pub fn bool(v: bool) -> Self {
        Node::new(NodeKind::Literal(Literal::Bool(v)))
    }

    pub fn number(v: impl Into<f64>) -> Self {
        Node::new(NodeKind::Literal(Literal::Number(v.into())))
    }

    pub fn string(v: impl Into<String>) -> Self {
        Node::new(NodeKind::Literal(Literal::String(v.into())))
    }

    pub fn literal(lit: Literal) -> Self {
        Node::new(NodeKind::Literal(lit))
    }

    pub fn ident(name: impl Into<String>) -> Self {
        Node::new(NodeKind::Identifier {
            name: name.into(),
            type_annotation: None,
        })
    }

    pub fn typed_ident(name: impl Into<String>, ty: Option<TypeNode>) -> Self {
        Node::new(NodeKind::Identifier {
            name: name.into(),
            type_annotation: ty,
        })
    }

    pub fn undefined() -> Self {
        Node::ident("undefined")
    }

    pub fn this() -> Self {
        Node::new(NodeKind::This)
    }

    pub fn binary(operator: BinaryOp, left: Node, right: Node) -> Self {
        Node::new(NodeKind::Binary {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    pub fn logical(operator: LogicalOp, left: Node, right: Node) -> Self {
        Node::new(NodeKind::Logical {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    pub fn unary(operator: UnaryOp, argument: Node) -> Self {
        Node::new(NodeKind::Unary {
            operator,
            argument: Box::new(argument),
        })
    }

    pub fn call(callee: Node, arguments: Vec<Node>) -> Self {
        Node::new(NodeKind::Call {
            callee: Box::new(callee),
            arguments,
            optional: false,
        })
    }

    pub fn new_expr(callee: Node, arguments: Vec<Node>) -> Self {
        Node::new(NodeKind::New {
            callee: Box::new(callee),
            arguments,
        })
    }

    /// `object.property` with a non-computed identifier key.
    pub fn member(object: Node, property: impl Into<String>) -> Self {
        Node::new(NodeKind::Member {
            object: Box::new(object),
            property: Box::new(Node::ident(property)),
            computed: false,
        })
    }

    /// `object[index]`.
    pub fn index(object: Node, index: Node) -> Self {
        Node::new(NodeKind::Member {
            object: Box::new(object),
            property: Box::new(index),
            computed: true,
        })
    }

    pub fn optional_member(object: Node, property: impl Into<String>, optional: bool) -> Self {
        Node::new(NodeKind::OptionalMember {
            object: Box::new(object),
            property: Box::new(Node::ident(property)),
            computed: false,
            optional,
        })
    }

    pub fn array(elements: Vec<Node>) -> Self {
        Node::new(NodeKind::Array(elements))
    }

    pub fn object(properties: Vec<Node>) -> Self {
        Node::new(NodeKind::Object(properties))
    }

    /// Object entry keyed by a plain name.
    pub fn property(key: impl Into<String>, value: Node) -> Self {
        let key = key.into();
        let shorthand = value.as_identifier() == Some(key.as_str());
        Node::new(NodeKind::Property {
            key: Box::new(Node::ident(key)),
            value: Box::new(value),
            computed: false,
            shorthand,
        })
    }

    /// Object entry keyed by an arbitrary expression: `[key]: value`.
    pub fn computed_property(key: Node, value: Node) -> Self {
        Node::new(NodeKind::Property {
            key: Box::new(key),
            value: Box::new(value),
            computed: true,
            shorthand: false,
        })
    }

    pub fn spread(argument: Node) -> Self {
        Node::new(NodeKind::Spread(Box::new(argument)))
    }

    pub fn conditional(test: Node, consequent: Node, alternate: Node) -> Self {
        Node::new(NodeKind::Conditional {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
        })
    }

    pub fn assign(target: Node, value: Node) -> Self {
        Node::new(NodeKind::Assignment {
            target: Box::new(target),
            value: Box::new(value),
        })
    }

    pub fn function_expr(f: Function) -> Self {
        Node::new(NodeKind::Function(Box::new(f)))
    }

    /// `(() => { body })()`.
    pub fn iife(body: Vec<Node>) -> Self {
        Node::call(Node::function_expr(Function::arrow(Vec::new(), body)), Vec::new())
    }

    pub fn await_expr(argument: Node) -> Self {
        Node::new(NodeKind::Await(Box::new(argument)))
    }

    pub fn yield_expr(argument: Option<Node>, delegate: bool) -> Self {
        Node::new(NodeKind::Yield {
            argument: argument.map(Box::new),
            delegate,
        })
    }

    pub fn template(quasis: Vec<String>, expressions: Vec<Node>) -> Self {
        Node::new(NodeKind::TemplateLiteral { quasis, expressions })
    }

    // ----- patterns -----

    pub fn array_pattern(elements: Vec<Option<Node>>) -> Self {
        Node::new(NodeKind::ArrayPattern(elements))
    }

    pub fn object_pattern(properties: Vec<Node>) -> Self {
        Node::new(NodeKind::ObjectPattern(properties))
    }

    pub fn assignment_pattern(target: Node, default: Node) -> Self {
        Node::new(NodeKind::AssignmentPattern {
            target: Box::new(target),
            default: Box::new(default),
        })
    }

    pub fn rest(argument: Node) -> Self {
        Node::new(NodeKind::RestElement(Box::new(argument)))
    }
}
