//! Statement builders for the IR.

use crate::{Class, Enum, Function, Node, NodeKind};
use serde::{Deserialize, Serialize};

/// Declaration keyword of a variable declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VariableKind {
    Const,
    Let,
}

/// Kind of a class method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MethodKind {
    Constructor,
    Method,
    Get,
    Set,
}

// Builder methods for statements
impl Node {
    pub fn expr_stmt(expr: Node) -> Self {
        let position = expr.position.clone();
        Node::new(NodeKind::ExpressionStatement(Box::new(expr))).at(position)
    }

    pub fn block(stmts: Vec<Node>) -> Self {
        Node::new(NodeKind::Block(stmts))
    }

    pub fn declare(kind: VariableKind, id: Node, init: Option<Node>) -> Self {
        let position = id.position.clone();
        let declarator = Node::new(NodeKind::VariableDeclarator {
            id: Box::new(id),
            init: init.map(Box::new),
        })
        .at(position);
        Node::new(NodeKind::VariableDeclaration {
            kind,
            declarations: vec![declarator],
        })
    }

    pub fn const_decl(id: Node, init: Node) -> Self {
        Node::declare(VariableKind::Const, id, Some(init))
    }

    pub fn let_decl(id: Node, init: Option<Node>) -> Self {
        Node::declare(VariableKind::Let, id, init)
    }

    pub fn function_decl(f: Function) -> Self {
        Node::new(NodeKind::FunctionDeclaration(Box::new(f)))
    }

    pub fn return_stmt(argument: Option<Node>) -> Self {
        Node::new(NodeKind::Return(argument.map(Box::new)))
    }

    pub fn if_stmt(test: Node, consequent: Node, alternate: Option<Node>) -> Self {
        Node::new(NodeKind::If {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: alternate.map(Box::new),
        })
    }

    pub fn throw_stmt(argument: Node) -> Self {
        Node::new(NodeKind::Throw(Box::new(argument)))
    }

    pub fn try_stmt(block: Node, handler: Option<Node>, finalizer: Option<Node>) -> Self {
        Node::new(NodeKind::Try {
            block: Box::new(block),
            handler: handler.map(Box::new),
            finalizer: finalizer.map(Box::new),
        })
    }

    pub fn catch_clause(param: Option<Node>, body: Node) -> Self {
        Node::new(NodeKind::CatchClause {
            param: param.map(Box::new),
            body: Box::new(body),
        })
    }

    pub fn while_loop(test: Node, body: Node) -> Self {
        Node::new(NodeKind::While {
            test: Box::new(test),
            body: Box::new(body),
        })
    }

    pub fn for_loop(init: Option<Node>, test: Option<Node>, update: Option<Node>, body: Node) -> Self {
        Node::new(NodeKind::For {
            init: init.map(Box::new),
            test: test.map(Box::new),
            update: update.map(Box::new),
            body: Box::new(body),
        })
    }

    pub fn for_of(left: Node, right: Node, body: Node, is_await: bool) -> Self {
        Node::new(NodeKind::ForOf {
            left: Box::new(left),
            right: Box::new(right),
            body: Box::new(body),
            is_await,
        })
    }

    pub fn for_in(left: Node, right: Node, body: Node) -> Self {
        Node::new(NodeKind::ForIn {
            left: Box::new(left),
            right: Box::new(right),
            body: Box::new(body),
        })
    }

    pub fn break_stmt(label: Option<String>) -> Self {
        Node::new(NodeKind::Break(label))
    }

    pub fn continue_stmt(label: Option<String>) -> Self {
        Node::new(NodeKind::Continue(label))
    }

    pub fn labeled(label: impl Into<String>, body: Node) -> Self {
        Node::new(NodeKind::Labeled {
            label: label.into(),
            body: Box::new(body),
        })
    }

    pub fn switch_stmt(discriminant: Node, cases: Vec<Node>) -> Self {
        Node::new(NodeKind::Switch {
            discriminant: Box::new(discriminant),
            cases,
        })
    }

    pub fn switch_case(test: Option<Node>, consequent: Vec<Node>) -> Self {
        Node::new(NodeKind::SwitchCase {
            test: test.map(Box::new),
            consequent,
        })
    }

    pub fn class_decl(class: Class) -> Self {
        Node::new(NodeKind::ClassDeclaration(Box::new(class)))
    }

    pub fn enum_decl(e: Enum) -> Self {
        Node::new(NodeKind::EnumDeclaration(Box::new(e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Position;

    #[test]
    fn test_declaration_inherits_id_position() {
        let id = Node::ident("x").at(Some(Position::new(3, 5)));
        let decl = Node::const_decl(id, Node::number(1));
        match &decl.kind {
            NodeKind::VariableDeclaration { kind, declarations } => {
                assert_eq!(*kind, VariableKind::Const);
                assert_eq!(declarations[0].position, Some(Position::new(3, 5)));
            }
            _ => panic!("expected VariableDeclaration"),
        }
    }

    #[test]
    fn test_statement_classification() {
        assert!(Node::return_stmt(None).is_statement());
        assert!(Node::return_stmt(None).is_terminator());
        assert!(!Node::number(1).is_statement());
        assert!(!Node::iife(vec![]).is_statement());
    }
}
