//! Operator forms.

use super::Form;
use crate::context::{LoweringContext, Suspension};
use crate::error::Result;
use crate::lower::iife;
use rhizome_sprig_ir::{BinaryOp, LogicalOp, Node, NodeKind, UnaryOp, VariableKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Operator {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    /// `== === != !==`: exactly two operands.
    Equality(BinaryOp),
    /// `< > <= >=`: chains pairwise when given more than two operands.
    Compare(BinaryOp),
    And,
    Or,
    Nullish,
    Not,
    TypeOf,
    Void,
    Delete,
    InstanceOf,
    In,
}

impl Operator {
    pub(crate) fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "+" => Self::Add,
            "-" => Self::Sub,
            "*" => Self::Mul,
            "/" => Self::Div,
            "%" => Self::Mod,
            "**" => Self::Pow,
            "==" => Self::Equality(BinaryOp::Eq),
            "===" => Self::Equality(BinaryOp::StrictEq),
            "!=" => Self::Equality(BinaryOp::Ne),
            "!==" => Self::Equality(BinaryOp::StrictNe),
            "<" => Self::Compare(BinaryOp::Lt),
            ">" => Self::Compare(BinaryOp::Gt),
            "<=" => Self::Compare(BinaryOp::Le),
            ">=" => Self::Compare(BinaryOp::Ge),
            "and" | "&&" => Self::And,
            "or" | "||" => Self::Or,
            "??" => Self::Nullish,
            "not" | "!" => Self::Not,
            "typeof" => Self::TypeOf,
            "void" => Self::Void,
            "delete" => Self::Delete,
            "instanceof" => Self::InstanceOf,
            "in" => Self::In,
            _ => return None,
        })
    }
}

impl LoweringContext {
    pub(crate) fn lower_operator(&mut self, form: &Form<'_>, op: Operator) -> Result<Node> {
        match op {
            Operator::Add => match form.args {
                [] => Ok(Node::number(0)),
                [x] => Ok(Node::unary(UnaryOp::Plus, self.lower_expr(x)?)),
                _ => self.fold_binary(form, BinaryOp::Add),
            },
            Operator::Sub => match form.args {
                [x] => Ok(Node::unary(UnaryOp::Neg, self.lower_expr(x)?)),
                _ => {
                    form.at_least(1)?;
                    self.fold_binary(form, BinaryOp::Sub)
                }
            },
            Operator::Mul => match form.args {
                [] => Ok(Node::number(1)),
                [x] => self.lower_expr(x),
                _ => self.fold_binary(form, BinaryOp::Mul),
            },
            Operator::Div | Operator::Mod => {
                form.at_least(2)?;
                let op = if op == Operator::Div { BinaryOp::Div } else { BinaryOp::Mod };
                self.fold_binary(form, op)
            }
            Operator::Pow => {
                form.at_least(2)?;
                // Exponentiation associates to the right.
                let mut operands = self.lower_exprs(form.args)?;
                let mut result = operands.pop().unwrap_or_else(Node::undefined);
                while let Some(left) = operands.pop() {
                    result = Node::binary(BinaryOp::Pow, left, result).or_at(form.pos());
                }
                Ok(result)
            }
            Operator::Equality(op) => self.exact_binary(form, op),
            Operator::InstanceOf => self.exact_binary(form, BinaryOp::InstanceOf),
            Operator::In => self.exact_binary(form, BinaryOp::In),
            Operator::Compare(op) => {
                form.at_least(2)?;
                let (operands, suspension) = self.tracking(|ctx| ctx.lower_exprs(form.args))?;
                Ok(self.compare_chain(form, op, operands, suspension))
            }
            Operator::And => self.fold_logical(form, LogicalOp::And, true),
            Operator::Or => self.fold_logical(form, LogicalOp::Or, false),
            Operator::Nullish => {
                form.at_least(2)?;
                self.fold_logical(form, LogicalOp::Nullish, false)
            }
            Operator::Not => self.unary(form, UnaryOp::Not),
            Operator::TypeOf => self.unary(form, UnaryOp::TypeOf),
            Operator::Void => self.unary(form, UnaryOp::Void),
            Operator::Delete => self.unary(form, UnaryOp::Delete),
        }
    }

    /// `(< a b c)` is `a < b && b < c`. A middle operand that is not a name
    /// or a literal is stored in a temporary where it is first evaluated, so
    /// it runs once and in source order:
    ///
    /// ```text
    /// (< a (next) c)   (() => { let cmp_0; return a < (cmp_0 = next()) && cmp_0 < c; })()
    /// ```
    fn compare_chain(
        &mut self,
        form: &Form<'_>,
        op: BinaryOp,
        operands: Vec<Node>,
        suspension: Suspension,
    ) -> Node {
        let pos = form.pos();
        let count = operands.len();
        let mut operands = operands.into_iter();
        let Some(mut left) = operands.next() else {
            return Node::bool(true).or_at(pos);
        };

        let mut temps = Vec::new();
        let mut chain: Option<Node> = None;
        for (index, operand) in operands.enumerate() {
            let is_last = index + 2 == count;
            let (right, next_left) = if is_last || is_repeatable(&operand) {
                let reference = operand.clone();
                (operand, reference)
            } else {
                let temp = Node::ident(self.gensym("cmp")).or_at(pos);
                temps.push(Node::declare(VariableKind::Let, temp.clone(), None).or_at(pos));
                (Node::assign(temp.clone(), operand).or_at(pos), temp)
            };
            let comparison = Node::binary(op, std::mem::replace(&mut left, next_left), right).or_at(pos);
            chain = Some(match chain {
                Some(acc) => Node::logical(LogicalOp::And, acc, comparison).or_at(pos),
                None => comparison,
            });
        }

        let chain = chain.unwrap_or_else(|| Node::bool(true).or_at(pos));
        if temps.is_empty() {
            return chain;
        }
        temps.push(Node::return_stmt(Some(chain)).or_at(pos));
        iife(temps, suspension, pos)
    }

    fn exact_binary(&mut self, form: &Form<'_>, op: BinaryOp) -> Result<Node> {
        form.exactly(2)?;
        let left = self.lower_expr(&form.args[0])?;
        let right = self.lower_expr(&form.args[1])?;
        Ok(Node::binary(op, left, right))
    }

    fn unary(&mut self, form: &Form<'_>, op: UnaryOp) -> Result<Node> {
        form.exactly(1)?;
        Ok(Node::unary(op, self.lower_expr(&form.args[0])?))
    }

    fn fold_binary(&mut self, form: &Form<'_>, op: BinaryOp) -> Result<Node> {
        let mut operands = self.lower_exprs(form.args)?.into_iter();
        let first = operands.next().unwrap_or_else(Node::undefined);
        Ok(operands.fold(first, |acc, next| Node::binary(op, acc, next).or_at(form.pos())))
    }

    fn fold_logical(&mut self, form: &Form<'_>, op: LogicalOp, identity: bool) -> Result<Node> {
        let mut operands = self.lower_exprs(form.args)?.into_iter();
        let Some(first) = operands.next() else {
            return Ok(Node::bool(identity));
        };
        Ok(operands.fold(first, |acc, next| Node::logical(op, acc, next).or_at(form.pos())))
    }
}

/// Operands that can be repeated without evaluating anything twice.
fn is_repeatable(node: &Node) -> bool {
    matches!(
        node.kind,
        NodeKind::Identifier { .. } | NodeKind::Literal(_) | NodeKind::This
    )
}
