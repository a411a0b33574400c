//! Special forms.
//!
//! The set of recognised heads is closed: [`SpecialForm::from_name`] is a
//! plain `match`, and anything it does not recognise is lowered as a call.

mod binding;
mod class;
mod control;
mod data;
mod function;
mod interop;
mod loops;
mod module;
mod ops;
mod quote;
mod typedecl;

pub(crate) use ops::Operator;

use crate::context::LoweringContext;
use crate::error::{codes, Result, SprigError};
use rhizome_sprig_ir::{Node, Position, VariableKind};
use rhizome_sprig_sexpr::SExp;

/// Every head symbol with dedicated lowering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SpecialForm {
    // binding
    Let,
    Const,
    Var,
    Assign,
    // functions
    Fn,
    FnGenerator,
    Async,
    Arrow,
    Return,
    Yield,
    YieldDelegate,
    Await,
    // control
    If,
    Cond,
    Do,
    Throw,
    Try,
    Switch,
    Label,
    // loops
    Loop,
    Recur,
    While,
    For,
    ForOf,
    ForAwaitOf,
    ForIn,
    Break,
    Continue,
    // data
    Vector,
    EmptyArray,
    HashMap,
    EmptyMap,
    HashSet,
    EmptySet,
    Get,
    New,
    TemplateLiteral,
    Spread,
    // interop
    JsCall,
    JsGet,
    JsSet,
    JsNew,
    JsGetInvoke,
    MethodCall,
    // quoting
    Quote,
    Quasiquote,
    Unquote,
    UnquoteSplicing,
    // declarations
    Class,
    Enum,
    TypeAlias,
    Interface,
    As,
    // modules
    Import,
    Export,
    DynamicImport,
    /// `macro` / `defmacro`: expanded upstream, dropped here.
    Macro,
    Operator(Operator),
}

impl SpecialForm {
    pub(crate) fn from_name(name: &str) -> Option<Self> {
        let form = match name {
            "let" => Self::Let,
            "const" => Self::Const,
            "var" => Self::Var,
            "=" | "set!" => Self::Assign,

            "fn" => Self::Fn,
            "fn*" => Self::FnGenerator,
            "async" => Self::Async,
            "=>" => Self::Arrow,
            "return" => Self::Return,
            "yield" => Self::Yield,
            "yield*" => Self::YieldDelegate,
            "await" => Self::Await,

            "if" => Self::If,
            "cond" => Self::Cond,
            "do" => Self::Do,
            "throw" => Self::Throw,
            "try" => Self::Try,
            "switch" => Self::Switch,
            "label" => Self::Label,

            "loop" => Self::Loop,
            "recur" => Self::Recur,
            "while" => Self::While,
            "for" => Self::For,
            "for-of" => Self::ForOf,
            "for-await-of" => Self::ForAwaitOf,
            "for-in" => Self::ForIn,
            "break" => Self::Break,
            "continue" => Self::Continue,

            "vector" => Self::Vector,
            "empty-array" => Self::EmptyArray,
            "hash-map" => Self::HashMap,
            "empty-map" => Self::EmptyMap,
            "hash-set" => Self::HashSet,
            "empty-set" => Self::EmptySet,
            "get" => Self::Get,
            "new" => Self::New,
            "template-literal" => Self::TemplateLiteral,
            "..." => Self::Spread,

            "js-call" => Self::JsCall,
            "js-get" => Self::JsGet,
            "js-set" => Self::JsSet,
            "js-new" => Self::JsNew,
            "js-get-invoke" => Self::JsGetInvoke,
            "method-call" => Self::MethodCall,

            "quote" => Self::Quote,
            "quasiquote" => Self::Quasiquote,
            "unquote" => Self::Unquote,
            "unquote-splicing" => Self::UnquoteSplicing,

            "class" => Self::Class,
            "enum" => Self::Enum,
            "type" | "deftype" => Self::TypeAlias,
            "interface" => Self::Interface,
            "as" => Self::As,

            "import" => Self::Import,
            "export" => Self::Export,
            "dynamic-import" => Self::DynamicImport,

            "macro" | "defmacro" => Self::Macro,

            _ => return Operator::from_name(name).map(Self::Operator),
        };
        Some(form)
    }
}

/// A special-form occurrence: the whole list, its head and its arguments.
pub(crate) struct Form<'a> {
    pub node: &'a SExp,
    pub name: &'a str,
    pub args: &'a [SExp],
}

impl<'a> Form<'a> {
    pub fn position(&self) -> Option<Position> {
        self.node.position.clone()
    }

    pub fn pos(&self) -> Option<&Position> {
        self.node.position.as_ref()
    }

    /// A validation error located at this form.
    pub fn invalid(&self, message: impl Into<String>) -> SprigError {
        SprigError::validation(message).at(self.position())
    }

    /// A validation error located at `node`, or at this form if `node` has
    /// no position.
    pub fn invalid_at(&self, node: &SExp, message: impl Into<String>) -> SprigError {
        SprigError::validation(message).at(node.position.clone().or_else(|| self.position()))
    }

    pub fn exactly(&self, n: usize) -> Result<()> {
        if self.args.len() == n {
            return Ok(());
        }
        Err(self.arity_error(format!(
            "'{}' requires exactly {} argument{}, got {}",
            self.name,
            n,
            plural(n),
            self.args.len()
        )))
    }

    pub fn at_least(&self, n: usize) -> Result<()> {
        if self.args.len() >= n {
            return Ok(());
        }
        Err(self.arity_error(format!(
            "'{}' requires at least {} argument{}, got {}",
            self.name,
            n,
            plural(n),
            self.args.len()
        )))
    }

    pub fn between(&self, min: usize, max: usize) -> Result<()> {
        if (min..=max).contains(&self.args.len()) {
            return Ok(());
        }
        Err(self.arity_error(format!(
            "'{}' requires {} to {} arguments, got {}",
            self.name,
            min,
            max,
            self.args.len()
        )))
    }

    fn arity_error(&self, message: String) -> SprigError {
        self.invalid(message).with_code(codes::FORM_ARITY)
    }

    /// The symbol at `index`, or a validation error describing `what`.
    pub fn symbol(&self, index: usize, what: &str) -> Result<&'a str> {
        let arg = self.args.get(index).ok_or_else(|| {
            self.arity_error(format!("'{}' requires {}", self.name, what))
        })?;
        arg.as_symbol()
            .ok_or_else(|| self.invalid_at(arg, format!("Invalid {} in '{}': {}", what, self.name, arg)))
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

/// Elements of a binding vector: `(vector a 1 b 2)` or `(a 1 b 2)`.
pub(crate) fn binding_items(node: &SExp) -> Option<&[SExp]> {
    let items = node.as_list()?;
    match node.head_symbol() {
        Some("vector") | Some("empty-array") => Some(&items[1..]),
        _ => Some(items),
    }
}

impl LoweringContext {
    pub(crate) fn lower_special(&mut self, special: SpecialForm, form: &Form<'_>) -> Result<Option<Node>> {
        let node = match special {
            SpecialForm::Let | SpecialForm::Const => self.lower_binding(form, VariableKind::Const)?,
            SpecialForm::Var => self.lower_binding(form, VariableKind::Let)?,
            SpecialForm::Assign => self.lower_assign(form)?,

            SpecialForm::Fn => self.lower_fn(form, function::Flavor::default())?,
            SpecialForm::FnGenerator => self.lower_fn(
                form,
                function::Flavor {
                    is_generator: true,
                    ..Default::default()
                },
            )?,
            SpecialForm::Async => self.lower_async(form)?,
            SpecialForm::Arrow => self.lower_arrow(form, false)?,
            SpecialForm::Return => self.lower_return(form)?,
            SpecialForm::Yield => self.lower_yield(form, false)?,
            SpecialForm::YieldDelegate => self.lower_yield(form, true)?,
            SpecialForm::Await => self.lower_await(form)?,

            SpecialForm::If => self.lower_if(form)?,
            SpecialForm::Cond => self.lower_cond(form)?,
            SpecialForm::Do => self.lower_do(form)?,
            SpecialForm::Throw => self.lower_throw(form)?,
            SpecialForm::Try => self.lower_try(form)?,
            SpecialForm::Switch => self.lower_switch(form)?,
            SpecialForm::Label => self.lower_label(form)?,

            SpecialForm::Loop => self.lower_loop(form)?,
            SpecialForm::Recur => self.lower_recur(form)?,
            SpecialForm::While => self.lower_while(form)?,
            SpecialForm::For => self.lower_for(form)?,
            SpecialForm::ForOf => self.lower_for_of(form, false)?,
            SpecialForm::ForAwaitOf => self.lower_for_of(form, true)?,
            SpecialForm::ForIn => self.lower_for_in(form)?,
            SpecialForm::Break => self.lower_jump(form, true)?,
            SpecialForm::Continue => self.lower_jump(form, false)?,

            SpecialForm::Vector => self.lower_vector(form)?,
            SpecialForm::EmptyArray => {
                form.exactly(0)?;
                Node::array(Vec::new())
            }
            SpecialForm::HashMap => self.lower_hash_map(form)?,
            SpecialForm::EmptyMap => {
                form.exactly(0)?;
                Node::object(Vec::new())
            }
            SpecialForm::HashSet => self.lower_hash_set(form)?,
            SpecialForm::EmptySet => {
                form.exactly(0)?;
                Node::new_expr(Node::ident("Set"), Vec::new())
            }
            SpecialForm::Get => self.lower_get(form)?,
            SpecialForm::New => self.lower_new(form)?,
            SpecialForm::TemplateLiteral => self.lower_template(form)?,
            SpecialForm::Spread => {
                form.exactly(1)?;
                Node::spread(self.lower_expr(&form.args[0])?)
            }

            SpecialForm::JsCall | SpecialForm::MethodCall => self.lower_js_call(form)?,
            SpecialForm::JsGet => self.lower_js_get(form)?,
            SpecialForm::JsSet => self.lower_js_set(form)?,
            SpecialForm::JsNew => self.lower_new(form)?,
            SpecialForm::JsGetInvoke => self.lower_js_get_invoke(form)?,

            SpecialForm::Quote => self.lower_quote(form)?,
            SpecialForm::Quasiquote => self.lower_quasiquote(form)?,
            SpecialForm::Unquote | SpecialForm::UnquoteSplicing => {
                return Err(form
                    .invalid(format!("'{}' used outside of quasiquote", form.name))
                    .with_code(codes::MISPLACED_FORM))
            }

            SpecialForm::Class => self.lower_class(form)?,
            SpecialForm::Enum => self.lower_enum(form)?,
            SpecialForm::TypeAlias => self.lower_type_alias(form)?,
            SpecialForm::Interface => self.lower_interface(form)?,
            SpecialForm::As => self.lower_as(form)?,

            SpecialForm::Import => self.lower_import(form)?,
            SpecialForm::Export => self.lower_export(form)?,
            SpecialForm::DynamicImport => self.lower_dynamic_import(form)?,

            SpecialForm::Macro => {
                tracing::debug!(form = %form.name, "dropping macro definition");
                return Ok(None);
            }

            SpecialForm::Operator(op) => self.lower_operator(form, op)?,
        };
        Ok(Some(node.or_at(form.pos())))
    }
}
