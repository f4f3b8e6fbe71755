//! Programmatic construction of expression trees.
//!
//! Hosts without a parser (tests, benchmarks, code generators) use
//! [`AstBuilder`] to allocate nodes in an arena. Each node receives a fresh,
//! distinct span on the current line so diagnostics can be traced back to
//! the node that caused them.
//!
//! ```
//! use basalt_syntax::{AstBuilder, BinaryOp};
//! use bumpalo::Bump;
//!
//! let arena = Bump::new();
//! let b = AstBuilder::new(&arena);
//! let sum = b.binary(b.int(1), BinaryOp::Add, b.int(2));
//! assert_ne!(sum.span(), b.int(3).span());
//! ```

use std::cell::Cell;

use basalt_core::{PrimitiveKind, Span};
use bumpalo::Bump;

use crate::ast::*;

pub struct AstBuilder<'ast> {
    arena: &'ast Bump,
    line: Cell<u32>,
    col: Cell<u32>,
}

impl<'ast> AstBuilder<'ast> {
    pub fn new(arena: &'ast Bump) -> Self {
        Self {
            arena,
            line: Cell::new(1),
            col: Cell::new(1),
        }
    }

    pub fn arena(&self) -> &'ast Bump {
        self.arena
    }

    /// Move subsequent nodes to the given line.
    pub fn set_line(&self, line: u32) {
        self.line.set(line);
        self.col.set(1);
    }

    /// Allocate the next span.
    pub fn span(&self) -> Span {
        let col = self.col.get();
        self.col.set(col + 2);
        Span::new(self.line.get(), col, 1)
    }

    pub fn alloc(&self, expr: Expr<'ast>) -> &'ast Expr<'ast> {
        self.arena.alloc(expr)
    }

    pub fn ident(&self, name: &str) -> Ident<'ast> {
        Ident::new(self.arena.alloc_str(name), self.span())
    }

    // ---- literals ----------------------------------------------------------

    fn literal(&self, kind: LiteralKind<'ast>) -> Expr<'ast> {
        Expr::Literal(LiteralExpr { kind, span: self.span() })
    }

    /// An unsuffixed integral literal.
    pub fn int(&self, value: u64) -> Expr<'ast> {
        self.int_suffixed(value, IntegerSuffix::None)
    }

    pub fn int_suffixed(&self, value: u64, suffix: IntegerSuffix) -> Expr<'ast> {
        self.literal(LiteralKind::Integer { value, suffix })
    }

    pub fn double(&self, value: f64) -> Expr<'ast> {
        self.literal(LiteralKind::Floating {
            value,
            suffix: FloatSuffix::None,
        })
    }

    pub fn single(&self, value: f64) -> Expr<'ast> {
        self.literal(LiteralKind::Floating {
            value,
            suffix: FloatSuffix::Single,
        })
    }

    pub fn decimal(&self, text: &str) -> Expr<'ast> {
        self.literal(LiteralKind::Decimal(self.arena.alloc_str(text)))
    }

    pub fn string(&self, text: &str) -> Expr<'ast> {
        self.literal(LiteralKind::String(self.arena.alloc_str(text)))
    }

    pub fn char(&self, c: char) -> Expr<'ast> {
        self.literal(LiteralKind::Char(c))
    }

    pub fn boolean(&self, value: bool) -> Expr<'ast> {
        self.literal(LiteralKind::Boolean(value))
    }

    pub fn date(&self, ticks: i64) -> Expr<'ast> {
        self.literal(LiteralKind::Date(ticks))
    }

    pub fn nothing(&self) -> Expr<'ast> {
        Expr::Nothing(self.span())
    }

    // ---- names and members -------------------------------------------------

    pub fn name(&self, name: &str) -> Expr<'ast> {
        let ident = self.ident(name);
        Expr::Name(NameExpr {
            ident,
            type_args: &[],
            has_type_arg_list: false,
            span: ident.span,
        })
    }

    /// `name(Of args)`.
    pub fn generic_name(&self, name: &str, args: &[TypeExpr<'ast>]) -> Expr<'ast> {
        let ident = self.ident(name);
        Expr::Name(NameExpr {
            ident,
            type_args: self.arena.alloc_slice_copy(args),
            has_type_arg_list: true,
            span: ident.span,
        })
    }

    pub fn me(&self) -> Expr<'ast> {
        self.instance(InstanceKeyword::Me)
    }

    pub fn my_base(&self) -> Expr<'ast> {
        self.instance(InstanceKeyword::MyBase)
    }

    pub fn my_class(&self) -> Expr<'ast> {
        self.instance(InstanceKeyword::MyClass)
    }

    fn instance(&self, keyword: InstanceKeyword) -> Expr<'ast> {
        Expr::Instance(InstanceExpr {
            keyword,
            span: self.span(),
        })
    }

    pub fn member(&self, receiver: Expr<'ast>, name: &str) -> Expr<'ast> {
        let receiver = self.alloc(receiver);
        let name = self.ident(name);
        Expr::Member(self.arena.alloc(MemberExpr {
            receiver: Some(receiver),
            name,
            type_args: &[],
            has_type_arg_list: false,
            span: receiver.span().merge(name.span),
        }))
    }

    pub fn generic_member(&self, receiver: Expr<'ast>, name: &str, args: &[TypeExpr<'ast>]) -> Expr<'ast> {
        let receiver = self.alloc(receiver);
        let name = self.ident(name);
        Expr::Member(self.arena.alloc(MemberExpr {
            receiver: Some(receiver),
            name,
            type_args: self.arena.alloc_slice_copy(args),
            has_type_arg_list: true,
            span: receiver.span().merge(name.span),
        }))
    }

    /// `.name` inside a `With` block.
    pub fn with_member(&self, name: &str) -> Expr<'ast> {
        let name = self.ident(name);
        Expr::Member(self.arena.alloc(MemberExpr {
            receiver: None,
            name,
            type_args: &[],
            has_type_arg_list: false,
            span: name.span,
        }))
    }

    // ---- calls -------------------------------------------------------------

    pub fn arg(&self, value: Expr<'ast>) -> Argument<'ast> {
        let value = self.alloc(value);
        Argument {
            name: None,
            value: Some(value),
            span: value.span(),
        }
    }

    pub fn named_arg(&self, name: &str, value: Expr<'ast>) -> Argument<'ast> {
        let value = self.alloc(value);
        Argument {
            name: Some(self.ident(name)),
            value: Some(value),
            span: value.span(),
        }
    }

    pub fn omitted_arg(&self) -> Argument<'ast> {
        Argument {
            name: None,
            value: None,
            span: self.span(),
        }
    }

    /// `target(a, b, ...)` with positional arguments.
    pub fn call(&self, target: Expr<'ast>, args: &[Expr<'ast>]) -> Expr<'ast> {
        let args: Vec<Argument<'ast>> = args.iter().map(|a| self.arg(*a)).collect();
        self.call_with(target, &args)
    }

    /// `target(args)` with explicit argument forms.
    pub fn call_with(&self, target: Expr<'ast>, args: &[Argument<'ast>]) -> Expr<'ast> {
        let target = self.alloc(target);
        Expr::Call(self.arena.alloc(CallExpr {
            target,
            args: self.arena.alloc_slice_copy(args),
            span: target.span(),
        }))
    }

    // ---- operators ---------------------------------------------------------

    pub fn unary(&self, op: UnaryOp, operand: Expr<'ast>) -> Expr<'ast> {
        Expr::Unary(self.arena.alloc(UnaryExpr {
            op,
            operand: self.alloc(operand),
            span: self.span(),
        }))
    }

    pub fn binary(&self, left: Expr<'ast>, op: BinaryOp, right: Expr<'ast>) -> Expr<'ast> {
        Expr::Binary(self.arena.alloc(BinaryExpr {
            left: self.alloc(left),
            op,
            right: self.alloc(right),
            span: self.span(),
        }))
    }

    /// Left-associative chain `a op b op c ...`.
    pub fn chain(&self, op: BinaryOp, operands: &[Expr<'ast>]) -> Expr<'ast> {
        let mut iter = operands.iter().copied();
        let Some(first) = iter.next() else {
            return self.nothing();
        };
        iter.fold(first, |acc, next| self.binary(acc, op, next))
    }

    pub fn paren(&self, inner: Expr<'ast>) -> Expr<'ast> {
        Expr::Paren(self.arena.alloc(ParenExpr {
            inner: self.alloc(inner),
            span: self.span(),
        }))
    }

    // ---- conversions and type tests ---------------------------------------

    pub fn cast(&self, kind: CastKind, operand: Expr<'ast>, target: TypeExpr<'ast>) -> Expr<'ast> {
        Expr::Cast(self.arena.alloc(CastExpr {
            kind,
            operand: self.alloc(operand),
            target,
            intrinsic: false,
            span: self.span(),
        }))
    }

    /// `CInt(x)`-style intrinsic conversion to a primitive.
    pub fn intrinsic_cast(&self, kind: PrimitiveKind, operand: Expr<'ast>) -> Expr<'ast> {
        let target = self.ty_primitive(kind);
        Expr::Cast(self.arena.alloc(CastExpr {
            kind: CastKind::CType,
            operand: self.alloc(operand),
            target,
            intrinsic: true,
            span: self.span(),
        }))
    }

    pub fn type_of(&self, operand: Expr<'ast>, target: TypeExpr<'ast>, is_not: bool) -> Expr<'ast> {
        Expr::TypeOf(self.arena.alloc(TypeOfExpr {
            operand: self.alloc(operand),
            target,
            is_not,
            span: self.span(),
        }))
    }

    pub fn get_type(&self, target: TypeExpr<'ast>) -> Expr<'ast> {
        Expr::GetType(self.arena.alloc(GetTypeExpr {
            target,
            span: self.span(),
        }))
    }

    // ---- construction ------------------------------------------------------

    pub fn new_object(&self, ty: TypeExpr<'ast>, args: &[Expr<'ast>]) -> Expr<'ast> {
        let args: Vec<Argument<'ast>> = args.iter().map(|a| self.arg(*a)).collect();
        self.new_object_with(ty, &args, None)
    }

    pub fn new_object_with(
        &self,
        ty: TypeExpr<'ast>,
        args: &[Argument<'ast>],
        initializer: Option<ObjectInitializer<'ast>>,
    ) -> Expr<'ast> {
        Expr::New(self.arena.alloc(NewExpr {
            ty,
            args: self.arena.alloc_slice_copy(args),
            initializer,
            span: self.span(),
        }))
    }

    /// `New T With {.a = x, .b = y}`.
    pub fn new_with_members(&self, ty: TypeExpr<'ast>, members: &[(&str, Expr<'ast>)]) -> Expr<'ast> {
        let inits: Vec<FieldInitializer<'ast>> = members
            .iter()
            .map(|(name, value)| FieldInitializer {
                name: self.ident(name),
                value: self.alloc(*value),
                span: self.span(),
            })
            .collect();
        let inits = self.arena.alloc_slice_copy(&inits);
        self.new_object_with(ty, &[], Some(ObjectInitializer::With(inits)))
    }

    /// `New T From {elements}`.
    pub fn new_from(&self, ty: TypeExpr<'ast>, elements: &[Expr<'ast>]) -> Expr<'ast> {
        let literal = self.array_literal_node(elements);
        self.new_object_with(ty, &[], Some(ObjectInitializer::From(literal)))
    }

    pub fn array_creation(
        &self,
        element: TypeExpr<'ast>,
        bounds: &[Expr<'ast>],
        rank: u32,
        elements: &[Expr<'ast>],
    ) -> Expr<'ast> {
        Expr::ArrayCreation(self.arena.alloc(ArrayCreationExpr {
            element,
            bounds: self.arena.alloc_slice_copy(bounds),
            rank,
            initializer: self.array_literal_node(elements),
            span: self.span(),
        }))
    }

    fn array_literal_node(&self, elements: &[Expr<'ast>]) -> &'ast ArrayLiteralExpr<'ast> {
        self.arena.alloc(ArrayLiteralExpr {
            elements: self.arena.alloc_slice_copy(elements),
            span: self.span(),
        })
    }

    /// `{a, b, ...}`.
    pub fn array_literal(&self, elements: &[Expr<'ast>]) -> Expr<'ast> {
        Expr::ArrayLiteral(self.array_literal_node(elements))
    }

    // ---- lambdas and delegates --------------------------------------------

    pub fn lambda_param(&self, name: &str, ty: Option<TypeExpr<'ast>>) -> LambdaParam<'ast> {
        LambdaParam {
            name: self.ident(name),
            ty,
            by_ref: false,
            span: self.span(),
        }
    }

    /// `Function(params) body`.
    pub fn lambda(&self, params: &[LambdaParam<'ast>], body: Expr<'ast>) -> Expr<'ast> {
        self.lambda_node(params, body, true, false)
    }

    /// `Sub(params) body`.
    pub fn sub_lambda(&self, params: &[LambdaParam<'ast>], body: Expr<'ast>) -> Expr<'ast> {
        self.lambda_node(params, body, false, false)
    }

    pub fn async_lambda(&self, params: &[LambdaParam<'ast>], body: Expr<'ast>) -> Expr<'ast> {
        self.lambda_node(params, body, true, true)
    }

    fn lambda_node(
        &self,
        params: &[LambdaParam<'ast>],
        body: Expr<'ast>,
        is_function: bool,
        is_async: bool,
    ) -> Expr<'ast> {
        Expr::Lambda(self.arena.alloc(LambdaExpr {
            params: self.arena.alloc_slice_copy(params),
            body: self.alloc(body),
            is_function,
            is_async,
            span: self.span(),
        }))
    }

    pub fn address_of(&self, target: Expr<'ast>) -> Expr<'ast> {
        Expr::AddressOf(self.arena.alloc(AddressOfExpr {
            target: self.alloc(target),
            span: self.span(),
        }))
    }

    // ---- conditionals, await, queries, xml --------------------------------

    pub fn if_expr(&self, condition: Expr<'ast>, when_true: Expr<'ast>, when_false: Expr<'ast>) -> Expr<'ast> {
        Expr::If(self.arena.alloc(IfExpr {
            condition: self.alloc(condition),
            when_true: self.alloc(when_true),
            when_false: self.alloc(when_false),
            span: self.span(),
        }))
    }

    pub fn coalesce(&self, left: Expr<'ast>, right: Expr<'ast>) -> Expr<'ast> {
        Expr::Coalesce(self.arena.alloc(CoalesceExpr {
            left: self.alloc(left),
            right: self.alloc(right),
            span: self.span(),
        }))
    }

    pub fn await_expr(&self, operand: Expr<'ast>) -> Expr<'ast> {
        Expr::Await(self.arena.alloc(AwaitExpr {
            operand: self.alloc(operand),
            span: self.span(),
        }))
    }

    pub fn query(&self, variable: &str, source: Expr<'ast>, clauses: &[QueryClause<'ast>]) -> Expr<'ast> {
        Expr::Query(self.arena.alloc(QueryExpr {
            variable: self.ident(variable),
            source: self.alloc(source),
            clauses: self.arena.alloc_slice_copy(clauses),
            span: self.span(),
        }))
    }

    pub fn where_clause(&self, predicate: Expr<'ast>) -> QueryClause<'ast> {
        QueryClause::Where(self.alloc(predicate))
    }

    pub fn order_by_clause(&self, key: Expr<'ast>, descending: bool) -> QueryClause<'ast> {
        QueryClause::OrderBy {
            key: self.alloc(key),
            descending,
        }
    }

    pub fn select_clause(&self, projection: Expr<'ast>) -> QueryClause<'ast> {
        QueryClause::Select(self.alloc(projection))
    }

    pub fn xml_element(&self, name: &str, content: &[XmlContent<'ast>]) -> Expr<'ast> {
        Expr::Xml(self.xml_node(None, name, content))
    }

    pub fn xml_node(&self, prefix: Option<&str>, name: &str, content: &[XmlContent<'ast>]) -> &'ast XmlElementExpr<'ast> {
        self.arena.alloc(XmlElementExpr {
            prefix: prefix.map(|p| self.ident(p)),
            name: self.ident(name),
            content: self.arena.alloc_slice_copy(content),
            span: self.span(),
        })
    }

    pub fn xml_text(&self, text: &str) -> XmlContent<'ast> {
        XmlContent::Text(self.arena.alloc_str(text))
    }

    pub fn xml_embedded(&self, expr: Expr<'ast>) -> XmlContent<'ast> {
        XmlContent::Embedded(self.alloc(expr))
    }

    // ---- attributes --------------------------------------------------------

    /// `<Ty(args, name:=value)>`.
    pub fn attribute(
        &self,
        ty: TypeExpr<'ast>,
        args: &[Expr<'ast>],
        named: &[(&str, Expr<'ast>)],
    ) -> &'ast AttributeExpr<'ast> {
        let args: Vec<Argument<'ast>> = args.iter().map(|a| self.arg(*a)).collect();
        let named: Vec<FieldInitializer<'ast>> = named
            .iter()
            .map(|(name, value)| FieldInitializer {
                name: self.ident(name),
                value: self.alloc(*value),
                span: self.span(),
            })
            .collect();
        self.arena.alloc(AttributeExpr {
            ty,
            args: self.arena.alloc_slice_copy(&args),
            named_args: self.arena.alloc_slice_copy(&named),
            span: self.span(),
        })
    }

    // ---- types -------------------------------------------------------------

    pub fn ty_primitive(&self, kind: PrimitiveKind) -> TypeExpr<'ast> {
        TypeExpr::Primitive { kind, span: self.span() }
    }

    pub fn ty_object(&self) -> TypeExpr<'ast> {
        TypeExpr::Object(self.span())
    }

    /// A dotted type name: `"Ns.Widget"`.
    pub fn ty_named(&self, dotted: &str) -> TypeExpr<'ast> {
        self.ty_generic(dotted, &[])
    }

    pub fn ty_generic(&self, dotted: &str, args: &[TypeExpr<'ast>]) -> TypeExpr<'ast> {
        let path: Vec<Ident<'ast>> = dotted.split('.').map(|part| self.ident(part)).collect();
        TypeExpr::Named {
            path: self.arena.alloc_slice_copy(&path),
            args: self.arena.alloc_slice_copy(args),
            span: self.span(),
        }
    }

    pub fn ty_array(&self, element: TypeExpr<'ast>, rank: u32) -> TypeExpr<'ast> {
        TypeExpr::Array {
            element: self.arena.alloc(element),
            rank,
            span: self.span(),
        }
    }

    pub fn ty_nullable(&self, inner: TypeExpr<'ast>) -> TypeExpr<'ast> {
        TypeExpr::Nullable {
            inner: self.arena.alloc(inner),
            span: self.span(),
        }
    }
}
