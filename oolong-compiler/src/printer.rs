//! Go source rendering for the pass's output. The build driver splices
//! syntax trees, not text; this exists for the `dump_generated` debugging
//! surface and for readable assertions in tests.

use crate::ast::{
    BinaryOp, Block, ConstDecl, Decl, ElseBranch, Expression, ExpressionKind, FuncDecl, Literal,
    Statement, StatementKind, TypeDecl, TypeDeclKind, TypeExpr, TypeExprKind, UnaryOp, VarDecl,
};

pub fn render_decls(decls: &[Decl]) -> String {
    let mut printer = Printer::default();
    for (position, decl) in decls.iter().enumerate() {
        if position > 0 {
            printer.out.push('\n');
        }
        printer.decl(decl);
    }
    printer.out
}

pub fn render_decl(decl: &Decl) -> String {
    let mut printer = Printer::default();
    printer.decl(decl);
    printer.out
}

pub fn render_stmt(statement: &Statement) -> String {
    let mut printer = Printer::default();
    printer.stmt(statement);
    printer.out
}

pub fn render_expr(expression: &Expression) -> String {
    let mut printer = Printer::default();
    printer.expr(expression);
    printer.out
}

#[derive(Default)]
struct Printer {
    out: String,
    indent: usize,
}

impl Printer {
    fn line_start(&mut self) {
        for _ in 0..self.indent {
            self.out.push('\t');
        }
    }

    fn decl(&mut self, decl: &Decl) {
        match decl {
            Decl::Type(type_decl) => self.type_decl(type_decl),
            Decl::Const(constant) => self.const_decl(constant),
            Decl::Func(func) => self.func_decl(func),
            Decl::Var(var) => self.var_decl(var),
        }
    }

    fn type_decl(&mut self, decl: &TypeDecl) {
        self.line_start();
        self.out.push_str("type ");
        self.out.push_str(&decl.name);
        self.out.push(' ');
        match &decl.kind {
            TypeDeclKind::Struct(fields) => {
                self.out.push_str("struct {\n");
                self.indent += 1;
                for field in fields {
                    self.line_start();
                    self.out.push_str(&field.name);
                    self.out.push(' ');
                    self.type_expr(&field.ty);
                    self.out.push('\n');
                }
                self.indent -= 1;
                self.line_start();
                self.out.push_str("}\n");
            }
            TypeDeclKind::Defined(ty) => {
                self.type_expr(ty);
                self.out.push('\n');
            }
        }
    }

    fn const_decl(&mut self, decl: &ConstDecl) {
        self.line_start();
        self.out.push_str("const (\n");
        self.indent += 1;
        for spec in &decl.specs {
            self.line_start();
            self.out.push_str(&spec.name);
            if let Some(annotation) = &spec.annotation {
                self.out.push(' ');
                self.type_expr(annotation);
            }
            if let Some(value) = &spec.value {
                self.out.push_str(" = ");
                self.expr(value);
            }
            self.out.push('\n');
        }
        self.indent -= 1;
        self.line_start();
        self.out.push_str(")\n");
    }

    fn var_decl(&mut self, decl: &VarDecl) {
        self.line_start();
        self.out.push_str("var ");
        let names: Vec<&str> = decl.names.iter().map(|name| name.name.as_str()).collect();
        self.out.push_str(&names.join(", "));
        if let Some(annotation) = &decl.annotation {
            self.out.push(' ');
            self.type_expr(annotation);
        }
        if !decl.values.is_empty() {
            self.out.push_str(" = ");
            for (position, value) in decl.values.iter().enumerate() {
                if position > 0 {
                    self.out.push_str(", ");
                }
                self.expr(value);
            }
        }
        self.out.push('\n');
    }

    fn func_decl(&mut self, func: &FuncDecl) {
        self.line_start();
        self.out.push_str("func ");
        if let Some(receiver) = &func.receiver {
            self.out.push('(');
            self.out.push_str(&receiver.name);
            self.out.push(' ');
            self.type_expr(&receiver.ty);
            self.out.push_str(") ");
        }
        self.out.push_str(&func.name);
        self.out.push('(');
        for (position, parameter) in func.params.iter().enumerate() {
            if position > 0 {
                self.out.push_str(", ");
            }
            self.out.push_str(&parameter.name);
            self.out.push(' ');
            if func.variadic && position + 1 == func.params.len() {
                self.out.push_str("...");
                if let TypeExprKind::Slice(element) = &parameter.ty.kind {
                    self.type_expr(element);
                } else {
                    self.type_expr(&parameter.ty);
                }
            } else {
                self.type_expr(&parameter.ty);
            }
        }
        self.out.push(')');
        self.result_list(&func.results);
        self.out.push(' ');
        self.braced_block(&func.body);
        self.out.push('\n');
    }

    fn result_list(&mut self, results: &[TypeExpr]) {
        match results.len() {
            0 => {}
            1 => {
                self.out.push(' ');
                self.type_expr(&results[0]);
            }
            _ => {
                self.out.push_str(" (");
                for (position, result) in results.iter().enumerate() {
                    if position > 0 {
                        self.out.push_str(", ");
                    }
                    self.type_expr(result);
                }
                self.out.push(')');
            }
        }
    }

    fn braced_block(&mut self, block: &Block) {
        self.out.push_str("{\n");
        self.indent += 1;
        for statement in &block.statements {
            self.stmt(statement);
        }
        self.indent -= 1;
        self.line_start();
        self.out.push('}');
    }

    fn stmt(&mut self, statement: &Statement) {
        match &statement.kind {
            StatementKind::Var(var) => {
                self.line_start();
                if var.short {
                    let names: Vec<&str> =
                        var.names.iter().map(|name| name.name.as_str()).collect();
                    self.out.push_str(&names.join(", "));
                    self.out.push_str(" := ");
                    for (position, value) in var.values.iter().enumerate() {
                        if position > 0 {
                            self.out.push_str(", ");
                        }
                        self.expr(value);
                    }
                } else {
                    self.out.push_str("var ");
                    let names: Vec<&str> =
                        var.names.iter().map(|name| name.name.as_str()).collect();
                    self.out.push_str(&names.join(", "));
                    if let Some(annotation) = &var.annotation {
                        self.out.push(' ');
                        self.type_expr(annotation);
                    }
                    if !var.values.is_empty() {
                        self.out.push_str(" = ");
                        for (position, value) in var.values.iter().enumerate() {
                            if position > 0 {
                                self.out.push_str(", ");
                            }
                            self.expr(value);
                        }
                    }
                }
                self.out.push('\n');
            }
            StatementKind::Assign(assign) => {
                self.line_start();
                for (position, target) in assign.targets.iter().enumerate() {
                    if position > 0 {
                        self.out.push_str(", ");
                    }
                    self.expr(target);
                }
                self.out.push_str(" = ");
                for (position, value) in assign.values.iter().enumerate() {
                    if position > 0 {
                        self.out.push_str(", ");
                    }
                    self.expr(value);
                }
                self.out.push('\n');
            }
            StatementKind::Return(ret) => {
                self.line_start();
                self.out.push_str("return");
                for (position, value) in ret.values.iter().enumerate() {
                    self.out.push_str(if position == 0 { " " } else { ", " });
                    self.expr(value);
                }
                self.out.push('\n');
            }
            StatementKind::If(conditional) => {
                self.line_start();
                self.if_chain(conditional);
                self.out.push('\n');
            }
            StatementKind::For(repeat) => {
                self.line_start();
                self.out.push_str("for ");
                if let Some(cond) = &repeat.cond {
                    if repeat.init.is_none() && repeat.post.is_none() {
                        self.expr(cond);
                        self.out.push(' ');
                    } else {
                        self.out.push_str("; ");
                        self.expr(cond);
                        self.out.push_str("; ");
                    }
                }
                self.braced_block(&repeat.body);
                self.out.push('\n');
            }
            StatementKind::Match(_) => {
                // Matches are lowered before anything renders; an
                // unlowered one was left untransformed by a reported
                // failure.
                self.line_start();
                self.out.push_str("/* match left untransformed */\n");
            }
            StatementKind::Expression(expression) => {
                self.line_start();
                self.expr(expression);
                self.out.push('\n');
            }
            StatementKind::Block(block) => {
                self.line_start();
                self.braced_block(block);
                self.out.push('\n');
            }
        }
    }

    fn if_chain(&mut self, conditional: &crate::ast::IfStatement) {
        self.out.push_str("if ");
        self.expr(&conditional.cond);
        self.out.push(' ');
        self.braced_block(&conditional.then_block);
        match &conditional.else_branch {
            Some(ElseBranch::If(nested)) => {
                self.out.push_str(" else ");
                if let StatementKind::If(inner) = &nested.kind {
                    self.if_chain(inner);
                } else {
                    self.stmt(nested);
                }
            }
            Some(ElseBranch::Block(block)) => {
                self.out.push_str(" else ");
                self.braced_block(block);
            }
            None => {}
        }
    }

    fn type_expr(&mut self, ty: &TypeExpr) {
        match &ty.kind {
            TypeExprKind::Name(name) => self.out.push_str(name),
            TypeExprKind::Pointer(inner) => {
                self.out.push('*');
                self.type_expr(inner);
            }
            TypeExprKind::Slice(element) => {
                self.out.push_str("[]");
                self.type_expr(element);
            }
            TypeExprKind::Map(key, value) => {
                self.out.push_str("map[");
                self.type_expr(key);
                self.out.push(']');
                self.type_expr(value);
            }
            TypeExprKind::Func {
                params,
                variadic,
                results,
            } => {
                self.out.push_str("func(");
                for (position, parameter) in params.iter().enumerate() {
                    if position > 0 {
                        self.out.push_str(", ");
                    }
                    if *variadic && position + 1 == params.len() {
                        self.out.push_str("...");
                    }
                    self.type_expr(parameter);
                }
                self.out.push(')');
                self.result_list(results);
            }
            TypeExprKind::Struct(fields) => {
                self.out.push_str("struct {");
                for (position, field) in fields.iter().enumerate() {
                    self.out.push_str(if position == 0 { " " } else { "; " });
                    self.out.push_str(&field.name);
                    self.out.push(' ');
                    self.type_expr(&field.ty);
                }
                self.out.push_str(" }");
            }
            TypeExprKind::Any => self.out.push_str("interface{}"),
            TypeExprKind::Sum { kind, params } => {
                // Never survives the pass; rendered for completeness.
                self.out.push_str(kind.type_name());
                self.out.push('<');
                for (position, parameter) in params.iter().enumerate() {
                    if position > 0 {
                        self.out.push_str(", ");
                    }
                    self.type_expr(parameter);
                }
                self.out.push('>');
            }
        }
    }

    fn expr(&mut self, expression: &Expression) {
        match &expression.kind {
            ExpressionKind::Identifier(ident) => self.out.push_str(&ident.name),
            ExpressionKind::Literal(literal) => self.literal(literal),
            ExpressionKind::Composite(composite) => {
                self.type_expr(&composite.ty);
                self.out.push('{');
                for (position, field) in composite.fields.iter().enumerate() {
                    if position > 0 {
                        self.out.push_str(", ");
                    }
                    self.out.push_str(&field.name);
                    self.out.push_str(": ");
                    self.expr(&field.value);
                }
                self.out.push('}');
            }
            ExpressionKind::Unary(unary) => {
                self.out.push_str(unary_token(unary.op));
                self.expr(&unary.operand);
            }
            ExpressionKind::Binary(binary) => {
                self.expr(&binary.left);
                self.out.push(' ');
                self.out.push_str(binary_token(binary.op));
                self.out.push(' ');
                self.expr(&binary.right);
            }
            ExpressionKind::Call(call) => {
                self.expr(&call.callee);
                self.out.push('(');
                for (position, arg) in call.args.iter().enumerate() {
                    if position > 0 {
                        self.out.push_str(", ");
                    }
                    self.expr(arg);
                }
                self.out.push(')');
            }
            ExpressionKind::Selector(selector) => {
                self.expr(&selector.object);
                self.out.push('.');
                self.out.push_str(&selector.field);
            }
            ExpressionKind::Index(indexed) => {
                self.expr(&indexed.object);
                self.out.push('[');
                self.expr(&indexed.index);
                self.out.push(']');
            }
            ExpressionKind::Grouping(inner) => {
                self.out.push('(');
                self.expr(inner);
                self.out.push(')');
            }
            ExpressionKind::FuncLit(lit) => {
                self.out.push_str("func(");
                for (position, parameter) in lit.params.iter().enumerate() {
                    if position > 0 {
                        self.out.push_str(", ");
                    }
                    self.out.push_str(&parameter.name);
                    self.out.push(' ');
                    self.type_expr(&parameter.ty);
                }
                self.out.push(')');
                self.result_list(&lit.results);
                self.out.push(' ');
                self.braced_block(&lit.body);
            }
        }
    }

    fn literal(&mut self, literal: &Literal) {
        match literal {
            Literal::Int(value) => self.out.push_str(&value.to_string()),
            Literal::Float(value) => {
                let rendered = value.to_string();
                self.out.push_str(&rendered);
                if !rendered.contains('.') && !rendered.contains('e') {
                    self.out.push_str(".0");
                }
            }
            Literal::Str(value) => {
                self.out.push('"');
                for ch in value.chars() {
                    match ch {
                        '"' => self.out.push_str("\\\""),
                        '\\' => self.out.push_str("\\\\"),
                        '\n' => self.out.push_str("\\n"),
                        '\r' => self.out.push_str("\\r"),
                        '\t' => self.out.push_str("\\t"),
                        other => self.out.push(other),
                    }
                }
                self.out.push('"');
            }
            Literal::Rune(value) => {
                self.out.push('\'');
                match value {
                    '\n' => self.out.push_str("\\n"),
                    '\r' => self.out.push_str("\\r"),
                    '\t' => self.out.push_str("\\t"),
                    '\'' => self.out.push_str("\\'"),
                    '\\' => self.out.push_str("\\\\"),
                    other => self.out.push(*other),
                }
                self.out.push('\'');
            }
            Literal::Nil => self.out.push_str("nil"),
        }
    }
}

fn unary_token(op: UnaryOp) -> &'static str {
    match op {
        UnaryOp::Not => "!",
        UnaryOp::Neg => "-",
        UnaryOp::Pos => "+",
        UnaryOp::Addr => "&",
        UnaryOp::Deref => "*",
    }
}

fn binary_token(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Rem => "%",
        BinaryOp::Shl => "<<",
        BinaryOp::Shr => ">>",
        BinaryOp::BitAnd => "&",
        BinaryOp::BitOr => "|",
        BinaryOp::BitXor => "^",
        BinaryOp::Eq => "==",
        BinaryOp::NotEq => "!=",
        BinaryOp::Less => "<",
        BinaryOp::LessEq => "<=",
        BinaryOp::Greater => ">",
        BinaryOp::GreaterEq => ">=",
        BinaryOp::And => "&&",
        BinaryOp::Or => "||",
    }
}
