//! Shared AST construction helpers for the integration tests. The parser is
//! external to this crate, so tests build their input programs by hand.
#![allow(dead_code)]

use rye_ast::*;

pub fn sp() -> Span {
    0..0
}

pub fn ident(name: &str) -> Ident {
    Ident {
        name: name.to_string(),
        span: sp(),
    }
}

pub fn ty_int() -> TypeExpr {
    TypeExpr {
        kind: TypeExprKind::Int,
        span: sp(),
    }
}

pub fn ty_bool() -> TypeExpr {
    TypeExpr {
        kind: TypeExprKind::Bool,
        span: sp(),
    }
}

pub fn ty_float() -> TypeExpr {
    TypeExpr {
        kind: TypeExprKind::Float,
        span: sp(),
    }
}

pub fn ty_void() -> TypeExpr {
    TypeExpr {
        kind: TypeExprKind::Void,
        span: sp(),
    }
}

pub fn ty_named(name: &str) -> TypeExpr {
    TypeExpr {
        kind: TypeExprKind::Named(name.to_string()),
        span: sp(),
    }
}

pub fn ty_fn(ret: TypeExpr, params: Vec<TypeExpr>) -> TypeExpr {
    TypeExpr {
        kind: TypeExprKind::Function {
            ret: Box::new(ret),
            params,
        },
        span: sp(),
    }
}

pub fn param(name: &str, ty: TypeExpr) -> Param {
    Param {
        ident: ident(name),
        ty,
        span: sp(),
    }
}

pub fn int(value: i64) -> Expr {
    Expr::Int(IntLit { value, span: sp() })
}

pub fn id(name: &str) -> Expr {
    Expr::Id(IdExpr {
        id: ConstId::plain(name),
        span: sp(),
    })
}

pub fn assign(target: &str, value: Expr) -> Expr {
    Expr::Assign(Box::new(AssignExpr {
        op: AssignOp::Assign,
        target: id(target),
        value,
        span: sp(),
    }))
}

pub fn bin(op: BinOp, left: Expr, right: Expr) -> Expr {
    Expr::Bin(Box::new(BinExpr {
        op,
        left,
        right,
        span: sp(),
    }))
}

pub fn call(callee: Expr, args: Vec<Expr>) -> Expr {
    Expr::Call(Box::new(CallExpr {
        callee,
        args,
        span: sp(),
    }))
}

pub fn lambda(params: Vec<Param>, body: Stmt) -> Expr {
    Expr::Lambda(Box::new(LambdaExpr {
        params,
        body,
        span: sp(),
    }))
}

pub fn index(object: Expr, ix: Expr) -> Expr {
    Expr::Index(Box::new(IndexExpr {
        object,
        index: ix,
        span: sp(),
    }))
}

pub fn expr_stmt(expr: Expr) -> Stmt {
    Stmt::Expr(ExprStmt { expr, span: sp() })
}

pub fn decl(name: &str, ty: TypeExpr, init: Option<Expr>) -> Stmt {
    Stmt::Decl(DeclStmt {
        ident: ident(name),
        ty,
        init,
        span: sp(),
    })
}

pub fn ret_stmt(arg: Option<Expr>) -> Stmt {
    Stmt::Return(ReturnStmt { arg, span: sp() })
}

pub fn block(stmts: Vec<Stmt>) -> Stmt {
    Stmt::Block(BlockStmt { stmts, span: sp() })
}

pub fn if_stmt(test: Expr, cons: Stmt, alt: Option<Stmt>) -> Stmt {
    Stmt::If(IfStmt {
        test,
        cons: Box::new(cons),
        alt: alt.map(Box::new),
        span: sp(),
    })
}

pub fn while_stmt(test: Expr, body: Stmt) -> Stmt {
    Stmt::While(WhileStmt {
        test,
        body: Box::new(body),
        span: sp(),
    })
}

pub fn for_stmt(
    init: Option<Stmt>,
    test: Option<Expr>,
    update: Option<Expr>,
    body: Stmt,
) -> Stmt {
    Stmt::For(Box::new(ForStmt {
        init: init.map(Box::new),
        test,
        update,
        body: Box::new(body),
        span: sp(),
    }))
}

pub fn brk() -> Stmt {
    Stmt::Break(BreakStmt { span: sp() })
}

pub fn func(name: &str, ret: TypeExpr, params: Vec<Param>, body: Vec<Stmt>) -> Definition {
    Definition::Function(FnDef {
        ident: ident(name),
        return_type: ret,
        params,
        body,
        span: sp(),
    })
}

pub fn class_def(name: &str, body: Vec<Definition>) -> Definition {
    Definition::Class(ClassDef {
        ident: ident(name),
        params: vec![],
        body,
        span: sp(),
    })
}

pub fn var_def(ty: TypeExpr, names: &[&str]) -> Definition {
    Definition::Variable(VarDef {
        ty,
        names: names.iter().map(|n| ident(n)).collect(),
        span: sp(),
    })
}

pub fn import_def(path: &str) -> Definition {
    Definition::Import(ImportDef {
        path: path.to_string(),
        span: sp(),
    })
}

/// Every block ends in exactly one terminator and none appears mid-block.
pub fn assert_well_formed(f: &rye::ir::Function) {
    for block in &f.blocks {
        assert!(
            !block.stmts.is_empty(),
            "block L{} of @{} is empty",
            block.label,
            f.name
        );
        for (i, stmt) in block.stmts.iter().enumerate() {
            let last = i == block.stmts.len() - 1;
            assert_eq!(
                stmt.is_terminator(),
                last,
                "block L{} of @{} has a misplaced terminator",
                block.label,
                f.name
            );
        }
    }
}

/// Every SSA name in the function is assigned exactly once.
pub fn assert_ssa_unique(f: &rye::ir::Function) {
    let mut seen: Vec<&str> = f.params.iter().map(|(_, n)| n.as_str()).collect();
    for block in &f.blocks {
        for stmt in &block.stmts {
            if let rye::ir::Stmt::Assign { dst, .. } = stmt {
                assert!(
                    !seen.contains(&dst.as_str()),
                    "SSA name %{} assigned twice in @{}",
                    dst,
                    f.name
                );
                seen.push(dst);
            }
        }
    }
}
