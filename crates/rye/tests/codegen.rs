//! Straight-line lowering: functions, locals, binary operators, calls,
//! branches, and the textual rendering.

mod common;

use anyhow::Result;
use common::*;
use rye::ir;
use rye_ast::BinOp;

#[test]
fn identity_function_returns_its_argument() -> Result<()> {
    let program = vec![func(
        "id",
        ty_int(),
        vec![param("x", ty_int())],
        vec![ret_stmt(Some(id("x")))],
    )];
    let module = rye::compile_program(&program).expect("identity function compiles");

    let f = module.function("id").expect("id is emitted");
    assert_eq!(f.ret, ir::Type::I32);
    assert_eq!(f.params, vec![(ir::Type::I32, "x".to_string())]);
    assert_eq!(f.gc.as_deref(), Some("shadow-stack"));
    assert_eq!(f.blocks.len(), 1, "one straight-line block");
    assert_eq!(
        f.blocks[0].stmts,
        vec![ir::Stmt::Ret {
            value: Some((ir::Type::I32, ir::Value::Local("x".to_string())))
        }]
    );
    assert_well_formed(f);
    Ok(())
}

#[test]
fn addition_with_local_stays_in_registers() -> Result<()> {
    // int f(int a, int b) { int c = a + b; return c; }
    let program = vec![func(
        "f",
        ty_int(),
        vec![param("a", ty_int()), param("b", ty_int())],
        vec![
            decl("c", ty_int(), Some(bin(BinOp::Add, id("a"), id("b")))),
            ret_stmt(Some(id("c"))),
        ],
    )];
    let module = rye::compile_program(&program).expect("compiles");

    let f = module.function("f").expect("f is emitted");
    assert_eq!(f.blocks.len(), 1);
    let stmts = &f.blocks[0].stmts;
    assert_eq!(stmts.len(), 2, "one add, one return, nothing else");

    let ir::Stmt::Assign {
        dst,
        expr: ir::Expr::Add { ty, lhs, rhs },
    } = &stmts[0]
    else {
        panic!("first statement should be the addition, got {:?}", stmts[0]);
    };
    assert_eq!(*ty, ir::Type::I32);
    assert_eq!(*lhs, ir::Value::Local("a".to_string()));
    assert_eq!(*rhs, ir::Value::Local("b".to_string()));

    // The local is a pure SSA rename: the return reads the add result
    // directly, with no load or store anywhere.
    assert_eq!(
        stmts[1],
        ir::Stmt::Ret {
            value: Some((ir::Type::I32, ir::Value::Local(dst.clone())))
        }
    );
    assert_well_formed(f);
    assert_ssa_unique(f);
    Ok(())
}

#[test]
fn calls_use_fastcc_and_typed_arguments() -> Result<()> {
    let program = vec![
        func(
            "add1",
            ty_int(),
            vec![param("x", ty_int())],
            vec![ret_stmt(Some(bin(BinOp::Add, id("x"), int(1))))],
        ),
        func(
            "call_it",
            ty_int(),
            vec![],
            vec![ret_stmt(Some(call(id("add1"), vec![int(41)])))],
        ),
    ];
    let module = rye::compile_program(&program).expect("compiles");

    let f = module.function("call_it").expect("call_it is emitted");
    let call_stmt = f.blocks[0]
        .stmts
        .iter()
        .find_map(|s| match s {
            ir::Stmt::Assign {
                dst,
                expr: ir::Expr::Call { ret, callee, args },
            } => Some((dst, ret, callee, args)),
            _ => None,
        })
        .expect("a call is emitted");
    let (dst, ret, callee, args) = call_stmt;
    assert_eq!(*ret, ir::Type::I32);
    assert_eq!(*callee, ir::Value::Global("add1".to_string()));
    assert_eq!(
        *args,
        vec![(
            ir::Type::I32,
            ir::Value::ConstInt {
                ty: ir::Type::I32,
                value: 41
            }
        )]
    );
    assert_eq!(
        *f.blocks[0].stmts.last().unwrap(),
        ir::Stmt::Ret {
            value: Some((ir::Type::I32, ir::Value::Local(dst.clone())))
        }
    );
    Ok(())
}

#[test]
fn integer_literal_narrows_to_double_under_float_expectation() -> Result<()> {
    let program = vec![func(
        "half",
        ty_float(),
        vec![],
        vec![ret_stmt(Some(int(2)))],
    )];
    let module = rye::compile_program(&program).expect("compiles");

    let f = module.function("half").expect("half is emitted");
    assert_eq!(f.ret, ir::Type::F64);
    assert_eq!(
        f.blocks[0].stmts,
        vec![ir::Stmt::Ret {
            value: Some((ir::Type::F64, ir::Value::ConstFloat(2.0)))
        }]
    );
    Ok(())
}

#[test]
fn void_function_gets_implicit_return() -> Result<()> {
    let program = vec![func("noop", ty_void(), vec![], vec![])];
    let module = rye::compile_program(&program).expect("compiles");

    let f = module.function("noop").expect("noop is emitted");
    assert_eq!(f.ret, ir::Type::Void);
    assert_eq!(f.blocks.len(), 1);
    assert_eq!(f.blocks[0].stmts, vec![ir::Stmt::Ret { value: None }]);
    Ok(())
}

#[test]
fn if_statement_branches_to_side_entries() -> Result<()> {
    // int max(int a, int b) { if (a < b) return b; return a; }
    let program = vec![func(
        "max",
        ty_int(),
        vec![param("a", ty_int()), param("b", ty_int())],
        vec![
            if_stmt(
                bin(BinOp::Lt, id("a"), id("b")),
                ret_stmt(Some(id("b"))),
                None,
            ),
            ret_stmt(Some(id("a"))),
        ],
    )];
    let module = rye::compile_program(&program).expect("compiles");

    let f = module.function("max").expect("max is emitted");
    assert_well_formed(f);
    assert_ssa_unique(f);

    let (then_label, else_label) = f
        .blocks
        .iter()
        .find_map(|b| match b.terminator() {
            Some(ir::Stmt::BrIf {
                then_label,
                else_label,
                ..
            }) => Some((*then_label, *else_label)),
            _ => None,
        })
        .expect("the condition block ends in a conditional branch");

    let block = |label| f.blocks.iter().find(|b| b.label == label).expect("target");
    assert_eq!(
        block(then_label).stmts,
        vec![ir::Stmt::Ret {
            value: Some((ir::Type::I32, ir::Value::Local("b".to_string())))
        }]
    );
    assert_eq!(
        *block(else_label).stmts.last().unwrap(),
        ir::Stmt::Ret {
            value: Some((ir::Type::I32, ir::Value::Local("a".to_string())))
        }
    );
    Ok(())
}

#[test]
fn empty_if_sides_fall_through_to_the_end_block() -> Result<()> {
    let program = vec![func(
        "f",
        ty_int(),
        vec![param("a", ty_int()), param("b", ty_int())],
        vec![
            if_stmt(bin(BinOp::Lt, id("a"), id("b")), block(vec![]), None),
            ret_stmt(Some(id("a"))),
        ],
    )];
    let module = rye::compile_program(&program).expect("compiles");

    let f = module.function("f").expect("f is emitted");
    let (then_label, else_label) = f
        .blocks
        .iter()
        .find_map(|b| match b.terminator() {
            Some(ir::Stmt::BrIf {
                then_label,
                else_label,
                ..
            }) => Some((*then_label, *else_label)),
            _ => None,
        })
        .expect("conditional branch emitted");
    assert_eq!(
        then_label, else_label,
        "both sides of an empty if fall through to the same end block"
    );
    assert_well_formed(f);
    Ok(())
}

#[test]
fn rendering_is_assembler_shaped() -> Result<()> {
    let program = vec![func(
        "id",
        ty_int(),
        vec![param("x", ty_int())],
        vec![ret_stmt(Some(id("x")))],
    )];
    let module = rye::compile_program(&program).expect("compiles");

    let text = module.to_string();
    assert!(
        text.contains("define fastcc i32 @id(i32 %x) gc \"shadow-stack\" {"),
        "function header missing from rendering:\n{}",
        text
    );
    assert!(text.contains("ret i32 %x"), "return missing:\n{}", text);
    Ok(())
}

#[test]
fn compilation_is_deterministic() -> Result<()> {
    let program = vec![
        var_def(ty_int(), &["g"]),
        func(
            "sum",
            ty_int(),
            vec![param("n", ty_int())],
            vec![
                decl("s", ty_int(), Some(int(0))),
                for_stmt(
                    Some(decl("i", ty_int(), Some(int(0)))),
                    Some(bin(BinOp::Lt, id("i"), id("n"))),
                    Some(assign("i", bin(BinOp::Add, id("i"), int(1)))),
                    expr_stmt(assign("s", bin(BinOp::Add, id("s"), id("i")))),
                ),
                ret_stmt(Some(id("s"))),
            ],
        ),
    ];
    let first = rye::compile_program(&program).expect("compiles");
    let second = rye::compile_program(&program).expect("compiles again");
    assert_eq!(
        first.to_string(),
        second.to_string(),
        "two runs over the same AST must emit identical modules"
    );
    Ok(())
}
