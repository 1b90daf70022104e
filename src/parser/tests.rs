// ABOUTME: Parser unit tests — precedence, patterns, tags, error recovery

use super::*;
use crate::ast::*;

fn program(src: &str) -> Vec<Stmt> {
    match parse(src) {
        Ok(stmts) => stmts,
        Err(errors) => panic!("parse failed for {src:?}: {errors:?}"),
    }
}

fn single_expr(src: &str) -> Expr {
    let mut stmts = program(src);
    assert_eq!(stmts.len(), 1, "expected one statement from {src:?}");
    match stmts.remove(0) {
        Stmt::Expr { expr, .. } => expr,
        other => panic!("expected expression statement, got {other:?}"),
    }
}

/// Render an expression back to a compact prefix form for shape assertions.
fn shape(expr: &Expr) -> String {
    match expr {
        Expr::Int { value, .. } => value.to_string(),
        Expr::Float { value, .. } => value.to_string(),
        Expr::Str { value, .. } => format!("\"{value}\""),
        Expr::Bool { value, .. } => value.to_string(),
        Expr::Null { .. } => "null".to_string(),
        Expr::Ident { name, .. } => name.clone(),
        Expr::Prefix { op, right, .. } => {
            let op = match op {
                PrefixOp::Neg => "-",
                PrefixOp::Not => "!",
            };
            format!("({op} {})", shape(right))
        }
        Expr::Infix {
            op, left, right, ..
        } => format!("({op:?} {} {})", shape(left), shape(right)),
        Expr::Call { callee, args, .. } => {
            let args: Vec<_> = args.iter().map(shape).collect();
            format!("(call {} [{}])", shape(callee), args.join(" "))
        }
        Expr::Member {
            object, property, ..
        } => format!("(member {} {property})", shape(object)),
        Expr::Index { object, index, .. } => {
            format!("(index {} {})", shape(object), shape(index))
        }
        other => format!("{:?}", std::mem::discriminant(other)),
    }
}

#[test]
fn test_precedence_ladder() {
    assert_eq!(shape(&single_expr("1 + 2 * 3")), "(Add 1 (Mul 2 3))");
    assert_eq!(
        shape(&single_expr("1 < 2 == true")),
        "(Eq (Lt 1 2) true)"
    );
    assert_eq!(
        shape(&single_expr("a or b and c")),
        "(Or a (And b c))"
    );
    assert_eq!(
        shape(&single_expr("1 + 2 ++ 3 * 4")),
        "(Concat (Add 1 2) (Mul 3 4))"
    );
    assert_eq!(shape(&single_expr("-a * b")), "(Mul (- a) b)");
    assert_eq!(
        shape(&single_expr("a ?? b or c")),
        "(Or (Coalesce a b) c)"
    );
}

#[test]
fn test_postfix_chain() {
    assert_eq!(
        shape(&single_expr("a.b.c(1)[2]")),
        "(index (call (member (member a b) c) [1]) 2)"
    );
}

#[test]
fn test_compound_not_in_and_is_not() {
    assert_eq!(shape(&single_expr("a not in b")), "(NotIn a b)");
    assert_eq!(shape(&single_expr("a is not b")), "(IsNot a b)");
    assert_eq!(shape(&single_expr("a in b")), "(In a b)");
    assert_eq!(shape(&single_expr("r is User")), "(Is r User)");
}

#[test]
fn test_write_operators_bind_loosest() {
    let Expr::WriteFile { mode, value, .. } = single_expr("a + b ==> @./out.txt") else {
        panic!("expected write node");
    };
    assert_eq!(mode, WriteMode::Write);
    assert_eq!(shape(&value), "(Add a b)");
}

#[test]
fn test_db_operators() {
    let Expr::Db { op, .. } = single_expr("\"SELECT 1\" <=??=> db") else {
        panic!("expected db node");
    };
    assert_eq!(op, DbOp::QueryMany);
}

#[test]
fn test_let_and_destructuring_patterns() {
    let stmts = program("let [a, b, ...rest] = xs");
    let Stmt::Let { pattern, .. } = &stmts[0] else {
        panic!("expected let");
    };
    let Pattern::Array { items, rest } = pattern else {
        panic!("expected array pattern");
    };
    assert_eq!(items.len(), 2);
    assert_eq!(rest.as_deref(), Some("rest"));

    let stmts = program("let {a, b: [x], c as other, ...more} = d");
    let Stmt::Let { pattern, .. } = &stmts[0] else {
        panic!("expected let");
    };
    let Pattern::Dict { fields, rest } = pattern else {
        panic!("expected dict pattern");
    };
    assert_eq!(fields.len(), 3);
    assert_eq!(fields[2].alias.as_deref(), Some("other"));
    assert!(fields[1].nested.is_some());
    assert_eq!(rest.as_deref(), Some("more"));
}

#[test]
fn test_destructuring_assignment_statement() {
    let stmts = program("{result, error} = try f()");
    let Stmt::Assign { target, .. } = &stmts[0] else {
        panic!("expected assignment, got {:?}", stmts[0]);
    };
    assert!(matches!(target, AssignTarget::Pattern(_)));
}

#[test]
fn test_dict_literal_statement_still_parses() {
    let expr = single_expr("{a: 1, b: 2}");
    let Expr::Dict { entries, .. } = expr else {
        panic!("expected dict literal");
    };
    assert_eq!(entries.len(), 2);
}

#[test]
fn test_member_and_index_assignment() {
    let stmts = program("a.b = 1; xs[0] = 2");
    assert!(matches!(
        &stmts[0],
        Stmt::Assign {
            target: AssignTarget::Member { .. },
            ..
        }
    ));
    assert!(matches!(
        &stmts[1],
        Stmt::Assign {
            target: AssignTarget::Index { .. },
            ..
        }
    ));
}

#[test]
fn test_function_literal_params() {
    let Expr::Function { params, .. } =
        single_expr("fn(a, b = 2, {c}, ...rest) { a }")
    else {
        panic!("expected function");
    };
    assert_eq!(params.len(), 4);
    assert!(params[1].default.is_some());
    assert!(matches!(params[2].pattern, Pattern::Dict { .. }));
    assert!(params[3].rest);
}

#[test]
fn test_if_forms() {
    // Paren-free requires a block.
    let Expr::If { alternative, .. } = single_expr("if x { 1 } else { 2 }") else {
        panic!("expected if");
    };
    assert!(alternative.is_some());

    // Parenthesised admits a bare-expression body.
    let Expr::If {
        consequence,
        alternative,
        ..
    } = single_expr("if (x) 1 else 2")
    else {
        panic!("expected if");
    };
    assert_eq!(consequence.len(), 1);
    assert!(alternative.is_some());

    // Paren-free with a bare expression is an error.
    assert!(parse("if x 1 else 2").is_err());
}

#[test]
fn test_for_iteration_forms() {
    let Expr::For { key, value, .. } = single_expr("for x in xs { x }") else {
        panic!("expected for");
    };
    assert!(key.is_none());
    assert!(matches!(value, Pattern::Name(_)));

    let Expr::For { key, .. } = single_expr("for (k, v in d) { k }") else {
        panic!("expected for");
    };
    assert!(key.is_some());
}

#[test]
fn test_for_mapping_form() {
    let Expr::ForMap { mapper, .. } = single_expr("for (xs) double") else {
        panic!("expected mapping for");
    };
    assert_eq!(shape(&mapper), "double");
}

#[test]
fn test_try_requires_a_call() {
    assert!(matches!(single_expr("try f()"), Expr::Try { .. }));
    assert!(matches!(single_expr("try a.b(1)"), Expr::Try { .. }));
    assert!(parse("try 42").is_err());
}

#[test]
fn test_check_statement() {
    let stmts = program("check user else fail(\"missing\")");
    assert!(matches!(&stmts[0], Stmt::Check { .. }));
}

#[test]
fn test_export_forms() {
    let stmts = program("export greeting = \"hi\"\nexport default = layout\nexport fn render() { 1 }");
    assert!(matches!(
        &stmts[0],
        Stmt::Export {
            name: ExportName::Named(_),
            ..
        }
    ));
    assert!(matches!(
        &stmts[1],
        Stmt::Export {
            name: ExportName::Default,
            ..
        }
    ));
    assert!(matches!(
        &stmts[2],
        Stmt::Export {
            name: ExportName::Named(_),
            ..
        }
    ));
}

#[test]
fn test_import_statement() {
    let stmts = program("import @./lib/util.sl as util");
    let Stmt::Import { alias, .. } = &stmts[0] else {
        panic!("expected import");
    };
    assert_eq!(alias.as_deref(), Some("util"));
}

#[test]
fn test_module_ref_expression() {
    let Expr::ModuleRef { path, .. } = single_expr("@std/math") else {
        panic!("expected module ref");
    };
    assert_eq!(path, "std/math");
}

#[test]
fn test_tag_with_attributes_and_children() {
    let Expr::Tag { node, .. } =
        single_expr("<div class={ \"a \" + \"b\" } hidden><p>\"hello\"</p></div>")
    else {
        panic!("expected tag");
    };
    assert_eq!(node.name, "div");
    assert_eq!(node.attrs.len(), 2);
    assert!(matches!(node.attrs[0], TagAttr::Expr { .. }));
    assert!(matches!(node.attrs[1], TagAttr::Bare(_)));
    assert_eq!(node.children.len(), 1);
    let TagChild::Tag(p) = &node.children[0] else {
        panic!("expected nested tag");
    };
    assert_eq!(p.name, "p");
}

#[test]
fn test_tag_spread_attribute() {
    let Expr::Tag { node, .. } = single_expr("<a {...props}>x</a>") else {
        panic!("expected tag");
    };
    assert!(matches!(node.attrs[0], TagAttr::Spread(_)));
}

#[test]
fn test_singleton_must_self_close() {
    assert!(matches!(single_expr("<br/>"), Expr::Tag { .. }));
    let errors = parse("<br></br>").unwrap_err();
    assert_eq!(errors[0].code, "PARSE-0005");
}

#[test]
fn test_mismatched_close_tag() {
    let errors = parse("<div>x</span>").unwrap_err();
    assert_eq!(errors[0].code, "PARSE-0008");
}

#[test]
fn test_fragment() {
    let Expr::Tag { node, .. } = single_expr("<><p>a</p><p>b</p></>") else {
        panic!("expected fragment");
    };
    assert!(node.name.is_empty());
    assert_eq!(node.children.len(), 2);
}

#[test]
fn test_slice_forms() {
    assert!(matches!(
        single_expr("xs[1..3]"),
        Expr::Slice {
            start: Some(_),
            end: Some(_),
            ..
        }
    ));
    assert!(matches!(
        single_expr("xs[1..]"),
        Expr::Slice {
            start: Some(_),
            end: None,
            ..
        }
    ));
    assert!(matches!(
        single_expr("xs[..3]"),
        Expr::Slice {
            start: None,
            end: Some(_),
            ..
        }
    ));
}

#[test]
fn test_optional_index() {
    let Expr::Index { optional, .. } = single_expr("xs[?5]") else {
        panic!("expected index");
    };
    assert!(optional);
}

#[test]
fn test_schema_declaration() {
    let Expr::SchemaDecl { name, fields, .. } =
        single_expr("@schema User { name: string.required(), age: int.min(0) }")
    else {
        panic!("expected schema declaration");
    };
    assert_eq!(name, "User");
    assert_eq!(fields.len(), 2);
}

#[test]
fn test_query_dsl() {
    let Expr::QueryDsl {
        verb,
        source,
        clauses,
        ..
    } = single_expr("@query(users) { orderBy: \"name\", limit: 10 }")
    else {
        panic!("expected query dsl");
    };
    assert_eq!(verb, "query");
    assert!(source.is_some());
    assert_eq!(clauses.len(), 2);
}

#[test]
fn test_error_recovery_accumulates() {
    let errors = parse("let = 3\nlet ok = 1\nlet } = 2").unwrap_err();
    assert!(errors.len() >= 2, "expected multiple errors, got {errors:?}");
    for err in &errors {
        assert!(err.line.is_some());
        assert!(err.column.is_some());
    }
}

#[test]
fn test_interpolation_sub_parse() {
    let Expr::Interp { pieces, .. } = single_expr("`total: {n * 2}`") else {
        panic!("expected interpolated string");
    };
    assert_eq!(pieces.len(), 2);
    let Piece::Expr(inner) = &pieces[1] else {
        panic!("expected expression piece");
    };
    assert_eq!(shape(inner), "(Mul n 2)");
}

#[test]
fn test_bad_interpolation_reports_outer_position() {
    let errors = parse("let x = `a {1 +} b`").unwrap_err();
    assert_eq!(errors[0].line, Some(1));
}

#[test]
fn test_newline_call_does_not_continue_expression() {
    // `[` on a fresh line begins a new statement.
    let stmts = program("let a = b\n[1, 2]");
    assert_eq!(stmts.len(), 2);
}

#[test]
fn test_read_operator() {
    assert!(matches!(single_expr("<== @./notes.txt"), Expr::Read { .. }));
}

#[test]
fn test_connection_literal() {
    let Expr::ConnLit { driver, target, .. } = single_expr("@sqlite(@./data.db)") else {
        panic!("expected connection literal");
    };
    assert_eq!(driver, "sqlite");
    assert!(target.is_some());
}

#[test]
fn test_statement_keyword_tokens() {
    let stmts = program("stop; skip; return 1");
    assert!(matches!(stmts[0], Stmt::Stop { .. }));
    assert!(matches!(stmts[1], Stmt::Skip { .. }));
    assert!(matches!(stmts[2], Stmt::Return { value: Some(_), .. }));
}
