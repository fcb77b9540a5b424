//! Undefined names in `{% if %}` conditions.
//!
//! Tera rejects an undefined name in a `{{ }}` block but evaluates it as
//! false in a condition. After a template is parsed, every bare identifier
//! used as a condition (alone or under `and`/`or`/`not`) is rewritten into a
//! call of the [`TESTER`] tester, which fails when the name does not resolve.
//! Explicit tests such as `x is defined` are left alone.

use tera::ast::{Expr, ExprVal, Forloop, If, LogicExpr, LogicOperator, Node, Test};
use tera::{Tera, Value};

pub(super) const TESTER: &str = "defined_truthy";

pub(super) fn register(tera: &mut Tera) {
    tera.register_tester(TESTER, defined_truthy);
}

/// Rewrite the conditions of the already added template `name`.
pub(super) fn harden(tera: &mut Tera, name: &str) {
    if let Some(template) = tera.templates.get_mut(name) {
        harden_nodes(&mut template.ast);
        for def in template.macros.values_mut() {
            harden_nodes(&mut def.body);
        }
    }
}

fn harden_nodes(nodes: &mut [Node]) {
    for node in nodes {
        match node {
            Node::If(If { conditions, otherwise }, _) => {
                for (_, expr, body) in conditions.iter_mut() {
                    harden_condition(expr);
                    harden_nodes(body);
                }
                if let Some((_, body)) = otherwise {
                    harden_nodes(body);
                }
            }
            Node::Forloop(_, Forloop { body, empty_body, .. }, _) => {
                harden_nodes(body);
                if let Some(body) = empty_body {
                    harden_nodes(body);
                }
            }
            Node::Block(_, block, _) => harden_nodes(&mut block.body),
            Node::FilterSection(_, section, _) => harden_nodes(&mut section.body),
            Node::MacroDefinition(_, def, _) => harden_nodes(&mut def.body),
            _ => {}
        }
    }
}

fn harden_condition(expr: &mut Expr) {
    let filtered = !expr.filters.is_empty();
    match &mut expr.val {
        ExprVal::Ident(ident) if !filtered => {
            let ident = std::mem::take(ident);
            let name = Expr::new(ExprVal::String(ident.clone()));
            expr.val = ExprVal::Test(Test {
                ident,
                negated: false,
                name: TESTER.to_string(),
                args: vec![name],
            });
        }
        ExprVal::Logic(LogicExpr {
            lhs,
            rhs,
            operator: LogicOperator::And | LogicOperator::Or,
        }) => {
            harden_condition(lhs);
            harden_condition(rhs);
        }
        _ => {}
    }
}

/// Truthiness of a defined value; an error when the name did not resolve.
fn defined_truthy(value: Option<&Value>, args: &[Value]) -> tera::Result<bool> {
    let Some(value) = value else {
        let name = args.first().and_then(Value::as_str).unwrap_or("<unknown>");
        return Err(tera::Error::msg(format!(
            "variable `{name}` used in a condition is not defined"
        )));
    };
    Ok(match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    })
}
