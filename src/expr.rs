//! Filter expressions.
//!
//! Predicates are written in the Common Expression Language and run by
//! `cel-interpreter`. This module declares the variables a predicate may use
//! (one per schema column, typed after the column kind), compiles predicate
//! strings against that declaration and evaluates them row by row.
//!
//! The interpreter itself is untyped. Comparisons between a column and an
//! operand of another type are rejected at compile time here, since they
//! would otherwise evaluate to `false` on every row.

use bitvec::prelude::*;
use cel_interpreter::{Context, Program, Value as CelValue};
use cel_parser::{Atom, Expression, Member, RelationOp};
use rustc_hash::FxHashSet;

use crate::data_type::BaseKind;
use crate::error::EvaluationError;
use crate::schema::Schema;
use crate::value::Value;

/// A variable a predicate may reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub name: String,
    pub kind: BaseKind,
}

impl Declaration {
    /// Expression-language type of the variable.
    pub fn expr_type(&self) -> &'static str {
        self.kind.expr_type().unwrap_or("dyn")
    }
}

/// The declared variables of a table, one per schema column in schema order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    declarations: Vec<Declaration>,
}

impl Environment {
    /// Declares one variable per supported column of `schema`.
    pub fn from_schema(schema: &Schema) -> Self {
        let declarations = schema
            .columns
            .iter()
            .filter(|column| column.kind.is_supported())
            .map(|column| Declaration {
                name: column.name.clone(),
                kind: column.kind,
            })
            .collect();
        Self { declarations }
    }

    pub fn declarations(&self) -> &[Declaration] {
        &self.declarations
    }

    pub fn is_declared(&self, name: &str) -> bool {
        self.declaration(name).is_some()
    }

    pub fn declaration(&self, name: &str) -> Option<&Declaration> {
        self.declarations.iter().find(|decl| decl.name == name)
    }

    /// Compiles `expression` against the declared variables.
    ///
    /// Variables bound by comprehension macros (`all`, `exists`,
    /// `exists_one`, `map`, `filter`) need no declaration.
    ///
    /// # Errors
    /// Returns [EvaluationError::Compile] if the expression does not parse,
    /// references a variable that is not declared, or compares a column with
    /// an operand of another type.
    pub fn compile(&self, expression: &str) -> Result<Predicate, EvaluationError> {
        let compile_error = |reason: String| EvaluationError::Compile {
            expression: expression.to_string(),
            reason,
        };
        let program =
            Program::compile(expression).map_err(|err| compile_error(err.to_string()))?;
        let ast =
            cel_parser::parse(expression).map_err(|err| compile_error(err.to_string()))?;

        let mut bound = FxHashSet::default();
        bound_variables(&ast, &mut bound);

        if let Some(name) = program
            .references()
            .variables()
            .into_iter()
            .find(|name| !bound.contains(*name) && !self.is_declared(name))
        {
            return Err(compile_error(format!("undeclared reference to '{name}'")));
        }

        self.check_comparisons(&ast, &bound).map_err(compile_error)?;

        Ok(Predicate {
            expression: expression.to_string(),
            program,
        })
    }
}

const COMPREHENSIONS: [&str; 5] = ["all", "exists", "exists_one", "map", "filter"];

impl Environment {
    /// Rejects `==`, `!=`, `<`, `<=`, `>`, `>=` between operands of known,
    /// incompatible types. Numbers of any kind compare with each other.
    fn check_comparisons(
        &self,
        expr: &Expression,
        bound: &FxHashSet<String>,
    ) -> Result<(), String> {
        if let Expression::Relation(left, op, right) = expr {
            let symbol = match op {
                RelationOp::Equals => Some("=="),
                RelationOp::NotEquals => Some("!="),
                RelationOp::LessThan => Some("<"),
                RelationOp::LessThanEq => Some("<="),
                RelationOp::GreaterThan => Some(">"),
                RelationOp::GreaterThanEq => Some(">="),
                RelationOp::In => None,
            };
            if let (Some(symbol), Some(lhs), Some(rhs)) = (
                symbol,
                self.operand_type(left, bound),
                self.operand_type(right, bound),
            ) && !comparable(lhs, rhs)
            {
                return Err(format!(
                    "found no matching overload for '{symbol}' applied to '({lhs}, {rhs})'"
                ));
            }
        }
        children(expr)
            .into_iter()
            .try_for_each(|child| self.check_comparisons(child, bound))
    }

    /// Static type of an operand, when it is a column, a literal or a
    /// `timestamp(...)` call.
    fn operand_type(&self, expr: &Expression, bound: &FxHashSet<String>) -> Option<&'static str> {
        match expr {
            Expression::Ident(name) if !bound.contains(name.as_str()) => {
                self.declaration(name).map(Declaration::expr_type)
            }
            Expression::Atom(atom) => Some(literal_type(atom)),
            Expression::Unary(_, inner) => match inner.as_ref() {
                Expression::Atom(atom) => Some(literal_type(atom)),
                _ => None,
            },
            Expression::FunctionCall(function, None, _) => match function.as_ref() {
                Expression::Ident(name) if name.as_str() == "timestamp" => Some("timestamp"),
                Expression::Ident(name) if name.as_str() == "duration" => Some("duration"),
                _ => None,
            },
            _ => None,
        }
    }
}

fn literal_type(atom: &Atom) -> &'static str {
    match atom {
        Atom::Int(_) => "int",
        Atom::UInt(_) => "uint",
        Atom::Float(_) => "double",
        Atom::String(_) => "string",
        Atom::Bytes(_) => "bytes",
        Atom::Bool(_) => "bool",
        Atom::Null => "null_type",
    }
}

fn comparable(lhs: &str, rhs: &str) -> bool {
    let numeric = |ty: &str| matches!(ty, "int" | "uint" | "double");
    lhs == rhs || (numeric(lhs) && numeric(rhs))
}

/// Collects the variables bound by comprehension macros, such as `p` in
/// `list.exists(p, p > 1)`.
fn bound_variables(expr: &Expression, bound: &mut FxHashSet<String>) {
    if let Expression::FunctionCall(function, _, args) = expr
        && let Expression::Ident(name) = function.as_ref()
        && COMPREHENSIONS.contains(&name.as_str())
        && let Some(Expression::Ident(variable)) = args.first()
    {
        bound.insert(variable.to_string());
    }
    for child in children(expr) {
        bound_variables(child, bound);
    }
}

fn children(expr: &Expression) -> Vec<&Expression> {
    match expr {
        Expression::Arithmetic(left, _, right)
        | Expression::Relation(left, _, right)
        | Expression::Or(left, right)
        | Expression::And(left, right) => vec![&**left, &**right],
        Expression::Ternary(cond, then, otherwise) => vec![&**cond, &**then, &**otherwise],
        Expression::Unary(_, inner) => vec![&**inner],
        Expression::Member(target, member) => {
            let mut children = vec![&**target];
            if let Member::Index(index) = member.as_ref() {
                children.push(&**index);
            }
            children
        }
        Expression::FunctionCall(function, target, args) => {
            let mut children = vec![&**function];
            children.extend(target.as_deref());
            children.extend(args);
            children
        }
        Expression::List(items) => items.iter().collect(),
        Expression::Map(entries) => entries.iter().flat_map(|(k, v)| [k, v]).collect(),
        Expression::Atom(_) | Expression::Ident(_) => vec![],
    }
}

/// A compiled filter expression.
pub struct Predicate {
    expression: String,
    program: Program,
}

impl Predicate {
    /// Source text of the predicate.
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Evaluates the predicate once per row and returns which rows matched.
    ///
    /// Each row holds one value per declaration of `env`, in the same order.
    /// The first failing row aborts the evaluation.
    ///
    /// # Errors
    /// - [EvaluationError::Execution] if the engine fails on a row.
    /// - [EvaluationError::NotBoolean] if a row yields a non-boolean result.
    pub fn matches<I>(&self, env: &Environment, rows: I) -> Result<BitVec, EvaluationError>
    where
        I: IntoIterator<Item = Vec<Value>>,
    {
        let mut context = Context::default();
        let mut matched = BitVec::new();

        for row in rows {
            for (decl, value) in env.declarations.iter().zip(row) {
                context.add_variable_from_value(decl.name.clone(), to_cel(value));
            }

            let result = self
                .program
                .execute(&context)
                .map_err(|err| EvaluationError::Execution {
                    expression: self.expression.clone(),
                    reason: err.to_string(),
                })?;

            match result {
                CelValue::Bool(hit) => matched.push(hit),
                _ => {
                    return Err(EvaluationError::NotBoolean {
                        expression: self.expression.clone(),
                    });
                }
            }
        }

        Ok(matched)
    }
}

impl std::fmt::Debug for Predicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Predicate")
            .field("expression", &self.expression)
            .finish_non_exhaustive()
    }
}

fn to_cel(value: Value) -> CelValue {
    match value {
        Value::Bool(b) => CelValue::from(b),
        Value::Int(i) => CelValue::from(i),
        Value::Uint(u) => CelValue::from(u),
        Value::Float(f) => CelValue::from(f),
        Value::Text(s) => CelValue::from(s.to_string()),
        Value::Timestamp(t) => CelValue::Timestamp(t.fixed_offset()),
        Value::Unsupported => CelValue::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{FieldInfo, TypeInfo};
    use chrono::{TimeZone, Utc};

    fn env() -> Environment {
        let info = TypeInfo::Record {
            name: "Item",
            fields: vec![
                FieldInfo::visible("id", BaseKind::Int),
                FieldInfo::visible("name", BaseKind::Text),
                FieldInfo::hidden("secret", BaseKind::Text),
                FieldInfo::visible("created", BaseKind::Timestamp),
                FieldInfo::visible("tags", BaseKind::Unsupported),
            ],
        };
        Environment::from_schema(&Schema::derive::<&str>(&info, &[]).unwrap())
    }

    fn row(id: i64, name: &str, year: i32) -> Vec<Value> {
        vec![
            Value::Int(id),
            Value::Text(name.into()),
            Value::Timestamp(Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).unwrap()),
        ]
    }

    #[test]
    fn test_declarations_follow_schema() {
        let env = env();
        let names: Vec<_> = env.declarations().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["id", "name", "created"]);
        assert_eq!(env.declarations()[0].expr_type(), "int");
        assert_eq!(env.declarations()[2].expr_type(), "timestamp");
        assert!(!env.is_declared("secret"));
        assert!(!env.is_declared("tags"));
    }

    #[test]
    fn test_compile_errors_are_returned() {
        let env = env();
        let err = env.compile("id ==").unwrap_err();
        assert!(matches!(err, EvaluationError::Compile { .. }));

        let err = env.compile("secret == \"x\"").unwrap_err();
        assert!(matches!(err, EvaluationError::Compile { .. }));
        assert!(err.to_string().contains("secret"));
    }

    #[test]
    fn test_mistyped_comparisons_are_rejected() {
        let env = env();
        for expression in [
            "id == \"1\"",
            "name == 1",
            "\"1\" != id",
            "id < true",
            "created > \"2021-01-01\"",
            "id == timestamp(\"2021-01-01T00:00:00Z\")",
            "id == 1 && (name > 2 || true)",
        ] {
            let err = env.compile(expression).unwrap_err();
            assert!(
                err.to_string().contains("no matching overload"),
                "{expression}: {err}"
            );
        }

        for expression in [
            "id == 1",
            "id == 1u",
            "id < 1.5",
            "id > -3",
            "name == \"one\"",
            "created >= timestamp(\"2021-01-01T00:00:00Z\")",
            "name in [\"one\", \"two\"]",
        ] {
            assert!(env.compile(expression).is_ok(), "{expression}");
        }
    }

    #[test]
    fn test_comprehension_variables() {
        let env = env();
        let predicate = env
            .compile("[\"tw\", \"thr\"].exists(p, name.contains(p))")
            .unwrap();
        let matched = predicate
            .matches(&env, vec![row(1, "one", 2020), row(2, "two", 2021), row(3, "three", 2022)])
            .unwrap();
        assert_eq!(matched, bitvec![0, 1, 1]);

        let predicate = env.compile("[1, 2].all(n, id > n)").unwrap();
        let matched = predicate
            .matches(&env, vec![row(1, "one", 2020), row(3, "three", 2022)])
            .unwrap();
        assert_eq!(matched, bitvec![0, 1]);

        assert!(env.compile("q > 0").is_err());
    }

    #[test]
    fn test_matches() {
        let env = env();
        let predicate = env.compile("id > 1 && name.contains(\"o\")").unwrap();
        assert_eq!(predicate.expression(), "id > 1 && name.contains(\"o\")");

        let matched = predicate
            .matches(&env, vec![row(1, "one", 2020), row(2, "two", 2021), row(3, "three", 2022)])
            .unwrap();
        assert_eq!(matched, bitvec![0, 1, 0]);
    }

    #[test]
    fn test_timestamp_comparison() {
        let env = env();
        let predicate = env
            .compile("created >= timestamp(\"2021-01-01T00:00:00Z\")")
            .unwrap();
        let matched = predicate
            .matches(&env, vec![row(1, "a", 2020), row(2, "b", 2021), row(3, "c", 2022)])
            .unwrap();
        assert_eq!(matched, bitvec![0, 1, 1]);
    }

    #[test]
    fn test_non_boolean_result() {
        let env = env();
        let predicate = env.compile("id + 1").unwrap();
        let err = predicate.matches(&env, vec![row(1, "a", 2020)]).unwrap_err();
        assert_eq!(
            err,
            EvaluationError::NotBoolean {
                expression: "id + 1".into()
            }
        );
    }

    #[test]
    fn test_no_rows() {
        let env = env();
        let predicate = env.compile("id + 1").unwrap();
        assert!(predicate.matches(&env, Vec::new()).unwrap().is_empty());
    }
}
