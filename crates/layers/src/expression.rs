//! Data-driven style values.
//!
//! A style value is either a literal or a tagged array `[op, ...args]`.
//! Supported operators are `get`, `coalesce` and `concat`; anything else
//! evaluates to "undefined" (`None`). JSON `null` is a real value
//! (`Some(Value::Null)`) and is distinct from undefined, which matters for
//! `coalesce`. Evaluation is total: it never fails.

use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Get(String),
    Coalesce(Vec<Expr>),
    Concat(Vec<Expr>),
    /// Unknown operator or malformed arguments.
    Unsupported,
}

impl Expr {
    pub fn parse(value: &Value) -> Self {
        let Value::Array(items) = value else {
            return Expr::Literal(value.clone());
        };
        let Some((op, args)) = items.split_first() else {
            return Expr::Unsupported;
        };

        match op.as_str() {
            Some("get") => match args.first() {
                Some(Value::String(key)) => Expr::Get(key.clone()),
                _ => Expr::Unsupported,
            },
            Some("coalesce") => Expr::Coalesce(args.iter().map(Expr::parse).collect()),
            Some("concat") => Expr::Concat(args.iter().map(Expr::parse).collect()),
            _ => Expr::Unsupported,
        }
    }

    pub fn eval(&self, props: &Map<String, Value>) -> Option<Value> {
        match self {
            Expr::Literal(v) => Some(v.clone()),
            Expr::Get(key) => props.get(key).cloned(),
            Expr::Coalesce(args) => args
                .iter()
                .filter_map(|e| e.eval(props))
                .find(|v| !v.is_null()),
            Expr::Concat(args) => {
                let s: String = args
                    .iter()
                    .map(|e| display_string(e.eval(props).as_ref()))
                    .collect();
                Some(Value::String(s))
            }
            Expr::Unsupported => None,
        }
    }
}

/// Parses and evaluates `expr` against a feature's properties.
pub fn eval_expr(expr: &Value, props: &Map<String, Value>) -> Option<Value> {
    Expr::parse(expr).eval(props)
}

/// String form used by `concat` and label text: undefined and null become
/// the empty string; numbers print without a trailing `.0`.
pub fn display_string(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => match n.as_f64() {
            Some(f) if n.is_f64() => format_number(f),
            _ => n.to_string(),
        },
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| display_string(Some(v)))
            .collect::<Vec<_>>()
            .join(","),
        Some(Value::Object(_)) => "[object Object]".to_string(),
    }
}

fn format_number(f: f64) -> String {
    if f.is_nan() {
        "NaN".to_string()
    } else if f.is_infinite() {
        let s = if f > 0.0 { "Infinity" } else { "-Infinity" };
        s.to_string()
    } else {
        // `Display` for f64 already omits a zero fraction.
        f.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::{Expr, display_string, eval_expr};
    use serde_json::{Map, Value, json};

    fn props(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn literal_passes_through() {
        assert_eq!(eval_expr(&json!(42), &Map::new()), Some(json!(42)));
        assert_eq!(eval_expr(&json!("#fff"), &Map::new()), Some(json!("#fff")));
        assert_eq!(eval_expr(&json!({"a": 1}), &Map::new()), Some(json!({"a": 1})));
    }

    #[test]
    fn get_reads_property_or_is_undefined() {
        let p = props(json!({"name": "A", "empty": null}));
        assert_eq!(eval_expr(&json!(["get", "name"]), &p), Some(json!("A")));
        assert_eq!(eval_expr(&json!(["get", "empty"]), &p), Some(Value::Null));
        assert_eq!(eval_expr(&json!(["get", "missing"]), &p), None);
        assert_eq!(eval_expr(&json!(["get"]), &p), None);
    }

    #[test]
    fn coalesce_skips_undefined_and_null() {
        let p = props(json!({"n": null}));
        assert_eq!(
            eval_expr(&json!(["coalesce", ["get", "missing"], null, "x"]), &Map::new()),
            Some(json!("x"))
        );
        assert_eq!(
            eval_expr(&json!(["coalesce", ["get", "n"], ["get", "m"]]), &p),
            None
        );
        assert_eq!(eval_expr(&json!(["coalesce", 0, "x"]), &p), Some(json!(0)));
    }

    #[test]
    fn concat_stringifies_like_a_template() {
        let p = props(json!({"n": 1, "f": 2.5, "flag": true}));
        assert_eq!(
            eval_expr(&json!(["concat", "a", ["get", "n"]]), &p),
            Some(json!("a1"))
        );
        assert_eq!(
            eval_expr(&json!(["concat", ["get", "f"], "-", ["get", "nope"], null, ["get", "flag"]]), &p),
            Some(json!("2.5-true"))
        );
    }

    #[test]
    fn unknown_operators_are_undefined() {
        assert_eq!(eval_expr(&json!(["interpolate", 1, 2]), &Map::new()), None);
        assert_eq!(eval_expr(&json!([]), &Map::new()), None);
        assert_eq!(eval_expr(&json!([1, 2]), &Map::new()), None);
        assert_eq!(Expr::parse(&json!(["bogus"])), Expr::Unsupported);
    }

    #[test]
    fn nested_expressions_compose() {
        let p = props(json!({"street": "Main", "no": 12}));
        let label = json!(["concat", ["coalesce", ["get", "name"], ["get", "street"]], " ", ["get", "no"]]);
        assert_eq!(eval_expr(&label, &p), Some(json!("Main 12")));
    }

    #[test]
    fn display_string_handles_every_json_kind() {
        assert_eq!(display_string(None), "");
        assert_eq!(display_string(Some(&Value::Null)), "");
        assert_eq!(display_string(Some(&json!(3.0))), "3");
        assert_eq!(display_string(Some(&json!([1, "b"]))), "1,b");
        assert_eq!(display_string(Some(&json!({}))), "[object Object]");
    }
}
