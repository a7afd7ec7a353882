//! Expression evaluation.

use std::collections::BTreeMap;

use crate::config::{Expr, TemplatePart};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::state::{Attributes, State};
use crate::value::Value;

/// Values an expression may read. Resource attributes are only reachable
/// when a state is supplied.
pub(crate) struct Scope<'a> {
    variables: &'a BTreeMap<String, Value>,
    state: Option<&'a State>,
}

impl<'a> Scope<'a> {
    pub(crate) fn new(variables: &'a BTreeMap<String, Value>, state: Option<&'a State>) -> Self {
        Self { variables, state }
    }

    pub(crate) fn eval(&self, expr: &Expr) -> Result<Value, Diagnostic> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Variable(name) => self.variable(name).cloned(),
            Expr::ResourceAttribute { address, attribute } => {
                let state = self.state.ok_or_else(|| {
                    Diagnostic::error("Resource references are only supported in output values")
                        .with_detail(format!("{address}.{attribute}"))
                })?;
                let resource = state.resource(address).ok_or_else(|| {
                    Diagnostic::error(format!("Reference to unknown resource {address:?}"))
                })?;
                Ok(resource.attributes.get(attribute).cloned().unwrap_or(Value::Null))
            }
            Expr::Template(parts) => {
                let mut out = String::new();
                for part in parts {
                    match part {
                        TemplatePart::Text(text) => out.push_str(text),
                        TemplatePart::Variable(name) => out.push_str(&self.variable(name)?.to_string()),
                    }
                }
                Ok(Value::String(out))
            }
            Expr::List(items) => items
                .iter()
                .map(|item| self.eval(item))
                .collect::<Result<_, _>>()
                .map(Value::List),
            Expr::Object(fields) => fields
                .iter()
                .map(|(k, v)| self.eval(v).map(|v| (k.clone(), v)))
                .collect::<Result<_, _>>()
                .map(Value::Object),
        }
    }

    /// Evaluate every attribute, collecting all failures.
    pub(crate) fn eval_attributes(&self, attributes: &BTreeMap<String, Expr>) -> Result<Attributes, Diagnostics> {
        let mut values = Attributes::new();
        let mut diags = Diagnostics::new();
        for (name, expr) in attributes {
            match self.eval(expr) {
                Ok(value) => {
                    values.insert(name.clone(), value);
                }
                Err(diag) => diags.push(diag),
            }
        }
        diags.into_result(values)
    }

    fn variable(&self, name: &str) -> Result<&'a Value, Diagnostic> {
        self.variables
            .get(name)
            .ok_or_else(|| Diagnostic::error(format!("No value for variable {name:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ResourceInstance;

    #[test]
    fn test_eval_template_and_nested() {
        let variables: BTreeMap<String, Value> =
            [("region".to_string(), Value::from("eu")), ("n".to_string(), Value::Number(2.0))].into();
        let scope = Scope::new(&variables, None);
        let expr = Expr::Object(
            [(
                "name".to_string(),
                Expr::Template(vec![
                    TemplatePart::Text("web-".into()),
                    TemplatePart::Variable("region".into()),
                    TemplatePart::Text("-".into()),
                    TemplatePart::Variable("n".into()),
                ]),
            )]
            .into(),
        );

        let value = scope.eval(&expr).unwrap();

        assert_eq!(value.as_object().unwrap()["name"], Value::from("web-eu-2"));
    }

    #[test]
    fn test_resource_refs_need_state() {
        let variables = BTreeMap::new();
        let expr = Expr::ResourceAttribute {
            address: "null_resource.a".into(),
            attribute: "id".into(),
        };

        assert!(Scope::new(&variables, None).eval(&expr).is_err());

        let mut state = State::new();
        state.set_resource(ResourceInstance::new(
            "null_resource",
            "a",
            "null",
            [("id".to_string(), Value::from("x1"))].into(),
        ));
        assert_eq!(Scope::new(&variables, Some(&state)).eval(&expr).unwrap(), Value::from("x1"));
    }
}
