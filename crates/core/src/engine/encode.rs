use serde_json::Value;

use crate::domain::profile::FinancialProfile;

/// A profile rendered in the engine's dict term syntax, e.g.
/// `_{ ingreso: 15000, registra_gastos: false, metas: [meta('auto',24)] }`.
/// Built once per request and discarded after the invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedQuery(String);

impl EncodedQuery {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

pub fn encode_profile(profile: &FinancialProfile) -> EncodedQuery {
    let fields: Vec<String> = profile
        .fields()
        .map(|(key, value)| format!("{key}: {}", prolog_value(value)))
        .collect();
    EncodedQuery(format!("_{{ {} }}", fields.join(", ")))
}

fn prolog_value(value: &Value) -> String {
    match value {
        Value::Bool(true) => "true".to_string(),
        Value::Bool(false) => "false".to_string(),
        Value::String(s) => quote_atom(s),
        Value::Array(goals) => encode_goals(goals),
        other => other.to_string(),
    }
}

/// Goal lists render as `[meta('tipo',meses), ..]`, preserving element order.
fn encode_goals(goals: &[Value]) -> String {
    if goals.is_empty() {
        return "[]".to_string();
    }
    let terms: Vec<String> = goals
        .iter()
        .map(|goal| {
            let tipo = goal.get("tipo").and_then(Value::as_str).unwrap_or_default();
            let meses = goal
                .get("meses")
                .map(|v| v.to_string())
                .unwrap_or_else(|| "0".to_string());
            format!("meta({},{})", quote_atom(tipo), meses)
        })
        .collect();
    format!("[{}]", terms.join(","))
}

/// Quote a string as a Prolog atom, escaping the backslash and the quote
/// character so profile values cannot break out of the generated term.
pub(crate) fn quote_atom(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn profile_from(v: serde_json::Value) -> FinancialProfile {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn booleans_render_as_fixed_tokens() {
        let p = profile_from(json!({"registra_gastos": false, "dependientes": true}));
        assert_eq!(
            encode_profile(&p).as_str(),
            "_{ registra_gastos: false, dependientes: true }"
        );
    }

    #[test]
    fn strings_render_quoted_and_empty_string_stays_quoted() {
        let p = profile_from(json!({"nivel_conocimiento": "basic", "nota": ""}));
        assert_eq!(
            encode_profile(&p).as_str(),
            "_{ nivel_conocimiento: 'basic', nota: '' }"
        );
    }

    #[test]
    fn numbers_render_literally() {
        let p = profile_from(json!({"ingreso": 15000, "meses_fondo": 0.5, "tasa_interes_apr": 42.0}));
        assert_eq!(
            encode_profile(&p).as_str(),
            "_{ ingreso: 15000, meses_fondo: 0.5, tasa_interes_apr: 42.0 }"
        );
    }

    #[test]
    fn empty_goal_list_renders_empty_list_token() {
        let p = profile_from(json!({"metas": []}));
        assert_eq!(encode_profile(&p).as_str(), "_{ metas: [] }");
    }

    #[test]
    fn goal_list_preserves_order_and_shape() {
        let p = profile_from(json!({
            "metas": [
                {"tipo": "auto", "meses": 24},
                {"tipo": "viaje", "meses": 6}
            ]
        }));
        assert_eq!(
            encode_profile(&p).as_str(),
            "_{ metas: [meta('auto',24),meta('viaje',6)] }"
        );
    }

    #[test]
    fn field_order_mirrors_input_order() {
        let a = profile_from(json!({"ingreso": 1, "vivienda": 2}));
        let b = profile_from(json!({"vivienda": 2, "ingreso": 1}));
        assert_eq!(encode_profile(&a).as_str(), "_{ ingreso: 1, vivienda: 2 }");
        assert_eq!(encode_profile(&b).as_str(), "_{ vivienda: 2, ingreso: 1 }");
    }

    #[test]
    fn quote_characters_in_values_are_escaped() {
        let p = profile_from(json!({"nivel_conocimiento": "it's"}));
        assert_eq!(
            encode_profile(&p).as_str(),
            r"_{ nivel_conocimiento: 'it\'s' }"
        );
        assert_eq!(quote_atom(r"a\b"), r"'a\\b'");
    }
}
