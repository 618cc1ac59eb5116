use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Fields that every submitted profile must carry. Only *absence* is an error;
/// zero, false and null all pass validation.
pub const REQUIRED_FIELDS: [&str; 10] = [
    "ingreso",
    "gasto_total",
    "ahorro_mensual",
    "meses_fondo",
    "vivienda",
    "alimentacion",
    "transporte",
    "deudas_total",
    "tasa_interes_apr",
    "gasto_medico_ratio",
];

/// A caller-submitted financial profile. The field set is open: besides the
/// required numeric fields there is an arbitrary collection of boolean/string
/// flags the rule base may or may not consult. Field iteration order is the
/// caller's JSON order (serde_json `preserve_order`), which keeps the encoded
/// query deterministic.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FinancialProfile(pub Map<String, Value>);

impl FinancialProfile {
    /// First required field missing from the profile, in declaration order.
    pub fn missing_required_field(&self) -> Option<&'static str> {
        REQUIRED_FIELDS
            .iter()
            .find(|field| !self.0.contains_key(**field))
            .copied()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}
