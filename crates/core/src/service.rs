use std::sync::Arc;

use crate::classify;
use crate::domain::profile::FinancialProfile;
use crate::domain::recommendation::Advice;
use crate::engine::{encode_profile, EngineError, EngineInvoker};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The request itself is malformed; surfaced to the caller as a 400.
    #[error("Campo requerido faltante: {0}")]
    MissingField(&'static str),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Per-request pipeline: validate, encode, invoke the configured strategy,
/// classify. Decoding of raw engine bytes happens inside the strategies.
#[derive(Clone)]
pub struct RecommendationService {
    invoker: Arc<dyn EngineInvoker>,
}

impl RecommendationService {
    pub fn new(invoker: Arc<dyn EngineInvoker>) -> Self {
        Self { invoker }
    }

    pub fn invoker(&self) -> &dyn EngineInvoker {
        self.invoker.as_ref()
    }

    pub async fn recommend(&self, profile: &FinancialProfile) -> Result<Advice, ServiceError> {
        if let Some(field) = profile.missing_required_field() {
            return Err(ServiceError::MissingField(field));
        }

        let query = encode_profile(profile);
        tracing::debug!(query = %query.as_str(), "consulta generada");

        let recomendaciones = self.invoker.invoke(&query).await?;
        tracing::info!(
            total = recomendaciones.len(),
            strategy = self.invoker.name(),
            "recomendaciones obtenidas"
        );

        let categorizadas = classify::classify_all(&recomendaciones);
        Ok(Advice {
            total: recomendaciones.len(),
            recomendaciones,
            categorizadas,
        })
    }
}
