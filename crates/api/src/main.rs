use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use asesor_core::config::{EngineStrategyKind, Settings};
use asesor_core::domain::profile::FinancialProfile;
use asesor_core::domain::recommendation::CategoryBuckets;
use asesor_core::engine::process::ProcessStrategy;
use asesor_core::engine::session::BoundSessionStrategy;
use asesor_core::engine::{EngineInvoker, UnavailableEngine};
use asesor_core::service::{RecommendationService, ServiceError};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let invoker = build_invoker(&settings).await;
    let state = AppState {
        service: RecommendationService::new(invoker),
    };

    let app = router(state);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(5000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api escuchando");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Strategy selection happens once at startup. A bound session that fails to
/// start is replaced by a fail-fast invoker instead of retrying per request.
async fn build_invoker(settings: &Settings) -> Arc<dyn EngineInvoker> {
    match settings.engine_strategy {
        EngineStrategyKind::Bound => match BoundSessionStrategy::start(settings).await {
            Ok(strategy) => Arc::new(strategy),
            Err(err) => {
                let report = anyhow::Error::new(err.clone());
                sentry_anyhow::capture_anyhow(&report);
                tracing::error!(error = %err, "sesión Prolog no disponible; las peticiones fallarán");
                Arc::new(UnavailableEngine::from_settings(settings, err.to_string()))
            }
        },
        EngineStrategyKind::Process => Arc::new(ProcessStrategy::from_settings(settings)),
    }
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/recomendaciones", post(recomendaciones))
        .route("/api/ejemplo", get(ejemplo))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[derive(Clone)]
struct AppState {
    service: RecommendationService,
}

#[derive(Debug, Serialize)]
struct AdviceResponse {
    success: bool,
    total: usize,
    recomendaciones: Vec<String>,
    categorizadas: CategoryBuckets,
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    let diag = state.service.invoker().diagnostics();
    let healthy = diag.healthy();

    Json(json!({
        "status": if healthy { "ok" } else { "warning" },
        "message": if healthy {
            "Servidor funcionando correctamente"
        } else {
            "Servidor disponible, pero el motor Prolog no está listo"
        },
        "engineBindingAvailable": diag.binding_available,
        "engineExecutableDetected": diag
            .executable_detected
            .map(Value::String)
            .unwrap_or(Value::Bool(false)),
        "engineRuleFileFound": diag.rules_file_found,
    }))
}

async fn recomendaciones(
    State(state): State<AppState>,
    Json(profile): Json<FinancialProfile>,
) -> Result<Json<AdviceResponse>, (StatusCode, Json<Value>)> {
    match state.service.recommend(&profile).await {
        Ok(advice) => Ok(Json(AdviceResponse {
            success: true,
            total: advice.total,
            recomendaciones: advice.recomendaciones,
            categorizadas: advice.categorizadas,
        })),
        Err(err @ ServiceError::MissingField(_)) => Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": err.to_string() })),
        )),
        Err(err) => {
            let report = anyhow::Error::new(err);
            sentry_anyhow::capture_anyhow(&report);
            tracing::error!(error = %report, "fallo del motor de recomendaciones");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": report.to_string() })),
            ))
        }
    }
}

async fn ejemplo() -> Json<Value> {
    Json(json!({
        "success": true,
        "perfil": sample_profile(),
    }))
}

/// Fixed sample profile exercising most of the rule base.
fn sample_profile() -> Value {
    json!({
        "ingreso": 15000,
        "gasto_total": 16500,
        "ahorro_mensual": 800,
        "meses_fondo": 0.5,
        "vivienda": 6000,
        "alimentacion": 5800,
        "transporte": 3500,
        "deudas_total": 5200,
        "cc_pago_minimo": true,
        "tasa_interes_apr": 42.0,
        "jubilacion_definida": false,
        "nivel_conocimiento": "basic",
        "tiene_seguro_salud": false,
        "tiene_seguro_vida": false,
        "dependientes": true,
        "posee_auto": true,
        "tiene_seguro_auto": false,
        "gasto_medico_ratio": 0.18,
        "tiene_testamento": false,
        "registra_gastos": false,
        "metas": []
    })
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
