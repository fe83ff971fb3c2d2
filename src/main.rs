use actix_web::{middleware::Compress, web, App, HttpServer};
use tracing::{error, info, Level};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi; // bring trait into scope for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

use feedback_kit::config::{build_gateway, Backend, Settings};
use feedback_kit::openapi::ApiDoc;
use feedback_kit::rate_limit::SubmitRateLimiter;
use feedback_kit::routes::{config, AppState};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env automatically only in debug builds; deployments set the environment themselves.
    if cfg!(debug_assertions) {
        let _ = dotenv::dotenv();
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    let settings = match Settings::from_env() {
        Ok(s) => s,
        Err(e) => {
            error!("invalid configuration: {e:#}");
            eprintln!("Please copy .env.example to .env and configure it");
            std::process::exit(1);
        }
    };

    match &settings.backend {
        Backend::Mock { delay } => info!("Using mock backend (delay {delay:?})"),
        Backend::GitHub(cfg) => {
            info!("Using GitHub backend {}/{} via {}", cfg.owner, cfg.repo, cfg.api_base);
            if std::env::var(&cfg.token_var).map(|t| t.trim().is_empty()).unwrap_or(true) {
                // submissions fail with MissingCredential until the variable is provided
                tracing::warn!("{} is not set", cfg.token_var);
            }
        }
        Backend::Http { endpoint, .. } => info!("Using HTTP backend {endpoint}"),
    }

    let state = AppState {
        gateway: build_gateway(&settings.backend),
        rate_limiter: settings
            .rate_limit
            .enabled
            .then(|| SubmitRateLimiter::new(settings.rate_limit.clone())),
    };
    let openapi = ApiDoc::openapi();

    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .wrap(Compress::default())
            .app_data(web::Data::new(state.clone()))
            .configure(config)
            .service(SwaggerUi::new("/docs/{_:.*}").url("/docs/openapi.json", openapi.clone()))
    })
    .bind(settings.bind.as_str())?;

    info!("Listening on http://{}", settings.bind);

    server.run().await
}
