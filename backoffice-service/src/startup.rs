//! Application wiring: Mongo client, shared state, router and server loop.

use axum::extract::Request;
use axum::routing::{get, patch, post};
use axum::Router;
use backoffice_core::middleware::metrics::metrics_middleware;
use backoffice_core::middleware::tracing::{request_id_middleware, REQUEST_ID_HEADER};
use mongodb::options::ClientOptions;
use mongodb::Client;
use secrecy::ExposeSecret;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::handlers;
use crate::services::{
    metrics, BackofficeRepository, InvoiceLedger, PaymentRecorder, RevenueAggregator,
};

#[derive(Clone)]
pub struct AppState {
    pub repository: BackofficeRepository,
    pub ledger: InvoiceLedger,
    pub payments: PaymentRecorder,
    pub analytics: RevenueAggregator,
}

pub struct Application {
    listener: TcpListener,
    router: Router,
    port: u16,
}

impl Application {
    pub async fn build(config: Config) -> anyhow::Result<Self> {
        let mut client_options =
            ClientOptions::parse(config.database.url.expose_secret()).await?;
        client_options.app_name = Some(config.service_name.clone());
        let client = Client::with_options(client_options)?;
        let db = client.database(&config.database.db_name);

        let repository = BackofficeRepository::new(&db);
        repository.init_indexes().await?;

        metrics::init_metrics();

        let state = AppState {
            ledger: InvoiceLedger::new(repository.clone()),
            payments: PaymentRecorder::new(repository.clone()),
            analytics: RevenueAggregator::new(repository.clone()),
            repository,
        };

        let router = app_router(state);

        let address = format!("{}:{}", config.server.host, config.server.port);
        let listener = TcpListener::bind(&address).await?;
        let port = listener.local_addr()?.port();

        info!(address = %address, "backoffice-service listening");

        Ok(Self {
            listener,
            router,
            port,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> anyhow::Result<()> {
        axum::serve(self.listener, self.router).await?;
        Ok(())
    }
}

pub fn app_router(state: AppState) -> Router {
    let invoices = Router::new()
        .route(
            "/",
            post(handlers::invoices::create_invoice).get(handlers::invoices::list_invoices),
        )
        .route(
            "/:id",
            get(handlers::invoices::get_invoice)
                .put(handlers::invoices::update_invoice)
                .delete(handlers::invoices::delete_invoice),
        )
        .route("/:id/send", post(handlers::invoices::mark_sent))
        .route("/:id/viewed", post(handlers::invoices::mark_viewed))
        .route("/:id/cancel", post(handlers::invoices::cancel_invoice))
        .route("/:id/payments", post(handlers::invoices::record_payment))
        .route("/:id/mark-paid", post(handlers::invoices::mark_paid))
        .route("/:id/reminders", post(handlers::invoices::send_reminder));

    let clients = Router::new()
        .route(
            "/",
            post(handlers::clients::create_client).get(handlers::clients::list_clients),
        )
        .route("/:id", get(handlers::clients::get_client));

    let proposals = Router::new()
        .route(
            "/",
            post(handlers::proposals::create_proposal).get(handlers::proposals::list_proposals),
        )
        .route("/:id", get(handlers::proposals::get_proposal))
        .route(
            "/:id/status",
            patch(handlers::proposals::update_proposal_status),
        );

    let reports = Router::new()
        .route("/revenue", get(handlers::reports::revenue_by_period))
        .route("/revenue/stats", get(handlers::reports::revenue_stats))
        .route("/aging", get(handlers::reports::aging_report))
        .route("/conversion", get(handlers::reports::conversion_rate))
        .route("/payment-time", get(handlers::reports::payment_time));

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics_endpoint))
        .nest("/invoices", invoices)
        .nest("/clients", clients)
        .nest("/proposals", proposals)
        .nest("/reports", reports)
        .layer(axum::middleware::from_fn(metrics_middleware))
        // Request-id layer sits outside the trace layer so the span always
        // sees the injected header.
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|h| h.to_str().ok())
                    .unwrap_or("unknown");
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            }),
        )
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
