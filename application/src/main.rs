use std::{future::IntoFuture as _, io, sync::OnceLock, time};

use application::{api, config, Args, Config};
use axum::{extract::MatchedPath, Extension};
use axum_client_ip::InsecureClientIp;
use futures::{future, TryFutureExt as _};
use service::{
    infra::{postgres, Postgres},
    Service,
};
use tokio::{net::TcpListener, signal};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing as log;
use tracing_subscriber::{
    filter::filter_fn,
    layer::{Layer as _, SubscriberExt as _},
    util::SubscriberInitExt as _,
};

/// [`log::Level`]s written to stderr rather than stdout.
const STDERR_LEVELS: &[log::Level] = &[log::Level::WARN, log::Level::ERROR];

static LOG_LEVEL: OnceLock<log::Level> = OnceLock::new();

postgres::embed_migrations!("../migrations");

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(output_layer(false))
        .with(output_layer(true))
        .init();

    _ = start().await;
}

/// Builds a logging layer writing either to stderr or to stdout, according
/// to [`STDERR_LEVELS`].
fn output_layer<S>(stderr: bool) -> impl tracing_subscriber::Layer<S>
where
    S: log::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    let layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_ansi(true)
        .with_thread_names(true);
    let layer = if stderr {
        layer.with_writer(io::stderr).boxed()
    } else {
        layer.with_writer(io::stdout).boxed()
    };
    layer.with_filter(filter_fn(move |meta| {
        meta.is_span()
            || (STDERR_LEVELS.contains(meta.level()) == stderr
                && LOG_LEVEL.get().copied().unwrap_or(log::Level::INFO)
                    >= *meta.level())
    }))
}

async fn start() -> Result<(), ()> {
    let Args { config } = Args::parse().map_err(|e| {
        log::error!("failed to parse command line arguments: {e}");
    })?;

    let Config {
        postgres,
        service,
        server,
        log,
    } = Config::new(config).map_err(|e| {
        log::error!("failed to load `Config`: {e}");
    })?;

    LOG_LEVEL
        .set(log.level.into())
        .unwrap_or_else(|_| unreachable!("first initialization"));

    let postgres_config = postgres.into();
    let mut postgres = Postgres::new(&postgres_config).map_err(|e| {
        log::error!("failed to initialize `Postgres` client: {e}");
    })?;

    migrations::runner()
        .run_async(&mut postgres)
        .await
        .map_err(|e| {
            log::error!("failed to run database migrations: {e}");
        })?;

    let (service, background) = Service::new(service.into(), postgres);

    let app = api::router()
        .layer(Extension(service))
        .layer(cors(&server.cors)?)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|r: &http::Request<_>| {
                    log::info_span!(
                        "HTTP request",
                        http.client_ip = InsecureClientIp::from(
                            r.headers(),
                            r.extensions()
                        )
                            .map(|ip| ip.0.to_string())
                            .ok(),
                        http.host = r.uri().host(),
                        http.method = r.method().as_str(),
                        http.route = r
                            .extensions()
                            .get::<MatchedPath>()
                            .map(MatchedPath::as_str),
                        http.target = r
                            .uri()
                            .path_and_query()
                            .map(http::uri::PathAndQuery::as_str),
                        http.user_agent = r
                            .headers()
                            .get(http::header::USER_AGENT)
                            .and_then(|h| h.to_str().ok()),
                        http.status_code = log::field::Empty,
                    )
                })
                .on_response(
                    |r: &http::Response<_>,
                     dur: time::Duration,
                     span: &log::Span| {
                        let status = r.status();
                        _ = span.record(
                            "http.status_code",
                            log::field::display(status.as_u16()),
                        );

                        let duration = format!("{}ms", dur.as_millis());
                        if status.is_server_error() {
                            log::error!(duration = %duration);
                        } else if status.is_client_error() {
                            log::warn!(duration = %duration);
                        } else {
                            log::info!(duration = %duration);
                        }
                    },
                ),
        );

    let listener = TcpListener::bind((server.host.clone(), server.port))
        .await
        .map_err(|e| {
            log::error!(
                "failed to listen on `{}:{}`: {e}",
                server.host,
                server.port,
            );
        })?;

    log::info!("listening on `{}:{}`", server.host, server.port);

    let serve = axum::serve(listener, app).with_graceful_shutdown(async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("failed to listen for shutdown signal: {e}");
            future::pending::<()>().await;
        }
        log::info!("shutting down");
    });

    // Background tasks run forever, so the server stopping ends the process.
    future::select(
        Box::pin(
            serve
                .into_future()
                .map_err(|e| log::error!("webserver failed: {e}")),
        ),
        Box::pin(
            background
                .into_future()
                .map_err(|e| log::error!(task = e.name, "{e}")),
        ),
    )
    .await
    .factor_first()
    .0
}

/// Builds the [`CorsLayer`] allowing the configured origins to use the REST
/// API.
fn cors(config: &config::Cors) -> Result<CorsLayer, ()> {
    let origins = config
        .origins
        .iter()
        .map(|origin| {
            origin.parse::<http::header::HeaderValue>().map_err(|e| {
                log::error!("`{origin}` is not correct CORS origin: {e}");
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CorsLayer::new()
        .allow_methods([
            http::Method::DELETE,
            http::Method::GET,
            http::Method::OPTIONS,
            http::Method::POST,
            http::Method::PUT,
        ])
        .allow_headers([
            http::header::AUTHORIZATION,
            http::header::CONTENT_TYPE,
        ])
        .allow_origin(origins))
}
