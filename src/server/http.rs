//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo for async handling. One `AppState` is
//! built at startup and shared by every connection.

use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::auth::JwtValidator;
use crate::classifier::{Classifier, RemoteClassifier};
use crate::config::Args;
use crate::db::MongoClient;
use crate::diseases::{DiseaseService, SelectedStore};
use crate::predictions::{ImageStore, PredictionLog};
use crate::routes::{self, response, BoxBody};
use crate::types::{AgriError, Result};

/// Shared application state
pub struct AppState {
    pub args: Args,
    /// Disease resolution over the store chosen at startup
    pub diseases: Arc<DiseaseService>,
    /// Present only when the document store won the startup probe
    pub mongo: Option<MongoClient>,
    /// Inference service; classification answers 503 without it
    pub classifier: Option<Arc<dyn Classifier>>,
    pub predictions: PredictionLog,
    pub images: ImageStore,
    /// Account routes answer 501 without it
    pub jwt: Option<JwtValidator>,
    pub started_at: Instant,
}

impl AppState {
    /// Assemble state around the selected disease store
    pub async fn new(args: Args, selected: SelectedStore) -> Result<Self> {
        let diseases = Arc::new(DiseaseService::new(selected.store));

        let classifier: Option<Arc<dyn Classifier>> = match &args.classifier_url {
            Some(url) => {
                let class_names = match args.class_name_list() {
                    Some(names) => names,
                    None => diseases.get_all_diseases().await,
                };
                info!(url = %url, classes = class_names.len(), "Classification service configured");
                Some(Arc::new(RemoteClassifier::new(
                    url.clone(),
                    class_names,
                    args.classifier_timeout(),
                )?))
            }
            None => {
                warn!("CLASSIFIER_URL not set - classification disabled");
                None
            }
        };

        let jwt = args.jwt_validator();
        if jwt.is_none() {
            warn!("JWT_SECRET not set - account routes disabled");
        }

        Ok(Self {
            predictions: PredictionLog::new(&args.predictions_dir),
            images: ImageStore::new(&args.image_dir),
            diseases,
            mongo: selected.mongo,
            classifier,
            jwt,
            started_at: Instant::now(),
            args,
        })
    }

    /// Labels the service understands: the model's, the configured
    /// list, or the disease ids of the active store
    pub async fn class_names(&self) -> Vec<String> {
        if let Some(classifier) = &self.classifier {
            return classifier.class_names();
        }
        match self.args.class_name_list() {
            Some(names) => names,
            None => self.diseases.get_all_diseases().await,
        }
    }
}

/// Start the HTTP server
pub async fn run(state: Arc<AppState>) -> std::result::Result<(), AgriError> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!(
        "AgriGuard listening on {} (disease data from {})",
        state.args.listen,
        state.diseases.source()
    );

    if state.args.dev_mode {
        warn!("Development mode enabled - fixed JWT secret in use");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .preserve_header_case(true)
                        .title_case_headers(true)
                        .serve_connection(io, service)
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
pub async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> std::result::Result<Response<BoxBody>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let query = req.uri().query().map(str::to_string);

    debug!("[{}] {} {}", addr, method, path);

    if method == Method::OPTIONS {
        return Ok(response::cors_preflight());
    }

    // Auth routes consume the request body
    if path.starts_with("/api/auth/") {
        return Ok(routes::handle_auth_request(req, &state).await);
    }

    let query = query.as_deref();
    let segments: Vec<&str> = path
        .trim_start_matches('/')
        .trim_end_matches('/')
        .split('/')
        .collect();

    let response = match (&method, segments.as_slice()) {
        (&Method::GET, ["api", "health"]) => routes::health_check(&state).await,

        (&Method::POST, ["api", "classify"]) => routes::handle_classify(req, &state, addr).await,

        (&Method::GET, ["api", "diseases"]) => routes::list_diseases(&state).await,
        (&Method::GET, ["api", "diseases", id]) => routes::disease_details(&state, id).await,
        (&Method::GET, ["api", "diseases", id, "treatments"]) => {
            routes::disease_treatments(&state, id, query).await
        }
        (&Method::GET, ["api", "diseases", id, "vectors"]) => {
            routes::disease_vectors(&state, id).await
        }

        (&Method::GET, ["api", "classes"]) => routes::supported_classes(&state).await,
        (&Method::GET, ["api", "search"]) => routes::search_diseases(&state, query).await,

        (&Method::GET, ["api", "stats", "model"]) => routes::model_stats(&state).await,
        (&Method::GET, ["api", "stats", "database"]) => routes::database_stats(&state).await,

        (&Method::GET, ["api", "predictions", "history"]) => {
            routes::prediction_history(&state, query).await
        }
        (&Method::GET, ["api", "predictions", "stats"]) => routes::prediction_stats(&state).await,
        (&Method::GET, ["api", "predictions", id]) => routes::prediction_details(&state, id).await,

        (&Method::GET, ["api", "images", rest @ ..]) if !rest.is_empty() => {
            routes::serve_image(&state, &rest.join("/")).await
        }

        (_, ["api", "classify"])
        | (_, ["api", "diseases", ..])
        | (_, ["api", "classes"])
        | (_, ["api", "search"])
        | (_, ["api", "stats", _])
        | (_, ["api", "predictions", ..])
        | (_, ["api", "health"]) => response::method_not_allowed(),

        _ => response::not_found_response(&path),
    };

    Ok(response)
}
