use crate::app::{AppError, MapApp};
use crate::config::AppConfig;
use crate::controls::SequenceEvent;
use crate::data;
use crate::host::{MapView, MarkerId, PlacedControl, PlacedMarker, Popup, SceneHost, TileLayer};
use crate::types::AttributeKey;
use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post, put},
    Router,
};
use rstar::primitives::GeomWithData;
use rstar::RTree;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

// Feature position [lon, lat] tagged with the feature index.
type FeaturePoint = GeomWithData<[f64; 2], usize>;

/// The app plus a spatial index over its features for point queries.
pub struct Viewer {
    app: MapApp<SceneHost>,
    tree: RTree<FeaturePoint>,
}

impl Viewer {
    pub fn new(app: MapApp<SceneHost>) -> Self {
        let tree = build_index(&app);
        Self { app, tree }
    }

    fn reload(&mut self) -> Result<()> {
        let dataset = data::load_dataset(self.app.config())?;
        self.app.load(dataset);
        self.tree = build_index(&self.app);
        Ok(())
    }

    fn scene(&self) -> SceneResponse {
        let host = self.app.host();
        SceneResponse {
            view: host.view(),
            tile_layers: host.tile_layers().to_vec(),
            markers: host.markers().collect(),
            controls: host.controls().to_vec(),
            active_index: self.app.active_index(),
            active: self.app.active_attribute().cloned(),
            attributes: self
                .app
                .dataset()
                .map(|d| d.attributes.clone())
                .unwrap_or_default(),
        }
    }

    fn query(&self, lat: f64, lon: f64) -> Option<QueryResponse> {
        if !lat.is_finite() || !lon.is_finite() {
            return None;
        }
        let nearest = self.tree.nearest_neighbor(&[lon, lat])?;
        let feature = self.app.dataset()?.features.get(nearest.data)?;
        let id = self.app.layer()?.marker_for(nearest.data)?;
        let popup = self.app.host().marker(id)?.popup.clone()?;

        Some(QueryResponse {
            id,
            label: feature.label.clone(),
            popup,
        })
    }
}

fn build_index(app: &MapApp<SceneHost>) -> RTree<FeaturePoint> {
    let items = app
        .dataset()
        .map(|d| {
            d.features
                .iter()
                .enumerate()
                .map(|(i, f)| GeomWithData::new([f.position.x(), f.position.y()], i))
                .collect()
        })
        .unwrap_or_default();
    RTree::bulk_load(items)
}

pub type AppState = Arc<Mutex<Viewer>>;

#[derive(Serialize)]
pub struct SceneResponse {
    view: Option<MapView>,
    tile_layers: Vec<TileLayer>,
    markers: Vec<PlacedMarker>,
    controls: Vec<PlacedControl>,
    active_index: Option<usize>,
    active: Option<AttributeKey>,
    attributes: Vec<AttributeKey>,
}

#[derive(Deserialize)]
pub struct QueryParams {
    lat: f64,
    lon: f64,
}

/// Raw control input: a button id, or `range-slider` with its value.
#[derive(Deserialize)]
pub struct InputEvent {
    target: String,
    value: Option<String>,
}

#[derive(Serialize)]
pub struct QueryResponse {
    id: MarkerId,
    label: String,
    popup: Popup,
}

pub enum ApiError {
    App(AppError),
    UnknownInput(String),
    Reload(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::App(e @ AppError::IndexOutOfRange { .. }) => {
                (StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
            }
            ApiError::App(e @ AppError::NoDataset) => (StatusCode::CONFLICT, e.to_string()),
            ApiError::UnknownInput(target) => (
                StatusCode::BAD_REQUEST,
                format!("input '{}' does not map to a sequence event", target),
            ),
            ApiError::Reload(e) => {
                error!("Reload failed: {:#}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", e))
            }
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<AppError> for ApiError {
    fn from(e: AppError) -> Self {
        ApiError::App(e)
    }
}

fn lock(state: &AppState) -> MutexGuard<'_, Viewer> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub fn router(state: AppState, static_dir: &std::path::Path) -> Router {
    Router::new()
        .route("/api/scene", get(scene_handler))
        .route("/api/sequence/forward", post(forward_handler))
        .route("/api/sequence/reverse", post(reverse_handler))
        .route("/api/sequence/:index", put(set_index_handler))
        .route("/api/input", post(input_handler))
        .route("/api/reload", post(reload_handler))
        .route("/api/query", get(query_handler))
        .fallback_service(ServeDir::new(static_dir))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn start_server(config: AppConfig) -> Result<()> {
    let app = MapApp::open(&config, SceneHost::new());
    let state = Arc::new(Mutex::new(Viewer::new(app)));

    let port = config.server.port;
    let addr = SocketAddr::from(([127, 0, 0, 1], port));

    info!("Starting server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state, &config.server.static_dir)).await?;
    Ok(())
}

async fn scene_handler(State(state): State<AppState>) -> Json<SceneResponse> {
    Json(lock(&state).scene())
}

fn apply(state: &AppState, event: SequenceEvent) -> Result<Json<SceneResponse>, ApiError> {
    let mut viewer = lock(state);
    viewer.app.handle(event)?;
    Ok(Json(viewer.scene()))
}

async fn forward_handler(State(state): State<AppState>) -> Result<Json<SceneResponse>, ApiError> {
    apply(&state, SequenceEvent::Forward)
}

async fn reverse_handler(State(state): State<AppState>) -> Result<Json<SceneResponse>, ApiError> {
    apply(&state, SequenceEvent::Reverse)
}

async fn set_index_handler(
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> Result<Json<SceneResponse>, ApiError> {
    apply(&state, SequenceEvent::Slide(index))
}

async fn input_handler(
    State(state): State<AppState>,
    Json(input): Json<InputEvent>,
) -> Result<Json<SceneResponse>, ApiError> {
    let mut viewer = lock(&state);
    let control = viewer.app.sequence_control().ok_or(AppError::NoDataset)?;
    let event = control
        .event_for(&input.target, input.value.as_deref())
        .ok_or(ApiError::UnknownInput(input.target))?;
    viewer.app.handle(event)?;
    Ok(Json(viewer.scene()))
}

async fn reload_handler(State(state): State<AppState>) -> Result<Json<SceneResponse>, ApiError> {
    let mut viewer = lock(&state);
    viewer.reload().map_err(ApiError::Reload)?;
    Ok(Json(viewer.scene()))
}

async fn query_handler(
    State(state): State<AppState>,
    Query(params): Query<QueryParams>,
) -> Json<Option<QueryResponse>> {
    Json(lock(&state).query(params.lat, params.lon))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::{config, two_town_app};
    use axum::body::Body;
    use axum::http::{Method, Request};
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    fn test_router(app: MapApp<SceneHost>) -> Router {
        router(
            Arc::new(Mutex::new(Viewer::new(app))),
            std::path::Path::new("static"),
        )
    }

    async fn send(router: Router, method: Method, uri: &str) -> (StatusCode, Value) {
        let response = router
            .oneshot(Request::builder().method(method).uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn scene_lists_markers_and_controls() {
        let (status, body) = send(test_router(two_town_app()), Method::GET, "/api/scene").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["markers"].as_array().unwrap().len(), 2);
        assert_eq!(body["controls"][0]["corner"], "bottomright");
        assert_eq!(body["controls"][0]["kind"], "sequence");
        assert_eq!(body["controls"][1]["kind"], "legend");
        assert_eq!(body["active_index"], 0);
        assert_eq!(body["attributes"][1]["key"], "Yr_2020");
    }

    #[tokio::test]
    async fn stepping_updates_active_index() {
        let router = test_router(two_town_app());

        let (status, body) = send(router.clone(), Method::POST, "/api/sequence/forward").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["active_index"], 1);
        assert_eq!(body["active"]["period"], "2020");
        let popup = body["markers"][0]["popup"]["html"].as_str().unwrap();
        assert!(popup.contains("2020"), "{popup}");

        let (_, body) = send(router.clone(), Method::POST, "/api/sequence/forward").await;
        assert_eq!(body["active_index"], 0);

        let (_, body) = send(router, Method::POST, "/api/sequence/reverse").await;
        assert_eq!(body["active_index"], 1);
    }

    #[tokio::test]
    async fn slider_jump_and_out_of_range() {
        let router = test_router(two_town_app());

        let (status, body) = send(router.clone(), Method::PUT, "/api/sequence/1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["active_index"], 1);

        let (status, body) = send(router, Method::PUT, "/api/sequence/7").await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].as_str().unwrap().contains("7"));
    }

    #[tokio::test]
    async fn raw_inputs_map_to_events() {
        let router = test_router(two_town_app());
        let post_json = |body: &'static str| {
            Request::builder()
                .method(Method::POST)
                .uri("/api/input")
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap()
        };

        let response = router
            .clone()
            .oneshot(post_json(r#"{"target": "range-slider", "value": "1"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["active_index"], 1);

        let response = router
            .oneshot(post_json(r#"{"target": "play"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn stepping_without_dataset_conflicts() {
        let app = MapApp::new(&config(), SceneHost::new());
        let (status, _) = send(test_router(app), Method::POST, "/api/sequence/forward").await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn query_returns_nearest_popup() {
        let router = test_router(two_town_app());

        let (status, body) = send(router, Method::GET, "/api/query?lat=2.7&lon=32.8").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["label"], "B");
        assert!(body["popup"]["html"].as_str().unwrap().contains("B"));
    }

    #[tokio::test]
    async fn query_without_dataset_is_null() {
        let app = MapApp::new(&config(), SceneHost::new());
        let (_, body) = send(test_router(app), Method::GET, "/api/query?lat=0&lon=0").await;
        assert!(body.is_null());
    }

    #[tokio::test]
    async fn query_with_non_finite_coordinates_is_null() {
        let router = test_router(two_town_app());

        for uri in [
            "/api/query?lat=NaN&lon=0",
            "/api/query?lat=inf&lon=0",
            "/api/query?lat=0&lon=-inf",
        ] {
            let (status, body) = send(router.clone(), Method::GET, uri).await;
            assert_eq!(status, StatusCode::OK, "{uri}");
            assert!(body.is_null(), "{uri}: {body}");
        }

        let (_, body) = send(router, Method::GET, "/api/query?lat=0.3&lon=32.6").await;
        assert_eq!(body["label"], "A");
    }

    #[tokio::test]
    async fn popup_offset_follows_resized_marker() {
        let router = test_router(two_town_app());

        let (_, before) = send(router.clone(), Method::GET, "/api/scene").await;
        let (_, after) = send(router, Method::POST, "/api/sequence/forward").await;

        for body in [&before, &after] {
            let marker = &body["markers"][0];
            assert_eq!(
                marker["popup"]["offset"][1].as_f64(),
                marker["radius"].as_f64().map(|r| -r)
            );
        }
        assert_ne!(
            before["markers"][0]["popup"]["offset"][1],
            after["markers"][0]["popup"]["offset"][1]
        );
    }
}
