/// Tour CRUD endpoints
use crate::{
    blob_store::UploadedFile,
    context::AppContext,
    error::{TourError, TourResult},
    tour::TourSubmission,
    tour_store::Tour,
};
use axum::{
    async_trait,
    extract::{multipart::MultipartError, FromRequest, Multipart, Path, Request, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};

/// Build tour routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/tours", get(list_tours).post(create_tour))
        .route(
            "/api/tours/:id",
            get(get_tour).put(update_tour).delete(delete_tour),
        )
}

/// Text-only body (JSON or urlencoded form)
#[derive(Debug, Default, Deserialize)]
struct TourFields {
    state: Option<String>,
    description: Option<String>,
    places: Option<String>,
}

impl From<TourFields> for TourSubmission {
    fn from(fields: TourFields) -> Self {
        Self {
            state: fields.state,
            description: fields.description,
            places: fields.places,
            images: Vec::new(),
        }
    }
}

#[derive(Debug, Serialize)]
struct DeleteTourResponse {
    message: String,
    tour: Tour,
}

/// Request body decoded into a [`TourSubmission`]
///
/// Accepts multipart/form-data (text fields plus `images`/`images[]` files),
/// or text fields alone as JSON or a urlencoded form.
pub struct SubmissionBody(pub TourSubmission);

#[async_trait]
impl FromRequest<AppContext> for SubmissionBody {
    type Rejection = TourError;

    async fn from_request(req: Request, ctx: &AppContext) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();

        if content_type.starts_with("application/json") {
            let Json(fields) = Json::<TourFields>::from_request(req, ctx)
                .await
                .map_err(|e| TourError::Validation(e.body_text()))?;
            return Ok(Self(fields.into()));
        }

        if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(fields) = Form::<TourFields>::from_request(req, ctx)
                .await
                .map_err(|e| TourError::Validation(e.body_text()))?;
            return Ok(Self(fields.into()));
        }

        let multipart = Multipart::from_request(req, ctx)
            .await
            .map_err(|e| TourError::Validation(e.body_text()))?;

        read_submission(ctx, multipart).await.map(Self)
    }
}

/// Read all multipart fields, enforcing the upload limits while streaming
async fn read_submission(ctx: &AppContext, mut multipart: Multipart) -> TourResult<TourSubmission> {
    let max_files = ctx.config.uploads.max_files;
    let mut submission = TourSubmission::default();

    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "state" => submission.state = Some(field.text().await.map_err(multipart_error)?),
            "description" => {
                submission.description = Some(field.text().await.map_err(multipart_error)?)
            }
            "places" => submission.places = Some(field.text().await.map_err(multipart_error)?),
            "images" | "images[]" => {
                let original_name = field.file_name().unwrap_or("").to_string();
                let content_type = field.content_type().map(String::from);

                let mut data = Vec::new();
                while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
                    ctx.blob_store
                        .validate_size(&original_name, data.len() + chunk.len())?;
                    data.extend_from_slice(&chunk);
                }

                // An empty file input still produces a part
                if original_name.is_empty() && data.is_empty() {
                    continue;
                }

                if submission.images.len() >= max_files {
                    return Err(TourError::Validation(format!(
                        "Too many images: at most {} per request",
                        max_files
                    )));
                }

                submission.images.push(UploadedFile {
                    original_name,
                    content_type,
                    data,
                });
            }
            _ => {
                tracing::debug!("Ignoring unknown field: {}", field_name);
            }
        }
    }

    Ok(submission)
}

fn multipart_error(e: MultipartError) -> TourError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        TourError::PayloadTooLarge(e.body_text())
    } else {
        TourError::Validation(format!("Malformed multipart body: {}", e.body_text()))
    }
}

/// POST /api/tours
async fn create_tour(
    State(ctx): State<AppContext>,
    SubmissionBody(submission): SubmissionBody,
) -> TourResult<impl IntoResponse> {
    let tour = ctx.tours.create(submission).await?;
    Ok((StatusCode::CREATED, Json(tour)))
}

/// GET /api/tours
async fn list_tours(State(ctx): State<AppContext>) -> TourResult<Json<Vec<Tour>>> {
    Ok(Json(ctx.tours.list().await?))
}

/// GET /api/tours/:id
async fn get_tour(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> TourResult<Json<Tour>> {
    Ok(Json(ctx.tours.get(&id).await?))
}

/// PUT /api/tours/:id
async fn update_tour(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    SubmissionBody(submission): SubmissionBody,
) -> TourResult<Json<Tour>> {
    Ok(Json(ctx.tours.update(&id, submission).await?))
}

/// DELETE /api/tours/:id
async fn delete_tour(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> TourResult<impl IntoResponse> {
    let tour = ctx.tours.delete(&id).await?;

    Ok(Json(DeleteTourResponse {
        message: "Tour deleted successfully".to_string(),
        tour,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        server::build_router,
        test_support::{multipart_body, test_context, wait_until, Part, BOUNDARY},
    };
    use axum::{body::Body, http::Request as HttpRequest, response::Response};
    use tower::ServiceExt;

    fn multipart_request(method: &str, uri: &str, parts: &[Part<'_>]) -> HttpRequest<Body> {
        HttpRequest::builder()
            .method(method)
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(multipart_body(parts)))
            .unwrap()
    }

    fn empty_request(method: &str, uri: &str) -> HttpRequest<Body> {
        HttpRequest::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn read_json(response: Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    async fn read_bytes(response: Response) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    fn tour_parts<'a>(images: &'a [(&'a str, &'a [u8])]) -> Vec<Part<'a>> {
        let mut parts = vec![
            Part::Text("state", "Himachal"),
            Part::Text("description", "Mountain passes"),
            Part::Text("places", "Manali, Spiti"),
        ];
        parts.extend(
            images
                .iter()
                .map(|&(name, data)| Part::File("images", name, data)),
        );
        parts
    }

    #[tokio::test]
    async fn test_create_without_images_is_rejected() {
        let (dir, ctx) = test_context(1024, 15).await;
        let app = build_router(ctx);

        let response = app
            .clone()
            .oneshot(multipart_request("POST", "/api/tours", &tour_parts(&[])))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = read_json(response).await;
        assert_eq!(body["message"], "At least one image is required");

        let response = app
            .oneshot(empty_request("GET", "/api/tours"))
            .await
            .unwrap();
        assert_eq!(read_json(response).await, serde_json::json!([]));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_create_with_missing_field_is_rejected() {
        let (_dir, ctx) = test_context(1024, 15).await;
        let app = build_router(ctx);

        let parts = vec![
            Part::Text("state", "Himachal"),
            Part::File("images", "a.jpg", b"a"),
        ];
        let response = app
            .oneshot(multipart_request("POST", "/api/tours", &parts))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            read_json(response).await["message"],
            "All fields (state, description, places) are required"
        );
    }

    #[tokio::test]
    async fn test_create_then_fetch_tour_and_images() {
        let (_dir, ctx) = test_context(1024, 15).await;
        let app = build_router(ctx);

        let images: [(&str, &[u8]); 2] = [("rohtang.jpg", b"rohtang"), ("key.png", b"key")];
        let response = app
            .clone()
            .oneshot(multipart_request("POST", "/api/tours", &tour_parts(&images)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = read_json(response).await;

        assert_eq!(created["state"], "Himachal");
        assert_eq!(created["description"], "Mountain passes");
        assert_eq!(created["places"], "Manali, Spiti");
        let urls: Vec<String> = serde_json::from_value(created["images"].clone()).unwrap();
        assert_eq!(urls.len(), 2);

        let id = created["id"].as_str().unwrap();
        let response = app
            .clone()
            .oneshot(empty_request("GET", &format!("/api/tours/{}", id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json(response).await, created);

        let response = app
            .clone()
            .oneshot(empty_request("GET", &urls[0]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_bytes(response).await, b"rohtang");

        let response = app
            .oneshot(empty_request("GET", "/api/tours"))
            .await
            .unwrap();
        let listed = read_json(response).await;
        assert_eq!(listed.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_accepts_bracketed_field_name() {
        let (_dir, ctx) = test_context(1024, 15).await;
        let app = build_router(ctx);

        let parts = vec![
            Part::Text("state", "Goa"),
            Part::Text("description", "Beaches"),
            Part::Text("places", "Baga"),
            Part::File("images[]", "baga.jpg", b"baga"),
        ];
        let response = app
            .oneshot(multipart_request("POST", "/api/tours", &parts))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(read_json(response).await["images"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_oversized_upload_is_rejected() {
        let (dir, ctx) = test_context(8, 15).await;
        let app = build_router(ctx);

        let big = [0u8; 8];
        let images: [(&str, &[u8]); 1] = [("big.jpg", &big)];
        let response = app
            .oneshot(multipart_request("POST", "/api/tours", &tour_parts(&images)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_too_many_files_is_rejected() {
        let (dir, ctx) = test_context(1024, 2).await;
        let app = build_router(ctx);

        let images: [(&str, &[u8]); 3] = [("a.jpg", b"a"), ("b.jpg", b"b"), ("c.jpg", b"c")];
        let response = app
            .oneshot(multipart_request("POST", "/api/tours", &tour_parts(&images)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_create_accepts_exactly_max_files() {
        let (dir, ctx) = test_context(1024, 3).await;
        let app = build_router(ctx);

        let images: [(&str, &[u8]); 3] = [("a.jpg", b"a"), ("b.jpg", b"b"), ("c.jpg", b"c")];
        let response = app
            .oneshot(multipart_request("POST", "/api/tours", &tour_parts(&images)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let created = read_json(response).await;
        assert_eq!(created["images"].as_array().unwrap().len(), 3);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 3);
    }

    #[tokio::test]
    async fn test_update_accepts_exactly_max_files() {
        let (_dir, ctx) = test_context(1024, 2).await;
        let app = build_router(ctx);

        let images: [(&str, &[u8]); 1] = [("a.jpg", b"a")];
        let response = app
            .clone()
            .oneshot(multipart_request("POST", "/api/tours", &tour_parts(&images)))
            .await
            .unwrap();
        let id = read_json(response).await["id"].as_str().unwrap().to_string();

        let parts = vec![
            Part::File("images", "x.jpg", b"x"),
            Part::File("images", "y.jpg", b"y"),
        ];
        let response = app
            .oneshot(multipart_request("PUT", &format!("/api/tours/{}", id), &parts))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json(response).await["images"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_update_images_then_old_urls_disappear() {
        let (_dir, ctx) = test_context(1024, 15).await;
        let app = build_router(ctx);

        let images: [(&str, &[u8]); 1] = [("old.jpg", b"old")];
        let response = app
            .clone()
            .oneshot(multipart_request("POST", "/api/tours", &tour_parts(&images)))
            .await
            .unwrap();
        let created = read_json(response).await;
        let id = created["id"].as_str().unwrap().to_string();
        let old_url = created["images"][0].as_str().unwrap().to_string();

        let parts = vec![
            Part::Text("places", "Kasol"),
            Part::File("images", "new.jpg", b"new"),
        ];
        let response = app
            .clone()
            .oneshot(multipart_request("PUT", &format!("/api/tours/{}", id), &parts))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let updated = read_json(response).await;

        assert_eq!(updated["state"], "Himachal");
        assert_eq!(updated["places"], "Kasol");
        let new_url = updated["images"][0].as_str().unwrap().to_string();
        assert_ne!(new_url, old_url);
        assert_eq!(updated["images"].as_array().unwrap().len(), 1);

        let response = app
            .clone()
            .oneshot(empty_request("GET", &format!("/api/tours/{}", id)))
            .await
            .unwrap();
        assert_eq!(read_json(response).await["images"], updated["images"]);

        let response = app
            .clone()
            .oneshot(empty_request("GET", &new_url))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // Old file is removed in the background
        let mut gone = false;
        for _ in 0..200 {
            let response = app
                .clone()
                .oneshot(empty_request("GET", &old_url))
                .await
                .unwrap();
            if response.status() == StatusCode::NOT_FOUND {
                gone = true;
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(gone, "old image should eventually 404");
    }

    #[tokio::test]
    async fn test_update_accepts_json_text_fields() {
        let (_dir, ctx) = test_context(1024, 15).await;
        let app = build_router(ctx);

        let images: [(&str, &[u8]); 1] = [("a.jpg", b"a")];
        let response = app
            .clone()
            .oneshot(multipart_request("POST", "/api/tours", &tour_parts(&images)))
            .await
            .unwrap();
        let created = read_json(response).await;
        let id = created["id"].as_str().unwrap();

        let request = HttpRequest::builder()
            .method("PUT")
            .uri(format!("/api/tours/{}", id))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"description":"Snow"}"#))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let updated = read_json(response).await;
        assert_eq!(updated["description"], "Snow");
        assert_eq!(updated["state"], "Himachal");
        assert_eq!(updated["images"], created["images"]);
    }

    #[tokio::test]
    async fn test_update_accepts_urlencoded_text_fields() {
        let (_dir, ctx) = test_context(1024, 15).await;
        let app = build_router(ctx);

        let images: [(&str, &[u8]); 1] = [("a.jpg", b"a")];
        let response = app
            .clone()
            .oneshot(multipart_request("POST", "/api/tours", &tour_parts(&images)))
            .await
            .unwrap();
        let created = read_json(response).await;
        let id = created["id"].as_str().unwrap();

        let request = HttpRequest::builder()
            .method("PUT")
            .uri(format!("/api/tours/{}", id))
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("state=Uttarakhand&places=Rishikesh%2C+Auli"))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let updated = read_json(response).await;
        assert_eq!(updated["state"], "Uttarakhand");
        assert_eq!(updated["places"], "Rishikesh, Auli");
        assert_eq!(updated["description"], "Mountain passes");
        assert_eq!(updated["images"], created["images"]);

        // Blank supplied field is still a validation error
        let request = HttpRequest::builder()
            .method("PUT")
            .uri(format!("/api/tours/{}", id))
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("description="))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_delete_then_everything_is_gone() {
        let (dir, ctx) = test_context(1024, 15).await;
        let app = build_router(ctx);

        let images: [(&str, &[u8]); 2] = [("a.jpg", b"a"), ("b.jpg", b"b")];
        let response = app
            .clone()
            .oneshot(multipart_request("POST", "/api/tours", &tour_parts(&images)))
            .await
            .unwrap();
        let created = read_json(response).await;
        let id = created["id"].as_str().unwrap();

        let response = app
            .clone()
            .oneshot(empty_request("DELETE", &format!("/api/tours/{}", id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["message"], "Tour deleted successfully");
        assert_eq!(body["tour"], created);

        let response = app
            .oneshot(empty_request("GET", &format!("/api/tours/{}", id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let path = dir.path().to_path_buf();
        assert!(wait_until(|| std::fs::read_dir(&path).unwrap().count() == 0).await);
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found_everywhere() {
        let (dir, ctx) = test_context(1024, 15).await;
        let app = build_router(ctx);
        let uri = "/api/tours/does-not-exist";

        let response = app.clone().oneshot(empty_request("GET", uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(read_json(response).await["error"], "NotFound");

        let parts = vec![
            Part::Text("state", "Goa"),
            Part::File("images", "a.jpg", b"a"),
        ];
        let response = app
            .clone()
            .oneshot(multipart_request("PUT", uri, &parts))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app
            .clone()
            .oneshot(empty_request("DELETE", uri))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app.oneshot(empty_request("GET", "/api/tours")).await.unwrap();
        assert_eq!(read_json(response).await, serde_json::json!([]));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_missing_upload_is_not_found() {
        let (_dir, ctx) = test_context(1024, 15).await;
        let app = build_router(ctx);

        let response = app
            .oneshot(empty_request("GET", "/uploads/nothing-1.jpg"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
