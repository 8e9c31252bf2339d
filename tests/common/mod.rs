//! Shared setup of the API tests: an in-memory store, a temporary media
//! root and helpers to sign up users and build requests.

use std::{io::Cursor, sync::Arc};

use chrono::Duration;
use image::{DynamicImage, ImageFormat, RgbImage};
use recipe_api::{
    jwt::TokenIssuer, media::MediaStore, memory::MemoryStore, routes, state::AppState,
};
use serde_json::{json, Value};
use temp_dir::TempDir;
use warp::{
    http::Response,
    hyper::body::Bytes,
    test::{request, RequestBuilder},
};

const BOUNDARY: &str = "recipe-api-test-boundary";

pub struct TestApp {
    pub state: AppState,
    pub media: TempDir,
}

#[allow(dead_code)]
impl TestApp {
    pub fn new() -> Self {
        let media = TempDir::new().unwrap();
        let tokens = TokenIssuer::new(b"test-secret", Duration::hours(1)).unwrap();
        let state = AppState::new(
            Arc::new(MemoryStore::new()),
            tokens,
            MediaStore::new(media.path(), "/media/"),
        );

        Self { state, media }
    }

    pub async fn send(&self, request: RequestBuilder) -> Response<Bytes> {
        request.reply(&routes(self.state.clone())).await
    }

    /// Signs up a user and returns a token for them.
    pub async fn user(&self, email: &str, password: &str) -> String {
        let created = self
            .send(
                request()
                    .method("POST")
                    .path("/api/user/create")
                    .json(&json!({ "email": email, "password": password, "name": "Test Name" })),
            )
            .await;
        assert_eq!(created.status(), 201, "{:?}", created.body());

        let token = self
            .send(
                request()
                    .method("POST")
                    .path("/api/user/token")
                    .json(&json!({ "email": email, "password": password })),
            )
            .await;
        assert_eq!(token.status(), 200, "{:?}", token.body());

        body(&token)["token"].as_str().unwrap().to_string()
    }

    /// Creates a recipe through the API and returns its representation.
    pub async fn recipe(&self, token: &str, payload: Value) -> Value {
        let mut recipe = json!({
            "title": "Sample recipe",
            "time_minutes": 10,
            "price": "5.00",
        });
        if let (Some(recipe), Some(payload)) = (recipe.as_object_mut(), payload.as_object()) {
            recipe.extend(payload.clone());
        }

        let res = self
            .send(authed("POST", "/api/recipe/recipes", token).json(&recipe))
            .await;
        assert_eq!(res.status(), 201, "{:?}", res.body());

        body(&res)
    }
}

#[allow(dead_code)]
pub fn authed(method: &str, path: &str, token: &str) -> RequestBuilder {
    request()
        .method(method)
        .path(path)
        .header("authorization", format!("Token {token}"))
}

#[allow(dead_code)]
pub fn body(res: &Response<Bytes>) -> Value {
    serde_json::from_slice(res.body()).unwrap()
}

/// A multipart body with a single file part.
#[allow(dead_code)]
pub fn multipart(builder: RequestBuilder, field: &str, bytes: &[u8]) -> RequestBuilder {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"upload.png\"\r\nContent-Type: application/octet-stream\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    builder
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(body)
}

#[allow(dead_code)]
pub fn png() -> Vec<u8> {
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(RgbImage::new(10, 10))
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}
