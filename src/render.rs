// Rendering collaborator - turns a template name and context into a body

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::{json, Value};

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    pub content_type: String,
    pub body: Vec<u8>,
}

impl RenderedPage {
    pub fn into_response_with(self, status: StatusCode) -> Response {
        (status, [(header::CONTENT_TYPE, self.content_type)], self.body).into_response()
    }
}

impl IntoResponse for RenderedPage {
    fn into_response(self) -> Response {
        self.into_response_with(StatusCode::OK)
    }
}

pub trait Renderer: Send + Sync {
    fn render(&self, template: &str, context: &Value) -> AppResult<RenderedPage>;
}

/// Emits the template name and context as a JSON document.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer;

impl Renderer for JsonRenderer {
    fn render(&self, template: &str, context: &Value) -> AppResult<RenderedPage> {
        let body = serde_json::to_vec(&json!({
            "template": template,
            "context": context,
        }))
        .map_err(|e| AppError::Internal(format!("Failed to render {}: {}", template, e)))?;

        Ok(RenderedPage {
            content_type: "application/json".to_string(),
            body,
        })
    }
}

/// 302 Found to `location`.
pub fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_renderer_wraps_context() {
        let page = JsonRenderer
            .render("posts/index.html", &json!({"page_obj": []}))
            .unwrap();
        let value: Value = serde_json::from_slice(&page.body).unwrap();
        assert_eq!(value["template"], "posts/index.html");
        assert!(value["context"]["page_obj"].is_array());
        assert_eq!(page.content_type, "application/json");
    }

    #[test]
    fn test_found_sets_location() {
        let response = found("/posts/1/");
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "/posts/1/");
    }
}
