//! JSON envelopes: `{"<key>": payload}` on success, `{"error": {"message": ...}}` on failure.

use axum::{
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Serialize, Serializer, ser::SerializeMap};

struct Envelope<'a, T> {
    key: &'a str,
    payload: &'a T,
}

impl<T: Serialize> Serialize for Envelope<'_, T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.key, self.payload)?;
        map.end()
    }
}

#[derive(Serialize)]
struct ErrorMessage<'a> {
    message: &'a str,
}

pub fn write_json<T: Serialize>(status: StatusCode, payload: &T, wrap_key: &str) -> Response {
    render(status, &Envelope { key: wrap_key, payload })
}

pub fn write_error(status: StatusCode, message: &str) -> Response {
    render(status, &Envelope { key: "error", payload: &ErrorMessage { message } })
}

fn render<T: Serialize>(status: StatusCode, body: &T) -> Response {
    let body = match serde_json::to_vec(body) {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::error!(status = status.as_u16(), error = %err, "failed to serialize response body");
            Vec::new()
        },
    };

    let mut resp = (status, body).into_response();
    resp.headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    resp
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use http_body_util::BodyExt;
    use serde_json::{Value, json};

    use super::*;

    async fn body_json(resp: Response) -> Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn payload_is_wrapped_under_key() {
        let resp = write_json(StatusCode::OK, &vec![1, 2, 3], "movies");

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "application/json");
        assert_eq!(body_json(resp).await, json!({"movies": [1, 2, 3]}));
    }

    #[tokio::test]
    async fn error_envelope_carries_message_only() {
        let resp = write_error(StatusCode::BAD_REQUEST, "Not a valid movie id");

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await, json!({"error": {"message": "Not a valid movie id"}}));
    }

    #[tokio::test]
    async fn serialization_failure_keeps_status_and_headers() {
        // JSON object keys must be strings.
        let mut unserializable = BTreeMap::new();
        unserializable.insert(vec![1u8], "value");

        let resp = write_json(StatusCode::OK, &unserializable, "movie");

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "application/json");
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        assert!(bytes.is_empty());
    }
}
