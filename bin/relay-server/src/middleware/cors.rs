use crate::config::Config;
use axum::http::HeaderValue;
use tower_http::cors::{Any, CorsLayer};

pub fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .as_deref()
        .map(|list| {
            list.split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect()
        })
        .unwrap_or_default();

    let cors = CorsLayer::new().allow_headers(Any).allow_methods(Any);
    if origins.is_empty() {
        // Wildcard; set RELAY_CORS_ORIGINS to restrict.
        cors.allow_origin(Any)
    } else {
        cors.allow_origin(origins)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request};
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    async fn allowed_origin(config: &Config, origin: &str) -> Option<HeaderValue> {
        let app = Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(cors_layer(config));
        let res = app
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header(header::ORIGIN, origin)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        res.headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .cloned()
    }

    #[tokio::test]
    async fn wildcard_when_unset() {
        let config = Config::default();
        assert_eq!(
            allowed_origin(&config, "http://anywhere.test").await.unwrap(),
            "*"
        );
    }

    #[tokio::test]
    async fn restricted_list_is_honoured() {
        let config = Config {
            cors_allowed_origins: Some("http://a.test, http://b.test".into()),
            ..Config::default()
        };
        assert_eq!(
            allowed_origin(&config, "http://b.test").await.unwrap(),
            "http://b.test"
        );
        assert!(allowed_origin(&config, "http://evil.test").await.is_none());
    }
}
