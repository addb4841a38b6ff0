use crate::store::{EnvironmentError, EnvironmentStore};
use crate::types::{Environment, EnvironmentId};
use async_trait::async_trait;
use http::StatusCode;
use std::time::Duration;
use url::Url;

/// Looks environments up in the persistence backend over HTTP.
#[derive(Clone)]
pub struct HttpEnvironmentStore {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpEnvironmentStore {
    pub fn new(mut base_url: Url, timeout: Duration) -> Result<Self, EnvironmentError> {
        // Url::join replaces the last segment unless the base ends with a slash
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(HttpEnvironmentStore { client, base_url })
    }

    fn environment_url(&self, id: EnvironmentId) -> Result<Url, EnvironmentError> {
        self.base_url
            .join(&id.to_string())
            .map_err(|_| EnvironmentError::NotFound(id))
    }
}

#[async_trait]
impl EnvironmentStore for HttpEnvironmentStore {
    async fn get(&self, id: EnvironmentId) -> Result<Environment, EnvironmentError> {
        let url = self.environment_url(id)?;
        let response = self.client.get(url).send().await?;

        match response.status() {
            StatusCode::OK => Ok(response.json::<Environment>().await?),
            StatusCode::NOT_FOUND => Err(EnvironmentError::NotFound(id)),
            status => Err(EnvironmentError::UnexpectedStatus(status)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::Full;
    use hyper::body::{Bytes, Incoming};
    use hyper::service::service_fn;
    use hyper::{Request, Response};
    use hyper_util::rt::{TokioExecutor, TokioIo};
    use std::convert::Infallible;
    use tokio::net::TcpListener;

    async fn backend_handler(req: Request<Incoming>) -> Result<Response<Full<Bytes>>, Infallible> {
        let (status, body) = match req.uri().path() {
            "/api/v1/environments/7" => (
                200,
                r#"{"id":7,"name":"staging","authConfigs":"{\"svc1\":{\"tokenUrl\":\"http://auth\"}}"}"#,
            ),
            "/api/v1/environments/9" => (500, "boom"),
            _ => (404, ""),
        };

        let mut response = Response::new(Full::new(Bytes::from(body)));
        *response.status_mut() = hyper::StatusCode::from_u16(status).unwrap();
        response
            .headers_mut()
            .insert("content-type", "application/json".parse().unwrap());
        Ok(response)
    }

    async fn start_backend() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            loop {
                let (stream, _) = listener.accept().await.unwrap();
                let io = TokioIo::new(stream);

                tokio::spawn(async move {
                    let _ = hyper_util::server::conn::auto::Builder::new(TokioExecutor::new())
                        .serve_connection(io, service_fn(backend_handler))
                        .await;
                });
            }
        });

        port
    }

    #[tokio::test]
    async fn test_http_store_lookup() {
        let port = start_backend().await;
        // No trailing slash on purpose
        let base = Url::parse(&format!("http://127.0.0.1:{port}/api/v1/environments")).unwrap();
        let store = HttpEnvironmentStore::new(base, Duration::from_secs(5)).unwrap();

        let env = store.get(7).await.unwrap();
        assert_eq!(env.name, "staging");
        assert!(env.auth_configs().unwrap().unwrap().contains_key("svc1"));

        assert!(matches!(
            store.get(8).await,
            Err(EnvironmentError::NotFound(8))
        ));

        assert!(matches!(
            store.get(9).await,
            Err(EnvironmentError::UnexpectedStatus(StatusCode::INTERNAL_SERVER_ERROR))
        ));
    }

    #[tokio::test]
    async fn test_http_store_unreachable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let base = Url::parse(&format!("http://127.0.0.1:{port}/api/v1/environments/")).unwrap();
        let store = HttpEnvironmentStore::new(base, Duration::from_secs(1)).unwrap();

        assert!(matches!(
            store.get(1).await,
            Err(EnvironmentError::ReqwestError(_))
        ));
    }
}
