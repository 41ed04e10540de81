//! Development server.
//!
//! Requests are forwarded to the configured upstream. HTML responses get the
//! live-reload snippet injected so that open pages refresh after a deploy.

mod reload;

pub use crate::serve::reload::{LiveReload, inject_script, script};

#[cfg(feature = "server")]
pub(crate) use crate::serve::proxy::start;

#[cfg(feature = "server")]
mod proxy {
    use std::net::{SocketAddr, TcpListener};
    use std::sync::Arc;
    use std::thread;

    use anyhow::Context;
    use axum::Router;
    use axum::body::{Body, to_bytes};
    use axum::extract::{Request, State};
    use axum::http::{HeaderMap, StatusCode, header};
    use axum::response::{IntoResponse, Response};
    use axum_server::tls_rustls::RustlsConfig;
    use console::style;
    use tower_http::trace::TraceLayer;
    use tracing::{error, info};

    use crate::config::{Scheme, ServeSpec};
    use crate::serve::reload::{inject_script, script};

    struct ProxyState {
        upstream: String,
        client: reqwest::Client,
        script: String,
    }

    #[derive(Debug, thiserror::Error)]
    enum ProxyError {
        #[error("upstream request failed: {0}")]
        Upstream(#[from] reqwest::Error),

        #[error("cannot read request body: {0}")]
        Body(#[from] axum::Error),
    }

    impl IntoResponse for ProxyError {
        fn into_response(self) -> Response {
            error!("proxy: {self}");
            (StatusCode::BAD_GATEWAY, self.to_string()).into_response()
        }
    }

    /// Bind the server and start serving on a background thread. Returns once
    /// the socket is bound and the certificates are loaded.
    pub(crate) fn start(spec: &ServeSpec, reload_port: u16) -> anyhow::Result<()> {
        let address = SocketAddr::from(([127, 0, 0, 1], spec.port));
        let listener = TcpListener::bind(address)
            .with_context(|| format!("binding the dev server to {address}"))?;
        listener.set_nonblocking(true)?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let tls = match spec.tls() {
            Some((key, cert)) => Some(
                runtime
                    .block_on(RustlsConfig::from_pem_file(cert, key))
                    .with_context(|| format!("loading TLS certificate {cert} and key {key}"))?,
            ),
            None => None,
        };

        let state = Arc::new(ProxyState {
            upstream: spec.proxy_url(),
            client: reqwest::Client::builder().build()?,
            script: script(reload_port),
        });

        let router = Router::new()
            .fallback(proxy)
            .with_state(state)
            .layer(TraceLayer::new_for_http());

        let scheme = match tls {
            Some(_) => Scheme::Https,
            None => Scheme::Http,
        };
        info!(
            url = %style(format!("{}://localhost:{}/", scheme.as_str(), spec.port)).yellow(),
            upstream = %spec.proxy_url(),
            "starting the dev server"
        );

        thread::Builder::new()
            .name("dev-server".into())
            .spawn(move || {
                let result = runtime.block_on(async move {
                    let service = router.into_make_service();
                    match tls {
                        Some(config) => {
                            axum_server::from_tcp_rustls(listener, config)
                                .serve(service)
                                .await
                        }
                        None => axum_server::from_tcp(listener).serve(service).await,
                    }
                });

                if let Err(e) = result {
                    error!("dev server stopped: {e}");
                }
            })?;

        Ok(())
    }

    async fn proxy(State(state): State<Arc<ProxyState>>, request: Request) -> Result<Response, ProxyError> {
        let (parts, body) = request.into_parts();

        let path = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let url = format!("{}{path}", state.upstream);

        let mut headers = parts.headers;
        headers.remove(header::HOST);
        // Bodies are rewritten, so ask upstream for plain ones.
        headers.remove(header::ACCEPT_ENCODING);

        let body = to_bytes(body, usize::MAX).await?;

        let upstream = state
            .client
            .request(parts.method, url)
            .headers(headers)
            .body(body)
            .send()
            .await?;

        let status = upstream.status();
        let mut headers = upstream.headers().clone();
        let content = upstream.bytes().await?;

        let content = match is_html(&headers) {
            true => inject_script(&content, &state.script).into(),
            false => content,
        };

        headers.remove(header::CONTENT_LENGTH);
        headers.remove(header::TRANSFER_ENCODING);

        let mut response = Response::new(Body::from(content));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        Ok(response)
    }

    fn is_html(headers: &HeaderMap) -> bool {
        headers
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("text/html"))
    }

}
