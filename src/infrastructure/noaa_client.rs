// NOAA SWPC client implementation
use crate::application::errors::FetchError;
use crate::application::space_weather_source::SpaceWeatherSource;
use crate::domain::space_weather::{DataSourceKind, SeriesPoint};
use crate::infrastructure::config::NoaaSettings;
use crate::infrastructure::http_transport::{HttpConnector, HttpExchange, TransportError};
use crate::infrastructure::noaa_payload::parse_series;
use async_trait::async_trait;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

pub struct NoaaClient {
    connector: Arc<dyn HttpConnector>,
    settings: NoaaSettings,
}

impl NoaaClient {
    pub fn new(connector: Arc<dyn HttpConnector>, settings: NoaaSettings) -> Self {
        Self {
            connector,
            settings,
        }
    }

    fn classify(source: DataSourceKind, url: &str, err: TransportError) -> FetchError {
        match err {
            TransportError::Unreachable(message) | TransportError::Io(message) => {
                tracing::error!("Network error fetching {} from {}: {}", source, url, message);
                FetchError::NoConnectivity
            }
            TransportError::Timeout(message) => {
                tracing::error!("Timeout fetching {} from {}: {}", source, url, message);
                FetchError::Timeout
            }
            TransportError::Other(message) => {
                tracing::error!("Unexpected error fetching {} from {}: {}", source, url, message);
                FetchError::Unclassified(message)
            }
        }
    }
}

/// Releases the exchange when dropped, whichever way the fetch exits.
struct ReleaseOnDrop(Box<dyn HttpExchange>);

impl Deref for ReleaseOnDrop {
    type Target = dyn HttpExchange;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

impl DerefMut for ReleaseOnDrop {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.0.as_mut()
    }
}

impl Drop for ReleaseOnDrop {
    fn drop(&mut self) {
        self.0.release();
    }
}

#[async_trait]
impl SpaceWeatherSource for NoaaClient {
    async fn fetch(
        &self,
        source: DataSourceKind,
        limit: usize,
    ) -> Result<Vec<SeriesPoint>, FetchError> {
        let limit = limit.max(1);
        let url = self.settings.endpoint(source);
        let mut exchange = ReleaseOnDrop(self.connector.open(url));

        let status = exchange
            .status()
            .await
            .map_err(|e| Self::classify(source, url, e))?;
        if status != 200 {
            tracing::error!("{} endpoint {} returned HTTP {}", source, url, status);
            return Err(FetchError::ServerRejected);
        }

        let body = exchange
            .read_body()
            .await
            .map_err(|e| Self::classify(source, url, e))?;

        let points = parse_series(source, &body, limit)?;
        tracing::debug!("Fetched {} {} points (limit {})", points.len(), source, limit);
        Ok(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::http_transport::ReqwestConnector;
    use axum::{Router, http::StatusCode, routing::get};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const KP_BODY: &str = r#"[["time_tag","Kp","a_running","station_count"],
        ["2024-05-10 00:00:00.000","2.33","9","8"],
        ["2024-05-10 03:00:00.000","5.00","39","8"],
        ["2024-05-10 06:00:00.000","8.67","300","8"]]"#;

    enum Scripted {
        Status(u16, &'static str),
        StatusError(TransportError),
        BodyError(TransportError),
    }

    struct ScriptedConnector {
        script: Mutex<Vec<Scripted>>,
        opened: Arc<Mutex<Vec<String>>>,
        releases: Arc<AtomicUsize>,
    }

    impl ScriptedConnector {
        fn new(script: Vec<Scripted>) -> Self {
            Self {
                script: Mutex::new(script),
                opened: Arc::new(Mutex::new(Vec::new())),
                releases: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn releases(&self) -> usize {
            self.releases.load(Ordering::SeqCst)
        }
    }

    impl HttpConnector for ScriptedConnector {
        fn open(&self, url: &str) -> Box<dyn HttpExchange> {
            self.opened.lock().unwrap().push(url.to_string());
            Box::new(ScriptedExchange {
                step: Some(self.script.lock().unwrap().remove(0)),
                releases: self.releases.clone(),
            })
        }
    }

    struct ScriptedExchange {
        step: Option<Scripted>,
        releases: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl HttpExchange for ScriptedExchange {
        async fn status(&mut self) -> Result<u16, TransportError> {
            match self.step.as_ref() {
                Some(Scripted::Status(code, _)) => Ok(*code),
                Some(Scripted::StatusError(err)) => Err(err.clone()),
                Some(Scripted::BodyError(_)) => Ok(200),
                None => Err(TransportError::Other("script exhausted".to_string())),
            }
        }

        async fn read_body(&mut self) -> Result<String, TransportError> {
            match self.step.take() {
                Some(Scripted::Status(_, body)) => Ok(body.to_string()),
                Some(Scripted::BodyError(err)) | Some(Scripted::StatusError(err)) => Err(err),
                None => Err(TransportError::Other("script exhausted".to_string())),
            }
        }

        fn release(&mut self) {
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn client_with(connector: Arc<ScriptedConnector>) -> NoaaClient {
        NoaaClient::new(connector, NoaaSettings::default())
    }

    #[tokio::test]
    async fn test_success_releases_once() {
        let connector = Arc::new(ScriptedConnector::new(vec![Scripted::Status(200, KP_BODY)]));
        let client = client_with(connector.clone());

        let points = client.fetch(DataSourceKind::KpIndex, 2).await.unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].value, 5.0);
        assert_eq!(points[1].value, 8.67);
        assert_eq!(connector.releases(), 1);
        assert_eq!(
            connector.opened.lock().unwrap().as_slice(),
            ["https://services.swpc.noaa.gov/products/noaa-planetary-k-index.json"]
        );
    }

    #[tokio::test]
    async fn test_every_failure_releases_once() {
        let cases = vec![
            (Scripted::Status(503, ""), FetchError::ServerRejected),
            (Scripted::Status(200, "not json"), FetchError::InvalidPayload),
            (Scripted::Status(200, r#"[["time_tag","Kp"]]"#), FetchError::InvalidPayload),
            (
                Scripted::StatusError(TransportError::Unreachable("dns".to_string())),
                FetchError::NoConnectivity,
            ),
            (
                Scripted::StatusError(TransportError::Timeout("read".to_string())),
                FetchError::Timeout,
            ),
            (
                Scripted::BodyError(TransportError::Io("reset".to_string())),
                FetchError::NoConnectivity,
            ),
            (
                Scripted::StatusError(TransportError::Other("bad scheme".to_string())),
                FetchError::Unclassified("bad scheme".to_string()),
            ),
        ];

        for (step, expected) in cases {
            let connector = Arc::new(ScriptedConnector::new(vec![step]));
            let client = client_with(connector.clone());

            let result = client.fetch(DataSourceKind::KpIndex, 24).await;
            assert_eq!(result, Err(expected.clone()));
            assert_eq!(connector.releases(), 1, "{expected:?}");
        }
    }

    #[tokio::test]
    async fn test_endpoint_follows_source() {
        let connector = Arc::new(ScriptedConnector::new(vec![
            Scripted::Status(200, "[]"),
            Scripted::Status(200, "[]"),
        ]));
        let client = client_with(connector.clone());

        let _ = client.fetch(DataSourceKind::ProtonFlux, 8).await;
        let _ = client.fetch(DataSourceKind::XrayFlux, 8).await;

        let opened = connector.opened.lock().unwrap().clone();
        assert!(opened[0].ends_with("integral-protons-plot-3-day.json"));
        assert!(opened[1].ends_with("xrays-3-day.json"));
        assert_eq!(connector.releases(), 2);
    }

    #[tokio::test]
    async fn test_zero_limit_is_treated_as_one() {
        let connector = Arc::new(ScriptedConnector::new(vec![Scripted::Status(200, KP_BODY)]));
        let client = client_with(connector);

        let points = client.fetch(DataSourceKind::KpIndex, 0).await.unwrap();
        assert_eq!(points, vec![SeriesPoint::new("2024-05-10 06:00:00.000", 8.67)]);
    }

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn settings_for(base: &str) -> NoaaSettings {
        NoaaSettings {
            kp_index_url: format!("{}/kp", base),
            proton_flux_url: format!("{}/proton", base),
            xray_flux_url: format!("{}/xray", base),
            connect_timeout_secs: 1.0,
            read_timeout_secs: 0.3,
            ..NoaaSettings::default()
        }
    }

    #[tokio::test]
    async fn test_http_503_is_server_rejected() {
        let base = serve(Router::new().route(
            "/kp",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "maintenance") }),
        ))
        .await;
        let settings = settings_for(&base);
        let client = NoaaClient::new(Arc::new(ReqwestConnector::new(&settings).unwrap()), settings);

        let result = client.fetch(DataSourceKind::KpIndex, 24).await;
        assert_eq!(result, Err(FetchError::ServerRejected));
    }

    #[tokio::test]
    async fn test_http_success_over_the_wire() {
        let base = serve(Router::new().route("/kp", get(|| async { KP_BODY }))).await;
        let settings = settings_for(&base);
        let client = NoaaClient::new(Arc::new(ReqwestConnector::new(&settings).unwrap()), settings);

        let points = client.fetch(DataSourceKind::KpIndex, 24).await.unwrap();
        assert_eq!(points.len(), 3);
        assert_eq!(points[0].time_tag, "2024-05-10 00:00:00.000");
    }

    #[tokio::test]
    async fn test_slow_server_times_out() {
        let base = serve(Router::new().route(
            "/xray",
            get(|| async {
                tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                "[]"
            }),
        ))
        .await;
        let settings = settings_for(&base);
        let client = NoaaClient::new(Arc::new(ReqwestConnector::new(&settings).unwrap()), settings);

        let result = client.fetch(DataSourceKind::XrayFlux, 24).await;
        assert_eq!(result, Err(FetchError::Timeout));
    }

    #[tokio::test]
    async fn test_closed_port_is_no_connectivity() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let settings = settings_for(&format!("http://{}", addr));
        let client = NoaaClient::new(Arc::new(ReqwestConnector::new(&settings).unwrap()), settings);

        let result = client.fetch(DataSourceKind::ProtonFlux, 24).await;
        assert_eq!(result, Err(FetchError::NoConnectivity));
    }

    #[tokio::test]
    async fn test_steady_slow_body_is_not_cut_off() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket.set_nodelay(true).unwrap();
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await.unwrap();

            let head = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
                KP_BODY.len()
            );
            socket.write_all(head.as_bytes()).await.unwrap();
            // each gap is under the read timeout, the whole body takes longer than connect + read
            for chunk in KP_BODY.as_bytes().chunks(KP_BODY.len() / 8 + 1) {
                tokio::time::sleep(std::time::Duration::from_millis(250)).await;
                socket.write_all(chunk).await.unwrap();
            }
        });

        let settings = NoaaSettings {
            read_timeout_secs: 0.6,
            ..settings_for(&format!("http://{}", addr))
        };
        let client = NoaaClient::new(Arc::new(ReqwestConnector::new(&settings).unwrap()), settings);

        let points = client.fetch(DataSourceKind::KpIndex, 24).await.unwrap();
        assert_eq!(points.len(), 3);
    }
}
