#![expect(missing_docs, reason = "integration test")]

#[cfg(feature = "http")]
mod http_transport_tests {
    use trust_cache::config::HttpConfig;
    use trust_cache::constants::OCSP_REQUEST_CONTENT_TYPE;
    use trust_cache::{HttpTransport, Transport, TransportError};
    use url::Url;
    use wiremock::matchers::{body_bytes, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn url(server: &MockServer, route: &str) -> Url {
        Url::parse(&format!("{}{}", server.uri(), route)).unwrap()
    }

    #[tokio::test]
    async fn test_get_returns_body_and_cache_control() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ca.p7c"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(b"bundle".to_vec())
                    .insert_header("cache-control", "max-age=300"),
            )
            .mount(&server)
            .await;

        let transport = HttpTransport::new(&HttpConfig::default()).unwrap();
        let response = transport.get(&url(&server, "/ca.p7c")).await.unwrap();

        assert!(response.is_success());
        assert_eq!(response.status, 200);
        assert_eq!(response.body, b"bundle");
        assert_eq!(response.cache_control.as_deref(), Some("max-age=300"));
        assert_eq!(response.reason, "OK");
    }

    #[tokio::test]
    async fn test_get_reports_non_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let transport = HttpTransport::new(&HttpConfig::default()).unwrap();
        let response = transport.get(&url(&server, "/missing.crl")).await.unwrap();

        assert!(!response.is_success());
        assert_eq!(response.status, 404);
        assert!(response.body.is_empty());
    }

    #[tokio::test]
    async fn test_body_over_limit_is_refused() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 64]))
            .mount(&server)
            .await;

        let config = HttpConfig {
            max_body_bytes: 16,
            ..HttpConfig::default()
        };
        let transport = HttpTransport::new(&config).unwrap();
        let result = transport.get(&url(&server, "/big.p7c")).await;

        assert!(matches!(
            result,
            Err(TransportError::BodyTooLarge { limit: 16, .. })
        ));
    }

    #[tokio::test]
    async fn test_post_sends_content_type_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/ocsp"))
            .and(header("content-type", OCSP_REQUEST_CONTENT_TYPE))
            .and(body_bytes(vec![0x30, 0x00]))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0x30, 0x03]))
            .expect(1)
            .mount(&server)
            .await;

        let transport = HttpTransport::new(&HttpConfig::default()).unwrap();
        let response = transport
            .post(
                &url(&server, "/ocsp"),
                OCSP_REQUEST_CONTENT_TYPE,
                vec![0x30, 0x00],
            )
            .await
            .unwrap();

        assert_eq!(response.body, vec![0x30, 0x03]);
    }

    #[tokio::test]
    async fn test_unsupported_scheme_is_refused() {
        let transport = HttpTransport::new(&HttpConfig::default()).unwrap();
        let result = transport
            .get(&Url::parse("ldap://directory.test/cn=CA").unwrap())
            .await;

        assert!(matches!(
            result,
            Err(TransportError::UnsupportedScheme { scheme }) if scheme == "ldap"
        ));
    }
}
