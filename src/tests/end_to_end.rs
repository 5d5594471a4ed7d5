// Full path against a stub identity provider:
// OAuth2Exchanger -> TokenCache -> AuthGate -> HTTP token endpoint.
#[cfg(test)]
mod test {

    use std::sync::Arc;
    use std::time::Duration;

    use axum::http::StatusCode;
    use serde_json::Value;

    use crate::cache::token_cache::TokenCache;
    use crate::config::settings::{PoolConfig, SettingsConfig, TimeoutsConfig};
    use crate::error::AuthError;
    use crate::gate::auth_gate::AuthGate;
    use crate::helpers::time::ManualClock;
    use crate::resilience::retry::RetrySettings;
    use crate::server::server;
    use crate::sources::oauth2::OAuth2Exchanger;
    use crate::tests::common::{spawn_axum, test_credentials, FakeProvider};
    use crate::validator::build_validator;
    use crate::validator::token_validator::ExpiryValidator;

    fn gate(login_url: String, clock: &ManualClock, read_ms: u64) -> AuthGate<OAuth2Exchanger> {
        let timeouts = TimeoutsConfig {
            connection_request_ms: 1_000,
            connect_ms: 500,
            read_ms,
        };
        let exchanger = OAuth2Exchanger::new(test_credentials(login_url), &timeouts, &PoolConfig::default()).unwrap();
        AuthGate::new(TokenCache::with_parts(
            exchanger,
            Arc::new(ExpiryValidator::new(0)),
            Arc::new(clock.clone()),
            RetrySettings::no_retry(),
        ))
    }

    #[tokio::test]
    async fn token_is_fetched_cached_and_refreshed_after_expiry() {
        let provider = FakeProvider::new("tok123", 3_600);
        let (_srv, login_url) = provider.spawn().await;
        let clock = ManualClock::new(1_700_000_000);
        let gate = gate(login_url, &clock, 2_000);

        assert_eq!(gate.current_bearer_token().await.unwrap(), "tok123");
        assert_eq!(provider.hits(), 1);

        clock.advance(3_599);
        assert_eq!(gate.current_bearer_token().await.unwrap(), "tok123");
        assert_eq!(provider.hits(), 1, "still valid at 3599 s");

        clock.advance(2);
        assert_eq!(gate.current_bearer_token().await.unwrap(), "tok123");
        assert_eq!(provider.hits(), 2, "one new exchange at 3601 s");
    }

    #[tokio::test]
    async fn default_settings_serve_token_until_expiry() {
        let provider = FakeProvider::new("tok123", 3_600);
        let (_srv, login_url) = provider.spawn().await;
        let settings = SettingsConfig::default();
        let clock = ManualClock::new(1_700_000_000);

        let exchanger =
            OAuth2Exchanger::new(test_credentials(login_url), &settings.timeouts, &settings.pool).unwrap();
        let gate = AuthGate::new(TokenCache::with_parts(
            exchanger,
            build_validator(&settings.cache),
            Arc::new(clock.clone()),
            RetrySettings::from(&settings.retry),
        ));

        assert_eq!(gate.current_bearer_token().await.unwrap(), "tok123");
        clock.advance(3_550);
        assert_eq!(gate.current_bearer_token().await.unwrap(), "tok123");
        clock.advance(49);
        assert_eq!(gate.current_bearer_token().await.unwrap(), "tok123");
        assert_eq!(provider.hits(), 1, "served from cache up to 3599 s");

        clock.advance(2);
        gate.current_bearer_token().await.unwrap();
        assert_eq!(provider.hits(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn slow_provider_times_out_every_waiter() {
        let mut provider = FakeProvider::new("late", 3_600);
        provider.delay = Duration::from_millis(1_500);
        let (_srv, login_url) = provider.spawn().await;
        let gate = gate(login_url, &ManualClock::new(0), 200);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let gate = gate.clone();
                tokio::spawn(async move { gate.current_bearer_token().await })
            })
            .collect();

        for handle in handles {
            let err = handle.await.unwrap().unwrap_err();
            assert!(matches!(err, AuthError::ReadTimeout { .. }), "got {err:?}");
        }
        assert_eq!(provider.hits(), 1);
        assert!(gate.cache().peek().await.is_none());
    }

    #[tokio::test]
    async fn rejected_credentials_surface_status() {
        let mut provider = FakeProvider::new("unused", 3_600);
        provider.status = StatusCode::UNAUTHORIZED;
        let (_srv, login_url) = provider.spawn().await;
        let gate = gate(login_url, &ManualClock::new(0), 2_000);

        let err = gate.authorization_header().await.unwrap_err();
        assert!(matches!(err, AuthError::UpstreamRejected { status: 401 }));
        assert_eq!(err.to_string(), "authentication failed with status code: 401");
    }

    #[tokio::test]
    async fn http_endpoints_serve_token_and_metrics() {
        let provider = FakeProvider::new("tok123", 3_600);
        let (_provider_srv, login_url) = provider.spawn().await;
        let clock = ManualClock::new(1_700_000_000);
        let settings = SettingsConfig::default();

        let app = server::app(&settings, gate(login_url, &clock, 2_000)).await;
        let (_srv, addr) = spawn_axum(app).await;
        let client = reqwest::Client::new();

        let resp = client.get(format!("http://{}/token", addr)).send().await.unwrap();
        assert_eq!(resp.status().as_u16(), 200);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["access_token"], "tok123");
        assert_eq!(body["token_type"], "Bearer");
        assert_eq!(body["expires_in"], 3_600);

        clock.advance(600);
        let body: Value = client
            .get(format!("http://{}/token", addr))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["expires_in"], 3_000);
        assert_eq!(provider.hits(), 1);

        let metrics = client
            .get(format!("http://{}/metrics", addr))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(metrics.contains("mstokenagent_bearer_requests_total"));
    }

    #[tokio::test]
    async fn http_token_endpoint_reports_failures_as_503() {
        let mut provider = FakeProvider::new("unused", 3_600);
        provider.status = StatusCode::UNAUTHORIZED;
        let (_provider_srv, login_url) = provider.spawn().await;

        let app = server::app(&SettingsConfig::default(), gate(login_url, &ManualClock::new(0), 2_000)).await;
        let (_srv, addr) = spawn_axum(app).await;

        let resp = reqwest::get(format!("http://{}/token", addr)).await.unwrap();
        assert_eq!(resp.status().as_u16(), 503);
        let body: Value = resp.json().await.unwrap();
        assert!(body["error"].as_str().unwrap().contains("401"));
    }
}
