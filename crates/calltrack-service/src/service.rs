use calltrack_cache::{CacheEntry, CacheError, CacheKey, Cacher};
use url::Url;

use crate::config::Config;
use crate::fetch::NumberFetcher;
use crate::types::{CallTrackingResponse, LinkRewrite};

/// The call tracking resolution service.
///
/// Owns the response cache and the fetcher, and is the entry point a hosting
/// environment calls into: it validates the config URL, resolves the vendor
/// response through the single-flight cache, and computes the resulting link
/// rewrite. Cloning the service shares the underlying cache.
#[derive(Clone, Debug)]
pub struct CallTrackingService {
    cache: Cacher<CallTrackingResponse>,
    fetcher: NumberFetcher,
}

impl CallTrackingService {
    /// Creates a new service with an empty response cache.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        Ok(CallTrackingService {
            cache: Cacher::new(),
            fetcher: NumberFetcher::new(&config)?,
        })
    }

    /// Resolves the vendor response for the given config URL.
    ///
    /// The URL is fetched at most once for the lifetime of the cache; repeat
    /// and concurrent resolutions for the same URL share one outcome,
    /// including recorded failures.
    pub async fn resolve(&self, config_url: &str) -> CacheEntry<CallTrackingResponse> {
        let url = validate_config_url(config_url)?;
        let fetcher = self.fetcher.clone();

        self.cache
            .get_or_fetch(CacheKey::new(url.as_str()), move || async move {
                fetcher.fetch(url).await
            })
            .await
    }

    /// Resolves the config URL and computes the hyperlink rewrite for it.
    pub async fn rewrite(&self, config_url: &str) -> CacheEntry<LinkRewrite> {
        Ok(self.resolve(config_url).await?.link_rewrite())
    }

    /// Discards all cached responses.
    ///
    /// Subsequent resolutions fetch again, also for URLs whose fetch
    /// previously failed.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}

/// Validates that a config URL is well-formed and uses a secure scheme.
///
/// Plain `http` is only permitted for loopback hosts, which local development
/// and the test server rely on.
fn validate_config_url(raw: &str) -> Result<Url, CacheError> {
    let url =
        Url::parse(raw).map_err(|e| CacheError::Malformed(format!("invalid config url: {e}")))?;

    match url.scheme() {
        "https" => Ok(url),
        "http" if is_loopback(&url) => Ok(url),
        scheme => Err(CacheError::Malformed(format!(
            "config url must use https, got `{scheme}`"
        ))),
    }
}

fn is_loopback(url: &Url) -> bool {
    matches!(
        url.host_str(),
        Some("localhost" | "127.0.0.1" | "[::1]" | "::1")
    )
}

#[cfg(test)]
mod tests {
    use calltrack_test as test;

    use super::*;

    fn service() -> CallTrackingService {
        CallTrackingService::new(Config::default()).unwrap()
    }

    // Fully qualified because `use calltrack_test as test` shadows `test`.
    #[::core::prelude::v1::test]
    fn test_validate_config_url() {
        assert!(validate_config_url("https://vendor.example/number").is_ok());
        assert!(validate_config_url("http://localhost:3000/number").is_ok());
        assert!(validate_config_url("http://127.0.0.1/number").is_ok());

        assert!(matches!(
            validate_config_url("http://vendor.example/number"),
            Err(CacheError::Malformed(_))
        ));
        assert!(matches!(
            validate_config_url("ftp://vendor.example/number"),
            Err(CacheError::Malformed(_))
        ));
        assert!(matches!(
            validate_config_url("not a url"),
            Err(CacheError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn test_repeat_resolutions_hit_the_network_once() {
        test::setup();
        let server = test::HitCounter::new();
        let service = service();
        let url = server.url("/number/1-555-0100");

        let first = service.resolve(url.as_str()).await.unwrap();
        let second = service.resolve(url.as_str()).await.unwrap();

        assert_eq!(first.phone_number, "+1-555-0100");
        assert_eq!(second, first);
        assert_eq!(server.accesses(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_resolutions_share_one_fetch() {
        test::setup();
        let server = test::HitCounter::new();
        let service = service();
        let url = server.url("/delay/50ms/1-555-0100");

        let (a, b, c) = futures::join!(
            service.resolve(url.as_str()),
            service.resolve(url.as_str()),
            service.resolve(url.as_str()),
        );

        assert_eq!(a.unwrap().phone_number, "+1-555-0100");
        assert_eq!(b.unwrap().phone_number, "+1-555-0100");
        assert_eq!(c.unwrap().phone_number, "+1-555-0100");
        assert_eq!(server.accesses(), 1);
    }

    #[tokio::test]
    async fn test_failures_are_cached_until_clear() {
        test::setup();
        let server = test::HitCounter::new();
        let service = service();
        // The first request to this endpoint fails, subsequent ones succeed.
        let url = server.url("/flaky/1-555-0200");

        let first = service.resolve(url.as_str()).await;
        assert!(matches!(first, Err(CacheError::DownloadError(_))));

        // The recorded failure is redelivered without another request.
        let second = service.resolve(url.as_str()).await;
        assert_eq!(second, first);

        service.clear_cache();

        // After a clear, the fetch actually executes again and succeeds.
        let third = service.resolve(url.as_str()).await.unwrap();
        assert_eq!(third.phone_number, "+1-555-0200");
        assert_eq!(server.accesses(), 2);
    }

    #[tokio::test]
    async fn test_distinct_urls_are_fetched_independently() {
        test::setup();
        let server = test::HitCounter::new();
        let service = service();

        let failed = service
            .resolve(server.url("/respond_statuscode/500").as_str())
            .await;
        assert!(matches!(failed, Err(CacheError::DownloadError(_))));

        let resolved = service
            .resolve(server.url("/number/1-555-0300").as_str())
            .await
            .unwrap();
        assert_eq!(resolved.phone_number, "+1-555-0300");
        assert_eq!(server.accesses(), 2);
    }

    #[tokio::test]
    async fn test_http_error_statuses() {
        test::setup();
        let server = test::HitCounter::new();
        let service = service();

        let not_found = service
            .resolve(server.url("/respond_statuscode/404").as_str())
            .await;
        assert_eq!(not_found, Err(CacheError::NotFound));

        let denied = service
            .resolve(server.url("/respond_statuscode/403").as_str())
            .await;
        assert!(matches!(denied, Err(CacheError::PermissionDenied(_))));
    }

    #[tokio::test]
    async fn test_rejects_malformed_responses() {
        test::setup();
        let server = test::HitCounter::new();
        let service = service();

        let garbage = service.resolve(server.url("/malformed").as_str()).await;
        assert!(matches!(garbage, Err(CacheError::Malformed(_))));

        let empty = service.resolve(server.url("/empty").as_str()).await;
        match empty {
            Err(CacheError::Malformed(msg)) => assert!(msg.contains("phoneNumber")),
            other => panic!("expected malformed error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_rewrite_uses_formatted_number() {
        test::setup();
        let server = test::HitCounter::new();
        let service = service();

        let rewrite = service
            .rewrite(server.url("/formatted/1-555-0100").as_str())
            .await
            .unwrap();
        assert_eq!(rewrite.href, "tel:+1-555-0100");
        assert_eq!(rewrite.text, "(1-555-0100)");
    }
}
