//! Behaviour of the cache-aside communication service.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use healthgateway_cache::{CacheBackend, CacheProvider, get_typed};
use healthgateway_core::{
    BANNER_CACHE_KEY, BannerChangeEvent, Communication, CommunicationType, ErrorTranslator,
    FixedClock, IN_APP_CACHE_KEY, RequestResult, ResultType,
};
use healthgateway_server::{CommunicationError, CommunicationService};
use healthgateway_storage::{CommunicationStorage, DbResult, InMemoryCommunicationStorage};
use time::macros::datetime;
use time::{Duration, OffsetDateTime};

const NOW: OffsetDateTime = datetime!(2024-06-01 12:00:00 UTC);

/// In-memory storage that counts reads.
struct CountingStorage {
    inner: InMemoryCommunicationStorage,
    reads: AtomicUsize,
}

#[async_trait]
impl CommunicationStorage for CountingStorage {
    async fn get_next(&self, communication_type: CommunicationType) -> DbResult<Option<Communication>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.get_next(communication_type).await
    }

    fn backend_name(&self) -> &'static str {
        "counting"
    }
}

struct FailingStorage;

#[async_trait]
impl CommunicationStorage for FailingStorage {
    async fn get_next(&self, _: CommunicationType) -> DbResult<Option<Communication>> {
        DbResult::error("connection refused")
    }

    fn backend_name(&self) -> &'static str {
        "failing"
    }
}

struct Harness {
    storage: Arc<CountingStorage>,
    cache: Arc<CacheBackend>,
    service: CommunicationService,
}

impl Harness {
    fn new() -> Self {
        let clock = Arc::new(FixedClock::new(NOW));
        let storage = Arc::new(CountingStorage {
            inner: InMemoryCommunicationStorage::new(clock.clone()),
            reads: AtomicUsize::new(0),
        });
        let cache = Arc::new(CacheBackend::new_local());
        let service = CommunicationService::new(
            storage.clone(),
            cache.clone(),
            ErrorTranslator::new("testhost"),
            clock,
        );
        Self {
            storage,
            cache,
            service,
        }
    }

    fn store(&self, communication: &Communication) {
        self.storage.inner.upsert(communication.clone());
    }

    fn reads(&self) -> usize {
        self.storage.reads.load(Ordering::SeqCst)
    }

    async fn cached(&self, key: &str) -> Option<RequestResult<Communication>> {
        get_typed(self.cache.as_ref(), key).await.unwrap()
    }

    fn cached_ttl(&self, key: &str) -> Option<StdDuration> {
        self.cache.local_cache().unwrap().get(key).unwrap().ttl
    }
}

fn banner(effective: Duration, expiry: Duration) -> Communication {
    Communication::new(CommunicationType::Banner, NOW + effective, NOW + expiry)
        .with_subject("Maintenance")
        .with_text("The site will be down tonight.")
}

#[tokio::test]
async fn active_banner_is_cached_until_expiry() {
    let h = Harness::new();
    let active = banner(Duration::days(-1), Duration::days(2));
    h.store(&active);

    let result = h
        .service
        .get_active_banner(CommunicationType::Banner)
        .await
        .unwrap();
    assert_eq!(result.result_status, ResultType::Success);
    assert_eq!(result.resource_payload.as_ref(), Some(&active));
    assert_eq!(result.total_result_count, Some(1));

    let entry = h.cached(BANNER_CACHE_KEY).await.unwrap();
    assert_eq!(entry.total_result_count, Some(1));
    assert_eq!(h.cached_ttl(BANNER_CACHE_KEY), Some(StdDuration::from_secs(2 * 86_400)));

    // Served from cache from now on.
    h.storage.inner.delete(active.id);
    let again = h
        .service
        .get_active_banner(CommunicationType::Banner)
        .await
        .unwrap();
    assert_eq!(again.resource_payload, Some(active));
    assert_eq!(h.reads(), 1);
}

#[tokio::test]
async fn future_banner_is_cached_until_effective_but_not_returned() {
    let h = Harness::new();
    let future = banner(Duration::hours(3), Duration::hours(5));
    h.store(&future);

    let result = h
        .service
        .get_active_banner(CommunicationType::Banner)
        .await
        .unwrap();
    assert!(result.is_success());
    assert_eq!(result.resource_payload, None);
    assert_eq!(result.total_result_count, Some(0));

    let entry = h.cached(BANNER_CACHE_KEY).await.unwrap();
    assert_eq!(entry.resource_payload, Some(future));
    assert_eq!(entry.total_result_count, Some(0));
    assert_eq!(h.cached_ttl(BANNER_CACHE_KEY), Some(StdDuration::from_secs(3 * 3_600)));
}

#[tokio::test]
async fn nothing_active_caches_empty_result_without_expiry() {
    let h = Harness::new();

    let result = h
        .service
        .get_active_banner(CommunicationType::InApp)
        .await
        .unwrap();
    assert_eq!(result, RequestResult::empty());

    let entry = h.cached(IN_APP_CACHE_KEY).await.unwrap();
    assert_eq!(entry.resource_payload, None);
    assert_eq!(h.cached_ttl(IN_APP_CACHE_KEY), None);

    // The empty entry is a hit.
    h.service
        .get_active_banner(CommunicationType::InApp)
        .await
        .unwrap();
    assert_eq!(h.reads(), 1);
}

#[tokio::test]
async fn storage_error_returns_translated_code_and_caches_nothing() {
    let cache = Arc::new(CacheBackend::new_local());
    let service = CommunicationService::new(
        Arc::new(FailingStorage),
        cache.clone(),
        ErrorTranslator::new("testhost"),
        Arc::new(FixedClock::new(NOW)),
    );

    let result = service
        .get_active_banner(CommunicationType::Banner)
        .await
        .unwrap();

    assert_eq!(result.result_status, ResultType::Error);
    assert_eq!(result.resource_payload, None);
    let error = result.result_error.unwrap();
    assert_eq!(error.error_code, "testhostServer-CI-DB");
    assert_eq!(error.result_message, "connection refused");
    assert!(cache.get_item(BANNER_CACHE_KEY).await.is_none());
}

#[tokio::test]
async fn email_is_not_a_banner_type() {
    let h = Harness::new();
    let err = h
        .service
        .get_active_banner(CommunicationType::Email)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CommunicationError::InvalidCommunicationType(CommunicationType::Email)
    ));
    assert_eq!(h.reads(), 0);
}

#[tokio::test]
async fn delete_of_cached_banner_evicts_and_next_lookup_reads_storage() {
    let h = Harness::new();
    let a = banner(Duration::days(-1), Duration::days(2));
    h.store(&a);

    let result = h
        .service
        .get_active_banner(CommunicationType::Banner)
        .await
        .unwrap();
    assert_eq!(result.resource_payload.as_ref(), Some(&a));

    h.storage.inner.delete(a.id);
    h.service
        .process_change(&BannerChangeEvent::deleted(a.clone()))
        .await;
    assert!(h.cache.get_item(BANNER_CACHE_KEY).await.is_none());

    let result = h
        .service
        .get_active_banner(CommunicationType::Banner)
        .await
        .unwrap();
    assert_eq!(result.resource_payload, None);
    assert_eq!(h.reads(), 2);
}

#[tokio::test]
async fn update_of_cached_banner_replaces_payload() {
    let h = Harness::new();
    let a = banner(Duration::days(-1), Duration::days(2));
    h.store(&a);
    h.service
        .get_active_banner(CommunicationType::Banner)
        .await
        .unwrap();

    let edited = a.clone().with_subject("Rescheduled");
    h.service
        .process_change(&BannerChangeEvent::updated(edited.clone()))
        .await;

    let entry = h.cached(BANNER_CACHE_KEY).await.unwrap();
    assert_eq!(entry.resource_payload, Some(edited));
    assert_eq!(entry.total_result_count, Some(1));
}

#[tokio::test]
async fn insert_replaces_cached_banner_only_when_strictly_earlier() {
    let h = Harness::new();
    let cached = banner(Duration::hours(-1), Duration::days(1));
    h.store(&cached);
    h.service
        .get_active_banner(CommunicationType::Banner)
        .await
        .unwrap();

    let later = banner(Duration::hours(1), Duration::days(1));
    h.service
        .process_change(&BannerChangeEvent::inserted(later))
        .await;
    let same_time = banner(Duration::hours(-1), Duration::days(2));
    h.service
        .process_change(&BannerChangeEvent::inserted(same_time))
        .await;
    let expired = banner(Duration::days(-3), Duration::days(-2));
    h.service
        .process_change(&BannerChangeEvent::inserted(expired))
        .await;
    assert_eq!(
        h.cached(BANNER_CACHE_KEY).await.unwrap().resource_payload,
        Some(cached.clone())
    );

    let earlier = banner(Duration::hours(-2), Duration::hours(6));
    h.service
        .process_change(&BannerChangeEvent::inserted(earlier.clone()))
        .await;
    assert_eq!(
        h.cached(BANNER_CACHE_KEY).await.unwrap().resource_payload,
        Some(earlier)
    );
    assert_eq!(h.cached_ttl(BANNER_CACHE_KEY), Some(StdDuration::from_secs(6 * 3_600)));
}

#[tokio::test]
async fn insert_with_empty_cache_populates_it() {
    let h = Harness::new();
    let a = banner(Duration::hours(-1), Duration::hours(1));

    h.service
        .process_change(&BannerChangeEvent::deleted(a.clone()))
        .await;
    assert!(h.cache.get_item(BANNER_CACHE_KEY).await.is_none());

    h.service
        .process_change(&BannerChangeEvent::inserted(a.clone()))
        .await;
    let result = h
        .service
        .get_active_banner(CommunicationType::Banner)
        .await
        .unwrap();
    assert_eq!(result.resource_payload, Some(a));
    assert_eq!(h.reads(), 0);
}

#[tokio::test]
async fn insert_replaces_cached_empty_result() {
    let h = Harness::new();
    h.service
        .get_active_banner(CommunicationType::Banner)
        .await
        .unwrap();

    let a = banner(Duration::hours(-1), Duration::hours(1));
    h.service
        .process_change(&BannerChangeEvent::inserted(a.clone()))
        .await;

    assert_eq!(
        h.cached(BANNER_CACHE_KEY).await.unwrap().resource_payload,
        Some(a)
    );
}

#[tokio::test]
async fn email_changes_are_ignored() {
    let h = Harness::new();
    let email = Communication::new(
        CommunicationType::Email,
        NOW - Duration::hours(1),
        NOW + Duration::hours(1),
    );

    h.service
        .process_change(&BannerChangeEvent::inserted(email))
        .await;

    assert!(h.cache.get_item(BANNER_CACHE_KEY).await.is_none());
    assert!(h.cache.get_item(IN_APP_CACHE_KEY).await.is_none());
}

#[tokio::test]
async fn clear_cache_evicts_both_types() {
    let h = Harness::new();
    h.service
        .get_active_banner(CommunicationType::Banner)
        .await
        .unwrap();
    h.service
        .get_active_banner(CommunicationType::InApp)
        .await
        .unwrap();
    assert_eq!(h.cache.stats().l1_entries, 2);

    h.service.clear_cache().await;

    assert!(h.cache.get_item(BANNER_CACHE_KEY).await.is_none());
    assert!(h.cache.get_item(IN_APP_CACHE_KEY).await.is_none());
}

#[tokio::test]
async fn undecodable_cache_entry_is_treated_as_miss() {
    let h = Harness::new();
    let a = banner(Duration::hours(-1), Duration::hours(1));
    h.store(&a);
    h.cache
        .add_item(BANNER_CACHE_KEY, vec![0xc1], None)
        .await;

    let result = h
        .service
        .get_active_banner(CommunicationType::Banner)
        .await
        .unwrap();

    assert_eq!(result.resource_payload, Some(a));
    assert_eq!(h.reads(), 1);
}

#[tokio::test]
async fn delete_of_different_earlier_banner_replaces_cached_one() {
    let h = Harness::new();
    let cached = banner(Duration::hours(-1), Duration::days(1));
    h.store(&cached);
    h.service
        .get_active_banner(CommunicationType::Banner)
        .await
        .unwrap();

    let earlier = banner(Duration::hours(-5), Duration::days(1));
    h.service
        .process_change(&BannerChangeEvent::deleted(earlier.clone()))
        .await;

    assert_eq!(
        h.cached(BANNER_CACHE_KEY).await.unwrap().resource_payload,
        Some(earlier)
    );
}

#[tokio::test]
async fn delete_of_different_later_banner_keeps_cached_one() {
    let h = Harness::new();
    let cached = banner(Duration::hours(-1), Duration::days(1));
    h.store(&cached);
    h.service
        .get_active_banner(CommunicationType::Banner)
        .await
        .unwrap();

    let later = banner(Duration::hours(2), Duration::days(1));
    h.service
        .process_change(&BannerChangeEvent::deleted(later))
        .await;

    assert_eq!(
        h.cached(BANNER_CACHE_KEY).await.unwrap().resource_payload,
        Some(cached)
    );
}

#[tokio::test]
async fn update_expiring_cached_banner_caches_empty_result_without_expiry() {
    let h = Harness::new();
    let a = banner(Duration::days(-1), Duration::days(2));
    h.store(&a);
    h.service
        .get_active_banner(CommunicationType::Banner)
        .await
        .unwrap();

    let mut ended = a.clone();
    ended.expiry_date_time = NOW - Duration::minutes(1);
    h.service
        .process_change(&BannerChangeEvent::updated(ended))
        .await;

    let entry = h.cached(BANNER_CACHE_KEY).await.unwrap();
    assert_eq!(entry.resource_payload, None);
    assert_eq!(h.cached_ttl(BANNER_CACHE_KEY), None);

    let result = h
        .service
        .get_active_banner(CommunicationType::Banner)
        .await
        .unwrap();
    assert_eq!(result, RequestResult::empty());
    assert_eq!(h.reads(), 1);
}

#[tokio::test]
async fn insert_of_expired_banner_into_empty_cache_caches_empty_result() {
    let h = Harness::new();
    let expired = banner(Duration::days(-3), Duration::days(-2));

    h.service
        .process_change(&BannerChangeEvent::inserted(expired))
        .await;

    let entry = h.cached(BANNER_CACHE_KEY).await.unwrap();
    assert_eq!(entry.resource_payload, None);
    assert!(entry.is_success());
    assert_eq!(h.cached_ttl(BANNER_CACHE_KEY), None);
}
