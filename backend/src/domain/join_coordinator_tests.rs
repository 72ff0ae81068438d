//! Tests for the join coordinator.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::Duration;
use rstest::rstest;

use super::*;
use crate::domain::{PoolDraft, PoolErrorCode};
use crate::domain::ports::{
    DiscardingOrderSink, FixedPriceCatalog, MockCatalogService, MockOrderSink, MockPoolRepository,
    OrderSinkError,
};
use crate::test_support::{fixture_clock, fixture_now, pool_draft, pool_with};

fn price() -> Decimal {
    Decimal::new(1250, 2)
}

fn coordinator<R, C, O>(repo: R, catalog: C, sink: O) -> JoinCoordinator<R, C, O> {
    JoinCoordinator::new(
        Arc::new(repo),
        Arc::new(catalog),
        Arc::new(sink),
        fixture_clock(),
        Arc::new(PoolLocks::new()),
    )
}

fn stores_with_bumped_version(pool: &Pool) -> Result<Pool, PoolRepositoryError> {
    Ok(pool.with_version(pool.version() + 1))
}

#[rstest]
#[tokio::test]
async fn accepted_join_saves_pool_and_records_priced_order() {
    let pool = pool_with(5, 1, fixture_now() + Duration::hours(1));
    let pool_id = pool.id();
    let member = UserId::random();

    let mut repo = MockPoolRepository::new();
    repo.expect_load().times(1).return_once(move |_| Ok(Some(pool)));
    repo.expect_save()
        .withf(|saved| saved.current_quantity() == 4 && saved.status() == PoolStatus::Active)
        .times(1)
        .returning(stores_with_bumped_version);
    let mut sink = MockOrderSink::new();
    sink.expect_record()
        .withf(move |order| order.user_id() == member && order.quantity() == 3)
        .times(1)
        .returning(|_| Ok(()));

    let outcome = coordinator(repo, FixedPriceCatalog(price()), sink)
        .join(pool_id, member, 3)
        .await
        .expect("join accepted");

    assert_eq!(outcome.accepted_quantity, 3);
    assert_eq!(outcome.current_quantity, 4);
    assert_eq!(outcome.remaining_slots, 1);
    assert_eq!(outcome.status, PoolStatus::Active);
    assert_eq!(outcome.unit_price, price());
    assert_eq!(outcome.order.total_price(), Decimal::new(3750, 2));
}

#[rstest]
#[tokio::test]
async fn join_reaching_target_reports_success() {
    let pool = pool_with(5, 3, fixture_now() + Duration::hours(1));
    let pool_id = pool.id();

    let mut repo = MockPoolRepository::new();
    repo.expect_load().return_once(move |_| Ok(Some(pool)));
    repo.expect_save()
        .withf(|saved| saved.status() == PoolStatus::Success)
        .times(1)
        .returning(stores_with_bumped_version);

    let outcome = coordinator(repo, FixedPriceCatalog(price()), DiscardingOrderSink)
        .join(pool_id, UserId::random(), 2)
        .await
        .expect("join accepted");

    assert_eq!(outcome.status, PoolStatus::Success);
    assert_eq!(outcome.remaining_slots, 0);
}

#[rstest]
#[case(0)]
#[case(-4)]
#[tokio::test]
async fn non_positive_quantity_is_rejected_before_loading(#[case] quantity: i64) {
    let mut repo = MockPoolRepository::new();
    repo.expect_load().times(0);

    let error = coordinator(repo, MockCatalogService::new(), MockOrderSink::new())
        .join(PoolId::random(), UserId::random(), quantity)
        .await
        .expect_err("quantity rejected");

    assert_eq!(error, PoolError::InvalidQuantity { quantity });
}

#[rstest]
#[tokio::test]
async fn expired_pool_is_persisted_failed_and_join_rejected() {
    let pool = pool_with(5, 2, fixture_now() - Duration::hours(1));
    let pool_id = pool.id();

    let mut repo = MockPoolRepository::new();
    repo.expect_load().return_once(move |_| Ok(Some(pool)));
    repo.expect_save()
        .withf(|saved| saved.status() == PoolStatus::Failed && saved.current_quantity() == 2)
        .times(1)
        .returning(stores_with_bumped_version);
    let mut sink = MockOrderSink::new();
    sink.expect_record().times(0);

    let error = coordinator(repo, MockCatalogService::new(), sink)
        .join(pool_id, UserId::random(), 1)
        .await
        .expect_err("expired pool rejects joins");

    assert_eq!(
        error,
        PoolError::PoolClosed {
            pool_id,
            status: PoolStatus::Failed,
        }
    );
}

#[rstest]
#[tokio::test]
async fn stored_terminal_pool_is_rejected_without_saving() {
    let pool = match Pool::new(PoolDraft {
        status: PoolStatus::Closed,
        ..pool_draft(5, 1, fixture_now() + Duration::hours(1))
    }) {
        Ok(pool) => pool,
        Err(error) => panic!("fixture pool must be valid: {error}"),
    };
    let pool_id = pool.id();

    let mut repo = MockPoolRepository::new();
    repo.expect_load().return_once(move |_| Ok(Some(pool)));
    repo.expect_save().times(0);

    let error = coordinator(repo, MockCatalogService::new(), MockOrderSink::new())
        .join(pool_id, UserId::random(), 1)
        .await
        .expect_err("closed pool rejects joins");

    assert_eq!(error.code(), PoolErrorCode::PoolClosed);
}

#[rstest]
#[tokio::test]
async fn oversized_join_reports_remaining_slots() {
    let pool = pool_with(10, 7, fixture_now() + Duration::hours(1));
    let pool_id = pool.id();

    let mut repo = MockPoolRepository::new();
    repo.expect_load().return_once(move |_| Ok(Some(pool)));
    repo.expect_save().times(0);

    let error = coordinator(repo, MockCatalogService::new(), MockOrderSink::new())
        .join(pool_id, UserId::random(), 5)
        .await
        .expect_err("capacity exceeded");

    assert_eq!(
        error,
        PoolError::InsufficientSlots {
            pool_id,
            requested: 5,
            remaining: 3,
        }
    );
}

#[rstest]
#[tokio::test]
async fn missing_pool_is_not_found() {
    let mut repo = MockPoolRepository::new();
    repo.expect_load().return_once(|_| Ok(None));
    let pool_id = PoolId::random();

    let error = coordinator(repo, MockCatalogService::new(), MockOrderSink::new())
        .join(pool_id, UserId::random(), 1)
        .await
        .expect_err("pool missing");

    assert_eq!(error, PoolError::PoolNotFound { pool_id });
}

#[rstest]
#[tokio::test]
async fn unknown_product_rejects_join_without_saving() {
    let pool = pool_with(5, 0, fixture_now() + Duration::hours(1));
    let pool_id = pool.id();
    let product_id = pool.product_id();

    let mut repo = MockPoolRepository::new();
    repo.expect_load().return_once(move |_| Ok(Some(pool)));
    repo.expect_save().times(0);
    let mut catalog = MockCatalogService::new();
    catalog.expect_price_of().return_once(|_| Ok(None));

    let error = coordinator(repo, catalog, MockOrderSink::new())
        .join(pool_id, UserId::random(), 1)
        .await
        .expect_err("product missing");

    assert_eq!(error, PoolError::ProductNotFound { product_id });
}

#[rstest]
#[tokio::test]
async fn conflict_retries_from_a_fresh_load() {
    let pool = pool_with(5, 1, fixture_now() + Duration::hours(1));
    let pool_id = pool.id();
    let saves = Arc::new(AtomicUsize::new(0));
    let save_calls = Arc::clone(&saves);

    let mut repo = MockPoolRepository::new();
    repo.expect_load()
        .times(2)
        .returning(move |_| Ok(Some(pool.clone())));
    repo.expect_save().times(2).returning(move |saved| {
        if save_calls.fetch_add(1, Ordering::SeqCst) == 0 {
            Err(PoolRepositoryError::conflict(saved.id(), saved.version()))
        } else {
            stores_with_bumped_version(saved)
        }
    });

    let outcome = coordinator(repo, FixedPriceCatalog(price()), DiscardingOrderSink)
        .join(pool_id, UserId::random(), 2)
        .await
        .expect("second attempt succeeds");

    assert_eq!(outcome.current_quantity, 3);
    assert_eq!(saves.load(Ordering::SeqCst), 2);
}

#[rstest]
#[case(1)]
#[case(3)]
#[tokio::test]
async fn persistent_conflict_surfaces_after_configured_attempts(#[case] attempts: u32) {
    let pool = pool_with(5, 1, fixture_now() + Duration::hours(1));
    let pool_id = pool.id();
    let expected_calls = usize::try_from(attempts).expect("attempt count fits usize");

    let mut repo = MockPoolRepository::new();
    repo.expect_load()
        .times(expected_calls)
        .returning(move |_| Ok(Some(pool.clone())));
    repo.expect_save()
        .times(expected_calls)
        .returning(|saved| Err(PoolRepositoryError::conflict(saved.id(), saved.version())));

    let error = coordinator(repo, FixedPriceCatalog(price()), DiscardingOrderSink)
        .with_config(JoinCoordinatorConfig::with_max_attempts(attempts))
        .join(pool_id, UserId::random(), 1)
        .await
        .expect_err("conflict persists");

    assert_eq!(error, PoolError::Conflict { pool_id, attempts });
}

#[rstest]
#[tokio::test]
async fn order_sink_failure_restores_previous_pool() {
    let pool = pool_with(5, 1, fixture_now() + Duration::hours(1));
    let pool_id = pool.id();

    let mut repo = MockPoolRepository::new();
    repo.expect_load().return_once(move |_| Ok(Some(pool)));
    repo.expect_save()
        .withf(|saved| saved.current_quantity() == 3)
        .times(1)
        .returning(stores_with_bumped_version);
    repo.expect_save()
        .withf(|restored| {
            restored.current_quantity() == 1
                && restored.status() == PoolStatus::Active
                && restored.version() == 1
        })
        .times(1)
        .returning(stores_with_bumped_version);
    let mut sink = MockOrderSink::new();
    sink.expect_record()
        .return_once(|_| Err(OrderSinkError::unavailable("disk full")));

    let error = coordinator(repo, FixedPriceCatalog(price()), sink)
        .join(pool_id, UserId::random(), 2)
        .await
        .expect_err("join rolled back");

    assert_eq!(error.code(), PoolErrorCode::StorageUnavailable);
    assert!(error.to_string().contains("disk full"));
}

#[rstest]
#[tokio::test]
async fn failed_rollback_is_reported() {
    let pool = pool_with(5, 1, fixture_now() + Duration::hours(1));
    let pool_id = pool.id();

    let mut repo = MockPoolRepository::new();
    repo.expect_load().return_once(move |_| Ok(Some(pool)));
    repo.expect_save()
        .withf(|saved| saved.current_quantity() == 3)
        .times(1)
        .returning(stores_with_bumped_version);
    repo.expect_save()
        .withf(|restored| restored.current_quantity() == 1)
        .times(1)
        .returning(|_| Err(PoolRepositoryError::connection("socket closed")));
    let mut sink = MockOrderSink::new();
    sink.expect_record()
        .return_once(|_| Err(OrderSinkError::unavailable("disk full")));

    let error = coordinator(repo, FixedPriceCatalog(price()), sink)
        .join(pool_id, UserId::random(), 2)
        .await
        .expect_err("join failed");

    assert_eq!(error.code(), PoolErrorCode::StorageUnavailable);
    assert!(error.to_string().contains("rollback failed"));
}

#[rstest]
#[tokio::test]
async fn rollback_conflict_withdraws_from_fresh_snapshot() {
    let draft = pool_draft(5, 1, fixture_now() + Duration::hours(1));
    let pool = Pool::new(draft.clone()).expect("valid pool");
    let pool_id = pool.id();
    let moved_on = Pool::new(PoolDraft {
        current_quantity: 4,
        version: 2,
        ..draft
    })
    .expect("valid pool");

    let mut repo = MockPoolRepository::new();
    repo.expect_load().times(1).return_once(move |_| Ok(Some(pool)));
    repo.expect_load().times(1).return_once(move |_| Ok(Some(moved_on)));
    repo.expect_save()
        .withf(|saved| saved.current_quantity() == 3)
        .times(1)
        .returning(stores_with_bumped_version);
    repo.expect_save()
        .withf(|restored| restored.current_quantity() == 1 && restored.version() == 1)
        .times(1)
        .returning(|restored| {
            Err(PoolRepositoryError::conflict(restored.id(), restored.version()))
        });
    repo.expect_save()
        .withf(|withdrawn| {
            withdrawn.current_quantity() == 2
                && withdrawn.status() == PoolStatus::Active
                && withdrawn.version() == 2
        })
        .times(1)
        .returning(stores_with_bumped_version);
    let mut sink = MockOrderSink::new();
    sink.expect_record()
        .return_once(|_| Err(OrderSinkError::unavailable("disk full")));

    let error = coordinator(repo, FixedPriceCatalog(price()), sink)
        .join(pool_id, UserId::random(), 2)
        .await
        .expect_err("join rolled back");

    assert_eq!(error.code(), PoolErrorCode::StorageUnavailable);
    assert!(error.to_string().contains("rolled back"));
}

#[rstest]
#[tokio::test]
async fn rollback_gives_up_after_repeated_conflicts() {
    let draft = pool_draft(5, 1, fixture_now() + Duration::hours(1));
    let pool = Pool::new(draft.clone()).expect("valid pool");
    let pool_id = pool.id();
    let moved_on = Pool::new(PoolDraft {
        current_quantity: 4,
        version: 2,
        ..draft
    })
    .expect("valid pool");

    let mut repo = MockPoolRepository::new();
    repo.expect_load().times(1).return_once(move |_| Ok(Some(pool)));
    repo.expect_load()
        .times(2)
        .returning(move |_| Ok(Some(moved_on.clone())));
    repo.expect_save()
        .withf(|saved| saved.current_quantity() == 3)
        .times(1)
        .returning(stores_with_bumped_version);
    repo.expect_save()
        .times(2)
        .returning(|restored| {
            Err(PoolRepositoryError::conflict(restored.id(), restored.version()))
        });
    let mut sink = MockOrderSink::new();
    sink.expect_record()
        .return_once(|_| Err(OrderSinkError::unavailable("disk full")));

    let error = coordinator(repo, FixedPriceCatalog(price()), sink)
        .with_config(JoinCoordinatorConfig::with_max_attempts(2))
        .join(pool_id, UserId::random(), 2)
        .await
        .expect_err("rollback failed");

    assert_eq!(error.code(), PoolErrorCode::StorageUnavailable);
    assert!(error.to_string().contains("rollback failed"));
}

#[rstest]
#[tokio::test]
async fn pool_deleted_before_save_is_not_found() {
    let pool = pool_with(5, 1, fixture_now() + Duration::hours(1));
    let pool_id = pool.id();

    let mut repo = MockPoolRepository::new();
    repo.expect_load().times(1).return_once(move |_| Ok(Some(pool)));
    repo.expect_save()
        .times(1)
        .returning(|saved| Err(PoolRepositoryError::not_found(saved.id())));
    let mut sink = MockOrderSink::new();
    sink.expect_record().times(0);

    let error = coordinator(repo, FixedPriceCatalog(price()), sink)
        .join(pool_id, UserId::random(), 2)
        .await
        .expect_err("pool vanished");

    assert_eq!(error, PoolError::PoolNotFound { pool_id });
}

#[rstest]
#[case(0, 1)]
#[case(3, 3)]
#[case(25, JoinCoordinatorConfig::MAX_ATTEMPTS_CEILING)]
fn attempt_budget_is_clamped(#[case] requested: u32, #[case] expected: u32) {
    assert_eq!(
        JoinCoordinatorConfig::with_max_attempts(requested).max_attempts(),
        expected
    );
}
