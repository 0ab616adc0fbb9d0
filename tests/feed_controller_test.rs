//! Integration tests for the feed controller against a scripted source.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{ids, posts, transport_error, ScriptedSource};
use e621_feed::feed::{FeedController, LoadOutcome, RenderDelta, RetryPolicy};
use e621_feed::source::{FetchError, FetchErrorKind};

fn controller(source: &ScriptedSource) -> FeedController<ScriptedSource> {
    FeedController::new(source.clone(), RetryPolicy::none(), "female")
}

fn retrying_controller(source: &ScriptedSource) -> FeedController<ScriptedSource> {
    let retry = RetryPolicy {
        max_attempts: 3,
        base_delay: Duration::ZERO,
        max_delay: Duration::ZERO,
    };
    FeedController::new(source.clone(), retry, "female")
}

#[tokio::test]
async fn test_pages_merge_in_order() {
    let source = ScriptedSource::new();
    source
        .respond("female", 1, Ok(posts(&[1, 2])))
        .respond("female", 2, Ok(posts(&[3, 4])));
    let feed = controller(&source);

    assert_eq!(
        feed.load_initial().await,
        LoadOutcome::Rendered(RenderDelta::Replace(posts(&[1, 2])))
    );
    assert_eq!(
        feed.load_more().await,
        LoadOutcome::Rendered(RenderDelta::Append(posts(&[3, 4])))
    );

    assert_eq!(ids(&feed.posts()), vec![1, 2, 3, 4]);
    let snapshot = feed.snapshot();
    assert_eq!(snapshot.page, 2);
    assert_eq!(snapshot.tags, "female");
    assert!(!snapshot.loading);
}

#[tokio::test]
async fn test_empty_page_wraps_around_to_first_page() {
    let source = ScriptedSource::new();
    source
        .respond("female", 1, Ok(posts(&[1, 2])))
        .respond("female", 1, Ok(posts(&[1, 2])));
    // page 2 is unscripted and comes back empty
    let feed = controller(&source);

    feed.load_initial().await;
    let outcome = feed.load_more().await;

    assert_eq!(outcome, LoadOutcome::Rendered(RenderDelta::Append(posts(&[1, 2]))));
    assert_eq!(ids(&feed.posts()), vec![1, 2, 1, 2]);

    let snapshot = feed.snapshot();
    assert_eq!(snapshot.page, 1);
    assert_eq!(snapshot.post_count, 4);
    assert_eq!(snapshot.unique_count, 2);
    assert!(snapshot.has_more);
    assert!(!snapshot.loading);
    assert_eq!(
        source.calls(),
        vec![
            ("female".to_string(), 1),
            ("female".to_string(), 2),
            ("female".to_string(), 1)
        ]
    );
}

#[tokio::test]
async fn test_feed_keeps_scrolling_after_wraparound() {
    let source = ScriptedSource::new();
    source
        .respond("female", 1, Ok(posts(&[1])))
        .respond("female", 1, Ok(posts(&[1])))
        .respond("female", 2, Ok(Vec::new()))
        .respond("female", 2, Ok(posts(&[2])));
    let feed = controller(&source);

    feed.load_initial().await;
    feed.load_more().await; // wraps
    let outcome = feed.load_more().await; // page 2 again

    assert_eq!(outcome, LoadOutcome::Rendered(RenderDelta::Append(posts(&[2]))));
    assert_eq!(ids(&feed.posts()), vec![1, 1, 2]);
    assert_eq!(feed.snapshot().page, 2);
}

#[tokio::test]
async fn test_wraparound_with_empty_first_page() {
    let source = ScriptedSource::new();
    source.respond("female", 1, Ok(posts(&[1])));
    let feed = controller(&source);

    feed.load_initial().await;
    assert_eq!(feed.load_more().await, LoadOutcome::Unchanged);
    assert_eq!(ids(&feed.posts()), vec![1]);
    assert_eq!(feed.snapshot().page, 1);
}

#[tokio::test]
async fn test_failed_wraparound_refetch_can_be_retried() {
    let source = ScriptedSource::new();
    source
        .respond("female", 1, Ok(posts(&[1, 2])))
        .respond("female", 1, Err(transport_error()))
        .respond("female", 1, Ok(posts(&[1, 2])));
    // page 2 is unscripted and comes back empty both times
    let feed = controller(&source);

    feed.load_initial().await;
    let LoadOutcome::Failed(failure) = feed.load_more().await else {
        panic!("expected failure");
    };
    assert_eq!(failure.kind, FetchErrorKind::Transport);
    assert_eq!(ids(&feed.posts()), vec![1, 2]);
    assert_eq!(feed.snapshot().page, 2);
    assert!(!feed.snapshot().loading);

    assert_eq!(
        feed.retry().await,
        LoadOutcome::Rendered(RenderDelta::Append(posts(&[1, 2])))
    );
    assert_eq!(ids(&feed.posts()), vec![1, 2, 1, 2]);
    assert_eq!(feed.snapshot().page, 1);
    assert_eq!(source.call_count(), 5);
}

#[tokio::test]
async fn test_retry_without_failure_does_nothing() {
    let source = ScriptedSource::new();
    source
        .respond("female", 1, Ok(posts(&[1, 2])))
        .respond("female", 1, Ok(posts(&[1, 2])));
    let feed = controller(&source);

    feed.load_initial().await;
    assert_eq!(feed.retry().await, LoadOutcome::Unchanged);

    assert_eq!(ids(&feed.posts()), vec![1, 2]);
    assert_eq!(source.call_count(), 1);
}

#[tokio::test]
async fn test_retry_only_once_after_recovery() {
    let source = ScriptedSource::new();
    source
        .respond("female", 1, Err(transport_error()))
        .respond("female", 1, Ok(posts(&[1])))
        .respond("female", 1, Ok(posts(&[1])));
    let feed = controller(&source);

    assert!(matches!(feed.load_initial().await, LoadOutcome::Failed(_)));
    assert_eq!(
        feed.retry().await,
        LoadOutcome::Rendered(RenderDelta::Replace(posts(&[1])))
    );
    assert_eq!(feed.retry().await, LoadOutcome::Unchanged);
    assert_eq!(ids(&feed.posts()), vec![1]);
    assert_eq!(source.call_count(), 2);
}

#[tokio::test]
async fn test_query_without_results() {
    let source = ScriptedSource::new();
    let feed = controller(&source);

    assert_eq!(feed.set_query("no_such_tag").await, LoadOutcome::NoResults);
    assert!(feed.posts().is_empty());
    assert_eq!(feed.snapshot().page, 1);
    assert_eq!(source.call_count(), 1);
}

#[tokio::test]
async fn test_set_query_is_idempotent() {
    let source = ScriptedSource::new();
    source.respond("wolf", 1, Ok(posts(&[7])));
    let feed = controller(&source);

    assert_eq!(
        feed.set_query("wolf").await,
        LoadOutcome::Rendered(RenderDelta::Replace(posts(&[7])))
    );
    assert_eq!(feed.set_query(" wolf ").await, LoadOutcome::Unchanged);

    assert_eq!(source.call_count(), 1);
    assert_eq!(ids(&feed.posts()), vec![7]);
}

#[tokio::test]
async fn test_set_query_resets_feed() {
    let source = ScriptedSource::new();
    source
        .respond("female", 1, Ok(posts(&[1, 2])))
        .respond("female", 2, Ok(posts(&[3])))
        .respond("fox", 1, Ok(posts(&[10])));
    let feed = controller(&source);

    feed.load_initial().await;
    feed.load_more().await;
    let outcome = feed.set_query("fox").await;

    assert_eq!(outcome, LoadOutcome::Rendered(RenderDelta::Replace(posts(&[10]))));
    assert_eq!(ids(&feed.posts()), vec![10]);
    assert_eq!(feed.snapshot().page, 1);
}

#[tokio::test]
async fn test_empty_query_uses_default_tags() {
    let source = ScriptedSource::new();
    source
        .respond("wolf", 1, Ok(posts(&[1])))
        .respond("female", 1, Ok(posts(&[2])))
        .respond("female", 2, Ok(posts(&[3])));
    let feed = controller(&source);

    feed.set_query("wolf").await;
    feed.set_query("").await;
    assert_eq!(feed.snapshot().tags, "");
    feed.load_more().await;

    assert_eq!(feed.snapshot().tags, "female");
    assert_eq!(ids(&feed.posts()), vec![2, 3]);
}

#[tokio::test]
async fn test_load_more_while_loading_dispatches_nothing() {
    let source = ScriptedSource::new();
    source
        .respond("female", 1, Ok(posts(&[1, 2])))
        .respond("female", 2, Ok(posts(&[3])));
    let gate = source.gate("female", 1);
    let feed = Arc::new(controller(&source));

    let initial = tokio::spawn({
        let feed = Arc::clone(&feed);
        async move { feed.load_initial().await }
    });
    source.wait_for_calls(1).await;

    assert!(feed.snapshot().loading);
    assert_eq!(feed.load_more().await, LoadOutcome::Skipped);
    assert_eq!(feed.load_more().await, LoadOutcome::Skipped);
    assert_eq!(feed.snapshot().page, 1);
    assert_eq!(source.call_count(), 1);

    gate.add_permits(1);
    let outcome = initial.await.unwrap();

    assert_eq!(outcome, LoadOutcome::Rendered(RenderDelta::Replace(posts(&[1, 2]))));
    assert!(!feed.snapshot().loading);
    assert_eq!(source.call_count(), 1);
}

#[tokio::test]
async fn test_late_response_for_abandoned_query_is_discarded() {
    let source = ScriptedSource::new();
    source
        .respond("female", 1, Ok(posts(&[1, 2])))
        .respond("fox", 1, Ok(posts(&[10])));
    let gate = source.gate("female", 1);
    let feed = Arc::new(controller(&source));

    let initial = tokio::spawn({
        let feed = Arc::clone(&feed);
        async move { feed.load_initial().await }
    });
    source.wait_for_calls(1).await;

    let search = feed.set_query("fox").await;
    assert_eq!(search, LoadOutcome::Rendered(RenderDelta::Replace(posts(&[10]))));

    gate.add_permits(1);
    assert_eq!(initial.await.unwrap(), LoadOutcome::Stale);

    assert_eq!(ids(&feed.posts()), vec![10]);
    let snapshot = feed.snapshot();
    assert_eq!(snapshot.tags, "fox");
    assert!(!snapshot.loading);
}

#[tokio::test]
async fn test_failure_leaves_state_untouched() {
    let source = ScriptedSource::new();
    source
        .respond("female", 1, Ok(posts(&[1, 2])))
        .respond("female", 2, Err(transport_error()))
        .respond("female", 2, Ok(posts(&[3])));
    let feed = controller(&source);

    feed.load_initial().await;
    let LoadOutcome::Failed(failure) = feed.load_more().await else {
        panic!("expected failure");
    };
    assert_eq!(failure.kind, FetchErrorKind::Transport);
    assert_eq!(
        failure.message,
        "Failed to connect to e621. Please check your internet connection."
    );

    let snapshot = feed.snapshot();
    assert_eq!(ids(&feed.posts()), vec![1, 2]);
    assert_eq!(snapshot.page, 2);
    assert!(!snapshot.loading);

    assert_eq!(
        feed.retry().await,
        LoadOutcome::Rendered(RenderDelta::Append(posts(&[3])))
    );
    assert_eq!(ids(&feed.posts()), vec![1, 2, 3]);
}

#[tokio::test]
async fn test_transport_failures_are_retried() {
    let source = ScriptedSource::new();
    source
        .respond("female", 1, Err(transport_error()))
        .respond("female", 1, Err(transport_error()))
        .respond("female", 1, Ok(posts(&[1])));
    let feed = retrying_controller(&source);

    assert_eq!(
        feed.load_initial().await,
        LoadOutcome::Rendered(RenderDelta::Replace(posts(&[1])))
    );
    assert_eq!(source.call_count(), 3);
}

#[tokio::test]
async fn test_retries_are_bounded() {
    let source = ScriptedSource::new();
    for _ in 0..4 {
        source.respond("female", 1, Err(transport_error()));
    }
    let feed = retrying_controller(&source);

    assert!(matches!(feed.load_initial().await, LoadOutcome::Failed(_)));
    assert_eq!(source.call_count(), 3);
    assert!(!feed.snapshot().loading);
}

#[tokio::test]
async fn test_format_errors_are_not_retried() {
    let source = ScriptedSource::new();
    source.respond("female", 1, Err(FetchError::Format("no posts array".to_string())));
    let feed = retrying_controller(&source);

    let LoadOutcome::Failed(failure) = feed.load_initial().await else {
        panic!("expected failure");
    };
    assert_eq!(failure.kind, FetchErrorKind::Format);
    assert_eq!(failure.message, "Received invalid data from e621. Please try again.");
    assert_eq!(source.call_count(), 1);
}
