//! Integration Tests for the Memoize Engine
//!
//! Runs the public API against every in-process provider: the memory
//! provider storing structured values, the memory provider storing text,
//! and the disabled provider.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use memocache::{
    CacheProvider, DisabledCacheProvider, Memoize, MemoizeConfig, MemoizeError,
    MemoryCacheProvider, MemoryProviderConfig, ObjectFingerprint, Payload, SerializationOptions,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio_test::{assert_err, assert_ok};

const TTL: u64 = 10;
const BIGINT_PREFIX: &str = "__BIGINT__";
const MAX_SAFE_INTEGER: u64 = (1 << 53) - 1;

// == Helper Functions ==

fn object_provider() -> Arc<dyn CacheProvider> {
    Arc::new(MemoryCacheProvider::new(MemoryProviderConfig::default()))
}

fn text_provider() -> Arc<dyn CacheProvider> {
    Arc::new(MemoryCacheProvider::new(MemoryProviderConfig::serialized(
        SerializationOptions::new(),
    )))
}

fn storing_providers() -> Vec<Arc<dyn CacheProvider>> {
    vec![object_provider(), text_provider()]
}

/// Hooks storing integers beyond 2^53 as tagged strings.
fn bigint_options() -> SerializationOptions {
    SerializationOptions::new()
        .with_serializer(|_key, value| match value.as_u64() {
            Some(n) if n > MAX_SAFE_INTEGER => Value::String(format!("{}{}", BIGINT_PREFIX, n)),
            _ => value,
        })
        .with_deserializer(|_key, value| {
            let parsed = value
                .as_str()
                .and_then(|s| s.strip_prefix(BIGINT_PREFIX))
                .and_then(|digits| digits.parse::<u64>().ok());
            match parsed {
                Some(n) => json!(n),
                None => value,
            }
        })
}

type Sum = Memoize<Vec<i64>, i64, String>;

/// Memoized sum over a list of numbers that rejects negative inputs.
fn compute_sum(provider: Arc<dyn CacheProvider>, args_order_vain: bool) -> (Sum, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let memo: Sum = Memoize::new(
        "computeSum",
        move |numbers: Vec<i64>| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                match numbers.iter().find(|n| **n < 0) {
                    Some(n) => Err(format!("{} is negative", n)),
                    None => Ok(numbers.iter().sum()),
                }
            }
        },
        TTL,
        MemoizeConfig::new(provider).args_order_vain(args_order_vain),
    );
    (memo, calls)
}

// == Call Tests ==

#[tokio::test]
async fn test_call_computes_once_per_args() {
    for provider in storing_providers() {
        let (memo, calls) = compute_sum(provider, false);

        assert_eq!(memo.call(vec![1, 2, 3]).await.unwrap(), 6);
        assert_eq!(memo.call(vec![1, 2, 3]).await.unwrap(), 6);
        assert_eq!(memo.call(vec![4, 5]).await.unwrap(), 9);

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}

#[tokio::test]
async fn test_call_replays_cached_failure() {
    for provider in storing_providers() {
        let (memo, calls) = compute_sum(provider, false);

        for _ in 0..3 {
            let err = memo.call(vec![1, -2]).await.unwrap_err();
            assert_eq!(err.into_rejection(), Some("-2 is negative".to_string()));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}

#[tokio::test]
async fn test_argument_order_matters_by_default() {
    let (memo, calls) = compute_sum(object_provider(), false);

    memo.call(vec![1, 2, 3]).await.unwrap();
    memo.call(vec![3, 2, 1]).await.unwrap();

    assert_ne!(memo.key_for(&vec![1, 2, 3]), memo.key_for(&vec![3, 2, 1]));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_args_order_vain_shares_entries() {
    for provider in storing_providers() {
        let (memo, calls) = compute_sum(provider, true);

        assert_eq!(memo.call(vec![1, 2, 3]).await.unwrap(), 6);
        assert_eq!(memo.call(vec![3, 1, 2]).await.unwrap(), 6);
        assert_eq!(memo.call(vec![2, 3, 1]).await.unwrap(), 6);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}

#[tokio::test]
async fn test_functions_with_same_args_do_not_collide() {
    let provider = object_provider();
    let (sum, _) = compute_sum(Arc::clone(&provider), false);
    let product: Memoize<Vec<i64>, i64, String> = Memoize::new(
        "computeProduct",
        |numbers: Vec<i64>| async move { Ok(numbers.iter().product()) },
        TTL,
        MemoizeConfig::new(provider),
    );

    assert_eq!(sum.call(vec![2, 3, 4]).await.unwrap(), 9);
    assert_eq!(product.call(vec![2, 3, 4]).await.unwrap(), 24);
}

// == Cache Management Tests ==

#[tokio::test]
async fn test_update_demoize_refresh_cycle() {
    for provider in storing_providers() {
        let (memo, calls) = compute_sum(provider, false);
        let args = vec![1, 2];

        assert_ok!(memo.update(&args, &42).await);
        assert_eq!(memo.call(args.clone()).await.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        assert_eq!(memo.refresh(args.clone()).await.unwrap(), 3);
        assert_eq!(memo.call(args.clone()).await.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        assert_eq!(memo.demoize(&args).await.unwrap(), 1);
        assert_eq!(memo.call(args.clone()).await.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}

#[tokio::test]
async fn test_update_replaces_cached_failure() {
    let (memo, _) = compute_sum(object_provider(), false);

    assert_err!(memo.call(vec![-1]).await);
    memo.update(&vec![-1], &0).await.unwrap();
    assert_eq!(memo.call(vec![-1]).await.unwrap(), 0);
}

#[tokio::test]
async fn test_exec_never_reads_or_writes() {
    let (memo, calls) = compute_sum(object_provider(), false);

    memo.update(&vec![5], &500).await.unwrap();
    assert_eq!(memo.exec(vec![5]).await.unwrap(), 5);
    assert_eq!(memo.call(vec![5]).await.unwrap(), 500);

    let err = memo.exec(vec![-5]).await.unwrap_err();
    assert!(!err.is_cache_error());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

// == Expiry Tests ==

#[tokio::test]
async fn test_entries_expire_after_ttl() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let memo: Memoize<(u32,), u32, String> = Memoize::new(
        "double",
        move |(n,): (u32,)| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(n * 2)
            }
        },
        1,
        MemoizeConfig::new(object_provider()),
    );

    memo.call((21,)).await.unwrap();
    memo.call((21,)).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    tokio::time::sleep(Duration::from_millis(1200)).await;

    memo.call((21,)).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_set_exp_shortens_lifetime() {
    for provider in storing_providers() {
        let (memo, calls) = compute_sum(provider, false);
        let args = vec![7, 8];

        memo.call(args.clone()).await.unwrap();
        assert!(memo.set_exp(&args, 1).await.unwrap());

        memo.call(args.clone()).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_millis(1200)).await;

        memo.call(args.clone()).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}

#[tokio::test]
async fn test_set_exp_zero_expires_immediately() {
    let (memo, calls) = compute_sum(object_provider(), false);

    memo.call(vec![1]).await.unwrap();
    assert!(memo.set_exp(&vec![1], 0).await.unwrap());
    memo.call(vec![1]).await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

// == Value Marshaling Tests ==

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Report {
    title: String,
    generated_at: DateTime<Utc>,
    totals: BTreeMap<String, f64>,
    tags: Vec<String>,
    parent: Option<Box<Report>>,
}

fn build_report((title,): (String,)) -> Report {
    let generated_at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let mut totals = BTreeMap::new();
    totals.insert("north".to_string(), 12.5);
    totals.insert("south".to_string(), -3.25);

    Report {
        parent: Some(Box::new(Report {
            title: format!("{} (previous)", title),
            generated_at,
            totals: BTreeMap::new(),
            tags: Vec::new(),
            parent: None,
        })),
        title,
        generated_at,
        totals,
        tags: vec!["weekly".to_string(), "draft".to_string()],
    }
}

#[tokio::test]
async fn test_nested_values_round_trip_through_every_provider() {
    for provider in storing_providers() {
        let memo: Memoize<(String,), Report, String> = Memoize::new(
            "buildReport",
            |args: (String,)| async move { Ok(build_report(args)) },
            TTL,
            MemoizeConfig::new(provider),
        );

        let fresh = memo.call(("sales".to_string(),)).await.unwrap();
        let cached = memo.call(("sales".to_string(),)).await.unwrap();

        assert_eq!(fresh, cached);
        assert_eq!(cached.parent.map(|p| p.title), Some("sales (previous)".to_string()));
    }
}

#[tokio::test]
async fn test_serialization_hooks_marshal_large_integers() {
    let options = bigint_options();
    let provider: Arc<dyn CacheProvider> =
        Arc::new(MemoryCacheProvider::new(MemoryProviderConfig::serialized(options)));

    let memo: Memoize<(u64,), Vec<u64>, String> = Memoize::new(
        "powersOfTwo",
        |(n,): (u64,)| async move { Ok((0..n).map(|i| 1u64 << (i * 10)).collect()) },
        TTL,
        MemoizeConfig::new(Arc::clone(&provider)),
    );

    let fresh = memo.call((7,)).await.unwrap();
    let stored = provider.get(memo.key_for(&(7,)).as_str()).await.unwrap();
    match stored {
        Some(Payload::Text(text)) => {
            assert!(text.contains("\"__BIGINT__1152921504606846976\""));
            assert!(text.contains("1048576"));
        }
        other => panic!("expected text payload, got {:?}", other),
    }

    assert_eq!(memo.call((7,)).await.unwrap(), fresh);
}

#[tokio::test]
async fn test_identity_objects_share_entries() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let memo: Memoize<(Value,), String, String> = Memoize::new(
        "describeUser",
        move |(user,): (Value,)| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(format!("user {}", user["id"]))
            }
        },
        TTL,
        MemoizeConfig::new(object_provider()).object_fingerprint(ObjectFingerprint::Entries),
    );

    memo.call((json!({"id": 7, "name": "Ada"}),)).await.unwrap();
    memo.call((json!({"id": 7, "name": "Renamed"}),)).await.unwrap();
    memo.call((json!({"id": 8, "name": "Ada"}),)).await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_update_then_call_round_trips_nested_values() {
    for provider in storing_providers() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let memo: Memoize<(String,), Report, String> = Memoize::new(
            "buildReport",
            move |args: (String,)| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(build_report(args))
                }
            },
            TTL,
            MemoizeConfig::new(provider),
        );

        let mut stored = build_report(("custom".to_string(),));
        stored.tags.push("pinned".to_string());
        stored.totals.insert("east".to_string(), 0.5);

        memo.update(&("q3".to_string(),), &stored).await.unwrap();
        let read = memo.call(("q3".to_string(),)).await.unwrap();

        assert_eq!(read, stored);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}

#[tokio::test]
async fn test_update_then_call_round_trips_large_integers() {
    let tagged_text: Arc<dyn CacheProvider> =
        Arc::new(MemoryCacheProvider::new(MemoryProviderConfig::serialized(bigint_options())));

    for provider in [object_provider(), tagged_text] {
        let memo: Memoize<(u64,), Vec<u64>, String> = Memoize::new(
            "largeValues",
            |(n,): (u64,)| async move { Ok(vec![n]) },
            TTL,
            MemoizeConfig::new(Arc::clone(&provider)),
        );

        let value = vec![u64::MAX, 1 << 60, 7];
        memo.update(&(1,), &value).await.unwrap();

        if let Some(Payload::Text(text)) = provider.get(memo.key_for(&(1,)).as_str()).await.unwrap() {
            assert!(text.contains("\"__BIGINT__18446744073709551615\""));
        }
        assert_eq!(memo.call((1,)).await.unwrap(), value);
    }
}

// == Batch Tests ==

#[tokio::test]
async fn test_multi_call_preserves_order_and_caches_misses() {
    for provider in storing_providers() {
        let (memo, calls) = compute_sum(provider, false);

        memo.call(vec![2, 2]).await.unwrap();
        let results = memo
            .multi_call(vec![vec![1, 1], vec![2, 2], vec![3, 3], vec![4, 4]])
            .await
            .unwrap();

        assert_eq!(results, vec![2, 4, 6, 8]);
        assert_eq!(calls.load(Ordering::SeqCst), 4);

        assert_eq!(memo.call(vec![4, 4]).await.unwrap(), 8);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }
}

#[tokio::test]
async fn test_multi_call_failure_is_not_cached() {
    for provider in storing_providers() {
        let (memo, calls) = compute_sum(provider, false);

        let err = memo.multi_call(vec![vec![1], vec![-1], vec![2]]).await.unwrap_err();
        assert_eq!(err.rejection(), Some(&"-1 is negative".to_string()));
        let after_batch = calls.load(Ordering::SeqCst);

        assert_err!(memo.call(vec![-1]).await);
        assert_eq!(memo.call(vec![1]).await.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), after_batch + 2);
    }
}

#[tokio::test]
async fn test_multi_exec_preserves_order_under_uneven_latency() {
    let memo: Memoize<(u64,), u64, String> = Memoize::new(
        "slowEcho",
        |(n,): (u64,)| async move {
            tokio::time::sleep(Duration::from_millis(50 * (5 - n))).await;
            Ok(n)
        },
        TTL,
        MemoizeConfig::new(object_provider()),
    );

    let results = memo
        .multi_exec(vec![(0,), (1,), (2,), (3,), (4,)])
        .await
        .unwrap();
    assert_eq!(results, vec![0, 1, 2, 3, 4]);
}

#[tokio::test]
async fn test_multi_exec_override_computes_misses_in_one_batch() {
    let batches = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&batches);
    let provider = object_provider();

    let memo: Memoize<(i64,), i64, String> = Memoize::new(
        "negate",
        |(n,): (i64,)| async move { Ok(-n) },
        TTL,
        MemoizeConfig::new(provider).multi_exec_override(move |args: Vec<(i64,)>| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(args.into_iter().map(|(n,)| -n).collect())
            }
        }),
    );

    memo.update(&(2,), &-200).await.unwrap();
    let results = memo.multi_call(vec![(1,), (2,), (3,)]).await.unwrap();
    assert_eq!(results, vec![-1, -200, -3]);
    assert_eq!(batches.load(Ordering::SeqCst), 1);

    let again = memo.multi_call(vec![(3,), (1,)]).await.unwrap();
    assert_eq!(again, vec![-3, -1]);
    assert_eq!(batches.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_multi_exec_override_length_mismatch() {
    let memo: Memoize<(i64,), i64, String> = Memoize::new(
        "broken",
        |(n,): (i64,)| async move { Ok(n) },
        TTL,
        MemoizeConfig::new(object_provider())
            .multi_exec_override(|_args: Vec<(i64,)>| async move { Ok(Vec::new()) }),
    );

    let err = memo.multi_call(vec![(1,), (2,)]).await.unwrap_err();
    assert!(err.is_cache_error());
    assert!(matches!(err, MemoizeError::Cache(_)));
}

// == Disabled Provider Tests ==

#[tokio::test]
async fn test_disabled_provider_never_caches() {
    let (memo, calls) = compute_sum(Arc::new(DisabledCacheProvider::new()), false);

    memo.call(vec![1, 2]).await.unwrap();
    memo.update(&vec![1, 2], &99).await.unwrap();
    assert_eq!(memo.call(vec![1, 2]).await.unwrap(), 3);
    assert_eq!(memo.multi_call(vec![vec![1, 2], vec![3]]).await.unwrap(), vec![3, 3]);

    assert_eq!(memo.demoize(&vec![1, 2]).await.unwrap(), 0);
    assert!(!memo.set_exp(&vec![1, 2], 5).await.unwrap());
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}

// == Concurrency Tests ==

#[tokio::test]
async fn test_memoized_function_is_shareable_across_tasks() {
    let (memo, _) = compute_sum(object_provider(), false);
    let memo = Arc::new(memo);

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let memo = Arc::clone(&memo);
            tokio::spawn(async move { memo.call(vec![i, i]).await })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let value = handle.await.unwrap().unwrap();
        assert_eq!(value, 2 * i as i64);
    }
}
