//! Telemetry for synchronous RPC paths.
//!
//! RPC handlers do not go through the event middleware. They bracket the
//! call themselves: a fresh record bound at the boundary, one commit when
//! the call returns or is abandoned.

use sha2::{Digest, Sha256};
use std::future::Future;
use super::context::Context;
use super::guard::EmissionGuard;
use super::record::RecordHandle;
use super::sink::{Level, Sink};

/// Pseudonymize a login subject as lowercase hex SHA-256.
pub fn hash_login(subject: &str) -> String {
    hex::encode(Sha256::digest(subject.as_bytes()))
}

/// Run `f` with a freshly bound record and commit exactly one event when it
/// completes: `info` on `Ok`, `error` on `Err`. The result is returned
/// untouched. If the call is dropped before completing (timeout,
/// cancellation, panic) an `error` event flagged `aborted` is committed
/// instead.
pub async fn instrument<S, F, Fut, T, E>(sink: &S, ctx: &Context, f: F) -> Result<T, E>
where
    S: Sink + ?Sized,
    F: FnOnce(Context) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let record = RecordHandle::new();
    let bound = record.bind(ctx);

    let mut guard = EmissionGuard::new(record, sink);
    let result = f(bound).await;
    guard.commit(Level::for_outcome(&result));

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::context::lookup;
    use crate::telemetry::sink::{FieldValue, MemorySink};
    use std::time::Duration;
    use uuid::Uuid;

    #[test]
    fn test_hash_login_is_stable_hex() {
        let h = hash_login("user@example.com");
        assert_eq!(h.len(), 64);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(h, hash_login("user@example.com"));
        assert_ne!(h, hash_login("other@example.com"));
        assert_eq!(
            hash_login(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[tokio::test]
    async fn test_instrument_commits_once_on_success() {
        let sink = MemorySink::new();
        let project = Uuid::from_u128(1);

        let out: Result<u32, String> = instrument(&sink, &Context::background(), |ctx| async move {
            lookup(&ctx)
                .set_project(project)
                .set_login_hash(hash_login("alice"));
            Ok(7)
        })
        .await;

        assert_eq!(out, Ok(7));
        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].level(), Level::Info);
        assert_eq!(events[0].get("project"), Some(&FieldValue::Id(project)));
        assert!(events[0].has("login_sha"));
    }

    #[tokio::test]
    async fn test_instrument_passes_errors_through() {
        let sink = MemorySink::new();

        let out: Result<(), String> =
            instrument(&sink, &Context::background(), |_ctx| async { Err("denied".to_string()) })
                .await;

        assert_eq!(out, Err("denied".to_string()));
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.events()[0].level(), Level::Error);
    }

    #[tokio::test]
    async fn test_instrument_commits_aborted_on_timeout() {
        let sink = MemorySink::new();
        let project = Uuid::from_u128(9);

        let timed_out = tokio::time::timeout(
            Duration::from_millis(10),
            instrument(&sink, &Context::background(), |ctx| async move {
                lookup(&ctx).set_project(project);
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok::<(), String>(())
            }),
        )
        .await;
        assert!(timed_out.is_err());

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].level(), Level::Error);
        assert_eq!(events[0].get("aborted"), Some(&FieldValue::Bool(true)));
        assert_eq!(events[0].get("project"), Some(&FieldValue::Id(project)));
    }
}
