use std::collections::{HashMap, HashSet};
use std::future::Future;

use futures::future::try_join_all;
use tessera_api_types::ResultOf;
use tracing::debug;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

/// Split `ids` into chunks of at most `size`, dropping duplicates while
/// keeping first-seen order.
pub fn split_ids(ids: &[Uuid], size: usize) -> Vec<Vec<Uuid>> {
    let mut seen = HashSet::with_capacity(ids.len());
    let unique: Vec<Uuid> = ids.iter().copied().filter(|id| seen.insert(*id)).collect();
    unique.chunks(size.max(1)).map(<[Uuid]>::to_vec).collect()
}

/// Fetch `ids` in concurrent chunks of `chunk_size` and merge the replies.
///
/// Zero ids issue no request. Any per-target error embedded in any chunk
/// fails the whole call with [`ApiError::Partial`].
pub async fn chunked_request<T, F, Fut>(
    ids: &[Uuid],
    chunk_size: usize,
    per_chunk: F,
) -> ApiResult<HashMap<Uuid, T>>
where
    F: Fn(Vec<Uuid>) -> Fut,
    Fut: Future<Output = ApiResult<ResultOf<T>>>,
{
    let chunks = split_ids(ids, chunk_size);
    if chunks.is_empty() {
        return Ok(HashMap::new());
    }

    debug!(ids = ids.len(), chunks = chunks.len(), "Issuing chunked request");
    let replies = try_join_all(chunks.into_iter().map(per_chunk)).await?;

    let mut merged = ResultOf::default();
    for reply in replies {
        merged.merge(reply);
    }
    into_partial(merged)
}

/// Successes of a multi-target reply, or `Partial` when it embeds errors.
pub fn into_partial<T>(result: ResultOf<T>) -> ApiResult<HashMap<Uuid, T>> {
    if result.has_errors() {
        return Err(ApiError::Partial(result.errors));
    }
    Ok(result.data)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tessera_api_types::ErrorPayload;

    use super::*;

    fn ids(n: usize) -> Vec<Uuid> {
        (0..n).map(|_| Uuid::new_v4()).collect()
    }

    #[test]
    fn split_dedupes_and_respects_size() {
        let base = ids(5);
        let mut input = base.clone();
        input.push(base[0]);
        let chunks = split_ids(&input, 2);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks.concat(), base);
        assert_eq!(split_ids(&base, 0).len(), 5);
    }

    #[tokio::test]
    async fn issues_one_request_per_chunk() {
        let calls = Arc::new(AtomicUsize::new(0));
        let input = ids(21);

        let merged = chunked_request(&input, 20, |chunk| {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                let mut reply = ResultOf::default();
                for id in chunk {
                    reply.data.insert(id, id.to_string());
                }
                Ok(reply)
            }
        })
        .await
        .expect("merged");

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(merged.len(), 21);
        assert_eq!(merged.get(&input[20]), Some(&input[20].to_string()));
    }

    #[tokio::test]
    async fn zero_ids_issue_no_request() {
        let calls = AtomicUsize::new(0);
        let merged = chunked_request(&[], 20, |_chunk| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(ResultOf::<u8>::default()) }
        })
        .await
        .expect("empty");
        assert!(merged.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn embedded_errors_fail_the_whole_call() {
        let input = ids(3);
        let err = chunked_request(&input, 2, |chunk| async move {
            let mut reply = ResultOf::default();
            reply.data.insert(chunk[0], 1u8);
            if chunk.len() == 1 {
                reply.errors.push(ErrorPayload {
                    code: None,
                    message: "forbidden".into(),
                    status_code: Some(403),
                    data: None,
                });
            }
            Ok(reply)
        })
        .await
        .expect_err("partial");
        assert!(matches!(err, ApiError::Partial(ref errors) if errors.len() == 1));
    }
}
