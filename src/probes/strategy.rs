//! Retrieval shapes shared by the probes.
//!
//! - [`earliest_by`]: client-side minimum over an already fetched set.
//! - [`scan_until_short_page`]: paginate until the listing runs out.
//! - [`fetch_tail_page`]: jump to the oldest page of a newest-first listing.
//! - [`fan_out_earliest`]: per-parent sub-queries reduced to a global minimum.

use std::future::Future;

use crate::api::Page;

use super::ProbeError;

/// Minimum of `items` by `key`; the first of equal minima wins.
pub fn earliest_by<T, K, F>(items: impl IntoIterator<Item = T>, key: F) -> Option<T>
where
    K: Ord,
    F: Fn(&T) -> K,
{
    items.into_iter().min_by_key(|item| key(item))
}

/// Fetches pages `1..=max_pages` until one comes back shorter than `page_size`.
///
/// An error on the first page is returned. An error on a later page ends the
/// scan with whatever was collected, since listings with a retention window
/// reject requests past their end.
pub async fn scan_until_short_page<T, F, Fut>(
    page_size: u8,
    max_pages: u32,
    mut fetch_page: F,
) -> Result<Vec<T>, ProbeError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Vec<T>, ProbeError>>,
{
    let mut collected = Vec::new();
    for page in 1..=max_pages.max(1) {
        let items = match fetch_page(page).await {
            Ok(items) => items,
            Err(err) if page == 1 => return Err(err),
            Err(err) => {
                log::debug!("pagination stopped at page {page}: {err}");
                break;
            }
        };
        let short = items.len() < usize::from(page_size);
        collected.extend(items);
        if short {
            break;
        }
    }
    Ok(collected)
}

/// Items of the last page of a newest-first listing, i.e. its oldest entries.
pub async fn fetch_tail_page<T, F, Fut>(mut fetch_page: F) -> Result<Vec<T>, ProbeError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Page<T>, ProbeError>>,
{
    let first = fetch_page(1).await?;
    match first.last_page {
        Some(last) if last > 1 => Ok(fetch_page(last).await?.items),
        _ => Ok(first.items),
    }
}

/// Runs `fetch` for every parent in order and keeps the global minimum.
///
/// Parents whose query fails are skipped. The error of the last failing parent
/// is returned only when no parent could be queried at all.
pub async fn fan_out_earliest<'a, P, T, K, F, Fut, KF>(
    parents: &'a [P],
    mut fetch: F,
    key: KF,
) -> Result<Option<T>, ProbeError>
where
    K: Ord,
    KF: Fn(&T) -> K,
    F: FnMut(&'a P) -> Fut,
    Fut: Future<Output = Result<Vec<T>, ProbeError>>,
{
    let mut earliest: Option<T> = None;
    let mut last_error = None;
    let mut answered = 0usize;

    for parent in parents {
        match fetch(parent).await {
            Ok(items) => {
                answered += 1;
                if let Some(local) = earliest_by(items, &key) {
                    earliest = match earliest {
                        Some(current) if key(&current) <= key(&local) => Some(current),
                        _ => Some(local),
                    };
                }
            }
            Err(err) => {
                log::debug!("fan-out entry skipped: {err}");
                last_error = Some(err);
            }
        }
    }

    match (answered, last_error) {
        (0, Some(err)) => Err(err),
        _ => Ok(earliest),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn picks_minimum_not_first_encountered() {
        let picked = earliest_by([("c", 3), ("a", 1), ("b", 2)], |(_, t)| *t);
        assert_eq!(picked, Some(("a", 1)));
    }

    #[test]
    fn equal_minima_keep_listing_order() {
        let picked = earliest_by([("x", 1), ("y", 1)], |(_, t)| *t);
        assert_eq!(picked, Some(("x", 1)));
        assert_eq!(earliest_by(Vec::<u8>::new(), |v| *v), None);
    }

    #[tokio::test]
    async fn scan_stops_after_short_page() {
        let requested = RefCell::new(Vec::new());
        let items = scan_until_short_page(100, 50, |page| {
            requested.borrow_mut().push(page);
            async move {
                let len = if page < 3 { 100 } else { 42 };
                Ok(vec![page; len])
            }
        })
        .await
        .unwrap();

        assert_eq!(*requested.borrow(), vec![1, 2, 3]);
        assert_eq!(items.len(), 242);
        assert_eq!(items.last(), Some(&3));
    }

    #[tokio::test]
    async fn scan_of_empty_listing_returns_nothing() {
        let requested = RefCell::new(0);
        let items = scan_until_short_page(100, 50, |_| {
            *requested.borrow_mut() += 1;
            async { Ok(Vec::<u32>::new()) }
        })
        .await
        .unwrap();

        assert!(items.is_empty());
        assert_eq!(*requested.borrow(), 1);
    }

    #[tokio::test]
    async fn scan_keeps_collected_pages_when_a_later_page_fails() {
        let items = scan_until_short_page(2, 10, |page| async move {
            if page == 1 {
                Ok(vec![10, 9])
            } else {
                Err(ProbeError::Remote("pagination is limited".into()))
            }
        })
        .await
        .unwrap();
        assert_eq!(items, vec![10, 9]);

        let err = scan_until_short_page(2, 10, |_| async {
            Err::<Vec<u8>, _>(ProbeError::Remote("boom".into()))
        })
        .await
        .unwrap_err();
        assert!(matches!(err, ProbeError::Remote(_)));
    }

    #[tokio::test]
    async fn scan_respects_page_cap() {
        let items = scan_until_short_page(1, 4, |page| async move { Ok(vec![page]) })
            .await
            .unwrap();
        assert_eq!(items, vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn tail_page_follows_last_link() {
        let requested = RefCell::new(Vec::new());
        let items = fetch_tail_page(|page| {
            requested.borrow_mut().push(page);
            async move { Ok(Page::new(vec![page * 10]).with_last_page(Some(7))) }
        })
        .await
        .unwrap();

        assert_eq!(items, vec![70]);
        assert_eq!(*requested.borrow(), vec![1, 7]);
    }

    #[tokio::test]
    async fn tail_page_of_single_page_listing_is_the_first_page() {
        let items = fetch_tail_page(|_| async { Ok(Page::new(vec!["only"])) })
            .await
            .unwrap();
        assert_eq!(items, vec!["only"]);
    }

    #[tokio::test]
    async fn fan_out_reduces_across_parents_and_skips_failures() {
        // A: access error, B: {r1@5, r2@2}, C: {r3@8}
        let parents = ["A", "B", "C"];
        let picked = fan_out_earliest(
            &parents,
            |parent| async move {
                match *parent {
                    "A" => Err(ProbeError::Remote("403 forbidden".into())),
                    "B" => Ok(vec![("r1", 5), ("r2", 2)]),
                    _ => Ok(vec![("r3", 8)]),
                }
            },
            |(_, t): &(&str, i32)| *t,
        )
        .await
        .unwrap();

        assert_eq!(picked, Some(("r2", 2)));
    }

    #[tokio::test]
    async fn fan_out_without_sub_resources_is_empty() {
        let parents = ["A", "B"];
        let picked = fan_out_earliest(
            &parents,
            |_| async { Ok(Vec::<(&str, u8)>::new()) },
            |(_, t): &(&str, u8)| *t,
        )
        .await
        .unwrap();
        assert_eq!(picked, None);
    }

    #[tokio::test]
    async fn fan_out_fails_when_every_parent_fails() {
        let parents = ["A", "B"];
        let err = fan_out_earliest(
            &parents,
            |_| async { Err::<Vec<(&str, u8)>, _>(ProbeError::Remote("disabled".into())) },
            |(_, t): &(&str, u8)| *t,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ProbeError::Remote(_)));
    }
}
