//! Probes over gists and the public activity stream.

use crate::api::{Event, ListQuery, SearchQuery};
use crate::report::{ContributionKind, ContributionRecord, ContributionSource, EventRecord, GistRecord};

use super::search::repository_of;
use super::strategy::earliest_by;
use super::{ProbeContext, ProbeError};

const WEB_URL: &str = "https://github.com";

/// Oldest gist among the first listing page.
pub async fn first_gist(ctx: &ProbeContext) -> Result<Option<GistRecord>, ProbeError> {
    let query = ListQuery::new(ctx.settings().gist_scan_size);
    let gists = ctx.call(ctx.api().list_gists(ctx.username(), &query)).await?;

    Ok(earliest_by(gists.items, |gist| gist.created_at).map(|gist| GistRecord {
        id: gist.id,
        description: gist.description.filter(|text| !text.is_empty()),
        url: gist.html_url,
        created_at: gist.created_at,
    }))
}

/// Oldest event still inside the platform's retention window.
pub async fn first_public_event(ctx: &ProbeContext) -> Result<Option<EventRecord>, ProbeError> {
    let history = ctx.public_event_history().await?;
    Ok(earliest_by(history.iter(), |event| event.created_at).map(|event| EventRecord {
        id: event.id.clone(),
        event_type: event.kind.clone(),
        repository: event.repo.name.clone(),
        created_at: event.created_at,
    }))
}

fn contribution_from_event(event: &Event) -> Option<ContributionRecord> {
    let kind = ContributionKind::from_event_type(&event.kind)?;
    Some(ContributionRecord {
        kind,
        repository: event.repo.name.clone(),
        url: format!("{WEB_URL}/{}", event.repo.name),
        created_at: event.created_at,
        source: ContributionSource::PublicEvents,
    })
}

async fn contribution_in_events(ctx: &ProbeContext) -> Result<Option<ContributionRecord>, ProbeError> {
    let history = ctx.public_event_history().await?;
    let foreign = history
        .iter()
        .filter(|event| !ctx.is_own(event.repo.owner()))
        .filter_map(contribution_from_event);
    Ok(earliest_by(foreign, |record| record.created_at))
}

async fn contribution_in_search(ctx: &ProbeContext) -> Result<Option<ContributionRecord>, ProbeError> {
    let username = ctx.username();
    let query = SearchQuery::oldest_first(
        ["type:pr".to_string(), format!("author:{username}"), format!("-user:{username}")],
        1,
    );
    let page = ctx.call(ctx.api().search_issues(&query)).await?;
    let Some(item) = page.items.into_iter().next() else {
        return Ok(None);
    };

    let (owner, repo) = repository_of(&item)?;
    Ok(Some(ContributionRecord {
        kind: ContributionKind::PullRequest,
        repository: format!("{owner}/{repo}"),
        url: item.html_url,
        created_at: item.created_at,
        source: ContributionSource::PullRequestSearch,
    }))
}

/// Earliest contribution-shaped activity on a repository the user does not own.
///
/// Public events only reach back a few months, so the oldest pull request
/// opened against someone else's repository is considered as well. Either
/// source may fail on its own; the probe fails only when both do.
pub async fn first_contribution(ctx: &ProbeContext) -> Result<Option<ContributionRecord>, ProbeError> {
    let (from_events, from_search) =
        tokio::join!(contribution_in_events(ctx), contribution_in_search(ctx));

    let candidates = match (from_events, from_search) {
        (Err(err), Err(other)) => {
            log::debug!("contribution search failed as well: {other}");
            return Err(err);
        }
        (Ok(found), Err(err)) | (Err(err), Ok(found)) => {
            log::debug!("contribution source unavailable: {err}");
            vec![found]
        }
        (Ok(events), Ok(search)) => vec![events, search],
    };

    Ok(earliest_by(candidates.into_iter().flatten(), |record| record.created_at))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use crate::probes::testing::{StubApi, context, event, issue};
    use serde_json::json;

    #[tokio::test]
    async fn oldest_gist_is_picked_client_side() {
        let gist = |id: &str, created_at: &str| {
            json!({
                "id": id,
                "html_url": format!("https://gist.github.com/{id}"),
                "description": "",
                "created_at": created_at,
            })
        };
        let api = StubApi::new().respond(
            "gists:octo",
            json!([
                gist("c", "2014-01-01T00:00:00Z"),
                gist("a", "2009-01-01T00:00:00Z"),
                gist("b", "2012-01-01T00:00:00Z"),
            ]),
        );
        let (ctx, _) = context(api, "octo");

        let record = first_gist(&ctx).await.unwrap().unwrap();
        assert_eq!(record.id, "a");
        assert_eq!(record.description, None);
    }

    #[tokio::test]
    async fn event_history_is_paginated_once_per_run() {
        let full: Vec<_> = (0..100)
            .map(|i| event(&format!("p1-{i}"), "WatchEvent", "x/y", "2024-05-01T00:00:00Z"))
            .collect();
        let api = StubApi::new()
            .respond("events:octo:1", json!(full))
            .respond(
                "events:octo:2",
                json!([event("oldest", "PushEvent", "octo/widgets", "2024-02-01T00:00:00Z")]),
            );
        let (ctx, api) = context(api, "octo");

        let record = first_public_event(&ctx).await.unwrap().unwrap();
        assert_eq!(record.id, "oldest");
        assert_eq!(record.event_type, "PushEvent");

        first_contribution(&ctx).await.unwrap();
        assert_eq!(api.count("events:"), 2);
    }

    #[tokio::test]
    async fn own_repositories_do_not_count_as_contributions() {
        let api = StubApi::new().respond(
            "events:octo:1",
            json!([
                event("3", "IssuesEvent", "tokio-rs/tokio", "2024-03-03T00:00:00Z"),
                event("2", "WatchEvent", "serde-rs/serde", "2024-02-02T00:00:00Z"),
                event("1", "PushEvent", "Octo/widgets", "2024-01-01T00:00:00Z"),
            ]),
        );
        let (ctx, _) = context(api, "octo");

        let record = first_contribution(&ctx).await.unwrap().unwrap();
        assert_eq!(record.repository, "tokio-rs/tokio");
        assert_eq!(record.kind, ContributionKind::Issue);
        assert_eq!(record.source, ContributionSource::PublicEvents);
    }

    #[tokio::test]
    async fn older_external_pull_request_wins() {
        let api = StubApi::new()
            .respond(
                "events:octo:1",
                json!([event("1", "PushEvent", "rust-lang/rust", "2024-01-01T00:00:00Z")]),
            )
            .respond(
                "search:type:pr author:octo -user:octo",
                json!([issue("rails", "rails", 99, "2011-02-02T00:00:00Z")]),
            );
        let (ctx, _) = context(api, "octo");

        let record = first_contribution(&ctx).await.unwrap().unwrap();
        assert_eq!(record.repository, "rails/rails");
        assert_eq!(record.kind, ContributionKind::PullRequest);
        assert_eq!(record.source, ContributionSource::PullRequestSearch);
    }

    #[tokio::test]
    async fn contribution_fails_only_when_both_sources_fail() {
        let down = || ApiError::Transport("connection reset".into());
        let api = StubApi::new()
            .fail("events:octo:1", down())
            .respond(
                "search:type:pr author:octo -user:octo",
                json!([issue("rails", "rails", 99, "2011-02-02T00:00:00Z")]),
            );
        let (ctx, _) = context(api, "octo");
        assert!(first_contribution(&ctx).await.unwrap().is_some());

        let api = StubApi::new()
            .fail("events:octo:1", down())
            .fail("search:type:pr author:octo -user:octo", down());
        let (ctx, _) = context(api, "octo");
        assert!(matches!(
            first_contribution(&ctx).await.unwrap_err(),
            ProbeError::Remote(_)
        ));
    }
}
