//! Probes over the user's own repositories and repository lists.

use crate::api::{ListQuery, Repository};
use crate::report::{
    ApproximationBasis, CommitRecord, RepositoryRecord, StarredRepositoryRecord, Timestamp,
    WatchedRepositoryRecord,
};

use super::strategy::{earliest_by, fetch_tail_page};
use super::{ProbeContext, ProbeError};

fn repository_record(repo: &Repository) -> RepositoryRecord {
    RepositoryRecord {
        name: repo.name.clone(),
        full_name: repo.full_name.clone(),
        url: repo.html_url.clone(),
        created_at: repo.created_at,
    }
}

fn approximated_by(repo: &Repository) -> Timestamp {
    Timestamp::Approximate {
        at: repo.created_at,
        basis: ApproximationBasis::RepositoryCreatedAt,
    }
}

pub async fn first_repository(ctx: &ProbeContext) -> Result<Option<RepositoryRecord>, ProbeError> {
    let catalog = ctx.repository_catalog().await?;
    Ok(catalog.first().map(repository_record))
}

/// Oldest repository of the catalog flagged as a fork.
pub async fn first_fork(ctx: &ProbeContext) -> Result<Option<RepositoryRecord>, ProbeError> {
    let catalog = ctx.repository_catalog().await?;
    Ok(catalog.iter().find(|repo| repo.fork).map(repository_record))
}

/// Oldest commit authored by the user in their oldest repository.
///
/// Commit listings are newest first, so with one commit per page the tail page
/// holds the oldest one.
pub async fn first_commit(ctx: &ProbeContext) -> Result<Option<CommitRecord>, ProbeError> {
    let catalog = ctx.repository_catalog().await?;
    let Some(repo) = catalog.first() else {
        return Ok(None);
    };

    let commits = fetch_tail_page(|page| {
        let query = ListQuery::new(1).page(page);
        async move {
            ctx.call(ctx.api().list_commits(
                &repo.owner.login,
                &repo.name,
                Some(ctx.username()),
                &query,
            ))
            .await
        }
    })
    .await?;

    if commits.is_empty() {
        return Ok(None);
    }

    let dated = commits
        .into_iter()
        .filter_map(|commit| commit.timestamp().map(|at| (commit, at)));
    let Some((commit, committed_at)) = earliest_by(dated, |(_, at)| *at) else {
        return Err(ProbeError::MalformedResponse(format!(
            "commits of {} carry no author or committer date",
            repo.full_name
        )));
    };

    Ok(Some(CommitRecord {
        sha: commit.sha,
        repository: repo.full_name.clone(),
        message: commit.commit.message,
        url: commit.html_url,
        committed_at,
    }))
}

/// Oldest star; exact when the platform reports the star time.
pub async fn first_starred_repo(
    ctx: &ProbeContext,
) -> Result<Option<StarredRepositoryRecord>, ProbeError> {
    let page = ctx
        .call(ctx.api().list_starred(ctx.username(), &ListQuery::oldest_first(1)))
        .await?;

    Ok(page.items.into_iter().next().map(|starred| {
        let starred_at = match starred.starred_at {
            Some(at) => Timestamp::Exact { at },
            None => approximated_by(&starred.repo),
        };
        StarredRepositoryRecord {
            full_name: starred.repo.full_name,
            url: starred.repo.html_url,
            starred_at,
        }
    }))
}

/// Head of the user's subscriptions. The platform keeps no subscription time,
/// so the record is always dated by the repository's creation.
pub async fn first_watch(ctx: &ProbeContext) -> Result<Option<WatchedRepositoryRecord>, ProbeError> {
    let page = ctx
        .call(ctx.api().list_watched(ctx.username(), &ListQuery::new(1)))
        .await?;

    Ok(page.items.into_iter().next().map(|repo| WatchedRepositoryRecord {
        watched_at: approximated_by(&repo),
        full_name: repo.full_name,
        url: repo.html_url,
    }))
}
