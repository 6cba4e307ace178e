//! Probes that query one sub-resource per repository and keep the global minimum.
//!
//! Only the oldest repositories of the catalog are visited. Per repository the
//! tail page of the newest-first listing is read, so a single extra request
//! reaches its oldest entries.

use crate::api::{ListQuery, Repository};
use crate::report::{ReleaseRecord, WorkflowRunRecord};

use super::strategy::{fan_out_earliest, fetch_tail_page};
use super::{ProbeContext, ProbeError};

fn oldest(catalog: &[Repository], limit: usize) -> &[Repository] {
    &catalog[..catalog.len().min(limit)]
}

pub async fn first_workflow_run(ctx: &ProbeContext) -> Result<Option<WorkflowRunRecord>, ProbeError> {
    let catalog = ctx.repository_catalog().await?;
    let page_size = ctx.settings().sub_resource_page_size;

    fan_out_earliest(
        oldest(&catalog, ctx.settings().workflow_repository_limit),
        |repo| async move {
            let runs = fetch_tail_page(|page| {
                let query = ListQuery::new(page_size).page(page);
                async move {
                    ctx.call(ctx.api().list_workflow_runs(&repo.owner.login, &repo.name, &query))
                        .await
                }
            })
            .await?;
            Ok::<_, ProbeError>(
                runs.into_iter()
                    .map(|run| WorkflowRunRecord {
                        run_id: run.id,
                        name: run.name.unwrap_or_default(),
                        repository: repo.full_name.clone(),
                        event: run.event,
                        url: run.html_url,
                        created_at: run.created_at,
                    })
                    .collect::<Vec<_>>(),
            )
        },
        |run: &WorkflowRunRecord| run.created_at,
    )
    .await
}

pub async fn first_release(ctx: &ProbeContext) -> Result<Option<ReleaseRecord>, ProbeError> {
    let catalog = ctx.repository_catalog().await?;
    let page_size = ctx.settings().sub_resource_page_size;

    fan_out_earliest(
        oldest(&catalog, ctx.settings().release_repository_limit),
        |repo| async move {
            let releases = fetch_tail_page(|page| {
                let query = ListQuery::new(page_size).page(page);
                async move {
                    ctx.call(ctx.api().list_releases(&repo.owner.login, &repo.name, &query))
                        .await
                }
            })
            .await?;
            Ok::<_, ProbeError>(
                releases
                    .into_iter()
                    .map(|release| ReleaseRecord {
                        tag_name: release.tag_name,
                        name: release.name,
                        repository: repo.full_name.clone(),
                        url: release.html_url,
                        created_at: release.created_at,
                    })
                    .collect::<Vec<_>>(),
            )
        },
        |release: &ReleaseRecord| release.created_at,
    )
    .await
}
