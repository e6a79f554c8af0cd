//! Public team roster endpoints.

use axum::extract::{Query, State};
use chrono::Datelike;
use serde::{Deserialize, Serialize};

use super::{respond, ApiResult};
use crate::errors::AppError;
use crate::models::TeamListing;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct TeamQuery {
    pub year: Option<i32>,
}

/// One year's roster, in display order.
#[derive(Debug, Serialize, Deserialize)]
pub struct TeamRoster {
    pub year: i32,
    pub members: Vec<TeamListing>,
}

/// GET /api/team?year= - Active members of a team year.
///
/// Without a year, the most recent team year is shown.
pub async fn get_team(
    State(state): State<AppState>,
    Query(query): Query<TeamQuery>,
) -> ApiResult<TeamRoster> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result = async {
        let year = match query.year {
            Some(year) => year,
            None => state
                .repo
                .list_team_years()
                .await?
                .first()
                .copied()
                .unwrap_or_else(|| chrono::Utc::now().year()),
        };

        let members = state
            .repo
            .list_team(year)
            .await?
            .iter()
            .map(|m| TeamListing::for_year(m, year))
            .collect();

        Ok::<_, AppError>(TeamRoster { year, members })
    }
    .await;

    respond(&state, revision_id, result).await
}

/// GET /api/team/years - Team years with at least one active member.
pub async fn list_team_years(State(state): State<AppState>) -> ApiResult<Vec<i32>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    let result = state.repo.list_team_years().await;
    respond(&state, revision_id, result).await
}
