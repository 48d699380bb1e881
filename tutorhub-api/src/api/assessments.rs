//! Assessment questions and score ranges managed by staff

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, put},
    Router,
};
use serde::Deserialize;
use tracing::info;
use tutorhub_common::resources::{entities, fields, keys};

use crate::api::exercise_types::VisibilityRequest;
use crate::api::validate;
use crate::auth::AuthUser;
use crate::db::assessments::{self, AssessmentQuestion, ScoreRange};
use crate::error::{ApiError, ApiResult};
use crate::response::{created, ok, ApiJson, AppJson, AppPath};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionInput {
    pub option_text: String,
    pub point: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuestionRequest {
    pub question: String,
    #[serde(default)]
    pub options: Vec<OptionInput>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRangeRequest {
    pub description: String,
    pub min_score: f64,
    pub max_score: f64,
}

impl ScoreRangeRequest {
    fn validate(&self) -> ApiResult<&str> {
        let description = validate::required(&self.description, fields::SCORE_DESCRIPTION)?;
        if self.min_score > self.max_score {
            return Err(ApiError::bad_request(keys::INVALID_SCORE_RANGE));
        }
        Ok(description)
    }
}

/// Trimmed option texts, 400 when none is given or one is blank
pub(crate) fn options_of<'a>(
    options: impl IntoIterator<Item = (&'a str, f64)>,
) -> ApiResult<Vec<(&'a str, f64)>> {
    let options = options
        .into_iter()
        .map(|(text, point)| Ok((validate::required(text, fields::DESCRIPTION)?, point)))
        .collect::<ApiResult<Vec<_>>>()?;
    if options.is_empty() {
        return Err(ApiError::bad_request(keys::OPTIONS_REQUIRED));
    }
    Ok(options)
}

async fn find_question(state: &AppState, id: i64) -> ApiResult<AssessmentQuestion> {
    assessments::find_question(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found(entities::ASSESSMENT_QUESTION))
}

async fn find_score_range(state: &AppState, id: i64) -> ApiResult<ScoreRange> {
    assessments::find_score_range(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found(entities::ASSESSMENT_SCORE_RANGE))
}

/// POST /api/v1/assessment-questions
pub async fn create_question(
    State(state): State<AppState>,
    caller: AuthUser,
    AppJson(req): AppJson<CreateQuestionRequest>,
) -> ApiResult<ApiJson<AssessmentQuestion>> {
    caller.require_moderator()?;
    let question = validate::required(&req.question, fields::QUESTION)?;
    let options = options_of(req.options.iter().map(|o| (o.option_text.as_str(), o.point)))?;
    if assessments::question_exists(&state.db, question).await? {
        return Err(ApiError::duplicate(entities::ASSESSMENT_QUESTION));
    }

    let mut tx = state.db.begin().await?;
    let id = assessments::insert_question(&mut *tx, question, &options, caller.id).await?;
    tx.commit().await?;
    info!(
        "Assessment question {} ({} options) created by {}",
        id,
        options.len(),
        caller.id
    );

    Ok(created(find_question(&state, id).await?))
}

/// GET /api/v1/assessment-questions
///
/// Hidden questions are listed for moderators only.
pub async fn list_questions(
    State(state): State<AppState>,
    caller: AuthUser,
) -> ApiResult<ApiJson<Vec<AssessmentQuestion>>> {
    Ok(ok(assessments::list_questions(&state.db, caller.is_moderator()).await?))
}

/// GET /api/v1/assessment-questions/:id
pub async fn get_question(
    State(state): State<AppState>,
    caller: AuthUser,
    AppPath(id): AppPath<i64>,
) -> ApiResult<ApiJson<AssessmentQuestion>> {
    let question = find_question(&state, id).await?;
    if question.is_hidden && !caller.is_moderator() {
        return Err(ApiError::not_found(entities::ASSESSMENT_QUESTION));
    }
    Ok(ok(question))
}

/// PUT /api/v1/assessment-questions/:id/visibility
pub async fn set_question_visibility(
    State(state): State<AppState>,
    caller: AuthUser,
    AppPath(id): AppPath<i64>,
    AppJson(req): AppJson<VisibilityRequest>,
) -> ApiResult<ApiJson<AssessmentQuestion>> {
    caller.require_moderator()?;
    find_question(&state, id).await?;

    assessments::set_question_hidden(&state.db, id, req.is_hide).await?;
    info!("Assessment question {} hidden={} by {}", id, req.is_hide, caller.id);
    Ok(ok(find_question(&state, id).await?))
}

/// POST /api/v1/score-ranges
pub async fn create_score_range(
    State(state): State<AppState>,
    caller: AuthUser,
    AppJson(req): AppJson<ScoreRangeRequest>,
) -> ApiResult<ApiJson<ScoreRange>> {
    caller.require_moderator()?;
    let description = req.validate()?;
    if assessments::score_range_overlaps(&state.db, req.min_score, req.max_score, None).await? {
        return Err(ApiError::bad_request(keys::SCORE_RANGE_OVERLAP));
    }

    let id = assessments::insert_score_range(&state.db, description, req.min_score, req.max_score).await?;
    info!(
        "Score range {} [{}, {}] created by {}",
        id, req.min_score, req.max_score, caller.id
    );
    Ok(created(find_score_range(&state, id).await?))
}

/// GET /api/v1/score-ranges
pub async fn list_score_ranges(
    State(state): State<AppState>,
    _caller: AuthUser,
) -> ApiResult<ApiJson<Vec<ScoreRange>>> {
    Ok(ok(assessments::list_score_ranges(&state.db).await?))
}

/// GET /api/v1/score-ranges/:id
pub async fn get_score_range(
    State(state): State<AppState>,
    _caller: AuthUser,
    AppPath(id): AppPath<i64>,
) -> ApiResult<ApiJson<ScoreRange>> {
    Ok(ok(find_score_range(&state, id).await?))
}

/// PUT /api/v1/score-ranges/:id
pub async fn update_score_range(
    State(state): State<AppState>,
    caller: AuthUser,
    AppPath(id): AppPath<i64>,
    AppJson(req): AppJson<ScoreRangeRequest>,
) -> ApiResult<ApiJson<ScoreRange>> {
    caller.require_moderator()?;
    let description = req.validate()?;
    find_score_range(&state, id).await?;
    if assessments::score_range_overlaps(&state.db, req.min_score, req.max_score, Some(id)).await? {
        return Err(ApiError::bad_request(keys::SCORE_RANGE_OVERLAP));
    }

    assessments::update_score_range(&state.db, id, description, req.min_score, req.max_score).await?;
    Ok(ok(find_score_range(&state, id).await?))
}

/// DELETE /api/v1/score-ranges/:id
pub async fn delete_score_range(
    State(state): State<AppState>,
    caller: AuthUser,
    AppPath(id): AppPath<i64>,
) -> ApiResult<StatusCode> {
    caller.require_moderator()?;
    if !assessments::delete_score_range(&state.db, id).await? {
        return Err(ApiError::not_found(entities::ASSESSMENT_SCORE_RANGE));
    }
    info!("Score range {} deleted by {}", id, caller.id);
    Ok(StatusCode::NO_CONTENT)
}

pub fn assessment_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/assessment-questions",
            get(list_questions).post(create_question),
        )
        .route("/assessment-questions/:id", get(get_question))
        .route(
            "/assessment-questions/:id/visibility",
            put(set_question_visibility),
        )
        .route(
            "/score-ranges",
            get(list_score_ranges).post(create_score_range),
        )
        .route(
            "/score-ranges/:id",
            get(get_score_range)
                .put(update_score_range)
                .delete(delete_score_range),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_range_bounds() {
        let reversed = ScoreRangeRequest {
            description: "Mild".to_string(),
            min_score: 20.0,
            max_score: 10.0,
        };
        assert_eq!(reversed.validate().unwrap_err().status(), StatusCode::BAD_REQUEST);

        let single_point = ScoreRangeRequest {
            description: " Mild ".to_string(),
            min_score: 10.0,
            max_score: 10.0,
        };
        assert_eq!(single_point.validate().unwrap(), "Mild");
    }

    #[test]
    fn test_options_required() {
        assert!(options_of(Vec::new()).is_err());
        assert!(options_of(vec![("  ", 1.0)]).is_err());
        assert_eq!(options_of(vec![(" Often ", 2.0)]).unwrap(), vec![("Often", 2.0)]);
    }
}
