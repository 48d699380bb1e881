//! Screening tests for parents and their scored results

use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use tutorhub_common::db::Role;
use tutorhub_common::resources::{entities, fields, keys};

use crate::api::assessments::options_of;
use crate::api::validate;
use crate::auth::AuthUser;
use crate::db::test_bank::{self, Test, TestQuestion, TestResult};
use crate::db::{assessments, children};
use crate::error::{ApiError, ApiResult};
use crate::pagination::{page_for, ListQuery};
use crate::response::{created, ok, paged, ApiJson, AppJson, AppPath, AppQuery};
use crate::AppState;

const TEST_ORDER: &[(&str, &str)] = &[("createdDate", "created_date"), ("testName", "test_name")];
const RESULT_ORDER: &[(&str, &str)] = &[("createdDate", "r.created_date"), ("totalPoint", "r.total_point")];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestRequest {
    pub test_name: String,
    #[serde(default)]
    pub test_description: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerOptionInput {
    pub option_answer: String,
    pub point: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestQuestionRequest {
    pub question: String,
    #[serde(default)]
    pub options: Vec<AnswerOptionInput>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub question_id: i64,
    pub option_id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResultRequest {
    pub test_id: i64,
    pub child_id: Option<i64>,
    #[serde(default)]
    pub answers: Vec<Answer>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestIdQuery {
    pub test_id: Option<i64>,
}

/// A result with the description of the score range its total falls in
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredResult {
    #[serde(flatten)]
    pub result: TestResult,
    pub score_description: Option<String>,
}

async fn find_test(state: &AppState, id: i64) -> ApiResult<Test> {
    test_bank::find_test(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found(entities::TEST))
}

async fn find_question(state: &AppState, id: i64) -> ApiResult<TestQuestion> {
    test_bank::find_question(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found(entities::TEST_QUESTION))
}

async fn scored(state: &AppState, result: TestResult) -> ApiResult<ScoredResult> {
    let score_description = assessments::score_range_for(&state.db, result.total_point)
        .await?
        .map(|r| r.description);
    Ok(ScoredResult {
        result,
        score_description,
    })
}

/// POST /api/v1/tests
pub async fn create_test(
    State(state): State<AppState>,
    caller: AuthUser,
    AppJson(req): AppJson<TestRequest>,
) -> ApiResult<ApiJson<Test>> {
    caller.require_moderator()?;
    let name = validate::required(&req.test_name, fields::TEST_NAME)?;
    if test_bank::test_name_exists(&state.db, name, None).await? {
        return Err(ApiError::duplicate(entities::TEST));
    }

    let id = test_bank::insert_test(&state.db, name, req.test_description.trim(), caller.id).await?;
    info!("Test {} ({}) created by {}", id, name, caller.id);
    Ok(created(find_test(&state, id).await?))
}

/// GET /api/v1/tests
pub async fn list_tests(
    State(state): State<AppState>,
    _caller: AuthUser,
    AppQuery(query): AppQuery<ListQuery>,
) -> ApiResult<ApiJson<Vec<Test>>> {
    let search = query.search_pattern();
    let total = test_bank::count_tests(&state.db, &search).await?;
    let page = page_for(total, &query, state.page_size());
    let rows = test_bank::list_tests(
        &state.db,
        &search,
        &query.order_clause(TEST_ORDER, "id"),
        page.page_size,
        page.offset(),
    )
    .await?;

    Ok(paged(rows, page))
}

/// GET /api/v1/tests/:id
pub async fn get_test(
    State(state): State<AppState>,
    _caller: AuthUser,
    AppPath(id): AppPath<i64>,
) -> ApiResult<ApiJson<Test>> {
    Ok(ok(find_test(&state, id).await?))
}

/// PUT /api/v1/tests/:id
pub async fn update_test(
    State(state): State<AppState>,
    caller: AuthUser,
    AppPath(id): AppPath<i64>,
    AppJson(req): AppJson<TestRequest>,
) -> ApiResult<ApiJson<Test>> {
    caller.require_moderator()?;
    let name = validate::required(&req.test_name, fields::TEST_NAME)?;
    find_test(&state, id).await?;
    if test_bank::test_name_exists(&state.db, name, Some(id)).await? {
        return Err(ApiError::duplicate(entities::TEST));
    }

    test_bank::update_test(&state.db, id, name, req.test_description.trim()).await?;
    Ok(ok(find_test(&state, id).await?))
}

/// DELETE /api/v1/tests/:id
pub async fn delete_test(
    State(state): State<AppState>,
    caller: AuthUser,
    AppPath(id): AppPath<i64>,
) -> ApiResult<StatusCode> {
    caller.require_moderator()?;
    find_test(&state, id).await?;

    test_bank::soft_delete_test(&state.db, id).await?;
    info!("Test {} deleted by {}", id, caller.id);
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/tests/:id/questions
pub async fn add_test_question(
    State(state): State<AppState>,
    caller: AuthUser,
    AppPath(test_id): AppPath<i64>,
    AppJson(req): AppJson<TestQuestionRequest>,
) -> ApiResult<ApiJson<TestQuestion>> {
    caller.require_moderator()?;
    find_test(&state, test_id).await?;
    let question = validate::required(&req.question, fields::QUESTION)?;
    let options = options_of(req.options.iter().map(|o| (o.option_answer.as_str(), o.point)))?;
    if test_bank::question_exists_in_test(&state.db, test_id, question).await? {
        return Err(ApiError::duplicate(entities::TEST_QUESTION));
    }

    let mut tx = state.db.begin().await?;
    let id = test_bank::insert_question(&mut *tx, test_id, question, &options).await?;
    tx.commit().await?;
    info!("Question {} added to test {} by {}", id, test_id, caller.id);

    Ok(created(find_question(&state, id).await?))
}

/// DELETE /api/v1/test-questions/:id
///
/// Questions that already appear in a submitted result are kept.
pub async fn delete_test_question(
    State(state): State<AppState>,
    caller: AuthUser,
    AppPath(id): AppPath<i64>,
) -> ApiResult<StatusCode> {
    caller.require_moderator()?;
    find_question(&state, id).await?;
    if test_bank::question_answered(&state.db, id).await? {
        return Err(ApiError::already_processed(entities::TEST_QUESTION));
    }

    let mut tx = state.db.begin().await?;
    test_bank::delete_question(&mut *tx, id).await?;
    tx.commit().await?;
    info!("Test question {} deleted by {}", id, caller.id);
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/test-results
///
/// The total is summed from the points of the chosen options.
pub async fn submit_test_result(
    State(state): State<AppState>,
    caller: AuthUser,
    AppJson(req): AppJson<SubmitResultRequest>,
) -> ApiResult<ApiJson<ScoredResult>> {
    caller.require(&[Role::Parent])?;
    find_test(&state, req.test_id).await?;
    if let Some(child_id) = req.child_id {
        let child = children::find_by_id(&state.db, child_id)
            .await?
            .ok_or_else(|| ApiError::not_found(entities::CHILD_INFORMATION))?;
        if child.parent_id != caller.id {
            return Err(ApiError::Forbidden);
        }
    }

    let mut answers: Vec<(i64, i64)> = Vec::with_capacity(req.answers.len());
    let mut total_point = 0.0;
    for answer in &req.answers {
        let question = answer.question_id.to_string();
        if answers.iter().any(|(q, _)| *q == answer.question_id) {
            return Err(ApiError::bad_request_with(keys::QUESTION_ANSWERED_TWICE, &[&question]));
        }
        let in_test = test_bank::find_question(&state.db, answer.question_id)
            .await?
            .is_some_and(|q| q.test_id == req.test_id);
        if !in_test {
            return Err(ApiError::bad_request_with(keys::QUESTION_NOT_IN_TEST, &[&question]));
        }
        let point = test_bank::answer_point(&state.db, req.test_id, answer.question_id, answer.option_id)
            .await?
            .ok_or_else(|| ApiError::bad_request_with(keys::OPTION_NOT_IN_QUESTION, &[&question]))?;

        total_point += point;
        answers.push((answer.question_id, answer.option_id));
    }

    let mut tx = state.db.begin().await?;
    let id = test_bank::insert_result(&mut *tx, req.test_id, caller.id, req.child_id, total_point, &answers).await?;
    tx.commit().await?;
    info!(
        "Parent {} submitted result {} for test {} (total {})",
        caller.id, id, req.test_id, total_point
    );

    let result = test_bank::find_result(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found(entities::TEST_RESULT))?;
    Ok(created(scored(&state, result).await?))
}

/// GET /api/v1/test-results
///
/// Parents see their own results, moderators everyone's.
pub async fn list_test_results(
    State(state): State<AppState>,
    caller: AuthUser,
    AppQuery(query): AppQuery<ListQuery>,
    AppQuery(by_test): AppQuery<TestIdQuery>,
) -> ApiResult<ApiJson<Vec<ScoredResult>>> {
    caller.require(&[Role::Parent, Role::Staff, Role::Manager])?;
    let parent_id = (!caller.is_moderator()).then_some(caller.id);

    let total = test_bank::count_results(&state.db, parent_id, by_test.test_id).await?;
    let page = page_for(total, &query, state.page_size());
    let rows = test_bank::list_results(
        &state.db,
        parent_id,
        by_test.test_id,
        &query.order_clause(RESULT_ORDER, "r.id"),
        page.page_size,
        page.offset(),
    )
    .await?;

    let mut results = Vec::with_capacity(rows.len());
    for row in rows {
        results.push(scored(&state, row).await?);
    }
    Ok(paged(results, page))
}

/// GET /api/v1/test-results/:id
pub async fn get_test_result(
    State(state): State<AppState>,
    caller: AuthUser,
    AppPath(id): AppPath<i64>,
) -> ApiResult<ApiJson<ScoredResult>> {
    let result = test_bank::find_result(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found(entities::TEST_RESULT))?;
    if result.parent_id != caller.id && !caller.is_moderator() {
        return Err(ApiError::Forbidden);
    }
    Ok(ok(scored(&state, result).await?))
}

pub fn test_routes() -> Router<AppState> {
    Router::new()
        .route("/tests", post(create_test).get(list_tests))
        .route(
            "/tests/:id",
            get(get_test).put(update_test).delete(delete_test),
        )
        .route("/tests/:id/questions", post(add_test_question))
        .route("/test-questions/:id", delete(delete_test_question))
        .route(
            "/test-results",
            post(submit_test_result).get(list_test_results),
        )
        .route("/test-results/:id", get(get_test_result))
}
