//! Public tutor directory and the tutor's own profile

use axum::{
    extract::State,
    routing::{get, put},
    Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;
use tutorhub_common::db::Role;
use tutorhub_common::resources::{entities, fields, keys};

use crate::api::validate;
use crate::auth::AuthUser;
use crate::db::certificates::{self, Certificate};
use crate::db::curriculums::{self, Curriculum};
use crate::db::tutors::{self, Tutor, TutorFilter, TutorProfile};
use crate::db::users;
use crate::db::work_experiences::{self, WorkExperience};
use crate::error::{ApiError, ApiResult};
use crate::pagination::{page_for, ListQuery};
use crate::response::{ok, paged, ApiJson, AppJson, AppPath, AppQuery};
use crate::AppState;

const ORDER: &[(&str, &str)] = &[
    ("createdDate", "t.created_date"),
    ("price", "t.price_per_hour"),
    ("fullName", "u.full_name"),
];

/// Age filter read alongside [`ListQuery`] from the same query string
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgeQuery {
    pub start_age: Option<i64>,
    pub end_age: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTutorRequest {
    pub full_name: String,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub image_url: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub start_age: i64,
    pub end_age: i64,
    #[serde(default)]
    pub about_me: String,
    pub price_per_hour: f64,
}

/// Tutor with the qualifications a parent may see
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TutorDetail {
    #[serde(flatten)]
    pub tutor: Tutor,
    pub certificates: Vec<Certificate>,
    pub work_experiences: Vec<WorkExperience>,
    pub curriculums: Vec<Curriculum>,
}

async fn load_detail(state: &AppState, id: i64) -> ApiResult<TutorDetail> {
    let tutor = tutors::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found(entities::TUTOR))?;

    Ok(TutorDetail {
        certificates: certificates::approved_for_tutor(&state.db, id).await?,
        work_experiences: work_experiences::approved_for_tutor(&state.db, id).await?,
        curriculums: curriculums::active_for_tutor(&state.db, id).await?,
        tutor,
    })
}

/// GET /api/v1/tutors
///
/// `startAge`/`endAge` keep tutors whose teaching range overlaps the
/// requested one.
pub async fn list_tutors(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<ListQuery>,
    AppQuery(ages): AppQuery<AgeQuery>,
) -> ApiResult<ApiJson<Vec<Tutor>>> {
    if let (Some(from), Some(end)) = (ages.start_age, ages.end_age) {
        validate::age_range(from, end)?;
    }

    let filter = TutorFilter {
        search: query.search_pattern(),
        start_age: ages.start_age,
        end_age: ages.end_age,
    };
    let total = tutors::count(&state.db, &filter).await?;
    let page = page_for(total, &query, state.page_size());
    let rows = tutors::list(
        &state.db,
        &filter,
        &query.order_clause(ORDER, "t.user_id"),
        page.page_size,
        page.offset(),
    )
    .await?;

    Ok(paged(rows, page))
}

/// GET /api/v1/tutors/:id
pub async fn get_tutor(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
) -> ApiResult<ApiJson<TutorDetail>> {
    Ok(ok(load_detail(&state, id).await?))
}

/// PUT /api/v1/tutors/me
pub async fn update_my_profile(
    State(state): State<AppState>,
    caller: AuthUser,
    AppJson(req): AppJson<UpdateTutorRequest>,
) -> ApiResult<ApiJson<TutorDetail>> {
    caller.require(&[Role::Tutor])?;
    let full_name = validate::required(&req.full_name, fields::FULL_NAME)?;
    validate::age_range(req.start_age, req.end_age)?;
    if let Some(date_of_birth) = req.date_of_birth {
        validate::not_in_future(date_of_birth, fields::BIRTH_DATE)?;
    }
    if req.price_per_hour < 0.0 {
        return Err(ApiError::bad_request(keys::BAD_REQUEST));
    }
    if !tutors::exists(&state.db, caller.id).await? {
        return Err(ApiError::not_found(entities::TUTOR));
    }

    let mut tx = state.db.begin().await?;
    users::update_contact(
        &mut *tx,
        caller.id,
        full_name,
        req.phone_number.as_deref(),
        req.address.as_deref(),
        req.image_url.as_deref(),
    )
    .await?;
    tutors::update(
        &mut *tx,
        caller.id,
        &TutorProfile {
            date_of_birth: req.date_of_birth,
            start_age: req.start_age,
            end_age: req.end_age,
            about_me: req.about_me.trim(),
            price_per_hour: req.price_per_hour,
        },
    )
    .await?;
    tx.commit().await?;

    info!("Tutor {} updated their profile", caller.id);
    Ok(ok(load_detail(&state, caller.id).await?))
}

pub fn tutor_routes() -> Router<AppState> {
    Router::new()
        .route("/tutors", get(list_tutors))
        .route("/tutors/me", put(update_my_profile))
        .route("/tutors/:id", get(get_tutor))
}
