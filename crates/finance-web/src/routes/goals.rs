//! Group savings goal routes.

use askama::Template;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Form;
use database::{FamilyGroup, GoalContribution};
use serde::Deserialize;
use services::goals::{self, GoalProgress};
use services::groups;

use crate::error::Result;
use crate::filters;
use crate::forms;
use crate::routes::{form_outcome, is_htmx, nav, redirect_after, Nav};
use crate::session::CurrentUser;
use crate::state::AppState;

pub struct GoalsView {
    pub goals: Vec<GoalProgress>,
    pub groups: Vec<FamilyGroup>,
}

#[derive(Template)]
#[template(path = "goals.html")]
pub struct GoalsPage {
    pub nav: Nav,
    pub view: GoalsView,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "partials/goals_list.html")]
pub struct GoalsList {
    pub view: GoalsView,
    pub error: Option<String>,
}

pub struct GoalView {
    pub progress: GoalProgress,
    /// `(user_id, name, total)`, largest first.
    pub contributors: Vec<(i64, String, f64)>,
    pub contributions: Vec<GoalContribution>,
    /// Set right after the contribution that reached the target.
    pub reached: bool,
}

#[derive(Template)]
#[template(path = "goal_detail.html")]
pub struct GoalPage {
    pub nav: Nav,
    pub view: GoalView,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "partials/goal_progress.html")]
pub struct GoalFragment {
    pub view: GoalView,
    pub error: Option<String>,
}

#[derive(Deserialize)]
pub struct GoalForm {
    pub group_id: Option<String>,
    pub name: String,
    pub target_amount: String,
    pub deadline: Option<String>,
}

#[derive(Deserialize)]
pub struct ContributionForm {
    pub amount: String,
}

async fn render_list(
    state: &AppState,
    user: &CurrentUser,
    headers: &HeaderMap,
    error: Option<String>,
) -> Result<Response> {
    let view = GoalsView {
        goals: goals::list_for_user(&state.db, user.id()).await?,
        groups: groups::list_groups(&state.db, user.id()).await?,
    };

    if is_htmx(headers) {
        Ok(GoalsList { view, error }.into_response())
    } else {
        Ok(GoalsPage {
            nav: nav(state, user).await?,
            view,
            error,
        }
        .into_response())
    }
}

async fn render_goal(
    state: &AppState,
    user: &CurrentUser,
    headers: &HeaderMap,
    goal_id: i64,
    reached: bool,
    error: Option<String>,
) -> Result<Response> {
    let (progress, contributors, contributions) =
        goals::goal_detail(&state.db, user.id(), goal_id).await?;
    let view = GoalView {
        progress,
        contributors,
        contributions,
        reached,
    };

    if is_htmx(headers) {
        Ok(GoalFragment { view, error }.into_response())
    } else {
        Ok(GoalPage {
            nav: nav(state, user).await?,
            view,
            error,
        }
        .into_response())
    }
}

pub async fn goals_page(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
) -> Result<Response> {
    render_list(&state, &user, &headers, None).await
}

pub async fn goal_page(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Response> {
    render_goal(&state, &user, &headers, id, false, None).await
}

pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
    Form(form): Form<GoalForm>,
) -> Result<Response> {
    let outcome = async {
        let group_id = forms::optional_id("Grupo", form.group_id.as_deref())?
            .ok_or_else(|| services::ServiceError::invalid("Escolha o grupo da meta"))?;
        let target = forms::amount("Valor da meta", &form.target_amount)?;
        let deadline = forms::optional_date("Prazo", form.deadline.as_deref())?;
        goals::create_goal(&state.db, user.id(), group_id, &form.name, target, deadline).await
    }
    .await;

    let error = form_outcome(outcome)?;
    if let Some(redirect) = redirect_after(&error, &headers, "/goals") {
        return Ok(redirect);
    }
    render_list(&state, &user, &headers, error).await
}

pub async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Form(form): Form<GoalForm>,
) -> Result<Response> {
    let outcome = async {
        let target = forms::amount("Valor da meta", &form.target_amount)?;
        let deadline = forms::optional_date("Prazo", form.deadline.as_deref())?;
        goals::update_goal(&state.db, user.id(), id, &form.name, target, deadline).await
    }
    .await;

    let error = form_outcome(outcome)?;
    if let Some(redirect) = redirect_after(&error, &headers, &format!("/goals/{id}")) {
        return Ok(redirect);
    }
    render_goal(&state, &user, &headers, id, false, error).await
}

pub async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Response> {
    goals::delete_goal(&state.db, user.id(), id).await?;
    if is_htmx(&headers) {
        return render_list(&state, &user, &headers, None).await;
    }
    Ok(Redirect::to("/goals").into_response())
}

pub async fn contribute(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Form(form): Form<ContributionForm>,
) -> Result<Response> {
    let outcome = async {
        let amount = forms::amount("Valor", &form.amount)?;
        goals::contribute(&state.db, user.id(), id, amount, state.now()).await
    }
    .await;

    match outcome {
        Ok(result) => {
            if let Some(redirect) = redirect_after(&None, &headers, &format!("/goals/{id}")) {
                return Ok(redirect);
            }
            render_goal(&state, &user, &headers, id, result.reached, None).await
        }
        Err(err) => {
            let error = form_outcome::<()>(Err(err))?;
            render_goal(&state, &user, &headers, id, false, error).await
        }
    }
}
