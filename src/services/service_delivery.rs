use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::activity;
use super::pagination::newest_first;
use super::validation::{clean, require_text};
use super::{App, ListQuery, Page};
use crate::auth::{Action, CurrentUser, Resource};
use crate::error::{ApiError, ApiResult, ValidationErrors};
use crate::models::{
    new_id, ActivityAction, AuditMeta, Company, DeliveryStatus, Milestone, Quotation,
    QuotationStatus, ServiceDelivery, User,
};
use crate::observability::api_metrics;
use crate::store::Filter;
use crate::workflows::check_delivery_transition;

#[derive(Debug, Clone, Serialize)]
pub struct ServiceDeliveryView {
    #[serde(flatten)]
    pub delivery: ServiceDelivery,
    pub progress_percent: u8,
    pub company_name: Option<String>,
    pub quotation_number: Option<String>,
    pub assignee_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateServiceDelivery {
    pub quotation_id: String,
    pub title: Option<String>,
    pub assigned_to: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateServiceDelivery {
    pub title: Option<String>,
    pub assigned_to: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceDeliveryFilter {
    pub status: Option<DeliveryStatus>,
    pub company_id: Option<String>,
    pub quotation_id: Option<String>,
    pub assigned_to: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MilestoneInput {
    pub name: String,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusChange {
    pub status: DeliveryStatus,
}

pub async fn view(app: &App, delivery: ServiceDelivery) -> ServiceDeliveryView {
    let enricher = &app.enricher;
    ServiceDeliveryView {
        progress_percent: delivery.progress_percent(),
        company_name: enricher.name::<Company>(Some(&delivery.company_id)).await,
        quotation_number: enricher.name::<Quotation>(Some(&delivery.quotation_id)).await,
        assignee_name: enricher.name::<User>(delivery.assigned_to.as_deref()).await,
        delivery,
    }
}

async fn check_assignee(app: &App, assigned_to: Option<&str>) -> ApiResult<()> {
    if let Some(user_id) = assigned_to {
        if !app.collection::<User>().exists(user_id).await? {
            return Err(ApiError::not_found("User", user_id));
        }
    }
    Ok(())
}

fn check_dates(start: Option<NaiveDate>, end: Option<NaiveDate>) -> ApiResult<()> {
    let mut errors = ValidationErrors::new();
    if let (Some(start), Some(end)) = (start, end) {
        errors.check(start <= end, "end_date", "must not be before start_date");
    }
    errors.finish()
}

pub async fn list(
    app: &App,
    caller: &CurrentUser,
    filter: ServiceDeliveryFilter,
    query: ListQuery,
) -> ApiResult<Page<ServiceDeliveryView>> {
    caller.require(Resource::Services, Action::View)?;
    let filter = Filter::new()
        .eq_opt("status", filter.status.map(|s| s.as_str()))
        .eq_opt("company_id", filter.company_id)
        .eq_opt("quotation_id", filter.quotation_id)
        .eq_opt("assigned_to", filter.assigned_to)
        .search(&["title", "notes"], query.search());
    let found = app.collection::<ServiceDelivery>().find(&filter).await?;
    Ok(newest_first(found, &query)
        .map_async(|delivery| view(app, delivery))
        .await)
}

pub async fn get(app: &App, caller: &CurrentUser, id: &str) -> ApiResult<ServiceDeliveryView> {
    caller.require(Resource::Services, Action::View)?;
    let delivery = app.collection::<ServiceDelivery>().require(id).await?;
    Ok(view(app, delivery).await)
}

pub async fn create(
    app: &App,
    caller: &CurrentUser,
    input: CreateServiceDelivery,
) -> ApiResult<ServiceDeliveryView> {
    caller.require(Resource::Services, Action::Create)?;
    let quotation = app
        .collection::<Quotation>()
        .require(&input.quotation_id)
        .await?;
    if quotation.status != QuotationStatus::Approved {
        return Err(ApiError::Conflict(format!(
            "quotation {} is {}; delivery needs an approved quotation",
            quotation.quotation_number,
            quotation.status.as_str()
        )));
    }
    let assigned_to = clean(input.assigned_to);
    check_assignee(app, assigned_to.as_deref()).await?;
    check_dates(input.start_date, input.end_date)?;

    let delivery = ServiceDelivery {
        id: new_id(),
        title: clean(input.title).unwrap_or_else(|| quotation.title.clone()),
        quotation_id: quotation.id.clone(),
        opportunity_id: quotation.opportunity_id.clone(),
        company_id: quotation.company_id.clone(),
        assigned_to,
        status: DeliveryStatus::Planned,
        start_date: input.start_date,
        end_date: input.end_date,
        milestones: Vec::new(),
        notes: clean(input.notes),
        meta: AuditMeta::created_by(caller.id()),
    };
    app.collection::<ServiceDelivery>().insert(&delivery).await?;
    info!(delivery_id = %delivery.id, quotation = %quotation.quotation_number, "Service delivery created");
    activity::record_for(
        app,
        caller,
        &delivery,
        ActivityAction::Created,
        format!("Delivery started for quotation {}", quotation.quotation_number),
    )
    .await;
    Ok(view(app, delivery).await)
}

pub async fn update(
    app: &App,
    caller: &CurrentUser,
    id: &str,
    input: UpdateServiceDelivery,
) -> ApiResult<ServiceDeliveryView> {
    caller.require(Resource::Services, Action::Edit)?;
    let deliveries = app.collection::<ServiceDelivery>();
    let mut delivery = deliveries.require(id).await?;
    if let Some(title) = input.title {
        let mut errors = ValidationErrors::new();
        require_text(&mut errors, "title", &title);
        errors.finish()?;
        delivery.title = title.trim().to_string();
    }
    if input.assigned_to.is_some() {
        delivery.assigned_to = clean(input.assigned_to);
        check_assignee(app, delivery.assigned_to.as_deref()).await?;
    }
    if input.start_date.is_some() {
        delivery.start_date = input.start_date;
    }
    if input.end_date.is_some() {
        delivery.end_date = input.end_date;
    }
    if input.notes.is_some() {
        delivery.notes = clean(input.notes);
    }
    check_dates(delivery.start_date, delivery.end_date)?;
    delivery.meta.touch(caller.id());
    deliveries.update(&delivery).await?;
    activity::record_for(app, caller, &delivery, ActivityAction::Updated, "Updated delivery").await;
    Ok(view(app, delivery).await)
}

pub async fn delete(app: &App, caller: &CurrentUser, id: &str) -> ApiResult<()> {
    caller.require(Resource::Services, Action::Delete)?;
    let deliveries = app.collection::<ServiceDelivery>();
    let delivery = deliveries.require(id).await?;
    let delivery = deliveries.soft_delete(delivery, caller.id()).await?;
    activity::record_for(app, caller, &delivery, ActivityAction::Deleted, "Deleted delivery").await;
    Ok(())
}

fn ensure_active(delivery: &ServiceDelivery) -> ApiResult<()> {
    if delivery.status.is_terminal() {
        Err(ApiError::Conflict(format!(
            "delivery is {} and can no longer change",
            delivery.status.as_str()
        )))
    } else {
        Ok(())
    }
}

pub async fn add_milestone(
    app: &App,
    caller: &CurrentUser,
    id: &str,
    input: MilestoneInput,
) -> ApiResult<ServiceDeliveryView> {
    caller.require(Resource::Services, Action::Edit)?;
    let mut errors = ValidationErrors::new();
    require_text(&mut errors, "name", &input.name);
    errors.finish()?;

    let deliveries = app.collection::<ServiceDelivery>();
    let mut delivery = deliveries.require(id).await?;
    ensure_active(&delivery)?;
    let name = input.name.trim().to_string();
    delivery.milestones.push(Milestone {
        id: new_id(),
        name: name.clone(),
        due_date: input.due_date,
        completed_at: None,
        completed_by: None,
    });
    delivery.meta.touch(caller.id());
    deliveries.update(&delivery).await?;
    activity::record_for(app, caller, &delivery, ActivityAction::Updated, format!("Added milestone {name}")).await;
    Ok(view(app, delivery).await)
}

pub async fn complete_milestone(
    app: &App,
    caller: &CurrentUser,
    id: &str,
    milestone_id: &str,
) -> ApiResult<ServiceDeliveryView> {
    caller.require(Resource::Services, Action::Edit)?;
    let deliveries = app.collection::<ServiceDelivery>();
    let mut delivery = deliveries.require(id).await?;
    ensure_active(&delivery)?;
    let milestone = delivery
        .milestones
        .iter_mut()
        .find(|m| m.id == milestone_id)
        .ok_or_else(|| ApiError::not_found("Milestone", milestone_id))?;
    if milestone.is_complete() {
        return Err(ApiError::Conflict(format!(
            "milestone {} is already complete",
            milestone.name
        )));
    }
    milestone.completed_at = Some(Utc::now());
    milestone.completed_by = Some(caller.id().to_string());
    let summary = format!("Completed milestone {}", milestone.name);
    delivery.meta.touch(caller.id());
    deliveries.update(&delivery).await?;
    activity::record_for(app, caller, &delivery, ActivityAction::Updated, summary).await;
    Ok(view(app, delivery).await)
}

pub async fn change_status(
    app: &App,
    caller: &CurrentUser,
    id: &str,
    change: StatusChange,
) -> ApiResult<ServiceDeliveryView> {
    caller.require(Resource::Services, Action::Edit)?;
    let deliveries = app.collection::<ServiceDelivery>();
    let mut delivery = deliveries.require(id).await?;
    check_delivery_transition(&delivery, change.status)?;

    let from = delivery.status;
    delivery.status = change.status;
    if change.status == DeliveryStatus::InProgress && delivery.start_date.is_none() {
        delivery.start_date = Some(Utc::now().date_naive());
    }
    if change.status == DeliveryStatus::Completed {
        delivery.end_date = Some(Utc::now().date_naive());
    }
    delivery.meta.touch(caller.id());
    deliveries.update(&delivery).await?;
    api_metrics().record_transition();
    info!(delivery_id = %delivery.id, from = from.as_str(), to = change.status.as_str(), "Delivery status changed");
    activity::record_for(
        app,
        caller,
        &delivery,
        ActivityAction::StatusChanged,
        format!("Status {} -> {}", from.as_str(), change.status.as_str()),
    )
    .await;
    Ok(view(app, delivery).await)
}
