use chrono::{NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, Instrument};

use super::activity;
use super::pagination::newest_first;
use super::validation::{check_non_negative, clean, require_text};
use super::{App, ListQuery, Page};
use crate::auth::{Action, CurrentUser, Resource};
use crate::error::{ApiError, ApiResult, ValidationErrors};
use crate::models::{
    new_id, ActivityAction, AuditMeta, Company, Opportunity, OpportunityStatus, Partner,
    Quotation, QuotationStatus, Stage, StageChange, User,
};
use crate::observability::api_metrics;
use crate::store::Filter;
use crate::telemetry::create_workflow_span;
use crate::workflows::opportunity_stage::{effective_checklist, is_known_item};
use crate::workflows::{checklist_for, missing_items, plan_stage_move, DERIVED_QUOTATION_ITEM};

#[derive(Debug, Clone, Serialize)]
pub struct ChecklistItem {
    pub item: String,
    pub done: bool,
    pub derived: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct OpportunityView {
    #[serde(flatten)]
    pub opportunity: Opportunity,
    pub company_name: Option<String>,
    pub partner_name: Option<String>,
    pub owner_name: Option<String>,
    pub stage_name: &'static str,
    pub probability: u8,
    /// Items gating the move out of the current stage
    pub checklist: Vec<ChecklistItem>,
    pub missing_items: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpportunityInput {
    pub name: Option<String>,
    pub company_id: Option<String>,
    pub partner_id: Option<String>,
    pub owner_id: Option<String>,
    pub expected_value: Option<Decimal>,
    pub expected_close_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpportunityFilter {
    pub stage: Option<Stage>,
    pub status: Option<OpportunityStatus>,
    pub company_id: Option<String>,
    pub owner_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QualificationUpdate {
    pub items: BTreeMap<String, bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdvanceRequest {
    pub target_stage: Option<Stage>,
    pub override_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoseRequest {
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineStage {
    pub stage: Stage,
    pub name: &'static str,
    pub probability: u8,
    pub count: usize,
    pub total_value: Decimal,
    pub weighted_value: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct Pipeline {
    pub stages: Vec<PipelineStage>,
    pub open_count: usize,
    pub total_value: Decimal,
    pub weighted_value: Decimal,
}

pub async fn has_approved_quotation(app: &App, opportunity_id: &str) -> ApiResult<bool> {
    let approved = app
        .collection::<Quotation>()
        .find(
            &Filter::new()
                .eq("opportunity_id", opportunity_id)
                .eq("status", QuotationStatus::Approved.as_str()),
        )
        .await?;
    Ok(!approved.is_empty())
}

pub async fn view(app: &App, opportunity: Opportunity) -> ApiResult<OpportunityView> {
    let approved = has_approved_quotation(app, &opportunity.id).await?;
    let state = effective_checklist(&opportunity.qualification, approved);
    let checklist = checklist_for(opportunity.stage)
        .iter()
        .map(|item| ChecklistItem {
            item: item.to_string(),
            done: state.get(*item).copied().unwrap_or(false),
            derived: *item == DERIVED_QUOTATION_ITEM,
        })
        .collect();
    let missing = missing_items(opportunity.stage, &opportunity.qualification, approved);
    let enricher = &app.enricher;
    Ok(OpportunityView {
        company_name: enricher.name::<Company>(Some(&opportunity.company_id)).await,
        partner_name: enricher.name::<Partner>(opportunity.partner_id.as_deref()).await,
        owner_name: enricher.name::<User>(Some(&opportunity.owner_id)).await,
        stage_name: opportunity.stage.name(),
        probability: opportunity.stage.probability(),
        checklist,
        missing_items: missing,
        opportunity,
    })
}

async fn apply(app: &App, opportunity: &mut Opportunity, input: OpportunityInput) -> ApiResult<()> {
    if let Some(name) = input.name {
        opportunity.name = name.trim().to_string();
    }
    if let Some(company_id) = clean(input.company_id) {
        opportunity.company_id = company_id;
    }
    if input.partner_id.is_some() {
        opportunity.partner_id = clean(input.partner_id);
    }
    if let Some(owner_id) = clean(input.owner_id) {
        opportunity.owner_id = owner_id;
    }
    if let Some(value) = input.expected_value {
        opportunity.expected_value = value;
    }
    if input.expected_close_date.is_some() {
        opportunity.expected_close_date = input.expected_close_date;
    }

    let mut errors = ValidationErrors::new();
    require_text(&mut errors, "name", &opportunity.name);
    require_text(&mut errors, "company_id", &opportunity.company_id);
    check_non_negative(&mut errors, "expected_value", opportunity.expected_value);
    errors.finish()?;

    if !app.collection::<Company>().exists(&opportunity.company_id).await? {
        return Err(ApiError::not_found("Company", &opportunity.company_id));
    }
    if let Some(partner_id) = &opportunity.partner_id {
        if !app.collection::<Partner>().exists(partner_id).await? {
            return Err(ApiError::not_found("Partner", partner_id));
        }
    }
    if !app.collection::<User>().exists(&opportunity.owner_id).await? {
        return Err(ApiError::not_found("User", &opportunity.owner_id));
    }
    Ok(())
}

fn ensure_open(opportunity: &Opportunity) -> ApiResult<()> {
    if opportunity.is_open() {
        Ok(())
    } else {
        Err(ApiError::Conflict(format!(
            "opportunity is {} and can no longer change",
            opportunity.status.as_str()
        )))
    }
}

pub async fn list(
    app: &App,
    caller: &CurrentUser,
    filter: OpportunityFilter,
    query: ListQuery,
) -> ApiResult<Page<OpportunityView>> {
    caller.require(Resource::Opportunities, Action::View)?;
    let filter = Filter::new()
        .eq_opt("stage", filter.stage.map(|s| s.to_string()))
        .eq_opt("status", filter.status.map(|s| s.as_str()))
        .eq_opt("company_id", filter.company_id)
        .eq_opt("owner_id", filter.owner_id)
        .search(&["name"], query.search());
    let found = app.collection::<Opportunity>().find(&filter).await?;
    let page = newest_first(found, &query);
    let mut items = Vec::with_capacity(page.items.len());
    for opportunity in page.items {
        items.push(view(app, opportunity).await?);
    }
    Ok(Page {
        items,
        total: page.total,
        page: page.page,
        page_size: page.page_size,
    })
}

pub async fn get(app: &App, caller: &CurrentUser, id: &str) -> ApiResult<OpportunityView> {
    caller.require(Resource::Opportunities, Action::View)?;
    let opportunity = app.collection::<Opportunity>().require(id).await?;
    view(app, opportunity).await
}

pub async fn create(
    app: &App,
    caller: &CurrentUser,
    input: OpportunityInput,
) -> ApiResult<OpportunityView> {
    caller.require(Resource::Opportunities, Action::Create)?;
    let mut opportunity = Opportunity {
        id: new_id(),
        name: String::new(),
        lead_id: None,
        company_id: String::new(),
        partner_id: None,
        owner_id: caller.id().to_string(),
        expected_value: Decimal::ZERO,
        expected_close_date: None,
        stage: Stage::L1,
        status: OpportunityStatus::Open,
        qualification: BTreeMap::new(),
        stage_history: Vec::new(),
        lost_reason: None,
        closed_at: None,
        meta: AuditMeta::created_by(caller.id()),
    };
    apply(app, &mut opportunity, input).await?;
    app.collection::<Opportunity>().insert(&opportunity).await?;
    activity::record_for(
        app,
        caller,
        &opportunity,
        ActivityAction::Created,
        format!("Created opportunity {}", opportunity.name),
    )
    .await;
    view(app, opportunity).await
}

pub async fn update(
    app: &App,
    caller: &CurrentUser,
    id: &str,
    input: OpportunityInput,
) -> ApiResult<OpportunityView> {
    caller.require(Resource::Opportunities, Action::Edit)?;
    let opportunities = app.collection::<Opportunity>();
    let mut opportunity = opportunities.require(id).await?;
    ensure_open(&opportunity)?;
    apply(app, &mut opportunity, input).await?;
    opportunity.meta.touch(caller.id());
    opportunities.update(&opportunity).await?;
    app.enricher.invalidate::<Opportunity>(&opportunity.id).await;
    activity::record_for(app, caller, &opportunity, ActivityAction::Updated, "Updated opportunity").await;
    view(app, opportunity).await
}

pub async fn delete(app: &App, caller: &CurrentUser, id: &str) -> ApiResult<()> {
    caller.require(Resource::Opportunities, Action::Delete)?;
    let opportunities = app.collection::<Opportunity>();
    let opportunity = opportunities.require(id).await?;
    let quotations = app
        .collection::<Quotation>()
        .find(&Filter::new().eq("opportunity_id", opportunity.id.as_str()))
        .await?;
    if !quotations.is_empty() {
        return Err(ApiError::Conflict(format!(
            "opportunity has {} quotation(s); delete them first",
            quotations.len()
        )));
    }
    let opportunity = opportunities.soft_delete(opportunity, caller.id()).await?;
    app.enricher.invalidate::<Opportunity>(&opportunity.id).await;
    activity::record_for(app, caller, &opportunity, ActivityAction::Deleted, "Deleted opportunity").await;
    Ok(())
}

/// Set manually confirmed checklist items
pub async fn set_qualification(
    app: &App,
    caller: &CurrentUser,
    id: &str,
    input: QualificationUpdate,
) -> ApiResult<OpportunityView> {
    caller.require(Resource::Opportunities, Action::Edit)?;
    let opportunities = app.collection::<Opportunity>();
    let mut opportunity = opportunities.require(id).await?;
    ensure_open(&opportunity)?;

    let mut errors = ValidationErrors::new();
    for name in input.items.keys() {
        if name == DERIVED_QUOTATION_ITEM {
            errors.add(
                &format!("items.{name}"),
                "is derived from quotation approval and cannot be set",
            );
        } else if !is_known_item(name) {
            errors.add(&format!("items.{name}"), "is not a qualification item");
        }
    }
    errors.finish()?;

    opportunity.qualification.extend(input.items);
    opportunity.meta.touch(caller.id());
    opportunities.update(&opportunity).await?;
    activity::record_for(app, caller, &opportunity, ActivityAction::Updated, "Updated qualification checklist").await;
    view(app, opportunity).await
}

/// Move to the next stage, or anywhere with an authorised override
pub async fn advance(
    app: &App,
    caller: &CurrentUser,
    id: &str,
    request: AdvanceRequest,
) -> ApiResult<OpportunityView> {
    // executives hold override authority without general edit rights
    let may_override = caller.may_override_stages(&app.config.workflow);
    if !may_override {
        caller.require(Resource::Opportunities, Action::Edit)?;
    }
    let span = create_workflow_span("opportunity_stage", id, caller.id());
    async move {
        let opportunities = app.collection::<Opportunity>();
        let mut opportunity = opportunities.require(id).await?;
        let approved = has_approved_quotation(app, &opportunity.id).await?;
        let plan = plan_stage_move(
            &opportunity,
            request.target_stage,
            request.override_reason.as_deref(),
            may_override,
            approved,
        )?;

        let now = Utc::now();
        let override_reason = request
            .override_reason
            .filter(|_| plan.overridden)
            .map(|r| r.trim().to_string());
        opportunity.stage = plan.to;
        opportunity.stage_history.push(StageChange {
            from: plan.from,
            to: plan.to,
            changed_by: caller.id().to_string(),
            changed_at: now,
            override_reason: override_reason.clone(),
        });
        if plan.closes_as_won {
            opportunity.status = OpportunityStatus::Won;
            opportunity.closed_at = Some(now);
        }
        opportunity.meta.touch(caller.id());
        opportunities.update(&opportunity).await?;

        api_metrics().record_transition();
        info!(
            from = %plan.from,
            to = %plan.to,
            overridden = plan.overridden,
            "Opportunity stage changed"
        );
        let summary = match &override_reason {
            Some(reason) => format!("Stage {} -> {} (override: {reason})", plan.from, plan.to),
            None => format!("Stage {} -> {}", plan.from, plan.to),
        };
        activity::record_for(app, caller, &opportunity, ActivityAction::StageChanged, summary).await;
        view(app, opportunity).await
    }
    .instrument(span)
    .await
}

pub async fn lose(
    app: &App,
    caller: &CurrentUser,
    id: &str,
    request: LoseRequest,
) -> ApiResult<OpportunityView> {
    caller.require(Resource::Opportunities, Action::Edit)?;
    let reason = request.reason.trim().to_string();
    if reason.is_empty() {
        return Err(ApiError::invalid("reason", "a reason is required"));
    }
    let opportunities = app.collection::<Opportunity>();
    let mut opportunity = opportunities.require(id).await?;
    ensure_open(&opportunity)?;
    opportunity.status = OpportunityStatus::Lost;
    opportunity.lost_reason = Some(reason.clone());
    opportunity.closed_at = Some(Utc::now());
    opportunity.meta.touch(caller.id());
    opportunities.update(&opportunity).await?;
    api_metrics().record_transition();
    info!(opportunity_id = %opportunity.id, "Opportunity lost");
    activity::record_for(app, caller, &opportunity, ActivityAction::StatusChanged, format!("Lost: {reason}")).await;
    view(app, opportunity).await
}

fn weighted(value: Decimal, stage: Stage) -> Decimal {
    (value * Decimal::from(stage.probability()) / Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Pipeline summary over open opportunities
pub fn summarize(opportunities: &[Opportunity]) -> Pipeline {
    let stages: Vec<PipelineStage> = Stage::ALL
        .iter()
        .map(|stage| {
            let in_stage: Vec<&Opportunity> = opportunities
                .iter()
                .filter(|o| o.is_open() && o.stage == *stage)
                .collect();
            PipelineStage {
                stage: *stage,
                name: stage.name(),
                probability: stage.probability(),
                count: in_stage.len(),
                total_value: in_stage.iter().map(|o| o.expected_value).sum(),
                weighted_value: in_stage.iter().map(|o| weighted(o.expected_value, *stage)).sum(),
            }
        })
        .collect();
    Pipeline {
        open_count: stages.iter().map(|s| s.count).sum(),
        total_value: stages.iter().map(|s| s.total_value).sum(),
        weighted_value: stages.iter().map(|s| s.weighted_value).sum(),
        stages,
    }
}

pub async fn pipeline(app: &App, caller: &CurrentUser) -> ApiResult<Pipeline> {
    caller.require(Resource::Opportunities, Action::View)?;
    let open = app
        .collection::<Opportunity>()
        .find(&Filter::new().eq("status", OpportunityStatus::Open.as_str()))
        .await?;
    Ok(summarize(&open))
}
