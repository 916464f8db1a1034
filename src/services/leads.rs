use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, Instrument};

use super::activity;
use super::master_data::require_reference;
use super::opportunities::{self, OpportunityView};
use super::pagination::newest_first;
use super::validation::{check_email, check_non_negative, check_phone, clean, clean_lower, require_text};
use super::{App, ListQuery, Page};
use crate::auth::{Action, CurrentUser, Resource};
use crate::error::{ApiError, ApiResult, ValidationErrors};
use crate::models::{
    new_id, ActivityAction, AuditMeta, Company, Lead, LeadStatus, MasterCategory, MasterData,
    Opportunity, OpportunityStatus, Partner, Stage, User,
};
use crate::observability::api_metrics;
use crate::store::{Filter, StoreError};
use crate::telemetry::create_workflow_span;

#[derive(Debug, Clone, Serialize)]
pub struct LeadView {
    #[serde(flatten)]
    pub lead: Lead,
    pub company_name: Option<String>,
    pub partner_name: Option<String>,
    pub owner_name: Option<String>,
    pub lead_source_name: Option<String>,
    pub lead_type_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeadInput {
    pub title: Option<String>,
    pub company_id: Option<String>,
    pub partner_id: Option<String>,
    pub owner_id: Option<String>,
    pub lead_source_id: Option<String>,
    pub lead_type_id: Option<String>,
    pub contact_name: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub expected_value: Option<Decimal>,
    pub expected_close_date: Option<NaiveDate>,
    pub status: Option<LeadStatus>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeadFilter {
    pub status: Option<LeadStatus>,
    pub company_id: Option<String>,
    pub owner_id: Option<String>,
    pub partner_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RejectLead {
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Conversion {
    pub lead: LeadView,
    pub opportunity: OpportunityView,
    /// False when the lead had already been converted
    pub created: bool,
}

pub async fn view(app: &App, lead: Lead) -> LeadView {
    let enricher = &app.enricher;
    LeadView {
        company_name: enricher.name::<Company>(Some(&lead.company_id)).await,
        partner_name: enricher.name::<Partner>(lead.partner_id.as_deref()).await,
        owner_name: enricher.name::<User>(Some(&lead.owner_id)).await,
        lead_source_name: enricher.name::<MasterData>(lead.lead_source_id.as_deref()).await,
        lead_type_name: enricher.name::<MasterData>(lead.lead_type_id.as_deref()).await,
        lead,
    }
}

async fn apply(app: &App, lead: &mut Lead, input: LeadInput) -> ApiResult<()> {
    if let Some(title) = input.title {
        lead.title = title.trim().to_string();
    }
    if let Some(company_id) = clean(input.company_id) {
        lead.company_id = company_id;
    }
    if input.partner_id.is_some() {
        lead.partner_id = clean(input.partner_id);
    }
    if let Some(owner_id) = clean(input.owner_id) {
        lead.owner_id = owner_id;
    }
    if input.lead_source_id.is_some() {
        lead.lead_source_id = clean(input.lead_source_id);
    }
    if input.lead_type_id.is_some() {
        lead.lead_type_id = clean(input.lead_type_id);
    }
    if input.contact_name.is_some() {
        lead.contact_name = clean(input.contact_name);
    }
    if input.contact_email.is_some() {
        lead.contact_email = clean_lower(input.contact_email);
    }
    if input.contact_phone.is_some() {
        lead.contact_phone = clean(input.contact_phone);
    }
    if let Some(value) = input.expected_value {
        lead.expected_value = value;
    }
    if input.expected_close_date.is_some() {
        lead.expected_close_date = input.expected_close_date;
    }
    if input.notes.is_some() {
        lead.notes = clean(input.notes);
    }

    let mut errors = ValidationErrors::new();
    if let Some(status) = input.status {
        errors.check(
            matches!(status, LeadStatus::New | LeadStatus::Contacted | LeadStatus::Qualified),
            "status",
            "use the approve or reject actions to close a lead",
        );
        lead.status = status;
    }
    require_text(&mut errors, "title", &lead.title);
    require_text(&mut errors, "company_id", &lead.company_id);
    check_email(&mut errors, "contact_email", lead.contact_email.as_deref());
    check_phone(&mut errors, "contact_phone", lead.contact_phone.as_deref());
    check_non_negative(&mut errors, "expected_value", lead.expected_value);
    errors.finish()?;

    if !app.collection::<Company>().exists(&lead.company_id).await? {
        return Err(ApiError::not_found("Company", &lead.company_id));
    }
    if let Some(partner_id) = &lead.partner_id {
        if !app.collection::<Partner>().exists(partner_id).await? {
            return Err(ApiError::not_found("Partner", partner_id));
        }
    }
    if !app.collection::<User>().exists(&lead.owner_id).await? {
        return Err(ApiError::not_found("User", &lead.owner_id));
    }
    require_reference(app, "lead_source_id", MasterCategory::LeadSource, lead.lead_source_id.as_deref()).await?;
    require_reference(app, "lead_type_id", MasterCategory::LeadType, lead.lead_type_id.as_deref()).await
}

pub async fn list(
    app: &App,
    caller: &CurrentUser,
    filter: LeadFilter,
    query: ListQuery,
) -> ApiResult<Page<LeadView>> {
    caller.require(Resource::Leads, Action::View)?;
    let filter = Filter::new()
        .eq_opt("status", filter.status.map(|s| s.as_str()))
        .eq_opt("company_id", filter.company_id)
        .eq_opt("owner_id", filter.owner_id)
        .eq_opt("partner_id", filter.partner_id)
        .search(&["title", "contact_name", "contact_email"], query.search());
    let leads = app.collection::<Lead>().find(&filter).await?;
    Ok(newest_first(leads, &query).map_async(|lead| view(app, lead)).await)
}

pub async fn get(app: &App, caller: &CurrentUser, id: &str) -> ApiResult<LeadView> {
    caller.require(Resource::Leads, Action::View)?;
    let lead = app.collection::<Lead>().require(id).await?;
    Ok(view(app, lead).await)
}

pub async fn create(app: &App, caller: &CurrentUser, input: LeadInput) -> ApiResult<LeadView> {
    caller.require(Resource::Leads, Action::Create)?;
    let mut lead = Lead {
        id: new_id(),
        title: String::new(),
        company_id: String::new(),
        partner_id: None,
        owner_id: caller.id().to_string(),
        lead_source_id: None,
        lead_type_id: None,
        contact_name: None,
        contact_email: None,
        contact_phone: None,
        expected_value: Decimal::ZERO,
        expected_close_date: None,
        status: LeadStatus::New,
        notes: None,
        opportunity_id: None,
        approved_by: None,
        approved_at: None,
        rejection_reason: None,
        meta: AuditMeta::created_by(caller.id()),
    };
    apply(app, &mut lead, input).await?;
    app.collection::<Lead>().insert(&lead).await?;
    activity::record_for(app, caller, &lead, ActivityAction::Created, format!("Created lead {}", lead.title)).await;
    Ok(view(app, lead).await)
}

fn ensure_open(lead: &Lead) -> ApiResult<()> {
    if lead.status == LeadStatus::Approved {
        Err(ApiError::Conflict("lead is approved and can no longer change".into()))
    } else {
        Ok(())
    }
}

pub async fn update(app: &App, caller: &CurrentUser, id: &str, input: LeadInput) -> ApiResult<LeadView> {
    caller.require(Resource::Leads, Action::Edit)?;
    let leads = app.collection::<Lead>();
    let mut lead = leads.require(id).await?;
    ensure_open(&lead)?;
    let previous_status = lead.status;
    apply(app, &mut lead, input).await?;
    lead.meta.touch(caller.id());
    leads.update(&lead).await?;
    app.enricher.invalidate::<Lead>(&lead.id).await;

    let (action, summary) = if lead.status != previous_status {
        (
            ActivityAction::StatusChanged,
            format!("Status {} -> {}", previous_status.as_str(), lead.status.as_str()),
        )
    } else {
        (ActivityAction::Updated, "Updated lead".to_string())
    };
    activity::record_for(app, caller, &lead, action, summary).await;
    Ok(view(app, lead).await)
}

pub async fn delete(app: &App, caller: &CurrentUser, id: &str) -> ApiResult<()> {
    caller.require(Resource::Leads, Action::Delete)?;
    let leads = app.collection::<Lead>();
    let lead = leads.require(id).await?;
    ensure_open(&lead)?;
    let lead = leads.soft_delete(lead, caller.id()).await?;
    app.enricher.invalidate::<Lead>(&lead.id).await;
    activity::record_for(app, caller, &lead, ActivityAction::Deleted, format!("Deleted lead {}", lead.title)).await;
    Ok(())
}

/// Approve a lead and convert it into an L1 opportunity, at most once
pub async fn approve(app: &App, caller: &CurrentUser, id: &str) -> ApiResult<Conversion> {
    caller.require(Resource::Leads, Action::Approve)?;
    let span = create_workflow_span("lead_conversion", id, caller.id());
    async move {
        let leads = app.collection::<Lead>();
        let opportunities = app.collection::<Opportunity>();
        let mut lead = leads.require(id).await?;

        if let Some(existing) = existing_opportunity(app, &lead).await? {
            info!(opportunity_id = %existing.id, "Lead already converted");
            if lead.status != LeadStatus::Approved || lead.opportunity_id.as_deref() != Some(existing.id.as_str()) {
                link(app, caller, &mut lead, &existing).await?;
            }
            return Ok(Conversion {
                lead: view(app, lead).await,
                opportunity: opportunities::view(app, existing).await?,
                created: false,
            });
        }
        if lead.status == LeadStatus::Rejected {
            return Err(ApiError::Conflict("rejected leads cannot be approved".into()));
        }

        let opportunity = Opportunity {
            id: new_id(),
            name: lead.title.clone(),
            lead_id: Some(lead.id.clone()),
            company_id: lead.company_id.clone(),
            partner_id: lead.partner_id.clone(),
            owner_id: lead.owner_id.clone(),
            expected_value: lead.expected_value,
            expected_close_date: lead.expected_close_date,
            stage: Stage::L1,
            status: OpportunityStatus::Open,
            qualification: BTreeMap::new(),
            stage_history: Vec::new(),
            lost_reason: None,
            closed_at: None,
            meta: AuditMeta::created_by(caller.id()),
        };
        let (opportunity, created) = match opportunities.insert(&opportunity).await {
            Ok(()) => (opportunity, true),
            // A concurrent approval won the race
            Err(StoreError::UniqueViolation { .. }) => match existing_opportunity(app, &lead).await? {
                Some(existing) => (existing, false),
                None => return Err(ApiError::Conflict("lead conversion is in progress".into())),
            },
            Err(e) => return Err(e.into()),
        };

        link(app, caller, &mut lead, &opportunity).await?;
        if created {
            api_metrics().record_transition();
            info!(opportunity_id = %opportunity.id, "Lead converted to opportunity");
            activity::record_for(
                app,
                caller,
                &opportunity,
                ActivityAction::Created,
                format!("Created from lead {}", lead.title),
            )
            .await;
        }
        Ok(Conversion {
            lead: view(app, lead).await,
            opportunity: opportunities::view(app, opportunity).await?,
            created,
        })
    }
    .instrument(span)
    .await
}

async fn existing_opportunity(app: &App, lead: &Lead) -> ApiResult<Option<Opportunity>> {
    let opportunities = app.collection::<Opportunity>();
    if let Some(id) = &lead.opportunity_id {
        if let Some(opportunity) = opportunities.get_live(id).await? {
            return Ok(Some(opportunity));
        }
    }
    Ok(opportunities
        .find(&Filter::new().eq("lead_id", lead.id.as_str()))
        .await?
        .pop())
}

async fn link(app: &App, caller: &CurrentUser, lead: &mut Lead, opportunity: &Opportunity) -> ApiResult<()> {
    lead.status = LeadStatus::Approved;
    lead.opportunity_id = Some(opportunity.id.clone());
    lead.approved_by = Some(caller.id().to_string());
    lead.approved_at = Some(Utc::now());
    lead.rejection_reason = None;
    lead.meta.touch(caller.id());
    app.collection::<Lead>().update(lead).await?;
    activity::record_for(
        app,
        caller,
        &*lead,
        ActivityAction::Converted,
        format!("Approved and converted to opportunity {}", opportunity.id),
    )
    .await;
    Ok(())
}

pub async fn reject(app: &App, caller: &CurrentUser, id: &str, input: RejectLead) -> ApiResult<LeadView> {
    caller.require(Resource::Leads, Action::Approve)?;
    let reason = input.reason.trim().to_string();
    if reason.is_empty() {
        return Err(ApiError::invalid("reason", "a reason is required"));
    }
    let leads = app.collection::<Lead>();
    let mut lead = leads.require(id).await?;
    ensure_open(&lead)?;
    lead.status = LeadStatus::Rejected;
    lead.rejection_reason = Some(reason.clone());
    lead.meta.touch(caller.id());
    leads.update(&lead).await?;
    api_metrics().record_transition();
    info!(lead_id = %lead.id, "Lead rejected");
    activity::record_for(app, caller, &lead, ActivityAction::Rejected, format!("Rejected: {reason}")).await;
    Ok(view(app, lead).await)
}
