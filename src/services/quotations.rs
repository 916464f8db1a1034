use chrono::{NaiveDate, Utc};
use rand::distr::Alphanumeric;
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn, Instrument};

use super::activity;
use super::master_data::require_reference;
use super::pagination::newest_first;
use super::validation::{check_non_negative, check_percent, clean, require_text};
use super::{App, ListQuery, Page};
use crate::auth::{Action, CurrentUser, Resource};
use crate::error::{ApiError, ApiResult, ValidationErrors};
use crate::models::quotation::Totals;
use crate::models::{
    new_id, ActivityAction, AuditMeta, Company, MasterCategory, MasterData, Opportunity,
    Quotation, QuotationGroup, QuotationItem, QuotationPhase, QuotationStatus, User,
};
use crate::observability::api_metrics;
use crate::store::{Collection, Document, Filter, StoreError};
use crate::telemetry::create_workflow_span;
use crate::workflows::{QuotationEvent, QuotationWorkflow};

const NUMBER_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, Serialize)]
pub struct ItemView {
    #[serde(flatten)]
    pub item: QuotationItem,
    pub product_type_name: Option<String>,
    pub totals: Totals,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupView {
    #[serde(flatten)]
    pub group: QuotationGroup,
    pub items: Vec<ItemView>,
    pub totals: Totals,
}

#[derive(Debug, Clone, Serialize)]
pub struct PhaseView {
    #[serde(flatten)]
    pub phase: QuotationPhase,
    pub groups: Vec<GroupView>,
    pub totals: Totals,
}

/// A quotation with its whole phase/group/item tree
#[derive(Debug, Clone, Serialize)]
pub struct QuotationDetail {
    #[serde(flatten)]
    pub quotation: Quotation,
    pub company_name: Option<String>,
    pub opportunity_name: Option<String>,
    pub approved_by_name: Option<String>,
    pub phases: Vec<PhaseView>,
    pub item_count: usize,
    pub totals: Totals,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuotationSummary {
    #[serde(flatten)]
    pub quotation: Quotation,
    pub company_name: Option<String>,
    pub opportunity_name: Option<String>,
    pub item_count: usize,
    pub totals: Totals,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateQuotation {
    pub opportunity_id: String,
    pub title: String,
    pub currency: Option<String>,
    pub valid_until: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateQuotation {
    pub title: Option<String>,
    pub currency: Option<String>,
    pub valid_until: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuotationFilter {
    pub opportunity_id: Option<String>,
    pub company_id: Option<String>,
    pub status: Option<QuotationStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PhaseInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub sort_order: Option<i32>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroupInput {
    pub name: Option<String>,
    pub sort_order: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemInput {
    pub description: Option<String>,
    pub product_type_id: Option<String>,
    pub unit: Option<String>,
    pub quantity: Option<Decimal>,
    pub unit_price: Option<Decimal>,
    pub discount_percent: Option<Decimal>,
    pub tax_percent: Option<Decimal>,
    pub sort_order: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RejectQuotation {
    #[serde(default)]
    pub reason: String,
}

/// `QT-YYYYMMDD-XXXXXX`
pub fn generate_number() -> String {
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(char::from)
        .collect::<String>()
        .to_uppercase();
    format!("QT-{}-{}", Utc::now().format("%Y%m%d"), suffix)
}

fn ensure_editable(quotation: &Quotation) -> ApiResult<()> {
    if quotation.status.is_editable() {
        Ok(())
    } else {
        Err(ApiError::Conflict(format!(
            "quotation is {} and its content can only change while Draft",
            quotation.status.as_str()
        )))
    }
}

async fn children<T: Document>(app: &App, field: &str, parent_id: &str) -> ApiResult<Vec<T>> {
    Ok(app
        .collection::<T>()
        .find(&Filter::new().eq(field, parent_id))
        .await?)
}

async fn live_items(app: &App, quotation_id: &str) -> ApiResult<Vec<QuotationItem>> {
    children::<QuotationItem>(app, "quotation_id", quotation_id).await
}

/// Build the full tree with totals rolled up from the lines
pub async fn detail(app: &App, quotation: Quotation) -> ApiResult<QuotationDetail> {
    let mut phases = children::<QuotationPhase>(app, "quotation_id", &quotation.id).await?;
    let mut groups = children::<QuotationGroup>(app, "quotation_id", &quotation.id).await?;
    let mut items = live_items(app, &quotation.id).await?;
    phases.sort_by_key(|p| (p.sort_order, p.meta.created_at));
    groups.sort_by_key(|g| (g.sort_order, g.meta.created_at));
    items.sort_by_key(|i| (i.sort_order, i.meta.created_at));
    let item_count = items.len();

    let mut phase_views = Vec::with_capacity(phases.len());
    for phase in phases {
        let mut group_views = Vec::new();
        for group in groups.iter().filter(|g| g.phase_id == phase.id) {
            let mut item_views = Vec::new();
            for item in items.iter().filter(|i| i.group_id == group.id) {
                item_views.push(ItemView {
                    product_type_name: app
                        .enricher
                        .name::<MasterData>(item.product_type_id.as_deref())
                        .await,
                    totals: Totals::for_item(item),
                    item: item.clone(),
                });
            }
            group_views.push(GroupView {
                totals: Totals::sum(item_views.iter().map(|i| &i.totals)),
                group: group.clone(),
                items: item_views,
            });
        }
        phase_views.push(PhaseView {
            totals: Totals::sum(group_views.iter().map(|g| &g.totals)),
            phase,
            groups: group_views,
        });
    }

    let enricher = &app.enricher;
    Ok(QuotationDetail {
        company_name: enricher.name::<Company>(Some(&quotation.company_id)).await,
        opportunity_name: enricher.name::<Opportunity>(Some(&quotation.opportunity_id)).await,
        approved_by_name: enricher.name::<User>(quotation.approved_by.as_deref()).await,
        totals: Totals::sum(phase_views.iter().map(|p| &p.totals)),
        phases: phase_views,
        item_count,
        quotation,
    })
}

pub async fn summary(app: &App, quotation: Quotation) -> ApiResult<QuotationSummary> {
    let items = live_items(app, &quotation.id).await?;
    let lines: Vec<Totals> = items.iter().map(Totals::for_item).collect();
    let enricher = &app.enricher;
    Ok(QuotationSummary {
        company_name: enricher.name::<Company>(Some(&quotation.company_id)).await,
        opportunity_name: enricher.name::<Opportunity>(Some(&quotation.opportunity_id)).await,
        item_count: items.len(),
        totals: Totals::sum(lines.iter()),
        quotation,
    })
}

pub async fn list(
    app: &App,
    caller: &CurrentUser,
    filter: QuotationFilter,
    query: ListQuery,
) -> ApiResult<Page<QuotationSummary>> {
    caller.require(Resource::Quotations, Action::View)?;
    let filter = Filter::new()
        .eq_opt("opportunity_id", filter.opportunity_id)
        .eq_opt("company_id", filter.company_id)
        .eq_opt("status", filter.status.map(|s| s.as_str()))
        .search(&["title", "quotation_number"], query.search());
    let found = app.collection::<Quotation>().find(&filter).await?;
    let page = newest_first(found, &query);
    let mut items = Vec::with_capacity(page.items.len());
    for quotation in page.items {
        items.push(summary(app, quotation).await?);
    }
    Ok(Page {
        items,
        total: page.total,
        page: page.page,
        page_size: page.page_size,
    })
}

pub async fn get(app: &App, caller: &CurrentUser, id: &str) -> ApiResult<QuotationDetail> {
    caller.require(Resource::Quotations, Action::View)?;
    let quotation = app.collection::<Quotation>().require(id).await?;
    detail(app, quotation).await
}

pub async fn create(
    app: &App,
    caller: &CurrentUser,
    input: CreateQuotation,
) -> ApiResult<QuotationDetail> {
    caller.require(Resource::Quotations, Action::Create)?;
    let mut errors = ValidationErrors::new();
    require_text(&mut errors, "title", &input.title);
    require_text(&mut errors, "opportunity_id", &input.opportunity_id);
    errors.finish()?;

    let opportunity = app
        .collection::<Opportunity>()
        .require(&input.opportunity_id)
        .await?;
    if !opportunity.is_open() {
        return Err(ApiError::Conflict(format!(
            "opportunity is {}; quotations need an open opportunity",
            opportunity.status.as_str()
        )));
    }

    let quotations = app.collection::<Quotation>();
    let mut quotation = Quotation {
        id: new_id(),
        quotation_number: generate_number(),
        opportunity_id: opportunity.id.clone(),
        company_id: opportunity.company_id.clone(),
        title: input.title.trim().to_string(),
        currency: clean(input.currency)
            .map(|c| c.to_uppercase())
            .unwrap_or_else(|| "INR".to_string()),
        valid_until: input.valid_until,
        notes: clean(input.notes),
        status: QuotationStatus::Draft,
        version: 1,
        submitted_by: None,
        submitted_at: None,
        approved_by: None,
        approved_at: None,
        rejection_reason: None,
        meta: AuditMeta::created_by(caller.id()),
    };
    let mut attempt = 1;
    loop {
        match quotations.insert(&quotation).await {
            Ok(()) => break,
            Err(StoreError::UniqueViolation { .. }) if attempt < NUMBER_ATTEMPTS => {
                warn!(number = %quotation.quotation_number, "Quotation number collision, retrying");
                quotation.quotation_number = generate_number();
                attempt += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }

    info!(quotation_id = %quotation.id, number = %quotation.quotation_number, "Quotation created");
    activity::record_for(
        app,
        caller,
        &quotation,
        ActivityAction::Created,
        format!("Created quotation {}", quotation.quotation_number),
    )
    .await;
    detail(app, quotation).await
}

pub async fn update(
    app: &App,
    caller: &CurrentUser,
    id: &str,
    input: UpdateQuotation,
) -> ApiResult<QuotationDetail> {
    caller.require(Resource::Quotations, Action::Edit)?;
    let quotations = app.collection::<Quotation>();
    let mut quotation = quotations.require(id).await?;
    ensure_editable(&quotation)?;

    if let Some(title) = input.title {
        let mut errors = ValidationErrors::new();
        require_text(&mut errors, "title", &title);
        errors.finish()?;
        quotation.title = title.trim().to_string();
    }
    if let Some(currency) = clean(input.currency) {
        quotation.currency = currency.to_uppercase();
    }
    if input.valid_until.is_some() {
        quotation.valid_until = input.valid_until;
    }
    if input.notes.is_some() {
        quotation.notes = clean(input.notes);
    }
    quotation.meta.touch(caller.id());
    quotations.update(&quotation).await?;
    activity::record_for(app, caller, &quotation, ActivityAction::Updated, "Updated quotation header").await;
    detail(app, quotation).await
}

async fn soft_delete_all<T: Document>(app: &App, docs: Vec<T>, actor: &str) -> ApiResult<usize> {
    let collection: Collection<T> = app.collection();
    let count = docs.len();
    for doc in docs {
        collection.soft_delete(doc, actor).await?;
    }
    Ok(count)
}

pub async fn delete(app: &App, caller: &CurrentUser, id: &str) -> ApiResult<()> {
    caller.require(Resource::Quotations, Action::Delete)?;
    let quotations = app.collection::<Quotation>();
    let quotation = quotations.require(id).await?;
    if quotation.status == QuotationStatus::Approved {
        return Err(ApiError::Forbidden("approved quotations cannot be deleted".into()));
    }
    let items = live_items(app, &quotation.id).await?;
    let groups = children::<QuotationGroup>(app, "quotation_id", &quotation.id).await?;
    let phases = children::<QuotationPhase>(app, "quotation_id", &quotation.id).await?;
    soft_delete_all(app, items, caller.id()).await?;
    soft_delete_all(app, groups, caller.id()).await?;
    soft_delete_all(app, phases, caller.id()).await?;
    let quotation = quotations.soft_delete(quotation, caller.id()).await?;
    app.enricher.invalidate::<Quotation>(&quotation.id).await;
    activity::record_for(
        app,
        caller,
        &quotation,
        ActivityAction::Deleted,
        format!("Deleted quotation {}", quotation.quotation_number),
    )
    .await;
    Ok(())
}

/// Load a quotation for a content edit
async fn editable(app: &App, caller: &CurrentUser, quotation_id: &str) -> ApiResult<Quotation> {
    caller.require(Resource::Quotations, Action::Edit)?;
    let quotation = app.collection::<Quotation>().require(quotation_id).await?;
    ensure_editable(&quotation)?;
    Ok(quotation)
}

async fn touch_header(app: &App, caller: &CurrentUser, mut quotation: Quotation) -> ApiResult<Quotation> {
    quotation.meta.touch(caller.id());
    app.collection::<Quotation>().update(&quotation).await?;
    Ok(quotation)
}

async fn phase_of(app: &App, quotation: &Quotation, phase_id: &str) -> ApiResult<QuotationPhase> {
    let phase = app.collection::<QuotationPhase>().require(phase_id).await?;
    if phase.quotation_id != quotation.id {
        return Err(ApiError::not_found(QuotationPhase::ENTITY, phase_id));
    }
    Ok(phase)
}

async fn group_of(app: &App, quotation: &Quotation, group_id: &str) -> ApiResult<QuotationGroup> {
    let group = app.collection::<QuotationGroup>().require(group_id).await?;
    if group.quotation_id != quotation.id {
        return Err(ApiError::not_found(QuotationGroup::ENTITY, group_id));
    }
    Ok(group)
}

async fn item_of(app: &App, quotation: &Quotation, item_id: &str) -> ApiResult<QuotationItem> {
    let item = app.collection::<QuotationItem>().require(item_id).await?;
    if item.quotation_id != quotation.id {
        return Err(ApiError::not_found(QuotationItem::ENTITY, item_id));
    }
    Ok(item)
}

fn apply_phase(phase: &mut QuotationPhase, input: PhaseInput) -> ApiResult<()> {
    if let Some(name) = input.name {
        phase.name = name.trim().to_string();
    }
    if input.description.is_some() {
        phase.description = clean(input.description);
    }
    if let Some(sort_order) = input.sort_order {
        phase.sort_order = sort_order;
    }
    if input.start_date.is_some() {
        phase.start_date = input.start_date;
    }
    if input.end_date.is_some() {
        phase.end_date = input.end_date;
    }
    let mut errors = ValidationErrors::new();
    require_text(&mut errors, "name", &phase.name);
    if let (Some(start), Some(end)) = (phase.start_date, phase.end_date) {
        errors.check(start <= end, "end_date", "must not be before start_date");
    }
    errors.finish()
}

pub async fn add_phase(
    app: &App,
    caller: &CurrentUser,
    quotation_id: &str,
    input: PhaseInput,
) -> ApiResult<QuotationDetail> {
    let quotation = editable(app, caller, quotation_id).await?;
    let mut phase = QuotationPhase {
        id: new_id(),
        quotation_id: quotation.id.clone(),
        name: String::new(),
        description: None,
        sort_order: 0,
        start_date: None,
        end_date: None,
        meta: AuditMeta::created_by(caller.id()),
    };
    apply_phase(&mut phase, input)?;
    app.collection::<QuotationPhase>().insert(&phase).await?;
    let quotation = touch_header(app, caller, quotation).await?;
    activity::record_for(app, caller, &quotation, ActivityAction::Updated, format!("Added phase {}", phase.name)).await;
    detail(app, quotation).await
}

pub async fn update_phase(
    app: &App,
    caller: &CurrentUser,
    quotation_id: &str,
    phase_id: &str,
    input: PhaseInput,
) -> ApiResult<QuotationDetail> {
    let quotation = editable(app, caller, quotation_id).await?;
    let mut phase = phase_of(app, &quotation, phase_id).await?;
    apply_phase(&mut phase, input)?;
    phase.meta.touch(caller.id());
    app.collection::<QuotationPhase>().update(&phase).await?;
    let quotation = touch_header(app, caller, quotation).await?;
    detail(app, quotation).await
}

pub async fn delete_phase(
    app: &App,
    caller: &CurrentUser,
    quotation_id: &str,
    phase_id: &str,
) -> ApiResult<QuotationDetail> {
    let quotation = editable(app, caller, quotation_id).await?;
    let phase = phase_of(app, &quotation, phase_id).await?;
    let groups = children::<QuotationGroup>(app, "phase_id", &phase.id).await?;
    for group in &groups {
        let items = children::<QuotationItem>(app, "group_id", &group.id).await?;
        soft_delete_all(app, items, caller.id()).await?;
    }
    soft_delete_all(app, groups, caller.id()).await?;
    let phase = app
        .collection::<QuotationPhase>()
        .soft_delete(phase, caller.id())
        .await?;
    let quotation = touch_header(app, caller, quotation).await?;
    activity::record_for(app, caller, &quotation, ActivityAction::Updated, format!("Removed phase {}", phase.name)).await;
    detail(app, quotation).await
}

fn apply_group(group: &mut QuotationGroup, input: GroupInput) -> ApiResult<()> {
    if let Some(name) = input.name {
        group.name = name.trim().to_string();
    }
    if let Some(sort_order) = input.sort_order {
        group.sort_order = sort_order;
    }
    let mut errors = ValidationErrors::new();
    require_text(&mut errors, "name", &group.name);
    errors.finish()
}

pub async fn add_group(
    app: &App,
    caller: &CurrentUser,
    quotation_id: &str,
    phase_id: &str,
    input: GroupInput,
) -> ApiResult<QuotationDetail> {
    let quotation = editable(app, caller, quotation_id).await?;
    let phase = phase_of(app, &quotation, phase_id).await?;
    let mut group = QuotationGroup {
        id: new_id(),
        quotation_id: quotation.id.clone(),
        phase_id: phase.id,
        name: String::new(),
        sort_order: 0,
        meta: AuditMeta::created_by(caller.id()),
    };
    apply_group(&mut group, input)?;
    app.collection::<QuotationGroup>().insert(&group).await?;
    let quotation = touch_header(app, caller, quotation).await?;
    detail(app, quotation).await
}

pub async fn update_group(
    app: &App,
    caller: &CurrentUser,
    quotation_id: &str,
    group_id: &str,
    input: GroupInput,
) -> ApiResult<QuotationDetail> {
    let quotation = editable(app, caller, quotation_id).await?;
    let mut group = group_of(app, &quotation, group_id).await?;
    apply_group(&mut group, input)?;
    group.meta.touch(caller.id());
    app.collection::<QuotationGroup>().update(&group).await?;
    let quotation = touch_header(app, caller, quotation).await?;
    detail(app, quotation).await
}

pub async fn delete_group(
    app: &App,
    caller: &CurrentUser,
    quotation_id: &str,
    group_id: &str,
) -> ApiResult<QuotationDetail> {
    let quotation = editable(app, caller, quotation_id).await?;
    let group = group_of(app, &quotation, group_id).await?;
    let items = children::<QuotationItem>(app, "group_id", &group.id).await?;
    soft_delete_all(app, items, caller.id()).await?;
    app.collection::<QuotationGroup>()
        .soft_delete(group, caller.id())
        .await?;
    let quotation = touch_header(app, caller, quotation).await?;
    detail(app, quotation).await
}

async fn apply_item(app: &App, item: &mut QuotationItem, input: ItemInput) -> ApiResult<()> {
    if let Some(description) = input.description {
        item.description = description.trim().to_string();
    }
    if input.product_type_id.is_some() {
        item.product_type_id = clean(input.product_type_id);
    }
    if input.unit.is_some() {
        item.unit = clean(input.unit);
    }
    if let Some(quantity) = input.quantity {
        item.quantity = quantity;
    }
    if let Some(unit_price) = input.unit_price {
        item.unit_price = unit_price;
    }
    if let Some(discount) = input.discount_percent {
        item.discount_percent = discount;
    }
    if let Some(tax) = input.tax_percent {
        item.tax_percent = tax;
    }
    if let Some(sort_order) = input.sort_order {
        item.sort_order = sort_order;
    }

    let mut errors = ValidationErrors::new();
    require_text(&mut errors, "description", &item.description);
    errors.check(item.quantity > Decimal::ZERO, "quantity", "must be greater than 0");
    check_non_negative(&mut errors, "unit_price", item.unit_price);
    check_percent(&mut errors, "discount_percent", item.discount_percent);
    check_percent(&mut errors, "tax_percent", item.tax_percent);
    errors.finish()?;

    require_reference(
        app,
        "product_type_id",
        MasterCategory::ProductType,
        item.product_type_id.as_deref(),
    )
    .await
}

pub async fn add_item(
    app: &App,
    caller: &CurrentUser,
    quotation_id: &str,
    group_id: &str,
    input: ItemInput,
) -> ApiResult<QuotationDetail> {
    let quotation = editable(app, caller, quotation_id).await?;
    let group = group_of(app, &quotation, group_id).await?;
    let mut item = QuotationItem {
        id: new_id(),
        quotation_id: quotation.id.clone(),
        group_id: group.id,
        description: String::new(),
        product_type_id: None,
        unit: None,
        quantity: Decimal::ZERO,
        unit_price: Decimal::ZERO,
        discount_percent: Decimal::ZERO,
        tax_percent: Decimal::ZERO,
        sort_order: 0,
        meta: AuditMeta::created_by(caller.id()),
    };
    apply_item(app, &mut item, input).await?;
    app.collection::<QuotationItem>().insert(&item).await?;
    let quotation = touch_header(app, caller, quotation).await?;
    detail(app, quotation).await
}

pub async fn update_item(
    app: &App,
    caller: &CurrentUser,
    quotation_id: &str,
    item_id: &str,
    input: ItemInput,
) -> ApiResult<QuotationDetail> {
    let quotation = editable(app, caller, quotation_id).await?;
    let mut item = item_of(app, &quotation, item_id).await?;
    apply_item(app, &mut item, input).await?;
    item.meta.touch(caller.id());
    app.collection::<QuotationItem>().update(&item).await?;
    let quotation = touch_header(app, caller, quotation).await?;
    detail(app, quotation).await
}

pub async fn delete_item(
    app: &App,
    caller: &CurrentUser,
    quotation_id: &str,
    item_id: &str,
) -> ApiResult<QuotationDetail> {
    let quotation = editable(app, caller, quotation_id).await?;
    let item = item_of(app, &quotation, item_id).await?;
    app.collection::<QuotationItem>()
        .soft_delete(item, caller.id())
        .await?;
    let quotation = touch_header(app, caller, quotation).await?;
    detail(app, quotation).await
}

/// Run one status event through the workflow and persist the outcome
async fn transition(
    app: &App,
    caller: &CurrentUser,
    id: &str,
    event: QuotationEvent,
) -> ApiResult<QuotationDetail> {
    let span = create_workflow_span("quotation_status", id, caller.id());
    async move {
        let quotations = app.collection::<Quotation>();
        let mut quotation = quotations.require(id).await?;
        let from = quotation.status;
        let to = QuotationWorkflow::transition(&quotation.id, from, &event)?;

        let now = Utc::now();
        match &event {
            QuotationEvent::Submit { by, .. } => {
                quotation.submitted_by = Some(by.clone());
                quotation.submitted_at = Some(now);
            }
            QuotationEvent::Approve { by } => {
                quotation.approved_by = Some(by.clone());
                quotation.approved_at = Some(now);
            }
            QuotationEvent::Reject { reason, .. } => {
                quotation.rejection_reason = Some(reason.trim().to_string());
            }
            QuotationEvent::Revise { .. } => {
                quotation.version += 1;
                quotation.submitted_by = None;
                quotation.submitted_at = None;
                quotation.rejection_reason = None;
            }
        }
        quotation.status = to;
        quotation.meta.touch(caller.id());
        quotations.update(&quotation).await?;

        api_metrics().record_transition();
        info!(from = from.as_str(), to = to.as_str(), "Quotation status changed");
        let action = match event {
            QuotationEvent::Approve { .. } => ActivityAction::Approved,
            QuotationEvent::Reject { .. } => ActivityAction::Rejected,
            _ => ActivityAction::StatusChanged,
        };
        activity::record_for(
            app,
            caller,
            &quotation,
            action,
            format!("Status {} -> {}", from.as_str(), to.as_str()),
        )
        .await;
        detail(app, quotation).await
    }
    .instrument(span)
    .await
}

pub async fn submit(app: &App, caller: &CurrentUser, id: &str) -> ApiResult<QuotationDetail> {
    caller.require(Resource::Quotations, Action::Edit)?;
    let item_count = live_items(app, id).await?.len();
    let event = QuotationEvent::Submit {
        by: caller.id().to_string(),
        item_count,
    };
    transition(app, caller, id, event).await
}

pub async fn approve(app: &App, caller: &CurrentUser, id: &str) -> ApiResult<QuotationDetail> {
    caller.require(Resource::Quotations, Action::Approve)?;
    let event = QuotationEvent::Approve {
        by: caller.id().to_string(),
    };
    transition(app, caller, id, event).await
}

pub async fn reject(
    app: &App,
    caller: &CurrentUser,
    id: &str,
    input: RejectQuotation,
) -> ApiResult<QuotationDetail> {
    caller.require(Resource::Quotations, Action::Approve)?;
    let event = QuotationEvent::Reject {
        by: caller.id().to_string(),
        reason: input.reason,
    };
    transition(app, caller, id, event).await
}

pub async fn revise(app: &App, caller: &CurrentUser, id: &str) -> ApiResult<QuotationDetail> {
    caller.require(Resource::Quotations, Action::Edit)?;
    let event = QuotationEvent::Revise {
        by: caller.id().to_string(),
    };
    transition(app, caller, id, event).await
}
