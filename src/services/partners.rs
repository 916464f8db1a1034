use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::activity;
use super::master_data::require_reference;
use super::pagination::newest_first;
use super::validation::{
    check_email, check_percent, check_phone, check_tax_ids, clean, clean_lower, clean_upper,
    require_text,
};
use super::{App, ListQuery, Page};
use crate::auth::{Action, CurrentUser, Resource};
use crate::error::{ApiResult, ValidationErrors};
use crate::models::{new_id, ActivityAction, AuditMeta, MasterCategory, MasterData, Partner};
use crate::store::Filter;

#[derive(Debug, Clone, Serialize)]
pub struct PartnerView {
    #[serde(flatten)]
    pub partner: Partner,
    pub partner_type_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PartnerInput {
    pub name: Option<String>,
    pub partner_type_id: Option<String>,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub gst_number: Option<String>,
    pub pan_number: Option<String>,
    pub commission_percent: Option<Decimal>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PartnerFilter {
    pub partner_type_id: Option<String>,
    pub is_active: Option<bool>,
}

pub async fn view(app: &App, partner: Partner) -> PartnerView {
    let partner_type_name = app
        .enricher
        .name::<MasterData>(partner.partner_type_id.as_deref())
        .await;
    PartnerView {
        partner,
        partner_type_name,
    }
}

async fn apply(app: &App, partner: &mut Partner, input: PartnerInput) -> ApiResult<()> {
    if let Some(name) = input.name {
        partner.name = name.trim().to_string();
    }
    if input.partner_type_id.is_some() {
        partner.partner_type_id = clean(input.partner_type_id);
    }
    if input.contact_name.is_some() {
        partner.contact_name = clean(input.contact_name);
    }
    if input.email.is_some() {
        partner.email = clean_lower(input.email).unwrap_or_default();
    }
    if input.phone.is_some() {
        partner.phone = clean(input.phone);
    }
    if input.gst_number.is_some() {
        partner.gst_number = clean_upper(input.gst_number);
    }
    if input.pan_number.is_some() {
        partner.pan_number = clean_upper(input.pan_number);
    }
    if let Some(commission) = input.commission_percent {
        partner.commission_percent = commission;
    }
    if let Some(is_active) = input.is_active {
        partner.is_active = is_active;
    }

    let mut errors = ValidationErrors::new();
    require_text(&mut errors, "name", &partner.name);
    require_text(&mut errors, "email", &partner.email);
    check_email(
        &mut errors,
        "email",
        Some(partner.email.as_str()).filter(|e| !e.is_empty()),
    );
    check_phone(&mut errors, "phone", partner.phone.as_deref());
    check_tax_ids(
        &mut errors,
        partner.gst_number.as_deref(),
        partner.pan_number.as_deref(),
    );
    check_percent(&mut errors, "commission_percent", partner.commission_percent);
    errors.finish()?;

    require_reference(
        app,
        "partner_type_id",
        MasterCategory::PartnerType,
        partner.partner_type_id.as_deref(),
    )
    .await
}

pub async fn list(
    app: &App,
    caller: &CurrentUser,
    filter: PartnerFilter,
    query: ListQuery,
) -> ApiResult<Page<PartnerView>> {
    caller.require(Resource::Partners, Action::View)?;
    let filter = Filter::new()
        .eq_opt("partner_type_id", filter.partner_type_id)
        .eq_opt("is_active", filter.is_active)
        .search(&["name", "email", "contact_name"], query.search());
    let partners = app.collection::<Partner>().find(&filter).await?;
    Ok(newest_first(partners, &query)
        .map_async(|partner| view(app, partner))
        .await)
}

pub async fn get(app: &App, caller: &CurrentUser, id: &str) -> ApiResult<PartnerView> {
    caller.require(Resource::Partners, Action::View)?;
    let partner = app.collection::<Partner>().require(id).await?;
    Ok(view(app, partner).await)
}

pub async fn create(app: &App, caller: &CurrentUser, input: PartnerInput) -> ApiResult<PartnerView> {
    caller.require(Resource::Partners, Action::Create)?;
    let mut partner = Partner {
        id: new_id(),
        name: String::new(),
        partner_type_id: None,
        contact_name: None,
        email: String::new(),
        phone: None,
        gst_number: None,
        pan_number: None,
        commission_percent: Decimal::ZERO,
        is_active: true,
        meta: AuditMeta::created_by(caller.id()),
    };
    apply(app, &mut partner, input).await?;
    app.collection::<Partner>().insert(&partner).await?;
    activity::record_for(app, caller, &partner, ActivityAction::Created, format!("Created partner {}", partner.name)).await;
    Ok(view(app, partner).await)
}

pub async fn update(
    app: &App,
    caller: &CurrentUser,
    id: &str,
    input: PartnerInput,
) -> ApiResult<PartnerView> {
    caller.require(Resource::Partners, Action::Edit)?;
    let partners = app.collection::<Partner>();
    let mut partner = partners.require(id).await?;
    apply(app, &mut partner, input).await?;
    partner.meta.touch(caller.id());
    partners.update(&partner).await?;
    app.enricher.invalidate::<Partner>(&partner.id).await;
    activity::record_for(app, caller, &partner, ActivityAction::Updated, format!("Updated partner {}", partner.name)).await;
    Ok(view(app, partner).await)
}

pub async fn delete(app: &App, caller: &CurrentUser, id: &str) -> ApiResult<()> {
    caller.require(Resource::Partners, Action::Delete)?;
    let partners = app.collection::<Partner>();
    let partner = partners.require(id).await?;
    let partner = partners.soft_delete(partner, caller.id()).await?;
    app.enricher.invalidate::<Partner>(&partner.id).await;
    activity::record_for(app, caller, &partner, ActivityAction::Deleted, format!("Deleted partner {}", partner.name)).await;
    Ok(())
}
