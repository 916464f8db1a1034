use serde::{Deserialize, Serialize};

use super::activity;
use super::master_data::require_reference;
use super::pagination::newest_first;
use super::validation::{
    check_email, check_phone, check_tax_ids, clean, clean_lower, clean_upper, require_text,
};
use super::{App, ListQuery, Page};
use crate::auth::{Action, CurrentUser, Resource};
use crate::error::{ApiError, ApiResult, ValidationErrors};
use crate::models::{
    new_id, ActivityAction, Address, AuditMeta, Company, Lead, MasterCategory, MasterData,
    Opportunity,
};
use crate::store::Filter;

#[derive(Debug, Clone, Serialize)]
pub struct CompanyView {
    #[serde(flatten)]
    pub company: Company,
    pub industry_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompanyInput {
    pub name: Option<String>,
    pub industry_id: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub gst_number: Option<String>,
    pub pan_number: Option<String>,
    pub address: Option<Address>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompanyFilter {
    pub industry_id: Option<String>,
}

pub async fn view(app: &App, company: Company) -> CompanyView {
    let industry_name = app
        .enricher
        .name::<MasterData>(company.industry_id.as_deref())
        .await;
    CompanyView {
        company,
        industry_name,
    }
}

/// Apply `input` over `company` and validate the result
async fn apply(app: &App, company: &mut Company, input: CompanyInput) -> ApiResult<()> {
    if let Some(name) = input.name {
        company.name = name.trim().to_string();
    }
    if input.industry_id.is_some() {
        company.industry_id = clean(input.industry_id);
    }
    if input.email.is_some() {
        company.email = clean_lower(input.email);
    }
    if input.phone.is_some() {
        company.phone = clean(input.phone);
    }
    if input.website.is_some() {
        company.website = clean(input.website);
    }
    if input.gst_number.is_some() {
        company.gst_number = clean_upper(input.gst_number);
    }
    if input.pan_number.is_some() {
        company.pan_number = clean_upper(input.pan_number);
    }
    if let Some(address) = input.address {
        company.address = address;
    }

    let mut errors = ValidationErrors::new();
    require_text(&mut errors, "name", &company.name);
    check_email(&mut errors, "email", company.email.as_deref());
    check_phone(&mut errors, "phone", company.phone.as_deref());
    check_tax_ids(
        &mut errors,
        company.gst_number.as_deref(),
        company.pan_number.as_deref(),
    );
    errors.finish()?;

    require_reference(
        app,
        "industry_id",
        MasterCategory::Industry,
        company.industry_id.as_deref(),
    )
    .await
}

pub async fn list(
    app: &App,
    caller: &CurrentUser,
    filter: CompanyFilter,
    query: ListQuery,
) -> ApiResult<Page<CompanyView>> {
    caller.require(Resource::Companies, Action::View)?;
    let filter = Filter::new()
        .eq_opt("industry_id", filter.industry_id)
        .search(&["name", "email", "gst_number", "pan_number"], query.search());
    let companies = app.collection::<Company>().find(&filter).await?;
    Ok(newest_first(companies, &query)
        .map_async(|company| view(app, company))
        .await)
}

pub async fn get(app: &App, caller: &CurrentUser, id: &str) -> ApiResult<CompanyView> {
    caller.require(Resource::Companies, Action::View)?;
    let company = app.collection::<Company>().require(id).await?;
    Ok(view(app, company).await)
}

pub async fn create(app: &App, caller: &CurrentUser, input: CompanyInput) -> ApiResult<CompanyView> {
    caller.require(Resource::Companies, Action::Create)?;
    let mut company = Company {
        id: new_id(),
        name: String::new(),
        industry_id: None,
        email: None,
        phone: None,
        website: None,
        gst_number: None,
        pan_number: None,
        address: Address::default(),
        meta: AuditMeta::created_by(caller.id()),
    };
    apply(app, &mut company, input).await?;
    app.collection::<Company>().insert(&company).await?;
    activity::record_for(app, caller, &company, ActivityAction::Created, format!("Created company {}", company.name)).await;
    Ok(view(app, company).await)
}

pub async fn update(
    app: &App,
    caller: &CurrentUser,
    id: &str,
    input: CompanyInput,
) -> ApiResult<CompanyView> {
    caller.require(Resource::Companies, Action::Edit)?;
    let companies = app.collection::<Company>();
    let mut company = companies.require(id).await?;
    apply(app, &mut company, input).await?;
    company.meta.touch(caller.id());
    companies.update(&company).await?;
    app.enricher.invalidate::<Company>(&company.id).await;
    activity::record_for(app, caller, &company, ActivityAction::Updated, format!("Updated company {}", company.name)).await;
    Ok(view(app, company).await)
}

pub async fn delete(app: &App, caller: &CurrentUser, id: &str) -> ApiResult<()> {
    caller.require(Resource::Companies, Action::Delete)?;
    let companies = app.collection::<Company>();
    let company = companies.require(id).await?;

    let by_company = Filter::new().eq("company_id", company.id.as_str());
    let leads = app.collection::<Lead>().find(&by_company).await?.len();
    let opportunities = app.collection::<Opportunity>().find(&by_company).await?.len();
    if leads + opportunities > 0 {
        return Err(ApiError::Conflict(format!(
            "company is referenced by {leads} lead(s) and {opportunities} opportunity(ies)"
        )));
    }

    let company = companies.soft_delete(company, caller.id()).await?;
    app.enricher.invalidate::<Company>(&company.id).await;
    activity::record_for(app, caller, &company, ActivityAction::Deleted, format!("Deleted company {}", company.name)).await;
    Ok(())
}
