use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::activity;
use super::quotations;
use super::App;
use crate::auth::{Action, CurrentUser, Resource};
use crate::error::ApiResult;
use crate::models::{new_id, ActivityAction, Company, Lead, Opportunity, Partner, Quotation};
use crate::store::{Document, Filter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Pdf,
    Excel,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Pdf => "pdf",
            ExportFormat::Excel => "xlsx",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportResource {
    Leads,
    Opportunities,
    Quotations,
    Companies,
    Partners,
}

impl ExportResource {
    fn collection(&self) -> &'static str {
        match self {
            ExportResource::Leads => Lead::COLLECTION,
            ExportResource::Opportunities => Opportunity::COLLECTION,
            ExportResource::Quotations => Quotation::COLLECTION,
            ExportResource::Companies => Company::COLLECTION,
            ExportResource::Partners => Partner::COLLECTION,
        }
    }

    fn permission(&self) -> Resource {
        match self {
            ExportResource::Leads => Resource::Leads,
            ExportResource::Opportunities => Resource::Opportunities,
            ExportResource::Quotations => Resource::Quotations,
            ExportResource::Companies => Resource::Companies,
            ExportResource::Partners => Resource::Partners,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExportRequest {
    pub resource: ExportResource,
    pub format: ExportFormat,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExportQuery {
    pub format: Option<ExportFormat>,
}

/// Describes an export; no document bytes are produced
#[derive(Debug, Clone, Serialize)]
pub struct ExportMetadata {
    pub export_id: String,
    pub resource: ExportResource,
    pub format: ExportFormat,
    pub file_name: String,
    pub row_count: usize,
    pub generated_at: DateTime<Utc>,
    pub generated_by: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuotationExport {
    pub export_id: String,
    pub quotation_id: String,
    pub quotation_number: String,
    pub version: u32,
    pub format: ExportFormat,
    pub file_name: String,
    pub line_count: usize,
    pub currency: String,
    pub grand_total: Decimal,
    pub generated_at: DateTime<Utc>,
    pub generated_by: String,
}

pub async fn export(app: &App, caller: &CurrentUser, request: ExportRequest) -> ApiResult<ExportMetadata> {
    caller.require(Resource::Exports, Action::Export)?;
    caller.require(request.resource.permission(), Action::View)?;

    let collection = request.resource.collection();
    let row_count = app.store.find(collection, &Filter::new()).await?.len();
    let generated_at = Utc::now();
    let metadata = ExportMetadata {
        export_id: new_id(),
        resource: request.resource,
        format: request.format,
        file_name: format!(
            "{collection}-{}.{}",
            generated_at.format("%Y%m%d-%H%M%S"),
            request.format.extension()
        ),
        row_count,
        generated_at,
        generated_by: caller.id().to_string(),
    };
    info!(resource = collection, rows = row_count, file = %metadata.file_name, "Export generated");
    activity::record(
        app,
        caller.id(),
        collection,
        &metadata.export_id,
        ActivityAction::Exported,
        format!("Exported {row_count} {collection} as {}", request.format.extension()),
    )
    .await;
    Ok(metadata)
}

pub async fn export_quotation(
    app: &App,
    caller: &CurrentUser,
    id: &str,
    query: ExportQuery,
) -> ApiResult<QuotationExport> {
    caller.require(Resource::Quotations, Action::Export)?;
    let quotation = app.collection::<Quotation>().require(id).await?;
    let format = query.format.unwrap_or(ExportFormat::Pdf);
    let detail = quotations::detail(app, quotation).await?;
    let quotation = &detail.quotation;

    let export = QuotationExport {
        export_id: new_id(),
        quotation_id: quotation.id.clone(),
        quotation_number: quotation.quotation_number.clone(),
        version: quotation.version,
        format,
        file_name: format!(
            "{}-v{}.{}",
            quotation.quotation_number,
            quotation.version,
            format.extension()
        ),
        line_count: detail.item_count,
        currency: quotation.currency.clone(),
        grand_total: detail.totals.total,
        generated_at: Utc::now(),
        generated_by: caller.id().to_string(),
    };
    activity::record_for(
        app,
        caller,
        quotation,
        ActivityAction::Exported,
        format!("Exported {} as {}", export.file_name, format.extension()),
    )
    .await;
    Ok(export)
}
