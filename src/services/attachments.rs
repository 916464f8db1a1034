use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use std::path::{Component, Path, PathBuf};
use tracing::info;

use super::activity;
use super::pagination::newest_first;
use super::validation::require_text;
use super::{App, ListQuery, Page};
use crate::auth::{Action, CurrentUser, Resource};
use crate::error::{ApiError, ApiResult, ValidationErrors};
use crate::models::{
    new_id, ActivityAction, Attachment, AuditMeta, Company, Lead, Opportunity, Partner, Quotation,
    ServiceDelivery, User,
};
use crate::store::{Document, Filter};

/// File payload carried as base64 inside JSON
#[derive(Debug, Clone, Deserialize)]
pub struct UploadRequest {
    pub file_name: String,
    pub content_type: String,
    pub content_base64: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AttachmentRequest {
    pub entity_type: String,
    pub entity_id: String,
    #[serde(flatten)]
    pub upload: UploadRequest,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AttachmentFilter {
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
}

/// Entity types that accept attachments
pub const ATTACHABLE: [&str; 7] = [
    User::COLLECTION,
    Company::COLLECTION,
    Partner::COLLECTION,
    Lead::COLLECTION,
    Opportunity::COLLECTION,
    Quotation::COLLECTION,
    ServiceDelivery::COLLECTION,
];

async fn target_exists(app: &App, entity_type: &str, entity_id: &str) -> ApiResult<bool> {
    let exists = if entity_type == User::COLLECTION {
        app.collection::<User>().exists(entity_id).await?
    } else if entity_type == Company::COLLECTION {
        app.collection::<Company>().exists(entity_id).await?
    } else if entity_type == Partner::COLLECTION {
        app.collection::<Partner>().exists(entity_id).await?
    } else if entity_type == Lead::COLLECTION {
        app.collection::<Lead>().exists(entity_id).await?
    } else if entity_type == Opportunity::COLLECTION {
        app.collection::<Opportunity>().exists(entity_id).await?
    } else if entity_type == Quotation::COLLECTION {
        app.collection::<Quotation>().exists(entity_id).await?
    } else if entity_type == ServiceDelivery::COLLECTION {
        app.collection::<ServiceDelivery>().exists(entity_id).await?
    } else {
        false
    };
    Ok(exists)
}

/// Keep only the final path component of a client supplied name
fn safe_file_name(name: &str) -> Option<String> {
    let name = name.trim();
    match Path::new(name).components().last() {
        Some(Component::Normal(part)) => part.to_str().map(str::to_string),
        _ => None,
    }
}

fn resolve(app: &App, storage_path: &str) -> PathBuf {
    app.upload_dir().join(storage_path)
}

/// Validate, decode and write an upload, then record its metadata.
/// The caller is responsible for permission checks.
pub async fn store_upload(
    app: &App,
    caller: &CurrentUser,
    entity_type: &str,
    entity_id: &str,
    upload: UploadRequest,
) -> ApiResult<Attachment> {
    let uploads = &app.config.uploads;
    let content_type = upload.content_type.trim().to_lowercase();
    let file_name = safe_file_name(&upload.file_name);

    let mut errors = ValidationErrors::new();
    require_text(&mut errors, "file_name", &upload.file_name);
    errors.check(
        file_name.is_some() || upload.file_name.trim().is_empty(),
        "file_name",
        "is not a valid file name",
    );
    errors.check(
        uploads.allowed_content_types.iter().any(|t| *t == content_type),
        "content_type",
        format!("{content_type} is not an allowed upload type"),
    );
    let bytes = match STANDARD.decode(upload.content_base64.trim()) {
        Ok(bytes) => bytes,
        Err(e) => {
            errors.add("content_base64", format!("is not valid base64: {e}"));
            Vec::new()
        }
    };
    errors.finish()?;
    if bytes.is_empty() {
        return Err(ApiError::invalid("content_base64", "file is empty"));
    }
    if bytes.len() > uploads.max_upload_bytes {
        return Err(ApiError::BadRequest(format!(
            "file is {} bytes; the limit is {} bytes",
            bytes.len(),
            uploads.max_upload_bytes
        )));
    }
    if !target_exists(app, entity_type, entity_id).await? {
        return Err(ApiError::not_found(entity_type, entity_id));
    }

    let id = new_id();
    let storage_path = format!("{entity_type}/{id}");
    let path = resolve(app, &storage_path);
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| anyhow::anyhow!("failed to create upload directory: {e}"))?;
    }
    tokio::fs::write(&path, &bytes)
        .await
        .map_err(|e| anyhow::anyhow!("failed to write upload {}: {e}", path.display()))?;

    let attachment = Attachment {
        id,
        entity_type: entity_type.to_string(),
        entity_id: entity_id.to_string(),
        file_name: file_name.unwrap_or_default(),
        content_type,
        size_bytes: bytes.len() as u64,
        storage_path,
        meta: AuditMeta::created_by(caller.id()),
    };
    app.collection::<Attachment>().insert(&attachment).await?;
    info!(
        attachment_id = %attachment.id,
        entity_type = %entity_type,
        size_bytes = attachment.size_bytes,
        "Attachment stored"
    );
    activity::record(
        app,
        caller.id(),
        entity_type,
        entity_id,
        ActivityAction::Uploaded,
        format!("Uploaded {}", attachment.file_name),
    )
    .await;
    Ok(attachment)
}

pub async fn upload(app: &App, caller: &CurrentUser, request: AttachmentRequest) -> ApiResult<Attachment> {
    caller.require(Resource::Attachments, Action::Create)?;
    let entity_type = request.entity_type.trim();
    if !ATTACHABLE.contains(&entity_type) {
        return Err(ApiError::invalid(
            "entity_type",
            format!("must be one of {}", ATTACHABLE.join(", ")),
        ));
    }
    store_upload(app, caller, entity_type, request.entity_id.trim(), request.upload).await
}

pub async fn list(
    app: &App,
    caller: &CurrentUser,
    filter: AttachmentFilter,
    query: ListQuery,
) -> ApiResult<Page<Attachment>> {
    caller.require(Resource::Attachments, Action::View)?;
    let filter = Filter::new()
        .eq_opt("entity_type", filter.entity_type)
        .eq_opt("entity_id", filter.entity_id)
        .search(&["file_name"], query.search());
    let found = app.collection::<Attachment>().find(&filter).await?;
    Ok(newest_first(found, &query))
}

pub async fn get(app: &App, caller: &CurrentUser, id: &str) -> ApiResult<Attachment> {
    caller.require(Resource::Attachments, Action::View)?;
    Ok(app.collection::<Attachment>().require(id).await?)
}

/// Metadata plus the stored bytes
pub async fn content(app: &App, caller: &CurrentUser, id: &str) -> ApiResult<(Attachment, Vec<u8>)> {
    let attachment = get(app, caller, id).await?;
    let path = resolve(app, &attachment.storage_path);
    match tokio::fs::read(&path).await {
        Ok(bytes) => Ok((attachment, bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ApiError::not_found("Attachment content", id))
        }
        Err(e) => Err(anyhow::anyhow!("failed to read {}: {e}", path.display()).into()),
    }
}

/// Soft delete; the stored bytes are kept with the metadata
pub async fn delete(app: &App, caller: &CurrentUser, id: &str) -> ApiResult<()> {
    caller.require(Resource::Attachments, Action::Delete)?;
    let attachments = app.collection::<Attachment>();
    let attachment = attachments.require(id).await?;
    let attachment = attachments.soft_delete(attachment, caller.id()).await?;
    activity::record(
        app,
        caller.id(),
        &attachment.entity_type,
        &attachment.entity_id,
        ActivityAction::Deleted,
        format!("Removed attachment {}", attachment.file_name),
    )
    .await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_are_reduced_to_their_last_component() {
        assert_eq!(safe_file_name("report.pdf").as_deref(), Some("report.pdf"));
        assert_eq!(safe_file_name("../../etc/passwd").as_deref(), Some("passwd"));
        assert_eq!(safe_file_name("dir/photo.png").as_deref(), Some("photo.png"));
        assert_eq!(safe_file_name(".."), None);
        assert_eq!(safe_file_name(""), None);
    }
}
