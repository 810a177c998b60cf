use std::collections::HashMap;

use bytes::Bytes;
use futures::future::join_all;
use time::OffsetDateTime;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::dto::StorageStats;
use super::repo::{FileRecord, NewFileRecord};
use crate::auth::extractors::AuthUser;
use crate::error::{AppError, Result};
use crate::response::{PageMeta, PaginationQuery};
use crate::state::AppState;
use crate::storage::{FetchedObject, ObjectMeta};

/// One inbound file, already read out of the request body.
#[derive(Debug, Clone)]
pub struct UploadItem {
    pub original_name: String,
    pub content_type: String,
    pub body: Bytes,
}

/// Size and type limits are checked before anything touches the store.
fn validate_upload(item: &UploadItem, max_bytes: usize, allowed_types: &[String]) -> Result<()> {
    if item.body.is_empty() {
        return Err(AppError::Domain(format!(
            "File '{}' is empty",
            item.original_name
        )));
    }
    if item.body.len() > max_bytes {
        return Err(AppError::Domain(format!(
            "File '{}' exceeds the maximum size of {} bytes",
            item.original_name, max_bytes
        )));
    }
    if !allowed_types.iter().any(|t| t == &item.content_type) {
        return Err(AppError::Domain(format!(
            "File type '{}' is not allowed",
            item.content_type
        )));
    }
    Ok(())
}

fn ext_from_mime(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "application/pdf" => Some("pdf"),
        _ => None,
    }
}

/// Owner-scoped path plus timestamp and random suffix, keeping the original
/// extension when there is one.
fn derive_key(owner_id: i64, file_id: Uuid, original_name: &str, content_type: &str) -> String {
    let ext = original_name
        .rsplit_once('.')
        .map(|(_, e)| e)
        .filter(|e| !e.is_empty() && e.len() <= 10)
        .or_else(|| ext_from_mime(content_type))
        .unwrap_or("bin");
    let ts = OffsetDateTime::now_utc().unix_timestamp();
    format!("uploads/{owner_id}/{ts}-{file_id}.{ext}")
}

fn object_meta(item: &UploadItem, owner_id: i64) -> ObjectMeta {
    let mut custom = HashMap::new();
    custom.insert("original-name".to_string(), item.original_name.clone());
    custom.insert("uploaded-by".to_string(), owner_id.to_string());
    custom.insert(
        "uploaded-at".to_string(),
        OffsetDateTime::now_utc().unix_timestamp().to_string(),
    );
    ObjectMeta {
        content_type: item.content_type.clone(),
        content_disposition: format!("inline; filename=\"{}\"", item.original_name),
        custom,
    }
}

fn access_url(state: &AppState, key: &str) -> String {
    format!(
        "{}/api/v1/files/view/{}",
        state.config.storage.public_base_url, key
    )
}

fn ensure_owner_or_admin(caller: &AuthUser, record: &FileRecord) -> Result<()> {
    if caller.is_admin() || record.owner_id == caller.id {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "You do not have access to this file".to_string(),
        ))
    }
}

pub async fn upload(state: &AppState, owner_id: i64, item: UploadItem) -> Result<FileRecord> {
    let upload_cfg = &state.config.upload;
    validate_upload(&item, upload_cfg.max_bytes, &upload_cfg.allowed_types)?;

    let file_id = Uuid::new_v4();
    let key = derive_key(owner_id, file_id, &item.original_name, &item.content_type);
    let meta = object_meta(&item, owner_id);
    let size = item.body.len() as i64;

    state.storage.put_object(&key, item.body, &meta).await?;

    let url = access_url(state, &key);
    let record = FileRecord::create(
        &state.db,
        &NewFileRecord {
            id: file_id,
            original_name: &item.original_name,
            storage_key: &key,
            size_bytes: size,
            content_type: &item.content_type,
            owner_id,
            url: &url,
        },
    )
    .await?;

    info!(file_id = %file_id, owner_id, size, "file uploaded");
    Ok(record)
}

/// All-or-nothing batch: every file is validated up front, the puts run
/// concurrently, and objects that landed before a failure are removed again.
pub async fn upload_many(
    state: &AppState,
    owner_id: i64,
    items: Vec<UploadItem>,
) -> Result<Vec<FileRecord>> {
    let upload_cfg = &state.config.upload;
    for item in &items {
        validate_upload(item, upload_cfg.max_bytes, &upload_cfg.allowed_types)?;
    }

    struct Prepared {
        item: UploadItem,
        file_id: Uuid,
        key: String,
        meta: ObjectMeta,
    }

    let prepared: Vec<Prepared> = items
        .into_iter()
        .map(|item| {
            let file_id = Uuid::new_v4();
            let key = derive_key(owner_id, file_id, &item.original_name, &item.content_type);
            let meta = object_meta(&item, owner_id);
            Prepared {
                item,
                file_id,
                key,
                meta,
            }
        })
        .collect();

    let puts = prepared.iter().map(|p| {
        let storage = state.storage.clone();
        let key = p.key.clone();
        let body = p.item.body.clone();
        let meta = p.meta.clone();
        async move { storage.put_object(&key, body, &meta).await }
    });
    let results = join_all(puts).await;

    let mut first_err: Option<anyhow::Error> = None;
    let mut landed: Vec<&str> = Vec::new();
    for (p, result) in prepared.iter().zip(results) {
        match result {
            Ok(()) => landed.push(&p.key),
            Err(e) => {
                if first_err.is_none() {
                    first_err = Some(e);
                }
            }
        }
    }
    if let Some(first) = first_err {
        // Best-effort cleanup of the objects that did land.
        for key in landed {
            if let Err(e) = state.storage.delete_object(key).await {
                warn!(key, error = %e, "failed to roll back uploaded object");
            }
        }
        error!(error = %first, owner_id, "batch upload failed");
        return Err(first.into());
    }

    let mut tx = state.db.begin().await?;
    let mut records = Vec::with_capacity(prepared.len());
    for p in &prepared {
        let url = access_url(state, &p.key);
        let record = FileRecord::create_tx(
            &mut tx,
            &NewFileRecord {
                id: p.file_id,
                original_name: &p.item.original_name,
                storage_key: &p.key,
                size_bytes: p.item.body.len() as i64,
                content_type: &p.item.content_type,
                owner_id,
                url: &url,
            },
        )
        .await?;
        records.push(record);
    }
    tx.commit().await?;

    info!(count = records.len(), owner_id, "batch upload complete");
    Ok(records)
}

/// Raw read-by-key passthrough; `None` when the store has no such object.
pub async fn fetch(state: &AppState, key: &str) -> Result<Option<FetchedObject>> {
    Ok(state.storage.get_object(key).await?)
}

pub async fn get_record(state: &AppState, id: Uuid) -> Result<FileRecord> {
    FileRecord::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("File {id} not found")))
}

pub async fn info(state: &AppState, id: Uuid, caller: &AuthUser) -> Result<FileRecord> {
    let record = get_record(state, id).await?;
    ensure_owner_or_admin(caller, &record)?;
    Ok(record)
}

/// Object first, then the row. A failure in between surfaces as an error and
/// leaves the row behind; there is no compensating rollback here.
pub async fn delete(state: &AppState, id: Uuid, caller: &AuthUser) -> Result<()> {
    let record = get_record(state, id).await?;
    ensure_owner_or_admin(caller, &record)?;

    state.storage.delete_object(&record.storage_key).await?;
    FileRecord::delete(&state.db, id).await?;

    info!(file_id = %id, "file deleted");
    Ok(())
}

pub async fn list(
    state: &AppState,
    owner_id: i64,
    page: &PaginationQuery,
) -> Result<(Vec<FileRecord>, PageMeta)> {
    let total = FileRecord::count_by_owner(&state.db, owner_id).await?;
    let rows = FileRecord::list_by_owner(&state.db, owner_id, page.limit(), page.offset()).await?;
    let meta = PageMeta::new(page.page(), page.limit(), total);
    Ok((rows, meta))
}

pub async fn stats(state: &AppState, owner_id: Option<i64>) -> Result<StorageStats> {
    let (count, total_bytes, average_bytes) = FileRecord::totals(&state.db, owner_id).await?;
    let by_type = FileRecord::counts_by_type(&state.db, owner_id)
        .await?
        .into_iter()
        .collect();
    Ok(StorageStats {
        count,
        total_bytes,
        average_bytes,
        by_type,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str, content_type: &str, len: usize) -> UploadItem {
        UploadItem {
            original_name: name.into(),
            content_type: content_type.into(),
            body: Bytes::from(vec![0u8; len]),
        }
    }

    fn allowed() -> Vec<String> {
        vec!["image/png".into(), "application/pdf".into()]
    }

    #[test]
    fn empty_file_is_rejected_before_any_write() {
        let err = validate_upload(&item("a.png", "image/png", 0), 1024, &allowed()).unwrap_err();
        assert!(matches!(err, AppError::Domain(_)));
    }

    #[test]
    fn oversized_file_is_rejected() {
        let err = validate_upload(&item("a.png", "image/png", 2048), 1024, &allowed()).unwrap_err();
        assert!(matches!(err, AppError::Domain(_)));
    }

    #[test]
    fn disallowed_mime_type_is_rejected() {
        let err = validate_upload(&item("a.exe", "application/x-msdownload", 10), 1024, &allowed())
            .unwrap_err();
        assert!(matches!(err, AppError::Domain(_)));
    }

    #[test]
    fn valid_file_passes() {
        assert!(validate_upload(&item("a.png", "image/png", 10), 1024, &allowed()).is_ok());
    }

    #[test]
    fn key_is_owner_scoped_and_keeps_extension() {
        let id = Uuid::new_v4();
        let key = derive_key(7, id, "receipt.PDF", "application/pdf");
        assert!(key.starts_with("uploads/7/"));
        assert!(key.ends_with(".PDF"));
        assert!(key.contains(&id.to_string()));
    }

    #[test]
    fn key_falls_back_to_mime_extension() {
        let id = Uuid::new_v4();
        let key = derive_key(7, id, "no-extension", "image/png");
        assert!(key.ends_with(".png"));

        let key = derive_key(7, id, "no-extension", "application/unknown");
        assert!(key.ends_with(".bin"));
    }

    #[test]
    fn ext_from_mime_table() {
        assert_eq!(ext_from_mime("image/jpeg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/jpg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/webp"), Some("webp"));
        assert_eq!(ext_from_mime("application/octet-stream"), None);
    }

    #[test]
    fn object_meta_carries_uploader_and_original_name() {
        let meta = object_meta(&item("menu.png", "image/png", 4), 42);
        assert_eq!(meta.content_type, "image/png");
        assert!(meta.content_disposition.contains("menu.png"));
        assert_eq!(meta.custom.get("uploaded-by").map(String::as_str), Some("42"));
        assert_eq!(
            meta.custom.get("original-name").map(String::as_str),
            Some("menu.png")
        );
    }

    #[tokio::test]
    async fn fetch_passes_through_the_store() {
        let state = crate::state::AppState::fake();
        let meta = object_meta(&item("a.png", "image/png", 3), 1);
        state
            .storage
            .put_object("uploads/1/x.png", Bytes::from_static(b"abc"), &meta)
            .await
            .unwrap();

        let found = fetch(&state, "uploads/1/x.png").await.unwrap();
        assert_eq!(found.unwrap().body, Bytes::from_static(b"abc"));

        let missing = fetch(&state, "uploads/1/other.png").await.unwrap();
        assert!(missing.is_none());
    }
}
