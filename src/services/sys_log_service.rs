//! Querying and pruning the request audit log.

use crate::{
    models::sys_log::{NewSysLog, SysLog, SysLogFilter, SysLogQuery},
    repositories::sys_log_repository::SysLogRepository,
    response::PageData,
};
use chrono::{DateTime, NaiveDateTime, Utc};
use thiserror::Error;

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;
pub const MAX_BATCH_DELETE: usize = 1000;

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

#[derive(Debug, Error)]
pub enum SysLogError {
    #[error("Log id list must not be empty")]
    EmptyBatch,
    #[error("At most 1000 logs can be deleted at once")]
    BatchTooLarge,
    #[error("No logs were deleted")]
    NothingDeleted,
    #[error("No logs found in the given time range")]
    NothingToClean,
    #[error("Invalid {field}: {value}")]
    InvalidTime { field: &'static str, value: String },
    #[error("Start time must not be later than end time")]
    InvertedRange,
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type SysLogResult<T> = Result<T, SysLogError>;

#[derive(Clone)]
pub struct SysLogService {
    repo: SysLogRepository,
}

impl SysLogService {
    pub fn new(repo: SysLogRepository) -> Self {
        Self { repo }
    }

    pub async fn record(&self, log: NewSysLog) -> SysLogResult<SysLog> {
        Ok(self.repo.create(log).await?)
    }

    pub async fn get_logs(&self, query: SysLogQuery) -> SysLogResult<PageData<SysLog>> {
        let page = query.page.unwrap_or(1).max(1);
        let size = match query.size.unwrap_or(DEFAULT_PAGE_SIZE) {
            s if s < 1 => DEFAULT_PAGE_SIZE,
            s => s.min(MAX_PAGE_SIZE),
        };

        let start_time = parse_optional("startTime", query.start_time.as_deref())?;
        let end_time = parse_optional("endTime", query.end_time.as_deref())?;
        if let (Some(start), Some(end)) = (start_time, end_time) {
            if start > end {
                return Err(SysLogError::InvertedRange);
            }
        }

        let filter = SysLogFilter {
            request_url: non_blank(query.request_url),
            request_method: non_blank(query.request_method),
            visit_module: non_blank(query.visit_module),
            operation_status: non_blank(query.operation_status),
            client_ip: non_blank(query.client_ip),
            start_time,
            end_time,
        };
        let (logs, total) = self.repo.get_list(page, size, &filter).await?;
        Ok(PageData::new(logs, total, page, size))
    }

    pub async fn batch_delete(&self, ids: &[i64]) -> SysLogResult<u64> {
        if ids.is_empty() {
            return Err(SysLogError::EmptyBatch);
        }
        if ids.len() > MAX_BATCH_DELETE {
            return Err(SysLogError::BatchTooLarge);
        }
        let deleted = self.repo.batch_delete(ids).await?;
        if deleted == 0 {
            return Err(SysLogError::NothingDeleted);
        }
        tracing::info!(requested = ids.len(), deleted, "deleted logs by id");
        Ok(deleted)
    }

    /// Delete logs with a request time in `[start, end]`.
    pub async fn cleanup(&self, start: &str, end: &str) -> SysLogResult<u64> {
        let start = parse_field("startTime", start)?;
        let end = parse_field("endTime", end)?;
        if start > end {
            return Err(SysLogError::InvertedRange);
        }
        let deleted = self.repo.delete_by_time_range(start, end).await?;
        if deleted == 0 {
            return Err(SysLogError::NothingToClean);
        }
        tracing::info!(%start, %end, deleted, "cleaned up logs");
        Ok(deleted)
    }

    pub async fn clear_all(&self) -> SysLogResult<u64> {
        let deleted = self.repo.delete_all().await?;
        tracing::warn!(deleted, "cleared all logs");
        Ok(deleted)
    }
}

/// Parse a timestamp given as `YYYY-MM-DD HH:MM:SS`, the same with a `T`
/// separator (both with optional fractional seconds), or RFC 3339. Values
/// without an offset are taken as UTC.
pub fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn parse_field(field: &'static str, value: &str) -> SysLogResult<DateTime<Utc>> {
    parse_datetime(value).ok_or_else(|| SysLogError::InvalidTime {
        field,
        value: value.to_string(),
    })
}

fn parse_optional(field: &'static str, value: Option<&str>) -> SysLogResult<Option<DateTime<Utc>>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => parse_field(field, v).map(Some),
        None => Ok(None),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
