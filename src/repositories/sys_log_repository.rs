//! Data access for `sys_log`.

use super::page_offset;
use crate::models::sys_log::{NewSysLog, SysLog, SysLogFilter};
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, SqlitePool, sqlite::Sqlite};

const LOG_COLUMNS: &str = "id, request_url, request_method, request_params, visit_module, \
                           operation_type, operation_status, response_result, request_time, \
                           duration, user_info, client_ip, user_agent, created_at";

#[derive(Clone)]
pub struct SysLogRepository {
    db: SqlitePool,
}

impl SysLogRepository {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn create(&self, log: NewSysLog) -> Result<SysLog, sqlx::Error> {
        sqlx::query_as::<_, SysLog>(&format!(
            "INSERT INTO sys_log (
                request_url, request_method, request_params, visit_module, operation_type,
                operation_status, response_result, request_time, duration, user_info,
                client_ip, user_agent, created_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING {}",
            LOG_COLUMNS
        ))
        .bind(&log.request_url)
        .bind(&log.request_method)
        .bind(&log.request_params)
        .bind(&log.visit_module)
        .bind(&log.operation_type)
        .bind(&log.operation_status)
        .bind(&log.response_result)
        .bind(log.request_time)
        .bind(log.duration)
        .bind(&log.user_info)
        .bind(&log.client_ip)
        .bind(&log.user_agent)
        .bind(Utc::now())
        .fetch_one(&self.db)
        .await
    }

    /// One page of logs, newest request first, plus the filtered total.
    pub async fn get_list(
        &self,
        page: i64,
        size: i64,
        filter: &SysLogFilter,
    ) -> Result<(Vec<SysLog>, i64), sqlx::Error> {
        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM sys_log WHERE 1 = 1");
        push_filter(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.db).await?;

        let mut select = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {} FROM sys_log WHERE 1 = 1",
            LOG_COLUMNS
        ));
        push_filter(&mut select, filter);
        select.push(" ORDER BY request_time DESC, id DESC LIMIT ");
        select.push_bind(size);
        select.push(" OFFSET ");
        select.push_bind(page_offset(page, size));

        let items: Vec<SysLog> = select.build_query_as().fetch_all(&self.db).await?;
        Ok((items, total))
    }

    pub async fn batch_delete(&self, ids: &[i64]) -> Result<u64, sqlx::Error> {
        if ids.is_empty() {
            return Ok(0);
        }
        let mut builder = QueryBuilder::<Sqlite>::new("DELETE FROM sys_log WHERE id IN (");
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        let result = builder.build().execute(&self.db).await?;
        Ok(result.rows_affected())
    }

    /// Delete logs whose request time lies in `[start, end]`.
    pub async fn delete_by_time_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<u64, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM sys_log WHERE request_time >= ? AND request_time <= ?")
                .bind(start)
                .bind(end)
                .execute(&self.db)
                .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete_all(&self) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sys_log").execute(&self.db).await?;
        Ok(result.rows_affected())
    }
}

fn push_filter(builder: &mut QueryBuilder<'_, Sqlite>, filter: &SysLogFilter) {
    if let Some(url) = &filter.request_url {
        builder.push(" AND request_url LIKE ");
        builder.push_bind(format!("%{}%", url));
    }
    if let Some(method) = &filter.request_method {
        builder.push(" AND request_method = ");
        builder.push_bind(method.to_ascii_uppercase());
    }
    if let Some(module) = &filter.visit_module {
        builder.push(" AND visit_module = ");
        builder.push_bind(module.clone());
    }
    if let Some(status) = &filter.operation_status {
        builder.push(" AND operation_status = ");
        builder.push_bind(status.clone());
    }
    if let Some(ip) = &filter.client_ip {
        builder.push(" AND client_ip = ");
        builder.push_bind(ip.clone());
    }
    if let Some(start) = filter.start_time {
        builder.push(" AND request_time >= ");
        builder.push_bind(start);
    }
    if let Some(end) = filter.end_time {
        builder.push(" AND request_time <= ");
        builder.push_bind(end);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db, models::sys_log::STATUS_SUCCESS};
    use chrono::{Duration, TimeZone};

    async fn repo() -> SysLogRepository {
        let pool = db::connect("sqlite::memory:").await.unwrap();
        db::run_migrations(&pool).await.unwrap();
        SysLogRepository::new(pool)
    }

    fn entry(url: &str, method: &str, at: DateTime<Utc>) -> NewSysLog {
        NewSysLog {
            request_url: url.into(),
            request_method: method.into(),
            request_params: Some("{}".into()),
            visit_module: Some("users".into()),
            operation_type: None,
            operation_status: STATUS_SUCCESS.into(),
            response_result: None,
            request_time: at,
            duration: Some(3),
            user_info: None,
            client_ip: Some("127.0.0.1".into()),
            user_agent: None,
        }
    }

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 12, 29, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn list_filters_and_orders_newest_first() {
        let repo = repo().await;
        let t0 = base_time();
        repo.create(entry("/users/list", "GET", t0)).await.unwrap();
        repo.create(entry("/users/add", "POST", t0 + Duration::minutes(1)))
            .await
            .unwrap();
        repo.create(entry("/auth/login", "POST", t0 + Duration::minutes(2)))
            .await
            .unwrap();

        let (all, total) = repo.get_list(1, 10, &SysLogFilter::default()).await.unwrap();
        assert_eq!(total, 3);
        assert_eq!(all[0].request_url, "/auth/login");

        let filter = SysLogFilter {
            request_url: Some("users".into()),
            request_method: Some("post".into()),
            ..Default::default()
        };
        let (found, total) = repo.get_list(1, 10, &filter).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(found[0].request_url, "/users/add");

        let filter = SysLogFilter {
            start_time: Some(t0 + Duration::seconds(30)),
            end_time: Some(t0 + Duration::minutes(1)),
            ..Default::default()
        };
        assert_eq!(repo.get_list(1, 10, &filter).await.unwrap().1, 1);
    }

    #[tokio::test]
    async fn deletes_report_affected_rows() {
        let repo = repo().await;
        let t0 = base_time();
        let a = repo.create(entry("/a", "GET", t0)).await.unwrap();
        let b = repo
            .create(entry("/b", "GET", t0 + Duration::hours(1)))
            .await
            .unwrap();
        repo.create(entry("/c", "GET", t0 + Duration::hours(2)))
            .await
            .unwrap();

        assert_eq!(repo.batch_delete(&[a.id, 9999]).await.unwrap(), 1);
        assert_eq!(repo.batch_delete(&[]).await.unwrap(), 0);
        assert_eq!(
            repo.delete_by_time_range(t0 + Duration::hours(1), t0 + Duration::hours(1))
                .await
                .unwrap(),
            1
        );
        assert!(repo.batch_delete(&[b.id]).await.unwrap() == 0);
        assert_eq!(repo.delete_all().await.unwrap(), 1);
    }
}
