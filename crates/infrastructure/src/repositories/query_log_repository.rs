use async_trait::async_trait;
use sentry_dns_application::ports::QueryLogStorage;
use sentry_dns_domain::{DomainError, QueryEvent, QueryLogFilter, QueryStats, RecordType};
use sqlx::{Row, SqlitePool};
use std::net::IpAddr;
use std::str::FromStr;
use std::sync::Arc;
use tracing::instrument;

/// SQLite-backed `QueryLogStorage` (§6.3). Batches are committed as a
/// single transaction; callers (the async logger worker) own buffering
/// and flush cadence, this type only owns durability.
pub struct SqliteQueryLogStorage {
    write_pool: SqlitePool,
    read_pool: SqlitePool,
}

impl SqliteQueryLogStorage {
    pub fn new(write_pool: SqlitePool, read_pool: SqlitePool) -> Self {
        Self {
            write_pool,
            read_pool,
        }
    }
}

#[async_trait]
impl QueryLogStorage for SqliteQueryLogStorage {
    #[instrument(skip(self, event))]
    async fn log_query(&self, event: &QueryEvent) -> Result<(), DomainError> {
        self.log_query_batch(std::slice::from_ref(event)).await
    }

    async fn log_query_batch(&self, events: &[QueryEvent]) -> Result<(), DomainError> {
        if events.is_empty() {
            return Ok(());
        }

        let mut tx = self
            .write_pool
            .begin()
            .await
            .map_err(|e| DomainError::DatabaseError(e.to_string()))?;

        for event in events {
            let upstream = event.upstream.as_deref();
            sqlx::query(
                "INSERT INTO query_log \
                 (ts_unix_ms, client_ip, domain, record_type, rcode, blocked, cached, elapsed_ms, upstream) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )
            .bind(event.timestamp_unix_ms as i64)
            .bind(event.client_ip.to_string())
            .bind(event.domain.as_ref())
            .bind(event.record_type.as_mnemonic())
            .bind(event.rcode as i64)
            .bind(event.blocked)
            .bind(event.cached)
            .bind(event.elapsed_ms() as i64)
            .bind(upstream)
            .execute(&mut *tx)
            .await
            .map_err(|e| DomainError::DatabaseError(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| DomainError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn get_recent(&self, filter: &QueryLogFilter) -> Result<Vec<QueryEvent>, DomainError> {
        let mut sql = String::from(
            "SELECT ts_unix_ms, client_ip, domain, record_type, rcode, blocked, cached, elapsed_ms, upstream \
             FROM query_log WHERE 1 = 1",
        );
        if filter.domain_contains.is_some() {
            sql.push_str(" AND domain LIKE ?");
        }
        if filter.client_ip.is_some() {
            sql.push_str(" AND client_ip = ?");
        }
        if filter.blocked_only {
            sql.push_str(" AND blocked = 1");
        }
        sql.push_str(" ORDER BY ts_unix_ms DESC LIMIT ?");

        let mut query = sqlx::query(&sql);
        if let Some(contains) = &filter.domain_contains {
            query = query.bind(format!("%{contains}%"));
        }
        if let Some(ip) = &filter.client_ip {
            query = query.bind(ip.to_string());
        }
        query = query.bind(filter.limit as i64);

        let rows = query
            .fetch_all(&self.read_pool)
            .await
            .map_err(|e| DomainError::DatabaseError(e.to_string()))?;

        rows.iter().map(row_to_event).collect()
    }

    async fn get_stats(&self) -> Result<QueryStats, DomainError> {
        let totals = sqlx::query(
            "SELECT \
               COUNT(*) AS total, \
               SUM(blocked) AS blocked, \
               SUM(CASE WHEN blocked = 0 AND cached = 0 THEN 1 ELSE 0 END) AS forwarded, \
               SUM(CASE WHEN cached = 1 THEN 1 ELSE 0 END) AS cached_hit, \
               SUM(CASE WHEN cached = 0 AND blocked = 0 THEN 1 ELSE 0 END) AS cached_miss, \
               SUM(CASE WHEN rcode NOT IN (0, 3) THEN 1 ELSE 0 END) AS errors \
             FROM query_log",
        )
        .fetch_one(&self.read_pool)
        .await
        .map_err(|e| DomainError::DatabaseError(e.to_string()))?;

        let top_domains_rows = sqlx::query(
            "SELECT domain, COUNT(*) AS hits FROM query_log GROUP BY domain ORDER BY hits DESC LIMIT 10",
        )
        .fetch_all(&self.read_pool)
        .await
        .map_err(|e| DomainError::DatabaseError(e.to_string()))?;

        let top_domains = top_domains_rows
            .iter()
            .map(|row| {
                let domain: String = row.get("domain");
                let hits: i64 = row.get("hits");
                (domain, hits as u64)
            })
            .collect();

        Ok(QueryStats {
            total: totals.try_get::<i64, _>("total").unwrap_or(0) as u64,
            blocked: totals.try_get::<i64, _>("blocked").unwrap_or(0) as u64,
            forwarded: totals.try_get::<i64, _>("forwarded").unwrap_or(0) as u64,
            cached_hit: totals.try_get::<i64, _>("cached_hit").unwrap_or(0) as u64,
            cached_miss: totals.try_get::<i64, _>("cached_miss").unwrap_or(0) as u64,
            errors: totals.try_get::<i64, _>("errors").unwrap_or(0) as u64,
            top_domains,
        })
    }

    async fn cleanup(&self, retention_days: u32) -> Result<u64, DomainError> {
        let cutoff_ms = chrono::Utc::now().timestamp_millis() - (retention_days as i64 * 86_400_000);
        let result = sqlx::query("DELETE FROM query_log WHERE ts_unix_ms < ?1")
            .bind(cutoff_ms)
            .execute(&self.write_pool)
            .await
            .map_err(|e| DomainError::DatabaseError(e.to_string()))?;
        Ok(result.rows_affected())
    }

    async fn close(&self) {
        self.write_pool.close().await;
    }
}

fn row_to_event(row: &sqlx::sqlite::SqliteRow) -> Result<QueryEvent, DomainError> {
    let client_ip_raw: String = row.get("client_ip");
    let client_ip = IpAddr::from_str(&client_ip_raw)
        .map_err(|_| DomainError::DatabaseError(format!("invalid client_ip in row: {client_ip_raw}")))?;
    let record_type_raw: String = row.get("record_type");
    let record_type = RecordType::from_mnemonic(&record_type_raw)
        .ok_or_else(|| DomainError::DatabaseError(format!("invalid record_type in row: {record_type_raw}")))?;
    let upstream: Option<String> = row.get("upstream");
    let elapsed_ms: i64 = row.get("elapsed_ms");

    Ok(QueryEvent {
        timestamp_unix_ms: row.get::<i64, _>("ts_unix_ms") as u64,
        client_ip,
        domain: Arc::from(row.get::<String, _>("domain").as_str()),
        record_type,
        rcode: row.get::<i64, _>("rcode") as u16,
        blocked: row.get("blocked"),
        cached: row.get("cached"),
        elapsed: std::time::Duration::from_millis(elapsed_ms.max(0) as u64),
        upstream: upstream.map(|s| Arc::from(s.as_str())),
    })
}

