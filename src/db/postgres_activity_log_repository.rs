use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::db::activity_log_repository::ActivityLogRepository;
use crate::models::activity_log::{ActivityLogEntry, ActivityLogFilter, NewActivityLog};

pub struct PostgresActivityLogRepository {
    pub pool: PgPool,
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &ActivityLogFilter) {
    qb.push(" WHERE 1=1");
    if let Some(action) = &filter.action {
        qb.push(" AND l.action = ");
        qb.push_bind(action.clone());
    }
    if let Some(user_id) = filter.user_id {
        qb.push(" AND l.user_id = ");
        qb.push_bind(user_id);
    }
    if let Some(start) = filter.start {
        qb.push(" AND l.created_at >= ");
        qb.push_bind(start);
    }
    if let Some(end) = filter.end {
        qb.push(" AND l.created_at <= ");
        qb.push_bind(end);
    }
}

#[async_trait]
impl ActivityLogRepository for PostgresActivityLogRepository {
    async fn insert_activity(&self, entry: &NewActivityLog) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO activity_logs (user_id, action, details, ip_address)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(entry.user_id)
        .bind(entry.action.as_str())
        .bind(&entry.details)
        .bind(&entry.ip_address)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_activity(
        &self,
        filter: &ActivityLogFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ActivityLogEntry>, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new(
            r#"
            SELECT l.id, l.user_id, l.action, l.details, l.ip_address, l.created_at,
                   u.name AS user_name,
                   u.email AS user_email,
                   u.role AS user_role
            FROM activity_logs l
            LEFT JOIN users u ON u.id = l.user_id
            "#,
        );
        push_filters(&mut qb, filter);
        qb.push(" ORDER BY l.created_at DESC, l.id DESC LIMIT ");
        qb.push_bind(limit);
        qb.push(" OFFSET ");
        qb.push_bind(offset);

        qb.build_query_as::<ActivityLogEntry>()
            .fetch_all(&self.pool)
            .await
    }

    async fn count_activity(&self, filter: &ActivityLogFilter) -> Result<i64, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM activity_logs l");
        push_filters(&mut qb, filter);
        qb.build_query_scalar::<i64>().fetch_one(&self.pool).await
    }
}
