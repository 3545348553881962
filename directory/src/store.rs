//! Local employee store: the reconciliation upsert and directory reads.

use async_trait::async_trait;
use chrono::Utc;
use entity::employees;
use sea_orm::sea_query::{Expr, Func, LikeExpr, OnConflict};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, TransactionTrait,
};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::normalize::EmployeeCandidate;

/// Rows per `INSERT` statement; keeps bind parameters well under backend limits.
const UPSERT_CHUNK: usize = 500;

/// Default autocomplete page size.
pub const DEFAULT_SEARCH_LIMIT: u64 = 8;

#[async_trait]
pub trait EmployeeStore: Send + Sync {
    /// Insert-or-update every candidate keyed on `external_id`, atomically.
    ///
    /// Only `name` and `role` are overwritten on conflict. Rows missing from
    /// `candidates` are left alone. Returns the number of candidates
    /// reconciled.
    async fn upsert_employees(&self, candidates: &[EmployeeCandidate]) -> Result<usize, DbErr>;
}

/// sea-orm backed store over the `employees` table.
#[derive(Clone, Debug)]
pub struct EmployeeRepository {
    db: DatabaseConnection,
}

impl EmployeeRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Every employee, ordered by name.
    pub async fn list_employees(&self) -> Result<Vec<employees::Model>, DbErr> {
        employees::Entity::find()
            .order_by_asc(employees::Column::Name)
            .all(&self.db)
            .await
    }

    /// Employees flagged as managers locally, ordered by name.
    pub async fn list_managers(&self) -> Result<Vec<employees::Model>, DbErr> {
        employees::Entity::find()
            .filter(employees::Column::IsManager.eq(true))
            .order_by_asc(employees::Column::Name)
            .all(&self.db)
            .await
    }

    /// Case-insensitive substring match on name. A blank term matches nothing.
    pub async fn search_employees(
        &self,
        term: &str,
        limit: u64,
    ) -> Result<Vec<employees::Model>, DbErr> {
        let term = term.trim();
        if term.is_empty() {
            return Ok(Vec::new());
        }
        let pattern = format!("%{}%", escape_like(&term.to_lowercase()));
        employees::Entity::find()
            .filter(
                Expr::expr(Func::lower(Expr::col(employees::Column::Name)))
                    .like(LikeExpr::new(pattern).escape('\\')),
            )
            .order_by_asc(employees::Column::Name)
            .limit(limit)
            .all(&self.db)
            .await
    }

    pub async fn find_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<employees::Model>, DbErr> {
        employees::Entity::find()
            .filter(employees::Column::ExternalId.eq(external_id))
            .one(&self.db)
            .await
    }
}

fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

#[async_trait]
impl EmployeeStore for EmployeeRepository {
    #[instrument(name = "employees.upsert", skip_all, fields(rows = candidates.len()))]
    async fn upsert_employees(&self, candidates: &[EmployeeCandidate]) -> Result<usize, DbErr> {
        if candidates.is_empty() {
            return Ok(0);
        }

        let txn = self.db.begin().await?;
        let now = Utc::now();
        for chunk in candidates.chunks(UPSERT_CHUNK) {
            // department/is_manager only seed new rows; they are not in the
            // update set below.
            let rows = chunk.iter().map(|candidate| employees::ActiveModel {
                id: Set(Uuid::new_v4()),
                external_id: Set(candidate.external_id.clone()),
                name: Set(candidate.name.clone()),
                role: Set(candidate.role.clone()),
                department: Set(None),
                is_manager: Set(false),
                created_at: Set(now.into()),
            });
            let affected = employees::Entity::insert_many(rows)
                .on_conflict(
                    OnConflict::column(employees::Column::ExternalId)
                        .update_columns([employees::Column::Name, employees::Column::Role])
                        .to_owned(),
                )
                .exec_without_returning(&txn)
                .await?;
            debug!(chunk = chunk.len(), affected, "upserted employee chunk");
        }
        txn.commit().await?;
        Ok(candidates.len())
    }
}

#[cfg(test)]
mod tests {
    use super::escape_like;

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("ann"), "ann");
    }
}
