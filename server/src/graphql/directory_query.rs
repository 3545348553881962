use async_graphql::{Context, ErrorExtensions, ID, Object, SimpleObject};
use directory::{DEFAULT_SEARCH_LIMIT, EmployeeRepository};
use entity::employees;
use platform_api::ApiError;
use tracing::instrument;

const MAX_SEARCH_PAGE: i32 = 50;

#[derive(Clone, Debug, SimpleObject)]
pub struct EmployeeNode {
    pub id: ID,
    pub external_id: String,
    pub name: String,
    pub role: Option<String>,
    pub department: Option<String>,
    pub is_manager: bool,
    pub created_at: String,
}

impl From<employees::Model> for EmployeeNode {
    fn from(model: employees::Model) -> Self {
        Self {
            id: ID(model.id.to_string()),
            external_id: model.external_id,
            name: model.name,
            role: model.role,
            department: model.department,
            is_manager: model.is_manager,
            created_at: model.created_at.to_rfc3339(),
        }
    }
}

fn nodes(rows: Vec<employees::Model>) -> Vec<EmployeeNode> {
    rows.into_iter().map(EmployeeNode::from).collect()
}

fn db_error(err: sea_orm::DbErr) -> async_graphql::Error {
    ApiError::internal(err.into()).extend()
}

pub struct DirectoryQuery;

#[Object]
impl DirectoryQuery {
    #[instrument(name = "graphql.directory.employees", skip_all)]
    async fn employees(&self, ctx: &Context<'_>) -> async_graphql::Result<Vec<EmployeeNode>> {
        let repo = ctx.data::<EmployeeRepository>()?;
        repo.list_employees().await.map(nodes).map_err(db_error)
    }

    #[instrument(name = "graphql.directory.managers", skip_all)]
    async fn managers(&self, ctx: &Context<'_>) -> async_graphql::Result<Vec<EmployeeNode>> {
        let repo = ctx.data::<EmployeeRepository>()?;
        repo.list_managers().await.map(nodes).map_err(db_error)
    }

    /// Name autocomplete. A blank term returns no matches.
    #[instrument(name = "graphql.directory.search", skip(self, ctx))]
    async fn search(
        &self,
        ctx: &Context<'_>,
        term: String,
        first: Option<i32>,
    ) -> async_graphql::Result<Vec<EmployeeNode>> {
        let limit = match first {
            Some(first) => ApiError::check_limit(first, MAX_SEARCH_PAGE).map_err(|e| e.extend())?,
            None => DEFAULT_SEARCH_LIMIT,
        };
        let repo = ctx.data::<EmployeeRepository>()?;
        repo.search_employees(&term, limit)
            .await
            .map(nodes)
            .map_err(db_error)
    }
}
