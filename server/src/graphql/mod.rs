mod directory_query;

use async_graphql::{EmptyMutation, EmptySubscription, Object, Schema, SimpleObject};
use directory::EmployeeRepository;
use platform_api::ApiResult;
use tracing::instrument;

pub use directory_query::{DirectoryQuery, EmployeeNode};

pub type SchemaType = Schema<QueryRoot, EmptyMutation, EmptySubscription>;

pub fn build_schema(employees: EmployeeRepository) -> SchemaType {
    Schema::build(QueryRoot, EmptyMutation, EmptySubscription)
        .data(employees)
        .finish()
}

/// SDL of the schema; needs no database.
pub fn schema_sdl() -> String {
    Schema::build(QueryRoot, EmptyMutation, EmptySubscription)
        .finish()
        .sdl()
}

#[derive(Default)]
pub struct QueryRoot;

#[Object]
impl QueryRoot {
    #[instrument(name = "graphql.health", skip_all)]
    async fn health(&self) -> ApiResult<HealthPayload> {
        Ok(HealthPayload { ok: true })
    }

    #[instrument(name = "graphql.version", skip_all)]
    async fn version(&self) -> ApiResult<String> {
        Ok(env!("CARGO_PKG_VERSION").to_string())
    }

    /// Employee directory used by check-in autocomplete.
    async fn directory(&self) -> DirectoryQuery {
        DirectoryQuery
    }
}

#[derive(Clone, Debug, SimpleObject)]
pub struct HealthPayload {
    pub ok: bool,
}
