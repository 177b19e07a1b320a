use crate::engine::assistant::{Assistant, TextGenerator};
use crate::engine::catalog::{CatalogProvider, SchemaCatalog};
use crate::engine::join_inference::{self, JoinCandidates};
use crate::engine::model::{JoinChainError, QueryModel, SchemaInconsistencyError};
use crate::engine::rendering::{self, EmptyQueryError};

/// One user's work: the schema they are connected to, and the query they are building.
///
/// Nothing is global. Whoever drives the session owns it, and there is only ever one writer.
#[derive(Debug, Clone, Default)]
pub struct Session {
    catalog: SchemaCatalog,
    model: QueryModel,
}

impl Session {
    pub fn new(catalog: SchemaCatalog) -> Self {
        Session {
            catalog,
            model: QueryModel::new(),
        }
    }

    pub fn connect(provider: &dyn CatalogProvider) -> Result<Self, crate::Error> {
        Ok(Session::new(SchemaCatalog::load(provider)?))
    }

    /// Picks up a model built elsewhere. Parts the catalog doesn't know about are dropped, and
    /// reported back.
    pub fn resume(catalog: SchemaCatalog, model: QueryModel) -> (Self, Vec<SchemaInconsistencyError>) {
        let mut session = Session { catalog, model };
        let dropped = session.reconcile();

        (session, dropped)
    }

    /// Reloads the schema, like after reconnecting, and drops the choices that went stale.
    pub fn refresh(
        &mut self,
        provider: &dyn CatalogProvider,
    ) -> Result<Vec<SchemaInconsistencyError>, crate::Error> {
        self.catalog = SchemaCatalog::load(provider)?;

        Ok(self.reconcile())
    }

    pub fn catalog(&self) -> &SchemaCatalog {
        &self.catalog
    }

    pub fn model(&self) -> &QueryModel {
        &self.model
    }

    /// Most model changes need to look at the catalog too.
    ///
    /// ```
    /// # use sql_fetcher::engine::{SchemaCatalog, Session};
    /// let mut session = Session::new(SchemaCatalog::from_iter([("orders", vec!["id"])]));
    ///
    /// session.edit(|model, catalog| model.select_tables(["orders"], catalog))?;
    ///
    /// assert_eq!(session.generate()?, "SELECT\n  orders.id\nFROM orders");
    /// # Ok::<(), sql_fetcher::Error>(())
    /// ```
    pub fn edit<F, R>(&mut self, change: F) -> R
    where
        F: FnOnce(&mut QueryModel, &SchemaCatalog) -> R,
    {
        change(&mut self.model, &self.catalog)
    }

    pub fn generate(&self) -> Result<String, EmptyQueryError> {
        rendering::generate(&self.model, &self.catalog)
    }

    /// Column options and the proposed ON columns for an existing join.
    pub fn suggest_join(&self, index: usize) -> Result<JoinCandidates, JoinChainError> {
        let join = self
            .model
            .joins()
            .get(index)
            .ok_or(JoinChainError::NoSuchJoin(index))?;

        Ok(join_inference::candidates(
            &join.left_table,
            &join.right_table,
            &self.catalog,
        ))
    }

    pub fn reconcile(&mut self) -> Vec<SchemaInconsistencyError> {
        let dropped = self.model.reconcile(&self.catalog);
        for inconsistency in &dropped {
            log::debug!("dropped from query: {inconsistency}");
        }

        dropped
    }

    pub async fn ask<G: TextGenerator>(
        &self,
        assistant: &Assistant<G>,
        request: &str,
    ) -> Result<String, crate::Error> {
        assistant.ask(request, &self.catalog).await
    }
}
