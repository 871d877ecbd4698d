//! Terminal operations: compile a [`Query`] and run it through a [`Db`].

use crate::client::{GenericClient, StreamingClient};
use crate::db::Db;
use crate::error::{DbError, DbResult};
use crate::query::Query;
use crate::row::FromRow;
use crate::values::Values;
use futures_util::StreamExt;
use tokio_postgres::Row;

impl Query {
    /// `SELECT <keys|*>` and feed each row to `f` until it returns `false`.
    ///
    /// Rows are streamed; the result set is released as soon as `f` stops
    /// the iteration, the rows run out or an error occurs.
    ///
    /// ```ignore
    /// let mut names = Vec::new();
    /// users
    ///     .order_by("username")
    ///     .get(&db, &["username"], |row| {
    ///         names.push(row.get::<_, String>(0));
    ///         names.len() < 10
    ///     })
    ///     .await?;
    /// ```
    pub async fn get<C, F>(&self, db: &Db<C>, keys: &[&str], mut f: F) -> DbResult<()>
    where
        C: StreamingClient,
        F: FnMut(&Row) -> bool,
    {
        let stmt = self.select_statement(keys);
        let mut rows = db.stream_statement(&stmt).await?;
        while let Some(row) = rows.next().await {
            if !f(&row?) {
                break;
            }
        }
        Ok(())
    }

    /// `SELECT <keys|*>` and map every row with [`FromRow`].
    pub async fn get_as<T, C>(&self, db: &Db<C>, keys: &[&str]) -> DbResult<Vec<T>>
    where
        T: FromRow,
        C: GenericClient,
    {
        let stmt = self.select_statement(keys);
        let rows = db.query_statement(&stmt).await?;
        rows.iter().map(T::from_row).collect()
    }

    /// Returns true if a row matches every `column = value` in `values` and
    /// the query's own WHERE clause.
    ///
    /// Empty `values` returns `false` without a round trip. Errors are logged
    /// at `debug` and reported as `false`.
    pub async fn has<C: GenericClient>(&self, db: &Db<C>, values: &Values) -> bool {
        let Some(stmt) = self.exists_statement(values) else {
            return false;
        };
        match db.execute_statement(&stmt).await {
            Ok(found) => found > 0,
            Err(e) => {
                tracing::debug!(
                    target: "pgquill.sql",
                    table = self.table(),
                    error = %e,
                    "existence check failed"
                );
                false
            }
        }
    }

    /// Insert or update `values`, returning the affected row count.
    ///
    /// - With a WHERE clause: `UPDATE .. SET .. WHERE ..`; `unique` is ignored.
    /// - Else, when a row matches the `unique` columns present in `values`:
    ///   `UPDATE` scoped to those columns.
    /// - Else: `INSERT`.
    ///
    /// Empty `values` is a no-op.
    pub async fn set<C: GenericClient>(
        &self,
        db: &Db<C>,
        values: &Values,
        unique: &[&str],
    ) -> DbResult<u64> {
        if values.is_empty() {
            return Ok(0);
        }

        if self.has_where() {
            return self.update(db, values).await;
        }

        if let Some((keys, matched)) = self.unique_match(values, unique) {
            if self.has(db, &keys).await {
                return matched.update(db, values).await;
            }
        }

        match self.insert_statement(values) {
            Some(stmt) => db.execute_statement(&stmt).await,
            None => Ok(0),
        }
    }

    /// `DELETE` matching rows, returning the affected row count.
    ///
    /// Without a WHERE clause `force` must be true, otherwise
    /// [`DbError::UnsafeQuery`] is returned and nothing is sent.
    pub async fn delete<C: GenericClient>(&self, db: &Db<C>, force: bool) -> DbResult<u64> {
        if !self.has_where() && !force {
            return Err(DbError::unsafe_query(format!(
                "DELETE FROM {} without WHERE requires force",
                self.table()
            )));
        }
        db.execute_statement(&self.delete_statement()).await
    }

    /// `DROP TABLE`. Requires `force`.
    ///
    /// The statement skips the safety scanner, which rejects every `DROP`.
    pub async fn drop_table<C: GenericClient>(&self, db: &Db<C>, force: bool) -> DbResult<()> {
        if !force {
            return Err(DbError::unsafe_query(format!(
                "DROP TABLE {} requires force",
                self.table()
            )));
        }
        db.execute_unscanned(&self.drop_statement()).await?;
        Ok(())
    }

    async fn update<C: GenericClient>(&self, db: &Db<C>, values: &Values) -> DbResult<u64> {
        match self.update_statement(values) {
            Some(stmt) => db.execute_statement(&stmt).await,
            None => Ok(0),
        }
    }

    /// The `unique` columns present in `values`, and this query narrowed to them.
    fn unique_match(&self, values: &Values, unique: &[&str]) -> Option<(Values, Query)> {
        let mut keys = Values::new();
        let mut matched = self.clone();
        for column in unique {
            if keys.contains(column) {
                continue;
            }
            if let Some(value) = values.get(column) {
                keys.insert_param(column, value.clone());
                matched = matched.and(column).bind(" = ", value.clone());
            }
        }
        (!keys.is_empty()).then_some((keys, matched))
    }
}

#[cfg(test)]
mod tests;
