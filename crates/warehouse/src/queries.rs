/// Schema holding the account usage views in Snowflake.
pub const ACCOUNT_USAGE_SCHEMA: &str = "snowflake.account_usage";

/// Upper bound on bound identifiers per statement.
pub const MAX_IDS_PER_STATEMENT: usize = 1000;

pub fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

fn qualified(schema: &str, view: &str) -> String {
    if schema.is_empty() {
        view.to_string()
    } else {
        format!("{schema}.{view}")
    }
}

pub fn cost_attribution_sql(schema: &str, id_count: usize) -> String {
    format!(
        r#"
        SELECT
          query_id,
          end_time,
          credits_attributed_compute
        FROM {}
        WHERE query_id IN ({})
        "#,
        qualified(schema, "query_attribution_history"),
        placeholders(id_count)
    )
}

pub fn usage_history_sql(schema: &str, id_count: usize) -> String {
    format!(
        r#"
        SELECT
          query_id,
          rows_produced,
          rows_inserted,
          rows_updated,
          rows_deleted,
          rows_unloaded,
          total_elapsed_time,
          bytes_scanned,
          end_time
        FROM {}
        WHERE query_id IN ({})
        "#,
        qualified(schema, "query_history"),
        placeholders(id_count)
    )
}
