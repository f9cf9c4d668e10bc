//! CREATE TABLE text for the "copy DDL" action.

use crate::model::{RelationshipEdge, TableMeta};

const RESERVED: &[&str] = &[
    "all", "check", "column", "constraint", "create", "default", "foreign", "from", "group",
    "index", "key", "order", "primary", "references", "select", "table", "to", "unique", "user",
    "where",
];

/// Quote an identifier when it would not survive unquoted.
pub fn quote_ident(ident: &str) -> String {
    let plain = ident
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_lowercase() || c == '_')
        && ident
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        && !RESERVED.contains(&ident);

    if plain {
        ident.to_string()
    } else {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }
}

fn quote_qualified(id: &str) -> String {
    id.split('.').map(quote_ident).collect::<Vec<_>>().join(".")
}

/// Render `table` with its primary key and the outbound foreign keys found
/// in `relationships`.
pub fn generate_ddl(table: &TableMeta, relationships: &[RelationshipEdge]) -> String {
    let mut lines: Vec<String> = table
        .columns
        .iter()
        .map(|c| {
            let mut line = format!("{} {}", quote_ident(&c.name), c.data_type);
            if !c.is_nullable {
                line.push_str(" NOT NULL");
            }
            line
        })
        .collect();

    let pk: Vec<String> = table
        .columns
        .iter()
        .filter(|c| c.is_primary_key)
        .map(|c| quote_ident(&c.name))
        .collect();
    if !pk.is_empty() {
        lines.push(format!("PRIMARY KEY ({})", pk.join(", ")));
    }

    for rel in relationships.iter().filter(|r| r.source_table == table.id) {
        lines.push(format!(
            "FOREIGN KEY ({}) REFERENCES {} ({})",
            quote_ident(&rel.source_column),
            quote_qualified(&rel.target_table),
            quote_ident(&rel.target_column)
        ));
    }

    let mut output = format!("CREATE TABLE {} (\n", quote_qualified(&table.id));
    output.push_str(
        &lines
            .iter()
            .map(|l| format!("    {}", l))
            .collect::<Vec<_>>()
            .join(",\n"),
    );
    output.push_str("\n);\n");
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ColumnSpec;
    use crate::sql::parse_ddl;

    fn orders() -> TableMeta {
        TableMeta::new(
            "public.orders",
            vec![
                ColumnSpec::new("id", "bigint").primary_key(),
                ColumnSpec::new("customer_id", "integer").not_null(),
                ColumnSpec::new("Note", "text"),
            ],
        )
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("orders"), "orders");
        assert_eq!(quote_ident("order"), "\"order\"");
        assert_eq!(quote_ident("Order Items"), "\"Order Items\"");
        assert_eq!(quote_ident("a\"b"), "\"a\"\"b\"");
        assert_eq!(quote_ident("1st"), "\"1st\"");
    }

    #[test]
    fn test_generate_ddl() {
        let rels = vec![
            RelationshipEdge::new("public.orders", "customer_id", "public.customers", "id"),
            RelationshipEdge::new("public.invoices", "order_id", "public.orders", "id"),
        ];

        assert_eq!(
            generate_ddl(&orders(), &rels),
            "CREATE TABLE public.orders (\n    id bigint NOT NULL,\n    customer_id integer NOT NULL,\n    \"Note\" text,\n    PRIMARY KEY (id),\n    FOREIGN KEY (customer_id) REFERENCES public.customers (id)\n);\n"
        );
    }

    #[test]
    fn test_generated_ddl_parses_back() {
        let rels = vec![RelationshipEdge::new(
            "public.orders",
            "customer_id",
            "public.customers",
            "id",
        )];
        let schema = parse_ddl(&generate_ddl(&orders(), &rels)).unwrap();

        assert_eq!(schema.tables[0].id(), "public.orders");
        assert_eq!(schema.tables[0].columns, orders().columns);
        assert_eq!(schema.foreign_keys, rels);
    }
}
