//! Category repository contracts and SQLite implementation.

use super::{
    ensure_connection_ready, fetch_page, from_millis, map_unique_violation, now_millis,
    parse_optional_uuid, parse_uuid, query_all, query_optional, ListSource, RepoError,
    RepoResult,
};
use crate::model::category::{Category, NewCategory};
use crate::pagination::{PageRequest, Paginated};
use crate::query::{FieldMap, Predicate, QueryConfig, SortOrder, SortSpec};
use rusqlite::types::Value;
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

pub const CATEGORY_QUERY: QueryConfig = QueryConfig {
    searchable: &["name", "COALESCE(description, '')"],
    sortable: &[
        FieldMap {
            name: "name",
            column: "name",
        },
        FieldMap {
            name: "id",
            column: "id",
        },
        FieldMap {
            name: "parentId",
            column: "parent_id",
        },
        FieldMap {
            name: "createdAt",
            column: "created_at",
        },
    ],
    default_sort: SortSpec {
        field: "name",
        order: SortOrder::Asc,
    },
    tiebreaker: "id",
};

const CATEGORY_COLUMNS: &str = "id, name, description, parent_id, created_at, updated_at";
const CATEGORY_SOURCE: ListSource = ListSource {
    columns: CATEGORY_COLUMNS,
    from: "categories",
};

pub trait CategoryRepository {
    fn create(&self, input: &NewCategory) -> RepoResult<Category>;
    fn get(&self, id: Uuid) -> RepoResult<Option<Category>>;
    fn update(&self, category: &Category) -> RepoResult<Category>;
    fn delete(&self, id: Uuid) -> RepoResult<()>;
    fn list(&self, predicate: &Predicate, page: PageRequest) -> RepoResult<Paginated<Category>>;
    fn list_all(&self) -> RepoResult<Vec<Category>>;
    fn children(&self, parent_id: Uuid) -> RepoResult<Vec<Category>>;
    fn child_count(&self, id: Uuid) -> RepoResult<u64>;
}

pub struct SqliteCategoryRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCategoryRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }

    fn load_required(&self, id: Uuid) -> RepoResult<Category> {
        self.get(id)?.ok_or_else(|| not_found(id))
    }
}

impl CategoryRepository for SqliteCategoryRepository<'_> {
    fn create(&self, input: &NewCategory) -> RepoResult<Category> {
        let id = Uuid::new_v4();
        self.conn
            .execute(
                "INSERT INTO categories (id, name, description, parent_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5);",
                params![
                    id.to_string(),
                    input.name,
                    input.description,
                    input.parent_id.map(|value| value.to_string()),
                    now_millis(),
                ],
            )
            .map_err(|err| map_unique_violation(err, "category", "name and parent"))?;
        self.load_required(id)
    }

    fn get(&self, id: Uuid) -> RepoResult<Option<Category>> {
        query_optional(
            self.conn,
            &format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = ?1;"),
            &[Value::Text(id.to_string())],
            category_from_row,
        )
    }

    fn update(&self, category: &Category) -> RepoResult<Category> {
        let changed = self.conn.execute(
            "UPDATE categories
             SET name = ?2, description = ?3, parent_id = ?4, updated_at = ?5
             WHERE id = ?1;",
            params![
                category.id.to_string(),
                category.name,
                category.description,
                category.parent_id.map(|value| value.to_string()),
                now_millis(),
            ],
        )?;
        if changed == 0 {
            return Err(not_found(category.id));
        }
        self.load_required(category.id)
    }

    fn delete(&self, id: Uuid) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM categories WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }

    fn list(&self, predicate: &Predicate, page: PageRequest) -> RepoResult<Paginated<Category>> {
        fetch_page(self.conn, &CATEGORY_SOURCE, predicate, page, category_from_row)
    }

    fn list_all(&self) -> RepoResult<Vec<Category>> {
        query_all(
            self.conn,
            &format!("SELECT {CATEGORY_COLUMNS} FROM categories ORDER BY name ASC, id ASC;"),
            &[],
            category_from_row,
        )
    }

    fn children(&self, parent_id: Uuid) -> RepoResult<Vec<Category>> {
        query_all(
            self.conn,
            &format!(
                "SELECT {CATEGORY_COLUMNS} FROM categories
                 WHERE parent_id = ?1
                 ORDER BY name ASC, id ASC;"
            ),
            &[Value::Text(parent_id.to_string())],
            category_from_row,
        )
    }

    fn child_count(&self, id: Uuid) -> RepoResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM categories WHERE parent_id = ?1;",
            [id.to_string()],
            |row| row.get(0),
        )?;
        Ok(u64::try_from(count).unwrap_or_default())
    }
}

fn not_found(id: Uuid) -> RepoError {
    RepoError::NotFound {
        entity: "category",
        key: id.to_string(),
    }
}

fn category_from_row(row: &Row<'_>) -> RepoResult<Category> {
    let id: String = row.get(0)?;
    let parent_id: Option<String> = row.get(3)?;
    Ok(Category {
        id: parse_uuid(&id, "categories.id")?,
        name: row.get(1)?,
        description: row.get(2)?,
        parent_id: parse_optional_uuid(parent_id, "categories.parent_id")?,
        created_at: from_millis(row.get(4)?, "categories.created_at")?,
        updated_at: from_millis(row.get(5)?, "categories.updated_at")?,
    })
}
