//! Person repository: CRUD and search over the person aggregate.
//!
//! Retrieval pivots the child tables into per-kind arrays with correlated
//! subqueries, so duplicate handles survive aggregation and persons without
//! children come back with empty lists. Updates rewrite the scalar columns
//! and replace the full child set; callers always submit the complete
//! desired children.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::types::Json;
use sqlx::PgConnection;
use tracing::info;

use crate::models::person::{ContactKind, Gender, PersonDraft, PersonRecord, ProfileImage};
use crate::{AppError, Result};

use super::executor::Executor;

/// Repository for person records and their child rows.
#[derive(Debug, Clone)]
pub struct PersonRepo {
    executor: Executor,
}

/// Internal row struct carrying one person plus pivoted child aggregates.
#[derive(sqlx::FromRow)]
struct PersonRow {
    id: i64,
    full_name: String,
    father_name: String,
    mother_name: String,
    date_of_birth: NaiveDate,
    gender: String,
    national_id: String,
    voter_number: Option<String>,
    permanent_address: String,
    present_address: String,
    profile_image: Option<Json<ProfileImage>>,
    description: Option<String>,
    created_at: DateTime<Utc>,
    mobile_numbers: Option<Vec<String>>,
    whatsapp_numbers: Option<Vec<String>>,
    facebook_links: Option<Vec<String>>,
    website_links: Option<Vec<String>>,
    pdf_urls: Option<Vec<String>>,
}

impl PersonRow {
    /// Convert a database row into the domain model.
    fn into_record(self) -> Result<PersonRecord> {
        let gender = parse_gender(&self.gender)?;
        Ok(PersonRecord {
            id: self.id,
            created_at: self.created_at,
            person: PersonDraft {
                full_name: self.full_name,
                father_name: self.father_name,
                mother_name: self.mother_name,
                date_of_birth: self.date_of_birth,
                gender,
                national_id: self.national_id,
                voter_number: self.voter_number,
                permanent_address: self.permanent_address,
                present_address: self.present_address,
                profile_image: self.profile_image.map(|json| json.0),
                description: self.description,
                mobile_numbers: self.mobile_numbers.unwrap_or_default(),
                whatsapp_numbers: self.whatsapp_numbers.unwrap_or_default(),
                facebook_links: self.facebook_links.unwrap_or_default(),
                website_links: self.website_links.unwrap_or_default(),
                pdf_urls: self.pdf_urls.unwrap_or_default(),
            },
        })
    }
}

fn parse_gender(s: &str) -> Result<Gender> {
    match s {
        "male" => Ok(Gender::Male),
        "female" => Ok(Gender::Female),
        "other" => Ok(Gender::Other),
        other => Err(AppError::Db(format!("invalid gender: {other}"))),
    }
}

fn gender_str(g: Gender) -> &'static str {
    match g {
        Gender::Male => "male",
        Gender::Female => "female",
        Gender::Other => "other",
    }
}

fn kind_str(k: ContactKind) -> &'static str {
    match k {
        ContactKind::Mobile => "mobile",
        ContactKind::Whatsapp => "whatsapp",
        ContactKind::Facebook => "facebook",
        ContactKind::Website => "website",
    }
}

/// Wrap a search needle for ILIKE, escaping the wildcard characters so the
/// needle matches literally.
fn like_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for ch in needle.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

/// Shared SELECT for full-record retrieval. The correlated subqueries pivot
/// `contact_info` by kind and keep duplicates; persons without children
/// produce NULL aggregates, mapped to empty lists in `into_record`.
const RECORD_SELECT: &str = "
SELECT p.id, p.full_name, p.father_name, p.mother_name, p.date_of_birth,
       p.gender, p.national_id, p.voter_number, p.permanent_address,
       p.present_address, p.profile_image, p.description, p.created_at,
       (SELECT array_agg(c.value ORDER BY c.id) FROM contact_info c
         WHERE c.person_id = p.id AND c.kind = 'mobile')   AS mobile_numbers,
       (SELECT array_agg(c.value ORDER BY c.id) FROM contact_info c
         WHERE c.person_id = p.id AND c.kind = 'whatsapp') AS whatsapp_numbers,
       (SELECT array_agg(c.value ORDER BY c.id) FROM contact_info c
         WHERE c.person_id = p.id AND c.kind = 'facebook') AS facebook_links,
       (SELECT array_agg(c.value ORDER BY c.id) FROM contact_info c
         WHERE c.person_id = p.id AND c.kind = 'website')  AS website_links,
       (SELECT array_agg(d.url ORDER BY d.id) FROM documents d
         WHERE d.person_id = p.id AND d.kind = 'pdf')      AS pdf_urls
  FROM persons p";

const RECORD_ORDER: &str = "ORDER BY p.created_at DESC, p.id DESC";

impl PersonRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(executor: Executor) -> Self {
        Self { executor }
    }

    /// Insert a person with its full child set in one transaction.
    ///
    /// Returns the generated identifier.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the insert fails.
    pub async fn create(&self, draft: &PersonDraft) -> Result<i64> {
        let draft = draft.clone();
        self.executor
            .run(move |conn| Box::pin(insert_person_tree(conn, draft.clone())))
            .await
    }

    /// Retrieve one person with fully materialized children.
    ///
    /// Returns `Ok(None)` if the person does not exist.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn get(&self, id: i64) -> Result<Option<PersonRecord>> {
        let row = self
            .executor
            .run(move |conn| Box::pin(select_by_id(conn, id)))
            .await?;
        row.map(PersonRow::into_record).transpose()
    }

    /// Retrieve every person, newest first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<PersonRecord>> {
        let rows = self.executor.run(|conn| Box::pin(select_all(conn))).await?;
        rows.into_iter().map(PersonRow::into_record).collect()
    }

    /// Case-insensitive substring search on `full_name`, newest first.
    ///
    /// The needle is matched literally; ILIKE wildcards in it are escaped.
    /// Blank-query short-circuiting is the caller's concern.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn search_by_name(&self, needle: &str) -> Result<Vec<PersonRecord>> {
        let pattern = like_pattern(needle);
        let rows = self
            .executor
            .run(move |conn| Box::pin(search_rows(conn, pattern.clone())))
            .await?;
        rows.into_iter().map(PersonRow::into_record).collect()
    }

    /// Rewrite a person's scalar columns and replace its full child set in
    /// one transaction. `id` and `created_at` never change.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if no person has this id, or
    /// `AppError::Db` if the rewrite fails.
    pub async fn update(&self, id: i64, draft: &PersonDraft) -> Result<()> {
        let draft = draft.clone();
        let updated = self
            .executor
            .run(move |conn| Box::pin(update_person_tree(conn, id, draft.clone())))
            .await?;
        if updated {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("person {id} not found")))
        }
    }

    /// Delete a person and its children in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if no person has this id, or
    /// `AppError::Db` if the delete fails.
    pub async fn delete(&self, id: i64) -> Result<()> {
        let deleted = self
            .executor
            .run(move |conn| Box::pin(delete_person_tree(conn, id)))
            .await?;
        if deleted {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("person {id} not found")))
        }
    }

    /// Remove every person and child row in one transaction.
    ///
    /// Returns the number of persons removed.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if any delete fails.
    pub async fn delete_all(&self) -> Result<u64> {
        let removed = self
            .executor
            .run(|conn| Box::pin(delete_all_rows(conn)))
            .await?;
        info!(removed, "cleared all person records");
        Ok(removed)
    }
}

async fn insert_person_tree(conn: &mut PgConnection, draft: PersonDraft) -> sqlx::Result<i64> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO persons (full_name, father_name, mother_name, date_of_birth, gender,
           national_id, voter_number, permanent_address, present_address, profile_image,
           description)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
         RETURNING id",
    )
    .bind(&draft.full_name)
    .bind(&draft.father_name)
    .bind(&draft.mother_name)
    .bind(draft.date_of_birth)
    .bind(gender_str(draft.gender))
    .bind(&draft.national_id)
    .bind(&draft.voter_number)
    .bind(&draft.permanent_address)
    .bind(&draft.present_address)
    .bind(draft.profile_image.as_ref().map(Json))
    .bind(&draft.description)
    .fetch_one(&mut *conn)
    .await?;

    insert_children(conn, id, &draft).await?;
    Ok(id)
}

async fn insert_children(
    conn: &mut PgConnection,
    person_id: i64,
    draft: &PersonDraft,
) -> sqlx::Result<()> {
    for (kind, value) in draft.contact_rows() {
        sqlx::query("INSERT INTO contact_info (person_id, kind, value) VALUES ($1, $2, $3)")
            .bind(person_id)
            .bind(kind_str(kind))
            .bind(value)
            .execute(&mut *conn)
            .await?;
    }
    for url in &draft.pdf_urls {
        sqlx::query("INSERT INTO documents (person_id, url, kind) VALUES ($1, $2, 'pdf')")
            .bind(person_id)
            .bind(url)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

async fn select_by_id(conn: &mut PgConnection, id: i64) -> sqlx::Result<Option<PersonRow>> {
    let sql = format!("{RECORD_SELECT} WHERE p.id = $1");
    sqlx::query_as(&sql).bind(id).fetch_optional(&mut *conn).await
}

async fn select_all(conn: &mut PgConnection) -> sqlx::Result<Vec<PersonRow>> {
    let sql = format!("{RECORD_SELECT} {RECORD_ORDER}");
    sqlx::query_as(&sql).fetch_all(&mut *conn).await
}

async fn search_rows(conn: &mut PgConnection, pattern: String) -> sqlx::Result<Vec<PersonRow>> {
    let sql = format!("{RECORD_SELECT} WHERE p.full_name ILIKE $1 ESCAPE '\\' {RECORD_ORDER}");
    sqlx::query_as(&sql)
        .bind(pattern)
        .fetch_all(&mut *conn)
        .await
}

async fn update_person_tree(
    conn: &mut PgConnection,
    id: i64,
    draft: PersonDraft,
) -> sqlx::Result<bool> {
    let updated = sqlx::query(
        "UPDATE persons
            SET full_name = $1, father_name = $2, mother_name = $3, date_of_birth = $4,
                gender = $5, national_id = $6, voter_number = $7, permanent_address = $8,
                present_address = $9, profile_image = $10, description = $11
          WHERE id = $12",
    )
    .bind(&draft.full_name)
    .bind(&draft.father_name)
    .bind(&draft.mother_name)
    .bind(draft.date_of_birth)
    .bind(gender_str(draft.gender))
    .bind(&draft.national_id)
    .bind(&draft.voter_number)
    .bind(&draft.permanent_address)
    .bind(&draft.present_address)
    .bind(draft.profile_image.as_ref().map(Json))
    .bind(&draft.description)
    .bind(id)
    .execute(&mut *conn)
    .await?
    .rows_affected();

    if updated == 0 {
        return Ok(false);
    }

    delete_children(conn, id).await?;
    insert_children(conn, id, &draft).await?;
    Ok(true)
}

async fn delete_person_tree(conn: &mut PgConnection, id: i64) -> sqlx::Result<bool> {
    delete_children(conn, id).await?;
    let deleted = sqlx::query("DELETE FROM persons WHERE id = $1")
        .bind(id)
        .execute(&mut *conn)
        .await?
        .rows_affected();
    Ok(deleted > 0)
}

async fn delete_children(conn: &mut PgConnection, person_id: i64) -> sqlx::Result<()> {
    sqlx::query("DELETE FROM contact_info WHERE person_id = $1")
        .bind(person_id)
        .execute(&mut *conn)
        .await?;
    sqlx::query("DELETE FROM documents WHERE person_id = $1")
        .bind(person_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn delete_all_rows(conn: &mut PgConnection) -> sqlx::Result<u64> {
    sqlx::query("DELETE FROM contact_info")
        .execute(&mut *conn)
        .await?;
    sqlx::query("DELETE FROM documents")
        .execute(&mut *conn)
        .await?;
    let removed = sqlx::query("DELETE FROM persons")
        .execute(&mut *conn)
        .await?
        .rows_affected();
    Ok(removed)
}
