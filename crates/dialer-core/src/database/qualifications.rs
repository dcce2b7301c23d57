//! Qualification group and qualification database operations

use sqlx::SqliteConnection;

use super::rows::{QualificationGroupRow, QualificationRow};
use crate::error::Result;
use crate::model::{Qualification, QualificationGroup};

pub async fn insert_group(conn: &mut SqliteConnection, group: &QualificationGroup) -> Result<()> {
    sqlx::query("INSERT INTO qualification_groups (id, name, created_at) VALUES (?1, ?2, ?3)")
        .bind(&group.id)
        .bind(&group.name)
        .bind(group.created_at)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn fetch_group(conn: &mut SqliteConnection, group_id: &str) -> Result<Option<QualificationGroup>> {
    let row = sqlx::query_as::<_, QualificationGroupRow>(
        "SELECT id, name, created_at FROM qualification_groups WHERE id = ?1",
    )
    .bind(group_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(QualificationGroup::from))
}

pub async fn insert_qualification(conn: &mut SqliteConnection, qualification: &Qualification) -> Result<()> {
    sqlx::query(
        "INSERT INTO qualifications (id, group_id, label, qualification_type, is_recyclable, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )
    .bind(&qualification.id)
    .bind(&qualification.group_id)
    .bind(&qualification.label)
    .bind(qualification.qualification_type.as_str())
    .bind(qualification.is_recyclable)
    .bind(qualification.created_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn fetch_qualification(conn: &mut SqliteConnection, qualification_id: &str) -> Result<Option<Qualification>> {
    let row = sqlx::query_as::<_, QualificationRow>(
        "SELECT id, group_id, label, qualification_type, is_recyclable, created_at
         FROM qualifications WHERE id = ?1",
    )
    .bind(qualification_id)
    .fetch_optional(&mut *conn)
    .await?;

    row.map(Qualification::try_from).transpose()
}

pub async fn list_group_qualifications(conn: &mut SqliteConnection, group_id: &str) -> Result<Vec<Qualification>> {
    let rows = sqlx::query_as::<_, QualificationRow>(
        "SELECT id, group_id, label, qualification_type, is_recyclable, created_at
         FROM qualifications WHERE group_id = ?1 ORDER BY created_at ASC, rowid ASC",
    )
    .bind(group_id)
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter().map(Qualification::try_from).collect()
}
