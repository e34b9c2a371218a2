use rusqlite::{Connection, OptionalExtension, Row};
use std::path::Path;

use crate::model::{Field, Partition, Record};

/// A student. `active_partition` is NULL once the owner has left the
/// roster (promoted out of Class 6 or removed as a person).
pub struct Owner {
    pub owner_id: String,
    pub name: String,
    pub active_partition: Option<Partition>,
}

pub fn open_store(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join("gradebook.sqlite3");
    let conn = Connection::open(db_path)?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS owners(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            active_partition TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS records(
            id TEXT PRIMARY KEY,
            owner_id TEXT NOT NULL,
            partition TEXT NOT NULL,
            subject TEXT NOT NULL,
            score INTEGER NOT NULL,
            term TEXT NOT NULL,
            teacher_name TEXT NOT NULL,
            entry_date TEXT NOT NULL,
            active INTEGER NOT NULL DEFAULT 1,
            FOREIGN KEY(owner_id) REFERENCES owners(id)
        )",
        [],
    )?;

    // Existing workspaces may predate the roster-only delete scope. Add
    // the column and treat every stored row as active.
    ensure_records_active(&conn)?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_records_partition ON records(partition, active)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_records_owner ON records(owner_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS prefs(
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        [],
    )?;

    Ok(conn)
}

fn ensure_records_active(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "records", "active")? {
        return Ok(());
    }
    conn.execute(
        "ALTER TABLE records ADD COLUMN active INTEGER NOT NULL DEFAULT 1",
        [],
    )?;
    Ok(())
}

fn record_from_row(row: &Row) -> rusqlite::Result<Record> {
    let partition: String = row.get(3)?;
    Ok(Record {
        record_id: row.get(0)?,
        owner_id: row.get(1)?,
        owner_name: row.get(2)?,
        partition: Partition::parse(&partition).map_err(|_| {
            rusqlite::Error::FromSqlConversionFailure(
                3,
                rusqlite::types::Type::Text,
                format!("unknown partition: {partition}").into(),
            )
        })?,
        subject: row.get(4)?,
        score: row.get(5)?,
        term: row.get(6)?,
        teacher_name: row.get(7)?,
        entry_date: row.get(8)?,
    })
}

const RECORD_COLUMNS: &str = "r.id, r.owner_id, o.name, r.partition, r.subject, r.score, r.term, r.teacher_name, r.entry_date";

/// Active rows of one partition, unordered; the caller sorts by the
/// persisted key.
pub fn query_partition(conn: &Connection, partition: Partition) -> anyhow::Result<Vec<Record>> {
    let sql = format!(
        "SELECT {RECORD_COLUMNS} FROM records r JOIN owners o ON o.id = r.owner_id
         WHERE r.partition = ? AND r.active = 1"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([partition.as_str()], record_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn get_record(conn: &Connection, record_id: &str) -> anyhow::Result<Option<Record>> {
    let sql = format!(
        "SELECT {RECORD_COLUMNS} FROM records r JOIN owners o ON o.id = r.owner_id
         WHERE r.id = ?"
    );
    let record = conn
        .query_row(&sql, [record_id], record_from_row)
        .optional()?;
    Ok(record)
}

/// Inserts a snapshot, ignoring rows whose id already exists. Returns the
/// number of rows written (0 means the id was already present).
pub fn insert_record(conn: &Connection, record: &Record) -> anyhow::Result<usize> {
    let n = conn.execute(
        "INSERT OR IGNORE INTO records(id, owner_id, partition, subject, score, term, teacher_name, entry_date, active)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?, 1)",
        (
            &record.record_id,
            &record.owner_id,
            record.partition.as_str(),
            &record.subject,
            record.score,
            &record.term,
            &record.teacher_name,
            &record.entry_date,
        ),
    )?;
    Ok(n)
}

/// Single-field update. Non-numeric score input collapses to 0 rather
/// than failing the edit.
pub fn update_record_field(
    conn: &Connection,
    record_id: &str,
    field: Field,
    value: &str,
) -> anyhow::Result<usize> {
    let n = match field {
        Field::Subject => conn.execute(
            "UPDATE records SET subject = ? WHERE id = ?",
            (value, record_id),
        )?,
        Field::Score => conn.execute(
            "UPDATE records SET score = ? WHERE id = ?",
            (value.parse::<i64>().unwrap_or(0), record_id),
        )?,
        Field::Term => conn.execute(
            "UPDATE records SET term = ? WHERE id = ?",
            (value, record_id),
        )?,
        Field::Teacher => conn.execute(
            "UPDATE records SET teacher_name = ? WHERE id = ?",
            (value, record_id),
        )?,
    };
    Ok(n)
}

pub fn delete_record(conn: &Connection, record_id: &str) -> anyhow::Result<usize> {
    let n = conn.execute("DELETE FROM records WHERE id = ?", [record_id])?;
    Ok(n)
}

pub fn set_record_active(conn: &Connection, record_id: &str, active: bool) -> anyhow::Result<usize> {
    let n = conn.execute(
        "UPDATE records SET active = ? WHERE id = ?",
        (active as i64, record_id),
    )?;
    Ok(n)
}

pub fn record_exists(conn: &Connection, record_id: &str) -> anyhow::Result<bool> {
    let id: Option<String> = conn
        .query_row("SELECT id FROM records WHERE id = ?", [record_id], |r| {
            r.get(0)
        })
        .optional()?;
    Ok(id.is_some())
}

pub fn update_record_partition(
    conn: &Connection,
    record_id: &str,
    partition: Partition,
) -> anyhow::Result<usize> {
    let n = conn.execute(
        "UPDATE records SET partition = ? WHERE id = ?",
        (partition.as_str(), record_id),
    )?;
    Ok(n)
}

/// Ids of an owner's active rows within one partition, used by promote.
pub fn owner_record_ids(
    conn: &Connection,
    owner_id: &str,
    partition: Partition,
) -> anyhow::Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT id FROM records WHERE owner_id = ? AND partition = ? AND active = 1",
    )?;
    let ids = stmt
        .query_map((owner_id, partition.as_str()), |r| r.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ids)
}

pub fn find_owner(conn: &Connection, owner_id: &str) -> anyhow::Result<Option<Owner>> {
    let owner = conn
        .query_row(
            "SELECT id, name, active_partition FROM owners WHERE id = ?",
            [owner_id],
            |row| {
                let partition: Option<String> = row.get(2)?;
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, partition))
            },
        )
        .optional()?;

    match owner {
        None => Ok(None),
        Some((owner_id, name, partition)) => {
            let active_partition = match partition {
                None => None,
                Some(p) => Some(Partition::parse(&p).map_err(anyhow::Error::from)?),
            };
            Ok(Some(Owner {
                owner_id,
                name,
                active_partition,
            }))
        }
    }
}

/// Creates the owner row if missing; an existing row keeps its partition
/// and only refreshes the display name.
pub fn upsert_owner(
    conn: &Connection,
    owner_id: &str,
    name: &str,
    partition: Partition,
) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO owners(id, name, active_partition) VALUES(?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET name = excluded.name",
        (owner_id, name, partition.as_str()),
    )?;
    Ok(())
}

pub fn set_owner_partition(
    conn: &Connection,
    owner_id: &str,
    partition: Option<Partition>,
) -> anyhow::Result<usize> {
    let n = conn.execute(
        "UPDATE owners SET active_partition = ? WHERE id = ?",
        (partition.map(|p| p.as_str()), owner_id),
    )?;
    Ok(n)
}

pub fn update_owner_name(conn: &Connection, owner_id: &str, name: &str) -> anyhow::Result<usize> {
    let n = conn.execute(
        "UPDATE owners SET name = ? WHERE id = ?",
        (name, owner_id),
    )?;
    Ok(n)
}

/// Bulk rename of a teacher across every partition. Returns the affected
/// `(partition, record_id)` pairs so loaded models can patch in place and
/// flag pending reloads.
pub fn rename_teacher(
    conn: &Connection,
    old_name: &str,
    new_name: &str,
) -> anyhow::Result<Vec<(Partition, String)>> {
    let affected = collect_rename_targets(conn, "teacher_name", old_name)?;
    conn.execute(
        "UPDATE records SET teacher_name = ? WHERE teacher_name = ? AND active = 1",
        (new_name, old_name),
    )?;
    Ok(affected)
}

/// Bulk rename of a subject across every partition; same contract as
/// `rename_teacher`.
pub fn rename_subject(
    conn: &Connection,
    old_name: &str,
    new_name: &str,
) -> anyhow::Result<Vec<(Partition, String)>> {
    let affected = collect_rename_targets(conn, "subject", old_name)?;
    conn.execute(
        "UPDATE records SET subject = ? WHERE subject = ? AND active = 1",
        (new_name, old_name),
    )?;
    Ok(affected)
}

fn collect_rename_targets(
    conn: &Connection,
    column: &str,
    value: &str,
) -> anyhow::Result<Vec<(Partition, String)>> {
    let sql = format!(
        "SELECT partition, id FROM records WHERE {column} = ? AND active = 1"
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([value])?;
    let mut affected = Vec::new();
    while let Some(row) = rows.next()? {
        let partition: String = row.get(0)?;
        let id: String = row.get(1)?;
        affected.push((
            Partition::parse(&partition).map_err(anyhow::Error::from)?,
            id,
        ));
    }
    Ok(affected)
}

pub fn get_pref(conn: &Connection, key: &str) -> anyhow::Result<Option<String>> {
    let value = conn
        .query_row("SELECT value FROM prefs WHERE key = ?", [key], |r| r.get(0))
        .optional()?;
    Ok(value)
}

pub fn set_pref(conn: &Connection, key: &str, value: &str) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO prefs(key, value) VALUES(?, ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        (key, value),
    )?;
    Ok(())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}
