use anyhow::Context;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::{params, params_from_iter, Connection};

use crate::models::{
    Appointment, AppointmentStatus, BookingMethod, PatternKind, ProviderSummary, SlotKey,
    UserPattern,
};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ── Credits ──

pub fn get_credits(conn: &Connection, user_id: &str) -> anyhow::Result<Option<i64>> {
    let result = conn.query_row(
        "SELECT balance FROM credits WHERE user_id = ?1",
        params![user_id],
        |row| row.get(0),
    );

    match result {
        Ok(balance) => Ok(Some(balance)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn set_credits(conn: &Connection, user_id: &str, balance: i64) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO credits (user_id, balance) VALUES (?1, ?2)
         ON CONFLICT(user_id) DO UPDATE SET
           balance = excluded.balance,
           updated_at = datetime('now')",
        params![user_id, balance],
    )?;
    Ok(())
}

// ── Appointments ──

const APPOINTMENT_COLUMNS: &str = "id, user_id, provider_id, appointment_date, start_time, end_time, status, service_type, notes, booking_method, provider_name, provider_location, created_at";

pub fn create_appointment(
    conn: &Connection,
    appointment: &Appointment,
    idempotency_key: Option<&str>,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO appointments (id, user_id, provider_id, appointment_date, start_time, end_time, status, service_type, notes, booking_method, provider_name, provider_location, idempotency_key, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        params![
            appointment.id,
            appointment.user_id,
            appointment.provider_id,
            appointment.appointment_date.format(DATE_FORMAT).to_string(),
            appointment.start_time.format(TIME_FORMAT).to_string(),
            appointment.end_time.format(TIME_FORMAT).to_string(),
            appointment.status.as_str(),
            appointment.service_type,
            appointment.notes,
            appointment.booking_method.as_str(),
            appointment.provider.name,
            appointment.provider.location,
            idempotency_key,
            appointment.created_at.format(TIMESTAMP_FORMAT).to_string(),
        ],
    )?;
    Ok(())
}

pub fn delete_appointment(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM appointments WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

pub fn get_appointments_for_user(
    conn: &Connection,
    user_id: &str,
) -> anyhow::Result<Vec<Appointment>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments
         WHERE user_id = ?1 ORDER BY appointment_date ASC, start_time ASC"
    ))?;

    let rows = stmt.query_map(params![user_id], |row| Ok(parse_appointment_row(row)))?;

    let mut appointments = vec![];
    for row in rows {
        appointments.push(row??);
    }
    Ok(appointments)
}

pub fn get_appointment_by_idempotency_key(
    conn: &Connection,
    user_id: &str,
    key: &str,
) -> anyhow::Result<Option<Appointment>> {
    let result = conn.query_row(
        &format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM appointments
             WHERE user_id = ?1 AND idempotency_key = ?2"
        ),
        params![user_id, key],
        |row| Ok(parse_appointment_row(row)),
    );

    match result {
        Ok(appointment) => Ok(Some(appointment?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_booked_slots(
    conn: &Connection,
    provider_ids: &[String],
    from: NaiveDate,
    to: NaiveDate,
) -> anyhow::Result<Vec<SlotKey>> {
    if provider_ids.is_empty() {
        return Ok(vec![]);
    }

    let placeholders = (0..provider_ids.len())
        .map(|i| format!("?{}", i + 3))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "SELECT provider_id, appointment_date, start_time FROM appointments
         WHERE status = 'scheduled' AND appointment_date >= ?1 AND appointment_date <= ?2
           AND provider_id IN ({placeholders})"
    );

    let mut values = vec![
        from.format(DATE_FORMAT).to_string(),
        to.format(DATE_FORMAT).to_string(),
    ];
    values.extend(provider_ids.iter().cloned());

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(values.iter()), |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
        ))
    })?;

    let mut slots = vec![];
    for row in rows {
        let (provider_id, date, start) = row?;
        slots.push(SlotKey {
            provider_id,
            date: NaiveDate::parse_from_str(&date, DATE_FORMAT)?,
            start_time: NaiveTime::parse_from_str(&start, TIME_FORMAT)?,
        });
    }
    Ok(slots)
}

fn parse_appointment_row(row: &rusqlite::Row) -> anyhow::Result<Appointment> {
    let date_str: String = row.get(3)?;
    let start_str: String = row.get(4)?;
    let end_str: String = row.get(5)?;
    let status_str: String = row.get(6)?;
    let method_str: String = row.get(9)?;
    let created_at_str: String = row.get(12)?;

    let created_at = NaiveDateTime::parse_from_str(&created_at_str, TIMESTAMP_FORMAT)
        .with_context(|| format!("invalid created_at: {created_at_str}"))?;

    Ok(Appointment {
        id: row.get(0)?,
        user_id: row.get(1)?,
        provider_id: row.get(2)?,
        appointment_date: NaiveDate::parse_from_str(&date_str, DATE_FORMAT)?,
        start_time: NaiveTime::parse_from_str(&start_str, TIME_FORMAT)?,
        end_time: NaiveTime::parse_from_str(&end_str, TIME_FORMAT)?,
        status: AppointmentStatus::parse(&status_str)
            .with_context(|| format!("unknown appointment status: {status_str}"))?,
        service_type: row.get(7)?,
        notes: row.get(8)?,
        booking_method: BookingMethod::parse(&method_str)
            .with_context(|| format!("unknown booking method: {method_str}"))?,
        created_at,
        provider: ProviderSummary {
            name: row.get(10)?,
            location: row.get(11)?,
        },
    })
}

// ── User Patterns ──

const PATTERN_COLUMNS: &str =
    "user_id, pattern_type, pattern_data, confidence_score, usage_count, last_used";

pub fn get_pattern(
    conn: &Connection,
    user_id: &str,
    kind: PatternKind,
) -> anyhow::Result<Option<UserPattern>> {
    let result = conn.query_row(
        &format!("SELECT {PATTERN_COLUMNS} FROM user_patterns WHERE user_id = ?1 AND pattern_type = ?2"),
        params![user_id, kind.as_str()],
        |row| Ok(parse_pattern_row(row)),
    );

    match result {
        Ok(pattern) => Ok(pattern?),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn save_pattern(conn: &Connection, pattern: &UserPattern) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO user_patterns (user_id, pattern_type, pattern_data, confidence_score, usage_count, last_used)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(user_id, pattern_type) DO UPDATE SET
           pattern_data = excluded.pattern_data,
           confidence_score = excluded.confidence_score,
           usage_count = excluded.usage_count,
           last_used = excluded.last_used",
        params![
            pattern.user_id,
            pattern.pattern_type.as_str(),
            serde_json::to_string(&pattern.pattern_data)?,
            pattern.confidence_score,
            pattern.usage_count,
            pattern.last_used.format(TIMESTAMP_FORMAT).to_string(),
        ],
    )?;
    Ok(())
}

pub fn get_patterns_for_user(conn: &Connection, user_id: &str) -> anyhow::Result<Vec<UserPattern>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PATTERN_COLUMNS} FROM user_patterns
         WHERE user_id = ?1 ORDER BY confidence_score DESC"
    ))?;

    let rows = stmt.query_map(params![user_id], |row| Ok(parse_pattern_row(row)))?;

    let mut patterns = vec![];
    for row in rows {
        // Rows with an unknown pattern_type are skipped.
        if let Some(pattern) = row?? {
            patterns.push(pattern);
        }
    }
    Ok(patterns)
}

fn parse_pattern_row(row: &rusqlite::Row) -> anyhow::Result<Option<UserPattern>> {
    let kind_str: String = row.get(1)?;
    let Some(pattern_type) = PatternKind::parse(&kind_str) else {
        tracing::warn!(pattern_type = %kind_str, "ignoring unknown pattern type");
        return Ok(None);
    };

    let data_str: String = row.get(2)?;
    let last_used_str: String = row.get(5)?;

    Ok(Some(UserPattern {
        user_id: row.get(0)?,
        pattern_type,
        pattern_data: serde_json::from_str(&data_str)
            .with_context(|| format!("invalid pattern_data for {kind_str}"))?,
        confidence_score: row.get(3)?,
        usage_count: row.get(4)?,
        last_used: NaiveDateTime::parse_from_str(&last_used_str, TIMESTAMP_FORMAT)
            .with_context(|| format!("invalid last_used: {last_used_str}"))?,
    }))
}
