/// Dedup rides on the unique index over dedupe_key: concurrent creates
/// resolve to one winner and the losers insert nothing.
pub const NOTIFICATION_INSERT_IF_ABSENT: &str = r#"
    INSERT INTO in_app_notifications (
        id, recipient_type, recipient_id, notification_type, priority,
        status, title, message, payload, patient_id, task_id, event_id,
        dedupe_key, viewed_at, acked_at, created_at
    )
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
    ON CONFLICT (dedupe_key) DO NOTHING
"#;

pub const NOTIFICATION_UPDATE: &str = r#"
    UPDATE in_app_notifications
    SET status = $2, viewed_at = $3, acked_at = $4
    WHERE id = $1
"#;

pub const NOTIFICATION_FIND_BY_ID: &str = r#"
    SELECT id, recipient_type, recipient_id, notification_type, priority,
           status, title, message, payload, patient_id, task_id, event_id,
           dedupe_key, viewed_at, acked_at, created_at
    FROM in_app_notifications
    WHERE id = $1
"#;

pub const NOTIFICATION_FIND_BY_DEDUPE_KEY: &str = r#"
    SELECT id, recipient_type, recipient_id, notification_type, priority,
           status, title, message, payload, patient_id, task_id, event_id,
           dedupe_key, viewed_at, acked_at, created_at
    FROM in_app_notifications
    WHERE dedupe_key = $1
"#;

pub const NOTIFICATION_LIST_VISIBLE: &str = r#"
    SELECT id, recipient_type, recipient_id, notification_type, priority,
           status, title, message, payload, patient_id, task_id, event_id,
           dedupe_key, viewed_at, acked_at, created_at
    FROM in_app_notifications
    WHERE ((recipient_type = 'USER' AND recipient_id = $1)
        OR (recipient_type = 'TEAM' AND recipient_id = ANY($2)))
      AND ($3::text IS NULL OR status = $3)
      AND ($4::text IS NULL OR priority = $4)
      AND ($5::uuid IS NULL OR patient_id = $5)
      AND (NOT $6 OR status = 'UNREAD')
    ORDER BY created_at DESC
    LIMIT $7 OFFSET $8
"#;
