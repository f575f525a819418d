pub const EVENT_INSERT: &str = r#"
    INSERT INTO monitoring_events (
        id, patient_id, medication_order_id, test_type, performed_date,
        value, unit, interpretation, attachment_url, source_system,
        source_id, recorded_by, abnormal_flag, abnormal_reason_code,
        reviewed_status, reviewed_by, reviewed_at
    )
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
"#;

pub const EVENT_UPDATE: &str = r#"
    UPDATE monitoring_events
    SET value = $2, unit = $3, interpretation = $4, attachment_url = $5,
        source_id = $6, abnormal_flag = $7, abnormal_reason_code = $8,
        reviewed_status = $9, reviewed_by = $10, reviewed_at = $11
    WHERE id = $1
"#;

pub const EVENT_FIND_BY_ID: &str = r#"
    SELECT id, patient_id, medication_order_id, test_type, performed_date,
           value, unit, interpretation, attachment_url, source_system,
           source_id, recorded_by, abnormal_flag, abnormal_reason_code,
           reviewed_status, reviewed_by, reviewed_at
    FROM monitoring_events
    WHERE id = $1
"#;

pub const EVENT_FIND_BY_SOURCE: &str = r#"
    SELECT id, patient_id, medication_order_id, test_type, performed_date,
           value, unit, interpretation, attachment_url, source_system,
           source_id, recorded_by, abnormal_flag, abnormal_reason_code,
           reviewed_status, reviewed_by, reviewed_at
    FROM monitoring_events
    WHERE source_system = $1 AND source_id = $2
    LIMIT 1
"#;

pub const EVENT_FIND_NATURAL: &str = r#"
    SELECT id, patient_id, medication_order_id, test_type, performed_date,
           value, unit, interpretation, attachment_url, source_system,
           source_id, recorded_by, abnormal_flag, abnormal_reason_code,
           reviewed_status, reviewed_by, reviewed_at
    FROM monitoring_events
    WHERE patient_id = $1 AND test_type = $2 AND performed_date = $3
    LIMIT 1
"#;

pub const EVENT_LIST_FOR_PATIENT: &str = r#"
    SELECT id, patient_id, medication_order_id, test_type, performed_date,
           value, unit, interpretation, attachment_url, source_system,
           source_id, recorded_by, abnormal_flag, abnormal_reason_code,
           reviewed_status, reviewed_by, reviewed_at
    FROM monitoring_events
    WHERE patient_id = $1
    ORDER BY performed_date ASC
"#;

pub const EVENT_LIST_ALL: &str = r#"
    SELECT id, patient_id, medication_order_id, test_type, performed_date,
           value, unit, interpretation, attachment_url, source_system,
           source_id, recorded_by, abnormal_flag, abnormal_reason_code,
           reviewed_status, reviewed_by, reviewed_at
    FROM monitoring_events
    WHERE ($1::uuid[] IS NULL OR patient_id = ANY($1))
    ORDER BY performed_date ASC
"#;
