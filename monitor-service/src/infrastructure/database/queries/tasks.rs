pub const TASK_SELECT_FIELDS: &str = r#"
    id, patient_id, medication_order_id, test_type, due_date, status,
    assigned_to, completed_at, waived_reason, waived_until
"#;

pub const TASK_INSERT: &str = r#"
    INSERT INTO monitoring_tasks (
        id, patient_id, medication_order_id, test_type, due_date, status,
        assigned_to, completed_at, waived_reason, waived_until
    )
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
"#;

pub const TASK_UPDATE: &str = r#"
    UPDATE monitoring_tasks
    SET due_date = $2, status = $3, assigned_to = $4, completed_at = $5,
        waived_reason = $6, waived_until = $7
    WHERE id = $1
"#;

pub const TASK_FIND_BY_ID: &str = r#"
    SELECT id, patient_id, medication_order_id, test_type, due_date, status,
           assigned_to, completed_at, waived_reason, waived_until
    FROM monitoring_tasks
    WHERE id = $1
"#;

/// The reconcile lookup: one logical task per
/// (patient, medication, test type, due date window).
pub const TASK_FIND_MATCHING: &str = r#"
    SELECT id, patient_id, medication_order_id, test_type, due_date, status,
           assigned_to, completed_at, waived_reason, waived_until
    FROM monitoring_tasks
    WHERE patient_id = $1
      AND medication_order_id = $2
      AND test_type = $3
      AND due_date >= $4
      AND due_date <= $5
    LIMIT 1
"#;

pub const TASK_LIST_FOR_PATIENT_WITH_STATUSES: &str = r#"
    SELECT id, patient_id, medication_order_id, test_type, due_date, status,
           assigned_to, completed_at, waived_reason, waived_until
    FROM monitoring_tasks
    WHERE patient_id = $1 AND status = ANY($2)
    ORDER BY due_date ASC
"#;

pub const TASK_LIST_WITH_STATUS: &str = r#"
    SELECT id, patient_id, medication_order_id, test_type, due_date, status,
           assigned_to, completed_at, waived_reason, waived_until
    FROM monitoring_tasks
    WHERE status = $1
    ORDER BY due_date ASC
"#;

pub const TASK_MARK_DUE_OVERDUE: &str = r#"
    UPDATE monitoring_tasks
    SET status = 'OVERDUE'
    WHERE status = 'DUE' AND due_date < $1
"#;

pub const TASK_EXPIRED_WAIVERS: &str = r#"
    SELECT id, patient_id, medication_order_id, test_type, due_date, status,
           assigned_to, completed_at, waived_reason, waived_until
    FROM monitoring_tasks
    WHERE status = 'WAIVED' AND waived_until IS NOT NULL AND waived_until < $1
"#;

pub const TASK_EARLIEST_OPEN_ASSIGNED: &str = r#"
    SELECT id, patient_id, medication_order_id, test_type, due_date, status,
           assigned_to, completed_at, waived_reason, waived_until
    FROM monitoring_tasks
    WHERE patient_id = $1
      AND status IN ('DUE', 'OVERDUE')
      AND assigned_to IS NOT NULL
    ORDER BY due_date ASC
    LIMIT 1
"#;

pub const TASK_WORKLIST: &str = r#"
    SELECT t.id AS task_id,
           t.patient_id,
           p.pseudonym,
           m.drug_name,
           m.start_date,
           COALESCE((m.flags ->> 'is_hdat')::boolean, false) AS hdat,
           t.test_type,
           t.due_date,
           t.assigned_to,
           t.status
    FROM monitoring_tasks t
    JOIN medication_orders m ON m.id = t.medication_order_id
    JOIN patients p ON p.id = t.patient_id
    WHERE ($1::text IS NULL OR t.status = $1)
      AND ($2::text IS NULL OR m.drug_category = $2)
    ORDER BY t.due_date ASC
"#;
