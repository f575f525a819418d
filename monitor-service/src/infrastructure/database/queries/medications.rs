pub const MEDICATION_INSERT: &str = r#"
    INSERT INTO medication_orders (
        id, patient_id, drug_name, drug_category, start_date, stop_date,
        dose, route, frequency, flags, source_system, source_id
    )
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
"#;

pub const MEDICATION_UPDATE: &str = r#"
    UPDATE medication_orders
    SET drug_name = $2, drug_category = $3, start_date = $4, stop_date = $5,
        dose = $6, route = $7, frequency = $8, flags = $9,
        source_system = $10, source_id = $11
    WHERE id = $1
"#;

pub const MEDICATION_FIND_BY_ID: &str = r#"
    SELECT id, patient_id, drug_name, drug_category, start_date, stop_date,
           dose, route, frequency, flags, source_system, source_id
    FROM medication_orders
    WHERE id = $1
"#;

pub const MEDICATION_FIND_BY_SOURCE: &str = r#"
    SELECT id, patient_id, drug_name, drug_category, start_date, stop_date,
           dose, route, frequency, flags, source_system, source_id
    FROM medication_orders
    WHERE source_system = $1 AND source_id = $2
    LIMIT 1
"#;

pub const MEDICATION_FIND_NATURAL: &str = r#"
    SELECT id, patient_id, drug_name, drug_category, start_date, stop_date,
           dose, route, frequency, flags, source_system, source_id
    FROM medication_orders
    WHERE patient_id = $1 AND drug_name = $2 AND start_date = $3
    LIMIT 1
"#;

pub const MEDICATION_LIST_FOR_PATIENT: &str = r#"
    SELECT id, patient_id, drug_name, drug_category, start_date, stop_date,
           dose, route, frequency, flags, source_system, source_id
    FROM medication_orders
    WHERE patient_id = $1
    ORDER BY start_date ASC
"#;

pub const MEDICATION_LIST_ALL: &str = r#"
    SELECT id, patient_id, drug_name, drug_category, start_date, stop_date,
           dose, route, frequency, flags, source_system, source_id
    FROM medication_orders
    WHERE ($1::uuid[] IS NULL OR patient_id = ANY($1))
    ORDER BY start_date ASC
"#;
