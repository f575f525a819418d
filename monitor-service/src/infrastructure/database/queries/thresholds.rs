pub const THRESHOLD_UPSERT: &str = r#"
    INSERT INTO reference_thresholds (
        id, monitoring_type, unit, comparator_type, sex, age_band,
        source_system_scope, low_critical, low_warning, high_warning,
        high_critical, coded_abnormal_values, enabled, version, updated_by
    )
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
    ON CONFLICT (id) DO UPDATE
        SET monitoring_type = EXCLUDED.monitoring_type,
            unit = EXCLUDED.unit,
            comparator_type = EXCLUDED.comparator_type,
            sex = EXCLUDED.sex,
            age_band = EXCLUDED.age_band,
            source_system_scope = EXCLUDED.source_system_scope,
            low_critical = EXCLUDED.low_critical,
            low_warning = EXCLUDED.low_warning,
            high_warning = EXCLUDED.high_warning,
            high_critical = EXCLUDED.high_critical,
            coded_abnormal_values = EXCLUDED.coded_abnormal_values,
            enabled = EXCLUDED.enabled,
            version = EXCLUDED.version,
            updated_by = EXCLUDED.updated_by
"#;

pub const THRESHOLD_FIND_BY_ID: &str = r#"
    SELECT id, monitoring_type, unit, comparator_type, sex, age_band,
           source_system_scope, low_critical, low_warning, high_warning,
           high_critical, coded_abnormal_values, enabled, version, updated_by
    FROM reference_thresholds
    WHERE id = $1
"#;

pub const THRESHOLD_ENABLED_FOR_TYPE: &str = r#"
    SELECT id, monitoring_type, unit, comparator_type, sex, age_band,
           source_system_scope, low_critical, low_warning, high_warning,
           high_critical, coded_abnormal_values, enabled, version, updated_by
    FROM reference_thresholds
    WHERE monitoring_type = $1 AND enabled
"#;
