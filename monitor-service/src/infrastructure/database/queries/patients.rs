/// Patient columns joined with the optional risk-flag row.
pub const PATIENT_SELECT_WITH_FLAGS: &str = r#"
    SELECT p.id, p.pseudonym, p.sex, p.age_band, p.ethnicity, p.service,
           f.ecg_indicated, f.cv_risk_present, f.family_history_cvd,
           f.inpatient_admission, f.attested_by, f.attested_at
    FROM patients p
    LEFT JOIN patient_risk_flags f ON f.patient_id = p.id
"#;

pub const PATIENT_INSERT: &str = r#"
    INSERT INTO patients (id, pseudonym, sex, age_band, ethnicity, service)
    VALUES ($1, $2, $3, $4, $5, $6)
"#;

pub const PATIENT_UPDATE: &str = r#"
    UPDATE patients
    SET sex = $2, age_band = $3, ethnicity = $4, service = $5
    WHERE id = $1
"#;

pub const RISK_FLAGS_UPSERT: &str = r#"
    INSERT INTO patient_risk_flags (
        id, patient_id, ecg_indicated, cv_risk_present, family_history_cvd,
        inpatient_admission, attested_by, attested_at
    )
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
    ON CONFLICT (patient_id) DO UPDATE
        SET ecg_indicated = EXCLUDED.ecg_indicated,
            cv_risk_present = EXCLUDED.cv_risk_present,
            family_history_cvd = EXCLUDED.family_history_cvd,
            inpatient_admission = EXCLUDED.inpatient_admission,
            attested_by = EXCLUDED.attested_by,
            attested_at = EXCLUDED.attested_at
"#;

pub const TRACKED_PATIENT_UPSERT: &str = r#"
    INSERT INTO tracked_patients (
        id, patient_id, source_system, requested_by, request_count,
        first_requested_at, last_requested_at
    )
    VALUES ($1, $2, $3, $4, 1, now(), now())
    ON CONFLICT (patient_id) DO UPDATE
        SET request_count = tracked_patients.request_count + 1,
            last_requested_at = now(),
            source_system = EXCLUDED.source_system,
            requested_by = COALESCE(EXCLUDED.requested_by, tracked_patients.requested_by)
"#;

pub const TRACKED_PATIENT_IDS: &str = r#"
    SELECT patient_id FROM tracked_patients
"#;
