pub const AUDIT_INSERT: &str = r#"
    INSERT INTO audit_events (
        id, actor, action, entity_type, entity_id, request_id, ip_address,
        details, timestamp
    )
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
"#;
