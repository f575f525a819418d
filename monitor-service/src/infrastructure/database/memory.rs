//! In-memory repository backend for tests and single-node local runs.
//! Mirrors the Postgres implementations' semantics, including the unique
//! constraints on pseudonyms and notification dedupe keys.

use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use shared::{AppError, AppResult, AuditRecord};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::models::{
    DrugCategory, InAppNotification, MedicationOrder, MonitoringEvent, MonitoringTask, Patient,
    RecipientType, RiskFlags, RulesetVersion, ReferenceThreshold, TaskStatus, TrackedPatient,
    WorklistRow,
};
use crate::domain::repositories::{
    AuditRepository, EventRepository, MedicationRepository, NotificationFilter,
    NotificationRepository, PatientRepository, RulesetRepository, TaskRepository,
    ThresholdRepository,
};

#[derive(Default)]
struct Inner {
    patients: HashMap<Uuid, Patient>,
    medications: HashMap<Uuid, MedicationOrder>,
    tasks: HashMap<Uuid, MonitoringTask>,
    events: HashMap<Uuid, MonitoringEvent>,
    notifications: HashMap<Uuid, InAppNotification>,
    thresholds: HashMap<Uuid, ReferenceThreshold>,
    rulesets: Vec<RulesetVersion>,
    tracked: HashMap<Uuid, TrackedPatient>,
    audit: Vec<AuditRecord>,
}

#[derive(Default)]
pub struct InMemoryDatabase {
    inner: RwLock<Inner>,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test visibility into the audit trail.
    pub async fn audit_records(&self) -> Vec<AuditRecord> {
        self.inner.read().await.audit.clone()
    }

    /// Test visibility into task counts.
    pub async fn task_count(&self) -> usize {
        self.inner.read().await.tasks.len()
    }

    /// Test visibility into stored notifications.
    pub async fn notification_count(&self) -> usize {
        self.inner.read().await.notifications.len()
    }
}

#[async_trait::async_trait]
impl PatientRepository for InMemoryDatabase {
    async fn insert(&self, patient: &Patient) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        if inner
            .patients
            .values()
            .any(|p| p.pseudonym == patient.pseudonym)
        {
            return Err(AppError::Conflict(format!(
                "pseudonym {} already exists",
                patient.pseudonym
            )));
        }
        inner.patients.insert(patient.id, patient.clone());
        Ok(())
    }

    async fn update(&self, patient: &Patient) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        if !inner.patients.contains_key(&patient.id) {
            return Err(AppError::NotFound(format!("patient {}", patient.id)));
        }
        inner.patients.insert(patient.id, patient.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Patient>> {
        Ok(self.inner.read().await.patients.get(&id).cloned())
    }

    async fn find_by_pseudonym(&self, pseudonym: &str) -> AppResult<Option<Patient>> {
        Ok(self
            .inner
            .read()
            .await
            .patients
            .values()
            .find(|p| p.pseudonym == pseudonym)
            .cloned())
    }

    async fn upsert_risk_flags(&self, patient_id: Uuid, flags: &RiskFlags) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        let patient = inner
            .patients
            .get_mut(&patient_id)
            .ok_or_else(|| AppError::NotFound(format!("patient {patient_id}")))?;
        patient.risk_flags = Some(flags.clone());
        Ok(())
    }

    async fn list_all(&self, patient_ids: Option<&[Uuid]>) -> AppResult<Vec<Patient>> {
        let inner = self.inner.read().await;
        let mut patients: Vec<Patient> = inner
            .patients
            .values()
            .filter(|p| patient_ids.is_none_or(|ids| ids.contains(&p.id)))
            .cloned()
            .collect();
        patients.sort_by(|a, b| a.pseudonym.cmp(&b.pseudonym));
        Ok(patients)
    }

    async fn track_patient(
        &self,
        patient_id: Uuid,
        source_system: &str,
        requested_by: Option<&str>,
    ) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        match inner
            .tracked
            .values_mut()
            .find(|t| t.patient_id == patient_id)
        {
            Some(tracked) => {
                tracked.request_count += 1;
                tracked.last_requested_at = Utc::now();
                tracked.source_system = Some(source_system.to_string());
                if requested_by.is_some() {
                    tracked.requested_by = requested_by.map(str::to_string);
                }
            }
            None => {
                let tracked = TrackedPatient::new(
                    patient_id,
                    Some(source_system.to_string()),
                    requested_by.map(str::to_string),
                );
                inner.tracked.insert(tracked.id, tracked);
            }
        }
        Ok(())
    }

    async fn tracked_patient_ids(&self) -> AppResult<Vec<Uuid>> {
        Ok(self
            .inner
            .read()
            .await
            .tracked
            .values()
            .map(|t| t.patient_id)
            .collect())
    }
}

#[async_trait::async_trait]
impl MedicationRepository for InMemoryDatabase {
    async fn insert(&self, medication: &MedicationOrder) -> AppResult<()> {
        self.inner
            .write()
            .await
            .medications
            .insert(medication.id, medication.clone());
        Ok(())
    }

    async fn update(&self, medication: &MedicationOrder) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        if !inner.medications.contains_key(&medication.id) {
            return Err(AppError::NotFound(format!("medication {}", medication.id)));
        }
        inner.medications.insert(medication.id, medication.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<MedicationOrder>> {
        Ok(self.inner.read().await.medications.get(&id).cloned())
    }

    async fn find_by_source(
        &self,
        source_system: &str,
        source_id: &str,
    ) -> AppResult<Option<MedicationOrder>> {
        Ok(self
            .inner
            .read()
            .await
            .medications
            .values()
            .find(|m| {
                m.source_system.as_deref() == Some(source_system)
                    && m.source_id.as_deref() == Some(source_id)
            })
            .cloned())
    }

    async fn find_natural(
        &self,
        patient_id: Uuid,
        drug_name: &str,
        start_date: NaiveDate,
    ) -> AppResult<Option<MedicationOrder>> {
        Ok(self
            .inner
            .read()
            .await
            .medications
            .values()
            .find(|m| {
                m.patient_id == patient_id
                    && m.drug_name == drug_name
                    && m.start_date == start_date
            })
            .cloned())
    }

    async fn list_for_patient(&self, patient_id: Uuid) -> AppResult<Vec<MedicationOrder>> {
        let mut medications: Vec<MedicationOrder> = self
            .inner
            .read()
            .await
            .medications
            .values()
            .filter(|m| m.patient_id == patient_id)
            .cloned()
            .collect();
        medications.sort_by_key(|m| m.start_date);
        Ok(medications)
    }

    async fn list_all(&self, patient_ids: Option<&[Uuid]>) -> AppResult<Vec<MedicationOrder>> {
        let mut medications: Vec<MedicationOrder> = self
            .inner
            .read()
            .await
            .medications
            .values()
            .filter(|m| patient_ids.is_none_or(|ids| ids.contains(&m.patient_id)))
            .cloned()
            .collect();
        medications.sort_by_key(|m| m.start_date);
        Ok(medications)
    }
}

#[async_trait::async_trait]
impl TaskRepository for InMemoryDatabase {
    async fn insert(&self, task: &MonitoringTask) -> AppResult<()> {
        self.inner.write().await.tasks.insert(task.id, task.clone());
        Ok(())
    }

    async fn update(&self, task: &MonitoringTask) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        if !inner.tasks.contains_key(&task.id) {
            return Err(AppError::NotFound(format!("task {}", task.id)));
        }
        inner.tasks.insert(task.id, task.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<MonitoringTask>> {
        Ok(self.inner.read().await.tasks.get(&id).cloned())
    }

    async fn find_matching(
        &self,
        patient_id: Uuid,
        medication_order_id: Uuid,
        test_type: &str,
        window_start: NaiveDate,
        window_end: NaiveDate,
    ) -> AppResult<Option<MonitoringTask>> {
        Ok(self
            .inner
            .read()
            .await
            .tasks
            .values()
            .find(|t| {
                t.patient_id == patient_id
                    && t.medication_order_id == medication_order_id
                    && t.test_type == test_type
                    && t.due_date >= window_start
                    && t.due_date <= window_end
            })
            .cloned())
    }

    async fn list_for_patient_with_statuses(
        &self,
        patient_id: Uuid,
        statuses: &[TaskStatus],
    ) -> AppResult<Vec<MonitoringTask>> {
        let mut tasks: Vec<MonitoringTask> = self
            .inner
            .read()
            .await
            .tasks
            .values()
            .filter(|t| t.patient_id == patient_id && statuses.contains(&t.status))
            .cloned()
            .collect();
        tasks.sort_by_key(|t| t.due_date);
        Ok(tasks)
    }

    async fn list_with_status(&self, status: TaskStatus) -> AppResult<Vec<MonitoringTask>> {
        let mut tasks: Vec<MonitoringTask> = self
            .inner
            .read()
            .await
            .tasks
            .values()
            .filter(|t| t.status == status)
            .cloned()
            .collect();
        tasks.sort_by_key(|t| t.due_date);
        Ok(tasks)
    }

    async fn mark_due_tasks_overdue(&self, today: NaiveDate) -> AppResult<u64> {
        let mut inner = self.inner.write().await;
        let mut updated = 0;
        for task in inner.tasks.values_mut() {
            if task.status == TaskStatus::Due && task.due_date < today {
                task.status = TaskStatus::Overdue;
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn expired_waivers(&self, today: NaiveDate) -> AppResult<Vec<MonitoringTask>> {
        Ok(self
            .inner
            .read()
            .await
            .tasks
            .values()
            .filter(|t| {
                t.status == TaskStatus::Waived
                    && t.waived_until.is_some_and(|until| until < today)
            })
            .cloned()
            .collect())
    }

    async fn earliest_open_assigned(
        &self,
        patient_id: Uuid,
    ) -> AppResult<Option<MonitoringTask>> {
        Ok(self
            .inner
            .read()
            .await
            .tasks
            .values()
            .filter(|t| t.patient_id == patient_id && t.is_open() && t.assigned_to.is_some())
            .min_by_key(|t| t.due_date)
            .cloned())
    }

    async fn worklist(
        &self,
        status: Option<TaskStatus>,
        drug_category: Option<DrugCategory>,
    ) -> AppResult<Vec<WorklistRow>> {
        let inner = self.inner.read().await;
        let mut rows: Vec<WorklistRow> = inner
            .tasks
            .values()
            .filter(|t| status.is_none_or(|s| t.status == s))
            .filter_map(|t| {
                let medication = inner.medications.get(&t.medication_order_id)?;
                if drug_category.is_some_and(|c| medication.drug_category != c) {
                    return None;
                }
                let patient = inner.patients.get(&t.patient_id)?;
                Some(WorklistRow {
                    task_id: t.id,
                    patient_id: patient.id,
                    pseudonym: patient.pseudonym.clone(),
                    drug_name: medication.drug_name.clone(),
                    start_date: medication.start_date,
                    hdat: medication.flags.is_hdat,
                    test_type: t.test_type.clone(),
                    due_date: t.due_date,
                    assigned_to: t.assigned_to.clone(),
                    status: t.status,
                })
            })
            .collect();
        rows.sort_by_key(|r| r.due_date);
        Ok(rows)
    }
}

#[async_trait::async_trait]
impl EventRepository for InMemoryDatabase {
    async fn insert(&self, event: &MonitoringEvent) -> AppResult<()> {
        self.inner
            .write()
            .await
            .events
            .insert(event.id, event.clone());
        Ok(())
    }

    async fn update(&self, event: &MonitoringEvent) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        if !inner.events.contains_key(&event.id) {
            return Err(AppError::NotFound(format!("event {}", event.id)));
        }
        inner.events.insert(event.id, event.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<MonitoringEvent>> {
        Ok(self.inner.read().await.events.get(&id).cloned())
    }

    async fn find_by_source(
        &self,
        source_system: &str,
        source_id: &str,
    ) -> AppResult<Option<MonitoringEvent>> {
        Ok(self
            .inner
            .read()
            .await
            .events
            .values()
            .find(|e| {
                e.source_system == source_system && e.source_id.as_deref() == Some(source_id)
            })
            .cloned())
    }

    async fn find_natural(
        &self,
        patient_id: Uuid,
        test_type: &str,
        performed_date: NaiveDate,
    ) -> AppResult<Option<MonitoringEvent>> {
        Ok(self
            .inner
            .read()
            .await
            .events
            .values()
            .find(|e| {
                e.patient_id == patient_id
                    && e.test_type == test_type
                    && e.performed_date == performed_date
            })
            .cloned())
    }

    async fn list_for_patient(&self, patient_id: Uuid) -> AppResult<Vec<MonitoringEvent>> {
        let mut events: Vec<MonitoringEvent> = self
            .inner
            .read()
            .await
            .events
            .values()
            .filter(|e| e.patient_id == patient_id)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.performed_date);
        Ok(events)
    }

    async fn list_all(&self, patient_ids: Option<&[Uuid]>) -> AppResult<Vec<MonitoringEvent>> {
        let mut events: Vec<MonitoringEvent> = self
            .inner
            .read()
            .await
            .events
            .values()
            .filter(|e| patient_ids.is_none_or(|ids| ids.contains(&e.patient_id)))
            .cloned()
            .collect();
        events.sort_by_key(|e| e.performed_date);
        Ok(events)
    }
}

#[async_trait::async_trait]
impl NotificationRepository for InMemoryDatabase {
    async fn insert_if_absent(&self, notification: &InAppNotification) -> AppResult<bool> {
        let mut inner = self.inner.write().await;
        if inner
            .notifications
            .values()
            .any(|n| n.dedupe_key == notification.dedupe_key)
        {
            return Ok(false);
        }
        inner
            .notifications
            .insert(notification.id, notification.clone());
        Ok(true)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<InAppNotification>> {
        Ok(self.inner.read().await.notifications.get(&id).cloned())
    }

    async fn find_by_dedupe_key(
        &self,
        dedupe_key: &str,
    ) -> AppResult<Option<InAppNotification>> {
        Ok(self
            .inner
            .read()
            .await
            .notifications
            .values()
            .find(|n| n.dedupe_key == dedupe_key)
            .cloned())
    }

    async fn update(&self, notification: &InAppNotification) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        if !inner.notifications.contains_key(&notification.id) {
            return Err(AppError::NotFound(format!(
                "notification {}",
                notification.id
            )));
        }
        inner
            .notifications
            .insert(notification.id, notification.clone());
        Ok(())
    }

    async fn list_visible(
        &self,
        username: &str,
        team_inbox_ids: &[String],
        filter: &NotificationFilter,
    ) -> AppResult<Vec<InAppNotification>> {
        let inner = self.inner.read().await;
        let mut notifications: Vec<InAppNotification> = inner
            .notifications
            .values()
            .filter(|n| match n.recipient.recipient_type {
                RecipientType::User => n.recipient.recipient_id == username,
                RecipientType::Team => team_inbox_ids.contains(&n.recipient.recipient_id),
            })
            .filter(|n| filter.status.is_none_or(|s| n.status == s))
            .filter(|n| filter.priority.is_none_or(|p| n.priority == p))
            .filter(|n| filter.patient_id.is_none_or(|p| n.patient_id == Some(p)))
            .filter(|n| {
                !filter.unread_only
                    || n.status == crate::domain::models::NotificationStatus::Unread
            })
            .cloned()
            .collect();
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let offset = filter.offset.unwrap_or(0).max(0) as usize;
        let limit = filter.limit.unwrap_or(100).clamp(0, 500) as usize;
        Ok(notifications.into_iter().skip(offset).take(limit).collect())
    }
}

#[async_trait::async_trait]
impl ThresholdRepository for InMemoryDatabase {
    async fn upsert(&self, threshold: &ReferenceThreshold) -> AppResult<()> {
        self.inner
            .write()
            .await
            .thresholds
            .insert(threshold.id, threshold.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<ReferenceThreshold>> {
        Ok(self.inner.read().await.thresholds.get(&id).cloned())
    }

    async fn enabled_for_type(
        &self,
        monitoring_type: &str,
    ) -> AppResult<Vec<ReferenceThreshold>> {
        Ok(self
            .inner
            .read()
            .await
            .thresholds
            .values()
            .filter(|t| t.enabled && t.monitoring_type == monitoring_type)
            .cloned()
            .collect())
    }
}

#[async_trait::async_trait]
impl RulesetRepository for InMemoryDatabase {
    async fn insert_version(&self, version: &RulesetVersion) -> AppResult<()> {
        self.inner.write().await.rulesets.push(version.clone());
        Ok(())
    }

    async fn latest(&self) -> AppResult<Option<RulesetVersion>> {
        Ok(self
            .inner
            .read()
            .await
            .rulesets
            .iter()
            .max_by_key(|v| v.created_at)
            .cloned())
    }
}

#[async_trait::async_trait]
impl AuditRepository for InMemoryDatabase {
    async fn record(&self, record: &AuditRecord) -> AppResult<()> {
        self.inner.write().await.audit.push(record.clone());
        Ok(())
    }
}
