use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use template_store_core::{
    templates_resource_info, template_table_converter, CrudStrategy, DivergenceKind, DualWriter,
    DualWriterOptions, LegacyTemplateStorage, NotificationTemplate, Object, ObjectMeta,
    Operation, OrgNamespaceMapper, Provenance, RequestContext, ResourceInfo, ResourceList,
    SqliteResourceStore, SqliteTemplateService, Storage, StorageError, StorageResult,
    StoreOptions, Table, TemplateResource, TemplateService, TemplateSpec, TypeMeta, WriteResult,
    WriteWarning,
};

/// Generic store wrapper that records calls and can fail on demand.
struct RecordingStore {
    inner: SqliteResourceStore<TemplateResource>,
    calls: Mutex<Vec<&'static str>>,
    fail_writes: AtomicBool,
    cancel_writes: AtomicBool,
    fail_reads: AtomicBool,
}

impl RecordingStore {
    fn new() -> Self {
        let info = templates_resource_info();
        Self {
            inner: SqliteResourceStore::new(
                info,
                CrudStrategy::new(info),
                &StoreOptions::Memory,
                template_table_converter(),
            )
            .unwrap(),
            calls: Mutex::new(Vec::new()),
            fail_writes: AtomicBool::new(false),
            cancel_writes: AtomicBool::new(false),
            fail_reads: AtomicBool::new(false),
        }
    }

    fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }

    fn write_gate(&self) -> StorageResult<()> {
        if self.cancel_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Cancelled);
        }
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::backend("generic store unavailable"));
        }
        Ok(())
    }

    fn read_gate(&self) -> StorageResult<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::backend("generic store unavailable"));
        }
        Ok(())
    }
}

impl Storage<TemplateResource> for RecordingStore {
    fn resource_info(&self) -> &ResourceInfo {
        self.inner.resource_info()
    }

    fn get(&self, ctx: &RequestContext, name: &str) -> StorageResult<TemplateResource> {
        self.record("get");
        self.read_gate()?;
        self.inner.get(ctx, name)
    }

    fn list(&self, ctx: &RequestContext) -> StorageResult<ResourceList<TemplateResource>> {
        self.record("list");
        self.read_gate()?;
        self.inner.list(ctx)
    }

    fn create(
        &self,
        ctx: &RequestContext,
        object: &TemplateResource,
    ) -> StorageResult<WriteResult<TemplateResource>> {
        self.record("create");
        self.write_gate()?;
        self.inner.create(ctx, object)
    }

    fn update(
        &self,
        ctx: &RequestContext,
        object: &TemplateResource,
    ) -> StorageResult<WriteResult<TemplateResource>> {
        self.record("update");
        self.write_gate()?;
        self.inner.update(ctx, object)
    }

    fn delete(
        &self,
        ctx: &RequestContext,
        name: &str,
    ) -> StorageResult<WriteResult<TemplateResource>> {
        self.record("delete");
        self.write_gate()?;
        self.inner.delete(ctx, name)
    }

    fn convert_to_table(&self, object: &Object<TemplateResource>) -> StorageResult<Table> {
        self.inner.convert_to_table(object)
    }
}

type Writer = DualWriter<TemplateResource, LegacyTemplateStorage, RecordingStore>;

fn setup(options: DualWriterOptions) -> (Arc<SqliteTemplateService>, Writer) {
    let service = Arc::new(SqliteTemplateService::open_in_memory().unwrap());
    let legacy = LegacyTemplateStorage::new(service.clone(), Arc::new(OrgNamespaceMapper));
    (service, DualWriter::new(legacy, RecordingStore::new(), options))
}

fn template(name: &str, body: &str) -> TemplateResource {
    TemplateResource {
        type_meta: TypeMeta::default(),
        metadata: ObjectMeta {
            name: name.to_string(),
            ..ObjectMeta::default()
        },
        spec: TemplateSpec {
            template: body.to_string(),
        },
    }
}

#[test]
fn create_writes_legacy_then_generic() {
    let (service, writer) = setup(DualWriterOptions::default());
    let ctx = RequestContext::new("org-42");

    let created = writer.create(&ctx, &template("t1", "{{ .A }}")).unwrap();
    assert!(created.warnings.is_empty());
    assert_eq!(created.object.metadata.resource_version, "1");
    assert!(!created.object.metadata.uid.is_empty());
    assert_eq!(created.object.provenance_annotation(), Some(""));

    assert_eq!(service.get_template(42, "t1").unwrap().template, "{{ .A }}");
    assert_eq!(
        writer.storage().inner.get(&ctx, "t1").unwrap().spec.template,
        "{{ .A }}"
    );
    assert!(writer.divergences().is_empty());
}

#[test]
fn failed_generic_write_is_reported_not_thrown() {
    let (service, writer) = setup(DualWriterOptions::default());
    let ctx = RequestContext::new("default");
    writer.storage().fail_writes.store(true, Ordering::SeqCst);

    let created = writer.create(&ctx, &template("t1", "body")).unwrap();
    assert!(created.has_secondary_failure());
    assert!(matches!(
        &created.warnings[0],
        WriteWarning::SecondaryWriteFailed {
            operation: Operation::Create,
            name,
            ..
        } if name == "t1"
    ));

    assert_eq!(service.get_template(1, "t1").unwrap().template, "body");
    let loaded = writer.get(&ctx, "t1").unwrap();
    assert_eq!(loaded.spec.template, "body");

    let divergences = writer.divergences().snapshot();
    assert_eq!(divergences.len(), 1);
    assert_eq!(
        divergences[0].kind,
        DivergenceKind::SecondaryWriteFailed(Operation::Create)
    );
}

#[test]
fn failed_legacy_write_never_touches_generic_store() {
    let (_, writer) = setup(DualWriterOptions::default());
    let ctx = RequestContext::new("default");
    writer.create(&ctx, &template("t1", "body")).unwrap();
    let before = writer.storage().calls();

    let err = writer.create(&ctx, &template("t1", "again")).unwrap_err();
    assert!(matches!(err, StorageError::Conflict { .. }));

    let err = writer.update(&ctx, &template("ghost", "body")).unwrap_err();
    assert!(err.is_not_found());

    assert_eq!(writer.storage().calls(), before);
}

#[test]
fn delete_of_name_missing_from_legacy_skips_generic_delete() {
    let (_, writer) = setup(DualWriterOptions::default());
    let ctx = RequestContext::new("default");

    let err = writer.delete(&ctx, "ghost").unwrap_err();
    assert!(err.is_not_found());
    assert!(!writer.storage().calls().contains(&"delete"));
}

#[test]
fn delete_removes_both_copies() {
    let (service, writer) = setup(DualWriterOptions::default());
    let ctx = RequestContext::new("default");
    writer.create(&ctx, &template("t1", "body")).unwrap();

    let deleted = writer.delete(&ctx, "t1").unwrap();
    assert!(deleted.warnings.is_empty());
    assert!(service.get_templates(1).unwrap().is_empty());
    assert!(writer.storage().inner.get(&ctx, "t1").unwrap_err().is_not_found());
    assert!(writer.get(&ctx, "t1").unwrap_err().is_not_found());
}

#[test]
fn delete_of_unmigrated_object_succeeds_without_warning() {
    let (service, writer) = setup(DualWriterOptions::default());
    service
        .create_template(1, &NotificationTemplate::new("old", "legacy only"))
        .unwrap();

    let deleted = writer.delete(&RequestContext::new("default"), "old").unwrap();
    assert!(deleted.warnings.is_empty());
    assert!(writer.divergences().is_empty());
}

#[test]
fn reads_fall_back_to_legacy_for_unmigrated_objects() {
    let (service, writer) = setup(DualWriterOptions::default());
    service
        .create_template(1, &NotificationTemplate::new("old", "legacy only"))
        .unwrap();
    let ctx = RequestContext::new("default");

    let loaded = writer.get(&ctx, "old").unwrap();
    assert_eq!(loaded.spec.template, "legacy only");
    assert!(loaded.metadata.resource_version.is_empty());

    let list = writer.list(&ctx).unwrap();
    assert_eq!(list.items.len(), 1);
    assert!(!writer.storage().calls().contains(&"create"));
}

#[test]
fn backfill_on_read_copies_legacy_objects() {
    let (service, writer) = setup(DualWriterOptions {
        backfill_on_read: true,
    });
    service
        .create_template(1, &NotificationTemplate::new("old", "legacy only"))
        .unwrap();
    let ctx = RequestContext::new("default");

    let loaded = writer.get(&ctx, "old").unwrap();
    assert_eq!(loaded.metadata.resource_version, "1");
    assert_eq!(
        writer.storage().inner.get(&ctx, "old").unwrap().spec.template,
        "legacy only"
    );
}

#[test]
fn failed_backfill_is_recorded_and_read_still_succeeds() {
    let (service, writer) = setup(DualWriterOptions {
        backfill_on_read: true,
    });
    service
        .create_template(1, &NotificationTemplate::new("old", "legacy only"))
        .unwrap();
    writer.storage().fail_writes.store(true, Ordering::SeqCst);

    let loaded = writer.get(&RequestContext::new("default"), "old").unwrap();
    assert_eq!(loaded.spec.template, "legacy only");
    let kinds: Vec<_> = writer
        .divergences()
        .snapshot()
        .into_iter()
        .map(|divergence| divergence.kind)
        .collect();
    assert_eq!(kinds, vec![DivergenceKind::BackfillFailed]);
}

#[test]
fn generic_read_failure_serves_legacy_copy() {
    let (_, writer) = setup(DualWriterOptions::default());
    let ctx = RequestContext::new("default");
    writer.create(&ctx, &template("t1", "body")).unwrap();
    writer.storage().fail_reads.store(true, Ordering::SeqCst);

    assert_eq!(writer.get(&ctx, "t1").unwrap().spec.template, "body");
    assert_eq!(writer.list(&ctx).unwrap().items.len(), 1);
    assert!(writer
        .divergences()
        .snapshot()
        .iter()
        .all(|divergence| divergence.kind == DivergenceKind::SecondaryReadFailed));
    let divergences = writer.divergences().snapshot();
    assert_eq!(divergences.len(), 2);
    assert_eq!(divergences[0].name, "t1");
    assert_eq!(
        divergences[1].name,
        "templates.notifications.alerting.grafana.app"
    );
}

#[test]
fn spec_mismatch_is_reported_and_legacy_content_served() {
    let (service, writer) = setup(DualWriterOptions::default());
    let ctx = RequestContext::new("default");
    let created = writer.create(&ctx, &template("t1", "original")).unwrap().object;
    service
        .update_template(1, &NotificationTemplate::new("t1", "edited in legacy ui"))
        .unwrap();

    let loaded = writer.get(&ctx, "t1").unwrap();
    assert_eq!(loaded.spec.template, "edited in legacy ui");
    assert_eq!(loaded.metadata.uid, created.metadata.uid);
    let divergences = writer.divergences().snapshot();
    assert_eq!(divergences.len(), 1);
    assert_eq!(divergences[0].kind, DivergenceKind::SpecMismatch);
    assert_eq!(divergences[0].name, "t1");

    // Reported, not repaired.
    assert_eq!(
        writer.storage().inner.get(&ctx, "t1").unwrap().spec.template,
        "original"
    );
}

#[test]
fn provenance_change_in_legacy_is_reported_and_served() {
    let (service, writer) = setup(DualWriterOptions::default());
    let ctx = RequestContext::new("default");
    writer.create(&ctx, &template("t1", "body")).unwrap();

    let mut provisioned = NotificationTemplate::new("t1", "body");
    provisioned.provenance = Provenance::File;
    service.update_template(1, &provisioned).unwrap();

    let loaded = writer.get(&ctx, "t1").unwrap();
    assert_eq!(loaded.provenance_annotation(), Some("file"));
    let kinds: Vec<_> = writer
        .divergences()
        .snapshot()
        .into_iter()
        .map(|divergence| divergence.kind)
        .collect();
    assert_eq!(kinds, vec![DivergenceKind::AnnotationMismatch]);

    let listed = writer.list(&ctx).unwrap();
    assert_eq!(listed.items[0].provenance_annotation(), Some("file"));
}

#[test]
fn generic_only_object_is_surfaced_as_corruption() {
    let (service, writer) = setup(DualWriterOptions::default());
    let ctx = RequestContext::new("default");
    writer.create(&ctx, &template("t1", "body")).unwrap();
    service.delete_template(1, "t1").unwrap();

    let err = writer.get(&ctx, "t1").unwrap_err();
    assert!(matches!(&err, StorageError::Corrupted { names, .. } if names == &["t1"]));

    let err = writer.list(&ctx).unwrap_err();
    assert!(matches!(err, StorageError::Corrupted { .. }));

    // Reported, not repaired.
    assert!(writer.storage().inner.get(&ctx, "t1").is_ok());
    assert!(writer
        .divergences()
        .snapshot()
        .iter()
        .all(|divergence| divergence.kind == DivergenceKind::MissingInLegacy));
}

#[test]
fn delete_of_generic_only_object_is_surfaced_as_corruption() {
    let (service, writer) = setup(DualWriterOptions::default());
    let ctx = RequestContext::new("default");
    writer.create(&ctx, &template("t1", "body")).unwrap();
    service.delete_template(1, "t1").unwrap();

    let err = writer.delete(&ctx, "t1").unwrap_err();
    assert!(matches!(&err, StorageError::Corrupted { names, .. } if names == &["t1"]));
    assert!(!writer.storage().calls().contains(&"delete"));
    assert!(writer.storage().inner.get(&ctx, "t1").is_ok());
    assert_eq!(
        writer.divergences().snapshot()[0].kind,
        DivergenceKind::MissingInLegacy
    );
}

#[test]
fn list_merges_generic_and_legacy_in_legacy_order() {
    let (service, writer) = setup(DualWriterOptions::default());
    let ctx = RequestContext::new("org-42");
    writer.create(&ctx, &template("t2", "two")).unwrap();
    service
        .create_template(42, &NotificationTemplate::new("t1", "one"))
        .unwrap();

    let list = writer.list(&ctx).unwrap();
    let names: Vec<&str> = list.items.iter().map(|item| item.metadata.name.as_str()).collect();
    assert_eq!(names, vec!["t1", "t2"]);
    assert!(list.items[0].metadata.resource_version.is_empty());
    assert_eq!(list.items[1].metadata.resource_version, "1");
    assert!(list.resource_version.is_empty());

    let table = writer.convert_to_table(&Object::List(list)).unwrap();
    assert_eq!(table.rows.len(), 2);
}

#[test]
fn list_reports_generic_revision_only_when_served_verbatim() {
    let (service, writer) = setup(DualWriterOptions::default());
    let ctx = RequestContext::new("default");
    writer.create(&ctx, &template("t1", "one")).unwrap();
    writer.create(&ctx, &template("t2", "two")).unwrap();
    assert_eq!(writer.list(&ctx).unwrap().resource_version, "2");

    service
        .update_template(1, &NotificationTemplate::new("t1", "edited"))
        .unwrap();
    let list = writer.list(&ctx).unwrap();
    assert!(list.resource_version.is_empty());
    assert_eq!(list.items[0].spec.template, "edited");
}

#[test]
fn backfilled_list_leaves_revision_empty() {
    let (service, writer) = setup(DualWriterOptions {
        backfill_on_read: true,
    });
    service
        .create_template(1, &NotificationTemplate::new("old", "legacy only"))
        .unwrap();
    let ctx = RequestContext::new("default");

    let list = writer.list(&ctx).unwrap();
    assert_eq!(list.items[0].metadata.resource_version, "1");
    assert!(list.resource_version.is_empty());
    assert_eq!(writer.list(&ctx).unwrap().resource_version, "1");
}

#[test]
fn update_migrates_object_missing_from_generic_store() {
    let (service, writer) = setup(DualWriterOptions::default());
    service
        .create_template(1, &NotificationTemplate::new("old", "v1"))
        .unwrap();
    let ctx = RequestContext::new("default");

    let updated = writer.update(&ctx, &template("old", "v2")).unwrap();
    assert!(updated.warnings.is_empty());
    assert_eq!(updated.object.metadata.resource_version, "1");
    assert_eq!(writer.storage().calls(), vec!["update", "create"]);
    assert_eq!(writer.get(&ctx, "old").unwrap().spec.template, "v2");
}

#[test]
fn stale_update_is_rejected_before_legacy_write() {
    let (service, writer) = setup(DualWriterOptions::default());
    let ctx = RequestContext::new("default");
    let created = writer.create(&ctx, &template("t1", "v1")).unwrap().object;

    let mut first = created.clone();
    first.spec.template = "v2".to_string();
    let updated = writer.update(&ctx, &first).unwrap();
    assert!(updated.warnings.is_empty());
    assert_eq!(updated.object.metadata.resource_version, "2");

    let mut stale = created;
    stale.spec.template = "v3".to_string();
    let err = writer.update(&ctx, &stale).unwrap_err();
    assert!(matches!(err, StorageError::Conflict { .. }));

    let mut unknown = template("t1", "v4");
    unknown.metadata.resource_version = "999".to_string();
    let err = writer.update(&ctx, &unknown).unwrap_err();
    assert!(matches!(err, StorageError::Conflict { .. }));

    assert_eq!(service.get_template(1, "t1").unwrap().template, "v2");
    assert_eq!(writer.get(&ctx, "t1").unwrap().spec.template, "v2");
    assert!(writer.divergences().is_empty());
}

#[test]
fn read_after_failed_secondary_update_matches_legacy() {
    let (service, writer) = setup(DualWriterOptions::default());
    let ctx = RequestContext::new("default");
    writer.create(&ctx, &template("t1", "v1")).unwrap();
    writer.storage().fail_writes.store(true, Ordering::SeqCst);

    let result = writer.update(&ctx, &template("t1", "v2")).unwrap();
    assert!(result.has_secondary_failure());
    assert_eq!(service.get_template(1, "t1").unwrap().template, "v2");
    assert_eq!(writer.get(&ctx, "t1").unwrap().spec.template, "v2");

    let kinds: Vec<_> = writer
        .divergences()
        .snapshot()
        .into_iter()
        .map(|divergence| divergence.kind)
        .collect();
    assert_eq!(
        kinds,
        vec![
            DivergenceKind::SecondaryWriteFailed(Operation::Update),
            DivergenceKind::SpecMismatch,
        ]
    );
}

#[test]
fn cancelled_generic_write_after_legacy_commit_is_a_warning() {
    let (service, writer) = setup(DualWriterOptions::default());
    let ctx = RequestContext::new("default");
    writer.storage().cancel_writes.store(true, Ordering::SeqCst);

    let created = writer.create(&ctx, &template("t1", "body")).unwrap();
    assert!(created.has_secondary_failure());
    assert_eq!(service.get_template(1, "t1").unwrap().template, "body");

    let deleted = writer.delete(&ctx, "t1").unwrap();
    assert!(deleted.has_secondary_failure());
    assert!(service.get_templates(1).unwrap().is_empty());

    let divergences = writer.divergences().snapshot();
    assert_eq!(
        divergences[0].kind,
        DivergenceKind::SecondaryWriteFailed(Operation::Create)
    );
    assert!(divergences[0].detail.contains("cancelled"));
}

#[test]
fn cancellation_propagates_from_reads() {
    let (_, writer) = setup(DualWriterOptions::default());
    let ctx = RequestContext::new("default");
    writer.create(&ctx, &template("t1", "body")).unwrap();

    ctx.cancellation().cancel();
    assert!(matches!(
        writer.get(&ctx, "t1").unwrap_err(),
        StorageError::Cancelled
    ));
    assert!(matches!(writer.list(&ctx).unwrap_err(), StorageError::Cancelled));
    assert!(writer.divergences().is_empty());
}
