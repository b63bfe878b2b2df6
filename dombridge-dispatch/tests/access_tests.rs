//! End-to-end tests of the dispatch facade: every operation kind, argument
//! conversion, and error reporting.

mod common;

use common::{
    Audited, CustomerImpl, CustomerQuery, CustomerRepository, FailingRepository, Named,
    ProductImpl, ProductRepository, RegionFilter, SaveCall, UnsupportedFilter, access_with,
    catalog, counting_customers, customer_repository, customers, names,
};
use dombridge_dispatch::{
    DispatchError, DynEntity, EntityAccess, EntityTypeResolver, OperationBinder, OperationKind,
    QueryDescriptor, RepositoryAccessor, RepositoryHandle, TypeDescriptor,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::error::Error as _;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use uuid::Uuid;

fn widget() -> ProductImpl {
    ProductImpl {
        id: Uuid::now_v7(),
        name: "Widget".into(),
    }
}

fn invocation_source(err: &DispatchError) -> String {
    err.source().map(|s| s.to_string()).unwrap_or_default()
}

// ── Load and filter ──────────────────────────────────────────────

#[test]
fn load_returns_every_entity() {
    let repo = customer_repository();
    let access = customers(&repo);

    let loaded = access.load().unwrap();

    assert_eq!(names(&loaded), vec!["Acme", "Globex", "Initech", "Umbrella"]);
    assert_eq!(
        loaded[0].downcast_ref::<CustomerImpl>(),
        Some(&repo.snapshot()[0])
    );
    assert_eq!(loaded[1].id(), repo.snapshot()[1].id);
}

#[test]
fn filter_dispatches_on_parameter_type() {
    let repo = customer_repository();
    let access = customers(&repo);

    let by_name = access
        .filter(CustomerQuery {
            name: "Globex".into(),
        })
        .unwrap();
    let by_region = access
        .filter(RegionFilter {
            region: "EU".into(),
        })
        .unwrap();

    assert_eq!(names(&by_name), vec!["Globex"]);
    assert_eq!(names(&by_region), vec!["Acme", "Initech"]);
}

#[test]
fn filter_with_no_match_is_empty() {
    let repo = customer_repository();
    let access = customers(&repo);
    let found = access
        .filter(CustomerQuery {
            name: "Nobody".into(),
        })
        .unwrap();
    assert!(found.is_empty());
}

#[test]
fn filter_with_unsupported_parameter_type() {
    let repo = customer_repository();
    let err = customers(&repo).filter(UnsupportedFilter).unwrap_err();

    match err {
        DispatchError::OperationNotSupported {
            operation,
            parameters,
            ..
        } => {
            assert_eq!(operation, OperationKind::Filter);
            assert!(parameters.contains("UnsupportedFilter"));
        }
        other => panic!("expected OperationNotSupported, got {other:?}"),
    }
}

// ── Queries ──────────────────────────────────────────────────────

#[test]
fn query_is_composable_and_lazy() {
    let repo = customer_repository();
    let access = customers(&repo);

    let query = access.query().unwrap();
    assert!(query.element_type().is::<CustomerImpl>());

    let page = query.filter(|c| c.name() != "Acme").skip(1).take(1).to_list();
    assert_eq!(names(&page), vec!["Initech"]);
}

#[test]
fn filter_queryable_narrows_a_query() {
    let repo = customer_repository();
    let access = customers(&repo);

    let narrowed = access
        .filter_queryable(
            access.query().unwrap(),
            RegionFilter {
                region: "EU".into(),
            },
        )
        .unwrap();

    assert_eq!(names(&narrowed.to_list()), vec!["Acme", "Initech"]);
}

#[test]
fn as_queryable_feeds_filter_queryable() {
    let repo = customer_repository();
    let access = customers(&repo);

    let loaded = access.load().unwrap();
    let source = access.as_queryable(loaded[1..].to_vec()).unwrap();
    let narrowed = access
        .filter_queryable(
            source,
            RegionFilter {
                region: "EU".into(),
            },
        )
        .unwrap()
        .to_list();

    assert_eq!(names(&narrowed), vec!["Initech"]);
}

#[test]
fn as_queryable_rejects_other_entity_types() {
    let products = access_with("Product", ProductRepository { rows: vec![] });
    let widget = products.wrap(widget()).unwrap();

    let repo = customer_repository();
    let err = customers(&repo).as_queryable(vec![widget]).unwrap_err();

    assert!(matches!(err, DispatchError::ArgumentType { position: 0, .. }));
}

#[test]
fn filter_queryable_overload_must_exist() {
    let repo = customer_repository();
    let access = customers(&repo);
    let err = access
        .filter_queryable(
            access.query().unwrap(),
            CustomerQuery {
                name: "Acme".into(),
            },
        )
        .unwrap_err();
    assert!(matches!(
        err,
        DispatchError::OperationNotSupported {
            operation: OperationKind::FilterQueryable,
            ..
        }
    ));
}

// ── Save ─────────────────────────────────────────────────────────

#[test]
fn save_passes_batches_in_order() {
    let repo = customer_repository();
    let access = customers(&repo);

    let loaded = access.load().unwrap();
    let fresh = CustomerImpl::new("Hooli", "US");
    let insert = vec![access.wrap(fresh.clone()).unwrap()];
    let update = vec![loaded[0].clone()];
    let delete = vec![loaded[2].clone(), loaded[3].clone()];

    access.save(insert, update, delete, true).unwrap();

    let seed = repo.snapshot();
    assert_eq!(
        repo.save_calls(),
        vec![SaveCall {
            insert: vec![fresh],
            update: vec![seed[0].clone()],
            delete: vec![seed[2].clone(), seed[3].clone()],
            check_permissions: true,
        }]
    );
}

#[test]
fn save_with_empty_batches() {
    let repo = customer_repository();
    let access = customers(&repo);

    access.save(vec![], vec![], vec![], false).unwrap();

    let calls = repo.save_calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].insert.is_empty());
    assert!(!calls[0].check_permissions);
}

#[test]
fn save_rejects_objects_of_another_entity_type() {
    let products = access_with("Product", ProductRepository { rows: vec![] });
    let widget = products.wrap(widget()).unwrap();

    let repo = customer_repository();
    let access = customers(&repo);
    let err = access.save(vec![], vec![widget], vec![], true).unwrap_err();

    match &err {
        DispatchError::Invocation { operation, .. } => {
            assert_eq!(*operation, OperationKind::Save);
        }
        other => panic!("expected Invocation, got {other:?}"),
    }
    let source = err
        .source()
        .and_then(|s| s.downcast_ref::<DispatchError>())
        .unwrap();
    assert!(matches!(source, DispatchError::ArgumentType { position: 1, .. }));
    assert!(repo.save_calls().is_empty());
}

#[test]
fn missing_save_is_reported_before_argument_checks() {
    let customer = customers(&customer_repository())
        .wrap(CustomerImpl::new("Acme", "EU"))
        .unwrap();
    let products = access_with("Product", ProductRepository { rows: vec![] });

    let err = products
        .save(vec![customer], vec![], vec![], true)
        .unwrap_err();

    assert!(matches!(
        err,
        DispatchError::OperationNotSupported {
            operation: OperationKind::Save,
            ..
        }
    ));
}

// ── Query data ───────────────────────────────────────────────────

#[test]
fn query_data_passes_descriptor_unmodified() {
    let repo = customer_repository();
    let access = customers(&repo);

    let descriptor = QueryDescriptor {
        skip: Some(1),
        top: Some(5),
        read_total_count: true,
        ..QueryDescriptor::with_filter(json!({ "region": "EU" }))
    };
    let result = access.query_data(descriptor.clone()).unwrap();

    assert_eq!(names(&result.records), vec!["Initech"]);
    assert_eq!(result.total_count, Some(2));
    assert_eq!(*repo.queries.lock().unwrap(), vec![descriptor]);
}

#[test]
fn query_data_without_total_count() {
    let repo = customer_repository();
    let result = customers(&repo)
        .query_data(QueryDescriptor::default())
        .unwrap();
    assert_eq!(result.records.len(), 4);
    assert_eq!(result.total_count, None);
}

// ── Failures ─────────────────────────────────────────────────────

#[test]
fn repository_failure_is_wrapped_with_context() {
    let access = access_with("Customer", FailingRepository);
    let err = access.load().unwrap_err();

    match &err {
        DispatchError::Invocation {
            entity,
            operation,
            parameter_type,
            ..
        } => {
            assert_eq!(entity, "Customer");
            assert_eq!(*operation, OperationKind::Load);
            assert_eq!(*parameter_type, None);
        }
        other => panic!("expected Invocation, got {other:?}"),
    }
    assert_eq!(invocation_source(&err), "database offline");
    assert_eq!(
        err.to_string(),
        "load on entity 'Customer' failed (parameter: none): database offline"
    );
}

#[test]
fn filter_failure_names_the_parameter_type() {
    let access = access_with("Customer", FailingRepository);
    let err = access
        .filter(CustomerQuery {
            name: "Acme".into(),
        })
        .unwrap_err();

    match &err {
        DispatchError::Invocation { parameter_type, .. } => {
            assert_eq!(
                parameter_type.as_deref(),
                Some(TypeDescriptor::of::<CustomerQuery>().name())
            );
        }
        other => panic!("expected Invocation, got {other:?}"),
    }
    assert_eq!(invocation_source(&err), "no index for name 'Acme'");
}

#[test]
fn save_failure_is_wrapped() {
    let access = access_with("Customer", FailingRepository);
    let err = access.save(vec![], vec![], vec![], true).unwrap_err();
    assert!(matches!(
        err,
        DispatchError::Invocation {
            operation: OperationKind::Save,
            ..
        }
    ));
    assert_eq!(invocation_source(&err), "permission denied");
}

#[test]
fn partial_repository_reports_unsupported_operations() {
    let access = access_with("Product", ProductRepository { rows: vec![widget()] });

    assert_eq!(names(&access.load().unwrap()), vec!["Widget"]);
    for result in [
        access.query().map(|_| ()),
        access.save(vec![], vec![], vec![], false),
        access.query_data(QueryDescriptor::default()).map(|_| ()),
    ] {
        assert!(matches!(
            result,
            Err(DispatchError::OperationNotSupported { .. })
        ));
    }
}

#[test]
fn repository_for_another_entity_supports_nothing() {
    let access = access_with("Customer", ProductRepository { rows: vec![widget()] });
    assert!(matches!(
        access.load(),
        Err(DispatchError::OperationNotSupported { .. })
    ));
}

#[test]
fn unknown_entity_fails_before_the_factory_runs() {
    let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let access: EntityAccess<dyn Named> = EntityAccess::new("Invoice", catalog(), move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(RepositoryHandle::new(customer_repository()))
    });

    assert!(matches!(access.load(), Err(DispatchError::UnknownType(_))));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn capability_mismatch_is_reported() {
    let repo = Arc::new(CustomerRepository::default());
    let access: EntityAccess<dyn Audited> = EntityAccess::new("Customer", catalog(), move || {
        Ok(RepositoryHandle::new(Arc::clone(&repo)))
    });

    assert!(matches!(
        access.load(),
        Err(DispatchError::CapabilityMismatch { .. })
    ));
}

// ── Repository factory ───────────────────────────────────────────

#[test]
fn factory_runs_once_per_access() {
    let repo = customer_repository();
    let (access, calls) = counting_customers(&repo);

    access.load().unwrap();
    access.query().unwrap();
    access
        .filter(RegionFilter {
            region: "US".into(),
        })
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn factory_failure_is_not_cached() {
    let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let repo = customer_repository();
    let access: EntityAccess<dyn Named> = EntityAccess::new("Customer", catalog(), move || {
        if counter.fetch_add(1, Ordering::SeqCst) == 0 {
            anyhow::bail!("connection pool exhausted");
        }
        Ok(RepositoryHandle::new(Arc::clone(&repo)))
    });

    let err = access.load().unwrap_err();
    assert!(matches!(err, DispatchError::RepositoryUnavailable { .. }));
    assert!(err.to_string().contains("connection pool exhausted"));

    assert_eq!(access.load().unwrap().len(), 4);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn accessor_exposes_instance_and_method_table() {
    let repo = customer_repository();
    let accessor = RepositoryAccessor::from_handle("Customer", RepositoryHandle::new(repo));

    let handle = accessor.repository().unwrap();
    assert!(handle.descriptor().is::<CustomerRepository>());

    let first = accessor.repository_type().unwrap();
    let second = accessor.repository_type().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn facade_from_parts() {
    let repo = customer_repository();
    let access: EntityAccess<dyn Named> = EntityAccess::from_parts(
        EntityTypeResolver::new("Customer", catalog()),
        RepositoryAccessor::from_handle("Customer", RepositoryHandle::new(repo)),
        OperationBinder::new(),
    );

    assert_eq!(access.entity_name().as_str(), "Customer");
    assert_eq!(access.load().unwrap().len(), 4);
}

// ── Casting ──────────────────────────────────────────────────────

#[test]
fn cast_entities_views_instances() {
    let repo = customer_repository();
    let access = customers(&repo);

    let items: Vec<DynEntity> = repo
        .snapshot()
        .into_iter()
        .map(|c| Arc::new(c) as DynEntity)
        .collect();
    let objects = access.cast_entities(items).unwrap();

    assert_eq!(objects.len(), 4);
    assert_eq!(objects[3].name(), "Umbrella");
}

#[test]
fn cast_entities_reports_first_foreign_item() {
    let repo = customer_repository();
    let access = customers(&repo);

    let items = vec![
        Arc::new(CustomerImpl::new("Acme", "EU")) as DynEntity,
        Arc::new(widget()) as DynEntity,
        Arc::new(widget()) as DynEntity,
    ];
    let err = access.cast_entities(items).unwrap_err();

    assert!(matches!(err, DispatchError::ArgumentType { position: 1, .. }));
}

#[test]
fn wrap_rejects_foreign_entity() {
    let repo = customer_repository();
    let err = customers(&repo).wrap(widget()).unwrap_err();
    assert!(matches!(err, DispatchError::ArgumentType { position: 0, .. }));
}

#[test]
fn objects_share_the_concrete_instance() {
    let repo = customer_repository();
    let access = customers(&repo);

    let object = access.wrap(CustomerImpl::new("Hooli", "US")).unwrap();
    let copy = object.clone();

    assert!(object.ptr_eq(&copy));
    assert_eq!(copy.view().name(), "Hooli");
    assert!(object.downcast_ref::<ProductImpl>().is_none());
    assert!(format!("{object:?}").contains("Hooli"));
}
