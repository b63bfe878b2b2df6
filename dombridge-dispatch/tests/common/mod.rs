//! Shared test domain: a small runtime-assembled model with customers and
//! products, plus repositories of varying capability.

#![allow(dead_code)]

use dombridge_dispatch::{
    DomainCatalog, EntityAccess, EntityTypeInfo, QueryDataResult, QueryDescriptor, Queryable,
    Repository, RepositoryBuilder, RepositoryHandle,
};
use std::fmt::Debug;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Installs a test-writer subscriber; `RUST_LOG=debug` shows cache fills.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ── Capability interfaces ────────────────────────────────────────

pub trait Named: Send + Sync + Debug {
    fn id(&self) -> Uuid;
    fn name(&self) -> &str;
}

pub trait Audited: Send + Sync {
    fn modified_by(&self) -> &str;
}

// ── Entities ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct CustomerImpl {
    pub id: Uuid,
    pub name: String,
    pub region: String,
}

impl CustomerImpl {
    pub fn new(name: &str, region: &str) -> Self {
        Self {
            id: Uuid::now_v7(),
            name: name.to_string(),
            region: region.to_string(),
        }
    }
}

impl Named for CustomerImpl {
    fn id(&self) -> Uuid {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductImpl {
    pub id: Uuid,
    pub name: String,
}

impl Named for ProductImpl {
    fn id(&self) -> Uuid {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Registered without any capability.
#[derive(Debug, Clone)]
pub struct AuditLogImpl {
    pub message: String,
}

// ── Filter parameters ────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct CustomerQuery {
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct RegionFilter {
    pub region: String,
}

/// No repository declares an overload for this one.
#[derive(Debug, Clone)]
pub struct UnsupportedFilter;

// ── Repositories ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct SaveCall {
    pub insert: Vec<CustomerImpl>,
    pub update: Vec<CustomerImpl>,
    pub delete: Vec<CustomerImpl>,
    pub check_permissions: bool,
}

/// Supports every operation; filters by name (`CustomerQuery`) or by
/// region (`RegionFilter`).
#[derive(Default)]
pub struct CustomerRepository {
    pub rows: Mutex<Vec<CustomerImpl>>,
    pub saves: Mutex<Vec<SaveCall>>,
    pub queries: Mutex<Vec<QueryDescriptor>>,
}

impl CustomerRepository {
    pub fn with_rows(rows: Vec<CustomerImpl>) -> Self {
        Self {
            rows: Mutex::new(rows),
            ..Self::default()
        }
    }

    pub fn snapshot(&self) -> Vec<CustomerImpl> {
        self.rows.lock().unwrap().clone()
    }

    pub fn save_calls(&self) -> Vec<SaveCall> {
        self.saves.lock().unwrap().clone()
    }
}

impl Repository for CustomerRepository {
    type Entity = CustomerImpl;

    fn describe(methods: RepositoryBuilder<Self>) -> RepositoryBuilder<Self> {
        methods
            .load(|repo| Ok(repo.snapshot()))
            .query(|repo| Ok(Queryable::new(repo.snapshot())))
            .filter::<CustomerQuery, _>(|repo, query| {
                Ok(repo
                    .snapshot()
                    .into_iter()
                    .filter(|c| c.name == query.name)
                    .collect())
            })
            .filter::<RegionFilter, _>(|repo, filter| {
                Ok(repo
                    .snapshot()
                    .into_iter()
                    .filter(|c| c.region == filter.region)
                    .collect())
            })
            .filter_queryable::<RegionFilter, _>(|_, source, filter| {
                Ok(source.filter(move |c| c.region == filter.region))
            })
            .save(|repo, insert, update, delete, check_permissions| {
                repo.saves.lock().unwrap().push(SaveCall {
                    insert: insert.to_vec(),
                    update: update.to_vec(),
                    delete: delete.to_vec(),
                    check_permissions,
                });
                Ok(())
            })
            .query_data(|repo, descriptor| {
                repo.queries.lock().unwrap().push(descriptor.clone());
                let mut rows = repo.snapshot();
                let region = descriptor
                    .filter
                    .as_ref()
                    .and_then(|f| f.get("region"))
                    .and_then(|r| r.as_str());
                if let Some(region) = region {
                    rows.retain(|c| c.region == region);
                }
                let total = descriptor.read_total_count.then_some(rows.len());
                let page = rows
                    .into_iter()
                    .skip(descriptor.skip.unwrap_or(0))
                    .take(descriptor.top.unwrap_or(usize::MAX))
                    .collect();
                Ok(QueryDataResult::new(page, total))
            })
    }
}

/// Only supports `load`.
pub struct ProductRepository {
    pub rows: Vec<ProductImpl>,
}

impl Repository for ProductRepository {
    type Entity = ProductImpl;

    fn describe(methods: RepositoryBuilder<Self>) -> RepositoryBuilder<Self> {
        methods.load(|repo| Ok(repo.rows.clone()))
    }
}

/// Every operation fails inside the repository.
pub struct FailingRepository;

impl Repository for FailingRepository {
    type Entity = CustomerImpl;

    fn describe(methods: RepositoryBuilder<Self>) -> RepositoryBuilder<Self> {
        methods
            .load(|_| Err(anyhow::anyhow!("database offline")))
            .filter::<CustomerQuery, _>(|_, query| {
                Err(anyhow::anyhow!("no index for name '{}'", query.name))
            })
            .save(|_, _, _, _, _| Err(anyhow::anyhow!("permission denied")))
    }
}

// ── Fixtures ─────────────────────────────────────────────────────

pub fn seed_customers() -> Vec<CustomerImpl> {
    vec![
        CustomerImpl::new("Acme", "EU"),
        CustomerImpl::new("Globex", "US"),
        CustomerImpl::new("Initech", "EU"),
        CustomerImpl::new("Umbrella", "APAC"),
    ]
}

pub fn catalog() -> Arc<DomainCatalog> {
    let mut catalog = DomainCatalog::new();
    catalog
        .register(
            EntityTypeInfo::builder::<CustomerImpl>("Customer")
                .implements::<dyn Named>(|c| c as Arc<dyn Named>)
                .build(),
        )
        .unwrap();
    catalog
        .register(
            EntityTypeInfo::builder::<ProductImpl>("Product")
                .implements::<dyn Named>(|p| p as Arc<dyn Named>)
                .build(),
        )
        .unwrap();
    catalog
        .register(EntityTypeInfo::builder::<AuditLogImpl>("AuditLog").build())
        .unwrap();
    Arc::new(catalog)
}

pub fn customer_repository() -> Arc<CustomerRepository> {
    Arc::new(CustomerRepository::with_rows(seed_customers()))
}

/// Customer access whose factory hands out `repo`.
pub fn customers(repo: &Arc<CustomerRepository>) -> EntityAccess<dyn Named> {
    init_tracing();
    let repo = Arc::clone(repo);
    EntityAccess::new("Customer", catalog(), move || {
        Ok(RepositoryHandle::new(Arc::clone(&repo)))
    })
}

/// Customer access that counts how often the factory runs.
pub fn counting_customers(
    repo: &Arc<CustomerRepository>,
) -> (EntityAccess<dyn Named>, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let repo = Arc::clone(repo);
    let access = EntityAccess::new("Customer", catalog(), move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(RepositoryHandle::new(Arc::clone(&repo)))
    });
    (access, calls)
}

/// Access for `entity` backed by an arbitrary repository.
pub fn access_with<R: Repository>(entity: &str, repo: R) -> EntityAccess<dyn Named> {
    let repo = Arc::new(repo);
    EntityAccess::new(entity, catalog(), move || {
        Ok(RepositoryHandle::new(Arc::clone(&repo)))
    })
}

pub fn names(objects: &[dombridge_dispatch::EntityObject<dyn Named>]) -> Vec<String> {
    objects.iter().map(|o| o.name().to_string()).collect()
}
