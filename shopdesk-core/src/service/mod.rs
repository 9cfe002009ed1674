//! Service facades: the only entry point callers use to reach a store.
//!
//! A [`Service`] forwards every call to the store it was built with and never
//! translates errors. Which store that is gets decided once, in
//! [`Services::open`].

mod item;
mod ledger;
mod order;
mod unit;

pub use item::ItemService;

use sqlx::SqlitePool;
use std::sync::Arc;

use crate::images::ImageCache;
use crate::local::{LocalBlobs, LocalStore};
use crate::models::{Cashflow, Category, Creditbook, Customer, Item, OrderHistory, Supplier, Unit};
use crate::remote::protocol::ITEM_BUCKET;
use crate::remote::{
    BucketStore, CollectionStore, Connectivity, OfflineBlobs, OfflineFallback, RemoteClient,
    UnitDocumentStore,
};
use crate::store::{BlobStore, Entity, Snapshot, Store, StoreError};

pub struct Service<T> {
    store: Arc<dyn Store<T>>,
}

impl<T> Clone for Service<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<T: Entity> Service<T> {
    pub fn new(store: Arc<dyn Store<T>>) -> Self {
        Self { store }
    }

    pub async fn get_all(&self) -> Result<Vec<T>, StoreError> {
        self.store.get_all().await
    }

    pub async fn get(&self, id: &str) -> Result<Option<T>, StoreError> {
        self.store.get(id).await
    }

    pub async fn add(&self, entity: &T) -> Result<bool, StoreError> {
        self.store.add(entity).await
    }

    pub async fn update(&self, entity: &T) -> Result<bool, StoreError> {
        self.store.update(entity).await
    }

    pub async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        self.store.delete(id).await
    }

    pub async fn save_all(&self, entities: &[T]) -> Result<bool, StoreError> {
        self.store.save_all(entities).await
    }

    pub async fn clear(&self) -> Result<bool, StoreError> {
        self.store.clear().await
    }

    pub async fn snapshot(&self) -> Result<Snapshot<T>, StoreError> {
        self.store.snapshot().await
    }

    pub async fn replace(&self, entities: &[T], expected: Option<u64>) -> Result<bool, StoreError> {
        self.store.replace(entities, expected).await
    }
}

pub type CategoryService = Service<Category>;
pub type CustomerService = Service<Customer>;
pub type SupplierService = Service<Supplier>;
pub type UnitService = Service<Unit>;
pub type OrderService = Service<OrderHistory>;
pub type CashflowService = Service<Cashflow>;
pub type CreditbookService = Service<Creditbook>;

/// Which persistence the services talk to.
pub enum Backend {
    /// SQLite only.
    Local,
    /// The document server, mirrored into SQLite for offline reads.
    Remote {
        client: RemoteClient,
        connectivity: Arc<dyn Connectivity>,
    },
}

/// One service per entity, all sharing the same backend.
#[derive(Clone)]
pub struct Services {
    pub items: ItemService,
    pub categories: CategoryService,
    pub units: UnitService,
    pub customers: CustomerService,
    pub suppliers: SupplierService,
    pub orders: OrderService,
    pub cashflows: CashflowService,
    pub creditbooks: CreditbookService,
}

impl Services {
    pub fn open(pool: SqlitePool, backend: Backend, images: ImageCache) -> Self {
        match backend {
            Backend::Local => Self::local(pool, images),
            Backend::Remote {
                client,
                connectivity,
            } => Self::remote(pool, client, connectivity, images),
        }
    }

    pub fn local(pool: SqlitePool, images: ImageCache) -> Self {
        tracing::debug!("Composing services over local storage");
        Self {
            items: ItemService::new(
                local(&pool),
                images,
                Arc::new(LocalBlobs::new(pool.clone())),
            ),
            categories: Service::new(local(&pool)),
            units: Service::new(local(&pool)),
            customers: Service::new(local(&pool)),
            suppliers: Service::new(local(&pool)),
            orders: Service::new(local(&pool)),
            cashflows: Service::new(local(&pool)),
            creditbooks: Service::new(local(&pool)),
        }
    }

    pub fn remote(
        pool: SqlitePool,
        client: RemoteClient,
        connectivity: Arc<dyn Connectivity>,
        images: ImageCache,
    ) -> Self {
        tracing::debug!("Composing services over {}", client.server_url());
        let blobs: Arc<dyn BlobStore> = Arc::new(client.clone());
        let bucket: Arc<dyn Store<Item>> = Arc::new(BucketStore::new(blobs.clone(), ITEM_BUCKET));
        let units: Arc<dyn Store<Unit>> = Arc::new(UnitDocumentStore::new(client.clone()));
        let fallback = Fallback {
            pool: &pool,
            client: &client,
            connectivity: &connectivity,
        };

        Self {
            items: ItemService::new(
                fallback.wrap(bucket),
                images,
                Arc::new(OfflineBlobs::new(blobs, connectivity.clone())),
            ),
            categories: Service::new(fallback.collection()),
            units: Service::new(fallback.wrap(units)),
            customers: Service::new(fallback.collection()),
            suppliers: Service::new(fallback.collection()),
            orders: Service::new(fallback.collection()),
            cashflows: Service::new(fallback.collection()),
            creditbooks: Service::new(fallback.collection()),
        }
    }
}

fn local<T: Entity>(pool: &SqlitePool) -> Arc<dyn Store<T>> {
    Arc::new(LocalStore::<T>::new(pool.clone()))
}

struct Fallback<'a> {
    pool: &'a SqlitePool,
    client: &'a RemoteClient,
    connectivity: &'a Arc<dyn Connectivity>,
}

impl Fallback<'_> {
    fn wrap<T: Entity>(&self, remote: Arc<dyn Store<T>>) -> Arc<dyn Store<T>> {
        Arc::new(OfflineFallback::new(
            remote,
            LocalStore::new(self.pool.clone()),
            self.connectivity.clone(),
        ))
    }

    fn collection<T: Entity>(&self) -> Arc<dyn Store<T>> {
        self.wrap(Arc::new(CollectionStore::<T>::new(self.client.clone())))
    }
}
