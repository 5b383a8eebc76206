//! Generic Repository - repository, query builder and unit of work for SeaORM
//!
//! This library gives every SeaORM entity a uniform data-access surface: a fluent
//! query builder with eager loading, tracking control, ordering and pagination,
//! staged inserts/updates/deletes with transparent soft delete, and a unit of work
//! that saves the changes of all repositories together and owns the explicit
//! transaction boundary.
//!
//! # Modules
//!
//! The library is organized into several key modules:
//!
//! * [`entity`] - Entity identity and the soft-delete capability
//! * [`model`] - Entity registration and standing query filters
//! * [`context`] - Persistence context with change tracking
//! * [`repository`] - Query builder and staged mutations
//! * [`unit_of_work`] - Repository cache, save and transactions
//! * [`blocking`] - Blocking entry points
//! * [`config`] - Configuration management
//!
//! # Example
//!
//! ```rust,ignore
//! let model = ModelBuilder::new()
//!     .entity::<category::Entity>()
//!     .entity::<product::Entity>()
//!     .configure_soft_delete()
//!     .build();
//! let factory = UnitOfWorkFactory::connect(&DatabaseConfig::default(), model).await?;
//!
//! let uow = factory.create();
//! let products = uow.repository::<product::Entity>()?;
//! let page = products
//!     .include(product::Relation::Category)
//!     .order_by(product::Column::Name)
//!     .get_paged(1, 10)
//!     .await?;
//! ```

/// Blocking wrappers around the async API
pub mod blocking;

/// Cancellation support for async operations
pub mod cancel;

/// Configuration module for database and logging settings
pub mod config;

/// Persistence context: change tracker and transaction slot
pub mod context;

/// Entity contract and soft-delete capability
pub mod entity;

/// Error type
pub mod error;

/// Logging setup for the `log` facade
pub mod logger;

/// Entity model configuration
pub mod model;

/// Paginated results
pub mod paged;

/// Generic repository
pub mod repository;

/// Unit of work and its factory
pub mod unit_of_work;

pub use cancel::Cancellable;
pub use config::{Config, DatabaseConfig, LoggingConfig};
pub use context::{DataContext, EntityState, TrackedEntry, TransactionHandle};
pub use entity::{EntityBase, SoftDeletable, SoftDeleteColumns};
pub use error::{Error, Result};
pub use model::{EntityModel, EntityType, ModelBuilder};
pub use paged::PagedResult;
pub use repository::Repository;
pub use unit_of_work::{UnitOfWork, UnitOfWorkFactory};
pub use tokio_util::sync::CancellationToken;
