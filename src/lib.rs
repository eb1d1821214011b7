// Конфигурация, ошибки, счётчики
pub mod config;
pub mod error;
pub mod metrics;

// Внешние команды (zfs / ssh) и run-lock
pub mod shell;
pub mod lock;

// Ядро: инвентарь -> имена -> решение -> отправка
pub mod inventory;
pub mod namespace;
pub mod reconcile;
pub mod transfer;

// Один прогон целиком
pub mod replicator;

// Удобные реэкспорты
pub use config::ReplicationConfig;
pub use error::{ConfigError, ExecError, NamespaceError, TransferFailed};
pub use inventory::{Host, Inventory, InventoryReader, Snapshot};
pub use namespace::NameMapper;
pub use reconcile::{Action, Reconciler, SkipReason};
pub use replicator::{replicate_from_config_file, Replicator, RunReport};
pub use shell::{Shell, SystemShell};
pub use transfer::{TransferCommand, TransferExecutor, TransferKind, TransferLog};
