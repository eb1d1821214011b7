//! Name mapping between the primary and the backup namespace.
//!
//! `tank/a/b@zfs-auto-snap_weekly-2024-01-07` <-> `pool2/a/b@zfs-auto-snap_weekly-2024-01-07`
//!
//! Только точное совпадение префикса по границе компонента: после корня идёт
//! конец строки, `/` или `@`. `tank2/x` не лежит под `tank`. Идентификатор без
//! настроенного корня - ошибка, а не тихий pass-through.

use crate::config::ReplicationConfig;
use crate::error::NamespaceError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NameMapper {
    primary_root: String,
    backup_root: String,
}

impl NameMapper {
    pub fn new<S: Into<String>>(primary_root: S, backup_root: S) -> Self {
        Self {
            primary_root: primary_root.into(),
            backup_root: backup_root.into(),
        }
    }

    pub fn from_config(cfg: &ReplicationConfig) -> Self {
        Self::new(cfg.main_fsname.as_str(), cfg.backup_fsname.as_str())
    }

    pub fn primary_root(&self) -> &str {
        &self.primary_root
    }

    pub fn backup_root(&self) -> &str {
        &self.backup_root
    }

    /// Primary identifier -> backup identifier.
    pub fn to_backup(&self, id: &str) -> Result<String, NamespaceError> {
        substitute(id, &self.primary_root, &self.backup_root)
    }

    /// Backup identifier -> primary identifier.
    pub fn to_primary(&self, id: &str) -> Result<String, NamespaceError> {
        substitute(id, &self.backup_root, &self.primary_root)
    }
}

/// Root is followed by nothing, a child dataset or a snapshot tag.
fn on_boundary(rest: &str) -> bool {
    rest.is_empty() || rest.starts_with('/') || rest.starts_with('@')
}

fn substitute(id: &str, from: &str, to: &str) -> Result<String, NamespaceError> {
    match id.strip_prefix(from).filter(|rest| on_boundary(rest)) {
        Some(rest) => {
            let mut out = String::with_capacity(to.len() + rest.len());
            out.push_str(to);
            out.push_str(rest);
            Ok(out)
        }
        None => Err(NamespaceError::OutsideRoot {
            id: id.to_string(),
            root: from.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_volume_and_snapshot() {
        let m = NameMapper::new("tank", "pool2");
        assert_eq!(m.to_backup("tank/a").unwrap(), "pool2/a");
        assert_eq!(
            m.to_backup("tank/a/b@zfs-auto-snap_weekly").unwrap(),
            "pool2/a/b@zfs-auto-snap_weekly"
        );
        assert_eq!(m.to_primary("pool2/a@weekly-1").unwrap(), "tank/a@weekly-1");
    }

    #[test]
    fn from_config_uses_pool_names() {
        let cfg = ReplicationConfig::new("tank", "pool2", "bk");
        let m = NameMapper::from_config(&cfg);
        assert_eq!(m.primary_root(), "tank");
        assert_eq!(m.backup_root(), "pool2");
    }

    #[test]
    fn only_leading_occurrence_is_replaced() {
        let m = NameMapper::new("tank", "pool2");
        assert_eq!(m.to_backup("tank/tank@tank").unwrap(), "pool2/tank@tank");
    }

    #[test]
    fn foreign_identifier_is_an_error() {
        let m = NameMapper::new("tank", "pool2");
        let err = m.to_backup("rpool/ROOT").unwrap_err();
        assert_eq!(
            err,
            NamespaceError::OutsideRoot {
                id: "rpool/ROOT".into(),
                root: "tank".into()
            }
        );
        // a backup name is not a primary name
        assert!(m.to_backup("pool2/a").is_err());
        assert!(m.to_primary("tank/a").is_err());
    }

    #[test]
    fn root_must_end_on_component_boundary() {
        let m = NameMapper::new("tank", "pool2");
        assert_eq!(m.to_backup("tank").unwrap(), "pool2");
        assert_eq!(m.to_backup("tank@weekly-1").unwrap(), "pool2@weekly-1");

        for foreign in ["tank2", "tank2/x", "tank-old/a@weekly-1", "tankx@w"] {
            assert_eq!(
                m.to_backup(foreign),
                Err(NamespaceError::OutsideRoot {
                    id: foreign.into(),
                    root: "tank".into()
                })
            );
        }
        assert!(m.to_primary("pool22/x").is_err());
    }
}
