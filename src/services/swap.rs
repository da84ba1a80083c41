//! Metadata swap operations.
//!
//! Each mod folder keeps at most two metadata files: the active `About.xml`
//! and the backup `About_old.xml` holding the alternate-language name. The
//! swap exchanges the pair with three renames through `About_temp.xml` so no
//! intermediate step leaves both logical slots pointing at the same file:
//!
//! 1. current -> temp
//! 2. backup -> current
//! 3. temp -> backup
//!
//! Direction is decided by the display name of the current file:
//! apply-translation swaps when the name has no CJK ideograph (pulling the
//! translated file out of the backup slot), restore-original swaps when it
//! does. A folder without a backup file has never been processed and is
//! never touched. A document without a name element is ineligible in both
//! directions.

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;

use super::metadata::{self, ABOUT_FILE, BACKUP_FILE, MetadataError, TEMP_FILE, contains_cjk};

/// Result of one swap attempt on a folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapOutcome {
    /// The pair was exchanged.
    Applied,
    /// Nothing to do: no backup present, no name element, or the name is
    /// already on the requested side of the predicate.
    NotApplicable,
}

/// How an interrupted swap's leftover temp file was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeftoverRepair {
    /// The current slot was empty; the temp file was moved back into it.
    RolledBack,
    /// The backup slot was empty; the temp file was moved into it,
    /// completing the interrupted exchange.
    RolledForward,
}

/// Errors from swap operations on a single folder.
#[derive(Error, Debug)]
pub enum SwapError {
    #[error("current metadata file missing: {0}")]
    MissingCurrent(Utf8PathBuf),

    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error("rename {from} -> {to} failed: {source}")]
    Rename {
        from: Utf8PathBuf,
        to: Utf8PathBuf,
        source: std::io::Error,
    },

    #[error("leftover {0} exists alongside both metadata files; refusing to guess")]
    AmbiguousLeftover(Utf8PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SwapDirection {
    Apply,
    Restore,
}

/// Stateless service performing the swap operations.
///
/// All methods take the mod's `About` directory, not the mod folder itself;
/// callers resolve `<modRoot>/About` first.
#[derive(Debug, Clone, Default)]
pub struct SwapService;

impl SwapService {
    pub fn new() -> Self {
        Self
    }

    /// Move the AI-translated name (stored in the backup slot) into the
    /// active slot. Applies only when the backup exists and the current
    /// display name contains no CJK ideograph.
    pub fn apply_translation(&self, about_dir: &Utf8Path) -> Result<SwapOutcome, SwapError> {
        self.toggle(about_dir, SwapDirection::Apply)
    }

    /// Restore the pre-translation file as current. Applies only when the
    /// backup exists and the current display name contains a CJK ideograph.
    pub fn restore_original(&self, about_dir: &Utf8Path) -> Result<SwapOutcome, SwapError> {
        self.toggle(about_dir, SwapDirection::Restore)
    }

    fn toggle(
        &self,
        about_dir: &Utf8Path,
        direction: SwapDirection,
    ) -> Result<SwapOutcome, SwapError> {
        let current = about_dir.join(ABOUT_FILE);
        let backup = about_dir.join(BACKUP_FILE);
        let temp = about_dir.join(TEMP_FILE);

        if let Some(repair) = self.repair_leftover(about_dir)? {
            tracing::warn!("Repaired interrupted swap in {}: {:?}", about_dir, repair);
        }

        if !backup.exists() {
            return Ok(SwapOutcome::NotApplicable);
        }
        if !current.exists() {
            return Err(SwapError::MissingCurrent(current));
        }

        let document = metadata::load_metadata(&current)?;
        let Some(name) = document.name else {
            // No name element means the document is ineligible either way.
            return Ok(SwapOutcome::NotApplicable);
        };

        let eligible = match direction {
            SwapDirection::Apply => !contains_cjk(&name),
            SwapDirection::Restore => contains_cjk(&name),
        };
        if !eligible {
            return Ok(SwapOutcome::NotApplicable);
        }

        rename(&current, &temp)?;
        rename(&backup, &current)?;
        rename(&temp, &backup)?;

        tracing::debug!("Swapped metadata pair in {}", about_dir);
        Ok(SwapOutcome::Applied)
    }

    /// Detect and resolve a temp file left behind by an interrupted swap.
    ///
    /// An interruption between renames leaves exactly one slot empty, which
    /// tells us where the temp file belongs. When all three files exist the
    /// folder was modified by something else and is left alone.
    pub fn repair_leftover(
        &self,
        about_dir: &Utf8Path,
    ) -> Result<Option<LeftoverRepair>, SwapError> {
        let temp = about_dir.join(TEMP_FILE);
        if !temp.exists() {
            return Ok(None);
        }

        let current = about_dir.join(ABOUT_FILE);
        let backup = about_dir.join(BACKUP_FILE);

        if !current.exists() {
            rename(&temp, &current)?;
            Ok(Some(LeftoverRepair::RolledBack))
        } else if !backup.exists() {
            rename(&temp, &backup)?;
            Ok(Some(LeftoverRepair::RolledForward))
        } else {
            Err(SwapError::AmbiguousLeftover(temp))
        }
    }
}

fn rename(from: &Utf8Path, to: &Utf8Path) -> Result<(), SwapError> {
    std::fs::rename(from, to).map_err(|source| SwapError::Rename {
        from: from.to_owned(),
        to: to.to_owned(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn about_dir(temp: &TempDir) -> Utf8PathBuf {
        let dir = Utf8PathBuf::try_from(temp.path().to_path_buf())
            .unwrap()
            .join("About");
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn xml_with_name(name: &str) -> String {
        format!("<ModMetaData><name>{name}</name><description>d</description></ModMetaData>")
    }

    #[test]
    fn test_no_backup_is_not_applicable() {
        let temp = TempDir::new().unwrap();
        let dir = about_dir(&temp);
        fs::write(dir.join(ABOUT_FILE), xml_with_name("Plain Name")).unwrap();

        let service = SwapService::new();
        let outcome = service.apply_translation(&dir).unwrap();
        assert_eq!(outcome, SwapOutcome::NotApplicable);

        // Filesystem untouched.
        assert!(dir.join(ABOUT_FILE).exists());
        assert!(!dir.join(BACKUP_FILE).exists());
        assert!(!dir.join(TEMP_FILE).exists());
    }

    #[test]
    fn test_apply_swaps_when_name_is_not_cjk() {
        let temp = TempDir::new().unwrap();
        let dir = about_dir(&temp);
        let original = xml_with_name("Combat Extended");
        let translated = xml_with_name("战斗扩展");
        fs::write(dir.join(ABOUT_FILE), &original).unwrap();
        fs::write(dir.join(BACKUP_FILE), &translated).unwrap();

        let service = SwapService::new();
        assert_eq!(
            service.apply_translation(&dir).unwrap(),
            SwapOutcome::Applied
        );

        assert_eq!(fs::read_to_string(dir.join(ABOUT_FILE)).unwrap(), translated);
        assert_eq!(fs::read_to_string(dir.join(BACKUP_FILE)).unwrap(), original);
        assert!(!dir.join(TEMP_FILE).exists());
    }

    #[test]
    fn test_apply_skips_when_name_already_cjk() {
        let temp = TempDir::new().unwrap();
        let dir = about_dir(&temp);
        fs::write(dir.join(ABOUT_FILE), xml_with_name("战斗扩展")).unwrap();
        fs::write(dir.join(BACKUP_FILE), xml_with_name("Combat Extended")).unwrap();

        let service = SwapService::new();
        assert_eq!(
            service.apply_translation(&dir).unwrap(),
            SwapOutcome::NotApplicable
        );
    }

    #[test]
    fn test_restore_swaps_when_name_is_cjk() {
        let temp = TempDir::new().unwrap();
        let dir = about_dir(&temp);
        let translated = xml_with_name("战斗扩展");
        let original = xml_with_name("Combat Extended");
        fs::write(dir.join(ABOUT_FILE), &translated).unwrap();
        fs::write(dir.join(BACKUP_FILE), &original).unwrap();

        let service = SwapService::new();
        assert_eq!(
            service.restore_original(&dir).unwrap(),
            SwapOutcome::Applied
        );

        assert_eq!(fs::read_to_string(dir.join(ABOUT_FILE)).unwrap(), original);
        assert_eq!(
            fs::read_to_string(dir.join(BACKUP_FILE)).unwrap(),
            translated
        );
    }

    #[test]
    fn test_apply_twice_is_not_applicable_second_time() {
        let temp = TempDir::new().unwrap();
        let dir = about_dir(&temp);
        fs::write(dir.join(ABOUT_FILE), xml_with_name("Plain")).unwrap();
        fs::write(dir.join(BACKUP_FILE), xml_with_name("中文名")).unwrap();

        let service = SwapService::new();
        assert_eq!(
            service.apply_translation(&dir).unwrap(),
            SwapOutcome::Applied
        );
        assert_eq!(
            service.apply_translation(&dir).unwrap(),
            SwapOutcome::NotApplicable
        );
    }

    #[test]
    fn test_round_trip_restores_original_bytes() {
        let temp = TempDir::new().unwrap();
        let dir = about_dir(&temp);
        let original = xml_with_name("Plain");
        let translated = xml_with_name("中文名");
        fs::write(dir.join(ABOUT_FILE), &original).unwrap();
        fs::write(dir.join(BACKUP_FILE), &translated).unwrap();

        let service = SwapService::new();
        assert_eq!(
            service.apply_translation(&dir).unwrap(),
            SwapOutcome::Applied
        );
        assert_eq!(
            service.restore_original(&dir).unwrap(),
            SwapOutcome::Applied
        );

        assert_eq!(fs::read_to_string(dir.join(ABOUT_FILE)).unwrap(), original);
        assert_eq!(
            fs::read_to_string(dir.join(BACKUP_FILE)).unwrap(),
            translated
        );
    }

    // A document with no name element is ineligible in either direction;
    // the folder must be left untouched. Two earlier revisions of this tool
    // disagreed on the restore side, so the behavior is pinned here.
    #[test]
    fn test_absent_name_is_ineligible_for_apply() {
        let temp = TempDir::new().unwrap();
        let dir = about_dir(&temp);
        let nameless = "<ModMetaData><description>d</description></ModMetaData>";
        fs::write(dir.join(ABOUT_FILE), nameless).unwrap();
        fs::write(dir.join(BACKUP_FILE), xml_with_name("中文名")).unwrap();

        let service = SwapService::new();
        assert_eq!(
            service.apply_translation(&dir).unwrap(),
            SwapOutcome::NotApplicable
        );
        assert_eq!(fs::read_to_string(dir.join(ABOUT_FILE)).unwrap(), nameless);
    }

    #[test]
    fn test_absent_name_is_ineligible_for_restore() {
        let temp = TempDir::new().unwrap();
        let dir = about_dir(&temp);
        let nameless = "<ModMetaData><description>d</description></ModMetaData>";
        fs::write(dir.join(ABOUT_FILE), nameless).unwrap();
        fs::write(dir.join(BACKUP_FILE), xml_with_name("Original")).unwrap();

        let service = SwapService::new();
        assert_eq!(
            service.restore_original(&dir).unwrap(),
            SwapOutcome::NotApplicable
        );
        assert_eq!(fs::read_to_string(dir.join(ABOUT_FILE)).unwrap(), nameless);
    }

    #[test]
    fn test_empty_name_counts_as_no_cjk() {
        let temp = TempDir::new().unwrap();
        let dir = about_dir(&temp);
        fs::write(dir.join(ABOUT_FILE), xml_with_name("")).unwrap();
        fs::write(dir.join(BACKUP_FILE), xml_with_name("中文名")).unwrap();

        let service = SwapService::new();
        // Empty text is "no CJK": apply proceeds, restore does not.
        assert_eq!(
            service.apply_translation(&dir).unwrap(),
            SwapOutcome::Applied
        );
    }

    #[test]
    fn test_missing_current_with_backup_is_error() {
        let temp = TempDir::new().unwrap();
        let dir = about_dir(&temp);
        fs::write(dir.join(BACKUP_FILE), xml_with_name("Original")).unwrap();

        let service = SwapService::new();
        let result = service.restore_original(&dir);
        assert!(matches!(result, Err(SwapError::MissingCurrent(_))));
    }

    #[test]
    fn test_malformed_xml_is_error() {
        let temp = TempDir::new().unwrap();
        let dir = about_dir(&temp);
        fs::write(dir.join(ABOUT_FILE), "<ModMetaData><name>broken").unwrap();
        fs::write(dir.join(BACKUP_FILE), xml_with_name("中文名")).unwrap();

        let service = SwapService::new();
        assert!(service.apply_translation(&dir).is_err());
    }

    #[test]
    fn test_leftover_rolls_back_when_current_missing() {
        let temp = TempDir::new().unwrap();
        let dir = about_dir(&temp);
        let displaced = xml_with_name("Plain");
        fs::write(dir.join(TEMP_FILE), &displaced).unwrap();
        fs::write(dir.join(BACKUP_FILE), xml_with_name("中文名")).unwrap();

        let service = SwapService::new();
        let repair = service.repair_leftover(&dir).unwrap();
        assert_eq!(repair, Some(LeftoverRepair::RolledBack));
        assert_eq!(fs::read_to_string(dir.join(ABOUT_FILE)).unwrap(), displaced);
        assert!(!dir.join(TEMP_FILE).exists());
    }

    #[test]
    fn test_leftover_rolls_forward_when_backup_missing() {
        let temp = TempDir::new().unwrap();
        let dir = about_dir(&temp);
        let displaced = xml_with_name("Plain");
        fs::write(dir.join(TEMP_FILE), &displaced).unwrap();
        fs::write(dir.join(ABOUT_FILE), xml_with_name("中文名")).unwrap();

        let service = SwapService::new();
        let repair = service.repair_leftover(&dir).unwrap();
        assert_eq!(repair, Some(LeftoverRepair::RolledForward));
        assert_eq!(fs::read_to_string(dir.join(BACKUP_FILE)).unwrap(), displaced);
        assert!(!dir.join(TEMP_FILE).exists());
    }

    #[test]
    fn test_leftover_with_all_three_files_is_refused() {
        let temp = TempDir::new().unwrap();
        let dir = about_dir(&temp);
        fs::write(dir.join(TEMP_FILE), "t").unwrap();
        fs::write(dir.join(ABOUT_FILE), xml_with_name("A")).unwrap();
        fs::write(dir.join(BACKUP_FILE), xml_with_name("B")).unwrap();

        let service = SwapService::new();
        let result = service.repair_leftover(&dir);
        assert!(matches!(result, Err(SwapError::AmbiguousLeftover(_))));
        // Nothing moved.
        assert!(dir.join(TEMP_FILE).exists());
        assert!(dir.join(ABOUT_FILE).exists());
        assert!(dir.join(BACKUP_FILE).exists());
    }

    #[test]
    fn test_toggle_repairs_then_proceeds() {
        let temp = TempDir::new().unwrap();
        let dir = about_dir(&temp);
        // Interrupted apply: step 3 never ran, so the displaced original
        // sits in the temp slot and the backup slot is empty.
        fs::write(dir.join(ABOUT_FILE), xml_with_name("中文名")).unwrap();
        fs::write(dir.join(TEMP_FILE), xml_with_name("Plain")).unwrap();

        let service = SwapService::new();
        // Repair completes the exchange; the predicate then sees a CJK name
        // in the current slot, so the apply direction has nothing to do.
        assert_eq!(
            service.apply_translation(&dir).unwrap(),
            SwapOutcome::NotApplicable
        );
        assert!(!dir.join(TEMP_FILE).exists());
        assert!(dir.join(BACKUP_FILE).exists());
    }
}
