// Manages local file storage for tasks and calendars.
//
// ⚠️ VERSION BUMP REQUIRED:
// Changes to Task struct or its nested types (Alarm, DateType, etc.) require
// incrementing LOCAL_STORAGE_VERSION below to prevent data corruption.
use crate::model::{CalendarListEntry, Task};
use crate::paths::AppPaths;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

// --- Android Specific Imports ---
#[cfg(target_os = "android")]
use std::sync::Arc;

// --- Desktop Specific Imports ---
#[cfg(not(target_os = "android"))]
use fs2::FileExt;

// Constants for identification
pub const LOCAL_CALENDAR_HREF: &str = "local://default";
pub const LOCAL_CALENDAR_NAME: &str = "Local";
pub const LOCAL_REGISTRY_FILENAME: &str = "local_calendars.json";

// Increment this when making breaking changes to the Task struct serialization format
// Version history:
// - v1: Original format with DateTime<Utc> for due/dtstart (v3.12 and earlier)
// - v2: DateType enum for due/dtstart with AllDay/Specific support (v3.14+)
// - v3: Added estimated_duration_max field for duration ranges
const LOCAL_STORAGE_VERSION: u32 = 3;

/// Wrapper struct for versioned local storage
#[derive(Serialize, Deserialize)]
struct LocalStorageData {
    #[serde(default)]
    version: u32,
    tasks: Vec<Task>,
}

// --- Android Global Lock Map ---
#[cfg(target_os = "android")]
static ANDROID_FILE_LOCKS: OnceLock<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> = OnceLock::new();

/// Tracks whether the last load operation succeeded for each calendar.
/// This prevents data loss by blocking saves when we couldn't load the existing data.
/// Key is the calendar href (e.g., "local://default", "local://<uuid>")
static LOAD_STATE_MAP: OnceLock<Mutex<HashMap<String, LoadState>>> = OnceLock::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadState {
    /// Never attempted to load
    Uninitialized,
    /// Last load succeeded
    Success,
    /// Last load failed (deserialization error, corruption, etc.)
    Failed,
}

impl LoadState {
    fn get(href: &str) -> LoadState {
        let map = LOAD_STATE_MAP.get_or_init(|| Mutex::new(HashMap::new()));
        *map.lock()
            .unwrap()
            .get(href)
            .unwrap_or(&LoadState::Uninitialized)
    }

    fn set(href: &str, state: LoadState) {
        let map = LOAD_STATE_MAP.get_or_init(|| Mutex::new(HashMap::new()));
        map.lock().unwrap().insert(href.to_string(), state);
    }
}

/// Registry for managing multiple local calendars
pub struct LocalCalendarRegistry;

impl LocalCalendarRegistry {
    fn get_path() -> Option<PathBuf> {
        AppPaths::get_data_dir()
            .ok()
            .map(|p| p.join(LOCAL_REGISTRY_FILENAME))
    }

    /// Load all local calendars from the registry
    pub fn load() -> Result<Vec<CalendarListEntry>> {
        let mut cals = vec![];

        // Ensure default local calendar always exists
        let default_cal = CalendarListEntry {
            name: LOCAL_CALENDAR_NAME.to_string(),
            href: LOCAL_CALENDAR_HREF.to_string(),
            color: None,
        };

        if let Some(path) = Self::get_path()
            && path.exists()
            && let Ok(content) = LocalStorage::with_lock(&path, || Ok(fs::read_to_string(&path)?))
            && let Ok(registry) = serde_json::from_str::<Vec<CalendarListEntry>>(&content)
        {
            cals = registry;
        }

        // Ensure default is present if missing (or empty registry)
        if !cals.iter().any(|c| c.href == LOCAL_CALENDAR_HREF) {
            cals.insert(0, default_cal);
        }

        Ok(cals)
    }

    /// Save all local calendars to the registry
    pub fn save(calendars: &[CalendarListEntry]) -> Result<()> {
        if let Some(path) = Self::get_path() {
            LocalStorage::with_lock(&path, || {
                let json = serde_json::to_string_pretty(calendars)?;
                LocalStorage::atomic_write(&path, json)?;
                Ok(())
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod registry_tests {
    use super::*;
    use serial_test::serial;

    // RAII guard to restore CFAIT_TEST_DIR after test
    struct TestDirGuard {
        original_value: Option<String>,
        temp_dir: std::path::PathBuf,
    }

    impl TestDirGuard {
        fn new(test_name: &str) -> Self {
            let original_value = std::env::var("CFAIT_TEST_DIR").ok();
            let temp_dir = std::env::temp_dir().join(format!(
                "cfait_test_{}_{}",
                test_name,
                std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .unwrap()
                    .as_nanos()
            ));
            let _ = fs::create_dir_all(&temp_dir);

            // Clear load state map BEFORE setting new directory to prevent test interference
            if let Some(map) = LOAD_STATE_MAP.get() {
                map.lock().unwrap().clear();
            }

            unsafe {
                std::env::set_var("CFAIT_TEST_DIR", &temp_dir);
            }

            Self {
                original_value,
                temp_dir,
            }
        }
    }

    impl Drop for TestDirGuard {
        fn drop(&mut self) {
            // Clean up temp directory
            let _ = fs::remove_dir_all(&self.temp_dir);

            // Restore original CFAIT_TEST_DIR or remove if it wasn't set
            unsafe {
                match &self.original_value {
                    Some(val) => std::env::set_var("CFAIT_TEST_DIR", val),
                    None => std::env::remove_var("CFAIT_TEST_DIR"),
                }
            }

            // Clear load state map again to prevent leaking state to next test
            if let Some(map) = LOAD_STATE_MAP.get() {
                map.lock().unwrap().clear();
            }
        }
    }

    fn create_test_task(uid: &str, summary: &str, calendar_href: &str) -> Task {
        let mut task = Task::new(summary, &std::collections::HashMap::new(), None);
        task.uid = uid.to_string();
        task.calendar_href = calendar_href.to_string();
        task
    }

    #[test]
    #[serial]
    fn test_multi_calendar_save_and_load() {
        let _guard = TestDirGuard::new("multi_save_load");

        // Create registry with multiple calendars
        let cal1 = CalendarListEntry {
            name: "Work".to_string(),
            href: "local://work".to_string(),
            color: Some("#FF0000".to_string()),
        };
        let cal2 = CalendarListEntry {
            name: "Personal".to_string(),
            href: "local://personal".to_string(),
            color: Some("#00FF00".to_string()),
        };

        let registry = vec![cal1.clone(), cal2.clone()];
        LocalCalendarRegistry::save(&registry).unwrap();

        // Create tasks for each calendar
        let task1 = create_test_task("task1", "Work task", "local://work");
        let task2 = create_test_task("task2", "Personal task", "local://personal");

        // Save to different calendars
        LocalStorage::save_for_href("local://work", std::slice::from_ref(&task1)).unwrap();
        LocalStorage::save_for_href("local://personal", std::slice::from_ref(&task2)).unwrap();

        // Load and verify each calendar independently
        let loaded_work = LocalStorage::load_for_href("local://work").unwrap();
        assert_eq!(loaded_work.len(), 1);
        assert_eq!(loaded_work[0].uid, "task1");
        assert_eq!(loaded_work[0].summary, "Work task");

        let loaded_personal = LocalStorage::load_for_href("local://personal").unwrap();
        assert_eq!(loaded_personal.len(), 1);
        assert_eq!(loaded_personal[0].uid, "task2");
        assert_eq!(loaded_personal[0].summary, "Personal task");

        // Verify registry persists (may include default local calendar)
        let loaded_registry = LocalCalendarRegistry::load().unwrap();
        assert!(loaded_registry.len() >= 2);
        assert!(loaded_registry.iter().any(|c| c.href == "local://work"));
        assert!(loaded_registry.iter().any(|c| c.href == "local://personal"));
    }

    #[test]
    #[serial]
    fn test_multi_calendar_isolation() {
        let _guard = TestDirGuard::new("multi_isolation");

        // Create two calendars with tasks
        let task1 = create_test_task("task1", "Calendar A task", "local://cal-a");
        let task2 = create_test_task("task2", "Calendar B task", "local://cal-b");

        LocalStorage::save_for_href("local://cal-a", std::slice::from_ref(&task1)).unwrap();
        LocalStorage::save_for_href("local://cal-b", std::slice::from_ref(&task2)).unwrap();

        // Modify calendar A
        let mut cal_a_tasks = LocalStorage::load_for_href("local://cal-a").unwrap();
        let task3 = create_test_task("task3", "Another A task", "local://cal-a");
        cal_a_tasks.push(task3);
        LocalStorage::save_for_href("local://cal-a", &cal_a_tasks).unwrap();

        // Verify calendar B is unchanged
        let cal_b_tasks = LocalStorage::load_for_href("local://cal-b").unwrap();
        assert_eq!(cal_b_tasks.len(), 1);
        assert_eq!(cal_b_tasks[0].uid, "task2");

        // Verify calendar A has two tasks
        let cal_a_tasks = LocalStorage::load_for_href("local://cal-a").unwrap();
        assert_eq!(cal_a_tasks.len(), 2);
    }

    #[test]
    #[serial]
    fn test_multi_calendar_default_compatibility() {
        let _guard = TestDirGuard::new("multi_compat");

        // Create task using old API (default calendar)
        let task = create_test_task("default-task", "Default task", LOCAL_CALENDAR_HREF);

        LocalStorage::save(std::slice::from_ref(&task)).unwrap();

        // Verify it's accessible via both APIs
        let loaded_old = LocalStorage::load().unwrap();
        let loaded_new = LocalStorage::load_for_href(LOCAL_CALENDAR_HREF).unwrap();

        assert_eq!(loaded_old.len(), 1);
        assert_eq!(loaded_new.len(), 1);
        assert_eq!(loaded_old[0].uid, loaded_new[0].uid);
    }

    #[test]
    #[serial]
    fn test_multi_calendar_independent_operations() {
        let _guard = TestDirGuard::new("multi_independent");

        // Create calendar A with one task
        let task_a = create_test_task("task-a", "Task A", "local://cal-a");
        LocalStorage::save_for_href("local://cal-a", std::slice::from_ref(&task_a)).unwrap();

        // Create calendar B with one task
        let task_b = create_test_task("task-b", "Task B", "local://cal-b");
        LocalStorage::save_for_href("local://cal-b", std::slice::from_ref(&task_b)).unwrap();

        // Verify both calendars work independently
        let loaded_a = LocalStorage::load_for_href("local://cal-a").unwrap();
        assert_eq!(loaded_a.len(), 1);
        assert_eq!(loaded_a[0].uid, "task-a");

        let loaded_b = LocalStorage::load_for_href("local://cal-b").unwrap();
        assert_eq!(loaded_b.len(), 1);
        assert_eq!(loaded_b[0].uid, "task-b");

        // Update calendar A - should not affect calendar B
        let mut tasks_a = loaded_a;
        let task_a2 = create_test_task("task-a2", "Task A2", "local://cal-a");
        tasks_a.push(task_a2);
        LocalStorage::save_for_href("local://cal-a", &tasks_a).unwrap();

        // Verify calendar A has 2 tasks
        let reloaded_a = LocalStorage::load_for_href("local://cal-a").unwrap();
        assert_eq!(reloaded_a.len(), 2);

        // Verify calendar B still has 1 task (unchanged)
        let reloaded_b = LocalStorage::load_for_href("local://cal-b").unwrap();
        assert_eq!(reloaded_b.len(), 1);
        assert_eq!(reloaded_b[0].uid, "task-b");
    }
}

pub struct LocalStorage;

impl LocalStorage {
    /// Returns the file path for a given local calendar href.
    /// local://default -> local.json
    /// local://<uuid>  -> local_<safe_uuid>.json
    pub fn get_path_for_href(href: &str) -> Option<PathBuf> {
        if href == LOCAL_CALENDAR_HREF {
            AppPaths::get_local_task_path()
        } else if href.starts_with("local://") {
            let id = href.trim_start_matches("local://");
            // Sanitize the ID to only allow alphanumeric and hyphens
            let safe_id: String = id
                .chars()
                .filter(|c| c.is_alphanumeric() || *c == '-')
                .collect();
            AppPaths::get_data_dir()
                .ok()
                .map(|p| p.join(format!("local_{}.json", safe_id)))
        } else {
            None
        }
    }

    /// Legacy method for backward compatibility (redirects to default)
    pub fn get_path() -> Option<PathBuf> {
        Self::get_path_for_href(LOCAL_CALENDAR_HREF)
    }

    /// Imports tasks from an ICS string and merges them into the specified calendar.
    /// Returns the number of tasks successfully imported.
    pub fn import_from_ics(calendar_href: &str, ics_content: &str) -> Result<usize> {
        let mut imported_tasks = Vec::new();

        // Normalize line endings to \r\n for consistent parsing
        let normalized_content = ics_content.replace("\r\n", "\n").replace('\n', "\r\n");

        // Split by VTODO blocks and parse each
        let parts: Vec<&str> = normalized_content.split("BEGIN:VTODO").collect();

        // Skip the first part (before first VTODO or VCALENDAR header)
        for component in parts.iter().skip(1) {
            if !component.contains("END:VTODO") {
                continue;
            }

            // Extract just the VTODO content (everything up to and including END:VTODO)
            let vtodo_end = match component.find("END:VTODO") {
                Some(pos) => pos + "END:VTODO".len(),
                None => continue,
            };
            let vtodo_content = &component[..vtodo_end];

            // Reconstruct a valid VTODO block
            let vtodo = format!("BEGIN:VTODO{}", vtodo_content);

            // Always wrap in a proper VCALENDAR for parsing
            let full_ics = format!(
                "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nPRODID:-//cfait//cfait//EN\r\n{}\r\nEND:VCALENDAR",
                vtodo
            );

            // Parse the task
            if let Ok(task) = Task::from_ics(
                &full_ics,
                String::new(), // Empty etag for imported tasks
                format!("{}.ics", uuid::Uuid::new_v4()), // Generate new href
                calendar_href.to_string(),
            ) {
                imported_tasks.push(task);
            }
        }

        if imported_tasks.is_empty() {
            anyhow::bail!("No valid tasks found in ICS file");
        }

        // Load existing tasks
        let mut existing_tasks = Self::load_for_href(calendar_href)?;

        // Merge: append imported tasks
        let count = imported_tasks.len();
        existing_tasks.extend(imported_tasks);

        // Save back
        Self::save_for_href(calendar_href, &existing_tasks)?;

        Ok(count)
    }

    /// Generates a single VCALENDAR string containing all provided tasks as VTODO components.
    pub fn to_ics_string(tasks: &[Task]) -> String {
        let mut output =
            String::from("BEGIN:VCALENDAR\r\nVERSION:2.0\r\nPRODID:-//Cfait//Export//EN\r\n");

        for task in tasks {
            let full_ics = task.to_ics();
            // Extract the VTODO block from the full VCALENDAR string generated by the model
            if let Some(start) = full_ics.find("BEGIN:VTODO")
                && let Some(end_idx) = full_ics.rfind("END:VTODO")
            {
                // Extract up to and including END:VTODO
                // "END:VTODO" is 9 chars long
                let vtodo = &full_ics[start..end_idx + 9];
                output.push_str(vtodo);
                output.push_str("\r\n");
            }
        }

        output.push_str("END:VCALENDAR");
        output
    }

    /// Helper to get a sidecar lock file path (Desktop only)
    #[cfg(not(target_os = "android"))]
    fn get_lock_path(file_path: &Path) -> PathBuf {
        let mut lock_path = file_path.to_path_buf();
        if let Some(ext) = lock_path.extension() {
            let mut new_ext = ext.to_os_string();
            new_ext.push(".lock");
            lock_path.set_extension(new_ext);
        } else {
            lock_path.set_extension("lock");
        }
        lock_path
    }

    // --- DESKTOP IMPLEMENTATION (fs2) ---
    #[cfg(not(target_os = "android"))]
    pub fn with_lock<F, T>(file_path: &Path, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        let lock_path = Self::get_lock_path(file_path);
        let file = fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        file.lock_exclusive()?;
        let result = f();
        file.unlock()?;
        result
    }

    // --- ANDROID IMPLEMENTATION (In-Memory Mutex) ---
    #[cfg(target_os = "android")]
    pub fn with_lock<F, T>(file_path: &Path, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        // Get the global map
        let map_mutex = ANDROID_FILE_LOCKS.get_or_init(|| Mutex::new(HashMap::new()));

        // Canonicalize to avoid race conditions via symlinks or relative paths
        let key = file_path.canonicalize().unwrap_or(file_path.to_path_buf());

        // Get or create the mutex specifically for this file path
        let file_mutex = {
            let mut map = map_mutex.lock().unwrap();
            map.entry(key)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };

        // Lock this specific file
        let _guard = file_mutex.lock().unwrap();

        // Perform operation
        f()
    }

    /// Atomic write: Write to .tmp file then rename
    pub fn atomic_write<P: AsRef<Path>, C: AsRef<[u8]>>(path: P, contents: C) -> Result<()> {
        let path = path.as_ref();
        let tmp_path = path.with_extension("tmp");
        fs::write(&tmp_path, contents)?;
        fs::rename(tmp_path, path)?;
        Ok(())
    }

    /// Load tasks from a specific file path (Internal)
    fn load_from_path(path: &Path, href: &str) -> Result<Vec<Task>> {
        if !path.exists() {
            LoadState::set(href, LoadState::Success);
            return Ok(vec![]);
        }
        let result = Self::with_lock(path, || {
            let json = fs::read_to_string(path)?;

            // Try to parse as versioned format first
            let (tasks, needs_upgrade) =
                if let Ok(data) = serde_json::from_str::<LocalStorageData>(&json) {
                    // Versioned format detected
                    if data.version == LOCAL_STORAGE_VERSION {
                        // Current version, use directly
                        (data.tasks, false)
                    } else {
                        // Old version, migrate
                        (Self::migrate_to_current(data.version, &json)?, true)
                    }
                } else {
                    // No version field or parsing failed - assume v1 (unversioned)
                    #[cfg(target_os = "android")]
                    log::info!("Migrating {} from v1 to v{}", href, LOCAL_STORAGE_VERSION);
                    #[cfg(not(target_os = "android"))]
                    eprintln!("Migrating {} from v1 to v{}", href, LOCAL_STORAGE_VERSION);

                    (Self::migrate_v1_to_v2(&json)?, true)
                };

            // If we migrated, save the upgraded version immediately
            if needs_upgrade {
                let data = LocalStorageData {
                    version: LOCAL_STORAGE_VERSION,
                    tasks: tasks.clone(),
                };
                let upgraded_json = serde_json::to_string_pretty(&data)?;
                Self::atomic_write(path, upgraded_json)?;
            }

            Ok(tasks)
        });

        match &result {
            Ok(_) => LoadState::set(href, LoadState::Success),
            Err(_) => LoadState::set(href, LoadState::Failed),
        }
        result
    }

    /// Save tasks to a specific file path (Internal)
    fn save_to_path(path: &Path, href: &str, tasks: &[Task]) -> Result<()> {
        if !Self::can_save_href(href) {
            return Err(anyhow::anyhow!(
                "Cannot save {}: previous load failed. This prevents overwriting data that couldn't be read.",
                href
            ));
        }
        Self::with_lock(path, || {
            let data = LocalStorageData {
                version: LOCAL_STORAGE_VERSION,
                tasks: tasks.to_vec(),
            };
            let json = serde_json::to_string_pretty(&data)?;
            Self::atomic_write(path, json)?;
            Ok(())
        })
    }

    /// Public load method handling any local href
    pub fn load_for_href(href: &str) -> Result<Vec<Task>> {
        if let Some(path) = Self::get_path_for_href(href) {
            Self::load_from_path(&path, href)
        } else {
            // Unknown scheme, return empty
            Ok(vec![])
        }
    }

    /// Public save method handling any local href
    pub fn save_for_href(href: &str, tasks: &[Task]) -> Result<()> {
        if let Some(path) = Self::get_path_for_href(href) {
            Self::save_to_path(&path, href, tasks)
        } else {
            Err(anyhow::anyhow!("Invalid local href: {}", href))
        }
    }

    /// Save tasks to local.json (default calendar)
    ///
    /// # Data Loss Prevention
    /// This function checks `LoadState` before saving. If the last `load()` failed,
    /// this will return an error instead of overwriting the file with potentially
    /// incomplete data.
    ///
    /// To force a save (e.g., after manual data recovery), call `force_save()` instead.
    pub fn save(tasks: &[Task]) -> Result<()> {
        Self::save_for_href(LOCAL_CALENDAR_HREF, tasks)
    }

    /// Force save tasks to local.json (default calendar), bypassing load state check.
    ///
    /// # WARNING
    /// This bypasses the data loss prevention check. Only use this if:
    /// - You've manually verified the data is correct
    /// - You're recovering from a known issue
    /// - You understand the risks of overwriting existing data
    ///
    /// In most cases, use `save()` instead.
    pub fn force_save(tasks: &[Task]) -> Result<()> {
        if let Some(path) = Self::get_path() {
            Self::with_lock(&path, || {
                let data = LocalStorageData {
                    version: LOCAL_STORAGE_VERSION,
                    tasks: tasks.to_vec(),
                };
                let json = serde_json::to_string_pretty(&data)?;
                Self::atomic_write(&path, json)?;
                Ok(())
            })?;
        }
        Ok(())
    }

    /// Migrate tasks from version 1 (unversioned) to version 2 (versioned with DateType)
    /// This handles the v3.12 -> v3.14 migration using the backward-compatible deserializer
    fn migrate_v1_to_v2(json: &str) -> Result<Vec<Task>> {
        // The backward-compatible deserializer in Task struct handles this automatically
        // It converts DateTime<Utc> strings to DateType::Specific
        serde_json::from_str::<Vec<Task>>(json)
            .map_err(|e| anyhow::anyhow!("Failed to migrate v1 to v2: {}", e))
    }

    /// Run migrations to upgrade from old version to current version
    ///
    /// This function chains migrations automatically: v0 → v1 → v2 → v3 → ... → current
    /// Each migration is applied in sequence, ensuring proper data transformation.
    fn migrate_to_current(old_version: u32, json: &str) -> Result<Vec<Task>> {
        #[cfg(target_os = "android")]
        log::info!(
            "Migrating local storage from v{} to v{}",
            old_version,
            LOCAL_STORAGE_VERSION
        );
        #[cfg(not(target_os = "android"))]
        eprintln!(
            "Migrating local storage from v{} to v{}",
            old_version, LOCAL_STORAGE_VERSION
        );

        // Check for future versions first
        if old_version > LOCAL_STORAGE_VERSION {
            return Err(anyhow::anyhow!(
                "Local storage version {} is newer than supported version {}. Please upgrade Cfait.",
                old_version,
                LOCAL_STORAGE_VERSION
            ));
        }

        // Parse the JSON based on the old version format
        let tasks = match old_version {
            0 | 1 => {
                // Version 0 or 1: Unversioned format (v3.12 and earlier)
                // Parse as raw Vec<Task> which uses backward-compatible deserializer
                Self::migrate_v1_to_v2(json)?
            }
            2 => {
                // Version 2: Versioned format with DateType
                let data: LocalStorageData = serde_json::from_str(json)?;
                data.tasks
            }
            3 => {
                // Version 3: Added estimated_duration_max for duration ranges
                let data: LocalStorageData = serde_json::from_str(json)?;
                data.tasks
            }
            _ => {
                return Err(anyhow::anyhow!(
                    "Unknown local storage version: {}",
                    old_version
                ));
            }
        };

        // Now apply incremental migrations in sequence
        // This allows chaining: v1 → v2 → v3 → v4 automatically

        // Example for future v3:
        // if old_version < 3 {
        //     tasks = migrate_v2_to_v3(tasks)?;
        // }

        // Example for future v4:
        // if old_version < 4 {
        //     tasks = migrate_v3_to_v4(tasks)?;
        // }

        Ok(tasks)
    }

    /// Load tasks from local.json with automatic version migration
    ///
    /// # CRITICAL WARNING
    /// **NEVER** silently ignore errors from this function using `if let Ok(_)` or `.unwrap_or_default()`!
    ///
    /// In v3.14, silent error handling caused data loss when the serialization format changed.
    /// Users upgrading from v3.12 had their local.json deserialization fail, which was silently
    /// ignored, resulting in an empty task list that overwrote their data.
    ///
    /// **Always** log errors from this function. If deserialization fails, it indicates:
    /// - Data corruption
    /// - Format incompatibility (version mismatch)
    /// - File system issues
    ///
    /// See MIGRATION_V3.12_TO_V3.14.md for details on the incident and prevention measures.
    ///
    /// # Load State Tracking
    /// This function tracks load success/failure via `LoadState`. If loading fails,
    /// `save()` will be blocked to prevent overwriting corrupted or incompatible data.
    ///
    /// # Version Migration
    /// This function automatically detects the storage version and migrates data if needed:
    /// - Version 0/1: Unversioned format (v3.12) with DateTime<Utc> → migrates to v2
    /// - Version 2: Current format with DateType enum → loads directly
    /// - Future versions: Additional migrations applied as needed
    pub fn load() -> Result<Vec<Task>> {
        Self::load_for_href(LOCAL_CALENDAR_HREF)
    }

    /// Check if the last load operation succeeded for the default calendar.
    ///
    /// Returns `true` if:
    /// - Load succeeded
    /// - No load has been attempted yet (Uninitialized state)
    ///
    /// Returns `false` if:
    /// - Load failed (deserialization error, corruption, etc.)
    pub fn can_save() -> bool {
        Self::can_save_href(LOCAL_CALENDAR_HREF)
    }

    /// Check if the last load operation succeeded for a specific calendar.
    ///
    /// Returns `true` if:
    /// - Load succeeded
    /// - No load has been attempted yet (Uninitialized state)
    ///
    /// Returns `false` if:
    /// - Load failed (deserialization error, corruption, etc.)
    pub fn can_save_href(href: &str) -> bool {
        match LoadState::get(href) {
            LoadState::Uninitialized => true, // Allow save if never loaded
            LoadState::Success => true,
            LoadState::Failed => false,
        }
    }
}
