//! Keyed store of cross-section splines.
//!
//! A [`SplineRegistry`] maps a process key (algorithm name, configuration
//! and process string) to a spline. Entries are computed lazily through
//! [`SplineRegistry::get_or_create`] or bulk-loaded from an XML library
//! (see [`crate::xml`]). For a given key the response algorithm runs at most
//! once per registry lifetime, also when several threads miss concurrently.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use log::{debug, warn};
use parking_lot::{Mutex, RwLock};

use xsec_core::{ProcessDescription, ResponseAlgorithm};

use crate::builder::build_spline;
use crate::config::{BuildOverrides, SplineDefaults};
use crate::error::SplineError;
use crate::knots::{KnotSpacing, MIN_KNOTS};
use crate::spline::CubicSpline;

/// Separator between the components of a process key.
pub const KEY_SEPARATOR: char = '/';

/// Where a registry entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    /// Built in this session by a response algorithm.
    Computed,
    /// Read from a spline library file.
    Loaded,
}

/// A stored spline and its provenance.
#[derive(Debug, Clone)]
pub struct SplineEntry {
    pub spline: Arc<CubicSpline>,
    pub provenance: Provenance,
}

/// Derive the registry key for an (algorithm, process) pair.
///
/// Returns an empty string if either is absent. The empty key never
/// matches a stored entry.
pub fn build_key(
    algorithm: Option<&dyn ResponseAlgorithm>,
    process: Option<&dyn ProcessDescription>,
) -> String {
    let Some(algorithm) = algorithm else {
        warn!("No response algorithm - returning empty spline key");
        return String::new();
    };
    let Some(process) = process else {
        warn!("No process description - returning empty spline key");
        return String::new();
    };

    let id = algorithm.id();
    format!(
        "{}{sep}{}{sep}{}",
        id.name,
        id.config,
        process.canonical_string(),
        sep = KEY_SEPARATOR
    )
}

/// Removes a key's build lock from the in-flight map when dropped, also
/// when the build unwinds.
struct InFlight<'a> {
    map: &'a Mutex<HashMap<String, Arc<Mutex<()>>>>,
    key: &'a str,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.map.lock().remove(self.key);
    }
}

/// Cross-section spline cache shared by every consumer of a job.
#[derive(Debug, Default)]
pub struct SplineRegistry {
    entries: RwLock<BTreeMap<String, SplineEntry>>,
    defaults: RwLock<SplineDefaults>,
    /// Per-key locks held across miss → build → insert.
    in_flight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SplineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults(defaults: SplineDefaults) -> Self {
        Self {
            defaults: RwLock::new(defaults.sanitised()),
            ..Self::default()
        }
    }

    // ── Lookup ─────────────────────────────────────────────────────────

    pub fn exists(&self, key: &str) -> bool {
        let exists = !key.is_empty() && self.entries.read().contains_key(key);
        debug!("Spline with key = {} found? {}", key, exists);
        exists
    }

    pub fn exists_for(
        &self,
        algorithm: &dyn ResponseAlgorithm,
        process: &dyn ProcessDescription,
    ) -> bool {
        self.exists(&build_key(Some(algorithm), Some(process)))
    }

    /// Stored spline for `key`, or `None` (logged) if there is none.
    pub fn get(&self, key: &str) -> Option<Arc<CubicSpline>> {
        let found = self.lookup(key);
        if found.is_none() {
            warn!("Couldn't find spline for key = {}", key);
        }
        found
    }

    pub fn get_for(
        &self,
        algorithm: &dyn ResponseAlgorithm,
        process: &dyn ProcessDescription,
    ) -> Option<Arc<CubicSpline>> {
        self.get(&build_key(Some(algorithm), Some(process)))
    }

    pub fn provenance(&self, key: &str) -> Option<Provenance> {
        self.entries.read().get(key).map(|e| e.provenance)
    }

    fn lookup(&self, key: &str) -> Option<Arc<CubicSpline>> {
        if key.is_empty() {
            return None;
        }
        self.entries.read().get(key).map(|e| Arc::clone(&e.spline))
    }

    // ── Construction ───────────────────────────────────────────────────

    /// Return the spline for (`algorithm`, `process`), building and storing
    /// it first if the registry does not hold one.
    ///
    /// Concurrent callers missing on the same key wait for a single build.
    ///
    /// # Panics
    /// Panics if the resolved energy range is empty (see [`build_spline`]).
    pub fn get_or_create(
        &self,
        algorithm: &dyn ResponseAlgorithm,
        process: &dyn ProcessDescription,
        overrides: &BuildOverrides,
    ) -> Result<Arc<CubicSpline>, SplineError> {
        let key = build_key(Some(algorithm), Some(process));
        if let Some(spline) = self.lookup(&key) {
            return Ok(spline);
        }

        let key_lock = Arc::clone(self.in_flight.lock().entry(key.clone()).or_default());
        let _release = InFlight {
            map: &self.in_flight,
            key: &key,
        };
        let _building = key_lock.lock();

        // Another thread may have finished the build while we waited.
        if let Some(spline) = self.lookup(&key) {
            return Ok(spline);
        }

        let defaults = self.defaults();
        let result = build_spline(algorithm, process, &defaults, overrides).map(Arc::new);
        if let Ok(spline) = &result {
            self.entries.write().insert(
                key.clone(),
                SplineEntry {
                    spline: Arc::clone(spline),
                    provenance: Provenance::Computed,
                },
            );
        }
        result
    }

    /// Build a spline for (`algorithm`, `process`) and store it unless the
    /// key is already taken, in which case the existing entry is kept.
    pub fn create_spline(
        &self,
        algorithm: &dyn ResponseAlgorithm,
        process: &dyn ProcessDescription,
        overrides: &BuildOverrides,
    ) -> Result<(), SplineError> {
        let key = build_key(Some(algorithm), Some(process));
        let spline = build_spline(algorithm, process, &self.defaults(), overrides)?;
        if !self.insert(key.clone(), Arc::new(spline), Provenance::Computed) {
            warn!("Spline {} already exists - keeping the existing entry", key);
        }
        Ok(())
    }

    /// Insert an entry if `key` is free. Returns whether it was inserted.
    pub(crate) fn insert(
        &self,
        key: String,
        spline: Arc<CubicSpline>,
        provenance: Provenance,
    ) -> bool {
        let mut entries = self.entries.write();
        if entries.contains_key(&key) {
            return false;
        }
        entries.insert(key, SplineEntry { spline, provenance });
        true
    }

    /// Remove every entry.
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Replace the contents in one step (used by a reset-and-reload).
    pub(crate) fn replace_all(&self, entries: BTreeMap<String, SplineEntry>) {
        *self.entries.write() = entries;
    }

    // ── Enumeration ────────────────────────────────────────────────────

    /// All keys, in ascending order.
    pub fn keys(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Copy of the entries in key order, for export.
    pub(crate) fn snapshot(&self) -> Vec<(String, SplineEntry)> {
        self.entries
            .read()
            .iter()
            .map(|(k, e)| (k.clone(), e.clone()))
            .collect()
    }

    // ── Defaults ───────────────────────────────────────────────────────

    pub fn defaults(&self) -> SplineDefaults {
        *self.defaults.read()
    }

    /// Update all defaults at once. The knot count is floored at
    /// [`MIN_KNOTS`]; non-positive energies are ignored.
    pub fn set_defaults(&self, n_knots: usize, e_min: f64, e_max: f64, spacing: KnotSpacing) {
        self.set_n_knots(n_knots);
        self.set_e_min(e_min);
        self.set_e_max(e_max);
        self.set_spacing(spacing);
    }

    pub fn set_n_knots(&self, n_knots: usize) {
        self.defaults.write().n_knots = n_knots.max(MIN_KNOTS);
    }

    pub fn set_e_min(&self, e_min: f64) {
        if e_min > 0.0 {
            self.defaults.write().e_min = e_min;
        }
    }

    pub fn set_e_max(&self, e_max: f64) {
        if e_max > 0.0 {
            self.defaults.write().e_max = e_max;
        }
    }

    pub fn set_spacing(&self, spacing: KnotSpacing) {
        self.defaults.write().use_log = spacing.is_log();
    }
}

impl fmt::Display for SplineRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = self.defaults();
        writeln!(f, "Spline registry")?;
        writeln!(f, "  use log E ........ {}", d.use_log)?;
        writeln!(f, "  n knots .......... {}", d.n_knots)?;
        writeln!(f, "  E min ............ {} GeV", d.e_min)?;
        writeln!(f, "  E max ............ {} GeV", d.e_max)?;
        writeln!(f, "  splines:")?;
        for (key, entry) in self.entries.read().iter() {
            let tag = match entry.provenance {
                Provenance::Computed => "computed",
                Provenance::Loaded => "loaded",
            };
            writeln!(f, "    {} [{}, {} knots]", key, tag, entry.spline.len())?;
        }
        Ok(())
    }
}
