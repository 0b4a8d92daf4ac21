use std::fs;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use profline_codec::{parse_any, Format, ProfileTransport};
use profline_core::{Entry, FromValue, LoadAction, LoadReport, Profile, Value};

use crate::atomic;
use crate::error::{PersistError, PersistResult};
use crate::filter::without_command_line;
use crate::location;
use crate::lock::FileLock;
use crate::options::{CreatePolicy, CreatePrompt, StoreOptions};
use crate::reserved::{NO_SAVE, PROFILE_FORMAT, SAVE_COMMAND_LINE};

/// How [`ProfileStore::open`] found the backing file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpenOutcome {
    /// An existing file was loaded. `converted` is set when it was stored in
    /// the other format and has been rewritten in the configured one.
    Loaded { converted: bool },
    /// The file did not exist and was created from the registered defaults.
    Created,
    /// The file did not exist and was not created.
    NotCreated,
}

/// State that exists only while the store is bound to a file.
#[derive(Debug)]
struct Binding {
    path: PathBuf,
    _lock: FileLock,
    save_enabled: bool,
    created: bool,
    /// The command-line batch as given, replayed on reload.
    command_line: Profile,
    /// Entries the command line applied, under their resolved keys.
    overrides: Vec<Entry>,
    /// What the file held as of the last load or save.
    baseline: Profile,
}

/// A profile bound to a locked backing file.
///
/// Construction is two-phase. [`ProfileStore::new`] gives an unbound store on
/// which defaults can be registered through [`get_add`](Self::get_add);
/// [`open`](Self::open) then locks and loads the file, creating it from those
/// defaults on first run, and overlays the command line.
///
/// While bound, every mutation through the store saves. Direct edits through
/// [`profile_mut`](Self::profile_mut) are persisted on the next
/// [`save`](Self::save).
#[derive(Debug)]
pub struct ProfileStore {
    profile: Profile,
    options: StoreOptions,
    format: Format,
    binding: Option<Binding>,
}

impl ProfileStore {
    /// An unbound store with an empty profile.
    pub fn new(options: StoreOptions) -> Self {
        let profile = if options.literal_keys {
            Profile::literal()
        } else {
            Profile::new()
        };
        Self {
            profile,
            format: options.format,
            options,
            binding: None,
        }
    }

    /// Bind to the backing file, load it, and merge `command_line` over it.
    ///
    /// Fails with [`PersistError::LockContention`] if another instance holds
    /// the file, and with [`PersistError::CorruptFile`] if neither codec can
    /// read it.
    pub fn open(
        &mut self,
        command_line: Profile,
        prompt: Option<&dyn CreatePrompt>,
    ) -> PersistResult<OpenOutcome> {
        if self.binding.is_some() {
            self.close();
        }

        if let Some(value) = command_line.get(PROFILE_FORMAT) {
            self.format = value.text().parse()?;
        }
        let path = location::resolve(&self.options, &command_line, self.format)?;
        let lock = FileLock::acquire(&path)?;

        let exists = path.exists();
        let mut loaded_format = self.format;
        let mut missing_defaults = 0;
        if exists {
            let decoded = read_file(&path, self.format)?;
            loaded_format = decoded.format;
            let defaults = std::mem::replace(&mut self.profile, Profile::new());
            self.profile.set_literal_keys(defaults.literal_keys());
            self.profile.load(decoded.profile, LoadAction::Overwrite);
            for entry in defaults {
                if self.profile.get_add_entry(&entry.key, entry.value).1 {
                    missing_defaults += 1;
                }
            }
            info!(path = %path.display(), entries = self.profile.len(), format = %loaded_format, "profile loaded");
        }

        let create = !exists
            && match self.options.create {
                CreatePolicy::Always => true,
                CreatePolicy::Never => false,
                CreatePolicy::Prompt => prompt.is_some_and(|p| p.confirm_create(&path)),
            };
        if !exists && !create {
            info!(path = %path.display(), "profile file missing; not creating it");
        }

        let baseline = self.profile.clone();
        let report = self.profile.load(command_line.clone(), LoadAction::Merge);
        self.binding = Some(Binding {
            path,
            _lock: lock,
            save_enabled: exists || create,
            created: false,
            command_line,
            overrides: report.applied,
            baseline,
        });

        if exists {
            let converted = loaded_format != self.format;
            if converted || missing_defaults > 0 {
                debug!(converted, missing_defaults, "rewriting loaded profile");
                self.save()?;
            }
            return Ok(OpenOutcome::Loaded { converted });
        }

        if create && self.save()? {
            if let Some(binding) = self.binding.as_mut() {
                binding.created = true;
                info!(path = %binding.path.display(), "profile file created");
            }
            return Ok(OpenOutcome::Created);
        }
        Ok(OpenOutcome::NotCreated)
    }

    /// Release the lock and forget the backing file. The live profile is
    /// kept as it would be saved, so command-line overrides do not outlive
    /// the binding they were applied to.
    pub fn close(&mut self) {
        if let Some(binding) = self.binding.take() {
            self.profile = self.persisted_view(&binding);
            info!(path = %binding.path.display(), "profile closed");
        }
    }

    pub fn is_bound(&self) -> bool {
        self.binding.is_some()
    }

    /// The backing file, if bound.
    pub fn path(&self) -> Option<&Path> {
        self.binding.as_ref().map(|b| b.path.as_path())
    }

    /// Returns `true` if `open` created the backing file.
    pub fn was_created(&self) -> bool {
        self.binding.as_ref().is_some_and(|b| b.created)
    }

    /// Returns `true` if automatic saves would currently be written.
    pub fn save_enabled(&self) -> bool {
        self.binding.as_ref().is_some_and(|b| b.save_enabled) && !self.flag(NO_SAVE)
    }

    pub fn format(&self) -> Format {
        self.format
    }

    /// Switch codec. The next save writes the new format.
    pub fn set_format(&mut self, format: Format) {
        self.format = format;
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    /// Direct access to the live profile. Changes are not saved until the
    /// next [`save`](Self::save).
    pub fn profile_mut(&mut self) -> &mut Profile {
        &mut self.profile
    }

    pub fn into_profile(self) -> Profile {
        self.profile
    }

    // ---------------------------------------------------------------
    // Reads and saving mutations
    // ---------------------------------------------------------------

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.profile.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.profile.contains_key(key)
    }

    pub fn subset(&self, key: &str, strip_prefix: bool) -> Profile {
        self.profile.subset(key, strip_prefix)
    }

    /// Set the first match (or append) and save.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> PersistResult<()> {
        self.profile.set(key, value);
        self.save()?;
        Ok(())
    }

    /// Remove every match and save if anything was removed.
    pub fn remove(&mut self, key: &str) -> PersistResult<usize> {
        let removed = self.profile.remove(key);
        if removed > 0 {
            self.save()?;
        }
        Ok(removed)
    }

    /// Return the value of `key`, recording and saving `default` when absent.
    pub fn get_add(&mut self, key: &str, default: impl Into<Value>) -> PersistResult<Value> {
        let (value, inserted) = self.profile.get_add_entry(key, default);
        if inserted {
            self.save()?;
        }
        Ok(value)
    }

    /// Typed [`get_add`](Self::get_add). A stored value that does not convert
    /// yields `default`.
    pub fn get_as<T>(&mut self, key: &str, default: T) -> PersistResult<T>
    where
        T: FromValue + Into<Value> + Clone,
    {
        let value = self.get_add(key, default.clone())?;
        Ok(value.parse().unwrap_or_else(|| {
            warn!(key, value = %value, target = T::TYPE_NAME, "stored value does not convert; using default");
            default
        }))
    }

    pub fn bool_value(&mut self, key: &str, default: bool) -> PersistResult<bool> {
        self.get_as(key, default)
    }

    pub fn int_value(&mut self, key: &str, default: i64) -> PersistResult<i64> {
        self.get_as(key, default)
    }

    pub fn float_value(&mut self, key: &str, default: f64) -> PersistResult<f64> {
        self.get_as(key, default)
    }

    pub fn string_value(&mut self, key: &str, default: &str) -> PersistResult<String> {
        self.get_as(key, default.to_string())
    }

    pub fn datetime_value(&mut self, key: &str, default: DateTime<Utc>) -> PersistResult<DateTime<Utc>> {
        self.get_as(key, default)
    }

    pub fn profile_value(&mut self, key: &str) -> PersistResult<Profile> {
        self.get_as(key, Profile::new())
    }

    /// Overlay more command-line text. What it applies counts as
    /// command-line state for save-sans-command-line.
    pub fn load_from_command_line(&mut self, text: &str, action: LoadAction) -> PersistResult<LoadReport> {
        let batch = Profile::parse(text)?;
        Ok(self.overlay(batch, action))
    }

    /// Array form of [`load_from_command_line`](Self::load_from_command_line).
    pub fn load_from_args<I, S>(&mut self, args: I, action: LoadAction) -> PersistResult<LoadReport>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let batch = Profile::parse_args(args)?;
        Ok(self.overlay(batch, action))
    }

    fn overlay(&mut self, batch: Profile, action: LoadAction) -> LoadReport {
        let report = self.profile.load(batch, action);
        if let Some(binding) = self.binding.as_mut() {
            binding.overrides.extend(report.applied.iter().cloned());
        }
        report
    }

    /// Compress the live profile for transport.
    pub fn compress(&self) -> PersistResult<Bytes> {
        Ok(self.profile.compress()?)
    }

    // ---------------------------------------------------------------
    // Persistence
    // ---------------------------------------------------------------

    /// Write the profile if saving is enabled, the store is bound, and
    /// `-NoSave` is not set. Returns whether anything was written.
    pub fn save(&mut self) -> PersistResult<bool> {
        let Some(binding) = &self.binding else {
            debug!("save skipped: store is not bound");
            return Ok(false);
        };
        if !binding.save_enabled {
            debug!(path = %binding.path.display(), "save skipped: saving not enabled");
            return Ok(false);
        }
        if self.flag(NO_SAVE) {
            debug!(path = %binding.path.display(), "save skipped: {NO_SAVE} is set");
            return Ok(false);
        }
        self.write()?;
        Ok(true)
    }

    /// Write to `path` and rebind there, locking the new file first. Saving
    /// is enabled afterwards regardless of how the store was opened.
    pub fn save_as(&mut self, path: impl AsRef<Path>) -> PersistResult<()> {
        let path = path.as_ref().to_path_buf();
        if self.path() != Some(path.as_path()) {
            let lock = FileLock::acquire(&path)?;
            let binding = match self.binding.take() {
                Some(old) => Binding {
                    path,
                    _lock: lock,
                    save_enabled: true,
                    created: false,
                    command_line: old.command_line,
                    overrides: old.overrides,
                    baseline: old.baseline,
                },
                None => Binding {
                    path,
                    _lock: lock,
                    save_enabled: true,
                    created: false,
                    command_line: Profile::new(),
                    overrides: Vec::new(),
                    baseline: self.profile.clone(),
                },
            };
            self.binding = Some(binding);
        }
        self.write()
    }

    /// Re-read the backing file, replacing the live profile, and replay the
    /// original command line over it.
    pub fn reload(&mut self) -> PersistResult<()> {
        let binding = self.binding.as_ref().ok_or(PersistError::NotBound)?;
        let decoded = read_file(&binding.path, self.format)?;
        let command_line = binding.command_line.clone();

        self.profile.load(decoded.profile, LoadAction::Overwrite);
        let baseline = self.profile.clone();
        let report = self.profile.load(command_line, LoadAction::Merge);

        if let Some(binding) = self.binding.as_mut() {
            binding.baseline = baseline;
            binding.overrides = report.applied;
            info!(path = %binding.path.display(), entries = self.profile.len(), "profile reloaded");
        }
        Ok(())
    }

    fn write(&mut self) -> PersistResult<()> {
        let binding = self.binding.as_ref().ok_or(PersistError::NotBound)?;
        let view = self.persisted_view(binding);
        let text = self.format.render(&view)?;
        atomic::replace_with_retry(&binding.path, &text, self.options.retry_delay)?;
        debug!(path = %binding.path.display(), entries = view.len(), format = %self.format, "profile saved");

        if let Some(binding) = self.binding.as_mut() {
            binding.save_enabled = true;
            binding.baseline = view;
        }
        Ok(())
    }

    fn persisted_view(&self, binding: &Binding) -> Profile {
        if self.options.save_sans_command_line && !self.flag(SAVE_COMMAND_LINE) {
            without_command_line(&self.profile, &binding.baseline, &binding.overrides)
        } else {
            self.profile.clone()
        }
    }

    fn flag(&self, key: &str) -> bool {
        matches!(self.profile.try_get::<bool>(key), Ok(Some(true)))
    }
}

fn read_file(path: &Path, format: Format) -> PersistResult<profline_codec::Decoded> {
    let text = fs::read_to_string(path)?;
    parse_any(&text, format).map_err(|e| PersistError::CorruptFile {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}
