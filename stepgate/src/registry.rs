//! Step registry: locate the governing tree, resolve the active step and
//! instantiate missing step documents.

use std::path::PathBuf;

use anyhow::Result;
use tracing::{debug, info, instrument, warn};

use crate::core::selector::first_open_entry;
use crate::core::step_ref::StepRef;
use crate::core::templates::StepTemplates;
use crate::core::tree_doc::{TreeDocument, TreeEntry, TreeKind};
use crate::core::types::REASON_TAMPERING;
use crate::error::GateError;
use crate::io::lock::LockMarker;
use crate::io::paths::GatePaths;
use crate::io::store::{read_document, write_atomic};
use crate::session::Session;

/// The tree document in play.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeLocation {
    pub kind: TreeKind,
    pub path: PathBuf,
}

/// Find the single tree document under `bootstrap/`.
///
/// Neither kind present is `Ok(None)`; both present is a state violation.
pub fn locate_tree(paths: &GatePaths) -> Result<Option<TreeLocation>> {
    let mut found = TreeKind::ALL.into_iter().filter_map(|kind| {
        let path = paths.tree_path(kind);
        path.is_file().then_some(TreeLocation { kind, path })
    });
    let first = found.next();
    if found.next().is_some() {
        return Err(GateError::state(format!(
            "exactly one tree document may exist, found both {} and {}",
            TreeKind::NewInitiative.file_name(),
            TreeKind::Maintenance.file_name()
        ))
        .into());
    }
    Ok(first)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveStep {
    pub reference: StepRef,
    pub path: PathBuf,
    /// The document was instantiated from a template by this call.
    pub created: bool,
    pub tree: TreeLocation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// No tree document exists.
    NoTree,
    /// Every tree entry is checked.
    AllComplete(TreeLocation),
    Active(ActiveStep),
}

/// Read-only snapshot for `status`.
#[derive(Debug, Clone)]
pub struct StatusReport {
    pub tree: Option<TreeLocation>,
    pub entries: Vec<TreeEntry>,
    pub active_pointer: Option<PathBuf>,
    pub lock: Option<LockMarker>,
    pub pending_questions: Vec<String>,
    pub unresolved_inconsistencies: Vec<String>,
}

pub struct StepRegistry<'a> {
    session: &'a Session,
    templates: StepTemplates,
}

impl<'a> StepRegistry<'a> {
    pub fn new(session: &'a Session) -> Result<Self> {
        Ok(Self {
            session,
            templates: StepTemplates::new()?,
        })
    }

    /// Load the governing tree document, if any.
    pub fn load_tree(&self) -> Result<Option<(TreeLocation, TreeDocument)>> {
        let Some(location) = locate_tree(self.session.paths())? else {
            return Ok(None);
        };
        let tree = TreeDocument::parse(&read_document(&location.path)?)?;
        Ok(Some((location, tree)))
    }

    /// Integrity check, then the first open tree entry.
    ///
    /// A ledger mismatch locks with "tampering detected" and fails the call.
    /// A missing step document is created from its template, the pointer is
    /// moved to it and its hash recorded.
    #[instrument(skip_all)]
    pub fn resolve_active_step(&self) -> Result<Resolution> {
        let report = self.session.ledger().verify_all()?;
        if let Some(mismatch) = report.mismatches.into_iter().next() {
            warn!(path = %mismatch.path.display(), "tampering detected");
            self.session.locks().lock(REASON_TAMPERING)?;
            return Err(mismatch.into_error().into());
        }

        let Some((location, tree)) = self.load_tree()? else {
            info!("no tree document");
            return Ok(Resolution::NoTree);
        };
        let Some(entry) = first_open_entry(&tree) else {
            info!(tree = %location.path.display(), "all steps complete");
            return Ok(Resolution::AllComplete(location));
        };

        let reference = entry.step_ref()?;
        let (path, created) = self.ensure_step_document(location.kind, &reference)?;
        self.session.locks().set_active(&path)?;
        self.session.ledger().record_hash(&path)?;
        debug!(step = %reference, created, "active step resolved");

        Ok(Resolution::Active(ActiveStep {
            reference,
            path,
            created,
            tree: location,
        }))
    }

    /// Instantiate the document for `reference` from its template.
    ///
    /// An existing document is left untouched.
    pub fn create_step_document(&self, reference: &str) -> Result<PathBuf> {
        let step = StepRef::parse(reference)?;
        let kind = locate_tree(self.session.paths())?
            .map_or(TreeKind::Maintenance, |location| location.kind);
        let (path, _) = self.ensure_step_document(kind, &step)?;
        Ok(path)
    }

    fn ensure_step_document(&self, kind: TreeKind, step: &StepRef) -> Result<(PathBuf, bool)> {
        let path = self.session.paths().step_path(&step.to_string());
        if path.exists() {
            return Ok((path, false));
        }
        let text = self.templates.render(kind, step)?;
        write_atomic(&path, &text)?;
        info!(step = %step, "created step document");
        Ok((path, true))
    }

    /// Snapshot of tree, pointer, lock and scratchpad. Does not resolve or
    /// record hashes.
    pub fn status(&self) -> Result<StatusReport> {
        let (tree, entries) = match self.load_tree()? {
            Some((location, tree)) => (Some(location), tree.entries),
            None => (None, Vec::new()),
        };
        Ok(StatusReport {
            tree,
            entries,
            active_pointer: self.session.locks().active()?,
            lock: self.session.locks().current()?,
            pending_questions: self.session.scratchpad().pending_questions()?,
            unresolved_inconsistencies: self.session.scratchpad().unresolved_inconsistencies()?,
        })
    }
}
