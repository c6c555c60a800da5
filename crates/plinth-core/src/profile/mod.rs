//! # Plinth Profiles
//!
//! Declarative plugin sets. A profile reads requirement documents, selects
//! one descriptor per requirement, converges the manager's active set
//! towards that selection and then tracks activation changes so the set
//! can be persisted again.
//!
//! ## Key Components
//!
//! - **[`Profile`]** (`reconciler`): load/unload, filter scoping, attribute
//!   overrides and live membership tracking.
//! - **[`RequirementDocument`]** and **[`DocumentParser`]** (`document`):
//!   serde form of documents and their validation into
//!   [`RequirementGroup`]s.
//! - **[`ProfileSink`]** (`sync`): persistence target for the membership,
//!   with file and in-memory implementations.
//! - **[`ProfileError`]** (`error`): errors of this subsystem.
pub mod document;
pub mod error;
pub mod reconciler;
pub mod sync;

pub use document::{
    DocumentParser, MandatoryFlag, ParsedDocument, PluginRequirement, ProfileSource, RawConstraint,
    RequirementDocument, RequirementGroup, SerdeDocumentParser,
};
pub use error::{MissingPlugin, ProfileError};
pub use reconciler::{OverrideRecord, Profile};
pub use sync::{member_requirement, FileProfileSink, MemberEntry, MemoryProfileSink, ProfileSink};
